use std::collections::{HashMap, TryReserveError};

use rand::Rng;

use super::config::ORDER;
use super::state::State;
use super::vocabulary::{START, TokenId};

/// The last `ORDER` token ids preceding a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ContextKey([TokenId; ORDER]);

impl ContextKey {
	/// Context at the beginning of every sequence.
	pub fn start() -> Self {
		ContextKey([START; ORDER])
	}

	pub fn from_ids(ids: [TokenId; ORDER]) -> Self {
		ContextKey(ids)
	}

	pub fn ids(&self) -> [TokenId; ORDER] {
		self.0
	}

	/// Shifts the window: drops the oldest id, appends `next`.
	pub fn next(&self, next: TokenId) -> Self {
		let mut ids = self.0;
		ids.rotate_left(1);
		ids[ORDER - 1] = next;
		ContextKey(ids)
	}

	/// True if the last `suffix.len()` ids equal `suffix`.
	pub fn ends_with(&self, suffix: &[TokenId]) -> bool {
		self.0.ends_with(suffix)
	}

	/// Most recent id of the window.
	pub fn last(&self) -> TokenId {
		self.0[ORDER - 1]
	}
}

/// One `(context, successor)` observation.
pub(crate) type Window = (ContextKey, TokenId);

/// Splits an id sequence into learning windows.
///
/// The sequence is prefixed with `ORDER` start markers and suffixed with
/// one end marker, so even a single token registers.
pub(crate) fn windows(ids: &[TokenId], end: TokenId) -> Vec<Window> {
	let mut padded = Vec::with_capacity(ids.len() + ORDER + 1);
	padded.extend_from_slice(&[START; ORDER]);
	padded.extend_from_slice(ids);
	padded.push(end);

	padded
		.windows(ORDER + 1)
		.map(|w| {
			let mut key = [START; ORDER];
			key.copy_from_slice(&w[..ORDER]);
			(ContextKey(key), w[ORDER])
		})
		.collect()
}

/// Context keys with their successor distributions.
///
/// # Responsibilities
/// - Reserve, then apply, batches of observations (atomic learning)
/// - Predict the next token for a context
/// - Find the most recently learned context ending with a suffix
///
/// # Invariants
/// - Every stored state has a non-zero total
/// - `clock` is strictly greater than every stored `last_learned`
/// - `latest[t]` is the stored context ending with `t` observed last
#[derive(Debug, Default)]
pub(crate) struct ChainStore {
	states: HashMap<ContextKey, State>,
	latest: HashMap<TokenId, ContextKey>,
	clock: u64,
}

impl ChainStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.states.len()
	}

	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	pub fn get(&self, context: &ContextKey) -> Option<&State> {
		self.states.get(context)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&ContextKey, &State)> {
		self.states.iter()
	}

	/// Reserves everything `apply` needs to record `windows`.
	///
	/// Returns the states to create for unseen contexts, already sized.
	pub fn try_reserve(&mut self, windows: &[Window]) -> Result<Vec<(ContextKey, State)>, TryReserveError> {
		// Distinct successors per context, in first-seen order
		let mut pending: HashMap<ContextKey, Vec<TokenId>> = HashMap::new();
		for (context, next) in windows {
			let successors = pending.entry(*context).or_default();
			if !successors.contains(next) {
				successors.push(*next);
			}
		}

		let mut fresh = Vec::new();
		let mut tails: Vec<TokenId> = Vec::new();
		for (context, successors) in &pending {
			if !self.latest.contains_key(&context.last()) && !tails.contains(&context.last()) {
				tails.try_reserve(1)?;
				tails.push(context.last());
			}
			match self.states.get_mut(context) {
				Some(state) => {
					let unseen = successors.iter().filter(|s| !state.contains(**s)).count();
					state.try_reserve(unseen)?;
				}
				None => {
					let mut state = State::new();
					state.try_reserve(successors.len())?;
					fresh.try_reserve(1)?;
					fresh.push((*context, state));
				}
			}
		}
		self.states.try_reserve(fresh.len())?;
		self.latest.try_reserve(tails.len())?;

		Ok(fresh)
	}

	/// Records `windows`, after a successful [`ChainStore::try_reserve`].
	pub fn apply(&mut self, fresh: Vec<(ContextKey, State)>, windows: &[Window]) {
		self.states.extend(fresh);
		for (context, next) in windows {
			self.observe(*context, *next, 1);
		}
	}

	/// Adds `occurrence` observations of `context -> next`.
	pub fn observe(&mut self, context: ContextKey, next: TokenId, occurrence: u64) {
		self.clock += 1;
		let stamp = self.clock;
		self.states
			.entry(context)
			.or_default()
			.add_transition(next, occurrence, stamp);
		self.latest.insert(context.last(), context);
	}

	/// Predicts the next token after `context`.
	///
	/// Returns `None` if the context is unknown.
	pub fn predict<R: Rng>(&self, context: &ContextKey, rng: &mut R) -> Option<TokenId> {
		self.states.get(context)?.predict(rng)
	}

	/// Most recently learned context whose last ids equal `suffix`.
	///
	/// A full-length suffix is a direct lookup and a single id goes through
	/// the `latest` index. Other lengths only exist for `ORDER > 2` and scan.
	pub fn latest_ending_with(&self, suffix: &[TokenId]) -> Option<ContextKey> {
		if let Ok(ids) = <[TokenId; ORDER]>::try_from(suffix) {
			let context = ContextKey(ids);
			return self.states.contains_key(&context).then_some(context);
		}
		if let [last] = suffix {
			return self.latest.get(last).copied();
		}
		self.states
			.iter()
			.filter(|(context, _)| context.ends_with(suffix))
			.max_by_key(|(context, state)| (state.last_learned(), **context))
			.map(|(context, _)| *context)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::vocabulary::END;

	fn learn(chain: &mut ChainStore, ids: &[TokenId]) {
		let windows = windows(ids, END);
		let fresh = chain.try_reserve(&windows).unwrap();
		chain.apply(fresh, &windows);
	}

	#[test]
	fn key_shifts_left() {
		let key = ContextKey::start().next(5).next(6);
		assert_eq!(key.ids(), [5, 6]);
		assert!(key.ends_with(&[6]));
		assert!(!key.ends_with(&[5]));
	}

	#[test]
	fn windows_are_padded() {
		let w = windows(&[7], END);
		assert_eq!(w, vec![
			(ContextKey::from_ids([START, START]), 7),
			(ContextKey::from_ids([START, 7]), END),
		]);
		assert_eq!(windows(&[2, 3, 4], END).len(), 4);
	}

	#[test]
	fn learning_accumulates() {
		let mut chain = ChainStore::new();
		learn(&mut chain, &[2, 3]);
		learn(&mut chain, &[2, 4]);
		let start = chain.get(&ContextKey::start()).unwrap();
		assert_eq!(start.count(2), 2);
		let after = chain.get(&ContextKey::from_ids([START, 2])).unwrap();
		assert_eq!(after.count(3), 1);
		assert_eq!(after.count(4), 1);
		assert_eq!(chain.len(), 4);
	}

	#[test]
	fn latest_context_wins() {
		let mut chain = ChainStore::new();
		learn(&mut chain, &[2, 3, 4]);
		learn(&mut chain, &[5, 3, 6]);
		assert_eq!(chain.latest_ending_with(&[3]), Some(ContextKey::from_ids([5, 3])));
		assert_eq!(chain.latest_ending_with(&[2, 3]), Some(ContextKey::from_ids([2, 3])));
		assert_eq!(chain.latest_ending_with(&[9]), None);
	}

	#[test]
	fn index_agrees_with_full_scan() {
		let mut chain = ChainStore::new();
		learn(&mut chain, &[2, 3, 4, 3, 5]);
		learn(&mut chain, &[6, 4, 3]);
		learn(&mut chain, &[2, 3, 4]);
		chain.observe(ContextKey::from_ids([7, 5]), 4, 2);

		for last in START..8 {
			let scanned = chain
				.iter()
				.filter(|(context, _)| context.last() == last)
				.max_by_key(|(_, state)| state.last_learned())
				.map(|(context, _)| *context);
			assert_eq!(chain.latest_ending_with(&[last]), scanned, "suffix [{last}]");
		}
		assert_eq!(chain.latest_ending_with(&[5]), Some(ContextKey::from_ids([7, 5])));
		assert_eq!(chain.latest_ending_with(&[4]), Some(ContextKey::from_ids([3, 4])));
	}

	#[test]
	fn full_suffix_is_a_direct_lookup() {
		let mut chain = ChainStore::new();
		learn(&mut chain, &[2, 3, 4]);
		assert_eq!(chain.latest_ending_with(&[3, 4]), Some(ContextKey::from_ids([3, 4])));
		assert_eq!(chain.latest_ending_with(&[4, 3]), None);
	}

	#[test]
	fn unknown_context_predicts_nothing() {
		let chain = ChainStore::new();
		let mut rng = rand::rng();
		assert_eq!(chain.predict(&ContextKey::start(), &mut rng), None);
	}
}
