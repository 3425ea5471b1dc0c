use std::collections::TryReserveError;

use rand::Rng;

use super::vocabulary::TokenId;

/// Successor distribution of one context key.
///
/// Conceptually, this is a node in a Markov chain where outgoing edges
/// are weighted by their number of observations.
///
/// ## Responsibilities:
/// - Accumulate transition occurrences during learning
/// - Predict the next token using weighted random sampling
/// - Remember when it was last learned (reply seed tie-break)
///
/// ## Invariants
/// - Each successor appears once, with a strictly positive count
/// - `total` is the sum of all counts
/// - Successors keep first-seen order, so a seeded RNG replays exactly
#[derive(Clone, Debug, Default)]
pub(crate) struct State {
	successors: Vec<(TokenId, u64)>,
	total: u64,
	last_learned: u64,
}

impl State {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn total(&self) -> u64 {
		self.total
	}

	pub fn last_learned(&self) -> u64 {
		self.last_learned
	}

	pub fn count(&self, successor: TokenId) -> u64 {
		self.successors
			.iter()
			.find(|(id, _)| *id == successor)
			.map_or(0, |(_, count)| *count)
	}

	pub fn contains(&self, successor: TokenId) -> bool {
		self.successors.iter().any(|(id, _)| *id == successor)
	}

	pub fn successors(&self) -> impl Iterator<Item = (TokenId, u64)> + '_ {
		self.successors.iter().copied()
	}

	/// Reserves room for `additional` new successors.
	pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
		self.successors.try_reserve(additional)
	}

	/// Records `occurrence` observations of a transition toward `next`.
	///
	/// `stamp` orders states by recency of learning.
	pub fn add_transition(&mut self, next: TokenId, occurrence: u64, stamp: u64) {
		match self.successors.iter_mut().find(|(id, _)| *id == next) {
			Some((_, count)) => *count += occurrence,
			None => self.successors.push((next, occurrence)),
		}
		self.total += occurrence;
		self.last_learned = self.last_learned.max(stamp);
	}

	/// Predicts the next token using weighted random sampling.
	///
	/// Draws `r` uniformly in `0..total`, then walks the successors
	/// subtracting counts until `r` falls inside a bucket.
	///
	/// Returns `None` if the state has no transitions.
	pub fn predict<R: Rng>(&self, rng: &mut R) -> Option<TokenId> {
		if self.total == 0 {
			return None;
		}

		let mut r = rng.random_range(0..self.total);
		for (next, occurrence) in &self.successors {
			if r < *occurrence {
				return Some(*next);
			}
			r -= occurrence;
		}

		// Unreachable while `total` matches the counts
		self.successors.last().map(|(next, _)| *next)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	#[test]
	fn empty_state_predicts_nothing() {
		let state = State::new();
		assert_eq!(state.predict(&mut StdRng::seed_from_u64(1)), None);
	}

	#[test]
	fn counts_accumulate() {
		let mut state = State::new();
		state.add_transition(5, 1, 1);
		state.add_transition(6, 1, 2);
		state.add_transition(5, 2, 3);
		assert_eq!(state.count(5), 3);
		assert_eq!(state.count(6), 1);
		assert_eq!(state.count(7), 0);
		assert_eq!(state.total(), 4);
		assert_eq!(state.last_learned(), 3);
	}

	#[test]
	fn single_successor_is_always_picked() {
		let mut state = State::new();
		state.add_transition(9, 4, 1);
		let mut rng = StdRng::seed_from_u64(7);
		for _ in 0..50 {
			assert_eq!(state.predict(&mut rng), Some(9));
		}
	}

	#[test]
	fn sampling_follows_weights() {
		let mut state = State::new();
		state.add_transition(2, 9, 1);
		state.add_transition(3, 1, 2);
		let mut rng = StdRng::seed_from_u64(42);
		let heavy = (0..10_000)
			.filter(|_| state.predict(&mut rng) == Some(2))
			.count();
		// Expected 9000
		assert!((8500..9500).contains(&heavy), "heavy = {heavy}");
	}
}
