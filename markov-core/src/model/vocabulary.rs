use std::collections::hash_map::Entry;
use std::collections::{HashMap, TryReserveError};
use std::fmt;

/// Compact id of an interned token.
pub(crate) type TokenId = u32;

/// Start-of-sequence marker. Never maps to text.
pub(crate) const START: TokenId = 0;
/// End-of-sequence marker. Never maps to text.
pub(crate) const END: TokenId = 1;

/// First id handed out to a real word.
const FIRST_WORD: TokenId = 2;

/// Public view of a token id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol<'a> {
	Start,
	End,
	Word(&'a str),
}

impl fmt::Display for Symbol<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Symbol::Start => f.write_str("<s>"),
			Symbol::End => f.write_str("</s>"),
			Symbol::Word(word) => f.write_str(word),
		}
	}
}

/// Token ids for one learn call, with the words not yet interned.
///
/// New words get provisional ids following the current vocabulary; they
/// become real once [`Vocabulary::commit`] runs.
pub(crate) struct Batch {
	pub ids: Vec<TokenId>,
	fresh: Vec<String>,
}

impl Batch {
	pub fn fresh_len(&self) -> usize {
		self.fresh.len()
	}
}

/// Bidirectional token interner.
///
/// ## Invariants
/// - `words[i]` has id `i + FIRST_WORD`
/// - `ids` and `words` hold the same set of words
#[derive(Debug, Default)]
pub(crate) struct Vocabulary {
	words: Vec<Box<str>>,
	ids: HashMap<Box<str>, TokenId>,
}

impl Vocabulary {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of real words (markers excluded).
	pub fn len(&self) -> usize {
		self.words.len()
	}

	pub fn id(&self, word: &str) -> Option<TokenId> {
		self.ids.get(word).copied()
	}

	/// Text of a word id, `None` for markers and unknown ids.
	pub fn word(&self, id: TokenId) -> Option<&str> {
		let index = id.checked_sub(FIRST_WORD)? as usize;
		self.words.get(index).map(|w| &**w)
	}

	pub fn symbol(&self, id: TokenId) -> Option<Symbol<'_>> {
		match id {
			START => Some(Symbol::Start),
			END => Some(Symbol::End),
			_ => self.word(id).map(Symbol::Word),
		}
	}

	/// Resolves tokens to ids without touching the vocabulary.
	pub fn plan(&self, tokens: Vec<String>) -> Batch {
		let mut ids = Vec::with_capacity(tokens.len());
		let mut fresh: Vec<String> = Vec::new();
		let mut staged: HashMap<String, TokenId> = HashMap::new();
		let next = FIRST_WORD + self.words.len() as TokenId;

		for token in tokens {
			if let Some(id) = self.id(&token) {
				ids.push(id);
				continue;
			}
			match staged.entry(token) {
				Entry::Occupied(entry) => ids.push(*entry.get()),
				Entry::Vacant(entry) => {
					let id = next + fresh.len() as TokenId;
					fresh.push(entry.key().clone());
					entry.insert(id);
					ids.push(id);
				}
			}
		}

		Batch { ids, fresh }
	}

	/// Reserves room for the fresh words of a batch.
	pub fn try_reserve(&mut self, batch: &Batch) -> Result<(), TryReserveError> {
		self.words.try_reserve(batch.fresh.len())?;
		self.ids.try_reserve(batch.fresh.len())
	}

	/// Interns the fresh words of a batch, in provisional id order.
	pub fn commit(&mut self, batch: Batch) -> Vec<TokenId> {
		for word in batch.fresh {
			self.insert(word.into_boxed_str());
		}
		batch.ids
	}

	/// Returns the id of `word`, interning it if needed.
	pub fn intern(&mut self, word: &str) -> TokenId {
		match self.id(word) {
			Some(id) => id,
			None => self.insert(Box::from(word)),
		}
	}

	fn insert(&mut self, word: Box<str>) -> TokenId {
		let id = FIRST_WORD + self.words.len() as TokenId;
		self.ids.insert(word.clone(), id);
		self.words.push(word);
		id
	}
}
