use rand::Rng;

use crate::error::{MarkovError, Result};
use super::chain::{ChainStore, ContextKey};
use super::config::ORDER;
use super::tokenizer::tokenize;
use super::vocabulary::{END, Vocabulary};
use super::writer::BoundedWriter;

/// Random walk over a chain, writing into a bounded buffer.
///
/// # Responsibilities
/// - Unconditioned generation from the start context (speak)
/// - Seed selection from a message, then generation (reply)
/// - Stop on the end marker, on overflow, or on the step limit
///
/// Borrows the chain immutably: generation never changes what was learned.
pub(crate) struct Generator<'m> {
	chain: &'m ChainStore,
	vocab: &'m Vocabulary,
	max_steps: usize,
}

impl<'m> Generator<'m> {
	pub fn new(chain: &'m ChainStore, vocab: &'m Vocabulary, max_steps: usize) -> Self {
		Self { chain, vocab, max_steps }
	}

	/// Generates from the start context.
	///
	/// # Errors
	/// - `NoData` if nothing was ever learned
	/// - `BufferTooSmall` if the first token does not fit
	pub fn speak<R: Rng>(&self, rng: &mut R, out: &mut BoundedWriter) -> Result<usize> {
		self.walk(ContextKey::start(), rng, out)
	}

	/// Generates a continuation of `message`.
	///
	/// Seeds are tried longest first (see [`Generator::seed_candidates`]).
	/// A seed whose walk ends at once yields nothing and the next one is
	/// tried; the start context is always last.
	pub fn reply<R: Rng>(&self, message: &[u8], rng: &mut R, out: &mut BoundedWriter) -> Result<usize> {
		let tokens = tokenize(message);
		for seed in self.seed_candidates(&tokens) {
			out.clear();
			let written = self.walk(seed, rng, out)?;
			if written > 0 {
				log::debug!("[markov] Reply seeded from {:?}", seed.ids());
				return Ok(written);
			}
		}

		out.clear();
		self.walk(ContextKey::start(), rng, out)
	}

	/// Seed contexts for `tokens`, longest suffix match first.
	///
	/// For each suffix length from `ORDER` down to 1, the most recently
	/// learned context ending with that suffix is a candidate. Suffixes
	/// containing an unknown word match nothing. The start context is not
	/// included.
	pub fn seed_candidates(&self, tokens: &[String]) -> Vec<ContextKey> {
		let mut candidates: Vec<ContextKey> = Vec::new();

		for len in (1..=ORDER.min(tokens.len())).rev() {
			let suffix: Option<Vec<_>> = tokens[tokens.len() - len..]
				.iter()
				.map(|token| self.vocab.id(token))
				.collect();
			let Some(suffix) = suffix else { continue };

			if let Some(context) = self.chain.latest_ending_with(&suffix) {
				if context != ContextKey::start() && !candidates.contains(&context) {
					candidates.push(context);
				}
			}
		}

		candidates
	}

	/// Walks from `context` until the end marker, overflow or the step limit.
	///
	/// Returns the number of bytes written.
	fn walk<R: Rng>(&self, mut context: ContextKey, rng: &mut R, out: &mut BoundedWriter) -> Result<usize> {
		if self.chain.get(&context).is_none_or(|state| state.total() == 0) {
			return Err(MarkovError::NoData);
		}

		for _ in 0..self.max_steps {
			let next = match self.chain.predict(&context, rng) {
				Some(next) if next != END => next,
				// End marker, or a context with no outgoing edge
				_ => return Ok(out.len()),
			};

			let word = self.vocab.word(next).ok_or(MarkovError::NoData)?;
			if !out.push_token(word) {
				if out.is_empty() {
					return Err(MarkovError::BufferTooSmall {
						needed: out.cost(word),
						capacity: out.capacity(),
					});
				}
				return Ok(out.len());
			}

			context = context.next(next);
		}

		log::debug!("[markov] Generation hit the step limit ({})", self.max_steps);
		Err(MarkovError::NoData)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::chain::windows;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	struct Fixture {
		chain: ChainStore,
		vocab: Vocabulary,
	}

	impl Fixture {
		fn new(sentences: &[&str]) -> Self {
			let mut fixture = Fixture { chain: ChainStore::new(), vocab: Vocabulary::new() };
			for sentence in sentences {
				let ids: Vec<_> = tokenize(sentence.as_bytes())
					.iter()
					.map(|t| fixture.vocab.intern(t))
					.collect();
				for (context, next) in windows(&ids, END) {
					fixture.chain.observe(context, next, 1);
				}
			}
			fixture
		}

		fn generator(&self, max_steps: usize) -> Generator<'_> {
			Generator::new(&self.chain, &self.vocab, max_steps)
		}
	}

	fn tokens(text: &str) -> Vec<String> {
		tokenize(text.as_bytes())
	}

	#[test]
	fn empty_chain_has_no_data() {
		let fixture = Fixture::new(&[]);
		let mut buf = [0u8; 32];
		let mut out = BoundedWriter::new(&mut buf);
		let res = fixture.generator(100).speak(&mut StdRng::seed_from_u64(0), &mut out);
		assert!(matches!(res, Err(MarkovError::NoData)));
	}

	#[test]
	fn deterministic_chain_is_replayed() {
		let fixture = Fixture::new(&["A B C."]);
		let mut buf = [0u8; 32];
		let mut out = BoundedWriter::new(&mut buf);
		let n = fixture.generator(100).speak(&mut StdRng::seed_from_u64(0), &mut out).unwrap();
		assert_eq!(&buf[..n], b"A B C .");
	}

	#[test]
	fn first_token_must_fit() {
		let fixture = Fixture::new(&["enormous word"]);
		let mut buf = [0u8; 4];
		let mut out = BoundedWriter::new(&mut buf);
		let res = fixture.generator(100).speak(&mut StdRng::seed_from_u64(0), &mut out);
		assert!(matches!(res, Err(MarkovError::BufferTooSmall { needed: 8, capacity: 4 })));
	}

	#[test]
	fn truncates_on_token_boundary() {
		let fixture = Fixture::new(&["one two three four"]);
		let mut buf = [0u8; 10];
		let mut out = BoundedWriter::new(&mut buf);
		let n = fixture.generator(100).speak(&mut StdRng::seed_from_u64(0), &mut out).unwrap();
		assert_eq!(&buf[..n], b"one two");
	}

	#[test]
	fn step_limit_is_no_data() {
		// "a a a ..." loops on [a, a] -> a
		let fixture = Fixture::new(&["a a a a a a"]);
		let mut buf = [0u8; 4096];
		let mut out = BoundedWriter::new(&mut buf);
		let mut rng = StdRng::seed_from_u64(1);
		let generator = fixture.generator(3);
		let mut hit_limit = false;
		for _ in 0..64 {
			out.clear();
			if let Err(MarkovError::NoData) = generator.speak(&mut rng, &mut out) {
				hit_limit = true;
				break;
			}
		}
		assert!(hit_limit);
	}

	#[test]
	fn seeds_prefer_longest_suffix() {
		let fixture = Fixture::new(&["the quick brown fox .", "a brown dog ."]);
		let generator = fixture.generator(100);
		let seeds = generator.seed_candidates(&tokens("so quick brown"));
		let quick = fixture.vocab.id("quick").unwrap();
		let brown = fixture.vocab.id("brown").unwrap();
		let a = fixture.vocab.id("a").unwrap();
		assert_eq!(seeds[0], ContextKey::from_ids([quick, brown]));
		// Shorter suffix: most recently learned context ending with "brown"
		assert_eq!(seeds[1], ContextKey::from_ids([a, brown]));
		assert_eq!(seeds.len(), 2);
	}

	#[test]
	fn unknown_words_have_no_seed() {
		let fixture = Fixture::new(&["the quick brown fox ."]);
		assert!(fixture.generator(100).seed_candidates(&tokens("zebra yak")).is_empty());
		assert!(fixture.generator(100).seed_candidates(&[]).is_empty());
	}

	#[test]
	fn reply_continues_message() {
		let fixture = Fixture::new(&["the quick brown fox jumps .", "my cat sleeps ."]);
		let mut buf = [0u8; 64];
		let mut out = BoundedWriter::new(&mut buf);
		let n = fixture
			.generator(100)
			.reply(b"I saw a quick brown", &mut StdRng::seed_from_u64(5), &mut out)
			.unwrap();
		assert_eq!(&buf[..n], b"fox jumps .");
	}

	#[test]
	fn reply_skips_seeds_that_end_at_once() {
		// Message ends on ".", whose only successor is the end marker
		let fixture = Fixture::new(&["hello there ."]);
		let mut buf = [0u8; 64];
		let mut out = BoundedWriter::new(&mut buf);
		let n = fixture
			.generator(100)
			.reply(b"there .", &mut StdRng::seed_from_u64(5), &mut out)
			.unwrap();
		assert_eq!(&buf[..n], b"hello there .");
	}
}
