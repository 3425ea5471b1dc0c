use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::{MarkovError, Result};
use crate::io::read_file;
use super::chain::{ChainStore, ContextKey, windows};
use super::config::{Config, ORDER};
use super::generator::Generator;
use super::tokenizer::tokenize;
use super::vocabulary::{END, START, Symbol, TokenId, Vocabulary};
use super::writer::BoundedWriter;

/// A word-level Markov text model.
///
/// This struct manages:
/// - `vocab`: interned words, plus the start/end markers
/// - `chain`: context key → successor counts
/// - `rng`: instance-local sampling state
/// - `config`: generation parameters
///
/// Learning is the only way to change the chain; speak and reply read it
/// and only advance the RNG. An instance is not internally synchronized:
/// callers sharing one across threads must serialize access themselves.
#[derive(Debug)]
pub struct MarkovModel {
	vocab: Vocabulary,
	chain: ChainStore,
	rng: StdRng,
	config: Config,
}

impl MarkovModel {
	/// Creates an empty model with the default configuration.
	pub fn new() -> Result<Self> {
		Self::with_config(Config::default())
	}

	/// Creates an empty model.
	///
	/// The RNG is seeded from `config.seed()` when set, from the OS otherwise.
	///
	/// # Errors
	/// `RandomSource` if the OS entropy source cannot be read.
	pub fn with_config(config: Config) -> Result<Self> {
		let rng = match config.seed() {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::try_from_os_rng().map_err(|e| MarkovError::RandomSource(e.to_string()))?,
		};
		Ok(Self { vocab: Vocabulary::new(), chain: ChainStore::new(), rng, config })
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// True until something has been learned.
	pub fn is_empty(&self) -> bool {
		self.chain.is_empty()
	}

	/// Number of distinct context keys.
	pub fn context_count(&self) -> usize {
		self.chain.len()
	}

	/// Number of distinct words (markers excluded).
	pub fn vocabulary_len(&self) -> usize {
		self.vocab.len()
	}

	/// Learns one sequence of text.
	///
	/// # Behavior
	/// - Tokenizes `text` (lossy UTF-8)
	/// - Pads with `ORDER` start markers and one end marker
	/// - Increments the count of every `(context, successor)` window
	///
	/// Empty or whitespace-only text is a no-op.
	///
	/// # Errors
	/// `AllocationFailure` if a table cannot grow. Nothing is changed then:
	/// every table is reserved before the first count is written.
	pub fn learn(&mut self, text: &[u8]) -> Result<()> {
		let tokens = tokenize(text);
		if tokens.is_empty() {
			return Ok(());
		}

		let batch = self.vocab.plan(tokens);
		let windows = windows(&batch.ids, END);
		self.vocab.try_reserve(&batch)?;
		let fresh = self.chain.try_reserve(&windows)?;

		let fresh_words = batch.fresh_len();
		self.vocab.commit(batch);
		self.chain.apply(fresh, &windows);

		log::debug!(
			"[markov] Learned {} windows ({} new words, {} contexts)",
			windows.len(),
			fresh_words,
			self.chain.len()
		);
		Ok(())
	}

	/// Learns every non-empty line of `text` as its own sequence.
	///
	/// Returns the number of lines learned.
	pub fn learn_lines(&mut self, text: &str) -> Result<usize> {
		let mut learned = 0;
		for line in text.lines().filter(|line| !line.trim().is_empty()) {
			self.learn(line.as_bytes())?;
			learned += 1;
		}
		Ok(learned)
	}

	/// Learns a corpus file, one sequence per line.
	///
	/// Returns the number of lines learned.
	pub fn learn_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
		let lines = read_file(&path)?;
		let mut learned = 0;
		for line in lines.iter().filter(|line| !line.trim().is_empty()) {
			self.learn(line.as_bytes())?;
			learned += 1;
		}
		log::info!("[markov] Learned {learned} lines from {}", path.as_ref().display());
		Ok(learned)
	}

	/// Generates text into `out`, returning the number of bytes written.
	///
	/// # Errors
	/// - `NoData` on an untrained model, or when the step limit is hit
	/// - `BufferTooSmall` if not even the first token fits
	pub fn speak_into(&mut self, out: &mut [u8]) -> Result<usize> {
		let generator = Generator::new(&self.chain, &self.vocab, self.config.max_steps());
		generator.speak(&mut self.rng, &mut BoundedWriter::new(out))
	}

	/// Generates a continuation of `message` into `out`.
	///
	/// Falls back to unconditioned generation when the message shares
	/// nothing with what was learned. Same errors as [`MarkovModel::speak_into`].
	pub fn reply_into(&mut self, message: &[u8], out: &mut [u8]) -> Result<usize> {
		let generator = Generator::new(&self.chain, &self.vocab, self.config.max_steps());
		generator.reply(message, &mut self.rng, &mut BoundedWriter::new(out))
	}

	/// Generates text of at most `capacity` bytes.
	pub fn speak(&mut self, capacity: usize) -> Result<String> {
		let mut buf = vec![0u8; capacity];
		let len = self.speak_into(&mut buf)?;
		buf.truncate(len);
		Ok(String::from_utf8_lossy(&buf).into_owned())
	}

	/// Generates a reply of at most `capacity` bytes.
	pub fn reply(&mut self, message: &str, capacity: usize) -> Result<String> {
		let mut buf = vec![0u8; capacity];
		let len = self.reply_into(message.as_bytes(), &mut buf)?;
		buf.truncate(len);
		Ok(String::from_utf8_lossy(&buf).into_owned())
	}

	/// Observed count of `context -> successor` (0 if never seen).
	pub fn transition_count(&self, context: [Symbol<'_>; ORDER], successor: Symbol<'_>) -> u64 {
		let mut ids = [END; ORDER];
		for (slot, symbol) in ids.iter_mut().zip(context) {
			match self.resolve(symbol) {
				Some(id) => *slot = id,
				None => return 0,
			}
		}
		let Some(successor) = self.resolve(successor) else { return 0 };
		self.chain
			.get(&ContextKey::from_ids(ids))
			.map_or(0, |state| state.count(successor))
	}

	/// Every learned transition as `(context, successor, count)`.
	pub fn transitions(&self) -> impl Iterator<Item = ([Symbol<'_>; ORDER], Symbol<'_>, u64)> + '_ {
		self.chain.iter().flat_map(move |(context, state)| {
			let context = context.ids().map(|id| self.symbol(id));
			state
				.successors()
				.map(move |(next, count)| (context, self.symbol(next), count))
		})
	}

	/// Adds every transition count of `other` into this model.
	///
	/// Words are re-interned through this model's vocabulary, so both
	/// models may have learned in any order.
	pub fn merge(&mut self, other: &Self) {
		for (context, state) in other.chain.iter() {
			let context = ContextKey::from_ids(context.ids().map(|id| self.import(other, id)));
			for (next, count) in state.successors() {
				let next = self.import(other, next);
				self.chain.observe(context, next, count);
			}
		}
		log::debug!("[markov] Merged {} contexts", other.chain.len());
	}

	fn symbol(&self, id: TokenId) -> Symbol<'_> {
		// Every stored id was interned by this model
		self.vocab.symbol(id).unwrap_or(Symbol::End)
	}

	fn resolve(&self, symbol: Symbol<'_>) -> Option<TokenId> {
		match symbol {
			Symbol::Start => Some(START),
			Symbol::End => Some(END),
			Symbol::Word(word) => self.vocab.id(word),
		}
	}

	/// Maps an id of `other` to this model's vocabulary.
	fn import(&mut self, other: &Self, id: TokenId) -> TokenId {
		match other.vocab.word(id) {
			Some(word) => self.vocab.intern(word),
			// Markers share their ids
			None => id,
		}
	}
}

impl Drop for MarkovModel {
	fn drop(&mut self) {
		log::debug!("[markov] Dropping model ({} contexts)", self.chain.len());
	}
}
