use std::env;

use crate::error::{MarkovError, Result};

/// Chain order: number of preceding tokens in a context key (trigram model).
///
/// Compiled in; the C ABI has no way to choose it.
pub const ORDER: usize = 2;

/// Default upper bound on sampling steps per generation.
pub const DEFAULT_MAX_STEPS: usize = 1 << 16;

/// Environment variable holding a fixed RNG seed.
pub const SEED_VAR: &str = "MARKOV_SEED";

/// Environment variable overriding [`DEFAULT_MAX_STEPS`].
pub const MAX_STEPS_VAR: &str = "MARKOV_MAX_STEPS";

/// Generation parameters of one model instance.
///
/// # Invariants
/// - `max_steps` is strictly positive
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
	/// Fixed RNG seed (`None` seeds from the OS).
	seed: Option<u64>,

	/// Safety net against endless walks. Output capacity is the real bound.
	max_steps: usize,
}

impl Default for Config {
	fn default() -> Self {
		Self { seed: None, max_steps: DEFAULT_MAX_STEPS }
	}
}

impl Config {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a configuration from `MARKOV_SEED` and `MARKOV_MAX_STEPS`.
	///
	/// Unset variables keep their default; invalid ones are logged and ignored.
	pub fn from_env() -> Self {
		let mut config = Self::default();

		if let Ok(value) = env::var(SEED_VAR) {
			match value.trim().parse::<u64>() {
				Ok(seed) => config.seed = Some(seed),
				Err(_) => log::warn!("[markov] Ignoring {SEED_VAR}={value:?}: not an unsigned integer"),
			}
		}

		if let Ok(value) = env::var(MAX_STEPS_VAR) {
			let parsed = value
				.trim()
				.parse::<usize>()
				.map_err(|e| MarkovError::InvalidConfig(e.to_string()))
				.and_then(|steps| config.set_max_steps(steps));
			if let Err(e) = parsed {
				log::warn!("[markov] Ignoring {MAX_STEPS_VAR}={value:?}: {e}");
			}
		}

		config
	}

	pub fn seed(&self) -> Option<u64> {
		self.seed
	}

	/// Fixes the RNG seed for reproducible generation.
	pub fn set_seed(&mut self, seed: Option<u64>) {
		self.seed = seed;
	}

	pub fn max_steps(&self) -> usize {
		self.max_steps
	}

	/// Sets the sampling step limit.
	///
	/// # Errors
	/// Returns an error if `max_steps` is zero.
	pub fn set_max_steps(&mut self, max_steps: usize) -> Result<()> {
		if max_steps == 0 {
			return Err(MarkovError::InvalidConfig("max_steps must be > 0".to_owned()));
		}
		self.max_steps = max_steps;
		Ok(())
	}
}
