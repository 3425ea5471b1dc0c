//! Word-level Markov text model.
//!
//! This module provides:
//! - Tokenization and detokenization (`tokenizer`)
//! - The chain store and its per-context states (internal)
//! - Generation over a bounded output buffer (`writer`, internal generator)
//! - The model itself (`MarkovModel`) and its configuration (`config`)

/// The model: learning, speaking, replying, merging.
pub mod markov_model;

/// Chain order and generation parameters.
pub mod config;

/// Whitespace/punctuation tokenizer and its inverse.
pub mod tokenizer;

/// Fixed-capacity output shared by speak and reply.
pub mod writer;

/// Token interning and the start/end markers.
///
/// Only `Symbol` is exposed publicly.
mod vocabulary;

/// Context keys and the store mapping them to successor counts.
mod chain;

/// Successor distribution of a single context.
mod state;

/// Random walk over the chain.
mod generator;

pub use config::Config;
pub use markov_model::MarkovModel;
pub use vocabulary::Symbol;
