//! Word-level Markov-chain text generation behind a C ABI.
//!
//! This crate provides:
//! - A trigram text model that learns from raw text (`model`)
//! - Unconditioned ("speak") and message-seeded ("reply") generation
//!   into fixed-capacity buffers
//! - An `extern "C"` surface with opaque, poison-on-free handles (`ffi`)
//! - An owned Rust wrapper around that surface (`handle`)
//!
//! Every failure is reported as a [`MarkovError`], and as a negative errno
//! value across the ABI.

/// The text model and its building blocks.
pub mod model;

/// Error type shared by the model and the ABI.
pub mod error;

/// `extern "C"` functions: alloc, dealloc, learn, speak, reply.
pub mod ffi;

/// Owned handle over the C ABI, released on drop.
pub mod handle;

/// Corpus file loading.
///
/// Not exposed
pub(crate) mod io;

pub use error::{MarkovError, Result};
pub use handle::MarkovHandle;
pub use model::{Config, MarkovModel, Symbol};
