use std::collections::TryReserveError;

use libc::c_int;
use thiserror::Error;

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, MarkovError>;

/// Every failure the model or its C ABI can report.
///
/// Each variant maps to an errno value; the ABI returns it negated.
#[derive(Error, Debug)]
pub enum MarkovError {
	/// An internal table (or the handle itself) could not be grown.
	#[error("allocation failure")]
	AllocationFailure,

	/// Null, unknown or already deallocated handle.
	#[error("invalid handle")]
	InvalidHandle,

	/// The output buffer cannot hold even the first generated token.
	#[error("buffer too small: {needed} bytes needed, capacity is {capacity}")]
	BufferTooSmall { needed: usize, capacity: usize },

	/// Nothing to generate from (untrained model, or the step limit was hit).
	#[error("no data to generate from")]
	NoData,

	/// Malformed byte span, e.g. a null pointer with a non-zero length.
	#[error("invalid input: {0}")]
	InvalidInput(&'static str),

	/// Rejected configuration value.
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// The OS entropy source needed to seed the RNG failed.
	#[error("random source unavailable: {0}")]
	RandomSource(String),

	/// Corpus file could not be read.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl MarkovError {
	/// Positive errno value for this error.
	pub fn errno(&self) -> c_int {
		match self {
			Self::AllocationFailure => libc::ENOMEM,
			Self::InvalidHandle => libc::EBADF,
			Self::BufferTooSmall { .. } => libc::ENOBUFS,
			Self::NoData => libc::ENODATA,
			Self::InvalidInput(_) | Self::InvalidConfig(_) => libc::EINVAL,
			Self::RandomSource(_) | Self::Io(_) => libc::EIO,
		}
	}

	/// Negative value returned through the C ABI.
	pub fn code(&self) -> c_int {
		-self.errno()
	}

	/// Rebuilds an error from a negative ABI return value.
	///
	/// Details lost at the boundary (buffer sizes, messages) are not recovered.
	/// Returns `None` for non-negative values.
	pub fn from_code(code: c_int) -> Option<Self> {
		if code >= 0 {
			return None;
		}
		let error = match -code {
			libc::ENOMEM => Self::AllocationFailure,
			libc::EBADF => Self::InvalidHandle,
			libc::ENOBUFS => Self::BufferTooSmall { needed: 0, capacity: 0 },
			libc::ENODATA => Self::NoData,
			libc::EINVAL => Self::InvalidInput("rejected by the model"),
			errno => Self::Io(std::io::Error::from_raw_os_error(errno)),
		};
		Some(error)
	}
}

impl From<TryReserveError> for MarkovError {
	fn from(_: TryReserveError) -> Self {
		Self::AllocationFailure
	}
}
