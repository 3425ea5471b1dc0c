use std::ptr;

use libc::{c_int, c_uint, c_void};

use crate::error::{MarkovError, Result};
use crate::ffi;

/// Owned model handle, driven through the C ABI.
///
/// This is what a foreign caller does with the raw functions, packaged so
/// that release is guaranteed: [`MarkovHandle::close`] can be called any
/// number of times and `Drop` calls it on every exit path.
///
/// Not `Send`: one handle, one owner.
#[derive(Debug)]
pub struct MarkovHandle {
	raw: *mut c_void,
}

impl MarkovHandle {
	/// Allocates a new model.
	///
	/// # Errors
	/// `AllocationFailure` if the library returned a null handle.
	pub fn new() -> Result<Self> {
		let raw = ffi::markov_alloc();
		if raw.is_null() {
			return Err(MarkovError::AllocationFailure);
		}
		Ok(Self { raw })
	}

	/// True once [`MarkovHandle::close`] succeeded.
	pub fn is_closed(&self) -> bool {
		self.raw.is_null()
	}

	/// Learns `text`.
	pub fn learn(&mut self, text: &[u8]) -> Result<()> {
		let len = span_len(text.len())?;
		// SAFETY: `text` is valid for `len` bytes
		let rv = unsafe { ffi::markov_learn(self.raw, text.as_ptr(), len) };
		check(rv).map(|_| ())
	}

	/// Generates at most `capacity` bytes of text.
	pub fn speak(&mut self, capacity: usize) -> Result<Vec<u8>> {
		let mut buf = vec![0u8; capacity];
		let len = capped_len(buf.len());
		// SAFETY: `buf` is valid for `len` bytes
		let rv = unsafe { ffi::markov_speak(self.raw, buf.as_mut_ptr(), len) };
		buf.truncate(check(rv)?);
		Ok(buf)
	}

	/// Generates a reply to `message`, at most `capacity` bytes.
	pub fn reply(&mut self, message: &[u8], capacity: usize) -> Result<Vec<u8>> {
		let ilen = span_len(message.len())?;
		let mut buf = vec![0u8; capacity];
		let olen = capped_len(buf.len());
		// SAFETY: both spans are valid for their lengths and distinct
		let rv = unsafe { ffi::markov_reply(self.raw, message.as_ptr(), ilen, buf.as_mut_ptr(), olen) };
		buf.truncate(check(rv)?);
		Ok(buf)
	}

	/// Releases the model. Later calls are no-ops.
	pub fn close(&mut self) -> Result<()> {
		if self.raw.is_null() {
			return Ok(());
		}
		let rv = ffi::markov_dealloc(self.raw);
		self.raw = ptr::null_mut();
		check(rv).map(|_| ())
	}
}

impl Drop for MarkovHandle {
	fn drop(&mut self) {
		if let Err(e) = self.close() {
			log::warn!("[markov] Failed to release handle: {e}");
		}
	}
}

/// Input lengths must fit the ABI exactly: truncating would change the text.
fn span_len(len: usize) -> Result<c_uint> {
	c_uint::try_from(len).map_err(|_| MarkovError::InvalidInput("input longer than the ABI allows"))
}

/// Output capacity may be reduced: the model writes less, never more.
fn capped_len(len: usize) -> c_uint {
	c_uint::try_from(len).unwrap_or(c_uint::MAX)
}

fn check(rv: c_int) -> Result<usize> {
	match MarkovError::from_code(rv) {
		Some(e) => Err(e),
		None => Ok(rv as usize),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lifecycle() {
		let mut handle = MarkovHandle::new().unwrap();
		handle.learn(b"hello handle world.").unwrap();
		assert_eq!(handle.speak(256).unwrap(), b"hello handle world .");
		assert_eq!(handle.reply(b"say hello", 256).unwrap(), b"handle world .");
		handle.close().unwrap();
		assert!(handle.is_closed());
		// Idempotent
		handle.close().unwrap();
	}

	#[test]
	fn closed_handle_reports_invalid() {
		let mut handle = MarkovHandle::new().unwrap();
		handle.close().unwrap();
		assert!(matches!(handle.speak(16), Err(MarkovError::InvalidHandle)));
		assert!(matches!(handle.learn(b"x"), Err(MarkovError::InvalidHandle)));
	}

	#[test]
	fn errors_cross_the_boundary() {
		let mut handle = MarkovHandle::new().unwrap();
		assert!(matches!(handle.speak(64), Err(MarkovError::NoData)));
		handle.learn(b"lengthy").unwrap();
		assert!(matches!(handle.speak(2), Err(MarkovError::BufferTooSmall { .. })));
	}
}
