use super::tokenizer::SEPARATOR;

/// Fixed-capacity output over a caller buffer.
///
/// Tokens are committed whole (separator included) or not at all, so the
/// written prefix always ends on a token boundary and on a complete
/// UTF-8 sequence.
#[derive(Debug)]
pub struct BoundedWriter<'a> {
	buf: &'a mut [u8],
	len: usize,
}

impl<'a> BoundedWriter<'a> {
	pub fn new(buf: &'a mut [u8]) -> Self {
		Self { buf, len: 0 }
	}

	pub fn capacity(&self) -> usize {
		self.buf.len()
	}

	/// Bytes written so far.
	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn remaining(&self) -> usize {
		self.buf.len() - self.len
	}

	/// Bytes `token` would take, separator included.
	pub fn cost(&self, token: &str) -> usize {
		let separator = if self.is_empty() { 0 } else { SEPARATOR.len_utf8() };
		separator + token.len()
	}

	/// Appends `token`, preceded by a separator unless it is the first one.
	///
	/// Returns false, leaving the buffer untouched, if it does not fit.
	pub fn push_token(&mut self, token: &str) -> bool {
		if self.cost(token) > self.remaining() {
			return false;
		}
		if !self.is_empty() {
			let width = SEPARATOR.len_utf8();
			SEPARATOR.encode_utf8(&mut self.buf[self.len..self.len + width]);
			self.len += width;
		}
		self.buf[self.len..self.len + token.len()].copy_from_slice(token.as_bytes());
		self.len += token.len();
		true
	}

	/// Forgets everything written.
	pub fn clear(&mut self) {
		self.len = 0;
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.buf[..self.len]
	}
}
