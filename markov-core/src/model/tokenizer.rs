/// Separator reinserted between tokens by [`join`].
pub const SEPARATOR: char = ' ';

/// Returns true for punctuation that ends a statement.
///
/// A trailing run of these characters becomes a token of its own so that
/// generation can reproduce sentence boundaries.
pub fn is_terminal(c: char) -> bool {
	matches!(c, '.' | '!' | '?' | '…' | '。' | '！' | '？')
}

/// Splits raw bytes into an ordered sequence of tokens.
///
/// - Works on exactly the given span, no terminator scanning
/// - Invalid UTF-8 is decoded lossily (U+FFFD), never rejected
/// - Splits on Unicode whitespace
/// - Detaches a trailing run of terminal punctuation from each word
///
/// Empty or whitespace-only input yields an empty sequence.
pub fn tokenize(bytes: &[u8]) -> Vec<String> {
	let text = String::from_utf8_lossy(bytes);
	let mut tokens = Vec::new();

	for word in text.split_whitespace() {
		let body = word.trim_end_matches(is_terminal);
		if body.is_empty() || body.len() == word.len() {
			// Only punctuation, or no punctuation at all
			tokens.push(word.to_owned());
		} else {
			tokens.push(body.to_owned());
			tokens.push(word[body.len()..].to_owned());
		}
	}

	tokens
}

/// Rebuilds text from tokens, with a single space between them.
///
/// Tokens are whole `str` values so the output is always valid UTF-8.
pub fn join<S: AsRef<str>>(tokens: &[S]) -> String {
	let mut out = String::new();
	for token in tokens {
		if !out.is_empty() {
			out.push(SEPARATOR);
		}
		out.push_str(token.as_ref());
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_on_whitespace() {
		assert_eq!(tokenize(b"the  cat\tsat\non"), vec!["the", "cat", "sat", "on"]);
	}

	#[test]
	fn detaches_terminal_punctuation() {
		assert_eq!(tokenize(b"Hello world."), vec!["Hello", "world", "."]);
		assert_eq!(tokenize(b"what?! no"), vec!["what", "?!", "no"]);
		assert_eq!(tokenize(b"wait ... ok"), vec!["wait", "...", "ok"]);
	}

	#[test]
	fn keeps_inner_punctuation() {
		assert_eq!(tokenize(b"e.g. v1.2 don't"), vec!["e.g", ".", "v1.2", "don't"]);
	}

	#[test]
	fn empty_and_blank_input() {
		assert!(tokenize(b"").is_empty());
		assert!(tokenize(b"  \n\t ").is_empty());
	}

	#[test]
	fn multibyte_words_survive() {
		let tokens = tokenize("héllo wörld。".as_bytes());
		assert_eq!(tokens, vec!["héllo", "wörld", "。"]);
	}

	#[test]
	fn invalid_utf8_is_replaced() {
		let tokens = tokenize(b"ok \xff\xfe bad");
		assert_eq!(tokens.len(), 3);
		assert_eq!(tokens[0], "ok");
		assert!(tokens[1].contains('\u{FFFD}'));
	}

	#[test]
	fn join_inserts_single_spaces() {
		assert_eq!(join(&["A", "B", "."]), "A B .");
		assert_eq!(join::<&str>(&[]), "");
	}

	#[test]
	fn join_after_tokenize_normalizes_spacing() {
		let tokens = tokenize(b"  one   two three!  ");
		assert_eq!(join(&tokens), "one two three !");
	}
}
