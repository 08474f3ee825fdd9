//! Redacting wrapper for bearer tokens presented by callers.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Bearer token presented by a caller; redacted in `Debug` and `Display` output.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AccessToken(String);
impl AccessToken {
	/// Wraps a new token value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Stable base64 (no padding) SHA-256 digest of the token, safe to log or use as a key.
	pub fn fingerprint(&self) -> String {
		fingerprint(self.0.as_bytes())
	}
}
impl AsRef<str> for AccessToken {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl From<&str> for AccessToken {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl From<String> for AccessToken {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AccessToken").field(&"<redacted>").finish()
	}
}
impl Display for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

pub(crate) fn fingerprint(bytes: &[u8]) -> String {
	let mut hasher = Sha256::new();

	hasher.update(bytes);

	STANDARD_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn token_formatters_redact() {
		let token = AccessToken::new("abc123");

		assert_eq!(format!("{token:?}"), "AccessToken(\"<redacted>\")");
		assert_eq!(format!("{token}"), "<redacted>");
		assert_eq!(token.expose(), "abc123");
	}

	#[test]
	fn fingerprint_is_stable_and_hides_value() {
		let lhs = AccessToken::new("abc123");
		let rhs = AccessToken::from("abc123");

		assert_eq!(lhs.fingerprint(), rhs.fingerprint());
		assert_ne!(lhs.fingerprint(), AccessToken::new("abc124").fingerprint());
		assert!(!lhs.fingerprint().contains("abc123"));
		assert_eq!(lhs.fingerprint().len(), 43);
	}
}
