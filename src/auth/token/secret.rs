//! Redacted wrapper for the opaque tokens presented by requesters.

// crates.io
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Errors raised when a presented token cannot possibly be authority-issued.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenFormatError {
	/// Token was empty.
	#[error("Token is empty.")]
	Empty,
	/// Token exceeds [`AuthToken::MAX_LEN`] bytes.
	#[error("Token exceeds {max} bytes.")]
	TooLong {
		/// Maximum accepted length.
		max: usize,
	},
	/// Token contains whitespace or control characters.
	#[error("Token contains whitespace or control characters.")]
	InvalidCharacter,
}

/// Opaque provider-issued token; formatting never reveals the value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AuthToken(String);
impl AuthToken {
	/// Upper bound on accepted token length in bytes.
	pub const MAX_LEN: usize = 4096;

	/// Wraps a token without checking its shape.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Wraps a token after rejecting values no authority could have issued.
	pub fn parse(value: impl Into<String>) -> Result<Self, TokenFormatError> {
		let value = value.into();

		if value.is_empty() {
			return Err(TokenFormatError::Empty);
		}
		if value.len() > Self::MAX_LEN {
			return Err(TokenFormatError::TooLong { max: Self::MAX_LEN });
		}
		if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
			return Err(TokenFormatError::InvalidCharacter);
		}

		Ok(Self(value))
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// SHA-256 digest of the token bytes, used as key material and for fingerprints.
	pub fn digest(&self) -> [u8; 32] {
		Sha256::digest(self.0.as_bytes()).into()
	}

	/// Short, non-reversible identifier that is safe to log or embed in URLs.
	pub fn fingerprint(&self) -> String {
		self.digest()[..8].iter().map(|byte| format!("{byte:02x}")).collect()
	}
}
impl AsRef<str> for AuthToken {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for AuthToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AuthToken").field(&"<redacted>").finish()
	}
}
impl Display for AuthToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
