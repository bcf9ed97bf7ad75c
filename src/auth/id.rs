//! Identifiers carried inside token claims.
//!
//! Subjects end up in the newline-delimited canonical string that playable URL signatures
//! cover, so no identifier may contain control characters.

// std
use std::ops::Deref;
// self
use crate::_prelude::*;

const MAX_LEN: usize = 256;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentifierError {
	/// Blank after trimming.
	#[error("{kind} identifier cannot be blank.")]
	Blank {
		/// `subject` or `issuer`.
		kind: &'static str,
	},
	/// Contains a control character.
	#[error("{kind} identifier contains control characters.")]
	ContainsControl {
		/// `subject` or `issuer`.
		kind: &'static str,
	},
	/// Longer than the byte limit.
	#[error("{kind} identifier exceeds {max} bytes.")]
	TooLong {
		/// `subject` or `issuer`.
		kind: &'static str,
		/// Byte limit.
		max: usize,
	},
}

fn check(kind: &'static str, value: &str) -> Result<(), IdentifierError> {
	if value.trim().is_empty() {
		Err(IdentifierError::Blank { kind })
	} else if value.chars().any(char::is_control) {
		Err(IdentifierError::ContainsControl { kind })
	} else if value.len() > MAX_LEN {
		Err(IdentifierError::TooLong { kind, max: MAX_LEN })
	} else {
		Ok(())
	}
}

macro_rules! claim_id {
	($(#[$meta:meta])* $name:ident => $kind:literal) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Validates and wraps `value`.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				Self::try_from(value.into())
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				check($kind, &value).map(|()| Self(value))
			}
		}
		impl From<$name> for String {
			fn from(id: $name) -> Self {
				id.0
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}({:?})", stringify!($name), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

claim_id! {
	/// `sub` claim: the account a token was issued to.
	SubjectId => "subject"
}
claim_id! {
	/// `iss` claim: the service that issued a token.
	IssuerId => "issuer"
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn subjects_cannot_smuggle_line_breaks() {
		assert_eq!(SubjectId::new(" "), Err(IdentifierError::Blank { kind: "subject" }));
		assert_eq!(
			SubjectId::new("u-1\nexpires"),
			Err(IdentifierError::ContainsControl { kind: "subject" })
		);

		let subject = SubjectId::new("student 42").expect("Inner spaces are allowed.");

		assert_eq!(&*subject, "student 42");
		assert_eq!(format!("{subject:?}"), "SubjectId(\"student 42\")");
	}

	#[test]
	fn deserialization_runs_the_same_checks() {
		let issuer: IssuerId = serde_json::from_str("\"https://auth.example.com\"")
			.expect("Issuer should deserialize.");

		assert_eq!(issuer.to_string(), "https://auth.example.com");
		assert!(serde_json::from_str::<SubjectId>("\"\"").is_err());
		assert!(IssuerId::new("a".repeat(MAX_LEN)).is_ok());
		assert!(IssuerId::new("a".repeat(MAX_LEN + 1)).is_err());
	}
}
