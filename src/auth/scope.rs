//! Scope sets granted to a token.

// std
use std::collections::BTreeSet;
// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError};
// self
use crate::_prelude::*;

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entry.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scope with embedded whitespace.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// Offending entry.
		scope: String,
	},
}

/// Sorted, deduplicated scopes.
///
/// Introspection endpoints report `scope` as a space-delimited string while signed claims
/// may carry an array; deserialization accepts both. Serialization always emits an array.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScopeSet(Vec<String>);
impl ScopeSet {
	/// Builds a set from individual entries.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut set = BTreeSet::new();

		for scope in scopes.into_iter().map(Into::into) {
			if scope.is_empty() {
				return Err(ScopeValidationError::Empty);
			}
			if scope.contains(char::is_whitespace) {
				return Err(ScopeValidationError::ContainsWhitespace { scope });
			}

			set.insert(scope);
		}

		Ok(Self(set.into_iter().collect()))
	}

	/// Whether no scope was granted.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Whether `scope` was granted.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.binary_search_by(|granted| granted.as_str().cmp(scope)).is_ok()
	}

	/// Granted scopes in sorted order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	/// Space-delimited form.
	pub fn normalized(&self) -> String {
		self.0.join(" ")
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	/// Parses the space-delimited form. `""` is the empty set; a blank string is an error.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"" => Ok(Self::default()),
			s if s.trim().is_empty() => Err(ScopeValidationError::Empty),
			s => Self::new(s.split_whitespace()),
		}
	}
}
impl Serialize for ScopeSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.collect_seq(self.iter())
	}
}
impl<'de> Deserialize<'de> for ScopeSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Wire {
			Delimited(String),
			List(Vec<String>),
		}

		match Wire::deserialize(deserializer)? {
			Wire::Delimited(raw) => raw.parse::<Self>(),
			Wire::List(values) => Self::new(values),
		}
		.map_err(DeError::custom)
	}
}
