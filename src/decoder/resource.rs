//! URL value types produced by the decoder.

// std
use std::hash::{Hash, Hasher};
// crates.io
use serde::Serializer;
// self
use crate::_prelude::*;

/// Reasons a string is not acceptable as a media resource URL.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum UrlFormatError {
	/// Input is not a URL at all.
	#[error("URL could not be parsed: {message}.")]
	Unparsable {
		/// Parser message.
		message: String,
	},
	/// Only `http` and `https` resources are playable.
	#[error("URL scheme `{scheme}` is not supported.")]
	UnsupportedScheme {
		/// Offending scheme.
		scheme: String,
	},
	/// URL names no host.
	#[error("URL has no host.")]
	MissingHost,
}

/// Absolute `http`/`https` URL of a media resource.
///
/// The text is kept exactly as decoded (minus surrounding whitespace); the parsed form only
/// gates what is accepted.
#[derive(Clone)]
pub struct DecodedUrl {
	raw: String,
	url: Url,
}
impl DecodedUrl {
	/// Parses `raw`, rejecting anything a player could not fetch.
	pub fn parse(raw: &str) -> Result<Self, UrlFormatError> {
		let raw = raw.trim();
		let url =
			Url::parse(raw).map_err(|err| UrlFormatError::Unparsable { message: err.to_string() })?;

		if !matches!(url.scheme(), "http" | "https") {
			return Err(UrlFormatError::UnsupportedScheme { scheme: url.scheme().to_owned() });
		}
		if url.host_str().is_none_or(str::is_empty) {
			return Err(UrlFormatError::MissingHost);
		}

		Ok(Self { raw: raw.to_owned(), url })
	}

	/// Text as decoded.
	pub fn as_str(&self) -> &str {
		&self.raw
	}

	/// Parsed form; its serialization may differ from [`as_str`](Self::as_str).
	pub fn as_url(&self) -> &Url {
		&self.url
	}
}
impl PartialEq for DecodedUrl {
	fn eq(&self, other: &Self) -> bool {
		self.raw == other.raw
	}
}
impl Eq for DecodedUrl {}
impl Hash for DecodedUrl {
	fn hash<H>(&self, state: &mut H)
	where
		H: Hasher,
	{
		self.raw.hash(state);
	}
}
impl FromStr for DecodedUrl {
	type Err = UrlFormatError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}
impl Debug for DecodedUrl {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "DecodedUrl({})", self.raw)
	}
}
impl Display for DecodedUrl {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl Serialize for DecodedUrl {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(self.as_str())
	}
}

/// Signed, time-bounded URL a player can fetch.
///
/// Starts with the decoded URL's text whenever that text carried no signing parameters
/// and no fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayableUrl {
	raw: String,
	expires_at: OffsetDateTime,
}
impl PlayableUrl {
	pub(crate) fn new(raw: String, expires_at: OffsetDateTime) -> Self {
		Self { raw, expires_at }
	}

	/// String form handed to players.
	pub fn as_str(&self) -> &str {
		&self.raw
	}

	/// Instant after which media edges refuse the URL.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	/// Owned string form.
	pub fn into_string(self) -> String {
		self.raw
	}
}
impl Display for PlayableUrl {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl Serialize for PlayableUrl {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn accepts_only_fetchable_urls() {
		let url = DecodedUrl::parse("  https://CDN.example.com/v/1.m3u8?q=1 ")
			.expect("HTTPS media URL should parse.");

		assert_eq!(url.as_str(), "https://CDN.example.com/v/1.m3u8?q=1");
		assert_eq!(url.as_url().host_str(), Some("cdn.example.com"));
		assert!(matches!(
			DecodedUrl::parse("ftp://cdn.example.com/v.mp4"),
			Err(UrlFormatError::UnsupportedScheme { .. })
		));
		assert!(matches!(
			DecodedUrl::parse("not a url"),
			Err(UrlFormatError::Unparsable { .. })
		));
		assert!(DecodedUrl::parse("mailto:someone@example.com").is_err());
	}

	#[test]
	fn keeps_the_text_as_written() {
		for raw in ["https://cdn.example.com", "https://cdn.example.com/a b.mp4?x=%7e&flag"] {
			let url = DecodedUrl::parse(raw).expect("Non-canonical URL should parse.");

			assert_eq!(url.as_str(), raw);
			assert_eq!(url.to_string(), raw);
		}

		assert_ne!(
			DecodedUrl::parse("https://cdn.example.com").expect("URL should parse."),
			DecodedUrl::parse("https://cdn.example.com/").expect("URL should parse.")
		);
	}

	#[test]
	fn serializes_as_plain_string() {
		let url = DecodedUrl::parse("http://cdn.example.com/a.mp4").expect("URL should parse.");

		assert_eq!(
			serde_json::to_string(&url).expect("URL should serialize."),
			"\"http://cdn.example.com/a.mp4\""
		);
	}
}
