//! Time-bounded, token-bound URL signatures.
//!
//! A playable URL is the resource text followed by three query parameters:
//!
//! - `expires`: `floor(now / window) * window + ttl`, in Unix seconds.
//! - `tk`: the first 16 hex characters of SHA-256 over the token.
//! - `signature`: base64url (unpadded) HMAC-SHA256 over
//!   `resource "\n" expires "\n" tk "\n" subject`, where `resource` is the URL text with any
//!   prior signing parameters removed.
//!
//! Everything else in the resource text is kept byte for byte, so the playable URL starts
//! with the decoded one unless the latter carried signing parameters or a fragment. A
//! fragment moves behind the appended parameters.
//!
//! Rounding to the window start makes signing idempotent within one window, so players and
//! CDN caches see a stable URL for the same resource and token.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::PrimitiveDateTime;
// self
use crate::{
	_prelude::*,
	client::ValidatedToken,
	decoder::{DecodedUrl, PlayableUrl},
};

type HmacSha256 = Hmac<Sha256>;

const SIGNING_PARAMS: [&str; 3] = ["expires", "tk", "signature"];

/// Errors raised while validating [`SignerConfig`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SignerConfigError {
	/// Signing secret was empty.
	#[error("Signing secret cannot be empty.")]
	EmptySecret,
	/// Signing window must be at least one second.
	#[error("Signing window must be at least one second.")]
	NonPositiveWindow,
	/// URLs would expire before their signing window closes.
	#[error("Signed URL lifetime must not be shorter than the signing window.")]
	TtlShorterThanWindow,
	/// Lifetime exceeds [`SignerConfig::MAX_TTL`].
	#[error("Signed URL lifetime must not exceed {max}.")]
	TtlTooLong {
		/// Upper bound.
		max: Duration,
	},
}

/// Reasons a playable URL fails verification.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SignatureError {
	/// A signing parameter is absent.
	#[error("Signed URL is missing the `{name}` parameter.")]
	MissingParameter {
		/// Parameter name.
		name: &'static str,
	},
	/// `expires` is not an integer or `signature` is not base64url.
	#[error("Signed URL parameter `{name}` is malformed.")]
	MalformedParameter {
		/// Parameter name.
		name: &'static str,
	},
	/// The URL's lifetime has ended.
	#[error("Signed URL has expired.")]
	Expired,
	/// The URL was signed for a different token.
	#[error("Signed URL belongs to a different token.")]
	TokenMismatch,
	/// Signature does not match the resource and parameters.
	#[error("Signed URL signature does not match.")]
	Mismatch,
}

/// Settings for [`UrlSigner`].
#[derive(Clone)]
pub struct SignerConfig {
	secret: Vec<u8>,
	window: Duration,
	ttl: Duration,
}
impl SignerConfig {
	/// Default signing window.
	pub const DEFAULT_WINDOW: Duration = Duration::seconds(300);
	/// Default URL lifetime, counted from the start of the signing window.
	pub const DEFAULT_TTL: Duration = Duration::seconds(3_600);
	/// Longest accepted URL lifetime.
	pub const MAX_TTL: Duration = Duration::days(5 * 365);

	/// Starts a config with default window and lifetime.
	pub fn new(secret: impl Into<Vec<u8>>) -> Self {
		Self { secret: secret.into(), window: Self::DEFAULT_WINDOW, ttl: Self::DEFAULT_TTL }
	}

	/// Sets the signing window.
	pub fn window(mut self, window: Duration) -> Self {
		self.window = window;

		self
	}

	/// Sets the URL lifetime.
	pub fn ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;

		self
	}

	/// Validates the settings and builds the signer.
	pub fn build(self) -> Result<UrlSigner, SignerConfigError> {
		if self.secret.is_empty() {
			return Err(SignerConfigError::EmptySecret);
		}

		let window = self.window.whole_seconds();
		let ttl = self.ttl.whole_seconds();

		if window < 1 {
			return Err(SignerConfigError::NonPositiveWindow);
		}
		if ttl < window {
			return Err(SignerConfigError::TtlShorterThanWindow);
		}
		if self.ttl > SignerConfig::MAX_TTL {
			return Err(SignerConfigError::TtlTooLong { max: SignerConfig::MAX_TTL });
		}

		let mac =
			HmacSha256::new_from_slice(&self.secret).map_err(|_| SignerConfigError::EmptySecret)?;

		Ok(UrlSigner { mac, window, ttl })
	}
}
impl Debug for SignerConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignerConfig")
			.field("secret", &"<redacted>")
			.field("window", &self.window)
			.field("ttl", &self.ttl)
			.finish()
	}
}

/// Attaches and checks time-bounded signatures on media URLs.
#[derive(Clone)]
pub struct UrlSigner {
	mac: HmacSha256,
	window: i64,
	ttl: i64,
}
impl UrlSigner {
	/// Signing window.
	pub fn window(&self) -> Duration {
		Duration::seconds(self.window)
	}

	/// URL lifetime counted from the window start.
	pub fn ttl(&self) -> Duration {
		Duration::seconds(self.ttl)
	}

	/// Expiry stamped on URLs signed at `now`, in Unix seconds.
	pub fn expires_at(&self, now: OffsetDateTime) -> i64 {
		now.unix_timestamp().div_euclid(self.window) * self.window + self.ttl
	}

	/// Signs `url` for the validated token as of `now`.
	pub fn sign(&self, url: &DecodedUrl, token: &ValidatedToken, now: OffsetDateTime) -> PlayableUrl {
		let (head, fragment) = split_fragment(url.as_str());
		let resource = strip_signing_params(head);
		let expires = self.expires_at(now);
		let tk = token.token().fingerprint();
		let signature = URL_SAFE_NO_PAD.encode(self.digest(&resource, fragment, expires, &tk, token));
		let separator = query_separator(&resource);
		let signed =
			format!("{resource}{separator}expires={expires}&tk={tk}&signature={signature}{fragment}");
		let expires_at = OffsetDateTime::from_unix_timestamp(expires)
			.unwrap_or_else(|_| PrimitiveDateTime::MAX.assume_utc());

		PlayableUrl::new(signed, expires_at)
	}

	/// Checks that `url` was signed by this signer for `token` and is still live at `now`.
	pub fn verify(
		&self,
		url: &str,
		token: &ValidatedToken,
		now: OffsetDateTime,
	) -> Result<(), SignatureError> {
		let (head, fragment) = split_fragment(url);
		let param =
			|name: &'static str| query_param(head, name).ok_or(SignatureError::MissingParameter { name });
		let expires = param("expires")?
			.parse::<i64>()
			.map_err(|_| SignatureError::MalformedParameter { name: "expires" })?;
		let tk = param("tk")?;
		let signature = URL_SAFE_NO_PAD
			.decode(param("signature")?)
			.map_err(|_| SignatureError::MalformedParameter { name: "signature" })?;

		if now.unix_timestamp() >= expires {
			return Err(SignatureError::Expired);
		}
		if tk != token.token().fingerprint() {
			return Err(SignatureError::TokenMismatch);
		}

		let mut mac = self.mac.clone();

		mac.update(canonical(&strip_signing_params(head), fragment, expires, tk, token).as_bytes());
		mac.verify_slice(&signature).map_err(|_| SignatureError::Mismatch)
	}

	fn digest(
		&self,
		resource: &str,
		fragment: &str,
		expires: i64,
		tk: &str,
		token: &ValidatedToken,
	) -> Vec<u8> {
		let mut mac = self.mac.clone();

		mac.update(canonical(resource, fragment, expires, tk, token).as_bytes());

		mac.finalize().into_bytes().to_vec()
	}
}
impl Debug for UrlSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UrlSigner")
			.field("window", &self.window)
			.field("ttl", &self.ttl)
			.finish_non_exhaustive()
	}
}

fn canonical(
	resource: &str,
	fragment: &str,
	expires: i64,
	tk: &str,
	token: &ValidatedToken,
) -> String {
	format!("{resource}{fragment}\n{expires}\n{tk}\n{}", token.info().subject)
}

/// Splits `raw` before its `#` fragment, if any.
fn split_fragment(raw: &str) -> (&str, &str) {
	raw.find('#').map_or((raw, ""), |at| raw.split_at(at))
}

fn segment_key(segment: &str) -> &str {
	segment.split_once('=').map_or(segment, |(key, _)| key)
}

/// Drops `expires`, `tk` and `signature` segments; every other byte is kept.
fn strip_signing_params(head: &str) -> String {
	let Some((path, query)) = head.split_once('?') else {
		return head.to_owned();
	};
	let retained = query
		.split('&')
		.filter(|segment| !SIGNING_PARAMS.contains(&segment_key(segment)))
		.collect::<Vec<_>>();

	if retained.len() == query.split('&').count() {
		head.to_owned()
	} else if retained.is_empty() {
		path.to_owned()
	} else {
		format!("{path}?{}", retained.join("&"))
	}
}

fn query_separator(resource: &str) -> &'static str {
	match resource.split_once('?') {
		None => "?",
		Some((_, query)) if query.is_empty() || query.ends_with('&') => "",
		Some(_) => "&",
	}
}

fn query_param<'a>(head: &'a str, name: &str) -> Option<&'a str> {
	let (_, query) = head.split_once('?')?;

	query.split('&').find_map(|segment| match segment.split_once('=') {
		Some((key, value)) if key == name => Some(value),
		_ => None,
	})
}
