//! URL decoder: recover a media URL from its catalogue form, then sign it for playback.
//!
//! Decoding and signing are independent. [`UrlDecoder::decode_url`] only needs the raw
//! token, because the codec may derive key material from it, and reports failure as `None`.
//! [`UrlDecoder::generate_playable_url`] needs a [`ValidatedToken`], so a playable URL cannot
//! be minted for a token the [`TokenClient`](crate::client::TokenClient) did not accept.

pub mod codec;
pub mod resource;
pub mod signer;

pub use codec::*;
pub use resource::*;
pub use signer::*;

// self
use crate::{
	_prelude::*,
	auth::AuthToken,
	client::ValidatedToken,
	clock::{Clock, SystemClock},
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// Decodes catalogue URLs and signs them into playable links.
#[derive(Clone)]
pub struct UrlDecoder {
	codec: Arc<dyn UrlCodec>,
	signer: UrlSigner,
	clock: Arc<dyn Clock>,
}
impl UrlDecoder {
	/// Creates a decoder over `codec` that signs with `signer` against the system clock.
	pub fn new(codec: Arc<dyn UrlCodec>, signer: UrlSigner) -> Self {
		Self { codec, signer, clock: Arc::new(SystemClock) }
	}

	/// Replaces the clock used for signing windows and timestamps.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Codec in use.
	pub fn codec(&self) -> &dyn UrlCodec {
		self.codec.as_ref()
	}

	/// Signer in use.
	pub fn signer(&self) -> &UrlSigner {
		&self.signer
	}

	/// Reverses the codec for `encrypted_url` under `token`.
	///
	/// Surrounding whitespace is ignored. The recovered text is returned as is, not
	/// normalized. Returns `None` when the input is not a codec product under this token or
	/// when the recovered text is not an absolute `http`/`https` URL.
	pub fn decode_url(&self, encrypted_url: &str, token: &AuthToken) -> Option<DecodedUrl> {
		let span = OpSpan::for_token(OpKind::Decode, "decode_url", token);
		let _guard = span.entered();

		obs::record_op_outcome(OpKind::Decode, OpOutcome::Attempt);

		let decoded = self
			.codec
			.decode(encrypted_url.trim(), token)
			.and_then(|plain| DecodedUrl::parse(&plain).ok());

		obs::record_op_outcome(OpKind::Decode, OpOutcome::from_success(decoded.is_some()));

		if decoded.is_none() {
			span.fail(&format_args!("not a {} codec product", self.codec.name()));
		}

		decoded
	}

	/// Signs `decoded_url` for `token` at the decoder's current instant.
	pub fn generate_playable_url(
		&self,
		decoded_url: &DecodedUrl,
		token: &ValidatedToken,
	) -> PlayableUrl {
		let _guard =
			OpSpan::for_token(OpKind::Sign, "generate_playable_url", token.token()).entered();
		let playable = self.signer.sign(decoded_url, token, self.clock.now());

		obs::record_op_outcome(OpKind::Sign, OpOutcome::Success);

		playable
	}

	/// Decodes and signs in one step.
	pub fn resolve(&self, encrypted_url: &str, token: &ValidatedToken) -> Option<Resolved> {
		let decoded = self.decode_url(encrypted_url, token.token())?;
		let playable = self.generate_playable_url(&decoded, token);

		Some(Resolved { decoded, playable })
	}

	/// Current instant according to the decoder's clock.
	pub fn get_timestamp(&self) -> OffsetDateTime {
		self.clock.now()
	}
}
impl Debug for UrlDecoder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UrlDecoder")
			.field("codec", &self.codec.name())
			.field("signer", &self.signer)
			.finish()
	}
}

/// Decoded URL together with its signed form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
	/// Plain resource URL.
	pub decoded: DecodedUrl,
	/// Signed, time-bounded URL.
	pub playable: PlayableUrl,
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		auth::{SubjectId, TokenInfo},
		clock::FixedClock,
	};

	const URL: &str = "https://cdn.example.com/course/7/lesson-3.m3u8";

	fn validated(token: &str) -> ValidatedToken {
		let info = TokenInfo::builder(SubjectId::new("u-42").expect("Subject fixture should be valid."))
			.expires_at(macros::datetime!(2030-01-01 00:00 UTC))
			.build()
			.expect("Token info fixture should build.");

		ValidatedToken::new(AuthToken::new(token), info)
	}

	fn decoder(codec: Arc<dyn UrlCodec>, clock: Arc<FixedClock>) -> UrlDecoder {
		let signer = SignerConfig::new("edge-secret").build().expect("Signer should build.");

		UrlDecoder::new(codec, signer).with_clock(clock)
	}

	#[test]
	fn decode_rejects_non_urls_and_ignores_whitespace() {
		let clock = Arc::new(FixedClock::new(macros::datetime!(2025-01-01 00:00 UTC)));
		let decoder = decoder(Arc::new(Base64Codec), clock);
		let token = AuthToken::new("tok");
		let encoded = Base64Codec.encode(URL, &token);

		assert_eq!(
			decoder.decode_url(&format!("  {encoded}\n"), &token).map(|url| url.to_string()),
			Some(URL.to_owned())
		);
		assert_eq!(decoder.decode_url(&Base64Codec.encode("just text", &token), &token), None);
		assert_eq!(decoder.decode_url(&Base64Codec.encode("ftp://x.example/a", &token), &token), None);
		assert_eq!(decoder.decode_url("", &token), None);
	}

	#[test]
	fn decoded_text_matches_the_encoded_plaintext() {
		let clock = Arc::new(FixedClock::new(macros::datetime!(2025-01-01 00:00 UTC)));
		let decoder = decoder(Arc::new(Base64Codec), clock);
		let token = validated("tok");

		for plain in ["https://cdn.example.com", "https://CDN.Example.com/Lesson%201.mp4?sig=a/b="] {
			let resolved = decoder
				.resolve(&Base64Codec.encode(plain, token.token()), &token)
				.expect("Non-canonical URL should resolve.");

			assert_eq!(resolved.decoded.as_str(), plain);
			assert!(resolved.playable.as_str().starts_with(&format!("{plain}?expires=")));
		}
	}

	#[test]
	fn golden_playable_url_with_frozen_clock() {
		let clock = Arc::new(FixedClock::new(macros::datetime!(2025-01-01 00:02:30 UTC)));
		let decoder = decoder(Arc::new(Base64Codec), clock.clone());
		let token = validated("tok-golden");
		let decoded = DecodedUrl::parse(URL).expect("Golden URL should parse.");
		let first = decoder.generate_playable_url(&decoded, &token);
		let second = decoder.generate_playable_url(&decoded, &token);

		assert_eq!(first, second);
		assert!(first.as_str().starts_with(&format!("{URL}?expires=1735693200&tk=")));
		assert_eq!(first.expires_at(), macros::datetime!(2025-01-01 01:00 UTC));

		clock.advance(Duration::seconds(150));

		let third = decoder.generate_playable_url(&decoded, &token);

		assert_ne!(first, third);
		assert_eq!(decoder.signer().verify(third.as_str(), &token, decoder.get_timestamp()), Ok(()));
	}

	#[test]
	fn sealed_round_trip_binds_to_token() {
		let clock = Arc::new(FixedClock::new(macros::datetime!(2025-01-01 00:00 UTC)));
		let decoder = decoder(Arc::new(SealedCodec), clock);
		let alice = validated("alice-token");
		let sealed = SealedCodec.encode(URL, alice.token());
		let resolved = decoder.resolve(&sealed, &alice).expect("Sealed URL should resolve.");

		assert_eq!(resolved.decoded.as_str(), URL);
		assert!(resolved.playable.as_str().starts_with(URL));
		assert_eq!(decoder.decode_url(&sealed, &AuthToken::new("mallory-token")), None);
	}
}
