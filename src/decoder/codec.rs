//! Pluggable reversible encodings applied to media URLs before they leave the catalogue.

// crates.io
use base64::{
	Engine as _,
	engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD},
};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use hmac::{Hmac, Mac, digest::generic_array::GenericArray};
use rand::Rng;
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::AuthToken};

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type HmacSha256 = Hmac<Sha256>;

/// Reversible transformation between a plaintext URL and its opaque catalogue form.
///
/// `decode` must be deterministic and must return `None` for anything `encode` could not
/// have produced under the same token. It never returns partial output.
pub trait UrlCodec
where
	Self: Debug + Send + Sync,
{
	/// Short label for logs and configuration.
	fn name(&self) -> &'static str;

	/// Recovers the plaintext, or `None` when `input` is not a product of this codec.
	fn decode(&self, input: &str, token: &AuthToken) -> Option<String>;

	/// Produces the opaque form of `plain`; used by catalogue tooling and fixtures.
	fn encode(&self, plain: &str, token: &AuthToken) -> String;
}

/// Plain base64 obfuscation; the token plays no part.
///
/// Decoding accepts the standard and URL-safe alphabets, padded or not. Encoding emits
/// padded standard base64.
#[derive(Clone, Copy, Debug, Default)]
pub struct Base64Codec;
impl UrlCodec for Base64Codec {
	fn name(&self) -> &'static str {
		"base64"
	}

	fn decode(&self, input: &str, _: &AuthToken) -> Option<String> {
		let bytes = [STANDARD, URL_SAFE, STANDARD_NO_PAD, URL_SAFE_NO_PAD]
			.iter()
			.find_map(|engine| engine.decode(input).ok())?;

		String::from_utf8(bytes).ok()
	}

	fn encode(&self, plain: &str, _: &AuthToken) -> String {
		STANDARD.encode(plain)
	}
}

/// Token-bound authenticated encryption.
///
/// Envelope: `base64url-no-pad(iv[16] || AES-128-CBC/PKCS#7 ciphertext || HMAC-SHA256 tag[32])`,
/// the tag covering `iv || ciphertext`. Both keys derive from SHA-256 over a domain label and
/// the token, so a URL sealed for one token never opens under another.
#[derive(Clone, Copy, Debug, Default)]
pub struct SealedCodec;
impl SealedCodec {
	const IV_LEN: usize = 16;
	const BLOCK_LEN: usize = 16;
	const TAG_LEN: usize = 32;
	const ENC_LABEL: &'static [u8] = b"vidurl-broker/sealed/enc\0";
	const MAC_LABEL: &'static [u8] = b"vidurl-broker/sealed/mac\0";

	fn keys(token: &AuthToken) -> ([u8; 16], HmacSha256) {
		let enc = Sha256::new().chain_update(Self::ENC_LABEL).chain_update(token.expose()).finalize();
		let mac = Sha256::new().chain_update(Self::MAC_LABEL).chain_update(token.expose()).finalize();
		let mut enc_key = [0_u8; 16];
		// Same key HMAC would derive from the 32-byte digest: zero-padded to the block size.
		let mut mac_key = [0_u8; 64];

		enc_key.copy_from_slice(&enc[..16]);
		mac_key[..32].copy_from_slice(&mac);

		(enc_key, <HmacSha256 as Mac>::new(GenericArray::from_slice(&mac_key)))
	}
}
impl UrlCodec for SealedCodec {
	fn name(&self) -> &'static str {
		"sealed"
	}

	fn decode(&self, input: &str, token: &AuthToken) -> Option<String> {
		let envelope = URL_SAFE_NO_PAD.decode(input).ok()?;
		let min_len = Self::IV_LEN + Self::BLOCK_LEN + Self::TAG_LEN;

		if envelope.len() < min_len
			|| (envelope.len() - Self::IV_LEN - Self::TAG_LEN) % Self::BLOCK_LEN != 0
		{
			return None;
		}

		let (body, tag) = envelope.split_at(envelope.len() - Self::TAG_LEN);
		let (iv, ciphertext) = body.split_at(Self::IV_LEN);
		let (enc_key, mut mac) = Self::keys(token);

		mac.update(body);
		mac.verify_slice(tag).ok()?;

		let iv: [u8; 16] = iv.try_into().ok()?;
		let plain = Aes128CbcDec::new((&enc_key).into(), (&iv).into())
			.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
			.ok()?;

		String::from_utf8(plain).ok()
	}

	fn encode(&self, plain: &str, token: &AuthToken) -> String {
		let (enc_key, mut mac) = Self::keys(token);
		let mut iv = [0_u8; 16];

		rand::rng().fill(&mut iv);

		let ciphertext = Aes128CbcEnc::new((&enc_key).into(), (&iv).into())
			.encrypt_padded_vec_mut::<Pkcs7>(plain.as_bytes());
		let mut envelope = Vec::with_capacity(Self::IV_LEN + ciphertext.len() + Self::TAG_LEN);

		envelope.extend_from_slice(&iv);
		envelope.extend_from_slice(&ciphertext);
		mac.update(&envelope);
		envelope.extend_from_slice(&mac.finalize().into_bytes());

		URL_SAFE_NO_PAD.encode(envelope)
	}
}
