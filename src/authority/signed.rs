//! Local verification of self-describing, HMAC-signed tokens.
//!
//! Token layout: `base64url(claims-json) "." base64url(HMAC-SHA256(key, base64url(claims-json)))`,
//! both segments unpadded. The issuing side and this verifier share `key`.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
// self
use crate::{
	_prelude::*,
	auth::{AuthToken, IssuerId, ScopeSet, SubjectId, TokenFormatError, TokenInfo},
	authority::{AuthorityFuture, TokenAuthority},
	error::ConfigError,
};

type HmacSha256 = Hmac<Sha256>;

/// Claims embedded in a signed token. Instants are Unix seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedClaims {
	/// Subject identifier.
	pub sub: String,
	/// Expiry.
	pub exp: i64,
	/// Issued-at.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iat: Option<i64>,
	/// Space-delimited scopes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
	/// Issuer.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iss: Option<String>,
}

/// [`TokenAuthority`] that verifies signed claims without a network round trip.
#[derive(Clone)]
pub struct SignedTokenAuthority {
	mac: HmacSha256,
}
impl SignedTokenAuthority {
	/// Creates a verifier for tokens signed with `key`.
	pub fn new(key: impl AsRef<[u8]>) -> Result<Self, ConfigError> {
		let key = key.as_ref();

		if key.is_empty() {
			return Err(ConfigError::EmptyVerificationKey);
		}

		let mac = HmacSha256::new_from_slice(key).map_err(|_| ConfigError::EmptyVerificationKey)?;

		Ok(Self { mac })
	}

	/// Issues a token for `claims`; meant for the issuing service and its test harnesses.
	pub fn mint(&self, claims: &SignedClaims) -> Result<AuthToken> {
		let json = serde_json::to_vec(claims).map_err(|err| Error::Rejected {
			reason: format!("claims could not be encoded: {err}"),
		})?;
		let payload = URL_SAFE_NO_PAD.encode(json);
		let signature = URL_SAFE_NO_PAD.encode(self.sign(payload.as_bytes()));

		Ok(AuthToken::new(format!("{payload}.{signature}")))
	}

	fn sign(&self, payload: &[u8]) -> Vec<u8> {
		let mut mac = self.mac.clone();

		mac.update(payload);

		mac.finalize().into_bytes().to_vec()
	}

	fn verify(&self, token: &AuthToken) -> Result<TokenInfo> {
		let (payload, signature) =
			token.expose().split_once('.').ok_or(TokenFormatError::InvalidCharacter)?;
		let signature = URL_SAFE_NO_PAD
			.decode(signature)
			.map_err(|_| Error::Rejected { reason: "signature is not base64url".into() })?;
		let mut mac = self.mac.clone();

		mac.update(payload.as_bytes());
		mac.verify_slice(&signature)
			.map_err(|_| Error::Rejected { reason: "signature mismatch".into() })?;

		let json = URL_SAFE_NO_PAD
			.decode(payload)
			.map_err(|_| Error::Rejected { reason: "claims are not base64url".into() })?;
		let claims: SignedClaims = serde_json::from_slice(&json)
			.map_err(|err| Error::Rejected { reason: format!("claims are malformed: {err}") })?;

		claims_to_info(claims)
	}
}
impl TokenAuthority for SignedTokenAuthority {
	fn name(&self) -> &'static str {
		"signed"
	}

	fn introspect<'a>(&'a self, token: &'a AuthToken) -> AuthorityFuture<'a, TokenInfo> {
		let verdict = self.verify(token);

		Box::pin(async move { verdict })
	}
}
impl Debug for SignedTokenAuthority {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("SignedTokenAuthority(..)")
	}
}

fn claims_to_info(claims: SignedClaims) -> Result<TokenInfo> {
	let reject = |reason: String| Error::Rejected { reason };
	let subject = SubjectId::new(&claims.sub).map_err(|err| reject(err.to_string()))?;
	let expires_at = OffsetDateTime::from_unix_timestamp(claims.exp)
		.map_err(|_| reject("`exp` is out of range".into()))?;
	let scopes = ScopeSet::from_str(claims.scope.as_deref().unwrap_or_default())
		.map_err(|err| reject(err.to_string()))?;
	let mut builder = TokenInfo::builder(subject).expires_at(expires_at).scopes(scopes);

	if let Some(iat) = claims.iat {
		builder = builder.issued_at(
			OffsetDateTime::from_unix_timestamp(iat)
				.map_err(|_| reject("`iat` is out of range".into()))?,
		);
	}
	if let Some(iss) = claims.iss {
		builder = builder.issuer(IssuerId::new(iss).map_err(|err| reject(err.to_string()))?);
	}

	builder.build().map_err(|err| reject(err.to_string()))
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn claims() -> SignedClaims {
		SignedClaims {
			sub: "u-77".into(),
			exp: macros::datetime!(2025-06-01 00:00 UTC).unix_timestamp(),
			iat: Some(macros::datetime!(2025-05-31 00:00 UTC).unix_timestamp()),
			scope: Some("video.play course.read".into()),
			iss: Some("classroom".into()),
		}
	}

	#[tokio::test]
	async fn minted_tokens_verify() {
		let authority =
			SignedTokenAuthority::new("shared-key").expect("Verifier should accept a key.");
		let token = authority.mint(&claims()).expect("Minting should succeed.");
		let info = authority.introspect(&token).await.expect("Minted token should verify.");

		assert_eq!(info.subject.as_ref(), "u-77");
		assert_eq!(info.expires_at, macros::datetime!(2025-06-01 00:00 UTC));
		assert_eq!(info.scopes.normalized(), "course.read video.play");
		assert!(AuthToken::parse(token.expose()).is_ok(), "Minted tokens must be well formed.");
	}

	#[tokio::test]
	async fn forged_or_foreign_tokens_are_rejected() {
		let authority = SignedTokenAuthority::new("shared-key").expect("Verifier should build.");
		let other = SignedTokenAuthority::new("other-key").expect("Verifier should build.");
		let foreign = other.mint(&claims()).expect("Minting should succeed.");
		let err = authority.introspect(&foreign).await.expect_err("Foreign key must not verify.");

		assert!(err.is_rejection());

		let token = authority.mint(&claims()).expect("Minting should succeed.");
		let (_, signature) =
			token.expose().split_once('.').expect("Minted tokens carry two segments.");
		let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"admin","exp":4102444800}"#);
		let forged = AuthToken::new(format!("{forged_payload}.{signature}"));

		assert!(authority.introspect(&forged).await.is_err());
		assert!(authority.introspect(&AuthToken::new("no-dot")).await.is_err());
		assert!(authority.introspect(&AuthToken::new("a.b.c")).await.is_err());
	}

	#[test]
	fn empty_key_is_a_config_error() {
		assert!(matches!(SignedTokenAuthority::new(""), Err(ConfigError::EmptyVerificationKey)));
	}
}
