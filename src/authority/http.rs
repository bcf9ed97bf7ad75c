//! Remote introspection over HTTPS.
//!
//! The authority receives `POST token=<value>&token_type_hint=access_token` (form encoded,
//! optional HTTP Basic client credentials) and answers with an RFC 7662 style document:
//! `{"active": true, "sub": "...", "exp": 1735689600, "iat": ..., "scope": "...", "iss": "..."}`.

// crates.io
use reqwest::{
	StatusCode,
	header::{ACCEPT, HeaderMap, RETRY_AFTER},
	redirect::Policy,
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	auth::{AuthToken, IssuerId, ScopeSet, SubjectId, TokenInfo},
	authority::{
		AuthorityDescriptor, AuthorityErrorContext, AuthorityErrorKind, AuthorityFuture,
		AuthorityStrategy, DefaultAuthorityStrategy, TokenAuthority,
	},
	error::{ConfigError, TransientError, TransportError},
};

#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
	active: bool,
	sub: Option<String>,
	exp: Option<i64>,
	iat: Option<i64>,
	#[serde(default)]
	scope: Option<ScopeSet>,
	iss: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
	error: Option<String>,
	error_description: Option<String>,
}

/// [`TokenAuthority`] that asks the issuing service's introspection endpoint.
#[derive(Clone)]
pub struct HttpTokenAuthority {
	descriptor: AuthorityDescriptor,
	client: ReqwestClient,
	strategy: Arc<dyn AuthorityStrategy>,
}
impl HttpTokenAuthority {
	/// Builds an authority with its own reqwest client. Redirects are not followed.
	pub fn new(descriptor: AuthorityDescriptor) -> Result<Self> {
		let client = ReqwestClient::builder()
			.redirect(Policy::none())
			.build()
			.map_err(ConfigError::http_client_build)?;

		Ok(Self::with_client(descriptor, client))
	}

	/// Reuses a caller-provided reqwest client.
	pub fn with_client(descriptor: AuthorityDescriptor, client: ReqwestClient) -> Self {
		Self { descriptor, client, strategy: Arc::new(DefaultAuthorityStrategy) }
	}

	/// Replaces the failure classification strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn AuthorityStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Descriptor this authority was built from.
	pub fn descriptor(&self) -> &AuthorityDescriptor {
		&self.descriptor
	}

	async fn call(&self, token: &AuthToken) -> Result<TokenInfo> {
		let mut request = self
			.client
			.post(self.descriptor.introspection_endpoint.clone())
			.timeout(self.descriptor.timeout.unsigned_abs())
			.header(ACCEPT, "application/json")
			.form(&[("token", token.expose()), ("token_type_hint", "access_token")]);

		if let Some(credentials) = &self.descriptor.credentials {
			request =
				request.basic_auth(&credentials.client_id, credentials.client_secret.as_deref());
		}

		let response = request.send().await.map_err(|err| self.map_send_error(err))?;
		let status = response.status();
		let retry_after = parse_retry_after(response.headers());
		let body = response.bytes().await.map_err(TransportError::from)?;

		if !status.is_success() {
			return Err(self.map_failure(status, retry_after, &body));
		}

		parse_introspection(&body, status)
	}

	fn map_send_error(&self, err: ReqwestError) -> Error {
		if err.is_builder() {
			return ConfigError::http_client_build(err).into();
		}
		if err.is_timeout() {
			return TransientError::Timeout { timeout: self.descriptor.timeout }.into();
		}

		TransportError::from(err).into()
	}

	fn map_failure(&self, status: StatusCode, retry_after: Option<Duration>, body: &[u8]) -> Error {
		let parsed = serde_json::from_slice::<ErrorResponse>(body).unwrap_or_default();
		let mut ctx = AuthorityErrorContext::default()
			.with_http_status(status.as_u16())
			.with_body_preview(String::from_utf8_lossy(body));

		if let Some(code) = &parsed.error {
			ctx = ctx.with_error_code(code.clone());
		}

		let message = parsed
			.error_description
			.or(parsed.error)
			.unwrap_or_else(|| format!("HTTP {status}"));

		match self.strategy.classify(&ctx) {
			AuthorityErrorKind::Rejected => Error::Rejected { reason: message },
			AuthorityErrorKind::Transient => TransientError::Authority {
				message,
				status: Some(status.as_u16()),
				retry_after,
			}
			.into(),
		}
	}
}
impl TokenAuthority for HttpTokenAuthority {
	fn name(&self) -> &'static str {
		"http"
	}

	fn introspect<'a>(&'a self, token: &'a AuthToken) -> AuthorityFuture<'a, TokenInfo> {
		Box::pin(self.call(token))
	}
}
impl Debug for HttpTokenAuthority {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpTokenAuthority").field("descriptor", &self.descriptor).finish()
	}
}

fn parse_introspection(body: &[u8], status: StatusCode) -> Result<TokenInfo> {
	let deserializer = &mut serde_json::Deserializer::from_slice(body);
	let response: IntrospectionResponse = serde_path_to_error::deserialize(deserializer)
		.map_err(|source| TransientError::ResponseParse { source, status: Some(status.as_u16()) })?;

	if !response.active {
		return Err(Error::Rejected { reason: "authority reports the token as inactive".into() });
	}

	let incomplete = |message: &str| -> Error {
		TransientError::Authority {
			message: message.into(),
			status: Some(status.as_u16()),
			retry_after: None,
		}
		.into()
	};
	let subject = response
		.sub
		.as_deref()
		.and_then(|sub| SubjectId::new(sub).ok())
		.ok_or_else(|| incomplete("active token response carries no usable `sub`"))?;
	let expires_at = response
		.exp
		.and_then(|exp| OffsetDateTime::from_unix_timestamp(exp).ok())
		.ok_or_else(|| incomplete("active token response carries no usable `exp`"))?;
	let mut builder =
		TokenInfo::builder(subject).expires_at(expires_at).scopes(response.scope.unwrap_or_default());

	if let Some(iat) = response.iat {
		let issued_at = OffsetDateTime::from_unix_timestamp(iat)
			.map_err(|_| incomplete("active token response carries an out-of-range `iat`"))?;

		builder = builder.issued_at(issued_at);
	}
	if let Some(issuer) = response.iss.as_deref().and_then(|iss| IssuerId::new(iss).ok()) {
		builder = builder.issuer(issuer);
	}

	builder.build().map_err(|err| incomplete(&err.to_string()))
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(secs.into()));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::header::HeaderValue;
	use time::macros;
	// self
	use super::*;

	#[test]
	fn parses_active_response() {
		let body = br#"{"active":true,"sub":"u-9","exp":1735693200,"iat":1735689600,"scope":"video.play","iss":"classroom"}"#;
		let info = parse_introspection(body, StatusCode::OK)
			.expect("Active introspection response should parse.");

		assert_eq!(info.subject.as_ref(), "u-9");
		assert_eq!(info.issued_at, macros::datetime!(2025-01-01 00:00 UTC));
		assert_eq!(info.expires_at, macros::datetime!(2025-01-01 01:00 UTC));
		assert!(info.scopes.contains("video.play"));
		assert_eq!(info.issuer.as_deref(), Some("classroom"));
	}

	#[test]
	fn inactive_and_incomplete_responses_fail() {
		let inactive = parse_introspection(br#"{"active":false}"#, StatusCode::OK)
			.expect_err("Inactive tokens must be rejected.");

		assert!(matches!(inactive, Error::Rejected { .. }));

		let missing_exp = parse_introspection(br#"{"active":true,"sub":"u-1"}"#, StatusCode::OK)
			.expect_err("Active tokens without expiry must not validate.");

		assert!(matches!(missing_exp, Error::Transient(TransientError::Authority { .. })));

		let malformed = parse_introspection(br#"{"active":"yes"}"#, StatusCode::OK)
			.expect_err("Malformed JSON must surface as a parse error.");

		match malformed {
			Error::Transient(TransientError::ResponseParse { source, .. }) =>
				assert_eq!(source.path().to_string(), "active"),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn retry_after_accepts_seconds() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));

		assert_eq!(parse_retry_after(&headers), Some(Duration::seconds(12)));

		headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));

		assert_eq!(parse_retry_after(&headers), None);
	}
}
