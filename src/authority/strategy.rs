//! Classification of failed introspection calls.
//!
//! Strategies decide whether an authority response means "this token is bad" or "the
//! authority could not answer". The token client fails closed either way; the split feeds
//! logs, metrics, and the 401-versus-500 decision of callers that need it.

// self
use crate::_prelude::*;

/// Strategy hook that maps raw authority failures onto [`AuthorityErrorKind`].
pub trait AuthorityStrategy: Send + Sync {
	/// Classifies a failed introspection response.
	fn classify(&self, ctx: &AuthorityErrorContext) -> AuthorityErrorKind;
}

/// Canonical authority failure categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorityErrorKind {
	/// Authority refused the token.
	Rejected,
	/// Failure is temporary or unrelated to the token.
	Transient,
}

/// Context passed to strategies when classifying failures.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthorityErrorContext {
	/// HTTP status code returned by the authority, when available.
	pub http_status: Option<u16>,
	/// Authority-supplied `error` field.
	pub error_code: Option<String>,
	/// Preview of the response body.
	pub body_preview: Option<String>,
}
impl AuthorityErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the authority's error code string.
	pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
		self.error_code = Some(code.into());

		self
	}

	/// Adds a truncated body preview.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}
}

/// Default strategy: structured error codes first, then body hints, then the status code.
#[derive(Debug, Default)]
pub struct DefaultAuthorityStrategy;
impl AuthorityStrategy for DefaultAuthorityStrategy {
	fn classify(&self, ctx: &AuthorityErrorContext) -> AuthorityErrorKind {
		if let Some(kind) = ctx.error_code.as_deref().and_then(match_error_code) {
			return kind;
		}
		if let Some(kind) = classify_body(ctx.body_preview.as_deref()) {
			return kind;
		}

		classify_status(ctx.http_status)
	}
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= AuthorityErrorContext::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = body.chars().take(AuthorityErrorContext::BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

fn match_error_code(value: &str) -> Option<AuthorityErrorKind> {
	const REJECTED: [&str; 5] =
		["invalid_token", "expired_token", "revoked_token", "invalid_request", "access_denied"];
	const TRANSIENT: [&str; 2] = ["temporarily_unavailable", "server_error"];

	if REJECTED.iter().any(|code| value.eq_ignore_ascii_case(code)) {
		Some(AuthorityErrorKind::Rejected)
	} else if TRANSIENT.iter().any(|code| value.eq_ignore_ascii_case(code)) {
		Some(AuthorityErrorKind::Transient)
	} else {
		None
	}
}

fn classify_body(body: Option<&str>) -> Option<AuthorityErrorKind> {
	let lowered = body?.to_ascii_lowercase();

	if ["invalid_token", "expired", "revoked"].iter().any(|hint| lowered.contains(hint)) {
		Some(AuthorityErrorKind::Rejected)
	} else if lowered.contains("temporarily_unavailable") || lowered.contains("retry") {
		Some(AuthorityErrorKind::Transient)
	} else {
		None
	}
}

fn classify_status(status: Option<u16>) -> AuthorityErrorKind {
	match status {
		Some(400 | 401 | 403 | 404 | 410) => AuthorityErrorKind::Rejected,
		_ => AuthorityErrorKind::Transient,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn error_codes_win_over_status() {
		let strategy = DefaultAuthorityStrategy;
		let ctx = AuthorityErrorContext::default()
			.with_http_status(503)
			.with_error_code("invalid_token");

		assert_eq!(strategy.classify(&ctx), AuthorityErrorKind::Rejected);

		let ctx = AuthorityErrorContext::default()
			.with_http_status(400)
			.with_error_code("temporarily_unavailable");

		assert_eq!(strategy.classify(&ctx), AuthorityErrorKind::Transient);
	}

	#[test]
	fn falls_back_to_body_then_status() {
		let strategy = DefaultAuthorityStrategy;

		assert_eq!(
			strategy.classify(
				&AuthorityErrorContext::default().with_body_preview("Token has EXPIRED")
			),
			AuthorityErrorKind::Rejected
		);
		assert_eq!(
			strategy.classify(&AuthorityErrorContext::default().with_http_status(401)),
			AuthorityErrorKind::Rejected
		);
		assert_eq!(
			strategy.classify(&AuthorityErrorContext::default().with_http_status(502)),
			AuthorityErrorKind::Transient
		);
		assert_eq!(
			strategy.classify(
				&AuthorityErrorContext::default().with_http_status(503).with_body_preview("maintenance")
			),
			AuthorityErrorKind::Transient
		);
	}

	#[test]
	fn body_preview_is_truncated() {
		let ctx = AuthorityErrorContext::default().with_body_preview("x".repeat(1_000));
		let preview = ctx.body_preview.expect("Preview should be recorded.");

		assert_eq!(preview.chars().count(), AuthorityErrorContext::BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
	}
}
