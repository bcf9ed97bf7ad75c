//! JSON bodies returned by the HTTP surface.

// crates.io
use axum::{
	Json,
	http::StatusCode,
	response::{IntoResponse, Response},
};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::TokenInfo,
	batch::BatchReport,
	decoder::{DecodedUrl, PlayableUrl},
};

/// Machine-readable error codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Body is not a JSON object.
	InvalidJson,
	/// `token` is absent or empty.
	MissingToken,
	/// `encrypted_url` is absent or empty.
	MissingUrl,
	/// `urls` is absent, empty, or not an array.
	MissingUrls,
	/// Token failed validation.
	InvalidToken,
	/// Encrypted URL did not decode.
	DecodeFailed,
	/// Client exhausted its request budget.
	RateLimitExceeded,
	/// Unexpected fault.
	InternalError,
	/// No such route.
	NotFound,
}
impl ErrorCode {
	/// HTTP status paired with the code.
	pub const fn status(self) -> StatusCode {
		match self {
			ErrorCode::InvalidJson
			| ErrorCode::MissingToken
			| ErrorCode::MissingUrl
			| ErrorCode::MissingUrls
			| ErrorCode::DecodeFailed => StatusCode::BAD_REQUEST,
			ErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
			ErrorCode::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
			ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
			ErrorCode::NotFound => StatusCode::NOT_FOUND,
		}
	}
}

/// `{"error": ..., "code": ...}` error envelope.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ApiError {
	/// Human-readable message.
	pub error: String,
	/// Machine-readable code.
	pub code: ErrorCode,
	/// Rate limit description.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Fault text for internal errors: a string in debug mode, `null` otherwise.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Value>,
}
impl ApiError {
	/// Error without extra fields.
	pub fn new(code: ErrorCode, error: impl Into<String>) -> Self {
		Self { error: error.into(), code, description: None, details: None }
	}

	/// `400 INVALID_JSON`.
	pub fn invalid_json() -> Self {
		Self::new(ErrorCode::InvalidJson, "Invalid JSON payload")
	}

	/// `400 MISSING_TOKEN`.
	pub fn missing_token() -> Self {
		Self::new(ErrorCode::MissingToken, "Token is required")
	}

	/// `401 INVALID_TOKEN`.
	pub fn invalid_token() -> Self {
		Self::new(ErrorCode::InvalidToken, "Invalid or expired token")
	}

	/// `400 DECODE_FAILED`.
	pub fn decode_failed() -> Self {
		Self::new(ErrorCode::DecodeFailed, "Failed to decode URL")
	}

	/// `429 RATE_LIMIT_EXCEEDED`.
	pub fn rate_limited(description: impl Into<String>) -> Self {
		Self {
			description: Some(description.into()),
			..Self::new(ErrorCode::RateLimitExceeded, "Rate limit exceeded")
		}
	}

	/// `500 INTERNAL_ERROR`; `fault` is only exposed when `debug` is set.
	pub fn internal(fault: &dyn Display, debug: bool) -> Self {
		let details = if debug { Value::String(fault.to_string()) } else { Value::Null };

		Self { details: Some(details), ..Self::new(ErrorCode::InternalError, "Internal server error") }
	}

	/// `404 NOT_FOUND`.
	pub fn not_found() -> Self {
		Self::new(ErrorCode::NotFound, "Endpoint not found")
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(self.code.status(), Json(self)).into_response()
	}
}

/// Successful single decode.
#[derive(Clone, Debug, Serialize)]
pub struct DecodeResponse {
	/// Always `"ok"`.
	pub status: &'static str,
	/// Always `true`.
	pub success: bool,
	/// Playable URL.
	pub url: PlayableUrl,
	/// Plain resource URL.
	pub decoded_url: DecodedUrl,
	/// Identifier echoed from the request.
	pub video_id: Option<String>,
	/// Response instant.
	#[serde(with = "time::serde::rfc3339")]
	pub timestamp: OffsetDateTime,
}

/// Successful batch decode.
#[derive(Clone, Debug, Serialize)]
pub struct BatchResponse {
	/// Always `true`; per-item failures live in `results`.
	pub success: bool,
	/// Results, totals, and timestamp.
	#[serde(flatten)]
	pub report: BatchReport,
}

/// Token validation verdict.
#[derive(Clone, Debug, Serialize)]
pub struct ValidateResponse {
	/// Verdict.
	pub valid: bool,
	/// Claims of a valid token.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token_info: Option<TokenInfo>,
	/// Message for an invalid token.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<&'static str>,
	/// `INVALID_TOKEN` for an invalid token.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub code: Option<ErrorCode>,
	/// Response instant.
	#[serde(with = "time::serde::rfc3339")]
	pub timestamp: OffsetDateTime,
}
impl ValidateResponse {
	/// Verdict for a valid token.
	pub fn valid(info: TokenInfo, timestamp: OffsetDateTime) -> Self {
		Self { valid: true, token_info: Some(info), error: None, code: None, timestamp }
	}

	/// Verdict for an invalid token.
	pub fn invalid(timestamp: OffsetDateTime) -> Self {
		Self {
			valid: false,
			token_info: None,
			error: Some("Invalid or expired token"),
			code: Some(ErrorCode::InvalidToken),
			timestamp,
		}
	}
}

/// Envelope of `GET /api`, which reports errors in-band.
#[derive(Clone, Debug, Serialize)]
pub struct SimpleResponse {
	/// `"ok"` or `"error"`.
	pub status: &'static str,
	/// Mirrors `status`.
	pub success: bool,
	/// Playable URL on success.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub url: Option<PlayableUrl>,
	/// Message on failure.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}
impl SimpleResponse {
	/// Success envelope.
	pub fn ok(url: PlayableUrl) -> Self {
		Self { status: "ok", success: true, url: Some(url), error: None }
	}

	/// Failure envelope.
	pub fn error(message: impl Into<String>) -> Self {
		Self { status: "error", success: false, url: None, error: Some(message.into()) }
	}
}
