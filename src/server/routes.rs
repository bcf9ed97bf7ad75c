//! Route handlers. Each one validates its input, asks the token client, and only then touches
//! the decoder.

// crates.io
use axum::{
	Json,
	body::Bytes,
	extract::{Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	batch::{BatchEntry, BatchItem, ItemFailure},
	decoder::DecodedUrl,
	server::{
		AppState,
		docs::api_docs,
		envelope::{
			ApiError, BatchResponse, DecodeResponse, ErrorCode, SimpleResponse, ValidateResponse,
		},
	},
};

/// `POST /api/decode`.
pub async fn decode(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
	let payload = json_object(&body)?;
	let token = required_str(&payload, "token").ok_or_else(ApiError::missing_token)?;
	let encrypted_url = required_str(&payload, "encrypted_url")
		.ok_or_else(|| ApiError::new(ErrorCode::MissingUrl, "Encrypted URL is required"))?;
	let video_id = video_id(payload.get("video_id"));

	tracing::info!(video_id = video_id.as_deref(), "decode requested");

	let validated = state.client.authenticate(token).await.ok_or_else(ApiError::invalid_token)?;
	let resolved =
		state.decoder.resolve(encrypted_url, &validated).ok_or_else(ApiError::decode_failed)?;

	tracing::info!(video_id = video_id.as_deref(), "decode succeeded");

	Ok(Json(DecodeResponse {
		status: "ok",
		success: true,
		url: resolved.playable,
		decoded_url: resolved.decoded,
		video_id,
		timestamp: state.decoder.get_timestamp(),
	})
	.into_response())
}

/// `POST /api/batch-decode`.
pub async fn batch_decode(
	State(state): State<AppState>,
	body: Bytes,
) -> Result<Response, ApiError> {
	let payload = json_object(&body)?;
	let token = required_str(&payload, "token").ok_or_else(ApiError::missing_token)?;
	let urls = payload
		.get("urls")
		.and_then(Value::as_array)
		.filter(|urls| !urls.is_empty())
		.ok_or_else(|| ApiError::new(ErrorCode::MissingUrls, "URLs array is required"))?;
	let validated = state.client.authenticate(token).await.ok_or_else(ApiError::invalid_token)?;
	let report = state.decoder.decode_batch(&validated, urls.iter().map(batch_entry));

	tracing::info!(total = report.total, successful = report.successful, "batch decoded");

	Ok(Json(BatchResponse { success: true, report }).into_response())
}

/// `POST /api/validate-token`.
pub async fn validate_token(
	State(state): State<AppState>,
	body: Bytes,
) -> Result<Response, ApiError> {
	let payload = json_object(&body)?;
	let token = required_str(&payload, "token").ok_or_else(ApiError::missing_token)?;
	let Some(validated) = state.client.authenticate(token).await else {
		return Ok((
			StatusCode::UNAUTHORIZED,
			Json(ValidateResponse::invalid(state.decoder.get_timestamp())),
		)
			.into_response());
	};

	Ok(Json(ValidateResponse::valid(validated.into_info(), state.decoder.get_timestamp()))
		.into_response())
}

/// `GET /api?url=...&token=...`: signs an already decoded URL.
pub async fn simple(
	State(state): State<AppState>,
	Query(params): Query<HashMap<String, String>>,
) -> Response {
	let non_empty = |name: &str| params.get(name).map(String::as_str).filter(|v| !v.is_empty());
	let Some(url) = non_empty("url") else {
		return simple_error(StatusCode::BAD_REQUEST, "URL parameter is required");
	};
	let Some(token) = non_empty("token") else {
		return simple_error(StatusCode::BAD_REQUEST, "Token parameter is required");
	};
	let Some(validated) = state.client.authenticate(token).await else {
		return simple_error(StatusCode::UNAUTHORIZED, "Invalid or expired token");
	};
	let decoded = match DecodedUrl::parse(url) {
		Ok(decoded) => decoded,
		Err(err) => return simple_error(StatusCode::BAD_REQUEST, format!("Invalid URL: {err}")),
	};

	tracing::info!("simple signing succeeded");

	Json(SimpleResponse::ok(state.decoder.generate_playable_url(&decoded, &validated)))
		.into_response()
}

/// `GET /api/docs`.
pub async fn docs() -> Json<Value> {
	Json(api_docs())
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
	ApiError::not_found()
}

fn simple_error(status: StatusCode, message: impl Into<String>) -> Response {
	(status, Json(SimpleResponse::error(message))).into_response()
}

fn json_object(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
	match serde_json::from_slice::<Value>(body) {
		Ok(Value::Object(map)) => Ok(map),
		_ => Err(ApiError::invalid_json()),
	}
}

fn required_str<'a>(payload: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
	payload.get(field).and_then(Value::as_str).filter(|value| !value.is_empty())
}

fn video_id(value: Option<&Value>) -> Option<String> {
	match value? {
		Value::String(id) => Some(id.clone()),
		Value::Number(id) => Some(id.to_string()),
		_ => None,
	}
}

fn batch_entry(value: &Value) -> BatchEntry {
	let item = value.as_object().ok_or_else(|| ItemFailure::Malformed("Item must be an object".into()))?;

	Ok(BatchItem {
		encrypted_url: required_str(item, "encrypted_url").map(str::to_owned),
		video_id: video_id(item.get("video_id")),
	})
}
