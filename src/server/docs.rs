//! Self-describing documentation served at `GET /api/docs`.

// crates.io
use serde_json::{Value, json};

/// Documentation document listing endpoints, payloads, and error codes.
pub fn api_docs() -> Value {
	json!({
		"title": "Video URL Decoder API",
		"version": env!("CARGO_PKG_VERSION"),
		"endpoints": {
			"/api/decode": {
				"method": "POST",
				"rate_limit": "10 per minute",
				"description": "Decode a single encrypted video URL",
				"payload": {
					"token": "string (required) - Provider authentication token",
					"encrypted_url": "string (required) - Encrypted video URL",
					"video_id": "string (optional) - Video identifier"
				},
				"response": {
					"status": "string - \"ok\"",
					"success": "boolean",
					"url": "string - Playable video URL",
					"decoded_url": "string - Decoded URL",
					"video_id": "string",
					"timestamp": "string - RFC 3339"
				}
			},
			"/api/batch-decode": {
				"method": "POST",
				"rate_limit": "5 per minute",
				"description": "Decode multiple encrypted video URLs",
				"payload": {
					"token": "string (required) - Provider authentication token",
					"urls": "array (required) - Objects with encrypted_url and optional video_id"
				},
				"response": {
					"success": "boolean",
					"results": "array - Per-item video_id, success, video_url, decoded_url, error",
					"total": "integer",
					"successful": "integer",
					"timestamp": "string - RFC 3339"
				}
			},
			"/api/validate-token": {
				"method": "POST",
				"rate_limit": "20 per minute",
				"description": "Validate a provider token",
				"payload": {
					"token": "string (required) - Provider authentication token"
				}
			},
			"/api": {
				"method": "GET",
				"rate_limit": "20 per minute",
				"description": "Sign an already decoded URL",
				"query": {
					"url": "string (required) - Plain video URL",
					"token": "string (required) - Provider authentication token"
				}
			}
		},
		"rate_limits": ["200 per day", "50 per hour"],
		"error_codes": {
			"INVALID_JSON": "Request payload is not valid JSON",
			"MISSING_TOKEN": "Authentication token is missing",
			"MISSING_URL": "Encrypted URL is missing",
			"MISSING_URLS": "URL list is missing or empty",
			"INVALID_TOKEN": "Token is invalid or expired",
			"DECODE_FAILED": "Failed to decode the encrypted URL",
			"RATE_LIMIT_EXCEEDED": "Too many requests from this client",
			"INTERNAL_ERROR": "Server internal error",
			"NOT_FOUND": "Endpoint not found"
		}
	})
}
