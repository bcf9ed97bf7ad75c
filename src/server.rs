//! HTTP surface over the token client and URL decoder.
//!
//! Handlers only parse requests, call the core, and shape JSON envelopes. Each rate-limited
//! route consults the shared [`RateLimitPolicy`] with the client's IP before the handler runs.

pub mod docs;
pub mod envelope;
pub mod middleware;
pub mod routes;

// std
use std::{any::Any, net::SocketAddr};
// crates.io
use axum::{
	Router,
	middleware as axum_middleware,
	response::{IntoResponse, Response},
	routing::{MethodRouter, get, post},
};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
// self
use crate::{
	_prelude::*,
	client::TokenClient,
	decoder::UrlDecoder,
	error::TransportError,
	rate_limit::{FixedWindowPolicy, RateLimitPolicy, RateLimitRule},
	server::envelope::ApiError,
};

/// Route labels used as rate-limit scopes.
pub mod route {
	/// `POST /api/decode`.
	pub const DECODE: &str = "decode";
	/// `POST /api/batch-decode`.
	pub const BATCH_DECODE: &str = "batch-decode";
	/// `POST /api/validate-token`.
	pub const VALIDATE_TOKEN: &str = "validate-token";
	/// `GET /api`.
	pub const SIMPLE: &str = "simple";
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
	/// Token gate.
	pub client: Arc<TokenClient>,
	/// Decoder and signer.
	pub decoder: Arc<UrlDecoder>,
	/// Request budget.
	pub limiter: Arc<dyn RateLimitPolicy>,
	/// Exposes fault details in 500 responses.
	pub debug: bool,
}
impl AppState {
	/// Builds state with [`default_rate_limits`] and debug output disabled.
	pub fn new(client: TokenClient, decoder: UrlDecoder) -> Self {
		Self {
			client: Arc::new(client),
			decoder: Arc::new(decoder),
			limiter: Arc::new(default_rate_limits()),
			debug: false,
		}
	}

	/// Replaces the rate limit policy.
	pub fn with_limiter(mut self, limiter: Arc<dyn RateLimitPolicy>) -> Self {
		self.limiter = limiter;

		self
	}

	/// Toggles fault details in 500 responses.
	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;

		self
	}
}
impl Debug for AppState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppState")
			.field("client", &self.client)
			.field("decoder", &self.decoder)
			.field("debug", &self.debug)
			.finish_non_exhaustive()
	}
}

/// Per-client budgets: 200/day and 50/hour across routes, plus per-route minute limits.
pub fn default_rate_limits() -> FixedWindowPolicy {
	FixedWindowPolicy::new([
		RateLimitRule::global(200, Duration::days(1)),
		RateLimitRule::global(50, Duration::hours(1)),
		RateLimitRule::route(route::DECODE, 10, Duration::minutes(1)),
		RateLimitRule::route(route::BATCH_DECODE, 5, Duration::minutes(1)),
		RateLimitRule::route(route::VALIDATE_TOKEN, 20, Duration::minutes(1)),
		RateLimitRule::route(route::SIMPLE, 20, Duration::minutes(1)),
	])
}

/// Assembles the router. Serve it with connect info so rate limits can key on the peer IP.
pub fn router(state: AppState) -> Router {
	let debug = state.debug;
	let limited = |method: MethodRouter<AppState>, route: &'static str| {
		method.route_layer(axum_middleware::from_fn_with_state(
			middleware::RouteLimit { limiter: state.limiter.clone(), route },
			middleware::enforce_rate_limit,
		))
	};

	Router::new()
		.route("/api/decode", limited(post(routes::decode), route::DECODE))
		.route("/api/batch-decode", limited(post(routes::batch_decode), route::BATCH_DECODE))
		.route("/api/validate-token", limited(post(routes::validate_token), route::VALIDATE_TOKEN))
		.route("/api", limited(get(routes::simple), route::SIMPLE))
		.route("/api/docs", get(routes::docs))
		.fallback(routes::not_found)
		.layer(CatchPanicLayer::custom(fault_response(debug)))
		.with_state(state)
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
	F: 'static + Send + Future<Output = ()>,
{
	let addr = listener.local_addr().map_err(TransportError::from)?;

	tracing::info!(%addr, debug = state.debug, "vidurl-broker listening");

	axum::serve(listener, router(state).into_make_service_with_connect_info::<SocketAddr>())
		.with_graceful_shutdown(shutdown)
		.await
		.map_err(TransportError::from)?;

	tracing::info!("vidurl-broker stopped");

	Ok(())
}

/// Turns a handler panic into `500 INTERNAL_ERROR`.
fn fault_response(debug: bool) -> impl Clone + Fn(Box<dyn Any + Send + 'static>) -> Response {
	move |panic| {
		let fault = panic
			.downcast_ref::<&str>()
			.map(|message| (*message).to_owned())
			.or_else(|| panic.downcast_ref::<String>().cloned())
			.unwrap_or_else(|| "handler panicked".into());

		tracing::error!(%fault, "request handler panicked");

		ApiError::internal(&fault, debug).into_response()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use axum::{body, http::StatusCode};
	use serde_json::Value;
	// self
	use super::*;

	async fn fault_details(debug: bool, panic: Box<dyn Any + Send + 'static>) -> Value {
		let response = fault_response(debug)(panic);

		assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

		let bytes = body::to_bytes(response.into_body(), usize::MAX)
			.await
			.expect("Fault body should be readable.");
		let body = serde_json::from_slice::<Value>(&bytes).expect("Fault body should be JSON.");

		assert_eq!(body["code"], "INTERNAL_ERROR");

		body["details"].clone()
	}

	#[tokio::test]
	async fn handler_panics_become_internal_errors() {
		assert_eq!(fault_details(true, Box::new("index out of bounds")).await, "index out of bounds");
		assert_eq!(fault_details(true, Box::new(String::from("owned message"))).await, "owned message");
		assert_eq!(fault_details(true, Box::new(7_u8)).await, "handler panicked");
		assert_eq!(fault_details(false, Box::new("index out of bounds")).await, Value::Null);
	}
}
