//! Per-route rate limiting.

// std
use std::net::SocketAddr;
// crates.io
use axum::{
	extract::{ConnectInfo, Request, State},
	http::{HeaderValue, header::RETRY_AFTER},
	middleware::Next,
	response::{IntoResponse, Response},
};
// self
use crate::{
	_prelude::*,
	rate_limit::{RateLimitContext, RateLimitDecision, RateLimitPolicy},
	server::envelope::ApiError,
};

/// Middleware state: the shared policy plus the route label it is attached to.
#[derive(Clone)]
pub struct RouteLimit {
	/// Shared policy.
	pub limiter: Arc<dyn RateLimitPolicy>,
	/// Route label.
	pub route: &'static str,
}
impl Debug for RouteLimit {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RouteLimit").field("route", &self.route).finish_non_exhaustive()
	}
}

/// Refuses the request with `429 RATE_LIMIT_EXCEEDED` when the client's budget is spent.
pub async fn enforce_rate_limit(
	State(limit): State<RouteLimit>,
	request: Request,
	next: Next,
) -> Response {
	let key = request
		.extensions()
		.get::<ConnectInfo<SocketAddr>>()
		.map(|ConnectInfo(addr)| addr.ip().to_string())
		.unwrap_or_else(|| "unknown".into());
	let context = RateLimitContext::new(key, limit.route);

	match limit.limiter.evaluate(&context).await {
		RateLimitDecision::Allow => next.run(request).await,
		RateLimitDecision::Delay(directive) => {
			tracing::warn!(route = limit.route, client = %context.key, "rate limit exceeded");

			let description = directive.reason.unwrap_or_else(|| "Too many requests".into());
			let retry_after = directive.recommended_backoff.whole_seconds().max(1);
			let mut response = ApiError::rate_limited(description).into_response();

			response.headers_mut().insert(RETRY_AFTER, HeaderValue::from(retry_after));

			response
		},
	}
}
