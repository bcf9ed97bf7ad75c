//! Request budgets consulted before a route reaches the core.
//!
//! [`RateLimitPolicy`] is the seam; [`FixedWindowPolicy`] is the in-process implementation
//! the HTTP surface uses: per-client counters over aligned fixed windows, with route-scoped
//! and global rules evaluated together.

// self
use crate::_prelude::*;

/// Boxed future returned by [`RateLimitPolicy::evaluate`].
pub type RateLimitFuture<'a> = Pin<Box<dyn Future<Output = RateLimitDecision> + 'a + Send>>;

/// Strategy that decides whether the next request from a client may proceed.
pub trait RateLimitPolicy
where
	Self: Send + Sync,
{
	/// Evaluates and, when allowed, records the request.
	fn evaluate<'a>(&'a self, context: &'a RateLimitContext) -> RateLimitFuture<'a>;
}

/// Context shared with a [`RateLimitPolicy`] before a request is served.
#[derive(Clone, Debug)]
pub struct RateLimitContext {
	/// Client key, usually the remote IP address.
	pub key: String,
	/// Route label being requested.
	pub route: String,
	/// Timestamp observed before invoking the policy.
	pub observed_at: OffsetDateTime,
}
impl RateLimitContext {
	/// Creates a new context for the given client and route.
	pub fn new(key: impl Into<String>, route: impl Into<String>) -> Self {
		Self { key: key.into(), route: route.into(), observed_at: OffsetDateTime::now_utc() }
	}

	/// Overrides the timestamp associated with the observation.
	pub fn with_observed_at(mut self, instant: OffsetDateTime) -> Self {
		self.observed_at = instant;

		self
	}
}

/// Result emitted by a [`RateLimitPolicy`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// The request may proceed immediately.
	Allow,
	/// The request should be refused until the directive says otherwise.
	Delay(RetryDirective),
}

/// Advises callers when to retry after a [`RateLimitDecision::Delay`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// Instant when it is safe to retry.
	pub earliest_retry_at: OffsetDateTime,
	/// Suggested backoff duration.
	pub recommended_backoff: Duration,
	/// Optional descriptive string.
	pub reason: Option<String>,
}
impl RetryDirective {
	/// Creates a new directive with the provided timing metadata.
	pub fn new(earliest_retry_at: OffsetDateTime, recommended_backoff: Duration) -> Self {
		Self { earliest_retry_at, recommended_backoff, reason: None }
	}

	/// Adds a human-readable reason.
	pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = Some(reason.into());

		self
	}
}

/// A budget of `limit` requests per `period`, for one route or for all of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitRule {
	/// Requests allowed per window.
	pub limit: u32,
	/// Window length.
	pub period: Duration,
	/// Route the rule is scoped to; `None` applies it to every route.
	pub route: Option<String>,
}
impl RateLimitRule {
	/// Rule shared by every route.
	pub fn global(limit: u32, period: Duration) -> Self {
		Self { limit, period, route: None }
	}

	/// Rule for one route label.
	pub fn route(route: impl Into<String>, limit: u32, period: Duration) -> Self {
		Self { limit, period, route: Some(route.into()) }
	}

	fn applies_to(&self, route: &str) -> bool {
		self.route.as_deref().is_none_or(|scoped| scoped == route)
	}

	fn period_secs(&self) -> i64 {
		self.period.whole_seconds().max(1)
	}

	/// Human-readable form, e.g. `10 per 1 minute`.
	pub fn describe(&self) -> String {
		let secs = self.period_secs();
		let (count, unit) = match secs {
			s if s % 86_400 == 0 => (s / 86_400, "day"),
			s if s % 3_600 == 0 => (s / 3_600, "hour"),
			s if s % 60 == 0 => (s / 60, "minute"),
			s => (s, "second"),
		};

		format!("{} per {count} {unit}", self.limit)
	}
}

#[derive(Clone, Copy, Debug)]
struct Window {
	started_at: i64,
	count: u32,
}

/// In-memory fixed-window limiter keyed by client and rule.
#[derive(Debug, Default)]
pub struct FixedWindowPolicy {
	rules: Vec<RateLimitRule>,
	counters: Mutex<HashMap<(usize, String), Window>>,
}
impl FixedWindowPolicy {
	const SWEEP_THRESHOLD: usize = 10_000;

	/// Creates a policy enforcing every rule in `rules`.
	pub fn new(rules: impl IntoIterator<Item = RateLimitRule>) -> Self {
		Self { rules: rules.into_iter().collect(), counters: Mutex::default() }
	}

	/// Rules enforced by this policy.
	pub fn rules(&self) -> &[RateLimitRule] {
		&self.rules
	}

	fn decide(&self, context: &RateLimitContext) -> RateLimitDecision {
		let now = context.observed_at.unix_timestamp();
		let mut counters = self.counters.lock();

		if counters.len() > Self::SWEEP_THRESHOLD {
			counters.retain(|(idx, _), window| {
				self.rules.get(*idx).is_some_and(|rule| window.started_at + rule.period_secs() > now)
			});
		}

		let applicable = self
			.rules
			.iter()
			.enumerate()
			.filter(|(_, rule)| rule.applies_to(&context.route))
			.map(|(idx, rule)| (idx, rule, now.div_euclid(rule.period_secs()) * rule.period_secs()))
			.collect::<Vec<_>>();

		for (idx, rule, started_at) in &applicable {
			let used = counters
				.get(&(*idx, context.key.clone()))
				.filter(|window| window.started_at == *started_at)
				.map_or(0, |window| window.count);

			if used >= rule.limit {
				let retry_at = started_at + rule.period_secs();

				return RateLimitDecision::Delay(
					RetryDirective::new(
						OffsetDateTime::UNIX_EPOCH + Duration::seconds(retry_at),
						Duration::seconds(retry_at - now),
					)
					.with_reason(rule.describe()),
				);
			}
		}

		for (idx, _, started_at) in applicable {
			let window = counters
				.entry((idx, context.key.clone()))
				.or_insert(Window { started_at, count: 0 });

			if window.started_at != started_at {
				*window = Window { started_at, count: 0 };
			}

			window.count += 1;
		}

		RateLimitDecision::Allow
	}
}
impl RateLimitPolicy for FixedWindowPolicy {
	fn evaluate<'a>(&'a self, context: &'a RateLimitContext) -> RateLimitFuture<'a> {
		let decision = self.decide(context);

		Box::pin(async move { decision })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn at(instant: OffsetDateTime, route: &str, key: &str) -> RateLimitContext {
		RateLimitContext::new(key, route).with_observed_at(instant)
	}

	#[tokio::test]
	async fn route_limit_resets_with_the_window() {
		let policy = FixedWindowPolicy::new([RateLimitRule::route("decode", 2, Duration::minutes(1))]);
		let now = macros::datetime!(2025-01-01 00:00:10 UTC);

		assert_eq!(policy.evaluate(&at(now, "decode", "1.1.1.1")).await, RateLimitDecision::Allow);
		assert_eq!(policy.evaluate(&at(now, "decode", "1.1.1.1")).await, RateLimitDecision::Allow);

		match policy.evaluate(&at(now, "decode", "1.1.1.1")).await {
			RateLimitDecision::Delay(directive) => {
				assert_eq!(directive.earliest_retry_at, macros::datetime!(2025-01-01 00:01 UTC));
				assert_eq!(directive.recommended_backoff, Duration::seconds(50));
				assert_eq!(directive.reason.as_deref(), Some("2 per 1 minute"));
			},
			other => panic!("Third request should be delayed, got {other:?}."),
		}

		assert_eq!(
			policy.evaluate(&at(now, "decode", "2.2.2.2")).await,
			RateLimitDecision::Allow,
			"Other clients keep their own budget."
		);
		assert_eq!(
			policy.evaluate(&at(now, "validate", "1.1.1.1")).await,
			RateLimitDecision::Allow,
			"Route rules do not leak into other routes."
		);
		assert_eq!(
			policy.evaluate(&at(now + Duration::minutes(1), "decode", "1.1.1.1")).await,
			RateLimitDecision::Allow
		);
	}

	#[tokio::test]
	async fn global_rules_span_routes_and_refusals_are_not_counted() {
		let policy = FixedWindowPolicy::new([
			RateLimitRule::global(3, Duration::hours(1)),
			RateLimitRule::route("batch", 1, Duration::minutes(1)),
		]);
		let now = macros::datetime!(2025-01-01 10:30 UTC);

		assert_eq!(policy.evaluate(&at(now, "batch", "ip")).await, RateLimitDecision::Allow);
		assert!(matches!(
			policy.evaluate(&at(now, "batch", "ip")).await,
			RateLimitDecision::Delay(_)
		));
		assert_eq!(policy.evaluate(&at(now, "decode", "ip")).await, RateLimitDecision::Allow);
		assert_eq!(policy.evaluate(&at(now, "decode", "ip")).await, RateLimitDecision::Allow);

		match policy.evaluate(&at(now, "decode", "ip")).await {
			RateLimitDecision::Delay(directive) =>
				assert_eq!(directive.reason.as_deref(), Some("3 per 1 hour")),
			other => panic!("Global budget should be exhausted, got {other:?}."),
		}
	}

	#[test]
	fn describes_periods_in_natural_units() {
		assert_eq!(RateLimitRule::global(200, Duration::days(1)).describe(), "200 per 1 day");
		assert_eq!(RateLimitRule::global(5, Duration::seconds(90)).describe(), "5 per 90 second");
	}
}
