//! Token client: the single gate every request passes before any URL work happens.
//!
//! [`TokenClient`] answers two questions about a presented token. Is it valid right now
//! ([`TokenClient::validate`], fail closed), and what does it say
//! ([`TokenClient::get_token_info`], precondition error when it is not valid)? A successful
//! [`TokenClient::authenticate`] yields a [`ValidatedToken`], the only value the decoder
//! accepts for signing.

// self
use crate::{
	_prelude::*,
	auth::{AuthToken, TokenInfo, TokenStatus},
	authority::TokenAuthority,
	clock::{Clock, SystemClock},
	error::{PreconditionError, TransientError},
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// Proof that a token passed validation at a specific instant.
///
/// Only [`TokenClient`] constructs this type, so holding one means the authority vouched
/// for the token and the client's clock found it active.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedToken {
	token: AuthToken,
	info: TokenInfo,
}
impl ValidatedToken {
	pub(crate) fn new(token: AuthToken, info: TokenInfo) -> Self {
		Self { token, info }
	}

	/// Token that was validated.
	pub fn token(&self) -> &AuthToken {
		&self.token
	}

	/// Claims reported by the authority.
	pub fn info(&self) -> &TokenInfo {
		&self.info
	}

	/// Consumes the proof and returns the claims.
	pub fn into_info(self) -> TokenInfo {
		self.info
	}
}

/// Validates tokens through an injected [`TokenAuthority`].
#[derive(Clone)]
pub struct TokenClient {
	authority: Arc<dyn TokenAuthority>,
	clock: Arc<dyn Clock>,
	timeout: Duration,
}
impl TokenClient {
	/// Default upper bound on one authority call.
	pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(5);

	/// Creates a client backed by `authority` and the system clock.
	pub fn new(authority: Arc<dyn TokenAuthority>) -> Self {
		Self { authority, clock: Arc::new(SystemClock), timeout: Self::DEFAULT_TIMEOUT }
	}

	/// Replaces the clock used for expiry checks.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Overrides the authority call budget.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Authority call budget.
	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Returns `true` when the token is well formed, vouched for by the authority, and
	/// active at the client's current instant. Every other outcome, including authority
	/// faults and timeouts, returns `false`.
	pub async fn validate(&self, token: &str) -> bool {
		self.authenticate(token).await.is_some()
	}

	/// Same decision as [`validate`](Self::validate), returning the proof value on success.
	pub async fn authenticate(&self, token: &str) -> Option<ValidatedToken> {
		let span = OpSpan::new(OpKind::Validate, "authenticate");

		obs::record_op_outcome(OpKind::Validate, OpOutcome::Attempt);

		let result = span.instrument(self.check(token, &span)).await;

		obs::record_op_outcome(OpKind::Validate, OpOutcome::from_success(result.is_ok()));

		result.inspect_err(|err| span.fail(err)).ok()
	}

	/// Returns the token's claims.
	///
	/// Meant to be called after [`validate`](Self::validate) returned `true`. A token that does
	/// not validate yields [`PreconditionError::UnvalidatedToken`] carrying the reason, never
	/// fabricated claims.
	pub async fn get_token_info(&self, token: &str) -> Result<TokenInfo> {
		let span = OpSpan::new(OpKind::TokenInfo, "get_token_info");

		obs::record_op_outcome(OpKind::TokenInfo, OpOutcome::Attempt);

		let result = span.instrument(self.check(token, &span)).await;

		obs::record_op_outcome(OpKind::TokenInfo, OpOutcome::from_success(result.is_ok()));

		result.map(ValidatedToken::into_info).map_err(|err| {
			PreconditionError::UnvalidatedToken { source: Box::new(err) }.into()
		})
	}

	async fn check(&self, raw: &str, span: &OpSpan) -> Result<ValidatedToken> {
		let token = AuthToken::parse(raw)?;

		span.record_token(&token);

		let budget = self.timeout.unsigned_abs();
		let info = tokio::time::timeout(budget, self.authority.introspect(&token))
			.await
			.map_err(|_| TransientError::Timeout { timeout: self.timeout })??;

		match info.status_at(self.clock.now()) {
			TokenStatus::Active => Ok(ValidatedToken::new(token, info)),
			status => Err(Error::Rejected { reason: status_reason(status).into() }),
		}
	}
}
impl Debug for TokenClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenClient")
			.field("authority", &self.authority.name())
			.field("timeout", &self.timeout)
			.finish()
	}
}

fn status_reason(status: TokenStatus) -> &'static str {
	match status {
		TokenStatus::Active => "token is active",
		TokenStatus::Pending => "token is not valid yet",
		TokenStatus::Expired => "token has expired",
		TokenStatus::Revoked => "token has been revoked",
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		auth::SubjectId,
		authority::AuthorityFuture,
		clock::FixedClock,
	};

	#[derive(Default)]
	struct FakeAuthority {
		info: Option<TokenInfo>,
		delay: Option<std::time::Duration>,
		calls: AtomicUsize,
	}
	impl FakeAuthority {
		fn vouching(info: TokenInfo) -> Self {
			Self { info: Some(info), ..Self::default() }
		}
	}
	impl TokenAuthority for FakeAuthority {
		fn name(&self) -> &'static str {
			"fake"
		}

		fn introspect<'a>(&'a self, _: &'a AuthToken) -> AuthorityFuture<'a, TokenInfo> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			Box::pin(async move {
				if let Some(delay) = self.delay {
					tokio::time::sleep(delay).await;
				}

				self.info.clone().ok_or_else(|| Error::Rejected { reason: "unknown token".into() })
			})
		}
	}

	fn info() -> TokenInfo {
		TokenInfo::builder(SubjectId::new("u-1").expect("Subject fixture should be valid."))
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Token info fixture should build.")
	}

	fn client(authority: Arc<FakeAuthority>, clock: Arc<FixedClock>) -> TokenClient {
		TokenClient::new(authority).with_clock(clock)
	}

	#[tokio::test]
	async fn active_tokens_validate_and_expose_claims() {
		let authority = Arc::new(FakeAuthority::vouching(info()));
		let clock = Arc::new(FixedClock::new(macros::datetime!(2025-01-01 00:30 UTC)));
		let client = client(authority.clone(), clock);

		assert!(client.validate("tok-1").await);

		let info = client.get_token_info("tok-1").await.expect("Valid token should expose info.");

		assert_eq!(info.subject.as_ref(), "u-1");
		assert_eq!(authority.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn expiry_follows_the_client_clock() {
		let authority = Arc::new(FakeAuthority::vouching(info()));
		let clock = Arc::new(FixedClock::new(macros::datetime!(2025-01-01 00:59 UTC)));
		let client = client(authority, clock.clone());

		assert!(client.validate("tok-1").await);

		clock.advance(Duration::minutes(1));

		assert!(!client.validate("tok-1").await);

		clock.set(macros::datetime!(2024-12-31 23:59 UTC));

		assert!(!client.validate("tok-1").await, "Tokens issued in the future must not validate.");
	}

	#[tokio::test]
	async fn malformed_tokens_never_reach_the_authority() {
		let authority = Arc::new(FakeAuthority::vouching(info()));
		let clock = Arc::new(FixedClock::new(macros::datetime!(2025-01-01 00:30 UTC)));
		let client = client(authority.clone(), clock);

		assert!(!client.validate("").await);
		assert!(!client.validate("has space").await);
		assert!(!client.validate(&"x".repeat(AuthToken::MAX_LEN + 1)).await);
		assert_eq!(authority.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn token_info_on_invalid_token_is_a_precondition_error() {
		let authority = Arc::new(FakeAuthority::default());
		let clock = Arc::new(FixedClock::new(macros::datetime!(2025-01-01 00:30 UTC)));
		let client = client(authority, clock);
		let err = client
			.get_token_info("expired-token-X")
			.await
			.expect_err("Unknown tokens must not yield metadata.");

		match err {
			Error::Precondition(PreconditionError::UnvalidatedToken { source }) =>
				assert!(source.is_rejection()),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[tokio::test]
	async fn slow_authority_times_out_closed() {
		let authority = Arc::new(FakeAuthority {
			info: Some(info()),
			delay: Some(std::time::Duration::from_secs(5)),
			..FakeAuthority::default()
		});
		let clock = Arc::new(FixedClock::new(macros::datetime!(2025-01-01 00:30 UTC)));
		let client = client(authority, clock).with_timeout(Duration::milliseconds(20));

		assert!(!client.validate("tok-1").await);

		let err = client.get_token_info("tok-1").await.expect_err("Timeouts must fail closed.");

		match err {
			Error::Precondition(PreconditionError::UnvalidatedToken { source }) => assert!(matches!(
				*source,
				Error::Transient(TransientError::Timeout { .. })
			)),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[tokio::test]
	async fn authenticate_returns_proof_bound_to_token() {
		let authority = Arc::new(FakeAuthority::vouching(info()));
		let clock = Arc::new(FixedClock::new(macros::datetime!(2025-01-01 00:30 UTC)));
		let validated = client(authority, clock)
			.authenticate("tok-1")
			.await
			.expect("Active token should authenticate.");

		assert_eq!(validated.token().expose(), "tok-1");
		assert_eq!(validated.info().expires_at, macros::datetime!(2025-01-01 01:00 UTC));
	}
}
