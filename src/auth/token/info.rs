//! Claims projected from a validated token, lifecycle helpers, and builders.

// self
use crate::{
	_prelude::*,
	auth::{IssuerId, ScopeSet, SubjectId},
};

/// Lifecycle status of a token at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
	/// Token is not yet valid because the issued-at instant is in the future.
	Pending,
	/// Token is currently valid.
	Active,
	/// Token reached its expiry instant.
	Expired,
	/// Token has been revoked by the authority.
	Revoked,
}

/// Errors produced by [`TokenInfoBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenInfoBuilderError {
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Expiry precedes the issued-at instant.
	#[error("Expiry precedes the issued-at instant.")]
	ExpiryBeforeIssue,
}

/// Read-only metadata describing a token: who it belongs to, what it may do, and for how long.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
	/// Subject the token was issued to.
	pub subject: SubjectId,
	/// Issuing authority, when the token names one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub issuer: Option<IssuerId>,
	/// Scopes granted to the token.
	#[serde(default)]
	pub scopes: ScopeSet,
	/// Issued-at instant.
	#[serde(with = "time::serde::rfc3339")]
	pub issued_at: OffsetDateTime,
	/// Expiry instant.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
	/// Revocation instant reported by the authority.
	#[serde(default, skip_serializing_if = "Option::is_none", with = "time::serde::rfc3339::option")]
	pub revoked_at: Option<OffsetDateTime>,
}
impl TokenInfo {
	/// Returns a builder for the given subject.
	pub fn builder(subject: SubjectId) -> TokenInfoBuilder {
		TokenInfoBuilder::new(subject)
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if self.revoked_at.is_some_and(|revoked| revoked <= instant) {
			return TokenStatus::Revoked;
		}
		if instant < self.issued_at {
			return TokenStatus::Pending;
		}
		if instant >= self.expires_at {
			return TokenStatus::Expired;
		}

		TokenStatus::Active
	}

	/// Returns `true` if the token is active at the provided instant.
	pub fn is_active_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Active)
	}

	/// Time left before expiry, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}

/// Builder for [`TokenInfo`].
#[derive(Clone, Debug)]
pub struct TokenInfoBuilder {
	subject: SubjectId,
	issuer: Option<IssuerId>,
	scopes: ScopeSet,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	revoked_at: Option<OffsetDateTime>,
}
impl TokenInfoBuilder {
	fn new(subject: SubjectId) -> Self {
		Self {
			subject,
			issuer: None,
			scopes: ScopeSet::default(),
			issued_at: None,
			expires_at: None,
			expires_in: None,
			revoked_at: None,
		}
	}

	/// Sets the issuing authority.
	pub fn issuer(mut self, issuer: IssuerId) -> Self {
		self.issuer = Some(issuer);

		self
	}

	/// Sets the granted scopes.
	pub fn scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = scopes;

		self
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Marks the token as revoked at `instant`.
	pub fn revoked_at(mut self, instant: OffsetDateTime) -> Self {
		self.revoked_at = Some(instant);

		self
	}

	/// Consumes the builder and produces a [`TokenInfo`].
	///
	/// Without an explicit issued-at instant the token is treated as issued at the Unix
	/// epoch, so a missing `iat` claim never makes a token look pending.
	pub fn build(self) -> Result<TokenInfo, TokenInfoBuilderError> {
		let issued_at = self.issued_at.unwrap_or(OffsetDateTime::UNIX_EPOCH);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at + delta,
			(None, None) => return Err(TokenInfoBuilderError::MissingExpiry),
		};

		if expires_at < issued_at {
			return Err(TokenInfoBuilderError::ExpiryBeforeIssue);
		}

		Ok(TokenInfo {
			subject: self.subject,
			issuer: self.issuer,
			scopes: self.scopes,
			issued_at,
			expires_at,
			revoked_at: self.revoked_at,
		})
	}
}
