//! Issuing-authority capability consulted by the token client.
//!
//! The authority is a collaborator boundary: the [`TokenClient`](crate::client::TokenClient)
//! only ever sees `Arc<dyn TokenAuthority>`, so tests substitute fakes and deployments pick
//! between remote introspection ([`HttpTokenAuthority`]) and local verification of
//! self-describing tokens ([`SignedTokenAuthority`]).

pub mod descriptor;
#[cfg(feature = "reqwest")] pub mod http;
pub mod signed;
pub mod strategy;

pub use descriptor::*;
#[cfg(feature = "reqwest")] pub use http::*;
pub use signed::*;
pub use strategy::*;

// self
use crate::{
	_prelude::*,
	auth::{AuthToken, TokenInfo},
};

/// Boxed future returned by [`TokenAuthority::introspect`].
pub type AuthorityFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Answers "is this token authentic, and what does it say?" on behalf of the issuer.
///
/// Implementations return [`Error::Rejected`] (or [`Error::MalformedToken`]) when the
/// authority positively refuses the token and any other [`Error`] when it could not decide.
/// The token client treats both as invalid; the split only matters for logs and metrics.
/// Expiry is judged by the client against its own clock, so implementations report the
/// claims as issued rather than filtering on time.
pub trait TokenAuthority
where
	Self: Send + Sync,
{
	/// Short label for logs.
	fn name(&self) -> &'static str;

	/// Verifies the token and returns its claims.
	fn introspect<'a>(&'a self, token: &'a AuthToken) -> AuthorityFuture<'a, TokenInfo>;
}
