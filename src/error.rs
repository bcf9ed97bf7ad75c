//! Crate-level error types shared by the token client, authorities, and the HTTP surface.
//!
//! Expected outcomes (an invalid token, an undecodable URL) never travel through these types:
//! the core reports them with `bool`/`Option` values. [`Error`] is the fault channel plus the
//! precondition channel for programming errors.

// self
use crate::{_prelude::*, auth::TokenFormatError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Caller broke an API contract.
	#[error(transparent)]
	Precondition(#[from] PreconditionError),
	/// Token is not shaped like anything an authority could have issued.
	#[error(transparent)]
	MalformedToken(#[from] TokenFormatError),

	/// Authority reports the token as inactive, expired, revoked, or forged.
	#[error("Token was rejected: {reason}.")]
	Rejected {
		/// Authority- or client-supplied reason string.
		reason: String,
	},
}
impl Error {
	/// Returns `true` for outcomes that mean "the token is not valid" rather than "the
	/// system could not decide".
	pub fn is_rejection(&self) -> bool {
		matches!(self, Self::Rejected { .. } | Self::MalformedToken(_))
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Authority descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::authority::AuthorityDescriptorError),
	/// URL signer settings failed validation.
	#[error(transparent)]
	Signer(#[from] crate::decoder::SignerConfigError),
	/// Local token verification key is empty.
	#[error("Token verification key cannot be empty.")]
	EmptyVerificationKey,
	/// Neither an introspection endpoint nor a local verification key was configured.
	#[error("Either an introspection endpoint or a token verification key must be configured.")]
	MissingAuthority,
	/// Both authority modes were configured at once.
	#[error("Introspection endpoint and token verification key are mutually exclusive.")]
	ConflictingAuthority,
	/// Log filter directive could not be parsed.
	#[error("Log filter `{filter}` is invalid: {message}.")]
	LogFilter {
		/// Raw filter string.
		filter: String,
		/// Parser message.
		message: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Temporary failure variants.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Authority returned an unexpected but non-fatal response.
	#[error("Token authority returned an unexpected response: {message}.")]
	Authority {
		/// Authority- or client-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Authority responded with JSON that could not be parsed.
	#[error("Token authority returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Authority did not answer within the configured budget.
	#[error("Token authority did not answer within {timeout}.")]
	Timeout {
		/// Budget that elapsed.
		timeout: Duration,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token authority.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure.
	#[error("I/O error occurred while serving or calling the token authority.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Contract violations made by callers of the core.
#[derive(Debug, ThisError)]
pub enum PreconditionError {
	/// Token metadata was requested for a token that does not validate.
	#[error("Token metadata requested for a token that failed validation.")]
	UnvalidatedToken {
		/// Why validation failed.
		#[source]
		source: Box<Error>,
	},
}
