//! Validated description of a remote introspection endpoint.

// self
use crate::_prelude::*;

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum AuthorityDescriptorError {
	/// Introspection endpoint is mandatory.
	#[error("Missing introspection endpoint.")]
	MissingEndpoint,
	/// Endpoints must use HTTPS.
	#[error("The introspection endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Client secret without a client identifier.
	#[error("A client secret was supplied without a client identifier.")]
	SecretWithoutClientId,
	/// Timeout must be positive.
	#[error("Authority timeout must be positive.")]
	NonPositiveTimeout,
}

/// Client credentials presented to the introspection endpoint via HTTP Basic.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorityCredentials {
	/// Client identifier.
	pub client_id: String,
	/// Client secret, if the authority requires one.
	pub client_secret: Option<String>,
}
impl Debug for AuthorityCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorityCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Immutable description of the issuing authority's introspection endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorityDescriptor {
	/// Endpoint receiving `POST token=<value>` introspection requests.
	pub introspection_endpoint: Url,
	/// Optional client credentials.
	pub credentials: Option<AuthorityCredentials>,
	/// Upper bound on a single introspection call.
	pub timeout: Duration,
	/// Permits plain HTTP endpoints (loopback fakes, local development).
	pub allow_insecure: bool,
}
impl AuthorityDescriptor {
	/// Default introspection budget.
	pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(5);

	/// Creates a new builder.
	pub fn builder() -> AuthorityDescriptorBuilder {
		AuthorityDescriptorBuilder::default()
	}

	fn validate(&self) -> Result<(), AuthorityDescriptorError> {
		if !self.allow_insecure && self.introspection_endpoint.scheme() != "https" {
			return Err(AuthorityDescriptorError::InsecureEndpoint {
				url: self.introspection_endpoint.to_string(),
			});
		}
		if !self.timeout.is_positive() {
			return Err(AuthorityDescriptorError::NonPositiveTimeout);
		}

		Ok(())
	}
}

/// Builder for [`AuthorityDescriptor`] values.
#[derive(Debug, Default)]
pub struct AuthorityDescriptorBuilder {
	introspection_endpoint: Option<Url>,
	client_id: Option<String>,
	client_secret: Option<String>,
	timeout: Option<Duration>,
	allow_insecure: bool,
}
impl AuthorityDescriptorBuilder {
	/// Sets the introspection endpoint.
	pub fn introspection_endpoint(mut self, url: Url) -> Self {
		self.introspection_endpoint = Some(url);

		self
	}

	/// Sets the client identifier used for HTTP Basic authentication.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets the client secret used for HTTP Basic authentication.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Overrides the per-call timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Allows non-HTTPS endpoints.
	pub fn allow_insecure(mut self, allow: bool) -> Self {
		self.allow_insecure = allow;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<AuthorityDescriptor, AuthorityDescriptorError> {
		let introspection_endpoint =
			self.introspection_endpoint.ok_or(AuthorityDescriptorError::MissingEndpoint)?;
		let credentials = match (self.client_id, self.client_secret) {
			(Some(client_id), client_secret) => Some(AuthorityCredentials { client_id, client_secret }),
			(None, Some(_)) => return Err(AuthorityDescriptorError::SecretWithoutClientId),
			(None, None) => None,
		};
		let descriptor = AuthorityDescriptor {
			introspection_endpoint,
			credentials,
			timeout: self.timeout.unwrap_or(AuthorityDescriptor::DEFAULT_TIMEOUT),
			allow_insecure: self.allow_insecure,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Fixture URL should parse.")
	}

	#[test]
	fn rejects_insecure_and_incomplete_descriptors() {
		assert_eq!(
			AuthorityDescriptor::builder().build(),
			Err(AuthorityDescriptorError::MissingEndpoint)
		);
		assert!(matches!(
			AuthorityDescriptor::builder()
				.introspection_endpoint(url("http://auth.example.com/introspect"))
				.build(),
			Err(AuthorityDescriptorError::InsecureEndpoint { .. })
		));
		assert_eq!(
			AuthorityDescriptor::builder()
				.introspection_endpoint(url("https://auth.example.com/introspect"))
				.client_secret("orphan")
				.build(),
			Err(AuthorityDescriptorError::SecretWithoutClientId)
		);
		assert_eq!(
			AuthorityDescriptor::builder()
				.introspection_endpoint(url("https://auth.example.com/introspect"))
				.timeout(Duration::ZERO)
				.build(),
			Err(AuthorityDescriptorError::NonPositiveTimeout)
		);
	}

	#[test]
	fn builds_with_defaults_and_redacts_secret() {
		let descriptor = AuthorityDescriptor::builder()
			.introspection_endpoint(url("http://127.0.0.1:9000/introspect"))
			.allow_insecure(true)
			.client_id("decoder")
			.client_secret("hunter2")
			.build()
			.expect("Loopback descriptor should build when insecure endpoints are allowed.");

		assert_eq!(descriptor.timeout, AuthorityDescriptor::DEFAULT_TIMEOUT);
		assert!(!format!("{descriptor:?}").contains("hunter2"));
	}
}
