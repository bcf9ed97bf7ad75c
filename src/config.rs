//! Service configuration from flags and `VIDURL_*` environment variables.

// std
use std::net::SocketAddr;
// crates.io
use clap::{Parser, ValueEnum};
// self
use crate::{
	_prelude::*,
	authority::{AuthorityDescriptor, HttpTokenAuthority, SignedTokenAuthority, TokenAuthority},
	client::TokenClient,
	decoder::{Base64Codec, SealedCodec, SignerConfig, UrlCodec, UrlDecoder},
	error::ConfigError,
	server::AppState,
};

/// Encoding applied to catalogue URLs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CodecKind {
	/// Plain base64, token independent.
	#[default]
	Base64,
	/// Token-bound AES-128-CBC with HMAC-SHA256.
	Sealed,
}
impl CodecKind {
	fn codec(self) -> Arc<dyn UrlCodec> {
		match self {
			CodecKind::Base64 => Arc::new(Base64Codec),
			CodecKind::Sealed => Arc::new(SealedCodec),
		}
	}
}

/// Token-gated video URL broker.
#[derive(Clone, Parser)]
#[command(name = "vidurl-broker", version, about)]
pub struct ServiceConfig {
	/// Address to listen on.
	#[arg(long, env = "VIDURL_BIND", default_value = "0.0.0.0:5000")]
	pub bind: SocketAddr,
	/// Introspection endpoint of the token issuer (remote validation mode).
	#[arg(long, env = "VIDURL_INTROSPECTION_URL")]
	pub introspection_url: Option<Url>,
	/// Client id presented to the introspection endpoint.
	#[arg(long, env = "VIDURL_CLIENT_ID")]
	pub client_id: Option<String>,
	/// Client secret presented to the introspection endpoint.
	#[arg(long, env = "VIDURL_CLIENT_SECRET", hide_env_values = true)]
	pub client_secret: Option<String>,
	/// Permit a plain HTTP introspection endpoint.
	#[arg(long, env = "VIDURL_ALLOW_INSECURE_AUTHORITY")]
	pub allow_insecure_authority: bool,
	/// Shared key for locally verified signed tokens (local validation mode).
	#[arg(long, env = "VIDURL_TOKEN_KEY", hide_env_values = true)]
	pub token_key: Option<String>,
	/// Secret used to sign playable URLs.
	#[arg(long, env = "VIDURL_SIGNING_SECRET", hide_env_values = true)]
	pub signing_secret: String,
	/// Signing window in seconds.
	#[arg(long, env = "VIDURL_SIGNING_WINDOW_SECS", default_value_t = 300)]
	pub signing_window_secs: u32,
	/// Playable URL lifetime in seconds, counted from the window start.
	#[arg(long, env = "VIDURL_URL_TTL_SECS", default_value_t = 3_600)]
	pub url_ttl_secs: u32,
	/// Upper bound on one authority call, in seconds.
	#[arg(long, env = "VIDURL_AUTHORITY_TIMEOUT_SECS", default_value_t = 5)]
	pub authority_timeout_secs: u32,
	/// Catalogue URL encoding.
	#[arg(long, env = "VIDURL_CODEC", value_enum, default_value_t = CodecKind::Base64)]
	pub codec: CodecKind,
	/// Include fault details in 500 responses.
	#[arg(long, env = "VIDURL_DEBUG")]
	pub debug: bool,
	/// `tracing` filter directive.
	#[arg(long, env = "VIDURL_LOG", default_value = "vidurl_broker=info")]
	pub log_filter: String,
}
impl ServiceConfig {
	/// Builds the token authority for whichever validation mode is configured.
	pub fn authority(&self) -> Result<Arc<dyn TokenAuthority>> {
		match (&self.introspection_url, &self.token_key) {
			(Some(endpoint), None) => {
				let mut builder = AuthorityDescriptor::builder()
					.introspection_endpoint(endpoint.clone())
					.timeout(self.authority_timeout())
					.allow_insecure(self.allow_insecure_authority);

				if let Some(client_id) = &self.client_id {
					builder = builder.client_id(client_id);
				}
				if let Some(secret) = &self.client_secret {
					builder = builder.client_secret(secret);
				}

				let descriptor = builder.build().map_err(ConfigError::from)?;

				Ok(Arc::new(HttpTokenAuthority::new(descriptor)?))
			},
			(None, Some(key)) => Ok(Arc::new(SignedTokenAuthority::new(key)?)),
			(None, None) => Err(ConfigError::MissingAuthority.into()),
			(Some(_), Some(_)) => Err(ConfigError::ConflictingAuthority.into()),
		}
	}

	/// Validates every setting and assembles the server state.
	pub fn build_state(&self) -> Result<AppState> {
		let client = TokenClient::new(self.authority()?).with_timeout(self.authority_timeout());
		let signer = SignerConfig::new(self.signing_secret.as_bytes())
			.window(Duration::seconds(self.signing_window_secs.into()))
			.ttl(Duration::seconds(self.url_ttl_secs.into()))
			.build()
			.map_err(ConfigError::from)?;
		let decoder = UrlDecoder::new(self.codec.codec(), signer);

		Ok(AppState::new(client, decoder).with_debug(self.debug))
	}

	fn authority_timeout(&self) -> Duration {
		Duration::seconds(self.authority_timeout_secs.into())
	}
}
impl Debug for ServiceConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceConfig")
			.field("bind", &self.bind)
			.field("introspection_url", &self.introspection_url)
			.field("client_id", &self.client_id)
			.field("token_key", &self.token_key.as_ref().map(|_| "<redacted>"))
			.field("codec", &self.codec)
			.field("debug", &self.debug)
			.finish_non_exhaustive()
	}
}
