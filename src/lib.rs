//! Token-gated video URL broker: validate provider-issued tokens, decode obfuscated media
//! URLs, and mint signed, time-bounded playable links.
//!
//! The crate is split into two collaborating cores and a thin HTTP surface:
//!
//! - [`client::TokenClient`] asks an injected [`authority::TokenAuthority`] whether a token is
//!   authentic and unexpired, failing closed on every ambiguity.
//! - [`decoder::UrlDecoder`] reverses a pluggable [`decoder::UrlCodec`] and signs the result
//!   with [`decoder::UrlSigner`].
//! - `server` (feature `server`) exposes both through axum routes with per-route rate limits.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod authority;
pub mod batch;
pub mod client;
pub mod clock;
#[cfg(feature = "server")] pub mod config;
pub mod decoder;
pub mod error;
pub mod obs;
pub mod rate_limit;
#[cfg(feature = "server")] pub mod server;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(feature = "server")] use color_eyre as _;
#[cfg(test)] use httpmock as _;
