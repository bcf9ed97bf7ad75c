//! Spans around core operations. A span may carry the token fingerprint (`tk`), never the
//! token itself.

// self
use crate::{_prelude::*, auth::AuthToken, obs::OpKind};

/// Future returned by [`OpSpan::instrument`].
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`OpSpan::instrument`].
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// `vidurl_broker.op` span with `op`, `stage`, and a lazily recorded `tk` field.
#[derive(Clone, Debug)]
pub struct OpSpan {
	kind: OpKind,
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Opens a span for `kind` at call site `stage`.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"vidurl_broker.op",
				op = kind.as_str(),
				stage,
				tk = tracing::field::Empty
			);

			Self { kind, span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = stage;

			Self { kind }
		}
	}

	/// Opens a span already tagged with `token`'s fingerprint.
	pub fn for_token(kind: OpKind, stage: &'static str, token: &AuthToken) -> Self {
		let span = Self::new(kind, stage);

		span.record_token(token);

		span
	}

	/// Operation this span covers.
	pub fn kind(&self) -> OpKind {
		self.kind
	}

	/// Tags the span with `token`'s fingerprint once the token has parsed.
	pub fn record_token(&self, token: &AuthToken) {
		#[cfg(feature = "tracing")]
		self.span.record("tk", token.fingerprint().as_str());
		#[cfg(not(feature = "tracing"))]
		let _ = token;
	}

	/// Debug event explaining why the operation failed closed.
	pub fn fail(&self, reason: &dyn Display) {
		#[cfg(feature = "tracing")]
		self.span.in_scope(|| {
			tracing::debug!(op = self.kind.as_str(), %reason, "operation failed closed");
		});
		#[cfg(not(feature = "tracing"))]
		let _ = reason;
	}

	/// Enters the span for a synchronous section.
	pub fn entered(&self) -> OpSpanGuard {
		OpSpanGuard {
			#[cfg(feature = "tracing")]
			_guard: self.span.clone().entered(),
		}
	}

	/// Attaches the span to `fut` without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			tracing::Instrument::instrument(fut, self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Guard returned by [`OpSpan::entered`]; the span closes when it drops.
pub struct OpSpanGuard {
	#[cfg(feature = "tracing")]
	_guard: tracing::span::EnteredSpan,
}
impl Debug for OpSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("OpSpanGuard(..)")
	}
}

/// Installs a global `fmt` subscriber filtered by `filter` (`EnvFilter` directive syntax).
///
/// A subscriber already installed by the embedding process is left in place.
#[cfg(feature = "server")]
pub fn init_subscriber(filter: &str) -> Result<(), crate::error::ConfigError> {
	// crates.io
	use tracing_subscriber::EnvFilter;

	let env_filter = EnvFilter::try_new(filter).map_err(|err| {
		crate::error::ConfigError::LogFilter { filter: filter.to_owned(), message: err.to_string() }
	})?;
	let _ = tracing_subscriber::fmt().with_env_filter(env_filter).with_target(true).try_init();

	Ok(())
}
