//! Optional observability helpers for the broker's core operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `vidurl_broker.op` with the `op` (core
//!   operation), `stage` (call site), and `tk` (token fingerprint) fields, plus debug events
//!   for fail-closed outcomes.
//! - Enable `metrics` to increment the `vidurl_broker_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Core operations observed by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Token validation against the authority.
	Validate,
	/// Token metadata lookup.
	TokenInfo,
	/// Encrypted URL decoding.
	Decode,
	/// Playable URL signing.
	Sign,
	/// Batch decoding under one token.
	Batch,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Validate => "validate",
			OpKind::TokenInfo => "token_info",
			OpKind::Decode => "decode",
			OpKind::Sign => "sign",
			OpKind::Batch => "batch",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to a core operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Invalid token, undecodable input, or fault.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}

	/// Maps a boolean result onto success/failure.
	pub const fn from_success(ok: bool) -> Self {
		if ok { OpOutcome::Success } else { OpOutcome::Failure }
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
