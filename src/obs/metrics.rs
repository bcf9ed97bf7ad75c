// self
use crate::obs::{OpKind, OpOutcome};

/// Increments `vidurl_broker_op_total{op, outcome}` (when `metrics` is enabled).
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!("vidurl_broker_op_total", "op" => kind.as_str(), "outcome" => outcome.as_str())
		.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Adds a batch's item counts to `vidurl_broker_batch_items_total{outcome}`.
pub fn record_batch_items(total: usize, successful: usize) {
	#[cfg(feature = "metrics")]
	{
		let failed = total.saturating_sub(successful);

		metrics::counter!("vidurl_broker_batch_items_total", "outcome" => OpOutcome::Success.as_str())
			.increment(successful as u64);
		metrics::counter!("vidurl_broker_batch_items_total", "outcome" => OpOutcome::Failure.as_str())
			.increment(failed as u64);
	}
	#[cfg(not(feature = "metrics"))]
	let _ = (total, successful);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_without_a_recorder_is_a_no_op() {
		record_op_outcome(OpKind::Decode, OpOutcome::Failure);
		record_op_outcome(OpKind::Sign, OpOutcome::from_success(true));
		record_batch_items(5, 3);
		record_batch_items(0, 0);
	}
}
