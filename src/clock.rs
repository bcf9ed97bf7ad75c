//! Time sources used for expiry checks and URL signing windows.

// self
use crate::_prelude::*;

/// Source of "now" for every time-dependent decision in the crate.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current instant.
	fn now(&self) -> OffsetDateTime;
}

/// Wall clock backed by [`OffsetDateTime::now_utc`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually driven clock for deterministic tests and replays.
#[derive(Debug)]
pub struct FixedClock(Mutex<OffsetDateTime>);
impl FixedClock {
	/// Freezes time at `instant`.
	pub fn new(instant: OffsetDateTime) -> Self {
		Self(Mutex::new(instant))
	}

	/// Moves the clock to `instant`.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}

	/// Moves the clock forward (or backward, for negative values) by `delta`.
	pub fn advance(&self, delta: Duration) {
		let mut now = self.0.lock();

		*now += delta;
	}
}
impl Clock for FixedClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn fixed_clock_only_moves_when_told() {
		let clock = FixedClock::new(macros::datetime!(2025-03-01 12:00 UTC));

		assert_eq!(clock.now(), clock.now());

		clock.advance(Duration::minutes(5));

		assert_eq!(clock.now(), macros::datetime!(2025-03-01 12:05 UTC));

		clock.set(macros::datetime!(2024-01-01 00:00 UTC));

		assert_eq!(clock.now(), macros::datetime!(2024-01-01 00:00 UTC));
	}
}
