//! # Timeline Units
//!
//! Every instant in this crate is a signed nanosecond count. Remote
//! (authoritative) and local clocks share the unit but not the epoch; the
//! [`ClockSynchronizer`](crate::ClockSynchronizer) maps one onto the other.

/// Nanoseconds on either the authoritative or the local timeline.
pub type Nanos = i64;

/// Nanoseconds per millisecond.
pub const NANOS_PER_MILLI: Nanos = 1_000_000;

/// Nanoseconds per second.
pub const NANOS_PER_SEC: Nanos = 1_000_000_000;

/// Converts fractional milliseconds to nanoseconds (rounded).
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn from_millis(ms: f64) -> Nanos {
    (ms * NANOS_PER_MILLI as f64).round() as Nanos
}

/// Converts nanoseconds to fractional seconds.
#[inline]
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn as_secs(nanos: Nanos) -> f64 {
    nanos as f64 / NANOS_PER_SEC as f64
}
