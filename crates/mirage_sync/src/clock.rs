//! # Clock Synchronization
//!
//! Maps the local clock onto the authoritative timeline.
//!
//! Every fresh snapshot yields one observation `remote_timestamp - local_receive_time`.
//! That observation carries the true offset plus one-way latency plus jitter, so
//! it is smoothed exponentially:
//!
//! ```text
//! offset = offset * (1 - f) + observed * f
//! ```
//!
//! A jitter event (abnormal gap in a stream) clears the seed so the next
//! observation is taken verbatim, and the one after that blends with the
//! faster post-jitter factor.

use crate::config::SyncConfig;
use crate::time::Nanos;

/// Smoothed offset between the local clock and the authoritative clock.
///
/// One instance per logical connection, shared by every object on it.
#[derive(Clone, Debug)]
pub struct ClockSynchronizer {
    /// Smoothed offset in nanoseconds (remote = local + offset).
    offset: f64,
    /// Whether `offset` has been seeded.
    initialized: bool,
    /// Next blended sample uses the post-jitter factor.
    fast_pending: bool,
    /// Steady-state smoothing factor.
    steady_factor: f64,
    /// Smoothing factor right after a jitter event.
    jitter_factor: f64,
    /// Statistics: observations absorbed.
    samples: u64,
    /// Statistics: jitter events seen.
    desyncs: u32,
}

impl ClockSynchronizer {
    /// Creates an unseeded synchronizer.
    ///
    /// # Arguments
    /// * `steady_factor` - Blend weight of a new observation in steady state
    /// * `jitter_factor` - Blend weight for one observation after a jitter event
    #[must_use]
    pub fn new(steady_factor: f64, jitter_factor: f64) -> Self {
        Self {
            offset: 0.0,
            initialized: false,
            fast_pending: false,
            steady_factor,
            jitter_factor,
            samples: 0,
            desyncs: 0,
        }
    }

    /// Creates a synchronizer using the config's smoothing factors.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.clock_smoothing, config.clock_smoothing_after_jitter)
    }

    /// Absorbs one observed offset (`remote_timestamp - local_receive_time`).
    #[allow(clippy::cast_precision_loss)]
    pub fn add_sample(&mut self, observed_offset: Nanos) {
        let observed = observed_offset as f64;
        self.samples += 1;

        if !self.initialized {
            self.offset = observed;
            self.initialized = true;
            return;
        }

        let f = if self.fast_pending {
            self.fast_pending = false;
            self.jitter_factor
        } else {
            self.steady_factor
        };
        self.offset = self.offset * (1.0 - f) + observed * f;
    }

    /// Forces a reseed from the next observation.
    pub fn mark_desync(&mut self) {
        self.initialized = false;
        self.fast_pending = true;
        self.desyncs += 1;
        tracing::debug!("Clock desync #{}, reseeding offset", self.desyncs);
    }

    /// Estimates the authoritative clock at `local_now`.
    #[inline]
    #[must_use]
    pub fn estimate_remote_now(&self, local_now: Nanos) -> Nanos {
        local_now + self.offset()
    }

    /// Returns the current offset in nanoseconds.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn offset(&self) -> Nanos {
        self.offset.round() as Nanos
    }

    /// Returns true once an observation has seeded the offset.
    #[inline]
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns the number of observations absorbed.
    #[inline]
    #[must_use]
    pub const fn sample_count(&self) -> u64 {
        self.samples
    }

    /// Returns the number of jitter events seen.
    #[inline]
    #[must_use]
    pub const fn desync_count(&self) -> u32 {
        self.desyncs
    }
}

impl Default for ClockSynchronizer {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}
