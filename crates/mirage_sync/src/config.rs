//! # Sync Configuration
//!
//! Every tunable of the interpolation pipeline lives here. Values are loaded
//! once at startup (TOML) and never renegotiated while the stream runs.
//!
//! ```toml
//! interpolation_delay_ms = 120.0
//! max_buffer_len = 48
//! ```
//!
//! Missing keys fall back to [`SyncConfig::default`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::time::{from_millis, Nanos};

/// Largest accepted duration setting (one hour).
pub const MAX_DURATION_MS: f64 = 3_600_000.0;

/// Largest accepted per-object history.
pub const MAX_BUFFER_LEN: usize = 1024;

/// Largest accepted pool size or released-id memory.
pub const MAX_RETAINED: usize = 1 << 20;

/// Tunables for clock sync, buffering, interpolation and extrapolation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How far behind the estimated remote clock the render timestamp trails.
    pub interpolation_delay_ms: f64,
    /// Minimum adaptive history length kept by trimming.
    pub buffer_target_len: usize,
    /// Hard cap on buffered snapshots per object (FIFO eviction).
    pub max_buffer_len: usize,
    /// Snapshots younger than this (relative to the newest) survive trimming.
    pub buffer_horizon_ms: f64,
    /// Expected send interval; slower streams grow the adaptive target.
    pub nominal_snapshot_interval_ms: f64,
    /// Brackets shorter than this may use cubic Hermite translation.
    pub cubic_max_interval_ms: f64,
    /// Extrapolation window past the newest snapshot before freezing.
    pub max_extrapolation_ms: f64,
    /// Steady-state clock offset smoothing factor.
    pub clock_smoothing: f64,
    /// Smoothing factor for the first sample after a jitter event.
    pub clock_smoothing_after_jitter: f64,
    /// Expected worst-case gap between consecutive snapshots.
    pub jitter_threshold_ms: f64,
    /// Multiplier on `jitter_threshold_ms` before a gap counts as desync.
    pub jitter_safety_factor: f64,
    /// How far before a wake-up snapshot the bridge snapshot is placed.
    pub bridge_lead_ms: f64,
    /// Snapshots constructed up front in the pool.
    pub pool_prewarm: usize,
    /// Maximum parked snapshots in the pool.
    pub pool_max_free: usize,
    /// Most recently released ids remembered so their late snapshots are
    /// ignored. Older releases are forgotten first.
    pub released_id_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interpolation_delay_ms: 100.0,
            buffer_target_len: 8,
            max_buffer_len: 32,
            buffer_horizon_ms: 1000.0,
            nominal_snapshot_interval_ms: 50.0,
            cubic_max_interval_ms: 250.0,
            max_extrapolation_ms: 100.0,
            clock_smoothing: 0.05,
            clock_smoothing_after_jitter: 0.5,
            jitter_threshold_ms: 250.0,
            jitter_safety_factor: 2.0,
            bridge_lead_ms: 50.0,
            pool_prewarm: 64,
            pool_max_free: 1024,
            released_id_capacity: 4096,
        }
    }
}

impl SyncConfig {
    /// Preset for sparse streams (~10Hz) over lossy links.
    #[must_use]
    pub fn low_rate() -> Self {
        Self {
            interpolation_delay_ms: 250.0,
            buffer_target_len: 12,
            max_buffer_len: 48,
            buffer_horizon_ms: 3000.0,
            nominal_snapshot_interval_ms: 100.0,
            cubic_max_interval_ms: 300.0,
            max_extrapolation_ms: 150.0,
            jitter_threshold_ms: 600.0,
            bridge_lead_ms: 100.0,
            ..Self::default()
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConfigParse`] for malformed TOML and
    /// [`SyncError::InvalidConfig`] for out-of-range values.
    pub fn from_toml_str(source: &str) -> SyncResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConfigIo`] if the file cannot be read, otherwise
    /// as [`SyncConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!("Loaded sync config from {}", path.display());
        Ok(config)
    }

    /// Checks every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> SyncResult<()> {
        let durations = [
            ("interpolation_delay_ms", self.interpolation_delay_ms, true),
            ("buffer_horizon_ms", self.buffer_horizon_ms, false),
            ("nominal_snapshot_interval_ms", self.nominal_snapshot_interval_ms, false),
            ("cubic_max_interval_ms", self.cubic_max_interval_ms, true),
            ("max_extrapolation_ms", self.max_extrapolation_ms, true),
            ("jitter_threshold_ms", self.jitter_threshold_ms, false),
            ("bridge_lead_ms", self.bridge_lead_ms, false),
        ];
        for (name, value, zero_ok) in durations {
            let (in_range, bound) = if zero_ok {
                (value >= 0.0, "non-negative")
            } else {
                (value > 0.0, "positive")
            };
            if !value.is_finite() || !in_range {
                return Err(invalid(format!("{name} must be finite and {bound}, got {value}")));
            }
            if value > MAX_DURATION_MS {
                return Err(invalid(format!("{name} must be at most {MAX_DURATION_MS}, got {value}")));
            }
        }

        for (name, value) in [
            ("clock_smoothing", self.clock_smoothing),
            ("clock_smoothing_after_jitter", self.clock_smoothing_after_jitter),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(invalid(format!("{name} must be in (0, 1], got {value}")));
            }
        }

        if !(self.jitter_safety_factor.is_finite() && self.jitter_safety_factor >= 1.0) {
            return Err(invalid(format!(
                "jitter_safety_factor must be >= 1, got {}",
                self.jitter_safety_factor
            )));
        }

        if !(2..=MAX_BUFFER_LEN).contains(&self.max_buffer_len) {
            return Err(invalid(format!(
                "max_buffer_len must be in [2, {MAX_BUFFER_LEN}], got {}",
                self.max_buffer_len
            )));
        }

        if self.buffer_target_len < 2 || self.buffer_target_len > self.max_buffer_len {
            return Err(invalid(format!(
                "buffer_target_len must be in [2, {}], got {}",
                self.max_buffer_len, self.buffer_target_len
            )));
        }

        if self.pool_max_free > MAX_RETAINED {
            return Err(invalid(format!(
                "pool_max_free must be at most {MAX_RETAINED}, got {}",
                self.pool_max_free
            )));
        }

        if self.pool_prewarm > self.pool_max_free {
            return Err(invalid(format!(
                "pool_prewarm must not exceed pool_max_free ({}), got {}",
                self.pool_max_free, self.pool_prewarm
            )));
        }

        if self.released_id_capacity > MAX_RETAINED {
            return Err(invalid(format!(
                "released_id_capacity must be at most {MAX_RETAINED}, got {}",
                self.released_id_capacity
            )));
        }

        Ok(())
    }

    /// Interpolation delay in nanoseconds.
    #[must_use]
    pub fn interpolation_delay(&self) -> Nanos {
        from_millis(self.interpolation_delay_ms)
    }

    /// Buffer horizon in nanoseconds.
    #[must_use]
    pub fn buffer_horizon(&self) -> Nanos {
        from_millis(self.buffer_horizon_ms)
    }

    /// Nominal send interval in nanoseconds.
    #[must_use]
    pub fn nominal_snapshot_interval(&self) -> Nanos {
        from_millis(self.nominal_snapshot_interval_ms)
    }

    /// Cubic eligibility threshold in nanoseconds.
    #[must_use]
    pub fn cubic_max_interval(&self) -> Nanos {
        from_millis(self.cubic_max_interval_ms)
    }

    /// Extrapolation cap in nanoseconds.
    #[must_use]
    pub fn max_extrapolation(&self) -> Nanos {
        from_millis(self.max_extrapolation_ms)
    }

    /// Gap between consecutive snapshots that counts as a jitter event.
    #[must_use]
    pub fn jitter_gap(&self) -> Nanos {
        from_millis(self.jitter_threshold_ms * self.jitter_safety_factor)
    }

    /// Bridge lead in nanoseconds.
    #[must_use]
    pub fn bridge_lead(&self) -> Nanos {
        from_millis(self.bridge_lead_ms)
    }
}

fn invalid(message: String) -> SyncError {
    SyncError::InvalidConfig(message)
}
