//! # Extrapolation
//!
//! Projects the newest snapshot forward when the render time has run past it.
//!
//! Extrapolation is short and conservative:
//! - Resting objects, or objects without velocity, never move.
//! - Past the cap, the object freezes at its last known transform. Stale data
//!   means lost contact, not "keep flying".

use crate::config::SyncConfig;
use crate::render::{RenderState, SampleMode};
use crate::snapshot::StateSnapshot;
use crate::time::{as_secs, Nanos};

/// Bounded forward projection from a single snapshot.
#[derive(Clone, Copy, Debug)]
pub struct ExtrapolationPath {
    /// Projection window; at or beyond it the object freezes.
    max_duration: Nanos,
}

impl ExtrapolationPath {
    /// Creates a path with the given projection cap.
    #[must_use]
    pub const fn new(max_duration: Nanos) -> Self {
        Self { max_duration }
    }

    /// Creates a path from config.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.max_extrapolation())
    }

    /// Writes the projection of `latest` at `render` into `out`.
    pub fn extrapolate(&self, latest: &StateSnapshot, render: Nanos, out: &mut RenderState) -> SampleMode {
        out.copy_snapshot(latest, SampleMode::Frozen);

        if !latest.active {
            return SampleMode::Frozen;
        }
        let Some(velocity) = latest.linear_velocity else {
            return SampleMode::Frozen;
        };

        let dt = render - latest.timestamp;
        if dt <= 0 || dt >= self.max_duration {
            return SampleMode::Frozen;
        }

        let secs = as_secs(dt);
        out.translation = latest.transform.translation + velocity * secs;
        if let Some(omega) = latest.angular_velocity {
            out.rotation = latest.transform.rotation.integrate(omega, secs);
        }

        out.set_mode(SampleMode::Extrapolated);
        SampleMode::Extrapolated
    }
}
