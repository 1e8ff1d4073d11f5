//! # Snapshot Interpolation
//!
//! Blends the two snapshots bracketing a render timestamp.
//!
//! ## Translation
//! - **Cubic Hermite** when both ends are active, both carry velocity and the
//!   bracket is short. The curve's tangent matches the sampled velocities, so
//!   motion has no kinks at snapshot boundaries.
//! - **Linear** otherwise. Hermite over long gaps overshoots.
//!
//! ## Rotation
//! Always shortest-arc slerp.
//!
//! ## Vertices
//! Equal lengths blend component-wise. A length change is a topology change:
//! the newer array is used as-is.

use mirage_core::hermite;

use crate::config::SyncConfig;
use crate::render::{RenderState, SampleMode};
use crate::snapshot::StateSnapshot;
use crate::time::{as_secs, Nanos};

/// Blend factor of `render` within `[from, to]`, clamped to `[0, 1]`.
///
/// Returns `None` when the interval is empty or reversed.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn blend_factor(from: Nanos, to: Nanos, render: Nanos) -> Option<f64> {
    let span = to - from;
    if span <= 0 {
        return None;
    }
    Some(((render - from) as f64 / span as f64).clamp(0.0, 1.0))
}

/// Two-snapshot blending.
#[derive(Clone, Copy, Debug)]
pub struct InterpolationEngine {
    /// Brackets at least this long fall back to linear translation.
    cubic_max_interval: Nanos,
}

impl InterpolationEngine {
    /// Creates an engine with the given cubic eligibility threshold.
    #[must_use]
    pub const fn new(cubic_max_interval: Nanos) -> Self {
        Self { cubic_max_interval }
    }

    /// Creates an engine from config.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.cubic_max_interval())
    }

    /// Returns true if the bracket qualifies for Hermite translation.
    #[must_use]
    pub fn uses_cubic(&self, from: &StateSnapshot, to: &StateSnapshot) -> bool {
        let span = to.timestamp - from.timestamp;
        from.active
            && to.active
            && from.has_velocity()
            && to.has_velocity()
            && span > 0
            && span < self.cubic_max_interval
    }

    /// Writes the blend of `from` and `to` at `render` into `out`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn interpolate(
        &self,
        from: &StateSnapshot,
        to: &StateSnapshot,
        render: Nanos,
        out: &mut RenderState,
    ) -> SampleMode {
        let Some(alpha) = blend_factor(from.timestamp, to.timestamp, render) else {
            out.copy_snapshot(from, SampleMode::Held);
            return SampleMode::Held;
        };

        let (p0, p1) = (from.transform.translation, to.transform.translation);
        let mode = match (from.linear_velocity, to.linear_velocity) {
            (Some(v0), Some(v1)) if self.uses_cubic(from, to) => {
                let span = as_secs(to.timestamp - from.timestamp);
                out.translation = hermite(p0, v0, p1, v1, span, alpha);
                SampleMode::Cubic
            }
            _ => {
                out.translation = p0.lerp(p1, alpha);
                SampleMode::Linear
            }
        };

        out.rotation = from.transform.rotation.slerp(to.transform.rotation, alpha);

        match (from.vertices(), to.vertices()) {
            (Some(a), Some(b)) if a.len() == b.len() => out.blend_vertices(a, b, alpha as f32),
            (_, Some(b)) => out.copy_vertices(Some(b)),
            (a, None) => out.copy_vertices(a),
        }

        out.set_mode(mode);
        mode
    }
}
