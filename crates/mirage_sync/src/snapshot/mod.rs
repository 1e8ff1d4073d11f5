//! # Snapshot System
//!
//! Timestamped authoritative state and the per-object history it lives in.
//!
//! ```text
//! Authoritative:   [1]  [2]   [3] [4]      [5]
//!                   │    │     │   │        │
//! Network:          ~~~~~~~~~~~~~~~~~~~~~~~~~~  (jitter, loss, reordering)
//!                              │   │
//! Client Buffer:   [1] [2] [3] [4]              (strictly increasing)
//!                           │
//! Render Time:              ▼
//!                    Interpolate between 2 and 3
//! ```

mod buffer;

pub use buffer::{AppendOutcome, Bracket, SnapshotBuffer};

use mirage_core::{Recycle, Transform, Vec3};

use crate::time::Nanos;

/// One sample of an object's authoritative state.
///
/// Snapshots are recycled through a [`Pool`](mirage_core::Pool); the vertex
/// buffer keeps its capacity between uses so deformable streams stop
/// allocating once warmed up.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateSnapshot {
    /// Authoritative instant of this sample.
    pub timestamp: Nanos,
    /// Translation and rotation.
    pub transform: Transform,
    /// Linear velocity in units per second, absent when not simulated.
    pub linear_velocity: Option<Vec3>,
    /// Angular velocity in radians per second (world space).
    pub angular_velocity: Option<Vec3>,
    /// Whether the object was under active simulation at this instant.
    pub active: bool,
    /// Flattened vertex data (deformable bodies only).
    vertices: Vec<f32>,
    /// Whether `vertices` is meaningful.
    has_vertices: bool,
}

impl StateSnapshot {
    /// Returns the vertex array, if this snapshot carries one.
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> Option<&[f32]> {
        self.has_vertices.then_some(self.vertices.as_slice())
    }

    /// Replaces the vertex array, reusing the existing allocation.
    pub fn set_vertices(&mut self, vertices: Option<&[f32]>) {
        self.vertices.clear();
        match vertices {
            Some(data) => {
                self.vertices.extend_from_slice(data);
                self.has_vertices = true;
            }
            None => self.has_vertices = false,
        }
    }

    /// Returns true if linear velocity is present.
    #[inline]
    #[must_use]
    pub const fn has_velocity(&self) -> bool {
        self.linear_velocity.is_some()
    }

    /// Turns `self` into the bridge for a sleeping `tail` that wakes up.
    ///
    /// Holds the tail's transform and mesh, at rest but flagged active, so the
    /// curve into the wake-up sample starts from zero velocity.
    pub(crate) fn make_bridge(&mut self, tail: &Self, timestamp: Nanos) {
        self.timestamp = timestamp;
        self.transform = tail.transform;
        self.linear_velocity = Some(Vec3::ZERO);
        self.angular_velocity = Some(Vec3::ZERO);
        self.active = true;
        self.set_vertices(tail.vertices());
    }
}

impl Recycle for StateSnapshot {
    fn recycle(&mut self) {
        self.timestamp = 0;
        self.transform = Transform::IDENTITY;
        self.linear_velocity = None;
        self.angular_velocity = None;
        self.active = false;
        self.vertices.clear();
        self.has_vertices = false;
    }
}

/// Borrowed view of an incoming snapshot, as handed over by the sync layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapshotInput<'a> {
    /// Authoritative instant of this sample.
    pub timestamp: Nanos,
    /// Translation and rotation.
    pub transform: Transform,
    /// Linear velocity in units per second.
    pub linear_velocity: Option<Vec3>,
    /// Angular velocity in radians per second.
    pub angular_velocity: Option<Vec3>,
    /// Flattened vertex data.
    pub vertices: Option<&'a [f32]>,
    /// Whether the object is under active simulation.
    pub active: bool,
}

impl<'a> SnapshotInput<'a> {
    /// An active sample without velocity or mesh data.
    #[must_use]
    pub const fn new(timestamp: Nanos, transform: Transform) -> Self {
        Self {
            timestamp,
            transform,
            linear_velocity: None,
            angular_velocity: None,
            vertices: None,
            active: true,
        }
    }

    /// Attaches linear and angular velocity.
    #[must_use]
    pub const fn with_velocity(mut self, linear: Vec3, angular: Vec3) -> Self {
        self.linear_velocity = Some(linear);
        self.angular_velocity = Some(angular);
        self
    }

    /// Attaches a vertex array.
    #[must_use]
    pub const fn with_vertices(mut self, vertices: &'a [f32]) -> Self {
        self.vertices = Some(vertices);
        self
    }

    /// Marks the sample as resting (inactive).
    #[must_use]
    pub const fn resting(mut self) -> Self {
        self.active = false;
        self
    }

    /// Returns true if the transform and velocities are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        let r = self.transform.rotation;
        self.transform.translation.is_finite()
            && r.x.is_finite()
            && r.y.is_finite()
            && r.z.is_finite()
            && r.w.is_finite()
            && self.linear_velocity.map_or(true, Vec3::is_finite)
            && self.angular_velocity.map_or(true, Vec3::is_finite)
    }

    /// Copies this input into a pooled snapshot.
    ///
    /// Rotation is renormalized; vertex data is dropped unless `keep_vertices`.
    pub(crate) fn write_into(&self, snapshot: &mut StateSnapshot, keep_vertices: bool) {
        snapshot.timestamp = self.timestamp;
        snapshot.transform = Transform::new(
            self.transform.translation,
            self.transform.rotation.normalize(),
        );
        snapshot.linear_velocity = self.linear_velocity;
        snapshot.angular_velocity = self.angular_velocity;
        snapshot.active = self.active;
        snapshot.set_vertices(if keep_vertices { self.vertices } else { None });
    }
}
