//! # Render State
//!
//! Caller-owned scratch written once per frame by the sampler.

use mirage_core::{Quat, Vec3};

use crate::snapshot::StateSnapshot;

/// How a [`RenderState`] was produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SampleMode {
    /// No data for the object; identity transform.
    #[default]
    Empty,
    /// A buffered snapshot copied verbatim.
    Held,
    /// Linear translation blend between two snapshots.
    Linear,
    /// Cubic Hermite translation blend between two snapshots.
    Cubic,
    /// Projected forward from the newest snapshot.
    Extrapolated,
    /// Newest snapshot held in place (resting, no velocity, or stale).
    Frozen,
}

impl SampleMode {
    /// Returns true for the two-snapshot blend modes.
    #[must_use]
    pub const fn is_interpolated(self) -> bool {
        matches!(self, Self::Linear | Self::Cubic)
    }
}

/// Render-ready state of one object.
///
/// Keep one per object (or one per frame loop) and pass it to every
/// `sample` call: the vertex buffer is reused, so a warmed-up state never
/// allocates.
#[derive(Clone, Debug, Default)]
pub struct RenderState {
    /// Translation to draw at.
    pub translation: Vec3,
    /// Rotation to draw with.
    pub rotation: Quat,
    /// Flattened vertex data.
    vertices: Vec<f32>,
    /// Whether `vertices` is meaningful.
    has_vertices: bool,
    /// How this state was produced.
    mode: SampleMode,
}

impl RenderState {
    /// Creates an identity state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an identity state with room for `vertex_count` floats.
    #[must_use]
    pub fn with_vertex_capacity(vertex_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            ..Self::default()
        }
    }

    /// Returns the vertex data, if the sampled snapshots carried any.
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> Option<&[f32]> {
        self.has_vertices.then_some(self.vertices.as_slice())
    }

    /// Returns the reserved vertex storage, in floats.
    #[inline]
    #[must_use]
    pub fn vertex_capacity(&self) -> usize {
        self.vertices.capacity()
    }

    /// Returns how this state was produced.
    #[inline]
    #[must_use]
    pub const fn mode(&self) -> SampleMode {
        self.mode
    }

    /// Resets to identity with no vertices.
    pub(crate) fn reset(&mut self) {
        self.translation = Vec3::ZERO;
        self.rotation = Quat::IDENTITY;
        self.vertices.clear();
        self.has_vertices = false;
        self.mode = SampleMode::Empty;
    }

    /// Copies a snapshot's transform and mesh verbatim.
    pub(crate) fn copy_snapshot(&mut self, snapshot: &StateSnapshot, mode: SampleMode) {
        self.translation = snapshot.transform.translation;
        self.rotation = snapshot.transform.rotation;
        self.copy_vertices(snapshot.vertices());
        self.mode = mode;
    }

    pub(crate) fn set_mode(&mut self, mode: SampleMode) {
        self.mode = mode;
    }

    pub(crate) fn copy_vertices(&mut self, vertices: Option<&[f32]>) {
        self.vertices.clear();
        match vertices {
            Some(data) => {
                self.vertices.extend_from_slice(data);
                self.has_vertices = true;
            }
            None => self.has_vertices = false,
        }
    }

    /// Component-wise blend of two equal-length vertex arrays.
    pub(crate) fn blend_vertices(&mut self, from: &[f32], to: &[f32], alpha: f32) {
        debug_assert_eq!(from.len(), to.len());
        self.vertices.clear();
        self.vertices
            .extend(from.iter().zip(to).map(|(a, b)| a + (b - a) * alpha));
        self.has_vertices = true;
    }
}
