//! # MIRAGE Sync
//!
//! Client-side snapshot interpolation: turns a jittery, lossy stream of
//! timestamped authoritative snapshots into smooth per-frame transforms.
//!
//! ## Pipeline
//!
//! ```text
//! ┌───────────┐   ┌────────────────┐   ┌─────────────────┐   ┌─────────────┐
//! │  Network  │──►│  Clock offset  │──►│ Snapshot buffer │──►│ Interpolate │
//! │  thread   │   │  (smoothed)    │   │  (per object)   │   │ Extrapolate │
//! └───────────┘   └────────────────┘   └─────────────────┘   └─────────────┘
//!                                                                   │
//!                              render time = remote now - delay     ▼
//!                                                             RenderState
//! ```
//!
//! ## Architecture Rules
//!
//! 1. **Render in the past** - The render timestamp trails the estimated
//!    remote clock by a fixed delay, so two snapshots usually bracket it
//! 2. **Never fail a frame** - Stale, duplicate and malformed input is ignored
//! 3. **No allocation once warm** - Snapshots and vertex buffers are recycled
//! 4. **Single owner** - One thread owns the [`Sampler`]; [`handoff`] feeds it
//!
//! ## Example
//!
//! ```rust
//! use mirage_core::{Transform, Vec3};
//! use mirage_sync::{ObjectId, RenderState, Sampler, SnapshotInput, SyncConfig};
//!
//! let mut sampler = Sampler::new(SyncConfig::default())?;
//! let id = ObjectId(1);
//! let ms = 1_000_000;
//!
//! for (t, x) in [(0, 0.0), (50, 1.0), (100, 2.0)] {
//!     let pose = Transform::from_translation(Vec3::new(x, 0.0, 0.0));
//!     sampler.ingest(id, t * ms, &SnapshotInput::new(t * ms, pose));
//! }
//!
//! let mut out = RenderState::new();
//! sampler.sample(id, 75 * ms, &mut out);
//! assert!((out.translation.x - 1.5).abs() < 1e-9);
//! # Ok::<(), mirage_sync::SyncError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod clock;
pub mod config;
pub mod error;
pub mod extrapolation;
pub mod handoff;
pub mod interpolation;
pub mod render;
pub mod sampler;
#[cfg(feature = "simulation")]
pub mod simulation;
pub mod snapshot;
pub mod time;

pub use clock::ClockSynchronizer;
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use extrapolation::ExtrapolationPath;
pub use interpolation::InterpolationEngine;
pub use render::{RenderState, SampleMode};
pub use sampler::{IngestOutcome, ObjectId, ObjectKind, ObjectPhase, Sampler, SamplerStats};
pub use snapshot::{SnapshotBuffer, SnapshotInput, StateSnapshot};
pub use time::{Nanos, NANOS_PER_MILLI, NANOS_PER_SEC};
