//! # Sampler
//!
//! The public face of the engine: `ingest` on every arriving snapshot,
//! `sample` once per object per displayed frame.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          SAMPLER                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ingest ──► ClockSynchronizer ──► SnapshotBuffer (per object)│
//! │                                        │                     │
//! │  sample ──► locate_bracket ─┬─► InterpolationEngine          │
//! │                             └─► ExtrapolationPath            │
//! │                                        │                     │
//! │                              RenderState (caller-owned)      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Per-object lifecycle
//!
//! ```text
//! Unseen ──► Buffering ──► Steady ──(jitter event)──► Buffering
//!                 └────────────┴──(release)──► Released
//! ```
//!
//! ## Threading
//!
//! Everything here runs on the one thread that owns the sampler. A network
//! thread hands snapshots over through [`crate::handoff`].

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};

use mirage_core::Pool;

use crate::clock::ClockSynchronizer;
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::extrapolation::ExtrapolationPath;
use crate::interpolation::InterpolationEngine;
use crate::render::{RenderState, SampleMode};
use crate::snapshot::{AppendOutcome, Bracket, SnapshotBuffer, SnapshotInput, StateSnapshot};
use crate::time::Nanos;

/// Identifier of a replicated object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// Capability flag selecting which snapshot data an object keeps.
///
/// Objects registered implicitly by `ingest` start `Rigid` and become
/// `Deformable` on their first snapshot carrying vertices. Only an explicit
/// [`Sampler::track`] pins the kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ObjectKind {
    /// Transform only; vertex data is discarded on ingest.
    #[default]
    Rigid,
    /// Transform plus a vertex array that may change topology.
    Deformable,
}

impl ObjectKind {
    /// Returns true if vertex data is kept.
    #[inline]
    #[must_use]
    pub const fn has_mesh_data(self) -> bool {
        matches!(self, Self::Deformable)
    }
}

/// Per-object state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectPhase {
    /// No snapshot received.
    Unseen,
    /// One snapshot; only holding or extrapolation possible.
    Buffering,
    /// Two or more snapshots; interpolation available.
    Steady,
    /// Buffer discarded; further snapshots are ignored.
    Released,
}

/// What `ingest` did with a snapshot. None of these are errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Appended to the buffer.
    Appended,
    /// Appended after a sleep-to-wake bridge snapshot.
    Bridged,
    /// Appended after a jitter event collapsed the buffer.
    ///
    /// Only raised when the previous snapshot was active; a resting object
    /// may go quiet for any length of time.
    Resynced,
    /// Not newer than the buffered tail; ignored.
    Stale,
    /// Non-finite transform or velocity; ignored.
    Rejected,
    /// Object already released; ignored.
    Released,
}

/// Ingest counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SamplerStats {
    /// Snapshots appended (bridges excluded).
    pub ingested: u64,
    /// Stale or duplicate snapshots ignored.
    pub stale: u64,
    /// Non-finite snapshots ignored.
    pub rejected: u64,
    /// Bridge snapshots inserted.
    pub bridges: u64,
    /// Jitter events (buffer collapse + clock reseed).
    pub resyncs: u64,
    /// Snapshots dropped by trimming or collapse.
    pub trimmed: u64,
    /// Objects released.
    pub released: u64,
}

/// Buffer and capability flag of one object.
struct ObjectTrack {
    buffer: SnapshotBuffer,
    kind: ObjectKind,
    /// Set by `track`; the kind no longer follows the incoming data.
    pinned: bool,
}

/// Bounded memory of released ids, oldest forgotten first.
struct ReleasedIds {
    ids: HashSet<ObjectId>,
    order: VecDeque<ObjectId>,
    capacity: usize,
}

impl ReleasedIds {
    fn new(capacity: usize) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains(&id)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn insert(&mut self, id: ObjectId) {
        if self.capacity == 0 || !self.ids.insert(id) {
            return;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        self.order.push_back(id);
    }

    fn remove(&mut self, id: ObjectId) {
        if self.ids.remove(&id) {
            self.order.retain(|&other| other != id);
        }
    }
}

/// Snapshot interpolation front end for every object on one connection.
pub struct Sampler {
    /// Active configuration.
    config: SyncConfig,
    /// Connection clock.
    clock: ClockSynchronizer,
    /// Two-snapshot blending.
    interpolation: InterpolationEngine,
    /// One-snapshot projection.
    extrapolation: ExtrapolationPath,
    /// Recycled snapshots shared by all buffers.
    pool: Pool<StateSnapshot>,
    /// Live objects.
    tracks: HashMap<ObjectId, ObjectTrack>,
    /// Objects in the terminal `Released` phase.
    released: ReleasedIds,
    /// Jitter gap threshold, cached from config.
    jitter_gap: Nanos,
    /// Render delay, cached from config.
    interpolation_delay: Nanos,
    /// Counters.
    stats: SamplerStats,
}

impl Sampler {
    /// Creates a sampler after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`](crate::SyncError::InvalidConfig)
    /// if any value is out of range.
    pub fn new(config: SyncConfig) -> SyncResult<Self> {
        config.validate()?;
        Ok(Self {
            clock: ClockSynchronizer::from_config(&config),
            interpolation: InterpolationEngine::from_config(&config),
            extrapolation: ExtrapolationPath::from_config(&config),
            pool: Pool::new(config.pool_prewarm, config.pool_max_free),
            tracks: HashMap::new(),
            released: ReleasedIds::new(config.released_id_capacity),
            jitter_gap: config.jitter_gap(),
            interpolation_delay: config.interpolation_delay(),
            stats: SamplerStats::default(),
            config,
        })
    }

    /// Returns the active configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the connection clock.
    #[inline]
    #[must_use]
    pub const fn clock(&self) -> &ClockSynchronizer {
        &self.clock
    }

    /// Returns the ingest counters.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> &SamplerStats {
        &self.stats
    }

    /// Returns the snapshot pool (for diagnostics).
    #[inline]
    #[must_use]
    pub const fn pool(&self) -> &Pool<StateSnapshot> {
        &self.pool
    }

    /// Returns the number of live objects.
    #[inline]
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.tracks.len()
    }

    /// Returns how many released ids are still remembered.
    #[inline]
    #[must_use]
    pub fn released_count(&self) -> usize {
        self.released.len()
    }

    /// Returns an object's buffer.
    #[must_use]
    pub fn buffer(&self, id: ObjectId) -> Option<&SnapshotBuffer> {
        self.tracks.get(&id).map(|track| &track.buffer)
    }

    /// Returns an object's lifecycle phase.
    #[must_use]
    pub fn phase(&self, id: ObjectId) -> ObjectPhase {
        if self.released.contains(id) {
            return ObjectPhase::Released;
        }
        match self.tracks.get(&id).map(|track| track.buffer.len()) {
            None | Some(0) => ObjectPhase::Unseen,
            Some(1) => ObjectPhase::Buffering,
            Some(_) => ObjectPhase::Steady,
        }
    }

    /// Registers an object ahead of its first snapshot and pins its kind.
    ///
    /// Also the only way back from `Released`, for ids the sync layer reuses.
    pub fn track(&mut self, id: ObjectId, kind: ObjectKind) {
        self.released.remove(id);
        match self.tracks.entry(id) {
            Entry::Occupied(mut entry) => {
                let track = entry.get_mut();
                track.kind = kind;
                track.pinned = true;
            }
            Entry::Vacant(entry) => {
                tracing::debug!("Tracking object {} as {:?}", id.0, kind);
                entry.insert(ObjectTrack {
                    buffer: SnapshotBuffer::new(&self.config),
                    kind,
                    pinned: true,
                });
            }
        }
    }

    /// Feeds one snapshot received at local time `received_at`.
    ///
    /// Never fails: stale, duplicate or malformed input is ignored and
    /// reported through the returned [`IngestOutcome`].
    pub fn ingest(&mut self, id: ObjectId, received_at: Nanos, input: &SnapshotInput<'_>) -> IngestOutcome {
        if self.released.contains(id) {
            tracing::trace!("Ignoring snapshot for released object {}", id.0);
            return IngestOutcome::Released;
        }
        if !input.is_finite() {
            self.stats.rejected += 1;
            tracing::warn!("Rejected non-finite snapshot for object {} at t={}", id.0, input.timestamp);
            return IngestOutcome::Rejected;
        }

        let track = match self.tracks.entry(id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                tracing::debug!("First snapshot for object {}", id.0);
                entry.insert(ObjectTrack {
                    buffer: SnapshotBuffer::new(&self.config),
                    kind: ObjectKind::Rigid,
                    pinned: false,
                })
            }
        };
        if !track.pinned && track.kind == ObjectKind::Rigid && input.vertices.is_some() {
            tracing::debug!("Object {} carries vertices, keeping mesh data", id.0);
            track.kind = ObjectKind::Deformable;
        }

        let mut desync = false;
        if let Some(tail) = track.buffer.latest() {
            if input.timestamp <= tail.timestamp {
                self.stats.stale += 1;
                return IngestOutcome::Stale;
            }
            // Resting objects may legitimately go quiet; only active streams desync.
            desync = tail.active && input.timestamp - tail.timestamp > self.jitter_gap;
        }

        if desync {
            self.clock.mark_desync();
        }
        self.clock.add_sample(input.timestamp - received_at);

        let mut snapshot = self.pool.acquire();
        input.write_into(&mut snapshot, track.kind.has_mesh_data());
        let appended = track.buffer.append(snapshot, &mut self.pool);

        let outcome = if desync {
            let dropped = track.buffer.collapse_to_latest(&mut self.pool);
            self.stats.trimmed += dropped as u64;
            self.stats.resyncs += 1;
            tracing::debug!(
                "Jitter event on object {}: dropped {} snapshots, clock reseeding",
                id.0,
                dropped
            );
            IngestOutcome::Resynced
        } else if appended == AppendOutcome::Bridged {
            self.stats.bridges += 1;
            IngestOutcome::Bridged
        } else {
            IngestOutcome::Appended
        };

        let dropped = track.buffer.trim(input.timestamp, &mut self.pool);
        self.stats.trimmed += dropped as u64;
        self.stats.ingested += 1;

        outcome
    }

    /// Writes the state of `id` at `render` into `out`.
    ///
    /// Pure with respect to buffered data; unknown or released objects get
    /// the identity transform.
    pub fn sample(&self, id: ObjectId, render: Nanos, out: &mut RenderState) -> SampleMode {
        let Some(track) = self.tracks.get(&id) else {
            out.reset();
            return SampleMode::Empty;
        };

        match track.buffer.locate_bracket(render) {
            Bracket::Between { from, to } => self.interpolation.interpolate(from, to, render, out),
            Bracket::After(latest) => self.extrapolation.extrapolate(latest, render, out),
            Bracket::Before(oldest) => {
                out.copy_snapshot(oldest, SampleMode::Held);
                SampleMode::Held
            }
            Bracket::Empty => {
                out.reset();
                SampleMode::Empty
            }
        }
    }

    /// Render timestamp for a frame drawn at local time `local_now`.
    #[inline]
    #[must_use]
    pub fn render_timestamp(&self, local_now: Nanos) -> Nanos {
        self.clock.estimate_remote_now(local_now) - self.interpolation_delay
    }

    /// Samples `id` for a frame drawn at local time `local_now`.
    pub fn sample_at_local(&self, id: ObjectId, local_now: Nanos, out: &mut RenderState) -> SampleMode {
        self.sample(id, self.render_timestamp(local_now), out)
    }

    /// Discards an object's buffer and returns its snapshots to the pool.
    ///
    /// Returns false if the object was not tracked; nothing is remembered for
    /// it then.
    pub fn release(&mut self, id: ObjectId) -> bool {
        let Some(mut track) = self.tracks.remove(&id) else {
            return false;
        };
        self.released.insert(id);
        track.buffer.clear(&mut self.pool);
        self.stats.released += 1;
        tracing::debug!("Released object {}", id.0);
        true
    }
}
