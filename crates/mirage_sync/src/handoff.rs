//! # Network Handoff
//!
//! Lock-free hop from the network thread to the thread that owns the
//! [`Sampler`].
//!
//! ```text
//! Network thread                       Render thread
//! ┌──────────────┐   bounded channel   ┌──────────────────────┐
//! │ IngestSender │ ──────────────────► │ IngestReceiver       │
//! │  try_send    │   (drop when full)  │  drain_into(sampler) │
//! └──────────────┘                     └──────────────────────┘
//! ```
//!
//! The sender never blocks. A full channel means the render thread is behind;
//! the message is dropped and counted, and the next snapshot supersedes it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use mirage_core::{Transform, Vec3};

use crate::sampler::{IngestOutcome, ObjectId, Sampler};
use crate::snapshot::SnapshotInput;
use crate::time::Nanos;

/// Owned snapshot crossing the thread boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingSnapshot {
    /// Target object.
    pub id: ObjectId,
    /// Local time the packet arrived.
    pub received_at: Nanos,
    /// Authoritative instant of this sample.
    pub timestamp: Nanos,
    /// Translation and rotation.
    pub transform: Transform,
    /// Linear velocity in units per second.
    pub linear_velocity: Option<Vec3>,
    /// Angular velocity in radians per second.
    pub angular_velocity: Option<Vec3>,
    /// Flattened vertex data.
    pub vertices: Option<Vec<f32>>,
    /// Whether the object is under active simulation.
    pub active: bool,
}

impl PendingSnapshot {
    /// Borrowed view for [`Sampler::ingest`].
    #[must_use]
    pub fn as_input(&self) -> SnapshotInput<'_> {
        SnapshotInput {
            timestamp: self.timestamp,
            transform: self.transform,
            linear_velocity: self.linear_velocity,
            angular_velocity: self.angular_velocity,
            vertices: self.vertices.as_deref(),
            active: self.active,
        }
    }
}

/// Message from the network thread.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncMessage {
    /// A snapshot to ingest.
    Snapshot(PendingSnapshot),
    /// The object was destroyed remotely.
    Release(ObjectId),
}

/// Result of one [`IngestReceiver::drain_into`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Messages processed.
    pub processed: usize,
    /// Snapshots that were appended (including resyncs and bridges).
    pub appended: usize,
    /// Snapshots ignored as stale, rejected or released.
    pub ignored: usize,
    /// Objects released.
    pub released: usize,
}

/// Creates a handoff channel holding at most `capacity` messages.
///
/// A capacity of zero is raised to one: senders never block, so a
/// rendezvous channel would drop every message.
#[must_use]
pub fn channel(capacity: usize) -> (IngestSender, IngestReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        IngestSender {
            tx,
            dropped: Arc::clone(&dropped),
        },
        IngestReceiver { rx, dropped },
    )
}

/// Network-thread end. Cheap to clone.
#[derive(Clone)]
pub struct IngestSender {
    tx: Sender<SyncMessage>,
    dropped: Arc<AtomicU64>,
}

impl IngestSender {
    /// Queues a snapshot. Returns false if it was dropped.
    pub fn send_snapshot(&self, snapshot: PendingSnapshot) -> bool {
        self.send(SyncMessage::Snapshot(snapshot))
    }

    /// Queues a release. Returns false if it was dropped.
    pub fn send_release(&self, id: ObjectId) -> bool {
        self.send(SyncMessage::Release(id))
    }

    /// Queues a message without blocking. Returns false if it was dropped.
    pub fn send(&self, message: SyncMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!("Handoff queue full, dropped message ({} total)", total);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("Handoff receiver gone, message discarded");
                false
            }
        }
    }

    /// Messages dropped because the queue was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Render-thread end.
pub struct IngestReceiver {
    rx: Receiver<SyncMessage>,
    dropped: Arc<AtomicU64>,
}

impl IngestReceiver {
    /// Applies every queued message to `sampler` without blocking.
    pub fn drain_into(&self, sampler: &mut Sampler) -> DrainReport {
        let mut report = DrainReport::default();

        for message in self.rx.try_iter() {
            report.processed += 1;
            match message {
                SyncMessage::Snapshot(snapshot) => {
                    let outcome = sampler.ingest(snapshot.id, snapshot.received_at, &snapshot.as_input());
                    match outcome {
                        IngestOutcome::Appended | IngestOutcome::Bridged | IngestOutcome::Resynced => {
                            report.appended += 1;
                        }
                        IngestOutcome::Stale | IngestOutcome::Rejected | IngestOutcome::Released => {
                            report.ignored += 1;
                        }
                    }
                }
                SyncMessage::Release(id) => {
                    sampler.release(id);
                    report.released += 1;
                }
            }
        }

        if report.processed > 0 {
            tracing::trace!(
                "Drained {} messages ({} appended, {} ignored, {} released)",
                report.processed,
                report.appended,
                report.ignored,
                report.released
            );
        }
        report
    }

    /// Messages currently queued.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Messages dropped by the sender because the queue was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
