//! Per-object snapshot history.

use std::collections::VecDeque;

use mirage_core::Pool;

use super::StateSnapshot;
use crate::config::SyncConfig;
use crate::time::Nanos;

/// Weight of the newest interval in the running mean.
const INTERVAL_SMOOTHING: f64 = 0.125;

/// Result of [`SnapshotBuffer::append`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Snapshot appended.
    Appended,
    /// A bridge snapshot was inserted ahead of the appended one.
    Bridged,
    /// Not newer than the tail; discarded.
    Stale,
}

/// Snapshots around a render timestamp.
#[derive(Clone, Copy, Debug)]
pub enum Bracket<'a> {
    /// `from.timestamp <= render < to.timestamp`.
    Between {
        /// Latest snapshot at or before the render time.
        from: &'a StateSnapshot,
        /// Earliest snapshot after the render time.
        to: &'a StateSnapshot,
    },
    /// Render time at or past the newest snapshot.
    After(&'a StateSnapshot),
    /// Render time before the oldest snapshot.
    Before(&'a StateSnapshot),
    /// No snapshots.
    Empty,
}

/// Ordered, bounded history of one object's snapshots.
///
/// Timestamps are strictly increasing. Length is bounded by a hard maximum
/// (FIFO eviction) and softly by an adaptive target plus a time horizon.
pub struct SnapshotBuffer {
    /// Oldest first.
    entries: VecDeque<StateSnapshot>,
    /// Base adaptive target.
    target_len: usize,
    /// Hard maximum.
    max_len: usize,
    /// Entries younger than `newest - horizon` are never trimmed.
    horizon: Nanos,
    /// Send interval the base target is sized for.
    nominal_interval: Nanos,
    /// Bridge placement before a wake-up snapshot.
    bridge_lead: Nanos,
    /// Running mean of inter-sample intervals (nanoseconds).
    mean_interval: f64,
    /// Intervals folded into `mean_interval`.
    interval_samples: u32,
}

impl SnapshotBuffer {
    /// Creates an empty buffer sized from `config`.
    #[must_use]
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            // +1 for a bridge, +1 for the entry appended before eviction
            entries: VecDeque::with_capacity(config.max_buffer_len + 2),
            target_len: config.buffer_target_len,
            max_len: config.max_buffer_len,
            horizon: config.buffer_horizon(),
            nominal_interval: config.nominal_snapshot_interval(),
            bridge_lead: config.bridge_lead(),
            mean_interval: 0.0,
            interval_samples: 0,
        }
    }

    /// Returns the number of buffered snapshots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the buffer holds no snapshots.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the newest snapshot.
    #[inline]
    #[must_use]
    pub fn latest(&self) -> Option<&StateSnapshot> {
        self.entries.back()
    }

    /// Returns the oldest snapshot.
    #[inline]
    #[must_use]
    pub fn oldest(&self) -> Option<&StateSnapshot> {
        self.entries.front()
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &StateSnapshot> {
        self.entries.iter()
    }

    /// Returns the running mean of inter-sample intervals.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn mean_interval(&self) -> Nanos {
        self.mean_interval.round() as Nanos
    }

    /// Appends a snapshot if it is strictly newer than the tail.
    ///
    /// Stale snapshots go straight back to `pool`. When a resting tail is
    /// followed by an active snapshot, a bridge snapshot is inserted first.
    pub fn append(&mut self, snapshot: StateSnapshot, pool: &mut Pool<StateSnapshot>) -> AppendOutcome {
        let mut bridge = None;

        if let Some(tail) = self.entries.back() {
            if snapshot.timestamp <= tail.timestamp {
                pool.release(snapshot);
                return AppendOutcome::Stale;
            }

            let gap = snapshot.timestamp - tail.timestamp;
            if !tail.active && snapshot.active {
                let bridge_at = snapshot.timestamp - self.bridge_lead.min(gap / 2);
                if bridge_at > tail.timestamp {
                    let mut b = pool.acquire();
                    b.make_bridge(tail, bridge_at);
                    bridge = Some(b);
                }
            }
            self.record_interval(gap);
        }

        let outcome = match bridge {
            Some(b) => {
                tracing::trace!("Bridge snapshot at t={}", b.timestamp);
                self.entries.push_back(b);
                AppendOutcome::Bridged
            }
            None => AppendOutcome::Appended,
        };
        self.entries.push_back(snapshot);

        while self.entries.len() > self.max_len {
            if let Some(evicted) = self.entries.pop_front() {
                pool.release(evicted);
            }
        }

        outcome
    }

    /// Current trimming target, grown for slow streams.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn adaptive_target(&self) -> usize {
        let nominal = self.nominal_interval as f64;
        if self.interval_samples == 0 || self.mean_interval <= nominal {
            return self.target_len;
        }
        let scaled = (self.target_len as f64 * (self.mean_interval / nominal)).ceil();
        (scaled as usize).clamp(self.target_len, self.max_len)
    }

    /// Drops old history.
    ///
    /// Entries leave the front while the buffer is longer than the adaptive
    /// target and the front is older than `now - horizon`. At least two
    /// entries are always kept. Returns the number dropped.
    pub fn trim(&mut self, now: Nanos, pool: &mut Pool<StateSnapshot>) -> usize {
        let keep = self.adaptive_target().max(2);
        let cutoff = now - self.horizon;
        let mut dropped = 0;

        while self.entries.len() > keep {
            match self.entries.front() {
                Some(front) if front.timestamp < cutoff => {}
                _ => break,
            }
            if let Some(old) = self.entries.pop_front() {
                pool.release(old);
                dropped += 1;
            }
        }

        dropped
    }

    /// Keeps only the newest snapshot. Returns the number dropped.
    ///
    /// Interval statistics restart, since the gap that caused the collapse
    /// says nothing about the stream's rate.
    pub fn collapse_to_latest(&mut self, pool: &mut Pool<StateSnapshot>) -> usize {
        let mut dropped = 0;
        while self.entries.len() > 1 {
            if let Some(old) = self.entries.pop_front() {
                pool.release(old);
                dropped += 1;
            }
        }
        self.mean_interval = 0.0;
        self.interval_samples = 0;
        dropped
    }

    /// Returns every snapshot to `pool`.
    pub fn clear(&mut self, pool: &mut Pool<StateSnapshot>) {
        for snapshot in self.entries.drain(..) {
            pool.release(snapshot);
        }
        self.mean_interval = 0.0;
        self.interval_samples = 0;
    }

    /// Finds the snapshots around `render`.
    ///
    /// Scans newest to oldest, so the common case (render time near the head)
    /// touches only a few entries.
    #[must_use]
    pub fn locate_bracket(&self, render: Nanos) -> Bracket<'_> {
        let mut to = None;
        for snapshot in self.entries.iter().rev() {
            if snapshot.timestamp <= render {
                return match to {
                    Some(to) => Bracket::Between { from: snapshot, to },
                    None => Bracket::After(snapshot),
                };
            }
            to = Some(snapshot);
        }
        match to {
            Some(first) => Bracket::Before(first),
            None => Bracket::Empty,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn record_interval(&mut self, gap: Nanos) {
        let gap = gap as f64;
        self.mean_interval = if self.interval_samples == 0 {
            gap
        } else {
            self.mean_interval * (1.0 - INTERVAL_SMOOTHING) + gap * INTERVAL_SMOOTHING
        };
        self.interval_samples = self.interval_samples.saturating_add(1);
    }
}
