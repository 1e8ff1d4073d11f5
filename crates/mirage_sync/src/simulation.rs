//! # Jitter Simulation
//!
//! Drives a [`Sampler`] with a synthetic authoritative stream sent over a
//! simulated network, and measures how far the rendered state strays from
//! the ground truth at the render timestamp.
//!
//! ## Scenario
//!
//! - One object orbiting a circle, spinning about Y as it goes
//! - A rest period mid-run: one resting snapshot, then silence until it wakes
//! - Latency, jitter, loss and duplication per [`NetworkConditions`]
//! - Local clock offset from the remote clock by a fixed skew
//! - Frames drawn at a fixed local rate
//!
//! Error is measured against the truth at the *render* timestamp, so it
//! reflects reconstruction quality rather than the deliberate delay.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use mirage_core::{Quat, Transform, Vec3};

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::render::{RenderState, SampleMode};
use crate::sampler::{ObjectId, Sampler, SamplerStats};
use crate::snapshot::SnapshotInput;
use crate::time::{as_secs, from_millis, Nanos, NANOS_PER_SEC};

/// Network conditions for simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NetworkConditions {
    /// One-way base latency in milliseconds.
    pub base_latency_ms: f64,
    /// Uniform jitter (+/-) in milliseconds.
    pub jitter_ms: f64,
    /// Packet loss percentage (0-100).
    pub packet_loss_percent: u8,
    /// Duplicate packet percentage (0-100).
    pub duplicate_percent: u8,
}

impl NetworkConditions {
    /// Perfect network conditions (LAN).
    pub const PERFECT: Self = Self {
        base_latency_ms: 1.0,
        jitter_ms: 0.0,
        packet_loss_percent: 0,
        duplicate_percent: 0,
    };

    /// Good network conditions (fiber).
    pub const GOOD: Self = Self {
        base_latency_ms: 20.0,
        jitter_ms: 5.0,
        packet_loss_percent: 0,
        duplicate_percent: 0,
    };

    /// Average network conditions (cable).
    pub const AVERAGE: Self = Self {
        base_latency_ms: 50.0,
        jitter_ms: 20.0,
        packet_loss_percent: 1,
        duplicate_percent: 1,
    };

    /// Poor network conditions (mobile/wifi).
    pub const POOR: Self = Self {
        base_latency_ms: 100.0,
        jitter_ms: 50.0,
        packet_loss_percent: 5,
        duplicate_percent: 2,
    };
}

impl Default for NetworkConditions {
    fn default() -> Self {
        Self::AVERAGE
    }
}

/// Simulation parameters.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    /// Network the snapshots travel over.
    pub conditions: NetworkConditions,
    /// Authoritative send rate.
    pub send_rate_hz: f64,
    /// Local frame rate.
    pub frame_rate_hz: f64,
    /// Authoritative run length in seconds.
    pub duration_secs: f64,
    /// Rest period `(start, end)` in seconds on the authoritative timeline.
    pub rest_secs: Option<(f64, f64)>,
    /// Orbit radius in units.
    pub radius: f64,
    /// Orbit and spin rate in radians per second.
    pub angular_speed: f64,
    /// Remote clock minus local clock, in milliseconds.
    pub clock_skew_ms: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            conditions: NetworkConditions::AVERAGE,
            send_rate_hz: 20.0,
            frame_rate_hz: 60.0,
            duration_secs: 10.0,
            rest_secs: Some((4.0, 6.0)),
            radius: 5.0,
            angular_speed: 1.0,
            clock_skew_ms: 7_250.0,
            seed: 0x5EED,
        }
    }
}

/// Frames per [`SampleMode`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModeCounts {
    /// Frames with no data.
    pub empty: u32,
    /// Frames holding a buffered snapshot.
    pub held: u32,
    /// Linear blend frames.
    pub linear: u32,
    /// Cubic blend frames.
    pub cubic: u32,
    /// Extrapolated frames.
    pub extrapolated: u32,
    /// Frozen frames.
    pub frozen: u32,
}

impl ModeCounts {
    fn record(&mut self, mode: SampleMode) {
        let slot = match mode {
            SampleMode::Empty => &mut self.empty,
            SampleMode::Held => &mut self.held,
            SampleMode::Linear => &mut self.linear,
            SampleMode::Cubic => &mut self.cubic,
            SampleMode::Extrapolated => &mut self.extrapolated,
            SampleMode::Frozen => &mut self.frozen,
        };
        *slot += 1;
    }
}

/// Simulation results.
#[derive(Clone, Debug, Default)]
pub struct SimulationReport {
    /// Frames drawn.
    pub frames: u32,
    /// Frames with data (error measured).
    pub measured_frames: u32,
    /// Snapshots the server sent.
    pub snapshots_sent: u32,
    /// Snapshots lost in transit.
    pub snapshots_lost: u32,
    /// Extra copies delivered.
    pub snapshots_duplicated: u32,
    /// Mean translation error in units.
    pub mean_error: f64,
    /// Worst translation error in units.
    pub max_error: f64,
    /// Mean rotation error in radians.
    pub mean_rotation_error: f64,
    /// Largest rendered translation change between consecutive frames.
    pub max_frame_step: f64,
    /// Largest truth translation change between consecutive frames.
    pub max_truth_step: f64,
    /// Frames per sample mode.
    pub modes: ModeCounts,
    /// Sampler counters at the end of the run.
    pub sampler: SamplerStats,
}

/// Ground-truth motion of the simulated object.
#[derive(Clone, Copy, Debug)]
pub struct Trajectory {
    radius: f64,
    angular_speed: f64,
    rest: Option<(Nanos, Nanos)>,
}

impl Trajectory {
    /// Builds the trajectory described by `config`.
    #[must_use]
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            radius: config.radius,
            angular_speed: config.angular_speed,
            rest: config
                .rest_secs
                .map(|(start, end)| (from_millis(start * 1000.0), from_millis(end * 1000.0))),
        }
    }

    /// Returns true while the object is at rest.
    #[must_use]
    pub fn is_resting(&self, t: Nanos) -> bool {
        self.rest.map_or(false, |(start, end)| t >= start && t < end)
    }

    /// Seconds of motion elapsed at authoritative time `t`.
    fn motion_secs(&self, t: Nanos) -> f64 {
        let t = t.max(0);
        let moving = match self.rest {
            Some((start, _)) if t < start => t,
            Some((start, end)) if t < end => start,
            Some((start, end)) => t - (end - start),
            None => t,
        };
        as_secs(moving)
    }

    /// Authoritative transform at `t`.
    #[must_use]
    pub fn transform(&self, t: Nanos) -> Transform {
        let angle = self.angular_speed * self.motion_secs(t);
        Transform::new(
            Vec3::new(self.radius * angle.cos(), 0.0, self.radius * angle.sin()),
            Quat::from_axis_angle(Vec3::Y, angle),
        )
    }

    /// Authoritative linear velocity at `t`.
    #[must_use]
    pub fn linear_velocity(&self, t: Nanos) -> Vec3 {
        if self.is_resting(t) {
            return Vec3::ZERO;
        }
        let angle = self.angular_speed * self.motion_secs(t);
        let speed = self.radius * self.angular_speed;
        Vec3::new(-speed * angle.sin(), 0.0, speed * angle.cos())
    }

    /// Authoritative angular velocity at `t`.
    #[must_use]
    pub fn angular_velocity(&self, t: Nanos) -> Vec3 {
        if self.is_resting(t) {
            Vec3::ZERO
        } else {
            Vec3::Y * self.angular_speed
        }
    }

    /// Snapshot the server would send at `t`.
    #[must_use]
    pub fn snapshot(&self, t: Nanos) -> SnapshotInput<'static> {
        let input = SnapshotInput::new(t, self.transform(t))
            .with_velocity(self.linear_velocity(t), self.angular_velocity(t));
        if self.is_resting(t) {
            input.resting()
        } else {
            input
        }
    }
}

/// Snapshot in transit.
struct InFlight {
    /// Local arrival time.
    arrival: Nanos,
    input: SnapshotInput<'static>,
}

/// Runs one simulation.
///
/// # Errors
///
/// Returns an error if `sync` is not a valid configuration.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn run(sync: SyncConfig, config: &SimulationConfig) -> SyncResult<SimulationReport> {
    const OBJECT: ObjectId = ObjectId(1);

    let mut sampler = Sampler::new(sync)?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let trajectory = Trajectory::new(config);

    let skew = from_millis(config.clock_skew_ms);
    let send_interval = (NANOS_PER_SEC as f64 / config.send_rate_hz).round() as Nanos;
    let frame_interval = (NANOS_PER_SEC as f64 / config.frame_rate_hz).round() as Nanos;
    let duration = from_millis(config.duration_secs * 1000.0);
    let conditions = config.conditions;

    let mut report = SimulationReport::default();
    let mut in_flight: Vec<InFlight> = Vec::with_capacity(64);
    let mut arrived: Vec<InFlight> = Vec::with_capacity(16);
    let mut out = RenderState::new();
    let mut previous: Option<(Vec3, Vec3)> = None;
    let mut error_sum = 0.0;
    let mut rotation_error_sum = 0.0;

    let mut next_send: Nanos = 0;
    let mut was_resting = false;
    // Local clock = remote clock - skew
    let mut local_now = -skew;
    let local_end = duration + sync_tail(&sampler) - skew;

    tracing::info!(
        "Simulating {:.1}s at {}Hz over {:?}",
        config.duration_secs,
        config.send_rate_hz,
        conditions
    );

    while local_now <= local_end {
        let remote_now = local_now + skew;

        // Server side
        while next_send <= remote_now && next_send <= duration {
            let resting = trajectory.is_resting(next_send);
            // Sleeping objects send once, then go quiet until they wake
            if !(resting && was_resting) {
                report.snapshots_sent += 1;
                if roll(&mut rng, conditions.packet_loss_percent) {
                    report.snapshots_lost += 1;
                } else {
                    let input = trajectory.snapshot(next_send);
                    let sent_local = next_send - skew;
                    in_flight.push(InFlight {
                        arrival: sent_local + latency(&mut rng, &conditions),
                        input,
                    });
                    if roll(&mut rng, conditions.duplicate_percent) {
                        report.snapshots_duplicated += 1;
                        in_flight.push(InFlight {
                            arrival: sent_local + latency(&mut rng, &conditions),
                            input,
                        });
                    }
                }
            }
            was_resting = resting;
            next_send += send_interval;
        }

        // Delivery
        let mut i = 0;
        while i < in_flight.len() {
            if in_flight[i].arrival <= local_now {
                arrived.push(in_flight.swap_remove(i));
            } else {
                i += 1;
            }
        }
        arrived.sort_by_key(|packet| packet.arrival);
        for packet in arrived.drain(..) {
            sampler.ingest(OBJECT, packet.arrival, &packet.input);
        }

        // Client frame
        let render = sampler.render_timestamp(local_now);
        let mode = sampler.sample(OBJECT, render, &mut out);
        report.frames += 1;
        report.modes.record(mode);

        if mode != SampleMode::Empty {
            let truth = trajectory.transform(render);
            let error = out.translation.distance(truth.translation);
            error_sum += error;
            rotation_error_sum += out.rotation.angle_to(truth.rotation);
            report.max_error = report.max_error.max(error);
            report.measured_frames += 1;

            if let Some((prev_rendered, prev_truth)) = previous {
                report.max_frame_step = report.max_frame_step.max(out.translation.distance(prev_rendered));
                report.max_truth_step = report.max_truth_step.max(truth.translation.distance(prev_truth));
            }
            previous = Some((out.translation, truth.translation));
        }

        local_now += frame_interval;
    }

    if report.measured_frames > 0 {
        report.mean_error = error_sum / f64::from(report.measured_frames);
        report.mean_rotation_error = rotation_error_sum / f64::from(report.measured_frames);
    }
    report.sampler = *sampler.stats();

    tracing::info!(
        "Simulation done: {} frames, mean error {:.4}, max error {:.4}",
        report.frames,
        report.mean_error,
        report.max_error
    );
    Ok(report)
}

/// Extra local time after the last send so the render clock catches up.
fn sync_tail(sampler: &Sampler) -> Nanos {
    sampler.config().interpolation_delay()
}

fn roll(rng: &mut StdRng, percent: u8) -> bool {
    percent > 0 && rng.gen_range(0u8..100) < percent
}

fn latency(rng: &mut StdRng, conditions: &NetworkConditions) -> Nanos {
    let jitter = if conditions.jitter_ms > 0.0 {
        rng.gen_range(-conditions.jitter_ms..=conditions.jitter_ms)
    } else {
        0.0
    };
    from_millis((conditions.base_latency_ms + jitter).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trajectory_rest_is_continuous() {
        let trajectory = Trajectory::new(&SimulationConfig::default());
        let before = trajectory.transform(from_millis(3_999.0));
        let during = trajectory.transform(from_millis(5_000.0));
        let after = trajectory.transform(from_millis(6_001.0));

        assert!(trajectory.is_resting(from_millis(5_000.0)));
        assert!(!trajectory.is_resting(from_millis(6_000.0)));
        assert!(before.translation.distance(during.translation) < 0.01);
        assert!(during.translation.distance(after.translation) < 0.01);
        assert_eq!(trajectory.linear_velocity(from_millis(5_000.0)), Vec3::ZERO);
        assert!(!trajectory.snapshot(from_millis(5_000.0)).active);
    }

    #[test]
    fn test_perfect_network_is_accurate() {
        let config = SimulationConfig {
            conditions: NetworkConditions::PERFECT,
            ..SimulationConfig::default()
        };
        let report = run(SyncConfig::default(), &config).unwrap();

        assert!(report.measured_frames > 500);
        assert_eq!(report.snapshots_lost, 0);
        assert!(report.mean_error < 0.01, "mean error {}", report.mean_error);
        assert_eq!(report.sampler.resyncs, 0);
        assert!(report.sampler.bridges >= 1);
    }

    #[test]
    fn test_same_seed_same_result() {
        let a = run(SyncConfig::default(), &SimulationConfig::default()).unwrap();
        let b = run(SyncConfig::default(), &SimulationConfig::default()).unwrap();
        assert_eq!(a.frames, b.frames);
        assert_eq!(a.snapshots_lost, b.snapshots_lost);
        assert!((a.mean_error - b.mean_error).abs() < f64::EPSILON);
    }
}
