//! # Sampler Scenario Tests
//!
//! End-to-end behaviour through the public `Sampler` API:
//!
//! 1. **Reference scenarios**: linear blend, extrapolate-then-freeze, resting freeze
//! 2. **Buffer guarantees**: stale input is a no-op, history stays bounded
//! 3. **Blend guarantees**: linear output stays on the segment, cubic never overshoots
//! 4. **Sleep/wake**: the bridge keeps the wake-up from snapping
//! 5. **Jitter recovery**: long gaps collapse history and reseed the clock
//! 6. **Steady state**: a warm sampler stops allocating

use mirage_core::{Quat, Transform, Vec3};
use mirage_sync::{
    IngestOutcome, Nanos, ObjectId, ObjectPhase, RenderState, SampleMode, Sampler, SnapshotInput,
    SyncConfig, NANOS_PER_MILLI,
};

const MS: Nanos = NANOS_PER_MILLI;
const ID: ObjectId = ObjectId(42);

fn sampler() -> Sampler {
    Sampler::new(SyncConfig::default()).unwrap()
}

fn pose(x: f64) -> Transform {
    Transform::from_translation(Vec3::new(x, 0.0, 0.0))
}

fn moving<'a>(t: Nanos, x: f64, vx: f64) -> SnapshotInput<'a> {
    SnapshotInput::new(t, pose(x)).with_velocity(Vec3::new(vx, 0.0, 0.0), Vec3::ZERO)
}

/// Feeds a snapshot that arrived the instant it was produced.
fn feed(s: &mut Sampler, input: &SnapshotInput<'_>) -> IngestOutcome {
    s.ingest(ID, input.timestamp, input)
}

fn buffered(s: &Sampler) -> Vec<(Nanos, f64)> {
    s.buffer(ID)
        .map(|b| b.iter().map(|snap| (snap.timestamp, snap.transform.translation.x)).collect())
        .unwrap_or_default()
}

// ============================================================================
// REFERENCE SCENARIOS
// ============================================================================

#[test]
fn scenario_linear_motion() {
    let mut s = sampler();
    feed(&mut s, &moving(0, 0.0, 1.0));
    feed(&mut s, &moving(100 * MS, 0.1, 1.0));

    let mut out = RenderState::new();
    s.sample(ID, 50 * MS, &mut out);
    assert!((out.translation.x - 0.05).abs() < 1e-9);
    assert_eq!(out.translation.y, 0.0);
    assert_eq!(out.translation.z, 0.0);
}

#[test]
fn scenario_extrapolate_then_freeze() {
    let mut s = sampler();
    feed(&mut s, &moving(0, 0.0, 2.0));

    let mut out = RenderState::new();
    assert_eq!(s.sample(ID, 30 * MS, &mut out), SampleMode::Extrapolated);
    assert!((out.translation.x - 0.06).abs() < 1e-9);

    assert_eq!(s.sample(ID, 500 * MS, &mut out), SampleMode::Frozen);
    assert_eq!(out.translation, Vec3::ZERO);
}

#[test]
fn scenario_resting_object_never_moves() {
    let mut s = sampler();
    feed(&mut s, &SnapshotInput::new(0, pose(5.0)).resting());

    let mut out = RenderState::new();
    for ms in [1, 10, 99, 100, 1_000, 60_000] {
        s.sample(ID, ms * MS, &mut out);
        assert_eq!(out.translation, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(out.mode(), SampleMode::Frozen);
    }
}

#[test]
fn extrapolation_cutoff_is_exact() {
    let mut s = sampler();
    let spin = Quat::from_axis_angle(Vec3::Z, 0.3);
    let input = SnapshotInput::new(200 * MS, Transform::new(Vec3::new(1.0, 2.0, 3.0), spin))
        .with_velocity(Vec3::new(4.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 2.0));
    feed(&mut s, &input);

    let latest = s.buffer(ID).unwrap().latest().unwrap().clone();
    let cap = s.config().max_extrapolation();

    let mut out = RenderState::new();
    s.sample(ID, latest.timestamp + cap + 1, &mut out);
    assert_eq!(out.translation, latest.transform.translation);
    assert_eq!(out.rotation, latest.transform.rotation);

    // Just inside the window the object is still projected
    s.sample(ID, latest.timestamp + cap - MS, &mut out);
    assert_eq!(out.mode(), SampleMode::Extrapolated);
    assert!(out.translation.x > latest.transform.translation.x);
}

#[test]
fn sampling_before_data_is_identity() {
    let s = sampler();
    let mut out = RenderState::new();
    assert_eq!(s.sample(ID, 0, &mut out), SampleMode::Empty);
    assert_eq!(out.translation, Vec3::ZERO);
    assert_eq!(out.rotation, Quat::IDENTITY);
    assert!(out.vertices().is_none());
}

// ============================================================================
// BUFFER GUARANTEES
// ============================================================================

#[test]
fn stale_and_duplicate_input_is_a_no_op() {
    let mut s = sampler();
    for i in 0..5 {
        feed(&mut s, &moving(i * 50 * MS, i as f64, 1.0));
    }
    let before = buffered(&s);

    assert_eq!(feed(&mut s, &moving(200 * MS, 99.0, 1.0)), IngestOutcome::Stale);
    assert_eq!(feed(&mut s, &moving(120 * MS, 99.0, 1.0)), IngestOutcome::Stale);
    assert_eq!(feed(&mut s, &moving(0, 99.0, 1.0)), IngestOutcome::Stale);

    assert_eq!(buffered(&s), before);
    assert_eq!(s.stats().stale, 3);
}

#[test]
fn history_is_bounded() {
    let config = SyncConfig::default();
    let mut s = sampler();

    // Tight 1ms spacing keeps everything inside the time horizon, so only the
    // hard maximum limits growth
    for i in 0..500 {
        feed(&mut s, &moving(i * MS, 0.0, 0.0));
        assert!(s.buffer(ID).unwrap().len() <= config.max_buffer_len);
    }

    // Normal spacing: history older than the horizon is trimmed to target
    let mut s = sampler();
    for i in 0..200 {
        feed(&mut s, &moving(i * 50 * MS, 0.0, 0.0));
    }
    let buffer = s.buffer(ID).unwrap();
    let span = buffer.latest().unwrap().timestamp - buffer.oldest().unwrap().timestamp;
    assert!(buffer.len() >= 2);
    assert!(span <= config.buffer_horizon() || buffer.len() <= buffer.adaptive_target());
    assert_eq!(s.pool().outstanding(), buffer.len());
}

// ============================================================================
// BLEND GUARANTEES
// ============================================================================

#[test]
fn linear_output_stays_on_segment() {
    let mut s = sampler();
    let a = Vec3::new(1.0, -2.0, 0.5);
    let b = Vec3::new(4.0, 2.0, -1.5);
    feed(&mut s, &SnapshotInput::new(0, Transform::from_translation(a)));
    feed(&mut s, &SnapshotInput::new(80 * MS, Transform::from_translation(b)));

    let mut out = RenderState::new();
    let ab = b - a;
    for ms in 0..80 {
        let mode = s.sample(ID, ms * MS, &mut out);
        assert_eq!(mode, SampleMode::Linear);

        let ap = out.translation - a;
        let t = ap.dot(ab) / ab.length_squared();
        assert!((0.0..=1.0).contains(&t));
        // Distance from the segment
        assert!((ap - ab * t).length() < 1e-9);
    }
}

#[test]
fn cubic_never_overshoots_at_rest() {
    let config = SyncConfig {
        cubic_max_interval_ms: 10_000.0,
        jitter_threshold_ms: 10_000.0,
        ..SyncConfig::default()
    };
    let mut s = Sampler::new(config).unwrap();
    feed(&mut s, &moving(0, 7.0, 0.0));
    feed(&mut s, &moving(5_000 * MS, 7.0, 0.0));

    let mut out = RenderState::new();
    for ms in (0..5_000).step_by(125) {
        assert_eq!(s.sample(ID, ms * MS, &mut out), SampleMode::Cubic);
        assert_eq!(out.translation, Vec3::new(7.0, 0.0, 0.0));
    }
}

#[test]
fn rotation_takes_shortest_arc() {
    let mut s = sampler();
    let start = Quat::from_axis_angle(Vec3::Y, 0.1);
    // Same orientation as -0.1 rad, but with a flipped sign
    let end = -Quat::from_axis_angle(Vec3::Y, -0.1);
    feed(&mut s, &SnapshotInput::new(0, Transform::new(Vec3::ZERO, start)));
    feed(&mut s, &SnapshotInput::new(100 * MS, Transform::new(Vec3::ZERO, end)));

    let mut out = RenderState::new();
    s.sample(ID, 50 * MS, &mut out);
    assert!(out.rotation.angle_to(Quat::IDENTITY) < 1e-6);
}

// ============================================================================
// SLEEP / WAKE
// ============================================================================

#[test]
fn wake_up_moves_smoothly_from_rest() {
    let mut s = sampler();
    let a = 0.0;
    let b = 10.0;
    feed(&mut s, &SnapshotInput::new(0, pose(a)));
    feed(&mut s, &SnapshotInput::new(50 * MS, pose(a)).resting());
    assert_eq!(feed(&mut s, &SnapshotInput::new(200 * MS, pose(b))), IngestOutcome::Bridged);
    assert_eq!(s.stats().bridges, 1);

    let mut out = RenderState::new();

    // Frame drawn at local 210ms renders 100ms in the past: still at rest
    s.sample_at_local(ID, 210 * MS, &mut out);
    assert_eq!(out.translation.x, a);

    // Walk frames across the wake-up: monotone, no jump to B
    let mut previous = a;
    for ms in (210..=320).step_by(5) {
        s.sample_at_local(ID, ms * MS, &mut out);
        let x = out.translation.x;
        assert!(x >= previous);
        assert!(x - previous <= (b - a) * 0.11, "jump of {} at {ms}ms", x - previous);
        previous = x;
    }
    assert_eq!(previous, b);

    // Raw render time inside the bridge segment is strictly between A and B
    s.sample(ID, 160 * MS, &mut out);
    assert!(out.translation.x > a && out.translation.x < b);
}

#[test]
fn long_rest_is_not_a_jitter_event() {
    let mut s = sampler();
    feed(&mut s, &SnapshotInput::new(0, pose(1.0)).resting());
    let outcome = feed(&mut s, &SnapshotInput::new(30_000 * MS, pose(2.0)));
    assert_eq!(outcome, IngestOutcome::Bridged);
    assert_eq!(s.stats().resyncs, 0);
    assert_eq!(s.phase(ID), ObjectPhase::Steady);
}

// ============================================================================
// JITTER RECOVERY
// ============================================================================

#[test]
fn long_gap_collapses_history_and_reseeds_clock() {
    let mut s = sampler();
    // Remote clock 2s ahead of local
    for i in 0..10 {
        let t = i * 50 * MS;
        s.ingest(ID, t - 2_000 * MS, &moving(t, i as f64, 1.0));
    }
    assert_eq!(s.clock().offset(), 2_000 * MS);

    // Connection stalls for 3s; the remote clock is now observed 40ms further ahead
    let t = 3_450 * MS;
    let outcome = s.ingest(ID, t - 2_040 * MS, &moving(t, 50.0, 1.0));
    assert_eq!(outcome, IngestOutcome::Resynced);
    assert_eq!(s.phase(ID), ObjectPhase::Buffering);
    assert_eq!(s.buffer(ID).unwrap().len(), 1);
    assert_eq!(s.clock().offset(), 2_040 * MS);

    // The next sample blends with the post-jitter factor, then steady smoothing resumes
    let t = 3_500 * MS;
    s.ingest(ID, t - 2_000 * MS, &moving(t, 51.0, 1.0));
    assert_eq!(s.clock().offset(), 2_020 * MS);
    assert_eq!(s.phase(ID), ObjectPhase::Steady);
}

#[test]
fn malformed_input_is_ignored() {
    let mut s = sampler();
    feed(&mut s, &moving(0, 1.0, 0.0));
    let bad = SnapshotInput::new(50 * MS, pose(f64::INFINITY));
    assert_eq!(feed(&mut s, &bad), IngestOutcome::Rejected);
    assert_eq!(s.buffer(ID).unwrap().len(), 1);
}

// ============================================================================
// DEFORMABLE OBJECTS
// ============================================================================

#[test]
fn mesh_blends_then_follows_topology_change() {
    let mut s = sampler();
    let first = [0.0f32; 6];
    let second = [1.0f32; 6];
    let remeshed = [5.0f32; 9];
    feed(&mut s, &SnapshotInput::new(0, pose(0.0)).with_vertices(&first));
    feed(&mut s, &SnapshotInput::new(100 * MS, pose(0.0)).with_vertices(&second));
    feed(&mut s, &SnapshotInput::new(200 * MS, pose(0.0)).with_vertices(&remeshed));

    let mut out = RenderState::with_vertex_capacity(9);
    s.sample(ID, 50 * MS, &mut out);
    assert_eq!(out.vertices(), Some(&[0.5f32; 6][..]));

    s.sample(ID, 150 * MS, &mut out);
    assert_eq!(out.vertices(), Some(&remeshed[..]));
}

#[test]
fn released_object_ignores_late_snapshots() {
    let mut s = sampler();
    feed(&mut s, &moving(0, 0.0, 1.0));
    assert!(s.release(ID));
    assert_eq!(feed(&mut s, &moving(50 * MS, 1.0, 1.0)), IngestOutcome::Released);
    assert_eq!(s.phase(ID), ObjectPhase::Released);

    let mut out = RenderState::new();
    assert_eq!(s.sample(ID, 50 * MS, &mut out), SampleMode::Empty);
}

// ============================================================================
// STEADY STATE
// ============================================================================

#[test]
fn warm_sampler_does_not_allocate() {
    let mut s = sampler();
    let full: Vec<f32> = (0..64).map(|i| i as f32).collect();
    let half = &full[..32];
    let mut out = RenderState::with_vertex_capacity(full.len());

    // Warm up: two seconds of a moving 20Hz deformable stream
    let mut t = 0;
    for step in 0..40 {
        let input = moving(t, f64::from(step) * 0.1, 2.0).with_vertices(&full);
        feed(&mut s, &input);
        s.sample(ID, t - 100 * MS, &mut out);
        t += 50 * MS;
    }
    let misses = s.pool().misses();
    let capacity = out.vertex_capacity();
    let bridges = s.stats().bridges;
    assert_eq!(misses, 0);

    // Move, rest, wake, with topology changes, for 20 more seconds
    for step in 0..400 {
        let phase = step % 30;
        let x = f64::from(step) * 0.1;
        let vertices = if step % 7 == 0 { half } else { &full[..] };
        let input = if phase < 20 {
            moving(t, x, 2.0).with_vertices(vertices)
        } else {
            SnapshotInput::new(t, pose(x)).with_vertices(vertices).resting()
        };
        feed(&mut s, &input);
        for offset in [-150, -100, -60, 0, 40] {
            s.sample(ID, t + offset * MS, &mut out);
        }
        t += 50 * MS;
    }

    assert!(s.stats().bridges > bridges);
    assert!(s.stats().trimmed > 0);
    assert_eq!(s.stats().resyncs, 0);
    assert_eq!(s.pool().misses(), misses);
    assert_eq!(out.vertex_capacity(), capacity);
}
