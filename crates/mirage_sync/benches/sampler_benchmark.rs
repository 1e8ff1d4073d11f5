//! # Sampler Benchmark
//!
//! Per-frame cost of the interpolation pipeline.
//!
//! Measures:
//! 1. `sample` across many objects (the per-frame hot path)
//! 2. `ingest` steady-state throughput (pool warm, trimming active)
//! 3. Deformable sampling with large vertex arrays

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mirage_core::{Transform, Vec3};
use mirage_sync::{ObjectId, RenderState, Sampler, SnapshotInput, SyncConfig, NANOS_PER_MILLI};

const SEND_INTERVAL: i64 = 50 * NANOS_PER_MILLI;

fn moving<'a>(t: i64, x: f64) -> SnapshotInput<'a> {
    SnapshotInput::new(t, Transform::from_translation(Vec3::new(x, 0.0, 0.0)))
        .with_velocity(Vec3::X, Vec3::ZERO)
}

fn filled(objects: u64) -> Sampler {
    let mut sampler = Sampler::new(SyncConfig::default()).unwrap();
    for step in 0..20 {
        let t = step * SEND_INTERVAL;
        for id in 0..objects {
            sampler.ingest(ObjectId(id), t, &moving(t, step as f64));
        }
    }
    sampler
}

fn bench_sample(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample");

    for objects in [1u64, 100, 1_000] {
        let sampler = filled(objects);
        let mut out = RenderState::new();
        let render = 17 * SEND_INTERVAL + 20 * NANOS_PER_MILLI;

        group.throughput(Throughput::Elements(objects));
        group.bench_with_input(BenchmarkId::new("objects", objects), &objects, |b, &n| {
            b.iter(|| {
                for id in 0..n {
                    sampler.sample(ObjectId(id), black_box(render), &mut out);
                }
            });
        });
    }

    group.finish();
}

fn bench_ingest(c: &mut Criterion) {
    let mut sampler = filled(1);
    let mut step = 20i64;

    c.bench_function("ingest_steady_state", |b| {
        b.iter(|| {
            let t = step * SEND_INTERVAL;
            sampler.ingest(ObjectId(0), t, black_box(&moving(t, step as f64)));
            step += 1;
        });
    });
}

fn bench_deformable(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_deformable");

    for vertices in [1_024usize, 16_384] {
        let mesh: Vec<f32> = (0..vertices).map(|i| i as f32).collect();
        let mut sampler = Sampler::new(SyncConfig::default()).unwrap();
        for step in 0..10 {
            let t = step * SEND_INTERVAL;
            sampler.ingest(ObjectId(0), t, &moving(t, step as f64).with_vertices(&mesh));
        }
        let mut out = RenderState::with_vertex_capacity(vertices);
        let render = 5 * SEND_INTERVAL + 25 * NANOS_PER_MILLI;

        group.throughput(Throughput::Elements(vertices as u64));
        group.bench_with_input(BenchmarkId::new("floats", vertices), &vertices, |b, _| {
            b.iter(|| sampler.sample(ObjectId(0), black_box(render), &mut out));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sample, bench_ingest, bench_deformable);
criterion_main!(benches);
