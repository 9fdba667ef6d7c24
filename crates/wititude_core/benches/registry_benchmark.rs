//! # Registry Benchmark
//!
//! Measures the cost of the tracking-side writes and the render-side
//! per-frame read for a realistic number of simultaneously tracked targets.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use wititude_core::{Mat4, RenderablePair, RenderableRegistry, TransformSnapshot, Vec3};

fn populated(count: usize) -> (RenderableRegistry, Vec<String>) {
    let registry = RenderableRegistry::new();
    let ids: Vec<String> = (0..count).map(|i| format!("target-{i}")).collect();
    for id in &ids {
        registry.put(id.as_str(), RenderablePair::new());
    }
    (registry, ids)
}

fn bench_update_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_update_transform");
    let snapshot = TransformSnapshot::new(Mat4::from_translation(Vec3::new(0.1, 0.2, -1.0)), Vec3::ONE);

    for count in [1, 4, 16] {
        let (registry, ids) = populated(count);
        group.bench_with_input(BenchmarkId::new("targets", count), &count, |b, _| {
            b.iter(|| registry.update_transform(black_box(&ids[0]), black_box(&snapshot)));
        });
    }

    group.finish();
}

fn bench_frame_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_frame_read");

    for count in [1, 4, 16] {
        let (registry, _) = populated(count);
        group.bench_with_input(BenchmarkId::new("targets", count), &count, |b, _| {
            b.iter(|| {
                let frame = registry.snapshot();
                let mut coherent = 0;
                for id in frame.ids() {
                    if let Some(pair) = registry.get_or_committed(id.as_str(), &frame) {
                        coherent += usize::from(pair.is_coherent());
                    }
                }
                black_box(coherent)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_update_transform, bench_frame_read);
criterion_main!(benches);
