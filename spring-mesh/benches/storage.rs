// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Benchmarks for the entity store
//!
//! These benchmarks measure:
//! - Mass and spring insertion
//! - Cascading deletion of masses with attached springs
//! - Nearest-object picking over many entities
//! - Duplication of a selected mesh
//! - Scene serialization and parsing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use glam::DVec2;
use spring_mesh::scene::{self, LoadMode};
use spring_mesh::{MassId, World};

// A chain of `count` masses joined by springs
fn chain(count: usize) -> (World, Vec<MassId>) {
    let mut world = World::new();
    let ids: Vec<MassId> = (0..count)
        .map(|i| world.add_mass(DVec2::new((i % 100) as f64 * 8.0, (i / 100) as f64 * 8.0)))
        .collect();
    for pair in ids.windows(2) {
        world.add_spring(pair[0], pair[1]);
    }
    (world, ids)
}

/// Benchmark: build a chain from scratch
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_insert");

    for count in [100, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("chain", count), count, |b, &count| {
            b.iter(|| black_box(chain(count)));
        });
    }

    group.finish();
}

/// Benchmark: delete every other mass, cascading to its springs
fn bench_delete_cascade(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_delete_cascade");

    for count in [100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64 / 2));
        group.bench_with_input(BenchmarkId::new("chain", count), count, |b, &count| {
            b.iter_batched(
                || chain(count),
                |(mut world, ids)| {
                    for id in ids.iter().step_by(2) {
                        world.delete_mass(*id);
                    }
                    black_box(world.live_spring_count())
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark: pick the object nearest a point
fn bench_nearest_object(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest_object");

    for count in [100, 1000, 10000].iter() {
        let (world, _) = chain(*count);
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(BenchmarkId::new("masses", count), count, |b, _| {
            b.iter(|| black_box(world.nearest_object(DVec2::new(403.0, 21.0), true)));
        });
        group.bench_with_input(BenchmarkId::new("any", count), count, |b, _| {
            b.iter(|| black_box(world.nearest_object(DVec2::new(403.0, 21.0), false)));
        });
    }

    group.finish();
}

/// Benchmark: duplicate an entire selected mesh
fn bench_duplicate(c: &mut Criterion) {
    let mut group = c.benchmark_group("duplicate_selected");

    for count in [100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("chain", count), count, |b, &count| {
            b.iter_batched(
                || {
                    let (mut world, _) = chain(count);
                    world.select_all();
                    world
                },
                |mut world| black_box(world.duplicate_selected()),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark: save to text and load it back
fn bench_scene_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("scene_text");
    let (world, _) = chain(1000);
    let text = scene::to_text(&world);

    group.bench_function("to_text_1000", |b| {
        b.iter(|| black_box(scene::to_text(&world)));
    });
    group.bench_function("load_1000", |b| {
        b.iter(|| {
            let mut target = World::new();
            black_box(scene::load_str(&mut target, &text, LoadMode::Replace).map(|r| r.masses.len()))
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_delete_cascade,
    bench_nearest_object,
    bench_duplicate,
    bench_scene_text
);
criterion_main!(benches);
