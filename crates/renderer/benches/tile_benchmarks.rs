//! Benchmarks for tile rendering and PNG encoding.
//!
//! Run with: cargo bench --package renderer --bench tile_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use coverage_common::{Sample, TileCoord, NO_SIGNAL_BUCKET};
use rand::Rng;
use renderer::{png, renderer_for, PaintQueue, TileRenderer};

/// Random samples spread over the query range of a tile.
fn random_samples(renderer: &dyn TileRenderer, coord: &TileCoord, count: usize) -> Vec<Sample> {
    let mut rng = rand::thread_rng();
    let range = coord.base_range(renderer.query_buffer(coord.z));
    (0..count)
        .map(|_| {
            Sample::new(
                rng.gen_range(range.x_min..range.x_max),
                rng.gen_range(range.y_min..range.y_max),
                rng.gen_range(0..=NO_SIGNAL_BUCKET),
            )
        })
        .collect()
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");

    for style in [coverage_common::TileStyle::Circles, coverage_common::TileStyle::Blocks] {
        let renderer = renderer_for(style);
        for (z, count) in [(17u32, 64usize), (14, 1024), (12, 8192)] {
            let coord = TileCoord::new(z, 0, 0).unwrap();
            let queue = PaintQueue::new(random_samples(renderer, &coord, count));

            group.throughput(Throughput::Elements(count as u64));
            group.bench_with_input(
                BenchmarkId::new(style.as_str(), format!("z{}_{}", z, count)),
                &queue,
                |b, queue| b.iter(|| renderer.render(black_box(&coord), black_box(queue)).unwrap()),
            );
        }
    }

    group.finish();
}

fn bench_png(c: &mut Criterion) {
    let mut group = c.benchmark_group("png");

    let coord = TileCoord::new(14, 0, 0).unwrap();
    let renderer = renderer_for(coverage_common::TileStyle::Circles);
    let tile = renderer
        .render(&coord, &PaintQueue::new(random_samples(renderer, &coord, 2048)))
        .unwrap();

    group.throughput(Throughput::Bytes(tile.pixels.len() as u64));
    group.bench_function("auto_256x256", |b| {
        b.iter(|| png::encode_png(black_box(&tile.pixels), 256, 256).unwrap())
    });
    group.bench_function("rgba_256x256", |b| {
        b.iter(|| png::encode_rgba(black_box(&tile.pixels), 256, 256).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_render, bench_png);
criterion_main!(benches);
