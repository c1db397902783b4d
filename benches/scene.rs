//! Criterion benchmarks for scene generation, animation and rasterization.
//!
//! Run with:
//!   cargo bench
//!   cargo bench --features parallel
//!
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use agesphere::animation::advance;
use agesphere::camera::{CameraConfig, CameraTransform, Viewport};
use agesphere::generator::generate;
use agesphere::prng::Prng;
use agesphere::raster::{rasterize, Framebuffer};
use agesphere::render::build_frame;
use agesphere::{AgeInputs, ParamValue, ParameterSet, SceneKind};

/// Benchmark layout generation for point clouds of growing age.
fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    let params = ParameterSet::default_for(SceneKind::PointCloud);

    for age in [10u32, 40, 80].iter() {
        group.throughput(Throughput::Elements(*age as u64 * 50));
        group.bench_with_input(BenchmarkId::new("point_cloud", age), age, |b, &age| {
            let ages = AgeInputs::new(age, age);
            b.iter(|| {
                let mut rng = Prng::new(42);
                black_box(generate(ages, &params, &mut rng).cardinality())
            });
        });
    }

    for nodes in [24u32, 60, 120].iter() {
        let params = ParameterSet::default_for(SceneKind::WireframeNetwork)
            .with("nodeCount", ParamValue::Count(*nodes))
            .unwrap();
        group.bench_with_input(BenchmarkId::new("network", nodes), nodes, |b, _| {
            b.iter(|| {
                let mut rng = Prng::new(42);
                black_box(generate(AgeInputs::new(35, 40), &params, &mut rng).cardinality())
            });
        });
    }

    group.finish();
}

/// Benchmark one frame of animation per scene kind.
fn bench_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("advance");
    let ages = AgeInputs::new(35, 40);

    for kind in SceneKind::ALL {
        let params = ParameterSet::default_for(kind);
        let layout = generate(ages, &params, &mut Prng::new(7));
        group.bench_function(kind.label(), |b| {
            let mut state = advance(None, &layout, &params, 0.0, ages);
            let mut t = 0.0;
            b.iter(|| {
                t += 1.0 / 60.0;
                state = advance(Some(&state), &layout, &params, t, ages);
                black_box(state.rotation_y)
            });
        });
    }

    group.finish();
}

/// Benchmark draw-list construction and CPU rasterization.
fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let ages = AgeInputs::new(35, 40);
    let viewport = Viewport::new(320, 240);
    let camera = CameraTransform::new(CameraConfig::default(), viewport);

    for kind in SceneKind::ALL {
        let params = ParameterSet::default_for(kind);
        let layout = generate(ages, &params, &mut Prng::new(7));
        let state = advance(None, &layout, &params, 5.0, ages);

        group.bench_function(BenchmarkId::new("build_frame", kind.label()), |b| {
            b.iter(|| black_box(build_frame(&state, &layout, &params, camera).primitives.len()));
        });

        let frame = build_frame(&state, &layout, &params, camera);
        group.throughput(Throughput::Elements(viewport.width as u64 * viewport.height as u64));
        group.bench_function(BenchmarkId::new("rasterize", kind.label()), |b| {
            let mut fb = Framebuffer::new(viewport.width, viewport.height);
            b.iter(|| {
                rasterize(&mut fb, &frame);
                black_box(fb.pixels[0])
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_generate, bench_advance, bench_render);
criterion_main!(benches);
