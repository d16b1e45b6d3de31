//! Benchmarks for decline curve fitting.
//!
//! Fits each decline model to a clean and a noisy 24-month series.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use decline_fit::{fit, generate_curve, monthly_grid, DeclineModelType, TimeSeries};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn reference_curve(model_type: DeclineModelType) -> TimeSeries {
    let curvature = model_type.uses_curvature().then_some(0.5);
    generate_curve(model_type, 1000.0, 0.1, curvature, &monthly_grid(24))
        .expect("reference parameters are valid")
}

fn noisy(series: &TimeSeries) -> TimeSeries {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let rates: Vec<f64> = series
        .rates()
        .iter()
        .map(|rate| rate * (1.0 + rng.gen_range(-0.02..0.02_f64)))
        .collect();
    TimeSeries::from_rates(&rates).expect("noisy rates stay positive")
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("decline_fit");

    for model_type in DeclineModelType::ALL {
        let clean = reference_curve(model_type);
        let noisy = noisy(&clean);

        group.bench_with_input(BenchmarkId::new("clean", model_type), &clean, |b, series| {
            b.iter(|| fit(black_box(model_type), black_box(1000.0), series, None))
        });
        group.bench_with_input(BenchmarkId::new("noisy", model_type), &noisy, |b, series| {
            b.iter(|| fit(black_box(model_type), black_box(1000.0), series, None))
        });
    }

    group.finish();
}

fn bench_generate(c: &mut Criterion) {
    let grid = monthly_grid(360);
    c.bench_function("generate_curve_hyperbolic_360", |b| {
        b.iter(|| {
            generate_curve(
                DeclineModelType::Hyperbolic,
                black_box(1000.0),
                black_box(0.1),
                Some(0.5),
                &grid,
            )
        })
    });
}

criterion_group!(benches, bench_fit, bench_generate);
criterion_main!(benches);
