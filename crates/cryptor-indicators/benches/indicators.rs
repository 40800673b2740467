//! Benchmarks for indicator implementations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cryptor_core::traits::{Indicator, MultiOutputIndicator};
use cryptor_indicators::{BollingerBands, Ema, EmaSeed, IndicatorParams, Macd, Rsi, RsiSmoothing, Sma};

fn generate_test_data(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 100.0 + (i as f64 * 0.1).sin() * 10.0)
        .collect()
}

fn benchmark_moving_averages(c: &mut Criterion) {
    let mut group = c.benchmark_group("MovingAverage");

    for size in [1000, 10000, 100000].iter() {
        let data = generate_test_data(*size);

        group.bench_with_input(BenchmarkId::new("sma", size), &data, |b, data| {
            let sma = Sma::new(50);
            b.iter(|| sma.calculate(black_box(data)))
        });

        group.bench_with_input(BenchmarkId::new("ema", size), &data, |b, data| {
            let ema = Ema::new(26).seeded(EmaSeed::FirstValue);
            b.iter(|| ema.calculate(black_box(data)))
        });
    }

    group.finish();
}

fn benchmark_oscillators(c: &mut Criterion) {
    let mut group = c.benchmark_group("Oscillators");

    for size in [1000, 10000].iter() {
        let data = generate_test_data(*size);

        group.bench_with_input(BenchmarkId::new("rsi_simple", size), &data, |b, data| {
            let rsi = Rsi::new(14).with_smoothing(RsiSmoothing::Simple);
            b.iter(|| rsi.calculate(black_box(data)))
        });

        group.bench_with_input(BenchmarkId::new("macd", size), &data, |b, data| {
            let macd = Macd::new().seeded(EmaSeed::FirstValue);
            b.iter(|| macd.calculate(black_box(data)))
        });

        group.bench_with_input(BenchmarkId::new("bollinger", size), &data, |b, data| {
            let bands = BollingerBands::new();
            b.iter(|| bands.calculate(black_box(data)))
        });
    }

    group.finish();
}

fn benchmark_indicator_set(c: &mut Criterion) {
    let params = IndicatorParams::default();
    // one cycle's worth of history
    let data = generate_test_data(200);

    c.bench_function("indicator_set_200", |b| {
        b.iter(|| params.compute(black_box(&data)))
    });
}

criterion_group!(
    benches,
    benchmark_moving_averages,
    benchmark_oscillators,
    benchmark_indicator_set
);
criterion_main!(benches);
