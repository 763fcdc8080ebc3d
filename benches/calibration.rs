use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use outlier_threshold::prelude::*;
use rand::prelude::*;

fn create_data(n_rows: usize, n_features: usize) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(42);
    let n_outliers = n_rows / 20;

    Array2::from_shape_fn((n_rows, n_features), |(i, _)| {
        if i < n_rows - n_outliers {
            rng.gen::<f64>() * 2.0 - 1.0
        } else {
            rng.gen_range(10.0..20.0)
        }
    })
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("calibration_fit");
    group.sample_size(20);

    for n_rows in [1000, 10000, 50000].iter() {
        let x = create_data(*n_rows, 10);

        group.bench_with_input(BenchmarkId::new("gaussian", n_rows), &x, |b, x| {
            b.iter(|| {
                let mut calibrator = ThresholdCalibrator::new(GaussianScorer::new(), 0.05).unwrap();
                calibrator.fit(black_box(x), None).unwrap();
                black_box(calibrator.threshold())
            });
        });
    }

    group.finish();
}

fn bench_predict(c: &mut Criterion) {
    let mut group = c.benchmark_group("calibration_predict");

    for n_rows in [1000, 10000, 50000].iter() {
        let x = create_data(*n_rows, 10);
        let mut calibrator = ThresholdCalibrator::new(GaussianScorer::new(), 0.05).unwrap();
        calibrator.fit(&x, None).unwrap();

        group.bench_with_input(BenchmarkId::new("gaussian", n_rows), &x, |b, x| {
            b.iter(|| calibrator.predict(black_box(x), None).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fit, bench_predict);
criterion_main!(benches);
