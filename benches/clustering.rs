use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use surrogate_prep::preprocessing::{ScaledSplit, ScalingConfig};
use surrogate_prep::training::{Clusterer, ClusteringConfig};
use surrogate_prep::utils::Table;

/// Output block with two regimes separated by a constant offset
fn create_regime_outputs(n_rows: usize, n_outputs: usize) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    Array2::from_shape_fn((n_rows, n_outputs), |(i, j)| {
        let offset = if i < n_rows / 2 { 0.0 } else { 100.0 };
        (1.0 + 0.01 * j as f64) * rng.gen::<f64>() + offset
    })
}

fn bench_clustering(c: &mut Criterion) {
    let mut group = c.benchmark_group("dbscan");
    group.sample_size(10);

    for n_rows in [500, 1000, 2000].iter() {
        let outputs = create_regime_outputs(*n_rows, 110);
        let clusterer = Clusterer::new(ClusteringConfig::default());

        group.bench_with_input(BenchmarkId::new("cluster", n_rows), &outputs, |b, outputs| {
            b.iter(|| clusterer.cluster(black_box(outputs)).unwrap())
        });
    }

    group.finish();
}

fn bench_scaled_split(c: &mut Criterion) {
    let n_rows = 5000;
    let inputs = create_regime_outputs(n_rows, 16);
    let outputs = create_regime_outputs(n_rows, 110);
    let data = ndarray::concatenate![ndarray::Axis(1), inputs, outputs];
    let columns: Vec<String> = (0..data.ncols()).map(|k| format!("c{}", k)).collect();
    let table = Table::new(columns, data, 16, None).unwrap();

    let train: Vec<usize> = (0..4500).collect();
    let test: Vec<usize> = (4500..n_rows).collect();
    let scaling = ScalingConfig::default();

    c.bench_function("scaled_split_5000x126", |b| {
        b.iter(|| ScaledSplit::fit(black_box(&table), train.clone(), test.clone(), &scaling).unwrap())
    });
}

criterion_group!(benches, bench_clustering, bench_scaled_split);
criterion_main!(benches);
