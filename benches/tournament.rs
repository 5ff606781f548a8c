use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use model_tournament::data::Dataset;
use model_tournament::tournament::{CandidatePool, TournamentConfig, TournamentOrchestrator};
use model_tournament::training::{
    DecisionTreeRegressor, KFold, KnnRegressor, LinearRegression, Metric, Regressor, RidgeRegression,
};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_regression_data(n_rows: usize, n_features: usize) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let x = Array2::from_shape_fn((n_rows, n_features), |_| rng.gen::<f64>() * 10.0);
    // Target as sum of features + noise
    let y = Array1::from_shape_fn(n_rows, |i| x.row(i).sum() + rng.gen::<f64>() * 0.1);
    let names = (0..n_features).map(|i| format!("feature_{}", i)).collect();
    Dataset::new(names, "target", x, y).unwrap()
}

fn light_pool() -> CandidatePool {
    CandidatePool::new()
        .with_candidate("ols", LinearRegression::new())
        .and_then(|p| p.with_candidate("ridge", RidgeRegression::new(1.0)))
        .and_then(|p| p.with_candidate("knn", KnnRegressor::new(5)))
        .and_then(|p| p.with_candidate("tree", DecisionTreeRegressor::new().with_max_depth(6)))
        .unwrap()
}

fn bench_tournament(c: &mut Criterion) {
    let mut group = c.benchmark_group("tournament");
    group.sample_size(10);

    for n_rows in [1000, 5000].iter() {
        let data = create_regression_data(*n_rows, 8);
        group.bench_with_input(BenchmarkId::new("run", n_rows), &data, |b, data| {
            b.iter(|| {
                let mut orch =
                    TournamentOrchestrator::new(TournamentConfig::default(), light_pool(), black_box(data.clone()))
                        .unwrap();
                orch.run_tournament().unwrap()
            })
        });
    }

    group.finish();
}

fn bench_cross_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cross_validation");
    let data = create_regression_data(3000, 8);
    let folds = KFold::new(5);
    let metrics = [Metric::Rmse, Metric::R2];

    for (name, model) in [
        ("ols", Box::new(LinearRegression::new()) as Box<dyn Regressor>),
        ("knn", Box::new(KnnRegressor::new(5))),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                model
                    .cross_validate(black_box(data.features()), data.target(), &folds, &metrics)
                    .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tournament, bench_cross_validation);
criterion_main!(benches);
