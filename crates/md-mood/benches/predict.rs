use criterion::{Criterion, black_box, criterion_group, criterion_main};
use md_mood::model::RegressionModel;

/// Model shaped like the shipped ones: 52 features, a few hundred support vectors.
fn synthetic_model(num_features: usize, num_sv: usize) -> RegressionModel {
    let support_vectors: Vec<f32> = (0..num_sv * num_features)
        .map(|i| ((i * 37) % 101) as f32 / 50.0 - 1.0)
        .collect();
    let alpha: Vec<f32> = (0..num_sv)
        .map(|i| if i % 2 == 0 { 0.5 } else { -0.5 })
        .collect();
    let mu = vec![0.0; num_features];
    let sigma = vec![1.0; num_features];
    match RegressionModel::new(mu, sigma, support_vectors, alpha, 4.0, 0.1) {
        Ok(model) => model,
        Err(e) => panic!("synthetic model: {e}"),
    }
}

fn bench_predict(c: &mut Criterion) {
    let model = synthetic_model(52, 400);
    let x: Vec<f32> = (0..52).map(|i| (i as f32 * 0.1).sin()).collect();
    let mut scratch = Vec::with_capacity(52);

    c.bench_function("svr_predict_52x400", |b| {
        b.iter(|| model.predict_with(black_box(&x), &mut scratch));
    });
}

criterion_group!(benches, bench_predict);
criterion_main!(benches);
