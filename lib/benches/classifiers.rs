use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use yieldsense::model::{Classifier, FittedClassifier, GaussianNb, Gamma, Kernel, RandomForest, Svc};
use yieldsense::preprocessing::Smote;

/// Two noisy clusters, roughly one fail in six rows.
fn make_data(n: usize, p: usize) -> (Array2<f64>, Array1<usize>) {
    let y = Array1::from_shape_fn(n, |i| usize::from(i % 6 == 0));
    let x = Array2::from_shape_fn((n, p), |(i, j)| {
        let shift = if y[i] == 1 { 1.5 } else { 0.0 };
        shift + ((i * 31 + j * 17) % 29) as f64 / 29.0
    });
    (x, y)
}

fn bench_random_forest_fit(c: &mut Criterion) {
    for n in [200, 1000].iter() {
        c.bench_with_input(BenchmarkId::new("random_forest_fit", n), n, |b, &n| {
            let (x, y) = make_data(n, 40);
            let model = RandomForest::new().with_n_estimators(50);
            b.iter(|| {
                let fitted = model.fit(black_box(x.view()), black_box(y.view())).unwrap();
                black_box(fitted);
            });
        });
    }
}

fn bench_svc_fit(c: &mut Criterion) {
    for kernel in [Kernel::Linear, Kernel::Rbf].iter() {
        c.bench_with_input(BenchmarkId::new("svc_fit", kernel.name()), kernel, |b, &kernel| {
            let (x, y) = make_data(400, 40);
            let model = Svc::new(1.0, kernel, Gamma::Scale);
            b.iter(|| {
                let fitted = model.fit(black_box(x.view()), black_box(y.view())).unwrap();
                black_box(fitted);
            });
        });
    }
}

fn bench_naive_bayes(c: &mut Criterion) {
    let (x, y) = make_data(1500, 400);
    let model = GaussianNb::new();
    c.bench_function("gaussian_nb_fit", |b| {
        b.iter(|| black_box(model.fit(black_box(x.view()), black_box(y.view())).unwrap()));
    });

    let fitted = model.fit(x.view(), y.view()).unwrap();
    c.bench_function("gaussian_nb_predict", |b| {
        b.iter(|| black_box(fitted.predict(black_box(x.view())).unwrap()));
    });
}

fn bench_smote(c: &mut Criterion) {
    for p in [50, 400].iter() {
        c.bench_with_input(BenchmarkId::new("smote", p), p, |b, &p| {
            let (x, y) = make_data(1200, p);
            let smote = Smote::default();
            b.iter(|| black_box(smote.fit_resample(black_box(&x), black_box(&y)).unwrap()));
        });
    }
}

criterion_group!(
    benches,
    bench_random_forest_fit,
    bench_svc_fit,
    bench_naive_bayes,
    bench_smote
);
criterion_main!(benches);
