use cfs_rs::filter::FilterTrainer;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use rand::rngs::ThreadRng;
use rand::Rng;

/// Random grayscale image from instance of `rng`.
fn randomized_image(rng: &mut ThreadRng, rows: usize, cols: usize) -> Array2<u8> {
    Array2::from_shape_fn((rows, cols), |_| rng.random_range(0..=255))
}

/// Trainer loaded with `n_auth` authentic and `n_imp` impostor images.
fn loaded_trainer(n_auth: usize, n_imp: usize, rows: usize, cols: usize) -> FilterTrainer<f64> {
    let mut rng = rand::rng();
    let mut trainer = FilterTrainer::new(1e-5, 1.0 - 1e-5, 0.5)
        .expect("benchmark weights should be valid");
    while trainer.authentic().len() < n_auth {
        trainer.add_auth(&randomized_image(&mut rng, rows, cols));
    }
    while trainer.impostor().len() < n_imp {
        trainer.add_imp(&randomized_image(&mut rng, rows, cols));
    }
    trainer
}

fn train_otsdf(c: &mut Criterion) {
    let mut group = c.benchmark_group("train_otsdf");
    for n in [2usize, 8, 32] {
        for use_full_rank in [true, false] {
            let mut trainer = loaded_trainer(n, n, 64, 64);
            trainer.set_rank_mode(use_full_rank);
            let mode = if use_full_rank { "full" } else { "reduced" };
            group.bench_with_input(BenchmarkId::new(mode, 2 * n), &n, |bench, _| {
                bench.iter(|| {
                    black_box(trainer.train().expect("random images should train"));
                })
            });
        }
    }
    group.finish();
}

/// Duplicate rejection cost grows with the stored set.
fn add_duplicate(c: &mut Criterion) {
    let mut rng = rand::rng();
    let probe = randomized_image(&mut rng, 64, 64);
    let mut trainer = loaded_trainer(64, 64, 64, 64);
    trainer.add_auth(&probe);
    c.bench_function("add_duplicate_128", |bench| {
        bench.iter(|| trainer.add_imp(black_box(&probe)))
    });
}

criterion_group!(benches, train_otsdf, add_duplicate);
criterion_main!(benches);
