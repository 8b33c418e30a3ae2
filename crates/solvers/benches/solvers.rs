use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use env_logger::{Builder, Env};
use ndarray::{Array, Array1};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use quasisep_solvers::{KernelSpec, SolverKind, QUASISEP_LOG};
use rand_xoshiro::Xoshiro256Plus;

fn samples(n: usize) -> (Array1<f64>, Array1<f64>, Array1<f64>) {
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let mut x: Vec<f64> = Array::random_using(n, Uniform::new(0., n as f64 / 16.), &mut rng).to_vec();
    x.sort_by(|a, b| a.total_cmp(b));
    let x = Array1::from(x);
    let yerr2 = Array::random_using(n, Uniform::new(0.3, 0.4), &mut rng);
    let y = x.mapv(f64::sin);
    (x, yerr2, y)
}

/// Kernel with `n_terms` complex terms of decreasing amplitudes
fn kernel(n_terms: usize) -> KernelSpec {
    let alpha_real = Array1::from_shape_fn(n_terms, |j| 1. / (1. + j as f64));
    let alpha_imag = Array1::from_elem(n_terms, 0.1);
    let beta_real = Array1::from_shape_fn(n_terms, |j| 0.5 + 0.1 * j as f64);
    let beta_imag = Array1::from_shape_fn(n_terms, |j| 1. + j as f64);
    KernelSpec::complex(&alpha_real, &alpha_imag, &beta_real, &beta_imag).expect("valid kernel")
}

fn bench_log_likelihood_vs_n(c: &mut Criterion) {
    let env = Env::new().filter_or(QUASISEP_LOG, "error");
    let mut builder = Builder::from_env(env);
    builder.target(env_logger::Target::Stdout).try_init().ok();

    let kernel = kernel(2);
    for kind in SolverKind::ALL {
        let mut group = c.benchmark_group(format!("{kind}_log_likelihood"));
        group.sample_size(10);
        for n in (6..=12).map(|p| 1usize << p) {
            // dense factorization gets prohibitive
            if kind == SolverKind::Direct && n > 1024 {
                continue;
            }
            let (x, yerr2, y) = samples(n);
            let mut solver = kind.solver();
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
                b.iter(|| {
                    solver
                        .compute(&kernel, x.view(), yerr2.view())
                        .expect("positive definite");
                    std::hint::black_box(solver.log_likelihood(y.view()).expect("computed"))
                });
            });
        }
        group.finish();
    }
}

fn bench_log_likelihood_vs_terms(c: &mut Criterion) {
    let (x, yerr2, y) = samples(4096);
    for kind in [SolverKind::Band, SolverKind::Sparse, SolverKind::Cholesky] {
        let mut group = c.benchmark_group(format!("{kind}_log_likelihood_terms"));
        group.sample_size(10);
        for n_terms in (0..=3).map(|p| 1usize << p) {
            let kernel = kernel(n_terms);
            let mut solver = kind.solver();
            group.bench_with_input(BenchmarkId::from_parameter(n_terms), &n_terms, |b, _| {
                b.iter(|| {
                    solver
                        .compute(&kernel, x.view(), yerr2.view())
                        .expect("positive definite");
                    std::hint::black_box(solver.log_likelihood(y.view()).expect("computed"))
                });
            });
        }
        group.finish();
    }
}

criterion_group!(
    benches,
    bench_log_likelihood_vs_n,
    bench_log_likelihood_vs_terms
);
criterion_main!(benches);
