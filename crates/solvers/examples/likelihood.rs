use env_logger::{Builder, Env};
use linfa::ParamGuard;
use ndarray::{array, Array, Array1};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use quasisep_solvers::{batch, KernelSpec, SolverKind, QUASISEP_LOG};
use rand_xoshiro::Xoshiro256Plus;

fn main() {
    let env = Env::new().filter_or(QUASISEP_LOG, "info");
    let mut builder = Builder::from_env(env);
    builder.target(env_logger::Target::Stdout).try_init().ok();

    let n = 1024;
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let mut x: Vec<f64> = Array::random_using(n, Uniform::new(-1., 1.), &mut rng).to_vec();
    x.sort_by(|a, b| a.total_cmp(b));
    let x = Array1::from(x);
    let yerr2 = Array::random_using(n, Uniform::new(0.3, 0.4), &mut rng);
    let y = x.mapv(f64::sin);

    let kernel = KernelSpec::params()
        .real_term(1.3, 0.5)
        .real_term(1.5, 0.2)
        .complex_term(1.0, 0.1, 1.0, 1.0)
        .check()
        .expect("valid kernel");
    println!("{kernel} with {n} observations");

    for kind in SolverKind::ALL {
        let mut solver = kind.solver();
        solver
            .compute(&kernel, x.view(), yerr2.view())
            .expect("positive definite covariance");
        println!(
            "{kind:>8}: log_det = {:.12} dot_solve = {:.12} log_likelihood = {:.12}",
            solver.log_determinant().expect("computed"),
            solver.dot_solve(y.view()).expect("computed"),
            solver.log_likelihood(y.view()).expect("computed"),
        );
    }

    // likelihood profile along the amplitude of the first term
    let kernels: Vec<KernelSpec> = (1..=5)
        .map(|i| {
            KernelSpec::real(&array![0.5 * i as f64, 1.5], &array![0.5, 0.2]).expect("valid kernel")
        })
        .collect();
    let lls = batch::log_likelihoods(
        SolverKind::Cholesky,
        &kernels,
        x.view(),
        yerr2.view(),
        y.view(),
    );
    for (kernel, ll) in kernels.iter().zip(lls) {
        match ll {
            Ok(ll) => println!("{kernel}: {ll:.6}"),
            Err(err) => println!("{kernel}: {err}"),
        }
    }
}
