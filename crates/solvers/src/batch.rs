//! Evaluation of many kernel specifications over the same sample set.
//!
//! Each kernel gets its own solver instance so evaluations run in parallel with `rayon`.
//! Results are returned in the order of the given kernels.

use crate::errors::Result;
use crate::kernel::KernelSpec;
use crate::solver::SolverKind;

use log::debug;
use ndarray::ArrayView1;
use rayon::prelude::*;
use std::time::Instant;

/// Gaussian log-likelihoods of `y` for each kernel
pub fn log_likelihoods(
    kind: SolverKind,
    kernels: &[KernelSpec],
    x: ArrayView1<f64>,
    yerr2: ArrayView1<f64>,
    y: ArrayView1<f64>,
) -> Vec<Result<f64>> {
    let now = Instant::now();
    let res: Vec<Result<f64>> = kernels
        .par_iter()
        .map(|kernel| {
            let mut solver = kind.solver();
            solver.compute(kernel, x, yerr2)?;
            solver.log_likelihood(y)
        })
        .collect();
    debug!(
        "{kind} batch: {} log-likelihoods in {:?}",
        kernels.len(),
        now.elapsed()
    );
    res
}

/// Log-determinants of the covariance matrices built from each kernel
pub fn log_determinants(
    kind: SolverKind,
    kernels: &[KernelSpec],
    x: ArrayView1<f64>,
    yerr2: ArrayView1<f64>,
) -> Vec<Result<f64>> {
    kernels
        .par_iter()
        .map(|kernel| {
            let mut solver = kind.solver();
            solver.compute(kernel, x, yerr2)?;
            solver.log_determinant()
        })
        .collect()
}
