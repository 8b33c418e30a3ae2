use crate::errors::{Result, SolverError};
use crate::kernel::KernelSpec;
use crate::solver::Solver;
use crate::utils::{check_rhs, check_samples};

use linfa_linalg::{cholesky::*, triangular::*};
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use std::time::Instant;

/// Above this number of observations the dense factorization gets costly
const LARGE_SYSTEM: usize = 4096;

/// Dense Cholesky solver `K = L L^t`.
///
/// The covariance matrix is built explicitly, hence O(N^2) memory and O(N^3) time.
/// Coordinates may be given in any order. Used as the reference for the other solvers.
#[derive(Clone, Debug, Default)]
pub struct DirectSolver {
    /// Lower triangular cholesky factor
    factor: Option<Array2<f64>>,
}

impl DirectSolver {
    /// Constructor of an uncomputed solver
    pub fn new() -> Self {
        Self::default()
    }

    fn factor(&self) -> Result<&Array2<f64>> {
        self.factor.as_ref().ok_or(SolverError::NotComputedError)
    }
}

impl Solver for DirectSolver {
    fn name(&self) -> &'static str {
        "Direct"
    }

    fn compute(
        &mut self,
        kernel: &KernelSpec,
        x: ArrayView1<f64>,
        yerr2: ArrayView1<f64>,
    ) -> Result<()> {
        self.factor = None;
        check_samples(&x, &yerr2, false)?;
        let n = x.len();
        if n > LARGE_SYSTEM {
            warn!(
                "{} solver: dense factorization of {n} observations, consider a fast solver",
                self.name()
            );
        }
        let now = Instant::now();
        let cov = kernel.covariance(x, yerr2);
        let chol = cov.cholesky()?;
        debug!(
            "{} solver: N={} R={} computed in {:?}",
            self.name(),
            n,
            kernel.rank(),
            now.elapsed()
        );
        self.factor = Some(chol);
        Ok(())
    }

    fn size(&self) -> Option<usize> {
        self.factor.as_ref().map(|l| l.nrows())
    }

    fn log_determinant(&self) -> Result<f64> {
        let l = self.factor()?;
        Ok(2. * l.diag().mapv(f64::ln).sum())
    }

    fn solve(&self, y: ArrayView1<f64>) -> Result<Array1<f64>> {
        let l = self.factor()?;
        check_rhs(&y, l.nrows())?;
        let rhs = y.to_owned().insert_axis(Axis(1));
        let z = l.solve_triangular(&rhs, UPLO::Lower)?;
        let sol = l.t().solve_triangular(&z, UPLO::Upper)?;
        Ok(sol.remove_axis(Axis(1)))
    }
}
