use crate::band::BandSolver;
use crate::cholesky::CholeskySolver;
use crate::direct::DirectSolver;
use crate::errors::Result;
use crate::kernel::KernelSpec;
use crate::sparse::SparseSolver;

use ndarray::{Array1, ArrayView1};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// A trait for solvers of the covariance matrix `K` built from a [KernelSpec]
/// at coordinates `x` with noise variances `yerr2` added to its diagonal.
///
/// A solver is first computed (ie. factorized) with [Solver::compute], then queried
/// for `log(det(K))` and `y^t K^-1 y`. A new computation replaces the previous
/// factorization; when it fails the solver is left uncomputed and queries
/// return [SolverError::NotComputedError](crate::SolverError::NotComputedError).
pub trait Solver: Send + Sync {
    /// Solver name used for logging
    fn name(&self) -> &'static str;

    /// Factorize the covariance matrix given the `kernel`, coordinates `x` and noise variances `yerr2`
    fn compute(
        &mut self,
        kernel: &KernelSpec,
        x: ArrayView1<f64>,
        yerr2: ArrayView1<f64>,
    ) -> Result<()>;

    /// Number of observations of the current factorization if any
    fn size(&self) -> Option<usize>;

    /// Logarithm of the determinant of the covariance matrix
    fn log_determinant(&self) -> Result<f64>;

    /// Solve `K x = y` and return `x`
    fn solve(&self, y: ArrayView1<f64>) -> Result<Array1<f64>>;

    /// Compute the quadratic form `y^t K^-1 y`
    fn dot_solve(&self, y: ArrayView1<f64>) -> Result<f64> {
        let x = self.solve(y)?;
        Ok(y.dot(&x))
    }

    /// Gaussian log-likelihood of `y` given the current factorization:
    /// `-0.5 (y^t K^-1 y + log(det(K)) + n log(2 pi))`
    fn log_likelihood(&self, y: ArrayView1<f64>) -> Result<f64> {
        let quad = self.dot_solve(y)?;
        let logdet = self.log_determinant()?;
        let n = y.len() as f64;
        Ok(-0.5 * (quad + logdet + n * f64::ln(2. * PI)))
    }

    /// Factorize using a kernel made of real terms only
    fn compute_real(
        &mut self,
        alpha: ArrayView1<f64>,
        beta: ArrayView1<f64>,
        x: ArrayView1<f64>,
        yerr2: ArrayView1<f64>,
    ) -> Result<()> {
        let kernel = KernelSpec::real(&alpha, &beta)?;
        self.compute(&kernel, x, yerr2)
    }

    /// Factorize using a kernel made of complex terms only
    fn compute_complex(
        &mut self,
        alpha_real: ArrayView1<f64>,
        alpha_imag: ArrayView1<f64>,
        beta_real: ArrayView1<f64>,
        beta_imag: ArrayView1<f64>,
        x: ArrayView1<f64>,
        yerr2: ArrayView1<f64>,
    ) -> Result<()> {
        let kernel = KernelSpec::complex(&alpha_real, &alpha_imag, &beta_real, &beta_imag)?;
        self.compute(&kernel, x, yerr2)
    }

    /// Factorize using a kernel made of both real and complex terms
    #[allow(clippy::too_many_arguments)]
    fn compute_mixed(
        &mut self,
        alpha: ArrayView1<f64>,
        beta: ArrayView1<f64>,
        alpha_real: ArrayView1<f64>,
        alpha_imag: ArrayView1<f64>,
        beta_real: ArrayView1<f64>,
        beta_imag: ArrayView1<f64>,
        x: ArrayView1<f64>,
        yerr2: ArrayView1<f64>,
    ) -> Result<()> {
        let kernel = KernelSpec::mixed(
            &alpha,
            &beta,
            &alpha_real,
            &alpha_imag,
            &beta_real,
            &beta_imag,
        )?;
        self.compute(&kernel, x, yerr2)
    }
}

/// An enum to select one of the available [Solver] implementations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum SolverKind {
    /// Dense Cholesky decomposition, O(N^3)
    Direct,
    /// Banded LU decomposition of the extended system, O(N.J^2)
    Band,
    /// Sparse LU decomposition of the extended system
    Sparse,
    /// Semi-separable Cholesky recursion, O(N.J^2)
    Cholesky,
}

impl SolverKind {
    /// All solver kinds
    pub const ALL: [SolverKind; 4] = [
        SolverKind::Direct,
        SolverKind::Band,
        SolverKind::Sparse,
        SolverKind::Cholesky,
    ];

    /// Build a new uncomputed solver of this kind
    pub fn solver(&self) -> Box<dyn Solver> {
        match self {
            SolverKind::Direct => Box::new(DirectSolver::new()),
            SolverKind::Band => Box::new(BandSolver::new()),
            SolverKind::Sparse => Box::new(SparseSolver::new()),
            SolverKind::Cholesky => Box::new(CholeskySolver::new()),
        }
    }

    /// Whether coordinates have to be sorted in strictly increasing order
    pub fn requires_sorted(&self) -> bool {
        !matches!(self, SolverKind::Direct)
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SolverKind::Direct => "Direct",
            SolverKind::Band => "Band",
            SolverKind::Sparse => "Sparse",
            SolverKind::Cholesky => "Cholesky",
        };
        write!(f, "{name}")
    }
}
