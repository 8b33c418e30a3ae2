//! Semi-separable Cholesky solver.
//!
//! For sorted coordinates, the covariance matrix factorizes as `K = L D L^t` where `L` is unit
//! lower triangular and semi-separable with the same decay factors as `K`:
//!
//! `L[n, m] = sum_k u[n, k] w[m, k] prod_{p = m+1..=n} phi[p, k]` for `n > m`.
//!
//! Row `n` is obtained from a `R x R` state `S` summarizing all previous rows:
//!
//! * `S_n = diag(phi_n) (S_{n-1} + D_{n-1} w_{n-1} w_{n-1}^t) diag(phi_n)`
//! * `D_n = K[n, n] - u_n^t S_n u_n`
//! * `w_n = (v_n - S_n u_n) / D_n`
//!
//! so that the factorization costs O(N.R^2) and only the `w` generators and `D` are stored.

use crate::errors::{Result, SolverError};
use crate::kernel::KernelSpec;
use crate::solver::Solver;
use crate::utils::{check_rhs, check_samples};

use log::debug;
use ndarray::{Array1, Array2, ArrayView1, Zip};
use std::time::Instant;

#[derive(Clone, Debug)]
struct CholeskyFactor {
    u: Array2<f64>,
    phi: Array2<f64>,
    w: Array2<f64>,
    d: Array1<f64>,
}

/// Semi-separable `L D L^t` solver in O(N.J^2) time and O(N.J) memory.
///
/// Coordinates have to be strictly increasing.
#[derive(Clone, Debug, Default)]
pub struct CholeskySolver {
    factor: Option<CholeskyFactor>,
}

impl CholeskySolver {
    /// Constructor of an uncomputed solver
    pub fn new() -> Self {
        Self::default()
    }

    fn factor(&self) -> Result<&CholeskyFactor> {
        self.factor.as_ref().ok_or(SolverError::NotComputedError)
    }

    /// Diagonal `D` of the current `L D L^t` factorization
    pub fn diagonal(&self) -> Result<ArrayView1<'_, f64>> {
        Ok(self.factor()?.d.view())
    }
}

impl Solver for CholeskySolver {
    fn name(&self) -> &'static str {
        "Cholesky"
    }

    fn compute(
        &mut self,
        kernel: &KernelSpec,
        x: ArrayView1<f64>,
        yerr2: ArrayView1<f64>,
    ) -> Result<()> {
        self.factor = None;
        check_samples(&x, &yerr2, true)?;
        let now = Instant::now();

        let gen = kernel.generators(x, yerr2);
        let (n, r) = (gen.n_obs(), gen.rank());
        let mut s = Array2::<f64>::zeros((r, r));
        let mut w = Array2::<f64>::zeros((n, r));
        let mut d = Array1::<f64>::zeros(n);

        for i in 0..n {
            let phi = gen.phi.row(i);
            if i > 0 {
                let (w_prev, d_prev) = (w.row(i - 1), d[i - 1]);
                for a in 0..r {
                    for b in 0..r {
                        s[[a, b]] = phi[a] * (s[[a, b]] + d_prev * w_prev[a] * w_prev[b]) * phi[b];
                    }
                }
            }
            let u = gen.u.row(i);
            let su = s.dot(&u);
            let di = gen.diag[i] - u.dot(&su);
            if !(di > 0.) {
                return Err(SolverError::NotPositiveDefiniteError(format!(
                    "non positive pivot {di} at row {i}"
                )));
            }
            d[i] = di;
            Zip::from(w.row_mut(i))
                .and(gen.v.row(i))
                .and(&su)
                .for_each(|w, &v, &su| *w = (v - su) / di);
        }

        debug!(
            "{} solver: N={} R={} computed in {:?}",
            self.name(),
            n,
            r,
            now.elapsed()
        );
        self.factor = Some(CholeskyFactor {
            u: gen.u,
            phi: gen.phi,
            w,
            d,
        });
        Ok(())
    }

    fn size(&self) -> Option<usize> {
        self.factor.as_ref().map(|f| f.d.len())
    }

    fn log_determinant(&self) -> Result<f64> {
        Ok(self.factor()?.d.mapv(f64::ln).sum())
    }

    fn solve(&self, y: ArrayView1<f64>) -> Result<Array1<f64>> {
        let CholeskyFactor { u, phi, w, d } = self.factor()?;
        let n = d.len();
        check_rhs(&y, n)?;
        let mut z = y.to_owned();

        // L z = y
        let mut f = Array1::<f64>::zeros(u.ncols());
        for i in 1..n {
            let z_prev = z[i - 1];
            Zip::from(&mut f)
                .and(w.row(i - 1))
                .and(phi.row(i))
                .for_each(|f, &w, &phi| *f = phi * (*f + w * z_prev));
            z[i] -= u.row(i).dot(&f);
        }
        z /= d;

        // L^t x = z
        let mut g = Array1::<f64>::zeros(u.ncols());
        for i in (0..n.saturating_sub(1)).rev() {
            let z_next = z[i + 1];
            Zip::from(&mut g)
                .and(u.row(i + 1))
                .and(phi.row(i + 1))
                .for_each(|g, &u, &phi| *g = phi * (*g + u * z_next));
            z[i] -= w.row(i).dot(&g);
        }
        Ok(z)
    }
}
