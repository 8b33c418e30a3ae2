use crate::errors::{Result, SolverError};
use crate::extended::ExtendedSystem;
use crate::kernel::KernelSpec;
use crate::solver::Solver;
use crate::utils::{check_rhs, check_samples};

use log::{debug, trace};
use ndarray::{Array1, Array2, ArrayView1};
use std::time::Instant;

/// LU decomposition with partial pivoting of a band matrix.
///
/// The matrix is stored in LAPACK compact band layout: `a[i, j]` is `ab[kl + ku + i - j, j]`,
/// the first `kl` rows being left for the fill-in of row interchanges.
#[derive(Clone, Debug)]
struct BandLu {
    ab: Array2<f64>,
    ipiv: Vec<usize>,
    kl: usize,
    ku: usize,
    log_abs_det: f64,
    sign: f64,
}

impl BandLu {
    /// Factorize in place, fails on an exactly zero pivot
    fn factorize(mut ab: Array2<f64>, kl: usize, ku: usize) -> std::result::Result<Self, usize> {
        let n = ab.ncols();
        let kv = kl + ku;
        let mut ipiv = Vec::with_capacity(n);
        let mut log_abs_det = 0.;
        let mut sign = 1.;
        let mut ju = 0;

        for j in 0..n {
            let km = kl.min(n - 1 - j);
            let mut jp = 0;
            for t in 1..=km {
                if ab[[kv + t, j]].abs() > ab[[kv + jp, j]].abs() {
                    jp = t;
                }
            }
            ipiv.push(j + jp);
            if ab[[kv + jp, j]] == 0. {
                return Err(j);
            }
            ju = ju.max((j + ku + jp).min(n - 1));

            if jp != 0 {
                sign = -sign;
                for c in j..=ju {
                    ab.swap([kv + j - c, c], [kv + j + jp - c, c]);
                }
            }
            let pivot = ab[[kv, j]];
            log_abs_det += pivot.abs().ln();
            if pivot < 0. {
                sign = -sign;
            }

            for t in 1..=km {
                ab[[kv + t, j]] /= pivot;
            }
            for c in (j + 1)..=ju {
                let ujc = ab[[kv + j - c, c]];
                if ujc == 0. {
                    continue;
                }
                for t in 1..=km {
                    let l = ab[[kv + t, j]];
                    ab[[kv + j + t - c, c]] -= l * ujc;
                }
            }
        }
        Ok(BandLu {
            ab,
            ipiv,
            kl,
            ku,
            log_abs_det,
            sign,
        })
    }

    fn solve(&self, b: &mut Array1<f64>) {
        let n = self.ab.ncols();
        let kv = self.kl + self.ku;
        for j in 0..n {
            let l = self.ipiv[j];
            if l != j {
                b.swap(l, j);
            }
            let bj = b[j];
            for t in 1..=self.kl.min(n - 1 - j) {
                b[j + t] -= self.ab[[kv + t, j]] * bj;
            }
        }
        for j in (0..n).rev() {
            b[j] /= self.ab[[kv, j]];
            let bj = b[j];
            for i in j.saturating_sub(kv)..j {
                b[i] -= self.ab[[kv + i - j, j]] * bj;
            }
        }
    }
}

#[derive(Clone, Debug)]
struct BandFactor {
    system: ExtendedSystem,
    lu: BandLu,
}

/// Band solver: LU decomposition of the extended system in band storage.
///
/// O(N.J^2) time and memory, coordinates have to be strictly increasing.
///
/// The LU factorization does not prove positive definiteness: only the sign of the determinant
/// is checked, so a covariance matrix with an even number of negative eigenvalues is accepted
/// and `log_determinant` returns `ln |det K|`.
#[derive(Clone, Debug, Default)]
pub struct BandSolver {
    factor: Option<BandFactor>,
}

impl BandSolver {
    /// Constructor of an uncomputed solver
    pub fn new() -> Self {
        Self::default()
    }

    fn factor(&self) -> Result<&BandFactor> {
        self.factor.as_ref().ok_or(SolverError::NotComputedError)
    }
}

impl Solver for BandSolver {
    fn name(&self) -> &'static str {
        "Band"
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

        let system = ExtendedSystem::new(&kernel.generators(x, yerr2));
        let p = system.half_bandwidth();
        trace!(
            "{} solver: extended system of dim {} with half bandwidth {}",
            self.name(),
            system.dim(),
            p
        );
        let mut ab = Array2::zeros((3 * p + 1, system.dim()));
        for (i, j, v) in system.triplets() {
            ab[[2 * p + i - j, j]] += v;
        }
        let lu = BandLu::factorize(ab, p, p).map_err(|col| {
            SolverError::NotPositiveDefiniteError(format!(
                "zero pivot at column {col} of the banded extended system"
            ))
        })?;
        if lu.sign != system.expected_sign() {
            return Err(SolverError::NotPositiveDefiniteError(
                "covariance matrix has a negative determinant".to_string(),
            ));
        }
        debug!(
            "{} solver: N={} R={} computed in {:?}",
            self.name(),
            system.n_obs(),
            kernel.rank(),
            now.elapsed()
        );
        self.factor = Some(BandFactor { system, lu });
        Ok(())
    }

    fn size(&self) -> Option<usize> {
        self.factor.as_ref().map(|f| f.system.n_obs())
    }

    fn log_determinant(&self) -> Result<f64> {
        Ok(self.factor()?.lu.log_abs_det)
    }

    fn solve(&self, y: ArrayView1<f64>) -> Result<Array1<f64>> {
        let factor = self.factor()?;
        check_rhs(&y, factor.system.n_obs())?;
        let mut b = factor.system.embed(y);
        factor.lu.solve(&mut b);
        Ok(factor.system.extract(&b))
    }
}
