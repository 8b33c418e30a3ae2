use crate::errors::{Result, SolverError};
use crate::extended::ExtendedSystem;
use crate::kernel::KernelSpec;
use crate::solver::Solver;
use crate::utils::{check_rhs, check_samples};

use log::{debug, trace};
use ndarray::{Array1, ArrayView1};
use sprs::{CsMat, TriMat};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

/// Sparse LU decomposition with partial pivoting `P A = L U`.
///
/// Columns are factorized left to right: each column of `A` is updated by the
/// previous columns of `L` it depends on, then the largest remaining entry is chosen as pivot.
#[derive(Clone, Debug)]
struct SparseLu {
    /// Unit lower triangular factor, diagonal not stored
    l: CsMat<f64>,
    /// Strictly upper triangular part of the upper factor
    u: CsMat<f64>,
    u_diag: Vec<f64>,
    /// Original row chosen as pivot at each step
    prow: Vec<usize>,
    log_abs_det: f64,
    sign: f64,
}

impl SparseLu {
    /// Factorize a square CSC matrix, fails with the column of an exactly zero pivot
    fn factorize(a: &CsMat<f64>) -> std::result::Result<Self, usize> {
        let n = a.cols();
        let mut pinv: Vec<Option<usize>> = vec![None; n];
        let mut prow = Vec::with_capacity(n);
        let mut u_diag = Vec::with_capacity(n);
        let mut l_cols: Vec<Vec<(usize, f64)>> = Vec::with_capacity(n);
        let mut u_entries = Vec::new();

        let mut work = vec![0.; n];
        let mut in_pattern = vec![false; n];
        let mut pattern = Vec::new();
        let mut steps = BinaryHeap::new();

        for (k, col) in a.outer_iterator().enumerate() {
            for (row, &val) in col.iter() {
                if !in_pattern[row] {
                    in_pattern[row] = true;
                    pattern.push(row);
                    if let Some(step) = pinv[row] {
                        steps.push(Reverse(step));
                    }
                }
                work[row] += val;
            }

            // eliminate with previous pivots in increasing order
            while let Some(Reverse(j)) = steps.pop() {
                let xj = work[prow[j]];
                if xj == 0. {
                    continue;
                }
                u_entries.push((j, k, xj));
                for &(row, l) in l_cols[j].iter() {
                    if !in_pattern[row] {
                        in_pattern[row] = true;
                        pattern.push(row);
                        if let Some(step) = pinv[row] {
                            steps.push(Reverse(step));
                        }
                    }
                    work[row] -= l * xj;
                }
            }

            let mut pivot_row = None;
            let mut pivot = 0f64;
            for &row in pattern.iter() {
                if pinv[row].is_none() && work[row].abs() > pivot.abs() {
                    pivot = work[row];
                    pivot_row = Some(row);
                }
            }
            let Some(pivot_row) = pivot_row else {
                return Err(k);
            };
            pinv[pivot_row] = Some(k);
            prow.push(pivot_row);
            u_diag.push(pivot);

            let mut l_col = Vec::new();
            for &row in pattern.iter() {
                if pinv[row].is_none() && work[row] != 0. {
                    l_col.push((row, work[row] / pivot));
                }
                work[row] = 0.;
                in_pattern[row] = false;
            }
            pattern.clear();
            l_cols.push(l_col);
        }

        // rows of L numbered by pivot step
        let mut step_of = vec![0; n];
        for (k, &row) in prow.iter().enumerate() {
            step_of[row] = k;
        }
        let mut l = TriMat::with_capacity((n, n), l_cols.iter().map(Vec::len).sum());
        for (k, l_col) in l_cols.iter().enumerate() {
            for &(row, val) in l_col.iter() {
                l.add_triplet(step_of[row], k, val);
            }
        }
        let mut u = TriMat::with_capacity((n, n), u_entries.len());
        for &(j, k, val) in u_entries.iter() {
            u.add_triplet(j, k, val);
        }

        let log_abs_det = u_diag.iter().map(|d| d.abs().ln()).sum();
        let negatives = u_diag.iter().filter(|d| **d < 0.).count();
        let sign = if (negatives + permutation_parity(&prow)) % 2 == 0 {
            1.
        } else {
            -1.
        };
        Ok(SparseLu {
            l: l.to_csc(),
            u: u.to_csc(),
            u_diag,
            prow,
            log_abs_det,
            sign,
        })
    }

    fn solve(&self, b: &Array1<f64>) -> Array1<f64> {
        let mut x = Array1::from_shape_fn(b.len(), |k| b[self.prow[k]]);
        for (k, col) in self.l.outer_iterator().enumerate() {
            let xk = x[k];
            for (row, &val) in col.iter() {
                x[row] -= val * xk;
            }
        }
        for (k, col) in self.u.outer_iterator().enumerate().rev() {
            x[k] /= self.u_diag[k];
            let xk = x[k];
            for (row, &val) in col.iter() {
                x[row] -= val * xk;
            }
        }
        x
    }
}

/// Number of transpositions of a permutation modulo 2
fn permutation_parity(perm: &[usize]) -> usize {
    let mut visited = vec![false; perm.len()];
    let mut cycles = 0;
    for start in 0..perm.len() {
        if visited[start] {
            continue;
        }
        cycles += 1;
        let mut i = start;
        while !visited[i] {
            visited[i] = true;
            i = perm[i];
        }
    }
    (perm.len() - cycles) % 2
}

#[derive(Clone, Debug)]
struct SparseFactor {
    system: ExtendedSystem,
    lu: SparseLu,
}

/// Sparse solver: LU decomposition of the extended system stored as a compressed sparse matrix.
///
/// Coordinates have to be strictly increasing.
///
/// The LU factorization does not prove positive definiteness: only the sign of the determinant
/// is checked, so a covariance matrix with an even number of negative eigenvalues is accepted
/// and `log_determinant` returns `ln |det K|`.
#[derive(Clone, Debug, Default)]
pub struct SparseSolver {
    factor: Option<SparseFactor>,
}

impl SparseSolver {
    /// Constructor of an uncomputed solver
    pub fn new() -> Self {
        Self::default()
    }

    fn factor(&self) -> Result<&SparseFactor> {
        self.factor.as_ref().ok_or(SolverError::NotComputedError)
    }
}

impl Solver for SparseSolver {
    fn name(&self) -> &'static str {
        "Sparse"
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
        let dim = system.dim();
        let mut tri = TriMat::with_capacity((dim, dim), system.nnz());
        for (i, j, v) in system.triplets() {
            tri.add_triplet(i, j, v);
        }
        let mat: CsMat<f64> = tri.to_csc();
        trace!(
            "{} solver: extended system of dim {} with {} non zeros",
            self.name(),
            dim,
            mat.nnz()
        );

        let lu = SparseLu::factorize(&mat).map_err(|col| {
            SolverError::NotPositiveDefiniteError(format!(
                "zero pivot at column {col} of the sparse extended system"
            ))
        })?;
        if lu.sign != system.expected_sign() {
            return Err(SolverError::NotPositiveDefiniteError(
                "covariance matrix has a negative determinant".to_string(),
            ));
        }
        debug!(
            "{} solver: N={} R={} computed in {:?} (L: {} nnz, U: {} nnz)",
            self.name(),
            system.n_obs(),
            kernel.rank(),
            now.elapsed(),
            lu.l.nnz(),
            lu.u.nnz() + dim
        );
        self.factor = Some(SparseFactor { system, lu });
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
        let sol = factor.lu.solve(&factor.system.embed(y));
        Ok(factor.system.extract(&sol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn sparse(a: &Array2<f64>) -> CsMat<f64> {
        let mut tri = TriMat::new((a.nrows(), a.ncols()));
        for ((i, j), v) in a.indexed_iter() {
            if *v != 0. {
                tri.add_triplet(i, j, *v);
            }
        }
        tri.to_csc()
    }

    #[test]
    fn test_sparse_lu_with_pivoting() {
        let a = array![
            [0.0, 2.0, 0.0, 1.0],
            [3.0, 0.0, -1.0, 0.0],
            [0.0, 4.0, 0.5, 0.0],
            [1.0, 0.0, 0.0, 2.0]
        ];
        let lu = SparseLu::factorize(&sparse(&a)).unwrap();
        assert_ne!(vec![0, 1, 2, 3], lu.prow);

        let expected = array![1.0, -2.0, 0.5, 3.0];
        let x = lu.solve(&a.dot(&expected));
        assert_abs_diff_eq!(expected, x, epsilon = 1e-12);
    }

    #[test]
    fn test_sparse_lu_determinant() {
        // det = 1 * (0 * 2 - 3 * 3) = -9
        let a = array![[1.0, 0.0, 0.0], [0.0, 0.0, 3.0], [0.0, 3.0, 2.0]];
        let lu = SparseLu::factorize(&sparse(&a)).unwrap();
        assert_abs_diff_eq!(9f64.ln(), lu.log_abs_det, epsilon = 1e-14);
        assert_eq!(-1., lu.sign);
    }

    #[test]
    fn test_sparse_lu_singular() {
        let a = array![[1.0, 2.0, 0.0], [2.0, 4.0, 0.0], [0.0, 0.0, 1.0]];
        assert_eq!(Err(1), SparseLu::factorize(&sparse(&a)).map(|_| ()));
    }

    #[test]
    fn test_permutation_parity() {
        assert_eq!(0, permutation_parity(&[0, 1, 2]));
        assert_eq!(1, permutation_parity(&[1, 0, 2]));
        assert_eq!(0, permutation_parity(&[1, 2, 0]));
    }
}
