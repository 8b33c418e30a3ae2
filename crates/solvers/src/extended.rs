//! Embedding of a semi-separable covariance matrix into a larger sparse symmetric system.
//!
//! Each observation `n` but the last one carries `2R` auxiliary unknowns: `lambda_n` propagating
//! the contributions of later observations and `rho_n` propagating the earlier ones.
//! Unknowns are ordered `[x_0, lambda_0, rho_0, x_1, lambda_1, rho_1, ..., x_{N-1}]` so that the
//! extended matrix has a half bandwidth of `R + 1`.
//!
//! Eliminating auxiliary unknowns gives back the covariance matrix `K` (Schur complement) while
//! the auxiliary block has a determinant of `(-1)^(R (N-1))`. Hence `log|det(K)|` is the log
//! absolute determinant of the extended matrix, and the determinant sign tells whether `K` may be
//! positive definite.

use crate::kernel::Generators;
use ndarray::{Array1, ArrayView1};

/// Extended system built from semi-separable generators
#[derive(Clone, Debug)]
pub(crate) struct ExtendedSystem {
    n_obs: usize,
    rank: usize,
    /// Upper triangular entries (row <= col) of the symmetric extended matrix
    entries: Vec<(usize, usize, f64)>,
}

impl ExtendedSystem {
    pub fn new(gen: &Generators) -> Self {
        let n_obs = gen.n_obs();
        let rank = gen.rank();
        let mut sys = ExtendedSystem {
            n_obs,
            rank,
            entries: Vec::with_capacity(n_obs * (1 + 4 * rank)),
        };
        for n in 0..n_obs {
            let xn = sys.obs_index(n);
            sys.entries.push((xn, xn, gen.diag[n]));
            if n + 1 == n_obs {
                continue;
            }
            let xnext = sys.obs_index(n + 1);
            for k in 0..rank {
                let (lambda, rho) = (sys.lambda_index(n, k), sys.rho_index(n, k));
                let phi = gen.phi[[n + 1, k]];
                sys.entries.push((xn, lambda, gen.v[[n, k]]));
                sys.entries.push((lambda, rho, -1.));
                sys.entries.push((rho, xnext, phi * gen.u[[n + 1, k]]));
                if n + 2 < n_obs {
                    sys.entries.push((rho, sys.lambda_index(n + 1, k), phi));
                }
            }
        }
        sys
    }

    /// Number of observations
    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    /// Number of unknowns of the extended system
    pub fn dim(&self) -> usize {
        (self.n_obs - 1) * (2 * self.rank + 1) + 1
    }

    /// Largest distance between a non zero entry and the diagonal
    pub fn half_bandwidth(&self) -> usize {
        self.rank + 1
    }

    /// Index of the unknown corresponding to observation `n`
    pub fn obs_index(&self, n: usize) -> usize {
        n * (2 * self.rank + 1)
    }

    fn lambda_index(&self, n: usize, k: usize) -> usize {
        self.obs_index(n) + 1 + k
    }

    fn rho_index(&self, n: usize, k: usize) -> usize {
        self.obs_index(n) + 1 + self.rank + k
    }

    /// Sign of the extended matrix determinant when `K` is positive definite
    pub fn expected_sign(&self) -> f64 {
        if (self.rank * (self.n_obs - 1)) % 2 == 0 {
            1.
        } else {
            -1.
        }
    }

    /// All non zero entries `(row, col, value)` of the extended matrix, both triangles
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.entries.iter().flat_map(|&(i, j, v)| {
            let mirror = if i == j { None } else { Some((j, i, v)) };
            std::iter::once((i, j, v)).chain(mirror)
        })
    }

    /// Number of non zero entries of the extended matrix
    pub fn nnz(&self) -> usize {
        2 * self.entries.len() - self.n_obs
    }

    /// Right-hand side of the extended system: `y` at observation unknowns, zero elsewhere
    pub fn embed(&self, y: ArrayView1<f64>) -> Array1<f64> {
        let mut rhs = Array1::zeros(self.dim());
        for (n, &yn) in y.iter().enumerate() {
            rhs[self.obs_index(n)] = yn;
        }
        rhs
    }

    /// Observation unknowns of an extended solution
    pub fn extract(&self, sol: &Array1<f64>) -> Array1<f64> {
        Array1::from_shape_fn(self.n_obs, |n| sol[self.obs_index(n)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::KernelSpec;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn dense(sys: &ExtendedSystem) -> Array2<f64> {
        let mut m = Array2::zeros((sys.dim(), sys.dim()));
        sys.triplets().for_each(|(i, j, v)| m[[i, j]] += v);
        m
    }

    #[test]
    fn test_extended_layout() {
        let kernel = KernelSpec::mixed(
            &array![1.3],
            &array![0.5],
            &array![1.0],
            &array![0.1],
            &array![1.0],
            &array![1.0],
        )
        .unwrap();
        let x = array![-0.5, 0.1, 0.2, 0.7];
        let yerr2 = array![0.3, 0.35, 0.32, 0.4];
        let sys = ExtendedSystem::new(&kernel.generators(x.view(), yerr2.view()));

        assert_eq!(3 * 7 + 1, sys.dim());
        assert_eq!(4, sys.half_bandwidth());
        assert_eq!(-1., sys.expected_sign());
        let m = dense(&sys);
        assert_eq!(sys.nnz(), m.iter().filter(|v| **v != 0.).count());
        assert_abs_diff_eq!(m, m.t().to_owned(), epsilon = 0.);
        for ((i, j), v) in m.indexed_iter() {
            if *v != 0. {
                assert!(i.abs_diff(j) <= sys.half_bandwidth());
            }
        }
    }

    #[test]
    fn test_extended_schur_complement() {
        let kernel = KernelSpec::mixed(
            &array![1.3, 1.5],
            &array![0.5, 0.2],
            &array![1.0],
            &array![0.1],
            &array![1.0],
            &array![1.0],
        )
        .unwrap();
        let x = array![-0.9, -0.4, 0.05, 0.3, 0.8];
        let yerr2 = array![0.3, 0.35, 0.32, 0.4, 0.31];
        let sys = ExtendedSystem::new(&kernel.generators(x.view(), yerr2.view()));
        let cov = kernel.covariance(x.view(), yerr2.view());
        let m = dense(&sys);

        // extended matrix applied to the propagated unknowns of v gives K v
        let v = array![0.3, -1.2, 0.7, 0.5, 2.0];
        let r = kernel.rank();
        let mut ext = sys.embed(v.view());
        let gen = kernel.generators(x.view(), yerr2.view());
        for k in 0..r {
            // rho_n = sum_{m <= n} decayed v_m contributions
            let mut rho = 0.;
            for n in 0..x.len() - 1 {
                rho = gen.phi[[n, k]] * rho + gen.v[[n, k]] * v[n];
                ext[sys.rho_index(n, k)] = rho;
            }
            // lambda_n = sum_{m > n} decayed u_m contributions
            let mut lambda = 0.;
            for n in (0..x.len() - 1).rev() {
                lambda = gen.phi[[n + 1, k]] * (gen.u[[n + 1, k]] * v[n + 1] + lambda);
                ext[sys.lambda_index(n, k)] = lambda;
            }
        }
        let prod = m.dot(&ext);
        let expected = cov.dot(&v);
        assert_abs_diff_eq!(expected, sys.extract(&prod), epsilon = 1e-12);
        for i in 0..sys.dim() {
            if i % (2 * r + 1) != 0 {
                assert_abs_diff_eq!(0., prod[i], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_single_observation() {
        let kernel = KernelSpec::real(&array![1.3], &array![0.5]).unwrap();
        let sys = ExtendedSystem::new(&kernel.generators(array![0.1].view(), array![0.3].view()));
        assert_eq!(1, sys.dim());
        assert_eq!(1, sys.nnz());
        assert_eq!(1., sys.expected_sign());
    }
}
