//! A module for covariance kernels written as a sum of exponential terms.
//!
//! The covariance between two coordinates separated by `tau = |x_i - x_j|` reads
//!
//! `k(tau) = sum_j a_j exp(-c_j tau) + sum_j exp(-c_j tau) (a_j cos(d_j tau) + b_j sin(d_j tau))`
//!
//! where the first sum runs over [RealTerm]s and the second one over [ComplexTerm]s,
//! a complex term being the real part of `alpha exp(-beta tau)` with `alpha = a + ib`
//! and `beta = c + id` (ie. the term folded with its complex conjugate).
//!
//! Such kernels are semi-separable: for sorted coordinates the strictly lower triangular
//! part of the covariance matrix is generated by `R = J_real + 2 J_complex` columns,
//! see [KernelSpec::generators].

use crate::errors::Result;
use crate::parameters::KernelParams;
use linfa::ParamGuard;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, Ix1};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A real exponential term `alpha exp(-beta tau)`
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct RealTerm {
    /// Amplitude
    pub alpha: f64,
    /// Decay rate
    pub beta: f64,
}

impl RealTerm {
    /// Constructor
    pub fn new(alpha: f64, beta: f64) -> Self {
        RealTerm { alpha, beta }
    }

    fn value(&self, tau: f64) -> f64 {
        self.alpha * f64::exp(-self.beta * tau)
    }
}

/// A quasi-periodic term `exp(-beta_real tau) (alpha_real cos(beta_imag tau) + alpha_imag sin(beta_imag tau))`
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct ComplexTerm {
    /// Real part of the amplitude
    pub alpha_real: f64,
    /// Imaginary part of the amplitude
    pub alpha_imag: f64,
    /// Decay rate
    pub beta_real: f64,
    /// Angular frequency
    pub beta_imag: f64,
}

impl ComplexTerm {
    /// Constructor
    pub fn new(alpha_real: f64, alpha_imag: f64, beta_real: f64, beta_imag: f64) -> Self {
        ComplexTerm {
            alpha_real,
            alpha_imag,
            beta_real,
            beta_imag,
        }
    }

    fn value(&self, tau: f64) -> f64 {
        let (s, c) = f64::sin_cos(self.beta_imag * tau);
        f64::exp(-self.beta_real * tau) * (self.alpha_real * c + self.alpha_imag * s)
    }
}

/// Semi-separable generators of a kernel evaluated at sorted coordinates.
///
/// For `n > m`, `K[n, m] = sum_k u[n, k] v[m, k] prod_{p = m+1..=n} phi[p, k]`.
#[derive(Clone, Debug)]
pub struct Generators {
    /// Left generators (n, R)
    pub u: Array2<f64>,
    /// Right generators (n, R)
    pub v: Array2<f64>,
    /// Decay factors from previous coordinate (n, R), first row is one
    pub phi: Array2<f64>,
    /// Diagonal of the covariance matrix (n,)
    pub diag: Array1<f64>,
}

impl Generators {
    /// Number of observations
    pub fn n_obs(&self) -> usize {
        self.diag.len()
    }

    /// Number of generator columns
    pub fn rank(&self) -> usize {
        self.u.ncols()
    }
}

/// A validated kernel specification: ordered real and complex terms.
///
/// Decay rates are non negative. Positive semi-definiteness of the resulting
/// covariance is left to the caller: a violation surfaces at factorization time.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct KernelSpec {
    pub(crate) real: Vec<RealTerm>,
    pub(crate) complex: Vec<ComplexTerm>,
}

impl fmt::Display for KernelSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let terms = self
            .real
            .iter()
            .map(|t| format!("Real({}, {})", t.alpha, t.beta))
            .chain(self.complex.iter().map(|t| {
                format!(
                    "Complex({}{:+}i, {}{:+}i)",
                    t.alpha_real, t.alpha_imag, t.beta_real, t.beta_imag
                )
            }))
            .collect::<Vec<_>>();
        write!(f, "Kernel[{}]", terms.join(" + "))
    }
}

impl KernelSpec {
    /// Kernel parameters builder
    pub fn params() -> KernelParams {
        KernelParams::new()
    }

    /// Kernel made of real terms only
    pub fn real(
        alpha: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        beta: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    ) -> Result<KernelSpec> {
        KernelParams::new().real_terms(alpha, beta).check()
    }

    /// Kernel made of complex terms only
    pub fn complex(
        alpha_real: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        alpha_imag: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        beta_real: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        beta_imag: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    ) -> Result<KernelSpec> {
        KernelParams::new()
            .complex_terms(alpha_real, alpha_imag, beta_real, beta_imag)
            .check()
    }

    /// Kernel made of both real and complex terms
    pub fn mixed(
        alpha: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        beta: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        alpha_real: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        alpha_imag: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        beta_real: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        beta_imag: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    ) -> Result<KernelSpec> {
        KernelParams::new()
            .real_terms(alpha, beta)
            .complex_terms(alpha_real, alpha_imag, beta_real, beta_imag)
            .check()
    }

    /// Real terms
    pub fn real_terms(&self) -> &[RealTerm] {
        &self.real
    }

    /// Complex terms
    pub fn complex_terms(&self) -> &[ComplexTerm] {
        &self.complex
    }

    /// Number of terms J
    pub fn n_terms(&self) -> usize {
        self.real.len() + self.complex.len()
    }

    /// Number of semi-separable generator columns: one per real term, two per complex term
    pub fn rank(&self) -> usize {
        self.real.len() + 2 * self.complex.len()
    }

    /// Whether the kernel has no term at all (covariance reduced to the noise)
    pub fn is_empty(&self) -> bool {
        self.n_terms() == 0
    }

    /// Kernel value for a lag `tau`, the lag is taken in absolute value
    pub fn value(&self, tau: f64) -> f64 {
        let tau = tau.abs();
        self.real.iter().map(|t| t.value(tau)).sum::<f64>()
            + self.complex.iter().map(|t| t.value(tau)).sum::<f64>()
    }

    /// Kernel value between two coordinates
    pub fn value_between(&self, xi: f64, xj: f64) -> f64 {
        self.value(xi - xj)
    }

    /// Kernel value at zero lag
    pub fn zero_lag(&self) -> f64 {
        self.real.iter().map(|t| t.alpha).sum::<f64>()
            + self.complex.iter().map(|t| t.alpha_real).sum::<f64>()
    }

    /// Decay rates of the generator columns (R,)
    fn decay_rates(&self) -> Array1<f64> {
        self.real
            .iter()
            .map(|t| t.beta)
            .chain(self.complex.iter().flat_map(|t| [t.beta_real, t.beta_real]))
            .collect()
    }

    /// Compute semi-separable generators at coordinates `x` with noise variances `yerr2`.
    ///
    /// Coordinates are expected sorted in increasing order, otherwise decay factors
    /// exceed one and the generators do not describe the covariance matrix.
    pub fn generators(&self, x: ArrayView1<f64>, yerr2: ArrayView1<f64>) -> Generators {
        let n = x.len();
        let r = self.rank();
        let n_real = self.real.len();
        let rates = self.decay_rates();

        let mut u = Array2::zeros((n, r));
        let mut v = Array2::zeros((n, r));
        let mut phi = Array2::ones((n, r));

        for (i, &xi) in x.iter().enumerate() {
            for (k, t) in self.real.iter().enumerate() {
                u[[i, k]] = t.alpha;
                v[[i, k]] = 1.;
            }
            for (k, t) in self.complex.iter().enumerate() {
                let (s, c) = f64::sin_cos(t.beta_imag * xi);
                let k = n_real + 2 * k;
                u[[i, k]] = t.alpha_real * c + t.alpha_imag * s;
                u[[i, k + 1]] = t.alpha_real * s - t.alpha_imag * c;
                v[[i, k]] = c;
                v[[i, k + 1]] = s;
            }
            if i > 0 {
                let dx = xi - x[i - 1];
                phi.row_mut(i)
                    .iter_mut()
                    .zip(rates.iter())
                    .for_each(|(p, c)| *p = f64::exp(-c * dx));
            }
        }
        let k0 = self.zero_lag();
        let diag = yerr2.mapv(|v| v + k0);

        Generators { u, v, phi, diag }
    }

    /// Dense covariance matrix at coordinates `x` (any order) with `yerr2` added to the diagonal
    pub fn covariance(&self, x: ArrayView1<f64>, yerr2: ArrayView1<f64>) -> Array2<f64> {
        let n = x.len();
        let k0 = self.zero_lag();
        let mut k = Array2::zeros((n, n));
        for i in 0..n {
            k[[i, i]] = k0 + yerr2[i];
            for j in 0..i {
                let kij = self.value_between(x[i], x[j]);
                k[[i, j]] = kij;
                k[[j, i]] = kij;
            }
        }
        k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};

    fn mixed_kernel() -> KernelSpec {
        KernelSpec::mixed(
            &array![1.3, 1.5],
            &array![0.5, 0.2],
            &array![1.0],
            &array![0.1],
            &array![1.0],
            &array![1.0],
        )
        .expect("valid kernel")
    }

    #[test]
    fn test_kernel_value() {
        let kernel = mixed_kernel();
        let tau: f64 = 0.7;
        let expected = 1.3 * (-0.5 * tau).exp()
            + 1.5 * (-0.2 * tau).exp()
            + (-tau).exp() * (tau.cos() + 0.1 * tau.sin());
        assert_abs_diff_eq!(expected, kernel.value(tau), epsilon = 1e-14);
        assert_abs_diff_eq!(expected, kernel.value(-tau), epsilon = 1e-14);
        assert_abs_diff_eq!(expected, kernel.value_between(0.2, 0.9), epsilon = 1e-14);
        assert_abs_diff_eq!(3.8, kernel.zero_lag(), epsilon = 1e-14);
        assert_abs_diff_eq!(kernel.zero_lag(), kernel.value(0.), epsilon = 1e-14);
    }

    #[test]
    fn test_kernel_sizes() {
        let kernel = mixed_kernel();
        assert_eq!(3, kernel.n_terms());
        assert_eq!(4, kernel.rank());
        assert!(!kernel.is_empty());
        assert!(KernelSpec::default().is_empty());
        assert_eq!(0., KernelSpec::default().value(1.));
    }

    #[test]
    fn test_generators_reproduce_covariance() {
        let kernel = mixed_kernel();
        let x = array![-0.9, -0.3, 0.1, 0.15, 0.8, 1.7];
        let yerr2 = Array1::from_elem(x.len(), 0.3);
        let gen = kernel.generators(x.view(), yerr2.view());
        let cov = kernel.covariance(x.view(), yerr2.view());

        assert_eq!(4, gen.rank());
        assert_eq!(6, gen.n_obs());
        for n in 0..x.len() {
            assert_abs_diff_eq!(cov[[n, n]], gen.diag[n], epsilon = 1e-14);
            for m in 0..n {
                let mut value = 0.;
                for k in 0..gen.rank() {
                    let decay = ((m + 1)..=n).map(|p| gen.phi[[p, k]]).product::<f64>();
                    value += gen.u[[n, k]] * gen.v[[m, k]] * decay;
                }
                assert_abs_diff_eq!(cov[[n, m]], value, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_display() {
        let kernel = KernelSpec::real(&array![1.3], &array![0.5]).unwrap();
        assert_eq!("Kernel[Real(1.3, 0.5)]", kernel.to_string());
    }

    #[cfg(feature = "serializable")]
    #[test]
    fn test_serialized_kernel() {
        let kernel = mixed_kernel();
        let json = serde_json::to_string(&kernel).expect("serialized kernel");
        let loaded: KernelSpec = serde_json::from_str(&json).expect("deserialized kernel");
        assert_eq!(kernel, loaded);
    }
}
