use crate::errors::{Result, SolverError};
use crate::kernel::{ComplexTerm, KernelSpec, RealTerm};
use linfa::ParamGuard;
use ndarray::{ArrayBase, Data, Ix1};

/// The set of coefficients that can be specified to build a [KernelSpec].
///
/// Terms are accumulated in the order they are given, coefficient arrays are
/// checked for consistent lengths and decay rates for non negativity when the
/// parameters are validated with [ParamGuard::check].
///
/// ```
/// use linfa::ParamGuard;
/// use ndarray::array;
/// use quasisep_solvers::KernelSpec;
///
/// let kernel = KernelSpec::params()
///     .real_terms(&array![1.3, 1.5], &array![0.5, 0.2])
///     .complex_term(1.0, 0.1, 1.0, 1.0)
///     .check()
///     .expect("valid kernel");
/// assert_eq!(kernel.n_terms(), 3);
/// ```
#[derive(Clone, Debug, Default)]
pub struct KernelParams {
    spec: KernelSpec,
    /// First inconsistency met while accumulating terms
    shape_error: Option<String>,
}

impl KernelParams {
    /// A constructor for an empty kernel (no term)
    pub fn new() -> KernelParams {
        Self::default()
    }

    /// A constructor for kernel parameters from a validated kernel
    pub fn new_from_valid(spec: &KernelSpec) -> Self {
        KernelParams {
            spec: spec.clone(),
            shape_error: None,
        }
    }

    /// Append one real term `alpha exp(-beta tau)`
    pub fn real_term(mut self, alpha: f64, beta: f64) -> Self {
        self.spec.real.push(RealTerm::new(alpha, beta));
        self
    }

    /// Append one complex term with amplitude `alpha_real + i alpha_imag`
    /// and exponent `beta_real + i beta_imag`
    pub fn complex_term(
        mut self,
        alpha_real: f64,
        alpha_imag: f64,
        beta_real: f64,
        beta_imag: f64,
    ) -> Self {
        self.spec.complex.push(ComplexTerm::new(
            alpha_real, alpha_imag, beta_real, beta_imag,
        ));
        self
    }

    /// Append real terms given as parallel coefficient arrays
    pub fn real_terms(
        mut self,
        alpha: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        beta: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    ) -> Self {
        if alpha.len() != beta.len() {
            self.record(format!(
                "real terms coefficients should have the same length, got alpha({}) and beta({})",
                alpha.len(),
                beta.len()
            ));
            return self;
        }
        self.spec.real.extend(
            alpha
                .iter()
                .zip(beta.iter())
                .map(|(&a, &b)| RealTerm::new(a, b)),
        );
        self
    }

    /// Append complex terms given as parallel coefficient arrays
    pub fn complex_terms(
        mut self,
        alpha_real: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        alpha_imag: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        beta_real: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        beta_imag: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    ) -> Self {
        let n = alpha_real.len();
        if alpha_imag.len() != n || beta_real.len() != n || beta_imag.len() != n {
            self.record(format!(
                "complex terms coefficients should have the same length, got alpha_real({}), \
                alpha_imag({}), beta_real({}) and beta_imag({})",
                n,
                alpha_imag.len(),
                beta_real.len(),
                beta_imag.len()
            ));
            return self;
        }
        self.spec.complex.extend((0..n).map(|i| {
            ComplexTerm::new(alpha_real[i], alpha_imag[i], beta_real[i], beta_imag[i])
        }));
        self
    }

    fn record(&mut self, msg: String) {
        if self.shape_error.is_none() {
            self.shape_error = Some(msg);
        }
    }
}

impl From<KernelSpec> for KernelParams {
    fn from(valid: KernelSpec) -> Self {
        KernelParams {
            spec: valid,
            shape_error: None,
        }
    }
}

impl ParamGuard for KernelParams {
    type Checked = KernelSpec;
    type Error = SolverError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if let Some(msg) = &self.shape_error {
            return Err(SolverError::InvalidInputError(msg.to_owned()));
        }
        for (i, t) in self.spec.real.iter().enumerate() {
            if !t.alpha.is_finite() || !t.beta.is_finite() {
                return Err(SolverError::InvalidInputError(format!(
                    "real term {i} has non finite coefficients ({}, {})",
                    t.alpha, t.beta
                )));
            }
            if t.beta < 0. {
                return Err(SolverError::InvalidInputError(format!(
                    "real term {i} has a negative decay rate {}",
                    t.beta
                )));
            }
        }
        for (i, t) in self.spec.complex.iter().enumerate() {
            if [t.alpha_real, t.alpha_imag, t.beta_real, t.beta_imag]
                .iter()
                .any(|v| !v.is_finite())
            {
                return Err(SolverError::InvalidInputError(format!(
                    "complex term {i} has non finite coefficients"
                )));
            }
            if t.beta_real < 0. {
                return Err(SolverError::InvalidInputError(format!(
                    "complex term {i} has a negative decay rate {}",
                    t.beta_real
                )));
            }
        }
        Ok(&self.spec)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.spec)
    }
}
