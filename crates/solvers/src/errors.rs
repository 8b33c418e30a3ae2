use thiserror::Error;

/// A result type for semi-separable solvers
pub type Result<T> = std::result::Result<T, SolverError>;

/// An error when building a kernel or using one of the [`Solver`](crate::Solver) implementations
#[derive(Error, Debug)]
pub enum SolverError {
    /// When inputs are malformed (length mismatch, negative variance, unsorted coordinates...)
    #[error("InvalidInput error: {0}")]
    InvalidInputError(String),
    /// When a factorization meets a non-positive (or zero) pivot
    #[error("NotPositiveDefinite error: {0}")]
    NotPositiveDefiniteError(String),
    /// When a query is issued before a successful `compute`
    #[error("Solver not computed: call `compute` successfully before querying")]
    NotComputedError,
    /// When dense linear algebra computation fails
    #[error(transparent)]
    LinalgError(linfa_linalg::LinalgError),
}

impl From<linfa_linalg::LinalgError> for SolverError {
    fn from(err: linfa_linalg::LinalgError) -> Self {
        match err {
            linfa_linalg::LinalgError::NotPositiveDefinite => SolverError::NotPositiveDefiniteError(
                "dense cholesky decomposition of the covariance matrix failed".to_string(),
            ),
            err => SolverError::LinalgError(err),
        }
    }
}
