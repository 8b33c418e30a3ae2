//! This library evaluates the Gaussian Process log-likelihood for covariance kernels written
//! as a sum of exponential and quasi-periodic (damped cosine) terms, the so-called celerite kernels.
//!
//! For sorted coordinates such kernels are semi-separable which allows to factorize the
//! covariance matrix in O(N.J^2) instead of O(N^3) where N is the number of observations and
//! J the number of kernel terms.
//!
//! Four [Solver] implementations share the same contract: a `compute` step factorizing the
//! covariance matrix of a [KernelSpec], then `log_determinant` and `dot_solve` queries.
//! * [DirectSolver]: dense Cholesky decomposition, the reference,
//! * [BandSolver]: LU decomposition of an extended band matrix,
//! * [SparseSolver]: LU decomposition of the same extended system stored as a sparse matrix,
//! * [CholeskySolver]: semi-separable `L D L^t` recursion, the fast path.
//!
//! ```
//! use ndarray::{array, Array1};
//! use quasisep_solvers::{CholeskySolver, KernelSpec, Solver};
//!
//! let kernel = KernelSpec::mixed(
//!     &array![1.3, 1.5],
//!     &array![0.5, 0.2],
//!     &array![1.0],
//!     &array![0.1],
//!     &array![1.0],
//!     &array![1.0],
//! )
//! .expect("valid kernel");
//! let x = Array1::linspace(-1., 1., 100);
//! let yerr2 = Array1::from_elem(100, 0.3);
//! let y = x.mapv(f64::sin);
//!
//! let mut solver = CholeskySolver::new();
//! solver.compute(&kernel, x.view(), yerr2.view()).expect("positive definite");
//! let loglik = solver.log_likelihood(y.view()).expect("computed");
//! assert!(loglik.is_finite());
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod band;
pub mod batch;
mod cholesky;
mod direct;
mod errors;
mod extended;
pub mod kernel;
mod parameters;
mod solver;
mod sparse;
mod utils;

pub use band::*;
pub use cholesky::*;
pub use direct::*;
pub use errors::*;
pub use kernel::{ComplexTerm, Generators, KernelSpec, RealTerm};
pub use parameters::*;
pub use solver::*;
pub use sparse::*;

/// Name of the environment variable used by binaries to set the log level
pub const QUASISEP_LOG: &str = "QUASISEP_LOG";
