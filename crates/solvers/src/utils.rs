use crate::errors::{Result, SolverError};
use ndarray::{ArrayBase, Data, Ix1};

/// Check a sample set: `x` coordinates and `yerr2` noise variances.
///
/// Both arrays must have the same non zero length, variances must be finite and non negative,
/// and when `sorted` is required, coordinates must be strictly increasing.
pub(crate) fn check_samples(
    x: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    yerr2: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    sorted: bool,
) -> Result<()> {
    if x.is_empty() {
        return Err(SolverError::InvalidInputError(
            "at least one sample is required".to_string(),
        ));
    }
    if x.len() != yerr2.len() {
        return Err(SolverError::InvalidInputError(format!(
            "coordinates ({}) and noise variances ({}) should have the same length",
            x.len(),
            yerr2.len()
        )));
    }
    if let Some(i) = x.iter().position(|v| !v.is_finite()) {
        return Err(SolverError::InvalidInputError(format!(
            "coordinate {i} is not finite ({})",
            x[i]
        )));
    }
    if let Some(i) = yerr2.iter().position(|v| !v.is_finite() || *v < 0.) {
        return Err(SolverError::InvalidInputError(format!(
            "noise variance {i} should be finite and non negative, got {}",
            yerr2[i]
        )));
    }
    if sorted {
        if let Some(i) = (1..x.len()).find(|&i| x[i] <= x[i - 1]) {
            return Err(SolverError::InvalidInputError(format!(
                "coordinates should be strictly increasing, got x[{}]={} then x[{}]={}",
                i - 1,
                x[i - 1],
                i,
                x[i]
            )));
        }
    }
    Ok(())
}

/// Check that a right-hand side matches the number of observations of a factorization
pub(crate) fn check_rhs(y: &ArrayBase<impl Data<Elem = f64>, Ix1>, n_obs: usize) -> Result<()> {
    if y.len() != n_obs {
        return Err(SolverError::InvalidInputError(format!(
            "right-hand side length ({}) should match the number of observations ({})",
            y.len(),
            n_obs
        )));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    #[test]
    fn test_check_samples() {
        let x = array![0.1, 0.5, 0.7];
        let yerr2 = array![0.3, 0.3, 0.3];
        assert!(check_samples(&x, &yerr2, true).is_ok());
        assert!(check_samples(&x, &array![0.3, 0.3], false).is_err());
        assert!(check_samples(&x, &array![0.3, -0.3, 0.3], false).is_err());
        assert!(check_samples(&array![f64::NAN, 0.5, 0.7], &yerr2, false).is_err());
        let empty = Array1::<f64>::zeros(0);
        assert!(check_samples(&empty, &empty, false).is_err());
    }

    #[test]
    fn test_check_sorted_samples() {
        let yerr2 = array![0.3, 0.3, 0.3];
        let unsorted = array![0.1, 0.7, 0.5];
        assert!(check_samples(&unsorted, &yerr2, false).is_ok());
        assert!(matches!(
            check_samples(&unsorted, &yerr2, true),
            Err(SolverError::InvalidInputError(_))
        ));
        let ties = array![0.1, 0.5, 0.5];
        assert!(check_samples(&ties, &yerr2, true).is_err());
    }

    #[test]
    fn test_simulated_samples() {
        let (x, yerr2, y) = tests_data::simulated_samples(256, 42);
        assert_eq!(256, x.len());
        assert!(x.iter().all(|&v| (-1. ..1.).contains(&v)));
        assert!(x.windows(2).into_iter().all(|w| w[0] < w[1]));
        assert!(yerr2.iter().all(|&v| (0.3..0.4).contains(&v)));
        assert_eq!(x.mapv(f64::sin), y);
        assert!(check_samples(&x, &yerr2, true).is_ok());
    }

    #[test]
    fn test_check_rhs() {
        assert!(check_rhs(&array![1., 2.], 2).is_ok());
        assert!(check_rhs(&array![1., 2.], 3).is_err());
    }
}
