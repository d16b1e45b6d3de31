//! Matrix conversion utilities.
//!
//! The solver keeps Jacobians and residuals in `ndarray` containers, while the
//! damped normal equations are factorised with `nalgebra`'s Cholesky
//! decomposition. These helpers move data between the two.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

use crate::error::{DeclineError, Result};

/// Convert an ndarray Array2 to a nalgebra DMatrix.
///
/// # Errors
///
/// * `DeclineError::DimensionMismatch` if the matrix has no rows or columns
pub fn ndarray_to_nalgebra(arr: &Array2<f64>) -> Result<DMatrix<f64>> {
    let (rows, cols) = arr.dim();
    if rows == 0 || cols == 0 {
        return Err(DeclineError::DimensionMismatch(format!(
            "Cannot convert an empty {}x{} matrix",
            rows, cols
        )));
    }

    // ndarray is row-major by default, nalgebra is column-major; index-wise copy
    Ok(DMatrix::from_fn(rows, cols, |i, j| arr[[i, j]]))
}

/// Convert an ndarray Array1 to a nalgebra DVector.
pub fn ndarray_vec_to_nalgebra(arr: &Array1<f64>) -> Result<DVector<f64>> {
    if arr.is_empty() {
        return Err(DeclineError::DimensionMismatch(
            "Cannot convert an empty vector".to_string(),
        ));
    }

    Ok(DVector::from_iterator(arr.len(), arr.iter().copied()))
}

/// Convert a nalgebra DVector to an ndarray Array1.
pub fn nalgebra_vec_to_ndarray(vec: &DVector<f64>) -> Array1<f64> {
    vec.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_ndarray_to_nalgebra_keeps_layout() {
        let arr = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];

        let mat = ndarray_to_nalgebra(&arr).unwrap();

        assert_eq!(mat.nrows(), 2);
        assert_eq!(mat.ncols(), 3);
        for i in 0..arr.nrows() {
            for j in 0..arr.ncols() {
                assert_relative_eq!(arr[[i, j]], mat[(i, j)]);
            }
        }
    }

    #[test]
    fn test_vector_conversion() {
        let arr = array![1.5, -2.0, 3.25];

        let vec = ndarray_vec_to_nalgebra(&arr).unwrap();
        assert_eq!(vec.nrows(), 3);
        assert_relative_eq!(vec[1], -2.0);

        let back = nalgebra_vec_to_ndarray(&vec);
        assert_eq!(back, arr);
    }

    #[test]
    fn test_empty_inputs_are_rejected() {
        let empty = Array2::<f64>::zeros((0, 2));
        assert!(matches!(
            ndarray_to_nalgebra(&empty),
            Err(DeclineError::DimensionMismatch(_))
        ));

        let empty_vec = Array1::<f64>::zeros(0);
        assert!(ndarray_vec_to_nalgebra(&empty_vec).is_err());
    }
}
