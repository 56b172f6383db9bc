// =============================================================================
// ndarray <-> nalgebra Conversion Utilities
// =============================================================================
//
// Arrays and results live in ndarray; the weighted least-squares solve runs
// on nalgebra types. These helpers keep every crossing of that boundary in
// one place.
//
// =============================================================================

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

/// Convert a nalgebra DVector to an ndarray Array1.
#[inline]
pub fn to_array1(v: &DVector<f64>) -> Array1<f64> {
    Array1::from_iter(v.iter().copied())
}

/// Convert a nalgebra DMatrix to an ndarray Array2.
#[inline]
pub fn to_array2(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_vector_round_trip() {
        let v = DVector::from_vec(vec![1.0, -2.5, 3.0]);
        assert_eq!(to_array1(&v), array![1.0, -2.5, 3.0]);
    }

    #[test]
    fn test_matrix_layout_preserved() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let a = to_array2(&m);
        assert_eq!(a[[0, 2]], 3.0);
        assert_eq!(a[[1, 0]], 4.0);
    }
}
