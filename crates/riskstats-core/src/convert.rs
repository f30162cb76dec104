// =============================================================================
// ndarray ↔ nalgebra Conversion Utilities
// =============================================================================
//
// Design matrices are stored as ndarray arrays; the linear algebra (Cholesky,
// SVD) runs on nalgebra. This module is the only place the two meet.
//
// =============================================================================

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

/// Pivots of the Jacobi-scaled system below this count as rank loss.
const MIN_SCALED_PIVOT: f64 = 1e-10;

// =============================================================================
// ndarray → nalgebra
// =============================================================================

/// Convert an ndarray Array2 to a nalgebra DMatrix.
#[inline]
pub fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

/// Convert an ndarray Array1 to a nalgebra DVector.
#[inline]
pub fn to_dvector(v: &Array1<f64>) -> DVector<f64> {
    DVector::from_iterator(v.len(), v.iter().copied())
}

// =============================================================================
// nalgebra → ndarray
// =============================================================================

/// Convert a nalgebra DMatrix to an ndarray Array2.
#[inline]
pub fn to_array2(m: &DMatrix<f64>) -> Array2<f64> {
    let (nrows, ncols) = m.shape();
    Array2::from_shape_fn((nrows, ncols), |(i, j)| m[(i, j)])
}

/// Convert a nalgebra DVector to an ndarray Array1.
#[inline]
pub fn to_array1(v: &DVector<f64>) -> Array1<f64> {
    Array1::from_vec(v.as_slice().to_vec())
}

// =============================================================================
// Normal equations
// =============================================================================

/// Solve the symmetric positive definite system Aβ = b and also return A⁻¹.
///
/// A is Jacobi-scaled to unit diagonal first, so that columns on very
/// different scales (a vehicle value next to 0/1 indicators) do not mask or
/// fake rank loss.
///
/// Returns None when a scaled pivot collapses (A is singular) or when A is
/// not finite. Rank-deficient systems go through [`least_squares_pinv`].
pub fn cholesky_solve_and_invert(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
) -> Option<(Array1<f64>, Array2<f64>)> {
    let p = a.nrows();
    if a.iter().any(|v| !v.is_finite()) || b.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let scale = DVector::from_fn(p, |i, _| {
        let d = a[(i, i)];
        if d > 0.0 { 1.0 / d.sqrt() } else { 1.0 }
    });
    let scaled = DMatrix::from_fn(p, p, |i, j| a[(i, j)] * scale[i] * scale[j]);
    let scaled_b = b.component_mul(&scale);

    let chol = scaled.cholesky()?;
    if !chol.l_dirty().diagonal().iter().all(|d| d * d > MIN_SCALED_PIVOT) {
        return None;
    }
    let solution = chol.solve(&scaled_b);
    let inverse = chol.inverse();

    // Undo the scaling: β = D y, A⁻¹ = D (DAD)⁻¹ D
    let beta = solution.component_mul(&scale);
    let inv = DMatrix::from_fn(p, p, |i, j| inverse[(i, j)] * scale[i] * scale[j]);
    Some((to_array1(&beta), to_array2(&inv)))
}

/// Minimum-norm least squares: β = X⁺z, along with (X'X)⁺ = X⁺X⁺'.
///
/// The pseudo-inverse comes from an SVD of X itself (n × p), not of X'X, so
/// the cut-off applies to singular values of X and the undetermined
/// directions are resolved by the smallest ‖β‖ in the design's own units.
/// Singular values below σ_max · max(n, p) · ε count as zero, the rank
/// tolerance numpy's `matrix_rank` uses.
///
/// Returns None if X is entirely zero or not finite.
pub fn least_squares_pinv(
    x: &DMatrix<f64>,
    z: &DVector<f64>,
) -> Option<(Array1<f64>, Array2<f64>)> {
    if x.iter().any(|v| !v.is_finite()) || z.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let svd = x.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    if max_sv <= 0.0 {
        return None;
    }
    let cutoff = max_sv * x.nrows().max(x.ncols()) as f64 * f64::EPSILON;
    let pinv = svd.pseudo_inverse(cutoff).ok()?;
    let beta = &pinv * z;
    let inv = &pinv * pinv.transpose();
    Some((to_array1(&beta), to_array2(&inv)))
}

// =============================================================================
// Tests
// =============================================================================
