//! Linear algebra types and primitives shared by every filter policy.
//!
//! Dimensions are only known at runtime (they come from the models), so all
//! filter code works on nalgebra's dynamically sized types and validates
//! shapes explicitly.

use nalgebra::{DMatrix, DVector};

use crate::error::{FilterError, Result};

pub type Vector = DVector<f64>;
pub type Matrix = DMatrix<f64>;

/// Force symmetry of a square matrix: (M + Mᵀ) / 2
pub fn symmetrize(m: &Matrix) -> Matrix {
    (m + m.transpose()) * 0.5
}

/// Largest absolute diagonal entry, used as the scale against which
/// pivots are judged.
pub fn diagonal_scale(m: &Matrix) -> f64 {
    m.diagonal().iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}

/// Block diagonal matrix [A 0; 0 B]
pub fn block_diagonal(a: &Matrix, b: &Matrix) -> Matrix {
    let (ar, ac) = a.shape();
    let (br, bc) = b.shape();
    let mut out = Matrix::zeros(ar + br, ac + bc);
    out.view_mut((0, 0), (ar, ac)).copy_from(a);
    out.view_mut((ar, ac), (br, bc)).copy_from(b);
    out
}

/// Compute L such that L * Lᵀ = M for a symmetric positive semidefinite M.
///
/// Cholesky is tried first. Semidefinite inputs (deterministic state
/// components, zero noise) fall back to the eigen decomposition
/// V * sqrt(Λ) with eigenvalues clamped at zero.
pub fn matrix_sqrt(m: &Matrix, tol: f64) -> Result<Matrix> {
    if !m.is_square() {
        return Err(FilterError::mismatch("matrix square root", m.nrows(), m.ncols()));
    }
    if m.nrows() == 0 {
        return Ok(Matrix::zeros(0, 0));
    }

    let sym = symmetrize(m);
    if let Some(chol) = sym.clone().cholesky() {
        return Ok(chol.l());
    }

    let eigen = sym.symmetric_eigen();
    let max_abs = eigen.eigenvalues.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let mut sqrt_vals = Vector::zeros(eigen.eigenvalues.len());
    for (i, &lambda) in eigen.eigenvalues.iter().enumerate() {
        if lambda < -tol * max_abs.max(1.0) {
            return Err(FilterError::NotPositiveSemidefinite(lambda));
        }
        sqrt_vals[i] = lambda.max(0.0).sqrt();
    }

    Ok(eigen.eigenvectors * Matrix::from_diagonal(&sqrt_vals))
}

/// Invert a symmetric positive definite matrix.
///
/// Returns `None` when Cholesky fails or when the smallest squared pivot is
/// below `tol * reference_scale`. `reference_scale` is the magnitude of the
/// quantity `m` was derived from, so that a difference which cancelled down
/// to rounding residue is reported as singular even if the residue happens
/// to be well conditioned on its own.
pub fn invert_spd(m: &Matrix, reference_scale: f64, tol: f64) -> Option<Matrix> {
    if !m.is_square() {
        return None;
    }
    if m.nrows() == 0 {
        return Some(Matrix::zeros(0, 0));
    }
    if !(reference_scale > 0.0) || !reference_scale.is_finite() {
        return None;
    }

    let chol = symmetrize(m).cholesky()?;
    let min_pivot = chol
        .l_dirty()
        .diagonal()
        .iter()
        .fold(f64::INFINITY, |acc, v| acc.min(v * v));
    if min_pivot < tol * reference_scale {
        return None;
    }

    Some(symmetrize(&chol.inverse()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sqrt_positive_definite() {
        let m = Matrix::from_row_slice(3, 3, &[4.0, 1.0, 0.5, 1.0, 3.0, 0.2, 0.5, 0.2, 2.0]);
        let l = matrix_sqrt(&m, 1e-12).unwrap();
        assert_relative_eq!(&l * l.transpose(), m, epsilon = 1e-12);
    }

    #[test]
    fn test_sqrt_semidefinite() {
        // Rank one: [1 1; 1 1]
        let m = Matrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let l = matrix_sqrt(&m, 1e-12).unwrap();
        assert_relative_eq!(&l * l.transpose(), m, epsilon = 1e-10);

        let zero = Matrix::zeros(3, 3);
        let l = matrix_sqrt(&zero, 1e-12).unwrap();
        assert!(l.norm() < 1e-15);
    }

    #[test]
    fn test_sqrt_rejects_indefinite() {
        let m = Matrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -1.0]);
        assert!(matches!(
            matrix_sqrt(&m, 1e-12),
            Err(FilterError::NotPositiveSemidefinite(_))
        ));
    }

    #[test]
    fn test_invert_spd() {
        let m = Matrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]);
        let inv = invert_spd(&m, diagonal_scale(&m), 1e-12).unwrap();
        assert_relative_eq!(&m * inv, Matrix::identity(2, 2), epsilon = 1e-12);
    }

    #[test]
    fn test_invert_spd_rejects_singular() {
        assert!(invert_spd(&Matrix::zeros(2, 2), 1.0, 1e-12).is_none());

        // Well conditioned on its own, but negligible against its source
        let residue = Matrix::identity(2, 2) * 1e-17;
        assert!(invert_spd(&residue, 1.0, 1e-12).is_none());
        assert!(invert_spd(&residue, 1e-17, 1e-12).is_some());
    }

    #[test]
    fn test_block_diagonal() {
        let a = Matrix::identity(2, 2);
        let b = Matrix::from_element(1, 1, 3.0);
        let m = block_diagonal(&a, &b);
        assert_eq!(m.shape(), (3, 3));
        assert_eq!(m[(2, 2)], 3.0);
        assert_eq!(m[(0, 2)], 0.0);
    }
}
