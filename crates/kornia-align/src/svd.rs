//! Double precision 3×3 Singular Value Decomposition (SVD).
//!
//! This module computes the singular value decomposition of 3×3 matrices,
//! the linear algebra primitive behind closed-form point set registration.
//!
//! # Mathematical Background
//!
//! For any matrix A ∈ ℝ³ˣ³, the SVD decomposes it into three matrices:
//!
//! ```text
//! A = U Σ Vᵀ
//! ```
//!
//! where:
//! * U ∈ ℝ³ˣ³ is an orthogonal matrix (left singular vectors)
//! * Σ ∈ ℝ³ˣ³ is a diagonal matrix of singular values (σ₁ ≥ σ₂ ≥ σ₃ ≥ 0)
//! * V ∈ ℝ³ˣ³ is an orthogonal matrix (right singular vectors)
//!
//! # Implementation Details
//!
//! The decomposition follows the structure of McAdams et al.:
//! * one-sided (Hestenes) Jacobi rotations orthogonalize the columns of A,
//!   giving B = A·V without forming AᵀA
//! * B is sorted by decreasing column norm
//! * QR decomposition of B using Givens rotations gives U and Σ
//!
//! Unlike the single precision variant of the paper, the rotations here are
//! exact (no quaternion approximation), the Jacobi step works on A itself instead
//! of AᵀA (which would square the condition number) and the sweeps run until the
//! columns are orthogonal to machine precision.
//!
//! # Example
//!
//! ```
//! use glam::{DMat3, DVec3};
//! use kornia_align::svd::svd3;
//!
//! let matrix = DMat3::from_diagonal(DVec3::new(1.0, 2.0, 3.0));
//!
//! let svd_result = svd3(&matrix);
//! let u = svd_result.u();
//! let s = svd_result.s();
//! let v = svd_result.v();
//!
//! let reconstruction = *u * *s * v.transpose();
//! assert!(reconstruction.abs_diff_eq(matrix, 1e-12));
//! ```
//!
//! # References
//!
//! * McAdams, Selle, Tamstorf, Teran, and Sifakis (2011).
//!   "Computing the Singular Value Decomposition of 3x3 matrices with minimal
//!   branching and elementary floating point operations."
//!   University of Wisconsin-Madison Technical Report TR1690.
//! * Golub and Van Loan, "Matrix Computations", §8.5 (symmetric Schur decomposition).
//!
//! # See also
//!
//! * [`crate::rigid`] for using SVD in rigid body transformations

use glam::{DMat3, DVec3};

const MAX_SWEEPS: usize = 16;

#[derive(Debug)]
/// Helper struct to store the parameters of a plane rotation
struct Givens {
    /// The cosine of the angle in the Givens rotation.
    cos_theta: f64,

    /// The sine of the angle in the Givens rotation.
    sin_theta: f64,
}

impl Givens {
    const IDENTITY: Self = Self {
        cos_theta: 1.0,
        sin_theta: 0.0,
    };
}

#[derive(Debug)]
/// Helper struct to store 2 Matrices to avoid OUT parameters on functions
struct QR3 {
    /// The orthogonal matrix Q from the QR decomposition.
    q: DMat3,

    /// The upper triangular matrix R from the QR decomposition.
    r: DMat3,
}

#[derive(Debug, Clone)]
/// Helper struct to store 3 Matrices to avoid OUT parameters on functions
pub struct SVD3Set {
    /// The matrix of left singular vectors.
    u: DMat3,

    /// The diagonal matrix of singular values.
    s: DMat3,

    /// The matrix of right singular vectors.
    v: DMat3,
}

impl SVD3Set {
    /// Get the left singular vectors matrix.
    #[inline]
    pub fn u(&self) -> &DMat3 {
        &self.u
    }

    /// Get the diagonal matrix of singular values.
    #[inline]
    pub fn s(&self) -> &DMat3 {
        &self.s
    }

    /// Get the right singular vectors matrix.
    #[inline]
    pub fn v(&self) -> &DMat3 {
        &self.v
    }

    /// Get the singular values in descending order.
    #[inline]
    pub fn singular_values(&self) -> DVec3 {
        DVec3::new(self.s.x_axis.x, self.s.y_axis.y, self.s.z_axis.z)
    }
}

/// Rotation that makes columns `b_p` and `b_q` orthogonal (one-sided Jacobi).
///
/// `alpha = |b_p|²`, `beta = |b_q|²`, `gamma = b_p · b_q`; this is the symmetric
/// Schur rotation of the 2x2 block of BᵀB (Golub & Van Loan, Algorithm 8.5.1)
/// without ever forming BᵀB.
#[inline(always)]
fn jacobi_givens_parameters(alpha: f64, beta: f64, gamma: f64) -> Givens {
    if gamma == 0.0 {
        return Givens::IDENTITY;
    }
    let zeta = (beta - alpha) / (2.0 * gamma);
    // pick the smaller root so that |theta| <= pi / 4
    let t = zeta.signum() / (zeta.abs() + zeta.hypot(1.0));
    let cos_theta = 1.0 / t.hypot(1.0);
    Givens {
        cos_theta,
        sin_theta: t * cos_theta,
    }
}

/// Orthogonalizes columns `p` and `q` of `b`, applying the same rotation to `v`.
///
/// Returns `false` if the columns were already orthogonal to working precision.
#[inline(always)]
fn orthogonalize_columns(b: &mut DMat3, v: &mut DMat3, p: usize, q: usize) -> bool {
    let b_p = b.col(p);
    let b_q = b.col(q);
    let alpha = b_p.length_squared();
    let beta = b_q.length_squared();
    let gamma = b_p.dot(b_q);
    if gamma.abs() <= f64::EPSILON * (alpha * beta).sqrt() {
        return false;
    }

    let g = jacobi_givens_parameters(alpha, beta, gamma);
    let (c, s) = (g.cos_theta, g.sin_theta);
    *b.col_mut(p) = c * b_p - s * b_q;
    *b.col_mut(q) = s * b_p + c * b_q;

    let v_p = v.col(p);
    let v_q = v.col(q);
    *v.col_mut(p) = c * v_p - s * v_q;
    *v.col_mut(q) = s * v_p + c * v_q;
    true
}

/// Cyclic one-sided Jacobi sweeps on the columns of `a`.
///
/// Returns `(B, V)` with `B = A * V` having mutually orthogonal columns, the
/// column norms of `B` being the singular values of `A`.
fn one_sided_jacobi(a: &DMat3) -> (DMat3, DMat3) {
    let mut b = *a;
    let mut v = DMat3::IDENTITY;
    for _ in 0..MAX_SWEEPS {
        let mut rotated = orthogonalize_columns(&mut b, &mut v, 0, 1);
        rotated |= orthogonalize_columns(&mut b, &mut v, 0, 2);
        rotated |= orthogonalize_columns(&mut b, &mut v, 1, 2);
        if !rotated {
            break;
        }
    }
    (b, v)
}

/// Helper function used to swap X with Y and Y with X if c == true
#[inline(always)]
fn cond_swap<T>(c: bool, x: &mut T, y: &mut T) {
    if c {
        std::mem::swap(x, y);
    }
}

/// Helper function to conditionally negate a DVec3
#[inline(always)]
fn cond_negate_vec3(c: bool, v: &mut DVec3) {
    if c {
        *v = -*v;
    }
}

/// Sorts the singular values in descending order and adjusts the corresponding singular vectors accordingly
///
/// Every swap is paired with a negation so that `v` keeps its determinant and
/// the product `b * v^T` is left unchanged.
#[inline(always)]
pub fn sort_singular_values(b: &mut DMat3, v: &mut DMat3) {
    let mut rho1 = b.x_axis.length_squared();
    let mut rho2 = b.y_axis.length_squared();
    let mut rho3 = b.z_axis.length_squared();

    // First comparison (rho1, rho2)
    let c1 = rho1 < rho2;
    cond_swap(c1, &mut rho1, &mut rho2);
    cond_swap(c1, &mut b.x_axis, &mut b.y_axis);
    cond_swap(c1, &mut v.x_axis, &mut v.y_axis);
    cond_negate_vec3(c1, &mut b.y_axis);
    cond_negate_vec3(c1, &mut v.y_axis);

    // Second comparison (rho1, rho3)
    let c2 = rho1 < rho3;
    cond_swap(c2, &mut rho1, &mut rho3);
    cond_swap(c2, &mut b.x_axis, &mut b.z_axis);
    cond_swap(c2, &mut v.x_axis, &mut v.z_axis);
    cond_negate_vec3(c2, &mut b.z_axis);
    cond_negate_vec3(c2, &mut v.z_axis);

    // Third comparison (rho2, rho3)
    let c3 = rho2 < rho3;
    cond_swap(c3, &mut b.y_axis, &mut b.z_axis);
    cond_swap(c3, &mut v.y_axis, &mut v.z_axis);
    cond_negate_vec3(c3, &mut b.z_axis);
    cond_negate_vec3(c3, &mut v.z_axis);
}

/// Givens rotation mapping (a1, a2) onto (hypot(a1, a2), 0).
#[inline(always)]
fn qr_givens_parameters(a1: f64, a2: f64) -> Givens {
    let rho = a1.hypot(a2);
    if rho <= f64::MIN_POSITIVE {
        return Givens::IDENTITY;
    }
    Givens {
        cos_theta: a1 / rho,
        sin_theta: a2 / rho,
    }
}

/// Applies the rotation to rows `p` and `q` of `b` (b <- G * b) and accumulates q <- q * G^T.
#[inline(always)]
fn apply_givens(b: &mut DMat3, q: &mut DMat3, p: usize, r: usize, g: &Givens) {
    let (c, s) = (g.cos_theta, g.sin_theta);
    for col in 0..3 {
        let column = b.col_mut(col);
        let b_p = column[p];
        let b_r = column[r];
        column[p] = c * b_p + s * b_r;
        column[r] = -s * b_p + c * b_r;
    }
    let q_p = q.col(p);
    let q_r = q.col(r);
    *q.col_mut(p) = c * q_p + s * q_r;
    *q.col_mut(r) = -s * q_p + c * q_r;
}

/// Implements a QR decomposition of a Matrix using Givens rotations
fn qr_decomposition(mut b_mat: DMat3) -> QR3 {
    let mut q = DMat3::IDENTITY;

    // zero out b[1][0] (rows 0 and 1)
    let g1 = qr_givens_parameters(b_mat.x_axis.x, b_mat.x_axis.y);
    apply_givens(&mut b_mat, &mut q, 0, 1, &g1);

    // zero out b[2][0] (rows 0 and 2)
    let g2 = qr_givens_parameters(b_mat.x_axis.x, b_mat.x_axis.z);
    apply_givens(&mut b_mat, &mut q, 0, 2, &g2);

    // zero out b[2][1] (rows 1 and 2)
    let g3 = qr_givens_parameters(b_mat.y_axis.y, b_mat.y_axis.z);
    apply_givens(&mut b_mat, &mut q, 1, 2, &g3);

    QR3 { q, r: b_mat }
}

/// Computes the singular value decomposition `a = u * s * v^T` of a 3x3 matrix.
///
/// The singular values are returned non-negative and sorted in descending order.
/// Both `u` and `v` are orthonormal; `v` is always a proper rotation while `u`
/// may carry a reflection.
pub fn svd3(a: &DMat3) -> SVD3Set {
    // Rotate the columns of A until they are orthogonal: B = A * V, V being the
    // right singular vectors. A^T * A is never formed so small singular values
    // keep their relative accuracy.
    let (mut b, mut v) = one_sided_jacobi(a);

    // Sort the singular values
    sort_singular_values(&mut b, &mut v);

    // Perform QR decomposition on B to get Q and R
    let qr = qr_decomposition(b);

    let mut u = qr.q;
    let r = qr.r;

    cond_negate_vec3(r.x_axis.x < 0.0, &mut u.x_axis);
    cond_negate_vec3(r.y_axis.y < 0.0, &mut u.y_axis);
    cond_negate_vec3(r.z_axis.z < 0.0, &mut u.z_axis);

    let s = DMat3::from_diagonal(DVec3::new(
        r.x_axis.x.abs(),
        r.y_axis.y.abs(),
        r.z_axis.z.abs(),
    ));

    SVD3Set { u, s, v }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    /// Helper function to validate all critical SVD properties
    fn verify_svd_properties(a: &DMat3, svd: &SVD3Set, epsilon: f64) {
        let u = svd.u;
        let s = svd.s;
        let v = svd.v;

        // Property 1: Reconstruction (A = U * S * V.T)
        let reconstruction = u * s * v.transpose();
        assert!(
            a.abs_diff_eq(reconstruction, epsilon),
            "Reconstruction failed: A != U*S*V.T\nA:\n{}\nReconstruction:\n{}",
            a,
            reconstruction
        );

        // Property 2: U is Orthogonal (U.T * U = I)
        let u_t_u = u.transpose() * u;
        assert!(
            DMat3::IDENTITY.abs_diff_eq(u_t_u, epsilon),
            "U is not orthogonal: U.T*U != I\nU.T*U:\n{}",
            u_t_u
        );

        // Property 3: V is a rotation (V.T * V = I, det(V) = 1)
        let v_t_v = v.transpose() * v;
        assert!(
            DMat3::IDENTITY.abs_diff_eq(v_t_v, epsilon),
            "V is not orthogonal: V.T*V != I\nV.T*V:\n{}",
            v_t_v
        );
        assert!((v.determinant() - 1.0).abs() < epsilon);

        // Property 4: S is non-negative and sorted
        let s_diag = svd.singular_values();
        assert!(
            s_diag.x >= 0.0 && s_diag.y >= 0.0 && s_diag.z >= 0.0,
            "Singular values are not non-negative: {:?}",
            s_diag
        );
        assert!(
            s_diag.x >= s_diag.y - epsilon && s_diag.y >= s_diag.z - epsilon,
            "Singular values are not sorted: {:?}",
            s_diag
        );
    }

    #[test]
    fn test_svd3_diagonal_sorted() {
        let a = DMat3::from_diagonal(DVec3::new(3.0, 2.0, 1.0));
        let svd_result = svd3(&a);
        verify_svd_properties(&a, &svd_result, EPSILON);
        assert!(svd_result
            .singular_values()
            .abs_diff_eq(DVec3::new(3.0, 2.0, 1.0), EPSILON));
    }

    #[test]
    fn test_svd3_diagonal_unsorted() {
        let a = DMat3::from_diagonal(DVec3::new(2.0, 3.0, 1.0));
        let svd_result = svd3(&a);
        verify_svd_properties(&a, &svd_result, EPSILON);
        assert!(svd_result
            .singular_values()
            .abs_diff_eq(DVec3::new(3.0, 2.0, 1.0), EPSILON));
    }

    #[test]
    fn test_svd3_zero() {
        let a = DMat3::ZERO;
        let svd_result = svd3(&a);
        verify_svd_properties(&a, &svd_result, EPSILON);
        assert!(svd_result.s.abs_diff_eq(DMat3::ZERO, EPSILON));
    }

    #[test]
    fn test_svd3_identity() {
        let a = DMat3::IDENTITY;
        let svd_result = svd3(&a);
        verify_svd_properties(&a, &svd_result, EPSILON);
        assert!(svd_result.s.abs_diff_eq(DMat3::IDENTITY, EPSILON));
    }

    #[test]
    fn test_svd3_singular_rank1() {
        let a = DMat3::from_cols(
            DVec3::new(1.0, 2.0, 3.0),
            DVec3::new(2.0, 4.0, 6.0),
            DVec3::new(3.0, 6.0, 9.0),
        );
        let svd_result = svd3(&a);
        verify_svd_properties(&a, &svd_result, 1e-10);

        let s_diag = svd_result.singular_values();
        assert!(s_diag.x > 1.0);
        assert!(s_diag.y.abs() < 1e-10);
        assert!(s_diag.z.abs() < 1e-10);
    }

    #[test]
    fn test_svd3_singular_rank2() {
        let a = DMat3::from_cols(
            DVec3::new(1.0, 2.0, 3.0),
            DVec3::new(4.0, 5.0, 6.0),
            DVec3::new(5.0, 7.0, 9.0), // c0 + c1
        );
        let svd_result = svd3(&a);
        verify_svd_properties(&a, &svd_result, 1e-10);

        let s_diag = svd_result.singular_values();
        assert!(s_diag.x > 1e-3);
        assert!(s_diag.y > 1e-3);
        assert!(s_diag.z.abs() < 1e-10);
    }

    #[test]
    fn test_svd3_rotation_matrix() {
        let a = DMat3::from_rotation_y(std::f64::consts::FRAC_PI_4);
        let svd_result = svd3(&a);
        verify_svd_properties(&a, &svd_result, EPSILON);
        assert!(svd_result.singular_values().abs_diff_eq(DVec3::ONE, EPSILON));
    }

    #[test]
    fn test_svd3_reflection_matrix() {
        let a = DMat3::from_diagonal(DVec3::new(1.0, -1.0, 1.0));
        let svd_result = svd3(&a);
        verify_svd_properties(&a, &svd_result, EPSILON);
        assert!(svd_result.singular_values().abs_diff_eq(DVec3::ONE, EPSILON));
        assert!((svd_result.u.determinant() + 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_svd3_general_full_rank() {
        let a = DMat3::from_cols(
            DVec3::new(1.0, 4.0, 7.0),
            DVec3::new(2.0, 5.0, 8.0),
            DVec3::new(3.0, 6.0, 10.0),
        );
        let svd_result = svd3(&a);
        verify_svd_properties(&a, &svd_result, 1e-10);
        assert!(svd_result.singular_values().min_element() > 1e-3);
    }

    #[test]
    fn test_svd3_graded_singular_vectors() {
        // widely spread singular values, as for the covariance of a thin slab
        let left = DMat3::from_euler(glam::EulerRot::ZYX, 0.3, -1.2, 2.0);
        let right = DMat3::from_euler(glam::EulerRot::XYZ, -0.7, 0.4, 1.1);
        let sigma = DVec3::new(1.0, 1e-4, 1e-8);
        let a = left * DMat3::from_diagonal(sigma) * right.transpose();

        let svd_result = svd3(&a);
        verify_svd_properties(&a, &svd_result, EPSILON);

        let s_diag = svd_result.singular_values();
        assert!((s_diag - sigma).abs().max_element() < 1e-12);

        // the orthogonal factor is well conditioned even though A is not
        let polar = svd_result.u * svd_result.v.transpose();
        assert!(polar.abs_diff_eq(left * right.transpose(), 1e-10));
    }

    #[test]
    fn test_sort_singular_values_keeps_product() {
        let mut b = DMat3::from_cols(
            DVec3::new(0.1, 0.0, 0.0),
            DVec3::new(0.0, 3.0, 0.0),
            DVec3::new(0.0, 0.0, 2.0),
        );
        let mut v = DMat3::from_rotation_z(0.3);
        let product = b * v.transpose();

        sort_singular_values(&mut b, &mut v);

        assert!(b.x_axis.length() >= b.y_axis.length());
        assert!(b.y_axis.length() >= b.z_axis.length());
        assert!((b * v.transpose()).abs_diff_eq(product, EPSILON));
        assert!((v.determinant() - 1.0).abs() < EPSILON);
    }
}
