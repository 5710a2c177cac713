//! Rigid alignment utilities (Kabsch / Umeyama)
//!
//! Estimates the transformation `x -> c * R * x + t` minimizing the mean squared
//! distance between corresponding points of two sets, in closed form from the SVD
//! of their cross-covariance matrix.
//!
//! # Example
//!
//! ```
//! use glam::{DMat3, DVec3};
//! use kornia_align::{PointSet, RigidAligner};
//!
//! let source = PointSet::new(vec![
//!     [0.0, 0.0, 0.0],
//!     [1.0, 0.0, 0.0],
//!     [0.0, 1.0, 0.0],
//!     [0.0, 0.0, 1.0],
//! ]);
//! let rotation = DMat3::from_rotation_z(0.5);
//! let translation = DVec3::new(1.0, -2.0, 0.5);
//! let target = PointSet::from_vec3(
//!     source.iter().map(|p| rotation * *p + translation).collect(),
//! );
//!
//! let transform = RigidAligner::new().estimate(&source, &target).unwrap();
//! assert!(transform.rotation.abs_diff_eq(rotation, 1e-9));
//! assert!(transform.translation.abs_diff_eq(translation, 1e-9));
//! ```
//!
//! # References
//!
//! * Umeyama (1991). "Least-squares estimation of transformation parameters
//!   between two point patterns." IEEE TPAMI 13(4).

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

use crate::error::AlignError;
use crate::points::PointSet;
use crate::svd::svd3;
use crate::transform::RigidTransform;

/// Minimum number of correspondences for a 3D rotation estimate.
pub const MIN_POINTS: usize = 3;

/// Parameters of the rigid aligner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigidAlignParams {
    /// Estimate a uniform scale factor (similarity transform) besides R and t.
    pub estimate_scale: bool,
    /// Singular values below `rank_tolerance * sigma_max` are treated as zero
    /// when estimating the rank of the cross-covariance matrix.
    ///
    /// The tolerance applies to the singular values of H, which scale with the
    /// squared extent of the point set along each principal axis. Only the
    /// second axis decides degeneracy, so the default `1e-10` rejects sets whose
    /// second principal extent is below about `1e-5` times the largest one.
    pub rank_tolerance: f64,
    /// If set, both point sets must contain exactly this many points.
    pub expected_points: Option<usize>,
}

impl Default for RigidAlignParams {
    fn default() -> Self {
        Self {
            estimate_scale: false,
            rank_tolerance: 1e-10,
            expected_points: None,
        }
    }
}

/// Closed-form least-squares aligner of corresponding 3D point sets.
///
/// The aligner is stateless apart from its parameters; a single instance can be
/// shared between threads and reused for any number of calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct RigidAligner {
    params: RigidAlignParams,
}

impl RigidAligner {
    /// Create an aligner estimating a rigid transform with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an aligner with the given parameters.
    pub fn with_params(params: RigidAlignParams) -> Self {
        Self { params }
    }

    /// Get the parameters of the aligner.
    pub fn params(&self) -> &RigidAlignParams {
        &self.params
    }

    /// Estimate the transformation mapping `source` onto `target`.
    ///
    /// # Arguments
    ///
    /// * `source` - The source points with shape (N, 3).
    /// * `target` - The target points with shape (N, 3), `target[i]` corresponding to `source[i]`.
    ///
    /// # Returns
    ///
    /// The transform minimizing `Σ‖c * R * source_i + t - target_i‖²`, with
    /// `c == 1.0` unless scale estimation is enabled.
    ///
    /// # Errors
    ///
    /// * [`AlignError::ShapeMismatch`] if the sets differ in length or do not
    ///   match the expected point count.
    /// * [`AlignError::InsufficientPoints`] if fewer than 3 points are given.
    /// * [`AlignError::NonFiniteInput`] if a coordinate is NaN or infinite, or the
    ///   covariance overflows.
    /// * [`AlignError::DegenerateGeometry`] if the points are collinear or coincident.
    pub fn estimate(
        &self,
        source: &PointSet,
        target: &PointSet,
    ) -> Result<RigidTransform, AlignError> {
        self.check_shapes(source.len(), target.len())?;
        let n = source.len() as f64;

        // 1. compute centroids
        let mean_source = source.centroid();
        let mean_target = target.centroid();

        // 2. compute covariance matrix H = 1/N Σ (dst_i - mu_d) * (src_i - mu_s)^T
        let mut h = DMat3::ZERO;
        let mut source_variance = 0.0;
        for (p_src, p_dst) in source.iter().zip(target.iter()) {
            let sc = *p_src - mean_source;
            let dc = *p_dst - mean_target;
            // H[row][col] += dst[row] * src[col]
            h += DMat3::from_cols(dc * sc.x, dc * sc.y, dc * sc.z);
            source_variance += sc.length_squared();
        }
        h *= 1.0 / n;
        source_variance /= n;

        if !(mean_source.is_finite()
            && mean_target.is_finite()
            && h.is_finite()
            && source_variance.is_finite())
        {
            return Err(AlignError::NonFiniteInput);
        }

        // 3. decompose H = U * D * V^T
        let svd = svd3(&h);
        let singular_values = svd.singular_values();
        let rank = numeric_rank(singular_values, self.params.rank_tolerance);
        log::debug!(
            "rigid alignment: n = {}, singular values = {:?}, rank = {}",
            source.len(),
            singular_values,
            rank
        );

        // with rank 2 the third singular direction is fixed by orthogonality,
        // below that the rotation is not unique
        if rank < 2 {
            log::debug!("rigid alignment: degenerate point configuration, rank {rank}");
            return Err(AlignError::DegenerateGeometry {
                rank,
                singular_values: singular_values.to_array(),
            });
        }

        // 4. R = U * diag(1, 1, s) * V^T, with s flipping a reflection into a rotation
        let u = *svd.u();
        let v = *svd.v();
        let reflection = u.determinant() * v.determinant() < 0.0;
        let correction = DVec3::new(1.0, 1.0, if reflection { -1.0 } else { 1.0 });
        let rotation = u * DMat3::from_diagonal(correction) * v.transpose();

        // 5. c = tr(D * S) / var(src)
        let scale = if self.params.estimate_scale {
            singular_values.dot(correction) / source_variance
        } else {
            1.0
        };

        // 6. t = mu_d - c * R * mu_s
        let translation = if self.params.estimate_scale {
            mean_target - scale * (rotation * mean_source)
        } else {
            mean_target - rotation * mean_source
        };

        Ok(RigidTransform {
            rotation,
            translation,
            scale,
        })
    }

    /// Same as [`RigidAligner::estimate`] on slices of `[x, y, z]` points.
    pub fn estimate_slices(
        &self,
        source: &[[f64; 3]],
        target: &[[f64; 3]],
    ) -> Result<RigidTransform, AlignError> {
        self.estimate(&PointSet::from(source), &PointSet::from(target))
    }

    fn check_shapes(&self, num_source: usize, num_target: usize) -> Result<(), AlignError> {
        if num_source != num_target {
            return Err(AlignError::ShapeMismatch {
                what: "target points",
                expected: num_source,
                actual: num_target,
            });
        }
        if let Some(expected) = self.params.expected_points {
            if num_source != expected {
                return Err(AlignError::ShapeMismatch {
                    what: "number of points",
                    expected,
                    actual: num_source,
                });
            }
        }
        if num_source < MIN_POINTS {
            return Err(AlignError::InsufficientPoints {
                required: MIN_POINTS,
                actual: num_source,
            });
        }
        Ok(())
    }
}

/// Number of singular values above `tolerance * sigma_max`.
///
/// Non-finite or all-zero singular values give rank 0.
fn numeric_rank(singular_values: DVec3, tolerance: f64) -> usize {
    if !singular_values.is_finite() {
        return 0;
    }
    let sigma_max = singular_values.max_element();
    if sigma_max <= 0.0 {
        return 0;
    }
    let threshold = tolerance * sigma_max;
    singular_values
        .to_array()
        .iter()
        .filter(|&&sigma| sigma > threshold)
        .count()
}

/// Kabsch algorithm: least-squares rigid transform (rotation and translation).
///
/// Returns a [`RigidTransform`] with `scale == 1.0`.
pub fn kabsch(src: &[[f64; 3]], dst: &[[f64; 3]]) -> Result<RigidTransform, AlignError> {
    RigidAligner::new().estimate_slices(src, dst)
}

/// Umeyama algorithm: least-squares similarity transform (scale, rotation and translation).
pub fn umeyama(src: &[[f64; 3]], dst: &[[f64; 3]]) -> Result<RigidTransform, AlignError> {
    RigidAligner::with_params(RigidAlignParams {
        estimate_scale: true,
        ..Default::default()
    })
    .estimate_slices(src, dst)
}
