use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

use crate::error::AlignError;
use crate::points::PointSet;

/// A rigid (or similarity) transformation of 3D space.
///
/// Maps a point `x` to `scale * rotation * x + translation`. For rigid
/// transforms the scale is exactly `1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    /// Rotation matrix, orthonormal with determinant +1.
    pub rotation: DMat3,
    /// Translation vector.
    pub translation: DVec3,
    /// Uniform scale factor.
    pub scale: f64,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RigidTransform {
    /// The identity transformation.
    pub const IDENTITY: Self = Self {
        rotation: DMat3::IDENTITY,
        translation: DVec3::ZERO,
        scale: 1.0,
    };

    /// Create a rigid transform (unit scale) from a rotation and a translation.
    pub fn new(rotation: DMat3, translation: DVec3) -> Self {
        Self {
            rotation,
            translation,
            scale: 1.0,
        }
    }

    /// Create a similarity transform from a scale, a rotation and a translation.
    pub fn with_scale(scale: f64, rotation: DMat3, translation: DVec3) -> Self {
        Self {
            rotation,
            translation,
            scale,
        }
    }

    /// Transform a single point.
    #[inline]
    pub fn apply(&self, point: DVec3) -> DVec3 {
        self.scale * (self.rotation * point) + self.translation
    }

    /// Transform a set of points.
    ///
    /// PRECONDITION: dst_points is a pre-allocated buffer of the same size as src_points.
    pub fn transform_points(
        &self,
        src_points: &[DVec3],
        dst_points: &mut [DVec3],
    ) -> Result<(), AlignError> {
        if src_points.len() != dst_points.len() {
            return Err(AlignError::ShapeMismatch {
                what: "destination points",
                expected: src_points.len(),
                actual: dst_points.len(),
            });
        }
        for (src, dst) in src_points.iter().zip(dst_points.iter_mut()) {
            *dst = self.apply(*src);
        }
        Ok(())
    }

    /// Inverse transformation, such that `self.inverse().apply(self.apply(x)) == x`.
    ///
    /// PRECONDITION: scale is non-zero.
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.transpose();
        let scale = self.scale.recip();
        Self {
            rotation,
            translation: -scale * (rotation * self.translation),
            scale,
        }
    }

    /// Compose two transforms. The result applies `other` first, then `self`.
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            rotation: self.rotation * other.rotation,
            translation: self.scale * (self.rotation * other.translation) + self.translation,
            scale: self.scale * other.scale,
        }
    }

    /// Mean squared residual `1/N Σ‖T(source_i) - target_i‖²` over corresponding points.
    pub fn mean_squared_error(
        &self,
        source: &PointSet,
        target: &PointSet,
    ) -> Result<f64, AlignError> {
        if source.len() != target.len() {
            return Err(AlignError::ShapeMismatch {
                what: "target points",
                expected: source.len(),
                actual: target.len(),
            });
        }
        if source.is_empty() {
            return Err(AlignError::InsufficientPoints {
                required: 1,
                actual: 0,
            });
        }
        let sum_sq = source
            .iter()
            .zip(target.iter())
            .map(|(src, dst)| (self.apply(*src) - *dst).length_squared())
            .sum::<f64>();
        Ok(sum_sq / source.len() as f64)
    }

    /// Rotation as a row-major 3x3 array.
    pub fn rotation_array(&self) -> [[f64; 3]; 3] {
        [
            self.rotation.row(0).to_array(),
            self.rotation.row(1).to_array(),
            self.rotation.row(2).to_array(),
        ]
    }

    /// Translation as an array.
    pub fn translation_array(&self) -> [f64; 3] {
        self.translation.to_array()
    }
}
