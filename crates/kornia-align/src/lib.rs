#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the alignment routines.
pub mod error;

/// Ordered 3D point sets.
pub mod points;

/// Closed-form rigid and similarity alignment.
pub mod rigid;

/// Module to calculate SVD of a 3x3 matrix
pub mod svd;

/// Rigid and similarity transforms.
pub mod transform;

pub use error::AlignError;
pub use points::PointSet;
pub use rigid::{kabsch, umeyama, RigidAlignParams, RigidAligner};
pub use transform::RigidTransform;
