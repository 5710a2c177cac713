use thiserror::Error;

/// Error types for the point set alignment routines.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AlignError {
    /// The point sets do not have the expected shape.
    #[error("Shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Label of the offending dimension.
        what: &'static str,
        /// Expected size.
        expected: usize,
        /// Size that was provided.
        actual: usize,
    },

    /// Not enough correspondences to estimate a 3D rotation.
    #[error("Alignment requires at least {required} point correspondences, got {actual}")]
    InsufficientPoints {
        /// Minimum number of correspondences required.
        required: usize,
        /// Actual number of correspondences provided.
        actual: usize,
    },

    /// A coordinate is NaN or infinite, or the centroids / cross-covariance overflow.
    #[error("Point sets contain non-finite values or overflow the covariance")]
    NonFiniteInput,

    /// The cross-covariance matrix is rank deficient (collinear or coincident points).
    #[error("Degenerate point configuration: covariance rank {rank}, singular values {singular_values:?}")]
    DegenerateGeometry {
        /// Numeric rank of the cross-covariance matrix.
        rank: usize,
        /// Singular values of the cross-covariance matrix, in descending order.
        singular_values: [f64; 3],
    },
}
