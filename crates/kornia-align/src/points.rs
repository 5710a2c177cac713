use glam::DVec3;

use crate::error::AlignError;

/// Number of coordinates per point.
pub const POINT_DIM: usize = 3;

/// An ordered set of 3D points.
///
/// Two point sets passed to the aligner correspond by index: row `i` of the
/// source set is matched with row `i` of the target set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    // The points, one per row.
    points: Vec<DVec3>,
}

impl PointSet {
    /// Create a new point set from an array of points.
    pub fn new(points: Vec<[f64; 3]>) -> Self {
        Self {
            points: points.into_iter().map(DVec3::from_array).collect(),
        }
    }

    /// Create a new point set from glam vectors.
    pub fn from_vec3(points: Vec<DVec3>) -> Self {
        Self { points }
    }

    /// Create a point set from rows of coordinates.
    ///
    /// Every row must have exactly three coordinates, otherwise
    /// [`AlignError::ShapeMismatch`] is returned.
    ///
    /// Example:
    ///
    /// ```
    /// use kornia_align::PointSet;
    ///
    /// let rows = vec![vec![0.0, 0.0, 0.0], vec![1.0, 0.0, 0.0]];
    /// let points = PointSet::from_rows(&rows).unwrap();
    /// assert_eq!(points.len(), 2);
    ///
    /// let bad = vec![vec![0.0, 0.0]];
    /// assert!(PointSet::from_rows(&bad).is_err());
    /// ```
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, AlignError> {
        let points = rows
            .iter()
            .map(|row| match row.as_ref() {
                &[x, y, z] => Ok(DVec3::new(x, y, z)),
                other => Err(AlignError::ShapeMismatch {
                    what: "coordinates per point",
                    expected: POINT_DIM,
                    actual: other.len(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { points })
    }

    /// Create a point set from a row-major `nrows x ncols` buffer.
    ///
    /// PRECONDITION: `ncols == 3` and `data.len() == nrows * ncols`.
    pub fn from_row_major_slice(
        data: &[f64],
        nrows: usize,
        ncols: usize,
    ) -> Result<Self, AlignError> {
        if ncols != POINT_DIM {
            return Err(AlignError::ShapeMismatch {
                what: "coordinates per point",
                expected: POINT_DIM,
                actual: ncols,
            });
        }
        if data.len() != nrows * ncols {
            return Err(AlignError::ShapeMismatch {
                what: "buffer length",
                expected: nrows * ncols,
                actual: data.len(),
            });
        }
        let points = data
            .chunks_exact(POINT_DIM)
            .map(DVec3::from_slice)
            .collect();
        Ok(Self { points })
    }

    /// Get the number of points in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the set.
    pub fn points(&self) -> &[DVec3] {
        &self.points
    }

    /// Iterate over the points in order.
    pub fn iter(&self) -> std::slice::Iter<'_, DVec3> {
        self.points.iter()
    }

    /// Arithmetic mean of the points. Returns zero for an empty set.
    pub fn centroid(&self) -> DVec3 {
        if self.points.is_empty() {
            return DVec3::ZERO;
        }
        let sum = self.points.iter().fold(DVec3::ZERO, |acc, p| acc + *p);
        sum / self.points.len() as f64
    }
}

impl From<Vec<[f64; 3]>> for PointSet {
    fn from(points: Vec<[f64; 3]>) -> Self {
        Self::new(points)
    }
}

impl From<&[[f64; 3]]> for PointSet {
    fn from(points: &[[f64; 3]]) -> Self {
        Self {
            points: points.iter().copied().map(DVec3::from_array).collect(),
        }
    }
}

impl From<Vec<DVec3>> for PointSet {
    fn from(points: Vec<DVec3>) -> Self {
        Self::from_vec3(points)
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a DVec3;
    type IntoIter = std::slice::Iter<'a, DVec3>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
