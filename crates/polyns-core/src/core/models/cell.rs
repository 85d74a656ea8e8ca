use nalgebra::{Matrix3, Point3, Vector3};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CellError {
    #[error("Cell matrix is degenerate: {reason}")]
    Degenerate { reason: &'static str },
}

/// A periodic simulation cell whose lattice vectors are stored as matrix rows.
///
/// The cell matrix must remain non-singular; shape-constrained moves are
/// responsible for keeping the aspect ratio and cell-vector angles above their
/// configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationCell {
    matrix: Matrix3<f64>,
}

impl SimulationCell {
    pub fn new(matrix: Matrix3<f64>) -> Result<Self, CellError> {
        let det = matrix.determinant();
        if !det.is_finite() || det == 0.0 {
            return Err(CellError::Degenerate {
                reason: "zero or non-finite determinant",
            });
        }
        Ok(Self { matrix })
    }

    /// An axis-aligned cubic cell with the given edge length.
    pub fn cubic(edge: f64) -> Result<Self, CellError> {
        Self::new(Matrix3::identity() * edge)
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Lattice vector `i` (row `i` of the cell matrix) as a column vector.
    pub fn row_vec(&self, i: usize) -> Vector3<f64> {
        self.matrix.row(i).transpose()
    }

    pub fn volume(&self) -> f64 {
        self.matrix.determinant().abs()
    }

    /// Adds `delta` to the cell matrix. The caller is responsible for remapping
    /// the contents and validating the resulting shape.
    pub fn apply_delta(&mut self, delta: &Matrix3<f64>) {
        self.matrix += delta;
    }

    /// Scales every lattice vector by `factor` (isotropic resize).
    pub fn scale(&mut self, factor: f64) {
        self.matrix *= factor;
    }

    /// Shortest perpendicular distance between any pair of opposite faces,
    /// normalized so a cell of unit volume has ratios on the order of one.
    ///
    /// A degenerate cell reports 0.0, which fails every aspect-ratio gate.
    pub fn min_aspect_ratio(&self) -> f64 {
        let vol = self.volume();
        if vol <= 0.0 || !vol.is_finite() {
            return 0.0;
        }
        let mut min_dist = f64::MAX;
        for i in 0..3 {
            let vi = self.row_vec(i);
            let normal = self.row_vec((i + 1) % 3).cross(&self.row_vec((i + 2) % 3));
            let norm = normal.norm();
            if norm <= f64::EPSILON {
                return 0.0;
            }
            min_dist = min_dist.min((normal / norm).dot(&vi).abs());
        }
        min_dist / vol.cbrt()
    }

    /// Minimum angle (radians) between any two lattice vectors, folded into
    /// [0, pi/2] by taking |cos|. A degenerate cell reports 0.0.
    pub fn min_angle(&self) -> f64 {
        let mut min_angle = f64::MAX;
        for i in 0..3 {
            let v1 = self.row_vec((i + 1) % 3);
            let v2 = self.row_vec((i + 2) % 3);
            let denom = (v1.norm_squared() * v2.norm_squared()).sqrt();
            if denom <= f64::EPSILON {
                return 0.0;
            }
            let cos = (v1.dot(&v2) / denom).abs().min(1.0);
            min_angle = min_angle.min(cos.acos());
        }
        min_angle
    }

    /// Gram-Schmidt orthonormalization of the two lattice vectors other than
    /// row `keep`, used by the shear move to build a perturbation plane.
    ///
    /// A near-parallel or near-zero pair produces non-finite components, which
    /// indicates an invalid geometric state and is surfaced as a fatal error.
    pub fn orthonormal_pair(&self, keep: usize) -> Result<(Vector3<f64>, Vector3<f64>), CellError> {
        let others: Vec<usize> = (0..3).filter(|&i| i != keep).collect();
        let mut v1 = self.row_vec(others[0]);
        let mut v2 = self.row_vec(others[1]);

        v1 /= v1.norm();
        v2 -= v1 * v1.dot(&v2);
        v2 /= v2.norm();

        if !(v1.iter().all(|c| c.is_finite()) && v2.iter().all(|c| c.is_finite())) {
            return Err(CellError::Degenerate {
                reason: "non-finite orthonormal basis",
            });
        }
        Ok((v1, v2))
    }

    /// Fractional coordinates of `p` (row-vector convention: p = H^T s).
    pub fn to_fractional(&self, p: &Point3<f64>) -> Result<Vector3<f64>, CellError> {
        let inv = self
            .matrix
            .transpose()
            .try_inverse()
            .ok_or(CellError::Degenerate {
                reason: "non-invertible cell matrix",
            })?;
        Ok(inv * p.coords)
    }

    /// Cartesian position of the fractional coordinates `s`.
    pub fn to_cartesian(&self, s: &Vector3<f64>) -> Point3<f64> {
        Point3::from(self.matrix.transpose() * s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn cubic_cell_volume_is_edge_cubed() {
        let cell = SimulationCell::cubic(4.0).unwrap();
        assert!(f64_approx_equal(cell.volume(), 64.0));
    }

    #[test]
    fn singular_matrix_is_rejected() {
        let result = SimulationCell::new(Matrix3::zeros());
        assert!(matches!(result, Err(CellError::Degenerate { .. })));
    }

    #[test]
    fn cubic_cell_has_unit_aspect_ratio_and_right_angles() {
        let cell = SimulationCell::cubic(7.5).unwrap();
        assert!(f64_approx_equal(cell.min_aspect_ratio(), 1.0));
        assert!(f64_approx_equal(cell.min_angle(), std::f64::consts::FRAC_PI_2));
    }

    #[test]
    fn sheared_cell_has_lower_aspect_ratio_and_angle() {
        let mut matrix = Matrix3::identity() * 5.0;
        matrix[(0, 1)] = 4.0;
        let cell = SimulationCell::new(matrix).unwrap();
        assert!(cell.min_aspect_ratio() < 1.0);
        assert!(cell.min_angle() < std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn fractional_cartesian_round_trip() {
        let mut matrix = Matrix3::identity() * 6.0;
        matrix[(1, 0)] = 1.5;
        matrix[(2, 1)] = -0.5;
        let cell = SimulationCell::new(matrix).unwrap();

        let p = Point3::new(1.2, -3.4, 5.6);
        let s = cell.to_fractional(&p).unwrap();
        let back = cell.to_cartesian(&s);
        assert!((back - p).norm() < 1e-10);
    }

    #[test]
    fn orthonormal_pair_is_orthonormal() {
        let mut matrix = Matrix3::identity() * 5.0;
        matrix[(1, 0)] = 2.0;
        let cell = SimulationCell::new(matrix).unwrap();

        let (v1, v2) = cell.orthonormal_pair(2).unwrap();
        assert!(f64_approx_equal(v1.norm(), 1.0));
        assert!(f64_approx_equal(v2.norm(), 1.0));
        assert!(v1.dot(&v2).abs() < 1e-10);
    }

    #[test]
    fn orthonormal_pair_of_parallel_vectors_is_fatal() {
        let matrix = Matrix3::from_rows(&[
            nalgebra::RowVector3::new(1.0, 0.0, 0.0),
            nalgebra::RowVector3::new(2.0, 0.0, 0.0),
            nalgebra::RowVector3::new(0.0, 0.0, 1.0),
        ]);
        let cell = SimulationCell { matrix };
        assert!(cell.orthonormal_pair(2).is_err());
    }

    #[test]
    fn apply_delta_is_additive() {
        let mut cell = SimulationCell::cubic(3.0).unwrap();
        let mut delta = Matrix3::zeros();
        delta[(0, 1)] = 0.25;
        cell.apply_delta(&delta);
        assert!(f64_approx_equal(cell.matrix()[(0, 1)], 0.25));
        assert!(f64_approx_equal(cell.matrix()[(0, 0)], 3.0));
    }
}
