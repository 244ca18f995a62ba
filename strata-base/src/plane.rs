use crate::cgmath64::*;
use crate::tolerance::*;
use serde::{Deserialize, Serialize};

/// A best-fit plane through `origin` with unit `normal`.
///
/// Near-vertical surfaces are triangulated in the frame of their baseline:
/// [`Baseline::to_frame`] rotates the plane normal onto +z so the surface
/// becomes nearly horizontal, and [`Baseline::from_frame`] undoes the
/// rotation exactly. Both are pure functions of the baseline; no process
/// state is involved.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    /// unit normal of the plane
    pub normal: Vector3,
    /// a point on the plane, used as the rotation center
    pub origin: Point3,
}

impl Baseline {
    /// Creates a baseline, normalizing `normal`.
    #[inline(always)]
    pub fn new(normal: Vector3, origin: Point3) -> Baseline {
        Baseline {
            normal: normal.normalize(),
            origin,
        }
    }

    /// the horizontal plane through `origin`
    #[inline(always)]
    pub fn horizontal(origin: Point3) -> Baseline {
        Baseline {
            normal: Vector3::unit_z(),
            origin,
        }
    }

    /// Whether triangulating in this frame differs from triangulating in xy.
    ///
    /// A surface whose normal is within 45 degrees of vertical projects well
    /// enough onto xy that no rotation is needed.
    #[inline(always)]
    pub fn is_steep(&self) -> bool { self.normal.z.abs() < std::f64::consts::FRAC_1_SQRT_2 }

    #[inline(always)]
    fn rotation(&self) -> Matrix3 {
        Matrix3::from(Quaternion::from_arc(self.normal, Vector3::unit_z(), None))
    }

    /// Rotates `pt` into the plane-local frame.
    ///
    /// In the frame the plane lies in z = 0 through the (unmoved) origin, so
    /// x and y are in-plane coordinates and z is the offset from the plane.
    #[inline(always)]
    pub fn to_frame(&self, pt: Point3) -> Point3 { self.origin + self.rotation() * (pt - self.origin) }

    /// Inverse of [`Baseline::to_frame`].
    #[inline(always)]
    pub fn from_frame(&self, pt: Point3) -> Point3 {
        self.origin + self.rotation().transpose() * (pt - self.origin)
    }
}

/// Best-fit plane of a point set by principal component analysis.
///
/// The normal is the eigenvector of the covariance matrix with the smallest
/// eigenvalue; the origin is the centroid. Returns `None` for fewer than
/// three points or a degenerate (collinear) set.
pub fn fit_plane(points: impl IntoIterator<Item = Point3>) -> Option<Baseline> {
    let points: Vec<Point3> = points.into_iter().collect();
    if points.len() < 3 {
        return None;
    }
    let center = points
        .iter()
        .fold(Vector3::zero(), |sum, pt| sum + pt.to_vec())
        / points.len() as f64;
    let center = Point3::origin() + center;
    let mut cov = [[0.0; 3]; 3];
    for pt in &points {
        let d = pt - center;
        let d = [d.x, d.y, d.z];
        for (i, di) in d.iter().enumerate() {
            for (j, dj) in d.iter().enumerate() {
                cov[i][j] += di * dj;
            }
        }
    }
    let (eigenvalues, eigenvectors) = jacobi_eigen(cov);
    let mut smallest = 0;
    let mut largest = 0;
    for i in 1..3 {
        if eigenvalues[i] < eigenvalues[smallest] {
            smallest = i;
        }
        if eigenvalues[i] > eigenvalues[largest] {
            largest = i;
        }
    }
    // Collinear sets have two vanishing eigenvalues.
    let scale = eigenvalues[largest];
    if scale.so_small() {
        return None;
    }
    let mid = match smallest == largest {
        true => 1,
        false => 3 - smallest - largest,
    };
    if (eigenvalues[mid] / scale).so_small() {
        return None;
    }
    let n = eigenvectors[smallest];
    let normal = Vector3::new(n[0], n[1], n[2]);
    if normal.so_small() {
        return None;
    }
    // Orient the normal upward so frames are reproducible.
    let normal = match normal.z < 0.0 {
        true => -normal,
        false => normal,
    };
    Some(Baseline::new(normal, center))
}

/// Eigen decomposition of a symmetric 3x3 matrix by cyclic Jacobi rotations.
///
/// Returns eigenvalues and the matching (row) eigenvectors. The sweep count
/// is fixed; convergence for 3x3 symmetric input is far faster than that.
fn jacobi_eigen(mut a: [[f64; 3]; 3]) -> ([f64; 3], [[f64; 3]; 3]) {
    let mut v = [[0.0; 3]; 3];
    for (i, row) in v.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    for _ in 0..32 {
        let off = a[0][1] * a[0][1] + a[0][2] * a[0][2] + a[1][2] * a[1][2];
        if off <= f64::EPSILON * (a[0][0] * a[0][0] + a[1][1] * a[1][1] + a[2][2] * a[2][2] + 1.0) {
            break;
        }
        for p in 0..2 {
            for q in (p + 1)..3 {
                if a[p][q] == 0.0 {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = theta.signum() / (theta.abs() + f64::sqrt(theta * theta + 1.0));
                let c = 1.0 / f64::sqrt(t * t + 1.0);
                let s = t * c;
                for k in 0..3 {
                    let akp = a[k][p];
                    let akq = a[k][q];
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..3 {
                    let apk = a[p][k];
                    let aqk = a[q][k];
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in v.iter_mut() {
                    let vkp = row[p];
                    let vkq = row[q];
                    row[p] = c * vkp - s * vkq;
                    row[q] = s * vkp + c * vkq;
                }
            }
        }
    }
    (
        [a[0][0], a[1][1], a[2][2]],
        [
            [v[0][0], v[1][0], v[2][0]],
            [v[0][1], v[1][1], v[2][1]],
            [v[0][2], v[1][2], v[2][2]],
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_near;

    #[test]
    fn frame_round_trip() {
        let baseline = Baseline::new(Vector3::new(0.3, -0.8, 0.1), Point3::new(4.0, 5.0, -2.0));
        let pt = Point3::new(1.5, -0.25, 8.0);
        assert_near!(baseline.from_frame(baseline.to_frame(pt)), pt);
    }

    #[test]
    fn frame_flattens_plane() {
        // points on the plane x = 2 rotate into constant frame z
        let baseline = Baseline::new(Vector3::unit_x(), Point3::new(2.0, 0.0, 0.0));
        let a = baseline.to_frame(Point3::new(2.0, 3.0, -1.0));
        let b = baseline.to_frame(Point3::new(2.0, -7.0, 4.0));
        assert_near!(a.z, b.z);
    }

    #[test]
    fn fit_plane_of_tilted_points() {
        // z = 2x - y + 3, normal proportional to (-2, 1, 1)
        let points = (0..25).map(|i| {
            let x = (i % 5) as f64;
            let y = (i / 5) as f64;
            Point3::new(x, y, 2.0 * x - y + 3.0)
        });
        let baseline = fit_plane(points).unwrap();
        let expected = Vector3::new(-2.0, 1.0, 1.0).normalize();
        assert_near!(baseline.normal.dot(expected).abs(), 1.0);
    }

    #[test]
    fn fit_plane_rejects_collinear() {
        let points = (0..10).map(|i| Point3::new(i as f64, 2.0 * i as f64, 0.5 * i as f64));
        assert!(fit_plane(points).is_none());
    }

    #[test]
    fn steep_vs_flat() {
        let wall = Baseline::new(Vector3::unit_y(), Point3::origin());
        let floor = Baseline::horizontal(Point3::origin());
        assert!(wall.is_steep());
        assert!(!floor.is_steep());
    }
}
