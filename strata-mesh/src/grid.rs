use crate::errors::Error;
use crate::*;
use serde::{Deserialize, Serialize};

type Result<T> = std::result::Result<T, Error>;

/// Triangulates a regular matrix of positions.
///
/// Cell diagonals alternate in a checkerboard so the triangles stay close to
/// equilateral on square cells and long thin fans are avoided.
pub fn grid_trimesh(rows: &[Vec<Point3>]) -> Result<TriMesh> {
    let nrow = rows.len();
    let ncol = rows.first().map(Vec::len).unwrap_or(0);
    if nrow < 2 || ncol < 2 {
        return Err(Error::GridTooSmall { nrow, ncol });
    }
    if rows.iter().any(|row| row.len() != ncol) {
        return Err(Error::IrregularArray);
    }
    let points: Vec<Point3> = rows.iter().flatten().copied().collect();
    let at = |r: usize, c: usize| r * ncol + c;
    let mut faces = Vec::with_capacity(2 * (nrow - 1) * (ncol - 1));
    for r in 0..nrow - 1 {
        for c in 0..ncol - 1 {
            let (p00, p01) = (at(r, c), at(r, c + 1));
            let (p10, p11) = (at(r + 1, c), at(r + 1, c + 1));
            match (r + c) % 2 == 0 {
                true => {
                    faces.push([p00, p01, p11]);
                    faces.push([p00, p11, p10]);
                }
                false => {
                    faces.push([p00, p01, p10]);
                    faces.push([p01, p11, p10]);
                }
            }
        }
    }
    TriMesh::from_triangles(points, &faces)
}

/// Row and column counts covering `span` at roughly `spacing` steps.
#[inline(always)]
pub fn grid_steps(span: f64, spacing: f64) -> usize {
    usize::max((span / spacing).ceil() as usize, 1) + 1
}

/// A structured grid of z values over a rectangle, row-major from the
/// south-west corner.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridSurface {
    /// z values, `nrow * ncol`, row-major
    pub values: Vec<f64>,
    /// columns
    pub ncol: usize,
    /// rows
    pub nrow: usize,
    /// west edge
    pub xmin: f64,
    /// south edge
    pub ymin: f64,
    /// east edge
    pub xmax: f64,
    /// north edge
    pub ymax: f64,
}

impl GridSurface {
    /// the z value at grid node (row, col)
    #[inline(always)]
    pub fn value(&self, row: usize, col: usize) -> f64 { self.values[row * self.ncol + col] }

    /// the position of grid node (row, col)
    pub fn position(&self, row: usize, col: usize) -> Point3 {
        let x = self.xmin + (self.xmax - self.xmin) * col as f64 / (self.ncol - 1) as f64;
        let y = self.ymin + (self.ymax - self.ymin) * row as f64 / (self.nrow - 1) as f64;
        Point3::new(x, y, self.value(row, col))
    }

    /// Bilinear z at (x, y); `None` outside the grid rectangle.
    pub fn sample(&self, x: f64, y: f64) -> Option<f64> {
        if self.ncol < 2 || self.nrow < 2 {
            return None;
        }
        let u = (x - self.xmin) / (self.xmax - self.xmin) * (self.ncol - 1) as f64;
        let v = (y - self.ymin) / (self.ymax - self.ymin) * (self.nrow - 1) as f64;
        if u < 0.0 || v < 0.0 || u > (self.ncol - 1) as f64 || v > (self.nrow - 1) as f64 {
            return None;
        }
        let c = usize::min(u.floor() as usize, self.ncol - 2);
        let r = usize::min(v.floor() as usize, self.nrow - 2);
        let (fu, fv) = (u - c as f64, v - r as f64);
        let z00 = self.value(r, c);
        let z01 = self.value(r, c + 1);
        let z10 = self.value(r + 1, c);
        let z11 = self.value(r + 1, c + 1);
        Some(z00 * (1.0 - fu) * (1.0 - fv) + z01 * fu * (1.0 - fv) + z10 * (1.0 - fu) * fv + z11 * fu * fv)
    }

    /// Triangulates the grid into an arena mesh.
    pub fn to_trimesh(&self) -> Result<TriMesh> {
        if self.values.len() != self.ncol * self.nrow {
            return Err(Error::IrregularArray);
        }
        if self.ncol < 2 || self.nrow < 2 {
            return Err(Error::GridTooSmall {
                nrow: self.nrow,
                ncol: self.ncol,
            });
        }
        let rows: Vec<Vec<Point3>> = (0..self.nrow)
            .map(|r| (0..self.ncol).map(|c| self.position(r, c)).collect())
            .collect();
        grid_trimesh(&rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_base::assert_near;

    fn flat_grid() -> GridSurface {
        GridSurface {
            values: vec![5.0; 16],
            ncol: 4,
            nrow: 4,
            xmin: 0.0,
            ymin: 0.0,
            xmax: 3.0,
            ymax: 3.0,
        }
    }

    #[test]
    fn grid_triangulation_counts() {
        let mesh = flat_grid().to_trimesh().unwrap();
        assert_eq!(mesh.nodes.len(), 16);
        assert_eq!(mesh.tris.len(), 18);
        // boundary of a 4x4 grid: 3 cells per side, one edge per cell side
        assert_eq!(mesh.boundary_edges().count(), 12);
    }

    #[test]
    fn bilinear_sample() {
        let mut grid = flat_grid();
        grid.values = (0..16).map(|i| (i % 4) as f64).collect(); // z = x
        assert_near!(grid.sample(1.5, 2.0).unwrap(), 1.5);
        assert!(grid.sample(-0.1, 0.0).is_none());
    }

    #[test]
    fn step_counts() {
        assert_eq!(grid_steps(10.0, 1.0), 11);
        assert_eq!(grid_steps(10.5, 1.0), 12);
        assert_eq!(grid_steps(0.2, 1.0), 2);
    }
}
