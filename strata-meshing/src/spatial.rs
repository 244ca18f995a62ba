use crate::*;
use array_macro::array;

/// An entry of the 3-D triangle index: which mesh, which triangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpatialTriangle {
    /// id of the owning mesh, as registered by the caller
    pub mesh_id: usize,
    /// triangle index within the owning mesh
    pub tri_id: usize,
}

/// Bucketed 3-D grid over a box, storing triangles in every cell their
/// bounding box overlaps.
#[derive(Clone, Debug)]
pub struct TriangleIndex3d {
    cells: Vec<Vec<SpatialTriangle>>,
    size: [usize; 3],
    min: Point3,
    max: Point3,
}

const MAX_CELLS_PER_AXIS: usize = 400;

impl TriangleIndex3d {
    /// Creates an index over `bounds` with roughly `spacing` sized cells in
    /// each axis.
    pub fn new(bounds: BoundingBox<Point3>, spacing: [f64; 3]) -> TriangleIndex3d {
        let diag = bounds.diagonal();
        let size = array![i => {
            let span = f64::max(diag[i], 0.0);
            match spacing[i] > 0.0 {
                true => usize::clamp((span / spacing[i]).ceil() as usize, 1, MAX_CELLS_PER_AXIS),
                false => 1,
            }
        }; 3];
        TriangleIndex3d {
            cells: vec![Vec::new(); size[0] * size[1] * size[2]],
            size,
            min: bounds.min(),
            max: bounds.max(),
        }
    }

    fn cell_coord(&self, pt: Point3) -> [usize; 3] {
        array![i => {
            let span = self.max[i] - self.min[i];
            let x = match span > 0.0 {
                true => (pt[i] - self.min[i]) / span,
                false => 0.0,
            };
            f64::clamp(x * self.size[i] as f64, 0.0, self.size[i] as f64 - 1.0) as usize
        }; 3]
    }

    #[inline(always)]
    fn cell(&mut self, c: [usize; 3]) -> &mut Vec<SpatialTriangle> {
        &mut self.cells[(c[0] * self.size[1] + c[1]) * self.size[2] + c[2]]
    }

    /// Inserts one triangle covering `bdb`.
    pub fn insert(&mut self, mesh_id: usize, tri_id: usize, bdb: &BoundingBox<Point3>) {
        let lo = self.cell_coord(bdb.min());
        let hi = self.cell_coord(bdb.max());
        let entry = SpatialTriangle { mesh_id, tri_id };
        for ix in lo[0]..=hi[0] {
            for iy in lo[1]..=hi[1] {
                for iz in lo[2]..=hi[2] {
                    self.cell([ix, iy, iz]).push(entry);
                }
            }
        }
    }

    /// Inserts every live triangle of `mesh` under `mesh_id`.
    pub fn insert_mesh(&mut self, mesh_id: usize, mesh: &TriMesh) {
        let tris: Vec<usize> = mesh.live_tris().collect();
        for t in tris {
            self.insert(mesh_id, t, &mesh.tri_aabb(t));
        }
    }

    /// All distinct triangles whose cells overlap `bdb`, in (mesh, triangle)
    /// order so queries are reproducible.
    pub fn query(&self, bdb: &BoundingBox<Point3>) -> Vec<SpatialTriangle> {
        let lo = self.cell_coord(bdb.min());
        let hi = self.cell_coord(bdb.max());
        let mut out = Vec::new();
        for ix in lo[0]..=hi[0] {
            for iy in lo[1]..=hi[1] {
                for iz in lo[2]..=hi[2] {
                    out.extend_from_slice(
                        &self.cells[(ix * self.size[1] + iy) * self.size[2] + iz],
                    );
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }
}

/// 2-D bucket grid answering nearest-point queries under a cutoff.
#[derive(Clone, Debug)]
pub struct NodeIndex2d {
    cells: Vec<Vec<usize>>,
    points: Vec<Point2>,
    size: [usize; 2],
    min: Point2,
    max: Point2,
}

impl NodeIndex2d {
    /// Creates an index over `bounds` with roughly `target_cells` buckets.
    pub fn new(bounds: BoundingBox<Point2>, target_cells: usize) -> NodeIndex2d {
        let per_axis = f64::sqrt(usize::max(target_cells, 1) as f64).ceil() as usize;
        let per_axis = usize::clamp(per_axis, 1, MAX_CELLS_PER_AXIS);
        NodeIndex2d {
            cells: vec![Vec::new(); per_axis * per_axis],
            points: Vec::new(),
            size: [per_axis, per_axis],
            min: bounds.min(),
            max: bounds.max(),
        }
    }

    fn cell_coord(&self, pt: Point2) -> [usize; 2] {
        array![i => {
            let span = self.max[i] - self.min[i];
            let x = match span > 0.0 {
                true => (pt[i] - self.min[i]) / span,
                false => 0.0,
            };
            f64::clamp(x * self.size[i] as f64, 0.0, self.size[i] as f64 - 1.0) as usize
        }; 2]
    }

    /// Adds a point, returning its index.
    pub fn push(&mut self, pt: Point2) -> usize {
        let index = self.points.len();
        self.points.push(pt);
        let c = self.cell_coord(pt);
        self.cells[c[0] * self.size[1] + c[1]].push(index);
        index
    }

    /// the stored point at `index`
    #[inline(always)]
    pub fn point(&self, index: usize) -> Point2 { self.points[index] }

    /// The stored point nearest to `pt` within `cutoff`, with its distance.
    pub fn nearest_within(&self, pt: Point2, cutoff: f64) -> Option<(usize, f64)> {
        let lo = self.cell_coord(Point2::new(pt.x - cutoff, pt.y - cutoff));
        let hi = self.cell_coord(Point2::new(pt.x + cutoff, pt.y + cutoff));
        let mut best: Option<(usize, f64)> = None;
        for ix in lo[0]..=hi[0] {
            for iy in lo[1]..=hi[1] {
                for &i in &self.cells[ix * self.size[1] + iy] {
                    let dist = pt.distance(self.points[i]);
                    if dist <= cutoff {
                        let better = match best {
                            Some((_, d)) => dist < d,
                            None => true,
                        };
                        if better {
                            best = Some((i, dist));
                        }
                    }
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_index_finds_overlaps() {
        let bounds = BoundingBox::from_corners(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 10.0),
        );
        let mut index = TriangleIndex3d::new(bounds, [1.0, 1.0, 1.0]);
        let mesh = TriMesh::from_triangles(
            vec![
                Point3::new(1.0, 1.0, 1.0),
                Point3::new(2.0, 1.0, 1.0),
                Point3::new(1.0, 2.0, 1.0),
                Point3::new(8.0, 8.0, 8.0),
                Point3::new(9.0, 8.0, 8.0),
                Point3::new(8.0, 9.0, 8.0),
            ],
            &[[0, 1, 2], [3, 4, 5]],
        )
        .unwrap();
        index.insert_mesh(7, &mesh);
        let near_origin = index.query(&BoundingBox::from_corners(
            Point3::new(0.5, 0.5, 0.5),
            Point3::new(2.5, 2.5, 1.5),
        ));
        assert_eq!(
            near_origin,
            vec![SpatialTriangle {
                mesh_id: 7,
                tri_id: 0
            }]
        );
        let all = index.query(&bounds);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn query_is_deduplicated() {
        let bounds = BoundingBox::from_corners(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 4.0, 4.0),
        );
        let mut index = TriangleIndex3d::new(bounds, [1.0, 1.0, 1.0]);
        // spans many cells
        let bdb = BoundingBox::from_corners(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 4.0, 0.5),
        );
        index.insert(0, 3, &bdb);
        let hits = index.query(&bounds);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn node_index_nearest() {
        let bounds =
            BoundingBox::from_corners(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0));
        let mut index = NodeIndex2d::new(bounds, 100);
        for i in 0..10 {
            for j in 0..10 {
                index.push(Point2::new(i as f64, j as f64));
            }
        }
        let (found, dist) = index.nearest_within(Point2::new(3.2, 6.9), 0.5).unwrap();
        assert_eq!(index.point(found), Point2::new(3.0, 7.0));
        assert!(dist < 0.3);
        assert!(index.nearest_within(Point2::new(5.5, 5.5), 0.2).is_none());
    }
}
