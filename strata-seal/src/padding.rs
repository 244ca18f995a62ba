use crate::errors::Error;
use crate::*;
use strata_mesh::grid::{grid_steps, grid_trimesh};
use strata_meshing::spatial::{NodeIndex2d, TriangleIndex3d};

/// How far `pad_model` extends the model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PadExtent {
    /// an explicit pad box
    Bounds {
        /// west
        xmin: f64,
        /// south
        ymin: f64,
        /// deepest
        zmin: f64,
        /// east
        xmax: f64,
        /// north
        ymax: f64,
        /// shallowest
        zmax: f64,
    },
    /// proportional expansion of the model box
    Fractions {
        /// fraction of the x and y spans added on each side
        xy: f64,
        /// fraction of the z span added above and below
        z: f64,
    },
}

/// Barycentric z of (x, y) inside a triangle, `None` outside.
pub(crate) fn z_in_triangle(tri: [Point3; 3], x: f64, y: f64) -> Option<f64> {
    let [a, b, c] = tri;
    let det = (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y);
    if det == 0.0 {
        return None;
    }
    let l1 = ((x - a.x) * (c.y - a.y) - (c.x - a.x) * (y - a.y)) / det;
    let l2 = ((b.x - a.x) * (y - a.y) - (x - a.x) * (b.y - a.y)) / det;
    let l0 = 1.0 - l1 - l2;
    let eps = -1.0e-9;
    (l0 >= eps && l1 >= eps && l2 >= eps).then(|| a.z * l0 + b.z * l1 + c.z * l2)
}

/// Answers "what is the surface z at (x, y)" for one mesh: barycentric
/// interpolation inside the surface, nearest-node z beyond it.
pub(crate) struct SurfaceLocator {
    tri_index: TriangleIndex3d,
    node_index: NodeIndex2d,
    node_z: Vec<f64>,
    zmin: f64,
    zmax: f64,
}

impl SurfaceLocator {
    pub(crate) fn new(mesh: &TriMesh, spacing: f64) -> SurfaceLocator {
        let bounds = mesh.aabb();
        let mut tri_index = TriangleIndex3d::new(bounds, [spacing, spacing, 0.0]);
        tri_index.insert_mesh(0, mesh);
        let xy_bounds: BoundingBox<Point2> = mesh
            .live_points()
            .map(|pt| Point2::new(pt.x, pt.y))
            .collect();
        let cells = usize::min(mesh.num_live_nodes() * 4, 10_000);
        let mut node_index = NodeIndex2d::new(xy_bounds, cells);
        let mut node_z = Vec::new();
        for pt in mesh.live_points() {
            node_index.push(Point2::new(pt.x, pt.y));
            node_z.push(pt.z);
        }
        let (zmin, zmax) = mesh.z_range();
        SurfaceLocator {
            tri_index,
            node_index,
            node_z,
            zmin,
            zmax,
        }
    }

    /// interpolated z where (x, y) is over the surface
    pub(crate) fn z_interpolated(&self, mesh: &TriMesh, x: f64, y: f64) -> Option<f64> {
        let probe = BoundingBox::from_corners(
            Point3::new(x, y, self.zmin),
            Point3::new(x, y, self.zmax),
        );
        for hit in self.tri_index.query(&probe) {
            if let Some(z) = z_in_triangle(mesh.tri_points(hit.tri_id), x, y) {
                return Some(z);
            }
        }
        None
    }

    /// z of the node nearest to (x, y) within `cutoff`
    pub(crate) fn z_nearest(&self, x: f64, y: f64, cutoff: f64) -> Option<f64> {
        self.node_index
            .nearest_within(Point2::new(x, y), cutoff)
            .map(|(i, _)| self.node_z[i])
    }

    /// z over the surface, flat-extrapolated beyond its border
    pub(crate) fn z_extended(&self, mesh: &TriMesh, x: f64, y: f64, span: f64) -> f64 {
        self.z_interpolated(mesh, x, y)
            .or_else(|| self.z_nearest(x, y, span))
            .unwrap_or((self.zmin + self.zmax) / 2.0)
    }
}

fn expand_xy_z(bounds: BoundingBox<Point3>, fxy: f64, fz: f64) -> BoundingBox<Point3> {
    let d = bounds.diagonal();
    BoundingBox::from_corners(
        Point3::new(
            bounds.min().x - d.x * fxy,
            bounds.min().y - d.y * fxy,
            bounds.min().z - d.z * fz,
        ),
        Point3::new(
            bounds.max().x + d.x * fxy,
            bounds.max().y + d.y * fxy,
            bounds.max().z + d.z * fz,
        ),
    )
}

impl SealedModel {
    fn calc_model_bounds(&self) -> BoundingBox<Point3> {
        let mut bounds = BoundingBox::new();
        let surfaces = self
            .input_horizons
            .iter()
            .chain(&self.input_faults)
            .chain(&self.input_detachments)
            .chain(&self.input_sediment)
            .chain(&self.input_bottom);
        for surface in surfaces {
            bounds.extend(surface.mesh.live_points());
        }
        bounds
    }

    fn derive_spacing(&self, requested: Option<f64>, bounds: &BoundingBox<Point3>) -> f64 {
        if let Some(spacing) = requested.filter(|&s| s > 0.0) {
            return spacing;
        }
        if self.average_spacing > 0.0 {
            return self.average_spacing;
        }
        let (sum, count) = self
            .input_horizons
            .iter()
            .chain(&self.input_faults)
            .filter_map(|s| s.mesh.average_edge_length())
            .fold((0.0, 0_usize), |(sum, count), mean| (sum + mean, count + 1));
        match count {
            0 => {
                let d = bounds.diagonal();
                (d.x + d.y) / 2.0 / 100.0
            }
            _ => sum / count as f64,
        }
    }

    pub(crate) fn calc_graze_distance(&mut self) {
        if let Some(pad) = self.pad_box {
            let d = pad.diagonal();
            self.model_tiny = (d.x + d.y) / 200_000.0;
            self.graze_distance = (d.x + d.y + d.z) / 300_000.0;
        }
    }

    /// Extends every input surface to a common rectangular pad box and
    /// builds the four vertical side walls.
    ///
    /// After this call every horizon, fault, sediment surface and model
    /// bottom has a padded counterpart covering the box in plan view. When
    /// the seal flag is on and no sediment top or model bottom was supplied,
    /// a default horizontal top and bottom are synthesized just inside the
    /// box.
    pub fn pad_model(&mut self, extent: PadExtent, avg_spacing: Option<f64>) -> Result<()> {
        if self.input_horizons.is_empty() {
            return Err(Error::NoInputSurfaces);
        }
        let model = self.calc_model_bounds();
        self.model_box = Some(model);
        let mut pad = match extent {
            PadExtent::Bounds {
                xmin,
                ymin,
                zmin,
                xmax,
                ymax,
                zmax,
            } => BoundingBox::from_corners(
                Point3::new(xmin, ymin, zmin),
                Point3::new(xmax, ymax, zmax),
            ),
            PadExtent::Fractions { xy, z } => expand_xy_z(model, xy, z),
        };
        if self.margin_fraction > 0.0 {
            pad = expand_xy_z(pad, self.margin_fraction, self.margin_fraction);
        }
        let spacing = self.derive_spacing(avg_spacing, &pad);
        self.average_spacing = spacing;
        // side walls must clear the top of every surface
        let zspan = pad.diagonal().z;
        pad = expand_xy_z(pad, 0.0, 0.1);
        self.pad_box = Some(pad);
        self.calc_graze_distance();

        let boundaries = self.create_vertical_boundaries(pad, spacing)?;
        let mut padded_horizons = Vec::with_capacity(self.input_horizons.len());
        for surface in &self.input_horizons {
            padded_horizons.push(self.pad_horizon_like(surface, pad, spacing)?);
        }
        let padded_sediment = match &self.input_sediment {
            Some(surface) => Some(self.pad_horizon_like(surface, pad, spacing)?),
            None => None,
        };
        let padded_bottom = match &self.input_bottom {
            Some(surface) => Some(self.pad_horizon_like(surface, pad, spacing)?),
            None => None,
        };
        let padded_detachment = match (&self.padded_detachment, self.input_detachments.first()) {
            (Some(existing), _) => Some(existing.clone()),
            (None, Some(surface)) => Some(self.pad_horizon_like(surface, pad, spacing)?),
            (None, None) => None,
        };
        if self.input_detachments.len() > 1 {
            log::warn!(
                "only the first of {} input detachments is padded",
                self.input_detachments.len()
            );
        }
        let mut padded_faults = Vec::with_capacity(self.input_faults.len());
        for surface in &self.input_faults {
            padded_faults.push(self.pad_fault(surface, pad, spacing)?);
        }
        let mut padded_top_default = None;
        let mut padded_bottom_default = None;
        if self.sim_seal_flag {
            let inset = zspan / 50.0;
            if self.input_sediment.is_none() {
                padded_top_default = Some(self.default_plane(
                    surface::TOP_ID,
                    pad,
                    spacing,
                    pad.max().z - inset,
                )?);
            }
            if self.input_bottom.is_none() {
                padded_bottom_default = Some(self.default_plane(
                    surface::BOTTOM_ID,
                    pad,
                    spacing,
                    pad.min().z + inset,
                )?);
            }
        }

        self.boundaries = Some(boundaries);
        self.padded_horizons = padded_horizons;
        self.padded_sediment = padded_sediment;
        self.padded_bottom = padded_bottom;
        self.padded_detachment = padded_detachment;
        self.padded_faults = padded_faults;
        self.padded_top_default = padded_top_default;
        self.padded_bottom_default = padded_bottom_default;
        Ok(())
    }

    fn create_vertical_boundaries(
        &self,
        pad: BoundingBox<Point3>,
        spacing: f64,
    ) -> Result<Boundaries> {
        let (min, max) = (pad.min(), pad.max());
        let nx = grid_steps(max.x - min.x, spacing);
        let ny = grid_steps(max.y - min.y, spacing);
        let nz = grid_steps(max.z - min.z, spacing);
        let x_at = |i: usize| min.x + (max.x - min.x) * i as f64 / (nx - 1) as f64;
        let y_at = |i: usize| min.y + (max.y - min.y) * i as f64 / (ny - 1) as f64;
        let z_at = |i: usize| min.z + (max.z - min.z) * i as f64 / (nz - 1) as f64;
        let center = pad.center();
        let build = |side: Side| -> Result<Surface> {
            let rows: Vec<Vec<Point3>> = (0..nz)
                .map(|r| match side {
                    Side::North => (0..nx).map(|c| Point3::new(x_at(c), max.y, z_at(r))).collect(),
                    Side::South => (0..nx).map(|c| Point3::new(x_at(c), min.y, z_at(r))).collect(),
                    Side::East => (0..ny).map(|c| Point3::new(max.x, y_at(c), z_at(r))).collect(),
                    Side::West => (0..ny).map(|c| Point3::new(min.x, y_at(c), z_at(r))).collect(),
                })
                .collect();
            let mesh = grid_trimesh(&rows)?;
            let mut surface = Surface::new(side.id(), mesh);
            let (normal, origin) = match side {
                Side::North => (Vector3::unit_y(), Point3::new(center.x, max.y, center.z)),
                Side::South => (Vector3::unit_y(), Point3::new(center.x, min.y, center.z)),
                Side::East => (Vector3::unit_x(), Point3::new(max.x, center.y, center.z)),
                Side::West => (Vector3::unit_x(), Point3::new(min.x, center.y, center.z)),
            };
            surface.baseline = Some(Baseline::new(normal, origin));
            surface.is_padded = true;
            Ok(surface)
        };
        Ok(Boundaries {
            north: build(Side::North)?,
            south: build(Side::South)?,
            east: build(Side::East)?,
            west: build(Side::West)?,
        })
    }

    fn pad_horizon_like(
        &self,
        surface: &Surface,
        pad: BoundingBox<Point3>,
        spacing: f64,
    ) -> Result<Surface> {
        let locator = SurfaceLocator::new(&surface.mesh, spacing);
        // overshoot the walls by one grid step so wall crossings stay
        // transversal; the outline crop brings the surface back to the box
        let over = Vector3::new(spacing, spacing, 0.0);
        let (min, max) = (pad.min() - over, pad.max() + over);
        let span = (max.x - min.x) + (max.y - min.y);
        let nx = grid_steps(max.x - min.x, spacing);
        let ny = grid_steps(max.y - min.y, spacing);
        let rows: Vec<Vec<Point3>> = (0..ny)
            .map(|r| {
                let y = min.y + (max.y - min.y) * r as f64 / (ny - 1) as f64;
                (0..nx)
                    .map(|c| {
                        let x = min.x + (max.x - min.x) * c as f64 / (nx - 1) as f64;
                        Point3::new(x, y, locator.z_extended(&surface.mesh, x, y, span))
                    })
                    .collect()
            })
            .collect();
        let mesh = grid_trimesh(&rows)?;
        let mut padded = Surface::new(surface.id, mesh);
        padded.external_id = surface.external_id;
        padded.age = surface.age;
        padded.center = surface.center;
        padded.zmin = surface.zmin;
        padded.zmax = surface.zmax;
        padded.is_padded = true;
        Ok(padded)
    }

    fn pad_fault(
        &self,
        surface: &Surface,
        pad: BoundingBox<Point3>,
        spacing: f64,
    ) -> Result<Surface> {
        let baseline = surface
            .baseline
            .or_else(|| fit_plane(surface.mesh.live_points()));
        let Some(baseline) = baseline else {
            // a degenerate fault pads like a horizon
            return self.pad_horizon_like(surface, pad, spacing);
        };
        let mut frame_mesh = surface.mesh.clone();
        frame_mesh.apply(|pt| baseline.to_frame(pt));
        let locator = SurfaceLocator::new(&frame_mesh, spacing);
        // the fault must cut through the whole pad box along its plane
        let (min, max) = (pad.min(), pad.max());
        let mut frame_extent = BoundingBox::<Point3>::new();
        for &x in &[min.x, max.x] {
            for &y in &[min.y, max.y] {
                for &z in &[min.z, max.z] {
                    frame_extent.push(baseline.to_frame(Point3::new(x, y, z)));
                }
            }
        }
        // overshoot the walls only along the horizontal in-plane axis; the
        // baseline rotation keeps the frame x axis horizontal, and any
        // vertical overshoot would open a path around the wall constraint
        // lines for the chew
        let (mut fmin, mut fmax) = (frame_extent.min(), frame_extent.max());
        fmin.x -= spacing;
        fmax.x += spacing;
        let span = (fmax.x - fmin.x) + (fmax.y - fmin.y);
        let nu = grid_steps(fmax.x - fmin.x, spacing);
        let nv = grid_steps(fmax.y - fmin.y, spacing);
        let rows: Vec<Vec<Point3>> = (0..nv)
            .map(|r| {
                let v = fmin.y + (fmax.y - fmin.y) * r as f64 / (nv - 1) as f64;
                (0..nu)
                    .map(|c| {
                        let u = fmin.x + (fmax.x - fmin.x) * c as f64 / (nu - 1) as f64;
                        Point3::new(u, v, locator.z_extended(&frame_mesh, u, v, span))
                    })
                    .collect()
            })
            .collect();
        let mut mesh = grid_trimesh(&rows)?;
        mesh.apply(|pt| baseline.from_frame(pt));
        let mut padded = Surface::new(surface.id, mesh);
        padded.external_id = surface.external_id;
        padded.minage = surface.minage;
        padded.maxage = surface.maxage;
        padded.baseline = Some(baseline);
        padded.detachment_line = surface.detachment_line.clone();
        padded.detach_id = surface.detach_id;
        padded.center = surface.center;
        // the z limits of the unpadded fault gate the embed-time filters
        padded.zmin = surface.zmin;
        padded.zmax = surface.zmax;
        padded.is_padded = true;
        Ok(padded)
    }

    fn default_plane(
        &self,
        id: i64,
        pad: BoundingBox<Point3>,
        spacing: f64,
        z: f64,
    ) -> Result<Surface> {
        let over = Vector3::new(spacing, spacing, 0.0);
        let (min, max) = (pad.min() - over, pad.max() + over);
        let nx = grid_steps(max.x - min.x, spacing);
        let ny = grid_steps(max.y - min.y, spacing);
        let rows: Vec<Vec<Point3>> = (0..ny)
            .map(|r| {
                let y = min.y + (max.y - min.y) * r as f64 / (ny - 1) as f64;
                (0..nx)
                    .map(|c| {
                        let x = min.x + (max.x - min.x) * c as f64 / (nx - 1) as f64;
                        Point3::new(x, y, z)
                    })
                    .collect()
            })
            .collect();
        let mut surface = Surface::new(id, grid_trimesh(&rows)?);
        surface.is_padded = true;
        Ok(surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barycentric_z() {
        let tri = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 2.0),
            Point3::new(0.0, 2.0, 4.0),
        ];
        assert_eq!(z_in_triangle(tri, 1.0, 0.0), Some(1.0));
        assert_eq!(z_in_triangle(tri, 0.0, 1.0), Some(2.0));
        assert!(z_in_triangle(tri, 2.0, 2.0).is_none());
    }
}
