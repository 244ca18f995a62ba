use crate::errors::Error;
use crate::*;
use strata_meshing::cdt::{clip_to_polygon, embed_constraints, Constraint};
use strata_meshing::chew::{
    bottom_boundary_seeds, chew_from_node, on_unconstrained_edge, top_boundary_seeds,
};
use strata_meshing::spatial::NodeIndex2d;

/// Concatenates the sealed-border entries into one closed polygon; `None`
/// when the path does not return to its start.
fn assemble_border_polygon(
    list: &[IntersectionLine],
    border: &SealedBorder,
    tiny: f64,
) -> Option<Polyline> {
    let mut points: Vec<Point3> = Vec::new();
    for entry in &border.entries {
        let line = list.get(entry.line)?;
        let oriented: Vec<Point3> = match entry.forward {
            true => line.points.0.clone(),
            false => line.points.iter().rev().copied().collect(),
        };
        for pt in oriented {
            match points.last() {
                Some(&last) if same_point(last, pt, tiny) => {}
                _ => points.push(pt),
            }
        }
    }
    let mut polygon = Polyline(points);
    if !polygon.is_closed(tiny * 10.0) {
        // a single closed entry may already repeat its start
        if polygon.len() < 3 {
            return None;
        }
        let first = polygon[0];
        let last = polygon[polygon.len() - 1];
        if first.distance(last) > tiny * 10.0 {
            return None;
        }
    }
    if !same_point(polygon[0], polygon[polygon.len() - 1], tiny) {
        let first = polygon[0];
        polygon.push(first);
    }
    Some(polygon)
}

impl SealedModel {
    fn padded_surface_age(&self, id: i64) -> Option<f64> {
        self.padded_roster()
            .into_iter()
            .find(|s| s.id == id)
            .map(|s| s.age)
    }

    fn touches_sides(&self, mesh: &TriMesh) -> bool {
        let Some(pad) = self.pad_box else { return false };
        let tol = self.model_tiny * 10.0;
        let (min, max) = (pad.min(), pad.max());
        mesh.live_points().any(|pt| {
            (pt.x - min.x).abs() < tol
                || (pt.x - max.x).abs() < tol
                || (pt.y - min.y).abs() < tol
                || (pt.y - max.y).abs() < tol
        })
    }

    /// Chews away everything beyond the outermost constraints: seeded from
    /// every unconstrained boundary node in the top band, and, when a lower
    /// limit line bounds the mesh, from the bottom band as well.
    fn chew_mesh(&self, mesh: &mut TriMesh, has_lower_limit: bool) {
        let band = self.average_spacing / 2.0;
        for seed in top_boundary_seeds(mesh, band) {
            chew_from_node(mesh, seed);
        }
        if has_lower_limit {
            for seed in bottom_boundary_seeds(mesh, band) {
                if on_unconstrained_edge(mesh, seed) {
                    chew_from_node(mesh, seed);
                }
            }
        }
    }

    fn install_unsealed_copies(&mut self) {
        self.sealed_horizons = self.padded_horizons.clone();
        self.sealed_faults = self.padded_faults.clone();
        self.sealed_sediment = self.padded_sediment.clone();
        self.sealed_bottom = self.padded_bottom.clone();
        self.sealed_top_default = self.padded_top_default.clone();
        self.sealed_bottom_default = self.padded_bottom_default.clone();
    }

    /// Seals the padded model: computes and reconciles every pairwise
    /// intersection, crops the horizons to their sealed outlines, embeds the
    /// shared polylines into faults (and walls when the seal flag is on),
    /// and snaps coincident fault/horizon nodes.
    ///
    /// Returns the number of sealed intersect polylines; zero means there
    /// was nothing to seal and the padded surfaces were installed as-is.
    pub fn seal_padded_model(&mut self) -> Result<usize> {
        self.pad_bounds()?;
        self.calc_padded_intersection_lines()?;
        if self.intersection_lines.is_empty() {
            log::debug!("no intersections in the padded model; nothing to seal");
            self.install_unsealed_copies();
            return Ok(0);
        }
        self.splice_fault_intersection_lines();
        self.fixup_crossing_intersects();
        self.resample_intersection_lines()?;
        self.build_horizon_outlines()?;
        self.create_sealed_intersects()?;
        self.crop_horizons()?;
        self.embed_faults()?;
        if self.sim_seal_flag {
            self.embed_boundaries()?;
            self.fix_boundary_corners();
        }
        self.snap_sealed_fault_points();
        Ok(self.sealed_horizon_intersects.len())
    }

    /// Crops every horizon-like padded surface to its sealed border: the
    /// border polylines are embedded exactly, then everything outside the
    /// closed border polygon is clipped away.
    fn crop_horizons(&mut self) -> Result<()> {
        let graze = self.graze_distance;
        let tiny = self.model_tiny;
        let surfaces: Vec<Surface> = self.horizon_like_padded().into_iter().cloned().collect();
        let mut sealed_horizons = Vec::new();
        let mut sealed_sediment = None;
        let mut sealed_bottom = None;
        let mut sealed_top_default = None;
        let mut sealed_bottom_default = None;
        for mut surface in surfaces {
            let kind = surface.kind();
            let border = self
                .padded_surface_border(surface.id)
                .unwrap_or_default();
            if border.is_empty() {
                log::debug!("surface {} has no sealed border; kept padded", surface.id);
                continue;
            }
            let list = match kind.is_top_or_bottom() {
                true => &self.sealed_top_bottom_intersects,
                false => &self.sealed_horizon_intersects,
            };
            let polygon3 = assemble_border_polygon(list, &border, tiny)
                .ok_or(Error::OpenOutline(surface.id))?;
            let constraints: Vec<Constraint> = border
                .entries
                .iter()
                .map(|entry| {
                    Constraint::plain(list[entry.line].points.clone(), entry.line as i64)
                })
                .collect();
            let mut mesh = embed_constraints(&surface.mesh, &constraints, None, graze)?;
            let polygon2: Vec<Point2> = polygon3
                .iter()
                .take(polygon3.len() - 1)
                .map(|p| Point2::new(p.x, p.y))
                .collect();
            clip_to_polygon(&mut mesh, &polygon2);
            if mesh.num_live_tris() == 0 {
                log::warn!("cropping surface {} removed every triangle", surface.id);
                continue;
            }
            surface.mesh = mesh;
            surface.is_sealed = true;
            surface.sealed_border = border;
            match kind {
                SurfaceKind::SedimentTop => sealed_sediment = Some(surface),
                SurfaceKind::ModelBottom => sealed_bottom = Some(surface),
                SurfaceKind::DefaultTop => sealed_top_default = Some(surface),
                SurfaceKind::DefaultBottom => sealed_bottom_default = Some(surface),
                _ => sealed_horizons.push(surface),
            }
        }
        self.sealed_horizons = sealed_horizons;
        self.sealed_sediment = sealed_sediment;
        self.sealed_bottom = sealed_bottom;
        self.sealed_top_default = sealed_top_default;
        self.sealed_bottom_default = sealed_bottom_default;
        Ok(())
    }

    fn padded_surface_border(&self, id: i64) -> Option<SealedBorder> {
        let found = self
            .padded_horizons
            .iter()
            .chain(&self.padded_sediment)
            .chain(&self.padded_bottom)
            .chain(&self.padded_top_default)
            .chain(&self.padded_bottom_default)
            .find(|s| s.id == id)?;
        Some(found.sealed_border.clone())
    }

    /// Builds each fault's constraint list (detachment contact, z-filtered
    /// fault intersects, age-filtered horizon intersects, top/bottom limit
    /// lines), embeds it in the fault's plane frame, and chews away the
    /// mesh beyond the outermost constraints.
    fn embed_faults(&mut self) -> Result<()> {
        let graze = self.graze_distance;
        let ztol = self.model_tiny * 10.0;
        let faults: Vec<Surface> = self.padded_faults.clone();
        let mut sealed_faults = Vec::with_capacity(faults.len());
        for fault in faults {
            let mut constraints: Vec<Constraint> = Vec::new();
            if let Some(line) = &fault.detachment_line {
                constraints.push(Constraint::plain(line.clone(), surface::DETACHMENT_ID));
            }
            for (i, line) in self.sealed_fault_intersects.iter().enumerate() {
                if !line.uses_surface(fault.id) {
                    continue;
                }
                let inside_z = line
                    .points
                    .iter()
                    .any(|p| p.z >= fault.zmin - ztol && p.z <= fault.zmax + ztol);
                if !inside_z {
                    // constraints entirely beyond the fault's depth range
                    // are dropped whole
                    continue;
                }
                constraints.push(Constraint::plain(line.points.clone(), i as i64));
            }
            let mut has_lower_limit = fault.detachment_line.is_some();
            for line in &self.sealed_horizon_intersects {
                // the outline surface is always surf1; the fault is surf2
                if line.surf2 != fault.id {
                    continue;
                }
                let kind = SurfaceKind::from_id(line.surf1);
                let flag = match kind {
                    Some(SurfaceKind::SedimentTop) | Some(SurfaceKind::ModelBottom) => {
                        LIMIT_LINE_FLAG
                    }
                    _ => 0,
                };
                if kind == Some(SurfaceKind::ModelBottom) {
                    has_lower_limit = true;
                }
                if fault.minage < fault.maxage && flag == 0 {
                    let age = self.padded_surface_age(line.surf1).unwrap_or(0.0);
                    if age < fault.minage || age > fault.maxage {
                        continue;
                    }
                }
                constraints.push(Constraint {
                    points: line.points.clone(),
                    line_id: fault.id,
                    flag,
                });
            }
            for line in &self.sealed_top_bottom_intersects {
                if line.surf2 != fault.id {
                    continue;
                }
                if SurfaceKind::from_id(line.surf1) == Some(SurfaceKind::DefaultBottom) {
                    has_lower_limit = true;
                }
                constraints.push(Constraint {
                    points: line.points.clone(),
                    line_id: fault.id,
                    flag: LIMIT_LINE_FLAG,
                });
            }
            if constraints.is_empty() {
                let mut sealed = fault.clone();
                sealed.is_sealed = true;
                sealed.sealed_to_sides = self.touches_sides(&sealed.mesh);
                sealed_faults.push(sealed);
                continue;
            }
            let mut mesh =
                embed_constraints(&fault.mesh, &constraints, fault.baseline.as_ref(), graze)?;
            self.chew_mesh(&mut mesh, has_lower_limit);
            mesh.compact();
            if mesh.num_live_tris() == 0 {
                log::warn!("fault {} chewed away entirely; kept padded", fault.id);
                let mut sealed = fault.clone();
                sealed.is_sealed = true;
                sealed_faults.push(sealed);
                continue;
            }
            let mut sealed = fault.clone();
            sealed.mesh = mesh;
            sealed.is_sealed = true;
            sealed.sealed_to_sides = self.touches_sides(&sealed.mesh);
            sealed_faults.push(sealed);
        }
        self.sealed_faults = sealed_faults;
        Ok(())
    }

    /// Embeds the matching fault, horizon and limit lines into each vertical
    /// wall, then chews off the parts above the top constraint and below
    /// the bottom one.
    fn embed_boundaries(&mut self) -> Result<()> {
        let graze = self.graze_distance;
        let Some(boundaries) = self.boundaries.clone() else {
            return Ok(());
        };
        let mut embedded = boundaries.clone();
        for side in Side::ALL {
            let wall = boundaries.side(side);
            let wall_id = side.id();
            let mut constraints: Vec<Constraint> = Vec::new();
            for (i, line) in self.sealed_fault_intersects.iter().enumerate() {
                if line.uses_surface(wall_id) {
                    constraints.push(Constraint::plain(line.points.clone(), i as i64));
                }
            }
            let mut has_lower_limit = false;
            for line in &self.sealed_horizon_intersects {
                if line.surf2 != wall_id {
                    continue;
                }
                let kind = SurfaceKind::from_id(line.surf1);
                let flag = match kind {
                    Some(SurfaceKind::SedimentTop) | Some(SurfaceKind::ModelBottom) => {
                        LIMIT_LINE_FLAG
                    }
                    _ => 0,
                };
                if kind == Some(SurfaceKind::ModelBottom) {
                    has_lower_limit = true;
                }
                constraints.push(Constraint {
                    points: line.points.clone(),
                    line_id: line.surf1,
                    flag,
                });
            }
            for line in &self.sealed_top_bottom_intersects {
                if line.surf2 == wall_id {
                    if SurfaceKind::from_id(line.surf1) == Some(SurfaceKind::DefaultBottom) {
                        has_lower_limit = true;
                    }
                    constraints.push(Constraint {
                        points: line.points.clone(),
                        line_id: line.surf1,
                        flag: LIMIT_LINE_FLAG,
                    });
                }
            }
            if constraints.is_empty() {
                continue;
            }
            let mut mesh =
                embed_constraints(&wall.mesh, &constraints, wall.baseline.as_ref(), graze)?;
            self.chew_mesh(&mut mesh, has_lower_limit);
            mesh.compact();
            if mesh.num_live_tris() == 0 {
                log::warn!("boundary {side:?} chewed away entirely; kept padded");
                continue;
            }
            let target = embedded.side_mut(side);
            target.mesh = mesh;
            target.is_sealed = true;
        }
        self.embedded_boundaries = Some(embedded);
        Ok(())
    }

    /// Reconciles the node sets where two walls meet at a corner: a corner
    /// node of one wall unmatched on the other snaps to the nearest
    /// counterpart when one exists nearby.
    fn fix_boundary_corners(&mut self) {
        let Some(pad) = self.pad_box else { return };
        let Some(embedded) = &mut self.embedded_boundaries else {
            return;
        };
        let tiny = self.model_tiny;
        let match_tol = tiny * 10.0;
        let snap_tol = self.average_spacing / 2.0;
        let (min, max) = (pad.min(), pad.max());
        let corners = [
            (Side::North, Side::East, max.x, max.y),
            (Side::North, Side::West, min.x, max.y),
            (Side::South, Side::East, max.x, min.y),
            (Side::South, Side::West, min.x, min.y),
        ];
        for (sa, sb, x, y) in corners {
            let corner_zs = |surface: &Surface| -> Vec<f64> {
                let mut zs: Vec<f64> = surface
                    .mesh
                    .live_points()
                    .filter(|p| (p.x - x).abs() < tiny && (p.y - y).abs() < tiny)
                    .map(|p| p.z)
                    .collect();
                zs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                zs
            };
            let za = corner_zs(embedded.side(sa));
            let zb = corner_zs(embedded.side(sb));
            let snap_wall = |surface: &mut Surface, own: &[f64], other: &[f64]| {
                let mut moved = false;
                for node in surface.mesh.nodes.iter_mut() {
                    if node.deleted
                        || (node.point.x - x).abs() >= tiny
                        || (node.point.y - y).abs() >= tiny
                    {
                        continue;
                    }
                    let z = node.point.z;
                    let matched = other.iter().any(|&oz| (oz - z).abs() <= match_tol);
                    if matched {
                        continue;
                    }
                    let nearest = other
                        .iter()
                        .copied()
                        .min_by(|a, b| {
                            (a - z).abs()
                                .partial_cmp(&(b - z).abs())
                                .unwrap_or(std::cmp::Ordering::Equal)
                        });
                    if let Some(nz) = nearest {
                        // only adopt the neighbor's z when no node of this
                        // wall already sits there
                        let occupied = own.iter().any(|&oz| (oz - nz).abs() <= match_tol);
                        if !occupied && (nz - z).abs() < snap_tol {
                            node.point.z = nz;
                            moved = true;
                        } else {
                            log::warn!("unreconciled corner node at z = {z}");
                        }
                    }
                }
                if moved {
                    surface.mesh.refresh_edge_lengths();
                }
            };
            snap_wall(embedded.side_mut(sa), &za, &zb);
            snap_wall(embedded.side_mut(sb), &zb, &za);
        }
    }

    /// Snaps sealed-fault nodes onto coincident sealed-horizon nodes so
    /// shared positions are bit-identical.
    fn snap_sealed_fault_points(&mut self) {
        let dcrit = self.average_spacing
            / match self.sim_output_flag {
                true => 2.0,
                false => 5.0,
            };
        let mut horizon_points: Vec<Point3> = Vec::new();
        for surface in self
            .sealed_horizons
            .iter()
            .chain(&self.sealed_sediment)
            .chain(&self.sealed_bottom)
            .chain(&self.sealed_top_default)
            .chain(&self.sealed_bottom_default)
        {
            horizon_points.extend(surface.mesh.live_points());
        }
        if horizon_points.is_empty() {
            return;
        }
        let xy_bounds: BoundingBox<Point2> = horizon_points
            .iter()
            .map(|p| Point2::new(p.x, p.y))
            .collect();
        let cells = usize::min(horizon_points.len() * 4, 10_000);
        let mut index = NodeIndex2d::new(xy_bounds, cells);
        for pt in &horizon_points {
            index.push(Point2::new(pt.x, pt.y));
        }
        for fault in &mut self.sealed_faults {
            let mut moved = false;
            for node in fault.mesh.nodes.iter_mut() {
                if node.deleted || !node.is_constraint {
                    continue;
                }
                let Some((i, _)) =
                    index.nearest_within(Point2::new(node.point.x, node.point.y), dcrit)
                else {
                    continue;
                };
                let candidate = horizon_points[i];
                if candidate != node.point && candidate.distance(node.point) <= dcrit {
                    node.point = candidate;
                    moved = true;
                }
            }
            if moved {
                fault.mesh.refresh_edge_lengths();
            }
        }
    }

    /// Seals every fault carrying a detachment contact down onto the padded
    /// detachment, and embeds the contact lines into the detachment itself.
    pub fn seal_faults_to_detachment(&mut self) -> Result<()> {
        let pad = self.pad_bounds()?;
        let detachment = self.padded_detachment.clone().ok_or(Error::NoDetachment)?;
        let graze = self.graze_distance;
        let spacing = self.average_spacing;
        let faults: Vec<Surface> = match self.sealed_faults.is_empty() {
            true => self.padded_faults.clone(),
            false => self.sealed_faults.clone(),
        };
        if faults.is_empty() {
            return Err(Error::NotPadded);
        }
        let mut contact_lines: Vec<IntersectionLine> = Vec::new();
        let mut sealed_faults = Vec::with_capacity(faults.len());
        for fault in faults {
            let polylines =
                crate::intersect::surface_pair_lines(&fault, &detachment, pad, graze, spacing);
            if polylines.is_empty() {
                sealed_faults.push(fault);
                continue;
            }
            let constraints: Vec<Constraint> = polylines
                .iter()
                .map(|points| Constraint::plain(points.clone(), surface::DETACHMENT_ID))
                .collect();
            let mut mesh =
                embed_constraints(&fault.mesh, &constraints, fault.baseline.as_ref(), graze)?;
            let band = self.average_spacing / 2.0;
            for seed in bottom_boundary_seeds(&mesh, band) {
                if on_unconstrained_edge(&mesh, seed) {
                    chew_from_node(&mut mesh, seed);
                }
            }
            mesh.compact();
            let mut sealed = fault.clone();
            if mesh.num_live_tris() > 0 {
                sealed.mesh = mesh;
            }
            sealed.is_sealed = true;
            sealed.detachment_line = polylines.first().cloned();
            for points in polylines {
                contact_lines.push(IntersectionLine::new(
                    points,
                    fault.id,
                    surface::DETACHMENT_ID,
                ));
            }
            sealed_faults.push(sealed);
        }
        let constraints: Vec<Constraint> = contact_lines
            .iter()
            .map(|line| Constraint::plain(line.points.clone(), line.surf1))
            .collect();
        let mut sealed_detachment = detachment.clone();
        if !constraints.is_empty() {
            sealed_detachment.mesh =
                embed_constraints(&detachment.mesh, &constraints, None, graze)?;
        }
        sealed_detachment.is_sealed = true;
        self.sealed_detachment = Some(sealed_detachment);
        self.sealed_faults = sealed_faults;
        self.intersection_lines.extend(contact_lines);
        Ok(())
    }
}
