use crate::errors::Error;
use crate::padding::SurfaceLocator;
use crate::*;
use strata_meshing::polygonize::{assemble_polygons, include, AssembledPolygon, LineWork};

impl SealedModel {
    pub(crate) fn horizon_like_padded(&self) -> Vec<&Surface> {
        let mut out: Vec<&Surface> = Vec::new();
        out.extend(self.padded_horizons.iter());
        out.extend(self.padded_sediment.iter());
        out.extend(self.padded_bottom.iter());
        out.extend(self.padded_top_default.iter());
        out.extend(self.padded_bottom_default.iter());
        out
    }

    pub(crate) fn xytiny(&self) -> f64 { self.xy_span() / 20_000.0 }

    /// Builds the sealed outline of every horizon-like padded surface and
    /// marks the fault lines that must later be embedded.
    pub(crate) fn build_horizon_outlines(&mut self) -> Result<()> {
        let mut outlines = Vec::new();
        for surface in self.horizon_like_padded() {
            outlines.push(self.calc_surface_outline(surface)?);
        }
        self.horizon_outlines = outlines;
        self.mark_lines_to_embed();
        Ok(())
    }

    /// The closed outline of one surface: the union of its intersection
    /// lines (plus its own border when walls are absent), polygonized, with
    /// the polygon containing the surface's interior point selected and z
    /// values resolved.
    fn calc_surface_outline(&self, surface: &Surface) -> Result<Outline> {
        let xytiny = f64::max(self.xytiny(), 1.0e-12);
        let mut works: Vec<LineWork> = Vec::new();
        for (i, line) in self.intersection_lines.iter().enumerate() {
            if !line.uses_surface(surface.id) {
                continue;
            }
            works.push(LineWork {
                points: line.points.iter().map(|p| Point2::new(p.x, p.y)).collect(),
                line_id: i,
            });
        }
        let border = match self.boundaries.is_none() {
            true => surface.mesh.outer_border(),
            false => None,
        };
        if let Some(border) = &border {
            works.push(LineWork {
                points: border.iter().map(|p| Point2::new(p.x, p.y)).collect(),
                line_id: BORDER_LINE_ID,
            });
        }
        let polygons = assemble_polygons(&works, xytiny);
        if polygons.is_empty() {
            return Err(Error::OpenOutline(surface.id));
        }
        let chosen = self
            .select_polygon(surface, &polygons)
            .ok_or(Error::CentroidOutsidePolygon(surface.id))?;
        let polygon = &polygons[chosen];

        let mut points: Vec<Point3> = Vec::with_capacity(polygon.points.len() + 1);
        let mut tags: Vec<OutlineTag> = Vec::with_capacity(polygon.points.len() + 1);
        let mut known = Vec::with_capacity(polygon.points.len());
        let locator = SurfaceLocator::new(&surface.mesh, self.average_spacing);
        for (pt, tag) in polygon.points.iter().zip(&polygon.tags) {
            let mut resolved_tag = OutlineTag {
                line_id: tag.line_id,
                point_id: tag.point_id,
                line_id2: tag.line_id2,
            };
            // shared corners: the nearer line keeps ownership
            if let Some((line2, point2)) = tag.line_id2 {
                let d1 = self.tagged_line_distance(tag.line_id, &border, *pt);
                let d2 = self.tagged_line_distance(line2, &border, *pt);
                if d2 < d1 {
                    resolved_tag = OutlineTag {
                        line_id: line2,
                        point_id: point2,
                        line_id2: Some((tag.line_id, tag.point_id)),
                    };
                }
            }
            let source = self.tagged_point(resolved_tag.line_id, resolved_tag.point_id, &border);
            match source {
                // vertex merging can shift xy by a couple of snap cells
                Some(src) if same_point_xy(Point2::new(src.x, src.y), *pt, 4.0 * xytiny) => {
                    points.push(src);
                    known.push(true);
                }
                _ => {
                    let z = locator
                        .z_nearest(pt.x, pt.y, self.average_spacing * 2.0)
                        .or_else(|| locator.z_interpolated(&surface.mesh, pt.x, pt.y));
                    match z {
                        Some(z) => {
                            points.push(Point3::new(pt.x, pt.y, z));
                            known.push(true);
                        }
                        None => {
                            points.push(Point3::new(pt.x, pt.y, f64::NAN));
                            known.push(false);
                        }
                    }
                }
            }
            tags.push(resolved_tag);
        }
        interpolate_missing_z(&mut points, &known);
        // close the ring
        points.push(points[0]);
        tags.push(tags[0]);
        Ok(Outline {
            points: Polyline(points),
            tags,
            surf_id: surface.id,
        })
    }

    fn tagged_point(&self, line_id: usize, point_id: usize, border: &Option<Polyline>) -> Option<Point3> {
        if line_id == BORDER_LINE_ID {
            return border.as_ref().and_then(|b| b.get(point_id)).copied();
        }
        self.intersection_lines
            .get(line_id)
            .and_then(|line| line.points.get(point_id))
            .copied()
    }

    fn tagged_line_distance(&self, line_id: usize, border: &Option<Polyline>, pt: Point2) -> f64 {
        let probe = Point3::new(pt.x, pt.y, 0.0);
        let xy_distance = |line: &Polyline| {
            let flat: Polyline = line.iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect();
            flat.distance_to_point(probe)
        };
        if line_id == BORDER_LINE_ID {
            return border.as_ref().map_or(f64::INFINITY, xy_distance);
        }
        self.intersection_lines
            .get(line_id)
            .map_or(f64::INFINITY, |line| xy_distance(&line.points))
    }

    /// The polygon holding the surface's interior point; falls back to an
    /// inscribed-point grid search with up to eight doublings.
    fn select_polygon(&self, surface: &Surface, polygons: &[AssembledPolygon]) -> Option<usize> {
        let center = surface.center;
        if let Some(found) = polygons.iter().position(|p| include(&p.points, center)) {
            return Some(found);
        }
        log::debug!(
            "centroid of surface {} lies outside every outline polygon; searching inscribed point",
            surface.id
        );
        let locator = SurfaceLocator::new(&surface.mesh, self.average_spacing);
        let bdb = surface.mesh.aabb();
        let (min, max) = (bdb.min(), bdb.max());
        let mut divisions = 8_usize;
        for _ in 0..8 {
            for r in 1..divisions {
                for c in 1..divisions {
                    let x = min.x + (max.x - min.x) * c as f64 / divisions as f64;
                    let y = min.y + (max.y - min.y) * r as f64 / divisions as f64;
                    if locator.z_interpolated(&surface.mesh, x, y).is_none() {
                        continue;
                    }
                    let probe = Point2::new(x, y);
                    if let Some(found) = polygons.iter().position(|p| include(&p.points, probe)) {
                        return Some(found);
                    }
                }
            }
            divisions *= 2;
        }
        None
    }

    /// Sets the embed flag on fault lines whose mid-region hugs a sealed
    /// outline for at least a quarter of their points.
    fn mark_lines_to_embed(&mut self) {
        let threshold = self.average_spacing / 2.0;
        let outlines: Vec<(i64, Vec<Point2>)> = self
            .horizon_outlines
            .iter()
            .map(|outline| {
                (
                    outline.surf_id,
                    outline
                        .points
                        .iter()
                        .map(|p| Point2::new(p.x, p.y))
                        .collect(),
                )
            })
            .collect();
        for line in &mut self.intersection_lines {
            if !line.involves_fault() || line.embed_flag {
                continue;
            }
            for (surf_id, outline) in &outlines {
                if !line.uses_surface(*surf_id) {
                    continue;
                }
                let close = line
                    .points
                    .iter()
                    .filter(|p| {
                        let pt = Point2::new(p.x, p.y);
                        outline
                            .windows(2)
                            .map(|w| dist_2d(pt, w[0], w[1]))
                            .fold(f64::INFINITY, f64::min)
                            < threshold
                    })
                    .count();
                if close * 4 >= line.points.len() {
                    line.embed_flag = true;
                    break;
                }
            }
        }
    }
}

fn dist_2d(pt: Point2, a: Point2, b: Point2) -> f64 {
    let ab = b - a;
    let len2 = ab.magnitude2();
    if len2 == 0.0 {
        return pt.distance(a);
    }
    let t = f64::clamp((pt - a).dot(ab) / len2, 0.0, 1.0);
    pt.distance(a + ab * t)
}

/// Fills unresolved z values by linear interpolation along the polygon arc
/// in map view.
fn interpolate_missing_z(points: &mut [Point3], known: &[bool]) {
    let n = points.len();
    if n == 0 || known.iter().all(|k| !k) {
        for pt in points.iter_mut() {
            if pt.z.is_nan() {
                pt.z = 0.0;
            }
        }
        return;
    }
    for i in 0..n {
        if known[i] {
            continue;
        }
        let mut before = (i + n - 1) % n;
        while !known[before] {
            before = (before + n - 1) % n;
        }
        let mut after = (i + 1) % n;
        while !known[after] {
            after = (after + 1) % n;
        }
        let mut arc_to_i = 0.0;
        let mut arc_total = 0.0;
        let mut walk = before;
        loop {
            let next = (walk + 1) % n;
            let step = Point2::new(points[walk].x, points[walk].y)
                .distance(Point2::new(points[next].x, points[next].y));
            arc_total += step;
            if next == i {
                arc_to_i = arc_total;
            }
            walk = next;
            if walk == after {
                break;
            }
        }
        let t = match arc_total > 0.0 {
            true => arc_to_i / arc_total,
            false => 0.5,
        };
        points[i].z = points[before].z + (points[after].z - points[before].z) * t;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_z_interpolates_along_arc() {
        let mut points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, f64::NAN),
            Point3::new(2.0, 0.0, 4.0),
            Point3::new(1.0, 1.0, 2.0),
        ];
        let known = vec![true, false, true, true];
        interpolate_missing_z(&mut points, &known);
        assert!((points[1].z - 2.0).abs() < 1.0e-9);
    }

    #[test]
    fn all_missing_defaults_to_zero() {
        let mut points = vec![Point3::new(0.0, 0.0, f64::NAN)];
        interpolate_missing_z(&mut points, &[false]);
        assert_eq!(points[0].z, 0.0);
    }
}
