use crate::*;
use strata_mesh::surface::BorderEntry;

#[derive(Clone, Copy, Debug)]
struct Run {
    line_id: usize,
    start: usize,
    end: usize,
}

/// Maximal runs of equal line ownership around the open ring of outline
/// vertices, merged circularly.
fn outline_runs(tags: &[OutlineTag]) -> Vec<Run> {
    let n = tags.len();
    let mut runs: Vec<Run> = Vec::new();
    for i in 0..n {
        match runs.last_mut() {
            Some(run) if run.line_id == tags[i].line_id => run.end = i,
            _ => runs.push(Run {
                line_id: tags[i].line_id,
                start: i,
                end: i,
            }),
        }
    }
    if runs.len() > 1 {
        let (first, last) = (runs[0], *runs.last().unwrap());
        if first.line_id == last.line_id {
            runs[0].start = last.start;
            runs.pop();
        }
    }
    runs
}

impl SealedModel {
    fn pad_corners_xy(&self) -> Vec<Point2> {
        match self.pad_box {
            Some(pad) => {
                let (min, max) = (pad.min(), pad.max());
                vec![
                    Point2::new(min.x, min.y),
                    Point2::new(min.x, max.y),
                    Point2::new(max.x, min.y),
                    Point2::new(max.x, max.y),
                ]
            }
            None => Vec::new(),
        }
    }

    /// Decides which of two junction candidates is the shared point where
    /// two outline segments meet: at a boundary corner the point closer to
    /// the corner wins, otherwise the point closer to the third intersection
    /// line (the one shared by the two non-common surfaces) wins.
    fn choose_shared_point(
        &self,
        common_surf: i64,
        p1: Point3,
        p2: Point3,
        line1: usize,
        line2: usize,
    ) -> Point3 {
        let other = |line_id: usize| -> Option<i64> {
            self.intersection_lines
                .get(line_id)
                .map(|line| line.other_surface(common_surf))
        };
        let (Some(o1), Some(o2)) = (other(line1), other(line2)) else {
            return p1;
        };
        let both_walls = SurfaceKind::from_id(o1).is_some_and(SurfaceKind::is_boundary)
            && SurfaceKind::from_id(o2).is_some_and(SurfaceKind::is_boundary);
        if both_walls {
            let mid = Point2::new((p1.x + p2.x) / 2.0, (p1.y + p2.y) / 2.0);
            if let Some(corner) = self
                .pad_corners_xy()
                .into_iter()
                .min_by(|a, b| {
                    mid.distance2(*a)
                        .partial_cmp(&mid.distance2(*b))
                        .unwrap_or(std::cmp::Ordering::Greater)
                })
            {
                let d1 = Point2::new(p1.x, p1.y).distance(corner);
                let d2 = Point2::new(p2.x, p2.y).distance(corner);
                return match d2 < d1 {
                    true => p2,
                    false => p1,
                };
            }
            return p1;
        }
        // the third line joins the two non-common surfaces
        let third = self
            .intersection_lines
            .iter()
            .find(|line| line.uses_surface(o1) && line.uses_surface(o2));
        match third {
            Some(third) => {
                let d1 = third.points.distance_to_point(p1);
                let d2 = third.points.distance_to_point(p2);
                match d2 < d1 {
                    true => p2,
                    false => p1,
                }
            }
            None => p1,
        }
    }

    /// Splits every outline at line-ownership changes into sealed
    /// intersects, resampled to the average spacing, and records each
    /// surface's sealed border. Top- and bottom-default outlines feed the
    /// top/bottom intersect list; everything else feeds the horizon list.
    pub(crate) fn create_sealed_intersects(&mut self) -> Result<()> {
        let spacing = self.average_spacing;
        let mut horizon_intersects: Vec<IntersectionLine> = Vec::new();
        let mut top_bottom_intersects: Vec<IntersectionLine> = Vec::new();
        let mut borders: Vec<(i64, SealedBorder)> = Vec::new();
        let outlines = self.horizon_outlines.clone();
        for outline in &outlines {
            let is_top_bottom = SurfaceKind::from_id(outline.surf_id)
                .is_some_and(SurfaceKind::is_top_or_bottom);
            let open_len = outline.points.len() - 1;
            let tags = &outline.tags[..open_len];
            let runs = outline_runs(tags);
            let mut border = SealedBorder::default();
            if runs.len() <= 1 {
                // a single owner: the whole ring is one closed intersect
                let other = runs
                    .first()
                    .and_then(|run| self.outline_other_surface(outline, run.line_id));
                let polyline = outline.points.resample(spacing);
                let line = IntersectionLine::new(polyline, outline.surf_id, other.unwrap_or(-1));
                let sink = match is_top_bottom {
                    true => &mut top_bottom_intersects,
                    false => &mut horizon_intersects,
                };
                border.entries.push(BorderEntry {
                    line: sink.len(),
                    forward: true,
                });
                sink.push(line);
                borders.push((outline.surf_id, border));
                continue;
            }
            // junction k sits between run k and run k+1 (cyclic)
            let mut junctions: Vec<Point3> = Vec::with_capacity(runs.len());
            for k in 0..runs.len() {
                let next = (k + 1) % runs.len();
                let p1 = outline.points[runs[k].end];
                let p2 = outline.points[runs[next].start];
                junctions.push(self.choose_shared_point(
                    outline.surf_id,
                    p1,
                    p2,
                    runs[k].line_id,
                    runs[next].line_id,
                ));
            }
            for k in 0..runs.len() {
                let prev = (k + runs.len() - 1) % runs.len();
                let mut points: Vec<Point3> = vec![junctions[prev]];
                let run = runs[k];
                let mut walk = run.start;
                loop {
                    let pt = outline.points[walk];
                    if !same_point(pt, junctions[prev], self.model_tiny)
                        && !same_point(pt, junctions[k], self.model_tiny)
                    {
                        points.push(pt);
                    }
                    if walk == run.end {
                        break;
                    }
                    walk = (walk + 1) % open_len;
                }
                points.push(junctions[k]);
                let mut polyline = Polyline(points);
                polyline.dedup_points(self.model_tiny);
                if polyline.len() < 2 {
                    continue;
                }
                let polyline = polyline.resample(spacing);
                let other = self.outline_other_surface(outline, run.line_id);
                let line =
                    IntersectionLine::new(polyline, outline.surf_id, other.unwrap_or(-1));
                let sink = match is_top_bottom {
                    true => &mut top_bottom_intersects,
                    false => &mut horizon_intersects,
                };
                border.entries.push(BorderEntry {
                    line: sink.len(),
                    forward: true,
                });
                sink.push(line);
            }
            borders.push((outline.surf_id, border));
        }
        self.sealed_horizon_intersects = horizon_intersects;
        self.sealed_top_bottom_intersects = top_bottom_intersects;
        for (surf_id, border) in borders {
            if let Some(surface) = self.padded_surface_mut(surf_id) {
                surface.sealed_border = border;
            }
        }
        self.create_sealed_fault_intersects();
        Ok(())
    }

    fn outline_other_surface(&self, outline: &Outline, line_id: usize) -> Option<i64> {
        if line_id == BORDER_LINE_ID {
            return None;
        }
        self.intersection_lines
            .get(line_id)
            .map(|line| line.other_surface(outline.surf_id))
    }

    pub(crate) fn padded_surface_mut(&mut self, id: i64) -> Option<&mut Surface> {
        if let Some(found) = self.padded_horizons.iter_mut().find(|s| s.id == id) {
            return Some(found);
        }
        if let Some(found) = self.padded_faults.iter_mut().find(|s| s.id == id) {
            return Some(found);
        }
        [
            &mut self.padded_sediment,
            &mut self.padded_bottom,
            &mut self.padded_top_default,
            &mut self.padded_bottom_default,
            &mut self.padded_detachment,
        ]
        .into_iter()
        .filter_map(Option::as_mut)
        .find(|s| s.id == id)
    }

    /// Rebuilds the fault-fault and fault-boundary intersects by threading
    /// the endpoints of the sealed horizon intersects into the raw lines:
    /// each endpoint replaces the nearest unused interior vertex of the
    /// host line, or is inserted between two neighbors.
    fn create_sealed_fault_intersects(&mut self) {
        let spacing = self.average_spacing;
        let mut sealed: Vec<IntersectionLine> = Vec::new();
        for raw in &self.intersection_lines {
            if !raw.involves_fault() {
                continue;
            }
            let kinds = [
                SurfaceKind::from_id(raw.surf1),
                SurfaceKind::from_id(raw.surf2),
            ];
            let horizon_involved = kinds
                .into_iter()
                .flatten()
                .any(SurfaceKind::is_horizon_like);
            if horizon_involved {
                // fault-horizon curves are owned by the horizon outlines
                continue;
            }
            let mut points = raw.points.resample(spacing);
            let mut used = vec![false; points.len()];
            let endpoints = self
                .sealed_horizon_intersects
                .iter()
                .chain(&self.sealed_top_bottom_intersects)
                .flat_map(|sealed_line| {
                    let o = [sealed_line.surf1, sealed_line.surf2];
                    let touches =
                        o.contains(&raw.surf1) || o.contains(&raw.surf2);
                    match touches {
                        true => vec![sealed_line.first_point(), sealed_line.last_point()],
                        false => Vec::new(),
                    }
                });
            let endpoints: Vec<Point3> = endpoints.collect();
            for endpoint in endpoints {
                if points.distance_to_point(endpoint) > spacing {
                    continue;
                }
                thread_point(&mut points, &mut used, endpoint, spacing);
            }
            let mut line = IntersectionLine::new(points, raw.surf1, raw.surf2);
            line.external_id1 = raw.external_id1;
            line.external_id2 = raw.external_id2;
            line.embed_flag = raw.embed_flag;
            sealed.push(line);
        }
        self.sealed_fault_intersects = sealed;
    }
}

/// Threads `pt` into the polyline: the nearest unused interior vertex
/// within half the spacing is replaced, otherwise the point is inserted
/// between the two vertices bracketing its projection.
fn thread_point(points: &mut Polyline, used: &mut Vec<bool>, pt: Point3, spacing: f64) {
    if points.len() < 3 {
        return;
    }
    let nearest = (1..points.len() - 1)
        .filter(|&i| !used[i])
        .min_by(|&a, &b| {
            pt.distance2(points[a])
                .partial_cmp(&pt.distance2(points[b]))
                .unwrap_or(std::cmp::Ordering::Greater)
        });
    if let Some(i) = nearest {
        if pt.distance(points[i]) <= spacing / 2.0 {
            points[i] = pt;
            used[i] = true;
            return;
        }
    }
    let best_seg = points
        .windows(2)
        .enumerate()
        .map(|(i, w)| (i, strata_mesh::polyline::distance_point_segment(pt, w[0], w[1])))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Greater))
        .map(|(i, _)| i)
        .unwrap_or(0);
    points.insert(best_seg + 1, pt);
    used.insert(best_seg + 1, true);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_merge_circularly() {
        let tag = |line_id: usize| OutlineTag {
            line_id,
            point_id: 0,
            line_id2: None,
        };
        let tags = vec![tag(5), tag(5), tag(2), tag(2), tag(9), tag(5)];
        let runs = outline_runs(&tags);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].line_id, 5);
        assert_eq!(runs[0].start, 5);
        assert_eq!(runs[0].end, 1);
        assert_eq!(runs[1].line_id, 2);
        assert_eq!(runs[2].line_id, 9);
    }

    #[test]
    fn threading_replaces_nearest_vertex() {
        let mut points = Polyline(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
        ]);
        let mut used = vec![false; 4];
        thread_point(&mut points, &mut used, Point3::new(1.9, 0.05, 0.0), 1.0);
        assert_eq!(points.len(), 4);
        assert_eq!(points[2], Point3::new(1.9, 0.05, 0.0));
        assert!(used[2]);
    }
}
