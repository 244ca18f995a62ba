use crate::*;
use strata_meshing::collision::intersection_segment;
use strata_meshing::spatial::TriangleIndex3d;

fn interacting(a: SurfaceKind, b: SurfaceKind) -> bool {
    use SurfaceKind::*;
    match (a, b) {
        (Fault, Fault) => true,
        (Fault, k) | (k, Fault) => {
            k.is_horizon_like() || k.is_boundary() || k.is_top_or_bottom() || k == Detachment
        }
        (Boundary(_), k) | (k, Boundary(_)) => k.is_horizon_like() || k.is_top_or_bottom(),
        _ => false,
    }
}

/// One raw segment from a triangle pair.
#[derive(Clone, Copy, Debug)]
struct SegmentWork {
    a: Point3,
    b: Point3,
    used: bool,
}

/// Extracts the raw intersection segments between two indexed surfaces.
///
/// The outer loop runs over the surface with fewer triangles; candidates
/// come from the 3-D index; both triangles are translated near the origin
/// before the intersection primitive for numerical stability.
fn pair_segments(
    s1: &Surface,
    s2: &Surface,
    roster1: usize,
    roster2: usize,
    index: &TriangleIndex3d,
    pad: BoundingBox<Point3>,
    graze: f64,
) -> Vec<SegmentWork> {
    let swap = s1.mesh.num_live_tris() > s2.mesh.num_live_tris();
    let (outer, _inner, inner_roster) = match swap {
        false => (s1, s2, roster2),
        true => (s2, s1, roster1),
    };
    let inner_surface = match swap {
        false => s2,
        true => s1,
    };
    let diag = pad.diagonal();
    let margin = (diag.x + diag.y + diag.z) / 3.0 / 300.0;
    let origin = pad.min().to_vec();
    let mut segments = Vec::new();
    for t in outer.mesh.live_tris() {
        let mut bdb = outer.mesh.tri_aabb(t);
        let expanded = BoundingBox::from_corners(
            bdb.min() - Vector3::new(margin, margin, margin),
            bdb.max() + Vector3::new(margin, margin, margin),
        );
        bdb = expanded;
        let tri0 = outer.mesh.tri_points(t).map(|pt| pt - origin);
        for hit in index.query(&bdb) {
            if hit.mesh_id != inner_roster {
                continue;
            }
            let tri1 = inner_surface.mesh.tri_points(hit.tri_id).map(|pt| pt - origin);
            if let Some((a, b)) = intersection_segment(tri0, tri1, graze / 10.0) {
                segments.push(SegmentWork {
                    a: a + origin,
                    b: b + origin,
                    used: false,
                });
            }
        }
    }
    segments
}

/// Removes segments duplicating an earlier one under `tiny`, in either
/// orientation.
fn dedup_segments(segments: &mut Vec<SegmentWork>, tiny: f64) {
    let mut keep: Vec<SegmentWork> = Vec::with_capacity(segments.len());
    for seg in segments.iter() {
        let duplicate = keep.iter().any(|other| {
            (same_point(seg.a, other.a, tiny) && same_point(seg.b, other.b, tiny))
                || (same_point(seg.a, other.b, tiny) && same_point(seg.b, other.a, tiny))
        });
        if !duplicate {
            keep.push(*seg);
        }
    }
    *segments = keep;
}

/// Chains segments end to end into polylines: seeds with an unused segment
/// and repeatedly attaches segments whose endpoint matches the current
/// first or last point under `graze`, prepending or appending.
fn chain_segments(segments: &mut [SegmentWork], graze: f64, spacing: f64) -> Vec<Polyline> {
    for seg in segments.iter_mut() {
        if seg.a.distance(seg.b) < spacing / 10.0 {
            seg.used = true;
        }
    }
    let mut lines = Vec::new();
    loop {
        let Some(seed) = segments.iter().position(|s| !s.used) else {
            break;
        };
        segments[seed].used = true;
        let mut line: Vec<Point3> = vec![segments[seed].a, segments[seed].b];
        loop {
            let first = line[0];
            let last = line[line.len() - 1];
            let mut attached = false;
            for seg in segments.iter_mut() {
                if seg.used {
                    continue;
                }
                if same_point(seg.a, last, graze) {
                    line.push(seg.b);
                } else if same_point(seg.b, last, graze) {
                    line.push(seg.a);
                } else if same_point(seg.a, first, graze) {
                    line.insert(0, seg.b);
                } else if same_point(seg.b, first, graze) {
                    line.insert(0, seg.a);
                } else {
                    continue;
                }
                seg.used = true;
                attached = true;
                break;
            }
            if !attached {
                break;
            }
        }
        let mut polyline = Polyline(line);
        polyline.dedup_points(graze / 10.0);
        if polyline.len() >= 2 {
            lines.push(polyline);
        }
    }
    lines
}

/// Joins distinct polylines whose endpoints lie within `join_dist`,
/// tracking direction, until no more joins are possible.
fn connect_close_lines(mut lines: Vec<Polyline>, join_dist: f64) -> Vec<Polyline> {
    loop {
        let mut joined = false;
        'outer: for i in 0..lines.len() {
            for j in (i + 1)..lines.len() {
                if lines[i].is_empty() || lines[j].is_empty() {
                    continue;
                }
                let (ia, ib) = (lines[i][0], lines[i][lines[i].len() - 1]);
                let (ja, jb) = (lines[j][0], lines[j][lines[j].len() - 1]);
                let mut other = std::mem::take(&mut lines[j]).0;
                if ib.distance(ja) <= join_dist {
                    lines[i].0.extend(other.into_iter().skip(1));
                } else if ib.distance(jb) <= join_dist {
                    other.reverse();
                    lines[i].0.extend(other.into_iter().skip(1));
                } else if ia.distance(jb) <= join_dist {
                    other.pop();
                    other.extend(lines[i].0.iter().copied());
                    lines[i].0 = other;
                } else if ia.distance(ja) <= join_dist {
                    other.reverse();
                    other.pop();
                    other.extend(lines[i].0.iter().copied());
                    lines[i].0 = other;
                } else {
                    lines[j].0 = other;
                    continue;
                }
                joined = true;
                break 'outer;
            }
        }
        if !joined {
            break;
        }
    }
    lines.retain(|line| line.len() >= 2);
    lines
}

/// All polyline intersections between one pair of surfaces.
fn intersect_pair(
    s1: &Surface,
    s2: &Surface,
    roster1: usize,
    roster2: usize,
    index: &TriangleIndex3d,
    pad: BoundingBox<Point3>,
    graze: f64,
    spacing: f64,
) -> Vec<Polyline> {
    let mut segments = pair_segments(s1, s2, roster1, roster2, index, pad, graze);
    dedup_segments(&mut segments, graze / 10.0);
    let mut lines = chain_segments(&mut segments, graze, spacing);
    let diag = pad.diagonal();
    lines = connect_close_lines(lines, (diag.x + diag.y) / 2.0 / 40.0);
    lines
}

/// The intersection polylines of one pair of surfaces, over a private
/// two-mesh index.
pub(crate) fn surface_pair_lines(
    s1: &Surface,
    s2: &Surface,
    bounds: BoundingBox<Point3>,
    graze: f64,
    spacing: f64,
) -> Vec<Polyline> {
    let mut index = TriangleIndex3d::new(bounds, [spacing, spacing, spacing]);
    index.insert_mesh(0, &s1.mesh);
    index.insert_mesh(1, &s2.mesh);
    intersect_pair(s1, s2, 0, 1, &index, bounds, graze, spacing)
}

impl SealedModel {
    /// The padded surfaces in a stable order; the position in this roster is
    /// the mesh id used by the 3-D triangle index.
    pub(crate) fn padded_roster(&self) -> Vec<&Surface> {
        let mut out: Vec<&Surface> = Vec::new();
        out.extend(self.padded_horizons.iter());
        out.extend(self.padded_sediment.iter());
        out.extend(self.padded_bottom.iter());
        out.extend(self.padded_top_default.iter());
        out.extend(self.padded_bottom_default.iter());
        out.extend(self.padded_faults.iter());
        if let Some(boundaries) = &self.boundaries {
            out.extend(boundaries.iter());
        }
        out
    }

    /// Computes every pairwise intersection polyline of the padded model and
    /// stores them as the raw intersection-line list.
    pub(crate) fn calc_padded_intersection_lines(&mut self) -> Result<usize> {
        let pad = self.pad_bounds()?;
        let spacing = self.average_spacing;
        let graze = self.graze_distance;
        let mut lines = Vec::new();
        {
            let roster = self.padded_roster();
            let mut index = TriangleIndex3d::new(pad, [spacing, spacing, spacing]);
            for (rid, surface) in roster.iter().enumerate() {
                index.insert_mesh(rid, &surface.mesh);
            }
            for i in 0..roster.len() {
                for j in (i + 1)..roster.len() {
                    if !interacting(roster[i].kind(), roster[j].kind()) {
                        continue;
                    }
                    let polylines =
                        intersect_pair(roster[i], roster[j], i, j, &index, pad, graze, spacing);
                    for points in polylines {
                        let mut line = IntersectionLine::new(points, roster[i].id, roster[j].id);
                        line.external_id1 = roster[i].external_id;
                        line.external_id2 = roster[j].external_id;
                        lines.push(line);
                    }
                }
            }
        }
        log::debug!("padded model yields {} raw intersection lines", lines.len());
        self.intersection_lines = lines;
        Ok(self.intersection_lines.len())
    }

    /// Computes the raw fault-horizon intersection polylines of the input
    /// (unpadded) surfaces and returns them.
    pub fn calc_fault_horizon_intersections(&mut self) -> Result<&[IntersectionLine]> {
        if self.input_horizons.is_empty() || self.input_faults.is_empty() {
            self.fault_horizon_lines.clear();
            return Ok(&self.fault_horizon_lines);
        }
        let mut bounds = BoundingBox::new();
        for surface in self.input_horizons.iter().chain(&self.input_faults) {
            bounds.extend(surface.mesh.live_points());
        }
        let diag = bounds.diagonal();
        let spacing = match self.average_spacing > 0.0 {
            true => self.average_spacing,
            false => (diag.x + diag.y) / 2.0 / 100.0,
        };
        let graze = (diag.x + diag.y + diag.z) / 300_000.0;
        let mut lines = Vec::new();
        {
            let roster: Vec<&Surface> = self
                .input_horizons
                .iter()
                .chain(&self.input_faults)
                .collect();
            let mut index = TriangleIndex3d::new(bounds, [spacing, spacing, spacing]);
            for (rid, surface) in roster.iter().enumerate() {
                index.insert_mesh(rid, &surface.mesh);
            }
            let nh = self.input_horizons.len();
            for i in 0..nh {
                for j in nh..roster.len() {
                    let polylines =
                        intersect_pair(roster[i], roster[j], i, j, &index, bounds, graze, spacing);
                    for points in polylines {
                        let mut line = IntersectionLine::new(points, roster[i].id, roster[j].id);
                        line.external_id1 = roster[i].external_id;
                        line.external_id2 = roster[j].external_id;
                        lines.push(line);
                    }
                }
            }
        }
        self.fault_horizon_lines = lines;
        Ok(&self.fault_horizon_lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(ax: f64, bx: f64) -> SegmentWork {
        SegmentWork {
            a: Point3::new(ax, 0.0, 0.0),
            b: Point3::new(bx, 0.0, 0.0),
            used: false,
        }
    }

    #[test]
    fn chaining_joins_out_of_order_segments() {
        let mut segments = vec![seg(2.0, 3.0), seg(0.0, 1.0), seg(1.0, 2.0)];
        let lines = chain_segments(&mut segments, 1.0e-6, 0.1);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 4);
        let xs: Vec<f64> = lines[0].iter().map(|p| p.x).collect();
        assert!(xs == vec![0.0, 1.0, 2.0, 3.0] || xs == vec![3.0, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn chaining_is_idempotent() {
        // feeding the chained output back as segments reproduces the line
        let mut segments = vec![seg(0.0, 1.0), seg(1.0, 2.0), seg(2.0, 3.0)];
        let first = chain_segments(&mut segments, 1.0e-6, 0.1);
        let mut again: Vec<SegmentWork> = first[0]
            .windows(2)
            .map(|w| SegmentWork {
                a: w[0],
                b: w[1],
                used: false,
            })
            .collect();
        let second = chain_segments(&mut again, 1.0e-6, 0.1);
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].0, second[0].0);
    }

    #[test]
    fn duplicate_segments_removed() {
        let mut segments = vec![seg(0.0, 1.0), seg(0.0, 1.0), seg(1.0, 0.0)];
        dedup_segments(&mut segments, 1.0e-9);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn close_lines_connect() {
        let a = Polyline(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)]);
        let b = Polyline(vec![Point3::new(3.0, 0.0, 0.0), Point3::new(1.05, 0.0, 0.0)]);
        let joined = connect_close_lines(vec![a, b], 0.1);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].len(), 3);
        assert_eq!(joined[0][2], Point3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn far_lines_stay_apart() {
        let a = Polyline(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)]);
        let b = Polyline(vec![Point3::new(5.0, 0.0, 0.0), Point3::new(6.0, 0.0, 0.0)]);
        let joined = connect_close_lines(vec![a, b], 0.1);
        assert_eq!(joined.len(), 2);
    }
}
