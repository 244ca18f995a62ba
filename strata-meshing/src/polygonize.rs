use crate::*;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use strata_base::hash::HashGen;

/// An input polyline for polygon assembly, in map view, tagged with the
/// caller's line id.
#[derive(Clone, Debug)]
pub struct LineWork {
    /// the polyline
    pub points: Vec<Point2>,
    /// the caller's id for this line
    pub line_id: usize,
}

/// Traces an assembled polygon vertex back to its source line and point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointTag {
    /// primary owning line
    pub line_id: usize,
    /// point index within the owning line
    pub point_id: usize,
    /// second owner where two lines share the vertex
    pub line_id2: Option<(usize, usize)>,
}

/// A closed polygon assembled from the union of the input lines.
///
/// The point list is open (the closing edge back to the first point is
/// implied) and counterclockwise.
#[derive(Clone, Debug)]
pub struct AssembledPolygon {
    /// polygon vertices
    pub points: Vec<Point2>,
    /// per-vertex source tags
    pub tags: Vec<PointTag>,
    /// enclosed area
    pub area: f64,
}

/// Assembles every closed polygon formed by the union of `lines`.
///
/// Endpoints within `tiny` of each other are merged, dangling chains that
/// bound no region are trimmed, and the remaining planar graph is traced
/// into counterclockwise faces. Lines are expected to meet at shared
/// vertices; crossings away from vertices are not split.
pub fn assemble_polygons(lines: &[LineWork], tiny: f64) -> Vec<AssembledPolygon> {
    let snap = f64::max(tiny, 1.0e-12);
    let key = |pt: Point2| -> [i64; 2] {
        [
            ((pt.x + snap) / (2.0 * snap)).floor() as i64,
            ((pt.y + snap) / (2.0 * snap)).floor() as i64,
        ]
    };
    let mut vertex_map: HashMap<[i64; 2], usize> = HashMap::default();
    let mut points: Vec<Point2> = Vec::new();
    let mut sources: Vec<Vec<(usize, usize)>> = Vec::new();
    let mut adjacency: Vec<Vec<usize>> = Vec::new();
    let mut edge_set: HashSet<(usize, usize)> = HashSet::default();
    for line in lines {
        let mut previous: Option<usize> = None;
        for (point_id, &pt) in line.points.iter().enumerate() {
            let vertex = *vertex_map.entry(key(pt)).or_insert_with(|| {
                points.push(pt);
                sources.push(Vec::new());
                adjacency.push(Vec::new());
                points.len() - 1
            });
            sources[vertex].push((line.line_id, point_id));
            if let Some(prev) = previous {
                if prev != vertex {
                    let edge = (usize::min(prev, vertex), usize::max(prev, vertex));
                    if edge_set.insert(edge) {
                        adjacency[prev].push(vertex);
                        adjacency[vertex].push(prev);
                    }
                }
            }
            previous = Some(vertex);
        }
    }

    // Chains that bound no region cannot appear in any polygon.
    trim_dangles(&mut adjacency);

    // Sort neighbors by angle for the face walk.
    for (v, neighbors) in adjacency.iter_mut().enumerate() {
        let origin = points[v];
        neighbors.sort_by(|&a, &b| {
            let aa = angle(points[a] - origin);
            let ab = angle(points[b] - origin);
            aa.partial_cmp(&ab).unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    let mut used: HashSet<(usize, usize)> = HashSet::default();
    let mut polygons = Vec::new();
    let total_directed: usize = adjacency.iter().map(Vec::len).sum();
    for start_u in 0..adjacency.len() {
        for k in 0..adjacency[start_u].len() {
            let start_v = adjacency[start_u][k];
            if used.contains(&(start_u, start_v)) {
                continue;
            }
            let mut face = Vec::new();
            let (mut u, mut v) = (start_u, start_v);
            loop {
                used.insert((u, v));
                face.push(u);
                let w = next_around(&points, &adjacency[v], v, u);
                u = v;
                v = w;
                if (u, v) == (start_u, start_v) || face.len() > total_directed {
                    break;
                }
            }
            if face.len() < 3 {
                continue;
            }
            let area = shoelace(&points, &face);
            if area <= 0.0 {
                continue;
            }
            let tags = face.iter().map(|&vtx| make_tag(&sources[vtx])).collect();
            polygons.push(AssembledPolygon {
                points: face.iter().map(|&vtx| points[vtx]).collect(),
                tags,
                area,
            });
        }
    }
    polygons
}

fn angle(v: Vector2) -> f64 { f64::atan2(v.y, v.x) }

/// The neighbor of `v` whose direction is the clockwise predecessor of the
/// direction back to `from`; traces bounded faces counterclockwise.
fn next_around(points: &[Point2], neighbors: &[usize], v: usize, from: usize) -> usize {
    let back = angle(points[from] - points[v]);
    let mut best: Option<(f64, usize)> = None;
    let mut wrap: Option<(f64, usize)> = None;
    for &n in neighbors {
        let a = angle(points[n] - points[v]);
        if a < back - 1.0e-14 {
            if best.map_or(true, |(ba, _)| a > ba) {
                best = Some((a, n));
            }
        }
        if wrap.map_or(true, |(wa, _)| a > wa) {
            wrap = Some((a, n));
        }
    }
    best.or(wrap).map(|(_, n)| n).unwrap_or(from)
}

fn shoelace(points: &[Point2], face: &[usize]) -> f64 {
    let mut sum = 0.0;
    for i in 0..face.len() {
        let p = points[face[i]];
        let q = points[face[(i + 1) % face.len()]];
        sum += (q.x + p.x) * (q.y - p.y);
    }
    sum / 2.0
}

fn make_tag(sources: &[(usize, usize)]) -> PointTag {
    let (line_id, point_id) = sources.first().copied().unwrap_or((usize::MAX, 0));
    let line_id2 = sources
        .iter()
        .copied()
        .find(|&(line, _)| line != line_id);
    PointTag {
        line_id,
        point_id,
        line_id2,
    }
}

fn trim_dangles(adjacency: &mut [Vec<usize>]) {
    loop {
        let mut removed = false;
        for v in 0..adjacency.len() {
            if adjacency[v].len() == 1 {
                let n = adjacency[v][0];
                adjacency[v].clear();
                adjacency[n].retain(|&m| m != v);
                removed = true;
            }
        }
        if !removed {
            break;
        }
    }
}

/// Whether `c` lies inside the closed polygon.
///
/// Walks a deterministic ray and counts signed crossings; rays grazing a
/// vertex are retried with a different deterministic direction.
pub fn include(polygon: &[Point2], c: Point2) -> bool {
    use itertools::Itertools;
    if polygon.len() < 3 {
        return false;
    }
    for attempt in 0..8 {
        let seed = [c.x, c.y + attempt as f64 * 0.6180339887498949];
        let t = 2.0 * std::f64::consts::PI * <[f64; 2]>::hash1(seed);
        let r = Vector2::new(f64::cos(t), f64::sin(t));
        let counter = polygon
            .iter()
            .circular_tuple_windows()
            .try_fold(0_i32, |counter, (p0, p1)| {
                let a = p0 - c;
                let b = p1 - c;
                let s0 = r.x * a.y - r.y * a.x;
                let s1 = r.x * b.y - r.y * b.x;
                let s2 = a.x * b.y - a.y * b.x;
                let x = s2 / (s1 - s0);
                if x.so_small() && s0 * s1 < 0.0 {
                    None
                } else if x > 0.0 && s0 <= 0.0 && s1 > 0.0 {
                    Some(counter + 1)
                } else if x > 0.0 && s0 >= 0.0 && s1 < 0.0 {
                    Some(counter - 1)
                } else {
                    Some(counter)
                }
            });
        if let Some(counter) = counter {
            return counter > 0;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: usize, pts: &[(f64, f64)]) -> LineWork {
        LineWork {
            points: pts.iter().map(|&(x, y)| Point2::new(x, y)).collect(),
            line_id: id,
        }
    }

    #[test]
    fn single_square() {
        let lines = vec![line(
            0,
            &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)],
        )];
        let polygons = assemble_polygons(&lines, 1.0e-9);
        assert_eq!(polygons.len(), 1);
        assert!((polygons[0].area - 1.0).abs() < 1.0e-9);
        assert_eq!(polygons[0].points.len(), 4);
    }

    #[test]
    fn two_lines_one_polygon() {
        // upper and lower halves of a diamond, meeting at shared endpoints
        let lines = vec![
            line(3, &[(-1.0, 0.0), (0.0, 1.0), (1.0, 0.0)]),
            line(8, &[(1.0, 0.0), (0.0, -1.0), (-1.0, 0.0)]),
        ];
        let polygons = assemble_polygons(&lines, 1.0e-9);
        assert_eq!(polygons.len(), 1);
        assert!((polygons[0].area - 2.0).abs() < 1.0e-9);
        // shared endpoints carry both owners
        let shared: Vec<&PointTag> = polygons[0]
            .tags
            .iter()
            .filter(|tag| tag.line_id2.is_some())
            .collect();
        assert_eq!(shared.len(), 2);
    }

    #[test]
    fn crossing_line_splits_square() {
        // a square with a vertical line across it, sharing vertices on the
        // top and bottom edges
        let lines = vec![
            line(
                0,
                &[
                    (0.0, 0.0),
                    (0.5, 0.0),
                    (1.0, 0.0),
                    (1.0, 1.0),
                    (0.5, 1.0),
                    (0.0, 1.0),
                    (0.0, 0.0),
                ],
            ),
            line(1, &[(0.5, 0.0), (0.5, 1.0)]),
        ];
        let polygons = assemble_polygons(&lines, 1.0e-9);
        assert_eq!(polygons.len(), 2);
        for polygon in &polygons {
            assert!((polygon.area - 0.5).abs() < 1.0e-9);
        }
    }

    #[test]
    fn dangling_chain_ignored() {
        let lines = vec![
            line(
                0,
                &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)],
            ),
            line(1, &[(1.0, 1.0), (2.0, 2.0), (3.0, 2.0)]),
        ];
        let polygons = assemble_polygons(&lines, 1.0e-9);
        assert_eq!(polygons.len(), 1);
    }

    #[test]
    fn include_test() {
        let square = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        assert!(include(&square, Point2::new(1.0, 1.0)));
        assert!(include(&square, Point2::new(0.1, 1.9)));
        assert!(!include(&square, Point2::new(-0.5, 1.0)));
        assert!(!include(&square, Point2::new(1.0, 2.5)));
    }
}
