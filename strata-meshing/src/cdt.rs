use crate::*;
use array_macro::array;
use rustc_hash::FxHashMap as HashMap;
use spade::handles::FixedVertexHandle;
use spade::{ConstrainedDelaunayTriangulation, Triangulation};
use strata_mesh::errors::Error;

type SPoint2 = spade::Point2<f64>;
type Cdt = ConstrainedDelaunayTriangulation<SPoint2>;
type Result<T> = std::result::Result<T, Error>;

/// A polyline to embed exactly into a triangulation.
#[derive(Clone, Debug)]
pub struct Constraint {
    /// the exact points the mesh must adhere to
    pub points: Polyline,
    /// id recorded on the resulting constraint edges
    pub line_id: i64,
    /// constraint class recorded on the resulting edges
    pub flag: i32,
}

impl Constraint {
    /// a plain constraint with no special class
    pub fn plain(points: Polyline, line_id: i64) -> Constraint {
        Constraint {
            points,
            line_id,
            flag: 0,
        }
    }
}

fn spade_round(x: f64) -> f64 {
    match f64::abs(x) < spade::MIN_ALLOWED_VALUE {
        true => 0.0,
        false => x,
    }
}

/// Re-triangulates `mesh` with every `constraints` polyline embedded
/// exactly: mesh edges are forced to lie along the polylines, whose vertex
/// positions survive bit for bit.
///
/// Triangulation happens in the xy of `baseline`'s frame when one is given,
/// so near-vertical surfaces stay single-valued. Constraint points override
/// coincident mesh points, and edges on a polyline come back with
/// `is_constraint` set and the polyline's id and flag. `tol` bounds the
/// edge-to-polyline distance used for that attribution.
pub fn embed_constraints(
    mesh: &TriMesh,
    constraints: &[Constraint],
    baseline: Option<&Baseline>,
    tol: f64,
) -> Result<TriMesh> {
    let to_frame = |pt: Point3| baseline.map_or(pt, |b| b.to_frame(pt));
    let mut cdt = Cdt::new();
    let mut position_map: HashMap<FixedVertexHandle, Point3> = HashMap::default();
    for pt in mesh.live_points() {
        let fpt = to_frame(pt);
        match cdt.insert(SPoint2::new(spade_round(fpt.x), spade_round(fpt.y))) {
            Ok(handle) => {
                position_map.entry(handle).or_insert(fpt);
            }
            Err(_) => log::debug!("dropped unrepresentable mesh point {fpt:?}"),
        }
    }
    for constraint in constraints {
        let mut handles: Vec<Option<FixedVertexHandle>> =
            Vec::with_capacity(constraint.points.len());
        for &pt in constraint.points.iter() {
            let fpt = to_frame(pt);
            match cdt.insert(SPoint2::new(spade_round(fpt.x), spade_round(fpt.y))) {
                Ok(handle) => {
                    // the constraint position wins over a coincident mesh node
                    position_map.insert(handle, fpt);
                    handles.push(Some(handle));
                }
                Err(_) => handles.push(None),
            }
        }
        for pair in handles.windows(2) {
            if let [Some(a), Some(b)] = *pair {
                if a != b && cdt.can_add_constraint(a, b) {
                    cdt.add_constraint(a, b);
                } else if a != b {
                    log::debug!("constraint edge skipped on line {}", constraint.line_id);
                }
            }
        }
    }

    let mut vmap: HashMap<FixedVertexHandle, usize> = HashMap::default();
    let mut points: Vec<Point3> = Vec::with_capacity(cdt.num_vertices());
    for (i, vertex) in cdt.vertices().enumerate() {
        let p = *vertex.as_ref();
        let fpt = position_map
            .get(&vertex.fix())
            .copied()
            .unwrap_or_else(|| Point3::new(p.x, p.y, 0.0));
        points.push(fpt);
        vmap.insert(vertex.fix(), i);
    }
    let faces: Vec<[usize; 3]> = cdt
        .inner_faces()
        .map(|face| {
            let vs = face.vertices();
            array![i => vmap[&vs[i].fix()]; 3]
        })
        .collect();
    let mut out = TriMesh::from_triangles(points, &faces)?;

    let mut edge_map: HashMap<(usize, usize), usize> = HashMap::default();
    for (e, edge) in out.edges.iter().enumerate() {
        let [n0, n1] = edge.nodes;
        edge_map.insert((usize::min(n0, n1), usize::max(n0, n1)), e);
    }
    // attribution compares in the frame's map view: constraint z and mesh z
    // may legitimately differ between polyline vertices
    let flatten = |pt: Point3| Point3::new(pt.x, pt.y, 0.0);
    let frame_lines: Vec<Polyline> = constraints
        .iter()
        .map(|c| c.points.iter().map(|&pt| flatten(to_frame(pt))).collect())
        .collect();
    let attribution_tol = f64::max(tol, TOLERANCE);
    for edge in cdt.undirected_edges() {
        if !cdt.is_constraint_edge(edge.fix()) {
            continue;
        }
        let [a, b] = edge.vertices();
        let (Some(&na), Some(&nb)) = (vmap.get(&a.fix()), vmap.get(&b.fix())) else {
            continue;
        };
        let Some(&e) = edge_map.get(&(usize::min(na, nb), usize::max(na, nb))) else {
            continue;
        };
        out.edges[e].is_constraint = true;
        out.nodes[na].is_constraint = true;
        out.nodes[nb].is_constraint = true;
        let (pa, pb) = (out.nodes[na].point, out.nodes[nb].point);
        let mid = flatten(pa + (pb - pa) / 2.0);
        let owner = frame_lines
            .iter()
            .enumerate()
            .map(|(i, line)| (i, line.distance_to_point(mid)))
            .filter(|&(_, dist)| dist <= attribution_tol)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Greater));
        if let Some((i, _)) = owner {
            out.edges[e].line_id = Some(constraints[i].line_id);
            out.edges[e].flag = constraints[i].flag;
        }
    }

    if let Some(baseline) = baseline {
        out.apply(|pt| baseline.from_frame(pt));
    }
    Ok(out)
}

/// Deletes every triangle whose centroid falls outside `polygon` (in map
/// view of the current coordinates) and compacts the mesh.
pub fn clip_to_polygon(mesh: &mut TriMesh, polygon: &[Point2]) {
    let doomed: Vec<usize> = mesh
        .live_tris()
        .filter(|&t| {
            let c = mesh.tri_center(t);
            !crate::polygonize::include(polygon, Point2::new(c.x, c.y))
        })
        .collect();
    for t in doomed {
        mesh.delete_triangle(t);
    }
    mesh.compact();
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_mesh::GridSurface;

    fn flat_grid(n: usize, extent: f64) -> TriMesh {
        GridSurface {
            values: vec![0.0; n * n],
            ncol: n,
            nrow: n,
            xmin: 0.0,
            ymin: 0.0,
            xmax: extent,
            ymax: extent,
        }
        .to_trimesh()
        .unwrap()
    }

    #[test]
    fn embedded_line_appears_exactly() {
        let mesh = flat_grid(5, 4.0);
        let line = Polyline(vec![
            Point3::new(0.0, 2.0, 1.0),
            Point3::new(4.0, 2.0, 1.0),
        ]);
        let out = embed_constraints(&mesh, &[Constraint::plain(line, 42)], None, 0.01).unwrap();
        let constrained: Vec<usize> = out
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_constraint)
            .map(|(i, _)| i)
            .collect();
        assert!(!constrained.is_empty());
        for &e in &constrained {
            assert_eq!(out.edges[e].line_id, Some(42));
            for n in out.edges[e].nodes {
                assert!((out.nodes[n].point.y - 2.0).abs() < 1.0e-12);
            }
        }
        // the exact constraint endpoint positions survive, z included
        assert!(out
            .nodes
            .iter()
            .any(|n| n.point == Point3::new(0.0, 2.0, 1.0)));
        assert!(out
            .nodes
            .iter()
            .any(|n| n.point == Point3::new(4.0, 2.0, 1.0)));
    }

    #[test]
    fn embed_in_steep_frame() {
        // a vertical wall in the y = 1 plane; xy triangulation would collapse
        let rows: Vec<Vec<Point3>> = (0..4)
            .map(|r| {
                (0..4)
                    .map(|c| Point3::new(c as f64, 1.0, r as f64))
                    .collect()
            })
            .collect();
        let wall = strata_mesh::grid::grid_trimesh(&rows).unwrap();
        let baseline = Baseline::new(Vector3::unit_y(), Point3::new(1.5, 1.0, 1.5));
        let line = Polyline(vec![
            Point3::new(0.0, 1.0, 1.5),
            Point3::new(3.0, 1.0, 1.5),
        ]);
        let out =
            embed_constraints(&wall, &[Constraint::plain(line, 7)], Some(&baseline), 0.01)
                .unwrap();
        assert!(out.num_live_tris() > 0);
        assert!(out.edges.iter().any(|e| e.is_constraint));
        // all nodes are back on the wall plane
        for node in &out.nodes {
            assert!((node.point.y - 1.0).abs() < 1.0e-9);
        }
    }

    #[test]
    fn clip_keeps_inside() {
        let mut mesh = flat_grid(5, 4.0);
        let polygon = [
            Point2::new(0.9, 0.9),
            Point2::new(3.1, 0.9),
            Point2::new(3.1, 3.1),
            Point2::new(0.9, 3.1),
        ];
        let before = mesh.num_live_tris();
        clip_to_polygon(&mut mesh, &polygon);
        assert!(mesh.num_live_tris() > 0);
        assert!(mesh.num_live_tris() < before);
        for t in mesh.live_tris() {
            let c = mesh.tri_center(t);
            assert!(c.x > 0.8 && c.x < 3.2 && c.y > 0.8 && c.y < 3.2);
        }
    }
}
