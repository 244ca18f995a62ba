use crate::*;

/// Flood-deletes triangles starting from the triangles incident to `seed`,
/// never crossing an edge whose `flag` is nonzero or that is an embedded
/// constraint. Returns the number of triangles deleted.
///
/// Setting `is_constraint` on a boundary-to-be edge before the call is the
/// way to protect everything behind it.
pub fn chew_from_node(mesh: &mut TriMesh, seed: usize) -> usize {
    let adjacency = mesh.node_edge_adjacency();
    let mut stack: Vec<usize> = Vec::new();
    if seed >= mesh.nodes.len() {
        return 0;
    }
    for &e in &adjacency[seed] {
        let edge = &mesh.edges[e];
        if edge.is_barrier() {
            continue;
        }
        for t in edge.tris.into_iter().flatten() {
            stack.push(t);
        }
    }
    let mut visited = vec![false; mesh.tris.len()];
    let mut deleted = 0;
    while let Some(t) = stack.pop() {
        if visited[t] || mesh.tris[t].deleted {
            continue;
        }
        visited[t] = true;
        let edges = mesh.tris[t].edges;
        mesh.delete_triangle(t);
        deleted += 1;
        for e in edges {
            let edge = &mesh.edges[e];
            if edge.is_barrier() {
                continue;
            }
            for n in edge.tris.into_iter().flatten() {
                if !visited[n] {
                    stack.push(n);
                }
            }
        }
    }
    if deleted > 0 {
        log::debug!("chew removed {deleted} triangles from seed node {seed}");
        mesh.mark_borders();
    }
    deleted
}

/// Every unconstrained boundary node within `band` of the topmost boundary
/// z. Disconnected border regions share the top level, so a chew must be
/// seeded from all of them.
pub fn top_boundary_seeds(mesh: &TriMesh, band: f64) -> Vec<usize> {
    boundary_band_seeds(mesh, band, true)
}

/// Every unconstrained boundary node within `band` of the lowest boundary z.
pub fn bottom_boundary_seeds(mesh: &TriMesh, band: f64) -> Vec<usize> {
    boundary_band_seeds(mesh, band, false)
}

fn boundary_band_seeds(mesh: &TriMesh, band: f64, top: bool) -> Vec<usize> {
    let limit = mesh
        .nodes
        .iter()
        .filter(|n| !n.deleted && n.on_border && !n.is_constraint)
        .map(|n| n.point.z)
        .fold(match top {
            true => f64::NEG_INFINITY,
            false => f64::INFINITY,
        }, |acc, z| match top {
            true => f64::max(acc, z),
            false => f64::min(acc, z),
        });
    if !limit.is_finite() {
        return Vec::new();
    }
    mesh.nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| {
            !n.deleted
                && n.on_border
                && !n.is_constraint
                && match top {
                    true => n.point.z >= limit - band,
                    false => n.point.z <= limit + band,
                }
        })
        .map(|(i, _)| i)
        .collect()
}

/// Whether `node` touches only unconstrained edges, so a chew started there
/// will not eat through a barrier it is sitting on.
pub fn on_unconstrained_edge(mesh: &TriMesh, node: usize) -> bool {
    mesh.edges
        .iter()
        .filter(|e| !e.deleted && (e.nodes[0] == node || e.nodes[1] == node))
        .all(|e| !e.is_barrier())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_mesh::GridSurface;

    fn strip() -> TriMesh {
        // a 2 x 5 strip of columns, 8 triangles
        GridSurface {
            values: (0..10).map(|i| (i / 5) as f64).collect(),
            ncol: 5,
            nrow: 2,
            xmin: 0.0,
            ymin: 0.0,
            xmax: 4.0,
            ymax: 1.0,
        }
        .to_trimesh()
        .unwrap()
    }

    #[test]
    fn chew_without_barrier_eats_everything() {
        let mut mesh = strip();
        let n = mesh.num_live_tris();
        let seeds = top_boundary_seeds(&mesh, 0.1);
        assert!(!seeds.is_empty());
        let eaten: usize = seeds
            .into_iter()
            .map(|seed| chew_from_node(&mut mesh, seed))
            .sum();
        assert_eq!(eaten, n);
        assert_eq!(mesh.num_live_tris(), 0);
    }

    #[test]
    fn chew_stops_at_constraint() {
        let mut mesh = strip();
        // wall off the x = 2 column
        let barrier: Vec<usize> = mesh
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                let [a, b] = e.nodes.map(|n| mesh.nodes[n].point);
                (a.x - 2.0).abs() < 1.0e-9 && (b.x - 2.0).abs() < 1.0e-9
            })
            .map(|(i, _)| i)
            .collect();
        assert!(!barrier.is_empty());
        for e in barrier {
            mesh.edges[e].is_constraint = true;
        }
        // seed on the east side
        let seed = mesh
            .nodes
            .iter()
            .position(|n| n.point == Point3::new(4.0, 0.0, 0.0))
            .unwrap();
        let eaten = chew_from_node(&mut mesh, seed);
        assert!(eaten > 0);
        mesh.compact();
        // everything west of the barrier survives
        assert!(mesh.num_live_tris() > 0);
        for t in mesh.live_tris() {
            assert!(mesh.tri_center(t).x < 2.0);
        }
    }
}
