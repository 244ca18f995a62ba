//! Embedding, chewing and clipping working together on one mesh, the way
//! the sealing pipeline drives them.

use strata_meshing::cdt::{clip_to_polygon, embed_constraints, Constraint};
use strata_meshing::chew::{chew_from_node, top_boundary_seeds};
use strata_meshing::prelude::*;

fn terrain(n: usize, extent: f64) -> TriMesh {
    let rows: Vec<Vec<Point3>> = (0..n)
        .map(|r| {
            (0..n)
                .map(|c| {
                    let x = extent * c as f64 / (n - 1) as f64;
                    let y = extent * r as f64 / (n - 1) as f64;
                    Point3::new(x, y, 0.1 * x + 0.05 * y)
                })
                .collect()
        })
        .collect();
    strata_mesh::grid::grid_trimesh(&rows).unwrap()
}

#[test]
fn embed_then_clip_keeps_constraint_boundary() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mesh = terrain(9, 8.0);
    // a closed square constraint strictly inside the mesh
    let ring = Polyline(vec![
        Point3::new(2.0, 2.0, 0.3),
        Point3::new(6.0, 2.0, 0.7),
        Point3::new(6.0, 6.0, 0.9),
        Point3::new(2.0, 6.0, 0.5),
        Point3::new(2.0, 2.0, 0.3),
    ]);
    let out = embed_constraints(&mesh, &[Constraint::plain(ring.clone(), 1)], None, 0.01).unwrap();
    for &pt in ring.iter().take(4) {
        assert!(
            out.nodes.iter().any(|n| n.point == pt),
            "constraint corner {pt:?} missing"
        );
    }
    let polygon: Vec<Point2> = ring
        .iter()
        .take(4)
        .map(|p| Point2::new(p.x, p.y))
        .collect();
    let mut clipped = out.clone();
    clip_to_polygon(&mut clipped, &polygon);
    assert!(clipped.num_live_tris() > 0);
    assert!(clipped.num_live_tris() < out.num_live_tris());
    // after clipping, the boundary is the embedded ring
    for e in clipped.boundary_edges().collect::<Vec<_>>() {
        for n in clipped.edges[e].nodes {
            let pt = clipped.nodes[n].point;
            let on_ring = (pt.x - 2.0).abs() < 1.0e-9
                || (pt.x - 6.0).abs() < 1.0e-9
                || (pt.y - 2.0).abs() < 1.0e-9
                || (pt.y - 6.0).abs() < 1.0e-9;
            assert!(on_ring, "boundary node off the ring: {pt:?}");
        }
    }
}

#[test]
fn chew_respects_embedded_barrier() {
    let mesh = terrain(9, 8.0);
    // a horizontal barrier across the whole mesh
    let barrier = Polyline(vec![
        Point3::new(0.0, 5.0, 0.25),
        Point3::new(8.0, 5.0, 1.05),
    ]);
    let mut out =
        embed_constraints(&mesh, &[Constraint::plain(barrier, 7)], None, 0.01).unwrap();
    // seed from the high-y side and eat up to the barrier
    let seeds: Vec<usize> = top_boundary_seeds(&out, 0.5)
        .into_iter()
        .filter(|&n| out.nodes[n].point.y > 5.0)
        .collect();
    let before = out.num_live_tris();
    let mut eaten = 0;
    for seed in seeds {
        eaten += chew_from_node(&mut out, seed);
    }
    assert!(eaten > 0);
    out.compact();
    assert!(out.num_live_tris() < before);
    for t in out.live_tris() {
        let c = out.tri_center(t);
        assert!(c.y < 5.0, "triangle survived beyond the barrier: {c:?}");
    }
}
