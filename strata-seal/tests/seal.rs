use strata_mesh::base::*;
use strata_mesh::{surface, GridSurface, TriMesh};
use strata_seal::{FaultOptions, PadExtent, SealFlag, SealedModel};

fn flat_horizon(z: f64, extent: f64, steps: usize) -> TriMesh {
    GridSurface {
        values: vec![z; steps * steps],
        ncol: steps,
        nrow: steps,
        xmin: 0.0,
        ymin: 0.0,
        xmax: extent,
        ymax: extent,
    }
    .to_trimesh()
    .unwrap()
}

fn vertical_fault_y(y: f64, extent: f64, zmax: f64, steps: usize) -> TriMesh {
    let rows: Vec<Vec<Point3>> = (0..steps)
        .map(|r| {
            let z = zmax * r as f64 / (steps - 1) as f64;
            (0..steps)
                .map(|c| {
                    let x = extent * c as f64 / (steps - 1) as f64;
                    Point3::new(x, y, z)
                })
                .collect()
        })
        .collect();
    strata_mesh::grid::grid_trimesh(&rows).unwrap()
}

fn mesh_has_exact_point(mesh: &TriMesh, pt: Point3) -> bool {
    mesh.nodes.iter().any(|n| !n.deleted && n.point == pt)
}

fn pad_xy(model: &SealedModel) -> (f64, f64, f64, f64) {
    let walls = model.get_shallow_boundary_copies();
    let mut bounds = BoundingBox::new();
    for wall in walls {
        bounds.extend(wall.mesh.live_points());
    }
    let (min, max) = (bounds.min(), bounds.max());
    (min.x, max.x, min.y, max.y)
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn two_horizons_seal_to_walls() {
    init_logger();
    let mut model = SealedModel::new();
    model.set_sim_seal_flag(SealFlag::On);
    model.add_input_horizon(0, 10.0, flat_horizon(2.0, 10.0, 6)).unwrap();
    model.add_input_horizon(1, 20.0, flat_horizon(8.0, 10.0, 6)).unwrap();
    model
        .pad_model(PadExtent::Fractions { xy: 0.1, z: 0.1 }, Some(2.0))
        .unwrap();
    assert_eq!(model.get_padded_horizons().len(), 2);
    assert_eq!(model.get_shallow_boundary_copies().len(), 4);
    let (top, bottom) = model.get_padded_top_and_bottom();
    assert!(top.is_some() && bottom.is_some());

    let sealed_lines = model.seal_padded_model().unwrap();
    // each horizon meets each of the four walls exactly once
    assert_eq!(sealed_lines, 8);
    let sealed = model.get_sealed_horizons();
    assert_eq!(sealed.len(), 2);

    let (xmin, xmax, ymin, ymax) = pad_xy(&model);
    let tol = 1.0e-6;
    for surface in sealed {
        assert!(surface.mesh.num_live_tris() > 0);
        assert!(surface.is_sealed);
        // every boundary edge of a sealed horizon lies on the pad box
        for e in surface.mesh.boundary_edges() {
            for n in surface.mesh.edges[e].nodes {
                let pt = surface.mesh.nodes[n].point;
                let on_box = (pt.x - xmin).abs() < tol
                    || (pt.x - xmax).abs() < tol
                    || (pt.y - ymin).abs() < tol
                    || (pt.y - ymax).abs() < tol;
                assert!(on_box, "boundary node off the pad box: {pt:?}");
            }
        }
    }

    // shared polylines are bit-identical on both incident surfaces
    let walls = model.get_shallow_boundary_copies();
    for line in model.get_horizon_intersection_lines() {
        let owner = sealed
            .iter()
            .find(|s| s.id == line.surf1)
            .expect("sealed horizon for intersect line");
        for &pt in line.points.iter() {
            assert!(
                mesh_has_exact_point(&owner.mesh, pt),
                "horizon {} misses sealed intersect point {pt:?}",
                owner.id
            );
        }
        if let Some(wall) = walls.iter().find(|w| w.id == line.surf2) {
            for &pt in line.points.iter() {
                assert!(
                    mesh_has_exact_point(&wall.mesh, pt),
                    "wall {} misses sealed intersect point {pt:?}",
                    wall.id
                );
            }
        }
    }
}

#[test]
fn tetgen_export_is_clean_and_deterministic() {
    let mut model = SealedModel::new();
    model.set_sim_seal_flag(SealFlag::On);
    model.add_input_horizon(0, 10.0, flat_horizon(3.0, 10.0, 6)).unwrap();
    model
        .pad_model(PadExtent::Fractions { xy: 0.1, z: 0.2 }, Some(2.5))
        .unwrap();
    model.seal_padded_model().unwrap();

    let input = model.create_tetgen_input().unwrap();
    assert!(input.indices_in_range());
    assert!(!input.nodes.is_empty());
    assert_eq!(input.nodes.len(), input.node_marks.len());
    assert_eq!(input.facets.len(), input.facet_marks.len());
    // no two exported nodes coincide
    for i in 0..input.nodes.len() {
        for j in (i + 1)..input.nodes.len() {
            assert!(
                input.nodes[i].distance(input.nodes[j]) > 1.0e-9,
                "duplicate exported nodes {i} and {j}"
            );
        }
    }

    let mut first = Vec::new();
    let mut second = Vec::new();
    strata_mesh::smesh::write(&input, &mut first).unwrap();
    let again = model.create_tetgen_input().unwrap();
    strata_mesh::smesh::write(&again, &mut second).unwrap();
    assert_eq!(first, second);

    let report = model.analyze_sealed_model(None).unwrap();
    assert_eq!(
        report.histogram.iter().sum::<usize>(),
        report.total_triangles
    );
    assert!(report.min_angle_deg > 0.0);
    assert!(report.min_angle_deg <= 60.0);
}

#[test]
fn fault_cuts_horizon_and_shares_its_curve() {
    init_logger();
    let mut model = SealedModel::new();
    model.add_input_horizon(0, 10.0, flat_horizon(5.0, 10.0, 11)).unwrap();
    model
        .add_input_fault(0, FaultOptions::default(), vertical_fault_y(5.0, 10.0, 10.0, 11))
        .unwrap();
    model
        .pad_model(PadExtent::Fractions { xy: 0.1, z: 0.1 }, Some(1.0))
        .unwrap();
    assert_eq!(model.get_padded_faults().len(), 1);
    let fault_id = model.get_padded_faults()[0].id;
    assert!(fault_id >= surface::FAULT_ID_BASE);

    model.seal_padded_model().unwrap();
    let line = model
        .get_horizon_intersection_lines()
        .iter()
        .find(|line| line.surf2 == fault_id)
        .expect("a sealed horizon-fault intersect");
    let length: f64 = line
        .points
        .windows(2)
        .map(|w| w[0].distance(w[1]))
        .sum();
    assert!(length >= 10.0, "intersect too short: {length}");
    for pt in line.points.iter() {
        assert!((pt.y - 5.0).abs() < 1.0e-6, "off the fault plane: {pt:?}");
        assert!((pt.z - 5.0).abs() < 1.0e-6, "off the horizon: {pt:?}");
    }

    let horizon = &model.get_sealed_horizons()[0];
    let fault = model
        .get_sealed_faults()
        .iter()
        .find(|f| f.id == fault_id)
        .unwrap();
    assert!(fault.mesh.num_live_tris() > 0);
    for &pt in line.points.iter() {
        assert!(mesh_has_exact_point(&horizon.mesh, pt));
        assert!(mesh_has_exact_point(&fault.mesh, pt));
    }
}

#[test]
fn parallel_faults_do_not_intersect_each_other() {
    let mut model = SealedModel::new();
    model.add_input_horizon(0, 10.0, flat_horizon(5.0, 10.0, 6)).unwrap();
    model
        .add_input_fault(0, FaultOptions::default(), vertical_fault_y(3.0, 10.0, 10.0, 6))
        .unwrap();
    model
        .add_input_fault(1, FaultOptions::default(), vertical_fault_y(7.0, 10.0, 10.0, 6))
        .unwrap();
    model
        .pad_model(PadExtent::Fractions { xy: 0.1, z: 0.1 }, Some(2.0))
        .unwrap();
    let ids: Vec<i64> = model.get_padded_faults().iter().map(|f| f.id).collect();
    model.seal_padded_model().unwrap();
    let crossing = model
        .get_fault_intersection_lines()
        .iter()
        .any(|line| line.uses_surface(ids[0]) && line.uses_surface(ids[1]));
    assert!(!crossing, "parallel faults must not intersect");
    assert_eq!(model.get_sealed_faults().len(), 2);
    assert!(model.get_sealed_horizons()[0].mesh.num_live_nodes() > 0);
}

#[test]
fn faults_seal_down_to_detachment() {
    let mut model = SealedModel::new();
    for (i, y) in [2.0, 5.0, 8.0].into_iter().enumerate() {
        model
            .add_input_fault(
                i as i64,
                FaultOptions::default(),
                vertical_fault_y(y, 10.0, 10.0, 6),
            )
            .unwrap();
    }
    model.add_input_horizon(0, 10.0, flat_horizon(6.0, 10.0, 6)).unwrap();
    // a flat detachment well below the horizon
    model
        .add_input_detachment(0, flat_horizon(2.0, 10.0, 6))
        .unwrap();
    model
        .pad_model(PadExtent::Fractions { xy: 0.1, z: 0.1 }, Some(2.0))
        .unwrap();
    model.seal_faults_to_detachment().unwrap();

    let detachment = model.get_sealed_detachment().expect("sealed detachment");
    assert!(detachment.mesh.num_live_tris() > 0);
    let sealed = model.get_sealed_faults();
    assert_eq!(sealed.len(), 3);
    for fault in sealed {
        let contact = fault
            .detachment_line
            .as_ref()
            .expect("detachment contact line");
        assert!(contact.len() >= 2);
        for &pt in contact.iter() {
            assert!((pt.z - 2.0).abs() < 1.0e-6);
            assert!(mesh_has_exact_point(&fault.mesh, pt));
            assert!(mesh_has_exact_point(&detachment.mesh, pt));
        }
        // everything below the detachment was chewed away
        let (zmin, _) = fault.mesh.z_range();
        assert!(zmin > 2.0 - 1.0e-6, "fault dips below detachment: {zmin}");
    }
}

#[test]
fn accessors_before_sealing_are_empty() {
    let mut model = SealedModel::new();
    assert!(model.get_sealed_horizons().is_empty());
    assert!(model.get_raw_intersection_lines().is_empty());
    assert!(model.create_tetgen_input().is_err());
    assert!(model.pad_model(PadExtent::Fractions { xy: 0.1, z: 0.1 }, None).is_err());
    assert!(model.seal_padded_model().is_err());

    // a padded but unsealable model still exposes its padded state
    model.add_input_horizon(0, 1.0, flat_horizon(1.0, 4.0, 4)).unwrap();
    model
        .pad_model(PadExtent::Fractions { xy: 0.1, z: 0.5 }, Some(1.0))
        .unwrap();
    assert_eq!(model.get_input_horizons().len(), 1);
    assert_eq!(model.get_padded_horizons().len(), 1);
    assert!(model.get_padded_horizons()[0].is_padded);
}
