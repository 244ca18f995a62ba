//! Seals a small two-layer model cut by one fault and writes the tetgen
//! smesh file plus a triangle-quality report next to it.

use strata_mesh::base::*;
use strata_mesh::GridSurface;
use strata_seal::{FaultOptions, PadExtent, SealFlag, SealedModel};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let extent = 1000.0;
    let steps = 21;
    let layer = |base: f64, relief: f64| -> GridSurface {
        let values = (0..steps * steps)
            .map(|i| {
                let x = (i % steps) as f64 / (steps - 1) as f64;
                let y = (i / steps) as f64 / (steps - 1) as f64;
                base + relief * f64::sin(x * 3.1) * f64::cos(y * 2.3)
            })
            .collect();
        GridSurface {
            values,
            ncol: steps,
            nrow: steps,
            xmin: 0.0,
            ymin: 0.0,
            xmax: extent,
            ymax: extent,
        }
    };

    let mut model = SealedModel::new();
    model.set_sim_seal_flag(SealFlag::On);
    model.add_input_grid_horizon(0, 10.0, &layer(-400.0, 30.0), None)?;
    model.add_input_grid_horizon(1, 25.0, &layer(-700.0, 45.0), None)?;

    // a steep fault striking east-west through the middle of the model
    let fault_rows: Vec<Vec<Point3>> = (0..steps)
        .map(|r| {
            let z = -900.0 + 800.0 * r as f64 / (steps - 1) as f64;
            (0..steps)
                .map(|c| {
                    let x = extent * c as f64 / (steps - 1) as f64;
                    let y = 0.55 * extent + 0.1 * (z + 500.0);
                    Point3::new(x, y, z)
                })
                .collect()
        })
        .collect();
    model.add_input_fault(
        0,
        FaultOptions::default(),
        strata_mesh::grid::grid_trimesh(&fault_rows)?,
    )?;

    model.pad_model(PadExtent::Fractions { xy: 0.1, z: 0.1 }, Some(50.0))?;
    let sealed_lines = model.seal_padded_model()?;
    println!("sealed intersect lines: {sealed_lines}");
    println!("sealed horizons:        {}", model.get_sealed_horizons().len());
    println!("sealed faults:          {}", model.get_sealed_faults().len());

    let out_dir = std::env::temp_dir();
    let smesh = out_dir.join("two-layer-model.smesh");
    let report_path = out_dir.join("two-layer-model-quality.txt");
    model.write_tetgen_smesh_file(&smesh)?;
    let report = model.analyze_sealed_model(Some(report_path.as_path()))?;
    println!(
        "{} triangles, minimum interior angle {:.2} degrees",
        report.total_triangles, report.min_angle_deg
    );
    println!("smesh written to {}", smesh.display());
    Ok(())
}
