use crate::errors::Error;
use crate::*;
use rustc_hash::FxHashMap as HashMap;
use std::io::Write;
use std::path::Path;

/// Quality statistics over every sealed triangle.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshQualityReport {
    /// smallest interior angle of any sealed triangle, degrees
    pub min_angle_deg: f64,
    /// counts of triangles by minimum interior angle, in 6-degree buckets
    /// from 0 to 60
    pub histogram: [usize; 10],
    /// total sealed triangles
    pub total_triangles: usize,
}

/// Deduplicates nodes across sealed meshes through a 3-D bucket grid.
struct NodeMerger {
    cells: HashMap<[i64; 3], Vec<usize>>,
    cell_size: f64,
    tiny: f64,
    nodes: Vec<Point3>,
    marks: Vec<i32>,
}

impl NodeMerger {
    fn new(cell_size: f64, tiny: f64) -> NodeMerger {
        NodeMerger {
            cells: HashMap::default(),
            cell_size: f64::max(cell_size, tiny * 4.0),
            tiny,
            nodes: Vec::new(),
            marks: Vec::new(),
        }
    }

    fn cell_of(&self, pt: Point3) -> [i64; 3] {
        [
            (pt.x / self.cell_size).floor() as i64,
            (pt.y / self.cell_size).floor() as i64,
            (pt.z / self.cell_size).floor() as i64,
        ]
    }

    /// the exported id for `pt`, reusing any node within the tiny distance
    fn intern(&mut self, pt: Point3, mark: i32) -> usize {
        let center = self.cell_of(pt);
        for dx in -1..=1_i64 {
            for dy in -1..=1_i64 {
                for dz in -1..=1_i64 {
                    let key = [center[0] + dx, center[1] + dy, center[2] + dz];
                    let Some(bucket) = self.cells.get(&key) else {
                        continue;
                    };
                    for &existing in bucket {
                        if same_point(self.nodes[existing], pt, self.tiny) {
                            return existing;
                        }
                    }
                }
            }
        }
        let id = self.nodes.len();
        self.nodes.push(pt);
        self.marks.push(mark);
        self.cells.entry(center).or_default().push(id);
        id
    }
}

impl SealedModel {
    /// Every sealed mesh that contributes facets, in export order.
    fn sealed_roster(&self) -> Vec<&Surface> {
        let mut out: Vec<&Surface> = Vec::new();
        out.extend(self.sealed_horizons.iter());
        out.extend(self.sealed_sediment.iter());
        out.extend(self.sealed_bottom.iter());
        out.extend(self.sealed_faults.iter());
        if let Some(boundaries) = &self.embedded_boundaries {
            out.extend(boundaries.iter());
        }
        if self.sim_output_flag {
            out.extend(self.sealed_top_default.iter());
            out.extend(self.sealed_bottom_default.iter());
        }
        out.extend(self.sealed_detachment.iter());
        out
    }

    /// Walks every sealed mesh, unifies coincident nodes, and emits the
    /// node and facet arrays for a tetrahedral mesher. The returned arrays
    /// belong to the caller.
    pub fn create_tetgen_input(&self) -> Result<TetgenInput> {
        let roster = self.sealed_roster();
        if roster.is_empty() {
            return Err(Error::NotSealed);
        }
        let cell = match self.average_spacing > 0.0 {
            true => self.average_spacing,
            false => 1.0,
        };
        let tiny = match self.model_tiny > 0.0 {
            true => self.model_tiny,
            false => 1.0e-9,
        };
        let mut merger = NodeMerger::new(cell, tiny);
        let mut facets: Vec<[usize; 3]> = Vec::new();
        let mut facet_marks: Vec<i32> = Vec::new();
        for (ordinal, surface) in roster.iter().enumerate() {
            let mark = ordinal as i32;
            let interior_fault = surface.kind().is_fault() && !surface.sealed_to_sides;
            let mut node_ids: HashMap<usize, usize> = HashMap::default();
            for t in surface.mesh.live_tris() {
                let tri_nodes = surface.mesh.tri_nodes(t);
                let mut ids = [0_usize; 3];
                for (slot, &n) in ids.iter_mut().zip(tri_nodes.iter()) {
                    let id = match node_ids.get(&n) {
                        Some(&id) => id,
                        None => {
                            let id = merger.intern(surface.mesh.nodes[n].point, mark);
                            node_ids.insert(n, id);
                            id
                        }
                    };
                    *slot = id;
                }
                if ids[0] == ids[1] || ids[1] == ids[2] || ids[0] == ids[2] {
                    // the merge collapsed this facet
                    continue;
                }
                let on_free_border = interior_fault
                    && surface.mesh.tris[t]
                        .edges
                        .iter()
                        .any(|&e| surface.mesh.edges[e].is_boundary());
                facets.push(ids);
                facet_marks.push(match on_free_border {
                    true => INTERIOR_FAULT_FACET_MARK,
                    false => mark,
                });
            }
        }
        Ok(TetgenInput {
            nodes: merger.nodes,
            node_marks: merger.marks,
            facets,
            facet_marks,
        })
    }

    /// Writes the sealed model as a tetgen smesh text file.
    pub fn write_tetgen_smesh_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let input = self.create_tetgen_input()?;
        let file = std::fs::File::create(path)?;
        strata_mesh::smesh::write(&input, file)?;
        Ok(())
    }

    /// Measures the minimum interior angle and the angle histogram over
    /// every sealed triangle, optionally writing a text report.
    pub fn analyze_sealed_model(&self, path: Option<&Path>) -> Result<MeshQualityReport> {
        let roster = self.sealed_roster();
        if roster.is_empty() {
            return Err(Error::NotSealed);
        }
        let mut report = MeshQualityReport {
            min_angle_deg: f64::INFINITY,
            histogram: [0; 10],
            total_triangles: 0,
        };
        for surface in roster {
            for t in surface.mesh.live_tris() {
                let angle = min_interior_angle_deg(surface.mesh.tri_points(t));
                report.min_angle_deg = f64::min(report.min_angle_deg, angle);
                let bucket = usize::min((angle / 6.0) as usize, 9);
                report.histogram[bucket] += 1;
                report.total_triangles += 1;
            }
        }
        if report.total_triangles == 0 {
            report.min_angle_deg = 0.0;
        }
        if let Some(path) = path {
            let mut file = std::fs::File::create(path)?;
            writeln!(file, "sealed model triangle quality")?;
            writeln!(file, "triangles: {}", report.total_triangles)?;
            writeln!(file, "minimum interior angle: {:.4} degrees", report.min_angle_deg)?;
            for (i, count) in report.histogram.iter().enumerate() {
                writeln!(file, "{:2} - {:2} degrees: {}", i * 6, (i + 1) * 6, count)?;
            }
        }
        Ok(report)
    }
}

/// the smallest interior angle of a triangle, in degrees
pub(crate) fn min_interior_angle_deg(tri: [Point3; 3]) -> f64 {
    let mut min_angle = f64::INFINITY;
    for i in 0..3 {
        let a = tri[i];
        let b = tri[(i + 1) % 3];
        let c = tri[(i + 2) % 3];
        let u = b - a;
        let v = c - a;
        let (lu, lv) = (u.magnitude(), v.magnitude());
        if lu == 0.0 || lv == 0.0 {
            return 0.0;
        }
        let cos = f64::clamp(u.dot(v) / (lu * lv), -1.0, 1.0);
        min_angle = f64::min(min_angle, cos.acos().to_degrees());
    }
    min_angle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merger_unifies_close_nodes() {
        let mut merger = NodeMerger::new(1.0, 1.0e-6);
        let a = merger.intern(Point3::new(0.0, 0.0, 0.0), 0);
        let b = merger.intern(Point3::new(0.0, 0.0, 1.0e-8), 1);
        let c = merger.intern(Point3::new(0.5, 0.0, 0.0), 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(merger.nodes.len(), 2);
        // the first contributor's mark wins
        assert_eq!(merger.marks[0], 0);
    }

    #[test]
    fn merger_catches_cell_straddlers() {
        let mut merger = NodeMerger::new(1.0, 1.0e-6);
        let a = merger.intern(Point3::new(1.0 - 1.0e-9, 0.5, 0.5), 0);
        let b = merger.intern(Point3::new(1.0 + 1.0e-9, 0.5, 0.5), 0);
        assert_eq!(a, b);
    }

    #[test]
    fn angles_of_known_triangles() {
        let right = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        assert!((min_interior_angle_deg(right) - 45.0).abs() < 1.0e-9);
        let equilateral = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, f64::sqrt(3.0) / 2.0, 0.0),
        ];
        assert!((min_interior_angle_deg(equilateral) - 60.0).abs() < 1.0e-9);
    }
}
