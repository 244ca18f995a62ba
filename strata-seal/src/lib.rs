//! Seals a three-dimensional geological model of triangulated surfaces into
//! a watertight assembly ready for tetrahedralization.
//!
//! The pipeline pads every surface to a common box with four vertical walls,
//! computes exact polyline intersections between interacting surfaces,
//! reconciles shared endpoints, crops every horizon to its sealed outline,
//! embeds the shared polylines into faults and walls, and exports
//! deduplicated node and facet arrays.

#![cfg_attr(not(debug_assertions), deny(warnings))]
#![deny(clippy::all, rust_2018_idioms)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

use serde::{Deserialize, Serialize};
use strata_meshing::prelude::*;

mod embed;
/// Defines errors
pub mod errors;
mod iline;
mod intersect;
mod outline;
mod padding;
mod sealed_intersects;
mod splice;
mod tetgen;

pub use iline::*;
pub use padding::PadExtent;
pub use tetgen::MeshQualityReport;

use errors::Error;
type Result<T> = std::result::Result<T, Error>;

/// Automatic-seal switch: `On` synthesizes a default top and bottom,
/// embeds the boundary lines, and reconciles the wall corners; `Lock`
/// latches `On` against later changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SealFlag {
    /// leave the walls untouched
    Off,
    /// seal the vertical walls too
    On,
    /// seal the walls and refuse later `Off`
    Lock,
}

/// Per-fault input options.
#[derive(Clone, Debug, Default)]
pub struct FaultOptions {
    /// best-fit plane, fitted from the nodes when absent
    pub baseline: Option<Baseline>,
    /// minimum age the fault cuts
    pub minage: f64,
    /// maximum age the fault cuts
    pub maxage: f64,
    /// contact polyline where the fault meets its detachment
    pub detachment_line: Option<Polyline>,
    /// id of the detachment the fault soles into
    pub detach_id: i64,
}

/// The four vertical walls of the pad box.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Boundaries {
    /// wall at the maximum y
    pub north: Surface,
    /// wall at the minimum y
    pub south: Surface,
    /// wall at the maximum x
    pub east: Surface,
    /// wall at the minimum x
    pub west: Surface,
}

impl Boundaries {
    /// the walls in id order
    pub fn iter(&self) -> impl Iterator<Item = &Surface> {
        [&self.north, &self.south, &self.east, &self.west].into_iter()
    }

    /// the wall on `side`
    pub fn side(&self, side: Side) -> &Surface {
        match side {
            Side::North => &self.north,
            Side::South => &self.south,
            Side::East => &self.east,
            Side::West => &self.west,
        }
    }

    pub(crate) fn side_mut(&mut self, side: Side) -> &mut Surface {
        match side {
            Side::North => &mut self.north,
            Side::South => &mut self.south,
            Side::East => &mut self.east,
            Side::West => &mut self.west,
        }
    }
}

/// One sealing run over one set of input surfaces.
///
/// Inputs are added first, then [`SealedModel::pad_model`] and
/// [`SealedModel::seal_padded_model`] run the pipeline; accessors hand out
/// whatever sealed state exists. The struct is single-threaded and holds no
/// state beyond the run.
#[derive(Debug, Default)]
pub struct SealedModel {
    pub(crate) average_spacing: f64,
    pub(crate) sim_seal_flag: bool,
    pub(crate) seal_flag_locked: bool,
    pub(crate) sim_output_flag: bool,
    pub(crate) margin_fraction: f64,

    pub(crate) input_horizons: Vec<Surface>,
    pub(crate) input_faults: Vec<Surface>,
    pub(crate) input_detachments: Vec<Surface>,
    pub(crate) input_sediment: Option<Surface>,
    pub(crate) input_bottom: Option<Surface>,

    pub(crate) model_box: Option<BoundingBox<Point3>>,
    pub(crate) pad_box: Option<BoundingBox<Point3>>,
    pub(crate) model_tiny: f64,
    pub(crate) graze_distance: f64,

    pub(crate) padded_horizons: Vec<Surface>,
    pub(crate) padded_faults: Vec<Surface>,
    pub(crate) padded_sediment: Option<Surface>,
    pub(crate) padded_bottom: Option<Surface>,
    pub(crate) padded_top_default: Option<Surface>,
    pub(crate) padded_bottom_default: Option<Surface>,
    pub(crate) padded_detachment: Option<Surface>,
    pub(crate) boundaries: Option<Boundaries>,

    pub(crate) intersection_lines: Vec<IntersectionLine>,
    pub(crate) fault_horizon_lines: Vec<IntersectionLine>,

    pub(crate) horizon_outlines: Vec<Outline>,
    pub(crate) sealed_horizon_intersects: Vec<IntersectionLine>,
    pub(crate) sealed_fault_intersects: Vec<IntersectionLine>,
    pub(crate) sealed_top_bottom_intersects: Vec<IntersectionLine>,

    pub(crate) sealed_horizons: Vec<Surface>,
    pub(crate) sealed_faults: Vec<Surface>,
    pub(crate) sealed_sediment: Option<Surface>,
    pub(crate) sealed_bottom: Option<Surface>,
    pub(crate) sealed_top_default: Option<Surface>,
    pub(crate) sealed_bottom_default: Option<Surface>,
    pub(crate) sealed_detachment: Option<Surface>,
    pub(crate) embedded_boundaries: Option<Boundaries>,
}

impl SealedModel {
    /// Creates an empty model.
    pub fn new() -> SealedModel { SealedModel::default() }

    /// Sets the default density for resampling, padding and index cells.
    pub fn set_average_spacing(&mut self, spacing: f64) {
        if spacing > 0.0 {
            self.average_spacing = spacing;
        }
    }

    /// the configured or derived spacing
    pub fn average_spacing(&self) -> f64 { self.average_spacing }

    /// Switches the automatic top/bottom synthesis, boundary embedding and
    /// corner fixup.
    pub fn set_sim_seal_flag(&mut self, flag: SealFlag) {
        match flag {
            SealFlag::Lock => {
                self.sim_seal_flag = true;
                self.seal_flag_locked = true;
            }
            SealFlag::On => self.sim_seal_flag = true,
            SealFlag::Off => {
                if !self.seal_flag_locked {
                    self.sim_seal_flag = false;
                }
            }
        }
    }

    /// Whether the walls are sealed too.
    pub fn sim_seal_flag(&self) -> bool { self.sim_seal_flag }

    /// Switches emission of the sealed top and bottom and the deeper corner
    /// reconciliation.
    pub fn set_sim_output_flag(&mut self, flag: bool) { self.sim_output_flag = flag; }

    /// Sets the proportional expansion of the pad box. Values are clamped
    /// to `0.001..=100`; fractions above `0.05` imply the output flag.
    pub fn set_margin_fraction(&mut self, fraction: f64) {
        self.margin_fraction = f64::clamp(fraction, 0.001, 100.0);
        if self.margin_fraction > 0.05 {
            self.sim_output_flag = true;
        }
    }

    /// the configured margin fraction
    pub fn margin_fraction(&self) -> f64 { self.margin_fraction }

    fn horizon_internal_id(&self, id: i64) -> i64 {
        match (0..surface::FAULT_ID_BASE).contains(&id) {
            true => id,
            false => self.input_horizons.len() as i64,
        }
    }

    fn fault_internal_id(&self, id: i64) -> i64 {
        match (surface::FAULT_ID_BASE..surface::BOUNDARY_ID_BASE).contains(&id) {
            true => id,
            false => surface::FAULT_ID_BASE + self.input_faults.len() as i64,
        }
    }

    /// Adds an input horizon. The mesh is owned by the model from here on.
    pub fn add_input_horizon(&mut self, id: i64, age: f64, mesh: TriMesh) -> Result<()> {
        if mesh.num_live_tris() == 0 {
            return Err(Error::Mesh(strata_mesh::errors::Error::EmptyMesh));
        }
        let mut surface = Surface::new(self.horizon_internal_id(id), mesh);
        surface.external_id = id;
        surface.age = age;
        self.input_horizons.push(surface);
        Ok(())
    }

    /// Adds an input horizon from a structured grid of z values, optionally
    /// clipped to a polygon.
    pub fn add_input_grid_horizon(
        &mut self,
        id: i64,
        age: f64,
        grid: &GridSurface,
        polygon: Option<&[Point2]>,
    ) -> Result<()> {
        let mut mesh = grid.to_trimesh()?;
        if let Some(polygon) = polygon {
            strata_meshing::cdt::clip_to_polygon(&mut mesh, polygon);
        }
        self.add_input_horizon(id, age, mesh)
    }

    /// Adds an input fault.
    pub fn add_input_fault(
        &mut self,
        id: i64,
        options: FaultOptions,
        mesh: TriMesh,
    ) -> Result<()> {
        if mesh.num_live_tris() == 0 {
            return Err(Error::Mesh(strata_mesh::errors::Error::EmptyMesh));
        }
        let mut surface = Surface::new(self.fault_internal_id(id), mesh);
        surface.external_id = id;
        surface.minage = options.minage;
        surface.maxage = options.maxage;
        surface.baseline = options.baseline;
        surface.detachment_line = options.detachment_line;
        surface.detach_id = options.detach_id;
        self.input_faults.push(surface);
        Ok(())
    }

    /// Adds an input detachment surface.
    pub fn add_input_detachment(&mut self, id: i64, mesh: TriMesh) -> Result<()> {
        if mesh.num_live_tris() == 0 {
            return Err(Error::Mesh(strata_mesh::errors::Error::EmptyMesh));
        }
        let mut surface = Surface::new(surface::DETACHMENT_ID, mesh);
        surface.external_id = id;
        self.input_detachments.push(surface);
        Ok(())
    }

    /// Installs an already padded detachment directly.
    pub fn set_padded_detachment(&mut self, mesh: TriMesh) -> Result<()> {
        if mesh.num_live_tris() == 0 {
            return Err(Error::Mesh(strata_mesh::errors::Error::EmptyMesh));
        }
        let mut surface = Surface::new(surface::DETACHMENT_ID, mesh);
        surface.is_padded = true;
        self.padded_detachment = Some(surface);
        Ok(())
    }

    /// Sets the sediment top surface, replacing any previous one.
    pub fn set_sediment_surface(&mut self, id: i64, age: f64, mesh: TriMesh) -> Result<()> {
        if mesh.num_live_tris() == 0 {
            return Err(Error::Mesh(strata_mesh::errors::Error::EmptyMesh));
        }
        let mut surface = Surface::new(surface::SED_SURF_ID, mesh);
        surface.external_id = id;
        surface.age = age;
        self.input_sediment = Some(surface);
        Ok(())
    }

    /// Merges another patch into the sediment top surface.
    pub fn add_to_sediment_surface(&mut self, id: i64, age: f64, mesh: TriMesh) -> Result<()> {
        match self.input_sediment.as_mut() {
            Some(surface) => {
                surface.mesh.merge(mesh);
                surface.update_extents();
                Ok(())
            }
            None => self.set_sediment_surface(id, age, mesh),
        }
    }

    /// Sets the model bottom surface, replacing any previous one.
    pub fn set_model_bottom(&mut self, id: i64, age: f64, mesh: TriMesh) -> Result<()> {
        if mesh.num_live_tris() == 0 {
            return Err(Error::Mesh(strata_mesh::errors::Error::EmptyMesh));
        }
        let mut surface = Surface::new(surface::MODEL_BOTTOM_ID, mesh);
        surface.external_id = id;
        surface.age = age;
        self.input_bottom = Some(surface);
        Ok(())
    }

    /// Merges another patch into the model bottom surface.
    pub fn add_to_model_bottom(&mut self, id: i64, age: f64, mesh: TriMesh) -> Result<()> {
        match self.input_bottom.as_mut() {
            Some(surface) => {
                surface.mesh.merge(mesh);
                surface.update_extents();
                Ok(())
            }
            None => self.set_model_bottom(id, age, mesh),
        }
    }

    /// input horizons, in insertion order
    pub fn get_input_horizons(&self) -> &[Surface] { &self.input_horizons }

    /// input faults, in insertion order
    pub fn get_input_faults(&self) -> &[Surface] { &self.input_faults }

    /// padded horizons, in insertion order
    pub fn get_padded_horizons(&self) -> &[Surface] { &self.padded_horizons }

    /// padded faults, in insertion order
    pub fn get_padded_faults(&self) -> &[Surface] { &self.padded_faults }

    /// the padded default top and bottom, when synthesized
    pub fn get_padded_top_and_bottom(&self) -> (Option<&Surface>, Option<&Surface>) {
        (
            self.padded_top_default.as_ref(),
            self.padded_bottom_default.as_ref(),
        )
    }

    /// sealed horizons, in the insertion order of their sources
    pub fn get_sealed_horizons(&self) -> &[Surface] { &self.sealed_horizons }

    /// sealed faults, in the insertion order of their sources
    pub fn get_sealed_faults(&self) -> &[Surface] { &self.sealed_faults }

    /// the sealed top and bottom; empty unless the output flag is set
    pub fn get_sealed_top_and_bottom(&self) -> (Option<&Surface>, Option<&Surface>) {
        match self.sim_output_flag {
            true => (
                self.sealed_top_default.as_ref(),
                self.sealed_bottom_default.as_ref(),
            ),
            false => (None, None),
        }
    }

    /// the sealed detachment, after `seal_faults_to_detachment`
    pub fn get_sealed_detachment(&self) -> Option<&Surface> { self.sealed_detachment.as_ref() }

    /// the sealed sediment surface and model bottom
    pub fn get_sealed_sediment_and_bottom(&self) -> (Option<&Surface>, Option<&Surface>) {
        (self.sealed_sediment.as_ref(), self.sealed_bottom.as_ref())
    }

    /// Borrowed views of the four vertical walls, sealed versions when the
    /// boundary embedding has run.
    pub fn get_shallow_boundary_copies(&self) -> Vec<&Surface> {
        match (&self.embedded_boundaries, &self.boundaries) {
            (Some(b), _) | (None, Some(b)) => b.iter().collect(),
            (None, None) => Vec::new(),
        }
    }

    /// sealed horizon intersect lines, stable ids across one run
    pub fn get_horizon_intersection_lines(&self) -> &[IntersectionLine] {
        &self.sealed_horizon_intersects
    }

    /// sealed fault intersect lines
    pub fn get_fault_intersection_lines(&self) -> &[IntersectionLine] {
        &self.sealed_fault_intersects
    }

    /// sealed top and bottom intersect lines
    pub fn get_top_and_bottom_intersection_lines(&self) -> &[IntersectionLine] {
        &self.sealed_top_bottom_intersects
    }

    /// the raw intersection lines of the padded model
    pub fn get_raw_intersection_lines(&self) -> &[IntersectionLine] { &self.intersection_lines }

    pub(crate) fn pad_bounds(&self) -> Result<BoundingBox<Point3>> {
        self.pad_box.ok_or(Error::NotPadded)
    }

    pub(crate) fn xy_span(&self) -> f64 {
        match self.pad_box.or(self.model_box) {
            Some(bounds) => {
                let diag = bounds.diagonal();
                diag.x + diag.y
            }
            None => 0.0,
        }
    }
}
