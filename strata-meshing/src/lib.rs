//! Mesh algorithms: spatial indexing, triangle intersection, constrained
//! triangulation, and polygon assembly from unions of polylines.

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

use strata_mesh::*;

/// Constrained Delaunay triangulation through spade: exact embedding of
/// polylines, clipping to polygons.
pub mod cdt;
/// Topological chew: flood-deletes triangles up to the nearest constraint.
pub mod chew;
/// Triangle-triangle intersection primitives.
pub mod collision;
/// Polygon assembly from the union of 2-D polylines.
pub mod polygonize;
/// Bucketed spatial indices over triangles and nodes.
pub mod spatial;

/// This module contains all public items and re-exports `strata_mesh`.
pub mod prelude {
    pub use crate::{cdt::*, chew::*, collision::*, polygonize::*, spatial::*};
    pub use strata_mesh::*;
}
