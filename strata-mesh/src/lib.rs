//! Defines the arena tri-mesh data structure, model surfaces, polylines, and smesh I/O.

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

/// re-export `strata_base`.
pub mod base {
    pub use strata_base::{
        bounding_box::BoundingBox,
        cgmath64::*,
        hash::HashGen,
        plane::{fit_plane, Baseline},
        tolerance::*,
    };
}
pub use base::*;

/// A mesh node.
///
/// Nodes, edges and triangles refer to each other by array index; a whole
/// mesh is dropped by dropping its three arrays.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// position
    pub point: Point3,
    /// lies on the outer border of its mesh
    pub on_border: bool,
    /// lies on an embedded constraint line
    pub is_constraint: bool,
    /// removed from the mesh but still occupying its array slot
    pub deleted: bool,
}

impl From<Point3> for Node {
    #[inline(always)]
    fn from(point: Point3) -> Node {
        Node {
            point,
            on_border: false,
            is_constraint: false,
            deleted: false,
        }
    }
}

/// An edge joining two nodes, referencing its incident triangles.
///
/// A live interior edge has two incident triangles, a live boundary edge
/// exactly one. An edge left with no incident triangle is deleted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// endpoint node indices
    pub nodes: [usize; 2],
    /// incident triangle indices
    pub tris: [Option<usize>; 2],
    /// constraint class, nonzero for flagged constraint edges
    pub flag: i32,
    /// id of the constraint line this edge lies on
    pub line_id: Option<i64>,
    /// cached length
    pub length: f64,
    /// lies on an embedded constraint line
    pub is_constraint: bool,
    /// removed from the mesh but still occupying its array slot
    pub deleted: bool,
}

impl Edge {
    /// Whether exactly one triangle is incident.
    #[inline(always)]
    pub fn is_boundary(&self) -> bool {
        matches!(self.tris, [Some(_), None] | [None, Some(_)])
    }

    /// The incident triangle on the other side of `tri`, if any.
    #[inline(always)]
    pub fn other_tri(&self, tri: usize) -> Option<usize> {
        match self.tris {
            [Some(t), other] if t == tri => other,
            [other, Some(t)] if t == tri => other,
            _ => None,
        }
    }

    /// The endpoint other than `node`.
    #[inline(always)]
    pub fn other_node(&self, node: usize) -> usize {
        match self.nodes[0] == node {
            true => self.nodes[1],
            false => self.nodes[0],
        }
    }

    /// Whether the chew must stop at this edge.
    #[inline(always)]
    pub fn is_barrier(&self) -> bool { self.is_constraint || self.flag != 0 }
}

/// A triangle referencing its three edges.
///
/// The three edges share exactly three distinct nodes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    /// edge indices
    pub edges: [usize; 3],
    /// removed from the mesh but still occupying its array slot
    pub deleted: bool,
}

/// Arena mesh: parallel arrays of nodes, edges and triangles.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TriMesh {
    /// nodes
    pub nodes: Vec<Node>,
    /// edges
    pub edges: Vec<Edge>,
    /// triangles
    pub tris: Vec<Triangle>,
}

/// polyline of 3-D points
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Serialize,
    Deserialize,
    derive_more::Deref,
    derive_more::DerefMut,
    derive_more::From,
    derive_more::Into,
)]
pub struct Polyline(pub Vec<Point3>);

/// Defines errors
pub mod errors;
/// Structured grids of z values and grid triangulation
pub mod grid;
/// Polyline algorithms: length, resampling, distance queries
pub mod polyline;
/// tetgen smesh output
pub mod smesh;
/// Model surfaces: mesh + metadata, surface classes encoded in id ranges
pub mod surface;
/// Arena mesh construction and editing
pub mod trimesh;

pub use grid::GridSurface;
pub use smesh::TetgenInput;
pub use surface::{SealedBorder, Side, Surface, SurfaceKind};
