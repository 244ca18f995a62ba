use crate::*;
use serde::{Deserialize, Serialize};

/// Marks a point of an intersection line as an endpoint spliced to a
/// partner line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplicePartner {
    /// index of the partner into the intersection-line list
    pub line: usize,
    /// whether the shared point is the partner's last vertex
    pub at_last_point: bool,
}

/// Ordered 3-D points forming the shared curve between two surfaces.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IntersectionLine {
    /// the points, at least two, consecutive ones distinct
    pub points: Polyline,
    /// per-point flags
    pub flags: Vec<i32>,
    /// id of the first surface sharing the curve
    pub surf1: i64,
    /// id of the second surface sharing the curve
    pub surf2: i64,
    /// caller-facing id of the first surface
    pub external_id1: i64,
    /// caller-facing id of the second surface
    pub external_id2: i64,
    /// marked for embedding into the matching fault
    pub embed_flag: bool,
    /// splice partner sharing the first point
    pub splice_partner_1: Option<SplicePartner>,
    /// splice partner sharing the last point
    pub splice_partner_2: Option<SplicePartner>,
    /// closeness count used by neighbor searches
    pub nclose: i32,
}

impl IntersectionLine {
    /// Creates a line between two surfaces.
    pub fn new(points: Polyline, surf1: i64, surf2: i64) -> IntersectionLine {
        let flags = vec![0; points.len()];
        IntersectionLine {
            points,
            flags,
            surf1,
            surf2,
            external_id1: surf1,
            external_id2: surf2,
            embed_flag: false,
            splice_partner_1: None,
            splice_partner_2: None,
            nclose: 0,
        }
    }

    /// Whether the curve lies on the surface with this id.
    #[inline(always)]
    pub fn uses_surface(&self, id: i64) -> bool { self.surf1 == id || self.surf2 == id }

    /// The other surface of the pair.
    #[inline(always)]
    pub fn other_surface(&self, id: i64) -> i64 {
        match self.surf1 == id {
            true => self.surf2,
            false => self.surf1,
        }
    }

    /// first point; lines always carry at least two
    #[inline(always)]
    pub fn first_point(&self) -> Point3 { self.points[0] }

    /// last point
    #[inline(always)]
    pub fn last_point(&self) -> Point3 { self.points[self.points.len() - 1] }

    /// Whether either surface of the pair is a fault.
    pub fn involves_fault(&self) -> bool {
        [self.surf1, self.surf2]
            .into_iter()
            .filter_map(SurfaceKind::from_id)
            .any(SurfaceKind::is_fault)
    }

    /// Replaces an endpoint, keeping the flags array in step.
    pub fn set_endpoint(&mut self, at_last: bool, pt: Point3) {
        let n = self.points.len();
        match at_last {
            true => self.points[n - 1] = pt,
            false => self.points[0] = pt,
        }
    }
}

/// Per-point source tag of an outline: which intersection line owns the
/// point, and the second owner at shared corners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineTag {
    /// index of the owning line; [`BORDER_LINE_ID`] for points from the
    /// original surface border
    pub line_id: usize,
    /// point index within the owning line
    pub point_id: usize,
    /// second owner at a shared corner
    pub line_id2: Option<(usize, usize)>,
}

/// The closed polygon, with z values, forming the final boundary of a
/// sealed surface. First point equals the last.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Outline {
    /// the closed polygon
    pub points: Polyline,
    /// per-point source tags, parallel to `points`
    pub tags: Vec<OutlineTag>,
    /// id of the surface this outline seals
    pub surf_id: i64,
}

/// Pseudo line id tagging outline points taken from the original surface
/// border rather than an intersection line.
pub const BORDER_LINE_ID: usize = 1_000_001;

/// Edge flag class for top- and bottom-limit lines embedded into the
/// vertical boundaries and faults.
pub const LIMIT_LINE_FLAG: i32 = 909;

/// Facet mark for sealed-fault facets on the free border of a fault that
/// never reached the vertical walls.
pub const INTERIOR_FAULT_FACET_MARK: i32 = 1_000_000;
