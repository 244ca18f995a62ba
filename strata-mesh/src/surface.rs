use crate::*;
use serde::{Deserialize, Serialize};

/// first fault id
pub const FAULT_ID_BASE: i64 = 10_000;
/// first vertical-boundary id
pub const BOUNDARY_ID_BASE: i64 = 100_000_000;
/// sediment-surface sentinel id
pub const SED_SURF_ID: i64 = -100;
/// model-bottom sentinel id
pub const MODEL_BOTTOM_ID: i64 = -200;
/// synthesized-top sentinel id
pub const TOP_ID: i64 = -300;
/// synthesized-bottom sentinel id
pub const BOTTOM_ID: i64 = -400;
/// detachment sentinel id
pub const DETACHMENT_ID: i64 = -1000;

/// Side of the vertical model boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// wall at the maximum y of the pad box
    North,
    /// wall at the minimum y of the pad box
    South,
    /// wall at the maximum x of the pad box
    East,
    /// wall at the minimum x of the pad box
    West,
}

impl Side {
    /// all four sides, in id order
    pub const ALL: [Side; 4] = [Side::North, Side::South, Side::East, Side::West];

    /// the numeric id of this wall
    #[inline(always)]
    pub fn id(self) -> i64 {
        BOUNDARY_ID_BASE
            + match self {
                Side::North => 1,
                Side::South => 2,
                Side::East => 3,
                Side::West => 4,
            }
    }
}

/// Surface class, lifted out of the numeric id ranges.
///
/// The triangulation layers work with integer ids; everything above them
/// dispatches on this sum type instead. [`SurfaceKind::from_id`] is the only
/// place the ranges are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// a stratigraphic horizon
    Horizon,
    /// a fault
    Fault,
    /// one of the four vertical walls
    Boundary(Side),
    /// the sediment top surface
    SedimentTop,
    /// the model bottom surface
    ModelBottom,
    /// the synthesized horizontal top
    DefaultTop,
    /// the synthesized horizontal bottom
    DefaultBottom,
    /// a detachment surface
    Detachment,
}

impl SurfaceKind {
    /// Decodes a surface class from its id.
    pub fn from_id(id: i64) -> Option<SurfaceKind> {
        match id {
            SED_SURF_ID => Some(SurfaceKind::SedimentTop),
            MODEL_BOTTOM_ID => Some(SurfaceKind::ModelBottom),
            TOP_ID => Some(SurfaceKind::DefaultTop),
            BOTTOM_ID => Some(SurfaceKind::DefaultBottom),
            DETACHMENT_ID => Some(SurfaceKind::Detachment),
            id if (0..FAULT_ID_BASE).contains(&id) => Some(SurfaceKind::Horizon),
            id if (FAULT_ID_BASE..BOUNDARY_ID_BASE).contains(&id) => Some(SurfaceKind::Fault),
            id if id == Side::North.id() => Some(SurfaceKind::Boundary(Side::North)),
            id if id == Side::South.id() => Some(SurfaceKind::Boundary(Side::South)),
            id if id == Side::East.id() => Some(SurfaceKind::Boundary(Side::East)),
            id if id == Side::West.id() => Some(SurfaceKind::Boundary(Side::West)),
            _ => None,
        }
    }

    /// Whether the id names a fault.
    #[inline(always)]
    pub fn is_fault(self) -> bool { matches!(self, SurfaceKind::Fault) }

    /// Whether the id names a horizon-like surface: a horizon proper, the
    /// sediment top, or the model bottom.
    #[inline(always)]
    pub fn is_horizon_like(self) -> bool {
        matches!(
            self,
            SurfaceKind::Horizon | SurfaceKind::SedimentTop | SurfaceKind::ModelBottom
        )
    }

    /// Whether the id names a vertical wall.
    #[inline(always)]
    pub fn is_boundary(self) -> bool { matches!(self, SurfaceKind::Boundary(_)) }

    /// Whether the id names the synthesized top or bottom.
    #[inline(always)]
    pub fn is_top_or_bottom(self) -> bool {
        matches!(self, SurfaceKind::DefaultTop | SurfaceKind::DefaultBottom)
    }
}

/// One entry of a sealed border: a sealed-intersect line traversed forward
/// or backward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorderEntry {
    /// index into the sealed-intersect list
    pub line: usize,
    /// traversal sense
    pub forward: bool,
}

/// The ordered sealed-intersect lines forming the final boundary of a
/// sealed mesh.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedBorder {
    /// border entries, in traversal order
    pub entries: Vec<BorderEntry>,
}

impl SealedBorder {
    /// Whether any entries have been recorded.
    #[inline(always)]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

/// A model surface: an arena mesh plus the metadata the sealing pipeline
/// tracks along with it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Surface {
    /// the mesh
    pub mesh: TriMesh,
    /// internal id, encoding the surface class
    pub id: i64,
    /// the caller's id for this surface
    pub external_id: i64,
    /// geologic age of a horizon
    pub age: f64,
    /// minimum age a fault cuts
    pub minage: f64,
    /// maximum age a fault cuts
    pub maxage: f64,
    /// extended to the pad box
    pub is_padded: bool,
    /// boundary edges shared exactly with neighbors
    pub is_sealed: bool,
    /// best-fit plane frame of a steep surface
    pub baseline: Option<Baseline>,
    /// interior point used to pick the correct outline polygon
    pub center: Point2,
    /// z range of the unpadded surface
    pub zmin: f64,
    /// z range of the unpadded surface
    pub zmax: f64,
    /// contact polyline where a fault meets its detachment
    pub detachment_line: Option<Polyline>,
    /// id of the detachment a fault soles into
    pub detach_id: i64,
    /// the sealed-border descriptor, filled while sealing
    pub sealed_border: SealedBorder,
    /// whether a sealed fault reached the vertical walls
    pub sealed_to_sides: bool,
}

impl Surface {
    /// Wraps a mesh with default metadata, computing center and z range.
    pub fn new(id: i64, mesh: TriMesh) -> Surface {
        let center = mesh.centroid_xy().unwrap_or_else(|| {
            let bdb: BoundingBox<Point3> = mesh.live_points().collect();
            let c = bdb.center();
            Point2::new(c.x, c.y)
        });
        let (zmin, zmax) = mesh.z_range();
        Surface {
            mesh,
            id,
            external_id: id,
            age: 0.0,
            minage: 0.0,
            maxage: 0.0,
            is_padded: false,
            is_sealed: false,
            baseline: None,
            center,
            zmin,
            zmax,
            detachment_line: None,
            detach_id: 0,
            sealed_border: SealedBorder::default(),
            sealed_to_sides: false,
        }
    }

    /// the surface class of this surface
    #[inline(always)]
    pub fn kind(&self) -> SurfaceKind {
        SurfaceKind::from_id(self.id).unwrap_or(SurfaceKind::Horizon)
    }

    /// Refreshes the stored centroid and z range from the current mesh.
    pub fn update_extents(&mut self) {
        if let Some(center) = self.mesh.centroid_xy() {
            self.center = center;
        }
        let (zmin, zmax) = self.mesh.z_range();
        self.zmin = zmin;
        self.zmax = zmax;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_ranges_decode() {
        assert_eq!(SurfaceKind::from_id(0), Some(SurfaceKind::Horizon));
        assert_eq!(SurfaceKind::from_id(9_999), Some(SurfaceKind::Horizon));
        assert_eq!(SurfaceKind::from_id(10_000), Some(SurfaceKind::Fault));
        assert_eq!(
            SurfaceKind::from_id(100_000_001),
            Some(SurfaceKind::Boundary(Side::North))
        );
        assert_eq!(
            SurfaceKind::from_id(100_000_004),
            Some(SurfaceKind::Boundary(Side::West))
        );
        assert_eq!(SurfaceKind::from_id(-100), Some(SurfaceKind::SedimentTop));
        assert_eq!(SurfaceKind::from_id(-200), Some(SurfaceKind::ModelBottom));
        assert_eq!(SurfaceKind::from_id(-300), Some(SurfaceKind::DefaultTop));
        assert_eq!(SurfaceKind::from_id(-400), Some(SurfaceKind::DefaultBottom));
        assert_eq!(SurfaceKind::from_id(-1000), Some(SurfaceKind::Detachment));
        assert_eq!(SurfaceKind::from_id(-5), None);
    }

    #[test]
    fn kind_predicates() {
        assert!(SurfaceKind::Fault.is_fault());
        assert!(SurfaceKind::SedimentTop.is_horizon_like());
        assert!(SurfaceKind::Boundary(Side::East).is_boundary());
        assert!(!SurfaceKind::Horizon.is_boundary());
        assert!(SurfaceKind::DefaultTop.is_top_or_bottom());
    }
}
