use crate::*;

/// Crossing point where segment `seg` pierces the plane of `tri` inside the
/// triangle. Grazing and coplanar configurations return `None`.
fn collide_seg_triangle(seg: [Point3; 2], tri: [Point3; 3]) -> Option<Point3> {
    let ab = tri[1] - tri[0];
    let bc = tri[2] - tri[1];
    let ca = tri[0] - tri[2];
    let nor = ab.cross(ca);
    if nor.so_small() {
        return None;
    }
    let ap = seg[0] - tri[0];
    let aq = seg[1] - tri[0];
    let dotapnor = ap.dot(nor);
    let dotaqnor = aq.dot(nor);
    if dotapnor * dotaqnor > 0.0 || dotapnor == dotaqnor {
        return None;
    }
    let h = seg[0] + dotapnor / (dotapnor - dotaqnor) * (seg[1] - seg[0]);
    let inside = f64::signum(ab.cross(nor).dot(h - tri[0]))
        + f64::signum(bc.cross(nor).dot(h - tri[1]))
        + f64::signum(ca.cross(nor).dot(h - tri[2]));
    match inside >= 2.0 {
        true => Some(h),
        false => None,
    }
}

/// The intersection segment of two triangles.
///
/// Collects the edge-plane crossing points of either triangle through the
/// other and keeps the two farthest apart. Disjoint, coplanar and
/// point-contact pairs return `None`.
pub fn intersect_triangles(tri0: [Point3; 3], tri1: [Point3; 3]) -> Option<(Point3, Point3)> {
    let mut tuple = (None, None);
    [
        collide_seg_triangle([tri0[0], tri0[1]], tri1),
        collide_seg_triangle([tri0[1], tri0[2]], tri1),
        collide_seg_triangle([tri0[2], tri0[0]], tri1),
        collide_seg_triangle([tri1[0], tri1[1]], tri0),
        collide_seg_triangle([tri1[1], tri1[2]], tri0),
        collide_seg_triangle([tri1[2], tri1[0]], tri0),
    ]
    .iter()
    .for_each(|pt| match tuple {
        (None, _) => tuple.0 = *pt,
        (Some(_), None) => tuple.1 = *pt,
        (Some(ref mut p), Some(ref mut q)) => {
            if let Some(pt) = pt {
                let dist0 = pt.distance2(*p);
                let dist1 = pt.distance2(*q);
                let dist2 = p.distance2(*q);
                if dist2 < dist0 {
                    *q = *pt;
                } else if dist2 < dist1 {
                    *p = *pt;
                }
            }
        }
    });
    match tuple {
        (Some(a), Some(b)) => Some((a, b)),
        _ => None,
    }
}

/// Whether the triangle bounding boxes are disjoint.
pub fn disjoint_boxes(tri0: [Point3; 3], tri1: [Point3; 3]) -> bool {
    let bdb0: BoundingBox<Point3> = tri0.iter().collect();
    let bdb1: BoundingBox<Point3> = tri1.iter().collect();
    !bdb0.intersects(&bdb1)
}

/// The intersection segment of two triangles, discarded unless it is longer
/// than `min_len`.
///
/// Both triangles should be translated near the origin by the caller before
/// the call; the result is in the translated coordinates.
pub fn intersection_segment(
    tri0: [Point3; 3],
    tri1: [Point3; 3],
    min_len: f64,
) -> Option<(Point3, Point3)> {
    if disjoint_boxes(tri0, tri1) {
        return None;
    }
    let (a, b) = intersect_triangles(tri0, tri1)?;
    match a.distance(b) > min_len {
        true => Some((a, b)),
        false => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_base::assert_near;

    #[test]
    fn crossing_triangles() {
        let tri0 = [
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let tri1 = [
            Point3::new(0.0, 0.0, -1.0),
            Point3::new(-1.0, -1.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
        ];
        assert!(intersect_triangles(tri0, tri1).is_some());
    }

    #[test]
    fn separated_triangles() {
        let tri0 = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let tri1 = [
            Point3::new(0.0, 0.0, 0.5),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
        ];
        assert!(intersect_triangles(tri0, tri1).is_none());
    }

    #[test]
    fn coplanar_triangles() {
        let tri0 = [
            Point3::origin(),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let tri1 = [
            Point3::new(0.5, 0.5, 0.0),
            Point3::new(1.5, 0.5, 0.0),
            Point3::new(0.5, 1.5, 0.0),
        ];
        assert!(intersect_triangles(tri0, tri1).is_none());
    }

    #[test]
    fn segment_on_known_line() {
        // horizontal unit-ish triangle at z = 0 cut by a vertical triangle
        // spanning the plane y = 0.25
        let tri0 = [
            Point3::new(-2.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let tri1 = [
            Point3::new(-3.0, 0.25, -1.0),
            Point3::new(3.0, 0.25, -1.0),
            Point3::new(0.0, 0.25, 3.0),
        ];
        let (a, b) = intersect_triangles(tri0, tri1).unwrap();
        assert_near!(a.y, 0.25);
        assert_near!(b.y, 0.25);
        assert_near!(a.z, 0.0);
        assert_near!(b.z, 0.0);
        assert!(a.distance(b) > 1.0);
    }

    #[test]
    fn short_grazing_discarded() {
        let tri0 = [
            Point3::new(-2.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let tri1 = [
            Point3::new(-3.0, 0.25, -1.0),
            Point3::new(3.0, 0.25, -1.0),
            Point3::new(0.0, 0.25, 3.0),
        ];
        assert!(intersection_segment(tri0, tri1, 100.0).is_none());
        assert!(intersection_segment(tri0, tri1, 0.001).is_some());
    }
}
