use crate::*;

impl FromIterator<Point3> for Polyline {
    fn from_iter<I: IntoIterator<Item = Point3>>(iter: I) -> Polyline {
        Polyline(iter.into_iter().collect())
    }
}

/// Distance from `pt` to the segment `a`-`b`.
pub fn distance_point_segment(pt: Point3, a: Point3, b: Point3) -> f64 {
    let ab = b - a;
    let len2 = ab.magnitude2();
    if len2 == 0.0 {
        return pt.distance(a);
    }
    let t = f64::clamp((pt - a).dot(ab) / len2, 0.0, 1.0);
    pt.distance(a + ab * t)
}

impl Polyline {
    /// total arc length
    pub fn length(&self) -> f64 {
        self.windows(2).map(|seg| seg[0].distance(seg[1])).sum()
    }

    /// Whether first and last point coincide under `tiny`.
    pub fn is_closed(&self, tiny: f64) -> bool {
        match (self.first(), self.last()) {
            (Some(&a), Some(&b)) => self.len() > 2 && same_point(a, b, tiny),
            _ => false,
        }
    }

    /// Reverses the point order in place.
    pub fn invert(&mut self) { self.0.reverse(); }

    /// the reversed polyline
    pub fn inverse(&self) -> Polyline {
        Polyline(self.iter().rev().copied().collect())
    }

    /// minimum distance from `pt` to the polyline
    pub fn distance_to_point(&self, pt: Point3) -> f64 {
        match self.len() {
            0 => f64::INFINITY,
            1 => pt.distance(self[0]),
            _ => self
                .windows(2)
                .map(|seg| distance_point_segment(pt, seg[0], seg[1]))
                .fold(f64::INFINITY, f64::min),
        }
    }

    /// index of the vertex nearest to `pt`
    pub fn nearest_vertex(&self, pt: Point3) -> Option<usize> {
        self.iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                pt.distance2(**a)
                    .partial_cmp(&pt.distance2(**b))
                    .unwrap_or(std::cmp::Ordering::Greater)
            })
            .map(|(i, _)| i)
    }

    /// Resamples to roughly `spacing` between consecutive points.
    ///
    /// Endpoints are kept exactly; interior points are placed at equal arc
    /// steps. A polyline shorter than `spacing` collapses to its endpoints.
    pub fn resample(&self, spacing: f64) -> Polyline {
        if self.len() < 2 || spacing <= 0.0 {
            return self.clone();
        }
        let total = self.length();
        let count = usize::max((total / spacing).round() as usize, 1);
        let step = total / count as f64;
        let mut out = Vec::with_capacity(count + 1);
        out.push(self[0]);
        let mut target = step;
        let mut walked = 0.0;
        for seg in self.windows(2) {
            let seg_len = seg[0].distance(seg[1]);
            if seg_len == 0.0 {
                continue;
            }
            while target <= walked + seg_len + step * 1.0e-9 && out.len() < count {
                let t = (target - walked) / seg_len;
                out.push(seg[0] + (seg[1] - seg[0]) * t);
                target += step;
            }
            walked += seg_len;
        }
        out.push(self[self.len() - 1]);
        Polyline(out)
    }

    /// Drops consecutive points that coincide under `tiny`.
    pub fn dedup_points(&mut self, tiny: f64) {
        let mut out: Vec<Point3> = Vec::with_capacity(self.len());
        for &pt in self.iter() {
            match out.last() {
                Some(&last) if same_point(last, pt, tiny) => {}
                _ => out.push(pt),
            }
        }
        self.0 = out;
    }

    /// Splits segments longer than `max_len` by repeated midpoint insertion.
    pub fn split_long_segments(&self, max_len: f64) -> Polyline {
        if self.len() < 2 || max_len <= 0.0 {
            return self.clone();
        }
        let mut out = vec![self[0]];
        for seg in self.windows(2) {
            let len = seg[0].distance(seg[1]);
            let pieces = usize::max((len / max_len).ceil() as usize, 1);
            for i in 1..=pieces {
                out.push(seg[0] + (seg[1] - seg[0]) * (i as f64 / pieces as f64));
            }
        }
        Polyline(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_base::assert_near;

    fn straight() -> Polyline {
        Polyline(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
        ])
    }

    #[test]
    fn length_and_resample() {
        let line = straight();
        assert_near!(line.length(), 10.0);
        let resampled = line.resample(1.0);
        assert_eq!(resampled.len(), 11);
        assert_eq!(resampled[0], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(resampled[10], Point3::new(10.0, 0.0, 0.0));
        assert_near!(resampled[3].x, 3.0);
    }

    #[test]
    fn resample_keeps_short_lines() {
        let line = Polyline(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.2, 0.0, 0.0)]);
        let resampled = line.resample(1.0);
        assert_eq!(resampled.len(), 2);
    }

    #[test]
    fn distance_queries() {
        let line = straight();
        assert_near!(line.distance_to_point(Point3::new(5.0, 3.0, 0.0)), 3.0);
        assert_near!(line.distance_to_point(Point3::new(-2.0, 0.0, 0.0)), 2.0);
        assert_eq!(line.nearest_vertex(Point3::new(3.9, 1.0, 0.0)), Some(1));
    }

    #[test]
    fn closed_detection() {
        let mut square = Polyline(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
        ]);
        assert!(square.is_closed(1.0e-9));
        square.pop();
        assert!(!square.is_closed(1.0e-9));
    }

    #[test]
    fn split_long() {
        let line = Polyline(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 0.0, 0.0)]);
        let split = line.split_long_segments(1.0);
        assert_eq!(split.len(), 4);
        assert_near!(split[1].x, 1.0);
    }
}
