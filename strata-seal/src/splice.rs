use crate::*;

fn endpoint(line: &IntersectionLine, at_last: bool) -> Point3 {
    match at_last {
        true => line.last_point(),
        false => line.first_point(),
    }
}

/// Deletes or recenters the points next to each endpoint when their spacing
/// disagrees with the following gap by more than 2.2 times.
fn correct_end_spacing(points: &mut Polyline) {
    if points.len() >= 3 {
        let (d01, d12) = (points[0].distance(points[1]), points[1].distance(points[2]));
        if d01 * 2.2 < d12 {
            points.remove(1);
        } else if d01 > d12 * 2.2 {
            let mid = points[0] + (points[1] - points[0]) / 2.0;
            points.insert(1, mid);
        }
    }
    if points.len() >= 3 {
        let n = points.len();
        let (d01, d12) = (
            points[n - 1].distance(points[n - 2]),
            points[n - 2].distance(points[n - 3]),
        );
        if d01 * 2.2 < d12 {
            points.remove(n - 2);
        } else if d01 > d12 * 2.2 {
            let mid = points[n - 1] + (points[n - 2] - points[n - 1]) / 2.0;
            points.insert(n - 1, mid);
        }
    }
}

impl SealedModel {
    /// Marks splice partners: two fault-bearing intersection lines sharing
    /// an endpoint under the model tiny distance must move together.
    pub(crate) fn splice_fault_intersection_lines(&mut self) {
        let tiny = self.model_tiny;
        let n = self.intersection_lines.len();
        for i in 0..n {
            for j in (i + 1)..n {
                if !self.intersection_lines[i].involves_fault()
                    && !self.intersection_lines[j].involves_fault()
                {
                    continue;
                }
                for at_last_i in [false, true] {
                    for at_last_j in [false, true] {
                        let pi = endpoint(&self.intersection_lines[i], at_last_i);
                        let pj = endpoint(&self.intersection_lines[j], at_last_j);
                        if !same_point(pi, pj, tiny) {
                            continue;
                        }
                        let partner_ij = SplicePartner {
                            line: j,
                            at_last_point: at_last_j,
                        };
                        let partner_ji = SplicePartner {
                            line: i,
                            at_last_point: at_last_i,
                        };
                        match at_last_i {
                            false => self.intersection_lines[i].splice_partner_1 = Some(partner_ij),
                            true => self.intersection_lines[i].splice_partner_2 = Some(partner_ij),
                        }
                        match at_last_j {
                            false => self.intersection_lines[j].splice_partner_1 = Some(partner_ji),
                            true => self.intersection_lines[j].splice_partner_2 = Some(partner_ji),
                        }
                    }
                }
            }
        }
    }

    /// Snaps near-crossings: on every surface, a point of one incident line
    /// lying within half the average spacing of another incident line snaps
    /// to that line's nearest unused point. Distances are measured in the
    /// map view of the surface frame so near-vertical faults behave.
    pub(crate) fn fixup_crossing_intersects(&mut self) {
        let threshold = self.average_spacing / 2.0;
        let surfaces: Vec<(i64, Option<Baseline>)> = self
            .padded_roster()
            .iter()
            .map(|s| (s.id, s.baseline.filter(|b| b.is_steep())))
            .collect();
        for (sid, frame) in surfaces {
            let incident: Vec<usize> = self
                .intersection_lines
                .iter()
                .enumerate()
                .filter(|(_, line)| line.uses_surface(sid))
                .map(|(i, _)| i)
                .collect();
            let project = |pt: Point3| -> Point2 {
                let fp = frame.map_or(pt, |b| b.to_frame(pt));
                Point2::new(fp.x, fp.y)
            };
            for a_pos in 0..incident.len() {
                for b_pos in (a_pos + 1)..incident.len() {
                    let master_index = incident[a_pos];
                    let slave_index = incident[b_pos];
                    let master: Vec<(Point3, Point2)> = self.intersection_lines[master_index]
                        .points
                        .iter()
                        .map(|&pt| (pt, project(pt)))
                        .collect();
                    let mut used = vec![false; master.len()];
                    let slave = &mut self.intersection_lines[slave_index];
                    for k in 0..slave.points.len() {
                        let sp = project(slave.points[k]);
                        let on_master = master
                            .windows(2)
                            .map(|w| dist_point_segment_2d(sp, w[0].1, w[1].1))
                            .fold(f64::INFINITY, f64::min);
                        if on_master >= threshold {
                            continue;
                        }
                        let nearest = master
                            .iter()
                            .enumerate()
                            .filter(|(m, _)| !used[*m])
                            .min_by(|(_, a), (_, b)| {
                                sp.distance2(a.1)
                                    .partial_cmp(&sp.distance2(b.1))
                                    .unwrap_or(std::cmp::Ordering::Greater)
                            });
                        if let Some((m, &(master_pt, _))) = nearest {
                            slave.points[k] = master_pt;
                            used[m] = true;
                        }
                    }
                    self.intersection_lines[slave_index].points.dedup_points(self.model_tiny);
                }
            }
        }
    }

    /// Resamples every raw line to the average spacing, fixing up endpoint
    /// spacing and splitting over-long fault segments, then re-enforces the
    /// splice identities.
    pub(crate) fn resample_intersection_lines(&mut self) -> Result<()> {
        let spacing = self.average_spacing;
        for line in &mut self.intersection_lines {
            let mut points = line.points.resample(spacing);
            correct_end_spacing(&mut points);
            if line.involves_fault() {
                points = points.split_long_segments(1.4 * spacing);
            }
            line.flags = vec![0; points.len()];
            line.points = points;
        }
        self.enforce_splices()
    }

    /// Copies every spliced endpoint from the lower-indexed line onto its
    /// partner so shared endpoints stay bit-identical. A partner reference
    /// pointing outside the list is a programming-invariant violation.
    pub(crate) fn enforce_splices(&mut self) -> Result<()> {
        let n = self.intersection_lines.len();
        for i in 0..n {
            for at_last in [false, true] {
                let partner = match at_last {
                    false => self.intersection_lines[i].splice_partner_1,
                    true => self.intersection_lines[i].splice_partner_2,
                };
                let Some(partner) = partner else { continue };
                if partner.line >= n {
                    return Err(crate::errors::Error::UnresolvedSplice(i));
                }
                if partner.line <= i {
                    continue;
                }
                let pt = endpoint(&self.intersection_lines[i], at_last);
                self.intersection_lines[partner.line].set_endpoint(partner.at_last_point, pt);
            }
        }
        Ok(())
    }
}

fn dist_point_segment_2d(pt: Point2, a: Point2, b: Point2) -> f64 {
    let ab = b - a;
    let len2 = ab.magnitude2();
    if len2 == 0.0 {
        return pt.distance(a);
    }
    let t = f64::clamp((pt - a).dot(ab) / len2, 0.0, 1.0);
    pt.distance(a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_spacing_deletes_crowded_neighbor() {
        let mut points = Polyline(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.1, 0.0, 0.0),
            Point3::new(1.1, 0.0, 0.0),
            Point3::new(2.1, 0.0, 0.0),
        ]);
        correct_end_spacing(&mut points);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(points[1], Point3::new(1.1, 0.0, 0.0));
    }

    #[test]
    fn end_spacing_splits_stretched_neighbor() {
        let mut points = Polyline(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
        ]);
        correct_end_spacing(&mut points);
        assert_eq!(points.len(), 5);
        assert_eq!(points[1], Point3::new(1.5, 0.0, 0.0));
    }

    #[test]
    fn splice_marking_is_symmetric() {
        let mut model = SealedModel::new();
        model.model_tiny = 1.0e-6;
        let shared = Point3::new(1.0, 1.0, 0.0);
        let a = Polyline(vec![Point3::new(0.0, 0.0, 0.0), shared]);
        let b = Polyline(vec![shared, Point3::new(2.0, 0.0, 0.0)]);
        model
            .intersection_lines
            .push(IntersectionLine::new(a, 10_000, 0));
        model
            .intersection_lines
            .push(IntersectionLine::new(b, 10_001, 0));
        model.splice_fault_intersection_lines();
        let first = &model.intersection_lines[0];
        let second = &model.intersection_lines[1];
        assert_eq!(
            first.splice_partner_2,
            Some(SplicePartner {
                line: 1,
                at_last_point: false
            })
        );
        assert_eq!(
            second.splice_partner_1,
            Some(SplicePartner {
                line: 0,
                at_last_point: true
            })
        );
    }
}
