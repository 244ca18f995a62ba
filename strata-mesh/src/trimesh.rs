use crate::errors::Error;
use crate::*;
use rustc_hash::FxHashMap as HashMap;

type Result<T> = std::result::Result<T, Error>;

impl TriMesh {
    /// Creates an empty mesh.
    #[inline(always)]
    pub fn new() -> TriMesh { TriMesh::default() }

    /// Builds a mesh from positions and index triangles, wiring up the
    /// edge/triangle adjacency.
    /// # Examples
    /// ```
    /// use strata_mesh::{base::*, TriMesh};
    /// let mesh = TriMesh::from_triangles(
    ///     vec![
    ///         Point3::new(0.0, 0.0, 0.0),
    ///         Point3::new(1.0, 0.0, 0.0),
    ///         Point3::new(1.0, 1.0, 0.0),
    ///         Point3::new(0.0, 1.0, 0.0),
    ///     ],
    ///     &[[0, 1, 2], [0, 2, 3]],
    /// )
    /// .unwrap();
    /// assert_eq!(mesh.edges.len(), 5);
    /// assert_eq!(mesh.boundary_edges().count(), 4);
    /// ```
    pub fn from_triangles(points: Vec<Point3>, faces: &[[usize; 3]]) -> Result<TriMesh> {
        let mut mesh = TriMesh {
            nodes: points.into_iter().map(Node::from).collect(),
            edges: Vec::new(),
            tris: Vec::with_capacity(faces.len()),
        };
        let mut edge_map = HashMap::default();
        for face in faces {
            for &n in face {
                if n >= mesh.nodes.len() {
                    return Err(Error::NodeOutOfRange(n));
                }
            }
            if face[0] == face[1] || face[1] == face[2] || face[2] == face[0] {
                return Err(Error::DegenerateFace);
            }
            let tri_index = mesh.tris.len();
            let mut edges = [0; 3];
            for (i, edge) in edges.iter_mut().enumerate() {
                let (n0, n1) = (face[i], face[(i + 1) % 3]);
                let key = (usize::min(n0, n1), usize::max(n0, n1));
                let edge_index = *edge_map.entry(key).or_insert_with(|| {
                    let index = mesh.edges.len();
                    let length = mesh.nodes[n0].point.distance(mesh.nodes[n1].point);
                    mesh.edges.push(Edge {
                        nodes: [n0, n1],
                        tris: [None, None],
                        flag: 0,
                        line_id: None,
                        length,
                        is_constraint: false,
                        deleted: false,
                    });
                    index
                });
                let eptr = &mut mesh.edges[edge_index];
                match eptr.tris {
                    [None, _] => eptr.tris[0] = Some(tri_index),
                    [_, None] => eptr.tris[1] = Some(tri_index),
                    _ => return Err(Error::NonManifoldEdge(key.0, key.1)),
                }
                *edge = edge_index;
            }
            mesh.tris.push(Triangle {
                edges,
                deleted: false,
            });
        }
        mesh.mark_borders();
        Ok(mesh)
    }

    /// the three node indices of triangle `t`
    pub fn tri_nodes(&self, t: usize) -> [usize; 3] {
        let [e0, e1, _] = self.tris[t].edges;
        let [a, b] = self.edges[e0].nodes;
        let [c, d] = self.edges[e1].nodes;
        let third = match c == a || c == b {
            true => d,
            false => c,
        };
        [a, b, third]
    }

    /// the three corner positions of triangle `t`
    #[inline(always)]
    pub fn tri_points(&self, t: usize) -> [Point3; 3] {
        self.tri_nodes(t).map(|n| self.nodes[n].point)
    }

    /// the centroid of triangle `t`
    #[inline(always)]
    pub fn tri_center(&self, t: usize) -> Point3 {
        let [a, b, c] = self.tri_points(t);
        a + ((b - a) + (c - a)) / 3.0
    }

    /// the bounding box of triangle `t`
    #[inline(always)]
    pub fn tri_aabb(&self, t: usize) -> BoundingBox<Point3> {
        self.tri_points(t).into_iter().collect()
    }

    /// indices of live triangles
    #[inline(always)]
    pub fn live_tris(&self) -> impl Iterator<Item = usize> + '_ {
        self.tris
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.deleted)
            .map(|(i, _)| i)
    }

    /// positions of live nodes
    #[inline(always)]
    pub fn live_points(&self) -> impl Iterator<Item = Point3> + '_ {
        self.nodes
            .iter()
            .filter(|n| !n.deleted)
            .map(|n| n.point)
    }

    /// number of live triangles
    #[inline(always)]
    pub fn num_live_tris(&self) -> usize { self.live_tris().count() }

    /// number of live nodes
    #[inline(always)]
    pub fn num_live_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| !n.deleted).count()
    }

    /// indices of live boundary edges
    #[inline(always)]
    pub fn boundary_edges(&self) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.deleted && e.is_boundary())
            .map(|(i, _)| i)
    }

    /// the bounding box over live nodes
    #[inline(always)]
    pub fn aabb(&self) -> BoundingBox<Point3> { self.live_points().collect() }

    /// the z range over live nodes, `(zmin, zmax)`
    pub fn z_range(&self) -> (f64, f64) {
        self.live_points().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), pt| (f64::min(lo, pt.z), f64::max(hi, pt.z)),
        )
    }

    /// mean length of live edges
    pub fn average_edge_length(&self) -> Option<f64> {
        let (sum, count) = self
            .edges
            .iter()
            .filter(|e| !e.deleted)
            .fold((0.0, 0_usize), |(sum, count), e| (sum + e.length, count + 1));
        match count {
            0 => None,
            _ => Some(sum / count as f64),
        }
    }

    /// Area-weighted centroid of the live triangles, in map view.
    ///
    /// This is the interior point used to pick the correct polygon from a
    /// surface outline, so it must stay inside reasonably shaped meshes.
    pub fn centroid_xy(&self) -> Option<Point2> {
        let (sum, area) = self.live_tris().fold(
            (Vector2::zero(), 0.0),
            |(sum, area), t| {
                let [a, b, c] = self.tri_points(t);
                let tri_area = ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)).abs();
                let center = Vector2::new(a.x + b.x + c.x, a.y + b.y + c.y) / 3.0;
                (sum + center * tri_area, area + tri_area)
            },
        );
        match area > 0.0 {
            true => Some(Point2::origin() + sum / area),
            false => None,
        }
    }

    /// Recomputes the border flags of nodes from the boundary edges.
    pub fn mark_borders(&mut self) {
        for node in &mut self.nodes {
            node.on_border = false;
        }
        let boundary: Vec<[usize; 2]> = self
            .boundary_edges()
            .map(|e| self.edges[e].nodes)
            .collect();
        for [n0, n1] in boundary {
            self.nodes[n0].on_border = true;
            self.nodes[n1].on_border = true;
        }
    }

    /// Looks up the edge joining two nodes.
    pub fn edge_between(&self, n0: usize, n1: usize) -> Option<usize> {
        self.edges.iter().position(|e| {
            !e.deleted && (e.nodes == [n0, n1] || e.nodes == [n1, n0])
        })
    }

    /// Builds the node-to-live-edge adjacency.
    pub fn node_edge_adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.nodes.len()];
        for (i, edge) in self.edges.iter().enumerate() {
            if edge.deleted {
                continue;
            }
            adjacency[edge.nodes[0]].push(i);
            adjacency[edge.nodes[1]].push(i);
        }
        adjacency
    }

    /// Deletes triangle `t`, detaching it from its edges. Edges left with no
    /// incident triangle are deleted too; orphan nodes are swept out by
    /// [`TriMesh::compact`].
    pub fn delete_triangle(&mut self, t: usize) {
        if self.tris[t].deleted {
            return;
        }
        self.tris[t].deleted = true;
        for i in 0..3 {
            let e = self.tris[t].edges[i];
            let edge = &mut self.edges[e];
            for slot in edge.tris.iter_mut() {
                if *slot == Some(t) {
                    *slot = None;
                }
            }
            if edge.tris == [None, None] {
                edge.deleted = true;
            }
        }
    }

    /// Drops deleted entries and remaps all indices. Nodes referenced by no
    /// live edge are dropped as well.
    pub fn compact(&mut self) {
        let mut node_used = vec![false; self.nodes.len()];
        for edge in self.edges.iter().filter(|e| !e.deleted) {
            node_used[edge.nodes[0]] = true;
            node_used[edge.nodes[1]] = true;
        }
        let mut node_remap = vec![usize::MAX; self.nodes.len()];
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            if node_used[i] && !node.deleted {
                node_remap[i] = nodes.len();
                nodes.push(*node);
            }
        }
        let mut edge_remap = vec![usize::MAX; self.edges.len()];
        let mut edges = Vec::with_capacity(self.edges.len());
        for (i, edge) in self.edges.iter().enumerate() {
            if !edge.deleted {
                edge_remap[i] = edges.len();
                edges.push(*edge);
            }
        }
        let mut tri_remap = vec![None; self.tris.len()];
        let mut tris = Vec::with_capacity(self.tris.len());
        for (i, tri) in self.tris.iter().enumerate() {
            if !tri.deleted {
                tri_remap[i] = Some(tris.len());
                tris.push(*tri);
            }
        }
        for edge in &mut edges {
            edge.nodes = edge.nodes.map(|n| node_remap[n]);
            edge.tris = edge.tris.map(|t| t.and_then(|t| tri_remap[t]));
        }
        for tri in &mut tris {
            tri.edges = tri.edges.map(|e| edge_remap[e]);
        }
        self.nodes = nodes;
        self.edges = edges;
        self.tris = tris;
        self.mark_borders();
    }

    /// Applies `f` to every node position and refreshes edge lengths.
    pub fn apply(&mut self, f: impl Fn(Point3) -> Point3) {
        for node in &mut self.nodes {
            node.point = f(node.point);
        }
        self.refresh_edge_lengths();
    }

    /// Recomputes the cached edge lengths.
    pub fn refresh_edge_lengths(&mut self) {
        for edge in &mut self.edges {
            edge.length = self.nodes[edge.nodes[0]]
                .point
                .distance(self.nodes[edge.nodes[1]].point);
        }
    }

    /// Appends another mesh, offsetting its indices. Coincident nodes are
    /// not unified here; that is the sealing pipeline's job.
    pub fn merge(&mut self, other: TriMesh) {
        let node_offset = self.nodes.len();
        let edge_offset = self.edges.len();
        let tri_offset = self.tris.len();
        self.nodes.extend(other.nodes);
        self.edges.extend(other.edges.into_iter().map(|mut e| {
            e.nodes = e.nodes.map(|n| n + node_offset);
            e.tris = e.tris.map(|t| t.map(|t| t + tri_offset));
            e
        }));
        self.tris.extend(other.tris.into_iter().map(|mut t| {
            t.edges = t.edges.map(|e| e + edge_offset);
            t
        }));
    }

    /// The longest closed loop of boundary edges, as a polyline.
    ///
    /// Open chains are returned as-is when the mesh has no closed loop.
    pub fn outer_border(&self) -> Option<Polyline> {
        let mut adjacency: HashMap<usize, Vec<usize>> = HashMap::default();
        for e in self.boundary_edges() {
            let [n0, n1] = self.edges[e].nodes;
            adjacency.entry(n0).or_default().push(e);
            adjacency.entry(n1).or_default().push(e);
        }
        let mut used = vec![false; self.edges.len()];
        let mut best: Option<Vec<usize>> = None;
        for start in self.boundary_edges() {
            if used[start] {
                continue;
            }
            used[start] = true;
            let mut chain = vec![self.edges[start].nodes[0], self.edges[start].nodes[1]];
            loop {
                let tail = *chain.last().unwrap();
                let next = adjacency
                    .get(&tail)
                    .and_then(|edges| edges.iter().find(|&&e| !used[e]).copied());
                match next {
                    Some(e) => {
                        used[e] = true;
                        chain.push(self.edges[e].other_node(tail));
                    }
                    None => break,
                }
                if chain.last() == chain.first() {
                    break;
                }
            }
            let longer = match &best {
                Some(b) => chain.len() > b.len(),
                None => true,
            };
            if longer {
                best = Some(chain);
            }
        }
        best.map(|chain| Polyline(chain.into_iter().map(|n| self.nodes[n].point).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> TriMesh {
        TriMesh::from_triangles(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(2.0, 2.0, 0.0),
                Point3::new(0.0, 2.0, 0.0),
            ],
            &[[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn adjacency_wiring() {
        let mesh = quad();
        assert_eq!(mesh.tris.len(), 2);
        assert_eq!(mesh.edges.len(), 5);
        let diagonal = mesh.edge_between(0, 2).unwrap();
        assert!(!mesh.edges[diagonal].is_boundary());
        assert_eq!(mesh.boundary_edges().count(), 4);
        assert!(mesh.nodes.iter().all(|n| n.on_border));
    }

    #[test]
    fn tri_nodes_are_distinct() {
        let mesh = quad();
        for t in mesh.live_tris() {
            let [a, b, c] = mesh.tri_nodes(t);
            assert!(a != b && b != c && a != c);
        }
    }

    #[test]
    fn delete_and_compact() {
        let mut mesh = quad();
        mesh.delete_triangle(1);
        assert_eq!(mesh.num_live_tris(), 1);
        mesh.compact();
        assert_eq!(mesh.tris.len(), 1);
        assert_eq!(mesh.nodes.len(), 3);
        assert_eq!(mesh.boundary_edges().count(), 3);
    }

    #[test]
    fn centroid_inside() {
        let mesh = quad();
        let c = mesh.centroid_xy().unwrap();
        assert!(c.x > 0.0 && c.x < 2.0 && c.y > 0.0 && c.y < 2.0);
    }

    #[test]
    fn outer_border_closes() {
        let mesh = quad();
        let border = mesh.outer_border().unwrap();
        assert_eq!(border.len(), 5);
        assert_eq!(border.first(), border.last());
    }

    #[test]
    fn degenerate_face_rejected() {
        let res = TriMesh::from_triangles(
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)],
            &[[0, 1, 1]],
        );
        assert!(res.is_err());
    }
}
