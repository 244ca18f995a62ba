use thiserror::Error;

/// Errors that can occur while building or editing meshes.
#[derive(Debug, Error)]
pub enum Error {
    /// A face references a node index past the end of the node array.
    #[error("Face references node {0} out of range.")]
    NodeOutOfRange(usize),
    /// A face repeats one of its nodes.
    #[error("Degenerate face: a node is repeated.")]
    DegenerateFace,
    /// An edge would be shared by more than two triangles.
    #[error("Non-manifold edge between nodes {0} and {1}.")]
    NonManifoldEdge(usize, usize),
    /// A positions matrix has rows of unequal length.
    #[error("This 2-dim array is irregular.")]
    IrregularArray,
    /// A grid needs at least two rows and two columns.
    #[error("Grid of {nrow}x{ncol} is too small to triangulate.")]
    GridTooSmall {
        /// rows supplied
        nrow: usize,
        /// columns supplied
        ncol: usize,
    },
    /// The mesh has no live triangles.
    #[error("Empty mesh.")]
    EmptyMesh,
    /// A polyline needs at least two distinct points.
    #[error("Polyline with fewer than two distinct points.")]
    ShortPolyline,
    /// I/O failure while writing or reading mesh data.
    #[error(transparent)]
    FromIO(#[from] std::io::Error),
}
