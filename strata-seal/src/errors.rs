use thiserror::Error;

/// Errors that can abort a sealing run.
#[derive(Debug, Error)]
pub enum Error {
    /// `pad_model` needs at least one input horizon.
    #[error("No input horizons to pad.")]
    NoInputSurfaces,
    /// A phase was called before `pad_model`.
    #[error("The model must be padded first.")]
    NotPadded,
    /// An export was requested before `seal_padded_model`.
    #[error("The model must be sealed first.")]
    NotSealed,
    /// Detachment sealing without a padded detachment.
    #[error("No detachment surface is set.")]
    NoDetachment,
    /// A sealed border that should close could not be traversed.
    #[error("Sealed outline of surface {0} does not close.")]
    OpenOutline(i64),
    /// No outline polygon contains an interior point of the surface, even
    /// after the inscribed-point fallback search.
    #[error("No outline polygon contains an interior point of surface {0}.")]
    CentroidOutsidePolygon(i64),
    /// A splice endpoint could not be resolved onto its partner line.
    #[error("Splice endpoint of intersection line {0} cannot be resolved.")]
    UnresolvedSplice(usize),
    /// A mesh-level failure.
    #[error(transparent)]
    Mesh(#[from] strata_mesh::errors::Error),
    /// I/O failure while writing reports or export files.
    #[error(transparent)]
    FromIO(#[from] std::io::Error),
}
