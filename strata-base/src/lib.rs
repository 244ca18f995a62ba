//! Basic structs and traits: importing cgmath, tolerance, bounding boxes, plane frames

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

/// Defines bounding box
pub mod bounding_box;
/// Redefines vectors, matrices or points with scalar = f64.
pub mod cgmath64;
/// Deterministic hash functions
pub mod hash;
/// Best-fit planes and the plane-local frame for near-vertical surfaces
pub mod plane;
/// Setting Tolerance
pub mod tolerance;
