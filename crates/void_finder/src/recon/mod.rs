//! Linear (Zel'dovich) reconstruction.
//!
//! Estimates the large-scale displacement field from the overdensity, moves
//! the catalogs back along it and re-grids the result. Runs once, before the
//! void search, when a [`ReconstructionParams`] is configured.

pub mod displacement;
pub mod params;

pub use displacement::{displacement_field, padded_spec, reconstruct, Reconstructed};
pub use params::{LineOfSight, ReconEngine, ReconMode, ReconstructionParams};
