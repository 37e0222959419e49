//! void_finder - spherical-overdensity void finding on density meshes
//!
//! Galaxy positions (and, for surveys, a random catalog tracing the
//! footprint) are painted onto a regular mesh as an overdensity field δ.
//! The field is smoothed with a spherical window at every requested radius
//! and local minima below a threshold become void candidates. Overlapping
//! candidates are resolved greedily, largest and emptiest first, and the
//! survivors are binned into a void size function.
//!
//! # Features
//!
//! - **Mesh building**: NGP/CIC/TSC assignment, survey or periodic box
//!   geometry, precomputed meshes
//! - **Reconstruction**: optional Zel'dovich displacement removal with or
//!   without redshift-space distortions
//! - **Parallel search**: one FFT of δ, one inverse per radius, radii
//!   processed on a rayon pool with per-radius failure isolation
//! - **Deterministic output**: identical catalogs for any thread count
//!
//! # Example
//!
//! ```ignore
//! use void_finder::{MeshOptions, PointSet, CatalogKind, SearchParams, VoidFinder,
//!   VoidFinderConfig, VoidFinderInput};
//!
//! let data = PointSet::from_arrays(CatalogKind::Data, &positions);
//! let config = VoidFinderConfig::new()
//!   .with_mesh(MeshOptions::new().with_box_like(true).with_boxsize(1000.0));
//! let finder = VoidFinder::new(VoidFinderInput::new().with_data(data), config)?;
//!
//! let output = finder.run_voidfinding(&SearchParams::new(vec![10.0, 20.0, 30.0]))?;
//! println!("{} voids", output.catalog.len());
//! ```

pub mod cosmology;
pub mod error;
pub mod extract;
pub mod fft;
pub mod filter;
pub mod mesh;
pub mod overlap;
pub mod pipeline;
pub mod recon;
pub mod types;
pub mod vsf;

// Re-export commonly used items
pub use cosmology::Cosmology;
pub use error::{RadiusFailure, Result, VoidError};
pub use extract::{extract, sphere_offsets};
pub use fft::{FftEngine, FftWorkspace};
pub use filter::{SmoothedField, SphericalFilter, WindowFunction};
pub use mesh::{build_mesh, DensityField, MassAssignment, MeshOptions, MeshSpec, PrecomputedMesh};
pub use overlap::{intersection_volume, resolve};
pub use pipeline::{
  RadiusStats, RunReport, SearchParams, VoidFinder, VoidFinderConfig, VoidFinderInput,
  VoidFindingOutput, DEFAULT_VOID_DELTA,
};
pub use recon::{LineOfSight, ReconEngine, ReconMode, ReconstructionParams};
pub use types::{CatalogKind, Diagnostics, PointSet, VoidCandidate, VoidCatalog};
pub use vsf::{size_function, VoidSizeFunction, VsfBin, VsfBinning};

pub use glam::DVec3;
