//! Finder inputs, build configuration and search parameters.

use crate::error::{Result, VoidError};
use crate::filter::WindowFunction;
use crate::mesh::{MeshOptions, PrecomputedMesh};
use crate::recon::ReconstructionParams;
use crate::types::{Diagnostics, PointSet};
use crate::vsf::VsfBinning;

/// Default overdensity threshold for a void.
pub const DEFAULT_VOID_DELTA: f64 = -0.8;

/// Catalogs or a precomputed mesh. Catalogs win when both are given.
#[derive(Clone, Debug, Default)]
pub struct VoidFinderInput {
  pub data: Option<PointSet>,
  pub random: Option<PointSet>,
  pub mesh: Option<PrecomputedMesh>,
}

impl VoidFinderInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_data(mut self, data: PointSet) -> Self {
    self.data = Some(data);
    self
  }

  pub fn with_random(mut self, random: PointSet) -> Self {
    self.random = Some(random);
    self
  }

  pub fn with_mesh(mut self, mesh: PrecomputedMesh) -> Self {
    self.mesh = Some(mesh);
    self
  }
}

/// How the density field is built.
#[derive(Clone, Debug, Default)]
pub struct VoidFinderConfig {
  pub mesh: MeshOptions,
  /// Run reconstruction before the search.
  pub reconstruction: Option<ReconstructionParams>,
  pub window: WindowFunction,
}

impl VoidFinderConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_mesh(mut self, mesh: MeshOptions) -> Self {
    self.mesh = mesh;
    self
  }

  pub fn with_reconstruction(mut self, params: ReconstructionParams) -> Self {
    self.reconstruction = Some(params);
    self
  }

  pub fn with_window(mut self, window: WindowFunction) -> Self {
    self.window = window;
    self
  }
}

/// Parameters of one void search.
#[derive(Clone, Debug)]
pub struct SearchParams {
  /// Sphere radii to search, in the mesh's length units.
  pub radii: Vec<f64>,
  /// Maximum mean enclosed overdensity of a void.
  pub void_delta: f64,
  /// Allowed shared volume fraction between accepted voids, in [0, 1].
  pub void_overlap: f64,
  /// Worker threads; 0 uses every core.
  pub threads: usize,
  pub binning: VsfBinning,
}

impl Default for SearchParams {
  fn default() -> Self {
    Self {
      radii: Vec::new(),
      void_delta: DEFAULT_VOID_DELTA,
      void_overlap: 0.0,
      threads: 0,
      binning: VsfBinning::default(),
    }
  }
}

impl SearchParams {
  pub fn new(radii: Vec<f64>) -> Self {
    Self {
      radii,
      ..Self::default()
    }
  }

  pub fn with_void_delta(mut self, void_delta: f64) -> Self {
    self.void_delta = void_delta;
    self
  }

  pub fn with_void_overlap(mut self, void_overlap: f64) -> Self {
    self.void_overlap = void_overlap;
    self
  }

  pub fn with_threads(mut self, threads: usize) -> Self {
    self.threads = threads;
    self
  }

  pub fn with_binning(mut self, binning: VsfBinning) -> Self {
    self.binning = binning;
    self
  }

  /// Validate and return the radii sorted ascending without duplicates.
  pub fn validate(&self, diagnostics: &mut Diagnostics) -> Result<Vec<f64>> {
    if self.radii.is_empty() {
      return Err(VoidError::EmptyRadii);
    }
    if let Some(&bad) = self.radii.iter().find(|r| !(r.is_finite() && **r > 0.0)) {
      return Err(VoidError::InvalidRadius(bad));
    }
    if !self.void_delta.is_finite() {
      return Err(VoidError::InvalidThreshold(self.void_delta));
    }
    if !(0.0..=1.0).contains(&self.void_overlap) {
      return Err(VoidError::InvalidOverlap(self.void_overlap));
    }
    self.binning.validate()?;

    let mut radii = self.radii.clone();
    radii.sort_by(f64::total_cmp);
    radii.dedup();
    if radii.len() < self.radii.len() {
      diagnostics.warn(format!(
        "{} duplicate radii ignored",
        self.radii.len() - radii.len()
      ));
    }
    Ok(radii)
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
