//! VoidFinder - builds the density field once, then runs void searches.
//!
//! ```text
//!   new():             validate ─► mesh ─► (reconstruct) ─► FFT plans ─► δ̂
//!   run_voidfinding(): validate ─► pool.install(par radii: smooth ─► extract)
//!                               ─► resolve ─► size function
//! ```

use std::sync::Arc;

use glam::DVec3;
use web_time::Instant;

use super::config::{SearchParams, VoidFinderConfig, VoidFinderInput};
use super::process::{process_radii, RadiusStats};
use crate::error::{RadiusFailure, Result, VoidError};
use crate::fft::FftEngine;
use crate::filter::SphericalFilter;
use crate::mesh::{build_mesh, DensityField, MeshSpec};
use crate::overlap::resolve;
use crate::recon::reconstruct;
use crate::types::{Diagnostics, VoidCatalog};
use crate::vsf::{size_function, VoidSizeFunction};

/// Timing, yields and warnings of one search.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
  /// Successful radii in ascending order.
  pub radii: Vec<RadiusStats>,
  pub candidate_count: usize,
  pub accepted_count: usize,
  pub total_us: u64,
  pub warnings: Vec<String>,
}

/// Result of [`VoidFinder::run_voidfinding`].
#[derive(Clone, Debug)]
pub struct VoidFindingOutput {
  pub catalog: VoidCatalog,
  pub vsf: VoidSizeFunction,
  /// Radii that failed while others succeeded.
  pub failures: Vec<RadiusFailure>,
  pub report: RunReport,
}

impl VoidFindingOutput {
  /// Void centers, N×3.
  pub fn void_positions(&self) -> Vec<[f64; 3]> {
    self.catalog.positions()
  }

  /// Void radii, N.
  pub fn void_radii(&self) -> Vec<f64> {
    self.catalog.radii()
  }

  /// Size function rows `[center, count, density]`.
  pub fn void_vsf(&self) -> Vec<[f64; 3]> {
    self.vsf.to_rows()
  }
}

/// Spherical void finder over one density field.
#[derive(Debug)]
pub struct VoidFinder {
  field: DensityField,
  filter: SphericalFilter,
  diagnostics: Diagnostics,
}

impl VoidFinder {
  /// Validate the configuration and build the (possibly reconstructed)
  /// density field.
  ///
  /// # Errors
  ///
  /// Configuration errors are returned before any mesh or FFT work:
  /// `MissingInput`, `InvalidMesh`, `InvalidReconstruction` and
  /// `ReconstructionWithoutCatalog`. Catalog and geometry problems follow
  /// from the mesh build.
  pub fn new(input: VoidFinderInput, config: VoidFinderConfig) -> Result<Self> {
    let _span = tracing::info_span!("void_finder::new").entered();
    let start = Instant::now();
    let mut diagnostics = Diagnostics::new();

    config.mesh.validate()?;
    if let Some(params) = &config.reconstruction {
      params.validate()?;
    }
    let VoidFinderInput { data, random, mesh } = input;
    match (&data, &mesh) {
      (None, None) => return Err(VoidError::MissingInput),
      (None, Some(_)) if config.reconstruction.is_some() => {
        return Err(VoidError::ReconstructionWithoutCatalog)
      }
      (Some(_), _) if !config.mesh.box_like && random.is_none() => {
        return Err(VoidError::InvalidMesh(
          "a survey mesh needs a random catalog; set box_like for periodic boxes".into(),
        ))
      }
      _ => {}
    }

    let field = match data {
      Some(data) => {
        if mesh.is_some() {
          diagnostics.warn("both a data catalog and a precomputed mesh were given; the mesh is ignored");
        }
        data.validate()?;
        if let Some(random) = &random {
          random.validate()?;
        }
        let spec = MeshSpec::derive(&config.mesh, &data, random.as_ref())?;
        tracing::info!(nmesh = ?spec.nmesh(), cellsize = ?spec.cellsize(), "mesh geometry");
        let field = build_mesh(
          &data,
          random.as_ref(),
          &spec,
          config.mesh.assignment,
          config.mesh.min_random_fraction,
          &mut diagnostics,
        )?;
        match &config.reconstruction {
          Some(params) => {
            reconstruct(
              &field,
              &data,
              random.as_ref(),
              params,
              config.mesh.assignment,
              config.mesh.min_random_fraction,
              &mut diagnostics,
            )?
            .field
          }
          None => field,
        }
      }
      None => {
        if random.is_some() {
          diagnostics.warn("random catalog ignored without a data catalog");
        }
        let mesh = mesh.ok_or(VoidError::MissingInput)?;
        let spec = MeshSpec::for_shape(mesh.shape, &config.mesh)?;
        DensityField::from_precomputed(mesh, &spec, &mut diagnostics)?
      }
    };

    let fft = Arc::new(FftEngine::new(field.spec()));
    let filter = SphericalFilter::new(&field, fft, config.window);

    tracing::info!(
      cells = field.spec().len(),
      masked = field.masked_count(),
      elapsed_ms = start.elapsed().as_millis() as u64,
      "density field ready"
    );

    Ok(Self {
      field,
      filter,
      diagnostics,
    })
  }

  /// The field searched for voids, for the caller to persist.
  pub fn density_field(&self) -> &DensityField {
    &self.field
  }

  /// Warnings raised while building the field.
  pub fn diagnostics(&self) -> &Diagnostics {
    &self.diagnostics
  }

  /// Search every radius, resolve overlaps and bin the size function.
  ///
  /// # Errors
  ///
  /// `EmptyRadii`, `InvalidRadius`, `InvalidThreshold`, `InvalidOverlap`
  /// and `InvalidBinning` before any work; `AllRadiiFailed` if no radius
  /// succeeds.
  pub fn run_voidfinding(&self, params: &SearchParams) -> Result<VoidFindingOutput> {
    let _span = tracing::info_span!("run_voidfinding").entered();
    let start = Instant::now();
    let mut diagnostics = Diagnostics::new();
    diagnostics.extend(&self.diagnostics);

    let radii = params.validate(&mut diagnostics)?;
    let spec = self.field.spec();
    let min_cell = spec.cellsize().min_element();
    for &radius in radii.iter().filter(|&&r| r < min_cell) {
      diagnostics.warn(format!(
        "radius {radius} is smaller than the cell size {min_cell}; results are grid dominated"
      ));
    }

    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(params.threads)
      .build()
      .map_err(|e| VoidError::ThreadPool(e.to_string()))?;
    tracing::info!(radii = radii.len(), threads = pool.current_num_threads(), "searching");

    let outcomes = pool.install(|| process_radii(&self.filter, &self.field, &radii, params.void_delta));

    let mut candidates = Vec::new();
    let mut stats = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
      match outcome {
        Ok(result) => {
          candidates.extend(result.candidates);
          stats.push(result.stats);
        }
        Err(failure) => {
          diagnostics.warn(failure.to_string());
          failures.push(failure);
        }
      }
    }
    if stats.is_empty() {
      let cause = Box::new(failures[0].error.clone());
      return Err(VoidError::AllRadiiFailed { failures, cause });
    }

    let candidate_count = candidates.len();
    if candidate_count == 0 {
      diagnostics.warn(format!(
        "no candidates below void_delta = {} at any radius",
        params.void_delta
      ));
    }
    let periodic_box: Option<DVec3> = spec.box_like().then_some(spec.boxsize());
    let catalog = resolve(candidates, params.void_overlap, periodic_box);
    let vsf = size_function(&catalog, &params.binning, &radii, self.field.survey_volume())?;

    let report = RunReport {
      radii: stats,
      candidate_count,
      accepted_count: catalog.len(),
      total_us: start.elapsed().as_micros() as u64,
      warnings: diagnostics.warnings().to_vec(),
    };
    tracing::info!(
      candidates = report.candidate_count,
      accepted = report.accepted_count,
      failed = failures.len(),
      total_ms = report.total_us / 1000,
      "void search done"
    );

    Ok(VoidFindingOutput {
      catalog,
      vsf,
      failures,
      report,
    })
  }
}

#[cfg(test)]
#[path = "finder_test.rs"]
mod finder_test;
