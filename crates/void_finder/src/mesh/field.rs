//! DensityField - the overdensity mesh consumed by every downstream stage.
//!
//! ```text
//!   data ──paint──► n_d ─┐
//!                        ├──► δ = n_d / (α n_r) - 1   where n_r > threshold
//!   random ─paint─► n_r ─┘    δ = -1, masked          elsewhere
//! ```
//!
//! Periodic boxes may omit randoms: δ = n_d / mean(n_d) - 1 everywhere.

use super::assign::{paint, MassAssignment};
use super::spec::MeshSpec;
use crate::error::{Result, VoidError};
use crate::types::{Diagnostics, PointSet};

/// Overdensity on a regular grid plus a validity mask.
#[derive(Clone, Debug)]
pub struct DensityField {
  spec: MeshSpec,
  delta: Vec<f64>,
  valid: Vec<bool>,
  alpha: f64,
}

/// Precomputed overdensity values supplied instead of catalogs.
#[derive(Clone, Debug)]
pub struct PrecomputedMesh {
  pub values: Vec<f64>,
  pub shape: [usize; 3],
  pub mask: Option<Vec<bool>>,
}

impl PrecomputedMesh {
  pub fn new(values: Vec<f64>, shape: [usize; 3]) -> Self {
    Self {
      values,
      shape,
      mask: None,
    }
  }

  pub fn with_mask(mut self, mask: Vec<bool>) -> Self {
    self.mask = Some(mask);
    self
  }
}

/// Build the overdensity field from catalogs.
///
/// # Errors
///
/// * `EmptyCatalog` / `NonFiniteInput` for unusable catalogs
/// * `PointsOutsideBox` if the mesh box does not contain every point
/// * `InvalidMesh` for a survey (non-periodic) mesh without randoms
pub fn build_mesh(
  data: &PointSet,
  random: Option<&PointSet>,
  spec: &MeshSpec,
  scheme: MassAssignment,
  min_random_fraction: f64,
  diagnostics: &mut Diagnostics,
) -> Result<DensityField> {
  let _span = tracing::info_span!("mesh::build", nmesh = ?spec.nmesh()).entered();

  data.validate()?;
  spec.check_contains(data)?;
  if let Some(random) = random {
    random.validate()?;
    spec.check_contains(random)?;
  }

  let n_data = paint(data, spec, scheme);

  let Some(random) = random else {
    if !spec.box_like() {
      return Err(VoidError::InvalidMesh(
        "a survey mesh needs a random catalog; set box_like for periodic boxes".into(),
      ));
    }
    let mean = data.total_weight() / spec.len() as f64;
    let delta = n_data.iter().map(|n| n / mean - 1.0).collect();
    return Ok(DensityField {
      valid: vec![true; spec.len()],
      spec: spec.clone(),
      delta,
      alpha: 1.0,
    });
  };

  let n_random = paint(random, spec, scheme);
  let alpha = data.total_weight() / random.total_weight();

  let occupied: Vec<f64> = n_random.iter().copied().filter(|&n| n > 0.0).collect();
  let mean_occupied = occupied.iter().sum::<f64>() / occupied.len().max(1) as f64;
  let threshold = min_random_fraction * mean_occupied;

  let mut delta = vec![-1.0; spec.len()];
  let mut valid = vec![false; spec.len()];
  for i in 0..spec.len() {
    if n_random[i] > threshold && n_random[i] > 0.0 {
      delta[i] = n_data[i] / (alpha * n_random[i]) - 1.0;
      valid[i] = true;
    }
  }

  let field = DensityField {
    spec: spec.clone(),
    delta,
    valid,
    alpha,
  };

  let masked = field.masked_count();
  if masked > 0 {
    tracing::debug!(masked, total = spec.len(), "cells without random coverage masked");
  }
  let stray = field
    .delta
    .iter()
    .zip(&field.valid)
    .zip(&n_data)
    .filter(|((_, valid), nd)| !**valid && **nd > 0.0)
    .count();
  if stray > 0 {
    diagnostics.warn(format!(
      "{stray} cells hold data weight but no random coverage; they are masked"
    ));
  }

  Ok(field)
}

impl DensityField {
  /// Accept a precomputed overdensity mesh after validating its shape.
  ///
  /// Non-finite values are masked and replaced by zero.
  pub fn from_precomputed(
    mesh: PrecomputedMesh,
    spec: &MeshSpec,
    diagnostics: &mut Diagnostics,
  ) -> Result<Self> {
    if mesh.shape != spec.nmesh() || mesh.values.len() != spec.len() {
      return Err(VoidError::MeshShapeMismatch {
        expected: spec.nmesh(),
        actual: mesh.shape,
      });
    }
    let mut valid = match mesh.mask {
      Some(mask) if mask.len() == spec.len() => mask,
      Some(mask) => {
        return Err(VoidError::InvalidMesh(format!(
          "mask has {} cells, mesh has {}",
          mask.len(),
          spec.len()
        )))
      }
      None => vec![true; spec.len()],
    };

    let mut delta = mesh.values;
    let mut non_finite = 0usize;
    for (value, valid) in delta.iter_mut().zip(valid.iter_mut()) {
      if !value.is_finite() {
        *value = 0.0;
        *valid = false;
        non_finite += 1;
      }
    }
    if non_finite > 0 {
      diagnostics.warn(format!(
        "precomputed mesh has {non_finite} non-finite cells; they are masked"
      ));
    }

    Ok(Self {
      spec: spec.clone(),
      delta,
      valid,
      alpha: 1.0,
    })
  }

  /// Mask every cell outside `footprint`. Newly masked cells read δ = -1.
  pub fn restrict_to(&mut self, footprint: &[bool]) {
    debug_assert_eq!(footprint.len(), self.valid.len());
    for ((delta, valid), &inside) in self.delta.iter_mut().zip(self.valid.iter_mut()).zip(footprint) {
      if *valid && !inside {
        *valid = false;
        *delta = -1.0;
      }
    }
  }

  pub fn spec(&self) -> &MeshSpec {
    &self.spec
  }

  /// Overdensity values, row-major with Z innermost.
  pub fn delta(&self) -> &[f64] {
    &self.delta
  }

  /// Per-cell validity; false where the survey has no random coverage.
  pub fn valid(&self) -> &[bool] {
    &self.valid
  }

  /// Data-to-random weight ratio (1 when no randoms were used).
  pub fn alpha(&self) -> f64 {
    self.alpha
  }

  #[inline]
  pub fn is_valid(&self, index: usize) -> bool {
    self.valid[index]
  }

  pub fn valid_count(&self) -> usize {
    self.valid.iter().filter(|&&v| v).count()
  }

  pub fn masked_count(&self) -> usize {
    self.spec.len() - self.valid_count()
  }

  pub fn has_mask(&self) -> bool {
    self.valid.iter().any(|&v| !v)
  }

  /// Volume searched for voids: the whole box for periodic meshes, the
  /// valid cells otherwise.
  pub fn survey_volume(&self) -> f64 {
    if self.spec.box_like() {
      self.spec.box_volume()
    } else {
      self.valid_count() as f64 * self.spec.cell_volume()
    }
  }

  /// Mean overdensity over valid cells.
  pub fn mean_delta(&self) -> f64 {
    let (sum, count) = self
      .delta
      .iter()
      .zip(&self.valid)
      .filter(|(_, &valid)| valid)
      .fold((0.0, 0usize), |(s, c), (d, _)| (s + d, c + 1));
    if count == 0 {
      0.0
    } else {
      sum / count as f64
    }
  }
}

#[cfg(test)]
#[path = "field_test.rs"]
mod field_test;
