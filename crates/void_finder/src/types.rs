//! Core data types: point catalogs, void candidates and catalogs.

use glam::DVec3;

use crate::cosmology::Cosmology;
use crate::error::{Result, VoidError};

/// Which catalog a point set represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogKind {
  /// Tracer positions (galaxies, halos).
  Data,
  /// Unclustered points sampling the survey window.
  Random,
}

impl CatalogKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      CatalogKind::Data => "data",
      CatalogKind::Random => "random",
    }
  }
}

/// Weighted 3-D point catalog in Cartesian coordinates.
///
/// Immutable once built. Weights default to 1.0.
#[derive(Clone, Debug)]
pub struct PointSet {
  kind: CatalogKind,
  positions: Vec<DVec3>,
  weights: Vec<f64>,
}

impl PointSet {
  /// Create a unit-weight point set from Cartesian positions.
  pub fn new(kind: CatalogKind, positions: Vec<DVec3>) -> Self {
    let weights = vec![1.0; positions.len()];
    Self {
      kind,
      positions,
      weights,
    }
  }

  /// Create a unit-weight point set from `[x, y, z]` rows.
  pub fn from_arrays(kind: CatalogKind, positions: &[[f64; 3]]) -> Self {
    Self::new(kind, positions.iter().map(|p| DVec3::from_array(*p)).collect())
  }

  /// Create a point set from `[ra, dec, redshift]` rows (degrees).
  pub fn from_sky(kind: CatalogKind, rdz: &[[f64; 3]], cosmology: &Cosmology) -> Self {
    Self::new(kind, cosmology.sky_to_cartesian(rdz))
  }

  /// Attach per-point weights.
  pub fn with_weights(mut self, weights: Vec<f64>) -> Result<Self> {
    if weights.len() != self.positions.len() {
      return Err(VoidError::WeightLengthMismatch {
        kind: self.kind.as_str(),
        positions: self.positions.len(),
        weights: weights.len(),
      });
    }
    self.weights = weights;
    Ok(self)
  }

  /// Same catalog with new positions and the original weights.
  pub(crate) fn with_positions(&self, positions: Vec<DVec3>) -> Self {
    debug_assert_eq!(positions.len(), self.weights.len());
    Self {
      kind: self.kind,
      positions,
      weights: self.weights.clone(),
    }
  }

  pub fn kind(&self) -> CatalogKind {
    self.kind
  }

  pub fn positions(&self) -> &[DVec3] {
    &self.positions
  }

  pub fn weights(&self) -> &[f64] {
    &self.weights
  }

  pub fn len(&self) -> usize {
    self.positions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }

  pub fn total_weight(&self) -> f64 {
    self.weights.iter().sum()
  }

  /// Check that the catalog has points, finite values and positive weight.
  pub fn validate(&self) -> Result<()> {
    let kind = self.kind.as_str();
    for (index, (p, w)) in self.positions.iter().zip(&self.weights).enumerate() {
      if !p.is_finite() || !w.is_finite() {
        return Err(VoidError::NonFiniteInput { kind, index });
      }
    }
    if self.is_empty() || self.total_weight() <= 0.0 {
      return Err(VoidError::EmptyCatalog { kind });
    }
    Ok(())
  }

  /// Axis-aligned bounds `(min, max)`, or `None` for an empty set.
  pub fn bounds(&self) -> Option<(DVec3, DVec3)> {
    let first = *self.positions.first()?;
    Some(
      self
        .positions
        .iter()
        .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p))),
    )
  }
}

/// A sphere passing the density threshold at one radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoidCandidate {
  /// Sphere center (a grid node position).
  pub center: DVec3,
  /// Sphere radius, one of the requested radii.
  pub radius: f64,
  /// Mean enclosed overdensity at that radius.
  pub delta: f64,
  /// Flat grid index of the center, used for deterministic ordering.
  pub grid_index: usize,
}

/// Accepted voids, in acceptance order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VoidCatalog {
  voids: Vec<VoidCandidate>,
}

impl VoidCatalog {
  pub fn new(voids: Vec<VoidCandidate>) -> Self {
    Self { voids }
  }

  pub fn voids(&self) -> &[VoidCandidate] {
    &self.voids
  }

  pub fn len(&self) -> usize {
    self.voids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.voids.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &VoidCandidate> {
    self.voids.iter()
  }

  /// Void centers as an N×3 array.
  pub fn positions(&self) -> Vec<[f64; 3]> {
    self.voids.iter().map(|v| v.center.to_array()).collect()
  }

  /// Void radii as an N array.
  pub fn radii(&self) -> Vec<f64> {
    self.voids.iter().map(|v| v.radius).collect()
  }
}

/// Caller-owned warnings gathered during a build or run.
///
/// Every entry is also emitted as a `tracing` warning.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
  warnings: Vec<String>,
}

impl Diagnostics {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn warn(&mut self, message: impl Into<String>) {
    let message = message.into();
    tracing::warn!("{message}");
    self.warnings.push(message);
  }

  pub fn warnings(&self) -> &[String] {
    &self.warnings
  }

  pub fn is_empty(&self) -> bool {
    self.warnings.is_empty()
  }

  pub fn extend(&mut self, other: &Diagnostics) {
    self.warnings.extend(other.warnings.iter().cloned());
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
