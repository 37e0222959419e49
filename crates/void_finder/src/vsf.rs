//! Void size function: differential number density of voids per unit radius.

use crate::error::{Result, VoidError};
use crate::types::VoidCatalog;

/// How radius bins are chosen.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum VsfBinning {
  /// Edges at midpoints between consecutive searched radii, outer edges
  /// mirrored. A single radius `R` gets `[R/2, 3R/2]`.
  #[default]
  FromRadii,
  /// Explicit, strictly increasing edges.
  Edges(Vec<f64>),
}

impl VsfBinning {
  /// Check explicit edges; radius-derived edges are always valid.
  pub fn validate(&self) -> Result<()> {
    match self {
      VsfBinning::FromRadii => Ok(()),
      VsfBinning::Edges(edges) => validate_edges(edges),
    }
  }
}

/// One histogram bin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VsfBin {
  pub center: f64,
  pub lower: f64,
  pub upper: f64,
  pub count: usize,
  /// `count / (upper - lower) / survey_volume`.
  pub density: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VoidSizeFunction {
  bins: Vec<VsfBin>,
  survey_volume: f64,
}

impl VoidSizeFunction {
  pub fn bins(&self) -> &[VsfBin] {
    &self.bins
  }

  pub fn len(&self) -> usize {
    self.bins.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bins.is_empty()
  }

  pub fn survey_volume(&self) -> f64 {
    self.survey_volume
  }

  /// Rows of `[center, count, density]`.
  pub fn to_rows(&self) -> Vec<[f64; 3]> {
    self
      .bins
      .iter()
      .map(|b| [b.center, b.count as f64, b.density])
      .collect()
  }
}

/// Bin edges derived from the searched radii.
pub fn edges_from_radii(radii: &[f64]) -> Result<Vec<f64>> {
  let mut sorted: Vec<f64> = radii.to_vec();
  sorted.sort_by(f64::total_cmp);
  sorted.dedup();
  match sorted.as_slice() {
    [] => Err(VoidError::InvalidBinning("no radii to bin".into())),
    [r] => Ok(vec![0.5 * r, 1.5 * r]),
    _ => {
      let mut edges = Vec::with_capacity(sorted.len() + 1);
      let first_mid = 0.5 * (sorted[0] + sorted[1]);
      edges.push((sorted[0] - (first_mid - sorted[0])).max(0.0));
      edges.extend(sorted.windows(2).map(|w| 0.5 * (w[0] + w[1])));
      let n = sorted.len();
      let last_mid = 0.5 * (sorted[n - 2] + sorted[n - 1]);
      edges.push(sorted[n - 1] + (sorted[n - 1] - last_mid));
      Ok(edges)
    }
  }
}

fn validate_edges(edges: &[f64]) -> Result<()> {
  if edges.len() < 2 {
    return Err(VoidError::InvalidBinning(format!(
      "need at least 2 edges, got {}",
      edges.len()
    )));
  }
  if edges.iter().any(|e| !e.is_finite()) {
    return Err(VoidError::InvalidBinning("edges must be finite".into()));
  }
  if edges.windows(2).any(|w| w[1] <= w[0]) {
    return Err(VoidError::InvalidBinning("edges must be strictly increasing".into()));
  }
  Ok(())
}

/// Histogram the catalog radii.
///
/// Bins are half-open `[lower, upper)` except the last, which includes its
/// upper edge. Radii outside every bin are not counted.
pub fn size_function(
  catalog: &VoidCatalog,
  binning: &VsfBinning,
  radii: &[f64],
  survey_volume: f64,
) -> Result<VoidSizeFunction> {
  let edges = match binning {
    VsfBinning::FromRadii => edges_from_radii(radii)?,
    VsfBinning::Edges(edges) => edges.clone(),
  };
  validate_edges(&edges)?;
  if !(survey_volume.is_finite() && survey_volume > 0.0) {
    return Err(VoidError::InvalidBinning(format!(
      "survey volume must be positive, got {survey_volume}"
    )));
  }

  let nbins = edges.len() - 1;
  let mut counts = vec![0usize; nbins];
  for radius in catalog.radii() {
    let last = edges[nbins];
    if radius == last {
      counts[nbins - 1] += 1;
      continue;
    }
    // First edge strictly above the radius.
    let upper = edges.partition_point(|&e| e <= radius);
    if upper >= 1 && upper <= nbins {
      counts[upper - 1] += 1;
    }
  }

  let bins = counts
    .into_iter()
    .enumerate()
    .map(|(i, count)| {
      let (lower, upper) = (edges[i], edges[i + 1]);
      VsfBin {
        center: 0.5 * (lower + upper),
        lower,
        upper,
        count,
        density: count as f64 / (upper - lower) / survey_volume,
      }
    })
    .collect();

  Ok(VoidSizeFunction { bins, survey_volume })
}

#[cfg(test)]
#[path = "vsf_test.rs"]
mod vsf_test;
