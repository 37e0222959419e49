//! Per-radius work: smooth, then extract.
//!
//! Radii run in parallel with one [`FftWorkspace`] per worker. Every task is
//! isolated: an error or a panic becomes that radius' failure and the other
//! radii carry on.

use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;
use web_time::Instant;

use crate::error::{RadiusFailure, Result, VoidError};
use crate::extract::extract;
use crate::fft::FftWorkspace;
use crate::filter::SphericalFilter;
use crate::mesh::DensityField;
use crate::types::VoidCandidate;

/// Timing and yield of one radius.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RadiusStats {
  pub radius: f64,
  pub candidates: usize,
  pub smooth_us: u64,
  pub extract_us: u64,
}

/// Candidates of one successful radius.
#[derive(Clone, Debug)]
pub struct RadiusResult {
  pub candidates: Vec<VoidCandidate>,
  pub stats: RadiusStats,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic payload".to_string()
  }
}

/// Smooth and extract a single radius.
pub fn process_radius(
  filter: &SphericalFilter,
  field: &DensityField,
  radius: f64,
  void_delta: f64,
  workspace: &mut FftWorkspace,
) -> Result<RadiusResult> {
  let _span = tracing::info_span!("radius", radius).entered();

  let half_extent = field.spec().half_extent();
  if radius > half_extent {
    return Err(VoidError::RadiusTooLarge { radius, half_extent });
  }

  let t0 = Instant::now();
  let smoothed = filter.smooth(radius, workspace);
  let smooth_us = t0.elapsed().as_micros() as u64;

  let t1 = Instant::now();
  let candidates = extract(&smoothed, void_delta, field)?;
  let extract_us = t1.elapsed().as_micros() as u64;

  let stats = RadiusStats {
    radius,
    candidates: candidates.len(),
    smooth_us,
    extract_us,
  };
  Ok(RadiusResult { candidates, stats })
}

/// Process every radius in parallel on the current rayon pool.
///
/// Results come back in the order of `radii`.
pub fn process_radii(
  filter: &SphericalFilter,
  field: &DensityField,
  radii: &[f64],
  void_delta: f64,
) -> Vec<std::result::Result<RadiusResult, RadiusFailure>> {
  radii
    .par_iter()
    .map_init(
      || filter.fft().workspace(),
      |workspace, &radius| {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
          process_radius(filter, field, radius, void_delta, workspace)
        }));
        let error = match outcome {
          Ok(Ok(result)) => return Ok(result),
          Ok(Err(error)) => error,
          Err(payload) => VoidError::TaskPanicked {
            radius,
            message: panic_message(payload.as_ref()),
          },
        };
        tracing::warn!(radius, %error, "radius failed");
        Err(RadiusFailure { radius, error })
      },
    )
    .collect()
}

#[cfg(test)]
#[path = "process_test.rs"]
mod process_test;
