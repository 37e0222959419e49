//! Spherical smoothing in Fourier space.
//!
//! The overdensity is transformed once. Each radius then costs one window
//! multiply and one inverse transform, so radii are independent and run in
//! parallel against the shared read-only δ̂.

use std::str::FromStr;
use std::sync::Arc;

use rayon::prelude::*;
use rustfft::num_complex::Complex64;

use crate::error::VoidError;
use crate::fft::{FftEngine, FftWorkspace};
use crate::mesh::DensityField;

/// Below this `kR` the top-hat window uses its Taylor series.
const TOPHAT_SERIES_LIMIT: f64 = 1e-3;

/// Spherical window applied to δ̂.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WindowFunction {
  /// Sharp sphere: the smoothed value is the mean enclosed overdensity.
  #[default]
  TopHat,
  /// Gaussian with standard deviation R.
  Gaussian,
}

impl WindowFunction {
  /// Window value at `x = kR`.
  #[inline]
  pub fn eval(&self, x: f64) -> f64 {
    match self {
      WindowFunction::TopHat => tophat_window(x),
      WindowFunction::Gaussian => (-0.5 * x * x).exp(),
    }
  }
}

impl FromStr for WindowFunction {
  type Err = VoidError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "tophat" | "top-hat" | "top_hat" => Ok(WindowFunction::TopHat),
      "gaussian" | "gauss" => Ok(WindowFunction::Gaussian),
      other => Err(VoidError::InvalidMesh(format!(
        "unknown window '{other}' (expected tophat or gaussian)"
      ))),
    }
  }
}

/// Fourier transform of a unit-volume sphere: `3 (sin x - x cos x) / x³`.
#[inline]
pub fn tophat_window(x: f64) -> f64 {
  if x.abs() < TOPHAT_SERIES_LIMIT {
    let x2 = x * x;
    1.0 - x2 / 10.0 + x2 * x2 / 280.0
  } else {
    3.0 * (x.sin() - x * x.cos()) / (x * x * x)
  }
}

/// Mean enclosed overdensity at every node for one radius.
#[derive(Clone, Debug)]
pub struct SmoothedField {
  pub radius: f64,
  pub values: Vec<f64>,
}

/// Holds δ̂ and applies spherical windows to it.
#[derive(Clone, Debug)]
pub struct SphericalFilter {
  fft: Arc<FftEngine>,
  delta_k: Arc<Vec<Complex64>>,
  window: WindowFunction,
}

impl SphericalFilter {
  /// Transform the field once. Masked cells enter as zero.
  pub fn new(field: &DensityField, fft: Arc<FftEngine>, window: WindowFunction) -> Self {
    let _span = tracing::info_span!("filter::forward").entered();

    let mut workspace = fft.workspace();
    workspace
      .buffer_mut()
      .par_iter_mut()
      .zip(field.delta().par_iter())
      .zip(field.valid().par_iter())
      .for_each(|((c, &delta), &valid)| {
        *c = Complex64::new(if valid { delta } else { 0.0 }, 0.0);
      });
    fft.forward(&mut workspace);

    Self {
      delta_k: Arc::new(workspace.buffer().to_vec()),
      fft,
      window,
    }
  }

  pub fn window(&self) -> WindowFunction {
    self.window
  }

  pub fn fft(&self) -> &Arc<FftEngine> {
    &self.fft
  }

  /// Smooth with radius `radius`, reusing `workspace` for the transform.
  pub fn smooth(&self, radius: f64, workspace: &mut FftWorkspace) -> SmoothedField {
    let window = self.window;
    workspace
      .buffer_mut()
      .par_iter_mut()
      .zip(self.delta_k.par_iter())
      .zip(self.fft.kmag().par_iter())
      .for_each(|((c, &dk), &k)| *c = dk * window.eval(k * radius));
    self.fft.inverse(workspace);

    SmoothedField {
      radius,
      values: workspace.real_part(),
    }
  }
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod filter_test;
