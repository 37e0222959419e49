//! Reconstruction parameters.
//!
//! Built from named fields with `with_*` builders, or from the positional
//! token list `f bias los smoothing_radius recon_pad engine` (any prefix).

use std::str::FromStr;

use glam::DVec3;

use crate::error::{Result, VoidError};

/// Which displacements are removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReconMode {
  /// Real-space Zel'dovich displacement; data and randoms move.
  #[default]
  Disp,
  /// Redshift-space distortions only; randoms stay.
  Rsd,
  /// Both.
  DispRsd,
}

impl ReconMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      ReconMode::Disp => "disp",
      ReconMode::Rsd => "rsd",
      ReconMode::DispRsd => "disp+rsd",
    }
  }

  /// True if the real-space displacement is removed.
  pub fn removes_displacement(&self) -> bool {
    matches!(self, ReconMode::Disp | ReconMode::DispRsd)
  }

  /// True if the redshift-space term is removed.
  pub fn removes_rsd(&self) -> bool {
    matches!(self, ReconMode::Rsd | ReconMode::DispRsd)
  }
}

impl FromStr for ReconMode {
  type Err = VoidError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "disp" => Ok(ReconMode::Disp),
      "rsd" => Ok(ReconMode::Rsd),
      "disp+rsd" | "disprsd" | "disp_rsd" => Ok(ReconMode::DispRsd),
      other => Err(VoidError::InvalidReconstruction(format!(
        "unknown reconstruction mode '{other}' (expected disp, rsd or disp+rsd)"
      ))),
    }
  }
}

/// Line-of-sight direction for redshift-space distortions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineOfSight {
  /// Radial from the observer at the origin.
  #[default]
  Local,
  /// Fixed Cartesian axis (0 = x, 1 = y, 2 = z).
  Axis(usize),
}

impl LineOfSight {
  /// Unit vector at `position`; zero at the observer for `Local`.
  #[inline]
  pub fn direction(&self, position: DVec3) -> DVec3 {
    match self {
      LineOfSight::Local => position.normalize_or_zero(),
      LineOfSight::Axis(0) => DVec3::X,
      LineOfSight::Axis(1) => DVec3::Y,
      LineOfSight::Axis(_) => DVec3::Z,
    }
  }
}

impl FromStr for LineOfSight {
  type Err = VoidError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "local" => Ok(LineOfSight::Local),
      "x" => Ok(LineOfSight::Axis(0)),
      "y" => Ok(LineOfSight::Axis(1)),
      "z" => Ok(LineOfSight::Axis(2)),
      other => Err(VoidError::InvalidReconstruction(format!(
        "unknown line of sight '{other}' (expected local, x, y or z)"
      ))),
    }
  }
}

/// Displacement solver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReconEngine {
  /// Single-pass Fourier-space Zel'dovich solve.
  #[default]
  Fft,
}

impl FromStr for ReconEngine {
  type Err = VoidError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "fft" => Ok(ReconEngine::Fft),
      other => Err(VoidError::InvalidReconstruction(format!(
        "unknown reconstruction engine '{other}' (expected fft)"
      ))),
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReconstructionParams {
  pub mode: ReconMode,
  /// Linear growth rate.
  pub f: f64,
  /// Linear tracer bias.
  pub bias: f64,
  pub los: LineOfSight,
  /// Gaussian smoothing radius applied before solving.
  pub smoothing_radius: f64,
  /// Zero-padding factor for survey meshes (>= 1).
  pub recon_pad: f64,
  pub engine: ReconEngine,
}

impl Default for ReconstructionParams {
  fn default() -> Self {
    Self {
      mode: ReconMode::default(),
      f: 0.8,
      bias: 2.0,
      los: LineOfSight::default(),
      smoothing_radius: 15.0,
      recon_pad: 1.5,
      engine: ReconEngine::default(),
    }
  }
}

const TOKEN_NAMES: [&str; 6] = ["f", "bias", "los", "smoothing_radius", "recon_pad", "engine"];

fn parse_number(name: &str, token: &str) -> Result<f64> {
  token.trim().parse::<f64>().map_err(|_| {
    VoidError::InvalidReconstruction(format!("{name} must be a number, got '{token}'"))
  })
}

impl ReconstructionParams {
  pub fn new(mode: ReconMode) -> Self {
    Self {
      mode,
      ..Self::default()
    }
  }

  /// Parse positional tokens in the order `f bias los smoothing_radius
  /// recon_pad engine`. Missing trailing tokens keep their defaults.
  pub fn from_tokens<S: AsRef<str>>(mode: ReconMode, tokens: &[S]) -> Result<Self> {
    let mut params = Self::new(mode);
    params.apply_tokens(tokens)?;
    Ok(params)
  }

  /// Override the leading positional fields with `tokens`; fields past the
  /// last token keep their current values.
  pub fn apply_tokens<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<()> {
    if tokens.len() > TOKEN_NAMES.len() {
      return Err(VoidError::InvalidReconstruction(format!(
        "expected at most {} arguments ({}), got {}",
        TOKEN_NAMES.len(),
        TOKEN_NAMES.join(" "),
        tokens.len()
      )));
    }

    for (name, token) in TOKEN_NAMES.iter().zip(tokens) {
      let token = token.as_ref();
      match *name {
        "f" => self.f = parse_number(name, token)?,
        "bias" => self.bias = parse_number(name, token)?,
        "los" => self.los = token.parse()?,
        "smoothing_radius" => self.smoothing_radius = parse_number(name, token)?,
        "recon_pad" => self.recon_pad = parse_number(name, token)?,
        _ => self.engine = token.parse()?,
      }
    }
    self.validate()
  }

  pub fn with_f(mut self, f: f64) -> Self {
    self.f = f;
    self
  }

  pub fn with_bias(mut self, bias: f64) -> Self {
    self.bias = bias;
    self
  }

  pub fn with_los(mut self, los: LineOfSight) -> Self {
    self.los = los;
    self
  }

  pub fn with_smoothing_radius(mut self, radius: f64) -> Self {
    self.smoothing_radius = radius;
    self
  }

  pub fn with_recon_pad(mut self, pad: f64) -> Self {
    self.recon_pad = pad;
    self
  }

  pub fn validate(&self) -> Result<()> {
    let fail = |msg: String| Err(VoidError::InvalidReconstruction(msg));
    if !(self.f.is_finite() && self.f >= 0.0) {
      return fail(format!("growth rate f must be finite and >= 0, got {}", self.f));
    }
    if !(self.bias.is_finite() && self.bias > 0.0) {
      return fail(format!("bias must be finite and > 0, got {}", self.bias));
    }
    if !(self.smoothing_radius.is_finite() && self.smoothing_radius > 0.0) {
      return fail(format!(
        "smoothing_radius must be finite and > 0, got {}",
        self.smoothing_radius
      ));
    }
    if !(self.recon_pad.is_finite() && self.recon_pad >= 1.0) {
      return fail(format!("recon_pad must be >= 1, got {}", self.recon_pad));
    }
    if let LineOfSight::Axis(axis) = self.los {
      if axis > 2 {
        return fail(format!("line-of-sight axis must be 0, 1 or 2, got {axis}"));
      }
    }
    Ok(())
  }

  /// Redshift-space factor `f / (1 + f)`.
  pub fn rsd_factor(&self) -> f64 {
    self.f / (1.0 + self.f)
  }
}

#[cfg(test)]
#[path = "params_test.rs"]
mod params_test;
