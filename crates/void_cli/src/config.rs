//! TOML configuration for a void search.
//!
//! Every value is optional; command-line flags override the file.
//!
//! ```toml
//! data = "galaxies.npy"
//! random = "randoms.npy"
//! columns = "rdz"
//! omega_m = 0.31
//!
//! [mesh]
//! cellsize = 5.0
//! boxsize = [1000.0, 1000.0, 800.0]
//! box_like = false
//! assignment = "cic"
//!
//! [reconstruction]
//! mode = "disp"
//! smoothing_radius = 10.0
//!
//! [search]
//! radii = [10, 15, 20]
//! void_overlap = 0.1
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use void_finder::{DVec3, MeshOptions, ReconstructionParams, VsfBinning};

/// A scalar applied to every axis, or one value per axis.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AxisValue {
  Scalar(f64),
  PerAxis([f64; 3]),
}

impl AxisValue {
  pub fn to_dvec3(self) -> DVec3 {
    match self {
      AxisValue::Scalar(v) => DVec3::splat(v),
      AxisValue::PerAxis(v) => DVec3::from_array(v),
    }
  }

  /// Parse `5`, `5,5,8` or `none` (unset).
  pub fn parse_token(token: &str) -> Result<Option<Self>> {
    let token = token.trim();
    if token.eq_ignore_ascii_case("none") || token == "_" {
      return Ok(None);
    }
    let values = token
      .split(',')
      .map(|v| {
        v.trim()
          .parse::<f64>()
          .with_context(|| format!("'{token}' is not a number or a comma-separated triple"))
      })
      .collect::<Result<Vec<_>>>()?;
    match values.as_slice() {
      &[v] => Ok(Some(AxisValue::Scalar(v))),
      &[x, y, z] => Ok(Some(AxisValue::PerAxis([x, y, z]))),
      _ => bail!("'{token}' must hold one or three values"),
    }
  }
}

fn parse_bool(token: &str) -> Result<bool> {
  match token.trim().to_ascii_lowercase().as_str() {
    "true" | "1" | "yes" => Ok(true),
    "false" | "0" | "no" => Ok(false),
    other => bail!("'{other}' is not a boolean"),
  }
}

/// `[mesh]`: geometry and assignment.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MeshSection {
  pub cellsize: Option<AxisValue>,
  pub boxsize: Option<AxisValue>,
  pub boxcenter: Option<AxisValue>,
  pub box_like: Option<bool>,
  pub cells_per_r_sep: Option<f64>,
  pub padding: Option<f64>,
  pub assignment: Option<String>,
  pub min_random_fraction: Option<f64>,
  pub window: Option<String>,
}

const MESH_TOKEN_NAMES: [&str; 4] = ["cellsize", "boxsize", "boxcenter", "box_like"];

impl MeshSection {
  /// Override with positional `cellsize boxsize boxcenter box_like` tokens.
  pub fn apply_tokens<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<()> {
    if tokens.len() > MESH_TOKEN_NAMES.len() {
      bail!(
        "--mesh-args takes at most {} values ({}), got {}",
        MESH_TOKEN_NAMES.len(),
        MESH_TOKEN_NAMES.join(" "),
        tokens.len()
      );
    }
    for (name, token) in MESH_TOKEN_NAMES.iter().zip(tokens) {
      let token = token.as_ref();
      let context = || format!("--mesh-args {name}");
      match *name {
        "cellsize" => self.cellsize = AxisValue::parse_token(token).with_context(context)?,
        "boxsize" => self.boxsize = AxisValue::parse_token(token).with_context(context)?,
        "boxcenter" => self.boxcenter = AxisValue::parse_token(token).with_context(context)?,
        _ => self.box_like = Some(parse_bool(token).with_context(context)?),
      }
    }
    Ok(())
  }

  pub fn to_options(&self) -> Result<MeshOptions> {
    let mut options = MeshOptions::new();
    options.cellsize = self.cellsize.map(AxisValue::to_dvec3);
    options.boxsize = self.boxsize.map(AxisValue::to_dvec3);
    options.boxcenter = self.boxcenter.map(AxisValue::to_dvec3);
    if let Some(box_like) = self.box_like {
      options.box_like = box_like;
    }
    if let Some(cells) = self.cells_per_r_sep {
      options.cells_per_r_sep = cells;
    }
    if let Some(padding) = self.padding {
      options.padding = padding;
    }
    if let Some(assignment) = &self.assignment {
      options.assignment = assignment.parse()?;
    }
    if let Some(fraction) = self.min_random_fraction {
      options.min_random_fraction = fraction;
    }
    Ok(options)
  }
}

/// `[reconstruction]`: present only when reconstruction is wanted.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReconSection {
  pub mode: String,
  pub f: Option<f64>,
  pub bias: Option<f64>,
  pub los: Option<String>,
  pub smoothing_radius: Option<f64>,
  pub recon_pad: Option<f64>,
  pub engine: Option<String>,
}

impl ReconSection {
  pub fn to_params(&self) -> Result<ReconstructionParams> {
    let mut params = ReconstructionParams::new(self.mode.parse()?);
    if let Some(f) = self.f {
      params.f = f;
    }
    if let Some(bias) = self.bias {
      params.bias = bias;
    }
    if let Some(los) = &self.los {
      params.los = los.parse()?;
    }
    if let Some(radius) = self.smoothing_radius {
      params.smoothing_radius = radius;
    }
    if let Some(pad) = self.recon_pad {
      params.recon_pad = pad;
    }
    if let Some(engine) = &self.engine {
      params.engine = engine.parse()?;
    }
    params.validate()?;
    Ok(params)
  }
}

/// `[search]`: radii, thresholds and threads.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SearchSection {
  pub radii: Option<Vec<f64>>,
  pub void_delta: Option<f64>,
  pub void_overlap: Option<f64>,
  pub threads: Option<usize>,
  /// Explicit size function bin edges.
  pub vsf_edges: Option<Vec<f64>>,
}

impl SearchSection {
  pub fn binning(&self) -> VsfBinning {
    match &self.vsf_edges {
      Some(edges) => VsfBinning::Edges(edges.clone()),
      None => VsfBinning::FromRadii,
    }
  }
}

/// Root of the TOML file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
  pub data: Option<PathBuf>,
  pub random: Option<PathBuf>,
  pub data_weights: Option<String>,
  pub random_weights: Option<String>,
  pub columns: Option<String>,
  /// Precomputed mesh to load, or where to save the built one.
  pub mesh_path: Option<String>,
  pub save_fn: Option<String>,
  pub omega_m: Option<f64>,
  #[serde(default)]
  pub mesh: MeshSection,
  pub reconstruction: Option<ReconSection>,
  #[serde(default)]
  pub search: SearchSection,
}

impl FileConfig {
  pub fn parse(text: &str) -> Result<Self> {
    toml::from_str(text).context("Failed to parse config TOML")
  }

  pub fn load(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read config: {}", path.display()))?;
    Self::parse(&content).with_context(|| format!("In {}", path.display()))
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
