//! Zel'dovich displacement solve and catalog shifting.
//!
//! ```text
//!   δ ──pad──► FFT ──× exp(-k²R²/2)──► Ψ̂ = i k δ̂ / (b k²) ──IFFT──► Ψ(x)
//!                                                              │
//!   data / randoms ◄── shift (−Ψ, −f/(1+f) (Ψ·ĥ) ĥ) ◄── readout ┘
//!        │
//!        └──► confine ──► re-grid (build_mesh) ──► restrict to the input footprint
//! ```

use glam::DVec3;
use rayon::prelude::*;
use rustfft::num_complex::Complex64;

use super::params::ReconstructionParams;
use crate::error::{Result, VoidError};
use crate::fft::FftEngine;
use crate::mesh::{build_mesh, readout, DensityField, MassAssignment, MeshSpec};
use crate::types::{Diagnostics, PointSet};

/// Catalogs after displacement plus the re-gridded field.
#[derive(Clone, Debug)]
pub struct Reconstructed {
  pub data: PointSet,
  /// Randoms shifted by the real-space displacement (`Disp`, `DispRsd`);
  /// these normalize the re-gridded field.
  pub shifted_random: Option<PointSet>,
  pub field: DensityField,
}

/// Zero-padded spec for the displacement solve.
///
/// Periodic meshes are not padded. Survey meshes grow by `recon_pad` with
/// the same cell size and center, keeping an even number of padding cells
/// so the original nodes stay on the padded grid.
pub fn padded_spec(spec: &MeshSpec, recon_pad: f64) -> Result<MeshSpec> {
  if spec.box_like() || recon_pad <= 1.0 {
    return Ok(spec.clone());
  }
  let nmesh = spec
    .nmesh()
    .map(|n| n + 2 * ((n as f64 * (recon_pad - 1.0) / 2.0).ceil() as usize));
  MeshSpec::with_nmesh(nmesh, spec.cellsize(), spec.boxcenter(), false)
}

/// Copy the field into a padded grid. Masked cells and padding are zero.
fn embed(field: &DensityField, padded: &MeshSpec) -> Vec<f64> {
  let spec = field.spec();
  if spec == padded {
    return field
      .delta()
      .iter()
      .zip(field.valid())
      .map(|(&d, &valid)| if valid { d } else { 0.0 })
      .collect();
  }

  let [nx, ny, nz] = spec.nmesh();
  let [px, py, pz] = padded.nmesh();
  let shift = [(px - nx) / 2, (py - ny) / 2, (pz - nz) / 2];
  let mut values = vec![0.0; padded.len()];
  for ix in 0..nx {
    for iy in 0..ny {
      for iz in 0..nz {
        let source = spec.index(ix, iy, iz);
        if field.is_valid(source) {
          values[padded.index(ix + shift[0], iy + shift[1], iz + shift[2])] = field.delta()[source];
        }
      }
    }
  }
  values
}

/// Displacement components `[Ψx, Ψy, Ψz]` on the padded grid.
pub fn displacement_field(
  field: &DensityField,
  padded: &MeshSpec,
  params: &ReconstructionParams,
) -> [Vec<f64>; 3] {
  let fft = FftEngine::new(padded);
  let mut workspace = fft.workspace();
  workspace.load_real(&embed(field, padded));
  fft.forward(&mut workspace);

  let r2 = params.smoothing_radius * params.smoothing_radius;
  let bias = params.bias;
  let smoothed: Vec<Complex64> = workspace
    .buffer()
    .par_iter()
    .zip(fft.kmag().par_iter())
    .map(|(&dk, &k)| dk * (-0.5 * k * k * r2).exp())
    .collect();

  let mut components: [Vec<f64>; 3] = Default::default();
  for (axis, component) in components.iter_mut().enumerate() {
    workspace
      .buffer_mut()
      .par_iter_mut()
      .enumerate()
      .for_each(|(index, c)| {
        let k = fft.k_vector(index);
        let k2 = k.length_squared();
        *c = if k2 > 0.0 {
          smoothed[index] * Complex64::new(0.0, k[axis] / (bias * k2))
        } else {
          Complex64::default()
        };
      });
    fft.inverse(&mut workspace);
    *component = workspace.real_part();
  }
  components
}

/// Shift points by `shift(position, Ψ)` and confine them to the box.
/// Returns the shifted set and how many points had to be confined.
fn shift_points<F>(
  points: &PointSet,
  psi: &[Vec<f64>; 3],
  padded: &MeshSpec,
  spec: &MeshSpec,
  assignment: MassAssignment,
  shift: F,
) -> (PointSet, usize)
where
  F: Fn(DVec3, DVec3) -> DVec3 + Sync,
{
  let moved: Vec<(DVec3, bool)> = points
    .positions()
    .par_iter()
    .map(|&p| {
      let displacement = DVec3::new(
        readout(&psi[0], padded, assignment, p),
        readout(&psi[1], padded, assignment, p),
        readout(&psi[2], padded, assignment, p),
      );
      spec.confine(p + shift(p, displacement))
    })
    .collect();
  let confined = moved.iter().filter(|(_, c)| *c).count();
  let positions = moved.into_iter().map(|(p, _)| p).collect();
  (points.with_positions(positions), confined)
}

/// Remove the estimated displacement from the catalogs and re-grid.
///
/// Shifted data is normalized by the shifted randoms when the mode moves
/// them (`Disp`, `DispRsd`), otherwise by the input randoms. Cells masked in
/// the input field stay masked.
pub fn reconstruct(
  field: &DensityField,
  data: &PointSet,
  random: Option<&PointSet>,
  params: &ReconstructionParams,
  assignment: MassAssignment,
  min_random_fraction: f64,
  diagnostics: &mut Diagnostics,
) -> Result<Reconstructed> {
  let _span = tracing::info_span!("recon", mode = params.mode.as_str()).entered();
  params.validate()?;

  let spec = field.spec();
  if !spec.box_like() && random.is_none() {
    return Err(VoidError::InvalidReconstruction(
      "survey reconstruction needs a random catalog".into(),
    ));
  }

  let padded = padded_spec(spec, params.recon_pad)?;
  let psi = displacement_field(field, &padded, params);

  let mode = params.mode;
  let los = params.los;
  let beta = params.rsd_factor();
  let data_shift = |p: DVec3, psi: DVec3| {
    let mut shift = DVec3::ZERO;
    if mode.removes_displacement() {
      shift -= psi;
    }
    if mode.removes_rsd() {
      let h = los.direction(p);
      shift -= beta * psi.dot(h) * h;
    }
    shift
  };
  let (shifted_data, data_confined) = shift_points(data, &psi, &padded, spec, assignment, data_shift);

  let mut random_confined = 0;
  let shifted_random = match random {
    Some(random) if mode.removes_displacement() => {
      let (shifted, confined) = shift_points(random, &psi, &padded, spec, assignment, |_, psi| -psi);
      random_confined = confined;
      Some(shifted)
    }
    _ => None,
  };

  if data_confined + random_confined > 0 {
    diagnostics.warn(format!(
      "{data_confined} data and {random_confined} random points were displaced outside the box and confined"
    ));
  }

  let mut regridded = build_mesh(
    &shifted_data,
    shifted_random.as_ref().or(random),
    spec,
    assignment,
    min_random_fraction,
    diagnostics,
  )?;
  if shifted_random.is_some() {
    regridded.restrict_to(field.valid());
  }

  Ok(Reconstructed {
    data: shifted_data,
    shifted_random,
    field: regridded,
  })
}

#[cfg(test)]
#[path = "displacement_test.rs"]
mod displacement_test;
