//! Stateless 3-D complex FFT service.
//!
//! Plans and wavenumber grids are built once per mesh shape and are read-only
//! afterwards, so one [`FftEngine`] is shared (via `Arc`) by every radius
//! task. Mutable state lives in per-worker [`FftWorkspace`]s.
//!
//! The 3-D transform is three passes of 1-D transforms:
//!
//! ```text
//!   z lines: contiguous chunks of nz
//!   y lines: gathered per x-slab (stride nz)
//!   x lines: transposed into contiguous rows of nx, then scattered back
//! ```

use std::f64::consts::TAU;
use std::sync::Arc;

use glam::DVec3;
use rayon::prelude::*;
use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use crate::mesh::MeshSpec;

/// Precomputed plans and wavenumbers for one mesh shape.
pub struct FftEngine {
  nmesh: [usize; 3],
  forward: [Arc<dyn Fft<f64>>; 3],
  inverse: [Arc<dyn Fft<f64>>; 3],
  /// Angular wavenumbers per axis in FFT order.
  wavenumbers: [Vec<f64>; 3],
  /// |k| per cell, same layout as the mesh.
  kmag: Vec<f64>,
}

impl std::fmt::Debug for FftEngine {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FftEngine").field("nmesh", &self.nmesh).finish_non_exhaustive()
  }
}

/// Reusable complex buffers sized to the mesh.
#[derive(Clone, Debug)]
pub struct FftWorkspace {
  buffer: Vec<Complex64>,
  transpose: Vec<Complex64>,
}

impl FftWorkspace {
  pub fn buffer(&self) -> &[Complex64] {
    &self.buffer
  }

  pub fn buffer_mut(&mut self) -> &mut [Complex64] {
    &mut self.buffer
  }

  /// Fill the buffer with real values.
  pub fn load_real(&mut self, values: &[f64]) {
    debug_assert_eq!(values.len(), self.buffer.len());
    self
      .buffer
      .par_iter_mut()
      .zip(values.par_iter())
      .for_each(|(c, &v)| *c = Complex64::new(v, 0.0));
  }

  /// Real part of the buffer.
  pub fn real_part(&self) -> Vec<f64> {
    self.buffer.par_iter().map(|c| c.re).collect()
  }
}

/// Angular frequencies `2π j / L` in FFT order (non-negative first).
pub fn angular_frequencies(n: usize, length: f64) -> Vec<f64> {
  let half = n.div_ceil(2);
  (0..n)
    .map(|j| {
      let signed = if j < half { j as f64 } else { j as f64 - n as f64 };
      TAU * signed / length
    })
    .collect()
}

impl FftEngine {
  pub fn new(spec: &MeshSpec) -> Self {
    let nmesh = spec.nmesh();
    let boxsize = spec.boxsize();

    let mut planner = FftPlanner::<f64>::new();
    let forward = nmesh.map(|n| planner.plan_fft_forward(n));
    let inverse = nmesh.map(|n| planner.plan_fft_inverse(n));
    let wavenumbers = [
      angular_frequencies(nmesh[0], boxsize.x),
      angular_frequencies(nmesh[1], boxsize.y),
      angular_frequencies(nmesh[2], boxsize.z),
    ];

    let plane = nmesh[1] * nmesh[2];
    let kmag = (0..spec.len())
      .into_par_iter()
      .map(|index| {
        let kx = wavenumbers[0][index / plane];
        let ky = wavenumbers[1][(index / nmesh[2]) % nmesh[1]];
        let kz = wavenumbers[2][index % nmesh[2]];
        (kx * kx + ky * ky + kz * kz).sqrt()
      })
      .collect();

    tracing::debug!(?nmesh, "fft plans built");

    Self {
      nmesh,
      forward,
      inverse,
      wavenumbers,
      kmag,
    }
  }

  #[inline]
  pub fn nmesh(&self) -> [usize; 3] {
    self.nmesh
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.kmag.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.kmag.is_empty()
  }

  /// |k| per cell in mesh layout.
  pub fn kmag(&self) -> &[f64] {
    &self.kmag
  }

  /// Wave vector of a flat index.
  #[inline]
  pub fn k_vector(&self, index: usize) -> DVec3 {
    let [_, ny, nz] = self.nmesh;
    DVec3::new(
      self.wavenumbers[0][index / (ny * nz)],
      self.wavenumbers[1][(index / nz) % ny],
      self.wavenumbers[2][index % nz],
    )
  }

  pub fn workspace(&self) -> FftWorkspace {
    FftWorkspace {
      buffer: vec![Complex64::default(); self.len()],
      transpose: vec![Complex64::default(); self.len()],
    }
  }

  /// In-place forward transform of the workspace buffer (unnormalized).
  pub fn forward(&self, workspace: &mut FftWorkspace) {
    self.transform(&self.forward, workspace);
  }

  /// In-place inverse transform of the workspace buffer, normalized by 1/N.
  pub fn inverse(&self, workspace: &mut FftWorkspace) {
    self.transform(&self.inverse, workspace);
    let norm = 1.0 / self.len() as f64;
    workspace.buffer.par_iter_mut().for_each(|c| *c *= norm);
  }

  fn transform(&self, plans: &[Arc<dyn Fft<f64>>; 3], workspace: &mut FftWorkspace) {
    let [nx, ny, nz] = self.nmesh;
    let plane = ny * nz;
    let FftWorkspace { buffer, transpose } = workspace;

    // Z: contiguous lines.
    let plan = &plans[2];
    buffer.par_chunks_mut(nz).for_each_init(
      || vec![Complex64::default(); plan.get_inplace_scratch_len()],
      |scratch, line| plan.process_with_scratch(line, scratch),
    );

    // Y: strided lines inside each x-slab.
    let plan = &plans[1];
    buffer.par_chunks_mut(plane).for_each_init(
      || {
        (
          vec![Complex64::default(); ny],
          vec![Complex64::default(); plan.get_inplace_scratch_len()],
        )
      },
      |(line, scratch), slab| {
        for iz in 0..nz {
          for iy in 0..ny {
            line[iy] = slab[iy * nz + iz];
          }
          plan.process_with_scratch(line, scratch);
          for iy in 0..ny {
            slab[iy * nz + iz] = line[iy];
          }
        }
      },
    );

    // X: gather into contiguous rows, transform, scatter back.
    let plan = &plans[0];
    let source = &buffer[..];
    transpose.par_chunks_mut(nx).enumerate().for_each_init(
      || vec![Complex64::default(); plan.get_inplace_scratch_len()],
      |scratch, (yz, row)| {
        for ix in 0..nx {
          row[ix] = source[ix * plane + yz];
        }
        plan.process_with_scratch(row, scratch);
      },
    );
    let transposed = &transpose[..];
    buffer.par_chunks_mut(plane).enumerate().for_each(|(ix, slab)| {
      for (yz, value) in slab.iter_mut().enumerate() {
        *value = transposed[yz * nx + ix];
      }
    });
  }
}

#[cfg(test)]
#[path = "fft_test.rs"]
mod fft_test;
