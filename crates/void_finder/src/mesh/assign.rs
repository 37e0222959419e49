//! Mass assignment kernels for depositing points on the grid and reading
//! grid values back at arbitrary positions.
//!
//! Grid coordinate `u` places node `i` at `u = i` (see [`MeshSpec::to_grid`]).
//!
//! | scheme | support | weights (distance `d` to node) |
//! |--------|---------|--------------------------------|
//! | NGP    | 1       | 1                              |
//! | CIC    | 2       | 1 - \|d\|                      |
//! | TSC    | 3       | 3/4 - d², ½(3/2 - \|d\|)²      |

use std::str::FromStr;

use glam::DVec3;

use super::spec::MeshSpec;
use crate::error::VoidError;
use crate::types::PointSet;

/// Point-to-grid assignment scheme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MassAssignment {
  /// Nearest grid point.
  Ngp,
  /// Cloud-in-cell (trilinear).
  #[default]
  Cic,
  /// Triangular-shaped cloud.
  Tsc,
}

impl MassAssignment {
  /// Nodes touched per axis.
  pub fn support(&self) -> usize {
    match self {
      MassAssignment::Ngp => 1,
      MassAssignment::Cic => 2,
      MassAssignment::Tsc => 3,
    }
  }

  /// First node and per-node weights along one axis.
  #[inline]
  fn kernel(&self, u: f64) -> (i64, [f64; 3]) {
    match self {
      MassAssignment::Ngp => ((u + 0.5).floor() as i64, [1.0, 0.0, 0.0]),
      MassAssignment::Cic => {
        let i = u.floor();
        let t = u - i;
        (i as i64, [1.0 - t, t, 0.0])
      }
      MassAssignment::Tsc => {
        let i = (u + 0.5).floor();
        let d = u - i;
        (
          i as i64 - 1,
          [
            0.5 * (0.5 - d) * (0.5 - d),
            0.75 - d * d,
            0.5 * (0.5 + d) * (0.5 + d),
          ],
        )
      }
    }
  }
}

impl FromStr for MassAssignment {
  type Err = VoidError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "ngp" => Ok(MassAssignment::Ngp),
      "cic" => Ok(MassAssignment::Cic),
      "tsc" => Ok(MassAssignment::Tsc),
      other => Err(VoidError::InvalidMesh(format!(
        "unknown mass assignment '{other}' (expected ngp, cic or tsc)"
      ))),
    }
  }
}

/// Resolve a node index on one axis: wrap on periodic meshes, clamp
/// otherwise.
#[inline(always)]
fn resolve(i: i64, n: usize, periodic: bool) -> usize {
  if periodic {
    i.rem_euclid(n as i64) as usize
  } else {
    i.clamp(0, n as i64 - 1) as usize
  }
}

/// Per-axis stencil for one position.
#[inline]
fn stencil(spec: &MeshSpec, scheme: MassAssignment, position: DVec3) -> [([usize; 3], [f64; 3]); 3] {
  let u = spec.to_grid(position);
  let nmesh = spec.nmesh();
  let periodic = spec.box_like();
  let mut out = [([0usize; 3], [0.0; 3]); 3];
  for axis in 0..3 {
    let (first, weights) = scheme.kernel(u[axis]);
    for k in 0..scheme.support() {
      out[axis].0[k] = resolve(first + k as i64, nmesh[axis], periodic);
    }
    out[axis].1 = weights;
  }
  out
}

/// Deposit weighted points on the grid.
///
/// Points are visited in catalog order so repeated builds are bit-identical.
/// Total deposited weight equals the catalog weight.
pub fn paint(points: &PointSet, spec: &MeshSpec, scheme: MassAssignment) -> Vec<f64> {
  let mut mesh = vec![0.0; spec.len()];
  let support = scheme.support();

  for (position, &weight) in points.positions().iter().zip(points.weights()) {
    let [(ix, wx), (iy, wy), (iz, wz)] = stencil(spec, scheme, *position);
    for a in 0..support {
      let wa = weight * wx[a];
      for b in 0..support {
        let wab = wa * wy[b];
        let row = (ix[a] * spec.nmesh()[1] + iy[b]) * spec.nmesh()[2];
        for c in 0..support {
          mesh[row + iz[c]] += wab * wz[c];
        }
      }
    }
  }

  mesh
}

/// Interpolate a grid at a position with the same kernel used for painting.
pub fn readout(mesh: &[f64], spec: &MeshSpec, scheme: MassAssignment, position: DVec3) -> f64 {
  debug_assert_eq!(mesh.len(), spec.len());
  let support = scheme.support();
  let [(ix, wx), (iy, wy), (iz, wz)] = stencil(spec, scheme, position);

  let mut value = 0.0;
  for a in 0..support {
    for b in 0..support {
      let row = (ix[a] * spec.nmesh()[1] + iy[b]) * spec.nmesh()[2];
      for c in 0..support {
        value += wx[a] * wy[b] * wz[c] * mesh[row + iz[c]];
      }
    }
  }
  value
}

#[cfg(test)]
#[path = "assign_test.rs"]
mod assign_test;
