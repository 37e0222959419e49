//! Void candidates: local minima of the smoothed field below the threshold.
//!
//! A node is a minimum if `(value, index)` is strictly smaller than the same
//! pair at each of its 26 neighbours, so equal values resolve to the lowest
//! flat index and plateaus yield exactly one candidate.

use rayon::prelude::*;
use smallvec::SmallVec;

use crate::error::{Result, VoidError};
use crate::filter::SmoothedField;
use crate::mesh::{DensityField, MeshSpec};
use crate::types::VoidCandidate;

/// Relative slack on the sphere-in-box test.
const EDGE_TOLERANCE: f64 = 1e-9;

/// Cell offsets whose nodes lie within `radius` of a center node.
pub fn sphere_offsets(spec: &MeshSpec, radius: f64) -> Vec<[i64; 3]> {
  let cellsize = spec.cellsize();
  let reach = [
    (radius / cellsize.x).floor() as i64,
    (radius / cellsize.y).floor() as i64,
    (radius / cellsize.z).floor() as i64,
  ];
  let r2 = radius * radius * (1.0 + EDGE_TOLERANCE);

  let mut offsets = Vec::new();
  for dx in -reach[0]..=reach[0] {
    for dy in -reach[1]..=reach[1] {
      for dz in -reach[2]..=reach[2] {
        let x = dx as f64 * cellsize.x;
        let y = dy as f64 * cellsize.y;
        let z = dz as f64 * cellsize.z;
        if x * x + y * y + z * z <= r2 {
          offsets.push([dx, dy, dz]);
        }
      }
    }
  }
  offsets
}

/// Step from `coords` by `offset`; `None` if it leaves a survey mesh.
#[inline]
fn shifted(coords: [usize; 3], offset: [i64; 3], nmesh: [usize; 3], periodic: bool) -> Option<[usize; 3]> {
  let mut out = [0usize; 3];
  for axis in 0..3 {
    let n = nmesh[axis] as i64;
    let i = coords[axis] as i64 + offset[axis];
    out[axis] = if periodic {
      i.rem_euclid(n) as usize
    } else if (0..n).contains(&i) {
      i as usize
    } else {
      return None;
    };
  }
  Some(out)
}

fn is_local_minimum(values: &[f64], spec: &MeshSpec, index: usize) -> bool {
  let coords = spec.coords(index);
  let value = values[index];
  let nmesh = spec.nmesh();
  let periodic = spec.box_like();

  let mut seen: SmallVec<[usize; 26]> = SmallVec::new();
  for dx in -1..=1 {
    for dy in -1..=1 {
      for dz in -1..=1 {
        if dx == 0 && dy == 0 && dz == 0 {
          continue;
        }
        let Some([x, y, z]) = shifted(coords, [dx, dy, dz], nmesh, periodic) else {
          continue;
        };
        let neighbour = spec.index(x, y, z);
        if neighbour == index || seen.contains(&neighbour) {
          continue;
        }
        seen.push(neighbour);
        let other = values[neighbour];
        if other < value || (other == value && neighbour < index) {
          return false;
        }
      }
    }
  }
  true
}

/// True if the sphere fits in a survey box.
fn sphere_inside_box(spec: &MeshSpec, index: usize, radius: f64) -> bool {
  if spec.box_like() {
    return true;
  }
  let center = spec.node_position(spec.coords(index));
  let slack = spec.cellsize() * EDGE_TOLERANCE;
  let lo = spec.offset() - slack;
  let hi = spec.offset() + spec.boxsize() + slack;
  (center - radius).cmpge(lo).all() && (center + radius).cmple(hi).all()
}

fn sphere_is_valid(field: &DensityField, index: usize, offsets: &[[i64; 3]]) -> bool {
  let spec = field.spec();
  let coords = spec.coords(index);
  offsets.iter().all(|&offset| {
    match shifted(coords, offset, spec.nmesh(), spec.box_like()) {
      Some([x, y, z]) => field.is_valid(spec.index(x, y, z)),
      None => false,
    }
  })
}

/// Extract void candidates from one smoothed field.
///
/// # Errors
///
/// `NonFiniteField` if any smoothed value is NaN or infinite.
pub fn extract(smoothed: &SmoothedField, void_delta: f64, field: &DensityField) -> Result<Vec<VoidCandidate>> {
  let spec = field.spec();
  let values = &smoothed.values;
  let radius = smoothed.radius;
  debug_assert_eq!(values.len(), spec.len());

  let non_finite = values.par_iter().filter(|v| !v.is_finite()).count();
  if non_finite > 0 {
    return Err(VoidError::NonFiniteField {
      radius,
      count: non_finite,
    });
  }

  let offsets = if field.has_mask() {
    sphere_offsets(spec, radius)
  } else {
    Vec::new()
  };

  let candidates: Vec<VoidCandidate> = (0..spec.len())
    .into_par_iter()
    .filter(|&index| values[index] <= void_delta)
    .filter(|&index| is_local_minimum(values, spec, index))
    .filter(|&index| sphere_inside_box(spec, index, radius))
    .filter(|&index| offsets.is_empty() || sphere_is_valid(field, index, &offsets))
    .map(|index| VoidCandidate {
      center: spec.node_position(spec.coords(index)),
      radius,
      delta: values[index],
      grid_index: index,
    })
    .collect();

  tracing::debug!(radius, count = candidates.len(), "candidates extracted");
  Ok(candidates)
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod extract_test;
