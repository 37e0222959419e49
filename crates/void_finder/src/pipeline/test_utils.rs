//! Fixtures for pipeline tests: synthetic cavity meshes and lattice catalogs.

use glam::DVec3;

use crate::mesh::{MeshSpec, PrecomputedMesh};
use crate::types::{CatalogKind, PointSet};

/// Interior overdensity of a synthetic cavity.
pub const CAVITY_DELTA: f64 = -0.9;

/// Spherical cavity in cell units.
#[derive(Clone, Copy, Debug)]
pub struct Cavity {
  pub center: [usize; 3],
  pub radius: f64,
}

impl Cavity {
  pub fn new(center: [usize; 3], radius: f64) -> Self {
    Self { center, radius }
  }
}

/// Periodic unit-cell spec with `n` cells per axis, lower corner at the origin.
pub fn unit_box(n: usize) -> MeshSpec {
  MeshSpec::with_nmesh([n; 3], DVec3::ONE, DVec3::splat(n as f64 * 0.5), true).unwrap()
}

/// δ = -0.9 inside the cavities (minimum-image distance), 0 elsewhere.
pub fn cavity_mesh(spec: &MeshSpec, cavities: &[Cavity]) -> PrecomputedMesh {
  let values = (0..spec.len())
    .map(|index| {
      let p = spec.node_position(spec.coords(index));
      let inside = cavities.iter().any(|c| {
        let center = spec.node_position(c.center);
        spec.separation(center, p).length() <= c.radius * spec.cellsize().x
      });
      if inside {
        CAVITY_DELTA
      } else {
        0.0
      }
    })
    .collect();
  PrecomputedMesh::new(values, spec.nmesh())
}

/// Points on cell nodes: `per_cell` copies in the background and
/// `per_cell / 10` inside the cavities.
pub fn cavity_catalog(spec: &MeshSpec, cavities: &[Cavity], per_cell: usize) -> PointSet {
  let mesh = cavity_mesh(spec, cavities);
  let mut positions = Vec::new();
  for (index, &delta) in mesh.values.iter().enumerate() {
    let copies = if delta < 0.0 { per_cell / 10 } else { per_cell };
    let node = spec.node_position(spec.coords(index));
    positions.extend(std::iter::repeat(node).take(copies));
  }
  PointSet::new(CatalogKind::Data, positions)
}
