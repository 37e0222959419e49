//! MeshSpec - grid geometry and world coordinate mapping.
//!
//! Cell `(ix, iy, iz)` has its node at the cell center:
//!
//! ```text
//! node = boxcenter - boxsize / 2 + (i + 0.5) * cellsize
//! ```
//!
//! Values are stored row-major with Z innermost:
//!
//! ```text
//! index = (ix * ny + iy) * nz + iz
//! ```

use glam::DVec3;

use super::assign::MassAssignment;
use crate::error::{Result, VoidError};
use crate::types::PointSet;

/// Upper bound on cells per axis.
pub const MAX_CELLS_PER_AXIS: usize = 4096;

/// Default box padding applied to survey point extents.
pub const DEFAULT_SURVEY_PADDING: f64 = 1.1;

/// Tolerance for points sitting on the box faces, in units of cellsize.
const FACE_TOLERANCE: f64 = 1e-9;

/// Options for deriving a [`MeshSpec`] from catalogs.
///
/// Any field left as `None` is derived from the point extents.
#[derive(Clone, Debug)]
pub struct MeshOptions {
  /// Cell size per axis.
  pub cellsize: Option<DVec3>,
  /// Box size per axis.
  pub boxsize: Option<DVec3>,
  /// Box center.
  pub boxcenter: Option<DVec3>,
  /// Periodic cube (simulation box) instead of a survey volume.
  pub box_like: bool,
  /// Cells per mean inter-point separation, used when `cellsize` is unset.
  pub cells_per_r_sep: f64,
  /// Multiplicative padding on the survey extent when `boxsize` is unset.
  pub padding: f64,
  /// Scheme used to deposit points on the grid.
  pub assignment: MassAssignment,
  /// Random counts at or below this fraction of the mean non-empty random
  /// count mark a cell as empty.
  pub min_random_fraction: f64,
}

impl Default for MeshOptions {
  fn default() -> Self {
    Self {
      cellsize: None,
      boxsize: None,
      boxcenter: None,
      box_like: false,
      cells_per_r_sep: 2.0,
      padding: DEFAULT_SURVEY_PADDING,
      assignment: MassAssignment::default(),
      min_random_fraction: 0.0,
    }
  }
}

impl MeshOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_cellsize(mut self, cellsize: f64) -> Self {
    self.cellsize = Some(DVec3::splat(cellsize));
    self
  }

  pub fn with_cellsize_per_axis(mut self, cellsize: DVec3) -> Self {
    self.cellsize = Some(cellsize);
    self
  }

  pub fn with_boxsize(mut self, boxsize: f64) -> Self {
    self.boxsize = Some(DVec3::splat(boxsize));
    self
  }

  pub fn with_boxsize_per_axis(mut self, boxsize: DVec3) -> Self {
    self.boxsize = Some(boxsize);
    self
  }

  pub fn with_boxcenter(mut self, boxcenter: DVec3) -> Self {
    self.boxcenter = Some(boxcenter);
    self
  }

  pub fn with_box_like(mut self, box_like: bool) -> Self {
    self.box_like = box_like;
    self
  }

  pub fn with_cells_per_r_sep(mut self, cells_per_r_sep: f64) -> Self {
    self.cells_per_r_sep = cells_per_r_sep;
    self
  }

  pub fn with_assignment(mut self, assignment: MassAssignment) -> Self {
    self.assignment = assignment;
    self
  }

  pub fn with_min_random_fraction(mut self, fraction: f64) -> Self {
    self.min_random_fraction = fraction;
    self
  }

  /// Reject values that can never produce a valid mesh.
  pub fn validate(&self) -> Result<()> {
    let positive = |v: DVec3| v.is_finite() && v.min_element() > 0.0;
    if let Some(cellsize) = self.cellsize {
      if !positive(cellsize) {
        return Err(VoidError::InvalidMesh(format!(
          "cellsize must be positive, got {cellsize:?}"
        )));
      }
    }
    if let Some(boxsize) = self.boxsize {
      if !positive(boxsize) {
        return Err(VoidError::InvalidMesh(format!(
          "boxsize must be positive, got {boxsize:?}"
        )));
      }
    }
    if let Some(boxcenter) = self.boxcenter {
      if !boxcenter.is_finite() {
        return Err(VoidError::InvalidMesh(format!(
          "boxcenter must be finite, got {boxcenter:?}"
        )));
      }
    }
    if !(self.cells_per_r_sep.is_finite() && self.cells_per_r_sep > 0.0) {
      return Err(VoidError::InvalidMesh(format!(
        "cells_per_r_sep must be positive, got {}",
        self.cells_per_r_sep
      )));
    }
    if !(self.padding.is_finite() && self.padding >= 1.0) {
      return Err(VoidError::InvalidMesh(format!(
        "padding must be at least 1, got {}",
        self.padding
      )));
    }
    if !(0.0..1.0).contains(&self.min_random_fraction) {
      return Err(VoidError::InvalidMesh(format!(
        "min_random_fraction must lie in [0, 1), got {}",
        self.min_random_fraction
      )));
    }
    Ok(())
  }
}

/// Regular grid geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshSpec {
  cellsize: DVec3,
  boxsize: DVec3,
  boxcenter: DVec3,
  box_like: bool,
  nmesh: [usize; 3],
}

impl MeshSpec {
  /// Build a spec from explicit geometry.
  ///
  /// Survey meshes round the cell count up to an even number and grow the
  /// box to match. Periodic meshes keep the box and shrink the cell size so
  /// the box holds a whole number of cells.
  pub fn new(cellsize: DVec3, boxsize: DVec3, boxcenter: DVec3, box_like: bool) -> Result<Self> {
    let mut nmesh = [0usize; 3];
    let mut cellsize = cellsize;
    let mut boxsize = boxsize;
    for axis in 0..3 {
      let c = cellsize[axis];
      let l = boxsize[axis];
      if !(c.is_finite() && c > 0.0 && l.is_finite() && l > 0.0) {
        return Err(VoidError::InvalidMesh(format!(
          "cellsize and boxsize must be positive (axis {axis}: {c}, {l})"
        )));
      }
      let ratio = l / c;
      if ratio > MAX_CELLS_PER_AXIS as f64 {
        return Err(VoidError::InvalidMesh(format!(
          "axis {axis} needs {ratio:.0} cells, more than {MAX_CELLS_PER_AXIS}"
        )));
      }
      if box_like {
        let n = (ratio.round() as usize).max(1);
        nmesh[axis] = n;
        cellsize[axis] = l / n as f64;
      } else {
        let mut n = ((ratio - 1e-6).ceil() as usize).max(2);
        n += n % 2;
        nmesh[axis] = n;
        boxsize[axis] = n as f64 * c;
      }
    }
    Self::validated(cellsize, boxsize, boxcenter, box_like, nmesh)
  }

  /// Build a spec with an exact cell count and cell size.
  pub fn with_nmesh(
    nmesh: [usize; 3],
    cellsize: DVec3,
    boxcenter: DVec3,
    box_like: bool,
  ) -> Result<Self> {
    let boxsize = DVec3::new(
      nmesh[0] as f64 * cellsize.x,
      nmesh[1] as f64 * cellsize.y,
      nmesh[2] as f64 * cellsize.z,
    );
    Self::validated(cellsize, boxsize, boxcenter, box_like, nmesh)
  }

  fn validated(
    cellsize: DVec3,
    boxsize: DVec3,
    boxcenter: DVec3,
    box_like: bool,
    nmesh: [usize; 3],
  ) -> Result<Self> {
    if nmesh.iter().any(|&n| n == 0 || n > MAX_CELLS_PER_AXIS) {
      return Err(VoidError::InvalidMesh(format!(
        "cell counts must lie in 1..={MAX_CELLS_PER_AXIS}, got {nmesh:?}"
      )));
    }
    if !(cellsize.is_finite() && cellsize.min_element() > 0.0) {
      return Err(VoidError::InvalidMesh(format!(
        "cellsize must be positive, got {cellsize:?}"
      )));
    }
    if !boxcenter.is_finite() {
      return Err(VoidError::InvalidMesh(format!(
        "boxcenter must be finite, got {boxcenter:?}"
      )));
    }
    Ok(Self {
      cellsize,
      boxsize,
      boxcenter,
      box_like,
      nmesh,
    })
  }

  /// Derive a spec from catalog extents and options.
  ///
  /// Cell size defaults to the mean inter-point separation of `data`
  /// divided by `cells_per_r_sep`.
  pub fn derive(options: &MeshOptions, data: &PointSet, random: Option<&PointSet>) -> Result<Self> {
    options.validate()?;

    let (mut lo, mut hi) = data
      .bounds()
      .ok_or(VoidError::EmptyCatalog { kind: "data" })?;
    if let Some((rlo, rhi)) = random.and_then(PointSet::bounds) {
      lo = lo.min(rlo);
      hi = hi.max(rhi);
    }
    let extent = (hi - lo).max(DVec3::splat(f64::EPSILON));

    let boxsize = options.boxsize.unwrap_or_else(|| {
      if options.box_like {
        extent
      } else {
        extent * options.padding
      }
    });
    let boxcenter = options.boxcenter.unwrap_or((lo + hi) * 0.5);
    let cellsize = options.cellsize.unwrap_or_else(|| {
      let volume = extent.x * extent.y * extent.z;
      let separation = (volume / data.len() as f64).cbrt();
      DVec3::splat(separation / options.cells_per_r_sep)
    });

    let spec = Self::new(cellsize, boxsize, boxcenter, options.box_like)?;
    spec.check_contains(data)?;
    if let Some(random) = random {
      spec.check_contains(random)?;
    }
    Ok(spec)
  }

  /// Spec for a precomputed mesh of the given shape.
  ///
  /// With both `cellsize` and `boxsize` set they must agree with the shape.
  /// With one of them set the other follows from the shape; with neither the
  /// cell size is 1. The box center defaults to half the box size.
  pub fn for_shape(shape: [usize; 3], options: &MeshOptions) -> Result<Self> {
    options.validate()?;
    let counts = DVec3::new(shape[0] as f64, shape[1] as f64, shape[2] as f64);
    let cellsize = match (options.cellsize, options.boxsize) {
      (Some(cellsize), Some(boxsize)) => {
        let implied = boxsize / cellsize;
        if (implied - counts).abs().max_element() > 1e-6 * counts.max_element() {
          return Err(VoidError::MeshShapeMismatch {
            expected: implied.round().to_array().map(|n| n as usize),
            actual: shape,
          });
        }
        boxsize / counts
      }
      (None, Some(boxsize)) => boxsize / counts,
      (Some(cellsize), None) => cellsize,
      (None, None) => DVec3::ONE,
    };
    let boxcenter = options.boxcenter.unwrap_or(cellsize * counts * 0.5);
    Self::with_nmesh(shape, cellsize, boxcenter, options.box_like)
  }

  /// Fail with `PointsOutsideBox` if any point lies outside the box.
  pub fn check_contains(&self, points: &PointSet) -> Result<()> {
    let mut outside = points.positions().iter().filter(|p| !self.contains(**p));
    if let Some(first) = outside.next() {
      return Err(VoidError::PointsOutsideBox {
        kind: points.kind().as_str(),
        count: 1 + outside.count(),
        first: first.to_array(),
      });
    }
    Ok(())
  }

  #[inline]
  pub fn nmesh(&self) -> [usize; 3] {
    self.nmesh
  }

  /// Total number of cells.
  #[inline]
  pub fn len(&self) -> usize {
    self.nmesh[0] * self.nmesh[1] * self.nmesh[2]
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  #[inline]
  pub fn cellsize(&self) -> DVec3 {
    self.cellsize
  }

  #[inline]
  pub fn boxsize(&self) -> DVec3 {
    self.boxsize
  }

  #[inline]
  pub fn boxcenter(&self) -> DVec3 {
    self.boxcenter
  }

  #[inline]
  pub fn box_like(&self) -> bool {
    self.box_like
  }

  /// Lower box corner.
  #[inline]
  pub fn offset(&self) -> DVec3 {
    self.boxcenter - self.boxsize * 0.5
  }

  #[inline]
  pub fn cell_volume(&self) -> f64 {
    self.cellsize.x * self.cellsize.y * self.cellsize.z
  }

  #[inline]
  pub fn box_volume(&self) -> f64 {
    self.boxsize.x * self.boxsize.y * self.boxsize.z
  }

  /// Half of the smallest box side; the largest sphere radius the mesh holds.
  #[inline]
  pub fn half_extent(&self) -> f64 {
    0.5 * self.boxsize.min_element()
  }

  /// Flat index of a cell.
  #[inline(always)]
  pub fn index(&self, ix: usize, iy: usize, iz: usize) -> usize {
    (ix * self.nmesh[1] + iy) * self.nmesh[2] + iz
  }

  /// Cell coordinates of a flat index.
  #[inline(always)]
  pub fn coords(&self, index: usize) -> [usize; 3] {
    let iz = index % self.nmesh[2];
    let rest = index / self.nmesh[2];
    [rest / self.nmesh[1], rest % self.nmesh[1], iz]
  }

  /// World position of a cell node.
  #[inline]
  pub fn node_position(&self, coords: [usize; 3]) -> DVec3 {
    self.offset()
      + DVec3::new(
        coords[0] as f64 + 0.5,
        coords[1] as f64 + 0.5,
        coords[2] as f64 + 0.5,
      ) * self.cellsize
  }

  /// Continuous grid coordinate: node `i` sits at integer `i`.
  #[inline]
  pub fn to_grid(&self, position: DVec3) -> DVec3 {
    (position - self.offset()) / self.cellsize - DVec3::splat(0.5)
  }

  /// True if the position lies inside the box (faces included).
  pub fn contains(&self, position: DVec3) -> bool {
    let tol = self.cellsize * FACE_TOLERANCE;
    let lo = self.offset() - tol;
    let hi = self.offset() + self.boxsize + tol;
    position.cmpge(lo).all() && position.cmple(hi).all()
  }

  /// Map a position into the box: periodic wrap for box-like meshes,
  /// clamping otherwise. Returns the mapped position and whether it moved.
  pub fn confine(&self, position: DVec3) -> (DVec3, bool) {
    if self.contains(position) {
      return (position, false);
    }
    let lo = self.offset();
    if self.box_like {
      (lo + (position - lo).rem_euclid(self.boxsize), true)
    } else {
      let hi = lo + self.boxsize - self.cellsize * FACE_TOLERANCE;
      let clamped = position.clamp(lo, hi);
      (clamped, clamped != position)
    }
  }

  /// Separation vector `b - a`, using the minimum image on periodic meshes.
  #[inline]
  pub fn separation(&self, a: DVec3, b: DVec3) -> DVec3 {
    let d = b - a;
    if self.box_like {
      d - self.boxsize * (d / self.boxsize).round()
    } else {
      d
    }
  }
}

#[cfg(test)]
#[path = "spec_test.rs"]
mod spec_test;
