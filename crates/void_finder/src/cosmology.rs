//! Flat ΛCDM distances for converting sky coordinates to comoving positions.
//!
//! Distances are in Mpc/h, so the Hubble distance is c / (100 km/s/Mpc).

use glam::DVec3;

/// Speed of light in km/s.
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;

/// Nodes in the redshift lookup table used for bulk conversion.
const TABLE_NODES: usize = 4096;

/// Flat ΛCDM background (radiation neglected).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cosmology {
  /// Matter density parameter today.
  pub omega_m: f64,
}

impl Default for Cosmology {
  fn default() -> Self {
    Self { omega_m: 0.315 }
  }
}

impl Cosmology {
  pub fn new(omega_m: f64) -> Self {
    Self { omega_m }
  }

  /// c / H0 in Mpc/h.
  #[inline]
  pub fn hubble_distance(&self) -> f64 {
    SPEED_OF_LIGHT_KM_S / 100.0
  }

  /// Dimensionless Hubble rate E(z) = H(z) / H0.
  #[inline]
  pub fn efunc(&self, z: f64) -> f64 {
    let a3 = (1.0 + z).powi(3);
    (self.omega_m * a3 + (1.0 - self.omega_m)).sqrt()
  }

  /// Line-of-sight comoving distance to redshift `z`, by Simpson's rule.
  pub fn comoving_distance(&self, z: f64) -> f64 {
    if z == 0.0 {
      return 0.0;
    }
    let steps = ((z.abs() * 512.0).ceil() as usize).max(64) & !1;
    let h = z / steps as f64;
    let mut sum = 1.0 / self.efunc(0.0) + 1.0 / self.efunc(z);
    for i in 1..steps {
      let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
      sum += weight / self.efunc(i as f64 * h);
    }
    self.hubble_distance() * sum * h / 3.0
  }

  /// Convert `[ra, dec, z]` rows (degrees) into Cartesian positions with the
  /// observer at the origin.
  pub fn sky_to_cartesian(&self, rdz: &[[f64; 3]]) -> Vec<DVec3> {
    let z_max = rdz.iter().map(|r| r[2]).fold(0.0_f64, f64::max);
    let table = DistanceTable::new(self, z_max);

    rdz
      .iter()
      .map(|&[ra, dec, z]| {
        let distance = if z >= 0.0 {
          table.distance(z)
        } else {
          self.comoving_distance(z)
        };
        let (ra, dec) = (ra.to_radians(), dec.to_radians());
        distance * DVec3::new(dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin())
      })
      .collect()
  }
}

/// Comoving distance sampled on a uniform redshift grid, linearly
/// interpolated.
struct DistanceTable {
  z_step: f64,
  distances: Vec<f64>,
}

impl DistanceTable {
  fn new(cosmology: &Cosmology, z_max: f64) -> Self {
    let z_max = z_max.max(1e-6);
    let z_step = z_max / (TABLE_NODES - 1) as f64;
    let mut distances = Vec::with_capacity(TABLE_NODES);
    distances.push(0.0);
    let mut acc = 0.0;
    for i in 1..TABLE_NODES {
      // Simpson on each interval [z_{i-1}, z_i].
      let z0 = (i - 1) as f64 * z_step;
      let z1 = i as f64 * z_step;
      let mid = 0.5 * (z0 + z1);
      acc += (z1 - z0) / 6.0
        * (1.0 / cosmology.efunc(z0) + 4.0 / cosmology.efunc(mid) + 1.0 / cosmology.efunc(z1));
      distances.push(acc * cosmology.hubble_distance());
    }
    Self { z_step, distances }
  }

  fn distance(&self, z: f64) -> f64 {
    let u = z / self.z_step;
    let i = (u.floor() as usize).min(self.distances.len() - 2);
    let t = u - i as f64;
    self.distances[i] * (1.0 - t) + self.distances[i + 1] * t
  }
}

#[cfg(test)]
#[path = "cosmology_test.rs"]
mod cosmology_test;
