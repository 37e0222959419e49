//! Overlap resolution across radii.
//!
//! Candidates from every radius are pooled and visited largest first. A
//! candidate is accepted if the volume it shares with already accepted
//! spheres is at most `void_overlap` of its own volume. Accepted spheres are
//! bucketed in a uniform hash grid whose cell size is twice the largest
//! radius, so only the 27 surrounding buckets can hold intersecting spheres.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::f64::consts::PI;

use glam::DVec3;
use smallvec::SmallVec;

use crate::types::{VoidCandidate, VoidCatalog};

type BucketKey = [i64; 3];

#[inline]
pub fn sphere_volume(radius: f64) -> f64 {
  4.0 / 3.0 * PI * radius * radius * radius
}

/// Volume shared by two spheres whose centers are `distance` apart.
pub fn intersection_volume(r1: f64, r2: f64, distance: f64) -> f64 {
  let d = distance.abs();
  if d >= r1 + r2 {
    return 0.0;
  }
  if d <= (r1 - r2).abs() {
    return sphere_volume(r1.min(r2));
  }
  let sum = r1 + r2;
  let diff = r1 - r2;
  PI * (sum - d).powi(2) * (d * d + 2.0 * d * sum - 3.0 * diff * diff) / (12.0 * d)
}

/// Visiting order: radius descending, then δ ascending, then grid index.
pub fn candidate_order(a: &VoidCandidate, b: &VoidCandidate) -> Ordering {
  b.radius
    .total_cmp(&a.radius)
    .then(a.delta.total_cmp(&b.delta))
    .then(a.grid_index.cmp(&b.grid_index))
}

/// Spatial index over accepted spheres.
struct AcceptedGrid {
  bucket_size: DVec3,
  /// Buckets per axis when wrapping on a periodic box.
  wrap: Option<[i64; 3]>,
  periodic_box: Option<DVec3>,
  buckets: HashMap<BucketKey, SmallVec<[usize; 4]>>,
}

impl AcceptedGrid {
  fn new(max_radius: f64, periodic_box: Option<DVec3>) -> Self {
    let size = (2.0 * max_radius).max(f64::MIN_POSITIVE);
    match periodic_box {
      Some(boxsize) => {
        let count = |l: f64| ((l / size).floor() as i64).max(1);
        let wrap = [count(boxsize.x), count(boxsize.y), count(boxsize.z)];
        let bucket_size = DVec3::new(
          boxsize.x / wrap[0] as f64,
          boxsize.y / wrap[1] as f64,
          boxsize.z / wrap[2] as f64,
        );
        Self {
          bucket_size,
          wrap: Some(wrap),
          periodic_box,
          buckets: HashMap::new(),
        }
      }
      None => Self {
        bucket_size: DVec3::splat(size),
        wrap: None,
        periodic_box: None,
        buckets: HashMap::new(),
      },
    }
  }

  fn key(&self, position: DVec3) -> BucketKey {
    let position = match self.periodic_box {
      Some(boxsize) => position.rem_euclid(boxsize),
      None => position,
    };
    let cell = (position / self.bucket_size).floor();
    self.wrap_key([cell.x as i64, cell.y as i64, cell.z as i64])
  }

  fn wrap_key(&self, key: BucketKey) -> BucketKey {
    match self.wrap {
      Some(n) => [
        key[0].rem_euclid(n[0]),
        key[1].rem_euclid(n[1]),
        key[2].rem_euclid(n[2]),
      ],
      None => key,
    }
  }

  fn insert(&mut self, position: DVec3, id: usize) {
    let key = self.key(position);
    self.buckets.entry(key).or_default().push(id);
  }

  /// Ids in the 27 buckets around `position`, each once.
  fn nearby(&self, position: DVec3) -> SmallVec<[usize; 16]> {
    let center = self.key(position);
    let mut keys: SmallVec<[BucketKey; 27]> = SmallVec::new();
    for dx in -1..=1 {
      for dy in -1..=1 {
        for dz in -1..=1 {
          let key = self.wrap_key([center[0] + dx, center[1] + dy, center[2] + dz]);
          if !keys.contains(&key) {
            keys.push(key);
          }
        }
      }
    }
    keys
      .iter()
      .filter_map(|key| self.buckets.get(key))
      .flat_map(|bucket| bucket.iter().copied())
      .collect()
  }

  fn distance(&self, a: DVec3, b: DVec3) -> f64 {
    let d = b - a;
    match self.periodic_box {
      Some(boxsize) => (d - boxsize * (d / boxsize).round()).length(),
      None => d.length(),
    }
  }
}

/// Merge candidates from all radii into a catalog.
///
/// `periodic_box` enables minimum-image distances for box-like meshes.
/// `void_overlap = 1` accepts everything; `0` forbids any intersection.
pub fn resolve(mut candidates: Vec<VoidCandidate>, void_overlap: f64, periodic_box: Option<DVec3>) -> VoidCatalog {
  let _span = tracing::info_span!("overlap::resolve", candidates = candidates.len()).entered();

  if candidates.is_empty() {
    return VoidCatalog::default();
  }
  candidates.sort_by(candidate_order);

  let max_radius = candidates[0].radius;
  let mut grid = AcceptedGrid::new(max_radius, periodic_box);
  let mut accepted: Vec<VoidCandidate> = Vec::new();

  for candidate in candidates {
    let volume = sphere_volume(candidate.radius);
    let mut shared = 0.0;
    for id in grid.nearby(candidate.center) {
      let other = &accepted[id];
      let d = grid.distance(candidate.center, other.center);
      shared += intersection_volume(candidate.radius, other.radius, d);
      if shared >= volume {
        break;
      }
    }
    if shared.min(volume) / volume <= void_overlap {
      grid.insert(candidate.center, accepted.len());
      accepted.push(candidate);
    }
  }

  tracing::debug!(accepted = accepted.len(), "overlap resolved");
  VoidCatalog::new(accepted)
}

#[cfg(test)]
#[path = "overlap_test.rs"]
mod overlap_test;
