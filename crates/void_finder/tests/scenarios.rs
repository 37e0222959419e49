//! End-to-end behaviour of the void finder on synthetic fields and catalogs.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use void_finder::overlap::sphere_volume;
use void_finder::{
  extract, intersection_volume, CatalogKind, DVec3, FftEngine, MeshOptions, MeshSpec, PointSet,
  PrecomputedMesh, ReconMode, ReconstructionParams, SearchParams, SphericalFilter, VoidCatalog,
  VoidError, VoidFinder, VoidFinderConfig, VoidFinderInput, WindowFunction,
};

const CAVITY_DELTA: f64 = -0.9;

fn unit_box(n: usize) -> MeshSpec {
  MeshSpec::with_nmesh([n; 3], DVec3::ONE, DVec3::splat(n as f64 * 0.5), true).unwrap()
}

fn box_options(spec: &MeshSpec) -> MeshOptions {
  MeshOptions::new()
    .with_box_like(true)
    .with_boxsize_per_axis(spec.boxsize())
    .with_cellsize_per_axis(spec.cellsize())
    .with_boxcenter(spec.boxcenter())
}

fn in_cavity(spec: &MeshSpec, index: usize, cavities: &[([usize; 3], f64)]) -> bool {
  let p = spec.node_position(spec.coords(index));
  cavities
    .iter()
    .any(|&(center, radius)| spec.separation(spec.node_position(center), p).length() <= radius)
}

fn cavity_mesh(spec: &MeshSpec, cavities: &[([usize; 3], f64)]) -> PrecomputedMesh {
  let values = (0..spec.len())
    .map(|i| if in_cavity(spec, i, cavities) { CAVITY_DELTA } else { 0.0 })
    .collect();
  PrecomputedMesh::new(values, spec.nmesh())
}

/// Ten points per background node, one per cavity node.
fn cavity_catalog(spec: &MeshSpec, cavities: &[([usize; 3], f64)]) -> PointSet {
  let mut positions = Vec::new();
  for index in 0..spec.len() {
    let copies = if in_cavity(spec, index, cavities) { 1 } else { 10 };
    let node = spec.node_position(spec.coords(index));
    positions.extend(std::iter::repeat(node).take(copies));
  }
  PointSet::new(CatalogKind::Data, positions)
}

fn mesh_finder(spec: &MeshSpec, cavities: &[([usize; 3], f64)]) -> VoidFinder {
  let input = VoidFinderInput::new().with_mesh(cavity_mesh(spec, cavities));
  VoidFinder::new(input, VoidFinderConfig::new().with_mesh(box_options(spec))).unwrap()
}

fn poisson_box(seed: u64, n: usize, count: usize) -> PointSet {
  let mut rng = StdRng::seed_from_u64(seed);
  let size = n as f64;
  let positions = (0..count)
    .map(|_| {
      DVec3::new(
        rng.random_range(0.0..size),
        rng.random_range(0.0..size),
        rng.random_range(0.0..size),
      )
    })
    .collect();
  PointSet::new(CatalogKind::Data, positions)
}

fn min_image(a: DVec3, b: DVec3, boxsize: DVec3) -> f64 {
  let d = b - a;
  (d - boxsize * (d / boxsize).round()).length()
}

fn assert_overlap_invariant(catalog: &VoidCatalog, void_overlap: f64, boxsize: DVec3) {
  let voids = catalog.voids();
  for (i, a) in voids.iter().enumerate() {
    for b in &voids[i + 1..] {
      let shared = intersection_volume(a.radius, b.radius, min_image(a.center, b.center, boxsize));
      let smaller = sphere_volume(a.radius.min(b.radius));
      assert!(
        shared / smaller <= void_overlap + 1e-9,
        "voids at {:?} and {:?} overlap by {}",
        a.center,
        b.center,
        shared / smaller
      );
    }
  }
}

#[test]
fn uniform_field_has_no_voids() {
  let spec = unit_box(24);
  let finder = mesh_finder(&spec, &[]);

  for radius in [1.5, 3.0, 6.0, 10.0] {
    let output = finder.run_voidfinding(&SearchParams::new(vec![radius])).unwrap();
    assert!(output.catalog.is_empty(), "radius {radius}");
    assert_eq!(output.report.candidate_count, 0);
  }
}

#[test]
fn single_cavity_is_found_at_its_center() {
  let spec = unit_box(32);
  let finder = mesh_finder(&spec, &[([10, 14, 20], 7.0)]);

  let output = finder.run_voidfinding(&SearchParams::new(vec![7.0])).unwrap();

  assert_eq!(output.catalog.len(), 1);
  let void = output.catalog.voids()[0];
  assert_eq!(void.radius, 7.0);
  assert_eq!(void.center, spec.node_position([10, 14, 20]));
  assert!(void.delta < -0.8);
}

#[test]
fn overlapping_cavities_respect_void_overlap() {
  let spec = unit_box(48);
  let cavities = [([16, 24, 24], 8.0), ([28, 24, 24], 8.0)];
  let finder = mesh_finder(&spec, &cavities);

  let strict = finder
    .run_voidfinding(&SearchParams::new(vec![8.0]).with_void_overlap(0.0))
    .unwrap();
  assert_eq!(strict.catalog.len(), 1);
  let center = strict.catalog.voids()[0].center;
  assert!(cavities.iter().any(|&(c, _)| spec.node_position(c) == center));

  let loose = finder
    .run_voidfinding(&SearchParams::new(vec![8.0]).with_void_overlap(1.0))
    .unwrap();
  assert_eq!(loose.catalog.len(), 2);
  assert_eq!(loose.catalog.voids()[0], strict.catalog.voids()[0]);
}

#[test]
fn rsd_reconstruction_without_growth_is_a_no_op() {
  let spec = unit_box(24);
  let data = cavity_catalog(&spec, &[([12, 12, 12], 5.0)]);
  let config = VoidFinderConfig::new().with_mesh(box_options(&spec));

  let plain = VoidFinder::new(VoidFinderInput::new().with_data(data.clone()), config.clone()).unwrap();
  let recon = VoidFinder::new(
    VoidFinderInput::new().with_data(data),
    config.with_reconstruction(
      ReconstructionParams::new(ReconMode::Rsd)
        .with_f(0.0)
        .with_smoothing_radius(4.0),
    ),
  )
  .unwrap();

  let before = plain.density_field().delta();
  let after = recon.density_field().delta();
  assert_eq!(before.len(), after.len());
  for (a, b) in before.iter().zip(after) {
    assert!((a - b).abs() < 1e-10);
  }

  let params = SearchParams::new(vec![5.0]);
  assert_eq!(
    plain.run_voidfinding(&params).unwrap().catalog,
    recon.run_voidfinding(&params).unwrap().catalog
  );
}

#[test]
fn precomputed_mesh_matches_catalog_input() {
  let spec = unit_box(32);
  let data = cavity_catalog(&spec, &[([8, 9, 10], 5.0), ([22, 20, 18], 6.0)]);
  let params = SearchParams::new(vec![4.0, 5.0, 6.0]).with_void_overlap(0.2);

  let from_catalog = VoidFinder::new(
    VoidFinderInput::new().with_data(data),
    VoidFinderConfig::new().with_mesh(box_options(&spec)),
  )
  .unwrap();
  let field = from_catalog.density_field();
  assert_eq!(field.spec(), &spec);

  let mesh = PrecomputedMesh::new(field.delta().to_vec(), field.spec().nmesh());
  let from_mesh = VoidFinder::new(
    VoidFinderInput::new().with_mesh(mesh),
    VoidFinderConfig::new().with_mesh(box_options(&spec)),
  )
  .unwrap();

  let expected = from_catalog.run_voidfinding(&params).unwrap();
  let actual = from_mesh.run_voidfinding(&params).unwrap();
  assert!(!expected.catalog.is_empty());
  assert_eq!(expected.catalog, actual.catalog);
  assert_eq!(expected.vsf, actual.vsf);
}

#[test]
fn extraction_is_idempotent() {
  let spec = unit_box(24);
  let data = poisson_box(3, 24, 24 * 24 * 24 / 2);
  let finder = VoidFinder::new(
    VoidFinderInput::new().with_data(data),
    VoidFinderConfig::new().with_mesh(box_options(&spec)),
  )
  .unwrap();
  let field = finder.density_field();
  let filter = SphericalFilter::new(field, Arc::new(FftEngine::new(field.spec())), WindowFunction::TopHat);
  let mut workspace = filter.fft().workspace();

  let smoothed = filter.smooth(3.0, &mut workspace);
  let first = extract(&smoothed, -0.3, field).unwrap();
  let again = extract(&smoothed, -0.3, field).unwrap();
  assert_eq!(first, again);

  let resmoothed = filter.smooth(3.0, &mut workspace);
  assert_eq!(smoothed.values, resmoothed.values);
}

#[test]
fn results_do_not_depend_on_thread_count() {
  let spec = unit_box(32);
  let data = poisson_box(11, 32, 32 * 32 * 32 / 2);
  let finder = VoidFinder::new(
    VoidFinderInput::new().with_data(data),
    VoidFinderConfig::new().with_mesh(box_options(&spec)),
  )
  .unwrap();
  let params = SearchParams::new(vec![2.0, 3.0, 4.0, 5.0])
    .with_void_delta(-0.3)
    .with_void_overlap(0.1);

  let reference = finder.run_voidfinding(&params.clone().with_threads(1)).unwrap();
  for threads in [2, 4] {
    let other = finder.run_voidfinding(&params.clone().with_threads(threads)).unwrap();
    assert_eq!(reference.catalog, other.catalog);
    assert_eq!(reference.vsf, other.vsf);
  }
}

#[test]
fn lowering_void_overlap_never_adds_voids() {
  let spec = unit_box(48);
  let chain: Vec<([usize; 3], f64)> = [8, 17, 26, 35].iter().map(|&x| ([x, 24, 24], 6.0)).collect();
  let finder = mesh_finder(&spec, &chain);

  let counts: Vec<usize> = [0.0, 0.05, 0.1, 0.2, 0.5, 1.0]
    .iter()
    .map(|&overlap| {
      let params = SearchParams::new(vec![6.0]).with_void_overlap(overlap);
      finder.run_voidfinding(&params).unwrap().catalog.len()
    })
    .collect();

  assert!(counts[0] >= 1);
  assert!(counts.windows(2).all(|w| w[0] <= w[1]), "counts {counts:?}");
}

#[test]
fn accepted_voids_never_exceed_the_overlap_limit() {
  let spec = unit_box(24);
  for seed in 0..4 {
    let data = poisson_box(seed, 24, 24 * 24 * 24 / 4);
    let finder = VoidFinder::new(
      VoidFinderInput::new().with_data(data),
      VoidFinderConfig::new().with_mesh(box_options(&spec)),
    )
    .unwrap();

    for void_overlap in [0.0, 0.15, 0.5] {
      let params = SearchParams::new(vec![1.5, 2.5, 3.5])
        .with_void_delta(-0.2)
        .with_void_overlap(void_overlap);
      let output = finder.run_voidfinding(&params).unwrap();
      assert_overlap_invariant(&output.catalog, void_overlap, spec.boxsize());
      assert!(output.catalog.iter().all(|v| v.delta.is_finite() && v.delta <= -0.2));
    }
  }
}

#[test]
fn survey_cavity_is_found_away_from_the_footprint_edge() {
  // Lattice footprint of 30 cells per side; the derived survey box pads it
  // with a masked shell.
  let footprint = MeshSpec::with_nmesh([30; 3], DVec3::ONE, DVec3::splat(15.0), true).unwrap();
  let data = cavity_catalog(&footprint, &[([15, 15, 15], 5.0)]);
  let random = PointSet::new(
    CatalogKind::Random,
    (0..footprint.len())
      .flat_map(|i| std::iter::repeat(footprint.node_position(footprint.coords(i))).take(10))
      .collect(),
  );
  let options = MeshOptions::new().with_cellsize(1.0);

  let finder = VoidFinder::new(
    VoidFinderInput::new().with_data(data).with_random(random),
    VoidFinderConfig::new().with_mesh(options),
  )
  .unwrap();
  let field = finder.density_field();
  assert!(!field.spec().box_like());
  assert!(field.masked_count() > 0);

  let output = finder.run_voidfinding(&SearchParams::new(vec![5.0])).unwrap();
  assert_eq!(output.catalog.len(), 1);
  assert_eq!(output.catalog.voids()[0].center, DVec3::splat(15.5));
  assert!(output.vsf.survey_volume() < field.spec().box_volume());
}

#[test]
fn configuration_errors_fail_fast() {
  let spec = unit_box(8);
  let finder = mesh_finder(&spec, &[]);

  assert!(matches!(
    finder.run_voidfinding(&SearchParams::new(vec![2.0]).with_void_overlap(1.5)),
    Err(VoidError::InvalidOverlap(_))
  ));
  assert!(matches!(
    finder.run_voidfinding(&SearchParams::new(vec![2.0]).with_void_delta(f64::NAN)),
    Err(VoidError::InvalidThreshold(_))
  ));
  assert!(matches!(
    VoidFinder::new(
      VoidFinderInput::new().with_data(cavity_catalog(&spec, &[])),
      VoidFinderConfig::new()
        .with_mesh(box_options(&spec))
        .with_reconstruction(ReconstructionParams::new(ReconMode::Disp).with_recon_pad(0.5)),
    ),
    Err(VoidError::InvalidReconstruction(_))
  ));
}
