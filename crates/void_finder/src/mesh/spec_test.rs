use super::*;
use crate::types::CatalogKind;

fn cube_points(n: usize, side: f64) -> PointSet {
  let step = side / n as f64;
  let mut positions = Vec::with_capacity(n * n * n);
  for x in 0..n {
    for y in 0..n {
      for z in 0..n {
        positions.push([
          (x as f64 + 0.5) * step,
          (y as f64 + 0.5) * step,
          (z as f64 + 0.5) * step,
        ]);
      }
    }
  }
  PointSet::from_arrays(CatalogKind::Data, &positions)
}

/// Survey meshes round up to an even cell count and grow the box.
#[test]
fn test_survey_rounds_up_to_even() {
  let spec = MeshSpec::new(
    DVec3::splat(10.0),
    DVec3::new(95.0, 100.0, 101.0),
    DVec3::ZERO,
    false,
  )
  .unwrap();

  assert_eq!(spec.nmesh(), [10, 10, 12]);
  assert_eq!(spec.boxsize(), DVec3::new(100.0, 100.0, 120.0));
  assert_eq!(spec.cellsize(), DVec3::splat(10.0));
}

/// Periodic meshes keep the box and adjust the cell size.
#[test]
fn test_box_like_keeps_boxsize() {
  let spec = MeshSpec::new(DVec3::splat(3.0), DVec3::splat(100.0), DVec3::splat(50.0), true).unwrap();

  assert_eq!(spec.nmesh(), [33, 33, 33]);
  assert_eq!(spec.boxsize(), DVec3::splat(100.0));
  assert!((spec.cellsize().x - 100.0 / 33.0).abs() < 1e-12);
}

#[test]
fn test_rejects_non_positive_cellsize() {
  let err = MeshSpec::new(DVec3::new(1.0, 0.0, 1.0), DVec3::splat(10.0), DVec3::ZERO, false);
  assert!(matches!(err, Err(VoidError::InvalidMesh(_))));
}

#[test]
fn test_rejects_huge_mesh() {
  let err = MeshSpec::new(DVec3::splat(1e-3), DVec3::splat(1e3), DVec3::ZERO, true);
  assert!(matches!(err, Err(VoidError::InvalidMesh(_))));
}

#[test]
fn test_index_coords_roundtrip() {
  let spec = MeshSpec::with_nmesh([4, 6, 8], DVec3::ONE, DVec3::ZERO, false).unwrap();
  for index in 0..spec.len() {
    let [x, y, z] = spec.coords(index);
    assert_eq!(spec.index(x, y, z), index);
  }
  assert_eq!(spec.index(1, 0, 0), 48);
  assert_eq!(spec.index(0, 1, 0), 8);
}

#[test]
fn test_node_position_and_grid_coordinate() {
  let spec = MeshSpec::with_nmesh([10, 10, 10], DVec3::splat(2.0), DVec3::splat(10.0), true).unwrap();

  assert_eq!(spec.offset(), DVec3::ZERO);
  assert_eq!(spec.node_position([0, 0, 0]), DVec3::splat(1.0));
  assert_eq!(spec.node_position([3, 4, 5]), DVec3::new(7.0, 9.0, 11.0));
  assert_eq!(spec.to_grid(DVec3::new(7.0, 9.0, 11.0)), DVec3::new(3.0, 4.0, 5.0));
}

#[test]
fn test_minimum_image_separation() {
  let spec = MeshSpec::with_nmesh([10, 10, 10], DVec3::ONE, DVec3::splat(5.0), true).unwrap();
  let d = spec.separation(DVec3::new(0.5, 5.0, 5.0), DVec3::new(9.5, 5.0, 5.0));
  assert!((d.x + 1.0).abs() < 1e-12);

  let survey = MeshSpec::with_nmesh([10, 10, 10], DVec3::ONE, DVec3::splat(5.0), false).unwrap();
  let d = survey.separation(DVec3::new(0.5, 5.0, 5.0), DVec3::new(9.5, 5.0, 5.0));
  assert!((d.x - 9.0).abs() < 1e-12);
}

#[test]
fn test_confine_wraps_or_clamps() {
  let periodic = MeshSpec::with_nmesh([10, 10, 10], DVec3::ONE, DVec3::splat(5.0), true).unwrap();
  let (p, moved) = periodic.confine(DVec3::new(-1.0, 5.0, 11.0));
  assert!(moved);
  assert!((p - DVec3::new(9.0, 5.0, 1.0)).length() < 1e-12);

  let survey = MeshSpec::with_nmesh([10, 10, 10], DVec3::ONE, DVec3::splat(5.0), false).unwrap();
  let (p, moved) = survey.confine(DVec3::new(-1.0, 5.0, 3.0));
  assert!(moved);
  assert_eq!(p, DVec3::new(0.0, 5.0, 3.0));

  let (_, moved) = survey.confine(DVec3::splat(4.0));
  assert!(!moved);
}

/// Derived cell size = mean separation / cells_per_r_sep.
#[test]
fn test_derive_from_points() {
  let points = cube_points(10, 100.0);
  let options = MeshOptions::new().with_box_like(true).with_boxsize(100.0).with_boxcenter(DVec3::splat(50.0));
  let spec = MeshSpec::derive(&options, &points, None).unwrap();

  // Extent is 90 (points at cell centers), separation = 90 / 10 = 9,
  // cellsize = 9 / 2 = 4.5, so 100 / 4.5 rounds to 22 cells.
  assert_eq!(spec.nmesh(), [22, 22, 22]);
  assert!(spec.box_like());
}

#[test]
fn test_derive_survey_pads_extent() {
  let points = cube_points(4, 40.0);
  let options = MeshOptions::new().with_cellsize(1.0);
  let spec = MeshSpec::derive(&options, &points, None).unwrap();

  // Extent 30 padded by 1.1 gives 33, rounded up to 34 cells.
  assert_eq!(spec.nmesh(), [34, 34, 34]);
  assert_eq!(spec.boxcenter(), DVec3::splat(20.0));
  assert!(spec.check_contains(&points).is_ok());
}

#[test]
fn test_derive_rejects_small_box() {
  let points = cube_points(4, 40.0);
  let options = MeshOptions::new()
    .with_cellsize(1.0)
    .with_boxsize(10.0)
    .with_boxcenter(DVec3::splat(20.0));
  let err = MeshSpec::derive(&options, &points, None).unwrap_err();
  assert!(matches!(err, VoidError::PointsOutsideBox { kind: "data", .. }));
}

#[test]
fn test_options_validation() {
  assert!(MeshOptions::new().validate().is_ok());
  assert!(MeshOptions::new().with_cells_per_r_sep(0.0).validate().is_err());
  assert!(MeshOptions::new().with_cellsize(-1.0).validate().is_err());
  assert!(MeshOptions::new().with_min_random_fraction(1.5).validate().is_err());
}

#[test]
fn test_for_shape_resolution() {
  let shape = [8, 8, 4];

  let spec = MeshSpec::for_shape(shape, &MeshOptions::new()).unwrap();
  assert_eq!(spec.cellsize(), DVec3::ONE);
  assert_eq!(spec.boxsize(), DVec3::new(8.0, 8.0, 4.0));
  assert_eq!(spec.boxcenter(), DVec3::new(4.0, 4.0, 2.0));

  let spec = MeshSpec::for_shape(shape, &MeshOptions::new().with_boxsize(16.0)).unwrap();
  assert_eq!(spec.cellsize(), DVec3::new(2.0, 2.0, 4.0));

  let spec = MeshSpec::for_shape(shape, &MeshOptions::new().with_cellsize(0.5).with_box_like(true)).unwrap();
  assert_eq!(spec.boxsize(), DVec3::new(4.0, 4.0, 2.0));
  assert!(spec.box_like());

  let options = MeshOptions::new()
    .with_cellsize(2.0)
    .with_boxsize_per_axis(DVec3::new(16.0, 16.0, 8.0))
    .with_boxcenter(DVec3::ZERO);
  let spec = MeshSpec::for_shape(shape, &options).unwrap();
  assert_eq!(spec.nmesh(), shape);
  assert_eq!(spec.boxcenter(), DVec3::ZERO);
}

#[test]
fn test_for_shape_rejects_inconsistent_geometry() {
  let options = MeshOptions::new().with_cellsize(1.0).with_boxsize(10.0);
  let err = MeshSpec::for_shape([8, 8, 8], &options).unwrap_err();
  assert!(matches!(
    err,
    VoidError::MeshShapeMismatch {
      expected: [10, 10, 10],
      actual: [8, 8, 8]
    }
  ));
}
