use super::*;

#[test]
fn test_point_set_default_weights() {
  let points = PointSet::from_arrays(CatalogKind::Data, &[[0.0, 0.0, 0.0], [1.0, 2.0, 3.0]]);
  assert_eq!(points.len(), 2);
  assert_eq!(points.weights(), &[1.0, 1.0]);
  assert_eq!(points.total_weight(), 2.0);
}

#[test]
fn test_weight_length_mismatch() {
  let points = PointSet::from_arrays(CatalogKind::Random, &[[0.0; 3]]);
  let err = points.with_weights(vec![1.0, 2.0]).unwrap_err();
  assert!(matches!(
    err,
    VoidError::WeightLengthMismatch {
      positions: 1,
      weights: 2,
      ..
    }
  ));
}

#[test]
fn test_validate_rejects_empty_and_zero_weight() {
  let empty = PointSet::new(CatalogKind::Data, Vec::new());
  assert!(matches!(
    empty.validate(),
    Err(VoidError::EmptyCatalog { kind: "data" })
  ));

  let zero = PointSet::from_arrays(CatalogKind::Data, &[[1.0; 3]])
    .with_weights(vec![0.0])
    .unwrap();
  assert!(zero.validate().is_err());
}

#[test]
fn test_validate_rejects_non_finite() {
  let points = PointSet::from_arrays(CatalogKind::Data, &[[1.0; 3], [f64::NAN, 0.0, 0.0]]);
  assert!(matches!(
    points.validate(),
    Err(VoidError::NonFiniteInput { index: 1, .. })
  ));
}

#[test]
fn test_bounds() {
  let points = PointSet::from_arrays(
    CatalogKind::Data,
    &[[1.0, -2.0, 3.0], [-1.0, 2.0, 0.5], [0.0, 0.0, 4.0]],
  );
  let (lo, hi) = points.bounds().unwrap();
  assert_eq!(lo, DVec3::new(-1.0, -2.0, 0.5));
  assert_eq!(hi, DVec3::new(1.0, 2.0, 4.0));

  assert!(PointSet::new(CatalogKind::Data, Vec::new()).bounds().is_none());
}

#[test]
fn test_catalog_arrays() {
  let catalog = VoidCatalog::new(vec![
    VoidCandidate {
      center: DVec3::new(1.0, 2.0, 3.0),
      radius: 10.0,
      delta: -0.9,
      grid_index: 5,
    },
    VoidCandidate {
      center: DVec3::new(4.0, 5.0, 6.0),
      radius: 8.0,
      delta: -0.85,
      grid_index: 9,
    },
  ]);

  assert_eq!(catalog.positions(), vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
  assert_eq!(catalog.radii(), vec![10.0, 8.0]);
}

#[test]
fn test_diagnostics_collects_warnings() {
  let mut diagnostics = Diagnostics::new();
  assert!(diagnostics.is_empty());
  diagnostics.warn("first");
  diagnostics.warn(String::from("second"));
  assert_eq!(diagnostics.warnings(), &["first", "second"]);
}
