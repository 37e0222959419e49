use super::*;
use crate::npy::write_npy;

#[test]
fn test_column_spec_shorthands() {
  assert_eq!(ColumnSpec::parse("xyz").unwrap(), ColumnSpec::default());
  let rdz = ColumnSpec::parse("RDZ").unwrap();
  assert_eq!(rdz.coordinates, Coordinates::Sky);
  assert_eq!(rdz.names, ["ra".to_string(), "dec".to_string(), "z".to_string()]);
}

#[test]
fn test_column_spec_names() {
  let sky = ColumnSpec::parse("RA, DEC, Z_COSMO").unwrap();
  assert_eq!(sky.coordinates, Coordinates::Sky);
  assert_eq!(sky.names[2], "Z_COSMO");

  let cartesian = ColumnSpec::parse("px py pz").unwrap();
  assert_eq!(cartesian.coordinates, Coordinates::Cartesian);
  assert_eq!(cartesian.names[0], "px");

  assert!(ColumnSpec::parse("x,y").is_err());
}

#[test]
fn test_table_parsing() {
  let table = Table::parse("# x, y, z, w\n1 2 3 0.5\n# comment\n\n4,5,6,1.5\n").unwrap();
  assert_eq!(table.header, vec!["x", "y", "z", "w"]);
  assert_eq!(table.rows.len(), 2);
  assert_eq!(table.column("W").unwrap(), vec![0.5, 1.5]);
  assert!(table.column("q").is_err());
}

#[test]
fn test_table_rejects_bad_rows() {
  assert!(Table::parse("").is_err());
  assert!(Table::parse("x y z\n1 2\n").is_err());
  assert!(Table::parse("x y z\n1 2 abc\n").is_err());
}

#[test]
fn test_text_catalog_cartesian() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("galaxies.txt");
  std::fs::write(&path, "id y x z\n0 2.0 1.0 3.0\n1 5.0 4.0 6.0\n").unwrap();

  let points = load_catalog(&path, CatalogKind::Data, &ColumnSpec::default(), &Cosmology::default()).unwrap();
  assert_eq!(points.len(), 2);
  assert_eq!(points.positions()[0].to_array(), [1.0, 2.0, 3.0]);
  assert_eq!(points.positions()[1].to_array(), [4.0, 5.0, 6.0]);
}

#[test]
fn test_npy_catalog_sky() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("randoms.npy");
  write_npy(&path, &[2, 3], &[0.0, 0.0, 0.1, 90.0, 0.0, 0.1]).unwrap();

  let cosmology = Cosmology::default();
  let columns = ColumnSpec::parse("rdz").unwrap();
  let points = load_catalog(&path, CatalogKind::Random, &columns, &cosmology).unwrap();

  let distance = cosmology.comoving_distance(0.1);
  let first = points.positions()[0];
  let second = points.positions()[1];
  assert!((first.x - distance).abs() < 1e-3 * distance);
  assert!(first.y.abs() < 1e-9 && first.z.abs() < 1e-9);
  assert!((second.y - distance).abs() < 1e-3 * distance);
  assert!(second.x.abs() < 1e-6 * distance);
}

#[test]
fn test_npy_catalog_needs_three_columns() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("bad.npy");
  write_npy(&path, &[3], &[1.0, 2.0, 3.0]).unwrap();
  assert!(load_catalog(&path, CatalogKind::Data, &ColumnSpec::default(), &Cosmology::default()).is_err());
}

#[test]
fn test_weights_sources() {
  let dir = tempfile::tempdir().unwrap();

  let npy = dir.path().join("w.npy");
  write_npy(&npy, &[3], &[1.0, 2.0, 0.5]).unwrap();
  assert_eq!(load_weights(npy.to_str().unwrap()).unwrap(), vec![1.0, 2.0, 0.5]);

  let single = dir.path().join("w.txt");
  std::fs::write(&single, "weight\n1\n3\n").unwrap();
  assert_eq!(load_weights(single.to_str().unwrap()).unwrap(), vec![1.0, 3.0]);

  let multi = dir.path().join("cat.txt");
  std::fs::write(&multi, "x y z WEIGHT_FKP\n0 0 0 0.25\n1 1 1 0.75\n").unwrap();
  let named = format!("{}:WEIGHT_FKP", multi.display());
  assert_eq!(load_weights(&named).unwrap(), vec![0.25, 0.75]);
  assert!(load_weights(multi.to_str().unwrap()).is_err());
}

#[test]
fn test_weights_from_npy_column() {
  let dir = tempfile::tempdir().unwrap();
  let table = dir.path().join("cat.npy");
  write_npy(&table, &[2, 4], &[0.0, 1.0, 2.0, 0.5, 3.0, 4.0, 5.0, 1.5]).unwrap();

  let source = format!("{}:3", table.display());
  assert_eq!(load_weights(&source).unwrap(), vec![0.5, 1.5]);
  assert!(load_weights(&format!("{}:4", table.display())).is_err());
  assert!(load_weights(&format!("{}:WEIGHT", table.display())).is_err());
  assert!(load_weights(table.to_str().unwrap()).is_err());
}

#[test]
fn test_split_column_source() {
  let (path, column) = split_column_source("missing.txt:W");
  assert_eq!(path, PathBuf::from("missing.txt"));
  assert_eq!(column.as_deref(), Some("W"));

  let (path, column) = split_column_source("plain.npy");
  assert_eq!(path, PathBuf::from("plain.npy"));
  assert!(column.is_none());
}
