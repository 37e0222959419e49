//! Catalog readers: `.npy` arrays and delimited text tables with a header.

use anyhow::{bail, ensure, Context, Result};
use std::path::{Path, PathBuf};

use void_finder::{CatalogKind, Cosmology, PointSet};

use crate::npy::read_npy;

/// How the three position columns are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Coordinates {
  Cartesian,
  /// `ra`, `dec` in degrees and redshift.
  Sky,
}

/// The three position columns of a catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSpec {
  pub names: [String; 3],
  pub coordinates: Coordinates,
}

impl Default for ColumnSpec {
  fn default() -> Self {
    Self {
      names: ["x".into(), "y".into(), "z".into()],
      coordinates: Coordinates::Cartesian,
    }
  }
}

impl ColumnSpec {
  /// Parse `xyz`, `rdz` or three comma/space separated column names.
  ///
  /// Names starting with `ra` and `dec` select sky coordinates.
  pub fn parse(text: &str) -> Result<Self> {
    let trimmed = text.trim();
    match trimmed.to_ascii_lowercase().as_str() {
      "xyz" => return Ok(Self::default()),
      "rdz" => {
        return Ok(Self {
          names: ["ra".into(), "dec".into(), "z".into()],
          coordinates: Coordinates::Sky,
        })
      }
      _ => {}
    }

    let names: Vec<&str> = split_fields(trimmed).collect();
    let &[a, b, c] = names.as_slice() else {
      bail!("--columns needs three names, got '{text}'");
    };
    let lower = |s: &str| s.to_ascii_lowercase();
    let coordinates = if lower(a).starts_with("ra") && lower(b).starts_with("dec") {
      Coordinates::Sky
    } else {
      Coordinates::Cartesian
    };
    Ok(Self {
      names: [a.to_string(), b.to_string(), c.to_string()],
      coordinates,
    })
  }
}

fn split_fields(line: &str) -> impl Iterator<Item = &str> {
  line
    .split(|c: char| c == ',' || c.is_whitespace())
    .filter(|s| !s.is_empty())
}

/// A text table: header names and numeric rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
  pub header: Vec<String>,
  pub rows: Vec<Vec<f64>>,
}

impl Table {
  /// Parse whitespace or comma separated text. The first non-empty line is
  /// the header (a leading `#` is stripped); later `#` lines are comments.
  pub fn parse(text: &str) -> Result<Self> {
    let mut lines = text
      .lines()
      .enumerate()
      .map(|(i, line)| (i + 1, line.trim()))
      .filter(|(_, line)| !line.is_empty());

    let (_, first) = lines.next().context("table is empty")?;
    let header: Vec<String> = split_fields(first.trim_start_matches('#'))
      .map(str::to_string)
      .collect();
    ensure!(!header.is_empty(), "table header is empty");

    let mut rows = Vec::new();
    for (number, line) in lines.filter(|(_, line)| !line.starts_with('#')) {
      let row = split_fields(line)
        .map(|field| {
          field
            .parse::<f64>()
            .with_context(|| format!("line {number}: '{field}' is not a number"))
        })
        .collect::<Result<Vec<_>>>()?;
      ensure!(
        row.len() == header.len(),
        "line {number}: expected {} fields, found {}",
        header.len(),
        row.len()
      );
      rows.push(row);
    }
    Ok(Self { header, rows })
  }

  pub fn read(path: &Path) -> Result<Self> {
    let text =
      std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Self::parse(&text).with_context(|| format!("Failed to parse {}", path.display()))
  }

  /// Index of a column, compared case-insensitively.
  pub fn column_index(&self, name: &str) -> Result<usize> {
    self
      .header
      .iter()
      .position(|h| h.eq_ignore_ascii_case(name))
      .with_context(|| format!("no column '{name}' in header {:?}", self.header))
  }

  pub fn column(&self, name: &str) -> Result<Vec<f64>> {
    let index = self.column_index(name)?;
    Ok(self.rows.iter().map(|row| row[index]).collect())
  }
}

fn is_npy(path: &Path) -> bool {
  path
    .extension()
    .is_some_and(|ext| ext.eq_ignore_ascii_case("npy"))
}

/// Rows of `[a, b, c]` from a catalog file.
fn read_triples(path: &Path, columns: &ColumnSpec) -> Result<Vec<[f64; 3]>> {
  if is_npy(path) {
    let array = read_npy(path)?;
    let (rows, cols) = array.rows_cols()?;
    ensure!(
      array.shape.len() == 2 && cols >= 3,
      "{}: expected an (N, 3) array, got shape {:?}",
      path.display(),
      array.shape
    );
    return Ok(
      (0..rows)
        .map(|r| {
          let row = &array.data[r * cols..r * cols + 3];
          [row[0], row[1], row[2]]
        })
        .collect(),
    );
  }

  let table = Table::read(path)?;
  let indices = columns
    .names
    .iter()
    .map(|name| table.column_index(name))
    .collect::<Result<Vec<_>>>()
    .with_context(|| format!("Selecting columns in {}", path.display()))?;
  Ok(
    table
      .rows
      .iter()
      .map(|row| [row[indices[0]], row[indices[1]], row[indices[2]]])
      .collect(),
  )
}

/// Load positions from `path`, converting sky coordinates with `cosmology`.
pub fn load_catalog(
  path: &Path,
  kind: CatalogKind,
  columns: &ColumnSpec,
  cosmology: &Cosmology,
) -> Result<PointSet> {
  let rows = read_triples(path, columns)?;
  ensure!(!rows.is_empty(), "{} holds no rows", path.display());
  Ok(match columns.coordinates {
    Coordinates::Cartesian => PointSet::from_arrays(kind, &rows),
    Coordinates::Sky => PointSet::from_sky(kind, &rows, cosmology),
  })
}

/// Split `file.txt:COLUMN` into the file and the column name. A source that
/// names an existing file is never split.
pub fn split_column_source(source: &str) -> (PathBuf, Option<String>) {
  let whole = PathBuf::from(source);
  if whole.exists() {
    return (whole, None);
  }
  match source.rsplit_once(':') {
    Some((path, column)) if !path.is_empty() && !column.is_empty() => {
      (PathBuf::from(path), Some(column.to_string()))
    }
    _ => (whole, None),
  }
}

/// Load weights from a 1-D `.npy` array, a column of a 2-D one
/// (`file.npy:3`), a single-column text file or a named text column
/// (`file.txt:WEIGHT`).
pub fn load_weights(source: &str) -> Result<Vec<f64>> {
  let (path, column) = split_column_source(source);
  if is_npy(&path) {
    let array = read_npy(&path)?;
    return match column {
      Some(name) => {
        let index: usize = name
          .parse()
          .with_context(|| format!("{}: .npy columns are selected by index, got '{name}'", path.display()))?;
        array.column(index)
      }
      None => {
        let (_, cols) = array.rows_cols()?;
        ensure!(cols == 1, "{}: weights must be 1-D, got shape {:?}", path.display(), array.shape);
        Ok(array.data)
      }
    };
  }

  let table = Table::read(&path)?;
  match column {
    Some(name) => table.column(&name),
    None if table.header.len() == 1 => Ok(table.rows.iter().map(|row| row[0]).collect()),
    None => bail!(
      "{} has {} columns; name one as {}:COLUMN",
      path.display(),
      table.header.len(),
      path.display()
    ),
  }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod catalog_test;
