//! Minimal `.npy` reader and writer.
//!
//! Reads format versions 1 to 3 with little-endian `f4`/`f8`/`i4`/`i8`
//! payloads in C order. Writes `f8` arrays in version 1.

use anyhow::{bail, ensure, Context, Result};
use std::path::Path;

const MAGIC: &[u8] = b"\x93NUMPY";

/// A dense array converted to `f64`.
#[derive(Clone, Debug, PartialEq)]
pub struct NpyArray {
  pub shape: Vec<usize>,
  pub data: Vec<f64>,
}

impl NpyArray {
  /// Number of rows and columns, treating 1-D arrays as a single column.
  pub fn rows_cols(&self) -> Result<(usize, usize)> {
    match self.shape.as_slice() {
      [n] => Ok((*n, 1)),
      [n, m] => Ok((*n, *m)),
      other => bail!("expected a 1-D or 2-D array, got shape {other:?}"),
    }
  }

  /// Column `col` of a 2-D array.
  pub fn column(&self, col: usize) -> Result<Vec<f64>> {
    let (rows, cols) = self.rows_cols()?;
    ensure!(col < cols, "column {col} out of range for {cols} columns");
    Ok((0..rows).map(|r| self.data[r * cols + col]).collect())
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Dtype {
  F4,
  F8,
  I4,
  I8,
}

impl Dtype {
  fn parse(descr: &str) -> Result<Self> {
    match descr {
      "<f4" | "f4" => Ok(Dtype::F4),
      "<f8" | "f8" => Ok(Dtype::F8),
      "<i4" | "i4" => Ok(Dtype::I4),
      "<i8" | "i8" => Ok(Dtype::I8),
      other => bail!("unsupported dtype '{other}' (expected little-endian f4, f8, i4 or i8)"),
    }
  }

  fn size(&self) -> usize {
    match self {
      Dtype::F4 | Dtype::I4 => 4,
      Dtype::F8 | Dtype::I8 => 8,
    }
  }

  fn decode(&self, bytes: &[u8]) -> f64 {
    match self {
      Dtype::F4 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
      Dtype::I4 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
      Dtype::F8 => f64::from_le_bytes(eight(bytes)),
      Dtype::I8 => i64::from_le_bytes(eight(bytes)) as f64,
    }
  }
}

fn eight(bytes: &[u8]) -> [u8; 8] {
  let mut out = [0u8; 8];
  out.copy_from_slice(&bytes[..8]);
  out
}

/// Value of `'key': ...` in the header dict, up to the next top-level comma.
fn header_value<'a>(header: &'a str, key: &str) -> Result<&'a str> {
  let pattern = format!("'{key}':");
  let start = header
    .find(&pattern)
    .map(|i| i + pattern.len())
    .with_context(|| format!("header has no '{key}' entry"))?;
  let rest = header[start..].trim_start();
  let end = if rest.starts_with('(') {
    rest.find(')').map(|i| i + 1)
  } else {
    rest.find([',', '}'])
  }
  .with_context(|| format!("unterminated '{key}' entry"))?;
  Ok(rest[..end].trim())
}

fn parse_shape(value: &str) -> Result<Vec<usize>> {
  let inner = value
    .strip_prefix('(')
    .and_then(|v| v.strip_suffix(')'))
    .with_context(|| format!("malformed shape {value}"))?;
  inner
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| s.parse::<usize>().with_context(|| format!("malformed shape {value}")))
    .collect()
}

/// Decode an in-memory `.npy` file.
pub fn parse_npy(bytes: &[u8]) -> Result<NpyArray> {
  ensure!(bytes.len() >= 10 && bytes.starts_with(MAGIC), "not an .npy file");
  let major = bytes[6];
  let (header_len, header_start) = match major {
    1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
    2 | 3 => {
      ensure!(bytes.len() >= 12, "truncated .npy header");
      (
        u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
        12,
      )
    }
    v => bail!("unsupported .npy version {v}"),
  };
  let data_start = header_start + header_len;
  ensure!(bytes.len() >= data_start, "truncated .npy header");
  let header = std::str::from_utf8(&bytes[header_start..data_start]).context("header is not UTF-8")?;

  let descr = header_value(header, "descr")?.trim_matches(|c| c == '\'' || c == '"');
  let dtype = Dtype::parse(descr)?;
  ensure!(
    header_value(header, "fortran_order")? == "False",
    "Fortran-ordered arrays are not supported"
  );
  let shape = parse_shape(header_value(header, "shape")?)?;

  let count: usize = shape.iter().product();
  let payload = &bytes[data_start..];
  ensure!(
    payload.len() >= count * dtype.size(),
    "payload holds {} bytes, shape {shape:?} needs {}",
    payload.len(),
    count * dtype.size()
  );
  let data = payload
    .chunks_exact(dtype.size())
    .take(count)
    .map(|chunk| dtype.decode(chunk))
    .collect();
  Ok(NpyArray { shape, data })
}

/// Read an `.npy` file from disk.
pub fn read_npy(path: &Path) -> Result<NpyArray> {
  let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
  parse_npy(&bytes).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Encode `data` with `shape` as a version-1 `<f8` array.
pub fn encode_npy(shape: &[usize], data: &[f64]) -> Result<Vec<u8>> {
  let count: usize = shape.iter().product();
  ensure!(count == data.len(), "shape {shape:?} does not match {} values", data.len());

  let dims = match shape {
    [n] => format!("({n},)"),
    dims => format!(
      "({})",
      dims.iter().map(usize::to_string).collect::<Vec<_>>().join(", ")
    ),
  };
  let mut header = format!("{{'descr': '<f8', 'fortran_order': False, 'shape': {dims}, }}");
  // Preamble (magic, version, length, header, newline) aligned to 64 bytes.
  let unpadded = MAGIC.len() + 4 + header.len() + 1;
  header.push_str(&" ".repeat((64 - unpadded % 64) % 64));
  header.push('\n');
  let header_len = u16::try_from(header.len()).context("header too long")?;

  let mut out = Vec::with_capacity(MAGIC.len() + 4 + header.len() + data.len() * 8);
  out.extend_from_slice(MAGIC);
  out.extend_from_slice(&[1, 0]);
  out.extend_from_slice(&header_len.to_le_bytes());
  out.extend_from_slice(header.as_bytes());
  for value in data {
    out.extend_from_slice(&value.to_le_bytes());
  }
  Ok(out)
}

/// Write `data` with `shape` to `path` as `<f8`.
pub fn write_npy(path: &Path, shape: &[usize], data: &[f64]) -> Result<()> {
  let bytes = encode_npy(shape, data)?;
  std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
#[path = "npy_test.rs"]
mod npy_test;
