//! Error types for void finding.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VoidError>;

/// Errors raised by the void finder.
///
/// Configuration variants are returned before any mesh or FFT work starts.
/// Per-radius variants end up in [`RadiusFailure`] unless every radius fails.
#[derive(Error, Debug, Clone)]
pub enum VoidError {
  #[error("either a data catalog or a precomputed mesh must be provided")]
  MissingInput,

  #[error("{kind} catalog is empty or has zero total weight")]
  EmptyCatalog { kind: &'static str },

  #[error("{kind} catalog has {positions} positions but {weights} weights")]
  WeightLengthMismatch {
    kind: &'static str,
    positions: usize,
    weights: usize,
  },

  #[error("{kind} catalog contains a non-finite position or weight at index {index}")]
  NonFiniteInput { kind: &'static str, index: usize },

  #[error("invalid mesh configuration: {0}")]
  InvalidMesh(String),

  #[error("precomputed mesh has shape {actual:?} but the mesh geometry expects {expected:?}")]
  MeshShapeMismatch {
    expected: [usize; 3],
    actual: [usize; 3],
  },

  #[error("{count} {kind} points lie outside the mesh box (first at {first:?})")]
  PointsOutsideBox {
    kind: &'static str,
    count: usize,
    first: [f64; 3],
  },

  #[error("invalid reconstruction arguments: {0}")]
  InvalidReconstruction(String),

  #[error("reconstruction needs a data catalog; a precomputed mesh cannot be displaced")]
  ReconstructionWithoutCatalog,

  #[error("void radius list is empty")]
  EmptyRadii,

  #[error("void radius {0} must be finite and positive")]
  InvalidRadius(f64),

  #[error("void_delta must be finite, got {0}")]
  InvalidThreshold(f64),

  #[error("void_overlap must lie in [0, 1], got {0}")]
  InvalidOverlap(f64),

  #[error("invalid size function binning: {0}")]
  InvalidBinning(String),

  #[error("radius {radius} does not fit in the mesh (half of the smallest box side is {half_extent})")]
  RadiusTooLarge { radius: f64, half_extent: f64 },

  #[error("smoothed field at radius {radius} has {count} non-finite values")]
  NonFiniteField { radius: f64, count: usize },

  #[error("processing of radius {radius} panicked: {message}")]
  TaskPanicked { radius: f64, message: String },

  #[error("failed to build worker pool: {0}")]
  ThreadPool(String),

  #[error("all {} void radii failed", .failures.len())]
  AllRadiiFailed {
    failures: Vec<RadiusFailure>,
    #[source]
    cause: Box<VoidError>,
  },
}

impl VoidError {
  /// True for errors that are raised before any computation starts.
  pub fn is_configuration(&self) -> bool {
    !matches!(
      self,
      VoidError::RadiusTooLarge { .. }
        | VoidError::NonFiniteField { .. }
        | VoidError::TaskPanicked { .. }
        | VoidError::AllRadiiFailed { .. }
    )
  }
}

/// A radius whose smoothing or extraction failed.
#[derive(Debug, Clone)]
pub struct RadiusFailure {
  pub radius: f64,
  pub error: VoidError,
}

impl std::fmt::Display for RadiusFailure {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "radius {}: {}", self.radius, self.error)
  }
}
