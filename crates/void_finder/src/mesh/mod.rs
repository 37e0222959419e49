//! Mesh builder: grid geometry, mass assignment and the overdensity field.

pub mod assign;
pub mod field;
pub mod spec;

pub use assign::{paint, readout, MassAssignment};
pub use field::{build_mesh, DensityField, PrecomputedMesh};
pub use spec::{MeshOptions, MeshSpec};
