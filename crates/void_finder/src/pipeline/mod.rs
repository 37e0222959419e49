//! End-to-end void search: configuration, per-radius work and the
//! [`VoidFinder`] orchestrator.

pub mod config;
pub mod finder;
pub mod process;

#[cfg(test)]
pub mod test_utils;

pub use config::{SearchParams, VoidFinderConfig, VoidFinderInput, DEFAULT_VOID_DELTA};
pub use finder::{RunReport, VoidFinder, VoidFindingOutput};
pub use process::{process_radii, process_radius, RadiusResult, RadiusStats};
