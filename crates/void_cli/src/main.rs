//! Spherical void finder command line.
//!
//! Reads data/random catalogs (or a precomputed overdensity mesh), runs the
//! void search and writes three arrays:
//! - `<prefix>void_positions.npy`: N×3 void centers
//! - `<prefix>void_radii.npy`: N void radii
//! - `<prefix>void_vsf.npy`: nbins×3 size function (center, count, density)
//!
//! The prefix is `output/` by default, `<save_fn>_` otherwise.

mod catalog;
mod config;
mod npy;

use anyhow::{bail, ensure, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use catalog::{load_catalog, load_weights, ColumnSpec};
use config::FileConfig;
use void_finder::{
  CatalogKind, Cosmology, DensityField, PointSet, PrecomputedMesh, ReconMode, ReconstructionParams,
  SearchParams, VoidFinder, VoidFinderConfig, VoidFinderInput, VoidFindingOutput, VsfBinning,
  WindowFunction,
};

/// Default location of a saved mesh when `--mesh true` is given.
const DEFAULT_MESH_PATH: &str = "output/mesh.npy";

/// Run spherical void-finding on simulated or survey data.
#[derive(Parser, Debug)]
#[command(name = "find_voids")]
#[command(about = "Run spherical void-finding on simulated or survey data")]
struct Args {
  /// Path to data positions (.npy or text with a header).
  #[arg(long)]
  data: Option<PathBuf>,

  /// Path to random positions.
  #[arg(long)]
  random: Option<PathBuf>,

  /// Data weights: .npy (`file.npy:INDEX` for a 2-D array), single-column
  /// text, or `file.txt:COLUMN`.
  #[arg(long, alias = "data_weights")]
  data_weights: Option<String>,

  /// Random weights, same forms as --data-weights.
  #[arg(long, alias = "random_weights")]
  random_weights: Option<String>,

  /// Position columns: `xyz`, `rdz` or three names such as `RA,DEC,Z`.
  #[arg(long)]
  columns: Option<String>,

  /// Density mesh (.npy) to load; NaN cells are masked. With --data, where
  /// to save the built mesh instead (`true` for output/mesh.npy).
  #[arg(long)]
  mesh: Option<String>,

  /// Mesh cells per mean galaxy separation, used to set the cell size [2.0].
  #[arg(long, alias = "cells_per_r_sep")]
  cells_per_r_sep: Option<f64>,

  /// Reconstruction mode: disp, rsd or disp+rsd.
  #[arg(long)]
  reconstruct: Option<String>,

  /// Reconstruction tokens: f bias los smoothing_radius recon_pad engine [0.8 2.0].
  #[arg(long, alias = "recon_args", num_args = 1..=6)]
  recon_args: Option<Vec<String>>,

  /// Mesh tokens: cellsize boxsize boxcenter box_like (`none` skips one).
  #[arg(long, alias = "mesh_args", num_args = 1..=4)]
  mesh_args: Option<Vec<String>>,

  /// Void radii to search for.
  #[arg(long, num_args = 1..)]
  radii: Option<Vec<f64>>,

  /// Maximum mean enclosed overdensity of a void [-0.8].
  #[arg(long, alias = "void_delta", allow_negative_numbers = true)]
  void_delta: Option<f64>,

  /// Allowed shared volume fraction between voids [0.0].
  #[arg(long, alias = "void_overlap")]
  void_overlap: Option<f64>,

  /// Output prefix; files are written as `<save_fn>_void_*.npy` [output/].
  #[arg(long, alias = "save_fn")]
  save_fn: Option<String>,

  /// Worker threads, 0 for all cores [0].
  #[arg(long)]
  threads: Option<usize>,

  /// Matter density for sky coordinate conversion [0.315].
  #[arg(long, alias = "omega_m")]
  omega_m: Option<f64>,

  /// Mass assignment: ngp, cic or tsc [cic].
  #[arg(long)]
  assignment: Option<String>,

  /// Smoothing window: tophat or gaussian [tophat].
  #[arg(long)]
  window: Option<String>,

  /// Explicit size function bin edges (default: derived from the radii).
  #[arg(long, num_args = 2..)]
  vsf_edges: Option<Vec<f64>>,

  /// TOML config file; command-line flags override its values.
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Only log warnings and errors.
  #[arg(short, long)]
  quiet: bool,

  /// Log debug events.
  #[arg(short, long, conflicts_with = "quiet")]
  verbose: bool,
}

/// Everything a run needs, after merging flags over the config file.
#[derive(Debug)]
struct Settings {
  data: Option<PathBuf>,
  random: Option<PathBuf>,
  data_weights: Option<String>,
  random_weights: Option<String>,
  columns: ColumnSpec,
  mesh: Option<String>,
  cosmology: Cosmology,
  finder: VoidFinderConfig,
  search: SearchParams,
  save_fn: Option<String>,
}

impl Settings {
  fn resolve(args: Args, file: FileConfig) -> Result<Self> {
    let data = args.data.or(file.data);
    let mesh = args.mesh.or(file.mesh_path);
    if data.is_none() && mesh.is_none() {
      bail!("Either --data or --mesh must be provided");
    }

    let columns = match args.columns.or(file.columns) {
      Some(text) => ColumnSpec::parse(&text)?,
      None => ColumnSpec::default(),
    };
    let omega_m = args.omega_m.or(file.omega_m).unwrap_or(Cosmology::default().omega_m);
    ensure!(
      omega_m > 0.0 && omega_m <= 1.0,
      "--omega-m must lie in (0, 1], got {omega_m}"
    );

    let mut mesh_section = file.mesh;
    if let Some(tokens) = &args.mesh_args {
      mesh_section.apply_tokens(tokens)?;
    }
    if args.cells_per_r_sep.is_some() {
      mesh_section.cells_per_r_sep = args.cells_per_r_sep;
    }
    if args.assignment.is_some() {
      mesh_section.assignment = args.assignment;
    }
    let mut finder = VoidFinderConfig::new().with_mesh(mesh_section.to_options()?);
    if let Some(window) = args.window.or(mesh_section.window) {
      finder = finder.with_window(window.parse::<WindowFunction>()?);
    }
    if let Some(params) = reconstruction(args.reconstruct, args.recon_args, file.reconstruction)? {
      finder = finder.with_reconstruction(params);
    }

    let radii = args
      .radii
      .or(file.search.radii.clone())
      .context("--radii is required (or `radii` under [search] in the config file)")?;
    let binning = match args.vsf_edges {
      Some(edges) => VsfBinning::Edges(edges),
      None => file.search.binning(),
    };
    let mut search = SearchParams::new(radii).with_binning(binning);
    if let Some(void_delta) = args.void_delta.or(file.search.void_delta) {
      search = search.with_void_delta(void_delta);
    }
    if let Some(void_overlap) = args.void_overlap.or(file.search.void_overlap) {
      search = search.with_void_overlap(void_overlap);
    }
    if let Some(threads) = args.threads.or(file.search.threads) {
      search = search.with_threads(threads);
    }

    Ok(Self {
      data,
      random: args.random.or(file.random),
      data_weights: args.data_weights.or(file.data_weights),
      random_weights: args.random_weights.or(file.random_weights),
      columns,
      mesh,
      cosmology: Cosmology::new(omega_m),
      finder,
      search,
      save_fn: args.save_fn.or(file.save_fn),
    })
  }
}

/// Reconstruction from flags layered over the file section: `--reconstruct`
/// replaces the mode and `--recon-args` the leading positional fields.
fn reconstruction(
  mode: Option<String>,
  tokens: Option<Vec<String>>,
  section: Option<config::ReconSection>,
) -> Result<Option<ReconstructionParams>> {
  let mut params = match (mode, section) {
    (Some(mode), None) => ReconstructionParams::new(mode.parse::<ReconMode>()?),
    (Some(mode), Some(section)) => {
      let mut params = section.to_params()?;
      params.mode = mode.parse::<ReconMode>()?;
      params
    }
    (None, Some(section)) => section.to_params()?,
    (None, None) => {
      if tokens.is_some() {
        tracing::warn!("--recon-args given without --reconstruct; ignoring them");
      }
      return Ok(None);
    }
  };
  if let Some(tokens) = tokens {
    params.apply_tokens(&tokens)?;
  }
  Ok(Some(params))
}

fn init_logging(quiet: bool, verbose: bool) {
  let filter = if quiet {
    EnvFilter::new("warn")
  } else if verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn load_points(
  path: &Path,
  kind: CatalogKind,
  weights: Option<&str>,
  settings: &Settings,
) -> Result<PointSet> {
  let points = load_catalog(path, kind, &settings.columns, &settings.cosmology)
    .with_context(|| format!("Loading {} catalog {}", kind.as_str(), path.display()))?;
  tracing::info!(kind = kind.as_str(), points = points.len(), path = %path.display(), "catalog loaded");
  match weights {
    Some(source) => {
      let weights = load_weights(source).with_context(|| format!("Loading weights {source}"))?;
      Ok(points.with_weights(weights)?)
    }
    None => Ok(points),
  }
}

fn load_mesh(path: &Path) -> Result<PrecomputedMesh> {
  let array = npy::read_npy(path)?;
  let &[nx, ny, nz] = array.shape.as_slice() else {
    bail!("{}: mesh must be a 3-D array, got shape {:?}", path.display(), array.shape);
  };
  Ok(PrecomputedMesh::new(array.data, [nx, ny, nz]))
}

/// Overdensity values for saving; masked cells become NaN so a reloaded
/// mesh keeps the survey footprint.
fn mesh_values(field: &DensityField) -> Vec<f64> {
  field
    .delta()
    .iter()
    .zip(field.valid())
    .map(|(&delta, &valid)| if valid { delta } else { f64::NAN })
    .collect()
}

fn ensure_parent(path: &Path) -> Result<()> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("Failed to create output dir: {}", parent.display()))?;
  }
  Ok(())
}

fn output_prefix(save_fn: Option<&str>) -> String {
  match save_fn {
    Some(save_fn) => format!("{save_fn}_"),
    None => "output/".to_string(),
  }
}

fn save_outputs(output: &VoidFindingOutput, prefix: &str) -> Result<()> {
  let positions: Vec<f64> = output.void_positions().into_iter().flatten().collect();
  let radii = output.void_radii();
  let vsf: Vec<f64> = output.void_vsf().into_iter().flatten().collect();

  let files: [(&str, Vec<usize>, &[f64]); 3] = [
    ("void_positions.npy", vec![radii.len(), 3], &positions),
    ("void_radii.npy", vec![radii.len()], &radii),
    ("void_vsf.npy", vec![vsf.len() / 3, 3], &vsf),
  ];
  for (name, shape, values) in files {
    let path = PathBuf::from(format!("{prefix}{name}"));
    ensure_parent(&path)?;
    npy::write_npy(&path, &shape, values).with_context(|| format!("Saving {name}"))?;
  }
  Ok(())
}

fn run(settings: Settings) -> Result<()> {
  let mut input = VoidFinderInput::new();
  let mut save_mesh = None;
  match &settings.data {
    Some(data) => {
      let data = load_points(data, CatalogKind::Data, settings.data_weights.as_deref(), &settings)?;
      input = input.with_data(data);
      if let Some(random) = &settings.random {
        let random =
          load_points(random, CatalogKind::Random, settings.random_weights.as_deref(), &settings)?;
        input = input.with_random(random);
      }
      save_mesh = settings.mesh.as_deref().map(|mesh| {
        if mesh.eq_ignore_ascii_case("true") {
          PathBuf::from(DEFAULT_MESH_PATH)
        } else {
          PathBuf::from(mesh)
        }
      });
    }
    None => {
      let path = settings.mesh.as_deref().context("Either --data or --mesh must be provided")?;
      let mesh = load_mesh(Path::new(path)).with_context(|| format!("Loading mesh {path}"))?;
      tracing::info!(shape = ?mesh.shape, path, "mesh loaded");
      input = input.with_mesh(mesh);
    }
  }

  let finder = VoidFinder::new(input, settings.finder.clone()).context("Building density field")?;
  if let Some(path) = save_mesh {
    let field = finder.density_field();
    ensure_parent(&path)?;
    npy::write_npy(&path, &field.spec().nmesh(), &mesh_values(field))
      .with_context(|| format!("Saving mesh to {}", path.display()))?;
    tracing::info!(path = %path.display(), "mesh saved");
  }

  let output = finder
    .run_voidfinding(&settings.search)
    .context("Running void search")?;
  for failure in &output.failures {
    tracing::warn!(radius = failure.radius, error = %failure.error, "radius skipped");
  }

  let prefix = output_prefix(settings.save_fn.as_deref());
  tracing::info!(voids = output.catalog.len(), "saving output to {prefix}*");
  save_outputs(&output, &prefix)
}

fn main() -> Result<()> {
  let args = Args::parse();
  init_logging(args.quiet, args.verbose);

  let file = match &args.config {
    Some(path) => FileConfig::load(path)?,
    None => FileConfig::default(),
  };
  let settings = Settings::resolve(args, file)?;
  run(settings)
}
