// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! PolyBrick CLI - pack ellipsoids inside closed boundaries.
//!
//! Subcommands:
//! - `pack`: run a packing job and write the ellipsoids as JSON (and OBJ)
//! - `lattice`: find touching ellipsoids in a packing result
//! - `field`: inspect a tensor field file and trace its stress curves

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use polybrick_geometry::{Aabb, Boundary, BoxBoundary, Point3, Vector3};
use polybrick_packing::lattice::{DEFAULT_MAX_TOLERANCE, DEFAULT_MIN_TOLERANCE};
use polybrick_packing::{
    ellipsoids_to_mesh, kissing_lattice, Ellipsoid, LiveInput, OutcomeRecord, PackingConfig,
    PackingOutcome, PackingSession, TensorField,
};

mod config;
mod job;
mod obj;

use config::Config;
use job::Job;

#[derive(Parser, Debug)]
#[command(name = "polybrick")]
#[command(about = "Pack non-overlapping ellipsoids inside closed boundaries", long_about = None)]
struct Cli {
    /// Worker threads for parallel collision detection (default: POLYBRICK_THREADS or CPU count)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Debug logging for the packing engine when RUST_LOG is unset
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a packing job
    Pack(PackArgs),
    /// Find touching ellipsoids in a packing result
    Lattice(LatticeArgs),
    /// Print statistics of a tensor field file
    Field(FieldArgs),
}

#[derive(Parser, Debug)]
struct PackArgs {
    /// Job file (JSON)
    job: PathBuf,

    /// Output JSON file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the ellipsoids as an OBJ mesh
    #[arg(long)]
    obj: Option<PathBuf>,

    /// Random seed (overrides the job and POLYBRICK_SEED)
    #[arg(long)]
    seed: Option<u64>,

    /// Drive the session frame by frame as an interactive host would
    #[arg(long)]
    live: bool,

    /// Latitude rings per ellipsoid in the OBJ output
    #[arg(long, default_value = "8")]
    rings: u32,

    /// Longitude segments per ellipsoid in the OBJ output
    #[arg(long, default_value = "12")]
    segments: u32,
}

#[derive(Parser, Debug)]
struct LatticeArgs {
    /// Packing result written by `pack`
    input: PathBuf,

    /// Output JSON file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the lattice segments as OBJ lines
    #[arg(long)]
    obj: Option<PathBuf>,

    /// Smallest kissing distance as a fraction of the rim distance
    #[arg(long, default_value_t = DEFAULT_MIN_TOLERANCE)]
    min_tolerance: f64,

    /// Largest kissing distance as a fraction of the rim distance
    #[arg(long, default_value_t = DEFAULT_MAX_TOLERANCE)]
    max_tolerance: f64,
}

#[derive(Parser, Debug)]
struct FieldArgs {
    /// Tensor field CSV
    csv: PathBuf,

    /// Translate the field by x,y,z before reporting
    #[arg(long, value_delimiter = ',', num_args = 3)]
    translate: Option<Vec<f64>>,

    /// Trace principal stress curves from the seed point x,y,z
    #[arg(long, value_delimiter = ',', num_args = 3)]
    curves: Option<Vec<f64>>,

    /// Step length for stress curves
    #[arg(long, default_value_t = 1.0)]
    step: f64,

    /// Closed OBJ mesh bounding the stress curves (default: the field's node bounds)
    #[arg(long)]
    boundary: Option<PathBuf>,

    /// Also write the stress curves as OBJ lines
    #[arg(long)]
    obj: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().with_threads(cli.threads);

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(config.log_filter(cli.verbose))
        .with_writer(io::stderr)
        .init();

    // Initialize rayon thread pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads)
        .build_global()
        .context("Failed to initialize thread pool")?;

    match cli.command {
        Commands::Pack(args) => pack(args, &config),
        Commands::Lattice(args) => lattice(args),
        Commands::Field(args) => field(args),
    }
}

fn pack(args: PackArgs, config: &Config) -> Result<()> {
    let job = Job::load(&args.job)?;
    let base = args.job.parent().unwrap_or_else(|| Path::new("."));
    let boundary = job.boundary(base)?;
    let tensor_field = job.tensor_field(base)?;

    let mut params = job.params.clone();
    params.seed = args.seed.or(params.seed).or(config.seed);
    let packing = PackingConfig::try_from(params).context("Invalid packing parameters")?;

    tracing::info!(
        job = %args.job.display(),
        initial_number = packing.initial_number,
        min_radius = packing.min_radius,
        max_radius = packing.max_radius,
        max_iterations = packing.max_iterations,
        worker_threads = config.worker_threads,
        live = args.live,
        "Starting packing"
    );

    let start = Instant::now();
    let mut session = PackingSession::new(boundary, tensor_field, packing)?;
    let outcome = if args.live {
        run_live(&mut session)?
    } else {
        session.run()?
    };

    tracing::info!(
        termination = ?outcome.termination,
        ellipsoids = outcome.ellipsoids().len(),
        total_iterations = outcome.total_iterations,
        growths = outcome.growths,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Packing complete"
    );

    write_json(&OutcomeRecord::from(&outcome), args.output.as_deref())?;

    if let Some(path) = &args.obj {
        let mesh = ellipsoids_to_mesh(outcome.ellipsoids(), args.rings, args.segments);
        obj::write_mesh(&mesh, BufWriter::new(create(path)?))?;
        tracing::info!(path = %path.display(), triangles = mesh.triangle_count(), "Wrote OBJ mesh");
    }
    Ok(())
}

/// Tick the session until it stops asking to be re-run.
fn run_live(session: &mut PackingSession) -> Result<PackingOutcome> {
    let input = LiveInput {
        start: true,
        ..Default::default()
    };
    loop {
        let frame = session.tick(input)?;
        tracing::trace!(
            iteration = frame.total_iterations,
            ellipsoids = frame.ellipsoids.len(),
            "Frame"
        );
        if !frame.rerun {
            break;
        }
    }
    session
        .outcome()
        .context("Live session stopped before terminating")
}

#[derive(Serialize)]
struct LatticeOutput {
    centroids: Vec<[f64; 3]>,
    segments: Vec<[[f64; 3]; 2]>,
}

fn lattice(args: LatticeArgs) -> Result<()> {
    let file = File::open(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    let record: OutcomeRecord = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", args.input.display()))?;
    let ellipsoids: Vec<Ellipsoid> = record.ellipsoids.iter().map(|r| r.to_ellipsoid()).collect();

    let lattice = kissing_lattice(&ellipsoids, args.min_tolerance, args.max_tolerance);
    tracing::info!(
        ellipsoids = ellipsoids.len(),
        segments = lattice.segments.len(),
        "Kissing lattice"
    );

    let output = LatticeOutput {
        centroids: lattice.centroids.iter().map(|p| [p.x, p.y, p.z]).collect(),
        segments: lattice
            .segments
            .iter()
            .map(|[a, b]| [[a.x, a.y, a.z], [b.x, b.y, b.z]])
            .collect(),
    };
    write_json(&output, args.output.as_deref())?;

    if let Some(path) = &args.obj {
        obj::write_segments(&lattice.segments, BufWriter::new(create(path)?))?;
    }
    Ok(())
}

#[derive(Serialize)]
struct StressCurves {
    seed: [f64; 3],
    step: f64,
    major: Vec<[f64; 3]>,
    middle: Vec<[f64; 3]>,
    minor: Vec<[f64; 3]>,
}

#[derive(Serialize)]
struct FieldSummary {
    tensors: usize,
    min_stress: f64,
    max_stress: f64,
    stress_threshold: f64,
    nodes: Vec<[f64; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    curves: Option<StressCurves>,
}

fn field(args: FieldArgs) -> Result<()> {
    let mut field = TensorField::from_csv_path(&args.csv)
        .with_context(|| format!("Failed to load tensor field {}", args.csv.display()))?;
    if let Some(&[x, y, z]) = args.translate.as_deref() {
        field = field.translated(&Vector3::new(x, y, z));
    }

    let curves = match args.curves.as_deref() {
        Some(&[x, y, z]) => Some(stress_curves(&field, Point3::new(x, y, z), &args)?),
        _ => None,
    };

    let summary = FieldSummary {
        tensors: field.len(),
        min_stress: field.min_stress(),
        max_stress: field.max_stress(),
        stress_threshold: field.stress_threshold(),
        nodes: field.nodes().map(|p| [p.x, p.y, p.z]).collect(),
        curves,
    };
    write_json(&summary, None)
}

fn stress_curves(field: &TensorField, seed: Point3<f64>, args: &FieldArgs) -> Result<StressCurves> {
    ensure!(args.step > 0.0, "--step must be positive, got {}", args.step);
    let boundary: Box<dyn Boundary> = match &args.boundary {
        Some(path) => Box::new(obj::load_mesh_boundary(path)?),
        None => {
            let nodes: Vec<Point3<f64>> = field.nodes().collect();
            let bounds = Aabb::from_points(&nodes)?.expanded(args.step);
            Box::new(BoxBoundary::new(bounds.min, bounds.max)?)
        }
    };

    let lines = field
        .stress_curves(&seed, boundary.as_ref(), args.step)
        .context("Failed to trace stress curves")?;
    if lines.iter().all(Vec::is_empty) {
        tracing::warn!(seed = ?seed, "Seed is outside the boundary, no stress curves");
    }

    if let Some(path) = &args.obj {
        let segments: Vec<[Point3<f64>; 2]> = lines
            .iter()
            .flat_map(|line| line.windows(2).map(|w| [w[0], w[1]]))
            .collect();
        obj::write_segments(&segments, BufWriter::new(create(path)?))?;
        tracing::info!(path = %path.display(), segments = segments.len(), "Wrote stress curves");
    }

    let to_array = |line: &Vec<Point3<f64>>| -> Vec<[f64; 3]> {
        line.iter().map(|p| [p.x, p.y, p.z]).collect()
    };
    let [major, middle, minor] = &lines;
    Ok(StressCurves {
        seed: [seed.x, seed.y, seed.z],
        step: args.step,
        major: to_array(major),
        middle: to_array(middle),
        minor: to_array(minor),
    })
}

fn create(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("Failed to create {}", path.display()))
}

fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let mut writer = BufWriter::new(create(path)?);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
            tracing::info!(path = %path.display(), "Wrote JSON");
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, value)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
