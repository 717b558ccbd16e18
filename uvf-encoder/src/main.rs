/// UVF encoder command-line entry point
///
/// Logging follows `RUST_LOG` when set, otherwise `-v`/`-vv` raise the level.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use uvf_encoder::{
    EncodeOptions, EncodeReport, Manifest, SkippedMesh, SourceMesh, UvfEncoder, discover_mesh_files,
    inspect, load_mesh,
};

#[derive(Parser)]
#[command(name = "uvf")]
#[command(author, version, about = "Encode meshes into UVF datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file with encoder options
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print the manifest
    #[arg(long, global = true)]
    pretty: bool,

    /// Suppress all non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase output verbosity (-v for info, -vv for debug)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode one mesh file (.json or .stl) into a single-mesh dataset
    Encode {
        input: PathBuf,
        out_dir: PathBuf,

        /// Merge identical STL vertices within each solid
        #[arg(long)]
        dedup: bool,
    },

    /// Encode every mesh file in a directory into a grouped dataset
    Batch {
        input_dir: PathBuf,
        out_dir: PathBuf,

        /// Merge identical STL vertices within each solid
        #[arg(long)]
        dedup: bool,
    },

    /// Summarize a written manifest
    Inspect {
        manifest: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match (quiet, verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "uvf_encoder=info,uvf=info",
            (false, 2) => "uvf_encoder=debug,uvf=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn load_options(cli: &Cli) -> Result<EncodeOptions> {
    let mut options = match &cli.config {
        Some(path) => EncodeOptions::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EncodeOptions::default(),
    };
    options.pretty |= cli.pretty;
    options.progress = !cli.quiet;
    Ok(options)
}

fn print_report(report: &EncodeReport, quiet: bool) {
    if quiet {
        return;
    }
    println!("Manifest: {}", report.manifest_path.display());
    if let Some(kind) = report.kind {
        println!("Geometry kind: {kind}");
    }
    println!(
        "Encoded {} file(s), {} group(s), {} points, {} triangles",
        report.file_count, report.group_count, report.point_count, report.triangle_count
    );
    for skipped in &report.skipped {
        println!("Skipped {}: {}", skipped.label, skipped.reason);
    }
}

fn run_encode(cli: &Cli, input: &Path, out_dir: &Path, dedup: bool) -> Result<()> {
    let options = load_options(cli)?;
    let source =
        load_mesh(input, dedup).with_context(|| format!("failed to load {}", input.display()))?;

    let report = UvfEncoder::with_options(out_dir, options)
        .encode_single(&source)
        .with_context(|| format!("failed to encode {}", input.display()))?;
    print_report(&report, cli.quiet);
    Ok(())
}

fn run_batch(cli: &Cli, input_dir: &Path, out_dir: &Path, dedup: bool) -> Result<()> {
    let options = load_options(cli)?;
    let files = discover_mesh_files(input_dir)
        .with_context(|| format!("failed to list {}", input_dir.display()))?;

    let mut labeled: Vec<(String, SourceMesh)> = Vec::with_capacity(files.len());
    let mut unreadable = Vec::new();
    for (label, path) in files {
        match load_mesh(&path, dedup) {
            Ok(source) => labeled.push((label, source)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable mesh");
                unreadable.push(SkippedMesh {
                    label,
                    reason: e.to_string(),
                });
            }
        }
    }

    let mut report = UvfEncoder::with_options(out_dir, options)
        .encode_batch(labeled)
        .with_context(|| format!("failed to encode {}", input_dir.display()))?;
    report.skipped.extend(unreadable);
    print_report(&report, cli.quiet);
    Ok(())
}

fn run_inspect(manifest_path: &Path, json: bool) -> Result<()> {
    let text = fs::read_to_string(manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    let manifest = Manifest::from_json(&text)
        .with_context(|| format!("failed to parse {}", manifest_path.display()))?;

    let summary = inspect(&manifest);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{summary}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match &cli.command {
        Commands::Encode {
            input,
            out_dir,
            dedup,
        } => run_encode(&cli, input, out_dir, *dedup),
        Commands::Batch {
            input_dir,
            out_dir,
            dedup,
        } => run_batch(&cli, input_dir, out_dir, *dedup),
        Commands::Inspect { manifest, json } => run_inspect(manifest, *json),
    }
}
