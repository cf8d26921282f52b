//! Cluster fusion front end.
//!
//! Reads point sources from JSON, fuses them into compound nodes, optionally
//! splits edges at point-edge and edge-edge intersections, and writes the
//! compiled clusters plus compile stats as a JSON report.
//!
//! Logging goes to stderr and honours `RUST_LOG`.

mod config;
mod io;

use anyhow::{Context, Result};
use clap::Parser;
use cluster_fusion::{CompilerState, GraphCompiler};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use io::Report;

/// Fuse point/edge sources into clusters.
#[derive(Parser, Debug)]
#[command(name = "fuse_clusters")]
#[command(about = "Fuses point sources into compiled graph clusters")]
struct Args {
	/// Path to configuration TOML file (defaults when omitted).
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Input JSON file with the point sources.
	#[arg(short, long)]
	input: PathBuf,

	/// Output JSON report (stdout when omitted).
	#[arg(short, long)]
	output: Option<PathBuf>,

	/// Default log level when RUST_LOG is unset.
	#[arg(long, default_value = "info")]
	log_level: String,
}

fn main() -> Result<()> {
	let args = Args::parse();

	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();

	let config = match &args.config {
		Some(path) => {
			info!("Loading config from: {}", path.display());
			Config::load(path)?
		}
		None => Config::default(),
	};

	let sources = io::load_sources(&args.input)?;
	info!("Loaded {} sources from {}", sources.len(), args.input.display());

	let mut compiler =
		GraphCompiler::new(config.compiler, sources).context("Invalid compiler settings")?;

	if let CompilerState::Cancelled(reason) = compiler.run() {
		anyhow::bail!("Compilation cancelled: {}", reason);
	}

	let Some(output) = compiler.take_output() else {
		anyhow::bail!("Compilation produced no cluster");
	};

	let report = Report::new(&output, config.report.include_metadata);
	io::write_report(&report, args.output.as_deref(), config.report.pretty)?;

	if let Some(path) = &args.output {
		info!(
			"Wrote {} clusters to {} in {}us",
			output.clusters.len(),
			path.display(),
			output.stats.total_us
		);
	}

	Ok(())
}
