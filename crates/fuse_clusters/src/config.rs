//! Configuration parsing for cluster compilation.

use anyhow::{Context, Result};
use cluster_fusion::CompilerSettings;
use serde::Deserialize;
use std::path::Path;

/// Root configuration: compiler settings at the top level plus a `[report]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Fusion, intersection, output and metadata settings.
	#[serde(flatten)]
	pub compiler: CompilerSettings,
	/// How the JSON report is written.
	pub report: ReportConfig,
}

/// Options for the written report.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
	/// Indent the JSON output.
	pub pretty: bool,
	/// Include per-node provenance next to the clusters.
	pub include_metadata: bool,
}

impl Default for ReportConfig {
	fn default() -> Self {
		Self {
			pretty: true,
			include_metadata: false,
		}
	}
}

impl Config {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		Self::parse(&content)
	}

	/// Parse and validate configuration TOML.
	pub fn parse(content: &str) -> Result<Self> {
		let config: Config =
			toml::from_str(content).with_context(|| "Failed to parse config TOML")?;

		if let Err(err) = config.compiler.validate() {
			anyhow::bail!("Invalid compiler settings: {}", err);
		}

		Ok(config)
	}
}
