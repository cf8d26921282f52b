//! JSON input and report output.
//!
//! Input is either a bare array of sources or `{ "sources": [...] }`:
//!
//! ```json
//! { "sources": [
//!     { "id": 0, "positions": [[0,0,0],[1,0,0]], "topology": { "path": { "closed": false } } },
//!     { "id": 1, "positions": [[0,0,0],[0,1,0]], "topology": { "edges": [[0,1]] } }
//! ] }
//! ```

use anyhow::{Context, Result};
use cluster_fusion::{
	AttributeTable, Cluster, CompileOutput, CompileStats, IndexedEdge, Node, NodeLink,
	NodeMetadata, PointSource,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SourceFile {
	Wrapped { sources: Vec<PointSource> },
	Bare(Vec<PointSource>),
}

/// Read point sources from a JSON file.
pub fn load_sources(path: &Path) -> Result<Vec<PointSource>> {
	let content = std::fs::read_to_string(path)
		.with_context(|| format!("Failed to read input file: {}", path.display()))?;
	parse_sources(&content).with_context(|| format!("Failed to parse input: {}", path.display()))
}

pub fn parse_sources(content: &str) -> Result<Vec<PointSource>> {
	let file: SourceFile = serde_json::from_str(content)?;
	Ok(match file {
		SourceFile::Wrapped { sources } => sources,
		SourceFile::Bare(sources) => sources,
	})
}

/// Serialized view of one cluster.
#[derive(Serialize)]
struct ClusterReport<'a> {
	nodes: &'a [Node],
	edges: &'a [IndexedEdge],
	links: &'a [NodeLink],
	#[serde(skip_serializing_if = "no_columns")]
	node_attributes: &'a AttributeTable,
	#[serde(skip_serializing_if = "no_columns")]
	edge_attributes: &'a AttributeTable,
}

fn no_columns(table: &&AttributeTable) -> bool {
	table.is_empty()
}

impl<'a> From<&'a Cluster> for ClusterReport<'a> {
	fn from(cluster: &'a Cluster) -> Self {
		Self {
			nodes: cluster.nodes(),
			edges: cluster.edges(),
			links: cluster.links(),
			node_attributes: cluster.node_attributes(),
			edge_attributes: cluster.edge_attributes(),
		}
	}
}

/// Top-level report written after a compilation.
#[derive(Serialize)]
pub struct Report<'a> {
	stats: &'a CompileStats,
	clusters: Vec<ClusterReport<'a>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	metadata: Option<&'a [NodeMetadata]>,
}

impl<'a> Report<'a> {
	pub fn new(output: &'a CompileOutput, include_metadata: bool) -> Self {
		Self {
			stats: &output.stats,
			clusters: output.clusters.iter().map(ClusterReport::from).collect(),
			metadata: include_metadata.then_some(output.metadata.as_slice()),
		}
	}
}

/// Write the report to `path`, or stdout when `None`.
pub fn write_report(report: &Report<'_>, path: Option<&Path>, pretty: bool) -> Result<()> {
	let json = if pretty {
		serde_json::to_string_pretty(report)
	} else {
		serde_json::to_string(report)
	}
	.context("Failed to serialize report")?;

	match path {
		Some(path) => std::fs::write(path, json)
			.with_context(|| format!("Failed to write: {}", path.display())),
		None => {
			let mut stdout = std::io::stdout().lock();
			writeln!(stdout, "{}", json).context("Failed to write report to stdout")
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use cluster_fusion::{CompilerSettings, GraphCompiler, SourceTopology};

	const INPUT: &str = r#"{ "sources": [
		{ "id": 0, "positions": [[0,0,0],[1,0,0],[1,1,0]], "topology": { "path": { "closed": true } } },
		{ "id": 1, "positions": [[1,0,0],[2,0,0]], "topology": { "edges": [[0,1]] } }
	] }"#;

	#[test]
	fn parses_wrapped_and_bare_inputs() {
		let sources = parse_sources(INPUT).unwrap();
		assert_eq!(sources.len(), 2);
		assert_eq!(sources[0].topology, SourceTopology::Path { closed: true });
		assert_eq!(sources[1].topology, SourceTopology::Edges(vec![[0, 1]]));

		let bare = parse_sources(r#"[{ "id": 3, "positions": [], "topology": { "edges": [] } }]"#)
			.unwrap();
		assert_eq!(bare.len(), 1);
		assert!(bare[0].is_empty());
	}

	#[test]
	fn rejects_malformed_input() {
		assert!(parse_sources(r#"{ "sources": 4 }"#).is_err());
	}

	#[test]
	fn report_serializes_clusters_and_stats() {
		let mut compiler =
			GraphCompiler::new(CompilerSettings::default(), parse_sources(INPUT).unwrap()).unwrap();
		compiler.run();
		let output = compiler.take_output().unwrap();

		let json = serde_json::to_value(Report::new(&output, true)).unwrap();
		assert_eq!(json["stats"]["sources"], 2);
		assert_eq!(json["clusters"].as_array().unwrap().len(), 1);
		assert_eq!(json["clusters"][0]["edges"].as_array().unwrap().len(), 4);
		assert!(json["clusters"][0].get("node_attributes").is_none());
		assert_eq!(json["metadata"].as_array().unwrap().len(), 4);

		let json = serde_json::to_value(Report::new(&output, false)).unwrap();
		assert!(json.get("metadata").is_none());
	}
}
