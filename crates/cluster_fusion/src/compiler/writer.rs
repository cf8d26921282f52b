//! Compaction of the compound graph into clusters.
//!
//! ```text
//! compound nodes ──► Node[slot = compound index]      (isolated → invalid)
//! unique edges   ──► IndexedEdge[sorted by key]       (bad endpoints → invalid)
//!                          │ degree count → prefix sum → scatter
//!                          ▼
//!                     NodeLink buffer
//! ```

use glam::DVec3;
use rayon::prelude::*;
use tracing::warn;

use crate::attributes::{AttributeColumn, AttributeTable};
use crate::cluster::{index_adjacency, Cluster, IndexedEdge, Node};
use crate::config::{AttributeOutput, ClusterOutputSettings, CompilerSettings, MetadataSettings};
use crate::fusion::{CompoundGraph, NodeMetadata};
use crate::types::NodeIndex;

pub(crate) struct Written {
  /// Empty when nothing survived compaction and filtering.
  pub clusters: Vec<Cluster>,
  pub metadata: Vec<NodeMetadata>,
  pub nodes: usize,
  pub edges: usize,
  /// An attribute column was rejected; `clusters` is empty.
  pub attributes_failed: bool,
}

pub(crate) fn write_clusters(graph: &CompoundGraph, settings: &CompilerSettings) -> Written {
  let node_count = graph.node_count();
  let positions = graph.positions();
  let metadata = graph.write_metadata();
  let unique = graph.get_unique_edges();

  let edges: Vec<IndexedEdge> = unique
    .par_iter()
    .enumerate()
    .map(|(i, edge)| IndexedEdge {
      index: i as u32,
      start: edge.start,
      end: edge.end,
      valid: edge.start != edge.end
        && (edge.start as usize) < node_count
        && (edge.end as usize) < node_count,
      tag: edge.tag,
      union_size: edge.union_size,
    })
    .collect();

  let (ranges, links) = index_adjacency(node_count, &edges);

  let nodes: Vec<Node> = (0..node_count as NodeIndex)
    .into_par_iter()
    .map(|i| {
      let (start, len) = ranges[i as usize];
      Node {
        index: i,
        point_index: i,
        position: positions[i as usize],
        adjacency_start: start,
        adjacency_len: len,
        valid: len > 0,
      }
    })
    .collect();

  let (Some(node_attributes), Some(edge_attributes)) = (
    node_table(&settings.metadata, &metadata),
    edge_table(&settings.metadata, &edges, &positions),
  ) else {
    return Written {
      clusters: Vec::new(),
      metadata,
      nodes: node_count,
      edges: unique.len(),
      attributes_failed: true,
    };
  };
  let cluster = Cluster::from_parts(nodes, edges, links, node_attributes, edge_attributes);

  let clusters = if cluster.valid_edge_count() == 0 {
    Vec::new()
  } else if settings.output.per_component {
    split_components(&cluster, &settings.output)
  } else if settings
    .output
    .accepts(cluster.valid_node_count(), cluster.valid_edge_count())
  {
    vec![cluster]
  } else {
    Vec::new()
  };

  Written {
    clusters,
    metadata,
    nodes: node_count,
    edges: unique.len(),
    attributes_failed: false,
  }
}

fn split_components(cluster: &Cluster, output: &ClusterOutputSettings) -> Vec<Cluster> {
  cluster
    .connected_components()
    .par_iter()
    .filter(|component| {
      let degree_sum: usize = component
        .iter()
        .filter_map(|&i| cluster.node(i))
        .map(|n| n.degree())
        .sum();
      output.accepts(component.len(), degree_sum / 2)
    })
    .map(|component| cluster.extract(component))
    .collect()
}

/// Add a column, logging the rejection.
fn put(table: &mut AttributeTable, output: &AttributeOutput, column: AttributeColumn) -> bool {
  let rows = column.len();
  if table.insert(output.name.as_str(), column) {
    return true;
  }
  warn!(
    "Attribute {:?} could not be written ({} rows, table has {}, or name already taken)",
    output.name,
    rows,
    table.rows()
  );
  false
}

fn node_table(settings: &MetadataSettings, metadata: &[NodeMetadata]) -> Option<AttributeTable> {
  let mut table = AttributeTable::new(metadata.len());
  let mut ok = true;
  if settings.node_union_size.enabled {
    ok &= put(
      &mut table,
      &settings.node_union_size,
      AttributeColumn::Double(metadata.iter().map(|m| m.union_size as f64).collect()),
    );
  }
  let flags: [(&AttributeOutput, fn(&NodeMetadata) -> bool); 3] = [
    (&settings.node_is_union, |m| m.is_union),
    (&settings.node_is_intersector, |m| m.is_point_edge_split),
    (&settings.node_is_crossing, |m| m.is_edge_edge_crossing),
  ];
  for (output, flag) in flags {
    if output.enabled {
      ok &= put(
        &mut table,
        output,
        AttributeColumn::Bool(metadata.iter().map(flag).collect()),
      );
    }
  }
  ok.then_some(table)
}

fn edge_table(
  settings: &MetadataSettings,
  edges: &[IndexedEdge],
  positions: &[DVec3],
) -> Option<AttributeTable> {
  let mut table = AttributeTable::new(edges.len());
  let mut ok = true;
  if settings.edge_union_size.enabled {
    ok &= put(
      &mut table,
      &settings.edge_union_size,
      AttributeColumn::Double(edges.iter().map(|e| e.union_size as f64).collect()),
    );
  }
  if settings.edge_is_union.enabled {
    ok &= put(
      &mut table,
      &settings.edge_is_union,
      AttributeColumn::Bool(edges.iter().map(|e| e.union_size > 1).collect()),
    );
  }
  if settings.edge_length.enabled {
    ok &= put(
      &mut table,
      &settings.edge_length,
      AttributeColumn::Double(
        edges
          .par_iter()
          .map(|e| {
            if e.valid {
              positions[e.start as usize].distance(positions[e.end as usize])
            } else {
              0.0
            }
          })
          .collect(),
      ),
    );
  }
  ok.then_some(table)
}
