//! Intersection resolvers: split edges at nodes lying on them and at
//! crossings between edges.
//!
//! Each resolver runs in two steps with a barrier in between:
//!
//! 1. `find_intersections` captures a read-only [`GraphSnapshot`] and
//!    schedules scanner tasks over chunks of its edges.
//! 2. Once `is_complete` reports true, `insert` materializes every accepted
//!    record into the live [`CompoundGraph`] on the calling thread.

mod edge_edge;
mod point_edge;

pub use edge_edge::{EdgeEdgeCrossing, EdgeEdgeIntersections};
pub use point_edge::{PointEdgeHit, PointEdgeIntersections};

use std::ops::Range;
use std::sync::Arc;

use glam::DVec3;
use smallvec::SmallVec;

use crate::constants::SCANNER_CHUNK_SIZE;
use crate::fusion::{CompoundGraph, SourceSet};
use crate::threading::TaskExecutor;
use crate::types::{NodeIndex, SourceId, UnsignedEdge};

/// Two-step intersection pass over a compound graph.
pub trait IntersectionResolver {
  /// Schedule scanner tasks. Never blocks on them.
  fn find_intersections(&mut self, graph: &CompoundGraph, executor: &TaskExecutor);

  /// True once every scanner task has reported.
  fn is_complete(&mut self, executor: &TaskExecutor) -> bool;

  /// Apply accepted records to `graph`. Returns the number of edges split.
  fn insert(&mut self, graph: &CompoundGraph) -> usize;
}

/// Frozen view of the graph shared by all scanner tasks of one pass.
pub struct GraphSnapshot {
  pub positions: Vec<DVec3>,
  /// Unique edges sorted by key; scanner records index into this.
  pub edges: Vec<UnsignedEdge>,
  /// Sources that inserted each edge, parallel to `edges`.
  pub edge_sources: Vec<SourceSet>,
  /// Sources contributing to each node, indexed by node index.
  pub sources: Vec<SourceSet>,
}

impl GraphSnapshot {
  pub fn capture(graph: &CompoundGraph) -> Self {
    let (edges, edge_sources) = graph
      .unique_edge_entries()
      .into_iter()
      .map(|entry| (entry.edge, entry.sources))
      .unzip();
    Self {
      positions: graph.positions(),
      edges,
      edge_sources,
      sources: graph.node_sources(),
    }
  }

  #[inline]
  pub fn segment(&self, edge: usize) -> (DVec3, DVec3) {
    let e = &self.edges[edge];
    (
      self.positions[e.start as usize],
      self.positions[e.end as usize],
    )
  }

  /// True if `node` has a contribution from `source`.
  #[inline]
  pub fn node_has_source(&self, node: NodeIndex, source: SourceId) -> bool {
    self.sources[node as usize].contains(&source)
  }

  /// True if `node` and `edge` have any source in common.
  pub fn node_shares_source(&self, node: NodeIndex, edge: usize) -> bool {
    self.edge_sources[edge]
      .iter()
      .any(|&source| self.node_has_source(node, source))
  }

  /// True if two edges were inserted by any common source.
  pub fn edges_share_source(&self, first: usize, second: usize) -> bool {
    let other = &self.edge_sources[second];
    self.edge_sources[first].iter().any(|s| other.contains(s))
  }

  /// Edge ranges handed to individual scanner tasks.
  pub fn chunks(&self) -> impl Iterator<Item = Range<usize>> {
    let len = self.edges.len();
    (0..len)
      .step_by(SCANNER_CHUNK_SIZE)
      .map(move |start| start..(start + SCANNER_CHUNK_SIZE).min(len))
  }
}

pub(crate) fn shared(snapshot: GraphSnapshot) -> Arc<GraphSnapshot> {
  Arc::new(snapshot)
}

/// Replace `edge` with the polyline through `cuts` (already sorted by
/// parameter along `start → end`).
///
/// Cuts equal to an endpoint or to the previous cut are skipped. Sub-edges
/// inherit the parent's tag, union size and sources. Returns true if the
/// edge was actually split.
pub(crate) fn split_edge(graph: &CompoundGraph, edge: &UnsignedEdge, cuts: &[NodeIndex]) -> bool {
  let mut chain: SmallVec<[NodeIndex; 8]> = SmallVec::new();
  chain.push(edge.start);
  for &node in cuts {
    if node == edge.start || node == edge.end || chain.contains(&node) {
      continue;
    }
    chain.push(node);
  }
  if chain.len() == 1 {
    return false;
  }
  chain.push(edge.end);

  let Some(parent) = graph.take_edge(edge.start, edge.end) else {
    return false;
  };
  for pair in chain.windows(2) {
    graph.merge_edge(
      pair[0],
      pair[1],
      parent.edge.tag,
      parent.edge.union_size,
      &parent.sources,
    );
  }
  true
}
