//! Compiled cluster: immutable dense graph with flat adjacency.
//!
//! # Layout
//!
//! ```text
//! nodes: [Node { adjacency_start, adjacency_len, .. }, ...]
//!                      │
//!                      ▼
//! links: [NodeLink { node, edge }, ...]   (grouped by owning node)
//! edges: [IndexedEdge { start, end, .. }, ...]
//! ```
//!
//! Everything is built once by the compiler. The only mutation afterwards
//! is the lazy fill of [`Cluster::expanded_nodes`] and
//! [`Cluster::compute_edge_lengths`], each guarded by a `OnceLock`.

use std::collections::{HashMap, VecDeque};
use std::sync::OnceLock;

use glam::DVec3;
use serde::Serialize;

use crate::attributes::AttributeTable;
use crate::types::{Aabb3, EdgeTag};

/// One compiled node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Node {
  /// Dense slot in this cluster.
  pub index: u32,
  /// Compound node index it was compiled from.
  pub point_index: u32,
  pub position: DVec3,
  pub adjacency_start: u32,
  pub adjacency_len: u32,
  /// False for nodes left without any edge.
  pub valid: bool,
}

impl Node {
  #[inline]
  pub fn degree(&self) -> usize {
    self.adjacency_len as usize
  }

  #[inline]
  pub fn is_leaf(&self) -> bool {
    self.adjacency_len == 1
  }
}

/// One compiled edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct IndexedEdge {
  pub index: u32,
  pub start: u32,
  pub end: u32,
  pub valid: bool,
  pub tag: EdgeTag,
  pub union_size: u32,
}

impl IndexedEdge {
  #[inline]
  pub fn other(&self, node: u32) -> u32 {
    if self.start == node {
      self.end
    } else {
      self.start
    }
  }
}

/// Adjacency entry: neighbour node and the edge reaching it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct NodeLink {
  pub node: u32,
  pub edge: u32,
}

/// Neighbour with its node and edge copied out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExpandedNeighbor {
  pub node: Node,
  pub edge: IndexedEdge,
}

/// A node with every neighbour resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpandedNode {
  pub node: Node,
  pub neighbors: Vec<ExpandedNeighbor>,
}

/// How far the lazy views of a cluster have been built. Only moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClusterState {
  NodesIndexed,
  ExpandedNodesBuilt,
  EdgeLengthsComputed,
}

/// Immutable compiled graph.
#[derive(Debug)]
pub struct Cluster {
  nodes: Vec<Node>,
  edges: Vec<IndexedEdge>,
  links: Vec<NodeLink>,
  lookup: HashMap<u32, u32>,
  bounds: Aabb3,
  node_attributes: AttributeTable,
  edge_attributes: AttributeTable,
  expanded: OnceLock<Vec<ExpandedNode>>,
  edge_lengths: OnceLock<Vec<f64>>,
}

/// Counting sort of valid edges into per-node link ranges.
///
/// Returns `(start, len)` per node and the flat link buffer.
pub(crate) fn index_adjacency(
  node_count: usize,
  edges: &[IndexedEdge],
) -> (Vec<(u32, u32)>, Vec<NodeLink>) {
  let mut degree = vec![0u32; node_count];
  for edge in edges.iter().filter(|e| e.valid) {
    degree[edge.start as usize] += 1;
    degree[edge.end as usize] += 1;
  }

  let mut ranges = Vec::with_capacity(node_count);
  let mut offset = 0u32;
  for &d in &degree {
    ranges.push((offset, d));
    offset += d;
  }

  let mut cursor: Vec<u32> = ranges.iter().map(|&(start, _)| start).collect();
  let mut links = vec![NodeLink { node: 0, edge: 0 }; offset as usize];
  for edge in edges.iter().filter(|e| e.valid) {
    for (from, to) in [(edge.start, edge.end), (edge.end, edge.start)] {
      let slot = &mut cursor[from as usize];
      links[*slot as usize] = NodeLink {
        node: to,
        edge: edge.index,
      };
      *slot += 1;
    }
  }
  (ranges, links)
}

impl Cluster {
  /// Assemble a cluster. Node adjacency ranges must already index `links`.
  pub(crate) fn from_parts(
    nodes: Vec<Node>,
    edges: Vec<IndexedEdge>,
    links: Vec<NodeLink>,
    node_attributes: AttributeTable,
    edge_attributes: AttributeTable,
  ) -> Self {
    let mut bounds = Aabb3::empty();
    let mut lookup = HashMap::with_capacity(nodes.len());
    for node in nodes.iter().filter(|n| n.valid) {
      bounds.encapsulate(node.position);
      lookup.insert(node.point_index, node.index);
    }
    Self {
      nodes,
      edges,
      links,
      lookup,
      bounds,
      node_attributes,
      edge_attributes,
      expanded: OnceLock::new(),
      edge_lengths: OnceLock::new(),
    }
  }

  pub fn node(&self, index: u32) -> Option<&Node> {
    self.nodes.get(index as usize)
  }

  /// Dense slot of the node compiled from compound node `point_index`.
  pub fn node_index(&self, point_index: u32) -> Option<u32> {
    self.lookup.get(&point_index).copied()
  }

  pub fn edge(&self, index: u32) -> Option<&IndexedEdge> {
    self.edges.get(index as usize)
  }

  /// Links of a node. Empty for unknown or isolated nodes.
  pub fn neighbors(&self, index: u32) -> &[NodeLink] {
    match self.node(index) {
      Some(node) => {
        let start = node.adjacency_start as usize;
        &self.links[start..start + node.adjacency_len as usize]
      }
      None => &[],
    }
  }

  pub fn nodes(&self) -> &[Node] {
    &self.nodes
  }

  pub fn edges(&self) -> &[IndexedEdge] {
    &self.edges
  }

  pub fn links(&self) -> &[NodeLink] {
    &self.links
  }

  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }

  pub fn edge_count(&self) -> usize {
    self.edges.len()
  }

  pub fn valid_node_count(&self) -> usize {
    self.nodes.iter().filter(|n| n.valid).count()
  }

  pub fn valid_edge_count(&self) -> usize {
    self.edges.iter().filter(|e| e.valid).count()
  }

  /// Bounds of every valid node.
  pub fn bounds(&self) -> Aabb3 {
    self.bounds
  }

  pub fn node_attributes(&self) -> &AttributeTable {
    &self.node_attributes
  }

  pub fn edge_attributes(&self) -> &AttributeTable {
    &self.edge_attributes
  }

  /// Nodes with neighbour copies, built on first call.
  pub fn expanded_nodes(&self) -> &[ExpandedNode] {
    self.expanded.get_or_init(|| {
      self
        .nodes
        .iter()
        .map(|node| ExpandedNode {
          node: *node,
          neighbors: self
            .neighbors(node.index)
            .iter()
            .map(|link| ExpandedNeighbor {
              node: self.nodes[link.node as usize],
              edge: self.edges[link.edge as usize],
            })
            .collect(),
        })
        .collect()
    })
  }

  /// Euclidean length of every edge, computed once. Invalid edges get 0.
  pub fn compute_edge_lengths(&self) -> &[f64] {
    self.edge_lengths.get_or_init(|| {
      self
        .edges
        .iter()
        .map(|edge| {
          if !edge.valid {
            return 0.0;
          }
          let a = self.nodes[edge.start as usize].position;
          let b = self.nodes[edge.end as usize].position;
          a.distance(b)
        })
        .collect()
    })
  }

  pub fn edge_length(&self, index: u32) -> Option<f64> {
    self.compute_edge_lengths().get(index as usize).copied()
  }

  pub fn state(&self) -> ClusterState {
    if self.edge_lengths.get().is_some() {
      ClusterState::EdgeLengthsComputed
    } else if self.expanded.get().is_some() {
      ClusterState::ExpandedNodesBuilt
    } else {
      ClusterState::NodesIndexed
    }
  }

  /// Closest valid node to `position`.
  pub fn find_closest_node(&self, position: DVec3) -> Option<u32> {
    self
      .nodes
      .iter()
      .filter(|n| n.valid)
      .min_by(|a, b| {
        a.position
          .distance_squared(position)
          .total_cmp(&b.position.distance_squared(position))
      })
      .map(|n| n.index)
  }

  /// Connected components over valid nodes, each sorted ascending and the
  /// list ordered by first node.
  pub fn connected_components(&self) -> Vec<Vec<u32>> {
    let mut visited = vec![false; self.nodes.len()];
    let mut components = Vec::new();
    let mut queue = VecDeque::new();

    for seed in self.nodes.iter().filter(|n| n.valid) {
      if visited[seed.index as usize] {
        continue;
      }
      visited[seed.index as usize] = true;
      queue.push_back(seed.index);
      let mut component = Vec::new();
      while let Some(current) = queue.pop_front() {
        component.push(current);
        for link in self.neighbors(current) {
          if !visited[link.node as usize] {
            visited[link.node as usize] = true;
            queue.push_back(link.node);
          }
        }
      }
      component.sort_unstable();
      components.push(component);
    }
    components
  }

  /// Standalone cluster made of `nodes` (one component) and the valid
  /// edges between them. Attributes follow their rows.
  pub(crate) fn extract(&self, nodes: &[u32]) -> Cluster {
    let mut remap = vec![u32::MAX; self.nodes.len()];
    for (slot, &index) in nodes.iter().enumerate() {
      remap[index as usize] = slot as u32;
    }

    let mut edge_rows = Vec::new();
    let mut edges = Vec::new();
    for edge in self.edges.iter().filter(|e| e.valid) {
      let (start, end) = (remap[edge.start as usize], remap[edge.end as usize]);
      if start == u32::MAX || end == u32::MAX {
        continue;
      }
      edge_rows.push(edge.index as usize);
      edges.push(IndexedEdge {
        index: edges.len() as u32,
        start,
        end,
        ..*edge
      });
    }

    let (ranges, links) = index_adjacency(nodes.len(), &edges);
    let compiled: Vec<Node> = nodes
      .iter()
      .zip(ranges)
      .enumerate()
      .map(|(slot, (&index, (start, len)))| Node {
        index: slot as u32,
        adjacency_start: start,
        adjacency_len: len,
        ..self.nodes[index as usize]
      })
      .collect();

    let node_rows: Vec<usize> = nodes.iter().map(|&i| i as usize).collect();
    Cluster::from_parts(
      compiled,
      edges,
      links,
      self.node_attributes.gather(&node_rows),
      self.edge_attributes.gather(&edge_rows),
    )
  }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
