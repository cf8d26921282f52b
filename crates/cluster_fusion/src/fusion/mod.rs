//! Spatial fusion graph: merges near-coincident points into compound nodes.
//!
//! Many sources insert into one [`CompoundGraph`] concurrently. Two kinds of
//! lock are involved and they are always taken in the same order:
//!
//! ```text
//! spatial hash shards (ascending, 3×3×3 neighbourhood)
//!   └── node registry entry (dashmap shard, one node at a time)
//! ```
//!
//! Edge and adjacency updates only ever touch the registry, one entry at a
//! time, so no cycle exists.
//!
//! # Edge provenance
//!
//! A unique edge remembers every source that inserted it and keeps the
//! lowest [`EdgeTag`] among them. Both are independent of insertion order,
//! so self-intersection filtering does not depend on which source won the
//! race to create the edge.
//!
//! # Tie-break
//!
//! When several nodes are within tolerance of a new point, the one with the
//! lowest index wins. Fusion is not transitive: with `a`, `b`, `c` spaced
//! just under one tolerance apart, `a ~ b` and `b ~ c` but not `a ~ c`, and
//! the final grouping depends on which point arrives first. Parallel
//! insertion order is not fixed, so such chains may fuse differently from
//! run to run.

mod node;
mod spatial;

pub use node::{CompoundNode, Contribution, NodeFlags, NodeMetadata};

use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use glam::DVec3;
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::config::{FuseSettings, FuseTolerance};
use crate::types::{edge_key, EdgeTag, NodeIndex, PointRef, SourceId, UnsignedEdge};
use spatial::{CellEntry, SpatialHash};

pub type SourceSet = SmallVec<[SourceId; 2]>;

/// A unique edge plus the distinct sources that inserted it.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct EdgeEntry {
  pub edge: UnsignedEdge,
  pub sources: SourceSet,
}

impl EdgeEntry {
  fn absorb(&mut self, tag: EdgeTag, union_size: u32, sources: &[SourceId]) {
    self.edge.union_size += union_size;
    if tag < self.edge.tag {
      self.edge.tag = tag;
    }
    for &source in sources {
      if !self.sources.contains(&source) {
        self.sources.push(source);
      }
    }
    self.sources.sort_unstable();
  }
}

/// Concurrent compound node registry plus unique edge set.
pub struct CompoundGraph {
  tolerance: FuseTolerance,
  index: SpatialHash,
  nodes: DashMap<NodeIndex, CompoundNode>,
  next_index: AtomicU32,
  edges: DashMap<u64, EdgeEntry>,
}

impl CompoundGraph {
  pub fn new(settings: &FuseSettings) -> Self {
    Self {
      tolerance: settings.tolerance,
      index: SpatialHash::new(settings.tolerance.cell_size()),
      nodes: DashMap::new(),
      next_index: AtomicU32::new(0),
      edges: DashMap::new(),
    }
  }

  pub fn tolerance(&self) -> FuseTolerance {
    self.tolerance
  }

  /// Number of compound nodes created so far. Indices are dense in
  /// `0..node_count()`.
  pub fn node_count(&self) -> usize {
    self.next_index.load(Ordering::Acquire) as usize
  }

  pub fn edge_count(&self) -> usize {
    self.edges.len()
  }

  /// Fuse `position` into an existing node within tolerance, or create one.
  ///
  /// Lookup and creation happen under the neighbourhood locks, so two
  /// concurrent calls for coincident points always agree on one node.
  pub fn get_or_create_node(&self, position: DVec3, source: SourceId, point: u32) -> NodeIndex {
    let contribution = Contribution {
      point: PointRef::new(source, point),
      position,
    };
    let cell = self.index.cell_of(position);
    let mut hood = self.index.lock_neighborhood(cell);

    if let Some(found) = hood.find_first(position, &self.tolerance) {
      if let Some(mut node) = self.nodes.get_mut(&found.index) {
        if node.add(contribution) {
          let moved = CellEntry {
            index: found.index,
            position: node.position(),
          };
          drop(node);
          hood.relocate(
            found,
            self.index.cell_of(found.position),
            moved,
            self.index.cell_of(moved.position),
          );
        }
      }
      return found.index;
    }

    let index = self.next_index.fetch_add(1, Ordering::AcqRel);
    self.nodes.insert(index, CompoundNode::new(index, contribution));
    hood.insert(cell, CellEntry { index, position });
    index
  }

  /// Resolve both endpoints and connect them.
  ///
  /// Returns false when both points fuse into the same node.
  #[allow(clippy::too_many_arguments)]
  pub fn create_bridge(
    &self,
    a_position: DVec3,
    a_source: SourceId,
    a_point: u32,
    b_position: DVec3,
    b_source: SourceId,
    b_point: u32,
  ) -> bool {
    let a = self.get_or_create_node(a_position, a_source, a_point);
    let b = self.get_or_create_node(b_position, b_source, b_point);
    self.insert_edge(a, b, PointRef::new(a_source, a_point))
  }

  /// Insert a unique edge. Returns true only when a new edge was created;
  /// a duplicate bumps the existing edge's union size and keeps the lower
  /// of the two tags.
  pub fn insert_edge(&self, a: NodeIndex, b: NodeIndex, tag: EdgeTag) -> bool {
    self.merge_edge(a, b, tag, 1, &[tag.source])
  }

  /// Insert (or merge into) a unique edge carrying existing provenance.
  pub(crate) fn merge_edge(
    &self,
    a: NodeIndex,
    b: NodeIndex,
    tag: EdgeTag,
    union_size: u32,
    sources: &[SourceId],
  ) -> bool {
    if a == b {
      return false;
    }
    match self.edges.entry(edge_key(a, b)) {
      Entry::Occupied(mut existing) => {
        existing.get_mut().absorb(tag, union_size, sources);
        return false;
      }
      Entry::Vacant(slot) => {
        let mut edge = UnsignedEdge::new(a.min(b), a.max(b), tag);
        edge.union_size = union_size;
        let mut set: SourceSet = sources.iter().copied().collect();
        set.sort_unstable();
        set.dedup();
        slot.insert(EdgeEntry { edge, sources: set });
      }
    }
    self.link(a, b);
    self.link(b, a);
    true
  }

  /// Retire a unique edge. Returns false if it did not exist.
  pub fn remove_edge(&self, a: NodeIndex, b: NodeIndex) -> bool {
    self.take_edge(a, b).is_some()
  }

  /// Retire a unique edge and hand back its provenance.
  pub(crate) fn take_edge(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeEntry> {
    let (_, entry) = self.edges.remove(&edge_key(a, b))?;
    if let Some(mut node) = self.nodes.get_mut(&a) {
      node.unlink(b);
    }
    if let Some(mut node) = self.nodes.get_mut(&b) {
      node.unlink(a);
    }
    Some(entry)
  }

  fn link(&self, from: NodeIndex, to: NodeIndex) {
    if let Some(mut node) = self.nodes.get_mut(&from) {
      node.link(to);
    }
  }

  pub fn contains_edge(&self, a: NodeIndex, b: NodeIndex) -> bool {
    self.edges.contains_key(&edge_key(a, b))
  }

  pub fn edge(&self, a: NodeIndex, b: NodeIndex) -> Option<UnsignedEdge> {
    self.edges.get(&edge_key(a, b)).map(|e| e.edge)
  }

  /// Distinct sources that inserted the edge, ascending.
  pub fn edge_sources(&self, a: NodeIndex, b: NodeIndex) -> Option<SourceSet> {
    self.edges.get(&edge_key(a, b)).map(|e| e.sources.clone())
  }

  /// Every unique edge, sorted by canonical key.
  pub fn get_unique_edges(&self) -> Vec<UnsignedEdge> {
    let mut edges: Vec<UnsignedEdge> = self.edges.iter().map(|e| e.edge).collect();
    edges.par_sort_unstable_by_key(|e| e.key());
    edges
  }

  /// Unique edges sorted by key, with their source sets in the same order.
  pub(crate) fn unique_edge_entries(&self) -> Vec<EdgeEntry> {
    let mut entries: Vec<EdgeEntry> = self.edges.iter().map(|e| e.value().clone()).collect();
    entries.par_sort_unstable_by_key(|e| e.edge.key());
    entries
  }

  /// Snapshot of one node.
  pub fn node(&self, index: NodeIndex) -> Option<CompoundNode> {
    self.nodes.get(&index).map(|n| n.clone())
  }

  pub fn position(&self, index: NodeIndex) -> Option<DVec3> {
    self.nodes.get(&index).map(|n| n.position())
  }

  /// Positions indexed by node index.
  pub fn positions(&self) -> Vec<DVec3> {
    (0..self.node_count() as NodeIndex)
      .into_par_iter()
      .map(|i| self.position(i).unwrap_or(DVec3::NAN))
      .collect()
  }

  /// Distinct contributing sources of each node, indexed by node index.
  pub fn node_sources(&self) -> Vec<SourceSet> {
    (0..self.node_count() as NodeIndex)
      .into_par_iter()
      .map(|i| {
        let mut sources: SourceSet = SmallVec::new();
        if let Some(node) = self.nodes.get(&i) {
          for c in node.contributions() {
            if !sources.contains(&c.point.source) {
              sources.push(c.point.source);
            }
          }
        }
        sources
      })
      .collect()
  }

  pub(crate) fn mark(&self, index: NodeIndex, update: impl FnOnce(&mut NodeFlags)) {
    if let Some(mut node) = self.nodes.get_mut(&index) {
      update(node.flags_mut());
    }
  }

  /// Recompute every centroid from its contributions and re-index.
  ///
  /// Must not overlap with `get_or_create_node`.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "fusion::update_centers"))]
  pub fn update_centers(&self) {
    let entries: Vec<CellEntry> = (0..self.node_count() as NodeIndex)
      .into_par_iter()
      .filter_map(|index| {
        let mut node = self.nodes.get_mut(&index)?;
        Some(CellEntry {
          index,
          position: node.update_center(),
        })
      })
      .collect();
    self.index.rebuild(entries);
  }

  /// Provenance of every node, indexed by node index.
  pub fn write_metadata(&self) -> Vec<NodeMetadata> {
    (0..self.node_count() as NodeIndex)
      .into_par_iter()
      .filter_map(|i| self.nodes.get(&i).map(|n| n.metadata()))
      .collect()
  }
}
