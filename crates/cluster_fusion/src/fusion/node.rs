//! CompoundNode - one fused vertex.

use glam::DVec3;
use serde::Serialize;
use smallvec::SmallVec;

use crate::types::{NodeIndex, PointRef};

/// One input point fused into a compound node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Contribution {
  pub point: PointRef,
  pub position: DVec3,
}

/// Flags set while resolving intersections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NodeFlags {
  /// Split at least one edge it was lying on.
  pub point_edge_split: bool,
  /// Created (or reused) at an edge-edge crossing.
  pub edge_edge_crossing: bool,
}

/// A fused vertex: every near-coincident input point collapses into one.
///
/// `position` is always the mean of the contribution positions.
#[derive(Clone, Debug)]
pub struct CompoundNode {
  pub index: NodeIndex,
  position: DVec3,
  sum: DVec3,
  contributions: SmallVec<[Contribution; 2]>,
  adjacency: SmallVec<[NodeIndex; 4]>,
  flags: NodeFlags,
}

impl CompoundNode {
  pub fn new(index: NodeIndex, first: Contribution) -> Self {
    let mut contributions = SmallVec::new();
    contributions.push(first);
    Self {
      index,
      position: first.position,
      sum: first.position,
      contributions,
      adjacency: SmallVec::new(),
      flags: NodeFlags::default(),
    }
  }

  #[inline]
  pub fn position(&self) -> DVec3 {
    self.position
  }

  pub fn contributions(&self) -> &[Contribution] {
    &self.contributions
  }

  pub fn adjacency(&self) -> &[NodeIndex] {
    &self.adjacency
  }

  pub fn flags(&self) -> NodeFlags {
    self.flags
  }

  pub(crate) fn flags_mut(&mut self) -> &mut NodeFlags {
    &mut self.flags
  }

  /// Number of distinct points fused into this node.
  pub fn union_size(&self) -> usize {
    self.contributions.len()
  }

  pub fn has_point(&self, point: PointRef) -> bool {
    self.contributions.iter().any(|c| c.point == point)
  }

  /// Add a contribution and move the centroid. Re-adding a known point is a
  /// no-op and returns false.
  pub fn add(&mut self, contribution: Contribution) -> bool {
    if self.has_point(contribution.point) {
      return false;
    }
    self.contributions.push(contribution);
    self.sum += contribution.position;
    self.position = self.sum / self.contributions.len() as f64;
    true
  }

  /// Recompute the centroid from scratch (drops accumulated rounding).
  pub fn update_center(&mut self) -> DVec3 {
    self.sum = self
      .contributions
      .iter()
      .fold(DVec3::ZERO, |acc, c| acc + c.position);
    self.position = self.sum / self.contributions.len() as f64;
    self.position
  }

  /// Returns false if already linked or `other` is this node.
  pub fn link(&mut self, other: NodeIndex) -> bool {
    if other == self.index || self.adjacency.contains(&other) {
      return false;
    }
    self.adjacency.push(other);
    true
  }

  pub fn unlink(&mut self, other: NodeIndex) -> bool {
    match self.adjacency.iter().position(|&n| n == other) {
      Some(slot) => {
        self.adjacency.swap_remove(slot);
        true
      }
      None => false,
    }
  }

  pub fn metadata(&self) -> NodeMetadata {
    NodeMetadata {
      index: self.index,
      points: self.contributions.iter().map(|c| c.point).collect(),
      union_size: self.union_size(),
      is_union: self.union_size() > 1,
      is_point_edge_split: self.flags.point_edge_split,
      is_edge_edge_crossing: self.flags.edge_edge_crossing,
    }
  }
}

/// Provenance of one compound node, for attribute blending downstream.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeMetadata {
  pub index: NodeIndex,
  /// Every original point merged into the node.
  pub points: Vec<PointRef>,
  pub union_size: usize,
  pub is_union: bool,
  pub is_point_edge_split: bool,
  pub is_edge_edge_crossing: bool,
}
