//! Core handle and geometry types shared by fusion, scanners and clusters.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Index of a compound node (and of the matching compiled node slot).
pub type NodeIndex = u32;

/// Opaque identifier of an input collection. Only used for provenance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub u32);

impl SourceId {
  /// Tag carried by contributions created while resolving intersections.
  pub const INTERSECTION: SourceId = SourceId(u32::MAX);

  /// Get the raw ID value.
  pub fn raw(&self) -> u32 {
    self.0
  }

  /// True for the synthetic intersection source.
  pub fn is_intersection(&self) -> bool {
    *self == Self::INTERSECTION
  }
}

/// One original point: collection + index inside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointRef {
  pub source: SourceId,
  pub point: u32,
}

impl PointRef {
  pub fn new(source: SourceId, point: u32) -> Self {
    Self { source, point }
  }
}

/// Provenance of an edge: the source and point that first requested it.
pub type EdgeTag = PointRef;

/// Canonical 64-bit key of an undirected edge.
///
/// `(a, b)` and `(b, a)` produce the same key.
#[inline(always)]
pub fn edge_key(a: NodeIndex, b: NodeIndex) -> u64 {
  let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
  ((lo as u64) << 32) | hi as u64
}

/// Split an edge key back into its `(min, max)` endpoints.
#[inline(always)]
pub fn edge_key_endpoints(key: u64) -> (NodeIndex, NodeIndex) {
  ((key >> 32) as NodeIndex, (key & 0xFFFF_FFFF) as NodeIndex)
}

/// Undirected edge between two compound nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEdge {
  pub start: NodeIndex,
  pub end: NodeIndex,
  /// Originating source/point.
  pub tag: EdgeTag,
  /// Number of insertions that collapsed into this edge.
  pub union_size: u32,
}

impl UnsignedEdge {
  pub fn new(start: NodeIndex, end: NodeIndex, tag: EdgeTag) -> Self {
    Self {
      start,
      end,
      tag,
      union_size: 1,
    }
  }

  #[inline]
  pub fn key(&self) -> u64 {
    edge_key(self.start, self.end)
  }

  /// The endpoint opposite to `node`.
  #[inline]
  pub fn other(&self, node: NodeIndex) -> NodeIndex {
    if self.start == node {
      self.end
    } else {
      self.start
    }
  }

  #[inline]
  pub fn contains(&self, node: NodeIndex) -> bool {
    self.start == node || self.end == node
  }
}

/// Double-precision axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb3 {
  /// Minimum corner (inclusive).
  pub min: DVec3,
  /// Maximum corner (inclusive).
  pub max: DVec3,
}

impl Aabb3 {
  /// Create AABB with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: DVec3::splat(f64::INFINITY),
      max: DVec3::splat(f64::NEG_INFINITY),
    }
  }

  /// Tight box around a segment.
  pub fn from_segment(a: DVec3, b: DVec3) -> Self {
    Self {
      min: a.min(b),
      max: a.max(b),
    }
  }

  /// Expand AABB to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: DVec3) {
    self.min = self.min.min(point);
    self.max = self.max.max(point);
  }

  /// Grow every face outward by `amount`.
  #[inline]
  pub fn expanded(&self, amount: f64) -> Self {
    Self {
      min: self.min - DVec3::splat(amount),
      max: self.max + DVec3::splat(amount),
    }
  }

  /// Check if AABB is valid (min <= max on all axes).
  pub fn is_valid(&self) -> bool {
    self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
  }

  /// Two AABBs overlap if they share any interior or boundary points.
  #[inline]
  pub fn overlaps(&self, other: &Aabb3) -> bool {
    self.min.x <= other.max.x
      && self.max.x >= other.min.x
      && self.min.y <= other.max.y
      && self.max.y >= other.min.y
      && self.min.z <= other.max.z
      && self.max.z >= other.min.z
  }

  #[inline]
  pub fn contains_point(&self, point: DVec3) -> bool {
    point.cmpge(self.min).all() && point.cmple(self.max).all()
  }

  #[inline]
  pub fn size(&self) -> DVec3 {
    self.max - self.min
  }

  #[inline]
  pub fn center(&self) -> DVec3 {
    (self.min + self.max) * 0.5
  }
}

impl Default for Aabb3 {
  fn default() -> Self {
    Self::empty()
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
