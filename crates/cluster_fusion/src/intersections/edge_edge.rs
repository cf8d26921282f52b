//! Edge-edge resolver: crossing edges are split at a shared crossing node.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use glam::DVec3;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

use super::{shared, split_edge, GraphSnapshot, IntersectionResolver};
use crate::config::{DotWindow, EdgeEdgeSettings};
use crate::constants::{DEGENERATE_LENGTH_SQ, PARALLEL_EPSILON};
use crate::fusion::CompoundGraph;
use crate::threading::{TaskBatch, TaskExecutor};
use crate::types::{NodeIndex, SourceId};

type EdgeBox = GeomWithData<Rectangle<[f64; 3]>, usize>;

/// Closest approach of two edges, accepted as a crossing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeEdgeCrossing {
  /// Snapshot edge indices, `first < second`.
  pub first: usize,
  pub second: usize,
  /// Midpoint of the closest points on both segments.
  pub position: DVec3,
  pub alpha_first: f64,
  pub alpha_second: f64,
}

/// Closest points between segments `p1 + s·d1` and `p2 + t·d2`, both
/// parameters clamped to `[0, 1]`. `None` for parallel segments.
fn closest_parameters(p1: DVec3, d1: DVec3, p2: DVec3, d2: DVec3) -> Option<(f64, f64)> {
  let r = p1 - p2;
  let a = d1.length_squared();
  let e = d2.length_squared();
  let b = d1.dot(d2);
  let c = d1.dot(r);
  let f = d2.dot(r);

  let denom = a * e - b * b;
  if denom <= PARALLEL_EPSILON * a * e {
    return None;
  }

  let mut s = ((b * f - c * e) / denom).clamp(0.0, 1.0);
  let mut t = (b * s + f) / e;
  if t < 0.0 {
    t = 0.0;
    s = (-c / a).clamp(0.0, 1.0);
  } else if t > 1.0 {
    t = 1.0;
    s = ((b - c) / a).clamp(0.0, 1.0);
  }
  Some((s, t))
}

struct Scanner {
  snapshot: Arc<GraphSnapshot>,
  tree: RTree<EdgeBox>,
  tolerance: f64,
  tolerance_sq: f64,
  window: DotWindow,
  allow_endpoint_contact: bool,
  enable_self_intersection: bool,
}

impl Scanner {
  #[inline]
  fn inside(&self, alpha: f64) -> bool {
    if self.allow_endpoint_contact {
      (0.0..=1.0).contains(&alpha)
    } else {
      alpha > 0.0 && alpha < 1.0
    }
  }

  fn skip_pair(&self, first: usize, second: usize) -> bool {
    let (e1, e2) = (&self.snapshot.edges[first], &self.snapshot.edges[second]);
    e1.contains(e2.start)
      || e1.contains(e2.end)
      || (!self.enable_self_intersection && self.snapshot.edges_share_source(first, second))
  }

  fn test(&self, first: usize, second: usize) -> Option<EdgeEdgeCrossing> {
    let (a, b) = self.snapshot.segment(first);
    let (c, d) = self.snapshot.segment(second);
    let d1 = b - a;
    let d2 = d - c;
    let len1 = d1.length_squared();
    let len2 = d2.length_squared();
    if len1 < DEGENERATE_LENGTH_SQ || len2 < DEGENERATE_LENGTH_SQ {
      return None;
    }

    let abs_dot = d1.dot(d2).abs() / (len1 * len2).sqrt();
    if !self.window.accepts(abs_dot) {
      return None;
    }

    let (s, t) = closest_parameters(a, d1, c, d2)?;
    if !self.inside(s) || !self.inside(t) {
      return None;
    }
    let q1 = a + d1 * s;
    let q2 = c + d2 * t;
    if (q1 - q2).length_squared() > self.tolerance_sq {
      return None;
    }

    Some(EdgeEdgeCrossing {
      first,
      second,
      position: (q1 + q2) * 0.5,
      alpha_first: s,
      alpha_second: t,
    })
  }

  fn run(&self, edges: Range<usize>) -> Vec<EdgeEdgeCrossing> {
    let mut crossings = Vec::new();
    for first in edges {
      let (a, b) = self.snapshot.segment(first);
      let lo = a.min(b) - self.tolerance;
      let hi = a.max(b) + self.tolerance;
      let envelope = AABB::from_corners(lo.to_array(), hi.to_array());

      let mut candidates: Vec<usize> = self
        .tree
        .locate_in_envelope_intersecting(&envelope)
        .map(|entry| entry.data)
        .filter(|&second| second > first)
        .collect();
      candidates.sort_unstable();

      for second in candidates {
        if self.skip_pair(first, second) {
          continue;
        }
        if let Some(crossing) = self.test(first, second) {
          crossings.push(crossing);
        }
      }
    }
    crossings
  }
}

/// Splits pairs of crossing edges through a new crossing node.
pub struct EdgeEdgeIntersections {
  settings: EdgeEdgeSettings,
  snapshot: Option<Arc<GraphSnapshot>>,
  batch: TaskBatch<Vec<EdgeEdgeCrossing>>,
  crossings: Vec<EdgeEdgeCrossing>,
}

impl EdgeEdgeIntersections {
  pub fn new(settings: EdgeEdgeSettings) -> Self {
    Self {
      settings,
      snapshot: None,
      batch: TaskBatch::new(),
      crossings: Vec::new(),
    }
  }

  /// Accepted crossings ordered by `(first, second)`. Filled once complete.
  pub fn crossings(&self) -> &[EdgeEdgeCrossing] {
    &self.crossings
  }
}

impl IntersectionResolver for EdgeEdgeIntersections {
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "edge_edge::find"))]
  fn find_intersections(&mut self, graph: &CompoundGraph, executor: &TaskExecutor) {
    let snapshot = shared(GraphSnapshot::capture(graph));
    let boxes: Vec<EdgeBox> = (0..snapshot.edges.len())
      .map(|i| {
        let (a, b) = snapshot.segment(i);
        GeomWithData::new(
          Rectangle::from_corners(a.min(b).to_array(), a.max(b).to_array()),
          i,
        )
      })
      .collect();
    let scanner = Arc::new(Scanner {
      snapshot: Arc::clone(&snapshot),
      tree: RTree::bulk_load(boxes),
      tolerance: self.settings.tolerance,
      tolerance_sq: self.settings.tolerance_sq(),
      window: self.settings.compute_dot(),
      allow_endpoint_contact: self.settings.allow_endpoint_contact,
      enable_self_intersection: self.settings.enable_self_intersection,
    });

    self.crossings.clear();
    for chunk in snapshot.chunks() {
      let scanner = Arc::clone(&scanner);
      self.batch.spawn(executor, move || scanner.run(chunk));
    }
    self.snapshot = Some(snapshot);
  }

  fn is_complete(&mut self, executor: &TaskExecutor) -> bool {
    if !self.batch.is_complete(executor) {
      return false;
    }
    if !self.batch.is_empty() {
      self.crossings = self.batch.take().into_iter().flatten().collect();
    }
    true
  }

  fn insert(&mut self, graph: &CompoundGraph) -> usize {
    let Some(snapshot) = self.snapshot.take() else {
      return 0;
    };

    // edge -> (alpha, crossing node)
    let mut cuts: BTreeMap<usize, Vec<(f64, NodeIndex)>> = BTreeMap::new();
    for (record, crossing) in self.crossings.iter().enumerate() {
      let node = graph.get_or_create_node(crossing.position, SourceId::INTERSECTION, record as u32);
      graph.mark(node, |flags| flags.edge_edge_crossing = true);
      cuts
        .entry(crossing.first)
        .or_default()
        .push((crossing.alpha_first, node));
      cuts
        .entry(crossing.second)
        .or_default()
        .push((crossing.alpha_second, node));
    }

    let mut split = 0;
    for (edge, mut along) in cuts {
      along.sort_by(|x, y| x.0.total_cmp(&y.0));
      let nodes: Vec<NodeIndex> = along.into_iter().map(|(_, node)| node).collect();
      if split_edge(graph, &snapshot.edges[edge], &nodes) {
        split += 1;
      }
    }
    split
  }
}
