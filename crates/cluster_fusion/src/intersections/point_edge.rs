//! Point-edge resolver: nodes lying on an edge split it.

use std::sync::Arc;

use rstar::primitives::GeomWithData;
use rstar::{RTree, AABB};

use super::{shared, split_edge, GraphSnapshot, IntersectionResolver};
use crate::config::PointEdgeSettings;
use crate::constants::DEGENERATE_LENGTH_SQ;
use crate::fusion::CompoundGraph;
use crate::threading::{TaskBatch, TaskExecutor};
use crate::types::NodeIndex;

type NodePoint = GeomWithData<[f64; 3], NodeIndex>;

/// A node within tolerance of an edge's interior.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointEdgeHit {
  /// Index into the snapshot edge list.
  pub edge: usize,
  pub node: NodeIndex,
  /// Projection parameter along `start → end`, strictly inside `(0, 1)`.
  pub alpha: f64,
}

struct Scanner {
  snapshot: Arc<GraphSnapshot>,
  tree: RTree<NodePoint>,
  settings: PointEdgeSettings,
}

impl Scanner {
  fn run(&self, edges: std::ops::Range<usize>) -> Vec<PointEdgeHit> {
    let tolerance = self.settings.tolerance;
    let tolerance_sq = self.settings.tolerance_sq();
    let mut hits = Vec::new();

    for edge_index in edges {
      let edge = &self.snapshot.edges[edge_index];
      let (a, b) = self.snapshot.segment(edge_index);
      let ab = b - a;
      let len_sq = ab.length_squared();
      if len_sq < DEGENERATE_LENGTH_SQ {
        continue;
      }

      let lo = a.min(b) - tolerance;
      let hi = a.max(b) + tolerance;
      let envelope = AABB::from_corners(lo.to_array(), hi.to_array());

      for candidate in self.tree.locate_in_envelope(&envelope) {
        let node = candidate.data;
        if edge.contains(node) {
          continue;
        }
        if !self.settings.enable_self_intersection
          && self.snapshot.node_shares_source(node, edge_index)
        {
          continue;
        }
        let p = self.snapshot.positions[node as usize];
        let alpha = (p - a).dot(ab) / len_sq;
        if alpha <= 0.0 || alpha >= 1.0 {
          continue;
        }
        if (p - (a + ab * alpha)).length_squared() <= tolerance_sq {
          hits.push(PointEdgeHit {
            edge: edge_index,
            node,
            alpha,
          });
        }
      }
    }
    hits
  }
}

/// Splits every edge at the nodes lying on it.
pub struct PointEdgeIntersections {
  settings: PointEdgeSettings,
  snapshot: Option<Arc<GraphSnapshot>>,
  batch: TaskBatch<Vec<PointEdgeHit>>,
  hits: Vec<PointEdgeHit>,
}

impl PointEdgeIntersections {
  pub fn new(settings: PointEdgeSettings) -> Self {
    Self {
      settings,
      snapshot: None,
      batch: TaskBatch::new(),
      hits: Vec::new(),
    }
  }

  /// Accepted hits, in snapshot edge order. Filled once complete.
  pub fn hits(&self) -> &[PointEdgeHit] {
    &self.hits
  }
}

impl IntersectionResolver for PointEdgeIntersections {
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "point_edge::find"))]
  fn find_intersections(&mut self, graph: &CompoundGraph, executor: &TaskExecutor) {
    let snapshot = shared(GraphSnapshot::capture(graph));
    let points: Vec<NodePoint> = snapshot
      .positions
      .iter()
      .enumerate()
      .map(|(i, p)| GeomWithData::new(p.to_array(), i as NodeIndex))
      .collect();
    let scanner = Arc::new(Scanner {
      snapshot: Arc::clone(&snapshot),
      tree: RTree::bulk_load(points),
      settings: self.settings.clone(),
    });

    self.hits.clear();
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
      self.hits = self.batch.take().into_iter().flatten().collect();
    }
    true
  }

  fn insert(&mut self, graph: &CompoundGraph) -> usize {
    let Some(snapshot) = self.snapshot.take() else {
      return 0;
    };
    let mut hits = std::mem::take(&mut self.hits);
    hits.sort_by(|x, y| x.edge.cmp(&y.edge).then(x.alpha.total_cmp(&y.alpha)));

    let mut split = 0;
    for group in hits.chunk_by(|x, y| x.edge == y.edge) {
      let cuts: Vec<NodeIndex> = group.iter().map(|h| h.node).collect();
      if split_edge(graph, &snapshot.edges[group[0].edge], &cuts) {
        split += 1;
        for &node in &cuts {
          graph.mark(node, |flags| flags.point_edge_split = true);
        }
      }
    }
    self.hits = hits;
    split
  }
}
