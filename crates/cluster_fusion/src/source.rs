//! Input collections: positions plus the topology that connects them.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::constants::MIN_SOURCE_POINTS;
use crate::types::SourceId;

/// How the points of a source are connected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTopology {
  /// Explicit edge list of point index pairs.
  Edges(Vec<[u32; 2]>),
  /// Consecutive points are connected; `closed` also joins last to first.
  Path { closed: bool },
}

/// One independent point/edge dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointSource {
  pub id: SourceId,
  pub positions: Vec<DVec3>,
  pub topology: SourceTopology,
}

/// Outcome of checking a source before insertion.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceCheck {
  /// Usable, with this many edges (after dropping bad ones).
  Valid { edges: usize, dropped: usize },
  /// Too few points to form any topology.
  TooFewPoints { count: usize },
  /// Enough points, but no usable edge.
  NoEdges,
}

impl PointSource {
  pub fn with_edges(id: u32, positions: Vec<DVec3>, edges: Vec<[u32; 2]>) -> Self {
    Self {
      id: SourceId(id),
      positions,
      topology: SourceTopology::Edges(edges),
    }
  }

  pub fn path(id: u32, positions: Vec<DVec3>, closed: bool) -> Self {
    Self {
      id: SourceId(id),
      positions,
      topology: SourceTopology::Path { closed },
    }
  }

  pub fn len(&self) -> usize {
    self.positions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }

  /// Resolve the topology into point index pairs.
  ///
  /// Pairs pointing outside `positions` and self-loops are dropped.
  /// Returns `(pairs, dropped_count)`.
  pub fn edge_pairs(&self) -> (Vec<[u32; 2]>, usize) {
    let count = self.positions.len() as u32;
    match &self.topology {
      SourceTopology::Edges(edges) => {
        let valid: Vec<[u32; 2]> = edges
          .iter()
          .copied()
          .filter(|&[a, b]| a < count && b < count && a != b)
          .collect();
        let dropped = edges.len() - valid.len();
        (valid, dropped)
      }
      SourceTopology::Path { closed } => {
        if count < 2 {
          return (Vec::new(), 0);
        }
        let mut pairs: Vec<[u32; 2]> = (1..count).map(|i| [i - 1, i]).collect();
        // A closed pair of points would duplicate its only edge.
        if *closed && count > 2 {
          pairs.push([count - 1, 0]);
        }
        (pairs, 0)
      }
    }
  }

  /// Boot-time check for degenerate input.
  pub fn check(&self) -> SourceCheck {
    if self.positions.len() < MIN_SOURCE_POINTS {
      return SourceCheck::TooFewPoints {
        count: self.positions.len(),
      };
    }
    let (pairs, dropped) = self.edge_pairs();
    if pairs.is_empty() {
      return SourceCheck::NoEdges;
    }
    SourceCheck::Valid {
      edges: pairs.len(),
      dropped,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn line(n: usize) -> Vec<DVec3> {
    (0..n).map(|i| DVec3::new(i as f64, 0.0, 0.0)).collect()
  }

  #[test]
  fn open_path_pairs() {
    let source = PointSource::path(0, line(4), false);
    assert_eq!(source.edge_pairs().0, vec![[0, 1], [1, 2], [2, 3]]);
  }

  #[test]
  fn closed_path_joins_last_to_first() {
    let source = PointSource::path(0, line(3), true);
    assert_eq!(source.edge_pairs().0, vec![[0, 1], [1, 2], [2, 0]]);
  }

  #[test]
  fn closed_two_point_path_has_single_edge() {
    let source = PointSource::path(0, line(2), true);
    assert_eq!(source.edge_pairs().0, vec![[0, 1]]);
  }

  #[test]
  fn edge_list_drops_out_of_range_and_loops() {
    let source = PointSource::with_edges(0, line(3), vec![[0, 1], [1, 9], [2, 2], [2, 0]]);
    let (pairs, dropped) = source.edge_pairs();
    assert_eq!(pairs, vec![[0, 1], [2, 0]]);
    assert_eq!(dropped, 2);
  }

  #[test]
  fn check_reports_degenerate_sources() {
    assert_eq!(
      PointSource::path(0, line(1), false).check(),
      SourceCheck::TooFewPoints { count: 1 }
    );
    assert_eq!(
      PointSource::with_edges(0, Vec::new(), vec![]).check(),
      SourceCheck::TooFewPoints { count: 0 }
    );
    assert_eq!(
      PointSource::with_edges(0, line(3), vec![[0, 7]]).check(),
      SourceCheck::NoEdges
    );
    assert_eq!(
      PointSource::with_edges(0, line(3), vec![[0, 1], [0, 7]]).check(),
      SourceCheck::Valid {
        edges: 1,
        dropped: 1
      }
    );
  }
}
