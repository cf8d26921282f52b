use super::*;
use crate::attributes::AttributeColumn;
use crate::types::{PointRef, SourceId};

/// Build a cluster with `point_index = 100 + slot` so slot and point index
/// never coincide by accident.
fn build(positions: &[DVec3], pairs: &[(u32, u32)]) -> Cluster {
  let edges: Vec<IndexedEdge> = pairs
    .iter()
    .enumerate()
    .map(|(i, &(start, end))| IndexedEdge {
      index: i as u32,
      start,
      end,
      valid: start != end,
      tag: PointRef::new(SourceId(0), i as u32),
      union_size: 1,
    })
    .collect();
  let (ranges, links) = index_adjacency(positions.len(), &edges);
  let nodes = positions
    .iter()
    .zip(ranges)
    .enumerate()
    .map(|(i, (&position, (start, len)))| Node {
      index: i as u32,
      point_index: 100 + i as u32,
      position,
      adjacency_start: start,
      adjacency_len: len,
      valid: len > 0,
    })
    .collect();

  let mut node_attributes = AttributeTable::new(positions.len());
  node_attributes.insert(
    "Slot",
    AttributeColumn::Double((0..positions.len()).map(|i| i as f64).collect()),
  );
  let mut edge_attributes = AttributeTable::new(edges.len());
  edge_attributes.insert(
    "Row",
    AttributeColumn::Double((0..edges.len()).map(|i| i as f64).collect()),
  );
  Cluster::from_parts(nodes, edges, links, node_attributes, edge_attributes)
}

fn triangle() -> Cluster {
  build(
    &[DVec3::ZERO, DVec3::new(3.0, 0.0, 0.0), DVec3::new(0.0, 4.0, 0.0)],
    &[(0, 1), (1, 2), (2, 0)],
  )
}

// =========================================================================
// Adjacency
// =========================================================================

#[test]
fn test_counting_sort_groups_links_by_node() {
  let cluster = triangle();
  assert_eq!(cluster.links().len(), 6);
  for node in cluster.nodes() {
    assert_eq!(node.degree(), 2);
    for link in cluster.neighbors(node.index) {
      let edge = cluster.edge(link.edge).unwrap();
      assert_eq!(edge.other(node.index), link.node);
    }
  }
  let around_zero: Vec<u32> = cluster.neighbors(0).iter().map(|l| l.node).collect();
  assert_eq!(around_zero, vec![1, 2]);
}

#[test]
fn test_invalid_edge_gets_no_links() {
  let cluster = build(&[DVec3::ZERO, DVec3::X, DVec3::Y], &[(0, 1), (2, 2)]);
  assert_eq!(cluster.edge_count(), 2);
  assert_eq!(cluster.valid_edge_count(), 1);
  assert!(cluster.neighbors(2).is_empty());
  assert!(!cluster.node(2).unwrap().valid);
  assert_eq!(cluster.valid_node_count(), 2);
}

#[test]
fn test_unknown_indices_return_nothing() {
  let cluster = triangle();
  assert!(cluster.node(3).is_none());
  assert!(cluster.edge(9).is_none());
  assert!(cluster.neighbors(42).is_empty());
}

#[test]
fn test_point_index_lookup() {
  let cluster = triangle();
  assert_eq!(cluster.node_index(101), Some(1));
  assert_eq!(cluster.node_index(1), None);
}

// =========================================================================
// Lazy views
// =========================================================================

#[test]
fn test_expanded_nodes_are_cached() {
  let cluster = triangle();
  assert_eq!(cluster.state(), ClusterState::NodesIndexed);

  let first = cluster.expanded_nodes().as_ptr();
  assert_eq!(cluster.state(), ClusterState::ExpandedNodesBuilt);
  let second = cluster.expanded_nodes().as_ptr();
  assert_eq!(first, second);

  let expanded = &cluster.expanded_nodes()[0];
  assert_eq!(expanded.neighbors.len(), 2);
  assert_eq!(expanded.neighbors[0].node, *cluster.node(1).unwrap());
  assert_eq!(expanded.neighbors[0].edge, *cluster.edge(0).unwrap());
}

#[test]
fn test_edge_lengths_are_idempotent() {
  let cluster = triangle();
  let lengths = cluster.compute_edge_lengths().to_vec();
  assert_eq!(lengths, vec![3.0, 5.0, 4.0]);
  assert_eq!(cluster.compute_edge_lengths(), lengths.as_slice());
  assert_eq!(cluster.edge_length(1), Some(5.0));
  assert_eq!(cluster.edge_length(3), None);
  assert_eq!(cluster.state(), ClusterState::EdgeLengthsComputed);
}

#[test]
fn test_state_never_goes_back() {
  let cluster = triangle();
  cluster.compute_edge_lengths();
  cluster.expanded_nodes();
  assert_eq!(cluster.state(), ClusterState::EdgeLengthsComputed);
  assert!(ClusterState::NodesIndexed < ClusterState::ExpandedNodesBuilt);
}

// =========================================================================
// Queries
// =========================================================================

#[test]
fn test_bounds_cover_valid_nodes_only() {
  let cluster = build(
    &[DVec3::ZERO, DVec3::ONE, DVec3::splat(50.0)],
    &[(0, 1)],
  );
  let bounds = cluster.bounds();
  assert_eq!(bounds.min, DVec3::ZERO);
  assert_eq!(bounds.max, DVec3::ONE);
}

#[test]
fn test_find_closest_node_skips_invalid() {
  let cluster = build(
    &[DVec3::ZERO, DVec3::X * 10.0, DVec3::X * 5.0],
    &[(0, 1)],
  );
  assert_eq!(cluster.find_closest_node(DVec3::X * 6.0), Some(1));
  assert_eq!(cluster.find_closest_node(DVec3::X * -1.0), Some(0));
}

#[test]
fn test_connected_components_and_extract() {
  let cluster = build(
    &[
      DVec3::ZERO,
      DVec3::X,
      DVec3::new(10.0, 0.0, 0.0),
      DVec3::new(11.0, 0.0, 0.0),
      DVec3::new(12.0, 0.0, 0.0),
    ],
    &[(0, 1), (2, 3), (3, 4)],
  );
  let components = cluster.connected_components();
  assert_eq!(components, vec![vec![0, 1], vec![2, 3, 4]]);

  let part = cluster.extract(&components[1]);
  assert_eq!(part.node_count(), 3);
  assert_eq!(part.edge_count(), 2);
  assert_eq!(part.node_index(102), Some(0));
  assert_eq!(part.node_index(100), None);
  assert_eq!(part.edge(1).map(|e| (e.start, e.end)), Some((1, 2)));
  assert_eq!(part.neighbors(1).len(), 2);
  assert_eq!(
    part.node_attributes().get("Slot"),
    Some(&AttributeColumn::Double(vec![2.0, 3.0, 4.0]))
  );
  assert_eq!(
    part.edge_attributes().get("Row"),
    Some(&AttributeColumn::Double(vec![1.0, 2.0]))
  );
}

#[test]
fn test_cluster_is_send_and_sync() {
  fn assert_send_sync<T: Send + Sync>() {}
  assert_send_sync::<Cluster>();
}
