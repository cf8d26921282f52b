use glam::DVec3;

use super::*;

// Edge key tests
#[test]
fn test_edge_key_is_symmetric() {
  assert_eq!(edge_key(3, 9), edge_key(9, 3));
  assert_ne!(edge_key(3, 9), edge_key(3, 8));
}

#[test]
fn test_edge_key_endpoints_are_ordered() {
  let key = edge_key(42, 7);
  assert_eq!(edge_key_endpoints(key), (7, 42));
}

#[test]
fn test_edge_key_handles_full_range() {
  let key = edge_key(u32::MAX - 1, 0);
  assert_eq!(edge_key_endpoints(key), (0, u32::MAX - 1));
}

#[test]
fn test_unsigned_edge_other() {
  let edge = UnsignedEdge::new(1, 5, PointRef::new(SourceId(0), 0));
  assert_eq!(edge.other(1), 5);
  assert_eq!(edge.other(5), 1);
  assert!(edge.contains(5));
  assert!(!edge.contains(2));
  assert_eq!(edge.union_size, 1);
}

#[test]
fn test_intersection_source_is_reserved() {
  assert!(SourceId::INTERSECTION.is_intersection());
  assert!(!SourceId(0).is_intersection());
}

// AABB tests
#[test]
fn test_empty_aabb_is_invalid() {
  assert!(!Aabb3::empty().is_valid());
}

#[test]
fn test_encapsulate_makes_valid() {
  let mut aabb = Aabb3::empty();
  aabb.encapsulate(DVec3::new(1.0, -2.0, 3.0));
  aabb.encapsulate(DVec3::new(-1.0, 2.0, 0.0));
  assert!(aabb.is_valid());
  assert_eq!(aabb.min, DVec3::new(-1.0, -2.0, 0.0));
  assert_eq!(aabb.max, DVec3::new(1.0, 2.0, 3.0));
  assert_eq!(aabb.center(), DVec3::new(0.0, 0.0, 1.5));
}

#[test]
fn test_segment_aabb_overlap() {
  let a = Aabb3::from_segment(DVec3::ZERO, DVec3::new(2.0, 0.0, 0.0));
  let b = Aabb3::from_segment(DVec3::new(1.0, -1.0, 0.0), DVec3::new(1.0, 1.0, 0.0));
  let c = Aabb3::from_segment(DVec3::new(5.0, 5.0, 5.0), DVec3::new(6.0, 6.0, 6.0));
  assert!(a.overlaps(&b));
  assert!(!a.overlaps(&c));
}

#[test]
fn test_expanded_contains_nearby_point() {
  let aabb = Aabb3::from_segment(DVec3::ZERO, DVec3::X);
  let nearby = DVec3::new(0.5, 0.05, 0.0);
  assert!(!aabb.contains_point(nearby));
  assert!(aabb.expanded(0.1).contains_point(nearby));
}
