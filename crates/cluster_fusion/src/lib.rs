//! cluster_fusion - Spatial graph fusion and cluster compilation
//!
//! This crate turns independent point/edge collections into one compiled
//! graph. Near-coincident points from every source are fused into compound
//! nodes, edges are deduplicated, optional point-edge and edge-edge passes
//! split edges at their intersections, and the result is compacted into an
//! immutable [`Cluster`] with flat adjacency.
//!
//! # Features
//!
//! - **Concurrent fusion**: one insertion task per source into a sharded
//!   spatial hash; no global lock
//! - **Intersection resolution**: R-tree accelerated point-edge and
//!   edge-edge scanners, batched on rayon
//! - **Polled compiler**: a non-blocking state machine advanced by `tick()`
//! - **Cluster views**: lazily cached expanded nodes and edge lengths,
//!   connected components, optional per-component output
//!
//! # Example
//!
//! ```ignore
//! use cluster_fusion::{CompilerSettings, EdgeEdgeSettings, GraphCompiler, PointSource};
//!
//! let sources = vec![
//!     PointSource::path(0, triangle_a, true),
//!     PointSource::path(1, triangle_b, true),
//! ];
//! let settings = CompilerSettings::new().with_edge_edge(EdgeEdgeSettings::default());
//!
//! let mut compiler = GraphCompiler::new(settings, sources)?;
//! compiler.run();
//!
//! if let Some(output) = compiler.take_output() {
//!     println!("{} clusters", output.clusters.len());
//! }
//! ```

pub mod constants;
pub mod types;

pub use types::{edge_key, Aabb3, EdgeTag, NodeIndex, PointRef, SourceId, UnsignedEdge};

// Settings and boot-time errors
pub mod config;
pub mod error;
pub use config::{
  AttributeOutput, ClusterOutputSettings, CompilerSettings, DotWindow, EdgeEdgeSettings,
  FuseSettings, FuseTolerance, MetadataSettings, PointEdgeSettings,
};
pub use error::{CancelReason, ConfigError};

// Attribute columns written next to clusters
pub mod attributes;
pub use attributes::{AttributeColumn, AttributeTable, AttributeValue};

// Cross-platform threading abstraction
pub mod threading;
pub use threading::{TaskBatch, TaskExecutor, TaskId};

// Input collections
pub mod source;
pub use source::{PointSource, SourceCheck, SourceTopology};

// Compound node fusion
pub mod fusion;
pub use fusion::{CompoundGraph, CompoundNode, Contribution, NodeMetadata, SourceSet};

// Point-edge and edge-edge splitting
pub mod intersections;
pub use intersections::{
  EdgeEdgeCrossing, EdgeEdgeIntersections, IntersectionResolver, PointEdgeHit,
  PointEdgeIntersections,
};

// Compiled output
pub mod cluster;
pub use cluster::{Cluster, ClusterState, ExpandedNode, IndexedEdge, Node, NodeLink};

pub mod compiler;
pub use compiler::{CompileOutput, CompilerState, GraphCompiler};

pub mod stats;
pub use stats::CompileStats;
