//! Graph compiler: drives sources through fusion, intersection resolution
//! and cluster writing as a polled state machine.
//!
//! # Phases
//!
//! ```text
//! ReadyForNextSource ──► InsertingEdges ──► MergingCompoundNodes
//!        │                (1 task/source)     (parallel centroids)
//!        │                                          │
//!        ▼                                          ▼
//!   Cancelled(..)         FindingPointEdgeIntersections (optional)
//!                                                   │
//!                                                   ▼
//!                         FindingEdgeEdgeIntersections (optional)
//!                                                   │
//!                                                   ▼
//!                               WritingClusters ──► Done
//! ```
//!
//! Every phase is a fork/join batch on the [`TaskExecutor`]. `tick()` checks
//! the current batch and advances at most one phase; it never blocks.
//!
//! # Usage
//!
//! ```ignore
//! let mut compiler = GraphCompiler::new(settings, sources)?;
//! while !compiler.tick().is_finished() {
//!     // do other work
//! }
//! if let Some(output) = compiler.take_output() {
//!     for cluster in &output.clusters { /* ... */ }
//! }
//! ```

mod writer;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cluster::Cluster;
use crate::config::CompilerSettings;
use crate::constants::MIN_SOURCE_POINTS;
use crate::error::{CancelReason, ConfigError};
use crate::fusion::{CompoundGraph, NodeMetadata};
use crate::intersections::{EdgeEdgeIntersections, IntersectionResolver, PointEdgeIntersections};
use crate::source::{PointSource, SourceCheck};
use crate::stats::{CompileStats, PhaseTimer};
use crate::threading::{TaskBatch, TaskExecutor};
use writer::{write_clusters, Written};

/// Where a compilation currently is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompilerState {
  ReadyForNextSource,
  InsertingEdges,
  MergingCompoundNodes,
  FindingPointEdgeIntersections,
  FindingEdgeEdgeIntersections,
  WritingClusters,
  Done,
  Cancelled(CancelReason),
}

impl CompilerState {
  /// True for `Done` and `Cancelled`.
  pub fn is_finished(&self) -> bool {
    matches!(self, CompilerState::Done | CompilerState::Cancelled(_))
  }
}

/// Everything a successful compilation produces.
#[derive(Debug)]
pub struct CompileOutput {
  pub clusters: Vec<Cluster>,
  /// Provenance of every compound node, indexed by `Node::point_index`.
  pub metadata: Vec<NodeMetadata>,
  pub stats: CompileStats,
}

/// Compiles point sources into clusters.
pub struct GraphCompiler {
  settings: CompilerSettings,
  executor: TaskExecutor,
  state: CompilerState,
  sources: Vec<PointSource>,
  graph: Arc<CompoundGraph>,

  inserting: TaskBatch<usize>,
  merging: TaskBatch<()>,
  point_edge: Option<PointEdgeIntersections>,
  edge_edge: Option<EdgeEdgeIntersections>,
  writing: TaskBatch<Written>,

  phase: PhaseTimer,
  total: PhaseTimer,
  stats: CompileStats,
  output: Option<CompileOutput>,
  compiled_successfully: bool,
}

impl GraphCompiler {
  /// Validate settings and stage `sources`. Nothing runs until `tick`.
  pub fn new(settings: CompilerSettings, sources: Vec<PointSource>) -> Result<Self, ConfigError> {
    Self::with_executor(settings, sources, TaskExecutor::default())
  }

  /// Same as `new`, sharing an existing executor.
  pub fn with_executor(
    settings: CompilerSettings,
    sources: Vec<PointSource>,
    executor: TaskExecutor,
  ) -> Result<Self, ConfigError> {
    settings.validate()?;
    let graph = Arc::new(CompoundGraph::new(&settings.fuse));
    Ok(Self {
      settings,
      executor,
      state: CompilerState::ReadyForNextSource,
      sources,
      graph,
      inserting: TaskBatch::new(),
      merging: TaskBatch::new(),
      point_edge: None,
      edge_edge: None,
      writing: TaskBatch::new(),
      phase: PhaseTimer::start(),
      total: PhaseTimer::start(),
      stats: CompileStats::default(),
      output: None,
      compiled_successfully: false,
    })
  }

  pub fn state(&self) -> &CompilerState {
    &self.state
  }

  pub fn settings(&self) -> &CompilerSettings {
    &self.settings
  }

  pub fn executor(&self) -> &TaskExecutor {
    &self.executor
  }

  /// The live fusion graph (read-only between phases).
  pub fn graph(&self) -> &CompoundGraph {
    &self.graph
  }

  pub fn stats(&self) -> &CompileStats {
    &self.stats
  }

  pub fn compiled_successfully(&self) -> bool {
    self.compiled_successfully
  }

  pub fn output(&self) -> Option<&CompileOutput> {
    self.output.as_ref()
  }

  pub fn take_output(&mut self) -> Option<CompileOutput> {
    self.output.take()
  }

  /// Stop the compilation. Tasks already scheduled still run to
  /// completion, but their results are discarded.
  pub fn abort(&mut self) {
    if !self.state.is_finished() {
      warn!("Graph compilation aborted in {:?}", self.state);
      self.state = CompilerState::Cancelled(CancelReason::Aborted);
    }
  }

  /// Advance by at most one phase.
  pub fn tick(&mut self) -> CompilerState {
    #[cfg(feature = "profiling")]
    let _span = tracing::info_span!("compiler::tick").entered();

    match self.state {
      CompilerState::ReadyForNextSource => self.boot(),
      CompilerState::InsertingEdges => {
        if self.inserting.is_complete(&self.executor) {
          let inserted: usize = self.inserting.take().into_iter().sum();
          self.stats.insert_us = self.phase.elapsed_us();
          debug!(inserted, nodes = self.graph.node_count(), "Edges inserted");
          self.start_merge();
        }
      }
      CompilerState::MergingCompoundNodes => {
        if self.merging.is_complete(&self.executor) {
          self.merging.take();
          self.stats.merge_us = self.phase.elapsed_us();
          self.start_intersections();
        }
      }
      CompilerState::FindingPointEdgeIntersections => self.poll_point_edge(),
      CompilerState::FindingEdgeEdgeIntersections => self.poll_edge_edge(),
      CompilerState::WritingClusters => self.poll_writing(),
      CompilerState::Done | CompilerState::Cancelled(_) => {}
    }
    self.state.clone()
  }

  /// Drive `tick` to completion, yielding between polls.
  pub fn run(&mut self) -> CompilerState {
    loop {
      let state = self.tick();
      if state.is_finished() {
        return state;
      }
      std::thread::yield_now();
    }
  }

  fn enter(&mut self, state: CompilerState) {
    debug!("Graph compiler: {:?} -> {:?}", self.state, state);
    self.state = state;
    self.phase = PhaseTimer::start();
  }

  fn boot(&mut self) {
    self.total = PhaseTimer::start();
    let sources = std::mem::take(&mut self.sources);
    let mut accepted = Vec::with_capacity(sources.len());

    for source in sources {
      match source.check() {
        SourceCheck::Valid { dropped, .. } => {
          if dropped > 0 {
            warn!(
              "Source {} has {} edges with invalid point indices; they were dropped",
              source.id.raw(),
              dropped
            );
            self.stats.dropped_edges += dropped;
          }
          accepted.push(source);
        }
        SourceCheck::TooFewPoints { count } => {
          warn!(
            "Source {} has {} points (minimum {}); skipped",
            source.id.raw(),
            count,
            MIN_SOURCE_POINTS
          );
          self.stats.skipped_sources += 1;
        }
        SourceCheck::NoEdges => {
          warn!("Source {} has no usable edges; skipped", source.id.raw());
          self.stats.skipped_sources += 1;
        }
      }
    }

    if accepted.is_empty() {
      warn!("No valid source to compile");
      self.enter(CompilerState::Cancelled(CancelReason::NoValidSources {
        min_points: MIN_SOURCE_POINTS,
      }));
      return;
    }

    self.stats.sources = accepted.len();
    self.enter(CompilerState::InsertingEdges);
    for source in accepted {
      let graph = Arc::clone(&self.graph);
      self
        .inserting
        .spawn(&self.executor, move || insert_source(&graph, &source));
    }
  }

  fn start_merge(&mut self) {
    self.enter(CompilerState::MergingCompoundNodes);
    let graph = Arc::clone(&self.graph);
    self
      .merging
      .spawn(&self.executor, move || graph.update_centers());
  }

  fn start_intersections(&mut self) {
    if self.settings.do_point_edge {
      self.enter(CompilerState::FindingPointEdgeIntersections);
      let mut resolver = PointEdgeIntersections::new(self.settings.point_edge.clone());
      resolver.find_intersections(&self.graph, &self.executor);
      self.point_edge = Some(resolver);
    } else {
      self.start_edge_edge();
    }
  }

  fn poll_point_edge(&mut self) {
    let Some(resolver) = self.point_edge.as_mut() else {
      self.start_edge_edge();
      return;
    };
    if !resolver.is_complete(&self.executor) {
      return;
    }
    self.stats.point_edge_splits = resolver.insert(&self.graph);
    self.stats.point_edge_us = self.phase.elapsed_us();
    self.point_edge = None;
    self.start_edge_edge();
  }

  fn start_edge_edge(&mut self) {
    if self.settings.do_edge_edge {
      self.enter(CompilerState::FindingEdgeEdgeIntersections);
      let mut resolver = EdgeEdgeIntersections::new(self.settings.edge_edge.clone());
      resolver.find_intersections(&self.graph, &self.executor);
      self.edge_edge = Some(resolver);
    } else {
      self.start_writing();
    }
  }

  fn poll_edge_edge(&mut self) {
    let Some(resolver) = self.edge_edge.as_mut() else {
      self.start_writing();
      return;
    };
    if !resolver.is_complete(&self.executor) {
      return;
    }
    self.stats.edge_edge_splits = resolver.insert(&self.graph);
    self.stats.edge_edge_us = self.phase.elapsed_us();
    self.edge_edge = None;
    self.start_writing();
  }

  fn start_writing(&mut self) {
    self.enter(CompilerState::WritingClusters);
    let graph = Arc::clone(&self.graph);
    let settings = self.settings.clone();
    self
      .writing
      .spawn(&self.executor, move || write_clusters(&graph, &settings));
  }

  fn poll_writing(&mut self) {
    if !self.writing.is_complete(&self.executor) {
      return;
    }
    let Some(written) = self.writing.take().pop() else {
      return;
    };
    self.stats.write_us = self.phase.elapsed_us();
    self.stats.nodes = written.nodes;
    self.stats.edges = written.edges;
    self.stats.clusters = written.clusters.len();
    self.stats.total_us = self.total.elapsed_us();

    if written.attributes_failed {
      warn!("Graph compilation discarded: cluster attributes could not be written");
      self.compiled_successfully = false;
      self.output = None;
    } else if written.clusters.is_empty() {
      warn!(
        "Graph compilation produced no cluster ({} nodes, {} edges before filtering)",
        written.nodes, written.edges
      );
      self.compiled_successfully = false;
      self.output = None;
    } else {
      info!(
        "Compiled {} sources into {} clusters ({} nodes, {} edges, {} splits) in {}us",
        self.stats.sources,
        self.stats.clusters,
        self.stats.nodes,
        self.stats.edges,
        self.stats.point_edge_splits + self.stats.edge_edge_splits,
        self.stats.total_us
      );
      self.compiled_successfully = true;
      self.output = Some(CompileOutput {
        clusters: written.clusters,
        metadata: written.metadata,
        stats: self.stats,
      });
    }
    self.enter(CompilerState::Done);
  }
}

/// Insert every edge of one source. Returns the number of new unique edges.
fn insert_source(graph: &CompoundGraph, source: &PointSource) -> usize {
  let (pairs, _) = source.edge_pairs();
  pairs
    .iter()
    .filter(|&&[a, b]| {
      graph.create_bridge(
        source.positions[a as usize],
        source.id,
        a,
        source.positions[b as usize],
        source.id,
        b,
      )
    })
    .count()
}
