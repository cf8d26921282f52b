//! Per-compilation counters and phase timings.

use serde::Serialize;
use web_time::Instant;

/// Statistics from one compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompileStats {
  /// Sources accepted for insertion.
  pub sources: usize,
  /// Sources skipped as degenerate.
  pub skipped_sources: usize,
  /// Input edges dropped for bad indices.
  pub dropped_edges: usize,
  /// Compound nodes in the final graph.
  pub nodes: usize,
  /// Unique edges in the final graph.
  pub edges: usize,
  pub point_edge_splits: usize,
  pub edge_edge_splits: usize,
  /// Clusters written (after component filtering).
  pub clusters: usize,

  /// Edge insertion time in microseconds.
  pub insert_us: u64,
  /// Centroid merge time in microseconds.
  pub merge_us: u64,
  pub point_edge_us: u64,
  pub edge_edge_us: u64,
  /// Cluster writing time in microseconds.
  pub write_us: u64,
  /// Wall time from first tick to completion in microseconds.
  pub total_us: u64,
}

impl CompileStats {
  /// Sum of the per-phase times (excludes polling gaps).
  pub fn phase_us(&self) -> u64 {
    self.insert_us + self.merge_us + self.point_edge_us + self.edge_edge_us + self.write_us
  }
}

/// Wall clock for one phase.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PhaseTimer(Instant);

impl PhaseTimer {
  pub fn start() -> Self {
    Self(Instant::now())
  }

  pub fn elapsed_us(&self) -> u64 {
    self.0.elapsed().as_micros() as u64
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn phase_sum() {
    let stats = CompileStats {
      insert_us: 10,
      merge_us: 5,
      edge_edge_us: 1,
      write_us: 4,
      total_us: 100,
      ..Default::default()
    };
    assert_eq!(stats.phase_us(), 20);
  }

  #[test]
  fn timer_is_monotonic() {
    let timer = PhaseTimer::start();
    std::thread::sleep(std::time::Duration::from_millis(2));
    assert!(timer.elapsed_us() >= 1000);
  }
}
