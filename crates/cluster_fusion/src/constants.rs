//! Shared numeric constants for fusion, intersection scanners and compilation.
//!
//! # Spatial hash layout
//!
//! ```text
//! cell size = max(fuse tolerance, MIN_CELL_SIZE) · (1 + CELL_MARGIN)   (per axis)
//!
//!   ┌────┬────┬────┐
//!   │    │    │    │   A query at `p` only ever inspects the 3×3×3
//!   ├────┼────┼────┤   neighbourhood of `p`'s cell: any node within
//!   │    │ p  │    │   tolerance of `p` must live in one of them.
//!   ├────┼────┼────┤
//!   │    │    │    │   Cells are grouped into LOCK_SHARDS mutex-protected
//!   └────┴────┴────┘   shards (hash of the cell key).
//! ```

/// Minimum number of points a source needs to form any topology.
pub const MIN_SOURCE_POINTS: usize = 2;

/// Smallest spatial hash cell edge. Guards zero tolerances.
pub const MIN_CELL_SIZE: f64 = 1e-3;

/// Relative widening of a hash cell over the fuse tolerance. Two points
/// within tolerance then differ by less than one cell after `floor`
/// rounding, so they always land in adjacent cells.
pub const CELL_MARGIN: f64 = 1e-6;

/// Number of lock shards in the fusion spatial hash. Power of two.
pub const LOCK_SHARDS: usize = 64;

/// Number of cells inspected around a query cell (3×3×3).
pub const NEIGHBORHOOD_CELLS: usize = 27;

/// Squared length below which a segment is treated as degenerate.
pub const DEGENERATE_LENGTH_SQ: f64 = 1e-12;

/// Denominator threshold below which two segments are treated as parallel.
pub const PARALLEL_EPSILON: f64 = 1e-9;

/// Number of edges handed to a single intersection scanner task.
pub const SCANNER_CHUNK_SIZE: usize = 256;

/// Default fuse tolerance in world units.
pub const DEFAULT_FUSE_TOLERANCE: f64 = 0.001;

/// Default point-edge tolerance in world units.
pub const DEFAULT_POINT_EDGE_TOLERANCE: f64 = 0.001;

/// Default edge-edge tolerance in world units.
pub const DEFAULT_EDGE_EDGE_TOLERANCE: f64 = 0.001;

/// Map a shard-space hash to a shard slot.
#[inline(always)]
pub const fn shard_of(hash: u64) -> usize {
  (hash as usize) & (LOCK_SHARDS - 1)
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
