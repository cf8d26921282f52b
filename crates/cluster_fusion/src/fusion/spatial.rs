//! Sharded spatial hash over compound node positions.
//!
//! Cells are `cell_size` wide per axis (never narrower than the fuse
//! tolerance), so every node within tolerance of `p` sits in the 3×3×3
//! neighbourhood of `p`'s cell. Cells map to `LOCK_SHARDS` mutex shards;
//! a query locks only the shards its neighbourhood touches, in ascending
//! shard order.

use std::collections::HashMap;

use glam::{DVec3, I64Vec3};
use parking_lot::{Mutex, MutexGuard};
use smallvec::SmallVec;

use crate::config::FuseTolerance;
use crate::constants::{shard_of, LOCK_SHARDS, NEIGHBORHOOD_CELLS};
use crate::types::NodeIndex;

pub(crate) type CellKey = I64Vec3;

/// A node as seen by the hash: its index and last known centroid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct CellEntry {
  pub index: NodeIndex,
  pub position: DVec3,
}

#[derive(Default)]
struct Shard {
  cells: HashMap<CellKey, SmallVec<[CellEntry; 2]>>,
}

impl Shard {
  fn insert(&mut self, cell: CellKey, entry: CellEntry) {
    self.cells.entry(cell).or_default().push(entry);
  }

  fn remove(&mut self, cell: CellKey, index: NodeIndex) -> bool {
    let Some(entries) = self.cells.get_mut(&cell) else {
      return false;
    };
    let Some(slot) = entries.iter().position(|e| e.index == index) else {
      return false;
    };
    entries.swap_remove(slot);
    if entries.is_empty() {
      self.cells.remove(&cell);
    }
    true
  }
}

pub(crate) struct SpatialHash {
  inv_cell: DVec3,
  shards: Box<[Mutex<Shard>]>,
}

impl SpatialHash {
  pub fn new(cell_size: DVec3) -> Self {
    Self {
      inv_cell: cell_size.recip(),
      shards: (0..LOCK_SHARDS).map(|_| Mutex::new(Shard::default())).collect(),
    }
  }

  #[inline]
  pub fn cell_of(&self, position: DVec3) -> CellKey {
    (position * self.inv_cell).floor().as_i64vec3()
  }

  #[inline]
  fn shard_for(cell: CellKey) -> usize {
    let h = (cell.x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
      ^ (cell.y as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
      ^ (cell.z as u64).wrapping_mul(0x1656_67B1_9E37_79F9);
    shard_of(h ^ (h >> 29))
  }

  /// Lock every shard covering the neighbourhood of `center`.
  pub fn lock_neighborhood(&self, center: CellKey) -> Neighborhood<'_> {
    let cells = neighborhood_cells(center);
    let mut shard_ids: SmallVec<[usize; NEIGHBORHOOD_CELLS]> =
      cells.iter().map(|&c| Self::shard_for(c)).collect();
    shard_ids.sort_unstable();
    shard_ids.dedup();

    let guards = shard_ids
      .into_iter()
      .map(|id| (id, self.shards[id].lock()))
      .collect();

    Neighborhood {
      center,
      cells,
      guards,
    }
  }

  /// Re-index every node from scratch. Caller guarantees no concurrent
  /// neighbourhood is held.
  pub fn rebuild(&self, entries: impl IntoIterator<Item = CellEntry>) {
    for shard in self.shards.iter() {
      shard.lock().cells.clear();
    }
    for entry in entries {
      let cell = self.cell_of(entry.position);
      self.shards[Self::shard_for(cell)].lock().insert(cell, entry);
    }
  }

  /// Total number of indexed nodes.
  #[cfg(test)]
  pub fn len(&self) -> usize {
    self
      .shards
      .iter()
      .map(|s| s.lock().cells.values().map(|c| c.len()).sum::<usize>())
      .sum()
  }
}

fn neighborhood_cells(center: CellKey) -> [CellKey; NEIGHBORHOOD_CELLS] {
  let mut cells = [center; NEIGHBORHOOD_CELLS];
  let mut i = 0;
  for dz in -1i64..=1 {
    for dy in -1i64..=1 {
      for dx in -1i64..=1 {
        cells[i] = I64Vec3::new(
          center.x.wrapping_add(dx),
          center.y.wrapping_add(dy),
          center.z.wrapping_add(dz),
        );
        i += 1;
      }
    }
  }
  cells
}

/// Exclusive access to a 3×3×3 block of cells.
pub(crate) struct Neighborhood<'a> {
  center: CellKey,
  cells: [CellKey; NEIGHBORHOOD_CELLS],
  guards: SmallVec<[(usize, MutexGuard<'a, Shard>); 8]>,
}

impl Neighborhood<'_> {
  fn shard(&self, cell: CellKey) -> Option<&Shard> {
    let id = SpatialHash::shard_for(cell);
    self
      .guards
      .iter()
      .find(|(held, _)| *held == id)
      .map(|(_, guard)| &**guard)
  }

  fn shard_mut(&mut self, cell: CellKey) -> Option<&mut Shard> {
    let id = SpatialHash::shard_for(cell);
    self
      .guards
      .iter_mut()
      .find(|(held, _)| *held == id)
      .map(|(_, guard)| &mut **guard)
  }

  /// Lowest-index node within `tolerance` of `position`.
  pub fn find_first(&self, position: DVec3, tolerance: &FuseTolerance) -> Option<CellEntry> {
    let mut best: Option<CellEntry> = None;
    for &cell in self.cells.iter() {
      let Some(entries) = self.shard(cell).and_then(|s| s.cells.get(&cell)) else {
        continue;
      };
      for entry in entries {
        if !tolerance.matches(position - entry.position) {
          continue;
        }
        if best.map_or(true, |b| entry.index < b.index) {
          best = Some(*entry);
        }
      }
    }
    best
  }

  pub fn insert(&mut self, cell: CellKey, entry: CellEntry) {
    let cell = self.clamp(cell);
    if let Some(shard) = self.shard_mut(cell) {
      shard.insert(cell, entry);
    }
  }

  /// Move a node's entry after its centroid changed.
  ///
  /// The new centroid is a mean of points inside this neighbourhood, so the
  /// target cell is always held; rounding at the border is clamped inward.
  /// An entry that was clamped on an earlier move is not in `from_cell`;
  /// it is then looked up across the whole neighbourhood.
  pub fn relocate(&mut self, from: CellEntry, from_cell: CellKey, to: CellEntry, to_cell: CellKey) {
    let removed = self
      .shard_mut(from_cell)
      .is_some_and(|shard| shard.remove(from_cell, from.index));
    if !removed {
      for cell in self.cells {
        if self
          .shard_mut(cell)
          .is_some_and(|shard| shard.remove(cell, from.index))
        {
          break;
        }
      }
    }
    self.insert(to_cell, to);
  }

  fn clamp(&self, cell: CellKey) -> CellKey {
    cell.clamp(
      self.center.saturating_sub(I64Vec3::ONE),
      self.center.saturating_add(I64Vec3::ONE),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cell_of_floors_negative_coordinates() {
    let hash = SpatialHash::new(DVec3::splat(0.5));
    assert_eq!(hash.cell_of(DVec3::new(-0.1, 0.0, 1.2)), I64Vec3::new(-1, 0, 2));
  }

  #[test]
  fn neighborhood_has_unique_cells() {
    let cells = neighborhood_cells(I64Vec3::new(5, -3, 0));
    let mut sorted: Vec<_> = cells.iter().map(|c| c.to_array()).collect();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), NEIGHBORHOOD_CELLS);
  }

  #[test]
  fn find_first_prefers_lowest_index() {
    let hash = SpatialHash::new(DVec3::ONE);
    let tolerance = FuseTolerance::Isotropic(1.0);
    let center = hash.cell_of(DVec3::ZERO);
    let mut hood = hash.lock_neighborhood(center);
    hood.insert(
      hash.cell_of(DVec3::new(0.5, 0.0, 0.0)),
      CellEntry {
        index: 7,
        position: DVec3::new(0.5, 0.0, 0.0),
      },
    );
    hood.insert(
      hash.cell_of(DVec3::new(-0.5, 0.0, 0.0)),
      CellEntry {
        index: 2,
        position: DVec3::new(-0.5, 0.0, 0.0),
      },
    );
    assert_eq!(hood.find_first(DVec3::ZERO, &tolerance).map(|e| e.index), Some(2));
    assert_eq!(hood.find_first(DVec3::new(0.0, 5.0, 0.0), &tolerance), None);
  }

  #[test]
  fn relocate_moves_entry_between_cells() {
    let hash = SpatialHash::new(DVec3::ONE);
    let center = hash.cell_of(DVec3::ZERO);
    let from = CellEntry {
      index: 0,
      position: DVec3::new(0.9, 0.0, 0.0),
    };
    let to = CellEntry {
      index: 0,
      position: DVec3::new(1.1, 0.0, 0.0),
    };
    {
      let mut hood = hash.lock_neighborhood(center);
      hood.insert(hash.cell_of(from.position), from);
      hood.relocate(from, hash.cell_of(from.position), to, hash.cell_of(to.position));
    }
    assert_eq!(hash.len(), 1);
    let hood = hash.lock_neighborhood(hash.cell_of(to.position));
    let found = hood.find_first(to.position, &FuseTolerance::Isotropic(0.01));
    assert_eq!(found, Some(to));
  }

  #[test]
  fn rebuild_replaces_contents() {
    let hash = SpatialHash::new(DVec3::ONE);
    hash.rebuild((0..4).map(|i| CellEntry {
      index: i,
      position: DVec3::splat(i as f64 * 10.0),
    }));
    assert_eq!(hash.len(), 4);
    hash.rebuild(std::iter::empty());
    assert_eq!(hash.len(), 0);
  }
}
