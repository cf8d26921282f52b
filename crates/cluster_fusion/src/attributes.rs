//! Per-node and per-edge attribute columns written next to a cluster.
//!
//! Geometry only ever needs a handful of value kinds, so columns are a
//! closed set of variants rather than runtime type dispatch.

use glam::DVec3;
use serde::Serialize;

/// A single attribute value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
  Double(f64),
  Vector(DVec3),
  Bool(bool),
}

/// A dense column, one entry per node or per edge.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum AttributeColumn {
  Double(Vec<f64>),
  Vector(Vec<DVec3>),
  Bool(Vec<bool>),
}

impl AttributeColumn {
  pub fn len(&self) -> usize {
    match self {
      AttributeColumn::Double(values) => values.len(),
      AttributeColumn::Vector(values) => values.len(),
      AttributeColumn::Bool(values) => values.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn get(&self, index: usize) -> Option<AttributeValue> {
    match self {
      AttributeColumn::Double(values) => values.get(index).copied().map(AttributeValue::Double),
      AttributeColumn::Vector(values) => values.get(index).copied().map(AttributeValue::Vector),
      AttributeColumn::Bool(values) => values.get(index).copied().map(AttributeValue::Bool),
    }
  }

  /// Keep only the entries selected by `indices`, in that order.
  pub fn gather(&self, indices: &[usize]) -> Self {
    match self {
      AttributeColumn::Double(values) => {
        AttributeColumn::Double(indices.iter().map(|&i| values[i]).collect())
      }
      AttributeColumn::Vector(values) => {
        AttributeColumn::Vector(indices.iter().map(|&i| values[i]).collect())
      }
      AttributeColumn::Bool(values) => {
        AttributeColumn::Bool(indices.iter().map(|&i| values[i]).collect())
      }
    }
  }
}

/// Named columns sharing the same row count.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AttributeTable {
  rows: usize,
  columns: Vec<(String, AttributeColumn)>,
}

impl AttributeTable {
  pub fn new(rows: usize) -> Self {
    Self {
      rows,
      columns: Vec::new(),
    }
  }

  /// Add a column. Returns false (and drops the column) if its length does
  /// not match the table or the name is already taken.
  pub fn insert(&mut self, name: impl Into<String>, column: AttributeColumn) -> bool {
    let name = name.into();
    if column.len() != self.rows || self.get(&name).is_some() {
      return false;
    }
    self.columns.push((name, column));
    true
  }

  pub fn get(&self, name: &str) -> Option<&AttributeColumn> {
    self
      .columns
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, column)| column)
  }

  pub fn value(&self, name: &str, row: usize) -> Option<AttributeValue> {
    self.get(name).and_then(|column| column.get(row))
  }

  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn len(&self) -> usize {
    self.columns.len()
  }

  pub fn is_empty(&self) -> bool {
    self.columns.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeColumn)> {
    self.columns.iter().map(|(n, c)| (n.as_str(), c))
  }

  /// Row-subset of every column (used when splitting into components).
  pub fn gather(&self, indices: &[usize]) -> Self {
    Self {
      rows: indices.len(),
      columns: self
        .columns
        .iter()
        .map(|(name, column)| (name.clone(), column.gather(indices)))
        .collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn insert_rejects_length_mismatch() {
    let mut table = AttributeTable::new(2);
    assert!(table.insert("Len", AttributeColumn::Double(vec![1.0, 2.0])));
    assert!(!table.insert("Flags", AttributeColumn::Bool(vec![true])));
    assert_eq!(table.len(), 1);
  }

  #[test]
  fn insert_rejects_duplicate_name() {
    let mut table = AttributeTable::new(1);
    assert!(table.insert("A", AttributeColumn::Bool(vec![true])));
    assert!(!table.insert("A", AttributeColumn::Double(vec![1.0])));
  }

  #[test]
  fn value_lookup() {
    let mut table = AttributeTable::new(2);
    table.insert("Pos", AttributeColumn::Vector(vec![DVec3::X, DVec3::Y]));
    assert_eq!(table.value("Pos", 1), Some(AttributeValue::Vector(DVec3::Y)));
    assert_eq!(table.value("Pos", 2), None);
    assert_eq!(table.value("Missing", 0), None);
  }

  #[test]
  fn gather_reorders_rows() {
    let mut table = AttributeTable::new(3);
    table.insert("N", AttributeColumn::Double(vec![10.0, 20.0, 30.0]));
    let sub = table.gather(&[2, 0]);
    assert_eq!(sub.rows(), 2);
    assert_eq!(sub.get("N"), Some(&AttributeColumn::Double(vec![30.0, 10.0])));
  }
}
