//! Settings for fusion, intersection resolution and cluster output.
//!
//! Every settings struct has a `Default` and `with_*` builders, and derives
//! serde so hosts can load it from their own config files.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::constants::{
  CELL_MARGIN, DEFAULT_EDGE_EDGE_TOLERANCE, DEFAULT_FUSE_TOLERANCE, DEFAULT_POINT_EDGE_TOLERANCE,
  MIN_CELL_SIZE,
};
use crate::error::ConfigError;

// =============================================================================
// Fuse (point-point)
// =============================================================================

/// Distance test used to decide whether two points are the same location.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuseTolerance {
  /// Euclidean distance, `|a - b| <= r`.
  Isotropic(f64),
  /// Independent per-axis test, `|a.x - b.x| <= t.x` and so on.
  PerAxis(DVec3),
}

impl FuseTolerance {
  /// True if `delta` (difference of two positions) is within tolerance.
  /// The boundary itself counts as a match.
  #[inline]
  pub fn matches(&self, delta: DVec3) -> bool {
    match *self {
      FuseTolerance::Isotropic(radius) => delta.length_squared() <= radius * radius,
      FuseTolerance::PerAxis(t) => delta.abs().cmple(t).all(),
    }
  }

  /// Spatial hash cell edge per axis. Strictly wider than the tolerance.
  pub fn cell_size(&self) -> DVec3 {
    let reach = match *self {
      FuseTolerance::Isotropic(radius) => DVec3::splat(radius.max(MIN_CELL_SIZE)),
      FuseTolerance::PerAxis(t) => t.max(DVec3::splat(MIN_CELL_SIZE)),
    };
    reach * (1.0 + CELL_MARGIN)
  }

  /// Largest per-axis reach of the tolerance.
  pub fn max_extent(&self) -> f64 {
    match *self {
      FuseTolerance::Isotropic(radius) => radius,
      FuseTolerance::PerAxis(t) => t.max_element(),
    }
  }

  fn validate(&self) -> Result<(), ConfigError> {
    match *self {
      FuseTolerance::Isotropic(radius) => check_distance("fuse.tolerance", radius),
      FuseTolerance::PerAxis(t) => {
        check_distance("fuse.tolerance.x", t.x)?;
        check_distance("fuse.tolerance.y", t.y)?;
        check_distance("fuse.tolerance.z", t.z)
      }
    }
  }
}

impl Default for FuseTolerance {
  fn default() -> Self {
    FuseTolerance::Isotropic(DEFAULT_FUSE_TOLERANCE)
  }
}

/// Point-point fusion settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuseSettings {
  pub tolerance: FuseTolerance,
}

impl FuseSettings {
  pub fn new(tolerance: FuseTolerance) -> Self {
    Self { tolerance }
  }

  pub fn isotropic(radius: f64) -> Self {
    Self::new(FuseTolerance::Isotropic(radius))
  }

  pub fn per_axis(tolerance: DVec3) -> Self {
    Self::new(FuseTolerance::PerAxis(tolerance))
  }
}

// =============================================================================
// Point-edge
// =============================================================================

/// Settings for splitting edges at nodes lying on them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointEdgeSettings {
  /// Maximum perpendicular distance between a node and an edge.
  pub tolerance: f64,
  /// Allow nodes to split edges coming from the same source.
  pub enable_self_intersection: bool,
}

impl PointEdgeSettings {
  #[inline]
  pub fn tolerance_sq(&self) -> f64 {
    self.tolerance * self.tolerance
  }

  pub fn with_tolerance(mut self, tolerance: f64) -> Self {
    self.tolerance = tolerance;
    self
  }

  pub fn with_self_intersection(mut self, enable: bool) -> Self {
    self.enable_self_intersection = enable;
    self
  }
}

impl Default for PointEdgeSettings {
  fn default() -> Self {
    Self {
      tolerance: DEFAULT_POINT_EDGE_TOLERANCE,
      enable_self_intersection: true,
    }
  }
}

// =============================================================================
// Edge-edge
// =============================================================================

/// Accepted range of `|dot(dir_a, dir_b)|` for two unit edge directions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DotWindow {
  pub min_dot: f64,
  pub max_dot: f64,
}

impl DotWindow {
  #[inline]
  pub fn accepts(&self, abs_dot: f64) -> bool {
    abs_dot >= self.min_dot && abs_dot <= self.max_dot
  }
}

/// Settings for splitting crossing edges.
///
/// Angles are in degrees, measured between the two undirected edge lines
/// (so always within `[0, 90]`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeEdgeSettings {
  /// Maximum gap between the two segments at their closest approach.
  pub tolerance: f64,
  pub use_min_angle: bool,
  pub min_angle: f64,
  pub use_max_angle: bool,
  pub max_angle: f64,
  /// Accept crossings that land exactly on a segment endpoint.
  pub allow_endpoint_contact: bool,
  /// Allow edges from the same source to split each other.
  pub enable_self_intersection: bool,
}

impl EdgeEdgeSettings {
  #[inline]
  pub fn tolerance_sq(&self) -> f64 {
    self.tolerance * self.tolerance
  }

  /// Precompute the cosine window once so scanners never call trig.
  ///
  /// A small angle means a large `|dot|`, so `min_angle` bounds the upper
  /// end of the window and `max_angle` the lower end.
  pub fn compute_dot(&self) -> DotWindow {
    let max_dot = if self.use_min_angle {
      self.min_angle.to_radians().cos()
    } else {
      1.0
    };
    let min_dot = if self.use_max_angle {
      self.max_angle.to_radians().cos()
    } else {
      0.0
    };
    DotWindow { min_dot, max_dot }
  }

  pub fn with_tolerance(mut self, tolerance: f64) -> Self {
    self.tolerance = tolerance;
    self
  }

  pub fn with_min_angle(mut self, degrees: f64) -> Self {
    self.use_min_angle = true;
    self.min_angle = degrees;
    self
  }

  pub fn with_max_angle(mut self, degrees: f64) -> Self {
    self.use_max_angle = true;
    self.max_angle = degrees;
    self
  }

  pub fn with_endpoint_contact(mut self, allow: bool) -> Self {
    self.allow_endpoint_contact = allow;
    self
  }

  pub fn with_self_intersection(mut self, enable: bool) -> Self {
    self.enable_self_intersection = enable;
    self
  }

  fn validate(&self) -> Result<(), ConfigError> {
    check_distance("edge_edge.tolerance", self.tolerance)?;
    check_angle("edge_edge.min_angle", self.min_angle)?;
    check_angle("edge_edge.max_angle", self.max_angle)?;
    if self.use_min_angle && self.use_max_angle && self.min_angle > self.max_angle {
      return Err(ConfigError::InvertedAngleWindow {
        min: self.min_angle,
        max: self.max_angle,
      });
    }
    Ok(())
  }
}

impl Default for EdgeEdgeSettings {
  fn default() -> Self {
    Self {
      tolerance: DEFAULT_EDGE_EDGE_TOLERANCE,
      use_min_angle: false,
      min_angle: 0.0,
      use_max_angle: false,
      max_angle: 90.0,
      allow_endpoint_contact: false,
      enable_self_intersection: true,
    }
  }
}

// =============================================================================
// Output
// =============================================================================

/// How compiled graphs are staged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOutputSettings {
  /// Emit one cluster per connected component instead of a single cluster.
  pub per_component: bool,
  /// Components with fewer nodes are dropped.
  pub min_vtx_count: usize,
  /// Components with more nodes are dropped.
  pub max_vtx_count: Option<usize>,
  /// Components with fewer edges are dropped.
  pub min_edge_count: usize,
  /// Components with more edges are dropped.
  pub max_edge_count: Option<usize>,
}

impl ClusterOutputSettings {
  /// True if a component of this size survives the filters.
  pub fn accepts(&self, vtx_count: usize, edge_count: usize) -> bool {
    vtx_count >= self.min_vtx_count
      && edge_count >= self.min_edge_count
      && self.max_vtx_count.map_or(true, |max| vtx_count <= max)
      && self.max_edge_count.map_or(true, |max| edge_count <= max)
  }

  fn validate(&self) -> Result<(), ConfigError> {
    if let Some(max) = self.max_vtx_count {
      if self.min_vtx_count > max {
        return Err(ConfigError::InvertedCountBounds {
          setting: "output.vtx_count",
          min: self.min_vtx_count,
          max,
        });
      }
    }
    if let Some(max) = self.max_edge_count {
      if self.min_edge_count > max {
        return Err(ConfigError::InvertedCountBounds {
          setting: "output.edge_count",
          min: self.min_edge_count,
          max,
        });
      }
    }
    Ok(())
  }
}

/// One optional attribute written alongside the compiled cluster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeOutput {
  pub enabled: bool,
  pub name: String,
}

impl AttributeOutput {
  fn new(name: &str) -> Self {
    Self {
      enabled: false,
      name: name.to_string(),
    }
  }

  pub fn enabled(mut self) -> Self {
    self.enabled = true;
    self
  }
}

/// Which graph metadata attributes are written, and under what names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSettings {
  /// Node: number of points fused into it.
  pub node_union_size: AttributeOutput,
  /// Node: more than one point fused into it.
  pub node_is_union: AttributeOutput,
  /// Node: split at least one edge it was lying on.
  pub node_is_intersector: AttributeOutput,
  /// Node: created at an edge-edge crossing.
  pub node_is_crossing: AttributeOutput,
  /// Edge: number of duplicate insertions collapsed into it.
  pub edge_union_size: AttributeOutput,
  /// Edge: more than one insertion collapsed into it.
  pub edge_is_union: AttributeOutput,
  /// Edge: Euclidean length.
  pub edge_length: AttributeOutput,
}

impl MetadataSettings {
  /// Every output with a static label used in error messages.
  pub fn outputs(&self) -> [(&'static str, &AttributeOutput); 7] {
    [
      ("metadata.node_union_size", &self.node_union_size),
      ("metadata.node_is_union", &self.node_is_union),
      ("metadata.node_is_intersector", &self.node_is_intersector),
      ("metadata.node_is_crossing", &self.node_is_crossing),
      ("metadata.edge_union_size", &self.edge_union_size),
      ("metadata.edge_is_union", &self.edge_is_union),
      ("metadata.edge_length", &self.edge_length),
    ]
  }

  /// Enable every attribute with its default name.
  pub fn all() -> Self {
    let mut settings = Self::default();
    for output in [
      &mut settings.node_union_size,
      &mut settings.node_is_union,
      &mut settings.node_is_intersector,
      &mut settings.node_is_crossing,
      &mut settings.edge_union_size,
      &mut settings.edge_is_union,
      &mut settings.edge_length,
    ] {
      output.enabled = true;
    }
    settings
  }

  fn validate(&self) -> Result<(), ConfigError> {
    let mut seen: Vec<&str> = Vec::new();
    for (setting, output) in self.outputs() {
      if !output.enabled {
        continue;
      }
      if output.name.is_empty() {
        return Err(ConfigError::EmptyAttributeName { setting });
      }
      if !is_valid_identifier(&output.name) {
        return Err(ConfigError::InvalidAttributeName {
          setting,
          name: output.name.clone(),
        });
      }
      if seen.contains(&output.name.as_str()) {
        return Err(ConfigError::DuplicateAttributeName {
          name: output.name.clone(),
        });
      }
      seen.push(&output.name);
    }
    Ok(())
  }
}

impl Default for MetadataSettings {
  fn default() -> Self {
    Self {
      node_union_size: AttributeOutput::new("UnionSize"),
      node_is_union: AttributeOutput::new("IsUnion"),
      node_is_intersector: AttributeOutput::new("IsIntersector"),
      node_is_crossing: AttributeOutput::new("IsCrossing"),
      edge_union_size: AttributeOutput::new("EdgeUnionSize"),
      edge_is_union: AttributeOutput::new("IsEdgeUnion"),
      edge_length: AttributeOutput::new("EdgeLength"),
    }
  }
}

// =============================================================================
// Compiler
// =============================================================================

/// Full settings for one compilation batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
  pub fuse: FuseSettings,
  pub do_point_edge: bool,
  pub point_edge: PointEdgeSettings,
  pub do_edge_edge: bool,
  pub edge_edge: EdgeEdgeSettings,
  pub output: ClusterOutputSettings,
  pub metadata: MetadataSettings,
}

impl CompilerSettings {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_fuse(mut self, fuse: FuseSettings) -> Self {
    self.fuse = fuse;
    self
  }

  pub fn with_point_edge(mut self, settings: PointEdgeSettings) -> Self {
    self.do_point_edge = true;
    self.point_edge = settings;
    self
  }

  pub fn with_edge_edge(mut self, settings: EdgeEdgeSettings) -> Self {
    self.do_edge_edge = true;
    self.edge_edge = settings;
    self
  }

  pub fn with_output(mut self, output: ClusterOutputSettings) -> Self {
    self.output = output;
    self
  }

  pub fn with_metadata(mut self, metadata: MetadataSettings) -> Self {
    self.metadata = metadata;
    self
  }

  /// Boot-time validation. Any error here aborts the whole batch.
  pub fn validate(&self) -> Result<(), ConfigError> {
    self.fuse.tolerance.validate()?;
    if self.do_point_edge {
      check_distance("point_edge.tolerance", self.point_edge.tolerance)?;
    }
    if self.do_edge_edge {
      self.edge_edge.validate()?;
    }
    self.output.validate()?;
    self.metadata.validate()
  }
}

fn check_distance(setting: &'static str, value: f64) -> Result<(), ConfigError> {
  if value.is_finite() && value >= 0.0 {
    Ok(())
  } else {
    Err(ConfigError::InvalidTolerance { setting, value })
  }
}

fn check_angle(setting: &'static str, value: f64) -> Result<(), ConfigError> {
  if (0.0..=90.0).contains(&value) {
    Ok(())
  } else {
    Err(ConfigError::AngleOutOfRange { setting, value })
  }
}

fn is_valid_identifier(name: &str) -> bool {
  let mut chars = name.chars();
  match chars.next() {
    Some(first) if first.is_ascii_alphabetic() || first == '_' => {
      chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
    _ => false,
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
