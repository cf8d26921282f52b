use super::*;

// =========================================================================
// FuseTolerance
// =========================================================================

/// The tolerance boundary itself fuses.
#[test]
fn test_isotropic_boundary_matches() {
  let tolerance = FuseTolerance::Isotropic(0.5);
  assert!(tolerance.matches(DVec3::new(0.5, 0.0, 0.0)));
  assert!(!tolerance.matches(DVec3::new(0.5 + 1e-9, 0.0, 0.0)));
}

/// Per-axis tolerance tests each axis on its own.
#[test]
fn test_per_axis_matches_independently() {
  let tolerance = FuseTolerance::PerAxis(DVec3::new(1.0, 0.1, 0.1));
  assert!(tolerance.matches(DVec3::new(-0.9, 0.05, 0.0)));
  assert!(!tolerance.matches(DVec3::new(0.0, 0.2, 0.0)));
  // Diagonal that exceeds the isotropic radius but not any axis.
  assert!(tolerance.matches(DVec3::new(1.0, 0.1, 0.1)));
}

#[test]
fn test_cell_size_never_below_minimum() {
  let widen = 1.0 + CELL_MARGIN;
  let zero = FuseTolerance::Isotropic(0.0);
  assert_eq!(zero.cell_size(), DVec3::splat(MIN_CELL_SIZE) * widen);

  let per_axis = FuseTolerance::PerAxis(DVec3::new(2.0, 0.0, 0.5));
  assert_eq!(per_axis.cell_size(), DVec3::new(2.0, MIN_CELL_SIZE, 0.5) * widen);
  assert_eq!(per_axis.max_extent(), 2.0);
}

/// Cells are strictly wider than the tolerance on every axis.
#[test]
fn test_cell_size_exceeds_tolerance() {
  let isotropic = FuseTolerance::Isotropic(0.7);
  assert!(isotropic.cell_size().cmpgt(DVec3::splat(0.7)).all());

  let per_axis = FuseTolerance::PerAxis(DVec3::new(0.03, 4.0, 0.5));
  assert!(per_axis.cell_size().cmpgt(DVec3::new(0.03, 4.0, 0.5)).all());
}

// =========================================================================
// Edge-edge angle window
// =========================================================================

#[test]
fn test_default_dot_window_accepts_everything() {
  let window = EdgeEdgeSettings::default().compute_dot();
  assert_eq!(window.min_dot, 0.0);
  assert_eq!(window.max_dot, 1.0);
  assert!(window.accepts(0.0));
  assert!(window.accepts(1.0));
}

/// Small angles have large dot products, so min_angle caps the window.
#[test]
fn test_min_angle_rejects_shallow_crossings() {
  let window = EdgeEdgeSettings::default().with_min_angle(20.0).compute_dot();
  let shallow = 10.0_f64.to_radians().cos();
  let steep = 45.0_f64.to_radians().cos();
  assert!(!window.accepts(shallow));
  assert!(window.accepts(steep));
}

#[test]
fn test_max_angle_rejects_steep_crossings() {
  let window = EdgeEdgeSettings::default().with_max_angle(60.0).compute_dot();
  assert!(!window.accepts(0.0)); // 90 degrees
  assert!(window.accepts(30.0_f64.to_radians().cos()));
}

// =========================================================================
// Output filters
// =========================================================================

#[test]
fn test_output_accepts_within_bounds() {
  let output = ClusterOutputSettings {
    per_component: true,
    min_vtx_count: 3,
    max_vtx_count: Some(10),
    min_edge_count: 2,
    max_edge_count: None,
  };
  assert!(output.accepts(3, 2));
  assert!(output.accepts(10, 1000));
  assert!(!output.accepts(2, 5));
  assert!(!output.accepts(11, 5));
  assert!(!output.accepts(5, 1));
}

// =========================================================================
// Validation
// =========================================================================

#[test]
fn test_default_settings_are_valid() {
  assert_eq!(CompilerSettings::default().validate(), Ok(()));
}

#[test]
fn test_negative_fuse_tolerance_is_fatal() {
  let settings = CompilerSettings::new().with_fuse(FuseSettings::isotropic(-1.0));
  assert!(matches!(
    settings.validate(),
    Err(ConfigError::InvalidTolerance { .. })
  ));
}

#[test]
fn test_nan_per_axis_tolerance_is_fatal() {
  let settings =
    CompilerSettings::new().with_fuse(FuseSettings::per_axis(DVec3::new(0.1, f64::NAN, 0.1)));
  assert!(settings.validate().is_err());
}

#[test]
fn test_inverted_angle_window_is_fatal() {
  let settings = CompilerSettings::new().with_edge_edge(
    EdgeEdgeSettings::default()
      .with_min_angle(60.0)
      .with_max_angle(30.0),
  );
  assert_eq!(
    settings.validate(),
    Err(ConfigError::InvertedAngleWindow {
      min: 60.0,
      max: 30.0
    })
  );
}

#[test]
fn test_angle_out_of_range_is_fatal() {
  let settings =
    CompilerSettings::new().with_edge_edge(EdgeEdgeSettings::default().with_max_angle(120.0));
  assert!(matches!(
    settings.validate(),
    Err(ConfigError::AngleOutOfRange { .. })
  ));
}

/// Disabled resolvers are not validated.
#[test]
fn test_disabled_point_edge_skips_validation() {
  let mut settings = CompilerSettings::new();
  settings.point_edge.tolerance = -5.0;
  assert_eq!(settings.validate(), Ok(()));
  settings.do_point_edge = true;
  assert!(settings.validate().is_err());
}

#[test]
fn test_empty_attribute_name_is_fatal() {
  let mut metadata = MetadataSettings::all();
  metadata.edge_length.name.clear();
  let settings = CompilerSettings::new().with_metadata(metadata);
  assert_eq!(
    settings.validate(),
    Err(ConfigError::EmptyAttributeName {
      setting: "metadata.edge_length"
    })
  );
}

#[test]
fn test_invalid_attribute_name_is_fatal() {
  let mut metadata = MetadataSettings::default();
  metadata.node_is_union = AttributeOutput {
    enabled: true,
    name: "1Bad Name".to_string(),
  };
  let settings = CompilerSettings::new().with_metadata(metadata);
  assert!(matches!(
    settings.validate(),
    Err(ConfigError::InvalidAttributeName { .. })
  ));
}

#[test]
fn test_duplicate_attribute_name_is_fatal() {
  let mut metadata = MetadataSettings::all();
  metadata.edge_is_union.name = "IsUnion".to_string();
  let settings = CompilerSettings::new().with_metadata(metadata);
  assert_eq!(
    settings.validate(),
    Err(ConfigError::DuplicateAttributeName {
      name: "IsUnion".to_string()
    })
  );
}

/// Disabled attributes may carry any name.
#[test]
fn test_disabled_attribute_name_is_ignored() {
  let mut metadata = MetadataSettings::default();
  metadata.node_is_crossing.name.clear();
  assert_eq!(CompilerSettings::new().with_metadata(metadata).validate(), Ok(()));
}

#[test]
fn test_inverted_cluster_bounds_are_fatal() {
  let settings = CompilerSettings::new().with_output(ClusterOutputSettings {
    min_vtx_count: 5,
    max_vtx_count: Some(2),
    ..Default::default()
  });
  assert!(matches!(
    settings.validate(),
    Err(ConfigError::InvertedCountBounds { .. })
  ));
}
