//! Boot-time configuration errors.
//!
//! These are the only batch-fatal failures. Per-source problems (degenerate
//! input, empty geometry, failed writes) are logged and skipped instead.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
  #[error("{setting} must be a finite, non-negative distance (got {value})")]
  InvalidTolerance { setting: &'static str, value: f64 },

  #[error("{setting} must lie within [0, 90] degrees (got {value})")]
  AngleOutOfRange { setting: &'static str, value: f64 },

  #[error("min_angle ({min}) is greater than max_angle ({max})")]
  InvertedAngleWindow { min: f64, max: f64 },

  #[error("{setting}: minimum {min} is greater than maximum {max}")]
  InvertedCountBounds {
    setting: &'static str,
    min: usize,
    max: usize,
  },

  #[error("attribute name for {setting} is empty")]
  EmptyAttributeName { setting: &'static str },

  #[error("attribute name {name:?} for {setting} is not a valid identifier")]
  InvalidAttributeName { setting: &'static str, name: String },

  #[error("attribute name {name:?} is used more than once")]
  DuplicateAttributeName { name: String },
}

/// Why a compilation stopped without producing output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CancelReason {
  #[error("no valid source: every input had fewer than {min_points} points or no usable edges")]
  NoValidSources { min_points: usize },

  #[error("compilation was cancelled by the host")]
  Aborted,
}
