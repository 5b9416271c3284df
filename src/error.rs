//! Error types for snapcheck
//!
//! The taxonomy mirrors the phases of a run:
//! - Capture errors (the injected renderer failed)
//! - Compare errors (decode failures, dimension mismatches)
//! - Baseline errors (lifecycle violations of the baseline store)
//! - Config errors (unreadable or invalid configuration)
//! - I/O errors (artifact and report persistence)
//!
//! Per-scenario capture/compare failures are caught by the runner and recorded
//! as that scenario's terminal error status; they never abort a run. Report
//! persistence failures are fatal after all scenario-level work is preserved.
//!
//! All errors use the `thiserror` crate for minimal boilerplate and proper
//! error trait implementations.

use thiserror::Error;

/// Result type alias for snapcheck operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for snapcheck.
#[derive(Error, Debug)]
pub enum Error {
  /// The injected renderer failed to produce a capture
  #[error("Capture error: {0}")]
  Capture(#[from] CaptureError),

  /// Image comparison error
  #[error("Compare error: {0}")]
  Compare(#[from] CompareError),

  /// Baseline lifecycle error
  #[error("Baseline error: {0}")]
  Baseline(#[from] BaselineError),

  /// Configuration error
  #[error("Config error: {0}")]
  Config(#[from] ConfigError),

  /// PNG encoding failed
  #[error("PNG encode failed: {0}")]
  Encode(String),

  /// Report serialization failed
  #[error("Report error: {0}")]
  Report(String),

  /// I/O error (artifact reading/writing, report persistence)
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  /// Generic error for miscellaneous issues
  #[error("{0}")]
  Other(String),
}

/// Errors raised by a [`crate::renderer::Renderer`] while capturing a scenario.
///
/// These are always scenario-scoped: the runner records them as the scenario's
/// terminal status and moves on.
#[derive(Error, Debug, Clone)]
pub enum CaptureError {
  /// Navigation to the capture target failed
  #[error("Navigation failed for {target}: {reason}")]
  Navigation { target: String, reason: String },

  /// The renderer did not produce a frame in time
  #[error("Timed out capturing {target} after {timeout_ms}ms")]
  Timeout { target: String, timeout_ms: u64 },

  /// The capture target does not exist (unknown component, missing page)
  #[error("Capture target not found: {target}")]
  MissingTarget { target: String },

  /// Renderer backend failure not covered by the other variants
  #[error("Renderer failure: {reason}")]
  Backend { reason: String },
}

/// Errors raised while comparing two raster buffers.
#[derive(Error, Debug, Clone)]
pub enum CompareError {
  /// The inputs have different dimensions and size normalization is disabled
  #[error(
    "Dimension mismatch: baseline {baseline_width}x{baseline_height}, \
     current {current_width}x{current_height}"
  )]
  DimensionMismatch {
    baseline_width: u32,
    baseline_height: u32,
    current_width: u32,
    current_height: u32,
  },

  /// A stored artifact could not be decoded
  #[error("Failed to decode {role} image: {reason}")]
  Decode { role: &'static str, reason: String },
}

/// Errors raised by the baseline store.
#[derive(Error, Debug, Clone)]
pub enum BaselineError {
  /// `read` was called for a scenario with no stored baseline
  #[error("No baseline stored for {key}")]
  Missing { key: String },

  /// `create` was called but a baseline already exists for the key
  #[error("Baseline already exists for {key}")]
  AlreadyExists { key: String },

  /// `overwrite` was called on a store opened without update mode
  #[error("Overwriting the baseline for {key} requires update mode")]
  UpdateRequired { key: String },
}

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
  /// The config file could not be read
  #[error("Failed to read config {path}: {reason}")]
  Read { path: String, reason: String },

  /// The config file is not valid JSON or has the wrong shape
  #[error("Invalid config {path}: {reason}")]
  Parse { path: String, reason: String },

  /// A config value is out of range
  #[error("Invalid value for {field}: {message}")]
  InvalidValue { field: &'static str, message: String },
}
