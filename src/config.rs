//! Run configuration
//!
//! Configuration is a single JSON document deserialized with serde. Every
//! field has a default so a missing config file still yields a usable (empty)
//! matrix, and unknown keys are rejected to catch typos early.

use crate::error::ConfigError;
use crate::error::Result;
use crate::scenario::Action;
use crate::scenario::Viewport;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;

/// A page in the test matrix: a navigable path plus a short display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
  pub path: String,
  pub name: String,
}

/// A responsive interaction test: a page driven through an ordered action
/// sequence at a dedicated viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsiveSpec {
  pub name: String,
  pub path: String,
  pub viewport: Viewport,
  #[serde(default)]
  pub actions: Vec<Action>,
}

/// Full run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Config {
  /// Root for accepted reference images
  pub baseline_dir: PathBuf,
  /// Root for the current run's captures
  pub current_dir: PathBuf,
  /// Root for generated diff visualizations
  pub diff_dir: PathBuf,
  /// Root for the JSON/HTML reports
  pub reports_dir: PathBuf,
  /// Aggregate diff-percentage gate (0-100). A scenario fails when its diff
  /// percentage exceeds this value.
  pub threshold: f64,
  /// Per-channel color-distance tolerance (0-1). Distinct from `threshold`:
  /// this decides whether an individual pixel counts as different at all.
  pub pixel_tolerance: f64,
  /// Count anti-aliased pixels as differences
  pub include_anti_aliased_pixels: bool,
  /// Resample mismatched dimensions to a common size instead of failing
  pub scale_to_same_size: bool,
  /// Maximum number of scenarios in flight
  pub max_concurrency: usize,
  pub viewports: Vec<Viewport>,
  pub themes: Vec<String>,
  pub pages: Vec<PageSpec>,
  pub components: Vec<String>,
  pub responsive_tests: Vec<ResponsiveSpec>,
  pub browsers: Vec<String>,
}

impl Default for Config {
  fn default() -> Self {
    Config {
      baseline_dir: PathBuf::from("screenshots/baseline"),
      current_dir: PathBuf::from("screenshots/current"),
      diff_dir: PathBuf::from("screenshots/diff"),
      reports_dir: PathBuf::from("reports"),
      threshold: 0.1,
      pixel_tolerance: 0.1,
      include_anti_aliased_pixels: false,
      scale_to_same_size: true,
      max_concurrency: num_cpus::get(),
      viewports: vec![Viewport::new("desktop", 1280, 800)],
      themes: vec!["light".to_string()],
      pages: Vec::new(),
      components: Vec::new(),
      responsive_tests: Vec::new(),
      browsers: Vec::new(),
    }
  }
}

impl Config {
  /// Load and validate a JSON config file.
  pub fn load(path: &Path) -> Result<Config> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
      path: path.display().to_string(),
      reason: e.to_string(),
    })?;
    let config: Config = serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
      path: path.display().to_string(),
      reason: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
  }

  /// Check value ranges that serde alone cannot enforce.
  pub fn validate(&self) -> Result<()> {
    if !(0.0..=100.0).contains(&self.threshold) || !self.threshold.is_finite() {
      return Err(
        ConfigError::InvalidValue {
          field: "threshold",
          message: format!("{} is not a percentage in 0-100", self.threshold),
        }
        .into(),
      );
    }
    if !(0.0..=1.0).contains(&self.pixel_tolerance) || !self.pixel_tolerance.is_finite() {
      return Err(
        ConfigError::InvalidValue {
          field: "pixelTolerance",
          message: format!("{} is not in 0-1", self.pixel_tolerance),
        }
        .into(),
      );
    }
    if self.max_concurrency == 0 {
      return Err(
        ConfigError::InvalidValue {
          field: "maxConcurrency",
          message: "must be at least 1".to_string(),
        }
        .into(),
      );
    }
    for viewport in self
      .viewports
      .iter()
      .chain(self.responsive_tests.iter().map(|t| &t.viewport))
    {
      if viewport.width == 0 || viewport.height == 0 {
        return Err(
          ConfigError::InvalidValue {
            field: "viewports",
            message: format!("viewport '{}' has a zero dimension", viewport.name),
          }
          .into(),
        );
      }
    }
    Ok(())
  }

  /// Viewport used for scenarios that do not carry their own (components and
  /// cross-browser checks): the first configured one.
  pub fn primary_viewport(&self) -> Viewport {
    self
      .viewports
      .first()
      .cloned()
      .unwrap_or_else(|| Viewport::new("desktop", 1280, 800))
  }
}
