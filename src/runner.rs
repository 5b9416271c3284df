//! Concurrent scenario driver and result aggregation
//!
//! Each scenario runs capture -> baseline lookup -> compare (or baseline
//! creation) to a terminal status. Scenarios are independent: a capture or
//! compare failure is recorded as that scenario's error status and the run
//! continues. Counters are atomic and the ordered result list sits behind a
//! single mutex, so concurrent completions cannot race-corrupt the summary.
//!
//! Execution uses a rayon pool bounded at the configured concurrency; capture
//! is I/O-bound against the injected renderer, comparison is CPU-bound. An
//! abort flag stops scheduling new scenarios while letting started ones finish
//! and record.

use crate::baseline::BaselineStore;
use crate::compare::compare;
use crate::compare::CompareOptions;
use crate::config::Config;
use crate::error::Error;
use crate::error::Result;
use crate::image_io::encode_png;
use crate::renderer::Renderer;
use crate::report::path_for_report;
use crate::scenario::Scenario;
use image::RgbaImage;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Instant;

/// Terminal state of one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
  /// Compared within the aggregate threshold
  Passed,
  /// Compared beyond the aggregate threshold
  Failed,
  /// No prior baseline (or update mode): capture accepted as the baseline
  BaselineCreated,
  /// Capture or comparison failed
  Error,
}

impl ScenarioStatus {
  /// Baseline creation counts as a pass.
  pub fn is_pass(&self) -> bool {
    matches!(self, ScenarioStatus::Passed | ScenarioStatus::BaselineCreated)
  }

  pub fn label(&self) -> &'static str {
    match self {
      ScenarioStatus::Passed => "pass",
      ScenarioStatus::Failed => "fail",
      ScenarioStatus::BaselineCreated => "new",
      ScenarioStatus::Error => "error",
    }
  }
}

/// Per-scenario verdict recorded into the run summary and reports.
///
/// Artifact paths are relative to the reports root so the report tree stays
/// portable when copied as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
  pub key: String,
  pub category: String,
  pub status: ScenarioStatus,
  pub diff_pixels: u64,
  pub total_pixels: u64,
  pub diff_percent: f64,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub baseline: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub current: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub diff: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub error: Option<String>,
}

impl ScenarioResult {
  fn pending(scenario: &Scenario) -> Self {
    ScenarioResult {
      key: scenario.key(),
      category: scenario.category(),
      status: ScenarioStatus::Error,
      diff_pixels: 0,
      total_pixels: 0,
      diff_percent: 0.0,
      baseline: None,
      current: None,
      diff: None,
      error: None,
    }
  }
}

/// Aggregate outcome of a run.
///
/// `total == passed + failed` at completion; errors count as failed.
#[derive(Debug, Clone)]
pub struct RunSummary {
  pub total: usize,
  pub passed: usize,
  pub failed: usize,
  pub duration_ms: u64,
  pub results: Vec<ScenarioResult>,
}

impl RunSummary {
  pub fn pass_rate(&self) -> f64 {
    if self.total == 0 {
      100.0
    } else {
      (self.passed as f64 / self.total as f64) * 100.0
    }
  }
}

/// Thread-safe accumulation point for scenario outcomes.
struct ResultAggregator {
  passed: AtomicUsize,
  failed: AtomicUsize,
  results: Mutex<Vec<(usize, ScenarioResult)>>,
}

impl ResultAggregator {
  fn new() -> Self {
    ResultAggregator {
      passed: AtomicUsize::new(0),
      failed: AtomicUsize::new(0),
      results: Mutex::new(Vec::new()),
    }
  }

  fn record(&self, index: usize, result: ScenarioResult) {
    if result.status.is_pass() {
      self.passed.fetch_add(1, Ordering::SeqCst);
    } else {
      self.failed.fetch_add(1, Ordering::SeqCst);
    }
    self.results.lock().unwrap().push((index, result));
  }

  /// Fold into a summary, restoring matrix order so report diffs between runs
  /// stay meaningful.
  fn finish(self, duration_ms: u64) -> RunSummary {
    let mut indexed = self.results.into_inner().unwrap();
    indexed.sort_by_key(|(index, _)| *index);
    let passed = self.passed.load(Ordering::SeqCst);
    let failed = self.failed.load(Ordering::SeqCst);
    RunSummary {
      total: passed + failed,
      passed,
      failed,
      duration_ms,
      results: indexed.into_iter().map(|(_, result)| result).collect(),
    }
  }
}

/// Drives a scenario matrix to completion against an injected renderer.
pub struct Runner<'a> {
  config: &'a Config,
  renderer: &'a dyn Renderer,
  update_baseline: bool,
  abort: Arc<AtomicBool>,
}

impl<'a> Runner<'a> {
  pub fn new(config: &'a Config, renderer: &'a dyn Renderer) -> Self {
    Runner {
      config,
      renderer,
      update_baseline: false,
      abort: Arc::new(AtomicBool::new(false)),
    }
  }

  /// Overwrite baselines from this run's captures; every scenario passes.
  pub fn with_update_baseline(mut self, update: bool) -> Self {
    self.update_baseline = update;
    self
  }

  /// Handle for external cancellation. Setting it stops scheduling new
  /// scenarios; started ones finish and record.
  pub fn abort_handle(&self) -> Arc<AtomicBool> {
    Arc::clone(&self.abort)
  }

  /// Run every scenario to a terminal state and fold the summary.
  pub fn run(&self, scenarios: &[Scenario]) -> Result<RunSummary> {
    fs::create_dir_all(&self.config.current_dir)?;
    fs::create_dir_all(&self.config.diff_dir)?;

    let store = BaselineStore::new(&self.config.baseline_dir, self.update_baseline);
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(self.config.max_concurrency.max(1))
      .build()
      .map_err(|e| Error::Other(format!("failed to build worker pool: {e}")))?;

    let aggregator = ResultAggregator::new();
    let start = Instant::now();

    pool.scope(|s| {
      for (index, scenario) in scenarios.iter().enumerate() {
        if self.abort.load(Ordering::SeqCst) {
          break;
        }
        let aggregator = &aggregator;
        let store = &store;
        s.spawn(move |_| {
          // Queued but not yet started when the abort landed: skip.
          if self.abort.load(Ordering::SeqCst) {
            return;
          }
          let result = self.run_scenario(scenario, store);
          match result.status {
            ScenarioStatus::Error => {
              println!(
                "  {:5} {} : {}",
                result.status.label(),
                result.key,
                result.error.as_deref().unwrap_or("unknown error")
              );
            }
            ScenarioStatus::BaselineCreated => {
              println!("  {:5} {} (baseline written)", result.status.label(), result.key);
            }
            _ => {
              println!(
                "  {:5} {} ({:.4}% diff, {} of {} px)",
                result.status.label(),
                result.key,
                result.diff_percent,
                result.diff_pixels,
                result.total_pixels
              );
            }
          }
          aggregator.record(index, result);
        });
      }
    });

    Ok(aggregator.finish(start.elapsed().as_millis() as u64))
  }

  fn run_scenario(&self, scenario: &Scenario, store: &BaselineStore) -> ScenarioResult {
    let mut result = ScenarioResult::pending(scenario);
    if let Err(e) = self.capture_and_compare(scenario, store, &mut result) {
      result.status = ScenarioStatus::Error;
      result.error = Some(e.to_string());
    }
    result
  }

  fn capture_and_compare(
    &self,
    scenario: &Scenario,
    store: &BaselineStore,
    result: &mut ScenarioResult,
  ) -> Result<()> {
    let capture = self.renderer.capture(
      &scenario.target(),
      scenario.viewport(),
      scenario.theme(),
      scenario.actions(),
    )?;
    result.total_pixels = capture.width() as u64 * capture.height() as u64;

    let current_path = artifact_path(&self.config.current_dir, scenario);
    write_png(&current_path, &capture)?;
    result.current = Some(self.report_relative(&current_path));

    if self.update_baseline {
      let path = store.overwrite(scenario, &capture)?;
      result.baseline = Some(self.report_relative(&path));
      result.status = ScenarioStatus::BaselineCreated;
      return Ok(());
    }

    if !store.exists(scenario) {
      // First run for this scenario: accept the capture, no diff artifact.
      let path = store.create(scenario, &capture)?;
      result.baseline = Some(self.report_relative(&path));
      result.status = ScenarioStatus::BaselineCreated;
      return Ok(());
    }

    let baseline = store.read(scenario)?;
    result.baseline = Some(self.report_relative(&store.path_for(scenario)));

    let options = CompareOptions {
      pixel_tolerance: self.config.pixel_tolerance,
      include_anti_aliased: self.config.include_anti_aliased_pixels,
      scale_to_same_size: self.config.scale_to_same_size,
    };
    let outcome = compare(&baseline, &capture, &options)?;
    result.diff_pixels = outcome.diff_pixels;
    result.total_pixels = outcome.total_pixels;
    result.diff_percent = outcome.diff_percent();

    if let Some(diff_image) = outcome.diff_image {
      let diff_path = artifact_path(&self.config.diff_dir, scenario);
      write_png(&diff_path, &diff_image)?;
      result.diff = Some(self.report_relative(&diff_path));
    }

    result.status = if result.diff_percent <= self.config.threshold + f64::EPSILON {
      ScenarioStatus::Passed
    } else {
      ScenarioStatus::Failed
    };
    Ok(())
  }

  fn report_relative(&self, path: &Path) -> String {
    path_for_report(&self.config.reports_dir, path)
  }
}

fn artifact_path(root: &Path, scenario: &Scenario) -> PathBuf {
  root
    .join(scenario.category())
    .join(format!("{}.png", scenario.key()))
}

fn write_png(path: &Path, image: &RgbaImage) -> Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }
  let bytes = encode_png(image)?;
  fs::write(path, bytes)?;
  Ok(())
}
