//! JSON and HTML report generation
//!
//! Reports are rendered from a finished [`RunSummary`]; no comparison logic
//! runs here. The HTML report references baseline/current/diff images through
//! relative paths resolved against the reports root, never inline-embedded, so
//! report size stays independent of image count and the report tree remains
//! portable when copied as a unit. A failed report write is fatal: scenario
//! work is already persisted, the caller exits non-zero.

use crate::config::Config;
use crate::error::Error;
use crate::error::Result;
use crate::runner::RunSummary;
use crate::runner::ScenarioResult;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

pub const JSON_REPORT_NAME: &str = "visual-regression-report.json";
pub const HTML_REPORT_NAME: &str = "visual-regression-report.html";

/// Serialized shape of the JSON report.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
  pub timestamp: u64,
  pub summary: SummaryTotals,
  pub config: Config,
  pub scenarios: Vec<ScenarioResult>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTotals {
  pub total: usize,
  pub passed: usize,
  pub failed: usize,
  pub duration_ms: u64,
  pub pass_rate: f64,
}

/// Write both report artifacts under `config.reports_dir`.
///
/// `timestamp` is seconds since the Unix epoch, injected by the caller so
/// generation stays deterministic given a summary.
pub fn write_reports(
  summary: &RunSummary,
  config: &Config,
  timestamp: u64,
) -> Result<(PathBuf, PathBuf)> {
  fs::create_dir_all(&config.reports_dir)?;

  let report = JsonReport {
    timestamp,
    summary: SummaryTotals {
      total: summary.total,
      passed: summary.passed,
      failed: summary.failed,
      duration_ms: summary.duration_ms,
      pass_rate: summary.pass_rate(),
    },
    config: config.clone(),
    scenarios: summary.results.clone(),
  };

  let json_path = config.reports_dir.join(JSON_REPORT_NAME);
  let json =
    serde_json::to_string_pretty(&report).map_err(|e| Error::Report(e.to_string()))?;
  fs::write(&json_path, json)?;

  let html_path = config.reports_dir.join(HTML_REPORT_NAME);
  fs::write(&html_path, render_html(&report))?;

  Ok((json_path, html_path))
}

/// Scenario keys that did not pass in the previous JSON report, for
/// `--only-failed` filtering. `None` when no usable report exists.
pub fn load_previous_failures(reports_dir: &Path) -> Option<HashSet<String>> {
  let raw = fs::read_to_string(reports_dir.join(JSON_REPORT_NAME)).ok()?;
  let report: JsonReport = serde_json::from_str(&raw).ok()?;
  Some(
    report
      .scenarios
      .iter()
      .filter(|r| !r.status.is_pass())
      .map(|r| r.key.clone())
      .collect(),
  )
}

fn render_html(report: &JsonReport) -> String {
  let mut rows = String::new();
  for entry in &report.scenarios {
    let baseline_cell = entry
      .baseline
      .as_deref()
      .map(|p| linked_image("Baseline", p))
      .unwrap_or_else(|| "-".to_string());
    let current_cell = entry
      .current
      .as_deref()
      .map(|p| linked_image("Current", p))
      .unwrap_or_else(|| "-".to_string());
    let diff_cell = entry
      .diff
      .as_deref()
      .map(|p| linked_image("Diff", p))
      .unwrap_or_else(|| "-".to_string());

    rows.push_str(&format!(
      "<tr class=\"{status}\"><td>{key}</td><td>{status}</td><td>{percent:.4}%</td>\
       <td>{pixels} / {total}</td><td>{baseline}</td><td>{current}</td><td>{diff}</td>\
       <td class=\"error\">{error}</td></tr>\n",
      status = entry.status.label(),
      key = escape_html(&entry.key),
      percent = entry.diff_percent,
      pixels = entry.diff_pixels,
      total = entry.total_pixels,
      baseline = baseline_cell,
      current = current_cell,
      diff = diff_cell,
      error = escape_html(entry.error.as_deref().unwrap_or("")),
    ));
  }

  format!(
    r#"<!doctype html>
<html>
  <head>
    <meta charset="utf-8">
    <title>Visual regression report</title>
    <style>
      body {{ font-family: sans-serif; margin: 20px; }}
      table {{ border-collapse: collapse; width: 100%; }}
      th, td {{ border: 1px solid #ddd; padding: 6px; vertical-align: top; }}
      th {{ background: #f3f3f3; position: sticky; top: 0; }}
      tr.pass {{ background: #f8fff8; }}
      tr.new {{ background: #f8f8ff; }}
      tr.fail {{ background: #fff8f8; }}
      tr.error {{ background: #fff0f0; }}
      .thumb img {{ max-width: 320px; max-height: 240px; display: block; }}
      .error {{ color: #b00020; }}
    </style>
  </head>
  <body>
    <h1>Visual regression report</h1>
    <p><strong>Timestamp:</strong> {timestamp} |
       <strong>Threshold:</strong> {threshold:.4}% |
       <strong>Pixel tolerance:</strong> {tolerance:.4}</p>
    <p>{total} scenarios: {passed} passed, {failed} failed
       ({pass_rate:.2}% pass rate, {duration}ms).</p>
    <table>
      <thead>
        <tr>
          <th>Scenario</th>
          <th>Status</th>
          <th>Diff %</th>
          <th>Diff px / total</th>
          <th>Baseline</th>
          <th>Current</th>
          <th>Diff</th>
          <th>Error</th>
        </tr>
      </thead>
      <tbody>
{rows}      </tbody>
    </table>
  </body>
</html>
"#,
    timestamp = report.timestamp,
    threshold = report.config.threshold,
    tolerance = report.config.pixel_tolerance,
    total = report.summary.total,
    passed = report.summary.passed,
    failed = report.summary.failed,
    pass_rate = report.summary.pass_rate,
    duration = report.summary.duration_ms,
    rows = rows,
  )
}

fn linked_image(label: &str, path: &str) -> String {
  let escaped = escape_html(path);
  format!(
    r#"<div class="thumb"><a href="{p}">{l}</a><br><img src="{p}" loading="lazy"></div>"#,
    p = escaped,
    l = escape_html(label)
  )
}

/// Escape HTML entities for safe embedding.
pub fn escape_html(input: &str) -> String {
  input
    .replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
    .replace('\'', "&#39;")
}

/// Produce a path relative to the reports root (falls back to the target as
/// given), normalized to forward slashes.
pub fn path_for_report(reports_root: &Path, target: &Path) -> String {
  let path = pathdiff::diff_paths(target, reports_root).unwrap_or_else(|| target.to_path_buf());
  let rendered = path.display().to_string();
  if cfg!(windows) {
    rendered.replace('\\', "/")
  } else {
    rendered
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::runner::ScenarioStatus;
  use tempfile::TempDir;

  fn sample_summary() -> RunSummary {
    RunSummary {
      total: 2,
      passed: 1,
      failed: 1,
      duration_ms: 42,
      results: vec![
        ScenarioResult {
          key: "page-home-desktop-light".to_string(),
          category: "pages/desktop".to_string(),
          status: ScenarioStatus::Passed,
          diff_pixels: 0,
          total_pixels: 100,
          diff_percent: 0.0,
          baseline: Some("../screenshots/baseline/pages/desktop/page-home-desktop-light.png".to_string()),
          current: Some("../screenshots/current/pages/desktop/page-home-desktop-light.png".to_string()),
          diff: None,
          error: None,
        },
        ScenarioResult {
          key: "component-button".to_string(),
          category: "components".to_string(),
          status: ScenarioStatus::Error,
          diff_pixels: 0,
          total_pixels: 0,
          diff_percent: 0.0,
          baseline: None,
          current: None,
          diff: None,
          error: Some("Navigation failed for component:button: <boom>".to_string()),
        },
      ],
    }
  }

  #[test]
  fn json_report_round_trips() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.reports_dir = dir.path().to_path_buf();

    let (json_path, html_path) = write_reports(&sample_summary(), &config, 1_700_000_000).unwrap();
    assert!(json_path.ends_with(JSON_REPORT_NAME));
    assert!(html_path.ends_with(HTML_REPORT_NAME));

    let raw = fs::read_to_string(&json_path).unwrap();
    let parsed: JsonReport = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed.timestamp, 1_700_000_000);
    assert_eq!(parsed.summary.total, 2);
    assert_eq!(parsed.summary.pass_rate, 50.0);
    assert_eq!(parsed.scenarios.len(), 2);
    assert_eq!(parsed.scenarios[0].key, "page-home-desktop-light");
  }

  #[test]
  fn html_report_links_relative_paths_and_escapes() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.reports_dir = dir.path().to_path_buf();

    let (_, html_path) = write_reports(&sample_summary(), &config, 0).unwrap();
    let html = fs::read_to_string(&html_path).unwrap();
    assert!(html.contains(r#"src="../screenshots/current/pages/desktop/page-home-desktop-light.png""#));
    // Images are linked, never embedded.
    assert!(!html.contains("data:image"));
    // Error text is escaped.
    assert!(html.contains("&lt;boom&gt;"));
    assert!(html.contains("1 passed, 1 failed"));
  }

  #[test]
  fn previous_failures_cover_failed_and_errored() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.reports_dir = dir.path().to_path_buf();

    write_reports(&sample_summary(), &config, 0).unwrap();
    let failures = load_previous_failures(dir.path()).unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures.contains("component-button"));
  }

  #[test]
  fn previous_failures_absent_without_report() {
    let dir = TempDir::new().unwrap();
    assert!(load_previous_failures(dir.path()).is_none());
  }

  #[test]
  fn report_paths_are_relative_to_reports_root() {
    let rel = path_for_report(Path::new("reports"), Path::new("screenshots/diff/x.png"));
    assert_eq!(rel, "../screenshots/diff/x.png");
  }
}
