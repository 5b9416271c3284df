//! snapcheck CLI
//!
//! Loads the run configuration, expands the scenario matrix, drives it against
//! a capture source and writes the reports. Exit code is 0 when no scenario
//! failed or errored, 1 otherwise; an internal error also exits 1.

use clap::Parser;
use snapcheck::config::Config;
use snapcheck::renderer::PrerenderedDirRenderer;
use snapcheck::report;
use snapcheck::runner::Runner;
use snapcheck::scenario::generate_matrix;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

#[derive(Parser, Debug)]
#[command(
  name = "snapcheck",
  version,
  about = "Compare captured screenshots against stored baselines and report regressions"
)]
struct Args {
  /// Override the aggregate diff-percentage threshold (0-100)
  threshold: Option<f64>,

  /// Path to the JSON config file
  #[arg(long, default_value = "snapcheck.json")]
  config: PathBuf,

  /// Directory of pre-captured PNGs produced by the external browser step
  #[arg(long, default_value = "screenshots/capture")]
  captures: PathBuf,

  /// Overwrite baselines from this run's captures
  #[arg(long)]
  update_baseline: bool,

  /// Only rerun scenarios that did not pass in the previous report
  #[arg(long)]
  only_failed: bool,

  /// Override the maximum number of scenarios in flight
  #[arg(long, short)]
  jobs: Option<usize>,
}

fn main() {
  match run() {
    Ok(exit_code) => std::process::exit(exit_code),
    Err(err) => {
      eprintln!("error: {err}");
      std::process::exit(1);
    }
  }
}

fn run() -> snapcheck::Result<i32> {
  let args = Args::parse();

  let mut config = if args.config.is_file() {
    Config::load(&args.config)?
  } else {
    Config::default()
  };
  if let Some(threshold) = args.threshold {
    config.threshold = threshold;
  }
  if let Some(jobs) = args.jobs {
    config.max_concurrency = jobs;
  }
  config.validate()?;

  let mut scenarios = generate_matrix(&config);
  let discovered = scenarios.len();

  if args.only_failed {
    match report::load_previous_failures(&config.reports_dir) {
      Some(failures) => {
        scenarios.retain(|s| failures.contains(&s.key()));
        println!(
          "Rerunning {} of {} scenarios that did not pass previously",
          scenarios.len(),
          discovered
        );
      }
      None => println!("No previous report found; running the full matrix"),
    }
  }

  println!(
    "Running {} scenarios ({} parallel, threshold {:.4}%{})",
    scenarios.len(),
    config.max_concurrency,
    config.threshold,
    if args.update_baseline {
      ", updating baselines"
    } else {
      ""
    }
  );

  let renderer = PrerenderedDirRenderer::new(&args.captures);
  let runner = Runner::new(&config, &renderer).with_update_baseline(args.update_baseline);
  let summary = runner.run(&scenarios)?;

  let timestamp = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs())
    .unwrap_or(0);
  // Scenario work is preserved on disk by now; a failing report write is fatal.
  let (json_path, html_path) = report::write_reports(&summary, &config, timestamp)?;

  println!();
  println!(
    "{} scenarios: {} passed, {} failed ({:.2}% pass rate, {}ms)",
    summary.total,
    summary.passed,
    summary.failed,
    summary.pass_rate(),
    summary.duration_ms
  );
  println!("JSON report: {}", json_path.display());
  println!("HTML report: {}", html_path.display());

  Ok(if summary.failed == 0 { 0 } else { 1 })
}
