//! Renderer capability
//!
//! The engine never performs browser automation itself. Captures are produced
//! by an injected [`Renderer`], which turns a capture target plus viewport,
//! theme and interaction sequence into a raster buffer. Two implementations
//! ship with the crate: [`PrerenderedDirRenderer`] for the CLI (captures are
//! PNGs produced by an external browser step) and [`FixtureRenderer`], a
//! deterministic fake for harness tests.

use crate::error::CaptureError;
use crate::scenario::sanitize_key_part;
use crate::scenario::Action;
use crate::scenario::Viewport;
use image::Rgba;
use image::RgbaImage;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

/// What to point the renderer at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureTarget {
  /// Navigate to a URL or path
  Url(String),
  /// Mount an isolated component by identifier
  Component(String),
  /// Navigate to a URL with an alternate browser backend
  Browser { browser: String, url: String },
}

impl fmt::Display for CaptureTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CaptureTarget::Url(url) => write!(f, "{url}"),
      CaptureTarget::Component(id) => write!(f, "component:{id}"),
      CaptureTarget::Browser { browser, url } => write!(f, "{url} [{browser}]"),
    }
  }
}

/// Capability that produces a rendered frame for a scenario.
///
/// Implementations must be shareable across worker threads; the runner invokes
/// `capture` concurrently up to the configured parallelism.
pub trait Renderer: Send + Sync {
  fn capture(
    &self,
    target: &CaptureTarget,
    viewport: &Viewport,
    theme: Option<&str>,
    actions: &[Action],
  ) -> Result<RgbaImage, CaptureError>;
}

/// Renderer that reads pre-captured PNGs from a directory tree.
///
/// The external browser step is expected to write
/// `<root>/<sanitized target>-<viewport>[-<theme>].png`; a missing file maps to
/// [`CaptureError::MissingTarget`]. This is the capture source for the CLI,
/// where actual browser automation lives outside the engine.
pub struct PrerenderedDirRenderer {
  root: PathBuf,
}

impl PrerenderedDirRenderer {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    PrerenderedDirRenderer { root: root.into() }
  }

  fn path_for(&self, target: &CaptureTarget, viewport: &Viewport, theme: Option<&str>) -> PathBuf {
    let mut stem = match target {
      CaptureTarget::Url(url) => sanitize_key_part(url),
      CaptureTarget::Component(id) => format!("component-{}", sanitize_key_part(id)),
      CaptureTarget::Browser { browser, url } => {
        format!("{}-{}", sanitize_key_part(browser), sanitize_key_part(url))
      }
    };
    stem.push('-');
    stem.push_str(&sanitize_key_part(&viewport.name));
    if let Some(theme) = theme {
      stem.push('-');
      stem.push_str(&sanitize_key_part(theme));
    }
    self.root.join(format!("{stem}.png"))
  }
}

impl Renderer for PrerenderedDirRenderer {
  fn capture(
    &self,
    target: &CaptureTarget,
    viewport: &Viewport,
    theme: Option<&str>,
    _actions: &[Action],
  ) -> Result<RgbaImage, CaptureError> {
    let path = self.path_for(target, viewport, theme);
    let bytes = std::fs::read(&path).map_err(|_| CaptureError::MissingTarget {
      target: format!("{target} (expected capture at {})", path.display()),
    })?;
    image::load_from_memory(&bytes)
      .map(|img| img.to_rgba8())
      .map_err(|e| CaptureError::Backend {
        reason: format!("failed to decode capture {}: {e}", path.display()),
      })
  }
}

/// Deterministic fake renderer for tests.
///
/// Produces a viewport-sized solid fill whose color is an FNV-1a hash of the
/// capture inputs, so any change to target, viewport, theme or action sequence
/// changes the output while identical inputs always render identical frames.
/// Specific captures can be pinned with [`FixtureRenderer::set_override`], and
/// failures injected with [`FixtureRenderer::fail_target`].
#[derive(Default)]
pub struct FixtureRenderer {
  overrides: Mutex<HashMap<String, RgbaImage>>,
  failures: Mutex<HashMap<String, CaptureError>>,
}

impl FixtureRenderer {
  pub fn new() -> Self {
    FixtureRenderer::default()
  }

  /// Pin the frame returned for a target (matched on its display form).
  pub fn set_override(&self, target: impl Into<String>, image: RgbaImage) {
    self.overrides.lock().unwrap().insert(target.into(), image);
  }

  /// Make captures of a target fail with the given error.
  pub fn fail_target(&self, target: impl Into<String>, error: CaptureError) {
    self.failures.lock().unwrap().insert(target.into(), error);
  }

  fn fill_color(
    target: &CaptureTarget,
    viewport: &Viewport,
    theme: Option<&str>,
    actions: &[Action],
  ) -> Rgba<u8> {
    // FNV-1a over the capture identity.
    let mut hash: u64 = 0xcbf29ce484222325;
    let mut feed = |bytes: &[u8]| {
      for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
      }
    };
    feed(target.to_string().as_bytes());
    feed(viewport.name.as_bytes());
    feed(&viewport.width.to_le_bytes());
    feed(&viewport.height.to_le_bytes());
    if let Some(theme) = theme {
      feed(theme.as_bytes());
    }
    for action in actions {
      match action {
        Action::Click { selector } => feed(selector.as_bytes()),
        Action::Scroll { x, y } => {
          feed(&x.to_le_bytes());
          feed(&y.to_le_bytes());
        }
        Action::Wait { ms } => feed(&ms.to_le_bytes()),
      }
    }
    Rgba([(hash >> 16) as u8, (hash >> 8) as u8, hash as u8, 255])
  }
}

impl Renderer for FixtureRenderer {
  fn capture(
    &self,
    target: &CaptureTarget,
    viewport: &Viewport,
    theme: Option<&str>,
    actions: &[Action],
  ) -> Result<RgbaImage, CaptureError> {
    let name = target.to_string();
    if let Some(error) = self.failures.lock().unwrap().get(&name) {
      return Err(error.clone());
    }
    if let Some(image) = self.overrides.lock().unwrap().get(&name) {
      return Ok(image.clone());
    }
    let color = Self::fill_color(target, viewport, theme, actions);
    Ok(RgbaImage::from_pixel(viewport.width, viewport.height, color))
  }
}
