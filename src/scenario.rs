//! Scenario model and matrix generation
//!
//! A [`Scenario`] is one unit of visual test work, uniquely keyed by its type
//! and dimensions. The matrix generator expands a [`crate::Config`] into a
//! finite, deterministically ordered sequence of scenarios: pages outermost,
//! then viewports, then themes, followed by components, responsive tests and
//! cross-browser checks in configuration order. Stable ordering keeps report
//! diffs between runs meaningful.

use crate::config::Config;
use crate::renderer::CaptureTarget;
use serde::Deserialize;
use serde::Serialize;

/// Named width x height used when rendering a page or component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
  pub name: String,
  pub width: u32,
  pub height: u32,
}

impl Viewport {
  pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
    Viewport {
      name: name.into(),
      width,
      height,
    }
  }
}

/// One interaction step dispatched through the renderer before capture.
///
/// Kept as a tagged variant type rather than a string dispatch so unknown
/// action types are rejected at config-parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
  /// Click the element matched by a CSS selector
  Click { selector: String },
  /// Scroll the viewport to an absolute offset in CSS pixels
  Scroll { x: u32, y: u32 },
  /// Wait for a fixed duration before the next step
  Wait { ms: u64 },
}

/// The type-specific dimensions of a scenario.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioKind {
  /// A page rendered at a viewport under a theme
  Page {
    url: String,
    page_name: String,
    viewport: Viewport,
    theme: String,
  },
  /// An isolated component rendered at the primary viewport
  Component { id: String, viewport: Viewport },
  /// A page driven through an interaction sequence at a specific viewport
  Responsive {
    name: String,
    url: String,
    viewport: Viewport,
    actions: Vec<Action>,
  },
  /// A page rendered by an alternate browser backend
  CrossBrowser {
    browser: String,
    url: String,
    viewport: Viewport,
  },
}

/// One unit of visual test work. Immutable once generated.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
  pub kind: ScenarioKind,
}

impl Scenario {
  /// Deterministic, filesystem-safe identity for this scenario.
  ///
  /// The type tag is embedded so same-named scenarios of different types never
  /// collide on disk or in reports.
  pub fn key(&self) -> String {
    match &self.kind {
      ScenarioKind::Page {
        page_name,
        viewport,
        theme,
        ..
      } => format!(
        "page-{}-{}-{}",
        sanitize_key_part(page_name),
        sanitize_key_part(&viewport.name),
        sanitize_key_part(theme)
      ),
      ScenarioKind::Component { id, .. } => {
        format!("component-{}", sanitize_key_part(id))
      }
      ScenarioKind::Responsive { name, viewport, .. } => format!(
        "responsive-{}-{}",
        sanitize_key_part(name),
        sanitize_key_part(&viewport.name)
      ),
      ScenarioKind::CrossBrowser { browser, .. } => {
        format!("browser-{}", sanitize_key_part(browser))
      }
    }
  }

  /// Artifact directory partition, relative to a store root.
  ///
  /// Partitioning is by scenario type and viewport name purely for locality;
  /// uniqueness is carried by [`Scenario::key`] alone.
  pub fn category(&self) -> String {
    match &self.kind {
      ScenarioKind::Page { viewport, .. } => {
        format!("pages/{}", sanitize_key_part(&viewport.name))
      }
      ScenarioKind::Component { .. } => "components".to_string(),
      ScenarioKind::Responsive { viewport, .. } => {
        format!("responsive/{}", sanitize_key_part(&viewport.name))
      }
      ScenarioKind::CrossBrowser { .. } => "browsers".to_string(),
    }
  }

  /// Capture target handed to the renderer.
  pub fn target(&self) -> CaptureTarget {
    match &self.kind {
      ScenarioKind::Page { url, .. } => CaptureTarget::Url(url.clone()),
      ScenarioKind::Component { id, .. } => CaptureTarget::Component(id.clone()),
      ScenarioKind::Responsive { url, .. } => CaptureTarget::Url(url.clone()),
      ScenarioKind::CrossBrowser { browser, url, .. } => CaptureTarget::Browser {
        browser: browser.clone(),
        url: url.clone(),
      },
    }
  }

  pub fn viewport(&self) -> &Viewport {
    match &self.kind {
      ScenarioKind::Page { viewport, .. }
      | ScenarioKind::Component { viewport, .. }
      | ScenarioKind::Responsive { viewport, .. }
      | ScenarioKind::CrossBrowser { viewport, .. } => viewport,
    }
  }

  pub fn theme(&self) -> Option<&str> {
    match &self.kind {
      ScenarioKind::Page { theme, .. } => Some(theme.as_str()),
      _ => None,
    }
  }

  pub fn actions(&self) -> &[Action] {
    match &self.kind {
      ScenarioKind::Responsive { actions, .. } => actions.as_slice(),
      _ => &[],
    }
  }
}

/// Expand the configuration into the full, deterministically ordered scenario
/// matrix. Pure; no side effects.
///
/// Total count is `|pages| * |viewports| * |themes| + |components| +
/// |responsive_tests| + |browsers|`.
pub fn generate_matrix(config: &Config) -> Vec<Scenario> {
  let mut scenarios = Vec::new();
  let primary = config.primary_viewport();

  for page in &config.pages {
    for viewport in &config.viewports {
      for theme in &config.themes {
        scenarios.push(Scenario {
          kind: ScenarioKind::Page {
            url: page.path.clone(),
            page_name: page.name.clone(),
            viewport: viewport.clone(),
            theme: theme.clone(),
          },
        });
      }
    }
  }

  for id in &config.components {
    scenarios.push(Scenario {
      kind: ScenarioKind::Component {
        id: id.clone(),
        viewport: primary.clone(),
      },
    });
  }

  for test in &config.responsive_tests {
    scenarios.push(Scenario {
      kind: ScenarioKind::Responsive {
        name: test.name.clone(),
        url: test.path.clone(),
        viewport: test.viewport.clone(),
        actions: test.actions.clone(),
      },
    });
  }

  for browser in &config.browsers {
    scenarios.push(Scenario {
      kind: ScenarioKind::CrossBrowser {
        browser: browser.clone(),
        url: config
          .pages
          .first()
          .map(|p| p.path.clone())
          .unwrap_or_else(|| "/".to_string()),
        viewport: primary.clone(),
      },
    });
  }

  scenarios
}

/// Normalize a name into a filename-safe key segment.
///
/// Lowercases, maps anything outside `[a-z0-9]` to `-`, collapses runs of
/// dashes and trims them from both ends.
pub fn sanitize_key_part(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  let mut last_dash = true;
  for ch in raw.chars() {
    let lower = ch.to_ascii_lowercase();
    if lower.is_ascii_alphanumeric() {
      out.push(lower);
      last_dash = false;
    } else if !last_dash {
      out.push('-');
      last_dash = true;
    }
  }
  while out.ends_with('-') {
    out.pop();
  }
  if out.is_empty() {
    out.push_str("unnamed");
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::PageSpec;
  use crate::config::ResponsiveSpec;

  fn matrix_config() -> Config {
    let mut config = Config::default();
    config.pages = vec![
      PageSpec {
        path: "/".to_string(),
        name: "home".to_string(),
      },
      PageSpec {
        path: "/about".to_string(),
        name: "about".to_string(),
      },
    ];
    config.viewports = vec![
      Viewport::new("desktop", 1280, 800),
      Viewport::new("mobile", 375, 667),
    ];
    config.themes = vec!["light".to_string(), "dark".to_string()];
    config.components = vec!["button".to_string()];
    config.responsive_tests = vec![ResponsiveSpec {
      name: "menu".to_string(),
      path: "/".to_string(),
      viewport: Viewport::new("mobile", 375, 667),
      actions: vec![Action::Click {
        selector: "#menu".to_string(),
      }],
    }];
    config.browsers = vec!["firefox".to_string()];
    config
  }

  #[test]
  fn matrix_size_is_cross_product_plus_singletons() {
    let scenarios = generate_matrix(&matrix_config());
    // 2 pages x 2 viewports x 2 themes + 1 component + 1 responsive + 1 browser
    assert_eq!(scenarios.len(), 11);
  }

  #[test]
  fn ordering_is_pages_then_viewports_then_themes() {
    let scenarios = generate_matrix(&matrix_config());
    let keys: Vec<String> = scenarios.iter().map(|s| s.key()).collect();
    assert_eq!(
      &keys[..4],
      &[
        "page-home-desktop-light",
        "page-home-desktop-dark",
        "page-home-mobile-light",
        "page-home-mobile-dark",
      ]
    );
    assert_eq!(keys[8], "component-button");
    assert_eq!(keys[9], "responsive-menu-mobile");
    assert_eq!(keys[10], "browser-firefox");
  }

  #[test]
  fn generation_is_deterministic() {
    let config = matrix_config();
    let first: Vec<String> = generate_matrix(&config).iter().map(|s| s.key()).collect();
    let second: Vec<String> = generate_matrix(&config).iter().map(|s| s.key()).collect();
    assert_eq!(first, second);
  }

  #[test]
  fn type_tag_prevents_cross_type_collisions() {
    let viewport = Viewport::new("desktop", 1280, 800);
    let page = Scenario {
      kind: ScenarioKind::Page {
        url: "/home".to_string(),
        page_name: "home".to_string(),
        viewport: viewport.clone(),
        theme: "light".to_string(),
      },
    };
    let component = Scenario {
      kind: ScenarioKind::Component {
        id: "home".to_string(),
        viewport,
      },
    };
    assert_ne!(page.key(), component.key());
  }

  #[test]
  fn sanitize_key_part_maps_to_safe_segments() {
    assert_eq!(sanitize_key_part("Primary Button"), "primary-button");
    assert_eq!(sanitize_key_part("/checkout/step-1"), "checkout-step-1");
    assert_eq!(sanitize_key_part("--weird__name--"), "weird-name");
    assert_eq!(sanitize_key_part("///"), "unnamed");
  }

  #[test]
  fn actions_deserialize_from_tagged_json() {
    let json = r##"[
      {"type": "click", "selector": "#open"},
      {"type": "scroll", "x": 0, "y": 600},
      {"type": "wait", "ms": 250}
    ]"##;
    let actions: Vec<Action> = serde_json::from_str(json).unwrap();
    assert_eq!(
      actions,
      vec![
        Action::Click {
          selector: "#open".to_string()
        },
        Action::Scroll { x: 0, y: 600 },
        Action::Wait { ms: 250 },
      ]
    );
  }

  #[test]
  fn unknown_action_type_is_rejected() {
    let json = r##"{"type": "hover", "selector": "#x"}"##;
    assert!(serde_json::from_str::<Action>(json).is_err());
  }
}
