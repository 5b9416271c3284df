//! snapcheck: a visual regression testing engine.
//!
//! Expands configuration into a deterministic scenario matrix (pages x
//! viewports x themes, isolated components, responsive interaction sequences,
//! cross-browser checks), captures each scenario through an injected
//! [`renderer::Renderer`], compares captures pixel-by-pixel against stored
//! baselines and emits JSON/HTML reports. Browser automation itself stays
//! outside the crate.

pub mod baseline;
pub mod compare;
pub mod config;
pub mod error;
pub mod image_io;
pub mod renderer;
pub mod report;
pub mod runner;
pub mod scenario;

pub use baseline::BaselineStore;
pub use compare::compare;
pub use compare::CompareOptions;
pub use compare::ComparisonOutcome;
pub use config::Config;
pub use error::Error;
pub use error::Result;
pub use renderer::CaptureTarget;
pub use renderer::Renderer;
pub use runner::RunSummary;
pub use runner::Runner;
pub use runner::ScenarioResult;
pub use runner::ScenarioStatus;
pub use scenario::generate_matrix;
pub use scenario::Scenario;
pub use scenario::Viewport;
