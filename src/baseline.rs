//! Baseline image lifecycle
//!
//! Baselines persist across runs under `<root>/<category>/<key>.png`. The
//! category partition (scenario type plus viewport name) exists purely for
//! locality; uniqueness is carried by the scenario key, which embeds the type
//! tag. Writes are write-temp-then-rename so a crash never leaves a partial
//! baseline, and writes for the same key are serialized through a per-key lock
//! so two concurrent first runs cannot interleave.

use crate::error::BaselineError;
use crate::error::Result;
use crate::image_io::decode_png;
use crate::image_io::encode_png;
use crate::scenario::Scenario;
use image::RgbaImage;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

/// Store for accepted reference images.
pub struct BaselineStore {
  root: PathBuf,
  update_mode: bool,
  key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl BaselineStore {
  /// Open a store rooted at `root`. `update_mode` legalizes `overwrite`.
  pub fn new(root: impl Into<PathBuf>, update_mode: bool) -> Self {
    BaselineStore {
      root: root.into(),
      update_mode,
      key_locks: Mutex::new(HashMap::new()),
    }
  }

  pub fn update_mode(&self) -> bool {
    self.update_mode
  }

  /// On-disk location of a scenario's baseline.
  pub fn path_for(&self, scenario: &Scenario) -> PathBuf {
    self
      .root
      .join(scenario.category())
      .join(format!("{}.png", scenario.key()))
  }

  pub fn exists(&self, scenario: &Scenario) -> bool {
    self.path_for(scenario).is_file()
  }

  /// Read and decode the stored baseline.
  pub fn read(&self, scenario: &Scenario) -> Result<RgbaImage> {
    let path = self.path_for(scenario);
    let bytes = fs::read(&path).map_err(|_| BaselineError::Missing {
      key: scenario.key(),
    })?;
    Ok(decode_png(&bytes, "baseline")?)
  }

  /// Persist a first baseline. Fails if one already exists for the key.
  pub fn create(&self, scenario: &Scenario, image: &RgbaImage) -> Result<PathBuf> {
    let lock = self.key_lock(&scenario.key());
    let _guard = lock.lock().unwrap();
    let path = self.path_for(scenario);
    if path.is_file() {
      return Err(
        BaselineError::AlreadyExists {
          key: scenario.key(),
        }
        .into(),
      );
    }
    self.write_atomic(&path, image)?;
    Ok(path)
  }

  /// Replace an existing baseline. Only legal in update mode.
  pub fn overwrite(&self, scenario: &Scenario, image: &RgbaImage) -> Result<PathBuf> {
    if !self.update_mode {
      return Err(
        BaselineError::UpdateRequired {
          key: scenario.key(),
        }
        .into(),
      );
    }
    let lock = self.key_lock(&scenario.key());
    let _guard = lock.lock().unwrap();
    let path = self.path_for(scenario);
    self.write_atomic(&path, image)?;
    Ok(path)
  }

  fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
    let mut locks = self.key_locks.lock().unwrap();
    Arc::clone(locks.entry(key.to_string()).or_default())
  }

  fn write_atomic(&self, path: &Path, image: &RgbaImage) -> Result<()> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    let bytes = encode_png(image)?;
    let tmp = path.with_extension("png.tmp");
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
  }
}
