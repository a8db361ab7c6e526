//! File-backed configuration adapter.
//!
//! JSON for hand-edited deployments, postcard for a compact blob.  Every
//! load is validated; a config that fails validation is an error, never
//! silently repaired.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use crate::app::ports::ConfigPort;
use crate::config::EngineConfig;

pub fn load_json(path: &Path) -> Result<EngineConfig> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: EngineConfig =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("validating {}", path.display()))?;
    Ok(config)
}

pub fn save_json(path: &Path, config: &EngineConfig) -> Result<()> {
    config.validate().context("refusing to save invalid config")?;
    let raw = serde_json::to_string_pretty(config).context("encoding config")?;
    fs::write(path, raw).with_context(|| format!("writing {}", path.display()))?;
    info!("config written to {}", path.display());
    Ok(())
}

pub fn load_blob(path: &Path) -> Result<EngineConfig> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let config: EngineConfig =
        postcard::from_bytes(&bytes).with_context(|| format!("decoding {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("validating {}", path.display()))?;
    Ok(config)
}

pub fn save_blob(path: &Path, config: &EngineConfig) -> Result<()> {
    config.validate().context("refusing to save invalid config")?;
    let bytes = postcard::to_allocvec(config).context("encoding config")?;
    fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
    info!("config blob written to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// [`ConfigPort`] over a JSON file.  A missing file loads the defaults.
#[derive(Debug, Clone)]
pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<EngineConfig> {
        if !self.path.exists() {
            info!("{} not found, using defaults", self.path.display());
            return Ok(EngineConfig::default());
        }
        load_json(&self.path)
    }

    fn save(&self, config: &EngineConfig) -> Result<()> {
        save_json(&self.path, config)
    }
}
