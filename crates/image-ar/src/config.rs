//! Session configuration and JSON helpers.

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::capture::CaptureConstraints;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("target source must not be empty")]
    EmptyTargetSource,
}

fn default_auto_start() -> bool {
    true
}

/// Declared parameters of an AR session.
///
/// Field aliases accept the attribute names used by scene markup
/// (`imageTargetSrc`, `showStats`, `autoStart`, `logLevel`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Location of the compiled image-target data.
    #[serde(alias = "imageTargetSrc")]
    pub target_source: String,
    /// Count engine cycles and log their rates.
    #[serde(default, alias = "showStats")]
    pub diagnostics: bool,
    /// Start the session as soon as the host begins rendering.
    #[serde(default = "default_auto_start", alias = "autoStart")]
    pub auto_start: bool,
    #[serde(default)]
    pub capture: CaptureConstraints,
    /// Install the crate's stderr log output at this level on setup.
    #[serde(default, alias = "logLevel")]
    pub log_level: Option<LevelFilter>,
}

impl SessionConfig {
    pub fn new(target_source: impl Into<String>) -> Self {
        Self {
            target_source: target_source.into(),
            diagnostics: false,
            auto_start: default_auto_start(),
            capture: CaptureConstraints::default(),
            log_level: None,
        }
    }

    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    pub fn with_auto_start(mut self, enabled: bool) -> Self {
        self.auto_start = enabled;
        self
    }

    pub fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_source.trim().is_empty() {
            return Err(ConfigError::EmptyTargetSource);
        }
        Ok(())
    }

    /// Load and validate a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
