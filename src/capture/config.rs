//! Capture screen configuration.
//!
//! Everything has a default, so an empty or missing file yields the
//! behaviour of the stock screen: back lens, low-latency capture, photos
//! under `Pictures/RubixCube`.

use super::{AspectRatio, CaptureMode, LensFacing};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Default album the photos are filed under.
pub const DEFAULT_RELATIVE_PATH: &str = "Pictures/RubixCube";

/// Configuration of the capture session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lens used when the screen first opens.
    pub initial_facing: LensFacing,
    /// Ratio used while the viewport has no size yet.
    pub fallback_aspect: AspectRatio,
    /// Still capture trade-off.
    pub capture_mode: CaptureMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_facing: LensFacing::Back,
            fallback_aspect: AspectRatio::Ratio4x3,
            capture_mode: CaptureMode::MinimizeLatency,
        }
    }
}

/// Where photos are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the directory-backed media store.
    pub root: PathBuf,
    /// Collection path inside the store.
    pub relative_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("media"),
            relative_path: DEFAULT_RELATIVE_PATH.to_string(),
        }
    }
}

impl StorageConfig {
    /// Validates the storage parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rel = Path::new(&self.relative_path);
        if self.relative_path.trim().is_empty() {
            return Err(ConfigError::InvalidRelativePath(self.relative_path.clone()));
        }
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(ConfigError::InvalidRelativePath(self.relative_path.clone()));
        }
        Ok(())
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Metrics server port (0 to disable).
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { port: 9090 }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("relative path must be a non-empty relative path without '..': {0:?}")]
    InvalidRelativePath(String),
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.storage.validate()?;
        Ok(config)
    }
}
