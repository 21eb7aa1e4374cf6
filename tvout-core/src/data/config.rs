//! Configuration management
//!
//! Handles locating, loading and validating the engine configuration.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{config, randr};
use crate::error::{Result, TvoutError};

/// Which provider protocol a session talks
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Output properties + CRTC binding
    #[default]
    Randr,
    /// Video adaptor port attributes
    Xv,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Randr => write!(f, "randr"),
            BackendKind::Xv => write!(f, "xv"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = TvoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "randr" => Ok(BackendKind::Randr),
            "xv" => Ok(BackendKind::Xv),
            other => Err(TvoutError::InvalidConfig {
                field: "backend".to_string(),
                reason: format!("unknown backend '{}' (expected randr or xv)", other),
            }),
        }
    }
}

/// Engine configuration, every field optional in the file
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    pub backend: BackendKind,
    /// Output the output-property backend binds to
    pub output_name: String,
    pub log_level: String,
    /// Descriptor reported by the simulated providers
    pub descriptor: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            output_name: randr::DEFAULT_OUTPUT_NAME.to_string(),
            log_level: config::DEFAULT_LOG_LEVEL.to_string(),
            descriptor: config::DEFAULT_SIM_DESCRIPTOR,
        }
    }
}

/// Resolve the configuration file path.
///
/// `TVOUT_CONFIG` wins; otherwise `<config dir>/tvout/config.json`.
pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(config::CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let base = dirs::config_dir()
        .ok_or_else(|| TvoutError::config("Could not determine config directory"))?;
    Ok(base.join(config::CONFIG_DIR_NAME).join(config::CONFIG_FILE))
}

/// Load configuration from the default location, falling back to defaults
/// when no file exists
pub fn load_config() -> Result<EngineConfig> {
    let path = get_config_path()?;
    if !path.exists() {
        return Ok(EngineConfig::default());
    }
    load_config_from(&path)
}

/// Load and validate configuration from a specific file
pub fn load_config_from(path: &Path) -> Result<EngineConfig> {
    let metadata = fs::metadata(path).map_err(|source| TvoutError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    if metadata.len() > config::MAX_CONFIG_SIZE {
        return Err(TvoutError::config(format!(
            "Config file {} too large ({} bytes, max {})",
            path.display(),
            metadata.len(),
            config::MAX_CONFIG_SIZE
        )));
    }

    let content = fs::read_to_string(path).map_err(|source| TvoutError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let cfg: EngineConfig = serde_json::from_str(&content)?;
    validate_config(&cfg)?;
    Ok(cfg)
}

pub fn validate_config(cfg: &EngineConfig) -> Result<()> {
    if cfg.output_name.trim().is_empty() {
        return Err(TvoutError::InvalidConfig {
            field: "output_name".to_string(),
            reason: "must not be empty".to_string(),
        });
    }

    let level = cfg.log_level.to_ascii_lowercase();
    if !config::LOG_LEVELS.contains(&level.as_str()) {
        return Err(TvoutError::InvalidConfig {
            field: "log_level".to_string(),
            reason: format!("'{}' is not one of {}", cfg.log_level, config::LOG_LEVELS.join(", ")),
        });
    }

    Ok(())
}
