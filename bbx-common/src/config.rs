//! Configuration loading and basket root resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "BBX_CONFIG";

/// Environment variable naming the basket root directory
pub const BASKET_ROOT_ENV_VAR: &str = "BBX_BASKET_ROOT";

/// Logging section of the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (e.g. "info", "bbx_cohort=debug")
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// `[cohort]` section; unset values fall back to the filter defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortSettings {
    pub ethnicity_field: Option<String>,
    pub target_category: Option<String>,
    pub feature_field: Option<String>,
    pub components: Option<usize>,
    pub threshold: Option<f64>,
    /// "memory-efficient" or "full-matrix"
    pub medoid: Option<String>,
    pub full_matrix_cell_budget: Option<usize>,
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub basket_root: Option<PathBuf>,
    pub project_id: Option<String>,
    #[serde(default)]
    pub cohort: CohortSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }
}

/// Load configuration
///
/// Priority order:
/// 1. Explicit path (command line)
/// 2. `BBX_CONFIG` environment variable
/// 3. Platform config directory (`~/.config/bbx/config.toml` on Linux)
/// 4. Compiled defaults
///
/// An explicitly named file that does not exist is an error; a missing
/// default file is not.
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        return load_required(path);
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return load_required(Path::new(&path));
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            tracing::info!("Loading config from {}", path.display());
            TomlConfig::from_file(&path)
        }
        _ => {
            tracing::debug!("No config file found, using defaults");
            Ok(TomlConfig::default())
        }
    }
}

fn load_required(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }
    tracing::info!("Loading config from {}", path.display());
    TomlConfig::from_file(path)
}

/// Default config file location for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bbx").join("config.toml"))
}

/// Basket root resolution:
/// 1. Command-line argument (highest priority)
/// 2. `BBX_BASKET_ROOT` environment variable
/// 3. `basket_root` in the config file
pub fn resolve_basket_root(cli_arg: Option<&Path>, config: &TomlConfig) -> Result<PathBuf> {
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(BASKET_ROOT_ENV_VAR) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    config.basket_root.clone().ok_or_else(|| {
        Error::Config(format!(
            "Basket root not configured. Pass it on the command line, set {} or add basket_root to the config file",
            BASKET_ROOT_ENV_VAR
        ))
    })
}
