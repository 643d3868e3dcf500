//! TOML configuration loading
//!
//! Resolution order for the config file:
//! 1. Explicit path (`--config`)
//! 2. `SONGSORT_CONFIG` environment variable
//! 3. `<config_dir>/songsort/config.toml`
//!
//! A missing default file is not an error: every value has a compiled default
//! and command-line flags override whatever the file provides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SONGSORT_CONFIG";

/// Logging section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset (e.g. "info", "debug")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `[recognize]` section; unset keys fall back to compiled defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizeSection {
    pub output: Option<PathBuf>,
    pub delay_secs: Option<f64>,
    pub concurrency: Option<usize>,
    pub dump_every: Option<usize>,
    pub recursive: Option<bool>,
    pub recognizer_command: Option<String>,
    pub recognizer_args: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
}

/// `[organize]` section; unset keys fall back to compiled defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizeSection {
    pub dest_root: Option<PathBuf>,
    pub pattern: Option<String>,
    pub duplicate_token: Option<String>,
    pub drop_unknowns: Option<bool>,
    pub on_existing: Option<String>,
    pub skip_identical: Option<bool>,
}

/// Whole config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub recognize: RecognizeSection,
    pub organize: OrganizeSection,
}

impl TomlConfig {
    /// Parse config text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Platform default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("songsort").join("config.toml"))
}

/// Load configuration
///
/// An explicit path (argument or environment) that cannot be read or parsed is
/// an error. The platform default file degrades gracefully: missing means
/// defaults, malformed means a warning and defaults.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);

    if let Some(path) = explicit.map(Path::to_path_buf).or(env_path) {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded config file");
        return TomlConfig::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)));
    }

    let Some(path) = default_config_path() else {
        return Ok(TomlConfig::default());
    };
    if !path.exists() {
        debug!(path = %path.display(), "No config file, using defaults");
        return Ok(TomlConfig::default());
    }

    match std::fs::read_to_string(&path)
        .map_err(Error::from)
        .and_then(|content| TomlConfig::from_toml_str(&content))
    {
        Ok(config) => {
            debug!(path = %path.display(), "Loaded config file");
            Ok(config)
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Ignoring unreadable config file, using defaults"
            );
            Ok(TomlConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_sections() {
        let config = TomlConfig::from_toml_str(
            r#"
            [recognize]
            delay_secs = 0.5
            concurrency = 4
            recognizer_args = ["--json"]

            [organize]
            pattern = "%A/%Y - %L/%S"
            drop_unknowns = true
            "#,
        )
        .unwrap();

        assert_eq!(config.recognize.delay_secs, Some(0.5));
        assert_eq!(config.recognize.concurrency, Some(4));
        assert_eq!(config.recognize.recognizer_args, Some(vec!["--json".to_string()]));
        assert_eq!(config.recognize.output, None);
        assert_eq!(config.organize.pattern.as_deref(), Some("%A/%Y - %L/%S"));
        assert_eq!(config.organize.drop_unknowns, Some(true));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(TomlConfig::from_toml_str("[recognize\nconcurrency = ").is_err());
    }
}
