//! CLI configuration, read from a TOML file.
//!
//! ```toml
//! store = ".tasktrack/items.jsonl"
//! log = "warn"
//! time_format = "%Y-%m-%dT%H:%M"
//! ```
//!
//! Every key is optional. Without `--config`, `.tasktrack/config.toml` is
//! read when it exists; otherwise defaults apply.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = ".tasktrack/config.toml";
pub const DEFAULT_STORE_PATH: &str = ".tasktrack/items.jsonl";
pub const DEFAULT_LOG_FILTER: &str = "warn";
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// JSONL store path.
    pub store: PathBuf,
    /// `tracing` filter directive used when `TASKTRACK_LOG` is unset.
    pub log: String,
    /// `chrono` format for `--start` arguments and text output.
    pub time_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: PathBuf::from(DEFAULT_STORE_PATH),
            log: DEFAULT_LOG_FILTER.to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid config {path}: {message}")]
    Parse { path: String, message: String },
}

impl Config {
    /// Load `explicit`, or the default config file if present.
    ///
    /// An explicit path must exist; the default path is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_path(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::from_path(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&text).map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        assert_eq!(Config::parse("").expect("empty config"), Config::default());
    }

    #[test]
    fn keys_override_defaults() {
        let config = Config::parse(
            r#"
store = "/tmp/items.jsonl"
time_format = "%d.%m.%Y %H:%M"
"#,
        )
        .expect("config");
        assert_eq!(config.store, PathBuf::from("/tmp/items.jsonl"));
        assert_eq!(config.time_format, "%d.%m.%Y %H:%M");
        assert_eq!(config.log, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::parse("stroe = \"x\"").expect_err("typo");
        assert!(err.contains("stroe"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/tasktrack.toml")))
            .expect_err("missing explicit config");
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
