//! Deployment-time configuration.
//!
//! Loaded once at startup from `config.toml` in the platform config
//! directory. The transport mode is fixed here; nothing toggles it at
//! runtime.

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::core::constants::{DEFAULT_MODEL, DEFAULT_RELAY_URL};

/// Which message-delivery strategy the client uses, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Call the Gemini API from the client process (requires `API_KEY`).
    Direct,
    /// Delegate to a relay server holding the credential.
    #[default]
    Proxied,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Direct => write!(f, "direct"),
            TransportMode::Proxied => write!(f, "proxied"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: TransportMode,
    pub model: String,
    pub relay_url: String,
    /// Optional diagnostic log file; the TUI owns the terminal, so tracing
    /// output goes to a file or nowhere.
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: TransportMode::default(),
            model: DEFAULT_MODEL.to_string(),
            relay_url: DEFAULT_RELAY_URL.to_string(),
            log_file: None,
        }
    }
}

/// Errors that can occur when loading configuration from disk.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse the configuration file as valid TOML.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "Failed to parse config at {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

impl Config {
    /// Load from the default location; a missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "gemterm", "gemterm")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_proxied_mode() {
        let config = Config::default();
        assert_eq!(config.mode, TransportMode::Proxied);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.relay_url, DEFAULT_RELAY_URL);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn parses_partial_config() {
        let config: Config = toml::from_str("mode = \"direct\"").expect("parses");
        assert_eq!(config.mode, TransportMode::Direct);
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn parses_full_config() {
        let raw = r#"
mode = "proxied"
model = "gemini-2.5-flash"
relay_url = "http://localhost:8080/"
log_file = "/tmp/gemterm.log"
"#;
        let config: Config = toml::from_str(raw).expect("parses");
        assert_eq!(config.mode, TransportMode::Proxied);
        assert_eq!(config.relay_url, "http://localhost:8080/");
        assert_eq!(
            config.log_file.as_deref(),
            Some(Path::new("/tmp/gemterm.log"))
        );
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(toml::from_str::<Config>("mode = \"carrier-pigeon\"").is_err());
    }
}
