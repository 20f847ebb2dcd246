//! Server configuration.

use std::path::Path;

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::lobby::DEFAULT_MAX_PASSWORD_LEN;

/// Runtime settings, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    host: String,

    /// Port to bind.
    port: u16,

    /// Longest accepted room password, in characters.
    max_password_len: usize,

    /// Leave the room when the last lobby connection of a player closes.
    leave_on_disconnect: bool,

    /// Fixes color assignment when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    color_seed: Option<u64>,

    /// Fallback tracing filter when `RUST_LOG` is unset.
    log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_password_len: DEFAULT_MAX_PASSWORD_LEN,
            leave_on_disconnect: true,
            color_seed: None,
            log_filter: "info,reversi_lobby=debug".to_string(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(host = %config.host, port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Loads `path` if given, defaults otherwise.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Overrides the bind address where a value is given.
    pub fn with_bind(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    /// Pins color assignment to a seed.
    pub fn with_color_seed(mut self, seed: u64) -> Self {
        self.color_seed = Some(seed);
        self
    }

    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::new(format!("Failed to render config: {}", e)))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "port = 8080\nleave_on_disconnect = false").expect("write");

        let config = ServerConfig::from_file(file.path()).expect("loads");

        assert_eq!(*config.port(), 8080);
        assert!(!config.leave_on_disconnect());
        assert_eq!(config.host(), "127.0.0.1");
        assert_eq!(*config.max_password_len(), 12);
        assert_eq!(*config.color_seed(), None);
    }

    #[test]
    fn test_bad_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "port = \"eighty\"").expect("write");

        let err = ServerConfig::from_file(file.path()).expect_err("should fail");
        assert!(err.message.starts_with("Failed to parse config"));
    }

    #[test]
    fn test_missing_file() {
        let err = ServerConfig::load(Some(Path::new("/nonexistent/reversi.toml")))
            .expect_err("should fail");
        assert!(err.message.starts_with("Failed to read config file"));
    }

    #[test]
    fn test_cli_overrides_and_toml_output() {
        let config = ServerConfig::default()
            .with_bind(Some("0.0.0.0".into()), None)
            .with_color_seed(7);
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");

        let rendered = config.to_toml().expect("renders");
        let reparsed: ServerConfig = toml::from_str(&rendered).expect("parses");
        assert_eq!(reparsed, config);
    }
}
