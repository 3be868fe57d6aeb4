//! Configuration for the Coursecraft client.
//!
//! Settings live in `coursecraft.json` (camelCase keys). Every field has a
//! default, so a missing file or an empty object is a valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::ENGINE_IO_QUERY;
use crate::error::{ClientError, Result};

/// The default config file name.
pub const CONFIG_FILE_NAME: &str = "coursecraft.json";

/// Default backend base URL.
fn default_server_url() -> String {
    "http://localhost:8000".to_string()
}

/// Default Socket.IO endpoint path.
fn default_channel_path() -> String {
    "/socket.io/".to_string()
}

/// Default pause between the final progress snapshot and the handoff.
const fn default_completion_delay_ms() -> u64 {
    1000
}

/// Default timeout for backend requests. Course generation is slow.
const fn default_request_timeout_secs() -> u64 {
    900
}

/// Default timeout for establishing connections.
const fn default_connect_timeout_secs() -> u64 {
    10
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base URL of the course backend, e.g. `http://localhost:8000`.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Socket.IO endpoint path of the progress channel on the same server.
    #[serde(default = "default_channel_path")]
    pub channel_path: String,

    /// Milliseconds to keep the finished progress panel visible before
    /// opening the course.
    #[serde(default = "default_completion_delay_ms")]
    pub completion_delay_ms: u64,

    /// Overall timeout for a backend request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Timeout for connecting to the backend, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            channel_path: default_channel_path(),
            completion_delay_ms: default_completion_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `coursecraft.json` in the current directory. If not found,
    /// returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is invalid.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            ClientError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads `coursecraft.json` from a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is invalid.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ConfigParseError` if the file cannot be read or
    /// parsed, and `ClientError::ConfigValidationError` if a value is invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(ClientError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ClientError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        let url = self.server_url.trim();
        if url.is_empty() {
            return Err(ClientError::config_validation(
                "serverUrl must not be empty",
                "Set serverUrl to the course backend, e.g. \"http://localhost:8000\"",
            ));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ClientError::config_validation(
                format!("serverUrl '{url}' must start with http:// or https://"),
                "Use a full URL such as \"http://localhost:8000\" in your coursecraft.json or --server",
            ));
        }

        if !self.channel_path.starts_with('/') {
            return Err(ClientError::config_validation(
                format!("channelPath '{}' must start with '/'", self.channel_path),
                "Set channelPath to an absolute path such as \"/socket.io/\" in your coursecraft.json",
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ClientError::config_validation(
                "requestTimeoutSecs must be greater than 0",
                "Set requestTimeoutSecs to at least 1 second in your coursecraft.json",
            ));
        }

        if self.connect_timeout_secs == 0 {
            return Err(ClientError::config_validation(
                "connectTimeoutSecs must be greater than 0",
                "Set connectTimeoutSecs to at least 1 second in your coursecraft.json",
            ));
        }

        Ok(())
    }

    /// Full URL of a backend endpoint.
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.server_url.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// WebSocket URL of the progress channel, including the Engine.IO
    /// query.
    #[must_use]
    pub fn channel_url(&self) -> String {
        let base = self.server_url.trim().trim_end_matches('/');
        let base = base.strip_prefix("https://").map_or_else(
            || {
                base.strip_prefix("http://")
                    .map_or_else(|| base.to_string(), |rest| format!("ws://{rest}"))
            },
            |rest| format!("wss://{rest}"),
        );
        format!("{base}{}?{ENGINE_IO_QUERY}", self.channel_path)
    }

    /// Display delay before a finished progress run hands off.
    #[must_use]
    pub const fn completion_delay(&self) -> Duration {
        Duration::from_millis(self.completion_delay_ms)
    }

    /// Overall request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Connection timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
