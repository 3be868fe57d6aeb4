//! Error types for the Coursecraft client.
//!
//! Covers configuration loading, backend requests, the progress channel and
//! workflow misuse. Core errors (validation, data integrity, navigation) are
//! wrapped transparently.

use std::path::PathBuf;

use coursecraft_core::CourseError;

/// A specialized `Result` type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the course backend or driving the
/// app.
///
/// Variants carry actionable suggestions where the user can fix the cause.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your coursecraft.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Network Errors
    // ========================================================================
    /// The request never produced an HTTP response.
    #[error("Network error: {message}")]
    NetworkError {
        /// Description of the transport failure.
        message: String,
    },

    /// The request exceeded the configured timeout.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout {
        /// The timeout that expired, in seconds.
        timeout_secs: u64,
    },

    /// The server answered with an error.
    #[error("{message}")]
    ServerError {
        /// HTTP status, when the server sent one.
        status: Option<u16>,
        /// Error text from the `error` field, or a generic description.
        message: String,
    },

    // ========================================================================
    // Progress Channel Errors
    // ========================================================================
    /// The push channel failed. Logged only; progress stalls.
    #[error("Progress channel error: {message}")]
    ChannelError {
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // Workflow Errors
    // ========================================================================
    /// A course request is already in flight.
    #[error("A course is already being created")]
    Busy,

    /// Validation, data integrity or navigation failure from the core model.
    #[error(transparent)]
    Core(#[from] CourseError),

    // ========================================================================
    // Encoding Errors
    // ========================================================================
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `NetworkError`.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates a new `ServerError`.
    #[must_use]
    pub fn server(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            message: message.into(),
        }
    }

    /// The error for a 2xx response without the expected fields.
    #[must_use]
    pub fn invalid_response() -> Self {
        Self::server(None, "Invalid response from server")
    }

    /// Creates a new `ChannelError`.
    #[must_use]
    pub fn channel(message: impl Into<String>) -> Self {
        Self::ChannelError {
            message: message.into(),
        }
    }

    /// Returns `true` if this error came from rejected user input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Core(e) if e.is_validation())
    }

    /// Returns `true` if the request failed before or during transport.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::NetworkError { .. } | Self::Timeout { .. })
    }

    /// Text shown inline on the home screen.
    ///
    /// Validation failures are shown as-is; everything else is prefixed the
    /// way a failed creation is reported.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Core(e) if e.is_validation() => e.to_string(),
            Self::Busy => self.to_string(),
            Self::Timeout { .. } => "Failed to create course: request timed out".to_string(),
            other => format!("Failed to create course: {other}"),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::invalid_response()
        } else {
            Self::network(e.to_string())
        }
    }
}
