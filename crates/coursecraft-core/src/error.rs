//! Error types for the Coursecraft core.
//!
//! This module defines the errors raised by the pure course model: input
//! validation, malformed course or assessment payloads, navigator misuse and
//! assessment answering rules.

use crate::assessment::AssessmentError;

/// A specialized `Result` type for core operations.
pub type Result<T> = std::result::Result<T, CourseError>;

/// Errors that can occur while validating input or navigating course data.
///
/// Every variant renders a message suitable for showing inline to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CourseError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// User input was rejected before any network call was made.
    #[error("{message}")]
    Validation {
        /// The input field that failed validation.
        field: &'static str,
        /// Human-readable reason shown next to the field.
        message: String,
    },

    // ========================================================================
    // Data Integrity Errors
    // ========================================================================
    /// Lesson or assessment data is missing fields the screens rely on.
    #[error("{what} not available: {reason}")]
    DataIntegrity {
        /// What could not be shown (e.g. "Assessment").
        what: String,
        /// Description of the missing or malformed data.
        reason: String,
    },

    // ========================================================================
    // State Machine Errors
    // ========================================================================
    /// Invalid screen transition attempted.
    #[error("Invalid screen transition: cannot go from {from} to {to}")]
    InvalidTransition {
        /// The current screen.
        from: String,
        /// The attempted target screen.
        to: String,
    },

    /// An assessment answering rule was violated.
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
}

impl CourseError {
    /// Creates a new `Validation` error for the given field.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Creates a new `DataIntegrity` error.
    #[must_use]
    pub fn data_integrity(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataIntegrity {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidTransition` error.
    #[must_use]
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Returns `true` if this error came from rejected user input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns `true` if this error means data should render as "not available".
    #[must_use]
    pub const fn is_data_integrity(&self) -> bool {
        matches!(self, Self::DataIntegrity { .. })
    }
}
