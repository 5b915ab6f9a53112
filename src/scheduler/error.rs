//! Error types for the scheduler module

use std::fmt;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerError {
    /// Schedule configuration rejected before generation
    Validation {
        field: String,
        reason: String,
    },

    /// A show grouping has no programs to iterate
    EmptyShow {
        show: String,
    },

    /// Failed to generate schedule
    GenerationFailed {
        reason: String,
    },

    /// Serialization/deserialization error
    SerializationError {
        reason: String,
    },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { field, reason } => {
                write!(f, "Invalid schedule field '{}': {}", field, reason)
            }
            Self::EmptyShow { show } => {
                write!(f, "Show '{}' has no programs", show)
            }
            Self::GenerationFailed { reason } => {
                write!(f, "Failed to generate schedule: {}", reason)
            }
            Self::SerializationError { reason } => {
                write!(f, "Serialization error: {}", reason)
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            reason: err.to_string(),
        }
    }
}

impl SchedulerError {
    /// Create a validation error for a configuration field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an empty show error
    pub fn empty_show(show: impl ToString) -> Self {
        Self::EmptyShow {
            show: show.to_string(),
        }
    }

    /// Create a generation failure
    pub fn generation_failed(reason: impl Into<String>) -> Self {
        Self::GenerationFailed {
            reason: reason.into(),
        }
    }

    /// Offending configuration field, for validation errors
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Check if the error is recoverable
    ///
    /// Runtime anomalies are degraded to flex during generation; configuration
    /// errors have to be fixed by the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EmptyShow { .. })
    }
}
