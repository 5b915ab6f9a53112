//! Unified error handling for the slotcast crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`SlotcastErrorTrait`] - Common interface implemented by the unified error
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use slotcast::error::{Error, ErrorCategory, SlotcastErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Retrying: {}", err);
//!     } else {
//!         eprintln!("Fatal error ({}): {}", err.category(), err);
//!     }
//! }
//! ```

use std::fmt;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::guide::error::GuideError;
pub use crate::resolver::error::ResolveError;
pub use crate::scheduler::error::SchedulerError;

/// Common trait for slotcast error types
pub trait SlotcastErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Schedule configuration rejected before generation
    Validation,
    /// Lineup generation errors
    Scheduler,
    /// Lineup resolution errors
    Resolution,
    /// Guide build and refresh errors
    Guide,
    /// Parsing and serialization errors
    Parsing,
    /// Configuration errors
    Config,
    /// Other/unknown errors
    Other,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Scheduler => "scheduler",
            Self::Resolution => "resolution",
            Self::Guide => "guide",
            Self::Parsing => "parsing",
            Self::Config => "config",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Unified error type for the slotcast crate
#[derive(Error, Debug)]
pub enum Error {
    /// Schedule validation and generation errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Lineup resolution errors
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Guide errors
    #[error("Guide error: {0}")]
    Guide(#[from] GuideError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SlotcastErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Scheduler(e) => e.is_recoverable(),
            Self::Resolve(_) => false,
            Self::Guide(e) => e.is_recoverable(),
            Self::Json(_) => false,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Scheduler(SchedulerError::Validation { .. }) => ErrorCategory::Validation,
            Self::Scheduler(_) => ErrorCategory::Scheduler,
            Self::Resolve(_) => ErrorCategory::Resolution,
            Self::Guide(_) => ErrorCategory::Guide,
            Self::Json(_) => ErrorCategory::Parsing,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
