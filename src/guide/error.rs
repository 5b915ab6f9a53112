//! Error types for guide generation

use thiserror::Error;

use crate::models::Millis;
use crate::resolver::ResolveError;

/// Result type for guide operations
pub type GuideResult<T> = Result<T, GuideError>;

/// Guide build and refresh errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuideError {
    /// The walk hit an item that would never advance the clock
    #[error("Channel {channel}: program at {at} has no duration")]
    ZeroDuration { channel: u32, at: Millis },

    /// A timestamp cannot be represented as a calendar date
    #[error("Timestamp {0} is out of range")]
    TimeOutOfRange(Millis),

    #[error("Requested window [{start}, {end}) is empty")]
    EmptyWindow { start: Millis, end: Millis },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The build task panicked or was aborted
    #[error("Guide build did not complete: {0}")]
    BuildAborted(String),

    #[error("Guide source failed: {0}")]
    Source(String),

    /// The refresh task is gone and no guide will ever be published
    #[error("Guide service closed")]
    ServiceClosed,
}

impl GuideError {
    /// Create a source error
    pub fn source_failed(reason: impl Into<String>) -> Self {
        Self::Source(reason.into())
    }

    /// Check if a retry may succeed
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::EmptyWindow { .. } | Self::ServiceClosed)
    }
}
