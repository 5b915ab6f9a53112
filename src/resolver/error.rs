//! Error types for lineup resolution

use thiserror::Error;

use crate::models::Millis;

/// Result type for resolver operations
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Resolver errors
///
/// Apart from [`ResolveError::UnknownChannel`] these never escape a
/// resolution call. They are logged and answered with flex.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Channel {0} does not exist")]
    UnknownChannel(u32),

    #[error("Channel {channel} has an empty lineup")]
    EmptyLineup { channel: u32 },

    #[error("Channel {channel}: item {index} has negative duration {duration}")]
    NegativeDuration {
        channel: u32,
        index: usize,
        duration: Millis,
    },

    #[error("Channel {channel}: lineup has no playable time")]
    ZeroTotal { channel: u32 },

    #[error("Channel {channel}: items sum to {actual} but the lineup records {recorded}")]
    InconsistentTotal {
        channel: u32,
        recorded: Millis,
        actual: Millis,
    },
}

impl ResolveError {
    /// Channel the error is about
    pub fn channel(&self) -> u32 {
        match self {
            Self::UnknownChannel(channel) => *channel,
            Self::EmptyLineup { channel }
            | Self::NegativeDuration { channel, .. }
            | Self::ZeroTotal { channel }
            | Self::InconsistentTotal { channel, .. } => *channel,
        }
    }
}
