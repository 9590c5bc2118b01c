//! Error types for playback management

use thiserror::Error;

/// Playback errors
///
/// Only load failures reach callers of transport intents. Out-of-range seek
/// and volume values are clamped, stale callbacks are dropped, and intents
/// on an empty queue are no-ops, so none of those have a variant here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// The audio backend could not load a source
    #[error("Failed to load audio source {source_ref}: {message}")]
    AudioLoad {
        /// Source reference that failed to load
        source_ref: String,
        /// Backend-provided reason
        message: String,
    },

    /// The player task has shut down and no longer accepts commands
    #[error("Player is closed")]
    PlayerClosed,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PlaybackError {
    /// Create an audio load error
    pub fn audio_load(source_ref: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AudioLoad {
            source_ref: source_ref.into(),
            message: message.into(),
        }
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
