//! # Tracking Error Types

use thiserror::Error;

/// Errors from the tracking event plumbing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackingError {
    /// The consuming side of the event channel is gone.
    #[error("tracking event channel disconnected")]
    Disconnected,

    /// A quality change was discarded because the channel is full.
    #[error("tracking event channel full, quality change dropped")]
    QueueFull,

    /// The pump thread could not be started.
    #[error("failed to spawn tracking pump: {0}")]
    PumpSpawn(String),
}

/// Result type for tracking operations.
pub type TrackingResult<T> = Result<T, TrackingError>;
