//! # Session Error Types

use thiserror::Error;
use wititude_tracking::TrackingError;

use crate::session::SessionState;

/// Errors from session setup and lifecycle.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The device cannot run object tracking. Never retried.
    #[error("device is missing required features: {0}")]
    CapabilityMissing(String),

    /// The user refused the listed permissions.
    #[error("permissions denied: {}", .0.join(", "))]
    PermissionDenied(Vec<String>),

    /// Configuration values are out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration file is not valid TOML for [`crate::SessionConfig`].
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The capture session refused an operation.
    #[error("capture session error: {0}")]
    Capture(String),

    /// Operation not allowed in the current lifecycle state.
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        /// Operation attempted.
        operation: &'static str,
        /// State the session was in.
        state: SessionState,
    },

    /// The render surface already reported ready.
    #[error("render surface already attached")]
    SurfaceAlreadyAttached,

    /// Tracking plumbing failed.
    #[error(transparent)]
    Tracking(#[from] TrackingError),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
