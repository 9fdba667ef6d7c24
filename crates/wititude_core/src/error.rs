//! # Frame Error Types
//!
//! Errors a single frame callback can report to the frame driver.

use thiserror::Error;

/// A failed frame.
///
/// The driver logs these and keeps ticking; they never stop the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The render surface rejected the frame.
    #[error("render surface rejected frame: {0}")]
    Surface(String),

    /// The render surface is gone (destroyed or not yet created).
    #[error("render surface unavailable")]
    SurfaceUnavailable,

    /// The frame callback panicked.
    #[error("frame callback panicked: {0}")]
    Panicked(String),
}

/// Result type for frame callbacks.
pub type FrameResult<T> = Result<T, FrameError>;
