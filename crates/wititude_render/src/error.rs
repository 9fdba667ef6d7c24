//! # Render Error Types

use thiserror::Error;
use wititude_core::{FrameError, TargetId};

/// Errors raised by a draw sink or the render loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The surface is paused, destroyed, or not created yet.
    #[error("render surface not available")]
    SurfaceUnavailable,

    /// The surface refused to start a frame.
    #[error("failed to begin frame {frame}: {reason}")]
    BeginFrame {
        /// Frame number.
        frame: u64,
        /// Reason reported by the surface.
        reason: String,
    },

    /// A single draw was rejected.
    #[error("draw for target '{target}' rejected: {reason}")]
    Draw {
        /// Target being drawn.
        target: TargetId,
        /// Reason reported by the surface.
        reason: String,
    },

    /// The surface failed to present.
    #[error("failed to present frame {frame}: {reason}")]
    Present {
        /// Frame number.
        frame: u64,
        /// Reason reported by the surface.
        reason: String,
    },
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

impl From<RenderError> for FrameError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::SurfaceUnavailable => Self::SurfaceUnavailable,
            other => Self::Surface(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_frame_error() {
        assert_eq!(FrameError::from(RenderError::SurfaceUnavailable), FrameError::SurfaceUnavailable);

        let err = RenderError::Draw {
            target: "bottle".into(),
            reason: "context lost".into(),
        };
        assert_eq!(
            FrameError::from(err),
            FrameError::Surface("draw for target 'bottle' rejected: context lost".into())
        );
    }
}
