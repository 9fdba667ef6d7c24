//! # Wititude
//!
//! Tracks a physical object through the camera and keeps a wireframe cube
//! (plus an invisible occluder) locked onto it.
//!
//! ## Threads
//!
//! ```text
//! UI thread          lifecycle hooks ──► Session
//! Tracking SDK       TrackingListener ──► TrackingSender ─┐
//! Tracking pump      TrackingEventHandler ◄───────────────┘ ──► RenderableRegistry
//! Frame driver       RenderLoop (reads registry) ──► DrawSink
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use wititude::sim::{simulated_platform, CallLog};
//! use wititude::{Session, SessionConfig};
//! use wititude_render::RecordingSink;
//! use wititude_tracking::status_channel;
//!
//! let (status, _ui) = status_channel(16);
//! let mut session = Session::create(SessionConfig::default(), simulated_platform(&CallLog::new()), status)?;
//! session.on_surface_ready(Box::new(RecordingSink::default()))?;
//! session.on_resume()?;
//! session.on_pause();
//! session.on_destroy();
//! # Ok::<(), wititude::SessionError>(())
//! ```

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod platform;
pub mod session;
pub mod sim;

pub use config::{CameraPosition, CameraResolution, SessionConfig, MAX_TARGET_FPS};
pub use error::{SessionError, SessionResult};
pub use platform::{
    CapabilityGate, CaptureSession, CaptureSettings, Feature, Permission, PermissionBroker, PermissionOutcome,
    Platform, ProjectionUpdate, TargetLoader,
};
pub use session::{Session, SessionState, SessionStats};

// Re-export the building blocks
pub use wititude_core as core;
pub use wititude_render as render;
pub use wititude_tracking as tracking;
