//! # Wititude Tracking
//!
//! The producer side: turns tracking events into registry writes.
//!
//! ## Event Flow
//!
//! ```text
//! Tracking SDK thread                 Tracking pump thread
//! ───────────────────                 ────────────────────
//! TrackingListener ──► TrackingSender ──► TrackingEventHandler ──► RenderableRegistry
//!                                                 │
//!                                                 └──► StatusSender ──► UI (fire and forget)
//! ```
//!
//! Per-target order is whatever the source delivers. Events for targets
//! that are not (or no longer) tracked are absorbed silently.

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod events;
pub mod handler;
pub mod pose;
pub mod pump;
pub mod status;

pub use error::{TrackingError, TrackingResult};
pub use events::{tracking_channel, TrackingEvent, TrackingListener, TrackingReceiver, TrackingSender};
pub use handler::{HandlerStats, TrackingEventHandler};
pub use pose::{Pose, TrackingQuality};
pub use pump::TrackingPump;
pub use status::{status_channel, StatusNotification, StatusReceiver, StatusSender, LOADING_LABEL, SCAN_LABEL};
