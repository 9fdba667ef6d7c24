//! # Wititude Render
//!
//! The consumer side: once per driver tick, read the registry and submit
//! draws for every tracked target.
//!
//! ## Frame
//!
//! ```text
//! FrameTick ──► RenderLoop::tick
//!                 ├── snapshot registry key set
//!                 ├── resolve each pair once (get_or_committed)
//!                 ├── Pass 1: occluders (depth only)
//!                 ├── Pass 2: primaries (stroked cubes)
//!                 └── DrawSink::end_frame
//! ```
//!
//! The sink is the platform surface. [`RecordingSink`] keeps the commands
//! in memory for tests and headless runs.

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod command;
pub mod error;
pub mod render_loop;
pub mod sink;

pub use command::{DrawCommand, DrawUniforms};
pub use error::{RenderError, RenderResult};
pub use render_loop::{frame_callback, FrameReport, RenderLoop, RenderLoopConfig, RenderLoopStats};
pub use sink::{DrawSink, RecordedFrame, RecordingSink, SinkLog};
