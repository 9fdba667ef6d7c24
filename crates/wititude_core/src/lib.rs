//! # Wititude Core
//!
//! Renderable state for tracked physical objects, shared between the
//! tracking thread (writer) and the render thread (reader).
//!
//! ## Architecture
//!
//! ```text
//! Tracking thread                                     Render thread
//! ───────────────                                     ─────────────
//! recognized ──► put ────────┐
//! tracked    ──► update ─────┼──► RenderableRegistry ──► snapshot / get
//! lost       ──► remove ─────┘      (copy-on-write)          │
//!                                                             ▼
//!                                   FrameDriver ──tick──► render callback
//! ```
//!
//! ## Rules
//!
//! 1. Writers never block readers for longer than one pointer swap.
//! 2. A reader sees a whole [`RenderablePair`] from one snapshot, never a mix.
//! 3. A failing frame is logged and the driver keeps ticking.

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod driver;
pub mod error;
pub mod math;
pub mod renderable;
pub mod sync;
pub mod target;

pub use driver::{DriverConfig, DriverState, DriverStats, FrameCallback, FrameDriver, FrameTick};
pub use error::{FrameError, FrameResult};
pub use math::{Mat4, Vec3};
pub use renderable::{DrawRole, Drawable, OccluderCube, RenderablePair, StrokedCube, TransformSnapshot};
pub use sync::{OccluderRef, PrimaryRef, RegistrySnapshot, RenderableRegistry};
pub use target::TargetId;
