//! # Tracking → Render Synchronization
//!
//! ## The Problem
//!
//! ```text
//! Tracking thread:  put / update_transform / remove   (unpredictable rate)
//! Render thread:    read every tracked pair           (fixed rate)
//!
//! Without synchronization: torn pairs, primary and occluder out of step
//! With one big lock:       render tick stalls behind tracking bursts
//! ```
//!
//! ## The Solution: Copy-on-Write Entries
//!
//! ```text
//! Writer:  clone map ─► replace Arc<RenderablePair> ─► swap committed Arc
//! Reader:  clone committed Arc (one pointer copy) ─► draw without any lock
//! ```
//!
//! A reader holds whichever map was committed when it looked. A retired pair
//! is dropped when the last reader lets go of it.

mod registry;

pub use registry::{OccluderRef, PrimaryRef, RegistrySnapshot, RenderableRegistry};
