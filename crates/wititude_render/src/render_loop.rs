//! Render Loop - one registry read and two passes per driver tick.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        FRAME TIMELINE                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ├── Begin Frame                                             │
//! │  │   ├── Snapshot registry key set                           │
//! │  │   └── Resolve each pair once (never a torn pair)          │
//! │  ├── Pass 1: Occluders (depth only)                          │
//! │  ├── Pass 2: Stroked cubes                                   │
//! │  └── Present                                                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use wititude_core::{FrameCallback, FrameError, FrameTick, Mat4, RenderablePair, RenderableRegistry, TargetId};

use crate::command::DrawCommand;
use crate::error::RenderResult;
use crate::sink::DrawSink;

/// Configuration for the render loop
#[derive(Debug, Clone)]
pub struct RenderLoopConfig {
    /// Maximum frame time before warning (microseconds)
    pub frame_budget_us: u32,
    /// Vertical field of view of the initial projection (radians)
    pub fov_y: f32,
    /// Aspect ratio of the initial projection
    pub aspect: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

impl RenderLoopConfig {
    /// Config with a frame budget matching `target_fps`.
    #[must_use]
    pub fn for_fps(target_fps: u32) -> Self {
        Self {
            frame_budget_us: 1_000_000 / target_fps.max(1),
            ..Self::default()
        }
    }

    /// Projection used until the capture layer reports one.
    #[must_use]
    pub fn initial_projection(&self) -> Mat4 {
        Mat4::perspective(self.fov_y, self.aspect, self.near, self.far)
    }
}

impl Default for RenderLoopConfig {
    fn default() -> Self {
        Self {
            frame_budget_us: 33_333, // 30fps
            fov_y: 60.0_f32.to_radians(),
            aspect: 9.0 / 16.0,
            near: 0.05,
            far: 100.0,
        }
    }
}

/// Result of a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Frame number
    pub frame_number: u64,
    /// Total frame time (microseconds)
    pub frame_time_us: u32,
    /// Targets drawn
    pub targets_drawn: u32,
    /// Targets in the key set that were gone by the time they were read
    pub targets_skipped: u32,
    /// Draws submitted
    pub draws_submitted: u32,
    /// Over budget warning
    pub over_budget: bool,
}

/// Statistics for the render loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderLoopStats {
    /// Frames presented
    pub total_frames: u64,
    /// Frames abandoned because the sink failed
    pub failed_frames: u64,
    /// Draws submitted across all frames
    pub draws_submitted: u64,
    /// Targets skipped because they were removed mid-frame
    pub targets_skipped: u64,
    /// Worst frame time (microseconds)
    pub worst_frame_time_us: u32,
    /// Frames over budget
    pub frames_over_budget: u32,
}

/// Reads the registry and drives a [`DrawSink`].
///
/// Never writes to the registry and never waits for a tracking write.
pub struct RenderLoop {
    config: RenderLoopConfig,
    registry: Arc<RenderableRegistry>,
    sink: Box<dyn DrawSink>,
    projection: Mat4,
    stats: RenderLoopStats,
}

impl RenderLoop {
    /// Creates a render loop reading `registry` and drawing into `sink`.
    #[must_use]
    pub fn new(config: RenderLoopConfig, registry: Arc<RenderableRegistry>, sink: Box<dyn DrawSink>) -> Self {
        Self {
            projection: config.initial_projection(),
            config,
            registry,
            sink,
            stats: RenderLoopStats::default(),
        }
    }

    /// Replaces the projection used from the next frame on.
    pub fn set_projection(&mut self, projection: Mat4) {
        tracing::debug!("projection updated");
        self.projection = projection;
    }

    /// Projection currently applied.
    #[must_use]
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Executes one frame.
    ///
    /// # Errors
    ///
    /// Whatever the sink reports. The frame is abandoned; the next tick
    /// starts clean.
    pub fn tick(&mut self, tick: &FrameTick) -> RenderResult<FrameReport> {
        let frame_start = Instant::now();

        match self.draw_frame(tick.frame) {
            Ok((targets_drawn, targets_skipped, draws_submitted)) => {
                let frame_time_us = u32::try_from(frame_start.elapsed().as_micros()).unwrap_or(u32::MAX);
                let over_budget = frame_time_us > self.config.frame_budget_us;

                self.stats.total_frames += 1;
                self.stats.draws_submitted += u64::from(draws_submitted);
                self.stats.targets_skipped += u64::from(targets_skipped);
                self.stats.worst_frame_time_us = self.stats.worst_frame_time_us.max(frame_time_us);
                if over_budget {
                    self.stats.frames_over_budget += 1;
                    tracing::warn!(frame = tick.frame, frame_time_us, "frame over budget");
                }

                Ok(FrameReport {
                    frame_number: tick.frame,
                    frame_time_us,
                    targets_drawn,
                    targets_skipped,
                    draws_submitted,
                    over_budget,
                })
            }
            Err(err) => {
                self.stats.failed_frames += 1;
                Err(err)
            }
        }
    }

    fn draw_frame(&mut self, frame: u64) -> RenderResult<(u32, u32, u32)> {
        self.sink.begin_frame(frame)?;

        let committed = self.registry.snapshot();
        let mut skipped = 0u32;
        let pairs: Vec<(TargetId, Arc<RenderablePair>)> = committed
            .ids()
            .into_iter()
            .filter_map(|id| match self.registry.get_or_committed(id.as_str(), &committed) {
                Some(pair) => Some((id, pair)),
                None => {
                    skipped += 1;
                    None
                }
            })
            .collect();

        let mut draws = 0u32;

        // === PASS 1: Occluders ===
        for (id, pair) in &pairs {
            let command = DrawCommand::for_drawable(id.clone(), &pair.occluder, self.projection, [0.0; 4], 0.0);
            self.sink.draw(&command)?;
            draws += 1;
        }

        // === PASS 2: Primaries ===
        for (id, pair) in &pairs {
            let primary = &pair.primary;
            let command =
                DrawCommand::for_drawable(id.clone(), primary, self.projection, primary.color, primary.line_width);
            self.sink.draw(&command)?;
            draws += 1;
        }

        self.sink.end_frame()?;

        let drawn = u32::try_from(pairs.len()).unwrap_or(u32::MAX);
        Ok((drawn, skipped, draws))
    }

    /// Forwards a surface resume.
    pub fn on_resume(&mut self) {
        self.sink.on_resume();
    }

    /// Forwards a surface pause.
    pub fn on_pause(&mut self) {
        self.sink.on_pause();
    }

    /// Returns statistics
    #[must_use]
    pub fn stats(&self) -> RenderLoopStats {
        self.stats
    }

    /// Registry being read.
    #[must_use]
    pub fn registry(&self) -> &Arc<RenderableRegistry> {
        &self.registry
    }
}

/// Wraps a shared render loop as a frame driver callback.
///
/// The lock is only contended by projection updates and stats reads, never
/// by the tracking thread.
#[must_use]
pub fn frame_callback(render_loop: Arc<Mutex<RenderLoop>>) -> FrameCallback {
    Box::new(move |tick: &FrameTick| {
        render_loop.lock().tick(tick).map(|_| ()).map_err(FrameError::from)
    })
}
