//! # Draw Sink
//!
//! The platform render surface, seen from the render loop. A sink receives
//! one `begin_frame`, any number of `draw` calls, and one `end_frame` per
//! tick, always on the driver thread.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use wititude_core::TargetId;

use crate::command::DrawCommand;
use crate::error::{RenderError, RenderResult};

/// Render surface the loop submits to.
pub trait DrawSink: Send {
    /// Starts frame `frame`.
    ///
    /// # Errors
    ///
    /// Any [`RenderError`]; the frame is abandoned.
    fn begin_frame(&mut self, frame: u64) -> RenderResult<()>;

    /// Submits one draw.
    ///
    /// # Errors
    ///
    /// Any [`RenderError`]; the frame is abandoned.
    fn draw(&mut self, command: &DrawCommand) -> RenderResult<()>;

    /// Presents the frame.
    ///
    /// # Errors
    ///
    /// Any [`RenderError`].
    fn end_frame(&mut self) -> RenderResult<()>;

    /// The surface came to the foreground.
    fn on_resume(&mut self) {}

    /// The surface went to the background.
    fn on_pause(&mut self) {}
}

/// One presented frame as seen by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    /// Frame number passed to `begin_frame`.
    pub frame: u64,
    /// Draws in submission order.
    pub draws: Vec<DrawCommand>,
}

impl RecordedFrame {
    /// Targets drawn in this frame, in submission order, one per draw.
    #[must_use]
    pub fn targets(&self) -> Vec<&str> {
        self.draws.iter().map(|d| d.target.as_str()).collect()
    }
}

#[derive(Debug, Default)]
struct LogInner {
    frames: VecDeque<RecordedFrame>,
    retained: usize,
    presented: u64,
    resumes: u32,
    pauses: u32,
    paused: bool,
    fail_target: Option<TargetId>,
}

/// Shared view of what a [`RecordingSink`] has seen.
///
/// Stays readable after the sink moves into the render loop.
#[derive(Debug, Clone)]
pub struct SinkLog {
    inner: Arc<Mutex<LogInner>>,
}

impl SinkLog {
    /// Retained frames, oldest first.
    #[must_use]
    pub fn frames(&self) -> Vec<RecordedFrame> {
        self.inner.lock().frames.iter().cloned().collect()
    }

    /// Most recent presented frame.
    #[must_use]
    pub fn last_frame(&self) -> Option<RecordedFrame> {
        self.inner.lock().frames.back().cloned()
    }

    /// Frames presented since creation (including ones no longer retained).
    #[must_use]
    pub fn presented(&self) -> u64 {
        self.inner.lock().presented
    }

    /// Number of `on_resume` calls.
    #[must_use]
    pub fn resumes(&self) -> u32 {
        self.inner.lock().resumes
    }

    /// Number of `on_pause` calls.
    #[must_use]
    pub fn pauses(&self) -> u32 {
        self.inner.lock().pauses
    }

    /// True between `on_pause` and the next `on_resume`.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.inner.lock().paused
    }

    /// Makes every draw for `target` fail until cleared.
    pub fn fail_draws_for(&self, target: impl Into<TargetId>) {
        self.inner.lock().fail_target = Some(target.into());
    }

    /// Stops injecting draw failures.
    pub fn clear_failures(&self) {
        self.inner.lock().fail_target = None;
    }
}

/// In-memory sink for tests and headless runs.
///
/// Keeps the last `retained` presented frames. Rejects frames while paused.
#[derive(Debug)]
pub struct RecordingSink {
    log: SinkLog,
    current: Option<RecordedFrame>,
}

impl RecordingSink {
    /// Creates a sink keeping the last `retained` frames.
    #[must_use]
    pub fn new(retained: usize) -> Self {
        Self {
            log: SinkLog {
                inner: Arc::new(Mutex::new(LogInner {
                    retained: retained.max(1),
                    ..LogInner::default()
                })),
            },
            current: None,
        }
    }

    /// Handle for inspecting recorded frames.
    #[must_use]
    pub fn log(&self) -> SinkLog {
        self.log.clone()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new(64)
    }
}

impl DrawSink for RecordingSink {
    fn begin_frame(&mut self, frame: u64) -> RenderResult<()> {
        if self.log.is_paused() {
            return Err(RenderError::SurfaceUnavailable);
        }
        self.current = Some(RecordedFrame {
            frame,
            draws: Vec::new(),
        });
        Ok(())
    }

    fn draw(&mut self, command: &DrawCommand) -> RenderResult<()> {
        let failing = self.log.inner.lock().fail_target.clone();
        if failing.as_ref() == Some(&command.target) {
            self.current = None;
            return Err(RenderError::Draw {
                target: command.target.clone(),
                reason: "injected failure".to_string(),
            });
        }
        let current = self.current.as_mut().ok_or(RenderError::SurfaceUnavailable)?;
        current.draws.push(command.clone());
        Ok(())
    }

    fn end_frame(&mut self) -> RenderResult<()> {
        let frame = self.current.take().ok_or(RenderError::SurfaceUnavailable)?;
        let mut inner = self.log.inner.lock();
        if inner.frames.len() == inner.retained {
            inner.frames.pop_front();
        }
        inner.frames.push_back(frame);
        inner.presented += 1;
        Ok(())
    }

    fn on_resume(&mut self) {
        let mut inner = self.log.inner.lock();
        inner.resumes += 1;
        inner.paused = false;
    }

    fn on_pause(&mut self) {
        let mut inner = self.log.inner.lock();
        inner.pauses += 1;
        inner.paused = true;
        self.current = None;
    }
}
