//! # Frame Driver
//!
//! Fixed-rate timer that invokes the render callback on its own thread,
//! independent of how often tracking events arrive.
//!
//! ## Design
//!
//! ```text
//!            start()                       stop()
//! Stopped ───────────► Running ──────────────────────► Stopped
//!                        │  ▲
//!                 wait_until(deadline)
//!                        ▼  │
//!                   callback(&FrameTick)
//! ```
//!
//! - One worker thread per `start()`. Each worker belongs to an epoch; `stop()`
//!   bumps the epoch so a worker that wakes up late exits instead of ticking.
//! - An overrunning frame does not queue catch-up ticks. The next tick fires
//!   as soon as the slow one returns and pacing resumes from there.
//! - Errors and panics from the callback are logged and counted. The driver
//!   keeps ticking.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{FrameError, FrameResult};

/// Render callback invoked once per tick.
pub type FrameCallback = Box<dyn FnMut(&FrameTick) -> FrameResult<()> + Send>;

/// Configuration for the frame driver.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Target frames per second.
    pub target_fps: u32,
    /// Name given to the worker thread.
    pub thread_name: String,
}

impl DriverConfig {
    /// Creates a config for `target_fps`.
    #[must_use]
    pub fn new(target_fps: u32) -> Self {
        Self {
            target_fps,
            ..Self::default()
        }
    }

    /// Interval between ticks. A zero rate is treated as 1 FPS.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.target_fps.max(1)))
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            target_fps: 30,
            thread_name: "wititude-frame-driver".to_string(),
        }
    }
}

/// Timing information handed to each callback invocation.
#[derive(Debug, Clone, Copy)]
pub struct FrameTick {
    /// Frame number, starting at 1 and never reset by stop/start.
    pub frame: u64,
    /// When this tick was due.
    pub scheduled_at: Instant,
    /// When the callback was actually entered.
    pub started_at: Instant,
    /// Configured interval.
    pub interval: Duration,
}

impl FrameTick {
    /// How late the tick started relative to its deadline.
    #[must_use]
    pub fn lateness(&self) -> Duration {
        self.started_at.saturating_duration_since(self.scheduled_at)
    }
}

/// Driver statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Ticks delivered to the callback.
    pub ticks: u64,
    /// Ticks whose callback returned an error or panicked.
    pub failed_ticks: u64,
    /// Ticks whose callback ran longer than the interval.
    pub overruns: u64,
    /// Intervals dropped instead of being caught up.
    pub skipped_intervals: u64,
    /// Longest callback duration observed (microseconds).
    pub max_tick_us: u64,
}

/// Externally visible driver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// No ticks are delivered.
    Stopped,
    /// Ticks are delivered at the configured rate.
    Running,
}

struct Control {
    state: DriverState,
    epoch: u64,
}

impl Control {
    fn is_current(&self, epoch: u64) -> bool {
        self.state == DriverState::Running && self.epoch == epoch
    }
}

struct Shared {
    control: Mutex<Control>,
    wake: Condvar,
    /// Held for the whole callback so ticks from an old and a new worker never overlap.
    callback: Mutex<FrameCallback>,
    stats: Mutex<DriverStats>,
    frame_counter: Mutex<u64>,
    interval: Duration,
}

/// Fixed-rate frame driver.
///
/// ## Usage
///
/// ```rust
/// use std::time::Duration;
/// use wititude_core::{DriverConfig, FrameDriver};
///
/// let driver = FrameDriver::new(DriverConfig::new(60), Box::new(|tick| {
///     let _ = tick.frame;
///     Ok(())
/// }));
///
/// driver.start();
/// std::thread::sleep(Duration::from_millis(50));
/// driver.stop();
/// assert!(driver.stats().ticks > 0);
/// ```
pub struct FrameDriver {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    config: DriverConfig,
}

impl FrameDriver {
    /// Creates a stopped driver.
    #[must_use]
    pub fn new(config: DriverConfig, callback: FrameCallback) -> Self {
        Self {
            shared: Arc::new(Shared {
                control: Mutex::new(Control {
                    state: DriverState::Stopped,
                    epoch: 0,
                }),
                wake: Condvar::new(),
                callback: Mutex::new(callback),
                stats: Mutex::new(DriverStats::default()),
                frame_counter: Mutex::new(0),
                interval: config.interval(),
            }),
            workers: Mutex::new(Vec::new()),
            config,
        }
    }

    /// Starts ticking. Returns `false` (and does nothing) if already running.
    pub fn start(&self) -> bool {
        let epoch = {
            let mut control = self.shared.control.lock();
            if control.state == DriverState::Running {
                return false;
            }
            control.state = DriverState::Running;
            control.epoch += 1;
            control.epoch
        };

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || run_worker(&shared, epoch));

        match spawned {
            Ok(handle) => {
                let mut workers = self.workers.lock();
                workers.retain(|w| !w.is_finished());
                workers.push(handle);
                tracing::info!(fps = self.config.target_fps, "frame driver started");
                true
            }
            Err(err) => {
                self.shared.control.lock().state = DriverState::Stopped;
                tracing::error!(error = %err, "failed to spawn frame driver thread");
                false
            }
        }
    }

    /// Stops ticking. Returns `false` if already stopped.
    ///
    /// Returns immediately. A tick already in flight finishes, no new tick
    /// begins.
    pub fn stop(&self) -> bool {
        {
            let mut control = self.shared.control.lock();
            if control.state == DriverState::Stopped {
                return false;
            }
            control.state = DriverState::Stopped;
            control.epoch += 1;
        }
        self.shared.wake.notify_all();
        tracing::info!("frame driver stopped");
        true
    }

    /// Stops ticking and waits for in-flight ticks to finish.
    ///
    /// Safe to call from inside the callback; the calling worker is not joined.
    pub fn shutdown(&self) {
        self.stop();
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        let current = thread::current().id();
        for worker in workers {
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                tracing::error!("frame driver thread panicked outside the frame boundary");
            }
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> DriverState {
        self.shared.control.lock().state
    }

    /// Returns true while running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == DriverState::Running
    }

    /// Interval between ticks.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    /// Statistics so far.
    #[must_use]
    pub fn stats(&self) -> DriverStats {
        *self.shared.stats.lock()
    }

    /// Configuration.
    #[must_use]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }
}

impl Drop for FrameDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for FrameDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDriver")
            .field("state", &self.state())
            .field("interval", &self.shared.interval)
            .finish_non_exhaustive()
    }
}

/// Worker main loop for one epoch.
fn run_worker(shared: &Shared, epoch: u64) {
    let interval = shared.interval;
    let mut deadline = Instant::now();

    loop {
        if !wait_for_deadline(shared, epoch, deadline) {
            return;
        }

        let scheduled_at = deadline;
        let finished = {
            let mut callback = shared.callback.lock();
            // stop() may have raced with the wait for the callback lock.
            if !shared.control.lock().is_current(epoch) {
                return;
            }

            let frame = {
                let mut counter = shared.frame_counter.lock();
                *counter += 1;
                *counter
            };
            let tick = FrameTick {
                frame,
                scheduled_at,
                started_at: Instant::now(),
                interval,
            };

            let outcome = invoke(&mut callback, &tick);
            let finished = Instant::now();
            record(shared, &tick, finished, outcome);
            finished
        };

        deadline += interval;
        if deadline < finished {
            let skipped = intervals_skipped(finished.duration_since(deadline), interval);
            shared.stats.lock().skipped_intervals += skipped;
            deadline = finished;
        }
    }
}

/// Deadlines dropped when the next tick runs `behind` its deadline.
///
/// The immediate catch-up tick serves the latest missed deadline, so only
/// the whole intervals before it are lost.
fn intervals_skipped(behind: Duration, interval: Duration) -> u64 {
    let skipped = behind.as_micros() / interval.as_micros().max(1);
    u64::try_from(skipped).unwrap_or(u64::MAX)
}

/// Sleeps until `deadline`. Returns `false` if the epoch was cancelled.
fn wait_for_deadline(shared: &Shared, epoch: u64, deadline: Instant) -> bool {
    let mut control = shared.control.lock();
    loop {
        if !control.is_current(epoch) {
            return false;
        }
        if Instant::now() >= deadline {
            return true;
        }
        shared.wake.wait_until(&mut control, deadline);
    }
}

fn invoke(callback: &mut FrameCallback, tick: &FrameTick) -> FrameResult<()> {
    match panic::catch_unwind(AssertUnwindSafe(|| callback(tick))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            Err(FrameError::Panicked(message))
        }
    }
}

fn record(shared: &Shared, tick: &FrameTick, finished: Instant, outcome: FrameResult<()>) {
    let took = finished.duration_since(tick.started_at);
    let took_us = u64::try_from(took.as_micros()).unwrap_or(u64::MAX);

    let mut stats = shared.stats.lock();
    stats.ticks += 1;
    stats.max_tick_us = stats.max_tick_us.max(took_us);
    if took > tick.interval {
        stats.overruns += 1;
        tracing::debug!(frame = tick.frame, took_us, "frame overran its interval");
    }
    if let Err(err) = outcome {
        stats.failed_ticks += 1;
        tracing::error!(frame = tick.frame, error = %err, "frame failed, continuing");
    }
}
