//! # Simulated Platform
//!
//! Stand-ins for the device collaborators plus a scripted tracker, so a
//! whole session can run headless in tests and in the `wititude_sim`
//! binary. Every collaborator writes to a shared [`CallLog`] so callers can
//! check the order the session drove them in.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use wititude_core::{Mat4, Vec3};
use wititude_tracking::{Pose, TrackingEvent, TrackingListener, TrackingQuality, TrackingSender};

use crate::error::{SessionError, SessionResult};
use crate::platform::{
    CapabilityGate, CaptureSession, CaptureSettings, Feature, Permission, PermissionBroker, PermissionOutcome, Platform,
    TargetLoader,
};

/// Ordered record of collaborator calls, shared by every simulated
/// collaborator.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one call.
    pub fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    /// Every call so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Index of the first call starting with `prefix`.
    #[must_use]
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls.lock().iter().position(|c| c.starts_with(prefix))
    }

    /// Number of calls starting with `prefix`.
    #[must_use]
    pub fn count(&self, prefix: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

/// Capability gate with a fixed answer.
#[derive(Debug, Clone, Default)]
pub struct SimCapabilities {
    missing: Option<String>,
}

impl SimCapabilities {
    /// Supports everything.
    #[must_use]
    pub fn supported() -> Self {
        Self { missing: None }
    }

    /// Fails every check with `message`.
    #[must_use]
    pub fn missing(message: impl Into<String>) -> Self {
        Self {
            missing: Some(message.into()),
        }
    }
}

impl CapabilityGate for SimCapabilities {
    fn check(&self, features: &[Feature]) -> Result<(), String> {
        match &self.missing {
            Some(message) if !features.is_empty() => Err(message.clone()),
            _ => Ok(()),
        }
    }
}

/// Permission broker answering from a script. Denies once the script runs
/// out.
#[derive(Debug)]
pub struct SimPermissions {
    answers: VecDeque<PermissionOutcome>,
    log: CallLog,
}

impl SimPermissions {
    /// Grants the first request.
    #[must_use]
    pub fn granting(log: &CallLog) -> Self {
        Self::scripted(log, [PermissionOutcome::Granted])
    }

    /// Answers requests in order from `answers`.
    #[must_use]
    pub fn scripted(log: &CallLog, answers: impl IntoIterator<Item = PermissionOutcome>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            log: log.clone(),
        }
    }

    fn answer(&mut self) -> PermissionOutcome {
        self.answers.pop_front().unwrap_or(PermissionOutcome::Denied)
    }
}

impl PermissionBroker for SimPermissions {
    fn request(&mut self, permissions: &[Permission]) -> PermissionOutcome {
        self.log.record(format!("permissions.request({})", permissions.len()));
        self.answer()
    }

    fn confirm_rationale(&mut self, permissions: &[Permission]) -> PermissionOutcome {
        self.log.record(format!("permissions.confirm_rationale({})", permissions.len()));
        self.answer()
    }
}

/// Capture session that only records what it was asked to do.
#[derive(Debug)]
pub struct SimCapture {
    log: CallLog,
    fail_resume: bool,
    fail_configure: bool,
}

impl SimCapture {
    /// Creates a capture session writing to `log`.
    #[must_use]
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            fail_resume: false,
            fail_configure: false,
        }
    }

    /// Rejects every configuration, as with an invalid license key.
    #[must_use]
    pub fn failing_configure(mut self) -> Self {
        self.fail_configure = true;
        self
    }

    /// Makes every `resume` fail.
    #[must_use]
    pub fn failing_resume(mut self) -> Self {
        self.fail_resume = true;
        self
    }
}

impl CaptureSession for SimCapture {
    fn clear_cache(&mut self) -> SessionResult<()> {
        self.log.record("capture.clear_cache");
        Ok(())
    }

    fn configure(&mut self, settings: &CaptureSettings) -> SessionResult<()> {
        self.log.record(format!(
            "capture.configure({:?}, {:?})",
            settings.camera_position, settings.camera_resolution
        ));
        if self.fail_configure {
            return Err(SessionError::Capture("license key rejected".to_string()));
        }
        Ok(())
    }

    fn resume(&mut self) -> SessionResult<()> {
        self.log.record("capture.resume");
        if self.fail_resume {
            return Err(SessionError::Capture("camera unavailable".to_string()));
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.log.record("capture.pause");
    }

    fn destroy(&mut self) {
        self.log.record("capture.destroy");
    }
}

/// Loader that reports success (or a fixed failure) immediately.
#[derive(Debug)]
pub struct SimTargetLoader {
    log: CallLog,
    failure: Option<String>,
}

impl SimTargetLoader {
    /// Loads every collection successfully.
    #[must_use]
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            failure: None,
        }
    }

    /// Fails every load with `reason`.
    #[must_use]
    pub fn failing(log: &CallLog, reason: impl Into<String>) -> Self {
        Self {
            log: log.clone(),
            failure: Some(reason.into()),
        }
    }
}

impl TargetLoader for SimTargetLoader {
    fn load(&mut self, uri: &str, events: TrackingSender) {
        self.log.record(format!("loader.load({uri})"));
        match &self.failure {
            Some(reason) => events.on_error_loading_targets(reason),
            None => events.on_targets_loaded(),
        }
    }
}

/// A platform where everything succeeds.
#[must_use]
pub fn simulated_platform(log: &CallLog) -> Platform {
    Platform {
        capabilities: Box::new(SimCapabilities::supported()),
        permissions: Box::new(SimPermissions::granting(log)),
        capture: Box::new(SimCapture::new(log)),
        loader: Box::new(SimTargetLoader::new(log)),
    }
}

/// Replays a fixed list of tracking events at a fixed pace on its own
/// thread, the way a tracking SDK calls back from its worker.
#[derive(Debug, Clone)]
pub struct ScriptedTracker {
    events: Vec<TrackingEvent>,
    interval: Duration,
}

impl ScriptedTracker {
    /// Replays `events`, one every `interval`.
    #[must_use]
    pub fn new(events: Vec<TrackingEvent>, interval: Duration) -> Self {
        Self { events, interval }
    }

    /// A bottle is recognized, circles in front of the camera for
    /// `tracked_updates` updates, then is lost.
    #[must_use]
    pub fn bottle(tracked_updates: u16, interval: Duration) -> Self {
        let mut events = Vec::with_capacity(usize::from(tracked_updates) + 3);
        events.push(TrackingEvent::Recognized {
            id: "bottle".into(),
            pose: orbit_pose(0),
        });
        for step in 1..=tracked_updates {
            events.push(TrackingEvent::Tracked {
                id: "bottle".into(),
                pose: orbit_pose(step),
            });
            if step == tracked_updates / 2 {
                events.push(TrackingEvent::QualityChanged {
                    id: "bottle".into(),
                    old: TrackingQuality::Good,
                    new: TrackingQuality::Average,
                });
            }
        }
        events.push(TrackingEvent::Lost { id: "bottle".into() });
        Self::new(events, interval)
    }

    /// Events in replay order.
    #[must_use]
    pub fn events(&self) -> &[TrackingEvent] {
        &self.events
    }

    /// Starts replaying into `listener`. The thread returns the number of
    /// events replayed.
    ///
    /// # Errors
    ///
    /// [`SessionError::Io`] if the thread cannot be created.
    pub fn spawn(self, listener: impl TrackingListener + 'static) -> SessionResult<JoinHandle<usize>> {
        let handle = thread::Builder::new()
            .name("wititude-scripted-tracker".to_string())
            .spawn(move || {
                let total = self.events.len();
                for event in self.events {
                    listener.on_event(event);
                    thread::sleep(self.interval);
                }
                tracing::debug!(total, "scripted tracker finished");
                total
            })?;
        Ok(handle)
    }
}

/// Pose on a small circle one metre in front of the camera.
fn orbit_pose(step: u16) -> Pose {
    let angle = f32::from(step) * 0.1;
    let view = Mat4::from_translation(Vec3::new(0.2 * angle.cos(), 0.2 * angle.sin(), -1.0));
    Pose::new(view, Vec3::new(0.08, 0.25, 0.08))
}
