//! # Session
//!
//! One tracking session: startup gating, the tracking pump, the renderable
//! registry, and the frame driver, driven by platform lifecycle hooks.
//!
//! ```text
//!               create                on_resume              on_pause
//! (gating) ───────────► Initialized ───────────► Resumed ───────────► Paused
//!                             │                     ▲                   │
//!                             │                     └──── on_resume ────┘
//!                             └──────── on_destroy (from any state) ──────► Destroyed
//! ```
//!
//! Resume starts the capture session, then the surface, then the driver.
//! Pause stops the driver, then the surface, then the capture session.
//! The render surface may attach before or after the first resume.

use std::sync::Arc;

use parking_lot::Mutex;
use wititude_core::{DriverStats, FrameDriver, Mat4, RenderableRegistry};
use wititude_render::{frame_callback, DrawSink, RenderLoop, RenderLoopStats};
use wititude_tracking::{
    tracking_channel, HandlerStats, StatusNotification, StatusSender, TrackingEventHandler, TrackingPump,
    TrackingSender, LOADING_LABEL,
};

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::platform::{
    CaptureSession, CaptureSettings, Feature, Permission, PermissionBroker, PermissionOutcome, Platform,
    ProjectionUpdate, TargetLoader,
};

/// Permissions a session cannot run without.
const REQUIRED_PERMISSIONS: [Permission; 1] = [Permission::Camera];

/// Features a session cannot run without.
const REQUIRED_FEATURES: [Feature; 1] = [Feature::ObjectTracking];

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, never resumed.
    Initialized,
    /// In the foreground; the driver runs once a surface is attached.
    Resumed,
    /// In the background.
    Paused,
    /// Torn down. Terminal.
    Destroyed,
}

/// Point-in-time counters for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    /// Lifecycle state.
    pub state: SessionState,
    /// Targets currently tracked.
    pub tracked_targets: usize,
    /// Registry generation.
    pub registry_generation: u64,
    /// Tracking events handled by the pump.
    pub events_processed: u64,
    /// Tracking handler counters.
    pub tracking: HandlerStats,
    /// Frame driver counters (zero until a surface attaches).
    pub driver: DriverStats,
    /// Render loop counters (zero until a surface attaches).
    pub render: RenderLoopStats,
}

struct Surface {
    render_loop: Arc<Mutex<RenderLoop>>,
    driver: FrameDriver,
}

/// A running tracking session.
///
/// Lifecycle hooks are called from one thread (the platform's UI thread);
/// tracking events arrive on [`Session::tracking_sender`] from any thread.
pub struct Session {
    config: SessionConfig,
    state: SessionState,
    registry: Arc<RenderableRegistry>,
    handler: Arc<TrackingEventHandler>,
    tracking: TrackingSender,
    pump: TrackingPump,
    capture: Box<dyn CaptureSession>,
    // Kept alive for the session; a loader may own the thread reporting
    // load results.
    _loader: Box<dyn TargetLoader>,
    surface: Option<Surface>,
    projection: Option<Mat4>,
}

impl Session {
    /// Runs the startup sequence and returns an initialized session.
    ///
    /// Order: config validation, capability check, camera permission (with
    /// one rationale retry), capture cache clear and configuration, tracking
    /// pump, target collection load. A failure after the capture session is
    /// handed over destroys it before returning.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Config`] for invalid settings
    /// - [`SessionError::CapabilityMissing`] if object tracking is unsupported
    /// - [`SessionError::PermissionDenied`] if the camera permission is refused
    /// - [`SessionError::Capture`] if the capture session rejects its settings
    /// - [`SessionError::Tracking`] if the pump thread cannot start
    pub fn create(config: SessionConfig, platform: Platform, status: StatusSender) -> SessionResult<Self> {
        config.validate()?;
        let Platform {
            capabilities,
            mut permissions,
            mut capture,
            mut loader,
        } = platform;

        if let Err(message) = capabilities.check(&REQUIRED_FEATURES) {
            tracing::error!(%message, "device cannot run object tracking");
            status.notify(StatusNotification::DeviceMissingFeatures {
                message: message.clone(),
            });
            return Err(SessionError::CapabilityMissing(message));
        }

        request_permissions(permissions.as_mut(), &status)?;

        if let Err(err) = configure_capture(capture.as_mut(), &config) {
            tracing::error!(error = %err, "capture session rejected its settings");
            capture.destroy();
            return Err(err);
        }

        let registry = Arc::new(RenderableRegistry::new());
        let handler = Arc::new(TrackingEventHandler::new(
            Arc::clone(&registry),
            status.clone(),
            config.hint_image.clone(),
        ));
        let (tracking, events) = tracking_channel(config.tracking_event_capacity);
        let pump = match TrackingPump::spawn(events, Arc::clone(&handler)) {
            Ok(pump) => pump,
            Err(err) => {
                capture.destroy();
                return Err(err.into());
            }
        };

        status.notify(StatusNotification::LoadingStarted {
            label: LOADING_LABEL.to_string(),
        });
        loader.load(&config.target_collection, tracking.clone());

        tracing::info!(
            collection = %config.target_collection,
            fps = config.target_fps,
            "session initialized"
        );

        Ok(Self {
            config,
            state: SessionState::Initialized,
            registry,
            handler,
            tracking,
            pump,
            capture,
            _loader: loader,
            surface: None,
            projection: None,
        })
    }

    /// The render surface is ready. Builds the render loop and the frame
    /// driver; the driver starts right away if the session is resumed.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] after destroy,
    /// [`SessionError::SurfaceAlreadyAttached`] on a second call.
    pub fn on_surface_ready(&mut self, sink: Box<dyn DrawSink>) -> SessionResult<()> {
        self.ensure_alive("attach a surface")?;
        if self.surface.is_some() {
            return Err(SessionError::SurfaceAlreadyAttached);
        }

        let mut render_loop = RenderLoop::new(self.config.render_loop_config(), Arc::clone(&self.registry), sink);
        if let Some(projection) = self.projection {
            render_loop.set_projection(projection);
        }
        let render_loop = Arc::new(Mutex::new(render_loop));
        let driver = FrameDriver::new(self.config.driver_config(), frame_callback(Arc::clone(&render_loop)));

        if self.state == SessionState::Resumed {
            render_loop.lock().on_resume();
            driver.start();
        }

        tracing::info!("render surface attached");
        self.surface = Some(Surface { render_loop, driver });
        Ok(())
    }

    /// Foreground: capture, then surface, then driver. No-op if already
    /// resumed.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] after destroy, or whatever the capture
    /// session reports (the session stays paused).
    pub fn on_resume(&mut self) -> SessionResult<()> {
        self.ensure_alive("resume")?;
        if self.state == SessionState::Resumed {
            return Ok(());
        }

        self.capture.resume()?;
        if let Some(surface) = &self.surface {
            surface.render_loop.lock().on_resume();
            surface.driver.start();
        }

        self.state = SessionState::Resumed;
        tracing::info!("session resumed");
        Ok(())
    }

    /// Background: driver, then surface, then capture. No-op unless resumed.
    pub fn on_pause(&mut self) {
        if self.state != SessionState::Resumed {
            return;
        }

        if let Some(surface) = &self.surface {
            surface.driver.stop();
            surface.render_loop.lock().on_pause();
        }
        self.capture.pause();

        self.state = SessionState::Paused;
        tracing::info!("session paused");
    }

    /// Tears everything down. Idempotent.
    ///
    /// Waits for an in-flight frame, stops the tracking pump, drops every
    /// tracked pair, then releases the capture session.
    pub fn on_destroy(&mut self) {
        if self.state == SessionState::Destroyed {
            return;
        }
        self.on_pause();

        if let Some(surface) = self.surface.take() {
            surface.driver.shutdown();
        }
        self.pump.shutdown();
        let cleared = self.registry.clear();
        self.capture.destroy();

        self.state = SessionState::Destroyed;
        tracing::info!(cleared, "session destroyed");
    }

    /// The capture layer reported a new field-of-view corrected projection.
    /// Applies from the next frame, or once a surface attaches.
    pub fn on_fov_changed(&mut self, update: ProjectionUpdate) {
        self.projection = Some(update.projection);
        if let Some(surface) = &self.surface {
            surface.render_loop.lock().set_projection(update.projection);
        }
    }

    /// Sender a tracking source delivers events into. Implements
    /// [`wititude_tracking::TrackingListener`].
    #[must_use]
    pub fn tracking_sender(&self) -> TrackingSender {
        self.tracking.clone()
    }

    /// Registry of currently tracked targets.
    #[must_use]
    pub fn registry(&self) -> &Arc<RenderableRegistry> {
        &self.registry
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True once a render surface is attached (until destroy).
    #[must_use]
    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// True while the frame driver is ticking.
    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.surface.as_ref().is_some_and(|s| s.driver.is_running())
    }

    /// Settings the session was created with.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        let (driver, render) = self.surface.as_ref().map_or_else(Default::default, |s| {
            (s.driver.stats(), s.render_loop.lock().stats())
        });
        SessionStats {
            state: self.state,
            tracked_targets: self.registry.len(),
            registry_generation: self.registry.generation(),
            events_processed: self.pump.processed(),
            tracking: self.handler.stats(),
            driver,
            render,
        }
    }

    fn ensure_alive(&self, operation: &'static str) -> SessionResult<()> {
        if self.state == SessionState::Destroyed {
            return Err(SessionError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.on_destroy();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("tracked_targets", &self.registry.len())
            .field("has_surface", &self.surface.is_some())
            .finish_non_exhaustive()
    }
}

/// Clears the capture cache when asked to, then hands over the settings.
fn configure_capture(capture: &mut dyn CaptureSession, config: &SessionConfig) -> SessionResult<()> {
    if config.clear_cache_on_start {
        capture.clear_cache()?;
    }
    capture.configure(&CaptureSettings {
        license_key: config.license_key.clone(),
        camera_position: config.camera_position,
        camera_resolution: config.camera_resolution,
    })
}

/// Requests the camera permission, showing the rationale and asking exactly
/// once more if the platform wants one.
fn request_permissions(broker: &mut dyn PermissionBroker, status: &StatusSender) -> SessionResult<()> {
    let names = || REQUIRED_PERMISSIONS.iter().map(|p| p.as_str().to_string()).collect::<Vec<_>>();

    let mut outcome = broker.request(&REQUIRED_PERMISSIONS);
    if outcome == PermissionOutcome::NeedsRationale {
        status.notify(StatusNotification::PermissionRationale { permissions: names() });
        outcome = broker.confirm_rationale(&REQUIRED_PERMISSIONS);
    }

    match outcome {
        PermissionOutcome::Granted => Ok(()),
        PermissionOutcome::Denied | PermissionOutcome::NeedsRationale => {
            tracing::warn!("camera permission denied");
            status.notify(StatusNotification::PermissionsDenied { permissions: names() });
            Err(SessionError::PermissionDenied(names()))
        }
    }
}
