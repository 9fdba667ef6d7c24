//! # Platform Collaborators
//!
//! Everything the session needs from the device, expressed as traits so the
//! session can run against real platform bindings or the simulated ones in
//! [`crate::sim`].
//!
//! ```text
//! Session::create
//!   ├── CapabilityGate::check([ObjectTracking])
//!   ├── PermissionBroker::request([Camera])   (+ one confirm_rationale)
//!   ├── CaptureSession::clear_cache / configure
//!   └── TargetLoader::load(uri) ──► TrackingSender
//! ```

use wititude_core::Mat4;
use wititude_tracking::TrackingSender;

use crate::config::{CameraPosition, CameraResolution};
use crate::error::SessionResult;

/// Device features the session can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// 3D object recognition and tracking.
    ObjectTracking,
}

/// Runtime permissions the session can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Camera access.
    Camera,
}

impl Permission {
    /// Platform name of the permission.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Camera => "android.permission.CAMERA",
        }
    }
}

/// Answer to a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    /// Everything requested was granted.
    Granted,
    /// At least one permission was refused.
    Denied,
    /// The platform wants the user told why before asking again.
    NeedsRationale,
}

/// Capability / compatibility check.
pub trait CapabilityGate: Send {
    /// Checks that the device supports every feature in `features`.
    ///
    /// # Errors
    ///
    /// An operator-facing message describing what is missing.
    fn check(&self, features: &[Feature]) -> Result<(), String>;
}

/// Runtime permission negotiation.
pub trait PermissionBroker: Send {
    /// Requests `permissions`.
    fn request(&mut self, permissions: &[Permission]) -> PermissionOutcome;

    /// Asks again after the rationale has been shown.
    fn confirm_rationale(&mut self, permissions: &[Permission]) -> PermissionOutcome;
}

/// Settings handed to the capture session on startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    /// SDK license key.
    pub license_key: String,
    /// Camera feeding the tracker.
    pub camera_position: CameraPosition,
    /// Capture resolution.
    pub camera_resolution: CameraResolution,
}

/// Camera capture and the tracking SDK behind it.
pub trait CaptureSession: Send {
    /// Clears the SDK's on-disk cache.
    ///
    /// # Errors
    ///
    /// [`crate::SessionError::Capture`].
    fn clear_cache(&mut self) -> SessionResult<()>;

    /// Applies startup settings.
    ///
    /// # Errors
    ///
    /// [`crate::SessionError::Capture`].
    fn configure(&mut self, settings: &CaptureSettings) -> SessionResult<()>;

    /// Starts delivering frames to the tracker.
    ///
    /// # Errors
    ///
    /// [`crate::SessionError::Capture`].
    fn resume(&mut self) -> SessionResult<()>;

    /// Stops delivering frames.
    fn pause(&mut self);

    /// Releases the camera and SDK resources.
    fn destroy(&mut self);
}

/// Loads a target collection and reports the result as tracking events.
pub trait TargetLoader: Send {
    /// Starts loading `uri`. Completion arrives on `events` as
    /// `TargetsLoaded` or `LoadError`, possibly from another thread.
    fn load(&mut self, uri: &str, events: TrackingSender);
}

/// Field-of-view corrected projection reported by the capture layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionUpdate {
    /// Projection matrix to draw with.
    pub projection: Mat4,
}

impl ProjectionUpdate {
    /// Wraps a column-major matrix as reported by the SDK.
    #[must_use]
    pub fn from_raw(projection: &[f32; 16]) -> Self {
        Self {
            projection: Mat4::from_cols_array(projection),
        }
    }

    /// Builds a perspective projection from a vertical field of view.
    #[must_use]
    pub fn from_fov(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Mat4::perspective(fov_y, aspect, near, far),
        }
    }
}

/// The set of collaborators a session is created with.
pub struct Platform {
    /// Capability check.
    pub capabilities: Box<dyn CapabilityGate>,
    /// Permission negotiation.
    pub permissions: Box<dyn PermissionBroker>,
    /// Camera capture.
    pub capture: Box<dyn CaptureSession>,
    /// Target collection loading.
    pub loader: Box<dyn TargetLoader>,
}
