//! # Session Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file (or no file) yields the stock bottle-tracking setup.
//!
//! ```toml
//! license_key = "..."
//! target_collection = "file:///android_asset/bottle.wto"
//! hint_image = "bottle_image.jpg"
//! target_fps = 30
//! camera_position = "back"
//! camera_resolution = "auto"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use wititude_core::DriverConfig;
use wititude_render::RenderLoopConfig;

use crate::error::{SessionError, SessionResult};

/// Highest frame rate accepted.
pub const MAX_TARGET_FPS: u32 = 240;

/// Which camera feeds the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraPosition {
    /// Rear camera.
    #[default]
    Back,
    /// Selfie camera.
    Front,
}

/// Requested capture resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CameraResolution {
    /// Let the capture layer decide.
    #[default]
    #[serde(rename = "auto")]
    Auto,
    /// 640x480.
    #[serde(rename = "sd_640x480")]
    Sd640x480,
    /// 1280x720.
    #[serde(rename = "hd_1280x720")]
    Hd1280x720,
    /// 1920x1080.
    #[serde(rename = "full_hd_1920x1080")]
    FullHd1920x1080,
}

/// Everything a session needs to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// License key handed to the capture session.
    pub license_key: String,
    /// URI of the target collection to load.
    pub target_collection: String,
    /// Image shown with the scan hint.
    pub hint_image: String,
    /// Frame driver rate.
    pub target_fps: u32,
    /// Camera feeding the tracker.
    pub camera_position: CameraPosition,
    /// Capture resolution.
    pub camera_resolution: CameraResolution,
    /// Bound of the tracking event channel.
    pub tracking_event_capacity: usize,
    /// Bound of the UI status channel.
    pub status_capacity: usize,
    /// Clear the capture session's cache before configuring it.
    pub clear_cache_on_start: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            license_key: String::new(),
            target_collection: "file:///android_asset/bottle.wto".to_string(),
            hint_image: "bottle_image.jpg".to_string(),
            target_fps: 30,
            camera_position: CameraPosition::Back,
            camera_resolution: CameraResolution::Auto,
            tracking_event_capacity: 1024,
            status_capacity: 64,
            clear_cache_on_start: true,
        }
    }
}

impl SessionConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`SessionError::Toml`] on malformed input, [`SessionError::Config`]
    /// on out-of-range values.
    pub fn from_toml_str(text: &str) -> SessionResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`SessionError::Io`] if the file cannot be read, otherwise as
    /// [`Self::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> SessionResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "loaded session config");
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`SessionError::Config`] naming the first bad field.
    pub fn validate(&self) -> SessionResult<()> {
        if self.target_fps == 0 || self.target_fps > MAX_TARGET_FPS {
            return Err(SessionError::Config(format!(
                "target_fps must be in 1..={MAX_TARGET_FPS}, got {}",
                self.target_fps
            )));
        }
        if self.target_collection.trim().is_empty() {
            return Err(SessionError::Config("target_collection must not be empty".to_string()));
        }
        if self.tracking_event_capacity == 0 {
            return Err(SessionError::Config("tracking_event_capacity must be positive".to_string()));
        }
        if self.status_capacity == 0 {
            return Err(SessionError::Config("status_capacity must be positive".to_string()));
        }
        Ok(())
    }

    /// Frame driver settings.
    #[must_use]
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig::new(self.target_fps)
    }

    /// Render loop settings.
    #[must_use]
    pub fn render_loop_config(&self) -> RenderLoopConfig {
        RenderLoopConfig::for_fps(self.target_fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(SessionConfig::from_toml_str("").unwrap(), SessionConfig::default());
    }

    #[test]
    fn test_full_document() {
        let config = SessionConfig::from_toml_str(
            r#"
            license_key = "abc"
            target_collection = "file:///data/firetruck.wto"
            hint_image = "firetruck.jpg"
            target_fps = 60
            camera_position = "front"
            camera_resolution = "hd_1280x720"
            tracking_event_capacity = 16
            status_capacity = 8
            clear_cache_on_start = false
            "#,
        )
        .unwrap();

        assert_eq!(config.license_key, "abc");
        assert_eq!(config.target_fps, 60);
        assert_eq!(config.camera_position, CameraPosition::Front);
        assert_eq!(config.camera_resolution, CameraResolution::Hd1280x720);
        assert!(!config.clear_cache_on_start);
        assert_eq!(config.driver_config().interval().as_micros(), 16_666);
    }

    #[test]
    fn test_rejects_bad_fps() {
        assert!(matches!(
            SessionConfig::from_toml_str("target_fps = 0"),
            Err(SessionError::Config(_))
        ));
        assert!(matches!(
            SessionConfig::from_toml_str("target_fps = 241"),
            Err(SessionError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_empty_collection() {
        assert!(matches!(
            SessionConfig::from_toml_str("target_collection = \"  \""),
            Err(SessionError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        assert!(matches!(
            SessionConfig::from_toml_str("frame_rate = 30"),
            Err(SessionError::Toml(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SessionConfig::load("/nonexistent/wititude.toml"),
            Err(SessionError::Io(_))
        ));
    }
}
