//! Poses reported by the tracking pipeline.

use wititude_core::{Mat4, TransformSnapshot, Vec3};

/// View transform and per-axis scale of a target as reported by the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Camera-relative view transform.
    pub view: Mat4,
    /// Per-axis target scale.
    pub scale: Vec3,
}

impl Pose {
    /// Creates a pose.
    #[must_use]
    pub const fn new(view: Mat4, scale: Vec3) -> Self {
        Self { view, scale }
    }

    /// Creates a pose from the raw column-major view matrix and scale the
    /// tracking SDK hands out.
    #[must_use]
    pub fn from_raw(view: &[f32; 16], scale: [f32; 3]) -> Self {
        Self::new(Mat4::from_cols_array(view), Vec3::from_array(scale))
    }

    /// Derives the immutable snapshot drawables consume.
    #[must_use]
    pub fn snapshot(&self) -> TransformSnapshot {
        TransformSnapshot::new(self.view, self.scale)
    }
}

/// Extended tracking quality. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingQuality {
    /// Tracking is unreliable.
    Bad,
    /// Tracking is usable.
    Average,
    /// Tracking is solid.
    Good,
}

impl TrackingQuality {
    /// Maps the SDK's integer quality (-1, 0, 1).
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        if raw < 0 {
            Self::Bad
        } else if raw == 0 {
            Self::Average
        } else {
            Self::Good
        }
    }
}
