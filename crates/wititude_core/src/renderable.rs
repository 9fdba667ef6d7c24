//! # Renderables
//!
//! The drawable state of one tracked target: a visible stroked model and an
//! invisible occluder volume, both positioned by the same
//! [`TransformSnapshot`].
//!
//! ```text
//! TransformSnapshot { view, scale }
//!          │
//!          ├──► StrokedCube   (primary, color pass)
//!          └──► OccluderCube  (depth only, hides content behind the object)
//! ```

use bytemuck::{Pod, Zeroable};

use crate::math::{Mat4, Vec3};

/// View transform and per-axis scale of one tracked object at one instant.
///
/// Immutable once produced. A tracking update builds a new snapshot, it
/// never edits one a reader may hold.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TransformSnapshot {
    /// Camera-relative view transform of the target.
    pub view: Mat4,
    /// Per-axis target scale.
    pub scale: Vec3,
}

impl TransformSnapshot {
    /// Snapshot placing the object at the camera origin with unit scale.
    pub const IDENTITY: Self = Self {
        view: Mat4::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Creates a snapshot.
    #[must_use]
    pub const fn new(view: Mat4, scale: Vec3) -> Self {
        Self { view, scale }
    }

    /// `view * scale`, the matrix a drawable feeds to its vertex stage.
    #[must_use]
    pub fn model_view(&self) -> Mat4 {
        self.view * Mat4::from_scale(self.scale)
    }
}

impl Default for TransformSnapshot {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Which pass a drawable belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DrawRole {
    /// Depth-only volume drawn before any visible geometry.
    Occluder = 0,
    /// Visible model.
    Primary = 1,
}

/// Something the render loop can position and draw.
pub trait Drawable: Clone + Send + Sync + 'static {
    /// Pass this drawable is submitted in.
    const ROLE: DrawRole;

    /// Transform currently applied.
    fn transform(&self) -> &TransformSnapshot;

    /// Applies a new transform.
    fn apply(&mut self, snapshot: &TransformSnapshot);

    /// Number of vertices submitted per draw.
    fn vertex_count(&self) -> u32;
}

/// Unit cube edges are drawn as 12 line segments.
const CUBE_EDGE_VERTICES: u32 = 24;

/// Unit cube faces are drawn as 12 triangles.
const CUBE_FACE_VERTICES: u32 = 36;

/// Visible wireframe cube outlining the tracked object.
#[derive(Clone, Debug, PartialEq)]
pub struct StrokedCube {
    transform: TransformSnapshot,
    /// RGBA stroke color.
    pub color: [f32; 4],
    /// Stroke width in pixels.
    pub line_width: f32,
}

impl StrokedCube {
    /// Default stroke color (opaque cyan).
    pub const DEFAULT_COLOR: [f32; 4] = [0.0, 0.8, 1.0, 1.0];

    /// Creates a cube with the default stroke.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transform: TransformSnapshot::IDENTITY,
            color: Self::DEFAULT_COLOR,
            line_width: 3.0,
        }
    }
}

impl Default for StrokedCube {
    fn default() -> Self {
        Self::new()
    }
}

impl Drawable for StrokedCube {
    const ROLE: DrawRole = DrawRole::Primary;

    fn transform(&self) -> &TransformSnapshot {
        &self.transform
    }

    fn apply(&mut self, snapshot: &TransformSnapshot) {
        self.transform = *snapshot;
    }

    fn vertex_count(&self) -> u32 {
        CUBE_EDGE_VERTICES
    }
}

/// Invisible cube that only writes depth.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct OccluderCube {
    transform: TransformSnapshot,
}

impl OccluderCube {
    /// Creates an occluder at the identity transform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Drawable for OccluderCube {
    const ROLE: DrawRole = DrawRole::Occluder;

    fn transform(&self) -> &TransformSnapshot {
        &self.transform
    }

    fn apply(&mut self, snapshot: &TransformSnapshot) {
        self.transform = *snapshot;
    }

    fn vertex_count(&self) -> u32 {
        CUBE_FACE_VERTICES
    }
}

/// Primary model and occluder of one tracked target.
///
/// Two typed fields, no downcasting on the render path.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct RenderablePair {
    /// Visible model.
    pub primary: StrokedCube,
    /// Depth-only occluder.
    pub occluder: OccluderCube,
}

impl RenderablePair {
    /// Creates a fresh pair at the identity transform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh pair with an initial transform applied to both halves.
    #[must_use]
    pub fn with_snapshot(snapshot: &TransformSnapshot) -> Self {
        let mut pair = Self::new();
        pair.apply(snapshot);
        pair
    }

    /// Applies one snapshot to both halves.
    pub fn apply(&mut self, snapshot: &TransformSnapshot) {
        self.primary.apply(snapshot);
        self.occluder.apply(snapshot);
    }

    /// Snapshot currently applied (both halves always agree).
    #[must_use]
    pub fn snapshot(&self) -> &TransformSnapshot {
        self.primary.transform()
    }

    /// True when primary and occluder carry the same transform.
    #[must_use]
    pub fn is_coherent(&self) -> bool {
        self.primary.transform() == self.occluder.transform()
    }
}
