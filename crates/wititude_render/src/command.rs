//! Draw commands handed to the surface.

use bytemuck::{Pod, Zeroable};
use wititude_core::{DrawRole, Drawable, Mat4, TargetId};

/// Per-draw uniform block.
///
/// Uploaded as raw bytes and consumed by the vertex and fragment stages.
/// Layout is 16-byte aligned.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    /// `view * scale` of the tracked target.
    pub model_view: Mat4,
    /// Camera projection.
    pub projection: Mat4,
    /// RGBA stroke color. All zero for depth-only draws.
    pub color: [f32; 4],
    /// Stroke width in x, the rest is padding.
    pub line_width_pad: [f32; 4],
}

impl DrawUniforms {
    /// Size in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Raw bytes for upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Stroke width.
    #[must_use]
    pub const fn line_width(&self) -> f32 {
        self.line_width_pad[0]
    }
}

/// One draw of one half of a tracked pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    /// Target being drawn.
    pub target: TargetId,
    /// Pass this draw belongs to.
    pub role: DrawRole,
    /// Uniform block.
    pub uniforms: DrawUniforms,
    /// Vertices to submit.
    pub vertex_count: u32,
}

impl DrawCommand {
    /// Builds a command for `drawable` with its currently applied transform.
    #[must_use]
    pub fn for_drawable<D: Drawable>(
        target: TargetId,
        drawable: &D,
        projection: Mat4,
        color: [f32; 4],
        line_width: f32,
    ) -> Self {
        Self {
            target,
            role: D::ROLE,
            uniforms: DrawUniforms {
                model_view: drawable.transform().model_view(),
                projection,
                color,
                line_width_pad: [line_width, 0.0, 0.0, 0.0],
            },
            vertex_count: drawable.vertex_count(),
        }
    }

    /// True for depth-only draws.
    #[must_use]
    pub fn is_depth_only(&self) -> bool {
        self.role == DrawRole::Occluder
    }
}
