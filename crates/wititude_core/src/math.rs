//! Matrix and vector types used for view transforms.
//!
//! Matrices are column-major, matching what the tracking pipeline hands out
//! and what the GPU expects for uniform upload.

use bytemuck::{Pod, Zeroable};

/// 3D Vector - per-axis scale, translation
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vec3 {
    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// All components one
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    /// Same value on every axis
    #[must_use]
    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Creates from array
    #[must_use]
    pub const fn from_array(arr: [f32; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// 4x4 column-major matrix.
///
/// `cols[c][r]` is the element in column `c`, row `r`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Mat4 {
    /// Columns
    pub cols: [[f32; 4]; 4],
}

impl Mat4 {
    /// Identity matrix
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a matrix from columns.
    #[must_use]
    pub const fn from_cols(cols: [[f32; 4]; 4]) -> Self {
        Self { cols }
    }

    /// Creates a matrix from a flat column-major array, the layout
    /// tracking pipelines and GL-style APIs use.
    #[must_use]
    pub fn from_cols_array(m: &[f32; 16]) -> Self {
        let mut cols = [[0.0; 4]; 4];
        for (c, col) in cols.iter_mut().enumerate() {
            col.copy_from_slice(&m[c * 4..c * 4 + 4]);
        }
        Self { cols }
    }

    /// Flattens into a column-major array.
    #[must_use]
    pub fn to_cols_array(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        for (c, col) in self.cols.iter().enumerate() {
            out[c * 4..c * 4 + 4].copy_from_slice(col);
        }
        out
    }

    /// Non-uniform scale matrix.
    #[must_use]
    pub const fn from_scale(s: Vec3) -> Self {
        Self {
            cols: [
                [s.x, 0.0, 0.0, 0.0],
                [0.0, s.y, 0.0, 0.0],
                [0.0, 0.0, s.z, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Translation matrix.
    #[must_use]
    pub const fn from_translation(t: Vec3) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [t.x, t.y, t.z, 1.0],
            ],
        }
    }

    /// Right-handed perspective projection (OpenGL clip space).
    ///
    /// `fov_y` is in radians.
    #[must_use]
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let f = 1.0 / (fov_y * 0.5).tan();
        let range = near - far;
        Self {
            cols: [
                [f / aspect, 0.0, 0.0, 0.0],
                [0.0, f, 0.0, 0.0],
                [0.0, 0.0, (far + near) / range, -1.0],
                [0.0, 0.0, 2.0 * far * near / range, 0.0],
            ],
        }
    }

    /// Translation part (column 3).
    #[must_use]
    pub const fn translation(&self) -> Vec3 {
        Vec3::new(self.cols[3][0], self.cols[3][1], self.cols[3][2])
    }

    /// Element at column `c`, row `r`.
    #[must_use]
    pub const fn get(&self, c: usize, r: usize) -> f32 {
        self.cols[c][r]
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std::ops::Mul for Mat4 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let mut out = [[0.0; 4]; 4];
        for (c, out_col) in out.iter_mut().enumerate() {
            for (r, cell) in out_col.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.cols[k][r] * rhs.cols[c][k]).sum();
            }
        }
        Self { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_neutral() {
        let t = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(Mat4::IDENTITY * t, t);
        assert_eq!(t * Mat4::IDENTITY, t);
    }

    #[test]
    fn test_translation_then_scale() {
        let t = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let s = Mat4::from_scale(Vec3::new(2.0, 3.0, 4.0));
        let m = t * s;

        // Scale stays on the diagonal, translation is untouched.
        assert_eq!(m.get(0, 0), 2.0);
        assert_eq!(m.get(1, 1), 3.0);
        assert_eq!(m.get(2, 2), 4.0);
        assert_eq!(m.translation(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_flat_layout_is_column_major() {
        let mut flat = [0.0; 16];
        flat[12] = 5.0; // column 3, row 0
        let m = Mat4::from_cols_array(&flat);
        assert_eq!(m.translation().x, 5.0);
        assert_eq!(m.to_cols_array(), flat);
    }

    #[test]
    fn test_mat4_bytemuck() {
        let m = Mat4::IDENTITY;
        let bytes: &[u8] = bytemuck::bytes_of(&m);
        assert_eq!(bytes.len(), 64);
    }
}
