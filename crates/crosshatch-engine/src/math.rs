//! Plain-array math types passed to shaders.
//!
//! Matrix math itself belongs to the caller; these are just the shapes the
//! uniform setters accept.

/// 4x4 column-major matrix, as uploaded to GLSL `mat4`.
pub type Mat4 = [[f32; 4]; 4];

pub type Vec3 = [f32; 3];

pub const MAT4_IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Flattens a matrix column by column.
#[inline]
pub fn mat4_flat(m: &Mat4) -> [f32; 16] {
    let mut out = [0.0; 16];
    for (col, values) in m.iter().enumerate() {
        out[col * 4..col * 4 + 4].copy_from_slice(values);
    }
    out
}
