//! Crosshatch engine crate.
//!
//! Two-pass deferred rendering: a geometry pass fills an off-screen G-buffer,
//! a post-process pass shades it (ambient occlusion, hatching, directional
//! light). Every graphics call goes through the [`device::Gl`] seam.

pub mod device;
pub mod logging;
pub mod math;
pub mod pipeline;
pub mod render;
pub mod shader;
pub mod texture;

#[cfg(test)]
pub(crate) mod testing;

/// Directory holding the shader sources shipped with the engine.
pub const BUILTIN_SHADER_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/shaders");

/// Hatch tile atlas shipped with the engine.
pub const BUILTIN_HATCH_ATLAS: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/assets/tiled_hatches.png");
