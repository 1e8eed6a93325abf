use std::path::PathBuf;

use crate::math::Vec3;
use crate::shader::ShaderPair;

/// Where a pipeline finds its shaders and how large its render target is.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub shader_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Clear color of both passes.
    pub clear_color: [f32; 4],
    /// World-space direction the light travels in.
    pub light_dir: Vec3,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            shader_dir: PathBuf::from(crate::BUILTIN_SHADER_DIR),
            width: 640,
            height: 480,
            clear_color: [0.0; 4],
            light_dir: [-1.0, -1.0, -1.0],
        }
    }
}

impl PipelineConfig {
    /// `vertex`/`fragment` file names resolved against the shader directory.
    pub fn shader_pair(&self, vertex: &str, fragment: &str) -> ShaderPair {
        ShaderPair::in_dir(&self.shader_dir, vertex, fragment)
    }
}

/// Parameters of the hatched flavor.
#[derive(Debug, Clone, PartialEq)]
pub struct HatchConfig {
    /// Number of tiles laid out horizontally in the atlas.
    pub tiles: i32,
    pub atlas: PathBuf,
}

impl Default for HatchConfig {
    fn default() -> Self {
        Self {
            tiles: 6,
            atlas: PathBuf::from(crate::BUILTIN_HATCH_ATLAS),
        }
    }
}
