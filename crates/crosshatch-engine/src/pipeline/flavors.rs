use anyhow::Context;

use crate::device::Gl;
use crate::shader::{Program, UniformRegistry, UniformTag};
use crate::texture::{Texture, TextureUnits};

use super::{HatchConfig, PipelineConfig, PostPass, Renderer};

pub const POST_VERT: &str = "render_buffer.vert";
pub const SSAO_FRAG: &str = "deferred_ssao.frag";
pub const HATCHED_FRAG: &str = "deferred_hatched.frag";
pub const DIRLIGHT_FRAG: &str = "deferred_dirlight.frag";

/// Post-process look of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Shading {
    /// Screen-space ambient occlusion with a directional light.
    AmbientOcclusion,
    /// Tone mapped onto tiles of a hatch atlas.
    Hatched(HatchConfig),
    /// Plain diffuse directional light.
    DirectionalLight,
}

impl Shading {
    pub fn label(&self) -> &'static str {
        match self {
            Shading::AmbientOcclusion => "ssao",
            Shading::Hatched(_) => "hatched",
            Shading::DirectionalLight => "dirlight",
        }
    }

    /// Describes this flavor's post-process pass, loading any texture it samples.
    pub fn post_pass(
        &self,
        gl: &mut dyn Gl,
        units: &mut TextureUnits,
        config: &PipelineConfig,
    ) -> anyhow::Result<PostPass> {
        let light_dir = config.light_dir;

        let pass = match self {
            Shading::AmbientOcclusion => PostPass {
                label: self.label(),
                shaders: config.shader_pair(POST_VERT, SSAO_FRAG),
                tags: vec![
                    UniformTag::ViewTrans,
                    UniformTag::ProjTrans,
                    UniformTag::InvViewTrans,
                    UniformTag::InvProjTrans,
                    UniformTag::LightDir,
                ],
                textures: Vec::new(),
                extras: Box::new(move |gl: &mut dyn Gl, uniforms: &UniformRegistry| {
                    uniforms.set_vec3(gl, UniformTag::LightDir, light_dir);
                }),
            },
            Shading::Hatched(hatch) => {
                let atlas = Texture::load(gl, units, &hatch.atlas).context("hatch atlas")?;
                let tiles = hatch.tiles;
                PostPass {
                    label: self.label(),
                    shaders: config.shader_pair(POST_VERT, HATCHED_FRAG),
                    tags: vec![
                        UniformTag::LightDir,
                        UniformTag::NumTiles,
                        UniformTag::TilesTexture,
                    ],
                    textures: vec![atlas],
                    extras: Box::new(move |gl: &mut dyn Gl, uniforms: &UniformRegistry| {
                        uniforms.set_vec3(gl, UniformTag::LightDir, light_dir);
                        uniforms.set_i32(gl, UniformTag::NumTiles, tiles);
                        uniforms.set_sampler(gl, UniformTag::TilesTexture, atlas.unit);
                    }),
                }
            }
            Shading::DirectionalLight => PostPass {
                label: self.label(),
                shaders: config.shader_pair(POST_VERT, DIRLIGHT_FRAG),
                tags: vec![UniformTag::LightDir],
                textures: Vec::new(),
                extras: Box::new(move |gl: &mut dyn Gl, uniforms: &UniformRegistry| {
                    uniforms.set_vec3(gl, UniformTag::LightDir, light_dir);
                }),
            },
        };
        Ok(pass)
    }

    pub fn build(
        &self,
        gl: &mut dyn Gl,
        units: &mut TextureUnits,
        config: &PipelineConfig,
        bind_scene: &mut dyn FnMut(&mut dyn Gl, &Program),
    ) -> anyhow::Result<Renderer> {
        let post = self.post_pass(gl, units, config)?;
        Renderer::build(gl, units, config, post, bind_scene)
    }
}

/// Ambient-occlusion pipeline.
pub fn ssao_renderer(
    gl: &mut dyn Gl,
    units: &mut TextureUnits,
    config: &PipelineConfig,
    bind_scene: &mut dyn FnMut(&mut dyn Gl, &Program),
) -> anyhow::Result<Renderer> {
    Shading::AmbientOcclusion.build(gl, units, config, bind_scene)
}

/// Hatched pipeline.
pub fn hatched_renderer(
    gl: &mut dyn Gl,
    units: &mut TextureUnits,
    config: &PipelineConfig,
    hatch: &HatchConfig,
    bind_scene: &mut dyn FnMut(&mut dyn Gl, &Program),
) -> anyhow::Result<Renderer> {
    Shading::Hatched(hatch.clone()).build(gl, units, config, bind_scene)
}

pub fn dirlight_renderer(
    gl: &mut dyn Gl,
    units: &mut TextureUnits,
    config: &PipelineConfig,
    bind_scene: &mut dyn FnMut(&mut dyn Gl, &Program),
) -> anyhow::Result<Renderer> {
    Shading::DirectionalLight.build(gl, units, config, bind_scene)
}
