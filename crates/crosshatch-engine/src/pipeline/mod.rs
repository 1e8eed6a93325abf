//! Two-pass deferred pipelines.
//!
//! A [`Renderer`] pairs the geometry-pass program (fills the G-buffer) with a
//! post-process program (shades it onto the default framebuffer). Flavors
//! differ only in their [`PostPass`]; [`Shading`] names the shipped ones.
//!
//! Renderers remember their source files. [`Renderer::freshness`] reports
//! whether any changed on disk; [`HotReload`] rebuilds on change.

mod builder;
mod config;
mod flavors;
mod reload;
mod staleness;

pub use builder::{ExtraUniforms, PostPass, Renderer, GBUFFER_SAMPLER_TAGS, GEOMETRY_TAGS};
pub use config::{HatchConfig, PipelineConfig};
pub use flavors::{
    dirlight_renderer, hatched_renderer, ssao_renderer, Shading, DIRLIGHT_FRAG, HATCHED_FRAG,
    POST_VERT, SSAO_FRAG,
};
pub use reload::HotReload;
pub use staleness::{Freshness, SourceSet};
