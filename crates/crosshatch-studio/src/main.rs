//! Dry-run driver: builds every shipped pipeline against the headless device,
//! renders frames, and rebuilds pipelines whose shaders change on disk.
//!
//! Usage: `crosshatch-studio [SHADER_DIR] [FRAMES]`

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use crosshatch_engine::device::{check_errors, Gl, HeadlessGl};
use crosshatch_engine::logging::{init_logging, LoggingConfig};
use crosshatch_engine::math::MAT4_IDENTITY;
use crosshatch_engine::pipeline::{HatchConfig, HotReload, PipelineConfig, Shading};
use crosshatch_engine::shader::{Program, UniformRegistry, UniformTag};
use crosshatch_engine::texture::TextureUnits;

const DEFAULT_FRAMES: usize = 180;
const FRAMES_PER_FLAVOR: usize = 60;
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

struct Args {
    shader_dir: Option<PathBuf>,
    frames: usize,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        let shader_dir = args.next().map(PathBuf::from);
        let frames = match args.next() {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("FRAMES must be a number, got {raw:?}"))?,
            None => DEFAULT_FRAMES,
        };
        anyhow::ensure!(args.next().is_none(), "usage: crosshatch-studio [SHADER_DIR] [FRAMES]");
        Ok(Self { shader_dir, frames })
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());
    let args = Args::parse(std::env::args().skip(1))?;

    let mut config = PipelineConfig::default();
    if let Some(dir) = args.shader_dir {
        config.shader_dir = dir;
    }

    println!();
    println!("  crosshatch studio  ·  headless dry run");
    println!("  shaders  {}", config.shader_dir.display());
    println!("  target   {}x{}", config.width, config.height);
    println!("  frames   {}", args.frames);
    println!();

    let mut gl = HeadlessGl::new();
    let mut units = TextureUnits::with_limit(gl.limits().max_texture_units);

    let shadings = [
        Shading::AmbientOcclusion,
        Shading::Hatched(HatchConfig::default()),
        Shading::DirectionalLight,
    ];
    let mut pipelines = Vec::with_capacity(shadings.len());
    for shading in shadings {
        let label = shading.label();
        let pipeline = HotReload::new(&mut gl, &mut units, shading, config.clone(), &mut bind_scene)
            .with_context(|| format!("failed to build the {label} pipeline"))?;
        pipelines.push(pipeline);
    }

    for frame in 0..args.frames {
        let index = (frame / FRAMES_PER_FLAVOR) % pipelines.len();
        let active = &mut pipelines[index];
        if frame % FRAMES_PER_FLAVOR == 0 {
            log::info!("frame {frame}: switching to {}", active.shading().label());
        }

        // A shader that fails to rebuild keeps the previous renderer running.
        if let Err(err) = active.reload_if_stale(&mut gl, &mut units, &mut bind_scene) {
            log::error!("{err:#}");
        }

        active.renderer().render(&mut gl, setup_camera, |_, _| {});
        if check_errors(&mut gl) {
            log::warn!("frame {frame} raised driver errors");
        }

        std::thread::sleep(FRAME_INTERVAL);
    }

    println!();
    println!("  frames rendered   {}", args.frames);
    println!("  draw calls        {}", gl.draw_calls());
    for pipeline in &pipelines {
        println!(
            "  {:<16}  {} rebuild(s)",
            pipeline.shading().label(),
            pipeline.rebuilds()
        );
    }
    println!();

    for pipeline in pipelines {
        pipeline.release(&mut gl, &mut units);
    }

    let leaked = gl.live_objects();
    if leaked.total() > 0 {
        log::warn!("GL objects still alive after teardown: {leaked:?}");
    }
    Ok(())
}

/// The studio has no meshes; report what a mesh would bind to.
fn bind_scene(gl: &mut dyn Gl, program: &Program) {
    for name in ["inPosition", "inNormal", "inTexCoord"] {
        match gl.attrib_location(program.id(), name) {
            Some(location) => log::debug!("{name} -> attribute {location}"),
            None => log::warn!("geometry program has no {name} attribute"),
        }
    }
}

/// Identity camera, untextured white material.
fn setup_camera(gl: &mut dyn Gl, uniforms: &UniformRegistry) {
    for tag in [
        UniformTag::ModelTrans,
        UniformTag::ViewTrans,
        UniformTag::ProjTrans,
        UniformTag::InvViewTrans,
        UniformTag::InvProjTrans,
    ] {
        uniforms.set_mat4(gl, tag, &MAT4_IDENTITY);
    }
    uniforms.set_i32(gl, UniformTag::UseTexture, 0);
    uniforms.set_vec4(gl, UniformTag::Color, [1.0; 4]);
}
