use anyhow::Context;

use crate::device::{check_errors, Gl};
use crate::render::{clear_active, RenderTarget, ATTACHMENT_TAGS};
use crate::shader::{Program, ShaderPair, UniformRegistry, UniformTag};
use crate::texture::{Texture, TextureUnits};

use super::{Freshness, PipelineConfig, SourceSet};

/// Flavor-specific uniforms written every frame before the post-process
/// pass draws. The post-process program is active when it runs.
pub type ExtraUniforms = Box<dyn Fn(&mut dyn Gl, &UniformRegistry)>;

/// Post-process half of a pipeline.
pub struct PostPass {
    pub label: &'static str,
    pub shaders: ShaderPair,
    /// Tags registered on top of the G-buffer samplers.
    pub tags: Vec<UniformTag>,
    /// Textures the pass samples besides the G-buffer. Owned by the renderer
    /// from here on, also when the build fails.
    pub textures: Vec<Texture>,
    pub extras: ExtraUniforms,
}

/// Uniforms of the geometry-pass program.
pub const GEOMETRY_TAGS: [UniformTag; 6] = [
    UniformTag::ModelTrans,
    UniformTag::ViewTrans,
    UniformTag::ProjTrans,
    UniformTag::UseTexture,
    UniformTag::Color,
    UniformTag::Texture,
];

/// G-buffer samplers every post-process program reads.
pub const GBUFFER_SAMPLER_TAGS: [UniformTag; 4] = [
    ATTACHMENT_TAGS[0],
    ATTACHMENT_TAGS[1],
    ATTACHMENT_TAGS[2],
    UniformTag::Depths,
];

const GEOMETRY_VERT: &str = "gbuffer.vert";
const GEOMETRY_FRAG: &str = "gbuffer.frag";

/// A built two-pass pipeline.
///
/// Owns both programs, their registries, the render target and the
/// post-process textures. Never mutated after build: when its sources change,
/// build a new one and [`release`](Renderer::release) this one.
pub struct Renderer {
    label: &'static str,
    geometry: Program,
    geometry_uniforms: UniformRegistry,
    post: Program,
    post_uniforms: UniformRegistry,
    target: RenderTarget,
    textures: Vec<Texture>,
    extras: ExtraUniforms,
    sources: SourceSet,
    clear_color: [f32; 4],
}

impl Renderer {
    /// Compiles the geometry program and `post`'s program, registers their
    /// uniforms and allocates a render target of the configured size.
    ///
    /// `bind_scene` runs once on the geometry program so the caller can wire
    /// its mesh vertex layout. On failure every resource created here, and
    /// `post.textures`, is released.
    pub fn build(
        gl: &mut dyn Gl,
        units: &mut TextureUnits,
        config: &PipelineConfig,
        post: PostPass,
        bind_scene: &mut dyn FnMut(&mut dyn Gl, &Program),
    ) -> anyhow::Result<Self> {
        let PostPass {
            label,
            shaders,
            tags,
            textures,
            extras,
        } = post;

        let geometry_pair = config.shader_pair(GEOMETRY_VERT, GEOMETRY_FRAG);

        // Stamped before any source is read, so edits saved mid-build count as changes.
        let sources = match SourceSet::capture(geometry_pair.paths().into_iter().chain(shaders.paths())) {
            Ok(sources) => sources,
            Err(err) => {
                release_textures(gl, units, textures);
                return Err(err.context(format!("{label}: shader sources")));
            }
        };

        let geometry = match Program::from_files(gl, &geometry_pair) {
            Ok(program) => program,
            Err(err) => {
                release_textures(gl, units, textures);
                return Err(err).with_context(|| format!("{label}: geometry pass"));
            }
        };
        let geometry_uniforms = UniformRegistry::register(gl, geometry.id(), &GEOMETRY_TAGS);
        bind_scene(gl, &geometry);
        check_errors(gl);

        let post = match Program::from_files(gl, &shaders) {
            Ok(program) => program,
            Err(err) => {
                geometry.release(gl);
                release_textures(gl, units, textures);
                return Err(err).with_context(|| format!("{label}: post-process pass"));
            }
        };
        let mut post_tags = GBUFFER_SAMPLER_TAGS.to_vec();
        post_tags.extend(tags.iter().copied().filter(|t| !GBUFFER_SAMPLER_TAGS.contains(t)));
        let post_uniforms = UniformRegistry::register(gl, post.id(), &post_tags);

        let target = match RenderTarget::new(gl, units, config.width, config.height) {
            Ok(target) => target,
            Err(err) => {
                discard(gl, units, [geometry, post], textures);
                return Err(err.context(format!("{label}: render target")));
            }
        };

        target.bind_to_program(gl, post.id());
        check_errors(gl);

        log::info!(
            "{label} renderer built ({}x{}, {} sources)",
            config.width,
            config.height,
            sources.paths().len()
        );
        Ok(Self {
            label,
            geometry,
            geometry_uniforms,
            post,
            post_uniforms,
            target,
            textures,
            extras,
            sources,
            clear_color: config.clear_color,
        })
    }

    /// Renders one frame: the scene into the render target, then the
    /// post-process pass onto the default framebuffer.
    ///
    /// `setup` runs once per pass with that pass's registry (camera, lights);
    /// `draw` runs once in the geometry pass.
    pub fn render<S, D>(&self, gl: &mut dyn Gl, mut setup: S, mut draw: D)
    where
        S: FnMut(&mut dyn Gl, &UniformRegistry),
        D: FnMut(&mut dyn Gl, &UniformRegistry),
    {
        let (width, height) = self.target.size();

        // geometry pass
        self.geometry.activate(gl);
        gl.bind_framebuffer(Some(self.target.framebuffer()));
        gl.viewport(width, height);
        gl.set_depth_test(true);
        clear_active(gl, self.clear_color);
        check_errors(gl);

        setup(gl, &self.geometry_uniforms);
        draw(gl, &self.geometry_uniforms);
        check_errors(gl);

        // post-process pass
        self.post.activate(gl);
        gl.bind_framebuffer(None);
        gl.viewport(width, height);
        clear_active(gl, self.clear_color);

        (self.extras)(gl, &self.post_uniforms);
        self.target.bind_samplers(gl, &self.post_uniforms);
        check_errors(gl);

        setup(gl, &self.post_uniforms);

        self.target.present(gl);
        check_errors(gl);
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn geometry_program(&self) -> &Program {
        &self.geometry
    }

    pub fn post_program(&self) -> &Program {
        &self.post
    }

    pub fn geometry_uniforms(&self) -> &UniformRegistry {
        &self.geometry_uniforms
    }

    pub fn post_uniforms(&self) -> &UniformRegistry {
        &self.post_uniforms
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    /// Textures owned by the post-process pass.
    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    /// Checks the shader sources on disk.
    pub fn freshness(&self) -> Freshness {
        self.sources.freshness()
    }

    pub fn is_stale(&self) -> bool {
        self.freshness() == Freshness::Stale
    }

    /// Deletes every GL object the renderer owns and returns its units.
    pub fn release(self, gl: &mut dyn Gl, units: &mut TextureUnits) {
        self.target.release(gl, units);
        release_textures(gl, units, self.textures);
        self.geometry.release(gl);
        self.post.release(gl);
        check_errors(gl);
        log::info!("{} renderer released", self.label);
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("label", &self.label)
            .field("geometry", &self.geometry)
            .field("post", &self.post)
            .field("target", &self.target)
            .field("textures", &self.textures)
            .finish_non_exhaustive()
    }
}

fn release_textures(gl: &mut dyn Gl, units: &mut TextureUnits, textures: Vec<Texture>) {
    for texture in textures {
        texture.release(gl, units);
    }
}

fn discard(
    gl: &mut dyn Gl,
    units: &mut TextureUnits,
    programs: [Program; 2],
    textures: Vec<Texture>,
) {
    for program in programs {
        program.release(gl);
    }
    release_textures(gl, units, textures);
    check_errors(gl);
}
