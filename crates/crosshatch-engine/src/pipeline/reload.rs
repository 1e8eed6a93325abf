use crate::device::Gl;
use crate::shader::Program;
use crate::texture::TextureUnits;

use super::{PipelineConfig, Renderer, Shading};

/// A renderer that rebuilds itself when its shader sources change.
///
/// The replacement is built before the stale renderer is released, so a
/// source that no longer compiles leaves the previous renderer in place.
#[derive(Debug)]
pub struct HotReload {
    shading: Shading,
    config: PipelineConfig,
    renderer: Renderer,
    rebuilds: usize,
}

impl HotReload {
    pub fn new(
        gl: &mut dyn Gl,
        units: &mut TextureUnits,
        shading: Shading,
        config: PipelineConfig,
        bind_scene: &mut dyn FnMut(&mut dyn Gl, &Program),
    ) -> anyhow::Result<Self> {
        let renderer = shading.build(gl, units, &config, bind_scene)?;
        Ok(Self {
            shading,
            config,
            renderer,
            rebuilds: 0,
        })
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn shading(&self) -> &Shading {
        &self.shading
    }

    /// Number of successful rebuilds so far.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Rebuilds the renderer if any of its sources changed.
    ///
    /// Returns whether a rebuild happened. On a failed rebuild the current
    /// renderer is kept (and stays stale, so the next call retries).
    pub fn reload_if_stale(
        &mut self,
        gl: &mut dyn Gl,
        units: &mut TextureUnits,
        bind_scene: &mut dyn FnMut(&mut dyn Gl, &Program),
    ) -> anyhow::Result<bool> {
        if !self.renderer.is_stale() {
            return Ok(false);
        }

        log::info!("{} sources changed, rebuilding", self.shading.label());
        let fresh = self.shading.build(gl, units, &self.config, bind_scene)?;
        let stale = std::mem::replace(&mut self.renderer, fresh);
        stale.release(gl, units);
        self.rebuilds += 1;
        Ok(true)
    }

    pub fn release(self, gl: &mut dyn Gl, units: &mut TextureUnits) {
        self.renderer.release(gl, units);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessGl;
    use crate::testing::ShaderDir;

    fn no_bind() -> impl FnMut(&mut dyn Gl, &Program) {
        |_: &mut dyn Gl, _: &Program| {}
    }

    fn reload(dir: &ShaderDir, gl: &mut HeadlessGl, units: &mut TextureUnits) -> HotReload {
        HotReload::new(gl, units, Shading::AmbientOcclusion, dir.config(), &mut no_bind()).unwrap()
    }

    #[test]
    fn fresh_renderer_is_not_rebuilt() {
        let dir = ShaderDir::new();
        let mut gl = HeadlessGl::new();
        let mut units = TextureUnits::new();
        let mut hot = reload(&dir, &mut gl, &mut units);

        assert!(!hot.reload_if_stale(&mut gl, &mut units, &mut no_bind()).unwrap());
        assert_eq!(hot.rebuilds(), 0);
        hot.release(&mut gl, &mut units);
    }

    #[test]
    fn touched_source_triggers_rebuild() {
        let dir = ShaderDir::new();
        let mut gl = HeadlessGl::new();
        let mut units = TextureUnits::new();
        let mut hot = reload(&dir, &mut gl, &mut units);
        let before = gl.live_objects();
        let old_program = hot.renderer().post_program().id();

        dir.touch_after("deferred_ssao.frag", hot.renderer().sources().built_at());
        assert!(hot.renderer().is_stale());

        assert!(hot.reload_if_stale(&mut gl, &mut units, &mut no_bind()).unwrap());
        assert!(!hot.renderer().is_stale());
        assert_ne!(hot.renderer().post_program().id(), old_program);
        assert_eq!(gl.live_objects(), before);
        assert_eq!(units.in_use(), 4);
        assert_eq!(hot.rebuilds(), 1);

        hot.release(&mut gl, &mut units);
        assert_eq!(gl.live_objects().total(), 0);
    }

    #[test]
    fn repeated_rebuilds_alternate_between_two_unit_sets() {
        let dir = ShaderDir::new();
        let mut gl = HeadlessGl::new();
        let mut units = TextureUnits::new();
        let mut hot = reload(&dir, &mut gl, &mut units);

        let unit_set = |hot: &HotReload| {
            let target = hot.renderer().target();
            let mut set: Vec<u32> = target.attachments().iter().map(|t| t.unit.index()).collect();
            set.push(target.depth().unit.index());
            set.sort_unstable();
            set
        };
        let first = unit_set(&hot);

        let mut seen = Vec::new();
        for _ in 0..4 {
            dir.touch_after("deferred_ssao.frag", hot.renderer().sources().built_at());
            assert!(hot.reload_if_stale(&mut gl, &mut units, &mut no_bind()).unwrap());
            seen.push(unit_set(&hot));
        }

        assert_ne!(seen[0], first);
        assert_eq!(seen[1], first);
        assert_eq!(seen[2], seen[0]);
        assert_eq!(seen[3], first);
        assert!(seen.iter().flatten().all(|&u| u < 8));
        assert_eq!(units.in_use(), 4);

        hot.release(&mut gl, &mut units);
    }

    #[test]
    fn broken_source_keeps_previous_renderer() {
        let dir = ShaderDir::new();
        let mut gl = HeadlessGl::new();
        let mut units = TextureUnits::new();
        let mut hot = reload(&dir, &mut gl, &mut units);
        let program = hot.renderer().post_program().id();
        let built_at = hot.renderer().sources().built_at();

        dir.write("deferred_ssao.frag", "#version 330 core\nout vec4 c;\n");
        dir.touch_after("deferred_ssao.frag", built_at);

        assert!(hot.reload_if_stale(&mut gl, &mut units, &mut no_bind()).is_err());
        assert_eq!(hot.renderer().post_program().id(), program);
        assert!(hot.renderer().is_stale());
        assert_eq!(hot.rebuilds(), 0);

        hot.release(&mut gl, &mut units);
        assert_eq!(gl.live_objects().total(), 0);
    }
}
