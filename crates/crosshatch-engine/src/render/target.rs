use std::fmt;

use anyhow::Context;

use crate::device::{
    check_errors, AttachmentPoint, ClearMask, FramebufferId, FramebufferStatus, Gl, ProgramId,
    Sampling, TextureDesc, TextureFormat, UniformValue,
};
use crate::shader::{UniformRegistry, UniformTag};
use crate::texture::{Texture, TextureUnits};

use super::FullscreenQuad;

/// Number of color attachments: positions, normals, UVs.
pub const NUM_ATTACHMENTS: usize = 3;

/// Sampler uniform reading each color attachment, by attachment index.
pub const ATTACHMENT_TAGS: [UniformTag; NUM_ATTACHMENTS] =
    [UniformTag::Positions, UniformTag::Normals, UniformTag::Uvs];

const ATTACHMENT_FORMATS: [TextureFormat; NUM_ATTACHMENTS] = [
    TextureFormat::Rgba32F,
    TextureFormat::Rgba16F,
    TextureFormat::Rgba16F,
];

const DEPTH_TAG: UniformTag = UniformTag::Depths;

/// The framebuffer did not pass the completeness check after setup.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct IncompleteFramebuffer {
    pub status: FramebufferStatus,
}

impl fmt::Display for IncompleteFramebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "render target framebuffer is incomplete: {}", self.status)
    }
}

impl std::error::Error for IncompleteFramebuffer {}

/// Off-screen G-buffer with [`NUM_ATTACHMENTS`] color attachments and depth.
///
/// Size, attachments and their units are fixed at construction. Every handle
/// is released together by [`RenderTarget::release`].
#[derive(Debug)]
pub struct RenderTarget {
    width: u32,
    height: u32,
    framebuffer: FramebufferId,
    attachments: [Texture; NUM_ATTACHMENTS],
    depth: Texture,
    // `None` once released.
    quad: Option<FullscreenQuad>,
}

impl RenderTarget {
    /// Allocates the framebuffer, its attachment textures and the quad.
    ///
    /// On any failure, everything created so far is released again.
    pub fn new(
        gl: &mut dyn Gl,
        units: &mut TextureUnits,
        width: u32,
        height: u32,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            width > 0 && height > 0,
            "render target size must be non-zero, got {width}x{height}"
        );

        let framebuffer = gl
            .create_framebuffer()
            .context("failed to create render target framebuffer")?;

        let mut created = Vec::with_capacity(NUM_ATTACHMENTS + 1);
        let built = Self::attach(gl, units, framebuffer, width, height, &mut created);
        gl.bind_framebuffer(None);

        let quad = built.and_then(|()| FullscreenQuad::new(gl).map_err(anyhow::Error::from));
        let quad = match quad {
            Ok(quad) => quad,
            Err(err) => {
                for texture in created {
                    texture.release(gl, units);
                }
                gl.delete_framebuffer(framebuffer);
                check_errors(gl);
                return Err(err);
            }
        };

        let [positions, normals, uvs, depth] = created[..] else {
            unreachable!("attach pushes every attachment before succeeding");
        };
        check_errors(gl);

        log::info!(
            "render target {width}x{height}: color units [{}, {}, {}], depth {}",
            positions.unit.index(),
            normals.unit.index(),
            uvs.unit.index(),
            depth.unit.index()
        );
        Ok(Self {
            width,
            height,
            framebuffer,
            attachments: [positions, normals, uvs],
            depth,
            quad: Some(quad),
        })
    }

    fn attach(
        gl: &mut dyn Gl,
        units: &mut TextureUnits,
        framebuffer: FramebufferId,
        width: u32,
        height: u32,
        created: &mut Vec<Texture>,
    ) -> anyhow::Result<()> {
        gl.bind_framebuffer(Some(framebuffer));

        for (i, format) in ATTACHMENT_FORMATS.into_iter().enumerate() {
            let desc = TextureDesc { width, height, format };
            let texture = Texture::allocate(gl, units, desc, Sampling::ATTACHMENT, None)
                .with_context(|| format!("failed to allocate color attachment {i}"))?;
            created.push(texture);
            gl.framebuffer_texture(AttachmentPoint::Color(i as u32), Some(texture.handle));
        }

        let desc = TextureDesc {
            width,
            height,
            format: TextureFormat::Depth24,
        };
        let depth = Texture::allocate(gl, units, desc, Sampling::ATTACHMENT, None)
            .context("failed to allocate depth attachment")?;
        created.push(depth);
        gl.framebuffer_texture(AttachmentPoint::Depth, Some(depth.handle));

        gl.draw_buffers(NUM_ATTACHMENTS as u32);

        let status = gl.framebuffer_status();
        if status != FramebufferStatus::Complete {
            return Err(IncompleteFramebuffer { status }.into());
        }
        Ok(())
    }

    /// Prepares `program` to consume this target: activates it, feeds the
    /// quad into its vertex inputs and points its G-buffer samplers at the
    /// attachment units.
    pub fn bind_to_program(&self, gl: &mut dyn Gl, program: ProgramId) {
        gl.use_program(Some(program));
        if let Some(quad) = &self.quad {
            quad.bind_attributes(gl, program);
        }

        for (tag, texture) in self.samplers() {
            if let Some(location) = gl.uniform_location(program, tag.name()) {
                gl.set_uniform(location, UniformValue::I32(texture.unit.sampler()));
            }
        }
        check_errors(gl);
    }

    /// Sets the G-buffer sampler uniforms through `registry`. The registry's
    /// program must be active.
    pub fn bind_samplers(&self, gl: &mut dyn Gl, registry: &UniformRegistry) {
        for (tag, texture) in self.samplers() {
            registry.set_sampler(gl, tag, texture.unit);
        }
    }

    fn samplers(&self) -> impl Iterator<Item = (UniformTag, Texture)> + '_ {
        ATTACHMENT_TAGS
            .into_iter()
            .zip(self.attachments)
            .chain(std::iter::once((DEPTH_TAG, self.depth)))
    }

    /// Color attachment `i`.
    ///
    /// # Panics
    ///
    /// If `i >= NUM_ATTACHMENTS`.
    pub fn attachment(&self, i: usize) -> Texture {
        assert!(
            i < NUM_ATTACHMENTS,
            "attachment index {i} out of range (render target has {NUM_ATTACHMENTS})"
        );
        self.attachments[i]
    }

    pub fn attachments(&self) -> &[Texture; NUM_ATTACHMENTS] {
        &self.attachments
    }

    pub fn depth(&self) -> Texture {
        self.depth
    }

    pub fn framebuffer(&self) -> FramebufferId {
        self.framebuffer
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Draws the full-screen quad with whatever program and framebuffer are
    /// bound.
    pub fn present(&self, gl: &mut dyn Gl) {
        if let Some(quad) = &self.quad {
            quad.draw(gl);
        }
    }

    /// Deletes the framebuffer, every attachment and the quad, and returns
    /// the units to `units`.
    pub fn release(mut self, gl: &mut dyn Gl, units: &mut TextureUnits) {
        if let Some(quad) = self.quad.take() {
            quad.release(gl);
        }
        gl.delete_framebuffer(self.framebuffer);
        for texture in self.attachments {
            texture.release(gl, units);
        }
        self.depth.release(gl, units);
        log::debug!("render target {}x{} released", self.width, self.height);
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        if self.quad.is_some() {
            log::warn!(
                "render target {}x{} dropped without release; GL objects leaked",
                self.width,
                self.height
            );
        }
    }
}

/// Clears color and depth of the bound framebuffer to `color`.
pub fn clear_active(gl: &mut dyn Gl, color: [f32; 4]) {
    gl.clear(color, ClearMask::COLOR_DEPTH);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::headless::HeadlessLimits;
    use crate::device::HeadlessGl;

    fn target(gl: &mut HeadlessGl, units: &mut TextureUnits) -> RenderTarget {
        RenderTarget::new(gl, units, 256, 256).unwrap()
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn attachment_units_are_distinct() {
        let mut gl = HeadlessGl::new();
        let mut units = TextureUnits::new();
        let rt = target(&mut gl, &mut units);

        let mut seen: Vec<u32> = (0..NUM_ATTACHMENTS)
            .map(|i| rt.attachment(i).unit.index())
            .collect();
        seen.push(rt.depth().unit.index());
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), NUM_ATTACHMENTS + 1);

        rt.release(&mut gl, &mut units);
    }

    #[test]
    fn framebuffer_is_complete_and_unbound() {
        let mut gl = HeadlessGl::new();
        let mut units = TextureUnits::new();
        let rt = target(&mut gl, &mut units);

        assert_eq!(gl.current_framebuffer(), None);
        assert!(!gl.has_pending_errors());
        for (i, texture) in rt.attachments().iter().enumerate() {
            assert_eq!(
                gl.framebuffer_attachment(rt.framebuffer(), AttachmentPoint::Color(i as u32)),
                Some(texture.handle)
            );
        }
        assert_eq!(
            gl.texture_storage(rt.attachment(0).handle).map(|d| d.format),
            Some(TextureFormat::Rgba32F)
        );
        assert_eq!(rt.size(), (256, 256));

        rt.release(&mut gl, &mut units);
    }

    #[test]
    fn two_targets_share_no_units() {
        let mut gl = HeadlessGl::new();
        let mut units = TextureUnits::new();
        let a = target(&mut gl, &mut units);
        let b = target(&mut gl, &mut units);

        let units_of = |rt: &RenderTarget| {
            let mut v: Vec<u32> = rt.attachments().iter().map(|t| t.unit.index()).collect();
            v.push(rt.depth().unit.index());
            v
        };
        let ua = units_of(&a);
        assert!(units_of(&b).iter().all(|u| !ua.contains(u)));

        a.release(&mut gl, &mut units);
        b.release(&mut gl, &mut units);
    }

    #[test]
    fn zero_size_is_rejected() {
        let mut gl = HeadlessGl::new();
        let mut units = TextureUnits::new();
        assert!(RenderTarget::new(&mut gl, &mut units, 0, 16).is_err());
        assert_eq!(gl.live_objects().total(), 0);
    }

    #[test]
    fn oversized_target_is_incomplete_and_cleaned_up() {
        let mut gl = HeadlessGl::with_limits(HeadlessLimits {
            max_texture_size: 64,
            ..HeadlessLimits::default()
        });
        let mut units = TextureUnits::new();
        let err = RenderTarget::new(&mut gl, &mut units, 256, 256).unwrap_err();

        let incomplete = err.downcast_ref::<IncompleteFramebuffer>().unwrap();
        assert_eq!(incomplete.status, FramebufferStatus::IncompleteAttachment);
        assert_eq!(gl.live_objects().total(), 0);
        assert_eq!(units.in_use(), 0);
        assert!(!gl.has_pending_errors());
    }

    // ── access ────────────────────────────────────────────────────────────

    #[test]
    #[should_panic(expected = "out of range")]
    fn attachment_past_end_panics() {
        let mut gl = HeadlessGl::new();
        let mut units = TextureUnits::new();
        let rt = target(&mut gl, &mut units);
        let _ = rt.attachment(NUM_ATTACHMENTS);
    }

    #[test]
    fn bind_to_program_sets_samplers() {
        let mut gl = HeadlessGl::new();
        let mut units = TextureUnits::new();
        let rt = target(&mut gl, &mut units);
        let program = gl
            .compile_program(
                include_str!("../../shaders/render_buffer.vert"),
                include_str!("../../shaders/deferred_dirlight.frag"),
            )
            .unwrap();

        rt.bind_to_program(&mut gl, program);

        assert_eq!(gl.current_program(), Some(program));
        assert_eq!(
            gl.uniform_by_name(program, "unifNormals"),
            Some(UniformValue::I32(rt.attachment(1).unit.sampler()))
        );
        assert_eq!(
            gl.uniform_by_name(program, "unifDepths"),
            Some(UniformValue::I32(rt.depth().unit.sampler()))
        );
        assert!(!gl.has_pending_errors());

        rt.release(&mut gl, &mut units);
    }

    #[test]
    fn present_is_a_single_draw() {
        let mut gl = HeadlessGl::new();
        let mut units = TextureUnits::new();
        let rt = target(&mut gl, &mut units);
        let program = gl
            .compile_program(
                include_str!("../../shaders/render_buffer.vert"),
                include_str!("../../shaders/deferred_dirlight.frag"),
            )
            .unwrap();
        rt.bind_to_program(&mut gl, program);
        gl.take_commands();

        rt.present(&mut gl);
        assert_eq!(gl.draw_calls(), 1);
        assert_eq!(gl.take_commands().len(), 1);

        rt.release(&mut gl, &mut units);
    }

    // ── teardown ──────────────────────────────────────────────────────────

    #[test]
    fn release_frees_everything() {
        let mut gl = HeadlessGl::new();
        let mut units = TextureUnits::new();
        let rt = target(&mut gl, &mut units);
        rt.release(&mut gl, &mut units);

        assert_eq!(gl.live_objects().total(), 0);
        assert_eq!(units.in_use(), 0);
    }

    #[test]
    fn clear_active_on_default_framebuffer() {
        let mut gl = HeadlessGl::new();
        clear_active(&mut gl, [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(
            gl.commands(),
            [crate::device::headless::Command::Clear {
                framebuffer: None,
                color: [0.1, 0.2, 0.3, 1.0]
            }]
        );
    }
}
