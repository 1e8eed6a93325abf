use std::fmt;
use std::num::NonZeroU32;

use crate::math::{Mat4, Vec3};
use crate::shader::ShaderError;
use crate::texture::TextureUnit;

use super::{DeviceError, DriverError};

macro_rules! gl_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        pub struct $name(pub NonZeroU32);
    };
}

gl_handle!(
    /// Linked shader program.
    ProgramId
);
gl_handle!(
    /// 2D texture object.
    TextureId
);
gl_handle!(
    /// Framebuffer object. The default (screen) framebuffer is `None`.
    FramebufferId
);
gl_handle!(
    /// Vertex buffer object.
    BufferId
);
gl_handle!(VertexArrayId);

/// Uniform location inside one program. Only meaningful while that program is active.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct UniformLocation(pub u32);

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    I32(i32),
    F32(f32),
    Vec3(Vec3),
    Vec4([f32; 4]),
    Mat4(Mat4),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureFormat {
    /// 32-bit float RGBA (world-space positions).
    Rgba32F,
    /// 16-bit float RGBA (normals, UVs).
    Rgba16F,
    /// 8-bit RGB (decoded image assets).
    Rgb8,
    /// 24-bit depth.
    Depth24,
}

impl TextureFormat {
    #[inline]
    pub fn is_depth(self) -> bool {
        matches!(self, TextureFormat::Depth24)
    }

    /// Bytes per pixel of client-side upload data.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgba32F | TextureFormat::Rgba16F => 16,
            TextureFormat::Rgb8 => 3,
            TextureFormat::Depth24 => 4,
        }
    }
}

/// Storage description for `tex_image_2d`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Wrap {
    ClampToEdge,
    Repeat,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Filter {
    Nearest,
    Linear,
}

/// Wrap/filter parameters applied to the texture bound on the active unit.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Sampling {
    pub wrap: Wrap,
    pub filter: Filter,
    pub mipmaps: bool,
}

impl Sampling {
    /// Render-target attachments: sampled texel-for-texel.
    pub const ATTACHMENT: Sampling = Sampling {
        wrap: Wrap::ClampToEdge,
        filter: Filter::Nearest,
        mipmaps: false,
    };

    /// Image assets: tiled and filtered.
    pub const ASSET: Sampling = Sampling {
        wrap: Wrap::Repeat,
        filter: Filter::Linear,
        mipmaps: true,
    };
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AttachmentPoint {
    Color(u32),
    Depth,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FramebufferStatus {
    Complete,
    IncompleteAttachment,
    MissingAttachment,
    IncompleteDrawBuffer,
    Unsupported,
    Other(u32),
}

impl fmt::Display for FramebufferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramebufferStatus::Complete => f.write_str("FRAMEBUFFER_COMPLETE"),
            FramebufferStatus::IncompleteAttachment => {
                f.write_str("FRAMEBUFFER_INCOMPLETE_ATTACHMENT")
            }
            FramebufferStatus::MissingAttachment => {
                f.write_str("FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT")
            }
            FramebufferStatus::IncompleteDrawBuffer => {
                f.write_str("FRAMEBUFFER_INCOMPLETE_DRAW_BUFFER")
            }
            FramebufferStatus::Unsupported => f.write_str("FRAMEBUFFER_UNSUPPORTED"),
            FramebufferStatus::Other(code) => write!(f, "framebuffer status {code:#x}"),
        }
    }
}

/// Buffers affected by `clear`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
    pub stencil: bool,
}

impl ClearMask {
    pub const COLOR_DEPTH: ClearMask = ClearMask {
        color: true,
        depth: true,
        stencil: false,
    };
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Primitive {
    Triangles,
    TriangleStrip,
}

/// Float vertex attribute layout inside one buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexAttrib {
    pub location: u32,
    pub components: i32,
    pub stride: i32,
    pub offset: i32,
}

/// The graphics driver.
///
/// Mirrors the subset of OpenGL the pipelines need. Calls are immediate and
/// ordered; failures of state-changing calls surface through [`Gl::poll_error`]
/// rather than return values, as in GL.
pub trait Gl {
    // ── programs ──────────────────────────────────────────────────────────

    /// Compiles both stages and links them. Black box from the engine's view.
    fn compile_program(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<ProgramId, ShaderError>;
    fn delete_program(&mut self, program: ProgramId);
    fn use_program(&mut self, program: Option<ProgramId>);
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn attrib_location(&mut self, program: ProgramId, name: &str) -> Option<u32>;
    /// Writes a uniform of the currently active program.
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&mut self) -> Result<TextureId, DeviceError>;
    fn delete_texture(&mut self, texture: TextureId);
    /// Makes `unit` active and binds `texture` to it.
    fn bind_texture(&mut self, unit: TextureUnit, texture: Option<TextureId>);
    /// Allocates storage for the texture bound on the active unit.
    fn tex_image_2d(&mut self, desc: TextureDesc, pixels: Option<&[u8]>);
    fn tex_sampling(&mut self, sampling: Sampling);

    // ── framebuffers ──────────────────────────────────────────────────────

    fn create_framebuffer(&mut self) -> Result<FramebufferId, DeviceError>;
    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);
    /// Attaches `texture` to the bound framebuffer.
    fn framebuffer_texture(&mut self, point: AttachmentPoint, texture: Option<TextureId>);
    /// Routes fragment outputs `0..count` to color attachments `0..count`.
    fn draw_buffers(&mut self, count: u32);
    fn framebuffer_status(&mut self) -> FramebufferStatus;

    // ── geometry ──────────────────────────────────────────────────────────

    fn create_vertex_array(&mut self) -> Result<VertexArrayId, DeviceError>;
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId);
    fn create_buffer(&mut self) -> Result<BufferId, DeviceError>;
    fn delete_buffer(&mut self, buffer: BufferId);
    fn upload_vertices(&mut self, vertex_array: VertexArrayId, buffer: BufferId, data: &[u8]);
    fn vertex_attrib(&mut self, vertex_array: VertexArrayId, buffer: BufferId, attrib: VertexAttrib);
    fn draw_arrays(&mut self, vertex_array: VertexArrayId, primitive: Primitive, first: u32, count: u32);

    // ── fixed-function state ──────────────────────────────────────────────

    fn viewport(&mut self, width: u32, height: u32);
    fn set_depth_test(&mut self, enabled: bool);
    /// Clears the bound framebuffer.
    fn clear(&mut self, color: [f32; 4], mask: ClearMask);

    /// Pops the oldest pending error, if any.
    fn poll_error(&mut self) -> Option<DriverError>;
}
