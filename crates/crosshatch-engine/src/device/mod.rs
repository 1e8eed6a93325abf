//! Graphics driver seam.
//!
//! Every graphics call made by the engine goes through [`Gl`]:
//! - [`GlowDevice`] drives a real OpenGL 3.3 core context via `glow`
//! - [`HeadlessGl`] models the GL state machine in-process (tests, dry runs)
//!
//! Driver state (bound program, framebuffer, texture units) is global to the
//! device. Methods take `&mut self`, so at most one pass mutates it at a time.

mod error;
mod gl;
mod native;
pub mod headless;

pub use error::{check_errors, DeviceError, DriverError};
pub use gl::{
    AttachmentPoint, BufferId, ClearMask, Filter, FramebufferId, FramebufferStatus, Gl,
    Primitive, ProgramId, Sampling, ShaderStage, TextureDesc, TextureFormat, TextureId,
    UniformLocation, UniformValue, VertexArrayId, VertexAttrib, Wrap,
};
pub use native::GlowDevice;
pub use headless::HeadlessGl;
