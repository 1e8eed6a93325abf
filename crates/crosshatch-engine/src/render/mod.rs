//! Off-screen rendering resources.
//!
//! A [`RenderTarget`] is the G-buffer: one framebuffer with color attachments
//! for positions, normals and UVs plus a depth attachment, each a sampleable
//! texture on its own unit. The post-process pass reads it back through a
//! [`FullscreenQuad`].

mod quad;
mod target;

pub use quad::{FullscreenQuad, QuadVertex, QUAD_VERTICES};
pub use target::{clear_active, IncompleteFramebuffer, RenderTarget, ATTACHMENT_TAGS, NUM_ATTACHMENTS};
