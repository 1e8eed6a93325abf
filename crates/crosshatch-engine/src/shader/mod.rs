//! Shader programs and semantic uniform access.
//!
//! Programs are built from (vertex, fragment) source files. Uniforms are never
//! addressed by name at draw time: each program gets a [`UniformRegistry`]
//! mapping the closed set of [`UniformTag`]s to its locations, so one piece of
//! per-frame setup code drives any program.

mod error;
mod program;
mod source;
mod uniforms;

pub use error::ShaderError;
pub use program::Program;
pub use source::ShaderPair;
pub use uniforms::{UniformRegistry, UniformTag};
