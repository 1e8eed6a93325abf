//! Textures and the texture-unit allocator.
//!
//! Every sampleable texture is paired with the unit it is bound to for its
//! whole lifetime. Units come from one [`TextureUnits`] allocator owned by the
//! host, so no two live textures share a unit.

mod sampled;
mod units;

pub use sampled::Texture;
pub use units::{TextureUnit, TextureUnits, UnitsExhausted};
