use std::path::Path;

use anyhow::Context;

use crate::device::{check_errors, Gl, Sampling, TextureDesc, TextureFormat, TextureId};

use super::{TextureUnit, TextureUnits};

/// A texture object together with the unit it stays bound to.
///
/// Plain handle pair: releasing is explicit through [`Texture::release`], the
/// owner (render target or renderer) decides when.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Texture {
    pub handle: TextureId,
    pub unit: TextureUnit,
}

impl Texture {
    /// Creates a texture, binds it to a freshly allocated unit and gives it
    /// storage described by `desc`.
    ///
    /// `pixels`, if given, must hold `desc.width * desc.height` texels of
    /// `desc.format`. On failure nothing stays allocated.
    pub fn allocate(
        gl: &mut dyn Gl,
        units: &mut TextureUnits,
        desc: TextureDesc,
        sampling: Sampling,
        pixels: Option<&[u8]>,
    ) -> anyhow::Result<Self> {
        let unit = units.allocate()?;
        let handle = match gl.create_texture() {
            Ok(handle) => handle,
            Err(err) => {
                units.release(unit);
                return Err(err.into());
            }
        };

        gl.bind_texture(unit, Some(handle));
        gl.tex_image_2d(desc, pixels);
        gl.tex_sampling(sampling);
        check_errors(gl);

        log::debug!(
            "texture {:?} {}x{} {:?} on {unit}",
            handle.0,
            desc.width,
            desc.height,
            desc.format
        );
        Ok(Self { handle, unit })
    }

    /// Decodes an image file into an RGB8 texture sampled with repeat wrap,
    /// linear filtering and mipmaps.
    pub fn load(gl: &mut dyn Gl, units: &mut TextureUnits, path: &Path) -> anyhow::Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("failed to decode texture {}", path.display()))?
            .to_rgb8();
        let (width, height) = image.dimensions();
        anyhow::ensure!(
            width > 0 && height > 0,
            "texture {} has no pixels",
            path.display()
        );

        let desc = TextureDesc {
            width,
            height,
            format: TextureFormat::Rgb8,
        };
        let texture = Self::allocate(gl, units, desc, Sampling::ASSET, Some(image.as_raw().as_slice()))
            .with_context(|| format!("failed to upload texture {}", path.display()))?;

        log::info!("loaded {} ({width}x{height})", path.display());
        Ok(texture)
    }

    /// Deletes the texture and returns its unit.
    pub fn release(self, gl: &mut dyn Gl, units: &mut TextureUnits) {
        gl.delete_texture(self.handle);
        units.release(self.unit);
    }
}
