//! Texture storage shared by the CPU drivers.

use std::collections::HashMap;

use tessera_types::{PixelFormat, Rect, RenderError, Result};

use crate::raster::BlitParams;
use crate::surface::{PixelsMut, PixelsRef, Surface};
use crate::texture::{Texture, TextureId};

/// Formats the CPU drivers accept for textures.
pub const CPU_FORMATS: [PixelFormat; 8] = [
    PixelFormat::Argb8888,
    PixelFormat::Abgr8888,
    PixelFormat::Rgba8888,
    PixelFormat::Bgra8888,
    PixelFormat::Rgb888,
    PixelFormat::Bgr888,
    PixelFormat::Rgb565,
    PixelFormat::Rgb555,
];

/// One [`Surface`] per live texture.
#[derive(Debug, Default)]
pub(crate) struct CpuTextures {
    surfaces: HashMap<TextureId, Surface>,
}

impl CpuTextures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, id: TextureId, texture: &Texture) -> Result<()> {
        if !CPU_FORMATS.contains(&texture.format()) {
            return Err(RenderError::UnsupportedPixelFormat(format!(
                "{} textures are not supported",
                texture.format()
            )));
        }
        let surface = Surface::new(texture.width(), texture.height(), texture.format())?;
        self.surfaces.insert(id, surface);
        Ok(())
    }

    pub fn get(&self, id: TextureId) -> Result<&Surface> {
        self.surfaces
            .get(&id)
            .ok_or(RenderError::InvalidHandle("texture"))
    }

    pub fn update(&mut self, id: TextureId, rect: &Rect, pixels: &[u8], pitch: usize) -> Result<()> {
        let surface = self
            .surfaces
            .get_mut(&id)
            .ok_or(RenderError::InvalidHandle("texture"))?;
        let src = PixelsRef::new(pixels, pitch, rect.w, rect.h, surface.format())?;
        surface
            .view_rect_mut(rect)
            .ok_or_else(|| RenderError::InvalidArgument(format!("rect {rect:?} outside texture")))?
            .copy_from(&src)
    }

    pub fn lock(&mut self, id: TextureId, rect: &Rect) -> Result<PixelsMut<'_>> {
        let surface = self
            .surfaces
            .get_mut(&id)
            .ok_or(RenderError::InvalidHandle("texture"))?;
        surface
            .view_rect_mut(rect)
            .ok_or_else(|| RenderError::InvalidArgument(format!("rect {rect:?} outside texture")))
    }

    pub fn destroy(&mut self, id: TextureId) {
        self.surfaces.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }
}

/// Blit attributes for drawing `texture`.
pub(crate) fn blit_params(texture: &Texture) -> BlitParams {
    BlitParams {
        color_mod: texture.color_mod(),
        alpha_mod: texture.alpha_mod(),
        blend_mode: texture.blend_mode(),
        color_key: None,
    }
}
