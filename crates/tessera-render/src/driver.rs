//! Backend driver contract.
//!
//! Every backend implements [`RenderDriver`]. The [`Renderer`] validates
//! handles and arguments, clips, and keeps the texture records; the driver
//! only ever sees live textures and on-screen rectangles.
//!
//! Required methods cover texture creation, the draw primitives, copy, and
//! present. Optional slots have default implementations and are advertised
//! through [`DriverOps`]; the renderer reports `Unsupported` for slots a
//! driver does not advertise (except clear, which it synthesizes).
//!
//! [`Renderer`]: crate::renderer::Renderer

use bitflags::bitflags;
use serde::Serialize;
use tessera_types::{BlendMode, Color, PixelFormat, Point, Rect, RenderError, Result, WindowEvent};

use crate::surface::PixelsMut;
use crate::texture::{Texture, TextureId};

bitflags! {
    /// Capabilities a driver offers and applications may request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    pub struct RendererFlags: u32 {
        /// Rendering happens on the GPU.
        const ACCELERATED = 0x0000_0002;
        /// Present waits for vertical refresh.
        const PRESENT_VSYNC = 0x0000_0004;
    }
}

bitflags! {
    /// Optional driver slots that are implemented.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DriverOps: u32 {
        const UPDATE_TEXTURE = 0x01;
        const LOCK_TEXTURE = 0x02;
        const RENDER_CLEAR = 0x04;
        const READ_PIXELS = 0x08;
        const WRITE_PIXELS = 0x10;
        const WINDOW_EVENT = 0x20;
    }
}

/// Capability description of a driver or a live renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RendererInfo {
    pub name: &'static str,
    pub flags: RendererFlags,
    pub texture_formats: Vec<PixelFormat>,
    /// Zero when unlimited.
    pub max_texture_width: u32,
    pub max_texture_height: u32,
}

impl RendererInfo {
    pub fn supports_format(&self, format: PixelFormat) -> bool {
        self.texture_formats.contains(&format)
    }
}

/// Draw state at the time of a primitive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawState {
    pub color: Color,
    pub blend_mode: BlendMode,
}

pub trait RenderDriver {
    /// Which optional slots this driver implements.
    fn ops(&self) -> DriverOps;

    fn window_event(&mut self, _event: &WindowEvent) {}

    // -------------------------------------------------------------------
    // Textures
    // -------------------------------------------------------------------

    /// Allocate backend storage for a freshly created texture record.
    fn create_texture(&mut self, id: TextureId, texture: &Texture) -> Result<()>;

    fn set_texture_color_mod(&mut self, _id: TextureId, _texture: &Texture) -> Result<()> {
        Ok(())
    }

    fn set_texture_alpha_mod(&mut self, _id: TextureId, _texture: &Texture) -> Result<()> {
        Ok(())
    }

    fn set_texture_blend_mode(&mut self, _id: TextureId, _texture: &Texture) -> Result<()> {
        Ok(())
    }

    /// Replace `rect` of the texture. `pixels` starts at the rect's first
    /// pixel and is in the texture's format.
    fn update_texture(
        &mut self,
        _id: TextureId,
        _texture: &Texture,
        _rect: &Rect,
        _pixels: &[u8],
        _pitch: usize,
    ) -> Result<()> {
        Err(RenderError::Unsupported("update_texture"))
    }

    fn lock_texture(
        &mut self,
        _id: TextureId,
        _texture: &Texture,
        _rect: &Rect,
    ) -> Result<PixelsMut<'_>> {
        Err(RenderError::Unsupported("lock_texture"))
    }

    fn unlock_texture(&mut self, _id: TextureId, _texture: &Texture) -> Result<()> {
        Ok(())
    }

    fn destroy_texture(&mut self, id: TextureId, texture: &Texture);

    // -------------------------------------------------------------------
    // Drawing
    // -------------------------------------------------------------------

    fn render_clear(&mut self, _state: &DrawState) -> Result<()> {
        Err(RenderError::Unsupported("render_clear"))
    }

    fn render_draw_points(&mut self, state: &DrawState, points: &[Point]) -> Result<()>;

    fn render_draw_lines(&mut self, state: &DrawState, points: &[Point]) -> Result<()>;

    fn render_fill_rects(&mut self, state: &DrawState, rects: &[Rect]) -> Result<()>;

    /// `src` lies inside the texture and `dst` inside the window.
    fn render_copy(&mut self, id: TextureId, texture: &Texture, src: &Rect, dst: &Rect)
    -> Result<()>;

    // -------------------------------------------------------------------
    // Pixel transfer
    // -------------------------------------------------------------------

    /// `rect` lies inside the window; `pixels` starts at its first pixel.
    fn render_read_pixels(
        &mut self,
        _rect: &Rect,
        _format: PixelFormat,
        _pixels: &mut [u8],
        _pitch: usize,
    ) -> Result<()> {
        Err(RenderError::Unsupported("render_read_pixels"))
    }

    fn render_write_pixels(
        &mut self,
        _rect: &Rect,
        _format: PixelFormat,
        _pixels: &[u8],
        _pitch: usize,
    ) -> Result<()> {
        Err(RenderError::Unsupported("render_write_pixels"))
    }

    fn render_present(&mut self) -> Result<()>;

    /// Release driver-wide resources. Runs after every texture is gone.
    fn destroy(&mut self) {}
}
