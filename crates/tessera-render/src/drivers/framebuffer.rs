//! CPU renderer presenting through the window's framebuffer.
//!
//! Everything is drawn into a window-sized back buffer in the window's own
//! pixel format, which `render_present` hands to
//! [`Window::present_framebuffer`]. This is the driver a software renderer
//! ends up delegating to when the window has no GL context.

use std::rc::Rc;

use tessera_types::window::Frame;
use tessera_types::{
    BlendMode, PixelFormat, Point, Rect, RenderError, Result, Window, WindowEvent, WindowEventKind,
};

use super::cpu::{CPU_FORMATS, CpuTextures, blit_params};
use crate::driver::{DrawState, DriverOps, RenderDriver, RendererFlags, RendererInfo};
use crate::raster;
use crate::registry::{DriverRequest, RenderDriverEntry};
use crate::renderer::Renderer;
use crate::surface::{PixelsMut, PixelsRef, Surface};
use crate::texture::{Texture, TextureId};

pub const NAME: &str = "framebuffer";

pub fn info() -> RendererInfo {
    RendererInfo {
        name: NAME,
        flags: RendererFlags::empty(),
        texture_formats: CPU_FORMATS.to_vec(),
        max_texture_width: 0,
        max_texture_height: 0,
    }
}

pub fn entry() -> RenderDriverEntry {
    RenderDriverEntry {
        info: info(),
        create,
    }
}

fn create(request: &DriverRequest<'_>) -> Result<Renderer> {
    let driver = FramebufferDriver::new(Rc::clone(&request.window))?;
    Ok(Renderer::new(
        Rc::clone(&request.window),
        info(),
        Box::new(driver),
    ))
}

pub struct FramebufferDriver {
    window: Rc<dyn Window>,
    back: Surface,
    textures: CpuTextures,
    update_size: bool,
}

impl FramebufferDriver {
    pub fn new(window: Rc<dyn Window>) -> Result<Self> {
        if !window.supports_framebuffer() {
            return Err(RenderError::Backend(
                "window does not support framebuffer presentation".into(),
            ));
        }
        let back = back_buffer(window.as_ref())?;
        log::debug!(
            "framebuffer back buffer {}x{} {}",
            back.width(),
            back.height(),
            back.format()
        );
        Ok(Self {
            window,
            back,
            textures: CpuTextures::new(),
            update_size: false,
        })
    }

    /// Back buffer for drawing, reallocated after a resize.
    fn target(&mut self) -> Result<PixelsMut<'_>> {
        if self.update_size {
            self.update_size = false;
            let (w, h) = self.window.size();
            if (w as i32, h as i32) != (self.back.width(), self.back.height()) {
                self.back = back_buffer(self.window.as_ref())?;
            }
        }
        Ok(self.back.view_mut())
    }
}

fn back_buffer(window: &dyn Window) -> Result<Surface> {
    let (w, h) = window.size();
    Surface::new(w as i32, h as i32, window.pixel_format())
}

impl RenderDriver for FramebufferDriver {
    fn ops(&self) -> DriverOps {
        DriverOps::UPDATE_TEXTURE
            | DriverOps::LOCK_TEXTURE
            | DriverOps::RENDER_CLEAR
            | DriverOps::READ_PIXELS
            | DriverOps::WRITE_PIXELS
            | DriverOps::WINDOW_EVENT
    }

    fn window_event(&mut self, event: &WindowEvent) {
        if matches!(event.kind, WindowEventKind::Resized { .. }) {
            self.update_size = true;
        }
    }

    // ---- Textures ----

    fn create_texture(&mut self, id: TextureId, texture: &Texture) -> Result<()> {
        self.textures.create(id, texture)
    }

    fn update_texture(
        &mut self,
        id: TextureId,
        _texture: &Texture,
        rect: &Rect,
        pixels: &[u8],
        pitch: usize,
    ) -> Result<()> {
        self.textures.update(id, rect, pixels, pitch)
    }

    fn lock_texture(&mut self, id: TextureId, _texture: &Texture, rect: &Rect) -> Result<PixelsMut<'_>> {
        self.textures.lock(id, rect)
    }

    fn destroy_texture(&mut self, id: TextureId, _texture: &Texture) {
        self.textures.destroy(id);
    }

    // ---- Drawing ----

    fn render_clear(&mut self, state: &DrawState) -> Result<()> {
        let mut view = self.target()?;
        let all = view.bounds();
        raster::fill_rect(&mut view, &all, state.color, BlendMode::None);
        Ok(())
    }

    fn render_draw_points(&mut self, state: &DrawState, points: &[Point]) -> Result<()> {
        let mut view = self.target()?;
        raster::draw_points(&mut view, points, Point::default(), state.color, state.blend_mode);
        Ok(())
    }

    fn render_draw_lines(&mut self, state: &DrawState, points: &[Point]) -> Result<()> {
        let mut view = self.target()?;
        raster::draw_polyline(&mut view, points, Point::default(), state.color, state.blend_mode);
        Ok(())
    }

    fn render_fill_rects(&mut self, state: &DrawState, rects: &[Rect]) -> Result<()> {
        let mut view = self.target()?;
        for rect in rects {
            raster::fill_rect(&mut view, rect, state.color, state.blend_mode);
        }
        Ok(())
    }

    fn render_copy(&mut self, id: TextureId, texture: &Texture, src: &Rect, dst: &Rect) -> Result<()> {
        self.target()?;
        let source = self.textures.get(id)?;
        raster::blit_scaled(
            &source.view(),
            src,
            &mut self.back.view_mut(),
            dst,
            &blit_params(texture),
        );
        Ok(())
    }

    // ---- Pixel transfer ----

    fn render_read_pixels(
        &mut self,
        rect: &Rect,
        format: PixelFormat,
        pixels: &mut [u8],
        pitch: usize,
    ) -> Result<()> {
        self.target()?;
        let view = self.back.view();
        let region = view
            .sub(rect)
            .ok_or_else(|| RenderError::InvalidArgument(format!("read rect {rect:?} off screen")))?;
        let mut out = PixelsMut::new(pixels, pitch, rect.w, rect.h, format)?;
        out.copy_from(&region)
    }

    fn render_write_pixels(
        &mut self,
        rect: &Rect,
        format: PixelFormat,
        pixels: &[u8],
        pitch: usize,
    ) -> Result<()> {
        let src = PixelsRef::new(pixels, pitch, rect.w, rect.h, format)?;
        self.target()?;
        self.back
            .view_rect_mut(rect)
            .ok_or_else(|| RenderError::InvalidArgument(format!("write rect {rect:?} off screen")))?
            .copy_from(&src)
    }

    fn render_present(&mut self) -> Result<()> {
        self.target()?;
        self.window.present_framebuffer(Frame {
            pixels: self.back.pixels(),
            pitch: self.back.pitch(),
            width: self.back.width() as u32,
            height: self.back.height() as u32,
            format: self.back.format(),
        })
    }

    fn destroy(&mut self) {
        log::debug!(
            "framebuffer driver released ({} textures left)",
            self.textures.len()
        );
    }
}
