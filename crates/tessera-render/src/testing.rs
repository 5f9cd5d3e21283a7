//! Recording driver for dispatch tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tessera_types::{PixelFormat, Point, Rect, RenderError, Result, Window, WindowEvent};

use crate::driver::{DrawState, DriverOps, RenderDriver, RendererFlags, RendererInfo};
use crate::headless::HeadlessWindow;
use crate::renderer::Renderer;
use crate::surface::{PixelsMut, PixelsRef, Surface};
use crate::texture::{Texture, TextureId};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateTexture(TextureId),
    ColorMod(TextureId, (u8, u8, u8)),
    AlphaMod(TextureId, u8),
    BlendMode(TextureId),
    Update(TextureId, Rect, usize),
    Lock(TextureId, Rect),
    Unlock(TextureId),
    Clear(DrawState),
    Points(DrawState, Vec<Point>),
    Lines(DrawState, Vec<Point>),
    FillRects(DrawState, Vec<Rect>),
    Copy { id: TextureId, src: Rect, dst: Rect },
    Read(Rect, PixelFormat, usize),
    Write(Rect, PixelFormat, usize),
    Present,
    Event(WindowEvent),
    DestroyTexture(TextureId),
    Destroy,
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

pub struct RecordingDriver {
    pub log: CallLog,
    pub ops: DriverOps,
    pub fail_create: bool,
    /// Texture format `create_texture` refuses.
    pub refuse_format: Option<PixelFormat>,
    pub fail_blend_mode: bool,
    textures: HashMap<TextureId, Surface>,
}

impl RecordingDriver {
    pub fn new(ops: DriverOps) -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            ops,
            fail_create: false,
            refuse_format: None,
            fail_blend_mode: false,
            textures: HashMap::new(),
        }
    }

    fn push(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

pub fn recording_info() -> RendererInfo {
    RendererInfo {
        name: "recording",
        flags: RendererFlags::empty(),
        texture_formats: vec![PixelFormat::Argb8888, PixelFormat::Abgr8888],
        max_texture_width: 256,
        max_texture_height: 256,
    }
}

/// A renderer over a recording driver on a 100x100 headless window.
pub fn recording_renderer(ops: DriverOps) -> (Renderer, CallLog, Rc<HeadlessWindow>) {
    renderer_over(RecordingDriver::new(ops))
}

pub fn renderer_over(driver: RecordingDriver) -> (Renderer, CallLog, Rc<HeadlessWindow>) {
    let window = Rc::new(HeadlessWindow::new(100, 100));
    let log = Rc::clone(&driver.log);
    let shared: Rc<dyn Window> = Rc::clone(&window) as Rc<dyn Window>;
    let renderer = Renderer::new(shared, recording_info(), Box::new(driver));
    (renderer, log, window)
}

impl RenderDriver for RecordingDriver {
    fn ops(&self) -> DriverOps {
        self.ops
    }

    fn window_event(&mut self, event: &WindowEvent) {
        self.push(Call::Event(*event));
    }

    fn create_texture(&mut self, id: TextureId, texture: &Texture) -> Result<()> {
        if self.fail_create {
            return Err(RenderError::Backend("out of texture memory".into()));
        }
        if self.refuse_format == Some(texture.format()) {
            return Err(RenderError::UnsupportedPixelFormat(texture.format().to_string()));
        }
        self.push(Call::CreateTexture(id));
        let surface = Surface::new(texture.width(), texture.height(), texture.format())?;
        self.textures.insert(id, surface);
        Ok(())
    }

    fn set_texture_color_mod(&mut self, id: TextureId, texture: &Texture) -> Result<()> {
        self.push(Call::ColorMod(id, texture.color_mod()));
        Ok(())
    }

    fn set_texture_alpha_mod(&mut self, id: TextureId, texture: &Texture) -> Result<()> {
        self.push(Call::AlphaMod(id, texture.alpha_mod()));
        Ok(())
    }

    fn set_texture_blend_mode(&mut self, id: TextureId, _texture: &Texture) -> Result<()> {
        if self.fail_blend_mode {
            return Err(RenderError::Backend("blend mode rejected".into()));
        }
        self.push(Call::BlendMode(id));
        Ok(())
    }

    fn update_texture(
        &mut self,
        id: TextureId,
        _texture: &Texture,
        rect: &Rect,
        pixels: &[u8],
        pitch: usize,
    ) -> Result<()> {
        self.push(Call::Update(id, *rect, pitch));
        let surface = self
            .textures
            .get_mut(&id)
            .ok_or(RenderError::InvalidHandle("texture"))?;
        let format = surface.format();
        let src = PixelsRef::new(pixels, pitch, rect.w, rect.h, format)?;
        surface
            .view_rect_mut(rect)
            .ok_or_else(|| RenderError::InvalidArgument("rect".into()))?
            .copy_from(&src)
    }

    fn lock_texture(&mut self, id: TextureId, _texture: &Texture, rect: &Rect) -> Result<PixelsMut<'_>> {
        self.log.borrow_mut().push(Call::Lock(id, *rect));
        self.textures
            .get_mut(&id)
            .and_then(|s| s.view_rect_mut(rect))
            .ok_or(RenderError::InvalidHandle("texture"))
    }

    fn unlock_texture(&mut self, id: TextureId, _texture: &Texture) -> Result<()> {
        self.push(Call::Unlock(id));
        Ok(())
    }

    fn destroy_texture(&mut self, id: TextureId, _texture: &Texture) {
        self.push(Call::DestroyTexture(id));
        self.textures.remove(&id);
    }

    fn render_clear(&mut self, state: &DrawState) -> Result<()> {
        self.push(Call::Clear(*state));
        Ok(())
    }

    fn render_draw_points(&mut self, state: &DrawState, points: &[Point]) -> Result<()> {
        self.push(Call::Points(*state, points.to_vec()));
        Ok(())
    }

    fn render_draw_lines(&mut self, state: &DrawState, points: &[Point]) -> Result<()> {
        self.push(Call::Lines(*state, points.to_vec()));
        Ok(())
    }

    fn render_fill_rects(&mut self, state: &DrawState, rects: &[Rect]) -> Result<()> {
        self.push(Call::FillRects(*state, rects.to_vec()));
        Ok(())
    }

    fn render_copy(&mut self, id: TextureId, _texture: &Texture, src: &Rect, dst: &Rect) -> Result<()> {
        self.push(Call::Copy {
            id,
            src: *src,
            dst: *dst,
        });
        Ok(())
    }

    fn render_read_pixels(
        &mut self,
        rect: &Rect,
        format: PixelFormat,
        pixels: &mut [u8],
        _pitch: usize,
    ) -> Result<()> {
        self.push(Call::Read(*rect, format, pixels.len()));
        Ok(())
    }

    fn render_write_pixels(
        &mut self,
        rect: &Rect,
        format: PixelFormat,
        pixels: &[u8],
        _pitch: usize,
    ) -> Result<()> {
        self.push(Call::Write(*rect, format, pixels.len()));
        Ok(())
    }

    fn render_present(&mut self) -> Result<()> {
        self.push(Call::Present);
        Ok(())
    }

    fn destroy(&mut self) {
        self.push(Call::Destroy);
    }
}
