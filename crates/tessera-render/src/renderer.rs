//! The renderer dispatch core.
//!
//! A [`Renderer`] owns its texture records, the current draw state, and the
//! backend driver. Every call validates its texture handle, applies default
//! rectangles and clipping, and only then reaches the driver. Degenerate
//! requests (nothing to draw, everything clipped away) succeed without any
//! driver call.

use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use tessera_types::{
    BlendMode, Color, PixelFormat, Point, Rect, RenderError, Result, Window, WindowEvent, WindowId,
};

use crate::arena::Arena;
use crate::driver::{DrawState, DriverOps, RenderDriver, RendererInfo};
use crate::negotiate::{SourceTraits, choose_texture_format};
use crate::surface::{PixelsMut, Surface};
use crate::texture::{Texture, TextureAccess, TextureId, TextureQuery};

static NEXT_SERIAL: AtomicU32 = AtomicU32::new(1);

fn lookup(textures: &Arena<Texture>, serial: u32, id: TextureId) -> Result<&Texture> {
    if id.owner != serial {
        return Err(RenderError::InvalidHandle("texture"));
    }
    textures
        .get(id.key)
        .ok_or(RenderError::InvalidHandle("texture"))
}

fn lookup_mut(textures: &mut Arena<Texture>, serial: u32, id: TextureId) -> Result<&mut Texture> {
    if id.owner != serial {
        return Err(RenderError::InvalidHandle("texture"));
    }
    textures
        .get_mut(id.key)
        .ok_or(RenderError::InvalidHandle("texture"))
}

/// Shrink `src` by the share of `dst` that clipping to `visible` removed.
///
/// Products are taken in `i64`: the removed span of a far off-screen `dst`
/// times the source extent does not fit in `i32`.
fn co_scale(src: &Rect, dst: &Rect, visible: &Rect) -> Rect {
    let scale = |delta: i32, extent: i32, whole: i32| {
        (delta as i64 * extent as i64 / whole as i64) as i32
    };
    Rect::new(
        src.x + scale(visible.x - dst.x, src.w, dst.w),
        src.y + scale(visible.y - dst.y, src.h, dst.h),
        src.w + scale(visible.w - dst.w, src.w, dst.w),
        src.h + scale(visible.h - dst.h, src.h, dst.h),
    )
}

pub struct Renderer {
    serial: u32,
    info: RendererInfo,
    window: Rc<dyn Window>,
    draw_color: Color,
    blend_mode: BlendMode,
    textures: Arena<Texture>,
    driver: Box<dyn RenderDriver>,
    torn_down: bool,
}

impl Renderer {
    /// Wrap a driver. Called by driver factories once the backend is ready.
    pub fn new(window: Rc<dyn Window>, info: RendererInfo, driver: Box<dyn RenderDriver>) -> Self {
        Self {
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
            info,
            window,
            draw_color: Color::BLACK,
            blend_mode: BlendMode::None,
            textures: Arena::new(),
            driver,
            torn_down: false,
        }
    }

    /// Process-unique serial, stamped into every texture id.
    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn info(&self) -> &RendererInfo {
        &self.info
    }

    pub fn window(&self) -> &Rc<dyn Window> {
        &self.window
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn output_size(&self) -> (i32, i32) {
        let (w, h) = self.window.size();
        (w as i32, h as i32)
    }

    fn viewport(&self) -> Rect {
        let (w, h) = self.output_size();
        Rect::sized(w, h)
    }

    fn draw_state(&self) -> DrawState {
        DrawState {
            color: self.draw_color,
            blend_mode: self.blend_mode,
        }
    }

    fn require(&self, op: DriverOps, name: &'static str) -> Result<()> {
        if self.driver.ops().contains(op) {
            Ok(())
        } else {
            Err(RenderError::Unsupported(name))
        }
    }

    // ---- Draw state ----

    pub fn set_draw_color(&mut self, color: Color) {
        self.draw_color = color;
    }

    pub fn draw_color(&self) -> Color {
        self.draw_color
    }

    pub fn set_draw_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    pub fn draw_blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    // ---- Textures ----

    /// Live textures, newest first.
    pub fn texture_ids(&self) -> Vec<TextureId> {
        self.textures
            .iter()
            .map(|(key, _)| TextureId {
                key,
                owner: self.serial,
            })
            .collect()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn texture(&self, id: TextureId) -> Result<&Texture> {
        lookup(&self.textures, self.serial, id)
    }

    pub fn create_texture(
        &mut self,
        format: PixelFormat,
        access: TextureAccess,
        width: i32,
        height: i32,
    ) -> Result<TextureId> {
        if width <= 0 || height <= 0 {
            return Err(RenderError::InvalidArgument(format!(
                "texture dimensions must be positive, got {width}x{height}"
            )));
        }
        let (max_w, max_h) = (self.info.max_texture_width, self.info.max_texture_height);
        if (max_w > 0 && width as u32 > max_w) || (max_h > 0 && height as u32 > max_h) {
            return Err(RenderError::InvalidArgument(format!(
                "texture {width}x{height} exceeds maximum {max_w}x{max_h}"
            )));
        }

        let key = self
            .textures
            .insert(Texture::new(format, access, width, height));
        let id = TextureId {
            key,
            owner: self.serial,
        };
        let created = match self.textures.get(key) {
            Some(texture) => self.driver.create_texture(id, texture),
            None => Err(RenderError::InvalidHandle("texture")),
        };
        if let Err(e) = created {
            self.textures.remove(key);
            return Err(e);
        }
        log::debug!(
            "{}: created {width}x{height} {format} texture ({access:?})",
            self.info.name
        );
        Ok(id)
    }

    /// Create a static texture holding a copy of `surface`.
    ///
    /// Without an explicit `format` the texture format is negotiated against
    /// the renderer's supported list, and creation is retried once with the
    /// window's format if the negotiated one is refused.
    pub fn create_texture_from_surface(
        &mut self,
        format: Option<PixelFormat>,
        surface: &Surface,
    ) -> Result<TextureId> {
        let traits = SourceTraits::of(surface);
        let chosen = choose_texture_format(format, &traits, &self.info.texture_formats)?;
        let (w, h) = (surface.width(), surface.height());
        let id = match self.create_texture(chosen, TextureAccess::Static, w, h) {
            Ok(id) => id,
            Err(e) if format.is_none() => {
                let desktop = self.window.pixel_format();
                log::debug!("{chosen} texture refused ({e}), retrying as {desktop}");
                self.create_texture(desktop, TextureAccess::Static, w, h)?
            }
            Err(e) => return Err(e),
        };

        let texture_format = self.texture(id)?.format();
        let uploaded = if texture_format == surface.format() {
            self.update_texture(id, None, surface.pixels(), surface.pitch())
        } else {
            surface.convert(texture_format).and_then(|converted| {
                self.update_texture(id, None, converted.pixels(), converted.pitch())
            })
        };
        if let Err(e) = uploaded.and_then(|()| self.copy_surface_attributes(id, surface)) {
            if let Err(cleanup) = self.destroy_texture(id) {
                log::warn!("Failed to release texture {id:?} after error: {cleanup}");
            }
            return Err(e);
        }
        Ok(id)
    }

    /// Modulation and blending of `surface`; a color key implies blending.
    fn copy_surface_attributes(&mut self, id: TextureId, surface: &Surface) -> Result<()> {
        let (r, g, b) = surface.color_mod();
        self.set_texture_color_mod(id, r, g, b)?;
        self.set_texture_alpha_mod(id, surface.alpha_mod())?;
        let mode = if surface.color_key().is_some() {
            BlendMode::Blend
        } else {
            surface.blend_mode()
        };
        self.set_texture_blend_mode(id, mode)
    }

    pub fn query_texture(&self, id: TextureId) -> Result<TextureQuery> {
        self.texture(id).map(TextureQuery::from)
    }

    pub fn set_texture_color_mod(&mut self, id: TextureId, r: u8, g: u8, b: u8) -> Result<()> {
        let texture = lookup_mut(&mut self.textures, self.serial, id)?;
        texture.set_color_mod(r, g, b);
        self.driver.set_texture_color_mod(id, texture)
    }

    pub fn texture_color_mod(&self, id: TextureId) -> Result<(u8, u8, u8)> {
        Ok(self.texture(id)?.color_mod())
    }

    pub fn set_texture_alpha_mod(&mut self, id: TextureId, alpha: u8) -> Result<()> {
        let texture = lookup_mut(&mut self.textures, self.serial, id)?;
        texture.set_alpha_mod(alpha);
        self.driver.set_texture_alpha_mod(id, texture)
    }

    pub fn texture_alpha_mod(&self, id: TextureId) -> Result<u8> {
        Ok(self.texture(id)?.alpha_mod())
    }

    pub fn set_texture_blend_mode(&mut self, id: TextureId, mode: BlendMode) -> Result<()> {
        let texture = lookup_mut(&mut self.textures, self.serial, id)?;
        texture.set_blend_mode(mode);
        self.driver.set_texture_blend_mode(id, texture)
    }

    pub fn texture_blend_mode(&self, id: TextureId) -> Result<BlendMode> {
        Ok(self.texture(id)?.blend_mode())
    }

    /// Replace `rect` (whole texture when `None`) with `pixels`, which are in
    /// the texture's format and start at the rect's first pixel.
    pub fn update_texture(
        &mut self,
        id: TextureId,
        rect: Option<Rect>,
        pixels: &[u8],
        pitch: usize,
    ) -> Result<()> {
        let texture = lookup(&self.textures, self.serial, id)?;
        let rect = rect.unwrap_or(texture.bounds());
        if rect.is_empty() {
            return Ok(());
        }
        if !texture.bounds().contains_rect(&rect) {
            return Err(RenderError::InvalidArgument(format!(
                "update rect {rect:?} outside {}x{} texture",
                texture.width(),
                texture.height()
            )));
        }
        let format = texture.format();
        if pitch < rect.w as usize * format.bytes_per_pixel()
            || pixels.len() < format.buffer_len(rect.w as usize, rect.h as usize, pitch)
        {
            return Err(RenderError::InvalidArgument(
                "pixel buffer too small for update rect".into(),
            ));
        }
        if !self.driver.ops().contains(DriverOps::UPDATE_TEXTURE) {
            return Err(RenderError::Unsupported("update_texture"));
        }
        self.driver.update_texture(id, texture, &rect, pixels, pitch)
    }

    /// Lock `rect` (whole texture when `None`) of a streaming texture for
    /// direct writes. The texture stays locked until
    /// [`unlock_texture`](Self::unlock_texture).
    pub fn lock_texture(&mut self, id: TextureId, rect: Option<Rect>) -> Result<PixelsMut<'_>> {
        let texture = lookup(&self.textures, self.serial, id)?;
        if texture.access() != TextureAccess::Streaming {
            return Err(RenderError::InvalidArgument(
                "texture is not streaming".into(),
            ));
        }
        if texture.locked_rect().is_some() {
            return Err(RenderError::InvalidState(
                "texture is already locked".into(),
            ));
        }
        let rect = rect.unwrap_or(texture.bounds());
        if !texture.bounds().contains_rect(&rect) {
            return Err(RenderError::InvalidArgument(format!(
                "lock rect {rect:?} outside {}x{} texture",
                texture.width(),
                texture.height()
            )));
        }
        if !self.driver.ops().contains(DriverOps::LOCK_TEXTURE) {
            return Err(RenderError::Unsupported("lock_texture"));
        }

        lookup_mut(&mut self.textures, self.serial, id)?.set_locked(Some(rect));
        let texture = lookup(&self.textures, self.serial, id)?;
        match self.driver.lock_texture(id, texture, &rect) {
            Ok(pixels) => Ok(pixels),
            Err(e) => {
                if let Some(t) = self.textures.get_mut(id.key) {
                    t.set_locked(None);
                }
                Err(e)
            }
        }
    }

    /// Commit a locked texture. Unlocking a static texture does nothing.
    pub fn unlock_texture(&mut self, id: TextureId) -> Result<()> {
        let texture = lookup(&self.textures, self.serial, id)?;
        if texture.access() != TextureAccess::Streaming {
            return Ok(());
        }
        if texture.locked_rect().is_none() {
            return Err(RenderError::InvalidState("texture is not locked".into()));
        }
        let result = self.driver.unlock_texture(id, texture);
        lookup_mut(&mut self.textures, self.serial, id)?.set_locked(None);
        result
    }

    /// Lock, run `f` on the pixels, unlock.
    pub fn with_lock<R>(
        &mut self,
        id: TextureId,
        rect: Option<Rect>,
        f: impl FnOnce(&mut PixelsMut<'_>) -> R,
    ) -> Result<R> {
        let out = {
            let mut pixels = self.lock_texture(id, rect)?;
            f(&mut pixels)
        };
        self.unlock_texture(id)?;
        Ok(out)
    }

    pub fn destroy_texture(&mut self, id: TextureId) -> Result<()> {
        lookup(&self.textures, self.serial, id)?;
        let texture = self
            .textures
            .remove(id.key)
            .ok_or(RenderError::InvalidHandle("texture"))?;
        self.driver.destroy_texture(id, &texture);
        Ok(())
    }

    // ---- Drawing ----

    /// Fill the whole target with the draw color, ignoring the blend mode.
    ///
    /// Drivers without a native clear get a full-window fill with blending
    /// temporarily switched off. The draw state is restored afterwards, so
    /// nothing may observe it in between.
    pub fn render_clear(&mut self) -> Result<()> {
        if self.driver.ops().contains(DriverOps::RENDER_CLEAR) {
            let state = self.draw_state();
            return self.driver.render_clear(&state);
        }
        let saved = self.blend_mode;
        self.blend_mode = BlendMode::None;
        let result = self.fill_rect(None);
        self.blend_mode = saved;
        result
    }

    pub fn draw_point(&mut self, x: i32, y: i32) -> Result<()> {
        self.draw_points(&[Point::new(x, y)])
    }

    pub fn draw_points(&mut self, points: &[Point]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let state = self.draw_state();
        self.driver.render_draw_points(&state, points)
    }

    pub fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) -> Result<()> {
        self.draw_lines(&[Point::new(x1, y1), Point::new(x2, y2)])
    }

    /// Connected segments through `points`.
    pub fn draw_lines(&mut self, points: &[Point]) -> Result<()> {
        if points.len() < 2 {
            return Ok(());
        }
        let state = self.draw_state();
        self.driver.render_draw_lines(&state, points)
    }

    /// Outline `rect`, or the whole target when `None`.
    pub fn draw_rect(&mut self, rect: Option<Rect>) -> Result<()> {
        let rect = rect.unwrap_or(self.viewport());
        if rect.is_empty() {
            return Ok(());
        }
        self.draw_lines(&rect.outline())
    }

    pub fn draw_rects(&mut self, rects: &[Rect]) -> Result<()> {
        for rect in rects {
            self.draw_rect(Some(*rect))?;
        }
        Ok(())
    }

    /// Fill `rect`, or the whole target when `None`.
    pub fn fill_rect(&mut self, rect: Option<Rect>) -> Result<()> {
        let rect = rect.unwrap_or(self.viewport());
        self.fill_rects(&[rect])
    }

    pub fn fill_rects(&mut self, rects: &[Rect]) -> Result<()> {
        if rects.is_empty() {
            return Ok(());
        }
        let state = self.draw_state();
        self.driver.render_fill_rects(&state, rects)
    }

    /// Copy `src` of a texture (whole texture when `None`) onto `dst` of the
    /// target (whole target when `None`), scaling as needed.
    ///
    /// The destination is clipped to the target and the source shrunk by
    /// the same proportion, so drivers only see on-screen rectangles.
    pub fn render_copy(&mut self, id: TextureId, src: Option<Rect>, dst: Option<Rect>) -> Result<()> {
        if id.owner != self.serial {
            return Err(RenderError::InvalidArgument(
                "texture was not created with this renderer".into(),
            ));
        }
        let window = self.viewport();
        let texture = lookup(&self.textures, self.serial, id)?;
        let bounds = texture.bounds();

        let mut real_src = match src {
            Some(r) => match r.intersect(&bounds) {
                Some(r) => r,
                None => return Ok(()),
            },
            None => bounds,
        };
        let real_dst = match dst {
            Some(d) => {
                let Some(clipped) = d.intersect(&window) else {
                    return Ok(());
                };
                if clipped.w != d.w || clipped.h != d.h {
                    real_src = co_scale(&real_src, &d, &clipped);
                }
                clipped
            }
            None => window,
        };
        if real_src.is_empty() || real_dst.is_empty() {
            return Ok(());
        }
        self.driver.render_copy(id, texture, &real_src, &real_dst)
    }

    /// Offset of the clipped rect's first pixel inside a caller buffer laid
    /// out for `requested`, plus the clipped rect. `None` when nothing of
    /// `requested` is on screen.
    fn transfer_window(
        &self,
        rect: Option<Rect>,
        format: PixelFormat,
        len: usize,
        pitch: usize,
    ) -> Result<Option<(Rect, usize)>> {
        let window = self.viewport();
        let requested = rect.unwrap_or(window);
        let Some(real) = requested.intersect(&window) else {
            return Ok(None);
        };
        let bpp = format.bytes_per_pixel();
        let offset = (real.y - requested.y) as usize * pitch + (real.x - requested.x) as usize * bpp;
        if pitch < real.w as usize * bpp
            || len < offset + format.buffer_len(real.w as usize, real.h as usize, pitch)
        {
            return Err(RenderError::InvalidArgument(
                "pixel buffer too small for transfer rect".into(),
            ));
        }
        Ok(Some((real, offset)))
    }

    /// Read back `rect` of the target (whole target when `None`) into
    /// `pixels`, converting to `format` (the window format when `None`).
    pub fn read_pixels(
        &mut self,
        rect: Option<Rect>,
        format: Option<PixelFormat>,
        pixels: &mut [u8],
        pitch: usize,
    ) -> Result<()> {
        self.require(DriverOps::READ_PIXELS, "render_read_pixels")?;
        let format = format.unwrap_or(self.window.pixel_format());
        let Some((real, offset)) = self.transfer_window(rect, format, pixels.len(), pitch)? else {
            return Ok(());
        };
        self.driver
            .render_read_pixels(&real, format, &mut pixels[offset..], pitch)
    }

    /// Write `pixels` straight into `rect` of the target.
    pub fn write_pixels(
        &mut self,
        rect: Option<Rect>,
        format: Option<PixelFormat>,
        pixels: &[u8],
        pitch: usize,
    ) -> Result<()> {
        self.require(DriverOps::WRITE_PIXELS, "render_write_pixels")?;
        let format = format.unwrap_or(self.window.pixel_format());
        let Some((real, offset)) = self.transfer_window(rect, format, pixels.len(), pitch)? else {
            return Ok(());
        };
        self.driver
            .render_write_pixels(&real, format, &pixels[offset..], pitch)
    }

    pub fn present(&mut self) -> Result<()> {
        self.driver.render_present()
    }

    /// Deliver a window event to drivers that listen for them.
    pub fn window_event(&mut self, event: &WindowEvent) {
        if self.driver.ops().contains(DriverOps::WINDOW_EVENT) {
            self.driver.window_event(event);
        }
    }

    /// Destroy every texture, newest first, then the driver.
    pub fn destroy(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        while let Some(key) = self.textures.head() {
            if let Some(texture) = self.textures.remove(key) {
                let id = TextureId {
                    key,
                    owner: self.serial,
                };
                self.driver.destroy_texture(id, &texture);
            }
        }
        self.driver.destroy();
        log::debug!("{} renderer destroyed", self.info.name);
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.teardown();
    }
}
