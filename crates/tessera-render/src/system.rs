//! Handle-based entry point over renderers.
//!
//! [`RenderSystem`] owns every renderer it creates in a generational arena
//! and hands out copyable [`RendererId`] / [`TextureHandle`] values. Stale or
//! foreign handles are rejected on every call. Failures are logged and kept
//! as the last error message, retrievable through
//! [`last_error`](RenderSystem::last_error).

use std::cell::RefCell;
use std::rc::Rc;

use tessera_types::{
    BlendMode, Color, PixelFormat, Point, Rect, RenderConfig, RenderError, Result, Window,
    WindowEvent,
};

use crate::arena::{Arena, Key};
use crate::driver::{RendererFlags, RendererInfo};
use crate::events::EventBridge;
use crate::registry::{DriverRegistry, DriverSelection};
use crate::renderer::Renderer;
use crate::surface::{PixelsMut, Surface};
use crate::texture::{TextureAccess, TextureId, TextureQuery};

/// Handle to a renderer owned by a [`RenderSystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RendererId(Key);

/// Handle to a texture: the owning renderer plus the texture id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle {
    renderer: RendererId,
    id: TextureId,
}

impl TextureHandle {
    pub fn renderer(&self) -> RendererId {
        self.renderer
    }

    pub fn id(&self) -> TextureId {
        self.id
    }
}

fn note<T>(last_error: &RefCell<Option<String>>, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        log::debug!("render call failed: {e}");
        *last_error.borrow_mut() = Some(e.to_string());
    }
    result
}

pub struct RenderSystem {
    registry: DriverRegistry,
    config: RenderConfig,
    renderers: Arena<Renderer>,
    bridge: EventBridge,
    last_error: RefCell<Option<String>>,
}

impl RenderSystem {
    pub fn new(registry: DriverRegistry, config: RenderConfig) -> Self {
        Self {
            registry,
            config,
            renderers: Arena::new(),
            bridge: EventBridge::new(),
            last_error: RefCell::new(None),
        }
    }

    /// A system over the built-in drivers.
    pub fn with_config(config: RenderConfig) -> Self {
        Self::new(DriverRegistry::builtin(), config)
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: RenderConfig) {
        self.config = config;
    }

    // ---- Errors ----

    /// Message of the most recent failed call.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    pub fn clear_error(&self) {
        *self.last_error.borrow_mut() = None;
    }

    fn with_renderer<'a, T>(
        &'a self,
        id: RendererId,
        f: impl FnOnce(&'a Renderer) -> Result<T>,
    ) -> Result<T> {
        let result = match self.renderers.get(id.0) {
            Some(renderer) => f(renderer),
            None => Err(RenderError::InvalidHandle("renderer")),
        };
        note(&self.last_error, result)
    }

    fn with_renderer_mut<'a, T>(
        &'a mut self,
        id: RendererId,
        f: impl FnOnce(&'a mut Renderer) -> Result<T>,
    ) -> Result<T> {
        let result = match self.renderers.get_mut(id.0) {
            Some(renderer) => f(renderer),
            None => Err(RenderError::InvalidHandle("renderer")),
        };
        note(&self.last_error, result)
    }

    fn with_texture_mut<'a, T>(
        &'a mut self,
        texture: TextureHandle,
        f: impl FnOnce(&'a mut Renderer, TextureId) -> Result<T>,
    ) -> Result<T> {
        self.with_renderer_mut(texture.renderer, |r| f(r, texture.id))
    }

    // ---- Drivers ----

    pub fn num_render_drivers(&self) -> usize {
        self.registry.len()
    }

    pub fn render_driver_info(&self, index: usize) -> Result<&RendererInfo> {
        note(&self.last_error, self.registry.info(index))
    }

    // ---- Renderers ----

    /// Create a renderer for `window`. Environment overrides are re-read
    /// on every call unless the configuration disables them.
    pub fn create_renderer(
        &mut self,
        window: Rc<dyn Window>,
        selection: DriverSelection,
        flags: RendererFlags,
    ) -> Result<RendererId> {
        let config = self.config.resolved();
        let window_id = window.id();
        let created = self
            .registry
            .create_renderer(window, selection, flags, &config);
        let renderer = note(&self.last_error, created)?;
        let id = RendererId(self.renderers.insert(renderer));
        self.bridge.watch(id, window_id);
        Ok(id)
    }

    /// Stop event delivery, destroy every texture and release the driver.
    pub fn destroy_renderer(&mut self, id: RendererId) -> Result<()> {
        if !self.renderers.contains(id.0) {
            return note(&self.last_error, Err(RenderError::InvalidHandle("renderer")));
        }
        self.bridge.unwatch(id);
        if let Some(renderer) = self.renderers.remove(id.0) {
            renderer.destroy();
        }
        Ok(())
    }

    /// Live renderers, newest first.
    pub fn renderer_ids(&self) -> Vec<RendererId> {
        self.renderers.keys().into_iter().map(RendererId).collect()
    }

    pub fn renderer(&self, id: RendererId) -> Result<&Renderer> {
        self.with_renderer(id, Ok)
    }

    pub fn renderer_mut(&mut self, id: RendererId) -> Result<&mut Renderer> {
        self.with_renderer_mut(id, Ok)
    }

    pub fn renderer_info(&self, id: RendererId) -> Result<&RendererInfo> {
        self.with_renderer(id, |r| Ok(r.info()))
    }

    pub fn output_size(&self, id: RendererId) -> Result<(i32, i32)> {
        self.with_renderer(id, |r| Ok(r.output_size()))
    }

    // ---- Draw state ----

    pub fn set_draw_color(&mut self, id: RendererId, color: Color) -> Result<()> {
        self.with_renderer_mut(id, |r| {
            r.set_draw_color(color);
            Ok(())
        })
    }

    pub fn draw_color(&self, id: RendererId) -> Result<Color> {
        self.with_renderer(id, |r| Ok(r.draw_color()))
    }

    pub fn set_draw_blend_mode(&mut self, id: RendererId, mode: BlendMode) -> Result<()> {
        self.with_renderer_mut(id, |r| {
            r.set_draw_blend_mode(mode);
            Ok(())
        })
    }

    pub fn draw_blend_mode(&self, id: RendererId) -> Result<BlendMode> {
        self.with_renderer(id, |r| Ok(r.draw_blend_mode()))
    }

    // ---- Textures ----

    pub fn create_texture(
        &mut self,
        id: RendererId,
        format: PixelFormat,
        access: TextureAccess,
        width: i32,
        height: i32,
    ) -> Result<TextureHandle> {
        self.with_renderer_mut(id, |r| {
            let texture = r.create_texture(format, access, width, height)?;
            Ok(TextureHandle {
                renderer: id,
                id: texture,
            })
        })
    }

    pub fn create_texture_from_surface(
        &mut self,
        id: RendererId,
        format: Option<PixelFormat>,
        surface: &Surface,
    ) -> Result<TextureHandle> {
        self.with_renderer_mut(id, |r| {
            let texture = r.create_texture_from_surface(format, surface)?;
            Ok(TextureHandle {
                renderer: id,
                id: texture,
            })
        })
    }

    pub fn query_texture(&self, texture: TextureHandle) -> Result<TextureQuery> {
        self.with_renderer(texture.renderer, |r| r.query_texture(texture.id))
    }

    pub fn set_texture_color_mod(&mut self, texture: TextureHandle, r: u8, g: u8, b: u8) -> Result<()> {
        self.with_texture_mut(texture, |rd, id| rd.set_texture_color_mod(id, r, g, b))
    }

    pub fn texture_color_mod(&self, texture: TextureHandle) -> Result<(u8, u8, u8)> {
        self.with_renderer(texture.renderer, |r| r.texture_color_mod(texture.id))
    }

    pub fn set_texture_alpha_mod(&mut self, texture: TextureHandle, alpha: u8) -> Result<()> {
        self.with_texture_mut(texture, |r, id| r.set_texture_alpha_mod(id, alpha))
    }

    pub fn texture_alpha_mod(&self, texture: TextureHandle) -> Result<u8> {
        self.with_renderer(texture.renderer, |r| r.texture_alpha_mod(texture.id))
    }

    pub fn set_texture_blend_mode(&mut self, texture: TextureHandle, mode: BlendMode) -> Result<()> {
        self.with_texture_mut(texture, |r, id| r.set_texture_blend_mode(id, mode))
    }

    pub fn texture_blend_mode(&self, texture: TextureHandle) -> Result<BlendMode> {
        self.with_renderer(texture.renderer, |r| r.texture_blend_mode(texture.id))
    }

    pub fn update_texture(
        &mut self,
        texture: TextureHandle,
        rect: Option<Rect>,
        pixels: &[u8],
        pitch: usize,
    ) -> Result<()> {
        self.with_texture_mut(texture, |r, id| r.update_texture(id, rect, pixels, pitch))
    }

    pub fn lock_texture(&mut self, texture: TextureHandle, rect: Option<Rect>) -> Result<PixelsMut<'_>> {
        self.with_texture_mut(texture, |r, id| r.lock_texture(id, rect))
    }

    pub fn unlock_texture(&mut self, texture: TextureHandle) -> Result<()> {
        self.with_texture_mut(texture, |r, id| r.unlock_texture(id))
    }

    pub fn with_lock<R>(
        &mut self,
        texture: TextureHandle,
        rect: Option<Rect>,
        f: impl FnOnce(&mut PixelsMut<'_>) -> R,
    ) -> Result<R> {
        self.with_texture_mut(texture, |r, id| r.with_lock(id, rect, f))
    }

    pub fn destroy_texture(&mut self, texture: TextureHandle) -> Result<()> {
        self.with_texture_mut(texture, |r, id| r.destroy_texture(id))
    }

    // ---- Drawing ----

    pub fn render_clear(&mut self, id: RendererId) -> Result<()> {
        self.with_renderer_mut(id, Renderer::render_clear)
    }

    pub fn draw_point(&mut self, id: RendererId, x: i32, y: i32) -> Result<()> {
        self.with_renderer_mut(id, |r| r.draw_point(x, y))
    }

    pub fn draw_points(&mut self, id: RendererId, points: &[Point]) -> Result<()> {
        self.with_renderer_mut(id, |r| r.draw_points(points))
    }

    pub fn draw_line(&mut self, id: RendererId, x1: i32, y1: i32, x2: i32, y2: i32) -> Result<()> {
        self.with_renderer_mut(id, |r| r.draw_line(x1, y1, x2, y2))
    }

    pub fn draw_lines(&mut self, id: RendererId, points: &[Point]) -> Result<()> {
        self.with_renderer_mut(id, |r| r.draw_lines(points))
    }

    pub fn draw_rect(&mut self, id: RendererId, rect: Option<Rect>) -> Result<()> {
        self.with_renderer_mut(id, |r| r.draw_rect(rect))
    }

    pub fn draw_rects(&mut self, id: RendererId, rects: &[Rect]) -> Result<()> {
        self.with_renderer_mut(id, |r| r.draw_rects(rects))
    }

    pub fn fill_rect(&mut self, id: RendererId, rect: Option<Rect>) -> Result<()> {
        self.with_renderer_mut(id, |r| r.fill_rect(rect))
    }

    pub fn fill_rects(&mut self, id: RendererId, rects: &[Rect]) -> Result<()> {
        self.with_renderer_mut(id, |r| r.fill_rects(rects))
    }

    /// Copy a texture onto renderer `id`. The texture must have been
    /// created with that renderer.
    pub fn render_copy(
        &mut self,
        id: RendererId,
        texture: TextureHandle,
        src: Option<Rect>,
        dst: Option<Rect>,
    ) -> Result<()> {
        // A stale texture is a bad handle even when it was never ours.
        let live = match (self.renderers.get(id.0), self.renderers.get(texture.renderer.0)) {
            (None, _) => Err(RenderError::InvalidHandle("renderer")),
            (Some(_), Some(owner)) => owner.texture(texture.id).map(|_| ()),
            (Some(_), None) => Err(RenderError::InvalidHandle("texture")),
        };
        note(&self.last_error, live)?;
        self.with_renderer_mut(id, |r| r.render_copy(texture.id, src, dst))
    }

    pub fn read_pixels(
        &mut self,
        id: RendererId,
        rect: Option<Rect>,
        format: Option<PixelFormat>,
        pixels: &mut [u8],
        pitch: usize,
    ) -> Result<()> {
        self.with_renderer_mut(id, |r| r.read_pixels(rect, format, pixels, pitch))
    }

    pub fn write_pixels(
        &mut self,
        id: RendererId,
        rect: Option<Rect>,
        format: Option<PixelFormat>,
        pixels: &[u8],
        pitch: usize,
    ) -> Result<()> {
        self.with_renderer_mut(id, |r| r.write_pixels(rect, format, pixels, pitch))
    }

    pub fn present(&mut self, id: RendererId) -> Result<()> {
        self.with_renderer_mut(id, Renderer::present)
    }

    // ---- Events ----

    /// Forward a window event to every renderer drawing into that window.
    pub fn dispatch_event(&mut self, event: &WindowEvent) {
        for id in self.bridge.targets(event) {
            if let Some(renderer) = self.renderers.get_mut(id.0) {
                renderer.window_event(event);
            }
        }
    }
}

impl Drop for RenderSystem {
    fn drop(&mut self) {
        while let Some(key) = self.renderers.head() {
            self.bridge.unwatch(RendererId(key));
            if let Some(renderer) = self.renderers.remove(key) {
                renderer.destroy();
            }
        }
    }
}

#[cfg(test)]
mod tests;
