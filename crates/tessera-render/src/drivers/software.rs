//! Software rasterizer that presents through another renderer.
//!
//! On creation the driver builds a delegate renderer from the first other
//! registered driver that initializes (or the one named by the
//! `software_driver` override) and a streaming texture on it the size of
//! the window. Every draw call locks the touched region of that texture,
//! rasterizes into it on the CPU, and unlocks; present copies the whole
//! texture to the delegate and presents it.

use std::rc::Rc;

use tessera_types::{
    BlendMode, PixelFormat, Point, Rect, RenderError, Result, Window, WindowEvent, WindowEventKind,
};

use super::cpu::{CPU_FORMATS, CpuTextures, blit_params};
use crate::driver::{DrawState, DriverOps, RenderDriver, RendererFlags, RendererInfo};
use crate::negotiate::{SourceTraits, choose_texture_format};
use crate::raster;
use crate::registry::{DriverRequest, DriverSelection, RenderDriverEntry};
use crate::renderer::Renderer;
use crate::surface::{PixelsMut, PixelsRef};
use crate::texture::{Texture, TextureAccess, TextureId};

pub const NAME: &str = "software";

pub fn info() -> RendererInfo {
    RendererInfo {
        name: NAME,
        flags: RendererFlags::PRESENT_VSYNC,
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
    let renderer = create_delegate(request)?;
    let format = target_format(request.window.as_ref(), renderer.info())?;
    let mut delegate = Delegate {
        renderer,
        target: None,
        format,
        update_size: false,
    };
    // Fail now rather than on the first draw; dropping the delegate on
    // error tears it down.
    delegate.target()?;

    let mut live = info();
    live.flags = delegate.renderer.info().flags & RendererFlags::PRESENT_VSYNC;
    log::debug!(
        "software renderer drawing into a {format} texture on {}",
        delegate.renderer.info().name
    );
    Ok(Renderer::new(
        Rc::clone(&request.window),
        live,
        Box::new(SoftwareDriver {
            delegate: Some(delegate),
            textures: CpuTextures::new(),
        }),
    ))
}

fn create_delegate(request: &DriverRequest<'_>) -> Result<Renderer> {
    let registry = request.registry;
    let eligible = |i: &usize| !registry.entries()[*i].info.name.eq_ignore_ascii_case(NAME);
    let candidates: Vec<usize> = match &request.config.software_driver {
        Some(name) => {
            let index = registry
                .position(name)
                .filter(eligible)
                .ok_or(RenderError::NoMatchingDriver)?;
            vec![index]
        }
        None => (0..registry.len()).filter(eligible).collect(),
    };

    let flags = request.flags & RendererFlags::PRESENT_VSYNC;
    let mut last_error = RenderError::NoMatchingDriver;
    for index in candidates {
        match registry.create_renderer(
            Rc::clone(&request.window),
            DriverSelection::Index(index),
            flags,
            request.config,
        ) {
            Ok(renderer) => return Ok(renderer),
            Err(e) => {
                log::debug!(
                    "software delegate {} unavailable: {e}",
                    registry.entries()[index].info.name
                );
                last_error = e;
            }
        }
    }
    Err(last_error)
}

/// The window's format when the delegate can hold it, else the best match.
fn target_format(window: &dyn Window, delegate: &RendererInfo) -> Result<PixelFormat> {
    let native = window.pixel_format();
    if delegate.supports_format(native) {
        return Ok(native);
    }
    let traits = SourceTraits {
        format: native,
        has_color_key: false,
        blend_mode: BlendMode::None,
    };
    choose_texture_format(None, &traits, &delegate.texture_formats)
}

/// The delegate renderer and the streaming texture drawn into.
struct Delegate {
    renderer: Renderer,
    target: Option<TextureId>,
    format: PixelFormat,
    update_size: bool,
}

impl Delegate {
    /// The target texture, recreated at the window size after a resize.
    fn target(&mut self) -> Result<TextureId> {
        if self.update_size {
            self.update_size = false;
            if let Some(old) = self.target.take() {
                self.renderer.destroy_texture(old)?;
            }
        }
        if let Some(id) = self.target {
            return Ok(id);
        }
        let (w, h) = self.renderer.output_size();
        let id = self
            .renderer
            .create_texture(self.format, TextureAccess::Streaming, w, h)?;
        self.target = Some(id);
        Ok(id)
    }

    fn bounds(&mut self) -> Result<Rect> {
        let target = self.target()?;
        Ok(self.renderer.texture(target)?.bounds())
    }

    /// Lock `area` clipped to the target and run `f` on it together with the
    /// origin of the locked region.
    fn draw(&mut self, area: &Rect, f: impl FnOnce(&mut PixelsMut<'_>, Point)) -> Result<()> {
        let target = self.target()?;
        let bounds = self.renderer.texture(target)?.bounds();
        let Some(rect) = area.intersect(&bounds) else {
            return Ok(());
        };
        self.renderer
            .with_lock(target, Some(rect), |view| f(view, Point::new(rect.x, rect.y)))
    }

    /// Lock exactly `rect` of the target.
    fn transfer<R>(&mut self, rect: &Rect, f: impl FnOnce(&mut PixelsMut<'_>) -> Result<R>) -> Result<R> {
        let target = self.target()?;
        self.renderer.with_lock(target, Some(*rect), f)?
    }
}

/// Bounding box of `points` within `bounds`: the points are pulled onto
/// `bounds` first, so far-away vertices cannot overflow the box.
fn touched(points: &[Point], bounds: &Rect) -> Option<Rect> {
    if bounds.is_empty() {
        return None;
    }
    let (right, bottom) = (bounds.right() - 1, bounds.bottom() - 1);
    let pulled: Vec<Point> = points
        .iter()
        .map(|p| Point::new(p.x.clamp(bounds.x, right), p.y.clamp(bounds.y, bottom)))
        .collect();
    Rect::enclose_points(&pulled, None)
}

pub struct SoftwareDriver {
    delegate: Option<Delegate>,
    textures: CpuTextures,
}

impl SoftwareDriver {
    fn delegate(&mut self) -> Result<&mut Delegate> {
        self.delegate
            .as_mut()
            .ok_or_else(|| RenderError::InvalidState("software renderer already destroyed".into()))
    }
}

impl RenderDriver for SoftwareDriver {
    fn ops(&self) -> DriverOps {
        DriverOps::UPDATE_TEXTURE
            | DriverOps::LOCK_TEXTURE
            | DriverOps::READ_PIXELS
            | DriverOps::WRITE_PIXELS
            | DriverOps::WINDOW_EVENT
    }

    fn window_event(&mut self, event: &WindowEvent) {
        if let Some(delegate) = self.delegate.as_mut() {
            if matches!(event.kind, WindowEventKind::Resized { .. }) {
                delegate.update_size = true;
            }
            delegate.renderer.window_event(event);
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

    fn render_draw_points(&mut self, state: &DrawState, points: &[Point]) -> Result<()> {
        let delegate = self.delegate()?;
        let bounds = delegate.bounds()?;
        let Some(area) = Rect::enclose_points(points, Some(&bounds)) else {
            return Ok(());
        };
        delegate.draw(&area, |view, origin| {
            raster::draw_points(view, points, origin, state.color, state.blend_mode);
        })
    }

    fn render_draw_lines(&mut self, state: &DrawState, points: &[Point]) -> Result<()> {
        let delegate = self.delegate()?;
        let bounds = delegate.bounds()?;
        let Some(area) = touched(points, &bounds) else {
            return Ok(());
        };
        delegate.draw(&area, |view, origin| {
            raster::draw_polyline(view, points, origin, state.color, state.blend_mode);
        })
    }

    fn render_fill_rects(&mut self, state: &DrawState, rects: &[Rect]) -> Result<()> {
        let delegate = self.delegate()?;
        for rect in rects {
            delegate.draw(rect, |view, _| {
                let all = view.bounds();
                raster::fill_rect(view, &all, state.color, state.blend_mode);
            })?;
        }
        Ok(())
    }

    fn render_copy(&mut self, id: TextureId, texture: &Texture, src: &Rect, dst: &Rect) -> Result<()> {
        let params = blit_params(texture);
        let source = self.textures.get(id)?;
        let delegate = self
            .delegate
            .as_mut()
            .ok_or_else(|| RenderError::InvalidState("software renderer already destroyed".into()))?;
        delegate.draw(dst, |view, origin| {
            let local = dst.offset(-origin.x, -origin.y);
            raster::blit_scaled(&source.view(), src, view, &local, &params);
        })
    }

    // ---- Pixel transfer ----

    fn render_read_pixels(
        &mut self,
        rect: &Rect,
        format: PixelFormat,
        pixels: &mut [u8],
        pitch: usize,
    ) -> Result<()> {
        self.delegate()?.transfer(rect, |view| {
            let mut out = PixelsMut::new(pixels, pitch, rect.w, rect.h, format)?;
            out.copy_from(&view.as_view())
        })
    }

    fn render_write_pixels(
        &mut self,
        rect: &Rect,
        format: PixelFormat,
        pixels: &[u8],
        pitch: usize,
    ) -> Result<()> {
        let src = PixelsRef::new(pixels, pitch, rect.w, rect.h, format)?;
        self.delegate()?.transfer(rect, |view| view.copy_from(&src))
    }

    fn render_present(&mut self) -> Result<()> {
        let delegate = self.delegate()?;
        let target = delegate.target()?;
        delegate.renderer.render_copy(target, None, None)?;
        delegate.renderer.present()
    }

    fn destroy(&mut self) {
        let Some(Delegate {
            mut renderer,
            target,
            ..
        }) = self.delegate.take()
        else {
            return;
        };
        if let Some(target) = target
            && let Err(e) = renderer.destroy_texture(target)
        {
            log::warn!("Failed to release software target texture: {e}");
        }
        renderer.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::framebuffer;
    use crate::headless::HeadlessWindow;
    use crate::registry::DriverRegistry;
    use tessera_types::{Color, RenderConfig};

    fn software(w: u32, h: u32) -> (Renderer, Rc<HeadlessWindow>) {
        software_with(w, h, &RenderConfig::fixed())
    }

    fn software_with(w: u32, h: u32, config: &RenderConfig) -> (Renderer, Rc<HeadlessWindow>) {
        let window = Rc::new(HeadlessWindow::new(w, h));
        let registry = DriverRegistry::builtin();
        let index = registry.position(NAME).unwrap();
        let r = registry
            .create_renderer(
                Rc::clone(&window) as Rc<dyn Window>,
                DriverSelection::Index(index),
                RendererFlags::empty(),
                config,
            )
            .unwrap();
        (r, window)
    }

    #[test]
    fn delegates_to_framebuffer_on_headless_window() {
        let (r, _w) = software(8, 8);
        assert_eq!(r.info().name, NAME);
        assert!(!r.info().flags.contains(RendererFlags::PRESENT_VSYNC));
    }

    #[test]
    fn no_delegate_available() {
        let registry = DriverRegistry::new(vec![entry()]);
        let err = registry
            .create_renderer(
                Rc::new(HeadlessWindow::new(4, 4)),
                DriverSelection::Index(0),
                RendererFlags::empty(),
                &RenderConfig::fixed(),
            )
            .err()
            .unwrap();
        assert!(matches!(err, RenderError::NoMatchingDriver));
    }

    #[test]
    fn delegate_override_must_exist() {
        let cfg = RenderConfig::fixed().with_software_driver("opengles");
        let registry = DriverRegistry::builtin();
        let err = registry
            .create_renderer(
                Rc::new(HeadlessWindow::new(4, 4)),
                DriverSelection::Index(2),
                RendererFlags::empty(),
                &cfg,
            )
            .err()
            .unwrap();
        // The headless window has no GL context.
        assert!(matches!(err, RenderError::Backend(_)));

        let cfg = RenderConfig::fixed().with_software_driver(framebuffer::NAME);
        let (r, _w) = software_with(4, 4, &cfg);
        assert_eq!(r.info().name, NAME);
    }

    #[test]
    fn present_shows_rasterized_frame() {
        let (mut r, w) = software(10, 10);
        r.set_draw_color(Color::rgb(0, 0, 255));
        r.render_clear().unwrap();
        r.set_draw_color(Color::rgb(255, 255, 0));
        r.draw_line(-5, 2, 20, 2).unwrap();
        r.present().unwrap();
        assert_eq!(w.frame_pixel(0, 2), Some(Color::rgb(255, 255, 0)));
        assert_eq!(w.frame_pixel(9, 2), Some(Color::rgb(255, 255, 0)));
        assert_eq!(w.frame_pixel(5, 5), Some(Color::rgb(0, 0, 255)));
    }

    #[test]
    fn far_off_screen_primitives_are_clipped() {
        let (mut r, w) = software(10, 10);
        r.set_draw_color(Color::rgb(0, 0, 255));
        r.render_clear().unwrap();
        r.set_draw_color(Color::rgb(255, 255, 0));
        r.draw_points(&[
            Point::new(-2_000_000_000, 0),
            Point::new(2_000_000_000, 0),
            Point::new(3, 3),
        ])
        .unwrap();
        r.draw_lines(&[
            Point::new(i32::MIN, 7),
            Point::new(i32::MAX, 7),
            Point::new(i32::MAX, i32::MAX),
        ])
        .unwrap();
        r.present().unwrap();
        assert_eq!(w.frame_pixel(3, 3), Some(Color::rgb(255, 255, 0)));
        assert_eq!(w.frame_pixel(0, 0), Some(Color::rgb(0, 0, 255)));
        assert_eq!(w.frame_pixel(0, 7), Some(Color::rgb(255, 255, 0)));
        assert_eq!(w.frame_pixel(9, 7), Some(Color::rgb(255, 255, 0)));
        assert_eq!(w.frame_pixel(9, 8), Some(Color::rgb(0, 0, 255)));
    }

    #[test]
    fn present_is_idempotent() {
        let (mut r, w) = software(6, 6);
        r.set_draw_color(Color::rgb(9, 8, 7));
        r.render_clear().unwrap();
        r.present().unwrap();
        let first = w.last_frame().unwrap();
        r.present().unwrap();
        let second = w.last_frame().unwrap();
        assert_eq!(first.pixels(), second.pixels());
        assert_eq!(w.presented_frames(), 2);
    }

    #[test]
    fn blended_fill_composites() {
        let (mut r, _w) = software(4, 4);
        r.set_draw_color(Color::rgb(100, 100, 100));
        r.render_clear().unwrap();
        r.set_draw_color(Color::rgba(200, 0, 50, 128));
        r.set_draw_blend_mode(BlendMode::Blend);
        r.fill_rect(Some(Rect::new(0, 0, 2, 2))).unwrap();
        let mut buf = [0u8; 4];
        r.read_pixels(Some(Rect::new(1, 1, 1, 1)), Some(PixelFormat::Argb8888), &mut buf, 4)
            .unwrap();
        let c = PixelFormat::Argb8888.get_rgba(PixelFormat::Argb8888.read_raw(&buf));
        assert_eq!((c.r, c.g, c.b), (150, 50, 75));
    }

    #[test]
    fn write_pixels_lands_in_target() {
        let (mut r, _w) = software(4, 4);
        let red = PixelFormat::Argb8888.map_rgba(Color::rgb(255, 0, 0)).to_le_bytes();
        r.write_pixels(Some(Rect::new(2, 2, 1, 1)), Some(PixelFormat::Argb8888), &red, 4)
            .unwrap();
        let mut buf = [0u8; 4];
        r.read_pixels(Some(Rect::new(2, 2, 1, 1)), Some(PixelFormat::Argb8888), &mut buf, 4)
            .unwrap();
        assert_eq!(buf, red);
    }

    #[test]
    fn resize_recreates_target() {
        let (mut r, w) = software(4, 4);
        let event = w.resize(8, 2);
        r.window_event(&event);
        r.set_draw_color(Color::WHITE);
        r.render_clear().unwrap();
        r.present().unwrap();
        let frame = w.last_frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (8, 2));
        assert_eq!(w.frame_pixel(7, 1), Some(Color::WHITE));
    }
}
