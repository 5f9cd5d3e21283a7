//! Fixed-function OpenGL ES 1.x renderer.
//!
//! All GL traffic goes through the window's [`GlContext`]. Textures are
//! ABGR8888 (RGBA bytes in memory) stored in power-of-two GL textures;
//! streaming textures keep a CPU shadow that lock hands out and unlock
//! uploads in full.

use std::borrow::Cow;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use tessera_types::gl::{GlBlendFactor, GlBlendState, GlContext, GlError, GlPrimitive, GlTexture};
use tessera_types::{
    BlendMode, Color, PixelFormat, Point, Rect, RenderError, Result, Window, WindowEvent,
    WindowEventKind,
};

use crate::driver::{DrawState, DriverOps, RenderDriver, RendererFlags, RendererInfo};
use crate::registry::{DriverRequest, RenderDriverEntry};
use crate::renderer::Renderer;
use crate::surface::PixelsMut;
use crate::texture::{Texture, TextureAccess, TextureId};

pub const NAME: &str = "opengles";

/// Extension that enables `glDrawTexiOES` copies.
pub const DRAW_TEXTURE_EXTENSION: &str = "GL_OES_draw_texture";

const TEXTURE_FORMAT: PixelFormat = PixelFormat::Abgr8888;
const BPP: usize = 4;

static NEXT_CONTEXT: AtomicU32 = AtomicU32::new(1);

thread_local! {
    /// Context made current last on this thread.
    static CURRENT_CONTEXT: Cell<Option<u32>> = const { Cell::new(None) };
}

pub fn info() -> RendererInfo {
    RendererInfo {
        name: NAME,
        flags: RendererFlags::ACCELERATED | RendererFlags::PRESENT_VSYNC,
        texture_formats: vec![TEXTURE_FORMAT],
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
    let context = request.window.create_gl_context()?;
    let driver = GlesDriver::new(Rc::clone(&request.window), context, request.flags)?;

    let mut live = info();
    live.flags = RendererFlags::ACCELERATED;
    if driver.context.swap_interval() > 0 {
        live.flags |= RendererFlags::PRESENT_VSYNC;
    }
    let max = driver.context.max_texture_size();
    live.max_texture_width = max;
    live.max_texture_height = max;
    Ok(Renderer::new(
        Rc::clone(&request.window),
        live,
        Box::new(driver),
    ))
}

fn blend_state(mode: BlendMode) -> GlBlendState {
    use GlBlendFactor::*;
    match mode {
        BlendMode::None => GlBlendState {
            tex_env_modulate: false,
            blend: None,
        },
        BlendMode::Blend => GlBlendState {
            tex_env_modulate: true,
            blend: Some((SrcAlpha, OneMinusSrcAlpha)),
        },
        BlendMode::Add => GlBlendState {
            tex_env_modulate: true,
            blend: Some((SrcAlpha, One)),
        },
        BlendMode::Mod => GlBlendState {
            tex_env_modulate: true,
            blend: Some((Zero, SrcColor)),
        },
    }
}

fn check_error(context: &mut dyn GlContext, call: &str) -> Result<()> {
    match context.get_error() {
        GlError::NoError => Ok(()),
        err => Err(RenderError::Backend(format!("{call}(): {}", err.name()))),
    }
}

/// `rows` rows of `row` bytes each, without the pitch padding.
fn tight_rows(pixels: &[u8], pitch: usize, row: usize, rows: usize) -> Cow<'_, [u8]> {
    if pitch == row {
        return Cow::Borrowed(&pixels[..row * rows]);
    }
    let mut out = Vec::with_capacity(row * rows);
    for y in 0..rows {
        out.extend_from_slice(&pixels[y * pitch..y * pitch + row]);
    }
    Cow::Owned(out)
}

fn vertices(points: &[Point]) -> Vec<i16> {
    points
        .iter()
        .flat_map(|p| [p.x as i16, p.y as i16])
        .collect()
}

struct GlesTexture {
    name: GlTexture,
    width: i32,
    height: i32,
    u_scale: f32,
    v_scale: f32,
    /// CPU copy of a streaming texture, tightly packed.
    shadow: Option<Vec<u8>>,
}

impl GlesTexture {
    fn pitch(&self) -> usize {
        self.width as usize * BPP
    }
}

pub struct GlesDriver {
    window: Rc<dyn Window>,
    context: Box<dyn GlContext>,
    context_id: u32,
    /// Blend mode last sent to GL; `None` until the first draw.
    blend: Option<BlendMode>,
    update_size: bool,
    draw_texture: bool,
    textures: HashMap<TextureId, GlesTexture>,
}

impl GlesDriver {
    pub fn new(window: Rc<dyn Window>, context: Box<dyn GlContext>, flags: RendererFlags) -> Result<Self> {
        let mut driver = Self {
            window,
            context,
            context_id: NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed),
            blend: None,
            update_size: true,
            draw_texture: false,
            textures: HashMap::new(),
        };
        driver.activate()?;

        let interval = i32::from(flags.contains(RendererFlags::PRESENT_VSYNC));
        if let Err(e) = driver.context.set_swap_interval(interval) {
            log::debug!("swap interval {interval} rejected: {e}");
        }
        driver.draw_texture = driver.context.extension_supported(DRAW_TEXTURE_EXTENSION);
        log::debug!(
            "GLES context ready (max texture {}, draw_texture {})",
            driver.context.max_texture_size(),
            driver.draw_texture
        );
        Ok(driver)
    }

    /// Make the context current and refresh the projection after a resize.
    fn activate(&mut self) -> Result<()> {
        let id = self.context_id;
        if CURRENT_CONTEXT.with(|c| c.get()) != Some(id) {
            self.context.make_current()?;
            CURRENT_CONTEXT.with(|c| c.set(Some(id)));
        }
        if self.update_size {
            let (w, h) = self.window.size();
            let (w, h) = (w as i32, h as i32);
            self.context.viewport(0, 0, w, h);
            self.context
                .load_ortho(0.0, w as f32, h as f32, 0.0, 0.0, 1.0);
            self.update_size = false;
        }
        Ok(())
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        if self.blend != Some(mode) {
            self.context.set_blend_state(blend_state(mode));
            self.blend = Some(mode);
        }
    }

    fn prepare_draw(&mut self, state: &DrawState) -> Result<()> {
        self.activate()?;
        self.set_blend_mode(state.blend_mode);
        let [r, g, b, a] = state.color.to_unit();
        self.context.color4f(r, g, b, a);
        Ok(())
    }

    fn texture_mut(&mut self, id: TextureId) -> Result<&mut GlesTexture> {
        self.textures
            .get_mut(&id)
            .ok_or(RenderError::InvalidHandle("texture"))
    }
}

impl RenderDriver for GlesDriver {
    fn ops(&self) -> DriverOps {
        DriverOps::UPDATE_TEXTURE | DriverOps::LOCK_TEXTURE | DriverOps::WINDOW_EVENT
    }

    fn window_event(&mut self, event: &WindowEvent) {
        if matches!(event.kind, WindowEventKind::Resized { .. }) {
            // Rebind on the next call so the new surface size is picked up.
            let id = self.context_id;
            CURRENT_CONTEXT.with(|c| {
                if c.get() == Some(id) {
                    c.set(None);
                }
            });
            self.update_size = true;
        }
    }

    // ---- Textures ----

    fn create_texture(&mut self, id: TextureId, texture: &Texture) -> Result<()> {
        if texture.format() != TEXTURE_FORMAT {
            return Err(RenderError::UnsupportedPixelFormat(format!(
                "{} textures are not supported by {NAME}",
                texture.format()
            )));
        }
        self.activate()?;

        let (w, h) = (texture.width(), texture.height());
        let pot_w = (w as u32).next_power_of_two();
        let pot_h = (h as u32).next_power_of_two();
        let name = self.context.gen_texture()?;
        self.context.bind_texture(Some(name));
        self.context.tex_image_2d(pot_w, pot_h);
        self.context.bind_texture(None);
        if let Err(e) = check_error(self.context.as_mut(), "glTexImage2D") {
            self.context.delete_texture(name);
            return Err(e);
        }

        let shadow = match texture.access() {
            TextureAccess::Streaming => Some(vec![0; w as usize * h as usize * BPP]),
            TextureAccess::Static => None,
        };
        self.textures.insert(
            id,
            GlesTexture {
                name,
                width: w,
                height: h,
                u_scale: w as f32 / pot_w as f32,
                v_scale: h as f32 / pot_h as f32,
                shadow,
            },
        );
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
        self.activate()?;
        let row = rect.w as usize * BPP;
        let rows = rect.h as usize;
        let packed = tight_rows(pixels, pitch, row, rows);

        let tex = self
            .textures
            .get_mut(&id)
            .ok_or(RenderError::InvalidHandle("texture"))?;
        let shadow_pitch = tex.pitch();
        if let Some(shadow) = tex.shadow.as_mut() {
            for y in 0..rows {
                let start = (rect.y as usize + y) * shadow_pitch + rect.x as usize * BPP;
                shadow[start..start + row].copy_from_slice(&packed[y * row..(y + 1) * row]);
            }
        }

        self.context.bind_texture(Some(tex.name));
        self.context
            .tex_sub_image_2d(rect.x, rect.y, rect.w, rect.h, &packed);
        self.context.bind_texture(None);
        check_error(self.context.as_mut(), "glTexSubImage2D")
    }

    fn lock_texture(&mut self, id: TextureId, _texture: &Texture, rect: &Rect) -> Result<PixelsMut<'_>> {
        let tex = self.texture_mut(id)?;
        let pitch = tex.pitch();
        let shadow = tex
            .shadow
            .as_mut()
            .ok_or_else(|| RenderError::InvalidArgument("texture is not streaming".into()))?;
        let start = rect.y as usize * pitch + rect.x as usize * BPP;
        PixelsMut::new(&mut shadow[start..], pitch, rect.w, rect.h, TEXTURE_FORMAT)
    }

    fn unlock_texture(&mut self, id: TextureId, _texture: &Texture) -> Result<()> {
        self.activate()?;
        let tex = self
            .textures
            .get(&id)
            .ok_or(RenderError::InvalidHandle("texture"))?;
        let Some(shadow) = tex.shadow.as_deref() else {
            return Ok(());
        };
        self.context.bind_texture(Some(tex.name));
        self.context
            .tex_sub_image_2d(0, 0, tex.width, tex.height, shadow);
        self.context.bind_texture(None);
        check_error(self.context.as_mut(), "glTexSubImage2D")
    }

    fn destroy_texture(&mut self, id: TextureId, _texture: &Texture) {
        if let Err(e) = self.activate() {
            log::warn!("Failed to activate GL context for texture release: {e}");
        }
        if let Some(tex) = self.textures.remove(&id) {
            self.context.delete_texture(tex.name);
        }
    }

    // ---- Drawing ----

    fn render_draw_points(&mut self, state: &DrawState, points: &[Point]) -> Result<()> {
        self.prepare_draw(state)?;
        self.context
            .draw_arrays(GlPrimitive::Points, &vertices(points), None);
        Ok(())
    }

    fn render_draw_lines(&mut self, state: &DrawState, points: &[Point]) -> Result<()> {
        self.prepare_draw(state)?;
        if points.len() > 2 && points.first() == points.last() {
            let open = &points[..points.len() - 1];
            self.context
                .draw_arrays(GlPrimitive::LineLoop, &vertices(open), None);
        } else {
            self.context
                .draw_arrays(GlPrimitive::LineStrip, &vertices(points), None);
        }
        Ok(())
    }

    fn render_fill_rects(&mut self, state: &DrawState, rects: &[Rect]) -> Result<()> {
        self.prepare_draw(state)?;
        for r in rects {
            let (x1, y1, x2, y2) = (r.x as i16, r.y as i16, r.right() as i16, r.bottom() as i16);
            self.context.draw_arrays(
                GlPrimitive::TriangleStrip,
                &[x1, y1, x2, y1, x1, y2, x2, y2],
                None,
            );
        }
        Ok(())
    }

    fn render_copy(&mut self, id: TextureId, texture: &Texture, src: &Rect, dst: &Rect) -> Result<()> {
        self.activate()?;
        let (name, tw, th, u_scale, v_scale) = {
            let tex = self
                .textures
                .get(&id)
                .ok_or(RenderError::InvalidHandle("texture"))?;
            (tex.name, tex.width, tex.height, tex.u_scale, tex.v_scale)
        };

        self.context.bind_texture(Some(name));
        if texture.modulate().is_empty() {
            self.context.color4f(1.0, 1.0, 1.0, 1.0);
        } else {
            let (r, g, b) = texture.color_mod();
            let [r, g, b, a] = Color::rgba(r, g, b, texture.alpha_mod()).to_unit();
            self.context.color4f(r, g, b, a);
        }
        self.set_blend_mode(texture.blend_mode());

        if self.draw_texture {
            let (_, window_h) = self.window.size();
            let crop = [src.x, src.y + src.h, src.w, -src.h];
            self.context.draw_tex_oes(
                crop,
                dst.x,
                window_h as i32 - dst.y - dst.h,
                dst.w,
                dst.h,
            );
        } else {
            let min_u = src.x as f32 / tw as f32 * u_scale;
            let max_u = src.right() as f32 / tw as f32 * u_scale;
            let min_v = src.y as f32 / th as f32 * v_scale;
            let max_v = src.bottom() as f32 / th as f32 * v_scale;
            let (x1, y1, x2, y2) = (
                dst.x as i16,
                dst.y as i16,
                dst.right() as i16,
                dst.bottom() as i16,
            );
            self.context.draw_arrays(
                GlPrimitive::TriangleStrip,
                &[x1, y1, x2, y1, x1, y2, x2, y2],
                Some(&[min_u, min_v, max_u, min_v, min_u, max_v, max_u, max_v]),
            );
        }
        self.context.bind_texture(None);
        Ok(())
    }

    fn render_present(&mut self) -> Result<()> {
        self.activate()?;
        self.context.swap_window()
    }

    fn destroy(&mut self) {
        for (_, tex) in self.textures.drain() {
            self.context.delete_texture(tex.name);
        }
        let id = self.context_id;
        CURRENT_CONTEXT.with(|c| {
            if c.get() == Some(id) {
                c.set(None);
            }
        });
    }
}
