//! Demo scene exercising every primitive.

use tessera_render::{
    BlendMode, Color, PixelFormat, Point, Rect, RenderSystem, RendererId, Result, Surface,
    TextureAccess,
};

pub const BACKGROUND: Color = Color::rgb(20, 24, 36);

const SPRITE_KEY: Color = Color::rgb(255, 0, 255);

/// Draw the demo scene. The top-left 8x8 corner is left at [`BACKGROUND`].
pub fn draw(system: &mut RenderSystem, id: RendererId) -> Result<()> {
    let (w, h) = system.output_size(id)?;
    system.set_draw_blend_mode(id, BlendMode::None)?;
    system.set_draw_color(id, BACKGROUND)?;
    system.render_clear(id)?;

    checkerboard(system, id, Rect::new(w / 8, h / 8, w * 3 / 4, h * 3 / 4))?;

    // Translucent band across the middle.
    system.set_draw_blend_mode(id, BlendMode::Blend)?;
    system.set_draw_color(id, Color::rgba(255, 180, 40, 128))?;
    system.fill_rect(id, Some(Rect::new(0, h / 2 - h / 16, w, h / 8)))?;

    sprites(system, id, w, h)?;

    system.set_draw_blend_mode(id, BlendMode::None)?;
    system.set_draw_color(id, Color::WHITE)?;
    system.draw_rect(id, Some(Rect::new(8, 8, w - 16, h - 16)))?;
    system.draw_line(id, 8, h - 9, w - 9, 8)?;

    system.set_draw_color(id, Color::rgb(120, 255, 160))?;
    let dots: Vec<Point> = (1..8).map(|i| Point::new(i * w / 8, h - 16)).collect();
    system.draw_points(id, &dots)
}

/// A streaming checkerboard texture stretched over `dst`.
fn checkerboard(system: &mut RenderSystem, id: RendererId, dst: Rect) -> Result<()> {
    let format = system
        .renderer_info(id)?
        .texture_formats
        .first()
        .copied()
        .unwrap_or(PixelFormat::Argb8888);
    let tex = system.create_texture(id, format, TextureAccess::Streaming, 8, 8)?;
    system.with_lock(tex, None, |px| {
        let light = px.format().map_rgba(Color::rgb(70, 80, 110));
        let dark = px.format().map_rgba(Color::rgb(40, 46, 66));
        for y in 0..px.height() {
            for x in 0..px.width() {
                px.put_raw(x, y, if (x + y) % 2 == 0 { light } else { dark });
            }
        }
    })?;
    system.render_copy(id, tex, None, Some(dst))?;
    system.destroy_texture(tex)
}

/// A color-keyed diamond uploaded from a surface, drawn at a few scales.
fn sprites(system: &mut RenderSystem, id: RendererId, w: i32, h: i32) -> Result<()> {
    let mut surface = Surface::new(16, 16, PixelFormat::Rgb565)?;
    {
        let format = surface.format();
        let mut px = surface.view_mut();
        for y in 0..16i32 {
            for x in 0..16i32 {
                let inside = (x - 8).abs() + (y - 8).abs() < 8;
                let c = if inside {
                    Color::rgb(80, 200, 255)
                } else {
                    SPRITE_KEY
                };
                px.put_raw(x, y, format.map_rgba(c));
            }
        }
    }
    surface.set_color_key(Some(SPRITE_KEY));

    let tex = system.create_texture_from_surface(id, None, &surface)?;
    let mut size = 16;
    let mut x = w / 8;
    while x + size < w && size <= h / 2 {
        system.render_copy(id, tex, None, Some(Rect::new(x, h / 2 - size / 2, size, size)))?;
        x += size + 8;
        size *= 2;
    }
    system.set_texture_alpha_mod(tex, 96)?;
    system.set_texture_color_mod(tex, 255, 120, 120)?;
    system.render_copy(id, tex, None, Some(Rect::new(w - w / 4, h / 8, 32, 32)))?;
    system.destroy_texture(tex)
}
