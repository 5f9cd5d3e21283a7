//! Software rasterization into a [`PixelsMut`] view.
//!
//! Callers may pass coordinates that fall partly or entirely outside the
//! view. Line segments are clipped to it before rasterizing; everything else
//! clips per pixel.

use tessera_types::{BlendMode, Color, Point, Rect};

use crate::surface::{PixelsMut, PixelsRef};

/// `a * b / 255`, rounded.
fn mul(a: u8, b: u8) -> u8 {
    ((a as u32 * b as u32 + 127) / 255) as u8
}

/// Composite `src` over `dst` with `mode`.
pub fn blend_color(src: Color, dst: Color, mode: BlendMode) -> Color {
    match mode {
        BlendMode::None => src,
        BlendMode::Blend => {
            let inv = 255 - src.a;
            Color::rgba(
                mul(src.r, src.a) + mul(dst.r, inv),
                mul(src.g, src.a) + mul(dst.g, inv),
                mul(src.b, src.a) + mul(dst.b, inv),
                src.a + mul(dst.a, inv),
            )
        }
        BlendMode::Add => Color::rgba(
            dst.r.saturating_add(mul(src.r, src.a)),
            dst.g.saturating_add(mul(src.g, src.a)),
            dst.b.saturating_add(mul(src.b, src.a)),
            dst.a,
        ),
        BlendMode::Mod => Color::rgba(
            mul(src.r, dst.r),
            mul(src.g, dst.g),
            mul(src.b, dst.b),
            dst.a,
        ),
    }
}

/// Write one pixel, ignoring coordinates outside the view.
pub fn plot(dst: &mut PixelsMut<'_>, x: i32, y: i32, color: Color, mode: BlendMode) {
    if x < 0 || y < 0 || x >= dst.width() || y >= dst.height() {
        return;
    }
    let format = dst.format();
    let out = if mode.reads_destination() {
        blend_color(color, format.get_rgba(dst.raw(x, y)), mode)
    } else {
        color
    };
    dst.put_raw(x, y, format.map_rgba(out));
}

/// Plot `points`, given in a space where the view's top-left pixel sits at
/// `origin`.
pub fn draw_points(
    dst: &mut PixelsMut<'_>,
    points: &[Point],
    origin: Point,
    color: Color,
    mode: BlendMode,
) {
    for p in points {
        if let (Some(x), Some(y)) = (p.x.checked_sub(origin.x), p.y.checked_sub(origin.y)) {
            plot(dst, x, y, color, mode);
        }
    }
}

const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const TOP: u8 = 4;
const BOTTOM: u8 = 8;

/// The part of segment `a`-`b` inside `bounds` (Cohen-Sutherland), or
/// `None` when the segment misses it. Coordinates of any size are accepted.
pub fn clip_line(a: Point, b: Point, bounds: &Rect) -> Option<(Point, Point)> {
    if bounds.is_empty() {
        return None;
    }
    let (xmin, ymin) = (bounds.x as i64, bounds.y as i64);
    let xmax = xmin + bounds.w as i64 - 1;
    let ymax = ymin + bounds.h as i64 - 1;
    let outcode = |x: i64, y: i64| {
        let mut code = 0;
        if x < xmin {
            code |= LEFT;
        } else if x > xmax {
            code |= RIGHT;
        }
        if y < ymin {
            code |= TOP;
        } else if y > ymax {
            code |= BOTTOM;
        }
        code
    };
    // Position along one axis where the line reaches `at` on the other.
    let cross = |p0: i64, q0: i64, p1: i64, q1: i64, at: i64| {
        let t = (p1 - p0) as i128 * (at - q0) as i128 / (q1 - q0) as i128;
        p0 + t as i64
    };

    let (mut x0, mut y0) = (a.x as i64, a.y as i64);
    let (mut x1, mut y1) = (b.x as i64, b.y as i64);
    let (mut c0, mut c1) = (outcode(x0, y0), outcode(x1, y1));
    loop {
        if c0 | c1 == 0 {
            return Some((
                Point::new(x0 as i32, y0 as i32),
                Point::new(x1 as i32, y1 as i32),
            ));
        }
        if c0 & c1 != 0 {
            return None;
        }
        let out = if c0 != 0 { c0 } else { c1 };
        let (x, y) = if out & TOP != 0 {
            (cross(x0, y0, x1, y1, ymin), ymin)
        } else if out & BOTTOM != 0 {
            (cross(x0, y0, x1, y1, ymax), ymax)
        } else if out & LEFT != 0 {
            (xmin, cross(y0, x0, y1, x1, xmin))
        } else {
            (xmax, cross(y0, x0, y1, x1, xmax))
        };
        if out == c0 {
            (x0, y0) = (x, y);
            c0 = outcode(x0, y0);
        } else {
            (x1, y1) = (x, y);
            c1 = outcode(x1, y1);
        }
    }
}

/// Bresenham line from `a` to `b`, optionally leaving out `b`. Points are
/// in the space described for [`draw_points`].
pub fn draw_line(
    dst: &mut PixelsMut<'_>,
    a: Point,
    b: Point,
    origin: Point,
    color: Color,
    mode: BlendMode,
    draw_end: bool,
) {
    let view = Rect::new(origin.x, origin.y, dst.width(), dst.height());
    let Some((ca, cb)) = clip_line(a, b, &view) else {
        return;
    };
    // A clipped end is not the real end, so it is always drawn.
    let draw_end = draw_end || cb != b;
    let a = Point::new(ca.x - origin.x, ca.y - origin.y);
    let b = Point::new(cb.x - origin.x, cb.y - origin.y);

    let dx = (b.x - a.x).abs();
    let dy = -(b.y - a.y).abs();
    let sx = if a.x < b.x { 1 } else { -1 };
    let sy = if a.y < b.y { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (a.x, a.y);
    loop {
        let at_end = x == b.x && y == b.y;
        if !at_end || draw_end {
            plot(dst, x, y, color, mode);
        }
        if at_end {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Connected line segments. Shared vertices are drawn once, so blended
/// polylines do not darken at the joints; a closed polyline does not redraw
/// its starting point.
pub fn draw_polyline(
    dst: &mut PixelsMut<'_>,
    points: &[Point],
    origin: Point,
    color: Color,
    mode: BlendMode,
) {
    if points.len() < 2 {
        return;
    }
    let closed = points.first() == points.last();
    let last = points.len() - 2;
    for (i, seg) in points.windows(2).enumerate() {
        let draw_end = i == last && !closed;
        draw_line(dst, seg[0], seg[1], origin, color, mode, draw_end);
    }
}

pub fn fill_rect(dst: &mut PixelsMut<'_>, rect: &Rect, color: Color, mode: BlendMode) {
    let Some(r) = rect.intersect(&dst.bounds()) else {
        return;
    };
    if !mode.reads_destination() {
        let value = dst.format().map_rgba(color);
        for y in r.y..r.bottom() {
            for x in r.x..r.right() {
                dst.put_raw(x, y, value);
            }
        }
        return;
    }
    for y in r.y..r.bottom() {
        for x in r.x..r.right() {
            plot(dst, x, y, color, mode);
        }
    }
}

/// Per-blit source attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitParams {
    pub color_mod: (u8, u8, u8),
    pub alpha_mod: u8,
    pub blend_mode: BlendMode,
    /// Raw source value that is skipped entirely.
    pub color_key: Option<u32>,
}

impl Default for BlitParams {
    fn default() -> Self {
        Self {
            color_mod: (255, 255, 255),
            alpha_mod: 255,
            blend_mode: BlendMode::None,
            color_key: None,
        }
    }
}

/// Nearest-neighbour scaled copy of `src_rect` onto `dst_rect`.
pub fn blit_scaled(
    src: &PixelsRef<'_>,
    src_rect: &Rect,
    dst: &mut PixelsMut<'_>,
    dst_rect: &Rect,
    params: &BlitParams,
) {
    let Some(src_rect) = src_rect.intersect(&src.bounds()) else {
        return;
    };
    if dst_rect.is_empty() {
        return;
    }
    let Some(visible) = dst_rect.intersect(&dst.bounds()) else {
        return;
    };
    let (cr, cg, cb) = params.color_mod;
    let modulated = params.color_mod != (255, 255, 255) || params.alpha_mod != 255;
    let src_format = src.format();

    for y in visible.y..visible.bottom() {
        let sy = src_rect.y + ((y - dst_rect.y) as i64 * src_rect.h as i64 / dst_rect.h as i64) as i32;
        for x in visible.x..visible.right() {
            let sx =
                src_rect.x + ((x - dst_rect.x) as i64 * src_rect.w as i64 / dst_rect.w as i64) as i32;
            let raw = src.raw(sx, sy);
            if params.color_key == Some(raw) {
                continue;
            }
            let mut c = src_format.get_rgba(raw);
            if modulated {
                c = Color::rgba(
                    mul(c.r, cr),
                    mul(c.g, cg),
                    mul(c.b, cb),
                    mul(c.a, params.alpha_mod),
                );
            }
            plot(dst, x, y, c, params.blend_mode);
        }
    }
}
