//! CPU pixel storage and borrowed pixel views.
//!
//! A [`Surface`] is an owned image with a color key and modulation, used as
//! the source for texture-from-surface uploads and as texture storage by the
//! CPU drivers. [`PixelsRef`]/[`PixelsMut`] are views whose data slice
//! starts at the view's top-left pixel; this is also what a texture lock
//! hands out.

use tessera_types::pixel::convert_pixels;
use tessera_types::{BlendMode, Color, PixelFormat, Point, Rect, RenderError, Result};

/// Read-only pixel view.
#[derive(Debug, Clone, Copy)]
pub struct PixelsRef<'a> {
    data: &'a [u8],
    pitch: usize,
    width: i32,
    height: i32,
    format: PixelFormat,
}

/// Writable pixel view, e.g. a locked texture region.
#[derive(Debug)]
pub struct PixelsMut<'a> {
    data: &'a mut [u8],
    pitch: usize,
    width: i32,
    height: i32,
    format: PixelFormat,
}

fn check_view(data_len: usize, width: i32, height: i32, pitch: usize, format: PixelFormat) -> Result<()> {
    if width < 0 || height < 0 {
        return Err(RenderError::InvalidArgument(format!(
            "negative view size {width}x{height}"
        )));
    }
    if pitch < width as usize * format.bytes_per_pixel() {
        return Err(RenderError::InvalidArgument(format!(
            "pitch {pitch} shorter than a {width}-pixel {format} row"
        )));
    }
    if data_len < format.buffer_len(width as usize, height as usize, pitch) {
        return Err(RenderError::InvalidArgument(
            "pixel buffer too small".into(),
        ));
    }
    Ok(())
}

fn offset_of(pitch: usize, format: PixelFormat, x: i32, y: i32) -> usize {
    y as usize * pitch + x as usize * format.bytes_per_pixel()
}

impl<'a> PixelsRef<'a> {
    pub fn new(
        data: &'a [u8],
        pitch: usize,
        width: i32,
        height: i32,
        format: PixelFormat,
    ) -> Result<Self> {
        check_view(data.len(), width, height, pitch, format)?;
        Ok(Self {
            data,
            pitch,
            width,
            height,
            format,
        })
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn bounds(&self) -> Rect {
        Rect::sized(self.width, self.height)
    }

    /// Packed value at `(x, y)`; the caller keeps coordinates in bounds.
    pub fn raw(&self, x: i32, y: i32) -> u32 {
        self.format
            .read_raw(&self.data[offset_of(self.pitch, self.format, x, y)..])
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        if !self.bounds().contains_point(Point::new(x, y)) {
            return None;
        }
        Some(self.format.get_rgba(self.raw(x, y)))
    }

    /// Sub-view of `rect`, which must lie inside the view.
    pub fn sub(&self, rect: &Rect) -> Option<PixelsRef<'a>> {
        if !self.bounds().contains_rect(rect) {
            return None;
        }
        let start = offset_of(self.pitch, self.format, rect.x, rect.y);
        Some(PixelsRef {
            data: &self.data[start..],
            pitch: self.pitch,
            width: rect.w,
            height: rect.h,
            format: self.format,
        })
    }
}

impl<'a> PixelsMut<'a> {
    pub fn new(
        data: &'a mut [u8],
        pitch: usize,
        width: i32,
        height: i32,
        format: PixelFormat,
    ) -> Result<Self> {
        check_view(data.len(), width, height, pitch, format)?;
        Ok(Self {
            data,
            pitch,
            width,
            height,
            format,
        })
    }

    pub fn data(&self) -> &[u8] {
        &*self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut *self.data
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn bounds(&self) -> Rect {
        Rect::sized(self.width, self.height)
    }

    pub fn as_view(&self) -> PixelsRef<'_> {
        PixelsRef {
            data: &*self.data,
            pitch: self.pitch,
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }

    pub fn raw(&self, x: i32, y: i32) -> u32 {
        self.as_view().raw(x, y)
    }

    pub fn put_raw(&mut self, x: i32, y: i32, value: u32) {
        let start = offset_of(self.pitch, self.format, x, y);
        self.format.write_raw(&mut self.data[start..], value);
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.as_view().pixel(x, y)
    }

    /// Writable sub-view of `rect`, which must lie inside the view.
    pub fn sub_mut(&mut self, rect: &Rect) -> Option<PixelsMut<'_>> {
        if !self.bounds().contains_rect(rect) {
            return None;
        }
        let start = offset_of(self.pitch, self.format, rect.x, rect.y);
        Some(PixelsMut {
            data: &mut self.data[start..],
            pitch: self.pitch,
            width: rect.w,
            height: rect.h,
            format: self.format,
        })
    }

    /// Copy `src` into this view at its origin, converting formats.
    pub fn copy_from(&mut self, src: &PixelsRef<'_>) -> Result<()> {
        let w = src.width().min(self.width).max(0) as usize;
        let h = src.height().min(self.height).max(0) as usize;
        convert_pixels(
            w,
            h,
            src.format(),
            src.data(),
            src.pitch(),
            self.format,
            &mut *self.data,
            self.pitch,
        )
    }
}

/// Row pitch for a freshly allocated surface, rounded up to 4 bytes.
pub fn default_pitch(width: i32, format: PixelFormat) -> usize {
    (width.max(0) as usize * format.bytes_per_pixel() + 3) & !3
}

/// An owned CPU image.
#[derive(Debug, Clone)]
pub struct Surface {
    width: i32,
    height: i32,
    format: PixelFormat,
    pitch: usize,
    pixels: Vec<u8>,
    color_key: Option<u32>,
    blend_mode: BlendMode,
    color_mod: [u8; 3],
    alpha_mod: u8,
}

impl Surface {
    /// A zero-filled surface.
    pub fn new(width: i32, height: i32, format: PixelFormat) -> Result<Self> {
        if width < 0 || height < 0 {
            return Err(RenderError::InvalidArgument(format!(
                "negative surface size {width}x{height}"
            )));
        }
        let pitch = default_pitch(width, format);
        Ok(Self::from_parts(
            width,
            height,
            format,
            pitch,
            vec![0; pitch * height as usize],
        ))
    }

    /// Wrap existing pixel data.
    pub fn from_pixels(
        width: i32,
        height: i32,
        format: PixelFormat,
        pixels: Vec<u8>,
        pitch: usize,
    ) -> Result<Self> {
        check_view(pixels.len(), width, height, pitch, format)?;
        Ok(Self::from_parts(width, height, format, pitch, pixels))
    }

    fn from_parts(width: i32, height: i32, format: PixelFormat, pitch: usize, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            pitch,
            pixels,
            color_key: None,
            blend_mode: BlendMode::None,
            color_mod: [255; 3],
            alpha_mod: 255,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn bounds(&self) -> Rect {
        Rect::sized(self.width, self.height)
    }

    /// Pixels equal to `key` are treated as transparent.
    pub fn set_color_key(&mut self, key: Option<Color>) {
        self.color_key = key.map(|c| self.format.map_rgba(c));
    }

    pub fn color_key(&self) -> Option<u32> {
        self.color_key
    }

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn set_color_mod(&mut self, r: u8, g: u8, b: u8) {
        self.color_mod = [r, g, b];
    }

    pub fn color_mod(&self) -> (u8, u8, u8) {
        let [r, g, b] = self.color_mod;
        (r, g, b)
    }

    pub fn set_alpha_mod(&mut self, alpha: u8) {
        self.alpha_mod = alpha;
    }

    pub fn alpha_mod(&self) -> u8 {
        self.alpha_mod
    }

    pub fn view(&self) -> PixelsRef<'_> {
        PixelsRef {
            data: &self.pixels,
            pitch: self.pitch,
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }

    pub fn view_mut(&mut self) -> PixelsMut<'_> {
        PixelsMut {
            data: &mut self.pixels,
            pitch: self.pitch,
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }

    /// Writable view of `rect`; `None` unless `rect` lies inside the surface.
    pub fn view_rect_mut(&mut self, rect: &Rect) -> Option<PixelsMut<'_>> {
        if !self.bounds().contains_rect(rect) {
            return None;
        }
        let start = offset_of(self.pitch, self.format, rect.x, rect.y);
        Some(PixelsMut {
            data: &mut self.pixels[start..],
            pitch: self.pitch,
            width: rect.w,
            height: rect.h,
            format: self.format,
        })
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.view().pixel(x, y)
    }

    /// Copy into a new surface of `format`.
    ///
    /// Color-keyed pixels become fully transparent when `format` has alpha;
    /// otherwise the key is carried over, remapped.
    pub fn convert(&self, format: PixelFormat) -> Result<Surface> {
        let mut out = Surface::new(self.width, self.height, format)?;
        out.view_mut().copy_from(&self.view())?;
        if let Some(key) = self.color_key {
            if format.has_alpha() {
                let src = self.view();
                let mut dst = out.view_mut();
                let clear = format.map_rgba(Color::TRANSPARENT);
                for y in 0..self.height {
                    for x in 0..self.width {
                        if src.raw(x, y) == key {
                            dst.put_raw(x, y, clear);
                        }
                    }
                }
            } else {
                out.color_key = Some(format.map_rgba(self.format.get_rgba(key)));
            }
        }
        out.blend_mode = self.blend_mode;
        out.color_mod = self.color_mod;
        out.alpha_mod = self.alpha_mod;
        Ok(out)
    }
}
