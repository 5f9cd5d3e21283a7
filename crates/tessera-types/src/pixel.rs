//! Packed pixel formats and conversion between them.
//!
//! Every format is stored as a little-endian packed integer of
//! [`PixelFormat::bytes_per_pixel`] bytes; the channel masks below apply to
//! that integer. `Rgb24` therefore lays out bytes as R, G, B and `Abgr8888`
//! as R, G, B, A.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::color::Color;
use crate::error::{RenderError, Result};

/// Channel layout of a packed pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelMasks {
    pub bits_per_pixel: u8,
    pub r: u32,
    pub g: u32,
    pub b: u32,
    pub a: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PixelFormat {
    Rgb332,
    Rgb444,
    Rgb555,
    Bgr555,
    Argb4444,
    Rgba4444,
    Abgr4444,
    Bgra4444,
    Argb1555,
    Rgba5551,
    Abgr1555,
    Bgra5551,
    Rgb565,
    Bgr565,
    Rgb24,
    Bgr24,
    Rgb888,
    Bgr888,
    Argb8888,
    Rgba8888,
    Abgr8888,
    Bgra8888,
    Argb2101010,
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 23] = [
        Self::Rgb332,
        Self::Rgb444,
        Self::Rgb555,
        Self::Bgr555,
        Self::Argb4444,
        Self::Rgba4444,
        Self::Abgr4444,
        Self::Bgra4444,
        Self::Argb1555,
        Self::Rgba5551,
        Self::Abgr1555,
        Self::Bgra5551,
        Self::Rgb565,
        Self::Bgr565,
        Self::Rgb24,
        Self::Bgr24,
        Self::Rgb888,
        Self::Bgr888,
        Self::Argb8888,
        Self::Rgba8888,
        Self::Abgr8888,
        Self::Bgra8888,
        Self::Argb2101010,
    ];

    pub const fn masks(self) -> PixelMasks {
        const fn m(bits_per_pixel: u8, r: u32, g: u32, b: u32, a: u32) -> PixelMasks {
            PixelMasks {
                bits_per_pixel,
                r,
                g,
                b,
                a,
            }
        }
        match self {
            Self::Rgb332 => m(8, 0xE0, 0x1C, 0x03, 0),
            Self::Rgb444 => m(12, 0x0F00, 0x00F0, 0x000F, 0),
            Self::Rgb555 => m(15, 0x7C00, 0x03E0, 0x001F, 0),
            Self::Bgr555 => m(15, 0x001F, 0x03E0, 0x7C00, 0),
            Self::Argb4444 => m(16, 0x0F00, 0x00F0, 0x000F, 0xF000),
            Self::Rgba4444 => m(16, 0xF000, 0x0F00, 0x00F0, 0x000F),
            Self::Abgr4444 => m(16, 0x000F, 0x00F0, 0x0F00, 0xF000),
            Self::Bgra4444 => m(16, 0x00F0, 0x0F00, 0xF000, 0x000F),
            Self::Argb1555 => m(16, 0x7C00, 0x03E0, 0x001F, 0x8000),
            Self::Rgba5551 => m(16, 0xF800, 0x07C0, 0x003E, 0x0001),
            Self::Abgr1555 => m(16, 0x001F, 0x03E0, 0x7C00, 0x8000),
            Self::Bgra5551 => m(16, 0x003E, 0x07C0, 0xF800, 0x0001),
            Self::Rgb565 => m(16, 0xF800, 0x07E0, 0x001F, 0),
            Self::Bgr565 => m(16, 0x001F, 0x07E0, 0xF800, 0),
            Self::Rgb24 => m(24, 0x0000FF, 0x00FF00, 0xFF0000, 0),
            Self::Bgr24 => m(24, 0xFF0000, 0x00FF00, 0x0000FF, 0),
            Self::Rgb888 => m(24, 0xFF0000, 0x00FF00, 0x0000FF, 0),
            Self::Bgr888 => m(24, 0x0000FF, 0x00FF00, 0xFF0000, 0),
            Self::Argb8888 => m(32, 0x00FF0000, 0x0000FF00, 0x000000FF, 0xFF000000),
            Self::Rgba8888 => m(32, 0xFF000000, 0x00FF0000, 0x0000FF00, 0x000000FF),
            Self::Abgr8888 => m(32, 0x000000FF, 0x0000FF00, 0x00FF0000, 0xFF000000),
            Self::Bgra8888 => m(32, 0x0000FF00, 0x00FF0000, 0xFF000000, 0x000000FF),
            Self::Argb2101010 => m(32, 0x3FF00000, 0x000FFC00, 0x000003FF, 0xC0000000),
        }
    }

    /// Storage size of one pixel.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb332 => 1,
            Self::Rgb24 | Self::Bgr24 => 3,
            Self::Rgb888
            | Self::Bgr888
            | Self::Argb8888
            | Self::Rgba8888
            | Self::Abgr8888
            | Self::Bgra8888
            | Self::Argb2101010 => 4,
            _ => 2,
        }
    }

    pub const fn has_alpha(self) -> bool {
        self.masks().a != 0
    }

    /// The format whose layout matches `masks` exactly, if any.
    ///
    /// Formats sharing masks but not storage size (`Rgb24`/`Bgr888`) are
    /// told apart by `bytes_per_pixel`.
    pub fn from_masks(masks: PixelMasks, bytes_per_pixel: usize) -> Option<PixelFormat> {
        Self::ALL
            .into_iter()
            .find(|f| f.masks() == masks && f.bytes_per_pixel() == bytes_per_pixel)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Rgb332 => "RGB332",
            Self::Rgb444 => "RGB444",
            Self::Rgb555 => "RGB555",
            Self::Bgr555 => "BGR555",
            Self::Argb4444 => "ARGB4444",
            Self::Rgba4444 => "RGBA4444",
            Self::Abgr4444 => "ABGR4444",
            Self::Bgra4444 => "BGRA4444",
            Self::Argb1555 => "ARGB1555",
            Self::Rgba5551 => "RGBA5551",
            Self::Abgr1555 => "ABGR1555",
            Self::Bgra5551 => "BGRA5551",
            Self::Rgb565 => "RGB565",
            Self::Bgr565 => "BGR565",
            Self::Rgb24 => "RGB24",
            Self::Bgr24 => "BGR24",
            Self::Rgb888 => "RGB888",
            Self::Bgr888 => "BGR888",
            Self::Argb8888 => "ARGB8888",
            Self::Rgba8888 => "RGBA8888",
            Self::Abgr8888 => "ABGR8888",
            Self::Bgra8888 => "BGRA8888",
            Self::Argb2101010 => "ARGB2101010",
        }
    }

    /// Pack a color into this format.
    pub fn map_rgba(self, color: Color) -> u32 {
        let m = self.masks();
        pack_channel(color.r, m.r)
            | pack_channel(color.g, m.g)
            | pack_channel(color.b, m.b)
            | pack_channel(color.a, m.a)
    }

    /// Unpack a pixel value. Formats without alpha read as opaque.
    pub fn get_rgba(self, pixel: u32) -> Color {
        let m = self.masks();
        let a = if m.a == 0 {
            255
        } else {
            unpack_channel(pixel, m.a)
        };
        Color::rgba(
            unpack_channel(pixel, m.r),
            unpack_channel(pixel, m.g),
            unpack_channel(pixel, m.b),
            a,
        )
    }

    /// Read one packed pixel from the start of `bytes`.
    pub fn read_raw(self, bytes: &[u8]) -> u32 {
        let mut value = 0u32;
        for (i, b) in bytes.iter().take(self.bytes_per_pixel()).enumerate() {
            value |= (*b as u32) << (8 * i);
        }
        value
    }

    /// Write one packed pixel to the start of `bytes`.
    pub fn write_raw(self, bytes: &mut [u8], value: u32) {
        for (i, b) in bytes.iter_mut().take(self.bytes_per_pixel()).enumerate() {
            *b = (value >> (8 * i)) as u8;
        }
    }

    /// Bytes a `width` x `height` image with `pitch` needs: every row but the
    /// last is a full pitch.
    pub fn buffer_len(self, width: usize, height: usize, pitch: usize) -> usize {
        if width == 0 || height == 0 {
            return 0;
        }
        (height - 1) * pitch + width * self.bytes_per_pixel()
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RenderError::UnsupportedPixelFormat(s.to_string()))
    }
}

fn pack_channel(value: u8, mask: u32) -> u32 {
    if mask == 0 {
        return 0;
    }
    let shift = mask.trailing_zeros();
    let max = mask >> shift;
    (((value as u32) * max + 127) / 255) << shift
}

fn unpack_channel(pixel: u32, mask: u32) -> u8 {
    if mask == 0 {
        return 0;
    }
    let shift = mask.trailing_zeros();
    let max = mask >> shift;
    let v = (pixel & mask) >> shift;
    ((v * 255 + max / 2) / max) as u8
}

/// Convert a `width` x `height` block between two formats.
///
/// Both buffers start at the block's top-left pixel; pitches are in bytes.
#[allow(clippy::too_many_arguments)]
pub fn convert_pixels(
    width: usize,
    height: usize,
    src_format: PixelFormat,
    src: &[u8],
    src_pitch: usize,
    dst_format: PixelFormat,
    dst: &mut [u8],
    dst_pitch: usize,
) -> Result<()> {
    if src.len() < src_format.buffer_len(width, height, src_pitch) {
        return Err(RenderError::InvalidArgument(
            "source buffer too small".into(),
        ));
    }
    if dst.len() < dst_format.buffer_len(width, height, dst_pitch) {
        return Err(RenderError::InvalidArgument(
            "destination buffer too small".into(),
        ));
    }
    let sbpp = src_format.bytes_per_pixel();
    let dbpp = dst_format.bytes_per_pixel();
    for y in 0..height {
        let src_row = &src[y * src_pitch..];
        let dst_row = &mut dst[y * dst_pitch..];
        if src_format == dst_format {
            dst_row[..width * dbpp].copy_from_slice(&src_row[..width * sbpp]);
            continue;
        }
        for x in 0..width {
            let color = src_format.get_rgba(src_format.read_raw(&src_row[x * sbpp..]));
            dst_format.write_raw(&mut dst_row[x * dbpp..], dst_format.map_rgba(color));
        }
    }
    Ok(())
}
