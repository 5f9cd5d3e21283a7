//! Texture records owned by a renderer.

use bitflags::bitflags;
use tessera_types::{BlendMode, PixelFormat, Rect};

use crate::arena::Key;

/// Handle to a texture, valid only with the renderer that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId {
    pub(crate) key: Key,
    pub(crate) owner: u32,
}

impl TextureId {
    /// Serial of the renderer that created this texture.
    pub fn owner(&self) -> u32 {
        self.owner
    }
}

/// How the texture's pixels get updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureAccess {
    /// Uploaded occasionally through `update_texture`.
    Static,
    /// Updated every frame through lock/unlock.
    Streaming,
}

bitflags! {
    /// Which modulations are active. A modulation is only active when it
    /// changes the source, i.e. some channel is below 255.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModulateFlags: u8 {
        const COLOR = 0x01;
        const ALPHA = 0x02;
    }
}

/// Renderer-side texture state. Backend storage lives in the driver, keyed
/// by [`TextureId`].
#[derive(Debug, Clone)]
pub struct Texture {
    format: PixelFormat,
    access: TextureAccess,
    width: i32,
    height: i32,
    color_mod: (u8, u8, u8),
    alpha_mod: u8,
    blend_mode: BlendMode,
    modulate: ModulateFlags,
    locked: Option<Rect>,
}

impl Texture {
    pub(crate) fn new(format: PixelFormat, access: TextureAccess, width: i32, height: i32) -> Self {
        Self {
            format,
            access,
            width,
            height,
            color_mod: (255, 255, 255),
            alpha_mod: 255,
            blend_mode: BlendMode::None,
            modulate: ModulateFlags::empty(),
            locked: None,
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn access(&self) -> TextureAccess {
        self.access
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::sized(self.width, self.height)
    }

    pub fn color_mod(&self) -> (u8, u8, u8) {
        self.color_mod
    }

    pub fn alpha_mod(&self) -> u8 {
        self.alpha_mod
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn modulate(&self) -> ModulateFlags {
        self.modulate
    }

    /// Region currently handed out by `lock_texture`.
    pub fn locked_rect(&self) -> Option<Rect> {
        self.locked
    }

    pub(crate) fn set_color_mod(&mut self, r: u8, g: u8, b: u8) {
        self.color_mod = (r, g, b);
        self.modulate
            .set(ModulateFlags::COLOR, r < 255 || g < 255 || b < 255);
    }

    pub(crate) fn set_alpha_mod(&mut self, alpha: u8) {
        self.alpha_mod = alpha;
        self.modulate.set(ModulateFlags::ALPHA, alpha < 255);
    }

    pub(crate) fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    pub(crate) fn set_locked(&mut self, rect: Option<Rect>) {
        self.locked = rect;
    }
}

/// Result of `query_texture`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureQuery {
    pub format: PixelFormat,
    pub access: TextureAccess,
    pub width: i32,
    pub height: i32,
}

impl From<&Texture> for TextureQuery {
    fn from(t: &Texture) -> Self {
        Self {
            format: t.format,
            access: t.access,
            width: t.width,
            height: t.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_texture_has_inert_modulation() {
        let t = Texture::new(PixelFormat::Argb8888, TextureAccess::Static, 4, 4);
        assert_eq!(t.color_mod(), (255, 255, 255));
        assert_eq!(t.alpha_mod(), 255);
        assert_eq!(t.blend_mode(), BlendMode::None);
        assert!(t.modulate().is_empty());
        assert_eq!(t.locked_rect(), None);
    }

    #[test]
    fn color_mod_flag_tracks_channels() {
        let mut t = Texture::new(PixelFormat::Argb8888, TextureAccess::Static, 1, 1);
        t.set_color_mod(255, 254, 255);
        assert!(t.modulate().contains(ModulateFlags::COLOR));
        t.set_color_mod(255, 255, 255);
        assert!(!t.modulate().contains(ModulateFlags::COLOR));
    }

    #[test]
    fn alpha_mod_flag_is_independent() {
        let mut t = Texture::new(PixelFormat::Argb8888, TextureAccess::Static, 1, 1);
        t.set_color_mod(0, 0, 0);
        t.set_alpha_mod(10);
        assert_eq!(t.modulate(), ModulateFlags::COLOR | ModulateFlags::ALPHA);
        t.set_alpha_mod(255);
        assert_eq!(t.modulate(), ModulateFlags::COLOR);
    }

    #[test]
    fn query_mirrors_record() {
        let t = Texture::new(PixelFormat::Rgb565, TextureAccess::Streaming, 3, 7);
        let q = TextureQuery::from(&t);
        assert_eq!(q.format, PixelFormat::Rgb565);
        assert_eq!(q.access, TextureAccess::Streaming);
        assert_eq!((q.width, q.height), (3, 7));
    }
}
