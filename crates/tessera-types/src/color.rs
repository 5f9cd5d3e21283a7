//! RGBA colors and blend modes.

/// A color in RGBA format (0-255 per channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Return the same color with a different alpha value.
    pub const fn with_alpha(self, a: u8) -> Self {
        Self {
            r: self.r,
            g: self.g,
            b: self.b,
            a,
        }
    }

    /// Normalized `[r, g, b, a]` in `0.0..=1.0`, as fixed-function GL wants it.
    pub fn to_unit(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }

    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
}

/// How source pixels combine with the destination.
///
/// * `None`: `dst = src`
/// * `Blend`: `dst = src * srcA + dst * (1 - srcA)`
/// * `Add`: `dst = src * srcA + dst`
/// * `Mod`: `dst = src * dst`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    None,
    Blend,
    Add,
    Mod,
}

impl BlendMode {
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Blend => "blend",
            Self::Add => "add",
            Self::Mod => "mod",
        }
    }

    /// Whether this mode reads the destination.
    pub fn reads_destination(self) -> bool {
        self != Self::None
    }
}
