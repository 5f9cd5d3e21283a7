//! Texture format selection for surface uploads.
//!
//! A source that already carries alpha, or that needs no transparency at
//! all, keeps its native layout when the renderer supports it and otherwise
//! falls back through [`GENERAL_PREFERENCE`]. A source whose transparency
//! comes from a color key or from blending without an alpha channel must land
//! in a format with alpha, so it walks [`ALPHA_PREFERENCE`] instead.

use tessera_types::{BlendMode, PixelFormat, RenderError, Result};

use crate::surface::Surface;

/// Fallback order for sources that keep their layout.
pub const GENERAL_PREFERENCE: [PixelFormat; 23] = [
    PixelFormat::Argb8888,
    PixelFormat::Rgba8888,
    PixelFormat::Abgr8888,
    PixelFormat::Bgra8888,
    PixelFormat::Rgb888,
    PixelFormat::Bgr888,
    PixelFormat::Rgb24,
    PixelFormat::Bgr24,
    PixelFormat::Rgb565,
    PixelFormat::Bgr565,
    PixelFormat::Argb1555,
    PixelFormat::Rgba5551,
    PixelFormat::Abgr1555,
    PixelFormat::Bgra5551,
    PixelFormat::Rgb555,
    PixelFormat::Bgr555,
    PixelFormat::Argb4444,
    PixelFormat::Rgba4444,
    PixelFormat::Abgr4444,
    PixelFormat::Bgra4444,
    PixelFormat::Rgb444,
    PixelFormat::Argb2101010,
    PixelFormat::Rgb332,
];

/// Fallback order for sources that need an alpha channel.
pub const ALPHA_PREFERENCE: [PixelFormat; 13] = [
    PixelFormat::Argb8888,
    PixelFormat::Rgba8888,
    PixelFormat::Abgr8888,
    PixelFormat::Bgra8888,
    PixelFormat::Argb1555,
    PixelFormat::Rgba5551,
    PixelFormat::Abgr1555,
    PixelFormat::Bgra5551,
    PixelFormat::Argb4444,
    PixelFormat::Rgba4444,
    PixelFormat::Abgr4444,
    PixelFormat::Bgra4444,
    PixelFormat::Argb2101010,
];

/// What the negotiator needs to know about a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTraits {
    pub format: PixelFormat,
    pub has_color_key: bool,
    pub blend_mode: BlendMode,
}

impl SourceTraits {
    pub fn of(surface: &Surface) -> Self {
        Self {
            format: surface.format(),
            has_color_key: surface.color_key().is_some(),
            blend_mode: surface.blend_mode(),
        }
    }

    /// Whether the source can keep its own layout.
    pub fn keeps_layout(&self) -> bool {
        self.format.has_alpha() || (!self.has_color_key && self.blend_mode != BlendMode::Blend)
    }
}

/// Pick the texture format for uploading `source` to a renderer that
/// supports `supported`. An explicit `requested` format always wins.
pub fn choose_texture_format(
    requested: Option<PixelFormat>,
    source: &SourceTraits,
    supported: &[PixelFormat],
) -> Result<PixelFormat> {
    if let Some(format) = requested {
        return Ok(format);
    }
    let (candidate, fallback): (PixelFormat, &[PixelFormat]) = if source.keeps_layout() {
        (source.format, &GENERAL_PREFERENCE)
    } else {
        (PixelFormat::Argb8888, &ALPHA_PREFERENCE)
    };
    if supported.contains(&candidate) {
        return Ok(candidate);
    }
    fallback
        .iter()
        .copied()
        .find(|f| supported.contains(f))
        .ok_or_else(|| {
            RenderError::UnsupportedPixelFormat(format!(
                "no supported texture format for a {} source",
                source.format
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(format: PixelFormat) -> SourceTraits {
        SourceTraits {
            format,
            has_color_key: false,
            blend_mode: BlendMode::None,
        }
    }

    #[test]
    fn requested_format_wins() {
        let f = choose_texture_format(Some(PixelFormat::Rgb332), &plain(PixelFormat::Argb8888), &[])
            .unwrap();
        assert_eq!(f, PixelFormat::Rgb332);
    }

    #[test]
    fn native_format_kept_when_supported() {
        let f = choose_texture_format(
            None,
            &plain(PixelFormat::Rgb565),
            &[PixelFormat::Argb8888, PixelFormat::Rgb565],
        )
        .unwrap();
        assert_eq!(f, PixelFormat::Rgb565);
    }

    #[test]
    fn opaque_source_walks_general_list() {
        let f = choose_texture_format(
            None,
            &plain(PixelFormat::Rgb24),
            &[PixelFormat::Rgb565, PixelFormat::Bgr888],
        )
        .unwrap();
        assert_eq!(f, PixelFormat::Bgr888);
    }

    #[test]
    fn alpha_source_on_gles_lands_on_abgr() {
        let f = choose_texture_format(None, &plain(PixelFormat::Rgba8888), &[PixelFormat::Abgr8888])
            .unwrap();
        assert_eq!(f, PixelFormat::Abgr8888);
    }

    #[test]
    fn color_key_requires_alpha() {
        let src = SourceTraits {
            format: PixelFormat::Rgb565,
            has_color_key: true,
            blend_mode: BlendMode::None,
        };
        assert!(!src.keeps_layout());
        let f = choose_texture_format(
            None,
            &src,
            &[PixelFormat::Rgb565, PixelFormat::Bgra4444],
        )
        .unwrap();
        assert_eq!(f, PixelFormat::Bgra4444);
    }

    #[test]
    fn blending_without_alpha_prefers_argb() {
        let src = SourceTraits {
            format: PixelFormat::Rgb888,
            has_color_key: false,
            blend_mode: BlendMode::Blend,
        };
        let f = choose_texture_format(
            None,
            &src,
            &[PixelFormat::Rgb888, PixelFormat::Argb8888],
        )
        .unwrap();
        assert_eq!(f, PixelFormat::Argb8888);
    }

    #[test]
    fn alpha_path_without_alpha_formats_fails() {
        let src = SourceTraits {
            format: PixelFormat::Rgb888,
            has_color_key: true,
            blend_mode: BlendMode::None,
        };
        let err = choose_texture_format(None, &src, &[PixelFormat::Rgb888]).unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedPixelFormat(_)));
    }

    #[test]
    fn empty_support_list_fails() {
        let err = choose_texture_format(None, &plain(PixelFormat::Argb8888), &[]).unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedPixelFormat(_)));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn format() -> impl Strategy<Value = PixelFormat> {
            (0usize..PixelFormat::ALL.len()).prop_map(|i| PixelFormat::ALL[i])
        }

        fn blend() -> impl Strategy<Value = BlendMode> {
            prop_oneof![
                Just(BlendMode::None),
                Just(BlendMode::Blend),
                Just(BlendMode::Add),
                Just(BlendMode::Mod),
            ]
        }

        proptest! {
            #[test]
            fn negotiation_is_deterministic_and_supported(
                src in format(),
                key in any::<bool>(),
                mode in blend(),
                supported in proptest::collection::vec(format(), 0..8),
            ) {
                let traits = SourceTraits { format: src, has_color_key: key, blend_mode: mode };
                let a = choose_texture_format(None, &traits, &supported);
                let b = choose_texture_format(None, &traits, &supported);
                match (&a, &b) {
                    (Ok(x), Ok(y)) => {
                        prop_assert_eq!(x, y);
                        prop_assert!(supported.contains(x));
                        if !traits.keeps_layout() {
                            prop_assert!(x.has_alpha());
                        }
                    }
                    (Err(_), Err(_)) => {}
                    _ => prop_assert!(false, "non-deterministic result"),
                }
            }
        }
    }
}
