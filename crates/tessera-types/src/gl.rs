//! Fixed-function OpenGL ES 1.x context collaborator.
//!
//! The GLES driver issues every GL call through this trait so it can run on
//! top of any binding (or a recording fake in tests). Calls that take the
//! bound texture operate on whatever `bind_texture` selected last.

use crate::error::Result;

/// Texture object name.
pub type GlTexture = u32;

/// `glGetError` results the driver reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlError {
    NoError,
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
    OutOfMemory,
}

impl GlError {
    pub fn name(self) -> &'static str {
        match self {
            Self::NoError => "GL_NO_ERROR",
            Self::InvalidEnum => "GL_INVALID_ENUM",
            Self::InvalidValue => "GL_INVALID_VALUE",
            Self::InvalidOperation => "GL_INVALID_OPERATION",
            Self::OutOfMemory => "GL_OUT_OF_MEMORY",
        }
    }
}

/// Primitive topology for `draw_arrays`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlPrimitive {
    Points,
    LineStrip,
    LineLoop,
    TriangleStrip,
}

/// `glBlendFunc` factors used by the renderer blend modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlBlendFactor {
    Zero,
    One,
    SrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
}

/// Texture environment plus blend function.
///
/// `blend: None` means `GL_BLEND` is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlBlendState {
    pub tex_env_modulate: bool,
    pub blend: Option<(GlBlendFactor, GlBlendFactor)>,
}

pub trait GlContext {
    /// Make this context current on the calling thread.
    fn make_current(&mut self) -> Result<()>;

    fn set_swap_interval(&mut self, interval: i32) -> Result<()>;

    fn swap_interval(&self) -> i32;

    /// Present the back buffer.
    fn swap_window(&mut self) -> Result<()>;

    fn extension_supported(&self, name: &str) -> bool;

    /// `GL_MAX_TEXTURE_SIZE`.
    fn max_texture_size(&self) -> u32;

    fn get_error(&mut self) -> GlError;

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);

    /// Reset the modelview matrix and load an orthographic projection.
    fn load_ortho(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32);

    fn set_blend_state(&mut self, state: GlBlendState);

    fn color4f(&mut self, r: f32, g: f32, b: f32, a: f32);

    fn gen_texture(&mut self) -> Result<GlTexture>;

    fn delete_texture(&mut self, texture: GlTexture);

    /// Bind `texture` and enable texturing, or disable texturing on `None`.
    fn bind_texture(&mut self, texture: Option<GlTexture>);

    /// Allocate RGBA storage for the bound texture without uploading data.
    fn tex_image_2d(&mut self, width: u32, height: u32);

    /// Upload tightly packed RGBA rows into a region of the bound texture.
    fn tex_sub_image_2d(&mut self, x: i32, y: i32, width: i32, height: i32, pixels: &[u8]);

    fn draw_arrays(&mut self, mode: GlPrimitive, vertices: &[i16], tex_coords: Option<&[f32]>);

    /// `glTexParameteriv(GL_TEXTURE_CROP_RECT_OES)` followed by `glDrawTexiOES`.
    fn draw_tex_oes(&mut self, crop: [i32; 4], x: i32, y: i32, width: i32, height: i32);
}
