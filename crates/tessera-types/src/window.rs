//! Window collaborator trait and window events.
//!
//! Renderers never talk to a windowing system directly. They hold a shared
//! `Rc<dyn Window>` and ask it for its size, its pixel format, a GL context,
//! or to present a CPU framebuffer.

use crate::error::{RenderError, Result};
use crate::gl::GlContext;
use crate::pixel::PixelFormat;

/// Identifier of a platform window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u32);

/// A borrowed CPU frame handed to [`Window::present_framebuffer`].
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub pixels: &'a [u8],
    pub pitch: usize,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// A render target window, owned by the platform layer.
pub trait Window {
    fn id(&self) -> WindowId;

    /// Current client size in pixels.
    fn size(&self) -> (u32, u32);

    /// Native display format of the window.
    fn pixel_format(&self) -> PixelFormat;

    /// Create an OpenGL ES context bound to this window.
    fn create_gl_context(&self) -> Result<Box<dyn GlContext>> {
        Err(RenderError::Backend(
            "window has no OpenGL ES support".into(),
        ))
    }

    /// Whether [`present_framebuffer`](Self::present_framebuffer) is usable.
    fn supports_framebuffer(&self) -> bool {
        false
    }

    /// Display a CPU frame in the window.
    fn present_framebuffer(&self, _frame: Frame<'_>) -> Result<()> {
        Err(RenderError::Unsupported("window framebuffer"))
    }
}

/// What happened to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEventKind {
    Shown,
    Hidden,
    Exposed,
    Moved { x: i32, y: i32 },
    Resized { width: u32, height: u32 },
    Minimized,
    Maximized,
    Restored,
    FocusGained,
    FocusLost,
    Close,
}

/// A window event as delivered by the platform event pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEvent {
    pub window: WindowId,
    pub kind: WindowEventKind,
}

impl WindowEvent {
    pub fn new(window: WindowId, kind: WindowEventKind) -> Self {
        Self { window, kind }
    }

    pub fn resized(window: WindowId, width: u32, height: u32) -> Self {
        Self::new(window, WindowEventKind::Resized { width, height })
    }

    pub fn is_resize(&self) -> bool {
        matches!(self.kind, WindowEventKind::Resized { .. })
    }
}
