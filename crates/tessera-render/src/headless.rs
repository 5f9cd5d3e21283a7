//! A window with no display attached.
//!
//! Presented framebuffers are kept in memory so snapshots and tests can
//! inspect the last frame. There is no GL support, so hardware drivers fail
//! to initialize on it and automatic selection falls through to the CPU
//! drivers.

use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicU32, Ordering};

use tessera_types::window::Frame;
use tessera_types::{Color, PixelFormat, Result, Window, WindowEvent, WindowId};

use crate::surface::{PixelsRef, Surface};

static NEXT_WINDOW_ID: AtomicU32 = AtomicU32::new(1);

pub struct HeadlessWindow {
    id: WindowId,
    size: Cell<(u32, u32)>,
    format: PixelFormat,
    frame: RefCell<Option<Surface>>,
    presented: Cell<u64>,
}

impl HeadlessWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_format(width, height, PixelFormat::Rgb888)
    }

    pub fn with_format(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            id: WindowId(NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed)),
            size: Cell::new((width, height)),
            format,
            frame: RefCell::new(None),
            presented: Cell::new(0),
        }
    }

    /// Change the client size and return the matching resize event.
    pub fn resize(&self, width: u32, height: u32) -> WindowEvent {
        self.size.set((width, height));
        WindowEvent::resized(self.id, width, height)
    }

    /// Number of frames presented so far.
    pub fn presented_frames(&self) -> u64 {
        self.presented.get()
    }

    /// Pixel of the last presented frame.
    pub fn frame_pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.frame.borrow().as_ref()?.pixel(x, y)
    }

    /// Copy of the last presented frame.
    pub fn last_frame(&self) -> Option<Surface> {
        self.frame.borrow().clone()
    }
}

impl Window for HeadlessWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn size(&self) -> (u32, u32) {
        self.size.get()
    }

    fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    fn supports_framebuffer(&self) -> bool {
        true
    }

    fn present_framebuffer(&self, frame: Frame<'_>) -> Result<()> {
        let src = PixelsRef::new(
            frame.pixels,
            frame.pitch,
            frame.width as i32,
            frame.height as i32,
            frame.format,
        )?;
        let mut copy = Surface::new(frame.width as i32, frame.height as i32, frame.format)?;
        copy.view_mut().copy_from(&src)?;
        *self.frame.borrow_mut() = Some(copy);
        self.presented.set(self.presented.get() + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_get_distinct_ids() {
        let a = HeadlessWindow::new(1, 1);
        let b = HeadlessWindow::new(1, 1);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn resize_updates_size_and_builds_event() {
        let w = HeadlessWindow::new(10, 10);
        let e = w.resize(20, 30);
        assert_eq!(w.size(), (20, 30));
        assert_eq!(e, WindowEvent::resized(w.id(), 20, 30));
    }

    #[test]
    fn no_gl_context() {
        assert!(HeadlessWindow::new(4, 4).create_gl_context().is_err());
    }

    #[test]
    fn present_stores_frame() {
        let w = HeadlessWindow::with_format(2, 1, PixelFormat::Abgr8888);
        assert_eq!(w.frame_pixel(0, 0), None);
        let pixels = [255, 0, 0, 255, 0, 255, 0, 255];
        w.present_framebuffer(Frame {
            pixels: &pixels,
            pitch: 8,
            width: 2,
            height: 1,
            format: PixelFormat::Abgr8888,
        })
        .unwrap();
        assert_eq!(w.presented_frames(), 1);
        assert_eq!(w.frame_pixel(0, 0), Some(Color::rgb(255, 0, 0)));
        assert_eq!(w.frame_pixel(1, 0), Some(Color::rgb(0, 255, 0)));
    }
}
