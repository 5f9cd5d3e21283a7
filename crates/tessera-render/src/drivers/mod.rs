//! Built-in render drivers.
//!
//! - [`gles`]: fixed-function OpenGL ES through the window's GL context.
//! - [`framebuffer`]: CPU rendering presented through the window's
//!   framebuffer.
//! - [`software`]: CPU rasterizer that presents through another driver.

mod cpu;
pub mod framebuffer;
pub mod gles;
pub mod software;

pub use cpu::CPU_FORMATS;
