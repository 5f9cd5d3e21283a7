//! Foundation types and traits for Tessera.
//!
//! This crate contains the platform-agnostic types shared by the renderer
//! core and every driver: colors and blend modes, rectangles, packed pixel
//! formats and conversion, the window and GL context collaborator traits,
//! configuration, and error types.

pub mod color;
pub mod config;
pub mod error;
pub mod geometry;
pub mod gl;
pub mod pixel;
pub mod window;

pub use color::{BlendMode, Color};
pub use config::RenderConfig;
pub use error::{RenderError, Result};
pub use geometry::{Point, Rect};
pub use pixel::PixelFormat;
pub use window::{Window, WindowEvent, WindowEventKind, WindowId};
