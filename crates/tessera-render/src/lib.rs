//! Tessera renderer core.
//!
//! Applications create renderers through a [`RenderSystem`] (or directly
//! through a [`DriverRegistry`]) and talk to a single API for textures, draw
//! primitives, blending, clipping and pixel readback. Each renderer routes
//! its calls, after handle validation and clipping, to a backend
//! [`RenderDriver`]: OpenGL ES, a framebuffer CPU driver, or the software
//! rasterizer that presents through one of the others.

pub mod arena;
pub mod driver;
pub mod drivers;
pub mod events;
pub mod headless;
pub mod negotiate;
pub mod raster;
pub mod registry;
pub mod renderer;
pub mod surface;
pub mod system;
pub mod texture;

#[cfg(test)]
mod testing;

pub use driver::{DrawState, DriverOps, RenderDriver, RendererFlags, RendererInfo};
pub use headless::HeadlessWindow;
pub use registry::{DriverRegistry, DriverSelection, RenderDriverEntry};
pub use renderer::Renderer;
pub use surface::{PixelsMut, PixelsRef, Surface};
pub use system::{RenderSystem, RendererId, TextureHandle};
pub use texture::{ModulateFlags, Texture, TextureAccess, TextureId, TextureQuery};

pub use tessera_types::{
    BlendMode, Color, PixelFormat, Point, Rect, RenderConfig, RenderError, Result, Window,
    WindowEvent, WindowEventKind, WindowId,
};
