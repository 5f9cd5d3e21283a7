//! Ordered table of available render drivers and renderer creation.

use std::rc::Rc;

use tessera_types::{RenderConfig, RenderError, Result, Window};

use crate::driver::{RendererFlags, RendererInfo};
use crate::drivers::{framebuffer, gles, software};
use crate::renderer::Renderer;

/// Everything a driver factory gets to build a renderer.
pub struct DriverRequest<'a> {
    pub window: Rc<dyn Window>,
    pub flags: RendererFlags,
    /// The registry the request came through, for drivers that wrap others.
    pub registry: &'a DriverRegistry,
    pub config: &'a RenderConfig,
}

pub type CreateRendererFn = fn(&DriverRequest<'_>) -> Result<Renderer>;

/// One registered driver: its static capabilities and its factory.
#[derive(Clone)]
pub struct RenderDriverEntry {
    pub info: RendererInfo,
    pub create: CreateRendererFn,
}

/// Which driver `create_renderer` should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverSelection {
    /// Configured override, else the first driver offering the requested
    /// flags that initializes.
    Auto,
    /// Exactly this registry index, without capability filtering.
    Index(usize),
}

#[derive(Clone)]
pub struct DriverRegistry {
    drivers: Vec<RenderDriverEntry>,
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DriverRegistry {
    pub fn new(drivers: Vec<RenderDriverEntry>) -> Self {
        Self { drivers }
    }

    /// The built-in drivers in preference order: OpenGL ES, framebuffer,
    /// software.
    pub fn builtin() -> Self {
        Self::new(vec![gles::entry(), framebuffer::entry(), software::entry()])
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    pub fn info(&self, index: usize) -> Result<&RendererInfo> {
        self.drivers
            .get(index)
            .map(|d| &d.info)
            .ok_or(RenderError::InvalidIndex {
                index,
                count: self.drivers.len(),
            })
    }

    pub fn entries(&self) -> &[RenderDriverEntry] {
        &self.drivers
    }

    /// Index of the driver called `name`, ignoring ASCII case.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.drivers
            .iter()
            .position(|d| d.info.name.eq_ignore_ascii_case(name))
    }

    /// Build a renderer for `window`. `config` should already have its
    /// environment overrides applied.
    pub fn create_renderer(
        &self,
        window: Rc<dyn Window>,
        selection: DriverSelection,
        flags: RendererFlags,
        config: &RenderConfig,
    ) -> Result<Renderer> {
        let mut flags = flags;
        if config.vsync {
            flags |= RendererFlags::PRESENT_VSYNC;
        }
        match selection {
            DriverSelection::Index(index) => {
                if index >= self.drivers.len() {
                    return Err(RenderError::InvalidIndex {
                        index,
                        count: self.drivers.len(),
                    });
                }
                self.create_at(index, window, flags, config)
            }
            DriverSelection::Auto => {
                if let Some(name) = &config.driver {
                    let index = self.position(name).ok_or_else(|| {
                        log::warn!("Requested render driver '{name}' is not available");
                        RenderError::NoMatchingDriver
                    })?;
                    return self.create_at(index, window, flags, config);
                }
                for (index, entry) in self.drivers.iter().enumerate() {
                    if !entry.info.flags.contains(flags) {
                        continue;
                    }
                    match self.create_at(index, Rc::clone(&window), flags, config) {
                        Ok(renderer) => return Ok(renderer),
                        Err(e) => log::debug!("{} renderer unavailable: {e}", entry.info.name),
                    }
                }
                Err(RenderError::NoMatchingDriver)
            }
        }
    }

    fn create_at(
        &self,
        index: usize,
        window: Rc<dyn Window>,
        flags: RendererFlags,
        config: &RenderConfig,
    ) -> Result<Renderer> {
        let entry = &self.drivers[index];
        let (w, h) = window.size();
        let request = DriverRequest {
            window,
            flags,
            registry: self,
            config,
        };
        let renderer = (entry.create)(&request)?;
        log::info!("{} renderer initialized: {w}x{h}", entry.info.name);
        Ok(renderer)
    }
}
