//! Renderer selection configuration.
//!
//! Loaded from a TOML file with a `[render]` table, then overridden per
//! `create_renderer` call by environment variables:
//!
//! | variable              | field             |
//! |-----------------------|-------------------|
//! | `TESSERA_RENDERER`    | `driver`          |
//! | `TESSERA_SW_RENDERER` | `software_driver` |
//! | `TESSERA_VSYNC`       | `vsync`           |

use std::path::Path;

use serde::Deserialize;

use crate::error::{RenderError, Result};

pub const ENV_RENDERER: &str = "TESSERA_RENDERER";
pub const ENV_SW_RENDERER: &str = "TESSERA_SW_RENDERER";
pub const ENV_VSYNC: &str = "TESSERA_VSYNC";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RenderConfig {
    /// Force automatic selection to this driver name (case-insensitive).
    #[serde(default)]
    pub driver: Option<String>,
    /// Driver the software renderer uses to reach the screen.
    #[serde(default)]
    pub software_driver: Option<String>,
    /// Request `PRESENT_VSYNC` on every renderer.
    #[serde(default)]
    pub vsync: bool,
    /// Consult the environment on each renderer creation.
    #[serde(default = "yes")]
    pub honor_env: bool,
}

fn yes() -> bool {
    true
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            driver: None,
            software_driver: None,
            vsync: false,
            honor_env: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    render: RenderConfig,
}

impl RenderConfig {
    /// A configuration that never reads the environment.
    pub fn fixed() -> Self {
        Self {
            honor_env: false,
            ..Self::default()
        }
    }

    pub fn with_driver(mut self, name: &str) -> Self {
        self.driver = Some(name.to_string());
        self
    }

    pub fn with_software_driver(mut self, name: &str) -> Self {
        self.software_driver = Some(name.to_string());
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)?;
        file.render.validated()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        log::debug!("Loaded render config from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// The configuration in effect right now, with environment overrides.
    pub fn resolved(&self) -> Self {
        if !self.honor_env {
            return self.clone();
        }
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by the `ENV_*` variable names.
    pub fn with_overrides(&self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut out = self.clone();
        if let Some(name) = lookup(ENV_RENDERER).and_then(non_empty) {
            out.driver = Some(name);
        }
        if let Some(name) = lookup(ENV_SW_RENDERER).and_then(non_empty) {
            out.software_driver = Some(name);
        }
        if let Some(v) = lookup(ENV_VSYNC) {
            out.vsync = matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        out
    }

    fn validated(mut self) -> Result<Self> {
        self.driver = self.driver.and_then(non_empty);
        self.software_driver = self.software_driver.and_then(non_empty);
        if let Some(name) = &self.software_driver
            && name.eq_ignore_ascii_case("software")
        {
            return Err(RenderError::Config(
                "software_driver cannot be \"software\"".into(),
            ));
        }
        Ok(self)
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
