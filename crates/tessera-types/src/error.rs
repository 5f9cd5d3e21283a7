//! Error types for Tessera.

use std::io;

/// Errors produced by the renderer core and its drivers.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A renderer or texture handle that is stale, destroyed, or foreign.
    #[error("invalid {0} handle")]
    InvalidHandle(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("index {index} out of range (have {count})")]
    InvalidIndex { index: usize, count: usize },

    #[error("unsupported pixel format: {0}")]
    UnsupportedPixelFormat(String),

    #[error("couldn't find matching render driver")]
    NoMatchingDriver,

    /// The active driver does not implement an optional operation.
    #[error("{0} is not supported by this renderer")]
    Unsupported(&'static str),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, RenderError>;
