//! Error types for Meadow

use thiserror::Error;

/// Main error type for the renderer
#[derive(Debug, Error)]
pub enum Error {
    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Window error: {0}")]
    Window(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Asset error: {0}")]
    Asset(String),

    #[error("Surface error: {0}")]
    Surface(String),

    /// Frame phase machine was driven out of order
    #[error("Frame error: {0}")]
    Frame(String),
}
