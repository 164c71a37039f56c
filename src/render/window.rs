//! Window creation using winit

use std::sync::Arc;
use winit::{
    dpi::PhysicalSize,
    event_loop::ActiveEventLoop,
    window::{Window, WindowAttributes},
};

use crate::config::WindowConfig;
use crate::core::error::Error;

/// Window attributes for a configuration
pub fn attributes(config: &WindowConfig) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(config.title.clone())
        .with_inner_size(PhysicalSize::new(config.width.max(1), config.height.max(1)))
        .with_resizable(config.resizable)
}

/// Create the application window
pub fn create(event_loop: &ActiveEventLoop, config: &WindowConfig) -> Result<Arc<Window>, Error> {
    event_loop
        .create_window(attributes(config))
        .map(Arc::new)
        .map_err(|e| Error::Window(e.to_string()))
}
