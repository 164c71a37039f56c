//! Rendering system and GPU interfaces

pub mod window;
pub mod context;
pub mod frame;
pub mod buffer;
pub mod pipeline;
pub mod texture;
pub mod profiler;
pub mod renderer;

pub use renderer::{FrameOutcome, GrassRenderer};
