//! GPU buffer management

pub mod blade_buffers;
pub mod transform_buffer;

pub use blade_buffers::{BladeBuffers, BufferSet};
pub use transform_buffer::{TransformBuffer, TransformUniform};
