//! Meadow - GPU-driven grass blade rendering
//!
//! A compute pass animates and culls a fixed blade population every frame;
//! the survivors are drawn with a single indirect draw whose instance count
//! never leaves the GPU.

pub mod core;
pub mod config;
pub mod grass;
pub mod render;
