//! Render targets and sampled textures

pub mod depth;

pub use depth::DepthTexture;
