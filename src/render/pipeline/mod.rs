//! Render pipelines

pub mod blade_cull;
pub mod blade_render;
pub mod plane;

pub use blade_cull::BladeCullPipeline;
pub use blade_render::BladeRenderPipeline;
pub use plane::{GroundImage, PlanePipeline};
