//! Grass blade model.
//!
//! Blades are generated once on the host, uploaded once, and from then on
//! animated and culled every frame by the compute pass in
//! `render::pipeline::blade_cull`. This module owns the record layout, the
//! generator, the cull parameters and a host mirror of the cull policy.

pub mod blade;
pub mod config;
pub mod cull;
pub mod generator;
pub mod params;

pub use blade::{BLADE_SEGMENTS, BLADE_VERTEX_COUNT, Blade, BladeDrawIndirect};
pub use config::{BladeRanges, GrassConfig, Placement};
pub use cull::{BladeCuller, CullSettings};
pub use params::CullUniforms;

use crate::core::camera::OrbitCamera;
use crate::core::time::FrameTime;

/// Manages grass configuration and builds per-frame GPU params.
pub struct GrassSystem {
    config: GrassConfig,
    cull: CullSettings,
}

impl GrassSystem {
    pub fn new(config: GrassConfig, cull: CullSettings) -> Self {
        Self { config, cull }
    }

    pub fn config(&self) -> &GrassConfig {
        &self.config
    }

    pub fn cull_settings(&self) -> &CullSettings {
        &self.cull
    }

    pub fn cull_settings_mut(&mut self) -> &mut CullSettings {
        &mut self.cull
    }

    /// Generate the initial population for the configured placement.
    pub fn generate(&self) -> Vec<Blade> {
        generator::generate_from_config(&self.config)
    }

    /// Build GPU-ready cull params from the camera and frame clock.
    ///
    /// The view volume is clamped to the distance cutoff so the frustum test
    /// never keeps blades the distance test would drop.
    pub fn build_uniforms(&self, camera: &OrbitCamera, time: FrameTime, blade_count: u32) -> CullUniforms {
        let far = if self.cull.distance {
            self.cull.max_distance.max(camera.near * 2.0)
        } else {
            camera.far
        };
        self.cull.uniforms(
            camera.view_matrix(),
            camera.projection_with_far(far),
            camera.position(),
            time.delta,
            time.total,
            blade_count,
        )
    }

    /// Host estimate of how many blades survive the cull pass this frame.
    pub fn estimate_visible(&self, blades: &[Blade], camera: &OrbitCamera) -> usize {
        let uniforms = self.build_uniforms(camera, FrameTime::default(), blades.len() as u32);
        BladeCuller::new(blades.to_vec()).cull(&uniforms).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_uniforms() {
        let sys = GrassSystem::new(GrassConfig::default(), CullSettings::default());
        let camera = OrbitCamera::default();
        let time = FrameTime { delta: 0.016, total: 1.5 };
        let u = sys.build_uniforms(&camera, time, 4000);
        assert_eq!(u.blade_count, 4000);
        assert_eq!(u.total_time, 1.5);
        assert_eq!(u.delta_time, 0.016);
        assert_eq!(u.flags, 0b1111);
        assert_eq!(u.camera_position, camera.position().to_array());
        let wind = glam::Vec3::from_array(u.wind_direction);
        assert!((wind.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_keep_all_estimate_counts_everything() {
        let config = GrassConfig { blade_count: 64, ..Default::default() };
        let sys = GrassSystem::new(config, CullSettings::keep_all());
        let blades = sys.generate();
        assert_eq!(sys.estimate_visible(&blades, &OrbitCamera::default()), 64);
    }

    #[test]
    fn test_default_estimate_is_a_subset() {
        let config = GrassConfig { blade_count: 2000, ..Default::default() };
        let sys = GrassSystem::new(config, CullSettings::default());
        let blades = sys.generate();
        let visible = sys.estimate_visible(&blades, &OrbitCamera::default());
        assert!(visible <= 2000);
        assert!(visible > 0);
    }
}
