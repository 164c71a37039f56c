//! GPU-ready cull pass parameters (192 bytes, 16-byte aligned).
//!
//! Written once per frame into the cull pass uniform buffer. Must match
//! `CullUniforms` in blade_cull.wgsl.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// GPU uniform for the blade cull pass.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CullUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    // -- 128 bytes --
    pub camera_position: [f32; 3],
    /// Frame delta in seconds
    pub delta_time: f32,
    // -- 16 bytes --
    /// Seconds since startup, drives the wind phase
    pub total_time: f32,
    pub blade_count: u32,
    pub flags: u32,
    pub max_distance: f32,
    // -- 16 bytes --
    pub wind_direction: [f32; 3],
    pub wind_strength: f32,
    // -- 16 bytes --
    pub orientation_threshold: f32,
    /// Clip-space slack added to `w` before the frustum test
    pub frustum_tolerance: f32,
    /// Number of thinning buckets for distance culling (0 disables thinning)
    pub distance_levels: u32,
    pub _pad: u32,
    // -- 16 bytes --
    // Total: 192 bytes
}

impl CullUniforms {
    /// Deform blades by gravity and wind before testing them
    pub const ANIMATE: u32 = 1 << 0;
    /// Drop blades seen edge-on
    pub const ORIENTATION: u32 = 1 << 1;
    /// Drop blades entirely outside the view volume
    pub const FRUSTUM: u32 = 1 << 2;
    /// Drop far blades and thin out distant ones
    pub const DISTANCE: u32 = 1 << 3;

    /// Pass-through parameters: every blade is kept unchanged.
    pub fn keep_all(blade_count: u32) -> Self {
        Self {
            view: Mat4::IDENTITY.to_cols_array_2d(),
            projection: Mat4::IDENTITY.to_cols_array_2d(),
            blade_count,
            ..Self::zeroed()
        }
    }

    pub fn with_camera(mut self, view: Mat4, projection: Mat4, position: Vec3) -> Self {
        self.view = view.to_cols_array_2d();
        self.projection = projection.to_cols_array_2d();
        self.camera_position = position.to_array();
        self
    }

    pub fn view_projection(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.projection) * Mat4::from_cols_array_2d(&self.view)
    }

    pub fn has(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }
}
