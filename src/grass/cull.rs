//! CPU mirror of the blade cull pass.
//!
//! Same deformation and the same visibility predicates as blade_cull.wgsl,
//! evaluated on the host. Used to estimate visibility at startup and to
//! pin down the predicate math in unit tests; never on the frame path.

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::grass::blade::Blade;
use crate::grass::params::CullUniforms;

/// Downward pull applied before dividing by stiffness
pub const GRAVITY: f32 = 1.0;
/// Share of gravity pushing the blade toward its facing direction
pub const FRONT_GRAVITY: f32 = 0.25;
/// Angular frequency of the wind oscillation (rad/s)
pub const WIND_FREQUENCY: f32 = 1.7;
/// Minimum v1 height as a fraction of blade height
const MIN_V1_FRACTION: f32 = 0.05;

/// User-facing cull pass configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CullSettings {
    pub animate: bool,
    pub orientation: bool,
    pub frustum: bool,
    pub distance: bool,
    /// Blades farther than this (meters, measured along the ground) are dropped
    pub max_distance: f32,
    pub wind_direction: [f32; 3],
    pub wind_strength: f32,
    /// `|dot(view, width)|` above which a blade counts as edge-on
    pub orientation_threshold: f32,
    pub frustum_tolerance: f32,
    pub distance_levels: u32,
}

impl Default for CullSettings {
    fn default() -> Self {
        Self {
            animate: true,
            orientation: true,
            frustum: true,
            distance: true,
            max_distance: 40.0,
            wind_direction: [1.0, 0.0, 0.3],
            wind_strength: 3.0,
            orientation_threshold: 0.9,
            frustum_tolerance: 0.5,
            distance_levels: 8,
        }
    }
}

impl CullSettings {
    /// Settings with every stage disabled.
    pub fn keep_all() -> Self {
        Self {
            animate: false,
            orientation: false,
            frustum: false,
            distance: false,
            ..Default::default()
        }
    }

    pub fn flags(&self) -> u32 {
        let mut flags = 0;
        if self.animate {
            flags |= CullUniforms::ANIMATE;
        }
        if self.orientation {
            flags |= CullUniforms::ORIENTATION;
        }
        if self.frustum {
            flags |= CullUniforms::FRUSTUM;
        }
        if self.distance {
            flags |= CullUniforms::DISTANCE;
        }
        flags
    }

    /// Build the per-dispatch uniform block.
    pub fn uniforms(
        &self,
        view: Mat4,
        projection: Mat4,
        camera_position: Vec3,
        delta_time: f32,
        total_time: f32,
        blade_count: u32,
    ) -> CullUniforms {
        let wind = Vec3::from_array(self.wind_direction).normalize_or_zero();
        CullUniforms {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            camera_position: camera_position.to_array(),
            delta_time,
            total_time,
            blade_count,
            flags: self.flags(),
            max_distance: self.max_distance,
            wind_direction: wind.to_array(),
            wind_strength: self.wind_strength,
            orientation_threshold: self.orientation_threshold,
            frustum_tolerance: self.frustum_tolerance,
            distance_levels: self.distance_levels,
            _pad: 0,
        }
    }
}

/// Unit width direction of a blade, perpendicular to its up vector.
pub fn bitangent(blade: &Blade) -> Vec3 {
    let up = blade.up_vector();
    let theta = blade.direction();
    let b = Vec3::new(theta.cos(), 0.0, theta.sin());
    let b = b - up * b.dot(up);
    if b.length_squared() < 1e-8 {
        // Up is horizontal and parallel to the angle direction
        let reference = if up.x.abs() > 0.9 { Vec3::Z } else { Vec3::X };
        return up.cross(reference).normalize();
    }
    b.normalize()
}

/// Stateless gravity + wind deformation followed by length correction.
pub fn animate(blade: &Blade, total_time: f32, wind_direction: Vec3, wind_strength: f32) -> Blade {
    let v0 = blade.base();
    let up = blade.up_vector();
    let height = blade.height();
    let stiffness = blade.stiffness();
    let rest_tip = v0 + up * height;

    let front = bitangent(blade).cross(up).normalize_or_zero();
    let gravity_env = Vec3::NEG_Y * GRAVITY;
    let gravity = gravity_env + front * (FRONT_GRAVITY * GRAVITY);

    let phase = (total_time * WIND_FREQUENCY + v0.x * 0.15 + v0.z * 0.1).sin();
    let alignment = 1.0 - wind_direction.dot(up).abs();
    let wind = wind_direction * wind_strength * (0.6 + 0.4 * phase) * alignment;

    let mut v2 = rest_tip + (gravity + wind) / stiffness;

    // Keep the tip above the ground plane
    v2 -= up * up.dot(v2 - v0).min(0.0);

    let along = v2 - v0;
    let projected = (along - up * along.dot(up)).length();
    let ratio = projected / height;
    let mut v1 = v0 + up * height * (1.0 - ratio).max(MIN_V1_FRACTION * ratio.max(1.0));

    // Restore the curve length to the blade height
    let chord = v0.distance(v2);
    let polyline = v0.distance(v1) + v1.distance(v2);
    let length = (2.0 * chord + polyline) / 3.0;
    if length > 0.0 {
        let r = height / length;
        let v1_corrected = v0 + (v1 - v0) * r;
        v2 = v1_corrected + (v2 - v1) * r;
        v1 = v1_corrected;
    }

    Blade {
        v0: blade.v0,
        v1: v1.extend(blade.v1[3]).to_array(),
        v2: v2.extend(blade.v2[3]).to_array(),
        up: blade.up,
    }
}

/// True when the blade is seen nearly edge-on.
pub fn orientation_culled(blade: &Blade, camera_position: Vec3, threshold: f32) -> bool {
    let up = blade.up_vector();
    let view = blade.base() - camera_position;
    let view = view - up * view.dot(up);
    if view.length_squared() < 1e-8 {
        return false;
    }
    view.normalize().dot(bitangent(blade)).abs() > threshold
}

/// Point inside the clip volume enlarged by `tolerance` (zero-to-one depth).
pub fn in_view_volume(view_projection: &Mat4, point: Vec3, tolerance: f32) -> bool {
    let clip: Vec4 = *view_projection * point.extend(1.0);
    let h = clip.w + tolerance;
    clip.x.abs() <= h && clip.y.abs() <= h && clip.z >= -tolerance && clip.z <= h
}

/// True when base, curve midpoint and tip all fall outside the view volume.
pub fn frustum_culled(blade: &Blade, view_projection: &Mat4, tolerance: f32) -> bool {
    let v0 = blade.base();
    let v1 = Vec4::from_array(blade.v1).truncate();
    let v2 = Vec4::from_array(blade.v2).truncate();
    let mid = 0.25 * v0 + 0.5 * v1 + 0.25 * v2;
    ![v0, mid, v2].iter().any(|&p| in_view_volume(view_projection, p, tolerance))
}

/// True when the blade is beyond `max_distance` or thinned out by its bucket.
pub fn distance_culled(blade: &Blade, index: u32, camera_position: Vec3, max_distance: f32, levels: u32) -> bool {
    let up = blade.up_vector();
    let offset = blade.base() - camera_position;
    let distance = (offset - up * offset.dot(up)).length();
    if distance > max_distance {
        return true;
    }
    if levels == 0 {
        return false;
    }
    let keep = (levels as f32 * (1.0 - distance / max_distance)).floor() as u32;
    index % levels > keep
}

/// Apply the full cull policy to one blade. Returns the blade to emit, if any.
pub fn cull_blade(blade: &Blade, index: u32, uniforms: &CullUniforms) -> Option<Blade> {
    let camera = Vec3::from_array(uniforms.camera_position);
    let blade = if uniforms.has(CullUniforms::ANIMATE) {
        animate(
            blade,
            uniforms.total_time,
            Vec3::from_array(uniforms.wind_direction),
            uniforms.wind_strength,
        )
    } else {
        *blade
    };

    if uniforms.has(CullUniforms::ORIENTATION)
        && orientation_culled(&blade, camera, uniforms.orientation_threshold)
    {
        return None;
    }
    if uniforms.has(CullUniforms::FRUSTUM)
        && frustum_culled(&blade, &uniforms.view_projection(), uniforms.frustum_tolerance)
    {
        return None;
    }
    if uniforms.has(CullUniforms::DISTANCE)
        && distance_culled(&blade, index, camera, uniforms.max_distance, uniforms.distance_levels)
    {
        return None;
    }
    Some(blade)
}

/// Host-side culler over a fixed population.
///
/// Re-uses its output allocation across calls.
pub struct BladeCuller {
    blades: Vec<Blade>,
    visible: Vec<Blade>,
}

impl BladeCuller {
    pub fn new(blades: Vec<Blade>) -> Self {
        let cap = blades.len();
        Self {
            blades,
            visible: Vec::with_capacity(cap),
        }
    }

    /// Survivors in input order (the GPU pass emits them in arbitrary order).
    pub fn cull(&mut self, uniforms: &CullUniforms) -> &[Blade] {
        self.visible.clear();
        for (index, blade) in self.blades.iter().enumerate() {
            if let Some(out) = cull_blade(blade, index as u32, uniforms) {
                self.visible.push(out);
            }
        }
        &self.visible
    }

    pub fn total_blades(&self) -> u32 {
        self.blades.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_3};

    fn blade_at(x: f32, z: f32, direction: f32) -> Blade {
        Blade::new(Vec3::new(x, 0.0, z), Vec3::Y, direction, 3.0, 0.3, 7.0)
    }

    fn camera_uniforms(flags: u32, count: u32) -> CullUniforms {
        let eye = Vec3::new(0.0, 2.0, 10.0);
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_rh(FRAC_PI_3, 1.0, 0.1, 100.0);
        CullUniforms {
            flags,
            max_distance: 40.0,
            orientation_threshold: 0.9,
            frustum_tolerance: 0.0,
            distance_levels: 0,
            ..CullUniforms::keep_all(count)
        }
        .with_camera(view, projection, eye)
    }

    #[test]
    fn test_keep_all_passes_blades_unchanged() {
        let blades = vec![blade_at(0.0, 0.0, 0.0), blade_at(500.0, 0.0, 1.0)];
        let mut culler = BladeCuller::new(blades.clone());
        let visible = culler.cull(&CullUniforms::keep_all(2));
        assert_eq!(visible, blades.as_slice());
    }

    #[test]
    fn test_settings_flags() {
        assert_eq!(CullSettings::keep_all().flags(), 0);
        assert_eq!(CullSettings::default().flags(), 0b1111);
        let frustum_only = CullSettings { frustum: true, ..CullSettings::keep_all() };
        assert_eq!(frustum_only.flags(), CullUniforms::FRUSTUM);
    }

    #[test]
    fn test_animate_preserves_length_and_ground() {
        let blade = blade_at(1.0, -2.0, 0.7);
        for t in [0.0, 0.4, 1.3, 9.0] {
            let bent = animate(&blade, t, Vec3::X, 6.0);
            let v0 = bent.base();
            let v1 = Vec4::from_array(bent.v1).truncate();
            let v2 = Vec4::from_array(bent.v2).truncate();
            assert!(v2.y >= -1e-4, "tip below ground at t={t}");
            let length = (2.0 * v0.distance(v2) + v0.distance(v1) + v1.distance(v2)) / 3.0;
            assert!((length - blade.height()).abs() < 1e-3, "length {length} at t={t}");
            assert_eq!(bent.v0, blade.v0);
            assert_eq!(bent.up, blade.up);
            assert_eq!(bent.height(), blade.height());
            assert_eq!(bent.width(), blade.width());
        }
    }

    #[test]
    fn test_animate_bends_with_wind() {
        let blade = blade_at(0.0, 0.0, FRAC_PI_2);
        let bent = animate(&blade, 0.0, Vec3::X, 6.0);
        assert!(bent.v2[0] > 0.1);
    }

    #[test]
    fn test_orientation_edge_on() {
        let camera = Vec3::new(0.0, 1.0, 10.0);
        // Width along X, camera looking down -Z: face-on
        assert!(!orientation_culled(&blade_at(0.0, 0.0, 0.0), camera, 0.9));
        // Width along Z: edge-on
        assert!(orientation_culled(&blade_at(0.0, 0.0, FRAC_PI_2), camera, 0.9));
    }

    #[test]
    fn test_frustum_in_front_and_behind() {
        let uniforms = camera_uniforms(CullUniforms::FRUSTUM, 2);
        let vp = uniforms.view_projection();
        assert!(!frustum_culled(&blade_at(0.0, 0.0, 0.0), &vp, 0.0));
        assert!(frustum_culled(&blade_at(0.0, 30.0, 0.0), &vp, 0.0));
        assert!(frustum_culled(&blade_at(200.0, 0.0, 0.0), &vp, 0.0));
    }

    #[test]
    fn test_frustum_tolerance_keeps_border_blades() {
        let uniforms = camera_uniforms(CullUniforms::FRUSTUM, 1);
        let vp = uniforms.view_projection();
        let border = blade_at(7.0, 0.0, 0.0);
        assert!(frustum_culled(&border, &vp, 0.0));
        assert!(!frustum_culled(&border, &vp, 5.0));
    }

    #[test]
    fn test_distance_cutoff() {
        let camera = Vec3::new(0.0, 5.0, 0.0);
        assert!(!distance_culled(&blade_at(10.0, 0.0, 0.0), 3, camera, 40.0, 0));
        assert!(distance_culled(&blade_at(50.0, 0.0, 0.0), 3, camera, 40.0, 0));
    }

    #[test]
    fn test_distance_thinning_buckets() {
        let camera = Vec3::ZERO;
        let near = blade_at(1.0, 0.0, 0.0);
        let far = blade_at(35.0, 0.0, 0.0);
        let levels = 8;
        let near_kept = (0..levels).filter(|&i| !distance_culled(&near, i, camera, 40.0, levels)).count();
        let far_kept = (0..levels).filter(|&i| !distance_culled(&far, i, camera, 40.0, levels)).count();
        assert_eq!(near_kept, levels as usize);
        assert!(far_kept < near_kept);
        assert!(far_kept >= 1);
    }

    #[test]
    fn test_culler_subset_in_order() {
        let mut blades = Vec::new();
        for i in 0..8 {
            blades.push(blade_at(i as f32, 0.0, 0.0));
            blades.push(blade_at(500.0 + i as f32, 0.0, 0.0));
        }
        let mut culler = BladeCuller::new(blades.clone());
        let mut uniforms = camera_uniforms(CullUniforms::DISTANCE, culler.total_blades());
        uniforms.camera_position = [0.0, 0.0, 0.0];
        let visible = culler.cull(&uniforms).to_vec();
        assert_eq!(visible.len(), 8);
        for (i, blade) in visible.iter().enumerate() {
            assert_eq!(*blade, blades[2 * i]);
        }
    }
}
