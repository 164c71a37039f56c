//! Orbit camera for viewing the grass field

use crate::core::types::{Vec3, Mat4};

/// Closest the camera may orbit to its target
pub const MIN_RADIUS: f32 = 1.0;
/// Farthest the camera may orbit from its target
pub const MAX_RADIUS: f32 = 50.0;

/// Camera orbiting a target point at a fixed height offset.
///
/// The transform is `rotate_y(theta) * rotate_x(phi) * translate(0, 1, radius)`
/// placed at `target`; the view matrix is its inverse.
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    /// Point the camera orbits around
    pub target: Vec3,
    /// Yaw around the world Y axis, degrees
    pub theta: f32,
    /// Pitch around the camera X axis, degrees
    pub phi: f32,
    /// Distance from the target
    pub radius: f32,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

impl OrbitCamera {
    /// Create a new camera
    pub fn new(theta: f32, phi: f32, radius: f32, aspect: f32) -> Self {
        Self {
            target: Vec3::ZERO,
            theta,
            phi,
            radius: radius.clamp(MIN_RADIUS, MAX_RADIUS),
            fov_y: 90.0_f32.to_radians(),
            aspect,
            near: 0.1,
            far: 100.0,
        }
    }

    /// Apply orbit deltas: yaw and pitch in degrees, zoom in world units.
    pub fn orbit(&mut self, delta_theta: f32, delta_phi: f32, delta_zoom: f32) {
        self.theta += delta_theta;
        self.phi += delta_phi;
        self.radius = (self.radius - delta_zoom).clamp(MIN_RADIUS, MAX_RADIUS);
    }

    /// Camera-to-world transform
    pub fn transform(&self) -> Mat4 {
        let rotation = Mat4::from_rotation_y(self.theta.to_radians())
            * Mat4::from_rotation_x(self.phi.to_radians());
        Mat4::from_translation(self.target)
            * rotation
            * Mat4::from_translation(Vec3::new(0.0, 1.0, self.radius))
    }

    /// Get view matrix (world to camera space)
    pub fn view_matrix(&self) -> Mat4 {
        self.transform().inverse()
    }

    /// Get projection matrix (camera to clip space, depth in [0, 1])
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_with_far(self.far)
    }

    /// Projection matrix with a different far plane, used to bound culling
    pub fn projection_with_far(&self, far: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, far.max(self.near + 0.01))
    }

    /// Get combined view-projection matrix
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space camera position
    pub fn position(&self) -> Vec3 {
        self.transform().transform_point3(Vec3::ZERO)
    }

    /// World-space viewing direction
    pub fn forward(&self) -> Vec3 {
        self.transform().transform_vector3(-Vec3::Z).normalize()
    }

    /// Update aspect ratio (call on window resize)
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.aspect = width / height;
        }
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(45.0, -25.0, 20.0, 16.0 / 9.0)
    }
}
