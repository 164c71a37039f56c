//! Mouse-driven orbit camera controller

use crate::core::camera::OrbitCamera;
use crate::core::input::InputState;
use winit::event::MouseButton;

/// Orbit controller: left-drag rotates, right-drag or wheel zooms
pub struct OrbitCameraController {
    /// Degrees of rotation per pixel of drag
    pub rotate_sensitivity: f32,
    /// World units of zoom per pixel of vertical drag
    pub zoom_sensitivity: f32,
    /// World units of zoom per scroll line
    pub scroll_sensitivity: f32,
}

impl OrbitCameraController {
    /// Create new controller
    pub fn new(rotate_sensitivity: f32, zoom_sensitivity: f32) -> Self {
        Self {
            rotate_sensitivity,
            zoom_sensitivity,
            scroll_sensitivity: 1.0,
        }
    }

    /// Update camera based on input
    pub fn update(&self, camera: &mut OrbitCamera, input: &InputState) {
        let (dx, dy) = input.mouse_delta();

        if input.is_mouse_button_pressed(MouseButton::Left) {
            // Dragging right spins the field to the left, like grabbing it
            camera.orbit(-dx * self.rotate_sensitivity, -dy * self.rotate_sensitivity, 0.0);
        } else if input.is_mouse_button_pressed(MouseButton::Right) {
            camera.orbit(0.0, 0.0, -dy * self.zoom_sensitivity);
        }

        let scroll = input.scroll_delta();
        if scroll != 0.0 {
            camera.orbit(0.0, 0.0, scroll * self.scroll_sensitivity);
        }
    }
}

impl Default for OrbitCameraController {
    fn default() -> Self {
        Self::new(0.5, 0.05)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::event::ElementState;

    #[test]
    fn test_no_input_leaves_camera_untouched() {
        let controller = OrbitCameraController::default();
        let mut camera = OrbitCamera::default();
        let before = camera.clone();
        controller.update(&mut camera, &InputState::new());
        assert_eq!(camera.theta, before.theta);
        assert_eq!(camera.phi, before.phi);
        assert_eq!(camera.radius, before.radius);
    }

    #[test]
    fn test_scroll_zooms_in() {
        let controller = OrbitCameraController::default();
        let mut camera = OrbitCamera::new(0.0, 0.0, 20.0, 1.0);
        let mut input = InputState::new();
        input.scroll(2.0);
        controller.update(&mut camera, &input);
        assert_eq!(camera.radius, 18.0);

        // Button state alone, without motion, does not rotate
        input.end_frame();
        input.set_mouse_button(MouseButton::Left, ElementState::Pressed);
        controller.update(&mut camera, &input);
        assert_eq!(camera.theta, 0.0);
    }

    #[test]
    fn test_left_drag_rotates() {
        let controller = OrbitCameraController::default();
        let mut camera = OrbitCamera::new(0.0, 0.0, 20.0, 1.0);
        let mut input = InputState::new();
        input.set_mouse_button(MouseButton::Left, ElementState::Pressed);
        input.move_cursor(100.0, 100.0);
        input.move_cursor(80.0, 110.0);
        controller.update(&mut camera, &input);
        assert_eq!(camera.theta, 10.0);
        assert_eq!(camera.phi, -5.0);
    }
}
