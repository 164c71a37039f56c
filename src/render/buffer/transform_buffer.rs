//! GPU uniform buffer for model/view/projection transforms

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::core::camera::OrbitCamera;

/// Transform uniform data for GPU (must match `Transforms` in the render shaders).
///
/// Model sits alone at offset 0 and view + projection follow at 64, so the
/// vertex stage and the curve evaluation read disjoint ranges.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TransformUniform {
    /// Model matrix (64 bytes, offset 0)
    pub model: [[f32; 4]; 4],
    /// View matrix (64 bytes, offset 64)
    pub view: [[f32; 4]; 4],
    /// Projection matrix, depth in [0, 1] (64 bytes, offset 128)
    pub projection: [[f32; 4]; 4],
}

impl TransformUniform {
    pub fn new(model: Mat4, view: Mat4, projection: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
        }
    }

    /// Create uniform data from camera with a model matrix
    pub fn from_camera(camera: &OrbitCamera, model: Mat4) -> Self {
        Self::new(model, camera.view_matrix(), camera.projection_matrix())
    }
}

impl Default for TransformUniform {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY)
    }
}

/// GPU buffer for a transform uniform
pub struct TransformBuffer {
    /// Uniform buffer
    buffer: wgpu::Buffer,
    /// Bind group
    bind_group: wgpu::BindGroup,
}

impl TransformBuffer {
    /// Layout shared by every pipeline that reads a `TransformUniform` at group 0
    pub fn bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("transform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<TransformUniform>() as u64),
                },
                count: None,
            }],
        })
    }

    /// Create new transform buffer bound against `layout`
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<TransformUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self { buffer, bind_group }
    }

    /// Update buffer with transform data
    pub fn update(&self, queue: &wgpu::Queue, uniform: &TransformUniform) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(uniform));
    }

    /// Get bind group
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_size() {
        // Must be exactly 192 bytes to match WGSL struct layout
        let size = std::mem::size_of::<TransformUniform>();
        assert_eq!(size, 192, "TransformUniform must be exactly 192 bytes, got {} bytes", size);
        assert_eq!(std::mem::offset_of!(TransformUniform, view), 64);
    }

    #[test]
    fn test_from_camera() {
        let camera = OrbitCamera::default();
        let model = Mat4::from_scale(glam::Vec3::splat(30.0));
        let uniform = TransformUniform::from_camera(&camera, model);

        assert_eq!(uniform.model, model.to_cols_array_2d());
        assert_eq!(uniform.view, camera.view_matrix().to_cols_array_2d());
        assert_eq!(uniform.projection, camera.projection_matrix().to_cols_array_2d());
    }
}
