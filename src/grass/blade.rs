//! Blade record and indirect draw arguments shared with the GPU.
//!
//! `Blade` is uploaded verbatim: it is both the element type of the
//! storage buffers in blade_cull.wgsl and the per-instance vertex input of
//! blade_render.wgsl. Field order and size must match both shaders.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Segments along the blade height emitted per blade (fixed tessellation level)
pub const BLADE_SEGMENTS: u32 = 8;

/// Vertices per blade triangle strip: two per segment boundary
pub const BLADE_VERTEX_COUNT: u32 = 2 * (BLADE_SEGMENTS + 1);

/// One grass blade (64 bytes, four vec4).
///
/// - `v0`: base position, w = direction angle (radians)
/// - `v1`: first control point, w = height
/// - `v2`: tip control point, w = width
/// - `up`: up vector, w = stiffness
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Blade {
    pub v0: [f32; 4],
    pub v1: [f32; 4],
    pub v2: [f32; 4],
    pub up: [f32; 4],
}

impl Blade {
    /// Build a blade at rest: both control points sit at `base + up * height`.
    pub fn new(base: Vec3, up: Vec3, direction: f32, height: f32, width: f32, stiffness: f32) -> Self {
        let up = up.normalize_or(Vec3::Y);
        let tip = base + up * height;
        Self {
            v0: base.extend(direction).to_array(),
            v1: tip.extend(height).to_array(),
            v2: tip.extend(width).to_array(),
            up: up.extend(stiffness).to_array(),
        }
    }

    pub fn base(&self) -> Vec3 {
        Vec4::from_array(self.v0).truncate()
    }

    pub fn up_vector(&self) -> Vec3 {
        Vec4::from_array(self.up).truncate()
    }

    pub fn direction(&self) -> f32 {
        self.v0[3]
    }

    pub fn height(&self) -> f32 {
        self.v1[3]
    }

    pub fn width(&self) -> f32 {
        self.v2[3]
    }

    pub fn stiffness(&self) -> f32 {
        self.up[3]
    }

    /// Check the rest-pose invariants a freshly generated blade must hold.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.height() > 0.0 && self.width() > 0.0 && self.stiffness() > 0.0) {
            return Err(format!(
                "non-positive shape (height {}, width {}, stiffness {})",
                self.height(), self.width(), self.stiffness()
            ));
        }
        let up = self.up_vector();
        if (up.length() - 1.0).abs() > 1e-3 {
            return Err(format!("up vector not unit length: {up}"));
        }
        let tip = self.base() + up * self.height();
        let v1 = Vec4::from_array(self.v1).truncate();
        let v2 = Vec4::from_array(self.v2).truncate();
        if !v1.abs_diff_eq(tip, 1e-3) || !v2.abs_diff_eq(tip, 1e-3) {
            return Err(format!("control points {v1} / {v2} not at rest tip {tip}"));
        }
        Ok(())
    }

    /// Instance vertex layout: four Float32x4 attributes at locations 0..3.
    pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
            0 => Float32x4,
            1 => Float32x4,
            2 => Float32x4,
            3 => Float32x4
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Blade>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Indirect draw record written by the cull pass and consumed by `draw_indirect`.
///
/// Layout matches `wgpu::util::DrawIndirectArgs`. Each blade is drawn as one
/// instance, so `instance_count` carries the number of surviving blades and
/// `vertex_count` the fixed per-blade strip length.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct BladeDrawIndirect {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

impl BladeDrawIndirect {
    /// Byte offset of the blade counter inside the record
    pub const COUNT_OFFSET: wgpu::BufferAddress = 4;

    /// Initial record: every blade drawn until the first cull pass runs.
    pub fn new(blade_count: u32) -> Self {
        Self {
            vertex_count: BLADE_VERTEX_COUNT,
            instance_count: blade_count,
            first_vertex: 0,
            first_instance: 0,
        }
    }

    /// Number of blades the draw will emit
    pub fn blade_count(&self) -> u32 {
        self.instance_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blade_size() {
        assert_eq!(std::mem::size_of::<Blade>(), 64);
        assert_eq!(std::mem::align_of::<Blade>(), 4);
    }

    #[test]
    fn test_draw_indirect_layout() {
        assert_eq!(std::mem::size_of::<BladeDrawIndirect>(), 16);
        let args = BladeDrawIndirect::new(7);
        let words: &[u32] = bytemuck::cast_slice(std::slice::from_ref(&args));
        assert_eq!(words, &[BLADE_VERTEX_COUNT, 7, 0, 0]);
        assert_eq!(words[BladeDrawIndirect::COUNT_OFFSET as usize / 4], args.blade_count());
    }

    #[test]
    fn test_new_derives_control_points() {
        let blade = Blade::new(Vec3::new(0.5, 0.0, 0.0), Vec3::Y, 1.0, 5.0, 2.0, 2.5);
        assert_eq!(blade.v1, [0.5, 5.0, 0.0, 5.0]);
        assert_eq!(blade.v2, [0.5, 5.0, 0.0, 2.0]);
        assert_eq!(blade.up, [0.0, 1.0, 0.0, 2.5]);
        assert!(blade.validate().is_ok());
    }

    #[test]
    fn test_new_normalizes_up() {
        let blade = Blade::new(Vec3::ZERO, Vec3::new(0.0, 3.0, 4.0), 0.0, 1.0, 0.2, 5.0);
        assert!((blade.up_vector().length() - 1.0).abs() < 1e-6);
        assert!(blade.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_blades() {
        let mut blade = Blade::new(Vec3::ZERO, Vec3::Y, 0.0, 3.0, 0.2, 5.0);
        blade.v2[1] += 1.0;
        assert!(blade.validate().is_err());

        let flat = Blade::new(Vec3::ZERO, Vec3::Y, 0.0, 3.0, 0.0, 5.0);
        assert!(flat.validate().is_err());
    }

    #[test]
    fn test_vertex_layout_covers_record() {
        let layout = Blade::vertex_layout();
        assert_eq!(layout.array_stride, 64);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 16, 32, 48]);
    }
}
