//! Blade render pipeline: one indirect draw of the visible blades

use glam::Mat4;

use crate::grass::blade::Blade;
use crate::render::buffer::{BladeBuffers, TransformBuffer, TransformUniform};
use crate::render::texture::DepthTexture;

/// Render pipeline drawing surviving blades as instanced triangle strips
pub struct BladeRenderPipeline {
    pipeline: wgpu::RenderPipeline,
    transforms: TransformBuffer,
}

impl BladeRenderPipeline {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        transform_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blade_render_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../../shaders/blade_render.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blade_render_pipeline_layout"),
            bind_group_layouts: &[transform_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("blade_render_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Blade::vertex_layout()],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                // Blades are two-sided
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(DepthTexture::stencil_state()),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        let transforms = TransformBuffer::new(device, transform_layout, "blade_transforms");

        Self { pipeline, transforms }
    }

    /// Update view and projection; blades are already in world space
    pub fn update(&self, queue: &wgpu::Queue, view: Mat4, projection: Mat4) {
        self.transforms.update(queue, &TransformUniform::new(Mat4::IDENTITY, view, projection));
    }

    /// Draw the visible blades of `set`. The instance count comes from the
    /// set's indirect record; the host never sees it.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, buffers: &BladeBuffers, set: usize) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, self.transforms.bind_group(), &[]);
        pass.set_vertex_buffer(0, buffers.visible(set).slice(..));
        pass.draw_indirect(buffers.indirect(set), 0);
    }
}
