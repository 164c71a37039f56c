//! Blade cull compute pipeline.
//!
//! Reads every blade, animates it, applies the visibility tests and appends
//! survivors to a buffer set's visible buffer. The survivor count lands in the
//! set's indirect draw record and is consumed on the GPU only.

use crate::core::error::Error;
use crate::core::types::Result;
use crate::grass::blade::BladeDrawIndirect;
use crate::grass::params::CullUniforms;
use crate::render::buffer::BladeBuffers;

/// Invocations per workgroup, must match `@workgroup_size` in blade_cull.wgsl
pub const WORKGROUP_SIZE: u32 = 32;

/// Workgroups needed to cover `blade_count` blades
pub fn workgroup_count(blade_count: u32) -> u32 {
    blade_count.div_ceil(WORKGROUP_SIZE)
}

/// Fail if one dispatch cannot cover `blade_count` blades on a device with `limits`.
pub fn check_dispatch_limit(blade_count: u32, limits: &wgpu::Limits) -> Result<()> {
    let groups = workgroup_count(blade_count);
    if groups > limits.max_compute_workgroups_per_dimension {
        return Err(Error::Gpu(format!(
            "{} blades need {} workgroups, device allows {} per dimension",
            blade_count, groups, limits.max_compute_workgroups_per_dimension
        )));
    }
    Ok(())
}

/// Bindings for one buffer set
struct CullBindings {
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    storage_bind_group: wgpu::BindGroup,
}

/// Blade cull pipeline
pub struct BladeCullPipeline {
    pipeline: wgpu::ComputePipeline,
    bindings: Vec<CullBindings>,
    blade_count: u32,
}

impl BladeCullPipeline {
    pub fn new(device: &wgpu::Device, buffers: &BladeBuffers) -> Result<Self> {
        check_dispatch_limit(buffers.blade_count(), &device.limits())?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blade_cull_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../../shaders/blade_cull.wgsl").into()),
        });

        let storage_entry = |binding: u32, read_only: bool, min_size: u64| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(min_size),
            },
            count: None,
        };

        let blade_size = std::mem::size_of::<crate::grass::Blade>() as u64;
        let storage_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blade_cull_storage_layout"),
            entries: &[
                // All blades (read)
                storage_entry(0, true, blade_size),
                // Visible blades (write)
                storage_entry(1, false, blade_size),
                // Indirect draw record (atomic count)
                storage_entry(2, false, std::mem::size_of::<BladeDrawIndirect>() as u64),
            ],
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blade_cull_uniform_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<CullUniforms>() as u64),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blade_cull_pipeline_layout"),
            bind_group_layouts: &[&storage_layout, &uniform_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("blade_cull_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("cs_main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let bindings = (0..buffers.set_count())
            .map(|set| {
                let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("blade_cull_uniforms_{set}")),
                    size: std::mem::size_of::<CullUniforms>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("blade_cull_uniform_bind_group_{set}")),
                    layout: &uniform_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    }],
                });
                let storage_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("blade_cull_storage_bind_group_{set}")),
                    layout: &storage_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: buffers.all_blades().as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: buffers.visible(set).as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: buffers.indirect(set).as_entire_binding(),
                        },
                    ],
                });
                CullBindings {
                    uniform_buffer,
                    uniform_bind_group,
                    storage_bind_group,
                }
            })
            .collect();

        Ok(Self {
            pipeline,
            bindings,
            blade_count: buffers.blade_count(),
        })
    }

    /// Record the cull pass for `set`: reset the survivor count, write the
    /// parameters, dispatch one invocation per blade.
    pub fn encode(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        buffers: &BladeBuffers,
        set: usize,
        uniforms: &CullUniforms,
        timestamp_writes: Option<wgpu::ComputePassTimestampWrites<'_>>,
    ) {
        let bindings = &self.bindings[set % self.bindings.len()];
        queue.write_buffer(&bindings.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        encoder.clear_buffer(buffers.indirect(set), BladeDrawIndirect::COUNT_OFFSET, Some(4));

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("blade_cull_pass"),
            timestamp_writes,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bindings.storage_bind_group, &[]);
        pass.set_bind_group(1, &bindings.uniform_bind_group, &[]);
        pass.dispatch_workgroups(workgroup_count(self.blade_count), 1, 1);
    }

    pub fn blade_count(&self) -> u32 {
        self.blade_count
    }
}
