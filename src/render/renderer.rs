//! Frame orchestration: cull dispatch, buffer hand-off, scene pass, present.

use std::sync::Arc;

use winit::window::Window;

use crate::config::AppConfig;
use crate::core::camera::OrbitCamera;
use crate::core::error::Error;
use crate::core::time::FrameTime;
use crate::core::types::Result;
use crate::grass::{Blade, GrassSystem};
use crate::render::buffer::{BladeBuffers, TransformBuffer};
use crate::render::context::{FRAMES_IN_FLIGHT, GpuContext};
use crate::render::frame::{Acquired, FrameSync, acquire_with};
use crate::render::pipeline::{BladeCullPipeline, BladeRenderPipeline, GroundImage, PlanePipeline};
use crate::render::profiler::GpuProfiler;
use crate::render::texture::DepthTexture;

const CLEAR_COLOR: wgpu::Color = wgpu::Color { r: 0.53, g: 0.74, b: 0.92, a: 1.0 };

/// Frames between GPU timing log lines
const PROFILE_LOG_INTERVAL: u64 = 120;

/// What happened to a requested frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// Surface timed out; nothing was presented
    Skipped,
    /// Surface could not be recovered; the application should exit
    Exit,
}

/// Block until `index` has retired.
pub fn wait_for_submission(device: &wgpu::Device, index: wgpu::SubmissionIndex) -> Result<()> {
    device
        .poll(wgpu::PollType::Wait { submission_index: Some(index), timeout: None })
        .map(|_| ())
        .map_err(|e| Error::Gpu(format!("wait for submission failed: {e}")))
}

/// Owns every GPU resource of the scene and drives the per-frame sequence.
///
/// Field order is drop order: pipelines and buffers go before the context
/// that created them.
pub struct GrassRenderer {
    grass: GrassSystem,
    sync: FrameSync<wgpu::SubmissionIndex>,
    cull: BladeCullPipeline,
    blades: BladeRenderPipeline,
    plane: PlanePipeline,
    buffers: BladeBuffers,
    depth: DepthTexture,
    profiler: Option<GpuProfiler>,
    frame_count: u64,
    gpu: GpuContext,
}

impl GrassRenderer {
    pub async fn new(window: Arc<Window>, config: &AppConfig, population: &[Blade]) -> Result<Self> {
        let gpu = GpuContext::new(window, config.profile).await?;
        Self::with_context(gpu, config, population)
    }

    pub fn with_context(gpu: GpuContext, config: &AppConfig, population: &[Blade]) -> Result<Self> {
        let sync = FrameSync::new(FRAMES_IN_FLIGHT, config.sync);
        let ground = GroundImage::load_or_procedural(config.ground_texture.as_deref())?;
        let buffers = BladeBuffers::upload(&gpu.device, &gpu.queue, population, sync.ring().buffer_set_count())?;

        let transform_layout = TransformBuffer::bind_group_layout(&gpu.device);
        let cull = BladeCullPipeline::new(&gpu.device, &buffers)?;
        let blades = BladeRenderPipeline::new(&gpu.device, gpu.format(), &transform_layout);
        let plane = PlanePipeline::new(&gpu.device, &gpu.queue, gpu.format(), &transform_layout, &ground);

        let (width, height) = gpu.size();
        let depth = DepthTexture::new(&gpu.device, width, height);

        let profiler = (config.profile && gpu.timestamps)
            .then(|| GpuProfiler::new(&gpu.device, &gpu.queue, true));

        log::info!(
            "Renderer ready: {} blades, {:?}, {} frames in flight, {} buffer set(s)",
            buffers.blade_count(),
            config.sync,
            sync.ring().len(),
            buffers.set_count()
        );

        Ok(Self {
            grass: GrassSystem::new(config.grass.clone(), config.cull.clone()),
            sync,
            cull,
            blades,
            plane,
            buffers,
            depth,
            profiler,
            frame_count: 0,
            gpu,
        })
    }

    pub fn grass(&self) -> &GrassSystem {
        &self.grass
    }

    pub fn grass_mut(&mut self) -> &mut GrassSystem {
        &mut self.grass
    }

    pub fn size(&self) -> (u32, u32) {
        self.gpu.size()
    }

    /// Resize the surface and depth target. A zero extent (minimized window)
    /// suspends drawing until a non-zero size arrives.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.sync.set_extent(width, height);
        if self.sync.is_minimized() {
            return;
        }
        self.gpu.resize(width, height);
        self.depth.resize(&self.gpu.device, width, height);
        log::debug!("Resized to {}x{}", width, height);
    }

    /// Produce one frame.
    pub fn draw_frame(&mut self, camera: &OrbitCamera, time: FrameTime) -> Result<FrameOutcome> {
        let set = self.sync.buffer_set();
        let device = &self.gpu.device;
        let queue = &self.gpu.queue;

        if !self.sync.begin(|index| wait_for_submission(device, index))? {
            return Ok(FrameOutcome::Skipped);
        }

        // Cull pass
        let uniforms = self.grass.build_uniforms(camera, time, self.buffers.blade_count());
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("blade_cull_encoder"),
        });
        self.cull.encode(
            queue,
            &mut encoder,
            &self.buffers,
            set,
            &uniforms,
            self.profiler.as_ref().and_then(|p| p.compute_pass_timestamp_writes()),
        );
        let compute = queue.submit(Some(encoder.finish()));
        self.sync.compute_submitted(compute, |index| wait_for_submission(device, index))?;

        let gpu = &self.gpu;
        let frame = match acquire_with(|| gpu.surface.get_current_texture(), || gpu.reconfigure())? {
            Acquired::Frame(frame) => frame,
            Acquired::Skip => {
                self.sync.abandon();
                return Ok(FrameOutcome::Skipped);
            }
            Acquired::Exit => {
                self.sync.abandon();
                return Ok(FrameOutcome::Exit);
            }
        };

        // Visible and indirect buffers switch from storage writes to
        // vertex/indirect reads from here on
        self.sync.acquired()?;

        let view_matrix = camera.view_matrix();
        let projection = camera.projection_matrix();
        self.plane.update(queue, view_matrix, projection);
        self.blades.update(queue, view_matrix, projection);

        let target = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("scene_encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.depth.view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: self.profiler.as_ref().and_then(|p| p.render_pass_timestamp_writes()),
                occlusion_query_set: None,
                multiview_mask: None,
            });
            self.plane.draw(&mut pass);
            self.blades.draw(&mut pass, &self.buffers, set);
        }
        self.sync.recorded()?;

        if let Some(profiler) = &self.profiler {
            profiler.resolve(&mut encoder);
        }

        let index = queue.submit(Some(encoder.finish()));
        self.sync.graphics_submitted(index)?;

        frame.present();

        self.frame_count += 1;
        if let Some(profiler) = &mut self.profiler {
            profiler.read_results(device);
            if self.frame_count % PROFILE_LOG_INTERVAL == 0 {
                let t = profiler.average_timings();
                log::info!("GPU: cull {:.3}ms, render {:.3}ms, total {:.3}ms", t.cull_ms, t.render_ms, t.total_gpu_ms);
            }
        }

        self.sync.presented()?;
        Ok(FrameOutcome::Presented)
    }

    /// Wait for all submitted work before teardown.
    pub fn drain(&mut self) -> Result<()> {
        let device = &self.gpu.device;
        self.sync.drain(|index| wait_for_submission(device, index))?;
        log::info!("Drained GPU work after {} frames", self.frame_count);
        Ok(())
    }
}
