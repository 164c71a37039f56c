//! GPU storage buffers for the blade population.
//!
//! Three kinds of buffer:
//! - all blades: written once at startup through a staging copy, then only read
//! - visible blades: per buffer set, written by the cull pass, read as instance input
//! - indirect args: per buffer set, count updated by the cull pass, read by `draw_indirect`
//!
//! The host never reads the visible or indirect buffers on the frame path; the
//! `read_*` helpers exist for tests and diagnostics only.

use wgpu::util::DeviceExt;

use crate::core::error::Error;
use crate::core::types::Result;
use crate::grass::blade::{Blade, BladeDrawIndirect};

const BLADE_SIZE: wgpu::BufferAddress = std::mem::size_of::<Blade>() as wgpu::BufferAddress;
const DRAW_ARGS_SIZE: wgpu::BufferAddress = std::mem::size_of::<BladeDrawIndirect>() as wgpu::BufferAddress;

/// Output buffers of one cull dispatch
pub struct BufferSet {
    /// Surviving blades, densely packed from slot 0
    pub visible: wgpu::Buffer,
    /// Indirect draw record whose instance count is the survivor count
    pub indirect: wgpu::Buffer,
}

/// All GPU buffers for a fixed blade population
pub struct BladeBuffers {
    all_blades: wgpu::Buffer,
    sets: Vec<BufferSet>,
    blade_count: u32,
}

impl BladeBuffers {
    /// Upload `blades` and allocate `set_count` output buffer sets.
    ///
    /// Blocks until the staging copy has completed on the GPU.
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, blades: &[Blade], set_count: usize) -> Result<Self> {
        if blades.is_empty() {
            return Err(Error::Config("blade population is empty".to_string()));
        }
        if set_count == 0 {
            return Err(Error::Config("at least one buffer set is required".to_string()));
        }
        let blade_count = u32::try_from(blades.len())
            .map_err(|_| Error::Config(format!("{} blades exceed the u32 draw count", blades.len())))?;

        let size = blades.len() as wgpu::BufferAddress * BLADE_SIZE;
        let limits = device.limits();
        if size > limits.max_buffer_size || size > limits.max_storage_buffer_binding_size as u64 {
            return Err(Error::Gpu(format!(
                "blade buffer of {} bytes exceeds device limits (max_buffer_size {}, max_storage_buffer_binding_size {})",
                size, limits.max_buffer_size, limits.max_storage_buffer_binding_size
            )));
        }

        // Host-visible, filled while mapped at creation
        let staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("blade_staging"),
            contents: bytemuck::cast_slice(blades),
            usage: wgpu::BufferUsages::MAP_WRITE | wgpu::BufferUsages::COPY_SRC,
        });

        let all_blades = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("all_blades"),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let initial_args = BladeDrawIndirect::new(blade_count);
        let sets = (0..set_count)
            .map(|i| BufferSet {
                visible: device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("visible_blades_{i}")),
                    size,
                    usage: wgpu::BufferUsages::STORAGE
                        | wgpu::BufferUsages::VERTEX
                        | wgpu::BufferUsages::COPY_SRC,
                    mapped_at_creation: false,
                }),
                indirect: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("blade_draw_indirect_{i}")),
                    contents: bytemuck::bytes_of(&initial_args),
                    usage: wgpu::BufferUsages::STORAGE
                        | wgpu::BufferUsages::INDIRECT
                        | wgpu::BufferUsages::COPY_DST
                        | wgpu::BufferUsages::COPY_SRC,
                }),
            })
            .collect();

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("blade_upload"),
        });
        encoder.copy_buffer_to_buffer(&staging, 0, &all_blades, 0, size);
        let index = queue.submit(Some(encoder.finish()));
        device
            .poll(wgpu::PollType::Wait { submission_index: Some(index), timeout: None })
            .map_err(|e| Error::Gpu(format!("blade upload did not complete: {e}")))?;
        drop(staging);

        log::info!(
            "Uploaded {} blades ({} KB), {} buffer set(s)",
            blade_count,
            size / 1024,
            set_count
        );

        Ok(Self { all_blades, sets, blade_count })
    }

    pub fn blade_count(&self) -> u32 {
        self.blade_count
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    /// Byte size of the all-blades buffer (and of each visible buffer)
    pub fn blades_size(&self) -> wgpu::BufferAddress {
        self.blade_count as wgpu::BufferAddress * BLADE_SIZE
    }

    pub fn all_blades(&self) -> &wgpu::Buffer {
        &self.all_blades
    }

    pub fn set(&self, set: usize) -> &BufferSet {
        &self.sets[set % self.sets.len()]
    }

    pub fn visible(&self, set: usize) -> &wgpu::Buffer {
        &self.set(set).visible
    }

    pub fn indirect(&self, set: usize) -> &wgpu::Buffer {
        &self.set(set).indirect
    }

    /// Read back the immutable source population.
    pub fn read_blades(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<Blade>> {
        read_buffer(device, queue, &self.all_blades, self.blades_size(), |bytes| {
            bytemuck::cast_slice::<u8, Blade>(bytes).to_vec()
        })
    }

    /// Read back the indirect draw record of a buffer set.
    pub fn read_draw_args(&self, device: &wgpu::Device, queue: &wgpu::Queue, set: usize) -> Result<BladeDrawIndirect> {
        read_buffer(device, queue, self.indirect(set), DRAW_ARGS_SIZE, |bytes| {
            *bytemuck::from_bytes::<BladeDrawIndirect>(bytes)
        })
    }

    /// Read back the surviving blades of a buffer set (the first `count` slots).
    pub fn read_visible(&self, device: &wgpu::Device, queue: &wgpu::Queue, set: usize) -> Result<Vec<Blade>> {
        let count = self.read_draw_args(device, queue, set)?.blade_count().min(self.blade_count);
        let mut blades = read_buffer(device, queue, self.visible(set), self.blades_size(), |bytes| {
            bytemuck::cast_slice::<u8, Blade>(bytes).to_vec()
        })?;
        blades.truncate(count as usize);
        Ok(blades)
    }
}

/// Copy `size` bytes of `source` into a mappable buffer and decode them.
fn read_buffer<T>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &wgpu::Buffer,
    size: wgpu::BufferAddress,
    decode: impl FnOnce(&[u8]) -> T,
) -> Result<T> {
    let readback = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("blade_readback"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("blade_readback"),
    });
    encoder.copy_buffer_to_buffer(source, 0, &readback, 0, size);
    let index = queue.submit(Some(encoder.finish()));

    let slice = readback.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::Wait { submission_index: Some(index), timeout: None })
        .map_err(|e| Error::Gpu(format!("readback did not complete: {e}")))?;

    match rx.recv() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(Error::Gpu(format!("readback map failed: {e}"))),
        Err(_) => return Err(Error::Gpu("readback callback dropped".to_string())),
    }

    let value = {
        let data = slice.get_mapped_range();
        decode(&data)
    };
    readback.unmap();
    Ok(value)
}
