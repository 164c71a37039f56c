//! GPU profiling using wgpu timestamp queries

/// Per-pass GPU timing data (in milliseconds)
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GpuTimings {
    pub cull_ms: f32,
    pub render_ms: f32,
    pub total_gpu_ms: f32,
}

/// Query slot pair of each profiled pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfiledPass {
    Cull = 0,
    Render = 1,
}

/// GPU profiler using timestamp queries
pub struct GpuProfiler {
    enabled: bool,
    query_set: wgpu::QuerySet,
    resolve_buffer: wgpu::Buffer,
    read_buffer: wgpu::Buffer,
    timestamp_period: f32,
    /// Stores the latest resolved timings
    latest_timings: GpuTimings,
    /// Rolling average over N frames
    frame_timings: std::collections::VecDeque<GpuTimings>,
    max_history: usize,
}

const NUM_PASSES: u32 = 2; // cull, render
const TIMESTAMPS_PER_PASS: u32 = 2; // begin + end
const TOTAL_TIMESTAMPS: u32 = NUM_PASSES * TIMESTAMPS_PER_PASS;

impl GpuProfiler {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, enabled: bool) -> Self {
        let query_set = device.create_query_set(&wgpu::QuerySetDescriptor {
            label: Some("gpu_profiler_queries"),
            ty: wgpu::QueryType::Timestamp,
            count: TOTAL_TIMESTAMPS,
        });

        let buffer_size = (TOTAL_TIMESTAMPS as u64) * std::mem::size_of::<u64>() as u64;

        let resolve_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gpu_profiler_resolve"),
            size: buffer_size,
            usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let read_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gpu_profiler_read"),
            size: buffer_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let timestamp_period = queue.get_timestamp_period();

        Self {
            enabled,
            query_set,
            resolve_buffer,
            read_buffer,
            timestamp_period,
            latest_timings: GpuTimings::default(),
            frame_timings: std::collections::VecDeque::new(),
            max_history: 60,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Get timestamp writes for the cull compute pass
    pub fn compute_pass_timestamp_writes(&self) -> Option<wgpu::ComputePassTimestampWrites<'_>> {
        if !self.enabled {
            return None;
        }
        let base = ProfiledPass::Cull as u32 * TIMESTAMPS_PER_PASS;
        Some(wgpu::ComputePassTimestampWrites {
            query_set: &self.query_set,
            beginning_of_pass_write_index: Some(base),
            end_of_pass_write_index: Some(base + 1),
        })
    }

    /// Get timestamp writes for the scene render pass
    pub fn render_pass_timestamp_writes(&self) -> Option<wgpu::RenderPassTimestampWrites<'_>> {
        if !self.enabled {
            return None;
        }
        let base = ProfiledPass::Render as u32 * TIMESTAMPS_PER_PASS;
        Some(wgpu::RenderPassTimestampWrites {
            query_set: &self.query_set,
            beginning_of_pass_write_index: Some(base),
            end_of_pass_write_index: Some(base + 1),
        })
    }

    /// Resolve queries and copy to readable buffer. Call after all passes, before submit.
    pub fn resolve(&self, encoder: &mut wgpu::CommandEncoder) {
        if !self.enabled {
            return;
        }
        encoder.resolve_query_set(&self.query_set, 0..TOTAL_TIMESTAMPS, &self.resolve_buffer, 0);
        encoder.copy_buffer_to_buffer(
            &self.resolve_buffer, 0,
            &self.read_buffer, 0,
            (TOTAL_TIMESTAMPS as u64) * std::mem::size_of::<u64>() as u64,
        );
    }

    /// Read back this frame's timestamps. Blocks until the device is idle,
    /// so it only runs when profiling is enabled.
    pub fn read_results(&mut self, device: &wgpu::Device) {
        if !self.enabled {
            return;
        }

        let buffer_slice = self.read_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        // Poll device to process the map
        device.poll(wgpu::PollType::Wait { submission_index: None, timeout: None }).ok();

        if let Ok(Ok(())) = rx.try_recv() {
            let data = buffer_slice.get_mapped_range();
            let timestamps: &[u64] = bytemuck::cast_slice(&data);

            if let Some(timings) = timings_from_ticks(timestamps, self.timestamp_period) {
                self.frame_timings.push_back(timings);
                if self.frame_timings.len() > self.max_history {
                    self.frame_timings.pop_front();
                }
                self.latest_timings = timings;
            }

            drop(data);
            self.read_buffer.unmap();
        }
    }

    /// Get latest per-pass timings
    pub fn latest_timings(&self) -> GpuTimings {
        self.latest_timings
    }

    /// Get averaged timings over the history window
    pub fn average_timings(&self) -> GpuTimings {
        average(self.frame_timings.iter())
    }
}

/// Convert raw begin/end tick pairs into per-pass milliseconds
fn timings_from_ticks(timestamps: &[u64], timestamp_period: f32) -> Option<GpuTimings> {
    if timestamps.len() < TOTAL_TIMESTAMPS as usize {
        return None;
    }
    let ns_per_tick = timestamp_period as f64;
    let ms = |begin: u64, end: u64| -> f32 {
        ((end.wrapping_sub(begin)) as f64 * ns_per_tick / 1_000_000.0) as f32
    };
    Some(GpuTimings {
        cull_ms: ms(timestamps[0], timestamps[1]),
        render_ms: ms(timestamps[2], timestamps[3]),
        total_gpu_ms: ms(timestamps[0], timestamps[3]),
    })
}

fn average<'a>(timings: impl ExactSizeIterator<Item = &'a GpuTimings>) -> GpuTimings {
    let n = timings.len();
    if n == 0 {
        return GpuTimings::default();
    }
    let mut avg = GpuTimings::default();
    for t in timings {
        avg.cull_ms += t.cull_ms;
        avg.render_ms += t.render_ms;
        avg.total_gpu_ms += t.total_gpu_ms;
    }
    avg.cull_ms /= n as f32;
    avg.render_ms /= n as f32;
    avg.total_gpu_ms /= n as f32;
    avg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timings_from_ticks() {
        let ticks = [1_000_000, 3_000_000, 3_500_000, 7_500_000];
        let t = timings_from_ticks(&ticks, 1.0).unwrap();
        assert_eq!(t.cull_ms, 2.0);
        assert_eq!(t.render_ms, 4.0);
        assert_eq!(t.total_gpu_ms, 6.5);
        assert!(timings_from_ticks(&ticks[..3], 1.0).is_none());
    }

    #[test]
    fn test_average() {
        let a = GpuTimings { cull_ms: 1.0, render_ms: 2.0, total_gpu_ms: 3.0 };
        let b = GpuTimings { cull_ms: 3.0, render_ms: 4.0, total_gpu_ms: 7.0 };
        let avg = average([a, b].iter());
        assert_eq!(avg, GpuTimings { cull_ms: 2.0, render_ms: 3.0, total_gpu_ms: 5.0 });
        assert_eq!(average(std::iter::empty()), GpuTimings::default());
    }
}
