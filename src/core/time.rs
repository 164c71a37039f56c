//! Frame timing utilities

use std::time::{Duration, Instant};

/// Per-frame time values handed to the compute stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
    /// Seconds since the previous tick
    pub delta: f32,
    /// Seconds accumulated since the timer started
    pub total: f32,
}

/// Tracks frame timing and calculates FPS
pub struct FrameTimer {
    last_frame: Instant,
    delta: Duration,
    total: Duration,
    frame_count: u64,
    fps_timer: Instant,
    fps: f32,
    fps_frame_count: u32,
}

impl FrameTimer {
    /// Create a new frame timer
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            delta: Duration::ZERO,
            total: Duration::ZERO,
            frame_count: 0,
            fps_timer: now,
            fps: 0.0,
            fps_frame_count: 0,
        }
    }

    /// Call once per frame to update timing
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        self.advance(now);
        self.frame_time()
    }

    fn advance(&mut self, now: Instant) {
        self.delta = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;
        self.total += self.delta;
        self.frame_count += 1;
        self.fps_frame_count += 1;

        // Update FPS every second
        let fps_elapsed = now.saturating_duration_since(self.fps_timer);
        if fps_elapsed >= Duration::from_secs(1) {
            self.fps = self.fps_frame_count as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = 0;
            self.fps_timer = now;
        }
    }

    /// Delta and total time of the last tick
    pub fn frame_time(&self) -> FrameTime {
        FrameTime {
            delta: self.delta.as_secs_f32(),
            total: self.total.as_secs_f32(),
        }
    }

    /// Get delta time in seconds
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Get current FPS (updated every second)
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Get total frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_accumulates_deltas() {
        let mut timer = FrameTimer::new();
        let start = timer.last_frame;

        timer.advance(start + Duration::from_millis(16));
        timer.advance(start + Duration::from_millis(48));

        let t = timer.frame_time();
        assert!((t.delta - 0.032).abs() < 1e-4);
        assert!((t.total - 0.048).abs() < 1e-4);
        assert_eq!(timer.frame_count(), 2);
    }

    #[test]
    fn test_fps_updates_after_one_second() {
        let mut timer = FrameTimer::new();
        let start = timer.last_frame;
        for i in 1..=10 {
            timer.advance(start + Duration::from_millis(110 * i));
        }
        assert!(timer.fps() > 8.0 && timer.fps() < 11.0, "fps was {}", timer.fps());
    }
}
