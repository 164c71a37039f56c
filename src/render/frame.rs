//! Frame slot ring, per-slot phase machine and surface failure policy.
//!
//! A frame moves through a fixed sequence of phases:
//!
//! ```text
//! Idle -> ComputeDispatched -> ComputeBarrier -> GraphicsRecorded -> Submitted -> Presented -> Idle
//! ```
//!
//! `ComputeBarrier` marks the hand-off of the visible and indirect buffers from
//! the cull pass (storage writes) to the render pass (vertex and indirect
//! reads). Compute and graphics share one queue, so the hand-off is a usage
//! transition inside the queue and wgpu emits the buffer barrier itself.
//!
//! The ring is generic over its fence type so the slot protocol can be driven
//! without a device; the renderer uses `wgpu::SubmissionIndex`.

use crate::config::SyncMode;
use crate::core::error::Error;
use crate::core::types::Result;

/// Phase of the frame occupying a slot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FramePhase {
    #[default]
    Idle,
    ComputeDispatched,
    ComputeBarrier,
    GraphicsRecorded,
    Submitted,
    Presented,
}

impl FramePhase {
    /// The only phase this one may move to
    pub fn next(self) -> Self {
        match self {
            Self::Idle => Self::ComputeDispatched,
            Self::ComputeDispatched => Self::ComputeBarrier,
            Self::ComputeBarrier => Self::GraphicsRecorded,
            Self::GraphicsRecorded => Self::Submitted,
            Self::Submitted => Self::Presented,
            Self::Presented => Self::Idle,
        }
    }
}

/// Per-slot synchronization record
#[derive(Debug)]
pub struct FrameSlot<F> {
    /// Signalled when the slot's last graphics submission retires
    fence: Option<F>,
    phase: FramePhase,
    /// Buffer set this slot's frames cull into and draw from
    buffer_set: usize,
}

impl<F> FrameSlot<F> {
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn buffer_set(&self) -> usize {
        self.buffer_set
    }

    pub fn has_fence(&self) -> bool {
        self.fence.is_some()
    }
}

/// Round-robin ring of frame slots
#[derive(Debug)]
pub struct FrameRing<F> {
    slots: Vec<FrameSlot<F>>,
    current: usize,
}

impl<F> FrameRing<F> {
    /// `slot_count` slots; with `DoubleBuffered` each slot owns a buffer set,
    /// with `QueueIdle` every slot shares set 0.
    pub fn new(slot_count: usize, sync: SyncMode) -> Self {
        let slot_count = slot_count.max(1);
        let slots = (0..slot_count)
            .map(|i| FrameSlot {
                fence: None,
                phase: FramePhase::Idle,
                buffer_set: match sync {
                    SyncMode::QueueIdle => 0,
                    SyncMode::DoubleBuffered => i,
                },
            })
            .collect();
        Self { slots, current: 0 }
    }

    /// Number of distinct buffer sets the slots refer to
    pub fn buffer_set_count(&self) -> usize {
        self.slots.iter().map(|s| s.buffer_set + 1).max().unwrap_or(1)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &FrameSlot<F> {
        &self.slots[self.current]
    }

    pub fn buffer_set(&self) -> usize {
        self.current().buffer_set
    }

    /// Block on the current slot's fence, if any, and clear it.
    pub fn wait_current(&mut self, wait: impl FnOnce(F) -> Result<()>) -> Result<()> {
        match self.slots[self.current].fence.take() {
            Some(fence) => wait(fence),
            None => Ok(()),
        }
    }

    /// Move the current slot to `to`, which must be its next phase.
    pub fn transition(&mut self, to: FramePhase) -> Result<()> {
        let slot = &mut self.slots[self.current];
        if slot.phase.next() != to {
            return Err(Error::Frame(format!(
                "slot {} cannot move from {:?} to {:?}",
                self.current, slot.phase, to
            )));
        }
        log::trace!("slot {}: {:?} -> {:?}", self.current, slot.phase, to);
        slot.phase = to;
        Ok(())
    }

    /// Store the fence of the graphics submission for the current slot.
    pub fn signal(&mut self, fence: F) {
        self.slots[self.current].fence = Some(fence);
    }

    /// Close the presented frame and move to the next slot.
    pub fn advance(&mut self) -> Result<()> {
        self.transition(FramePhase::Idle)?;
        self.current = (self.current + 1) % self.slots.len();
        Ok(())
    }

    /// Drop the in-progress frame without presenting. The slot keeps no
    /// fence, so its next use does not wait.
    pub fn abandon(&mut self) {
        let slot = &mut self.slots[self.current];
        log::trace!("slot {}: abandoned in {:?}", self.current, slot.phase);
        slot.phase = FramePhase::Idle;
    }

    /// Wait for every outstanding fence.
    pub fn drain(&mut self, mut wait: impl FnMut(F) -> Result<()>) -> Result<()> {
        for slot in &mut self.slots {
            if let Some(fence) = slot.fence.take() {
                wait(fence)?;
            }
        }
        Ok(())
    }
}

/// Per-frame wait ordering for both sync modes.
///
/// Drives a `FrameRing` through one frame and decides which fence to block on
/// at each step:
///
/// - `QueueIdle`: wait for the previous compute submission, dispatch, then
///   wait on the slot fence before recording graphics.
/// - `DoubleBuffered`: wait on the slot fence, then dispatch. The slot's
///   buffer set is free once its last draw has retired.
///
/// A zero-sized surface suspends the sequence; frames are skipped before any
/// GPU work is recorded.
#[derive(Debug)]
pub struct FrameSync<F> {
    ring: FrameRing<F>,
    mode: SyncMode,
    /// Last compute submission
    last_compute: Option<F>,
    minimized: bool,
}

impl<F> FrameSync<F> {
    pub fn new(slot_count: usize, mode: SyncMode) -> Self {
        Self {
            ring: FrameRing::new(slot_count, mode),
            mode,
            last_compute: None,
            minimized: false,
        }
    }

    pub fn ring(&self) -> &FrameRing<F> {
        &self.ring
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Buffer set the current frame culls into and draws from
    pub fn buffer_set(&self) -> usize {
        self.ring.buffer_set()
    }

    /// Track the surface extent; a zero dimension suspends drawing.
    pub fn set_extent(&mut self, width: u32, height: u32) {
        let minimized = width == 0 || height == 0;
        if minimized != self.minimized {
            log::debug!("Surface {}", if minimized { "minimized" } else { "restored" });
        }
        self.minimized = minimized;
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    /// Wait for whatever must retire before the cull pass may write this
    /// frame's buffer set. Returns `false` when the frame is to be skipped.
    pub fn begin(&mut self, mut wait: impl FnMut(F) -> Result<()>) -> Result<bool> {
        if self.minimized {
            return Ok(false);
        }
        match self.mode {
            SyncMode::QueueIdle => {
                if let Some(fence) = self.last_compute.take() {
                    wait(fence)?;
                }
            }
            SyncMode::DoubleBuffered => self.ring.wait_current(&mut wait)?,
        }
        Ok(true)
    }

    /// Record the compute submission. In `QueueIdle` this also blocks on the
    /// slot fence before graphics may be recorded.
    pub fn compute_submitted(&mut self, fence: F, mut wait: impl FnMut(F) -> Result<()>) -> Result<()> {
        self.last_compute = Some(fence);
        self.ring.transition(FramePhase::ComputeDispatched)?;
        if self.mode == SyncMode::QueueIdle {
            self.ring.wait_current(&mut wait)?;
        }
        Ok(())
    }

    /// Surface texture acquired; buffers switch to vertex and indirect reads.
    pub fn acquired(&mut self) -> Result<()> {
        self.ring.transition(FramePhase::ComputeBarrier)
    }

    /// No surface texture this frame; the slot returns to `Idle` in place.
    pub fn abandon(&mut self) {
        self.ring.abandon();
    }

    pub fn recorded(&mut self) -> Result<()> {
        self.ring.transition(FramePhase::GraphicsRecorded)
    }

    /// Store the graphics submission as the slot fence.
    pub fn graphics_submitted(&mut self, fence: F) -> Result<()> {
        self.ring.signal(fence);
        self.ring.transition(FramePhase::Submitted)
    }

    /// Close the frame and move to the next slot.
    pub fn presented(&mut self) -> Result<()> {
        self.ring.transition(FramePhase::Presented)?;
        self.ring.advance()
    }

    /// Wait for every outstanding submission.
    pub fn drain(&mut self, mut wait: impl FnMut(F) -> Result<()>) -> Result<()> {
        self.ring.drain(&mut wait)?;
        if let Some(fence) = self.last_compute.take() {
            wait(fence)?;
        }
        Ok(())
    }
}

/// Response to a failed surface acquisition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceAction {
    /// Reconfigure the surface and try once more
    Reconfigure,
    /// Skip this frame
    Skip,
    /// Unrecoverable
    Fatal,
}

impl SurfaceAction {
    pub fn classify(error: &wgpu::SurfaceError) -> Self {
        match error {
            wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost => Self::Reconfigure,
            wgpu::SurfaceError::Timeout => Self::Skip,
            wgpu::SurfaceError::OutOfMemory => Self::Fatal,
            #[allow(unreachable_patterns)]
            _ => Self::Fatal,
        }
    }
}

/// Result of acquiring a surface texture
#[derive(Debug)]
pub enum Acquired<T> {
    Frame(T),
    /// Timed out; skip this frame and keep running
    Skip,
    /// Reconfiguring did not help; shut down cleanly
    Exit,
}

/// Acquire with the recovery policy: one reconfigure-and-retry for a stale
/// surface, skip on timeout, error out on anything unrecoverable.
pub fn acquire_with<T>(
    mut acquire: impl FnMut() -> std::result::Result<T, wgpu::SurfaceError>,
    reconfigure: impl FnOnce(),
) -> Result<Acquired<T>> {
    let error = match acquire() {
        Ok(frame) => return Ok(Acquired::Frame(frame)),
        Err(e) => e,
    };

    match SurfaceAction::classify(&error) {
        SurfaceAction::Skip => {
            log::warn!("Surface acquisition timed out, skipping frame");
            Ok(Acquired::Skip)
        }
        SurfaceAction::Fatal => Err(Error::Surface(error.to_string())),
        SurfaceAction::Reconfigure => {
            log::info!("Surface {}, reconfiguring", error);
            reconfigure();
            match acquire() {
                Ok(frame) => Ok(Acquired::Frame(frame)),
                Err(e) => {
                    log::error!("Surface still unusable after reconfigure: {}", e);
                    Ok(Acquired::Exit)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Run one full frame on the ring, recording waited fences.
    fn run_frame(ring: &mut FrameRing<u32>, fence: u32, waited: &mut Vec<(usize, u32)>) {
        let slot = ring.current_index();
        ring.wait_current(|f| {
            waited.push((slot, f));
            Ok(())
        })
        .unwrap();
        ring.transition(FramePhase::ComputeDispatched).unwrap();
        ring.transition(FramePhase::ComputeBarrier).unwrap();
        ring.transition(FramePhase::GraphicsRecorded).unwrap();
        ring.signal(fence);
        ring.transition(FramePhase::Submitted).unwrap();
        ring.transition(FramePhase::Presented).unwrap();
        ring.advance().unwrap();
    }

    #[test]
    fn test_phase_cycle() {
        let mut phase = FramePhase::Idle;
        for _ in 0..6 {
            phase = phase.next();
        }
        assert_eq!(phase, FramePhase::Idle);
    }

    #[test]
    fn test_out_of_order_transition_rejected() {
        let mut ring: FrameRing<u32> = FrameRing::new(2, SyncMode::DoubleBuffered);
        assert!(matches!(ring.transition(FramePhase::GraphicsRecorded), Err(Error::Frame(_))));
        ring.transition(FramePhase::ComputeDispatched).unwrap();
        assert!(ring.transition(FramePhase::Submitted).is_err());
        assert!(ring.advance().is_err());
        assert_eq!(ring.current().phase(), FramePhase::ComputeDispatched);
    }

    #[test]
    fn test_slot_waited_before_reuse() {
        let mut ring = FrameRing::new(2, SyncMode::DoubleBuffered);
        let mut waited = Vec::new();

        // K + 1 frames: slot 0 is reused once
        for frame in 0..3 {
            run_frame(&mut ring, 100 + frame, &mut waited);
        }
        assert_eq!(waited, vec![(0, 100)]);

        run_frame(&mut ring, 103, &mut waited);
        assert_eq!(waited, vec![(0, 100), (1, 101)]);
        assert_eq!(ring.current_index(), 0);
    }

    #[test]
    fn test_buffer_sets_per_mode() {
        let double: FrameRing<u32> = FrameRing::new(2, SyncMode::DoubleBuffered);
        assert_eq!(double.buffer_set_count(), 2);
        assert_eq!(double.buffer_set(), 0);

        let mut idle: FrameRing<u32> = FrameRing::new(2, SyncMode::QueueIdle);
        assert_eq!(idle.buffer_set_count(), 1);
        run_frame(&mut idle, 1, &mut Vec::new());
        assert_eq!(idle.buffer_set(), 0);
    }

    #[test]
    fn test_abandon_keeps_slot_without_fence() {
        let mut ring: FrameRing<u32> = FrameRing::new(2, SyncMode::DoubleBuffered);
        ring.transition(FramePhase::ComputeDispatched).unwrap();
        ring.abandon();
        assert_eq!(ring.current().phase(), FramePhase::Idle);
        assert!(!ring.current().has_fence());
        assert_eq!(ring.current_index(), 0);
        ring.transition(FramePhase::ComputeDispatched).unwrap();
    }

    #[test]
    fn test_drain_waits_all() {
        let mut ring = FrameRing::new(2, SyncMode::DoubleBuffered);
        run_frame(&mut ring, 7, &mut Vec::new());
        run_frame(&mut ring, 8, &mut Vec::new());
        let mut drained = Vec::new();
        ring.drain(|f| {
            drained.push(f);
            Ok(())
        })
        .unwrap();
        assert_eq!(drained, vec![7, 8]);
        assert!(!ring.current().has_fence());
    }

    #[test]
    fn test_classify_surface_errors() {
        assert_eq!(SurfaceAction::classify(&wgpu::SurfaceError::Outdated), SurfaceAction::Reconfigure);
        assert_eq!(SurfaceAction::classify(&wgpu::SurfaceError::Lost), SurfaceAction::Reconfigure);
        assert_eq!(SurfaceAction::classify(&wgpu::SurfaceError::Timeout), SurfaceAction::Skip);
        assert_eq!(SurfaceAction::classify(&wgpu::SurfaceError::OutOfMemory), SurfaceAction::Fatal);
    }

    #[test]
    fn test_outdated_surface_recovers_after_reconfigure() {
        let mut attempts = 0;
        let mut reconfigured = false;
        let result = acquire_with(
            || {
                attempts += 1;
                if attempts == 1 { Err(wgpu::SurfaceError::Outdated) } else { Ok(42) }
            },
            || reconfigured = true,
        )
        .unwrap();
        assert!(matches!(result, Acquired::Frame(42)));
        assert!(reconfigured);
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_persistently_lost_surface_exits() {
        let mut attempts = 0;
        let result = acquire_with::<u32>(
            || {
                attempts += 1;
                Err(wgpu::SurfaceError::Lost)
            },
            || {},
        )
        .unwrap();
        assert!(matches!(result, Acquired::Exit));
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_timeout_skips_and_oom_fails() {
        let skip = acquire_with::<u32>(|| Err(wgpu::SurfaceError::Timeout), || {}).unwrap();
        assert!(matches!(skip, Acquired::Skip));
        let fatal = acquire_with::<u32>(|| Err(wgpu::SurfaceError::OutOfMemory), || {});
        assert!(matches!(fatal, Err(Error::Surface(_))));
    }

    /// Drive one presented frame through `FrameSync`, logging each wait.
    fn sync_frame(sync: &mut FrameSync<u32>, compute: u32, graphics: u32, log: &mut Vec<String>) -> bool {
        if !sync.begin(|f| {
            log.push(format!("wait {f}"));
            Ok(())
        })
        .unwrap()
        {
            return false;
        }
        log.push(format!("compute {compute} -> set {}", sync.buffer_set()));
        sync.compute_submitted(compute, |f| {
            log.push(format!("wait {f}"));
            Ok(())
        })
        .unwrap();
        sync.acquired().unwrap();
        sync.recorded().unwrap();
        sync.graphics_submitted(graphics).unwrap();
        sync.presented().unwrap();
        true
    }

    #[test]
    fn test_queue_idle_wait_order() {
        let mut sync = FrameSync::new(2, SyncMode::QueueIdle);
        let mut log = Vec::new();
        sync_frame(&mut sync, 1, 2, &mut log);
        sync_frame(&mut sync, 3, 4, &mut log);
        sync_frame(&mut sync, 5, 6, &mut log);
        assert_eq!(
            log,
            vec![
                "compute 1 -> set 0",
                "wait 1",
                "compute 3 -> set 0",
                "wait 3",
                "compute 5 -> set 0",
                // Slot 0 reused: its draw fence is waited after the dispatch
                "wait 2",
            ]
        );
    }

    #[test]
    fn test_double_buffered_wait_order() {
        let mut sync = FrameSync::new(2, SyncMode::DoubleBuffered);
        let mut log = Vec::new();
        for frame in 0..4 {
            sync_frame(&mut sync, 10 + frame * 2, 11 + frame * 2, &mut log);
        }
        assert_eq!(
            log,
            vec![
                "compute 10 -> set 0",
                "compute 12 -> set 1",
                "wait 11",
                "compute 14 -> set 0",
                "wait 13",
                "compute 16 -> set 1",
            ]
        );
    }

    #[test]
    fn test_skipped_frame_stays_on_slot() {
        let mut sync = FrameSync::new(2, SyncMode::DoubleBuffered);
        let mut log = Vec::new();
        sync_frame(&mut sync, 1, 2, &mut log);

        assert!(sync.begin(|_| Ok(())).unwrap());
        sync.compute_submitted(3, |_| Ok(())).unwrap();
        sync.abandon();
        assert_eq!(sync.ring().current_index(), 1);
        assert_eq!(sync.ring().current().phase(), FramePhase::Idle);

        sync_frame(&mut sync, 4, 5, &mut log);
        assert_eq!(sync.ring().current_index(), 0);

        let mut drained = Vec::new();
        sync.drain(|f| {
            drained.push(f);
            Ok(())
        })
        .unwrap();
        assert_eq!(drained, vec![2, 5, 4]);
    }

    #[test]
    fn test_minimized_surface_skips_before_compute() {
        let mut sync = FrameSync::new(2, SyncMode::QueueIdle);
        let mut log = Vec::new();
        sync_frame(&mut sync, 1, 2, &mut log);

        sync.set_extent(0, 0);
        assert!(sync.is_minimized());
        assert!(!sync_frame(&mut sync, 3, 4, &mut log));
        assert_eq!(log, vec!["compute 1 -> set 0"]);
        assert_eq!(sync.ring().current_index(), 1);
        assert_eq!(sync.ring().current().phase(), FramePhase::Idle);

        sync.set_extent(800, 600);
        assert!(sync_frame(&mut sync, 3, 4, &mut log));
        assert_eq!(log, vec!["compute 1 -> set 0", "wait 1", "compute 3 -> set 0"]);
    }
}
