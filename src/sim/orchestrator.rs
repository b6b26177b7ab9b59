//! Per-frame ordering of the render and compute passes.
//!
//! One frame renders the current buffer, then encodes a compute pass that reads the
//! current buffer and writes the other one, and submits both in a single submission.
//! The render pass of frame N never sees the compute output of frame N; the render
//! pass of frame N + 1 reads exactly that output. Queue submission order is the only
//! synchronization relied on.

use super::{
    Workgroups,
    binding::{CellBuffer, Parity, StepCounter},
};

/// The operations the orchestrator needs from a device. Implemented over wgpu in
/// [`crate::gpu::frame::GpuFrame`].
pub trait FrameBackend {
    type Error;

    /// Acquire a drawable target and start recording a command sequence.
    fn acquire_target(&mut self) -> Result<(), Self::Error>;

    /// Draw one quad instance per cell using configuration `binding`.
    fn encode_render(&mut self, binding: Parity, instances: u32);

    /// Run the update program over the grid using configuration `binding`.
    fn encode_compute(&mut self, binding: Parity, workgroups: Workgroups);

    /// Submit everything recorded since `acquire_target` and present.
    fn submit(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    RenderingCurrent,
    ComputingNext,
    Submitted,
}

/// Outcome of one completed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameReport {
    /// Step counter after this frame
    pub step: u64,
    pub rendered: CellBuffer,
    pub written: CellBuffer,
}

pub struct FrameOrchestrator {
    steps: StepCounter,
    state: FrameState,
    workgroups: Workgroups,
    instances: u32,
}

impl FrameOrchestrator {
    pub fn new(grid_size: u32, work_group_size: u32) -> Self {
        Self {
            steps: StepCounter::new(),
            state: FrameState::Idle,
            workgroups: Workgroups::for_grid(grid_size, work_group_size),
            instances: grid_size * grid_size,
        }
    }

    pub fn steps(&self) -> u64 {
        self.steps.get()
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn workgroups(&self) -> Workgroups {
        self.workgroups
    }

    /// The buffer the next frame will render
    pub fn current_buffer(&self) -> CellBuffer {
        self.steps.parity().current()
    }

    /// Run one full frame. If no target can be acquired nothing is encoded and the
    /// step counter is left untouched.
    pub fn step<B: FrameBackend>(&mut self, backend: &mut B) -> Result<FrameReport, B::Error> {
        debug_assert_eq!(self.state, FrameState::Idle);
        backend.acquire_target()?;

        self.transition(FrameState::RenderingCurrent);
        let render_binding = self.steps.parity();
        let rendered = render_binding.current();
        backend.encode_render(render_binding, self.instances);

        // The counter moves before the compute binding is chosen: compute writes the
        // buffer that becomes current on the new step.
        self.transition(FrameState::ComputingNext);
        let step = self.steps.advance();
        let written = Parity::of(step).current();
        let compute_binding = Parity::writing(written);
        backend.encode_compute(compute_binding, self.workgroups);

        self.transition(FrameState::Submitted);
        backend.submit();

        self.transition(FrameState::Idle);
        Ok(FrameReport {
            step,
            rendered,
            written,
        })
    }

    fn transition(&mut self, next: FrameState) {
        log::trace!("frame {}: {:?} -> {:?}", self.steps.get(), self.state, next);
        self.state = next;
    }
}
