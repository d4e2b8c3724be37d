//! Per-frame pass ordering.
//!
//! A frame is three passes, always in the order of [`Pass::SCHEDULE`]:
//!
//! 1. [`Pass::Decay`] - clear the heat write grid to its baseline, decay or
//!    clear the energy grid.
//! 2. [`Pass::Update`] - heat rule over every cell, flow rule over every
//!    particle (with energy accumulation).
//! 3. [`Pass::Draw`] - map heat and energy to their output images.
//!
//! [`PassExecutor::run`] returning is the barrier: a pass has completed
//! across all of its invocations before the next pass starts. After the last
//! pass the dispatcher flips the ping-pong roles, so the grid written this
//! frame is read next frame.

use crate::grid::{GridRoles, Slot};

/// One simulation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pass {
    Decay,
    Update,
    Draw,
}

impl Pass {
    /// Order of passes within a frame.
    pub const SCHEDULE: [Pass; 3] = [Pass::Decay, Pass::Update, Pass::Draw];

    pub fn label(self) -> &'static str {
        match self {
            Pass::Decay => "decay",
            Pass::Update => "update",
            Pass::Draw => "draw",
        }
    }
}

/// Per-frame values every pass sees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameContext {
    /// Frames dispatched before this one.
    pub index: u64,
    /// The `time` uniform.
    pub time: f32,
    /// Which heat grid is "previous" and which is "next".
    pub heat: GridRoles,
}

/// Runs passes on some backend.
pub trait PassExecutor {
    /// Called once before the first pass of a frame.
    fn begin_frame(&mut self, _ctx: &FrameContext) {}

    /// Run `pass` to completion.
    fn run(&mut self, pass: Pass, ctx: &FrameContext);

    /// Called once after the last pass of a frame.
    fn end_frame(&mut self, _ctx: &FrameContext) {}
}

/// Drives an executor through frames and owns the cross-frame state: the
/// frame index, the readable heat slot and the latest time.
pub struct FrameDispatcher<E> {
    executor: E,
    frame_index: u64,
    readable: Slot,
    time: f32,
}

impl<E: PassExecutor> FrameDispatcher<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            frame_index: 0,
            readable: Slot::A,
            time: 0.0,
        }
    }

    /// Run one frame at `time` and return the context it ran with.
    ///
    /// `time` is expected to be finite and non-decreasing; an earlier or
    /// non-finite time is replaced by the latest one seen.
    pub fn dispatch(&mut self, time: f32) -> FrameContext {
        let time = if !time.is_finite() || time < self.time {
            log::warn!(
                "Frame {} time {} is not after {}, holding time",
                self.frame_index,
                time,
                self.time
            );
            self.time
        } else {
            time
        };
        self.time = time;

        let ctx = FrameContext {
            index: self.frame_index,
            time,
            heat: GridRoles::reading(self.readable),
        };

        self.executor.begin_frame(&ctx);
        for pass in Pass::SCHEDULE {
            self.executor.run(pass, &ctx);
        }
        self.executor.end_frame(&ctx);

        self.readable = ctx.heat.write();
        self.frame_index += 1;
        log::trace!("Frame {} done at t={:.3}", ctx.index, time);
        ctx
    }

    /// Frames dispatched so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Heat slot holding the most recent grid.
    pub fn readable(&self) -> Slot {
        self.readable
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }
}
