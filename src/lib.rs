//! # Emberflow
//!
//! Per-frame compute kernels for two 2D effects: a heat-diffusion fire grid
//! and a noise-driven particle flow field that deposits energy into a
//! screen-sized grid.
//!
//! Every effect runs as the same three passes per frame: `Decay`, `Update`
//! and `Draw`. A [`FrameDispatcher`] issues them in order against a
//! [`PassExecutor`], either the rayon-backed [`CpuExecutor`] or the wgpu
//! [`GpuExecutor`](gpu::GpuExecutor).
//!
//! ## Quick Start
//!
//! ```ignore
//! use emberflow::prelude::*;
//!
//! let config = SimConfig::fire(320, 180);
//! let mut dispatcher = FrameDispatcher::new(CpuExecutor::new(&config)?);
//! let mut clock = FrameClock::fixed(1.0 / 60.0);
//!
//! for _ in 0..120 {
//!     dispatcher.dispatch(clock.tick());
//! }
//!
//! let frame = dispatcher.executor().heat_image();
//! save_png("fire.png", config.size, frame)?;
//! ```
//!
//! ## Heat grid
//!
//! Two float grids swap roles every frame. Each cell of the next grid is
//! the mean of the previous grid around the cell `rise` rows below,
//! darkened by two scrolling noise layers that are strongest at the top.
//! The bottom rows are held at full heat.
//!
//! ## Particle flow
//!
//! Each particle samples a noise field at its position, turns the sample
//! into a heading, blends that into its velocity and steps. Particles that
//! leave the screen wrap around or respawn from their own hash state. The
//! cell under every particle gets one atomic increment per frame, which the
//! energy pass turns into an image.

pub mod config;
pub mod cpu;
pub mod dispatch;
pub mod energy;
pub mod error;
pub mod flow;
pub mod gpu;
pub mod grid;
pub mod heat;
pub mod image_out;
pub mod noise;
pub mod particle;
pub mod prng;
pub mod shader_utils;
pub mod time;

pub use glam::{Vec2, Vec4};

pub use config::SimConfig;
pub use cpu::CpuExecutor;
pub use dispatch::{FrameContext, FrameDispatcher, Pass, PassExecutor};
pub use error::{ConfigError, GpuError, OutputError, SimulationError};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use emberflow::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{
        BoundaryPolicy, DecayMode, EnergyConfig, FlowConfig, HeatConfig, SimConfig,
    };
    pub use crate::cpu::CpuExecutor;
    pub use crate::dispatch::{FrameContext, FrameDispatcher, Pass, PassExecutor};
    pub use crate::energy::EnergyAccumulator;
    pub use crate::error::{ConfigError, GpuError, OutputError, SimulationError};
    pub use crate::flow::ParticleFlowSystem;
    pub use crate::gpu::{GpuContext, GpuExecutor};
    pub use crate::grid::{GridRoles, GridSize, Slot};
    pub use crate::heat::HeatGridSimulator;
    pub use crate::image_out::save_png;
    pub use crate::noise::{NoiseField, NoiseKind, NoiseSource};
    pub use crate::particle::Particle;
    pub use crate::time::FrameClock;
    pub use crate::{Vec2, Vec4};
}
