//! Simulation configuration.
//!
//! A [`SimConfig`] bundles the grid resolution with the effects that run on
//! it: an optional heat grid ([`HeatConfig`]) and an optional particle
//! effect ([`FlowConfig`]). The presets cover the three effects shipped with
//! the crate:
//!
//! | Preset | Heat grid | Particles | Noise | Boundary | Energy decay |
//! |---|---|---|---|---|---|
//! | [`SimConfig::fire`] | yes | - | gradient + simplex | - | - |
//! | [`SimConfig::trails`] | - | yes | gradient | wrap | fade `0.999` |
//! | [`SimConfig::flow`] | - | yes | simplex | respawn | clear |
//!
//! ```ignore
//! let config = SimConfig::flow(1280, 720)
//!     .with_seed(7)
//!     .with_heat(HeatConfig::new().with_cooling(0.5));
//! config.validate()?;
//! ```

pub use crate::energy::{DecayMode, EnergyConfig};
pub use crate::flow::{BoundaryPolicy, FlowConfig};
pub use crate::heat::HeatConfig;

use crate::error::ConfigError;
use crate::grid::GridSize;

/// Default resolution of the presets' callers.
pub const DEFAULT_SIZE: GridSize = GridSize::new(1280, 720);

/// Particles in the [`SimConfig::trails`] preset.
pub const TRAIL_PARTICLES: u32 = 20_000;

/// Particles in the [`SimConfig::flow`] preset.
pub const FLOW_PARTICLES: u32 = 100_000;

pub(crate) fn check_finite(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter { name, value })
    }
}

/// Everything needed to build a simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    pub size: GridSize,
    pub heat: Option<HeatConfig>,
    pub flow: Option<FlowConfig>,
    /// Seed for spawning the particle pool.
    pub seed: u64,
}

impl SimConfig {
    /// An empty configuration. Add at least one effect before validating.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: GridSize::new(width, height),
            heat: None,
            flow: None,
            seed: 0,
        }
    }

    /// Heat-diffusion fire.
    pub fn fire(width: u32, height: u32) -> Self {
        Self::new(width, height).with_heat(HeatConfig::new())
    }

    /// Wrapping particles leaving fading trails.
    pub fn trails(width: u32, height: u32) -> Self {
        Self::new(width, height).with_flow(FlowConfig::trails(TRAIL_PARTICLES))
    }

    /// Respawning particles accumulating energy that is cleared every frame.
    pub fn flow(width: u32, height: u32) -> Self {
        Self::new(width, height).with_flow(FlowConfig::flow(FLOW_PARTICLES))
    }

    /// Look up a preset by name (`fire`, `trails`, `flow`).
    pub fn preset(name: &str, width: u32, height: u32) -> Option<Self> {
        match name {
            "fire" => Some(Self::fire(width, height)),
            "trails" => Some(Self::trails(width, height)),
            "flow" => Some(Self::flow(width, height)),
            _ => None,
        }
    }

    pub fn with_heat(mut self, heat: HeatConfig) -> Self {
        self.heat = Some(heat);
        self
    }

    pub fn with_flow(mut self, flow: FlowConfig) -> Self {
        self.flow = Some(flow);
        self
    }

    /// Replace the particle count of the configured effect. No-op without
    /// one.
    pub fn with_particle_count(mut self, count: u32) -> Self {
        if let Some(flow) = &mut self.flow {
            flow.particle_count = count;
        }
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Whether the particle effect writes energy.
    pub fn has_energy(&self) -> bool {
        self.flow.as_ref().is_some_and(|f| f.energy.is_some())
    }

    /// Check the configuration can be simulated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let GridSize { width, height } = self.size;
        if width == 0 || height == 0 {
            return Err(ConfigError::ZeroResolution { width, height });
        }
        let cells = width as u64 * height as u64;
        if cells > u32::MAX as u64 || width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(ConfigError::GridTooLarge { width, height });
        }
        if self.heat.is_none() && self.flow.is_none() {
            return Err(ConfigError::NothingToSimulate);
        }
        if let Some(heat) = &self.heat {
            heat.validate(self.size)?;
        }
        if let Some(flow) = &self.flow {
            flow.validate()?;
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::fire(DEFAULT_SIZE.width, DEFAULT_SIZE.height)
    }
}
