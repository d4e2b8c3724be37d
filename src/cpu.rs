//! Host-memory backend.
//!
//! Runs every pass with rayon over plain buffers. The parallel call
//! returning is the pass barrier. Used for headless rendering and as the
//! reference the GPU backend is compared against.

use crate::config::SimConfig;
use crate::dispatch::{FrameContext, Pass, PassExecutor};
use crate::energy::EnergyAccumulator;
use crate::error::ConfigError;
use crate::flow::ParticleFlowSystem;
use crate::grid::{GridSize, PingPong, Slot};
use crate::heat::HeatGridSimulator;
use crate::particle::{spawn_pool, Particle};

/// Heat grids, particles, energy and output images in host memory.
pub struct CpuExecutor {
    size: GridSize,
    heat: Option<HeatGridSimulator>,
    heat_grids: PingPong<Vec<f32>>,
    heat_image: Vec<u32>,
    flow: Option<ParticleFlowSystem>,
    particles: Vec<Particle>,
    energy: Option<EnergyAccumulator>,
    energy_image: Vec<u32>,
}

impl CpuExecutor {
    /// Allocate every buffer the configuration needs. Particles are spawned
    /// from `config.seed`.
    pub fn new(config: &SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let size = config.size;
        let cells = size.cells();

        let heat = config
            .heat
            .clone()
            .map(|c| HeatGridSimulator::new(c, size))
            .transpose()?;
        let (heat_grids, heat_image) = match &heat {
            Some(h) => (PingPong::splat(vec![h.config().baseline; cells]), vec![0; cells]),
            None => (PingPong::splat(Vec::new()), Vec::new()),
        };

        let (flow, particles, energy, energy_image) = match &config.flow {
            Some(fc) => {
                let particles = spawn_pool(fc.particle_count, size, config.seed);
                let energy = fc
                    .energy
                    .map(|e| EnergyAccumulator::new(e, size))
                    .transpose()?;
                let image = if energy.is_some() { vec![0; cells] } else { Vec::new() };
                let flow = ParticleFlowSystem::new(fc.clone(), size)?;
                (Some(flow), particles, energy, image)
            }
            None => (None, Vec::new(), None, Vec::new()),
        };

        log::info!(
            "CPU backend: {}x{} grid, heat {}, {} particles, energy {}",
            size.width,
            size.height,
            if heat.is_some() { "on" } else { "off" },
            particles.len(),
            if energy.is_some() { "on" } else { "off" },
        );

        Ok(Self {
            size,
            heat,
            heat_grids,
            heat_image,
            flow,
            particles,
            energy,
            energy_image,
        })
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn heat(&self) -> Option<&HeatGridSimulator> {
        self.heat.as_ref()
    }

    /// Heat grid in `slot`. Empty without a heat effect.
    pub fn heat_grid(&self, slot: Slot) -> &[f32] {
        self.heat_grids.get(slot)
    }

    /// Overwrite the heat grid in `slot`, e.g. to start from a custom field.
    pub fn heat_grid_mut(&mut self, slot: Slot) -> &mut [f32] {
        self.heat_grids.get_mut(slot)
    }

    pub fn heat_image(&self) -> &[u32] {
        &self.heat_image
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn energy(&self) -> Option<&EnergyAccumulator> {
        self.energy.as_ref()
    }

    pub fn energy_image(&self) -> &[u32] {
        &self.energy_image
    }
}

impl PassExecutor for CpuExecutor {
    fn run(&mut self, pass: Pass, ctx: &FrameContext) {
        match pass {
            Pass::Decay => {
                if let Some(heat) = &self.heat {
                    heat.clear(self.heat_grids.get_mut(ctx.heat.write()));
                }
                if let Some(energy) = &mut self.energy {
                    energy.decay();
                }
            }
            Pass::Update => {
                if let Some(heat) = &self.heat {
                    let (prev, next) = self.heat_grids.split(ctx.heat);
                    heat.update(prev, next, ctx.time);
                }
                if let Some(flow) = &self.flow {
                    flow.update(&mut self.particles, ctx.time, self.energy.as_ref());
                }
            }
            Pass::Draw => {
                if let Some(heat) = &self.heat {
                    heat.draw(self.heat_grids.get(ctx.heat.write()), &mut self.heat_image);
                }
                if let Some(energy) = &mut self.energy {
                    energy.draw(&mut self.energy_image);
                }
            }
        }
    }

    fn end_frame(&mut self, ctx: &FrameContext) {
        if let Some(energy) = &self.energy {
            log::debug!("Frame {}: energy total {}", ctx.index, energy.total());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::FrameDispatcher;
    use crate::heat::HeatConfig;

    #[test]
    fn test_fire_frames() {
        let config = SimConfig::fire(32, 24);
        let mut dispatcher = FrameDispatcher::new(CpuExecutor::new(&config).unwrap());
        for frame in 0..10 {
            dispatcher.dispatch(frame as f32 / 60.0);
        }
        let exec = dispatcher.executor();
        let grid = exec.heat_grid(dispatcher.readable());
        // Fuel rose into the second-to-last row; the bottom row is baseline.
        assert!(grid[32 * 22..32 * 23].iter().all(|t| *t == 1.0));
        assert!(grid[32 * 23..].iter().all(|t| *t == 0.0));
        assert_eq!(exec.heat_image().len(), 32 * 24);
        assert!(exec.energy().is_none());
    }

    #[test]
    fn test_heat_reads_previous_frame() {
        let config = SimConfig::new(4, 4).with_heat(HeatConfig::new().with_cooling(0.0));
        let mut exec = CpuExecutor::new(&config).unwrap();
        exec.heat_grid_mut(Slot::A).fill(0.5);
        exec.heat_grid_mut(Slot::A)[12..].fill(1.0);

        let mut dispatcher = FrameDispatcher::new(exec);
        dispatcher.dispatch(0.0);
        assert_eq!(dispatcher.readable(), Slot::B);
        let grid = dispatcher.executor().heat_grid(Slot::B);
        assert!(grid[8..12].iter().all(|t| *t == 1.0));
        assert!(grid[4..8].iter().all(|t| (*t - 0.625).abs() < 1e-6));
    }

    #[test]
    fn test_flow_energy_per_frame() {
        let config = SimConfig::flow(64, 48).with_particle_count(3_000).with_seed(9);
        let mut dispatcher = FrameDispatcher::new(CpuExecutor::new(&config).unwrap());
        for frame in 0..5 {
            dispatcher.dispatch(frame as f32 / 60.0);
            // Energy is cleared at the start of every frame.
            assert_eq!(dispatcher.executor().energy().unwrap().total(), 3_000);
        }
    }

    #[test]
    fn test_trails_keep_alpha() {
        let config = SimConfig::trails(64, 48).with_particle_count(500);
        let mut dispatcher = FrameDispatcher::new(CpuExecutor::new(&config).unwrap());
        for frame in 0..20 {
            dispatcher.dispatch(frame as f32 / 60.0);
        }
        let energy = dispatcher.executor().energy().unwrap();
        let faded = energy.trail_alpha().iter().filter(|a| **a > 0.0 && **a < 1.0).count();
        assert!(faded > 0);
        assert!(energy.trail_alpha().iter().all(|a| (0.0..=1.0).contains(a)));
    }

    #[test]
    fn test_invalid_config() {
        assert!(CpuExecutor::new(&SimConfig::new(8, 8)).is_err());
    }
}
