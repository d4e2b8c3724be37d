//! Noise-steered particle advection.
//!
//! Each frame a particle samples the noise field at its (scaled) position,
//! turns the sample into a heading, eases its velocity toward that heading
//! and moves. Particles that leave the grid are put back by the configured
//! [`BoundaryPolicy`], so positions always lie in `[0, width) x [0, height)`.

use std::f32::consts::PI;

use glam::Vec2;
use rayon::prelude::*;

use crate::config::check_finite;
use crate::energy::{DecayMode, EnergyAccumulator, EnergyConfig};
use crate::error::ConfigError;
use crate::grid::{GridSize, PARTICLE_WORKGROUP};
use crate::noise::{NoiseField, NoiseKind, NoiseSource};
use crate::particle::Particle;
use crate::prng::Prng;

/// What happens to a particle that leaves the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BoundaryPolicy {
    /// Per axis: past the upper bound resets to `0`, below `0` resets to
    /// just under the upper bound.
    #[default]
    Wrap,
    /// Outside on any axis: new random position in the grid and a new random
    /// velocity in `[-1, 1]^2`, drawn from the particle's own seed.
    Respawn,
}

/// Parameters of one particle effect.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowConfig {
    /// Fixed pool size.
    pub particle_count: u32,
    /// Field steering the particles.
    pub noise: NoiseField,
    /// Positions are divided by this before the frequency divisor.
    pub position_scale: f32,
    /// Second domain divisor, tuned per effect.
    pub frequency_div: f32,
    /// Velocity smoothing factor.
    pub smoothing: f32,
    /// Position integration scale.
    pub step_scale: f32,
    pub boundary: BoundaryPolicy,
    /// Energy grid the particles write into, if any.
    pub energy: Option<EnergyConfig>,
}

impl FlowConfig {
    /// Trail effect: gradient noise, unit steps, wrapping, fading trails.
    pub fn trails(particle_count: u32) -> Self {
        Self {
            particle_count,
            noise: NoiseField::new(NoiseKind::Gradient),
            position_scale: 100.0,
            frequency_div: 5.0,
            smoothing: 0.01,
            step_scale: 1.0,
            boundary: BoundaryPolicy::Wrap,
            energy: Some(EnergyConfig::new(DecayMode::fade())),
        }
    }

    /// Flow-field effect: simplex noise, damped steps, respawning,
    /// energy cleared every frame.
    pub fn flow(particle_count: u32) -> Self {
        Self {
            particle_count,
            noise: NoiseField::new(NoiseKind::Simplex),
            position_scale: 100.0,
            frequency_div: 2.8,
            smoothing: 0.01,
            step_scale: 0.3,
            boundary: BoundaryPolicy::Respawn,
            energy: Some(EnergyConfig::new(DecayMode::Clear)),
        }
    }

    pub fn with_noise(mut self, noise: NoiseField) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_step_scale(mut self, step_scale: f32) -> Self {
        self.step_scale = step_scale;
        self
    }

    /// Set the velocity smoothing factor (clamped to `[0, 1]`).
    pub fn with_smoothing(mut self, smoothing: f32) -> Self {
        self.smoothing = smoothing.clamp(0.0, 1.0);
        self
    }

    pub fn with_boundary(mut self, boundary: BoundaryPolicy) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_energy(mut self, energy: Option<EnergyConfig>) -> Self {
        self.energy = energy;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.particle_count == 0 {
            return Err(ConfigError::EmptyParticlePool);
        }
        check_finite("flow.step_scale", self.step_scale)?;
        check_finite("flow.smoothing", self.smoothing)?;
        check_finite("flow.noise.scroll.x", self.noise.scroll.x)?;
        check_finite("flow.noise.scroll.y", self.noise.scroll.y)?;
        for (name, value) in [
            ("flow.position_scale", self.position_scale),
            ("flow.frequency_div", self.frequency_div),
        ] {
            check_finite(name, value)?;
            if value <= 0.0 {
                return Err(ConfigError::InvalidParameter { name, value });
            }
        }
        if let Some(energy) = &self.energy {
            energy.validate()?;
        }
        Ok(())
    }
}

/// Largest `f32` strictly below a positive `bound`.
#[inline]
pub fn below(bound: f32) -> f32 {
    f32::from_bits(bound.to_bits() - 1)
}

#[inline]
/// Non-finite coordinates are out of range and land on `0`.
#[inline]
fn wrap_axis(v: f32, bound: f32) -> f32 {
    if v < 0.0 {
        below(bound)
    } else if v < bound {
        v
    } else {
        0.0
    }
}

/// Advances particles through a noise field.
pub struct ParticleFlowSystem<N = NoiseField> {
    config: FlowConfig,
    size: GridSize,
    noise: N,
}

impl ParticleFlowSystem<NoiseField> {
    pub fn new(config: FlowConfig, size: GridSize) -> Result<Self, ConfigError> {
        let noise = config.noise;
        Self::with_noise(config, size, noise)
    }
}

impl<N: NoiseSource> ParticleFlowSystem<N> {
    /// Steer with `noise` instead of the configured field.
    pub fn with_noise(config: FlowConfig, size: GridSize, noise: N) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            size,
            noise,
        })
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Advance one particle. Returns the grid cell it lands in.
    pub fn step(&self, particle: &mut Particle, time: f32) -> (u32, u32) {
        let cfg = &self.config;
        let n = self
            .noise
            .sample(particle.position / cfg.position_scale / cfg.frequency_div, time);
        let angle = n * PI;
        let dir = Vec2::new(angle.cos(), angle.sin());

        particle.velocity = particle.velocity * (1.0 - cfg.smoothing) + dir * cfg.smoothing;
        particle.position += particle.velocity * cfg.step_scale;

        self.apply_boundary(particle);

        let (w, h) = (self.size.width, self.size.height);
        let x = (particle.position.x as u32).min(w - 1);
        let y = (particle.position.y as u32).min(h - 1);
        (x, y)
    }

    fn apply_boundary(&self, particle: &mut Particle) {
        let bounds = Vec2::new(self.size.width as f32, self.size.height as f32);
        match self.config.boundary {
            BoundaryPolicy::Wrap => {
                particle.position = Vec2::new(
                    wrap_axis(particle.position.x, bounds.x),
                    wrap_axis(particle.position.y, bounds.y),
                );
            }
            BoundaryPolicy::Respawn => {
                let p = particle.position;
                let inside = p.x >= 0.0 && p.y >= 0.0 && p.x < bounds.x && p.y < bounds.y;
                if !inside {
                    let mut rng = Prng::new(&mut particle.seed);
                    let x = (rng.next_f32() * bounds.x).min(below(bounds.x));
                    let y = (rng.next_f32() * bounds.y).min(below(bounds.y));
                    let vx = rng.next_range(-1.0, 1.0);
                    let vy = rng.next_range(-1.0, 1.0);
                    particle.position = Vec2::new(x, y);
                    particle.velocity = Vec2::new(vx, vy);
                }
            }
        }
    }

    /// Update pass over the whole pool, in particle batches.
    ///
    /// Each particle is owned by exactly one invocation; the only shared
    /// write is the atomic increment into `energy`.
    pub fn update(
        &self,
        particles: &mut [Particle],
        time: f32,
        energy: Option<&EnergyAccumulator>,
    ) {
        particles
            .par_chunks_mut(PARTICLE_WORKGROUP as usize)
            .for_each(|batch| {
                for particle in batch {
                    let (x, y) = self.step(particle, time);
                    if let Some(energy) = energy {
                        energy.accumulate_at(x, y);
                    }
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::spawn_pool;

    const SIZE: GridSize = GridSize::new(1280, 720);

    fn zero_noise(_: Vec2, _: f32) -> f32 {
        0.0
    }

    #[test]
    fn test_single_particle_step() {
        let sys = ParticleFlowSystem::with_noise(FlowConfig::flow(1), SIZE, zero_noise).unwrap();
        let mut p = Particle::new(Vec2::new(640.0, 360.0), Vec2::ZERO, 42);
        sys.step(&mut p, 0.0);

        assert!((p.velocity.x - 0.01).abs() < 1e-6);
        assert_eq!(p.velocity.y, 0.0);
        assert!((p.position.x - 640.003).abs() < 1e-4);
        assert_eq!(p.position.y, 360.0);
        assert_eq!(p.seed, 42);

        let trails =
            ParticleFlowSystem::with_noise(FlowConfig::trails(1), SIZE, zero_noise).unwrap();
        let mut p = Particle::new(Vec2::new(640.0, 360.0), Vec2::ZERO, 42);
        trails.step(&mut p, 0.0);
        assert!((p.position.x - 640.01).abs() < 1e-4);
    }

    #[test]
    fn test_wrap_at_upper_bound() {
        let sys = ParticleFlowSystem::with_noise(
            FlowConfig::trails(1).with_smoothing(0.0),
            SIZE,
            zero_noise,
        )
        .unwrap();
        let mut p = Particle::new(Vec2::new(1280.0, 360.0), Vec2::ZERO, 0);
        sys.step(&mut p, 0.0);
        assert_eq!(p.position.x, 0.0);
        assert_eq!(p.position.y, 360.0);
    }

    #[test]
    fn test_wrap_below_zero() {
        // n = 1 heads along -x.
        let sys =
            ParticleFlowSystem::with_noise(FlowConfig::trails(1), SIZE, |_: Vec2, _: f32| 1.0)
                .unwrap();
        let mut p = Particle::new(Vec2::new(0.0, 10.0), Vec2::new(-1.0, 0.0), 0);
        sys.step(&mut p, 0.0);
        assert!(p.position.x < 1280.0);
        assert!(p.position.x > 1279.99);
    }

    #[test]
    fn test_non_finite_positions_contained() {
        assert_eq!(wrap_axis(f32::NAN, 1280.0), 0.0);
        assert_eq!(wrap_axis(f32::INFINITY, 1280.0), 0.0);
        assert_eq!(wrap_axis(f32::NEG_INFINITY, 1280.0), below(1280.0));

        let nan_noise = |_: Vec2, _: f32| f32::NAN;
        for config in [FlowConfig::trails(1), FlowConfig::flow(1)] {
            let sys = ParticleFlowSystem::with_noise(config, SIZE, nan_noise).unwrap();
            let mut p = Particle::new(Vec2::new(640.0, 360.0), Vec2::ZERO, 9);
            let (x, y) = sys.step(&mut p, 0.0);
            assert!(p.position.x >= 0.0 && p.position.x < 1280.0, "{:?}", p.position);
            assert!(p.position.y >= 0.0 && p.position.y < 720.0, "{:?}", p.position);
            assert!(x < 1280 && y < 720);
        }
    }

    #[test]
    fn test_below() {
        for bound in [1.0, 720.0, 1024.0, 1280.0] {
            let b = below(bound);
            assert!(b < bound);
            assert!(b > bound - 0.001);
        }
    }

    #[test]
    fn test_respawn_uses_own_seed() {
        let sys = ParticleFlowSystem::with_noise(FlowConfig::flow(1), SIZE, zero_noise).unwrap();
        let mut p = Particle::new(Vec2::new(1279.999, 100.0), Vec2::new(1.0, 0.0), 42);
        sys.step(&mut p, 0.0);

        assert_ne!(p.seed, 42);
        let mut seed = 42;
        let mut rng = Prng::new(&mut seed);
        let x = (rng.next_f32() * 1280.0).min(below(1280.0));
        let y = (rng.next_f32() * 720.0).min(below(720.0));
        let vx = rng.next_range(-1.0, 1.0);
        let vy = rng.next_range(-1.0, 1.0);
        assert_eq!(p.position, Vec2::new(x, y));
        assert_eq!(p.velocity, Vec2::new(vx, vy));
        assert_eq!(p.seed, seed);
    }

    #[test]
    fn test_containment_many_steps() {
        let size = GridSize::new(96, 54);
        for config in [FlowConfig::trails(2_000), FlowConfig::flow(2_000)] {
            let sys = ParticleFlowSystem::new(config.with_step_scale(7.5), size).unwrap();
            let mut pool = spawn_pool(2_000, size, 11);
            for frame in 0..300 {
                sys.update(&mut pool, frame as f32 / 60.0, None);
                for p in &pool {
                    assert!(p.position.x >= 0.0 && p.position.x < 96.0, "{:?}", p.position);
                    assert!(p.position.y >= 0.0 && p.position.y < 54.0, "{:?}", p.position);
                }
            }
        }
    }

    #[test]
    fn test_update_accumulates_one_per_particle() {
        let size = GridSize::new(64, 64);
        let config = FlowConfig::flow(1_000);
        let energy = EnergyAccumulator::new(config.energy.unwrap(), size).unwrap();
        let sys = ParticleFlowSystem::new(config, size).unwrap();
        let mut pool = spawn_pool(1_000, size, 5);

        sys.update(&mut pool, 0.0, Some(&energy));
        assert_eq!(energy.total(), 1_000);
        for p in &pool {
            let (x, y) = size.cell_at(p.position.x, p.position.y).unwrap();
            assert!(energy.load(size.index(x, y)) > 0);
        }
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert_eq!(
            ParticleFlowSystem::new(FlowConfig::flow(0), SIZE).err(),
            Some(ConfigError::EmptyParticlePool)
        );
    }
}
