//! Shared visitation counters written by particles.
//!
//! Every grid cell holds an unsigned counter. Particles bump the counter of
//! the cell they land in with an atomic increment, so any number of
//! concurrent writers can hit the same cell without losing updates. Once per
//! frame the [`DecayMode`] resets or fades the accumulated state, and the
//! draw pass tone-maps it into an image.

use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec4;
use rayon::prelude::*;

use crate::config::check_finite;
use crate::error::ConfigError;
use crate::grid::GridSize;
use crate::image_out::pack_rgba8;

/// Counter value that draws as full white in [`DecayMode::Clear`].
pub const DRAW_SCALE: f32 = 1000.0;

/// How accumulated energy leaves the grid each frame.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum DecayMode {
    /// Counters are stored back to zero every frame.
    #[default]
    Clear,
    /// Each cell keeps a trail alpha multiplied by `retention` every frame.
    /// A cell visited this frame is drawn at full alpha.
    Fade { retention: f32 },
}

impl DecayMode {
    /// Soft decay with the default retention of `0.999`.
    pub const fn fade() -> Self {
        DecayMode::Fade { retention: 0.999 }
    }
}

/// Decay and colouring of the energy grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnergyConfig {
    pub decay: DecayMode,
    /// Colour of a cell with no energy.
    pub base_tint: Vec4,
    /// Colour added at full trail alpha ([`DecayMode::Fade`] only).
    pub particle_tint: Vec4,
}

impl EnergyConfig {
    pub fn new(decay: DecayMode) -> Self {
        Self {
            decay,
            base_tint: Vec4::new(0.02, 0.02, 0.05, 1.0),
            particle_tint: Vec4::new(1.0, 0.55, 0.2, 1.0),
        }
    }

    pub fn with_base_tint(mut self, tint: Vec4) -> Self {
        self.base_tint = tint;
        self
    }

    pub fn with_particle_tint(mut self, tint: Vec4) -> Self {
        self.particle_tint = tint;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if let DecayMode::Fade { retention } = self.decay {
            check_finite("energy.retention", retention)?;
            if !(0.0..=1.0).contains(&retention) {
                return Err(ConfigError::InvalidParameter {
                    name: "energy.retention",
                    value: retention,
                });
            }
        }
        for v in self.base_tint.to_array().into_iter().chain(self.particle_tint.to_array()) {
            check_finite("energy.tint", v)?;
        }
        Ok(())
    }
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self::new(DecayMode::Clear)
    }
}

/// Colour of a cell in [`DecayMode::Clear`]: linear in the counter.
#[inline]
pub fn energy_color(base_tint: Vec4, energy: u32) -> Vec4 {
    base_tint + Vec4::splat(energy as f32 / DRAW_SCALE)
}

/// Colour of a cell in [`DecayMode::Fade`].
#[inline]
pub fn trail_color(base_tint: Vec4, particle_tint: Vec4, alpha: f32) -> Vec4 {
    base_tint + particle_tint * alpha
}

/// Energy counters and trail alpha over the grid.
pub struct EnergyAccumulator {
    config: EnergyConfig,
    size: GridSize,
    counters: Vec<AtomicU32>,
    trail: Vec<f32>,
}

impl EnergyAccumulator {
    pub fn new(config: EnergyConfig, size: GridSize) -> Result<Self, ConfigError> {
        config.validate()?;
        let cells = size.cells();
        Ok(Self {
            config,
            size,
            counters: (0..cells).map(|_| AtomicU32::new(0)).collect(),
            trail: vec![0.0; cells],
        })
    }

    pub fn config(&self) -> &EnergyConfig {
        &self.config
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Add one to the counter of cell `index`.
    ///
    /// Safe to call from any number of threads at once.
    #[inline]
    pub fn accumulate(&self, index: usize) {
        self.counters[index].fetch_add(1, Ordering::Relaxed);
    }

    /// Add one to the counter under grid coordinate `(x, y)`.
    #[inline]
    pub fn accumulate_at(&self, x: u32, y: u32) {
        self.accumulate(self.size.index(x, y));
    }

    #[inline]
    pub fn load(&self, index: usize) -> u32 {
        self.counters[index].load(Ordering::Relaxed)
    }

    /// Sum of all counters.
    pub fn total(&self) -> u64 {
        self.counters
            .par_iter()
            .map(|c| c.load(Ordering::Relaxed) as u64)
            .sum()
    }

    /// Copy of every counter, row-major.
    pub fn counters(&self) -> Vec<u32> {
        self.counters
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect()
    }

    /// Trail alpha of cell `index`.
    #[inline]
    pub fn trail(&self, index: usize) -> f32 {
        self.trail[index]
    }

    pub fn trail_alpha(&self) -> &[f32] {
        &self.trail
    }

    /// Per-frame decay pass.
    ///
    /// Counters always restart from zero; in [`DecayMode::Fade`] the trail
    /// alpha is also scaled by the retention factor.
    pub fn decay(&mut self) {
        self.counters
            .par_iter()
            .for_each(|c| c.store(0, Ordering::Relaxed));

        if let DecayMode::Fade { retention } = self.config.decay {
            self.trail.par_iter_mut().for_each(|a| *a *= retention);
        }
    }

    /// Colour of cell `index` from the current state. Does not mark trails.
    pub fn cell_color(&self, index: usize) -> Vec4 {
        match self.config.decay {
            DecayMode::Clear => energy_color(self.config.base_tint, self.load(index)),
            DecayMode::Fade { .. } => {
                let alpha = if self.load(index) > 0 {
                    1.0
                } else {
                    self.trail[index]
                };
                trail_color(self.config.base_tint, self.config.particle_tint, alpha)
            }
        }
    }

    /// Draw pass into packed RGBA8 `image`.
    ///
    /// In [`DecayMode::Fade`] a visited cell first has its trail alpha raised
    /// to `1.0`.
    pub fn draw(&mut self, image: &mut [u32]) {
        debug_assert_eq!(image.len(), self.size.cells());

        let config = self.config;
        let counters = &self.counters;
        match config.decay {
            DecayMode::Clear => {
                image.par_iter_mut().enumerate().for_each(|(i, px)| {
                    let e = counters[i].load(Ordering::Relaxed);
                    *px = pack_rgba8(energy_color(config.base_tint, e));
                });
            }
            DecayMode::Fade { .. } => {
                image
                    .par_iter_mut()
                    .zip(self.trail.par_iter_mut())
                    .enumerate()
                    .for_each(|(i, (px, alpha))| {
                        if counters[i].load(Ordering::Relaxed) > 0 {
                            *alpha = 1.0;
                        }
                        let color = trail_color(config.base_tint, config.particle_tint, *alpha);
                        *px = pack_rgba8(color);
                    });
            }
        }
    }
}
