//! Heat-diffusion fire on a 2D grid.
//!
//! Each frame every cell of the "previous" grid produces one value for the
//! "next" grid:
//!
//! 1. **Diffuse** - average of the four axis neighbours (clamp-to-edge).
//! 2. **Cool** - subtract `|noise| * ((height - y) / height)^2`, where the
//!    noise is the sum of two scrolled noise fields sampled at
//!    `frequency * position / resolution`. Cooling is strongest at the top.
//! 3. **Inject** - the bottom [`HeatConfig::fuel_rows`] rows are forced to
//!    `1.0`, the fuel source.
//! 4. **Rise** - the value lands [`HeatConfig::rise`] rows higher in the next
//!    grid. Values shifted above the top row are discarded.
//!
//! Cells of the next grid that nothing rises into keep
//! [`HeatConfig::baseline`], which the clear pass writes before the update.
//!
//! Row `0` is the top of the image; "up" is decreasing `y`.

use glam::{Vec2, Vec4};
use rayon::prelude::*;

use crate::config::check_finite;
use crate::error::ConfigError;
use crate::grid::GridSize;
use crate::image_out::pack_rgba8;
use crate::noise::{NoiseField, NoiseKind};

/// Configuration for the fire heat grid.
#[derive(Clone, Debug, PartialEq)]
pub struct HeatConfig {
    /// Domain compression of the cooling noise: the grid spans
    /// `frequency` noise units on each axis.
    pub frequency: f32,
    /// First cooling noise field.
    pub noise_a: NoiseField,
    /// Second cooling noise field, sampled at an offset domain.
    pub noise_b: NoiseField,
    /// Domain offset of `noise_b` so the two samples decorrelate.
    pub noise_b_offset: Vec2,
    /// Multiplier on the cooling term. `0.0` disables cooling.
    pub cooling_strength: f32,
    /// Number of bottom rows forced to full heat.
    pub fuel_rows: u32,
    /// Rows a value moves up per frame.
    pub rise: u32,
    /// Value of next-grid cells that receive no write in a frame.
    pub baseline: f32,
}

impl HeatConfig {
    /// Default fire: gradient noise scrolling at `0.2`, simplex noise at
    /// `0.3`, frequency 13, one fuel row, rise of one row per frame.
    pub fn new() -> Self {
        Self {
            frequency: 13.0,
            noise_a: NoiseField::new(NoiseKind::Gradient).with_scroll(Vec2::new(0.0, 0.2)),
            noise_b: NoiseField::new(NoiseKind::Simplex).with_scroll(Vec2::new(0.0, 0.3)),
            noise_b_offset: Vec2::new(5.2, 1.3),
            cooling_strength: 1.0,
            fuel_rows: 1,
            rise: 1,
            baseline: 0.0,
        }
    }

    /// Set the cooling multiplier (clamped to be non-negative).
    pub fn with_cooling(mut self, strength: f32) -> Self {
        self.cooling_strength = strength.max(0.0);
        self
    }

    /// Set the number of bottom rows forced to `1.0`.
    pub fn with_fuel_rows(mut self, rows: u32) -> Self {
        self.fuel_rows = rows;
        self
    }

    /// Set the per-frame rise in rows (at least one).
    pub fn with_rise(mut self, rows: u32) -> Self {
        self.rise = rows.max(1);
        self
    }

    /// Set the value of unwritten next-grid cells.
    pub fn with_baseline(mut self, baseline: f32) -> Self {
        self.baseline = baseline;
        self
    }

    /// Set the cooling noise frequency.
    pub fn with_frequency(mut self, frequency: f32) -> Self {
        self.frequency = frequency;
        self
    }

    pub(crate) fn validate(&self, size: GridSize) -> Result<(), ConfigError> {
        check_finite("heat.frequency", self.frequency)?;
        check_finite("heat.cooling_strength", self.cooling_strength)?;
        check_finite("heat.baseline", self.baseline)?;
        check_finite("heat.noise_b_offset.x", self.noise_b_offset.x)?;
        check_finite("heat.noise_b_offset.y", self.noise_b_offset.y)?;
        if self.cooling_strength < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "heat.cooling_strength",
                value: self.cooling_strength,
            });
        }
        if self.rise == 0 || self.rise >= size.height {
            return Err(ConfigError::InvalidParameter {
                name: "heat.rise",
                value: self.rise as f32,
            });
        }
        if self.fuel_rows > size.height {
            return Err(ConfigError::InvalidParameter {
                name: "heat.fuel_rows",
                value: self.fuel_rows as f32,
            });
        }
        Ok(())
    }
}

impl Default for HeatConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a temperature to the fire colour ramp (red first, then yellow, then
/// a touch of blue at full heat).
#[inline]
pub fn heat_color(temperature: f32) -> Vec4 {
    let t = temperature.clamp(0.0, 1.0);
    Vec4::new((t * 1.5).min(1.0), t * t, t * t * t * t * 0.6, 1.0)
}

/// The fire kernels over host memory.
#[derive(Clone, Debug)]
pub struct HeatGridSimulator {
    config: HeatConfig,
    size: GridSize,
}

impl HeatGridSimulator {
    pub fn new(config: HeatConfig, size: GridSize) -> Result<Self, ConfigError> {
        config.validate(size)?;
        Ok(Self { config, size })
    }

    pub fn config(&self) -> &HeatConfig {
        &self.config
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    #[inline]
    fn at(&self, grid: &[f32], x: i64, y: i64) -> f32 {
        let x = x.clamp(0, self.size.width as i64 - 1) as u32;
        let y = y.clamp(0, self.size.height as i64 - 1) as u32;
        grid[self.size.index(x, y)]
    }

    /// Average of the four axis neighbours of `(x, y)` in `prev`.
    pub fn diffuse(&self, prev: &[f32], x: u32, y: u32) -> f32 {
        let (x, y) = (x as i64, y as i64);
        (self.at(prev, x - 1, y)
            + self.at(prev, x + 1, y)
            + self.at(prev, x, y - 1)
            + self.at(prev, x, y + 1))
            * 0.25
    }

    /// Cooling subtracted at `(x, y)` at `time`. Never negative.
    pub fn cooling(&self, x: u32, y: u32, time: f32) -> f32 {
        let cfg = &self.config;
        if cfg.cooling_strength == 0.0 {
            return 0.0;
        }
        let resolution = Vec2::new(self.size.width as f32, self.size.height as f32);
        let p = cfg.frequency * Vec2::new(x as f32, y as f32) / resolution;
        let noise = cfg.noise_a.sample(p, time) + cfg.noise_b.sample(p + cfg.noise_b_offset, time);
        let height = resolution.y;
        let falloff = (height - y as f32) / height;
        cfg.cooling_strength * noise.abs() * falloff * falloff
    }

    /// Value cell `(x, y)` produces this frame, before the rise shift.
    pub fn cell(&self, prev: &[f32], x: u32, y: u32, time: f32) -> f32 {
        let fuel = self.config.fuel_rows.min(self.size.height);
        if y >= self.size.height - fuel {
            return 1.0;
        }
        self.diffuse(prev, x, y) - self.cooling(x, y, time)
    }

    /// Clear pass: every cell of the write grid to the baseline.
    pub fn clear(&self, next: &mut [f32]) {
        let baseline = self.config.baseline;
        next.par_iter_mut().for_each(|t| *t = baseline);
    }

    /// Update pass: read `prev`, write shifted values into `next`.
    ///
    /// The shift is injective, so the scatter `next[x, y - rise] = cell(x, y)`
    /// is evaluated as a gather over destination rows. Destination rows with
    /// no source keep whatever the clear pass left.
    pub fn update(&self, prev: &[f32], next: &mut [f32], time: f32) {
        debug_assert_eq!(prev.len(), self.size.cells());
        debug_assert_eq!(next.len(), self.size.cells());

        let rise = self.config.rise;
        let height = self.size.height;
        next.par_chunks_mut(self.size.width as usize)
            .enumerate()
            .for_each(|(row, out)| {
                let src_y = row as u32 + rise;
                if src_y >= height {
                    return;
                }
                for (x, cell) in out.iter_mut().enumerate() {
                    *cell = self.cell(prev, x as u32, src_y, time);
                }
            });
    }

    /// Draw pass: fire ramp of `grid` into packed RGBA8 `image`.
    pub fn draw(&self, grid: &[f32], image: &mut [u32]) {
        image
            .par_iter_mut()
            .zip(grid.par_iter())
            .for_each(|(px, t)| *px = pack_rgba8(heat_color(*t)));
    }
}
