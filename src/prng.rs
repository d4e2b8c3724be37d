//! Counter-based pseudo-random numbers for per-particle state.
//!
//! Each particle owns a `u32` seed. A draw hashes the seed with the xxhash32
//! avalanche, stores the hash back as the new seed and returns it as a float
//! in `[0, 1)`. Sequences of different particles never interact.

const PRIME32_2: u32 = 2_246_822_519;
const PRIME32_3: u32 = 3_266_489_917;
const PRIME32_4: u32 = 668_265_263;
const PRIME32_5: u32 = 374_761_393;

/// Scale for the top 24 bits of a hash, `1 / 2^24`.
const UNIT_SCALE: f32 = 1.0 / 16_777_216.0;

/// xxhash32 single-word avalanche.
///
/// A bijection on `u32`, so a seed's sequence never collapses onto a fixed
/// point shared with another seed.
#[inline]
pub fn xxhash32(n: u32) -> u32 {
    let mut h = n.wrapping_add(PRIME32_5);
    h = PRIME32_4.wrapping_mul(h.rotate_left(17));
    h = PRIME32_2.wrapping_mul(h ^ (h >> 15));
    h = PRIME32_3.wrapping_mul(h ^ (h >> 13));
    h ^ (h >> 16)
}

/// Map a hash to `[0, 1)`.
///
/// This is `state / 2^32` truncated to the 24 bits an `f32` mantissa holds,
/// so the result is exact and never rounds up to `1.0`.
#[inline]
pub fn unit_float(state: u32) -> f32 {
    (state >> 8) as f32 * UNIT_SCALE
}

/// Advance `state` once. Returns `(new_state, value)` with `value` in `[0, 1)`.
#[inline]
pub fn next(state: u32) -> (u32, f32) {
    let new_state = xxhash32(state);
    (new_state, unit_float(new_state))
}

/// Draws from a seed owned by exactly one caller.
///
/// Every draw reads and overwrites the borrowed seed, so the sequence picks
/// up where the last draw left it, across frames.
pub struct Prng<'a> {
    state: &'a mut u32,
}

impl<'a> Prng<'a> {
    pub fn new(state: &'a mut u32) -> Self {
        Self { state }
    }

    /// Next value in `[0, 1)`.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        let (state, value) = next(*self.state);
        *self.state = state;
        value
    }

    /// Next value in `[min, max)`.
    #[inline]
    pub fn next_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }
}
