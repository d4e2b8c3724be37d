//! Particle record shared by the CPU and GPU backends, and pool spawning.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::grid::GridSize;

/// One particle.
///
/// Laid out to match the WGSL declaration in [`Particle::WGSL_STRUCT`]
/// (24-byte array stride). `seed` is the particle's private PRNG state and
/// is only touched by effects that respawn.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub seed: u32,
    pub _pad: u32,
}

impl Particle {
    pub const WGSL_STRUCT: &'static str = r#"struct Particle {
    position: vec2<f32>,
    velocity: vec2<f32>,
    seed: u32,
    _pad: u32,
}
"#;

    pub fn new(position: Vec2, velocity: Vec2, seed: u32) -> Self {
        Self {
            position,
            velocity,
            seed,
            _pad: 0,
        }
    }
}

/// Spawn `count` particles at uniform positions inside `size`, at rest.
///
/// The same `seed` always yields the same pool. Per-particle PRNG seeds are
/// drawn from the spawn RNG; they need not be distinct for correctness but
/// almost always are.
pub fn spawn_pool(count: u32, size: GridSize, seed: u64) -> Vec<Particle> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (w, h) = (size.width as f32, size.height as f32);
    (0..count)
        .map(|_| {
            let position = Vec2::new(rng.gen_range(0.0..w), rng.gen_range(0.0..h));
            Particle::new(position, Vec2::ZERO, rng.gen())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_size() {
        assert_eq!(std::mem::size_of::<Particle>(), 24);
        assert_eq!(std::mem::align_of::<Particle>(), 4);
    }

    #[test]
    fn test_spawn_pool_inside_grid() {
        let size = GridSize::new(320, 180);
        let pool = spawn_pool(5_000, size, 7);
        assert_eq!(pool.len(), 5_000);
        for p in &pool {
            assert!(p.position.x >= 0.0 && p.position.x < 320.0);
            assert!(p.position.y >= 0.0 && p.position.y < 180.0);
            assert_eq!(p.velocity, Vec2::ZERO);
        }
    }

    #[test]
    fn test_spawn_pool_reproducible() {
        let size = GridSize::new(64, 64);
        assert_eq!(spawn_pool(100, size, 3), spawn_pool(100, size, 3));
        assert_ne!(spawn_pool(100, size, 3), spawn_pool(100, size, 4));
    }

    #[test]
    fn test_particle_bytes() {
        let p = Particle::new(Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0), 5);
        let bytes: &[u8] = bytemuck::bytes_of(&p);
        assert_eq!(bytes.len(), 24);
        let back: Particle = *bytemuck::from_bytes(bytes);
        assert_eq!(back, p);
    }
}
