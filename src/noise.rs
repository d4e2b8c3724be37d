//! Deterministic 2D procedural noise.
//!
//! Two variants are provided, both pure functions of their input:
//!
//! - [`gradient_noise`] - gradient noise on an integer lattice, corner
//!   gradients from a mod-289 permutation polynomial, blended with the
//!   quintic fade `6t^5 - 15t^4 + 10t^3`.
//! - [`simplex_noise`] - simplex noise over a triangulated plane with the
//!   radial kernel `max(0, 0.5 - |d|^2)^4`, normalized by `130`.
//!
//! Both return values in roughly `[-1, 1]`. The same functions exist in WGSL
//! ([`crate::shader_utils::NOISE_WGSL`]) and are written to match these
//! operation for operation.
//!
//! Effects select a variant with [`NoiseKind`] and wrap it in a
//! [`NoiseField`], which adds a time-scrolled domain offset.

use glam::Vec2;

/// Skew factor for 2D simplex, `(3 - sqrt(3)) / 6`.
const SIMPLEX_G2: f32 = 0.211_324_87;
/// Unskew factor for 2D simplex, `(sqrt(3) - 1) / 2`.
const SIMPLEX_F2: f32 = 0.366_025_4;
/// Offset of the last simplex corner, `-1 + 2 * G2`.
const SIMPLEX_CORNER: f32 = -0.577_350_26;
/// `1 / 41`, spreads permutation hashes over the gradient ring.
const INV_41: f32 = 0.024_390_243;

#[inline]
fn mod289(x: f32) -> f32 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

#[inline]
fn permute(x: f32) -> f32 {
    mod289((x * 34.0 + 1.0) * x)
}

#[inline]
fn taylor_inv_sqrt(r: f32) -> f32 {
    1.792_842_9 - 0.853_734_7 * r
}

#[inline]
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

// GLSL/WGSL fract, not `f32::fract` (which truncates toward zero).
#[inline]
fn fract(x: f32) -> f32 {
    x - x.floor()
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn lattice_gradient(ix: f32, iy: f32) -> Vec2 {
    let h = permute(permute(ix) + iy);
    let gx = fract(h * INV_41) * 2.0 - 1.0;
    let gy = gx.abs() - 0.5;
    let gx = gx - (gx + 0.5).floor();
    let g = Vec2::new(gx, gy);
    g * taylor_inv_sqrt(g.dot(g))
}

/// Gradient noise at `p`. Exactly zero on lattice points.
pub fn gradient_noise(p: Vec2) -> f32 {
    let cell = p.floor();
    let f = p - cell;

    let i0 = Vec2::new(mod289(cell.x), mod289(cell.y));
    let i1 = Vec2::new(mod289(cell.x + 1.0), mod289(cell.y + 1.0));

    let n00 = lattice_gradient(i0.x, i0.y).dot(f);
    let n10 = lattice_gradient(i1.x, i0.y).dot(f - Vec2::X);
    let n01 = lattice_gradient(i0.x, i1.y).dot(f - Vec2::Y);
    let n11 = lattice_gradient(i1.x, i1.y).dot(f - Vec2::ONE);

    let u = Vec2::new(fade(f.x), fade(f.y));
    2.3 * lerp(lerp(n00, n10, u.x), lerp(n01, n11, u.x), u.y)
}

fn simplex_corner(hash: f32, d: Vec2) -> f32 {
    let m = (0.5 - d.dot(d)).max(0.0);
    let m = m * m;
    let m = m * m;

    let x = 2.0 * fract(hash * INV_41) - 1.0;
    let h = x.abs() - 0.5;
    let a0 = x - (x + 0.5).floor();

    m * taylor_inv_sqrt(a0 * a0 + h * h) * (a0 * d.x + h * d.y)
}

/// 2D simplex noise at `v`.
pub fn simplex_noise(v: Vec2) -> f32 {
    let i = (v + Vec2::splat((v.x + v.y) * SIMPLEX_F2)).floor();
    let x0 = v - i + Vec2::splat((i.x + i.y) * SIMPLEX_G2);

    let i1 = if x0.x > x0.y { Vec2::X } else { Vec2::Y };
    let x1 = x0 + Vec2::splat(SIMPLEX_G2) - i1;
    let x2 = x0 + Vec2::splat(SIMPLEX_CORNER);

    let im = Vec2::new(mod289(i.x), mod289(i.y));
    let p0 = permute(permute(im.y) + im.x);
    let p1 = permute(permute(im.y + i1.y) + im.x + i1.x);
    let p2 = permute(permute(im.y + 1.0) + im.x + 1.0);

    130.0 * (simplex_corner(p0, x0) + simplex_corner(p1, x1) + simplex_corner(p2, x2))
}

/// Which noise function an effect samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NoiseKind {
    /// Lattice gradient noise with quintic fade.
    #[default]
    Gradient,
    /// Simplex noise with radial kernel.
    Simplex,
}

impl NoiseKind {
    /// Evaluate the selected function at `p`.
    #[inline]
    pub fn eval(self, p: Vec2) -> f32 {
        match self {
            NoiseKind::Gradient => gradient_noise(p),
            NoiseKind::Simplex => simplex_noise(p),
        }
    }

    /// Name of the matching function in [`crate::shader_utils::NOISE_WGSL`].
    pub fn wgsl_fn(self) -> &'static str {
        match self {
            NoiseKind::Gradient => "gradient_noise",
            NoiseKind::Simplex => "simplex_noise",
        }
    }
}

/// A noise function plus a domain scroll over time.
///
/// `sample(p, t)` evaluates `kind` at `p + scroll * t`, so a zero scroll gives
/// a static field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoiseField {
    pub kind: NoiseKind,
    pub scroll: Vec2,
}

impl NoiseField {
    /// A static field of the given kind.
    pub const fn new(kind: NoiseKind) -> Self {
        Self {
            kind,
            scroll: Vec2::ZERO,
        }
    }

    /// Scroll the sampling domain by `scroll` per unit of time.
    pub fn with_scroll(mut self, scroll: Vec2) -> Self {
        self.scroll = scroll;
        self
    }

    /// Sample the field at `position` and `time`.
    #[inline]
    pub fn sample(&self, position: Vec2, time: f32) -> f32 {
        self.kind.eval(position + self.scroll * time)
    }
}

impl Default for NoiseField {
    fn default() -> Self {
        Self::new(NoiseKind::Gradient)
    }
}

/// Anything the kernels can sample as a scalar noise field.
///
/// Implemented for [`NoiseField`] and for plain closures, so a kernel can be
/// driven by a forced field such as `|_, _| 0.0`.
pub trait NoiseSource: Sync {
    fn sample(&self, position: Vec2, time: f32) -> f32;
}

impl NoiseSource for NoiseField {
    #[inline]
    fn sample(&self, position: Vec2, time: f32) -> f32 {
        NoiseField::sample(self, position, time)
    }
}

impl<F> NoiseSource for F
where
    F: Fn(Vec2, f32) -> f32 + Sync,
{
    #[inline]
    fn sample(&self, position: Vec2, time: f32) -> f32 {
        self(position, time)
    }
}
