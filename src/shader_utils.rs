//! WGSL twins of the host-side kernels' helper functions.
//!
//! Every generated compute shader is prefixed with [`all_utils_wgsl`]. The
//! functions here are written to match their Rust counterparts operation for
//! operation so both backends produce the same fields.
//!
//! # Available Functions
//!
//! ## Random
//! - `xxhash32(n: u32) -> u32` - see [`crate::prng::xxhash32`]
//! - `rand_next(state: ptr<function, u32>) -> f32` - advance a seed, value in `[0, 1)`
//! - `rand_range(state: ptr<function, u32>, lo: f32, hi: f32) -> f32`
//!
//! ## Noise
//! - `gradient_noise(p: vec2<f32>) -> f32` - see [`crate::noise::gradient_noise`]
//! - `simplex_noise(p: vec2<f32>) -> f32` - see [`crate::noise::simplex_noise`]
//!
//! ## Color and grid
//! - `heat_color(t: f32) -> vec4<f32>` - see [`crate::heat::heat_color`]
//! - `below(bound: f32) -> f32` - see [`crate::flow::below`]

/// WGSL code for the counter-based generator.
pub const RANDOM_WGSL: &str = r#"
fn xxhash32(n: u32) -> u32 {
    var h = n + 374761393u;
    h = 668265263u * ((h << 17u) | (h >> 15u));
    h = 2246822519u * (h ^ (h >> 15u));
    h = 3266489917u * (h ^ (h >> 13u));
    return h ^ (h >> 16u);
}

// Reads and overwrites the seed.
fn rand_next(state: ptr<function, u32>) -> f32 {
    let s = xxhash32(*state);
    *state = s;
    return f32(s >> 8u) * (1.0 / 16777216.0);
}

fn rand_range(state: ptr<function, u32>, lo: f32, hi: f32) -> f32 {
    return lo + rand_next(state) * (hi - lo);
}
"#;

/// WGSL code for gradient and simplex noise.
pub const NOISE_WGSL: &str = r#"
const SIMPLEX_G2: f32 = 0.21132487;
const SIMPLEX_F2: f32 = 0.3660254;
const SIMPLEX_CORNER: f32 = -0.57735026;
const INV_41: f32 = 0.024390243;

fn mod289(x: f32) -> f32 {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn permute(x: f32) -> f32 {
    return mod289((x * 34.0 + 1.0) * x);
}

fn taylor_inv_sqrt(r: f32) -> f32 {
    return 1.7928429 - 0.8537347 * r;
}

fn fade(t: f32) -> f32 {
    return t * t * t * (t * (t * 6.0 - 15.0) + 10.0);
}

fn lattice_gradient(ix: f32, iy: f32) -> vec2<f32> {
    let h = permute(permute(ix) + iy);
    let gx0 = fract(h * INV_41) * 2.0 - 1.0;
    let gy = abs(gx0) - 0.5;
    let gx = gx0 - floor(gx0 + 0.5);
    let g = vec2<f32>(gx, gy);
    return g * taylor_inv_sqrt(dot(g, g));
}

fn gradient_noise(p: vec2<f32>) -> f32 {
    let cell = floor(p);
    let f = p - cell;

    let i0 = vec2<f32>(mod289(cell.x), mod289(cell.y));
    let i1 = vec2<f32>(mod289(cell.x + 1.0), mod289(cell.y + 1.0));

    let n00 = dot(lattice_gradient(i0.x, i0.y), f);
    let n10 = dot(lattice_gradient(i1.x, i0.y), f - vec2<f32>(1.0, 0.0));
    let n01 = dot(lattice_gradient(i0.x, i1.y), f - vec2<f32>(0.0, 1.0));
    let n11 = dot(lattice_gradient(i1.x, i1.y), f - vec2<f32>(1.0, 1.0));

    let u = vec2<f32>(fade(f.x), fade(f.y));
    let nx0 = n00 + (n10 - n00) * u.x;
    let nx1 = n01 + (n11 - n01) * u.x;
    return 2.3 * (nx0 + (nx1 - nx0) * u.y);
}

fn simplex_corner(hashed: f32, d: vec2<f32>) -> f32 {
    var m = max(0.5 - dot(d, d), 0.0);
    m = m * m;
    m = m * m;

    let x = 2.0 * fract(hashed * INV_41) - 1.0;
    let h = abs(x) - 0.5;
    let a0 = x - floor(x + 0.5);

    return m * taylor_inv_sqrt(a0 * a0 + h * h) * (a0 * d.x + h * d.y);
}

fn simplex_noise(v: vec2<f32>) -> f32 {
    let i = floor(v + (v.x + v.y) * SIMPLEX_F2);
    let x0 = v - i + (i.x + i.y) * SIMPLEX_G2;

    var i1 = vec2<f32>(0.0, 1.0);
    if x0.x > x0.y {
        i1 = vec2<f32>(1.0, 0.0);
    }
    let x1 = x0 + SIMPLEX_G2 - i1;
    let x2 = x0 + SIMPLEX_CORNER;

    let im = vec2<f32>(mod289(i.x), mod289(i.y));
    let p0 = permute(permute(im.y) + im.x);
    let p1 = permute(permute(im.y + i1.y) + im.x + i1.x);
    let p2 = permute(permute(im.y + 1.0) + im.x + 1.0);

    return 130.0 * (simplex_corner(p0, x0) + simplex_corner(p1, x1) + simplex_corner(p2, x2));
}
"#;

/// WGSL code for the fire ramp and grid bounds.
pub const COLOR_WGSL: &str = r#"
fn heat_color(temperature: f32) -> vec4<f32> {
    let t = clamp(temperature, 0.0, 1.0);
    return vec4<f32>(min(t * 1.5, 1.0), t * t, t * t * t * t * 0.6, 1.0);
}

// Largest f32 strictly below a positive bound.
fn below(bound: f32) -> f32 {
    return bitcast<f32>(bitcast<u32>(bound) - 1u);
}
"#;

/// Get all utility functions combined.
pub fn all_utils_wgsl() -> String {
    format!(
        "// Utility functions\n{}\n{}\n{}\n",
        RANDOM_WGSL, NOISE_WGSL, COLOR_WGSL
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate_wgsl(code: &str) -> Result<(), String> {
        let module = naga::front::wgsl::parse_str(code)
            .map_err(|e| format!("WGSL parse error: {:?}", e))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| format!("WGSL validation error: {:?}", e))?;

        Ok(())
    }

    #[test]
    fn test_utils_validate() {
        let code = format!(
            r#"{}
@group(0) @binding(0) var<storage, read_write> results: array<f32>;

@compute @workgroup_size(1)
fn main() {{
    var seed = 42u;
    results[0] = rand_next(&seed);
    results[1] = rand_range(&seed, -1.0, 1.0);
    results[2] = gradient_noise(vec2<f32>(0.5, 1.5));
    results[3] = simplex_noise(vec2<f32>(0.5, 1.5));
    results[4] = heat_color(0.5).g;
    results[5] = below(1280.0);
}}
"#,
            all_utils_wgsl()
        );
        validate_wgsl(&code).unwrap();
    }

    #[test]
    fn test_hash_constants_match_host() {
        // Keeps the WGSL literals in step with the host primes.
        for prime in ["374761393u", "668265263u", "2246822519u", "3266489917u"] {
            assert!(RANDOM_WGSL.contains(prime));
        }
    }
}
