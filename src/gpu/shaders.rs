//! WGSL generation for the compute passes.
//!
//! Configuration values are baked into each module as `const` declarations,
//! so a shader is specific to one configuration and one resolution.

use crate::energy::{DecayMode, EnergyConfig, DRAW_SCALE};
use crate::flow::{BoundaryPolicy, FlowConfig};
use crate::grid::{GridSize, GRID_WORKGROUP, PARTICLE_WORKGROUP};
use crate::heat::HeatConfig;
use crate::particle::Particle;
use crate::shader_utils::all_utils_wgsl;

use glam::{Vec2, Vec4};

/// Per-frame uniforms, matching [`super::FrameUniforms`].
pub const UNIFORMS_WGSL: &str = r#"
struct Uniforms {
    time: f32,
    resolution: vec2<i32>,
}
"#;

fn f(v: f32) -> String {
    format!("{:?}", v)
}

fn vec2(v: Vec2) -> String {
    format!("vec2<f32>({:?}, {:?})", v.x, v.y)
}

fn vec4(v: Vec4) -> String {
    format!("vec4<f32>({:?}, {:?}, {:?}, {:?})", v.x, v.y, v.z, v.w)
}

fn grid_header(size: GridSize) -> String {
    format!(
        r#"{utils}
{uniforms}
const SCREEN_WIDTH: u32 = {w}u;
const SCREEN_HEIGHT: u32 = {h}u;

fn grid_index(x: u32, y: u32) -> u32 {{
    return x + SCREEN_WIDTH * y;
}}
"#,
        utils = all_utils_wgsl(),
        uniforms = UNIFORMS_WGSL,
        w = size.width,
        h = size.height,
    )
}

/// Heat grid module with entry points `clear`, `update` and `draw`.
///
/// Bindings: `0` previous grid (read), `1` next grid (read_write),
/// `2` uniforms, `3` heat image (read_write).
pub fn heat_shader(config: &HeatConfig, size: GridSize) -> String {
    let (wx, wy) = GRID_WORKGROUP;
    format!(
        r#"{header}
const FREQUENCY: f32 = {frequency};
const COOLING: f32 = {cooling};
const FUEL_ROWS: u32 = {fuel}u;
const RISE: u32 = {rise}u;
const BASELINE: f32 = {baseline};
const SCROLL_A: vec2<f32> = {scroll_a};
const SCROLL_B: vec2<f32> = {scroll_b};
const OFFSET_B: vec2<f32> = {offset_b};

@group(0) @binding(0) var<storage, read> src: array<f32>;
@group(0) @binding(1) var<storage, read_write> dst: array<f32>;
@group(0) @binding(2) var<uniform> uniforms: Uniforms;
@group(0) @binding(3) var<storage, read_write> image: array<u32>;

fn prev_at(x: i32, y: i32) -> f32 {{
    let cx = u32(clamp(x, 0, i32(SCREEN_WIDTH) - 1));
    let cy = u32(clamp(y, 0, i32(SCREEN_HEIGHT) - 1));
    return src[grid_index(cx, cy)];
}}

fn cooling(x: u32, y: u32) -> f32 {{
    let resolution = vec2<f32>(uniforms.resolution);
    let p = FREQUENCY * vec2<f32>(f32(x), f32(y)) / resolution;
    let t = uniforms.time;
    let noise = {noise_a}(p + SCROLL_A * t) + {noise_b}(p + OFFSET_B + SCROLL_B * t);
    let falloff = (resolution.y - f32(y)) / resolution.y;
    return COOLING * abs(noise) * falloff * falloff;
}}

@compute @workgroup_size({wx}, {wy})
fn clear(@builtin(global_invocation_id) id: vec3<u32>) {{
    if id.x >= SCREEN_WIDTH || id.y >= SCREEN_HEIGHT {{
        return;
    }}
    dst[grid_index(id.x, id.y)] = BASELINE;
}}

@compute @workgroup_size({wx}, {wy})
fn update(@builtin(global_invocation_id) id: vec3<u32>) {{
    let x = id.x;
    let y = id.y;
    if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {{
        return;
    }}

    var t = 1.0;
    if y < SCREEN_HEIGHT - FUEL_ROWS {{
        let xi = i32(x);
        let yi = i32(y);
        let diffused = (prev_at(xi - 1, yi) + prev_at(xi + 1, yi)
            + prev_at(xi, yi - 1) + prev_at(xi, yi + 1)) * 0.25;
        t = diffused - cooling(x, y);
    }}

    // Rows shifted above the top are dropped.
    if y < RISE {{
        return;
    }}
    dst[grid_index(x, y - RISE)] = t;
}}

@compute @workgroup_size({wx}, {wy})
fn draw(@builtin(global_invocation_id) id: vec3<u32>) {{
    if id.x >= SCREEN_WIDTH || id.y >= SCREEN_HEIGHT {{
        return;
    }}
    let i = grid_index(id.x, id.y);
    image[i] = pack4x8unorm(heat_color(dst[i]));
}}
"#,
        header = grid_header(size),
        frequency = f(config.frequency),
        cooling = f(config.cooling_strength),
        fuel = config.fuel_rows.min(size.height),
        rise = config.rise,
        baseline = f(config.baseline),
        scroll_a = vec2(config.noise_a.scroll),
        scroll_b = vec2(config.noise_b.scroll),
        offset_b = vec2(config.noise_b_offset),
        noise_a = config.noise_a.kind.wgsl_fn(),
        noise_b = config.noise_b.kind.wgsl_fn(),
    )
}

/// Particle module with entry point `update`.
///
/// Bindings: `0` particles (read_write), `1` uniforms and, when the effect
/// writes energy, `2` energy counters (atomic).
pub fn flow_shader(config: &FlowConfig, size: GridSize) -> String {
    let boundary = match config.boundary {
        BoundaryPolicy::Wrap => {
            r#"    p.position = vec2<f32>(
        wrap_axis(p.position.x, bounds.x),
        wrap_axis(p.position.y, bounds.y),
    );"#
        }
        BoundaryPolicy::Respawn => {
            r#"    let inside = p.position.x >= 0.0 && p.position.y >= 0.0
        && p.position.x < bounds.x && p.position.y < bounds.y;
    if !inside {
        var seed = p.seed;
        let x = min(rand_next(&seed) * bounds.x, below(bounds.x));
        let y = min(rand_next(&seed) * bounds.y, below(bounds.y));
        let vx = rand_range(&seed, -1.0, 1.0);
        let vy = rand_range(&seed, -1.0, 1.0);
        p.position = vec2<f32>(x, y);
        p.velocity = vec2<f32>(vx, vy);
        p.seed = seed;
    }"#
        }
    };

    let (energy_binding, accumulate) = if config.energy.is_some() {
        (
            "@group(0) @binding(2) var<storage, read_write> energy: array<atomic<u32>>;",
            r#"    let cx = min(u32(p.position.x), SCREEN_WIDTH - 1u);
    let cy = min(u32(p.position.y), SCREEN_HEIGHT - 1u);
    atomicAdd(&energy[grid_index(cx, cy)], 1u);"#,
        )
    } else {
        ("", "")
    };

    format!(
        r#"{header}
{particle}
const PI: f32 = 3.14159265358979;
const PARTICLE_COUNT: u32 = {count}u;
const POSITION_SCALE: f32 = {position_scale};
const FREQUENCY_DIV: f32 = {frequency_div};
const SMOOTHING: f32 = {smoothing};
const STEP_SCALE: f32 = {step_scale};
const SCROLL: vec2<f32> = {scroll};

@group(0) @binding(0) var<storage, read_write> particles: array<Particle>;
@group(0) @binding(1) var<uniform> uniforms: Uniforms;
{energy_binding}

fn wrap_axis(v: f32, bound: f32) -> f32 {{
    if v < 0.0 {{
        return below(bound);
    }}
    if v < bound {{
        return v;
    }}
    return 0.0;
}}

@compute @workgroup_size({workgroup})
fn update(@builtin(global_invocation_id) id: vec3<u32>) {{
    let index = id.x;
    if index >= PARTICLE_COUNT {{
        return;
    }}
    var p = particles[index];
    let bounds = vec2<f32>(f32(SCREEN_WIDTH), f32(SCREEN_HEIGHT));

    let n = {noise}(p.position / POSITION_SCALE / FREQUENCY_DIV + SCROLL * uniforms.time);
    let angle = n * PI;
    let dir = vec2<f32>(cos(angle), sin(angle));
    p.velocity = p.velocity * (1.0 - SMOOTHING) + dir * SMOOTHING;
    p.position = p.position + p.velocity * STEP_SCALE;

{boundary}

{accumulate}
    particles[index] = p;
}}
"#,
        header = grid_header(size),
        particle = Particle::WGSL_STRUCT,
        count = config.particle_count,
        position_scale = f(config.position_scale),
        frequency_div = f(config.frequency_div),
        smoothing = f(config.smoothing),
        step_scale = f(config.step_scale),
        scroll = vec2(config.noise.scroll),
        energy_binding = energy_binding,
        workgroup = PARTICLE_WORKGROUP,
        noise = config.noise.kind.wgsl_fn(),
        boundary = boundary,
        accumulate = accumulate,
    )
}

/// Energy module with entry points `decay` and `draw`.
///
/// Bindings: `0` energy counters (atomic), `1` trail alpha (read_write),
/// `2` energy image (read_write).
pub fn energy_shader(config: &EnergyConfig, size: GridSize) -> String {
    let (wx, wy) = GRID_WORKGROUP;
    let (fade, color) = match config.decay {
        DecayMode::Clear => (
            String::new(),
            "    image[i] = pack4x8unorm(BASE_TINT + vec4<f32>(f32(e) / DRAW_SCALE));".to_string(),
        ),
        DecayMode::Fade { retention } => (
            format!("    trail[i] = trail[i] * {};", f(retention)),
            r#"    if e > 0u {
        trail[i] = 1.0;
    }
    image[i] = pack4x8unorm(BASE_TINT + PARTICLE_TINT * trail[i]);"#
                .to_string(),
        ),
    };

    format!(
        r#"{header}
const DRAW_SCALE: f32 = {draw_scale};
const BASE_TINT: vec4<f32> = {base_tint};
const PARTICLE_TINT: vec4<f32> = {particle_tint};

@group(0) @binding(0) var<storage, read_write> energy: array<atomic<u32>>;
@group(0) @binding(1) var<storage, read_write> trail: array<f32>;
@group(0) @binding(2) var<storage, read_write> image: array<u32>;

@compute @workgroup_size({wx}, {wy})
fn decay(@builtin(global_invocation_id) id: vec3<u32>) {{
    if id.x >= SCREEN_WIDTH || id.y >= SCREEN_HEIGHT {{
        return;
    }}
    let i = grid_index(id.x, id.y);
    atomicStore(&energy[i], 0u);
{fade}
}}

@compute @workgroup_size({wx}, {wy})
fn draw(@builtin(global_invocation_id) id: vec3<u32>) {{
    if id.x >= SCREEN_WIDTH || id.y >= SCREEN_HEIGHT {{
        return;
    }}
    let i = grid_index(id.x, id.y);
    let e = atomicLoad(&energy[i]);
{color}
}}
"#,
        header = grid_header(size),
        draw_scale = f(DRAW_SCALE),
        base_tint = vec4(config.base_tint),
        particle_tint = vec4(config.particle_tint),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

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
    fn test_heat_shader_validates() {
        let config = SimConfig::fire(1280, 720);
        let code = heat_shader(config.heat.as_ref().unwrap(), config.size);
        validate_wgsl(&code).unwrap();
        assert!(code.contains("const SCREEN_WIDTH: u32 = 1280u;"));
        assert!(code.contains("const SCREEN_HEIGHT: u32 = 720u;"));
        assert!(code.contains("const FREQUENCY: f32 = 13.0;"));
        assert!(code.contains("gradient_noise(p + SCROLL_A * t)"));
        assert!(code.contains("simplex_noise(p + OFFSET_B + SCROLL_B * t)"));
    }

    #[test]
    fn test_heat_shader_without_fuel_validates() {
        let heat = HeatConfig::new().with_fuel_rows(0).with_cooling(0.0).with_baseline(-0.25);
        validate_wgsl(&heat_shader(&heat, GridSize::new(64, 48))).unwrap();
    }

    #[test]
    fn test_flow_shaders_validate() {
        for config in [SimConfig::trails(320, 180), SimConfig::flow(320, 180)] {
            let flow = config.flow.as_ref().unwrap();
            let code = flow_shader(flow, config.size);
            validate_wgsl(&code).unwrap();
            assert!(code.contains("atomicAdd(&energy[grid_index(cx, cy)], 1u);"));
        }
    }

    #[test]
    fn test_flow_shader_boundary_variants() {
        let size = GridSize::new(64, 64);
        let wrap = flow_shader(&FlowConfig::trails(10), size);
        assert!(wrap.contains("wrap_axis(p.position.x, bounds.x)"));
        assert!(!wrap.contains("rand_next(&seed)"));
        assert!(wrap.contains("const STEP_SCALE: f32 = 1.0;"));

        let respawn = flow_shader(&FlowConfig::flow(10), size);
        assert!(respawn.contains("rand_next(&seed)"));
        assert!(respawn.contains("const STEP_SCALE: f32 = 0.3;"));
        assert!(respawn.contains("const FREQUENCY_DIV: f32 = 2.8;"));
    }

    #[test]
    fn test_flow_shader_without_energy_validates() {
        let flow = FlowConfig::flow(1000).with_energy(None);
        let code = flow_shader(&flow, GridSize::new(64, 64));
        validate_wgsl(&code).unwrap();
        assert!(!code.contains("atomic"));
    }

    #[test]
    fn test_energy_shaders_validate() {
        let size = GridSize::new(256, 128);
        for decay in [DecayMode::Clear, DecayMode::fade()] {
            let code = energy_shader(&EnergyConfig::new(decay), size);
            validate_wgsl(&code).unwrap();
        }
        let fade = energy_shader(&EnergyConfig::new(DecayMode::fade()), size);
        assert!(fade.contains("trail[i] = trail[i] * 0.999;"));

        let tinted = EnergyConfig::new(DecayMode::fade())
            .with_base_tint(Vec4::new(0.0, 0.0, 0.1, 1.0))
            .with_particle_tint(Vec4::new(0.25, 0.5, 1.0, 1.0));
        let code = energy_shader(&tinted, size);
        validate_wgsl(&code).unwrap();
        assert!(code.contains("const BASE_TINT: vec4<f32> = vec4<f32>(0.0, 0.0, 0.1, 1.0);"));
        assert!(code.contains("const PARTICLE_TINT: vec4<f32> = vec4<f32>(0.25, 0.5, 1.0, 1.0);"));
    }
}
