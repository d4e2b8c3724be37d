//! wgpu backend: a headless device plus one executor that records every
//! pass of a frame into a single command encoder.

mod energy_gpu;
mod flow_gpu;
mod heat_gpu;
pub mod readback;
pub mod shaders;

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::config::SimConfig;
use crate::dispatch::{FrameContext, Pass, PassExecutor};
use crate::error::GpuError;
use crate::grid::{GridSize, Slot};
use crate::particle::{spawn_pool, Particle};
use energy_gpu::EnergyGpu;
use flow_gpu::FlowGpu;
use heat_gpu::HeatGpu;

/// Per-frame uniforms, matching `struct Uniforms` in the generated WGSL.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    pub time: f32,
    _pad: u32,
    pub resolution: [i32; 2],
}

impl FrameUniforms {
    pub fn new(time: f32, size: GridSize) -> Self {
        Self {
            time,
            _pad: 0,
            resolution: size.as_ivec2(),
        }
    }
}

/// Shared device and queue.
#[derive(Clone)]
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
}

impl GpuContext {
    /// Request a device with no surface attached.
    pub async fn request() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Emberflow Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        device.on_uncaptured_error(Box::new(|error| {
            log::error!("Uncaptured GPU error: {}", error);
        }));

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// Blocking wrapper around [`GpuContext::request`].
    pub fn request_blocking() -> Result<Self, GpuError> {
        pollster::block_on(Self::request())
    }
}

pub(crate) fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub(crate) fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub(crate) fn create_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    entry_point: &str,
) -> wgpu::ComputePipeline {
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        module,
        entry_point: Some(entry_point),
        compilation_options: Default::default(),
        cache: None,
    })
}

/// Runs the frame passes on the GPU.
///
/// `begin_frame` uploads the uniforms, every [`Pass`] becomes one compute
/// pass in a shared encoder, and `end_frame` submits it. Passes within a
/// frame are ordered by the encoder, so no host synchronization happens
/// between them.
pub struct GpuExecutor {
    context: GpuContext,
    size: GridSize,
    uniform_buffer: wgpu::Buffer,
    heat: Option<HeatGpu>,
    energy: Option<EnergyGpu>,
    flow: Option<FlowGpu>,
    encoder: Option<wgpu::CommandEncoder>,
}

impl GpuExecutor {
    pub fn new(context: GpuContext, config: &SimConfig) -> Result<Self, GpuError> {
        config.validate()?;
        let size = config.size;
        let device = &context.device;

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Uniform Buffer"),
            contents: bytemuck::bytes_of(&FrameUniforms::new(0.0, size)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let heat = config
            .heat
            .as_ref()
            .map(|heat| HeatGpu::new(device, heat, size, &uniform_buffer));

        let energy = config
            .flow
            .as_ref()
            .and_then(|flow| flow.energy.as_ref())
            .map(|energy| EnergyGpu::new(device, energy, size));

        let flow = config.flow.as_ref().map(|flow| {
            let particles = spawn_pool(flow.particle_count, size, config.seed);
            FlowGpu::new(
                device,
                flow,
                size,
                &particles,
                &uniform_buffer,
                energy.as_ref().map(|energy| &energy.counters),
            )
        });

        log::info!(
            "GPU executor ready: {}x{}, heat: {}, particles: {}",
            size.width,
            size.height,
            heat.is_some(),
            flow.as_ref().map_or(0, |flow| flow.count),
        );

        Ok(Self {
            context,
            size,
            uniform_buffer,
            heat,
            energy,
            flow,
            encoder: None,
        })
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    fn read<T: Pod>(&self, buffer: &wgpu::Buffer, count: usize) -> Result<Vec<T>, GpuError> {
        readback::read_buffer(&self.context.device, &self.context.queue, buffer, count)
    }

    /// Heat values of one grid slot, or `None` without a heat grid.
    pub fn read_heat_grid(&self, slot: Slot) -> Result<Option<Vec<f32>>, GpuError> {
        self.heat
            .as_ref()
            .map(|heat| self.read(heat.grid(slot), self.size.cells()))
            .transpose()
    }

    /// Replace the contents of one heat grid slot.
    pub fn write_heat_grid(&self, slot: Slot, values: &[f32]) {
        if let Some(heat) = &self.heat {
            readback::write_buffer(&self.context.queue, heat.grid(slot), values);
        }
    }

    /// Packed RGBA8 heat image.
    pub fn read_heat_image(&self) -> Result<Option<Vec<u32>>, GpuError> {
        self.heat
            .as_ref()
            .map(|heat| self.read(&heat.image, self.size.cells()))
            .transpose()
    }

    pub fn read_particles(&self) -> Result<Option<Vec<Particle>>, GpuError> {
        self.flow
            .as_ref()
            .map(|flow| self.read(&flow.particles, flow.count as usize))
            .transpose()
    }

    /// Replace the start of the particle pool.
    pub fn write_particles(&self, particles: &[Particle]) {
        if let Some(flow) = &self.flow {
            let count = particles.len().min(flow.count as usize);
            readback::write_buffer(&self.context.queue, &flow.particles, &particles[..count]);
        }
    }

    /// Energy counters as of the last submitted frame.
    pub fn read_energy(&self) -> Result<Option<Vec<u32>>, GpuError> {
        self.energy
            .as_ref()
            .map(|energy| self.read(&energy.counters, self.size.cells()))
            .transpose()
    }

    pub fn read_trail(&self) -> Result<Option<Vec<f32>>, GpuError> {
        self.energy
            .as_ref()
            .map(|energy| self.read(&energy.trail, self.size.cells()))
            .transpose()
    }

    /// Packed RGBA8 energy image.
    pub fn read_energy_image(&self) -> Result<Option<Vec<u32>>, GpuError> {
        self.energy
            .as_ref()
            .map(|energy| self.read(&energy.image, self.size.cells()))
            .transpose()
    }
}

impl PassExecutor for GpuExecutor {
    fn begin_frame(&mut self, ctx: &FrameContext) {
        let uniforms = FrameUniforms::new(ctx.time, self.size);
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
        self.encoder = Some(self.context.device.create_command_encoder(
            &wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            },
        ));
    }

    fn run(&mut self, pass: Pass, ctx: &FrameContext) {
        let device = &self.context.device;
        let encoder = self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            })
        });

        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(pass.label()),
            timestamp_writes: None,
        });

        if let Some(heat) = &self.heat {
            heat.record(&mut cpass, pass, ctx.heat);
        }
        if let Some(energy) = &self.energy {
            energy.record(&mut cpass, pass);
        }
        if pass == Pass::Update {
            if let Some(flow) = &self.flow {
                flow.record(&mut cpass);
            }
        }
    }

    fn end_frame(&mut self, ctx: &FrameContext) {
        if let Some(encoder) = self.encoder.take() {
            self.context.queue.submit(Some(encoder.finish()));
        }
        log::trace!("Submitted frame {} at t={:.3}", ctx.index, ctx.time);
    }
}
