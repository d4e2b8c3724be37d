//! GPU resources and compute pipelines for the energy grid.

use super::{create_pipeline, shaders, storage_entry};
use crate::dispatch::Pass;
use crate::energy::EnergyConfig;
use crate::grid::GridSize;

/// Atomic counters, trail alpha, the energy image and the decay/draw kernels.
pub(crate) struct EnergyGpu {
    /// `array<atomic<u32>>`, also bound by the particle pipeline.
    pub counters: wgpu::Buffer,
    pub trail: wgpu::Buffer,
    pub image: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    decay_pipeline: wgpu::ComputePipeline,
    draw_pipeline: wgpu::ComputePipeline,
    workgroups: (u32, u32),
}

impl EnergyGpu {
    pub fn new(device: &wgpu::Device, config: &EnergyConfig, size: GridSize) -> Self {
        let byte_size = (size.cells() * 4) as u64;
        let usage = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST;

        // New buffers are zero-initialized.
        let make_buffer = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: byte_size,
                usage,
                mapped_at_creation: false,
            })
        };
        let counters = make_buffer("Energy Counter Buffer");
        let trail = make_buffer("Energy Trail Buffer");
        let image = make_buffer("Energy Image Buffer");

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Energy Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::energy_shader(config, size).into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Energy Bind Group Layout"),
            entries: &[
                storage_entry(0, false),
                storage_entry(1, false),
                storage_entry(2, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Energy Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Energy Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: counters.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: trail.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: image.as_entire_binding(),
                },
            ],
        });

        Self {
            decay_pipeline: create_pipeline(
                device,
                "Energy Decay Pipeline",
                &pipeline_layout,
                &shader,
                "decay",
            ),
            draw_pipeline: create_pipeline(
                device,
                "Energy Draw Pipeline",
                &pipeline_layout,
                &shader,
                "draw",
            ),
            counters,
            trail,
            image,
            bind_group,
            workgroups: size.workgroups(),
        }
    }

    /// Record this component's share of `pass`. Particles do the update.
    pub fn record(&self, cpass: &mut wgpu::ComputePass<'_>, pass: Pass) {
        let pipeline = match pass {
            Pass::Decay => &self.decay_pipeline,
            Pass::Draw => &self.draw_pipeline,
            Pass::Update => return,
        };
        cpass.set_pipeline(pipeline);
        cpass.set_bind_group(0, &self.bind_group, &[]);
        cpass.dispatch_workgroups(self.workgroups.0, self.workgroups.1, 1);
    }
}
