//! GPU resources and compute pipeline for the particle pool.

use wgpu::util::DeviceExt;

use super::{create_pipeline, shaders, storage_entry, uniform_entry};
use crate::flow::FlowConfig;
use crate::grid::{workgroup_count, GridSize, PARTICLE_WORKGROUP};
use crate::particle::Particle;

/// Particle buffer and the update kernel.
pub(crate) struct FlowGpu {
    pub particles: wgpu::Buffer,
    pub count: u32,
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::ComputePipeline,
}

impl FlowGpu {
    /// `energy` is the counter buffer the particles accumulate into, present
    /// exactly when `config.energy` is.
    pub fn new(
        device: &wgpu::Device,
        config: &FlowConfig,
        size: GridSize,
        particles: &[Particle],
        uniforms: &wgpu::Buffer,
        energy: Option<&wgpu::Buffer>,
    ) -> Self {
        let particle_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Buffer"),
            contents: bytemuck::cast_slice(particles),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Flow Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::flow_shader(config, size).into()),
        });

        let mut layout_entries = vec![storage_entry(0, false), uniform_entry(1)];
        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: particle_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: uniforms.as_entire_binding(),
            },
        ];
        if let Some(energy) = energy {
            layout_entries.push(storage_entry(2, false));
            entries.push(wgpu::BindGroupEntry {
                binding: 2,
                resource: energy.as_entire_binding(),
            });
        }

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Flow Bind Group Layout"),
            entries: &layout_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Flow Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Flow Bind Group"),
            layout: &bind_group_layout,
            entries: &entries,
        });

        Self {
            pipeline: create_pipeline(
                device,
                "Particle Flow Pipeline",
                &pipeline_layout,
                &shader,
                "update",
            ),
            particles: particle_buffer,
            count: particles.len() as u32,
            bind_group,
        }
    }

    /// Record the particle update.
    pub fn record(&self, cpass: &mut wgpu::ComputePass<'_>) {
        cpass.set_pipeline(&self.pipeline);
        cpass.set_bind_group(0, &self.bind_group, &[]);
        cpass.dispatch_workgroups(workgroup_count(self.count, PARTICLE_WORKGROUP), 1, 1);
    }
}
