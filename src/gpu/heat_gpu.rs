//! GPU resources and compute pipelines for the heat grid.

use wgpu::util::DeviceExt;

use super::{create_pipeline, shaders, storage_entry, uniform_entry};
use crate::dispatch::Pass;
use crate::grid::{GridRoles, GridSize, PingPong, Slot};
use crate::heat::HeatConfig;

/// Ping-pong heat grids, the heat image and the three heat kernels.
pub(crate) struct HeatGpu {
    grids: PingPong<wgpu::Buffer>,
    pub image: wgpu::Buffer,
    /// Bind group for each readable slot: reading A writes B and vice versa.
    bind_groups: PingPong<wgpu::BindGroup>,
    clear_pipeline: wgpu::ComputePipeline,
    update_pipeline: wgpu::ComputePipeline,
    draw_pipeline: wgpu::ComputePipeline,
    workgroups: (u32, u32),
}

impl HeatGpu {
    pub fn new(
        device: &wgpu::Device,
        config: &HeatConfig,
        size: GridSize,
        uniforms: &wgpu::Buffer,
    ) -> Self {
        let cells = size.cells();
        let initial = vec![config.baseline; cells];
        let usage = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST;

        let make_grid = |label: &str| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&initial),
                usage,
            })
        };
        let grids = PingPong::new(make_grid("Heat Grid A"), make_grid("Heat Grid B"));

        let image = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Heat Image Buffer"),
            size: (cells * 4) as u64,
            usage,
            mapped_at_creation: false,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Heat Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::heat_shader(config, size).into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Heat Bind Group Layout"),
            entries: &[
                // Previous grid
                storage_entry(0, true),
                // Next grid
                storage_entry(1, false),
                uniform_entry(2),
                // Heat image
                storage_entry(3, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Heat Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let make_bind_group = |read: Slot| {
            let roles = GridRoles::reading(read);
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(match read {
                    Slot::A => "Heat Bind Group (A -> B)",
                    Slot::B => "Heat Bind Group (B -> A)",
                }),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: grids.get(roles.read()).as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: grids.get(roles.write()).as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: uniforms.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: image.as_entire_binding(),
                    },
                ],
            })
        };
        let bind_groups = PingPong::new(make_bind_group(Slot::A), make_bind_group(Slot::B));

        Self {
            clear_pipeline: create_pipeline(
                device,
                "Heat Clear Pipeline",
                &pipeline_layout,
                &shader,
                "clear",
            ),
            update_pipeline: create_pipeline(
                device,
                "Heat Update Pipeline",
                &pipeline_layout,
                &shader,
                "update",
            ),
            draw_pipeline: create_pipeline(
                device,
                "Heat Draw Pipeline",
                &pipeline_layout,
                &shader,
                "draw",
            ),
            grids,
            image,
            bind_groups,
            workgroups: size.workgroups(),
        }
    }

    pub fn grid(&self, slot: Slot) -> &wgpu::Buffer {
        self.grids.get(slot)
    }

    /// Record this component's share of `pass`.
    pub fn record(&self, cpass: &mut wgpu::ComputePass<'_>, pass: Pass, roles: GridRoles) {
        let pipeline = match pass {
            Pass::Decay => &self.clear_pipeline,
            Pass::Update => &self.update_pipeline,
            Pass::Draw => &self.draw_pipeline,
        };
        cpass.set_pipeline(pipeline);
        cpass.set_bind_group(0, self.bind_groups.get(roles.read()), &[]);
        cpass.dispatch_workgroups(self.workgroups.0, self.workgroups.1, 1);
    }
}
