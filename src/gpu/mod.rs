//! GPU rendering with wgpu.
//!
//! [`GpuRenderer`] owns the surface, the off-screen canvas and the pipelines
//! for each draw layer. Per frame it uploads the render attributes as a
//! storage buffer and draws, in order:
//!
//! 1. a fullscreen fade toward the background tint
//! 2. trail lines (additive with glow, alpha-blended without)
//! 3. sprites: two tail discs, the halo and the nucleus per copy
//! 4. attractor guides, if enabled
//!
//! and then downsamples the canvas onto the surface.

mod canvas;

use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::attractor::ATTRACTOR_COUNT;
use crate::error::GpuError;
use crate::precompute::RenderAttributes;
use crate::render::{FrameView, RenderSink};
use crate::shader::{
    guide_vertices, FrameUniforms, GuideVertex, GUIDES_SOURCE, PARTICLES_SOURCE, SPRITE_VERTICES,
};

use canvas::{Canvas, CANVAS_FORMAT, MAX_SUPERSAMPLING};

const ATTRIBUTE_SIZE: u64 = std::mem::size_of::<RenderAttributes>() as u64;

const ADDITIVE_BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

/// On-screen renderer.
pub struct GpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    canvas: Canvas,
    /// Size of the simulation's coordinate space.
    logical: [f32; 2],
    frame_buffer: wgpu::Buffer,
    particle_buffer: wgpu::Buffer,
    particle_capacity: u64,
    guide_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    fade_pipeline: wgpu::RenderPipeline,
    trail_pipeline: wgpu::RenderPipeline,
    glow_trail_pipeline: wgpu::RenderPipeline,
    sprite_pipeline: wgpu::RenderPipeline,
    guide_pipeline: wgpu::RenderPipeline,
}

impl GpuRenderer {
    /// Set up the GPU for `window`.
    ///
    /// `logical` is the simulation's canvas size; it is stretched over the
    /// window whatever its actual size. The canvas starts at SSAA=1; call
    /// [`RenderSink::resize_supersampling`] to raise it.
    pub async fn new(
        window: Arc<Window>,
        logical: (u32, u32),
        particles: usize,
        vsync: bool,
    ) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;
        log::info!("using adapter {}", adapter.get_info().name);

        // Large populations need the adapter's full storage binding size.
        let supported = adapter.limits();
        let required_limits = wgpu::Limits {
            max_storage_buffer_binding_size: supported.max_storage_buffer_binding_size,
            max_buffer_size: supported.max_buffer_size,
            ..wgpu::Limits::default().using_resolution(supported)
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits,
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::NoAdapter)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let canvas = Canvas::new(&device, config.width, config.height, 1, surface_format)?;

        let logical = [logical.0.max(1) as f32, logical.1.max(1) as f32];

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let particle_capacity = particles.max(1) as u64;
        let particle_buffer = create_particle_buffer(&device, particle_capacity)?;

        let guide_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Guide Vertex Buffer"),
            contents: bytemuck::cast_slice(&[GuideVertex {
                position: [0.0; 2],
                color: [0.0; 4],
            }; ATTRACTOR_COUNT * 8]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let bind_group =
            create_bind_group(&device, &bind_group_layout, &frame_buffer, &particle_buffer);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Frame Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let particles_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Shader"),
            source: wgpu::ShaderSource::Wgsl(PARTICLES_SOURCE.into()),
        });
        let guides_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Guide Shader"),
            source: wgpu::ShaderSource::Wgsl(GUIDES_SOURCE.into()),
        });

        let layer = |label: &str, module: &wgpu::ShaderModule, vs: &str, fs: &str, topology, blend| {
            create_layer_pipeline(
                &device,
                &pipeline_layout,
                LayerDesc {
                    label,
                    module,
                    vs,
                    fs,
                    buffers: &[],
                    topology,
                    blend,
                },
            )
        };

        let fade_pipeline = layer(
            "Fade Pipeline",
            &particles_shader,
            "vs_fade",
            "fs_fade",
            wgpu::PrimitiveTopology::TriangleList,
            wgpu::BlendState::ALPHA_BLENDING,
        );
        let trail_pipeline = layer(
            "Trail Pipeline",
            &particles_shader,
            "vs_trail",
            "fs_trail",
            wgpu::PrimitiveTopology::LineList,
            wgpu::BlendState::ALPHA_BLENDING,
        );
        let glow_trail_pipeline = layer(
            "Glow Trail Pipeline",
            &particles_shader,
            "vs_trail",
            "fs_trail",
            wgpu::PrimitiveTopology::LineList,
            ADDITIVE_BLENDING,
        );
        let sprite_pipeline = layer(
            "Sprite Pipeline",
            &particles_shader,
            "vs_sprite",
            "fs_sprite",
            wgpu::PrimitiveTopology::TriangleList,
            wgpu::BlendState::ALPHA_BLENDING,
        );
        let guide_pipeline = create_layer_pipeline(
            &device,
            &pipeline_layout,
            LayerDesc {
                label: "Guide Pipeline",
                module: &guides_shader,
                vs: "vs_main",
                fs: "fs_main",
                buffers: &[GuideVertex::layout()],
                topology: wgpu::PrimitiveTopology::LineList,
                blend: ADDITIVE_BLENDING,
            },
        );

        log::info!(
            "surface {}x{} {:?}, {}",
            config.width,
            config.height,
            config.format,
            if vsync { "vsync" } else { "no vsync" }
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            canvas,
            logical,
            frame_buffer,
            particle_buffer,
            particle_capacity,
            guide_buffer,
            bind_group_layout,
            bind_group,
            fade_pipeline,
            trail_pipeline,
            glow_trail_pipeline,
            sprite_pipeline,
            guide_pipeline,
        })
    }

    /// Reconfigure after a window resize and reallocate the canvas at the
    /// current factor. Zero sizes (minimized windows) are ignored.
    pub fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.canvas
            .resize(&self.device, width, height, self.canvas.factor())
    }

    /// Surface size in pixels.
    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn ensure_capacity(&mut self, count: usize) -> Result<(), GpuError> {
        let count = count.max(1) as u64;
        if count <= self.particle_capacity {
            return Ok(());
        }
        self.particle_buffer = create_particle_buffer(&self.device, count)?;
        self.particle_capacity = count;
        self.bind_group = create_bind_group(
            &self.device,
            &self.bind_group_layout,
            &self.frame_buffer,
            &self.particle_buffer,
        );
        Ok(())
    }
}

impl RenderSink for GpuRenderer {
    fn resize_supersampling(&mut self, factor: u32) -> Result<u32, GpuError> {
        let factor = factor.clamp(1, MAX_SUPERSAMPLING);
        let (width, height) = self.surface_size();
        self.canvas.resize(&self.device, width, height, factor)?;
        Ok(factor)
    }

    fn submit(&mut self, frame: &FrameView<'_>) -> Result<(), GpuError> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timed out, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let uniforms = FrameUniforms::new(frame, self.logical);
        self.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&uniforms));

        self.ensure_capacity(frame.attributes.len())?;
        if !frame.attributes.is_empty() {
            self.queue
                .write_buffer(&self.particle_buffer, 0, bytemuck::cast_slice(frame.attributes));
        }

        let guides = if frame.show_attractors {
            let vertices = guide_vertices(frame);
            self.queue
                .write_buffer(&self.guide_buffer, 0, bytemuck::cast_slice(&vertices));
            vertices.len() as u32
        } else {
            0
        };

        let stride = uniforms.stride.max(1) as usize;
        let drawn = frame.attributes.len().div_ceil(stride) as u32;
        let instances = drawn * uniforms.copies;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let load = if self.canvas.take_fresh() {
                wgpu::LoadOp::Clear(wgpu::Color::BLACK)
            } else {
                wgpu::LoadOp::Load
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Canvas Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.canvas.view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_bind_group(0, &self.bind_group, &[]);

            pass.set_pipeline(&self.fade_pipeline);
            pass.draw(0..3, 0..1);

            if frame.trail && instances > 0 {
                if frame.quality.glow {
                    pass.set_pipeline(&self.glow_trail_pipeline);
                } else {
                    pass.set_pipeline(&self.trail_pipeline);
                }
                pass.draw(0..2, 0..instances);
            }

            if instances > 0 {
                pass.set_pipeline(&self.sprite_pipeline);
                pass.draw(0..SPRITE_VERTICES, 0..instances);
            }

            if guides > 0 {
                pass.set_pipeline(&self.guide_pipeline);
                pass.set_vertex_buffer(0, self.guide_buffer.slice(..));
                pass.draw(0..guides, 0..1);
            }
        }

        let target = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.canvas.blit(&mut encoder, &target);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

/// One draw layer onto the canvas.
struct LayerDesc<'a> {
    label: &'a str,
    module: &'a wgpu::ShaderModule,
    vs: &'a str,
    fs: &'a str,
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    topology: wgpu::PrimitiveTopology,
    blend: wgpu::BlendState,
}

fn create_layer_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    desc: LayerDesc<'_>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: desc.module,
            entry_point: Some(desc.vs),
            buffers: desc.buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: desc.module,
            entry_point: Some(desc.fs),
            targets: &[Some(wgpu::ColorTargetState {
                format: CANVAS_FORMAT,
                blend: Some(desc.blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: desc.topology,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Bytes needed for `count` attributes, if one storage binding can hold them.
fn particle_buffer_size(count: u64, limits: &wgpu::Limits) -> Result<u64, GpuError> {
    let limit = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
    let bytes = count.saturating_mul(ATTRIBUTE_SIZE);
    if bytes > limit {
        return Err(GpuError::ParticleBuffer {
            particles: count,
            bytes,
            reason: format!("exceeds the device limit of {} bytes", limit),
        });
    }
    Ok(bytes)
}

fn create_particle_buffer(device: &wgpu::Device, count: u64) -> Result<wgpu::Buffer, GpuError> {
    let size = particle_buffer_size(count, &device.limits())?;

    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Particle Attribute Buffer"),
        size,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(GpuError::ParticleBuffer {
            particles: count,
            bytes: size,
            reason: err.to_string(),
        });
    }
    Ok(buffer)
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    frame_buffer: &wgpu::Buffer,
    particle_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Frame Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: particle_buffer.as_entire_binding(),
            },
        ],
    })
}
