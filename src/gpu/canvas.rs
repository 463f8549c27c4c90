//! The off-screen canvas.
//!
//! Every layer is drawn into a texture `factor` times the surface size, then
//! downsampled onto the surface with a linear-filtered fullscreen pass. The
//! canvas persists between frames so the background fade leaves trails.

use crate::error::GpuError;
use crate::shader::BLIT_SOURCE;

/// Format of the canvas texture.
///
/// Blending happens on non-linear 8-bit values, like a plain framebuffer.
pub const CANVAS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Largest supported supersampling factor.
pub const MAX_SUPERSAMPLING: u32 = 4;

pub struct Canvas {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
    factor: u32,
    fresh: bool,
}

impl Canvas {
    /// Create a canvas of `width` x `height` surface pixels at `factor`.
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        factor: u32,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self, GpuError> {
        let (texture, view) = allocate(device, width, height, factor)?;

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Canvas Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(BLIT_SOURCE.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blit Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let bind_group = create_bind_group(device, &bind_group_layout, &view, &sampler);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blit Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            texture,
            view,
            sampler,
            bind_group_layout,
            bind_group,
            pipeline,
            factor,
            fresh: true,
        })
    }

    /// Reallocate for a new surface size or supersampling factor.
    ///
    /// On failure the old texture is kept, so the caller may retry with a
    /// smaller factor.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
        factor: u32,
    ) -> Result<(), GpuError> {
        let (texture, view) = allocate(device, width, height, factor)?;
        self.bind_group = create_bind_group(device, &self.bind_group_layout, &view, &self.sampler);
        self.texture = texture;
        self.view = view;
        self.factor = factor;
        self.fresh = true;
        log::debug!(
            "canvas {}x{} at SSAA={}",
            self.texture.width(),
            self.texture.height(),
            factor
        );
        Ok(())
    }

    /// Whether the canvas has not been drawn to yet. Clears the flag.
    pub fn take_fresh(&mut self) -> bool {
        std::mem::replace(&mut self.fresh, false)
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn factor(&self) -> u32 {
        self.factor
    }

    /// Downsample the canvas onto `target`.
    pub fn blit(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Blit Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

/// Canvas size in texels for a surface size and factor.
pub fn canvas_extent(width: u32, height: u32, factor: u32) -> (u32, u32) {
    (
        width.max(1).saturating_mul(factor.max(1)),
        height.max(1).saturating_mul(factor.max(1)),
    )
}

fn allocate(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    factor: u32,
) -> Result<(wgpu::Texture, wgpu::TextureView), GpuError> {
    let (w, h) = canvas_extent(width, height, factor);
    let refuse = |reason: String| GpuError::RenderTarget {
        factor,
        width: w,
        height: h,
        reason,
    };

    let max = device.limits().max_texture_dimension_2d;
    if w > max || h > max {
        return Err(refuse(format!("exceeds the device limit of {}", max)));
    }

    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Canvas Texture"),
        size: wgpu::Extent3d {
            width: w,
            height: h,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: CANVAS_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(refuse(err.to_string()));
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Ok((texture, view))
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Blit Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_extent() {
        assert_eq!(canvas_extent(800, 600, 2), (1600, 1200));
        assert_eq!(canvas_extent(800, 600, 0), (800, 600));
        assert_eq!(canvas_extent(0, 0, 3), (3, 3));
        assert_eq!(canvas_extent(u32::MAX, 1, 4), (u32::MAX, 4));
    }
}
