//! WGSL sources and the GPU-side structs they read.

use bytemuck::{Pod, Zeroable};

use crate::render::FrameView;
use crate::visuals::Palette;

/// Sprites, trail lines and the background fade.
pub const PARTICLES_SOURCE: &str = include_str!("shaders/particles.wgsl");
/// Attractor guide outlines.
pub const GUIDES_SOURCE: &str = include_str!("shaders/guides.wgsl");
/// Canvas to surface downsample.
pub const BLIT_SOURCE: &str = include_str!("shaders/blit.wgsl");

/// Vertices per particle instance: four quads of two triangles.
pub const SPRITE_VERTICES: u32 = 24;
/// Half the side of an attractor guide square, in pixels.
pub const GUIDE_HALF_SIZE: f32 = 14.0;
/// Opacity of attractor guides, 8-bit units.
pub const GUIDE_ALPHA: u8 = 24;

/// Matches `Frame` in the WGSL sources.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub canvas: [f32; 2],
    pub center: [f32; 2],
    pub symmetry: u32,
    pub mirror_copies: u32,
    pub stride: u32,
    pub copies: u32,
    pub alphas: [f32; 4],
    pub background: [f32; 4],
}

impl FrameUniforms {
    /// Uniforms for `view` on a canvas of logical size `canvas`.
    pub fn new(view: &FrameView<'_>, canvas: [f32; 2]) -> Self {
        let alphas = view.layer_alphas();
        let [r, g, b] = view.palette.background_tint(view.time);
        Self {
            canvas,
            center: view.center.to_array(),
            symmetry: view.quality.symmetry.max(1),
            mirror_copies: view.mirror_copies(),
            stride: view.quality.draw_stride() as u32,
            copies: view.copies(),
            alphas: [alphas.trail, alphas.tail, alphas.halo, alphas.nucleus],
            background: [
                r as f32 / 255.0,
                g as f32 / 255.0,
                b as f32 / 255.0,
                view.background_alpha as f32 / 255.0,
            ],
        }
    }
}

/// One vertex of an attractor guide outline.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GuideVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl GuideVertex {
    pub const ATTRIBS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GuideVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Line-list outlines of a square around each attractor.
pub fn guide_vertices(view: &FrameView<'_>) -> Vec<GuideVertex> {
    let mut out = Vec::with_capacity(view.attractors.len() * 8);
    for (k, pos) in view.attractors.iter().enumerate() {
        let color = guide_color(view.palette, k, view.time);
        let h = GUIDE_HALF_SIZE;
        let corners = [
            [pos.x - h, pos.y - h],
            [pos.x + h, pos.y - h],
            [pos.x + h, pos.y + h],
            [pos.x - h, pos.y + h],
        ];
        for i in 0..4 {
            out.push(GuideVertex { position: corners[i], color });
            out.push(GuideVertex { position: corners[(i + 1) % 4], color });
        }
    }
    out
}

fn guide_color(palette: Palette, k: usize, t: f32) -> [f32; 4] {
    let [r, g, b] = palette.attractor_color(k, t);
    [
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        GUIDE_ALPHA as f32 / 255.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attractor::ATTRACTOR_COUNT;
    use crate::precompute::RenderAttributes;
    use crate::quality::QualityState;
    use glam::Vec2;

    /// Validates WGSL code using naga.
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

    fn view(attributes: &[RenderAttributes]) -> FrameView<'_> {
        FrameView {
            attributes,
            quality: QualityState {
                supersampling: 2,
                render_fraction: 0.5,
                glow: true,
                symmetry: 6,
            },
            time: 1.0,
            center: Vec2::new(400.0, 300.0),
            attractors: [Vec2::new(100.0, 100.0); ATTRACTOR_COUNT],
            palette: Palette::Ocean,
            background_alpha: 255,
            mirror: true,
            show_attractors: true,
            trail: true,
        }
    }

    #[test]
    fn test_shaders_validate() {
        for (name, src) in [
            ("particles", PARTICLES_SOURCE),
            ("guides", GUIDES_SOURCE),
            ("blit", BLIT_SOURCE),
        ] {
            if let Err(e) = validate_wgsl(src) {
                panic!("{} shader failed validation: {}", name, e);
            }
        }
    }

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 64);
        assert_eq!(std::mem::size_of::<GuideVertex>(), 24);
    }

    #[test]
    fn test_uniforms_from_view() {
        let attrs = [RenderAttributes::zeroed(); 3];
        let u = FrameUniforms::new(&view(&attrs), [800.0, 600.0]);
        assert_eq!(u.copies, 12);
        assert_eq!(u.mirror_copies, 2);
        assert_eq!(u.stride, 2);
        assert_eq!(u.background[3], 1.0);
        assert_eq!(u.alphas[2], 8.0);
    }

    #[test]
    fn test_guide_outlines() {
        let attrs = [RenderAttributes::zeroed(); 1];
        let v = guide_vertices(&view(&attrs));
        assert_eq!(v.len(), ATTRACTOR_COUNT * 8);
        assert_eq!(v[0].position, [86.0, 86.0]);
        assert_eq!(v[7].position, [86.0, 86.0]);
        assert!((v[0].color[3] - 24.0 / 255.0).abs() < 1e-6);
    }
}
