//! The render façade.
//!
//! The frame pipeline hands each frame to a [`RenderSink`]. The GPU renderer
//! implements it for on-screen output; [`NullRenderer`] implements it for
//! headless runs and tests.

use glam::Vec2;

use crate::attractor::ATTRACTOR_COUNT;
use crate::error::GpuError;
use crate::precompute::RenderAttributes;
use crate::quality::QualityState;
use crate::visuals::Palette;

/// Everything a renderer needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    /// Per-particle attributes, indexed like the orbiter population.
    pub attributes: &'a [RenderAttributes],
    pub quality: QualityState,
    /// Simulated time in seconds.
    pub time: f32,
    /// Render center in output pixels.
    pub center: Vec2,
    /// Attractor positions in output pixels.
    pub attractors: [Vec2; ATTRACTOR_COUNT],
    pub palette: Palette,
    /// Alpha of the background fade, 0 to 255.
    pub background_alpha: u8,
    pub mirror: bool,
    pub show_attractors: bool,
    pub trail: bool,
}

impl FrameView<'_> {
    /// Mirrored copies per rotation.
    #[inline]
    pub fn mirror_copies(&self) -> u32 {
        if self.mirror {
            2
        } else {
            1
        }
    }

    /// Total copies drawn per particle.
    #[inline]
    pub fn copies(&self) -> u32 {
        self.quality.symmetry.max(1) * self.mirror_copies()
    }

    /// Indices of the particles drawn this frame, honoring the render fraction.
    pub fn drawn_indices(&self) -> impl Iterator<Item = usize> {
        (0..self.attributes.len()).step_by(self.quality.draw_stride())
    }

    /// Opacity of each draw layer for this frame.
    pub fn layer_alphas(&self) -> LayerAlphas {
        LayerAlphas::new(self.copies(), self.quality.glow)
    }
}

/// Per-layer opacity in 8-bit units.
///
/// Every layer is divided by the number of copies so that more symmetry
/// does not saturate the canvas; each keeps a visible minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerAlphas {
    /// Line from the previous to the current position.
    pub trail: f32,
    /// First tail disc; later discs are divided by their distance index.
    pub tail: f32,
    /// Soft glow halo (0 when glow is off).
    pub halo: f32,
    /// The particle itself.
    pub nucleus: f32,
}

impl LayerAlphas {
    pub fn new(copies: u32, glow: bool) -> Self {
        let div = copies.max(1) as f32;
        let scale = if glow { 1.0 } else { 0.6 };
        Self {
            trail: (90.0 * scale / div).max(4.0).floor(),
            tail: (34.0 * scale / div).max(3.0).floor(),
            halo: if glow { (50.0 / div).max(8.0).floor() } else { 0.0 },
            nucleus: (210.0 / div).max(70.0).floor(),
        }
    }

    /// Alpha of tail disc `c` (1-based, counting back from the particle).
    pub fn tail_disc(&self, c: u32) -> f32 {
        (self.tail / c.max(1) as f32).max(3.0).floor()
    }
}

/// A sink for rendered frames.
pub trait RenderSink {
    /// Reallocate the off-screen canvas at `factor` times the output size.
    ///
    /// Returns the factor actually in effect. On error the previous canvas
    /// may already be gone; the caller should retry with `1`.
    fn resize_supersampling(&mut self, factor: u32) -> Result<u32, GpuError>;

    /// Draw and present one frame.
    fn submit(&mut self, frame: &FrameView<'_>) -> Result<(), GpuError>;
}

/// What a [`NullRenderer`] saw of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    pub quality: QualityState,
    pub time: f32,
    pub particles: usize,
    pub drawn: usize,
}

/// Headless renderer that records frames instead of drawing them.
#[derive(Debug, Default)]
pub struct NullRenderer {
    frames: Vec<RecordedFrame>,
    supersampling_requests: Vec<u32>,
    max_supersampling: Option<u32>,
    keep_frames: bool,
}

impl NullRenderer {
    /// A renderer that keeps every frame it is given.
    pub fn new() -> Self {
        Self {
            keep_frames: true,
            ..Default::default()
        }
    }

    /// A renderer that only counts frames.
    pub fn discarding() -> Self {
        Self::default()
    }

    /// Fail canvas allocations above `factor`.
    pub fn with_max_supersampling(mut self, factor: u32) -> Self {
        self.max_supersampling = Some(factor);
        self
    }

    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    /// Every factor passed to [`RenderSink::resize_supersampling`], in order.
    pub fn supersampling_requests(&self) -> &[u32] {
        &self.supersampling_requests
    }
}

impl RenderSink for NullRenderer {
    fn resize_supersampling(&mut self, factor: u32) -> Result<u32, GpuError> {
        self.supersampling_requests.push(factor);
        match self.max_supersampling {
            Some(max) if factor > max => Err(GpuError::RenderTarget {
                factor,
                width: 0,
                height: 0,
                reason: format!("limited to SSAA={}", max),
            }),
            _ => Ok(factor),
        }
    }

    fn submit(&mut self, frame: &FrameView<'_>) -> Result<(), GpuError> {
        if self.keep_frames {
            self.frames.push(RecordedFrame {
                quality: frame.quality,
                time: frame.time,
                particles: frame.attributes.len(),
                drawn: frame.drawn_indices().count(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    fn view(attributes: &[RenderAttributes], render_fraction: f32) -> FrameView<'_> {
        FrameView {
            attributes,
            quality: QualityState {
                supersampling: 1,
                render_fraction,
                glow: false,
                symmetry: 6,
            },
            time: 0.0,
            center: Vec2::new(400.0, 300.0),
            attractors: [Vec2::ZERO; ATTRACTOR_COUNT],
            palette: Palette::Neon,
            background_alpha: 10,
            mirror: true,
            show_attractors: false,
            trail: false,
        }
    }

    #[test]
    fn test_copies() {
        let attrs = [RenderAttributes::zeroed(); 4];
        let mut v = view(&attrs, 1.0);
        assert_eq!(v.copies(), 12);
        v.mirror = false;
        assert_eq!(v.copies(), 6);
    }

    #[test]
    fn test_layer_alphas() {
        let single = LayerAlphas::new(1, true);
        assert_eq!(single.trail, 90.0);
        assert_eq!(single.tail, 34.0);
        assert_eq!(single.halo, 50.0);
        assert_eq!(single.nucleus, 210.0);
        assert_eq!(single.tail_disc(2), 17.0);

        // Default 6-fold mirrored mandala without glow.
        let dim = LayerAlphas::new(12, false);
        assert_eq!(dim.trail, 4.0);
        assert_eq!(dim.tail, 3.0);
        assert_eq!(dim.halo, 0.0);
        assert_eq!(dim.nucleus, 70.0);
        assert_eq!(dim.tail_disc(2), 3.0);
    }

    #[test]
    fn test_drawn_indices_follow_stride() {
        let attrs = vec![RenderAttributes::zeroed(); 10];
        let all: Vec<usize> = view(&attrs, 1.0).drawn_indices().collect();
        assert_eq!(all.len(), 10);
        let half: Vec<usize> = view(&attrs, 0.5).drawn_indices().collect();
        assert_eq!(half, vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn test_null_renderer_records() {
        let attrs = vec![RenderAttributes::zeroed(); 10];
        let mut r = NullRenderer::new().with_max_supersampling(2);
        r.submit(&view(&attrs, 0.5)).unwrap();
        assert_eq!(r.frames().len(), 1);
        assert_eq!(r.frames()[0].drawn, 5);
        assert_eq!(r.resize_supersampling(2).unwrap(), 2);
        assert!(r.resize_supersampling(3).is_err());
        assert_eq!(r.supersampling_requests(), &[2, 3]);
    }
}
