//! Seeded spawn context for attractor and orbiter initialization.
//!
//! Every random draw made while building the scene goes through one
//! `SpawnContext`, so a seed fully determines the initial state.

use glam::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// Context handed to the scene constructors with the render size and RNG.
///
/// ```ignore
/// let mut ctx = SpawnContext::seeded(42, 800, 600);
/// let field = AttractorField::new(&mut ctx);
/// let orbiters = Orbiter::spawn_population(&mut ctx, &field, 1_000)?;
/// ```
pub struct SpawnContext {
    /// Render target width in pixels.
    pub width: u32,
    /// Render target height in pixels.
    pub height: u32,
    rng: SmallRng,
}

impl SpawnContext {
    /// Create a context whose draws are fully determined by `seed`.
    pub fn seeded(seed: u64, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Center of the render target.
    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width as f32 * 0.5, self.height as f32 * 0.5)
    }

    /// Render target size as a vector.
    #[inline]
    pub fn extent(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    /// The shorter of the two screen dimensions.
    #[inline]
    pub fn min_extent(&self) -> f32 {
        self.width.min(self.height) as f32
    }

    // ========== Random primitives ==========

    /// Random f32 between 0.0 and 1.0.
    #[inline]
    pub fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Random f32 between `min` and `max`.
    ///
    /// Interpolates instead of using `gen_range` so degenerate ranges
    /// (`min == max`) return `min` rather than panicking.
    #[inline]
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.random()
    }

    /// Random angle in `[0, 2π)`.
    #[inline]
    pub fn random_angle(&mut self) -> f32 {
        self.random_range(0.0, TAU)
    }

    /// Random angular frequency (radians per second) for a rate in Hz.
    #[inline]
    pub fn random_angular_frequency(&mut self, min_hz: f32, max_hz: f32) -> f32 {
        TAU * self.random_range(min_hz, max_hz)
    }
}
