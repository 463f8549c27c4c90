//! Precompute stage: physical state to per-particle render attributes.
//!
//! The output buffer is a disposable per-frame cache. It is laid out for
//! direct upload to the GPU as a storage buffer.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::orbiter::Orbiter;
use crate::parallel::WorkerPool;
use crate::visuals::Palette;

/// Smallest rendered point radius in pixels.
pub const MIN_POINT_RADIUS: u32 = 1;
/// Largest rendered point radius in pixels. Points stay crisp.
pub const MAX_POINT_RADIUS: u32 = 3;
/// Pixels of extra radius per pixel/second of speed.
pub const SPEED_SIZE_SCALE: f32 = 0.015;
/// Cap on the speed contribution to the radius.
pub const SPEED_SIZE_CAP: f32 = 2.0;

/// Render attributes for one orbiter.
///
/// Matches the `Attributes` struct in the particle shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct RenderAttributes {
    /// Current position relative to the render center.
    pub offset: Vec2,
    /// Previous position relative to the render center.
    pub previous_offset: Vec2,
    /// Point radius in pixels, within `MIN_POINT_RADIUS..=MAX_POINT_RADIUS`.
    pub radius: u32,
    /// RGBA color, alpha always 255.
    pub color: [u8; 4],
}

/// Per-frame inputs shared by every particle in the precompute stage.
#[derive(Debug, Clone, Copy)]
pub struct PrecomputeParams {
    /// Render center in screen pixels.
    pub center: Vec2,
    /// Simulation time in seconds.
    pub time: f32,
    /// Global point size multiplier.
    pub point_scale: f32,
    /// Palette for particle colors.
    pub palette: Palette,
    /// Global saturation multiplier.
    pub saturation: f32,
}

/// Point radius for an orbiter at time `t`, clamped to the crisp range.
#[inline]
pub fn point_radius(orbiter: &Orbiter, t: f32, point_scale: f32) -> u32 {
    let breath = 0.5 + 0.5 * (orbiter.size_speed * t + orbiter.size_phase).sin();
    let base = orbiter.size_base * point_scale;
    let amp = orbiter.size_amp * point_scale;
    let speed = (orbiter.speed() * SPEED_SIZE_SCALE).min(SPEED_SIZE_CAP);
    let r = (base + amp * breath + speed).round();
    (r.max(0.0) as u32).clamp(MIN_POINT_RADIUS, MAX_POINT_RADIUS)
}

/// Attributes for orbiter `index`. Depends only on that orbiter and `params`.
#[inline]
pub fn attributes_for(index: usize, orbiter: &Orbiter, params: &PrecomputeParams) -> RenderAttributes {
    let [r, g, b] = params
        .palette
        .particle_color(index, params.time, params.saturation);
    RenderAttributes {
        offset: orbiter.position - params.center,
        previous_offset: orbiter.previous - params.center,
        radius: point_radius(orbiter, params.time, params.point_scale),
        color: [r, g, b, 255],
    }
}

/// Fill `out` with the attributes of every orbiter, in parallel.
///
/// `out` must be the same length as `orbiters`.
pub fn precompute(
    pool: &WorkerPool,
    orbiters: &[Orbiter],
    params: &PrecomputeParams,
    out: &mut [RenderAttributes],
) {
    pool.map_into(orbiters, out, |i, orbiter| attributes_for(i, orbiter, params));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attractor::AttractorField;
    use crate::integrator::integrate_serial;
    use crate::spawn::SpawnContext;

    fn params(time: f32) -> PrecomputeParams {
        PrecomputeParams {
            center: Vec2::new(400.0, 300.0),
            time,
            point_scale: 1.0,
            palette: Palette::Neon,
            saturation: 0.65,
        }
    }

    fn moving_population(count: usize) -> Vec<Orbiter> {
        let mut ctx = SpawnContext::seeded(8, 800, 600);
        let mut field = AttractorField::new(&mut ctx);
        let mut orbiters = Orbiter::spawn_population(&mut ctx, &field, count).unwrap();
        for step in 1..=40 {
            field.update(step as f32 * 0.02);
            integrate_serial(&mut orbiters, &field, 0.02);
        }
        orbiters
    }

    #[test]
    fn test_layout_is_gpu_friendly() {
        assert_eq!(std::mem::size_of::<RenderAttributes>(), 24);
    }

    #[test]
    fn test_radius_always_in_range() {
        let orbiters = moving_population(300);
        for scale in [0.1f32, 1.0, 5.0] {
            for o in &orbiters {
                for step in 0..20 {
                    let r = point_radius(o, step as f32 * 0.13, scale);
                    assert!((MIN_POINT_RADIUS..=MAX_POINT_RADIUS).contains(&r));
                }
            }
        }
    }

    #[test]
    fn test_offsets_relative_to_center() {
        let orbiters = moving_population(5);
        let p = params(1.0);
        for (i, o) in orbiters.iter().enumerate() {
            let a = attributes_for(i, o, &p);
            assert_eq!(a.offset + p.center, o.position);
            assert_eq!(a.previous_offset, o.previous - p.center);
            assert_eq!(a.color[3], 255);
        }
    }

    #[test]
    fn test_processing_order_does_not_matter() {
        let orbiters = moving_population(257);
        let p = params(2.75);
        let pool = WorkerPool::new(4).unwrap();
        let mut forward = vec![RenderAttributes::zeroed(); orbiters.len()];
        precompute(&pool, &orbiters, &p, &mut forward);

        // Reverse and interleaved orders, one particle at a time.
        let mut reversed = vec![RenderAttributes::zeroed(); orbiters.len()];
        for i in (0..orbiters.len()).rev() {
            reversed[i] = attributes_for(i, &orbiters[i], &p);
        }
        let mut strided = vec![RenderAttributes::zeroed(); orbiters.len()];
        for start in 0..7 {
            for i in (start..orbiters.len()).step_by(7) {
                strided[i] = attributes_for(i, &orbiters[i], &p);
            }
        }
        assert_eq!(forward, reversed);
        assert_eq!(forward, strided);
    }

    #[test]
    fn test_thread_count_does_not_change_output() {
        let orbiters = moving_population(100);
        let p = params(0.5);
        let mut one = vec![RenderAttributes::zeroed(); orbiters.len()];
        let mut many = vec![RenderAttributes::zeroed(); orbiters.len()];
        precompute(&WorkerPool::new(1).unwrap(), &orbiters, &p, &mut one);
        precompute(&WorkerPool::new(6).unwrap(), &orbiters, &p, &mut many);
        assert_eq!(one, many);
    }
}
