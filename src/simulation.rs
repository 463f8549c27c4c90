//! The simulated world: attractors, orbiters and their render attributes.

use bytemuck::Zeroable;
use glam::Vec2;

use crate::attractor::{AttractorField, ATTRACTOR_COUNT};
use crate::error::MandalaError;
use crate::integrator::integrate;
use crate::orbiter::{clamp_dt, Orbiter};
use crate::parallel::WorkerPool;
use crate::precompute::{precompute, PrecomputeParams, RenderAttributes};
use crate::spawn::SpawnContext;
use crate::visuals::Palette;

/// Owns the physical state and the per-frame attribute cache.
///
/// Physics state is authoritative; `attributes` is rebuilt every frame.
pub struct Simulation {
    field: AttractorField,
    orbiters: Vec<Orbiter>,
    attributes: Vec<RenderAttributes>,
    pool: WorkerPool,
    time: f64,
    width: u32,
    height: u32,
}

impl Simulation {
    /// Seed a world of `count` orbiters on a `width` x `height` canvas.
    ///
    /// Fails if the population or the attribute cache cannot be allocated,
    /// or if the worker pool cannot be started.
    pub fn new(
        seed: u64,
        width: u32,
        height: u32,
        count: usize,
        threads: usize,
    ) -> Result<Self, MandalaError> {
        let mut ctx = SpawnContext::seeded(seed, width, height);
        let field = AttractorField::new(&mut ctx);
        let orbiters = Orbiter::spawn_population(&mut ctx, &field, count)?;

        let mut attributes = Vec::new();
        attributes
            .try_reserve_exact(count)
            .map_err(|_| MandalaError::Allocation { count })?;
        attributes.resize(count, RenderAttributes::zeroed());

        let pool = WorkerPool::new(threads)?;
        log::info!(
            "seeded {} orbiters around {} attractors (seed {}, {} threads)",
            count,
            ATTRACTOR_COUNT,
            seed,
            pool.threads()
        );

        Ok(Self {
            field,
            orbiters,
            attributes,
            pool,
            time: 0.0,
            width,
            height,
        })
    }

    /// Advance by a raw frame delta. Returns the clamped delta actually used.
    pub fn step(&mut self, raw_dt: f64) -> f64 {
        let dt = clamp_dt(raw_dt);
        self.time += dt;
        self.field.update(self.time as f32);
        integrate(&self.pool, &mut self.orbiters, &self.field, dt as f32);
        dt
    }

    /// Rebuild the attribute cache for the current state.
    pub fn precompute(&mut self, palette: Palette, point_scale: f32, saturation: f32) {
        let params = PrecomputeParams {
            center: self.center(),
            time: self.time as f32,
            point_scale,
            palette,
            saturation,
        };
        precompute(&self.pool, &self.orbiters, &params, &mut self.attributes);
    }

    /// Simulated seconds since start (sum of clamped deltas).
    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.field.center()
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn orbiters(&self) -> &[Orbiter] {
        &self.orbiters
    }

    #[inline]
    pub fn attributes(&self) -> &[RenderAttributes] {
        &self.attributes
    }

    #[inline]
    pub fn field(&self) -> &AttractorField {
        &self.field
    }

    /// Effective worker count.
    #[inline]
    pub fn threads(&self) -> usize {
        self.pool.threads()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.orbiters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orbiters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbiter::MAX_DT;

    #[test]
    fn test_new_world() {
        let sim = Simulation::new(7, 800, 600, 33, 2).unwrap();
        assert_eq!(sim.len(), 33);
        assert_eq!(sim.attributes().len(), 33);
        assert_eq!(sim.center(), Vec2::new(400.0, 300.0));
        assert_eq!(sim.threads(), 2);
        assert_eq!(sim.time(), 0.0);
    }

    #[test]
    fn test_step_clamps_and_accumulates() {
        let mut sim = Simulation::new(7, 800, 600, 10, 1).unwrap();
        assert_eq!(sim.step(0.01), 0.01);
        assert_eq!(sim.step(1.0), MAX_DT as f64);
        assert!((sim.time() - (0.01 + MAX_DT as f64)).abs() < 1e-12);
    }

    #[test]
    fn test_precompute_fills_cache() {
        let mut sim = Simulation::new(9, 800, 600, 20, 2).unwrap();
        sim.step(0.016);
        sim.precompute(Palette::Ocean, 1.0, 0.65);
        for (a, o) in sim.attributes().iter().zip(sim.orbiters()) {
            assert_eq!(a.offset, o.position - sim.center());
            assert!(a.radius >= 1);
        }
    }

    #[test]
    fn test_empty_population_is_fatal() {
        assert!(matches!(
            Simulation::new(1, 800, 600, 0, 1),
            Err(MandalaError::Allocation { count: 0 })
        ));
    }
}
