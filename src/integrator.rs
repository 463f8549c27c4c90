//! Physics integrator: advances the whole population one timestep.

use crate::attractor::AttractorField;
use crate::orbiter::{Orbiter, MAX_DT};
use crate::parallel::WorkerPool;

/// Advance every orbiter by `dt` seconds (clamped to [`MAX_DT`]).
///
/// Attractors are read-only for the duration of the step, so particles are
/// integrated independently across the worker pool.
pub fn integrate(pool: &WorkerPool, orbiters: &mut [Orbiter], field: &AttractorField, dt: f32) {
    let dt = dt.clamp(0.0, MAX_DT);
    let attractors = field.positions();
    pool.for_each_mut(orbiters, |_, orbiter| {
        orbiter.step(attractors[orbiter.attractor], dt);
    });
}

/// Single-threaded reference for [`integrate`].
pub fn integrate_serial(orbiters: &mut [Orbiter], field: &AttractorField, dt: f32) {
    let dt = dt.clamp(0.0, MAX_DT);
    let attractors = field.positions();
    for orbiter in orbiters {
        orbiter.step(attractors[orbiter.attractor], dt);
    }
}
