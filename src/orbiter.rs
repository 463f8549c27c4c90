//! Orbiters: particles bound to an attractor by a damped spring.
//!
//! Each orbiter chases a target point that circles its attractor. The spring
//! pulls the particle toward the target while damping bleeds off velocity,
//! producing a smooth, lagging orbit.

use glam::Vec2;

use crate::attractor::{AttractorField, ATTRACTOR_COUNT};
use crate::error::MandalaError;
use crate::spawn::SpawnContext;

/// Upper bound applied to every timestep before integration (seconds).
pub const MAX_DT: f32 = 0.05;

/// A single simulated particle.
///
/// `radius`, `omega`, `k` and `damping` are fixed at creation; only the
/// angle, position, previous position and velocity change per step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orbiter {
    /// Current position in screen pixels.
    pub position: Vec2,
    /// Position before the most recent step (trail origin).
    pub previous: Vec2,
    /// Velocity in pixels per second.
    pub velocity: Vec2,
    /// Index of the attractor this orbiter follows.
    pub attractor: usize,
    /// Current orbital angle (radians).
    pub angle: f32,
    radius: f32,
    omega: f32,
    k: f32,
    damping: f32,
    /// Breathing: base point size.
    pub size_base: f32,
    /// Breathing: point size amplitude.
    pub size_amp: f32,
    /// Breathing: angular speed (radians per second).
    pub size_speed: f32,
    /// Breathing: phase offset (radians).
    pub size_phase: f32,
}

impl Orbiter {
    /// Spawn one orbiter following `attractor`, placed exactly on its orbit.
    pub fn spawn(ctx: &mut SpawnContext, field: &AttractorField, attractor: usize) -> Self {
        let min_extent = ctx.min_extent();
        let radius = ctx.random_range(min_extent * 0.08, min_extent * 0.38);
        let angle = ctx.random_angle();
        let omega = ctx.random_angular_frequency(0.04, 0.35);
        let k = ctx.random_range(4.0, 10.0);
        let damping = ctx.random_range(1.4, 3.2);

        let target = orbit_point(field.position(attractor), angle, radius);

        let size_base = ctx.random_range(2.0, 3.5);
        let size_amp = ctx.random_range(1.2, 2.8);
        let size_speed = ctx.random_angular_frequency(0.6, 1.6);
        let size_phase = ctx.random_angle();

        Self {
            position: target,
            previous: target,
            velocity: Vec2::ZERO,
            attractor,
            angle,
            radius,
            omega,
            k,
            damping,
            size_base,
            size_amp,
            size_speed,
            size_phase,
        }
    }

    /// Spawn `count` orbiters, assigned round-robin to the attractors.
    ///
    /// Fails with [`MandalaError::Allocation`] if the population cannot be
    /// allocated; the caller must abort since the mandala cannot run empty.
    pub fn spawn_population(
        ctx: &mut SpawnContext,
        field: &AttractorField,
        count: usize,
    ) -> Result<Vec<Orbiter>, MandalaError> {
        if count == 0 {
            return Err(MandalaError::Allocation { count });
        }
        let mut orbiters = Vec::new();
        orbiters
            .try_reserve_exact(count)
            .map_err(|_| MandalaError::Allocation { count })?;
        for i in 0..count {
            orbiters.push(Orbiter::spawn(ctx, field, i % ATTRACTOR_COUNT));
        }
        Ok(orbiters)
    }

    /// Orbital radius in pixels.
    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Angular velocity (radians per second).
    #[inline]
    pub fn omega(&self) -> f32 {
        self.omega
    }

    /// Spring constant.
    #[inline]
    pub fn k(&self) -> f32 {
        self.k
    }

    /// Damping coefficient.
    #[inline]
    pub fn damping(&self) -> f32 {
        self.damping
    }

    /// Current speed in pixels per second.
    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Advance one timestep toward the orbit around `attractor`.
    ///
    /// Semi-implicit Euler: velocity is updated first and the new velocity
    /// moves the position. `dt` must already be clamped to [`MAX_DT`].
    #[inline]
    pub fn step(&mut self, attractor: Vec2, dt: f32) {
        self.previous = self.position;
        self.angle += self.omega * dt;
        let target = orbit_point(attractor, self.angle, self.radius);
        let accel = self.k * (target - self.position) - self.damping * self.velocity;
        self.velocity += accel * dt;
        self.position += self.velocity * dt;
    }
}

/// Point on the circle of `radius` around `center` at `angle`.
#[inline]
fn orbit_point(center: Vec2, angle: f32, radius: f32) -> Vec2 {
    Vec2::new(
        center.x + angle.cos() * radius,
        center.y + angle.sin() * radius,
    )
}

/// Clamp a raw frame delta to the integration bound.
#[inline]
pub fn clamp_dt(dt: f64) -> f64 {
    dt.clamp(0.0, MAX_DT as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(seed: u64, count: usize) -> (AttractorField, Vec<Orbiter>) {
        let mut ctx = SpawnContext::seeded(seed, 800, 600);
        let field = AttractorField::new(&mut ctx);
        let orbiters = Orbiter::spawn_population(&mut ctx, &field, count).unwrap();
        (field, orbiters)
    }

    #[test]
    fn test_spawn_on_orbit_at_rest() {
        let (field, orbiters) = scene(1, 30);
        for o in &orbiters {
            let center = field.position(o.attractor);
            let d = (o.position - center).length();
            assert!((d - o.radius()).abs() < 1e-2);
            assert_eq!(o.position, o.previous);
            assert_eq!(o.velocity, Vec2::ZERO);
        }
    }

    #[test]
    fn test_round_robin_assignment() {
        let (_, orbiters) = scene(2, 10);
        let assigned: Vec<usize> = orbiters.iter().map(|o| o.attractor).collect();
        assert_eq!(assigned, vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_parameter_bounds() {
        let (_, orbiters) = scene(3, 500);
        for o in &orbiters {
            assert!(o.radius() >= 600.0 * 0.08 - 1e-3 && o.radius() <= 600.0 * 0.38 + 1e-3);
            assert!(o.k() >= 4.0 && o.k() <= 10.0);
            assert!(o.damping() >= 1.4 && o.damping() <= 3.2);
            assert!(o.size_base >= 2.0 && o.size_base <= 3.5);
            assert!(o.size_amp >= 1.2 && o.size_amp <= 2.8);
        }
    }

    #[test]
    fn test_seed_determines_population() {
        let (_, a) = scene(42, 64);
        let (_, b) = scene(42, 64);
        assert_eq!(a, b);
        let (_, c) = scene(43, 64);
        assert_ne!(a, c);
    }

    #[test]
    fn test_zero_count_is_rejected() {
        let mut ctx = SpawnContext::seeded(0, 800, 600);
        let field = AttractorField::new(&mut ctx);
        let err = Orbiter::spawn_population(&mut ctx, &field, 0).unwrap_err();
        assert!(matches!(err, MandalaError::Allocation { count: 0 }));
    }

    #[test]
    fn test_step_matches_semi_implicit_euler() {
        let (field, orbiters) = scene(4, 1);
        let mut o = orbiters[0];
        o.velocity = Vec2::new(3.0, -2.0);
        let before = o;
        let attractor = field.position(o.attractor);
        let dt = 0.016;

        o.step(attractor, dt);

        let angle = before.angle + before.omega() * dt;
        let target = Vec2::new(
            attractor.x + angle.cos() * before.radius(),
            attractor.y + angle.sin() * before.radius(),
        );
        let accel = before.k() * (target - before.position) - before.damping() * before.velocity;
        let velocity = before.velocity + accel * dt;
        assert_eq!(o.previous, before.position);
        assert_eq!(o.velocity, velocity);
        assert_eq!(o.position, before.position + velocity * dt);
        assert_eq!(o.radius(), before.radius());
        assert_eq!(o.k(), before.k());
    }

    #[test]
    fn test_clamp_dt() {
        assert_eq!(clamp_dt(0.016), 0.016);
        assert_eq!(clamp_dt(0.1), MAX_DT as f64);
        assert_eq!(clamp_dt(-1.0), 0.0);
    }

    #[test]
    fn test_stays_near_orbit() {
        let (mut field, mut orbiters) = scene(5, 60);
        let mut t = 0.0f32;
        for _ in 0..2000 {
            t += MAX_DT;
            field.update(t);
            for o in &mut orbiters {
                o.step(field.position(o.attractor), MAX_DT);
            }
        }
        for o in &orbiters {
            let d = (o.position - field.position(o.attractor)).length();
            assert!(d < o.radius() + 400.0, "orbiter drifted {d}px from its attractor");
        }
    }
}
