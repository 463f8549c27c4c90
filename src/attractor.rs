//! Moving anchor points that orbiters are springily bound to.
//!
//! Attractor positions are never integrated: each frame they are evaluated
//! as a sinusoid of simulation time, so they wander smoothly and can never
//! diverge.

use glam::Vec2;

use crate::spawn::SpawnContext;

/// Number of attractors in the field.
pub const ATTRACTOR_COUNT: usize = 3;

/// A single oscillating anchor point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attractor {
    /// Current position in screen pixels.
    pub position: Vec2,
    /// Oscillation amplitude per axis, in pixels.
    pub amplitude: Vec2,
    /// Angular frequency per axis (radians per second).
    pub angular_frequency: Vec2,
    /// Phase offset per axis (radians).
    pub phase: Vec2,
}

impl Attractor {
    /// Position at time `t` for an oscillation centered on `center`.
    #[inline]
    pub fn position_at(&self, center: Vec2, t: f32) -> Vec2 {
        Vec2::new(
            center.x + self.amplitude.x * (self.angular_frequency.x * t + self.phase.x).sin(),
            center.y + self.amplitude.y * (self.angular_frequency.y * t + self.phase.y).sin(),
        )
    }
}

/// The fixed set of attractors, all oscillating about the screen center.
#[derive(Debug, Clone)]
pub struct AttractorField {
    attractors: [Attractor; ATTRACTOR_COUNT],
    center: Vec2,
}

impl AttractorField {
    /// Seed amplitudes, frequencies and phases from the spawn context.
    ///
    /// Amplitude lies in 20–35% of the screen extent on each axis, frequency
    /// in 0.05–0.15 Hz per axis. All attractors start at the center.
    pub fn new(ctx: &mut SpawnContext) -> Self {
        let center = ctx.center();
        let extent = ctx.extent();
        let attractors = std::array::from_fn(|_| {
            let amplitude = Vec2::new(
                ctx.random_range(extent.x * 0.20, extent.x * 0.35),
                ctx.random_range(extent.y * 0.20, extent.y * 0.35),
            );
            let angular_frequency = Vec2::new(
                ctx.random_angular_frequency(0.05, 0.15),
                ctx.random_angular_frequency(0.05, 0.15),
            );
            let phase = Vec2::new(ctx.random_angle(), ctx.random_angle());
            Attractor {
                position: center,
                amplitude,
                angular_frequency,
                phase,
            }
        });

        Self { attractors, center }
    }

    /// Build a field from explicit attractors.
    pub fn from_attractors(attractors: [Attractor; ATTRACTOR_COUNT], center: Vec2) -> Self {
        Self { attractors, center }
    }

    /// Re-evaluate every attractor position at simulation time `t`.
    pub fn update(&mut self, t: f32) {
        let center = self.center;
        for attractor in &mut self.attractors {
            attractor.position = attractor.position_at(center, t);
        }
    }

    /// Oscillation center (the screen center).
    #[inline]
    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// Read-only view of the attractors.
    #[inline]
    pub fn attractors(&self) -> &[Attractor; ATTRACTOR_COUNT] {
        &self.attractors
    }

    /// Current position of attractor `index`.
    #[inline]
    pub fn position(&self, index: usize) -> Vec2 {
        self.attractors[index].position
    }

    /// Current positions of all attractors.
    pub fn positions(&self) -> [Vec2; ATTRACTOR_COUNT] {
        std::array::from_fn(|i| self.attractors[i].position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    #[test]
    fn test_initial_parameters_in_range() {
        let mut ctx = SpawnContext::seeded(11, 800, 600);
        let field = AttractorField::new(&mut ctx);
        for a in field.attractors() {
            assert_eq!(a.position, Vec2::new(400.0, 300.0));
            assert!(a.amplitude.x >= 160.0 - 1e-3 && a.amplitude.x <= 280.0 + 1e-3);
            assert!(a.amplitude.y >= 120.0 - 1e-3 && a.amplitude.y <= 210.0 + 1e-3);
            for w in [a.angular_frequency.x, a.angular_frequency.y] {
                let hz = w / TAU;
                assert!(hz > 0.05 - 1e-5 && hz < 0.15 + 1e-5, "frequency {hz} out of range");
            }
        }
    }

    #[test]
    fn test_update_is_exact_recomputation() {
        let mut ctx = SpawnContext::seeded(3, 1024, 768);
        let mut field = AttractorField::new(&mut ctx);
        let center = field.center();
        for &t in &[0.0f32, 0.016, 1.5, 37.25, 600.0] {
            field.update(t);
            for a in field.attractors() {
                let x = center.x + a.amplitude.x * (a.angular_frequency.x * t + a.phase.x).sin();
                let y = center.y + a.amplitude.y * (a.angular_frequency.y * t + a.phase.y).sin();
                assert_eq!(a.position.x.to_bits(), x.to_bits());
                assert_eq!(a.position.y.to_bits(), y.to_bits());
            }
        }
    }

    #[test]
    fn test_update_is_history_independent() {
        let mut ctx = SpawnContext::seeded(5, 800, 600);
        let mut a = AttractorField::new(&mut ctx);
        let mut b = a.clone();
        for step in 0..100 {
            a.update(step as f32 * 0.1);
        }
        a.update(4.2);
        b.update(4.2);
        assert_eq!(a.positions(), b.positions());
    }

    #[test]
    fn test_positions_stay_within_amplitude() {
        let mut ctx = SpawnContext::seeded(9, 800, 600);
        let mut field = AttractorField::new(&mut ctx);
        for step in 0..2000 {
            field.update(step as f32 * 0.05);
            for a in field.attractors() {
                let d = (a.position - field.center()).abs();
                assert!(d.x <= a.amplitude.x + 1e-3);
                assert!(d.y <= a.amplitude.y + 1e-3);
            }
        }
    }
}
