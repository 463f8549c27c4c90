//! Adaptive quality control.
//!
//! The controller watches the smoothed frame rate and trades visual fidelity
//! for speed one knob at a time. Knobs are tried in a fixed priority order,
//! expressed as ordered lists of [`QualityStep`]s: the first step whose
//! predicate holds is applied and the rest are skipped.
//!
//! Evaluations are rate limited by a cooldown measured in simulated seconds,
//! so a noisy frame rate cannot make the knobs oscillate faster than the
//! estimator can react.

use std::fmt;

/// Seconds of simulated time between evaluations.
pub const COOLDOWN_SECS: f64 = 0.7;
/// Frames per second below target before quality is lowered.
pub const DEGRADE_MARGIN: f64 = 1.0;
/// Frames per second above target before quality is raised.
pub const UPGRADE_MARGIN: f64 = 8.0;

/// The render knobs the controller may turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityState {
    /// Supersampling factor of the off-screen canvas (1 = none).
    pub supersampling: u32,
    /// Fraction of particles drawn, `0 < f <= 1`. Physics always runs for all.
    pub render_fraction: f32,
    /// Whether glow halos are drawn.
    pub glow: bool,
    /// Active radial symmetry count.
    pub symmetry: u32,
}

impl QualityState {
    /// Draw every `stride`-th particle.
    pub fn draw_stride(&self) -> usize {
        if self.render_fraction >= 0.999 {
            1
        } else {
            ((1.0 / self.render_fraction.max(f32::EPSILON)).round() as usize).max(1)
        }
    }
}

/// Floors, ceilings and step sizes for the knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityLimits {
    /// Lowest render fraction the controller will degrade to.
    pub min_render_fraction: f32,
    /// Render fraction change per step.
    pub render_fraction_step: f32,
    /// Lowest symmetry count the controller will degrade to.
    pub min_symmetry: u32,
    /// Highest symmetry count (the configured value).
    pub max_symmetry: u32,
}

impl QualityLimits {
    /// Default floors with the given symmetry ceiling.
    pub fn new(max_symmetry: u32) -> Self {
        Self {
            min_render_fraction: 0.6,
            render_fraction_step: 0.1,
            min_symmetry: 4,
            max_symmetry,
        }
    }
}

/// A single quality knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Knob {
    Supersampling,
    RenderFraction,
    Glow,
    Symmetry,
}

impl fmt::Display for Knob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Knob::Supersampling => "ssaa",
            Knob::RenderFraction => "render_frac",
            Knob::Glow => "glow",
            Knob::Symmetry => "sym",
        };
        f.write_str(name)
    }
}

/// Direction of a quality change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Degrade,
    Upgrade,
}

/// One entry of a priority list: apply `action` if `applies` holds.
pub struct QualityStep {
    pub knob: Knob,
    pub applies: fn(&QualityState, &QualityLimits) -> bool,
    pub action: fn(&mut QualityState, &QualityLimits),
}

impl fmt::Debug for QualityStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QualityStep").field("knob", &self.knob).finish()
    }
}

/// Priority order when the frame rate is below target.
///
/// The supersampling step only lowers the requested factor; the caller is
/// responsible for reallocating the canvas.
pub static DEGRADE_STEPS: [QualityStep; 4] = [
    QualityStep {
        knob: Knob::Supersampling,
        applies: |q, _| q.supersampling > 1,
        action: |q, _| q.supersampling -= 1,
    },
    QualityStep {
        knob: Knob::RenderFraction,
        applies: |q, l| q.render_fraction > l.min_render_fraction + 1e-4,
        action: |q, l| {
            let next = round_fraction(q.render_fraction - l.render_fraction_step);
            q.render_fraction = next.max(l.min_render_fraction);
        },
    },
    QualityStep {
        knob: Knob::Glow,
        applies: |q, _| q.glow,
        action: |q, _| q.glow = false,
    },
    QualityStep {
        knob: Knob::Symmetry,
        applies: |q, l| q.symmetry > l.min_symmetry,
        action: |q, _| q.symmetry -= 1,
    },
];

/// Priority order when the frame rate is comfortably above target.
pub static UPGRADE_STEPS: [QualityStep; 2] = [
    QualityStep {
        knob: Knob::Symmetry,
        applies: |q, l| q.symmetry < l.max_symmetry,
        action: |q, _| q.symmetry += 1,
    },
    QualityStep {
        knob: Knob::RenderFraction,
        applies: |q, _| q.render_fraction < 1.0 - 1e-4,
        action: |q, l| {
            q.render_fraction = round_fraction(q.render_fraction + l.render_fraction_step).min(1.0);
        },
    },
];

// Keeps repeated +-0.1 steps on the 0.01 grid.
fn round_fraction(f: f32) -> f32 {
    (f * 100.0).round() / 100.0
}

/// The outcome of an evaluation that changed a knob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjustment {
    pub knob: Knob,
    pub direction: Direction,
    /// State before the change.
    pub before: QualityState,
    /// State after the change.
    pub after: QualityState,
}

impl Adjustment {
    /// The new supersampling factor, if this adjustment changed it.
    ///
    /// The caller must reallocate the render target when this is `Some`.
    pub fn supersampling_change(&self) -> Option<u32> {
        (self.knob == Knob::Supersampling).then_some(self.after.supersampling)
    }
}

/// Hysteretic frame-rate driven quality controller.
#[derive(Debug, Clone)]
pub struct QualityController {
    target_fps: f64,
    cooldown: f64,
    limits: QualityLimits,
    last_evaluation: f64,
    evaluations: u64,
}

impl QualityController {
    /// Controller aiming at `target_fps` with the given knob limits.
    pub fn new(target_fps: f64, limits: QualityLimits) -> Self {
        Self {
            target_fps,
            cooldown: COOLDOWN_SECS,
            limits,
            last_evaluation: 0.0,
            evaluations: 0,
        }
    }

    /// Override the cooldown (simulated seconds).
    pub fn with_cooldown(mut self, cooldown: f64) -> Self {
        self.cooldown = cooldown.max(0.0);
        self
    }

    #[inline]
    pub fn target_fps(&self) -> f64 {
        self.target_fps
    }

    #[inline]
    pub fn limits(&self) -> &QualityLimits {
        &self.limits
    }

    /// Number of evaluations performed (whether or not they changed anything).
    #[inline]
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Whether an evaluation is due at simulation time `sim_time`.
    #[inline]
    pub fn is_due(&self, sim_time: f64) -> bool {
        sim_time - self.last_evaluation > self.cooldown
    }

    /// Evaluate at simulation time `sim_time` with the current smoothed FPS.
    ///
    /// Changes at most one knob. Returns the change, if any. A due
    /// evaluation restarts the cooldown even when nothing changes.
    pub fn evaluate(
        &mut self,
        sim_time: f64,
        smoothed_fps: f64,
        state: &mut QualityState,
    ) -> Option<Adjustment> {
        if !self.is_due(sim_time) {
            return None;
        }
        self.last_evaluation = sim_time;
        self.evaluations += 1;

        if smoothed_fps <= 0.0 {
            return None;
        }

        let (direction, steps): (Direction, &[QualityStep]) =
            if smoothed_fps < self.target_fps - DEGRADE_MARGIN {
                (Direction::Degrade, &DEGRADE_STEPS[..])
            } else if smoothed_fps > self.target_fps + UPGRADE_MARGIN {
                (Direction::Upgrade, &UPGRADE_STEPS[..])
            } else {
                log::debug!(
                    "quality: {:.1} fps within band of target {:.0}",
                    smoothed_fps,
                    self.target_fps
                );
                return None;
            };

        let step = steps.iter().find(|s| (s.applies)(state, &self.limits))?;
        let before = *state;
        (step.action)(state, &self.limits);
        log::debug!(
            "quality: {:?} {} at {:.1} fps (t={:.2}s)",
            direction,
            step.knob,
            smoothed_fps,
            sim_time
        );
        Some(Adjustment {
            knob: step.knob,
            direction,
            before,
            after: *state,
        })
    }
}
