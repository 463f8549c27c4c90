//! Frame timing: monotonic clocks and the smoothed FPS estimator.
//!
//! # Example
//!
//! ```ignore
//! use mandala::time::FpsEstimator;
//!
//! let mut fps = FpsEstimator::new(0.1);
//!
//! // In your frame loop:
//! let sample = fps.tick();
//! println!("dt={:.4}s fps={:.1}", sample.dt, sample.smoothed_fps);
//! ```

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Default EMA smoothing factor. Small values favor stability.
pub const DEFAULT_ALPHA: f64 = 0.1;

/// A monotonic time source, measured from an arbitrary fixed origin.
pub trait Clock {
    /// Time since the clock's origin.
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Start a clock at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-advanced clock for tests and offline runs.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    /// A clock stopped at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `secs` seconds.
    pub fn advance(&self, secs: f64) {
        self.now.set(self.now.get() + Duration::from_secs_f64(secs));
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Duration {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Timing of one frame as seen by the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSample {
    /// Raw (unclamped) seconds since the previous tick.
    pub dt: f64,
    /// Instantaneous frames per second, `1 / dt` (0 when `dt` is not positive).
    pub instant_fps: f64,
    /// Exponential moving average of `instant_fps`.
    pub smoothed_fps: f64,
}

/// Exponential-moving-average frame-rate tracker.
///
/// The first sample seeds the average directly so a startup transient
/// does not read as a long run of low frame rates.
#[derive(Debug)]
pub struct FpsEstimator<C: Clock = MonotonicClock> {
    clock: C,
    last_sample: Duration,
    smoothed_fps: f64,
    alpha: f64,
    frame_count: u64,
}

impl FpsEstimator<MonotonicClock> {
    /// Create an estimator on the wall clock with smoothing factor `alpha`.
    pub fn new(alpha: f64) -> Self {
        Self::with_clock(MonotonicClock::new(), alpha)
    }
}

impl Default for FpsEstimator<MonotonicClock> {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}

impl<C: Clock> FpsEstimator<C> {
    /// Create an estimator reading from `clock`.
    ///
    /// `alpha` is clamped to `(0, 1]`.
    pub fn with_clock(clock: C, alpha: f64) -> Self {
        let last_sample = clock.now();
        Self {
            clock,
            last_sample,
            smoothed_fps: 0.0,
            alpha: alpha.clamp(f64::EPSILON, 1.0),
            frame_count: 0,
        }
    }

    /// Read the clock and fold the elapsed time into the estimate.
    ///
    /// Call exactly once per frame.
    pub fn tick(&mut self) -> FrameSample {
        let now = self.clock.now();
        let dt = now.saturating_sub(self.last_sample).as_secs_f64();
        self.last_sample = now;
        self.record(dt)
    }

    /// Fold an externally measured frame duration into the estimate.
    pub fn record(&mut self, dt: f64) -> FrameSample {
        let instant_fps = if dt > 0.0 { 1.0 / dt } else { 0.0 };
        if self.smoothed_fps <= 0.0 {
            self.smoothed_fps = instant_fps;
        } else {
            self.smoothed_fps = self.alpha * instant_fps + (1.0 - self.alpha) * self.smoothed_fps;
        }
        self.frame_count += 1;
        FrameSample {
            dt,
            instant_fps,
            smoothed_fps: self.smoothed_fps,
        }
    }

    /// Current smoothed FPS (0 before the first sample).
    #[inline]
    pub fn smoothed_fps(&self) -> f64 {
        self.smoothed_fps
    }

    /// Smoothing factor.
    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Frames recorded so far.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// The underlying clock.
    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_estimator_new() {
        let fps = FpsEstimator::new(0.1);
        assert_eq!(fps.frame(), 0);
        assert_eq!(fps.smoothed_fps(), 0.0);
        assert_eq!(fps.alpha(), 0.1);
    }

    #[test]
    fn test_wall_clock_tick() {
        let mut fps = FpsEstimator::<MonotonicClock>::default();
        thread::sleep(Duration::from_millis(10));
        let sample = fps.tick();

        assert!(sample.dt > 0.0);
        assert!(sample.instant_fps > 0.0);
        assert_eq!(fps.frame(), 1);
    }

    #[test]
    fn test_first_sample_seeds_average() {
        let mut fps = FpsEstimator::new(0.1);
        let sample = fps.record(0.02);
        assert!((sample.instant_fps - 50.0).abs() < 1e-9);
        assert_eq!(sample.smoothed_fps, sample.instant_fps);
    }

    #[test]
    fn test_ema_update() {
        let mut fps = FpsEstimator::new(0.25);
        fps.record(0.1); // 10 fps
        let sample = fps.record(0.05); // 20 fps
        assert!((sample.smoothed_fps - (0.25 * 20.0 + 0.75 * 10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_zero_dt_reads_as_zero_fps() {
        let mut fps = FpsEstimator::new(0.1);
        let sample = fps.record(0.0);
        assert_eq!(sample.instant_fps, 0.0);
        // A zero average is re-seeded by the next real sample.
        let sample = fps.record(0.04);
        assert!((sample.smoothed_fps - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_manual_clock_drives_tick() {
        let clock = ManualClock::new();
        let mut fps = FpsEstimator::with_clock(&clock, 0.1);
        clock.advance(0.1);
        let sample = fps.tick();
        assert!((sample.dt - 0.1).abs() < 1e-9);
        assert!((sample.smoothed_fps - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_alpha_is_clamped() {
        assert_eq!(FpsEstimator::new(3.0).alpha(), 1.0);
        assert!(FpsEstimator::new(-1.0).alpha() > 0.0);
    }
}
