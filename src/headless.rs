//! Runs the frame pipeline without a window.
//!
//! Frames go to a [`NullRenderer`] as fast as the simulation allows. The
//! quality controller and telemetry behave exactly as they do on screen,
//! which makes this mode useful for profiling the CPU stages.

use crate::config::Config;
use crate::error::MandalaError;
use crate::pipeline::FramePipeline;
use crate::render::NullRenderer;
use crate::time::{Clock, FpsEstimator};

/// Run time used when headless mode is asked to run until quit.
pub const UNBOUNDED_HEADLESS_SECONDS: f64 = 10.0;

/// Totals for a finished headless run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    /// Wall-clock seconds spent.
    pub elapsed: f64,
    /// Simulated seconds reached.
    pub sim_time: f64,
    pub smoothed_fps: f64,
}

/// Run headlessly until the time budget is spent.
///
/// There is no way to quit a headless run by hand, so a config without a
/// budget runs for [`UNBOUNDED_HEADLESS_SECONDS`].
pub fn run_headless(config: &Config) -> Result<RunSummary, MandalaError> {
    let mut config = config.clone();
    if config.time_budget().is_none() {
        log::warn!(
            "headless run has no time budget, stopping after {}s",
            UNBOUNDED_HEADLESS_SECONDS
        );
        config.seconds = UNBOUNDED_HEADLESS_SECONDS;
    }

    let mut pipeline = FramePipeline::new(&config)?;
    let mut renderer = NullRenderer::discarding();
    pipeline.prepare(&mut renderer)?;

    let mut fps = FpsEstimator::default();
    loop {
        let sample = fps.tick();
        pipeline.advance(sample, &mut renderer)?;

        let elapsed = fps.clock().now().as_secs_f64();
        if pipeline.budget_exhausted(elapsed) {
            let summary = RunSummary {
                frames: pipeline.frames(),
                elapsed,
                sim_time: pipeline.simulation().time(),
                smoothed_fps: fps.smoothed_fps(),
            };
            log::info!(
                "headless run finished: {} frames in {:.2}s ({:.1} fps)",
                summary.frames,
                summary.elapsed,
                summary.smoothed_fps
            );
            return Ok(summary);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_headless_run() {
        let config = Config {
            seed: 3,
            particles: 200,
            threads: 2,
            seconds: 0.2,
            ..Config::default()
        };
        let summary = run_headless(&config).unwrap();
        assert!(summary.frames > 0);
        assert!(summary.elapsed >= 0.2);
        assert!(summary.sim_time > 0.0);
    }
}
