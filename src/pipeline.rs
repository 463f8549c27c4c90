//! The per-frame pipeline.
//!
//! One call to [`FramePipeline::advance`] runs a whole frame:
//!
//! 1. clamp the elapsed time and advance the simulated clock
//! 2. move the attractors and integrate every orbiter (parallel)
//! 3. rebuild the render attributes (parallel)
//! 4. let the quality controller adjust one knob, if due
//! 5. hand the frame to the renderer
//! 6. append a telemetry row, if due
//!
//! The pipeline does not read a clock itself. Callers pass the frame sample
//! from an [`FpsEstimator`](crate::time::FpsEstimator), which makes headless
//! runs and tests fully deterministic.

use std::io::Write;

use crate::config::Config;
use crate::error::{GpuError, MandalaError};
use crate::quality::{Adjustment, QualityController, QualityState};
use crate::render::{FrameView, RenderSink};
use crate::simulation::Simulation;
use crate::telemetry::{Cadence, TelemetryLog, TelemetryRecord};
use crate::time::FrameSample;

/// What happened during one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Clamped delta the simulation advanced by.
    pub dt: f64,
    /// Simulated time after the frame.
    pub time: f64,
    /// Quality knobs the frame was drawn with.
    pub quality: QualityState,
    /// Controller change made this frame, if any.
    pub adjustment: Option<Adjustment>,
    /// Whether a telemetry row was written.
    pub logged: bool,
}

/// Runs frames: simulation, quality control, rendering and telemetry.
pub struct FramePipeline {
    config: Config,
    simulation: Simulation,
    quality: QualityState,
    controller: Option<QualityController>,
    telemetry: Option<TelemetryLog<Box<dyn Write>>>,
    cadence: Cadence,
    wall_time: f64,
    frames: u64,
}

impl FramePipeline {
    /// Build a pipeline for `config` (normalized here).
    ///
    /// A telemetry file that cannot be opened is reported and skipped.
    pub fn new(config: &Config) -> Result<Self, MandalaError> {
        let config = config.normalized();
        let seed = config.resolved_seed();
        let simulation = Simulation::new(
            seed,
            config.width,
            config.height,
            config.particles,
            config.threads,
        )?;

        let telemetry = match &config.log {
            Some(path) => match TelemetryLog::create(path) {
                Ok(sink) => {
                    log::info!("writing telemetry to {}", path.display());
                    Some(sink)
                }
                Err(e) => {
                    log::warn!("could not open telemetry log '{}': {}", path.display(), e);
                    None
                }
            },
            None => None,
        };

        let controller = config
            .adapt
            .then(|| QualityController::new(config.target_fps, config.quality_limits()));

        Ok(Self {
            quality: config.initial_quality(),
            cadence: Cadence::new(config.log_every_ms),
            config,
            simulation,
            controller,
            telemetry,
            wall_time: 0.0,
            frames: 0,
        })
    }

    /// Replace the telemetry sink, writing a fresh header.
    pub fn with_telemetry<W: Write + 'static>(mut self, out: W) -> Result<Self, MandalaError> {
        let boxed: Box<dyn Write> = Box::new(out);
        self.telemetry = Some(TelemetryLog::new(boxed).map_err(MandalaError::Telemetry)?);
        Ok(self)
    }

    /// Allocate the renderer's canvas at the configured supersampling factor.
    ///
    /// Call once before the first frame.
    pub fn prepare<R: RenderSink + ?Sized>(&mut self, renderer: &mut R) -> Result<(), MandalaError> {
        let factor = self.quality.supersampling;
        self.quality.supersampling = apply_supersampling(renderer, factor)?;
        Ok(())
    }

    /// Run one frame. `sample.dt` is the raw (unclamped) frame time.
    pub fn advance<R: RenderSink + ?Sized>(
        &mut self,
        sample: FrameSample,
        renderer: &mut R,
    ) -> Result<FrameReport, MandalaError> {
        self.wall_time += sample.dt.max(0.0);
        self.frames += 1;

        let dt = self.simulation.step(sample.dt);
        self.simulation.precompute(
            self.config.palette,
            self.config.point_scale,
            self.config.sat,
        );

        let mut adjustment = None;
        if let Some(controller) = &mut self.controller {
            adjustment = controller.evaluate(
                self.simulation.time(),
                sample.smoothed_fps,
                &mut self.quality,
            );
        }
        if let Some(adj) = &adjustment {
            log::info!(
                "quality {:?}: {} ({:.1} fps, target {:.0})",
                adj.direction,
                adj.knob,
                sample.smoothed_fps,
                self.config.target_fps
            );
            if let Some(factor) = adj.supersampling_change() {
                self.quality.supersampling = apply_supersampling(renderer, factor)?;
            }
        }

        let view = self.view();
        renderer.submit(&view)?;

        let logged = self.log_sample(&sample);

        Ok(FrameReport {
            dt,
            time: self.simulation.time(),
            quality: self.quality,
            adjustment,
            logged,
        })
    }

    fn log_sample(&mut self, sample: &FrameSample) -> bool {
        if self.telemetry.is_none() || !self.cadence.due((self.wall_time * 1000.0) as u64) {
            return false;
        }
        let record = self.record(sample);
        let Some(sink) = &mut self.telemetry else {
            return false;
        };
        if let Err(e) = sink.write(&record) {
            log::warn!("telemetry write failed, logging disabled: {}", e);
            self.telemetry = None;
            return false;
        }
        true
    }

    /// Telemetry record for the current state.
    pub fn record(&self, sample: &FrameSample) -> TelemetryRecord {
        TelemetryRecord {
            time_s: self.simulation.time(),
            smoothed_fps: sample.smoothed_fps,
            fps_inst: sample.instant_fps,
            n: self.simulation.len(),
            width: self.config.width,
            height: self.config.height,
            palette: self.config.palette,
            vsync: self.config.vsync,
            threads: self.simulation.threads(),
            ssaa: self.quality.supersampling,
            render_frac: self.quality.render_fraction,
            sym: self.quality.symmetry,
            glow: self.quality.glow,
        }
    }

    /// The frame as the renderer sees it.
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            attributes: self.simulation.attributes(),
            quality: self.quality,
            time: self.simulation.time() as f32,
            center: self.simulation.center(),
            attractors: self.simulation.field().positions(),
            palette: self.config.palette,
            background_alpha: self.config.bg_alpha.min(255) as u8,
            mirror: self.config.mirror,
            show_attractors: self.config.show_attractors,
            trail: self.config.trail,
        }
    }

    /// One-line status for the window title.
    pub fn hud(&self, smoothed_fps: f64, surface: (u32, u32)) -> String {
        let q = &self.quality;
        let c = &self.config;
        format!(
            "Mandala | FPS: {:.1} | thr={} | N={} win={}x{} RT={}x{} SSAA={} | palette={} sat={:.2} bgA={} glow={} trail={} | pt={:.2} | sym={} mir={} frac={:.2}",
            smoothed_fps,
            self.simulation.threads(),
            self.simulation.len(),
            c.width,
            c.height,
            surface.0 * q.supersampling,
            surface.1 * q.supersampling,
            q.supersampling,
            c.palette,
            c.sat,
            c.bg_alpha,
            q.glow as u8,
            c.trail as u8,
            c.point_scale,
            q.symmetry,
            c.mirror as u8,
            q.render_fraction,
        )
    }

    /// Whether `elapsed` wall seconds exhaust the time budget.
    pub fn budget_exhausted(&self, elapsed: f64) -> bool {
        self.config
            .time_budget()
            .is_some_and(|budget| elapsed >= budget)
    }

    pub fn toggle_mirror(&mut self) {
        self.config.mirror = !self.config.mirror;
        log::info!("mirror {}", on_off(self.config.mirror));
    }

    pub fn toggle_attractors(&mut self) {
        self.config.show_attractors = !self.config.show_attractors;
        log::info!("attractor guides {}", on_off(self.config.show_attractors));
    }

    pub fn toggle_trail(&mut self) {
        self.config.trail = !self.config.trail;
        log::info!("trail {}", on_off(self.config.trail));
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn quality(&self) -> &QualityState {
        &self.quality
    }

    #[inline]
    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Frames run so far.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Ask the renderer for `factor`, falling back to no supersampling.
fn apply_supersampling<R: RenderSink + ?Sized>(renderer: &mut R, factor: u32) -> Result<u32, GpuError> {
    match renderer.resize_supersampling(factor) {
        Ok(actual) => Ok(actual),
        Err(e) if factor > 1 => {
            log::warn!("{}; falling back to SSAA=1", e);
            renderer.resize_supersampling(1)
        }
        Err(e) => Err(e),
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::Knob;
    use crate::render::NullRenderer;
    use crate::time::FpsEstimator;

    fn config() -> Config {
        Config {
            seed: 42,
            particles: 100,
            threads: 2,
            ..Config::default()
        }
    }

    #[test]
    fn test_frames_reach_renderer() {
        let mut pipeline = FramePipeline::new(&config()).unwrap();
        let mut renderer = NullRenderer::new();
        pipeline.prepare(&mut renderer).unwrap();
        let mut fps = FpsEstimator::new(0.1);
        for _ in 0..5 {
            pipeline.advance(fps.record(1.0 / 60.0), &mut renderer).unwrap();
        }
        assert_eq!(renderer.frames().len(), 5);
        assert_eq!(renderer.supersampling_requests(), &[2]);
        assert_eq!(pipeline.frames(), 5);
        assert!((pipeline.simulation().time() - 5.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_controller_disabled_by_default() {
        let mut pipeline = FramePipeline::new(&config()).unwrap();
        let mut renderer = NullRenderer::discarding();
        let mut fps = FpsEstimator::new(0.1);
        for _ in 0..100 {
            let report = pipeline.advance(fps.record(0.5), &mut renderer).unwrap();
            assert!(report.adjustment.is_none());
        }
        assert_eq!(pipeline.quality(), &config().initial_quality());
    }

    #[test]
    fn test_supersampling_failure_falls_back() {
        let cfg = Config {
            adapt: true,
            ssaa: 4,
            ..config()
        };
        let mut pipeline = FramePipeline::new(&cfg).unwrap();
        let mut renderer = NullRenderer::new().with_max_supersampling(2);
        pipeline.prepare(&mut renderer).unwrap();
        assert_eq!(pipeline.quality().supersampling, 1);
        assert_eq!(renderer.supersampling_requests(), &[4, 1]);
    }

    #[test]
    fn test_degrade_requests_smaller_canvas() {
        let cfg = Config {
            adapt: true,
            ssaa: 3,
            ..config()
        };
        let mut pipeline = FramePipeline::new(&cfg).unwrap();
        let mut renderer = NullRenderer::new();
        pipeline.prepare(&mut renderer).unwrap();
        let mut fps = FpsEstimator::new(0.1);
        let mut knobs = Vec::new();
        for _ in 0..40 {
            let report = pipeline.advance(fps.record(0.1), &mut renderer).unwrap();
            if let Some(adj) = report.adjustment {
                knobs.push(adj.knob);
            }
        }
        // 40 frames of 50ms simulated: two evaluations.
        assert_eq!(knobs, vec![Knob::Supersampling, Knob::Supersampling]);
        assert_eq!(renderer.supersampling_requests(), &[3, 2, 1]);
        assert_eq!(renderer.frames().last().unwrap().quality.supersampling, 1);
    }

    #[test]
    fn test_telemetry_cadence() {
        let path = std::env::temp_dir().join(format!("mandala-pipeline-{}.csv", std::process::id()));
        let cfg = Config {
            log: Some(path.clone()),
            log_every_ms: 125,
            ..config()
        };
        let mut pipeline = FramePipeline::new(&cfg).unwrap();
        let mut renderer = NullRenderer::discarding();
        let mut fps = FpsEstimator::new(0.1);
        let mut logged = 0;
        // 1.25s of wall time at 32 fps: a row every fourth frame.
        for _ in 0..40 {
            if pipeline.advance(fps.record(1.0 / 32.0), &mut renderer).unwrap().logged {
                logged += 1;
            }
        }
        drop(pipeline);
        assert_eq!(logged, 10);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), logged + 1);
        assert!(text.starts_with("time_s,"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_unwritable_log_is_not_fatal() {
        let cfg = Config {
            log: Some(std::env::temp_dir().join("mandala-missing-dir").join("x").join("log.csv")),
            ..config()
        };
        let mut pipeline = FramePipeline::new(&cfg).unwrap();
        let mut renderer = NullRenderer::discarding();
        let report = pipeline.advance(FpsEstimator::new(0.1).record(1.0), &mut renderer).unwrap();
        assert!(!report.logged);
    }

    #[test]
    fn test_toggles_reach_view() {
        let mut pipeline = FramePipeline::new(&config()).unwrap();
        assert!(pipeline.view().mirror);
        pipeline.toggle_mirror();
        pipeline.toggle_attractors();
        pipeline.toggle_trail();
        let view = pipeline.view();
        assert!(!view.mirror);
        assert!(view.show_attractors);
        assert!(view.trail);
        assert_eq!(view.quality, config().initial_quality());
    }

    #[test]
    fn test_glow_changes_only_through_controller() {
        let cfg = Config {
            adapt: true,
            ssaa: 1,
            render_frac: 0.6,
            glow: true,
            sym: 4,
            ..config()
        };
        let mut pipeline = FramePipeline::new(&cfg).unwrap();
        let mut renderer = NullRenderer::new();
        pipeline.prepare(&mut renderer).unwrap();
        let mut fps = FpsEstimator::new(0.1);
        let mut glow = pipeline.quality().glow;
        for frame in 0..40 {
            if frame == 20 {
                pipeline.toggle_mirror();
                pipeline.toggle_attractors();
                pipeline.toggle_trail();
            }
            let report = pipeline.advance(fps.record(0.1), &mut renderer).unwrap();
            if report.quality.glow != glow {
                let adj = report.adjustment.expect("glow flipped without an adjustment");
                assert_eq!(adj.knob, Knob::Glow);
                glow = report.quality.glow;
            }
        }
        // Floors reached: SSAA 1 and render fraction 0.6 leave glow first.
        assert!(!glow);
    }

    #[test]
    fn test_hud_and_budget() {
        let pipeline = FramePipeline::new(&config()).unwrap();
        let hud = pipeline.hud(59.94, (800, 600));
        assert!(hud.contains("FPS: 59.9"));
        assert!(hud.contains("N=100"));
        assert!(hud.contains("RT=1600x1200"));
        assert!(!pipeline.budget_exhausted(9.9));
        assert!(pipeline.budget_exhausted(10.0));
    }
}
