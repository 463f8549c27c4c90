//! # Mandala
//!
//! A real-time 2D particle mandala. Thousands of orbiters are bound by
//! damped springs to three wandering attractors; each frame the population
//! is integrated in parallel, turned into per-particle render attributes and
//! drawn with N-fold rotational symmetry (optionally mirrored) onto a
//! persistent, slowly fading canvas.
//!
//! An optional adaptive quality controller watches the smoothed frame rate
//! and trades supersampling, particle fraction, glow and symmetry for speed,
//! one knob at a time.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mandala::prelude::*;
//!
//! let config = Config {
//!     particles: 20_000,
//!     palette: Palette::Ocean,
//!     adapt: true,
//!     ..Config::default()
//! };
//! mandala::run(&config)?;
//! ```
//!
//! ## Driving frames yourself
//!
//! [`FramePipeline`] runs one frame per call and never reads a clock, so a
//! headless loop is fully deterministic:
//!
//! ```ignore
//! let mut pipeline = FramePipeline::new(&config)?;
//! let mut renderer = NullRenderer::new();
//! let mut fps = FpsEstimator::default();
//! pipeline.prepare(&mut renderer)?;
//! for _ in 0..600 {
//!     pipeline.advance(fps.record(1.0 / 60.0), &mut renderer)?;
//! }
//! ```
//!
//! ## Modules
//!
//! | Stage | Module |
//! |-------|--------|
//! | Scene seeding | [`spawn`], [`attractor`], [`orbiter`] |
//! | Per-frame physics | [`integrator`], [`parallel`] |
//! | Render attributes | [`precompute`], [`visuals`] |
//! | Frame control | [`time`], [`quality`], [`pipeline`] |
//! | Output | [`render`], [`telemetry`] |

pub mod attractor;
pub mod config;
mod error;
mod gpu;
mod headless;
pub mod input;
pub mod integrator;
pub mod orbiter;
pub mod parallel;
pub mod pipeline;
pub mod precompute;
pub mod quality;
pub mod render;
mod shader;
mod simulation;
pub mod spawn;
pub mod telemetry;
pub mod time;
pub mod visuals;
mod window;

pub use config::{Args, Config};
pub use error::{ConfigError, GpuError, MandalaError};
pub use glam::Vec2;
pub use gpu::GpuRenderer;
pub use headless::{run_headless, RunSummary};
pub use pipeline::{FramePipeline, FrameReport};
pub use render::{FrameView, NullRenderer, RenderSink};
pub use simulation::Simulation;
pub use visuals::Palette;
pub use window::run_windowed;

/// Run with `config`: headless if asked, otherwise in a window.
pub fn run(config: &Config) -> Result<(), MandalaError> {
    if config.headless {
        run_headless(config).map(|_| ())
    } else {
        run_windowed(config)
    }
}

/// Commonly used types.
///
/// ```ignore
/// use mandala::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::MandalaError;
    pub use crate::pipeline::FramePipeline;
    pub use crate::quality::{QualityController, QualityLimits, QualityState};
    pub use crate::render::{NullRenderer, RenderSink};
    pub use crate::simulation::Simulation;
    pub use crate::time::FpsEstimator;
    pub use crate::visuals::Palette;
    pub use crate::Vec2;
}
