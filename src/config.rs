//! Run configuration.
//!
//! A [`Config`] can be saved to and loaded from JSON, and is normally built
//! from the command line with [`Args::resolve`]: a config file named by
//! `--config` is loaded first, then any flag given explicitly overrides the
//! corresponding field. [`Config::normalized`] applies every clamp; the
//! frame pipeline assumes normalized input.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::builder::BoolishValueParser;
use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::quality::{QualityLimits, QualityState};
use crate::visuals::Palette;

/// Complete run configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window width in pixels (at least 640).
    pub width: u32,
    /// Window height in pixels (at least 480).
    pub height: u32,
    /// Number of orbiters (at least 1).
    pub particles: usize,
    /// Wall-clock run time in seconds; zero or negative runs until quit.
    pub seconds: f64,
    /// RNG seed; zero seeds from the wall clock.
    pub seed: u64,
    pub palette: Palette,
    pub vsync: bool,
    /// CSV telemetry destination.
    pub log: Option<PathBuf>,
    /// Milliseconds between telemetry rows (at least 1).
    pub log_every_ms: u64,
    /// Draw the attractor guides.
    pub show_attractors: bool,
    /// Point size multiplier (at least 0.1).
    pub point_scale: f32,
    /// Radial symmetry count, 1 to 8.
    pub sym: u32,
    /// Mirror each symmetric copy.
    pub mirror: bool,
    /// Supersampling factor, 1 to 4.
    pub ssaa: u32,
    /// Global saturation multiplier, 0 to 1.
    pub sat: f32,
    pub glow: bool,
    /// Alpha of the per-frame background fade, 0 to 255.
    pub bg_alpha: u32,
    /// Worker threads; zero uses all available parallelism.
    pub threads: usize,
    /// Draw a line from each particle's previous position.
    pub trail: bool,
    /// Fraction of particles drawn, in `(0, 1]`.
    pub render_frac: f32,
    /// Enable the adaptive quality controller.
    pub adapt: bool,
    /// Frame rate the controller aims for, 10 to 144.
    pub target_fps: f64,
    /// Run without a window.
    pub headless: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            particles: 100,
            seconds: 10.0,
            seed: 0,
            palette: Palette::Neon,
            vsync: true,
            log: None,
            log_every_ms: 500,
            show_attractors: false,
            point_scale: 1.0,
            sym: 6,
            mirror: true,
            ssaa: 2,
            sat: 0.65,
            glow: false,
            bg_alpha: 10,
            threads: 0,
            trail: false,
            render_frac: 1.0,
            adapt: false,
            target_fps: 30.0,
            headless: false,
        }
    }
}

impl Config {
    /// Save the configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Copy with every field clamped into its valid range.
    pub fn normalized(&self) -> Self {
        let render_frac = if self.render_frac.is_nan() || self.render_frac <= 0.0 {
            0.05
        } else {
            self.render_frac.min(1.0)
        };
        Self {
            width: self.width.max(640),
            height: self.height.max(480),
            particles: self.particles.max(1),
            log_every_ms: self.log_every_ms.max(1),
            point_scale: self.point_scale.max(0.1),
            sym: self.sym.clamp(1, 8),
            ssaa: self.ssaa.clamp(1, 4),
            sat: self.sat.clamp(0.0, 1.0),
            bg_alpha: self.bg_alpha.min(255),
            render_frac,
            target_fps: self.target_fps.clamp(10.0, 144.0),
            ..self.clone()
        }
    }

    /// The seed to run with. Zero is replaced by the current Unix time.
    pub fn resolved_seed(&self) -> u64 {
        if self.seed != 0 {
            return self.seed;
        }
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(1)
            .max(1)
    }

    /// Wall-clock budget, or `None` to run until quit.
    pub fn time_budget(&self) -> Option<f64> {
        (self.seconds > 0.0).then_some(self.seconds)
    }

    /// Starting quality knobs.
    pub fn initial_quality(&self) -> QualityState {
        QualityState {
            supersampling: self.ssaa,
            render_fraction: self.render_frac,
            glow: self.glow,
            symmetry: self.sym,
        }
    }

    /// Controller limits; the configured symmetry is the ceiling.
    pub fn quality_limits(&self) -> QualityLimits {
        QualityLimits::new(self.sym)
    }
}

/// Command line arguments.
///
/// Every field is optional so that only flags actually given override a
/// loaded config file.
#[derive(Parser, Debug, Default)]
#[command(name = "mandala")]
#[command(about = "Orbital particle mandala with adaptive render quality")]
pub struct Args {
    /// JSON config file, applied before the other flags.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the resolved config to this JSON file and continue.
    #[arg(long)]
    pub save_config: Option<PathBuf>,

    /// Number of orbiters.
    #[arg(long = "n", alias = "particles")]
    pub particles: Option<usize>,

    #[arg(long)]
    pub width: Option<u32>,

    #[arg(long)]
    pub height: Option<u32>,

    /// Run time in seconds (0 = until Escape).
    #[arg(long, allow_negative_numbers = true)]
    pub seconds: Option<f64>,

    /// RNG seed (0 = from the clock).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Color palette: neon or ocean.
    #[arg(long)]
    pub palette: Option<String>,

    #[arg(long, value_parser = BoolishValueParser::new())]
    pub vsync: Option<bool>,

    /// CSV telemetry file.
    #[arg(long)]
    pub log: Option<PathBuf>,

    #[arg(long)]
    pub log_every_ms: Option<u64>,

    #[arg(long, value_parser = BoolishValueParser::new())]
    pub show_attractors: Option<bool>,

    #[arg(long)]
    pub point_scale: Option<f32>,

    /// Radial symmetry count (1-8).
    #[arg(long)]
    pub sym: Option<u32>,

    #[arg(long, value_parser = BoolishValueParser::new())]
    pub mirror: Option<bool>,

    /// Supersampling factor (1-4).
    #[arg(long)]
    pub ssaa: Option<u32>,

    /// Saturation multiplier (0-1).
    #[arg(long)]
    pub sat: Option<f32>,

    #[arg(long, value_parser = BoolishValueParser::new())]
    pub glow: Option<bool>,

    /// Background fade alpha (0-255).
    #[arg(long)]
    pub bg_alpha: Option<u32>,

    /// Worker threads (0 = all cores).
    #[arg(long)]
    pub threads: Option<usize>,

    #[arg(long, value_parser = BoolishValueParser::new())]
    pub trail: Option<bool>,

    /// Fraction of particles drawn.
    #[arg(long, allow_negative_numbers = true)]
    pub render_frac: Option<f32>,

    #[arg(long, value_parser = BoolishValueParser::new())]
    pub adapt: Option<bool>,

    #[arg(long)]
    pub target_fps: Option<f64>,

    /// Run without a window; frames go to a null renderer until the time budget ends.
    #[arg(long)]
    pub headless: bool,
}

impl Args {
    /// Build the normalized config: file (if any), then explicit flags.
    pub fn resolve(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => {
                log::info!("loading config from {}", path.display());
                Config::load(path)?
            }
            None => Config::default(),
        };
        self.apply(&mut config);
        Ok(config.normalized())
    }

    /// Overwrite the fields of `config` whose flags were given.
    pub fn apply(&self, config: &mut Config) {
        if let Some(v) = self.particles {
            config.particles = v;
        }
        if let Some(v) = self.width {
            config.width = v;
        }
        if let Some(v) = self.height {
            config.height = v;
        }
        if let Some(v) = self.seconds {
            config.seconds = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if let Some(v) = self.vsync {
            config.vsync = v;
        }
        if let Some(v) = self.log_every_ms {
            config.log_every_ms = v;
        }
        if let Some(v) = self.show_attractors {
            config.show_attractors = v;
        }
        if let Some(v) = self.point_scale {
            config.point_scale = v;
        }
        if let Some(v) = self.sym {
            config.sym = v;
        }
        if let Some(v) = self.mirror {
            config.mirror = v;
        }
        if let Some(v) = self.ssaa {
            config.ssaa = v;
        }
        if let Some(v) = self.sat {
            config.sat = v;
        }
        if let Some(v) = self.glow {
            config.glow = v;
        }
        if let Some(v) = self.bg_alpha {
            config.bg_alpha = v;
        }
        if let Some(v) = self.threads {
            config.threads = v;
        }
        if let Some(v) = self.trail {
            config.trail = v;
        }
        if let Some(v) = self.render_frac {
            config.render_frac = v;
        }
        if let Some(v) = self.adapt {
            config.adapt = v;
        }
        if let Some(v) = self.target_fps {
            config.target_fps = v;
        }
        if let Some(name) = &self.palette {
            let palette = Palette::from_name(name);
            if palette.name() != name.to_ascii_lowercase() {
                log::warn!("unknown palette '{}', using {}", name, palette);
            }
            config.palette = palette;
        }
        if let Some(path) = &self.log {
            config.log = Some(path.clone());
        }
        if self.headless {
            config.headless = true;
        }
    }
}
