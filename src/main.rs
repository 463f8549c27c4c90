use clap::Parser;
use env_logger::{Builder, Env};

use mandala::{Args, MandalaError};

fn main() -> Result<(), MandalaError> {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.resolve()?;
    if let Some(path) = &args.save_config {
        config.save(path)?;
        log::info!("saved config to {}", path.display());
    }

    log::info!(
        "starting: N={} {}x{} palette={} sym={} ssaa={} adapt={}",
        config.particles,
        config.width,
        config.height,
        config.palette,
        config.sym,
        config.ssaa,
        config.adapt
    );
    mandala::run(&config)
}
