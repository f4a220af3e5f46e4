mod audio;
mod cli;
mod config;
mod encode;
mod error;
mod pipeline;
mod render;

use anyhow::{Context, Result};
use clap::Parser;

use cli::Cli;
use config::{Config, Settings};
use render::modes;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if cli.list_modes {
        println!("Available modes:");
        for mode in modes::MODES {
            println!("  {:>2}  {:<16} {}", mode.id, mode.name, mode.description);
        }
        return Ok(());
    }

    let cfg = match config::discover(cli.config.as_deref()) {
        Some(path) => {
            let cfg = config::load_config(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => Config::default(),
    };

    let settings = Settings::resolve(&cli, &cfg)?;

    log::info!("spectrocast - audio spectrum video generator");
    log::info!("Input: {}", settings.input.display());
    log::info!("Output: {}", settings.output.display());
    if let Some(mode) = modes::find(settings.mode) {
        log::info!("Mode: {} ({})", mode.id, mode.name);
    }
    log::info!(
        "Resolution: {}x{} @ {}fps, {} bars{}",
        settings.width,
        settings.height,
        settings.fps,
        settings.num_bars,
        if settings.transparent { ", transparent" } else { "" }
    );

    let assembled = pipeline::run(&settings)
        .with_context(|| format!("Failed to render {}", settings.input.display()))?;

    log::info!("Done! Output: {} ({:?} encode)", assembled.path.display(), assembled.stage);
    Ok(())
}
