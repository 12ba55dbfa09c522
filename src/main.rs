// thumpa - dithered plasma and a rotating cobra wireframe on a 144x168 1-bit screen
mod bitmap;
mod config;
mod display;
mod dither;
mod model;
mod plasma;
mod renderer;
mod trig;
mod types;
mod vec_mat;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::Path;

use config::{spawn_config_watcher, Args, RunMode, ThumpaConfig};
use display::{HeadlessDisplay, PngDumpDisplay, TerminalDisplay};
use renderer::{Renderer, RunSummary};

fn init_logging(quiet: bool) {
    let level = if quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

async fn run_mode(mode: RunMode, config: &ThumpaConfig) -> Result<RunSummary> {
    let mut renderer = Renderer::new(config);

    match mode {
        RunMode::Preview => {
            if let Some(path) = config.config_path.clone() {
                renderer = renderer.with_reloads(spawn_config_watcher(path)?);
            }
            let mut display = TerminalDisplay::new()?;
            let result = renderer.run(&mut display).await;
            // restore before anything is printed, even on error
            display.restore()?;
            result
        }
        RunMode::Headless => {
            if config.frames == 0 {
                warn!("No frame limit set; running until Ctrl+C");
            }
            let mut display = HeadlessDisplay::default();
            renderer.run(&mut display).await
        }
        RunMode::Dump => {
            if config.frames == 0 {
                warn!("No frame limit set; writing PNGs until Ctrl+C");
            }
            let mut display = PngDumpDisplay::new(Path::new(&config.out_dir))?;
            renderer.run(&mut display).await
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = ThumpaConfig::config_path(args.cfg.as_deref())?;
    let (mut config, config_file_exists) = ThumpaConfig::load_or_default(&config_path)?;
    let args_provided = config.merge_with_args(&args);
    let mode = config.run_mode()?;

    // Log output would tear through the terminal preview
    init_logging(args.quiet || mode == RunMode::Preview);

    // First run: write the defaults so there is something to edit.
    // Command-line overrides stay out of the file.
    if !config_file_exists {
        let mut defaults = ThumpaConfig::default();
        defaults.config_path = Some(config_path.clone());
        defaults.save()?;
    }

    info!("Using config file: {}", config_path.display());
    if args_provided {
        info!("Command-line overrides apply to this run only");
    }
    info!("Mode {}", mode.as_str());

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the tokio runtime")?;
    let summary = rt.block_on(run_mode(mode, &config))?;

    let secs = summary.elapsed.as_secs_f64();
    info!("Stopped: {:?}", summary.exit);
    println!(
        "{} frames in {:.2}s ({:.1} fps), checksum {:016x}",
        summary.frames,
        secs,
        summary.frames as f64 / secs.max(f64::EPSILON),
        summary.checksum
    );
    Ok(())
}
