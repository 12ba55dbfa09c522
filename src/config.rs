// Config Module - Configuration management and command-line argument parsing
use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use notify::{Config, Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

use crate::model::MODEL_SCALE;
use crate::renderer::TICK_MS;
use crate::types::Rgb;

#[derive(Parser, Debug, Default)]
#[command(
    author,
    version,
    about = "Dithered plasma with a rotating wireframe on a 144x168 1-bit screen",
    long_about = "Renders an ordered-dither plasma field with a rotating fixed-point cobra\n\
                  wireframe on top, one frame every few milliseconds.\n\
                  Shows it in the terminal, runs it headless, or dumps every frame as PNG."
)]
pub struct Args {
    /// Run mode (preview, headless, dump)
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Stop after this many frames (0 = run until quit)
    #[arg(short = 'n', long)]
    pub frames: Option<u64>,

    /// Output directory for dump mode
    #[arg(short, long)]
    pub out: Option<String>,

    /// Delay between frames in milliseconds
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Disable the plasma background
    #[arg(long)]
    pub no_plasma: bool,

    /// Disable the wireframe model
    #[arg(long)]
    pub no_model: bool,

    /// Model projection scale (256 = one pixel per model unit)
    #[arg(long)]
    pub model_scale: Option<i32>,

    /// Ink (black pixel) color as hex
    #[arg(long)]
    pub ink: Option<String>,

    /// Paper (white pixel) color as hex
    #[arg(long)]
    pub paper: Option<String>,

    /// Config file path or name (e.g., --cfg /full/path or --cfg myconf for ~/.config/thumpa/myconf.conf)
    #[arg(long)]
    pub cfg: Option<String>,

    /// Quiet mode
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

/// Where finished frames go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Preview,
    Headless,
    Dump,
}

impl RunMode {
    pub fn from_string(mode: &str) -> Result<Self> {
        match mode.trim().to_lowercase().as_str() {
            "preview" | "tui" => Ok(RunMode::Preview),
            "headless" => Ok(RunMode::Headless),
            "dump" | "png" => Ok(RunMode::Dump),
            other => anyhow::bail!("Unknown mode '{}' (expected preview, headless or dump)", other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Preview => "preview",
            RunMode::Headless => "headless",
            RunMode::Dump => "dump",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumpaConfig {
    #[serde(skip)]
    pub config_path: Option<PathBuf>, // Where this config was loaded from (not serialized)

    pub mode: String,
    pub plasma: bool,
    pub model: bool,
    pub tick_ms: u64,
    pub model_scale: i32,
    pub frames: u64, // 0 = unlimited
    pub out_dir: String,
    pub ink_color: String,
    pub paper_color: String,
}

impl Default for ThumpaConfig {
    fn default() -> Self {
        ThumpaConfig {
            config_path: None,
            mode: "preview".to_string(),
            plasma: true,
            model: true,
            tick_ms: TICK_MS,
            model_scale: MODEL_SCALE,
            frames: 0,
            out_dir: "frames".to_string(),
            ink_color: "000000".to_string(),
            paper_color: "FFFFFF".to_string(),
        }
    }
}

impl ThumpaConfig {
    pub fn merge_with_args(&mut self, args: &Args) -> bool {
        let mut args_provided = false;

        if let Some(ref mode) = args.mode {
            self.mode = mode.clone();
            args_provided = true;
        }

        if let Some(frames) = args.frames {
            self.frames = frames;
            args_provided = true;
        }

        if let Some(ref out) = args.out {
            self.out_dir = out.clone();
            args_provided = true;
        }

        if let Some(tick_ms) = args.tick_ms {
            self.tick_ms = tick_ms;
            args_provided = true;
        }

        // The switches only ever turn a layer off
        if args.no_plasma {
            self.plasma = false;
            args_provided = true;
        }

        if args.no_model {
            self.model = false;
            args_provided = true;
        }

        if let Some(model_scale) = args.model_scale {
            self.model_scale = model_scale;
            args_provided = true;
        }

        if let Some(ref ink) = args.ink {
            self.ink_color = ink.clone();
            args_provided = true;
        }

        if let Some(ref paper) = args.paper {
            self.paper_color = paper.clone();
            args_provided = true;
        }

        if args_provided {
            self.sanitize();
        }
        args_provided
    }

    pub fn config_path(cfg_arg: Option<&str>) -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        let config_dir = PathBuf::from(home).join(".config").join("thumpa");
        Self::config_path_in(&config_dir, cfg_arg)
    }

    /// Resolve `cfg_arg` against `config_dir`: paths are taken as-is, bare names
    /// become `<config_dir>/<name>.conf`
    pub fn config_path_in(config_dir: &Path, cfg_arg: Option<&str>) -> Result<PathBuf> {
        let Some(cfg) = cfg_arg else {
            std::fs::create_dir_all(config_dir)?;
            return Ok(config_dir.join("config.conf"));
        };

        let path = PathBuf::from(cfg);
        if path.is_absolute() || cfg.contains('/') || cfg.contains('\\') {
            return Ok(path);
        }

        std::fs::create_dir_all(config_dir)?;
        let filename = if cfg.ends_with(".conf") {
            cfg.to_string()
        } else {
            format!("{}.conf", cfg)
        };
        Ok(config_dir.join(filename))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut parsed: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        parsed.config_path = Some(path.to_path_buf());
        parsed.sanitize();
        Ok(parsed)
    }

    /// Load the config at `path`, or fall back to defaults when it does not exist yet.
    /// The returned flag says whether the file was there.
    pub fn load_or_default(path: &Path) -> Result<(Self, bool)> {
        if path.exists() {
            return Ok((Self::load_from(path)?, true));
        }
        let config = ThumpaConfig {
            config_path: Some(path.to_path_buf()),
            ..ThumpaConfig::default()
        };
        Ok((config, false))
    }

    pub fn run_mode(&self) -> Result<RunMode> {
        RunMode::from_string(&self.mode)
    }

    /// Sanitize config values to handle common formatting issues
    pub fn sanitize(&mut self) {
        self.mode = self.mode.trim().to_lowercase();
        self.out_dir = self.out_dir.trim().to_string();
        if self.out_dir.is_empty() {
            self.out_dir = "frames".to_string();
        }

        self.ink_color = Self::sanitize_color_string(&self.ink_color, "000000");
        self.paper_color = Self::sanitize_color_string(&self.paper_color, "FFFFFF");

        // 0 or 1 ms leaves the host no time to present
        self.tick_ms = self.tick_ms.clamp(2, 1000);
        self.model_scale = self.model_scale.clamp(8, 512);
    }

    /// Uppercase hex without '#'; anything unparsable falls back to `fallback`
    fn sanitize_color_string(color: &str, fallback: &str) -> String {
        let trimmed = color.trim().trim_start_matches('#').to_uppercase();
        if Rgb::from_hex(&trimmed).is_ok() {
            trimmed
        } else {
            fallback.to_string()
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = match self.config_path.clone() {
            Some(path) => path,
            None => Self::config_path(None)?,
        };

        let mut sanitized = self.clone();
        sanitized.sanitize();

        let contents = format!(
            r#"# thumpa configuration file
# tick_ms, model_scale, ink_color and paper_color apply live while previewing.
# plasma and model take effect on the next start.

# Run mode
# Options: "preview", "headless", "dump"
mode = "{}"

# Draw the dithered plasma background
plasma = {}

# Draw the rotating wireframe model
model = {}

# Delay between frames in milliseconds (2-1000)
tick_ms = {}

# Model projection scale, 256 = one pixel per model unit (8-512)
model_scale = {}

# Stop after this many frames, 0 = run until quit
frames = {}

# Output directory for dump mode
out_dir = "{}"

# Color used for black pixels (hex)
ink_color = "{}"

# Color used for white pixels (hex)
paper_color = "{}"
"#,
            sanitized.mode,
            sanitized.plasma,
            sanitized.model,
            sanitized.tick_ms,
            sanitized.model_scale,
            sanitized.frames,
            sanitized.out_dir,
            sanitized.ink_color,
            sanitized.paper_color,
        );

        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        info!("Saved config to {}", path.display());
        Ok(())
    }
}

/// Watch the config file and send every successfully parsed edit.
///
/// The parent directory is watched so editors that replace the file on save
/// are still picked up. The channel closes if the watcher cannot start.
pub fn spawn_config_watcher(path: PathBuf) -> Result<Receiver<ThumpaConfig>> {
    let (config_tx, config_rx) = mpsc::channel();
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from("."));

    std::thread::spawn(move || {
        let (tx, rx) = mpsc::channel();
        let mut watcher = match RecommendedWatcher::new(tx, Config::default()) {
            Ok(w) => w,
            Err(e) => {
                warn!("Config watcher unavailable: {}", e);
                return;
            }
        };

        if let Err(e) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
            warn!("Cannot watch {}: {}", dir.display(), e);
            return;
        }

        let file_name = path.file_name().map(|n| n.to_os_string());
        loop {
            match rx.recv() {
                Ok(Ok(NotifyEvent { kind, paths, .. })) => {
                    if !matches!(kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        continue;
                    }
                    if !paths.iter().any(|p| p.file_name().map(|n| n.to_os_string()) == file_name) {
                        continue;
                    }
                    match ThumpaConfig::load_from(&path) {
                        Ok(config) => {
                            if config_tx.send(config).is_err() {
                                break; // renderer is gone
                            }
                        }
                        Err(e) => warn!("Ignoring config edit: {:#}", e),
                    }
                }
                Ok(Err(e)) => warn!("Config watch error: {}", e),
                Err(_) => break,
            }
        }
    });

    Ok(config_rx)
}
