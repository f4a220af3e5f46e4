use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::features::DEFAULT_SMOOTHING;
use crate::cli::Cli;
use crate::encode::assembler::ColorKey;
use crate::encode::ffmpeg::IntermediateSettings;
use crate::error::{Error, Result};
use crate::render::color::Rgb;
use crate::render::modes;
use crate::render::strategy::Style;

const CONFIG_FILE: &str = "spectrocast.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Square,
    Shorts,
    Hd,
    Custom,
}

impl Preset {
    pub fn dimensions(self) -> Option<(u32, u32)> {
        match self {
            Preset::Square => Some((1080, 1080)),
            Preset::Shorts => Some((1080, 1920)),
            Preset::Hd => Some((1920, 1080)),
            Preset::Custom => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub preset: Option<Preset>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default)]
    pub transparent: bool,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_num_bars")]
    pub num_bars: usize,
}

#[derive(Debug, Deserialize)]
pub struct StyleConfig {
    #[serde(default)]
    pub mode: u32,
    #[serde(default = "default_color")]
    pub color: Rgb,
    #[serde(default)]
    pub gradient: bool,
    #[serde(default)]
    pub gradient_start: Option<Rgb>,
    #[serde(default)]
    pub gradient_end: Option<Rgb>,
    #[serde(default = "default_inner_radius")]
    pub inner_radius: f32,
    #[serde(default)]
    pub bar_width: u32,
}

#[derive(Debug, Deserialize)]
pub struct EncoderConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_speed")]
    pub speed: String,
    #[serde(default = "default_key_similarity")]
    pub key_similarity: f32,
    #[serde(default)]
    pub key_blend: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            preset: None,
            width: None,
            height: None,
            fps: default_fps(),
            transparent: false,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            smoothing: default_smoothing(),
            num_bars: default_num_bars(),
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            mode: 0,
            color: default_color(),
            gradient: false,
            gradient_start: None,
            gradient_end: None,
            inner_radius: default_inner_radius(),
            bar_width: 0,
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            codec: default_codec(),
            crf: default_crf(),
            speed: default_speed(),
            key_similarity: default_key_similarity(),
            key_blend: 0.0,
        }
    }
}

fn default_fps() -> u32 { 30 }
fn default_smoothing() -> f32 { DEFAULT_SMOOTHING }
fn default_num_bars() -> usize { 64 }
fn default_color() -> Rgb { Style::default().color }
fn default_inner_radius() -> f32 { Style::default().inner_radius }
fn default_ffmpeg() -> PathBuf { "ffmpeg".into() }
fn default_codec() -> String { IntermediateSettings::default().codec }
fn default_crf() -> u32 { IntermediateSettings::default().crf }
fn default_speed() -> String { IntermediateSettings::default().preset }
fn default_key_similarity() -> f32 { ColorKey::default().similarity }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("Failed to read config {}", path.display()), e))?;
    toml::from_str(&content)
        .map_err(|e| Error::InvalidSettings(format!("{}: {}", path.display(), e)))
}

/// Explicit path, else `./spectrocast.toml`, else the per-user config file.
pub fn discover(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("spectrocast").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("spectrocast").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

/// Everything one run needs, after CLI > config > default resolution.
#[derive(Debug, Clone)]
pub struct Settings {
    pub input: PathBuf,
    pub output: PathBuf,
    pub mode: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub num_bars: usize,
    pub smoothing: f32,
    pub style: Style,
    pub transparent: bool,
    pub ffmpeg: PathBuf,
    pub intermediate: IntermediateSettings,
    pub color_key: ColorKey,
}

impl Settings {
    pub fn resolve(cli: &Cli, cfg: &Config) -> Result<Self> {
        let input = cli
            .input
            .clone()
            .ok_or_else(|| Error::InvalidSettings("an input audio file is required".into()))?;

        let (width, height) = resolve_dimensions(cli, &cfg.output)?;
        let transparent = cli.transparent || cfg.output.transparent;
        let output = cli.output.clone().unwrap_or_else(|| {
            PathBuf::from(if transparent { "output.webm" } else { "output.mp4" })
        });

        let color = cli.color.unwrap_or(cfg.style.color);
        let gradient = (cli.gradient || cfg.style.gradient).then(|| {
            (
                cli.gradient_start.or(cfg.style.gradient_start).unwrap_or(color),
                cli.gradient_end.or(cfg.style.gradient_end).unwrap_or(Rgb::WHITE),
            )
        });

        let settings = Self {
            input,
            output,
            mode: cli.mode.unwrap_or(cfg.style.mode),
            width,
            height,
            fps: cli.fps.unwrap_or(cfg.output.fps),
            num_bars: cli.bars.unwrap_or(cfg.audio.num_bars),
            smoothing: cli.smoothing.unwrap_or(cfg.audio.smoothing),
            style: Style {
                color,
                gradient,
                inner_radius: cli.inner_radius.unwrap_or(cfg.style.inner_radius),
                bar_width: cli.bar_width.unwrap_or(cfg.style.bar_width),
            },
            transparent,
            ffmpeg: cli.ffmpeg.clone().unwrap_or_else(|| cfg.encoder.ffmpeg.clone()),
            intermediate: IntermediateSettings {
                codec: cfg.encoder.codec.clone(),
                crf: cli.crf.unwrap_or(cfg.encoder.crf),
                preset: cfg.encoder.speed.clone(),
                ..IntermediateSettings::default()
            },
            color_key: ColorKey {
                similarity: cfg.encoder.key_similarity,
                blend: cfg.encoder.key_blend,
            },
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::InvalidSettings(msg));

        if self.fps == 0 {
            return fail("fps must be greater than 0".into());
        }
        if self.num_bars == 0 {
            return fail("bars must be greater than 0".into());
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return fail(format!("smoothing must be within 0.0-1.0, got {}", self.smoothing));
        }
        if self.width == 0 || self.height == 0 || self.width % 2 != 0 || self.height % 2 != 0 {
            return fail(format!(
                "dimensions must be even and non-zero, got {}x{}",
                self.width, self.height
            ));
        }
        if !(0.0..1.0).contains(&self.style.inner_radius) {
            return fail(format!("inner radius must be within 0.0-1.0, got {}", self.style.inner_radius));
        }
        if self.intermediate.crf > 51 {
            return fail(format!("crf must be within 0-51, got {}", self.intermediate.crf));
        }
        if !(self.color_key.similarity > 0.0 && self.color_key.similarity <= 1.0)
            || !(0.0..=1.0).contains(&self.color_key.blend)
        {
            return fail(format!(
                "colour key similarity must be in (0, 1] and blend in [0, 1], got {} / {}",
                self.color_key.similarity, self.color_key.blend
            ));
        }
        if modes::find(self.mode).is_none() {
            return fail(format!("unknown render mode {} (see --list-modes)", self.mode));
        }
        Ok(())
    }
}

fn resolve_dimensions(cli: &Cli, output: &OutputConfig) -> Result<(u32, u32)> {
    let cli_sized = cli.width.is_some() || cli.height.is_some();
    let preset = cli
        .preset
        .or(cli_sized.then_some(Preset::Custom))
        .or(output.preset)
        .unwrap_or(if output.width.is_some() && output.height.is_some() {
            Preset::Custom
        } else {
            Preset::Hd
        });

    if let Some(dims) = preset.dimensions() {
        return Ok(dims);
    }
    match (cli.width.or(output.width), cli.height.or(output.height)) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(Error::InvalidSettings(
            "custom preset needs both --width and --height".into(),
        )),
    }
}
