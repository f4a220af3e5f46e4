use clap::Parser;
use std::path::PathBuf;

use crate::config::Preset;
use crate::render::color::Rgb;

/// Flags left unset fall back to the config file, then to built-in defaults.
#[derive(Parser, Debug)]
#[command(name = "spectrocast", about = "Render an audio track into a spectrum-visualizer video")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
    pub input: Option<PathBuf>,

    /// Output video file [default: output.mp4, or output.webm with --transparent]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Render mode id (see --list-modes)
    #[arg(short, long)]
    pub mode: Option<u32>,

    /// Canvas size preset: square 1080x1080, shorts 1080x1920, hd 1920x1080
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,

    /// Video width in pixels (implies --preset custom)
    #[arg(long)]
    pub width: Option<u32>,

    /// Video height in pixels (implies --preset custom)
    #[arg(long)]
    pub height: Option<u32>,

    /// Frames per second
    #[arg(long)]
    pub fps: Option<u32>,

    /// Number of frequency bars
    #[arg(long)]
    pub bars: Option<usize>,

    /// Temporal smoothing factor (0.0-1.0, higher = smoother)
    #[arg(long)]
    pub smoothing: Option<f32>,

    /// Base colour (#rrggbb or r,g,b)
    #[arg(long)]
    pub color: Option<Rgb>,

    /// Colour bars with a gradient instead of a solid colour
    #[arg(long)]
    pub gradient: bool,

    /// Gradient colour at the low-frequency end
    #[arg(long)]
    pub gradient_start: Option<Rgb>,

    /// Gradient colour at the high-frequency end
    #[arg(long)]
    pub gradient_end: Option<Rgb>,

    /// Empty centre of radial modes, as a fraction of the shorter side
    #[arg(long)]
    pub inner_radius: Option<f32>,

    /// Bar width in pixels (0 = derive from canvas width)
    #[arg(long)]
    pub bar_width: Option<u32>,

    /// Key out the black background into an alpha channel (VP9 .webm)
    #[arg(long)]
    pub transparent: bool,

    /// Intermediate H.264 CRF quality (0-51, lower = better)
    #[arg(long)]
    pub crf: Option<u32>,

    /// Path to the ffmpeg executable
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,

    /// Config file [default: ./spectrocast.toml, then the user config dir]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// List available render modes and exit
    #[arg(long)]
    pub list_modes: bool,
}
