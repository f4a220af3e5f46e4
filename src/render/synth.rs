use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use super::canvas::Canvas;
use super::strategy::{FrameClock, RenderStrategy};
use crate::audio::features::AudioFeatureExtractor;
use crate::encode::intermediate::IntermediateVideo;
use crate::error::{Error, Result};

/// Destination for rendered frames, written strictly in order.
pub trait FrameSink {
    fn write_frame(&mut self, canvas: &Canvas) -> Result<()>;

    /// Flush and close. The artifact is complete only after this returns Ok.
    fn finish(self) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
}

/// `floor(duration * fps)`; non-finite or negative durations yield 0.
pub fn total_frames(duration_secs: f64, fps: u32) -> u64 {
    let frames = (duration_secs * fps as f64).floor();
    if frames.is_finite() && frames > 0.0 {
        frames as u64
    } else {
        0
    }
}

/// Nearest-neighbour map from output frame to spectrogram column.
///
/// Monotonic in `output_frame` and always inside `[0, spectrogram_frames)`.
pub fn audio_frame_index(output_frame: u64, total_frames: u64, spectrogram_frames: usize) -> usize {
    if total_frames == 0 || spectrogram_frames == 0 {
        return 0;
    }
    let idx = (output_frame as u128 * spectrogram_frames as u128 / total_frames as u128) as usize;
    idx.min(spectrogram_frames - 1)
}

pub struct FrameSynthesisLoop {
    fps: u32,
    num_bars: usize,
    canvas: CanvasSpec,
    intermediate_path: PathBuf,
    progress: ProgressBar,
}

impl FrameSynthesisLoop {
    pub fn new(fps: u32, num_bars: usize, canvas: CanvasSpec, intermediate_path: PathBuf) -> Self {
        Self {
            fps,
            num_bars,
            canvas,
            intermediate_path,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self) -> Self {
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        self.progress = ProgressBar::new(0).with_style(style);
        self
    }

    /// Render `floor(duration * fps)` frames into a silent intermediate video.
    ///
    /// `open_sink` is called once, before any frame is rendered. If it fails,
    /// or any later write fails, the intermediate file is removed before the
    /// error is returned. A sink that finishes without leaving a non-empty
    /// file at the intermediate path is an `EncodeFailure`.
    pub fn generate<S, F>(
        &self,
        duration_secs: f64,
        extractor: &mut AudioFeatureExtractor,
        strategy: &mut dyn RenderStrategy,
        open_sink: F,
    ) -> Result<IntermediateVideo>
    where
        S: FrameSink,
        F: FnOnce(&Path) -> Result<S>,
    {
        let total = total_frames(duration_secs, self.fps);
        if total == 0 {
            return Err(Error::InvalidSettings(format!(
                "audio is {duration_secs:.3}s long, shorter than one frame at {} fps",
                self.fps
            )));
        }

        let spectrogram_frames = extractor.frame_count();
        let video = IntermediateVideo::new(self.intermediate_path.clone());
        let mut sink = open_sink(video.path())?;

        log::info!(
            "Rendering {} frames with '{}' ({} spectrogram columns, {} bars)",
            total,
            strategy.name(),
            spectrogram_frames,
            self.num_bars
        );

        let mut canvas = Canvas::new(self.canvas.width, self.canvas.height);
        let mut clock = FrameClock::new(self.fps);
        self.progress.set_length(total);

        for output_frame in 0..total {
            let audio_frame = audio_frame_index(output_frame, total, spectrogram_frames);
            let magnitudes = extractor.band_magnitudes(audio_frame, self.num_bars);

            canvas.clear();
            strategy.render(&mut canvas, &magnitudes, &clock);
            sink.write_frame(&canvas)?;

            clock.advance();
            self.progress.inc(1);
        }

        sink.finish()?;
        let written = std::fs::metadata(video.path()).map(|m| m.len() > 0).unwrap_or(false);
        if !written {
            return Err(Error::EncodeFailure {
                stage: "intermediate",
                status: "exit 0".into(),
                stderr: format!("no video written to {}", video.path().display()),
            });
        }
        self.progress.finish_with_message("Rendering complete");
        log::info!("Intermediate video written: {}", video.path().display());

        Ok(video)
    }
}
