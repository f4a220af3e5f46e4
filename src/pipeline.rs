use crate::audio::features::AudioFeatureExtractor;
use crate::config::Settings;
use crate::encode::assembler::{Assembled, VideoAssembler};
use crate::encode::ffmpeg::{self, FfmpegFrameSink};
use crate::encode::intermediate::IntermediateVideo;
use crate::error::{Error, Result};
use crate::render::modes;
use crate::render::synth::{CanvasSpec, FrameSynthesisLoop};

/// One end-to-end run: analyze, render, assemble.
///
/// Audio is loaded before anything touches the filesystem, so a bad input
/// fails without spawning ffmpeg or creating files.
pub fn run(settings: &Settings) -> Result<Assembled> {
    log::info!("Analyzing audio...");
    let mut extractor = AudioFeatureExtractor::from_file(&settings.input, settings.fps, settings.smoothing)?;
    log::info!(
        "Duration: {:.2}s, {} spectrogram columns, smoothing {:.2}",
        extractor.duration(),
        extractor.frame_count(),
        extractor.smoothing()
    );

    let mut strategy = modes::create(settings.mode, &settings.style)
        .ok_or_else(|| Error::InvalidSettings(format!("unknown render mode {}", settings.mode)))?;

    ffmpeg::probe(&settings.ffmpeg)?;

    let canvas = CanvasSpec {
        width: settings.width,
        height: settings.height,
    };
    let synth = FrameSynthesisLoop::new(
        settings.fps,
        settings.num_bars,
        canvas,
        IntermediateVideo::path_for(&settings.output),
    )
    .with_progress();

    let intermediate = synth.generate(extractor.duration(), &mut extractor, strategy.as_mut(), |path| {
        FfmpegFrameSink::open(&settings.ffmpeg, path, canvas, settings.fps, &settings.intermediate)
    })?;

    let mut assembler = VideoAssembler::with_ffmpeg(&settings.ffmpeg, settings.transparent, settings.color_key);
    let assembled = assembler.compose(intermediate, &settings.input, &settings.output)?;
    log::debug!("Assembler finished in state {:?}", assembler.state());
    Ok(assembled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::config::Config;
    use clap::Parser;
    use std::ffi::OsStr;
    use std::path::Path;

    fn settings_for(input: &Path, dir: &Path) -> Settings {
        let output = dir.join("out.mp4");
        let cli = Cli::parse_from([
            OsStr::new("spectrocast"),
            input.as_os_str(),
            OsStr::new("-o"),
            output.as_os_str(),
            OsStr::new("--ffmpeg"),
            OsStr::new("/definitely/not/ffmpeg"),
        ]);
        Settings::resolve(&cli, &Config::default()).unwrap()
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn empty_audio_path_fails_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_for(Path::new(""), dir.path());

        let err = run(&settings).unwrap_err();

        assert!(matches!(err, Error::AudioLoad { .. }));
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn missing_audio_file_fails_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_for(&dir.path().join("nope.wav"), dir.path());

        let err = run(&settings).unwrap_err();

        assert!(matches!(err, Error::AudioLoad { .. }));
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn missing_ffmpeg_is_reported_before_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&input, spec).unwrap();
        for i in 0..8000 {
            let s = (i as f32 * 440.0 * std::f32::consts::TAU / 8000.0).sin();
            writer.write_sample((s * 12000.0) as i16).unwrap();
        }
        writer.finalize().unwrap();

        let settings = settings_for(&input, dir.path());
        let err = run(&settings).unwrap_err();

        assert!(matches!(err, Error::EncoderMissing { .. }));
        assert_eq!(entries(dir.path()), 1);
    }
}
