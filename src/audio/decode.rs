use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Error, Result};

/// Mono sample buffer for one generation run.
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode an audio file into a mono waveform.
///
/// Every failure (empty path, unreadable file, unknown container, no audio
/// track, zero decoded samples) maps to `Error::AudioLoad`; nothing is kept
/// from a failed attempt.
pub fn load(path: &Path) -> Result<Waveform> {
    if path.as_os_str().is_empty() {
        return Err(Error::audio_load(path, "empty path"));
    }

    let file = std::fs::File::open(path).map_err(|e| Error::audio_load(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::audio_load(path, format!("unsupported format ({e})")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::audio_load(path, "no audio tracks found"))?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count()).max(1);
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::audio_load(path, "unknown sample rate"))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::audio_load(path, format!("no decoder ({e})")))?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(Error::audio_load(path, e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::debug!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(Error::audio_load(path, e)),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        downmix_into(sample_buf.samples(), channels, &mut all_samples);
    }

    if all_samples.is_empty() {
        return Err(Error::audio_load(path, "no samples decoded"));
    }

    let waveform = Waveform {
        samples: all_samples,
        sample_rate,
    };

    log::info!(
        "Decoded audio: {} samples, {}Hz, {:.1}s",
        waveform.samples.len(),
        sample_rate,
        waveform.duration_secs()
    );

    Ok(waveform)
}

fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels == 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    for frame_samples in interleaved.chunks(channels) {
        let mono: f32 = frame_samples.iter().sum::<f32>() / channels as f32;
        out.push(mono);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_sine_wav(path: &Path, sample_rate: u32, channels: u16, seconds: f32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let total = (sample_rate as f32 * seconds) as usize;
        for i in 0..total {
            let t = i as f32 / sample_rate as f32;
            let s = (t * 440.0 * std::f32::consts::TAU).sin() * 0.5;
            for _ in 0..channels {
                writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn loads_stereo_wav_as_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_sine_wav(&path, 8000, 2, 0.5);

        let waveform = load(&path).unwrap();
        assert_eq!(waveform.sample_rate, 8000);
        assert_eq!(waveform.samples.len(), 4000);
        assert!((waveform.duration_secs() - 0.5).abs() < 1e-6);
        assert!(waveform.samples.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn empty_path_is_audio_load_error() {
        let err = load(Path::new("")).err().unwrap();
        assert!(matches!(err, Error::AudioLoad { .. }));
    }

    #[test]
    fn missing_file_is_audio_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("nope.wav")).err().unwrap();
        assert!(matches!(err, Error::AudioLoad { .. }));
    }

    #[test]
    fn garbage_file_is_audio_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.mp3");
        std::fs::write(&path, b"definitely not an mp3 stream").unwrap();
        let err = load(&path).err().unwrap();
        assert!(matches!(err, Error::AudioLoad { .. }));
    }

    #[test]
    fn zero_length_wav_is_audio_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silent.wav");
        write_sine_wav(&path, 8000, 1, 0.0);
        let err = load(&path).err().unwrap();
        assert!(matches!(err, Error::AudioLoad { .. }));
    }

    #[test]
    fn downmix_averages_channels() {
        let mut out = Vec::new();
        downmix_into(&[1.0, 0.0, 0.5, 0.5], 2, &mut out);
        assert_eq!(out, vec![0.5, 0.5]);
    }
}
