use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};

use super::decode::Waveform;

/// STFT window length. 2048 samples gives ~21 Hz bins at 44.1 kHz while a
/// column still spans well under one video frame at 30 fps.
pub const FFT_SIZE: usize = 2048;

/// Magnitudes more than this far below the peak are floored.
const TOP_DB: f32 = 80.0;
const AMPLITUDE_FLOOR: f32 = 1e-5;

/// Normalized magnitude matrix, one column per hop.
///
/// Stored column-major (`data[frame * bins + bin]`) so a frame query is a
/// contiguous slice.
#[derive(Clone, Debug)]
pub struct Spectrogram {
    bins: usize,
    frames: usize,
    hop: usize,
    data: Vec<f32>,
}

impl Spectrogram {
    /// Compute the dB-normalized spectrogram with one column per video tick.
    pub fn compute(waveform: &Waveform, fps: u32) -> Self {
        let hop = hop_length(waveform.sample_rate, fps);
        let samples = &waveform.samples;
        let frames = 1 + samples.len() / hop;
        let bins = FFT_SIZE / 2 + 1;

        log::info!(
            "STFT: {} columns, {} bins, hop={} samples, window={}",
            frames,
            bins,
            hop,
            FFT_SIZE
        );

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let hann = hann_window(FFT_SIZE);

        let columns: Vec<Vec<f32>> = (0..frames)
            .into_par_iter()
            .map(|frame_idx| {
                let center = frame_idx * hop;
                let mut buffer = vec![Complex::new(0.0f32, 0.0); FFT_SIZE];
                for (i, slot) in buffer.iter_mut().enumerate() {
                    // Centered frames: zero padding of FFT_SIZE / 2 on both ends.
                    let Some(idx) = (center + i).checked_sub(FFT_SIZE / 2) else {
                        continue;
                    };
                    if let Some(&s) = samples.get(idx) {
                        *slot = Complex::new(s * hann[i], 0.0);
                    }
                }
                fft.process(&mut buffer);
                buffer[..bins].iter().map(|c| c.norm()).collect()
            })
            .collect();

        let mut data: Vec<f32> = columns.into_iter().flatten().collect();
        normalize_db(&mut data);

        Self {
            bins,
            frames,
            hop,
            data,
        }
    }

    #[cfg(test)]
    pub fn from_columns(columns: Vec<Vec<f32>>) -> Self {
        let frames = columns.len();
        let bins = columns.first().map_or(0, Vec::len);
        assert!(columns.iter().all(|c| c.len() == bins));
        Self {
            bins,
            frames,
            hop: 1,
            data: columns.into_iter().flatten().collect(),
        }
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Out-of-range frame policy: indices past the end clamp to the last
    /// column rather than erroring.
    pub fn resolve_frame(&self, frame_index: usize) -> usize {
        frame_index.min(self.frames.saturating_sub(1))
    }

    /// Column for `frame_index` after applying [`Spectrogram::resolve_frame`].
    pub fn column(&self, frame_index: usize) -> &[f32] {
        if self.frames == 0 {
            return &[];
        }
        let frame = self.resolve_frame(frame_index);
        &self.data[frame * self.bins..(frame + 1) * self.bins]
    }
}

pub fn hop_length(sample_rate: u32, fps: u32) -> usize {
    (sample_rate / fps.max(1)).max(1) as usize
}

/// Convert raw magnitudes to dB relative to the peak, then min-max to [0, 1].
fn normalize_db(data: &mut [f32]) {
    let peak = data.iter().copied().fold(0.0f32, f32::max).max(AMPLITUDE_FLOOR);
    let ref_db = 20.0 * peak.log10();

    for v in data.iter_mut() {
        let db = 20.0 * v.max(AMPLITUDE_FLOOR).log10() - ref_db;
        *v = db.max(-TOP_DB);
    }

    let (min, max) = data
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;

    for v in data.iter_mut() {
        *v = if range > f32::EPSILON { (*v - min) / range } else { 0.0 };
    }
}

/// Periodic Hann window (denominator `size`, not `size - 1`).
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (std::f32::consts::TAU * i as f32 / size as f32).cos()))
        .collect()
}
