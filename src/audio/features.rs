use std::path::Path;

use super::decode;
use super::spectrogram::Spectrogram;
use crate::error::Result;

/// Fraction of the spectrum (from DC upward) that bars are drawn from.
const USEFUL_BIN_FRACTION: f32 = 0.6;
/// Exponent of the bar → bin mapping; > 1 spends more bars on low frequencies.
const BAND_CURVE: f32 = 1.5;

pub const DEFAULT_SMOOTHING: f32 = 0.7;

/// Per-frame magnitude vectors for one generation run.
///
/// Holds the immutable spectrogram plus the single previous vector used for
/// exponential smoothing. Build a new extractor to reset smoothing.
pub struct AudioFeatureExtractor {
    spectrogram: Spectrogram,
    smoothing: f32,
    duration: f64,
    previous: Option<Vec<f32>>,
}

impl AudioFeatureExtractor {
    pub fn new(spectrogram: Spectrogram, smoothing: f32, duration: f64) -> Self {
        Self {
            spectrogram,
            smoothing: smoothing.clamp(0.0, 1.0),
            duration,
            previous: None,
        }
    }

    /// Decode `path` and build its spectrogram. The waveform is dropped once
    /// the spectrogram exists.
    pub fn from_file(path: &Path, fps: u32, smoothing: f32) -> Result<Self> {
        let waveform = decode::load(path)?;
        let duration = waveform.duration_secs();
        let spectrogram = Spectrogram::compute(&waveform, fps);
        log::debug!(
            "Spectrogram: {} bins x {} columns, hop {} samples",
            spectrogram.bins(),
            spectrogram.frames(),
            spectrogram.hop()
        );
        Ok(Self::new(spectrogram, smoothing, duration))
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn frame_count(&self) -> usize {
        self.spectrogram.frames()
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    /// Smoothed, clamped magnitudes for `frame_index`.
    pub fn band_magnitudes(&mut self, frame_index: usize, num_bars: usize) -> Vec<f32> {
        let raw = self.raw_bands(frame_index, num_bars);
        let alpha = self.smoothing;

        let smoothed: Vec<f32> = match self.previous.as_deref() {
            Some(prev) if prev.len() == raw.len() => prev
                .iter()
                .zip(&raw)
                .map(|(&p, &r)| clamp_unit(alpha * p + (1.0 - alpha) * r))
                .collect(),
            _ => raw,
        };

        self.previous = Some(smoothed.clone());
        smoothed
    }

    /// Unsmoothed banding of one spectrogram column. Does not touch the
    /// smoothing state.
    pub fn raw_bands(&self, frame_index: usize, num_bars: usize) -> Vec<f32> {
        let column = self.spectrogram.column(frame_index);
        band_column(column, num_bars)
    }
}

/// Collapse a column into `num_bars` values using a power-law bin mapping
/// over the lower part of the spectrum.
pub fn band_column(column: &[f32], num_bars: usize) -> Vec<f32> {
    if num_bars == 0 {
        return Vec::new();
    }

    let useful = ((column.len() as f32 * USEFUL_BIN_FRACTION) as usize).max(1);
    let half_window = (useful / (2 * num_bars)).max(1);

    (0..num_bars)
        .map(|i| {
            let t = i as f32 / num_bars as f32;
            let idx = (useful as f32 * t.powf(BAND_CURVE)) as usize;

            let start = idx.saturating_sub(half_window);
            let end = (idx + half_window).min(useful).min(column.len());

            let value = if end > start {
                column[start..end].iter().sum::<f32>() / (end - start) as f32
            } else {
                column.get(idx).copied().unwrap_or(0.0)
            };
            clamp_unit(value)
        })
        .collect()
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_spectrogram(frames: usize, bins: usize) -> Spectrogram {
        let columns = (0..frames)
            .map(|f| {
                (0..bins)
                    .map(|b| ((f * 7 + b * 3) % 11) as f32 / 10.0)
                    .collect()
            })
            .collect();
        Spectrogram::from_columns(columns)
    }

    #[test]
    fn vector_has_requested_length_and_range() {
        let mut ex = AudioFeatureExtractor::new(ramp_spectrogram(20, 1025), 0.7, 1.0);
        for frame in [0, 5, 19, 20, 500] {
            for bars in [1, 8, 64, 300] {
                let v = ex.band_magnitudes(frame, bars);
                assert_eq!(v.len(), bars);
                assert!(v.iter().all(|x| (0.0..=1.0).contains(x)));
            }
        }
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let spec = Spectrogram::from_columns(vec![vec![3.0; 100], vec![-2.0; 100], vec![f32::NAN; 100]]);
        let ex = AudioFeatureExtractor::new(spec, 0.0, 1.0);
        assert!(ex.raw_bands(0, 10).iter().all(|&v| v == 1.0));
        assert!(ex.raw_bands(1, 10).iter().all(|&v| v == 0.0));
        assert!(ex.raw_bands(2, 10).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn first_query_is_unsmoothed() {
        let mut ex = AudioFeatureExtractor::new(ramp_spectrogram(4, 200), 0.9, 1.0);
        let raw = ex.raw_bands(2, 16);
        assert_eq!(ex.band_magnitudes(2, 16), raw);
    }

    #[test]
    fn smoothing_law_holds_for_sequence() {
        let alpha = 0.7;
        let mut ex = AudioFeatureExtractor::new(ramp_spectrogram(30, 300), alpha, 1.0);
        let order = [0usize, 3, 3, 17, 1, 29, 8];

        let mut expected: Option<Vec<f32>> = None;
        for &frame in &order {
            let raw = ex.raw_bands(frame, 12);
            let want: Vec<f32> = match &expected {
                None => raw.clone(),
                Some(prev) => prev
                    .iter()
                    .zip(&raw)
                    .map(|(p, r)| alpha * p + (1.0 - alpha) * r)
                    .collect(),
            };
            let got = ex.band_magnitudes(frame, 12);
            for (g, w) in got.iter().zip(&want) {
                assert!((g - w).abs() < 1e-6, "{g} vs {w}");
            }
            expected = Some(got);
        }
    }

    #[test]
    fn zero_smoothing_tracks_raw() {
        let mut ex = AudioFeatureExtractor::new(ramp_spectrogram(10, 100), 0.0, 1.0);
        ex.band_magnitudes(0, 8);
        let raw = ex.raw_bands(5, 8);
        assert_eq!(ex.band_magnitudes(5, 8), raw);
    }

    #[test]
    fn full_smoothing_holds_first_vector() {
        let mut ex = AudioFeatureExtractor::new(ramp_spectrogram(10, 100), 1.0, 1.0);
        let first = ex.band_magnitudes(0, 8);
        assert_eq!(ex.band_magnitudes(7, 8), first);
    }

    #[test]
    fn frame_past_end_matches_last_frame() {
        let spec = ramp_spectrogram(12, 400);
        let ex = AudioFeatureExtractor::new(spec.clone(), 0.7, 1.0);
        assert_eq!(ex.raw_bands(12, 24), ex.raw_bands(11, 24));
        assert_eq!(ex.raw_bands(10_000, 24), ex.raw_bands(11, 24));

        let mut a = AudioFeatureExtractor::new(spec.clone(), 0.7, 1.0);
        let mut b = AudioFeatureExtractor::new(spec, 0.7, 1.0);
        assert_eq!(a.band_magnitudes(11, 24), b.band_magnitudes(99, 24));
    }

    #[test]
    fn bar_count_change_restarts_smoothing() {
        let mut ex = AudioFeatureExtractor::new(ramp_spectrogram(5, 100), 0.5, 1.0);
        ex.band_magnitudes(0, 8);
        let raw = ex.raw_bands(1, 4);
        assert_eq!(ex.band_magnitudes(1, 4), raw);
    }

    #[test]
    fn low_bars_read_low_bins() {
        // Energy only in the lowest 5% of bins.
        let bins = 1000;
        let column: Vec<f32> = (0..bins).map(|b| if b < 50 { 1.0 } else { 0.0 }).collect();
        let bands = band_column(&column, 10);
        assert!(bands[0] > 0.9);
        assert_eq!(bands[9], 0.0);
    }

    #[test]
    fn upper_bins_are_ignored() {
        let bins = 1000;
        let column: Vec<f32> = (0..bins).map(|b| if b >= 600 { 1.0 } else { 0.0 }).collect();
        assert!(band_column(&column, 32).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn tiny_columns_do_not_panic() {
        assert_eq!(band_column(&[0.5], 4), vec![0.5; 4]);
        assert_eq!(band_column(&[], 3), vec![0.0; 3]);
        assert!(band_column(&[0.2, 0.4], 0).is_empty());
    }
}
