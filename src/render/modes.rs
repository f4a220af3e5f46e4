//! Built-in render modes and the id → constructor registry.

use std::f32::consts::TAU;

use super::canvas::Canvas;
use super::color::{mean, smoothstep, Palette, Rgb};
use super::particles::ParticlePool;
use super::shapes::{self, bar_angle, polar};
use super::strategy::{FrameClock, RenderStrategy, Style};

pub struct ModeInfo {
    pub id: u32,
    pub name: &'static str,
    pub description: &'static str,
    build: fn(&Style) -> Box<dyn RenderStrategy>,
}

trait Mode: RenderStrategy + 'static {
    fn from_style(style: &Style) -> Self
    where
        Self: Sized;
}

fn build<M: Mode>(style: &Style) -> Box<dyn RenderStrategy> {
    Box::new(M::from_style(style))
}

pub const MODES: &[ModeInfo] = &[
    ModeInfo {
        id: 0,
        name: "bars",
        description: "Vertical bars rising from the bottom edge",
        build: build::<Bars>,
    },
    ModeInfo {
        id: 1,
        name: "mirror_bars",
        description: "Bars mirrored around the horizontal centre line",
        build: build::<MirrorBars>,
    },
    ModeInfo {
        id: 2,
        name: "radial_bars",
        description: "Bars radiating from a slowly rotating inner circle",
        build: build::<RadialBars>,
    },
    ModeInfo {
        id: 3,
        name: "polar_ring",
        description: "Closed ring whose radius follows the spectrum",
        build: build::<PolarRing>,
    },
    ModeInfo {
        id: 4,
        name: "spectrum_line",
        description: "Single spectrum curve across the frame",
        build: build::<SpectrumLine>,
    },
    ModeInfo {
        id: 5,
        name: "particle_burst",
        description: "Particles emitted from the centre on low-frequency energy",
        build: build::<ParticleBurst>,
    },
    ModeInfo {
        id: 6,
        name: "rainbow_bars",
        description: "Bars coloured by a hue sweep that drifts over time",
        build: build::<RainbowBars>,
    },
    ModeInfo {
        id: 7,
        name: "pulse_disc",
        description: "Glowing disc that breathes with overall loudness",
        build: build::<PulseDisc>,
    },
];

pub fn find(id: u32) -> Option<&'static ModeInfo> {
    MODES.iter().find(|m| m.id == id)
}

pub fn create(id: u32, style: &Style) -> Option<Box<dyn RenderStrategy>> {
    find(id).map(|info| (info.build)(style))
}

/// Position of bar `i` of `n` along the palette axis.
fn position(i: usize, n: usize) -> f32 {
    if n <= 1 {
        0.0
    } else {
        i as f32 / (n - 1) as f32
    }
}

/// Mean of the lowest quarter of the bars (at least one).
fn low_energy(magnitudes: &[f32]) -> f32 {
    let count = (magnitudes.len() / 4).max(1).min(magnitudes.len());
    mean(&magnitudes[..count])
}

/// Horizontal start of a centred row of `n` slots.
fn row_origin(canvas: &Canvas, slot: i32, width: i32, n: usize) -> i32 {
    let total = slot * n as i32;
    (canvas.width() as i32 - total) / 2 + (slot - width) / 2
}

struct Bars {
    style: Style,
    palette: Palette,
}

impl Mode for Bars {
    fn from_style(style: &Style) -> Self {
        Self {
            style: style.clone(),
            palette: style.palette(),
        }
    }
}

impl RenderStrategy for Bars {
    fn name(&self) -> &str {
        "bars"
    }

    fn render(&mut self, canvas: &mut Canvas, magnitudes: &[f32], _clock: &FrameClock) {
        let n = magnitudes.len();
        if n == 0 {
            return;
        }
        let (width, slot) = self.style.bar_metrics(canvas.width(), n);
        let x0 = row_origin(canvas, slot, width, n);
        let max_height = canvas.height() as f32 * 0.9;
        let base = canvas.height() as i32;

        for (i, &m) in magnitudes.iter().enumerate() {
            let height = (m * max_height) as i32;
            shapes::vertical_bar(canvas, x0 + i as i32 * slot, width, base, height, &self.palette, position(i, n));
        }
    }
}

struct MirrorBars {
    style: Style,
    palette: Palette,
}

impl Mode for MirrorBars {
    fn from_style(style: &Style) -> Self {
        Self {
            style: style.clone(),
            palette: style.palette(),
        }
    }
}

impl RenderStrategy for MirrorBars {
    fn name(&self) -> &str {
        "mirror_bars"
    }

    fn render(&mut self, canvas: &mut Canvas, magnitudes: &[f32], _clock: &FrameClock) {
        let n = magnitudes.len();
        if n == 0 {
            return;
        }
        let (width, slot) = self.style.bar_metrics(canvas.width(), n);
        let x0 = row_origin(canvas, slot, width, n);
        let cy = canvas.height() as i32 / 2;
        let max_half = canvas.height() as f32 * 0.45;

        for (i, &m) in magnitudes.iter().enumerate() {
            let half = (m * max_half) as i32;
            if half == 0 {
                continue;
            }
            let color = self.palette.shaded(position(i, n), m);
            shapes::fill_rect(canvas, x0 + i as i32 * slot, cy - half, width, half * 2, color);
        }
    }
}

struct RadialBars {
    style: Style,
    palette: Palette,
}

impl Mode for RadialBars {
    fn from_style(style: &Style) -> Self {
        Self {
            style: style.clone(),
            palette: style.palette(),
        }
    }
}

impl RenderStrategy for RadialBars {
    fn name(&self) -> &str {
        "radial_bars"
    }

    fn render(&mut self, canvas: &mut Canvas, magnitudes: &[f32], clock: &FrameClock) {
        let n = magnitudes.len();
        if n == 0 {
            return;
        }
        let center = canvas.center();
        let short = canvas.shorter_side();
        let inner = self.style.inner_radius.clamp(0.0, 0.45) * short;
        let outer = short * 0.48;
        let rotation = clock.time() * 0.2;
        let thickness = if self.style.bar_width > 0 {
            self.style.bar_width as f32
        } else {
            (TAU * inner / n as f32 * 0.6).max(1.0)
        };

        for (i, &m) in magnitudes.iter().enumerate() {
            let angle = bar_angle(i, n, rotation);
            let from = polar(center, inner, angle);
            let to = polar(center, inner + m * (outer - inner), angle);
            shapes::line(canvas, from, to, thickness, self.palette.shaded(position(i, n), m));
        }
    }
}

struct PolarRing {
    style: Style,
    palette: Palette,
}

impl Mode for PolarRing {
    fn from_style(style: &Style) -> Self {
        Self {
            style: style.clone(),
            palette: style.palette(),
        }
    }
}

impl RenderStrategy for PolarRing {
    fn name(&self) -> &str {
        "polar_ring"
    }

    fn render(&mut self, canvas: &mut Canvas, magnitudes: &[f32], _clock: &FrameClock) {
        let n = magnitudes.len();
        if n < 2 {
            return;
        }
        let center = canvas.center();
        let short = canvas.shorter_side();
        let inner = self.style.inner_radius.clamp(0.0, 0.45) * short;
        let outer = short * 0.48;

        let points: Vec<(f32, f32)> = magnitudes
            .iter()
            .enumerate()
            .map(|(i, &m)| polar(center, inner + m * (outer - inner), bar_angle(i, n, 0.0)))
            .collect();
        let level = mean(magnitudes);
        let thickness = (short * 0.006).max(1.0);
        shapes::polygon_outline(canvas, &points, thickness, self.palette.shaded(level, level));
    }
}

struct SpectrumLine {
    palette: Palette,
}

impl Mode for SpectrumLine {
    fn from_style(style: &Style) -> Self {
        Self {
            palette: style.palette(),
        }
    }
}

impl RenderStrategy for SpectrumLine {
    fn name(&self) -> &str {
        "spectrum_line"
    }

    fn render(&mut self, canvas: &mut Canvas, magnitudes: &[f32], _clock: &FrameClock) {
        let n = magnitudes.len();
        if n < 2 {
            return;
        }
        let w = canvas.width() as f32;
        let h = canvas.height() as f32;
        let baseline = h * 0.75;
        let thickness = (h * 0.005).max(1.0);

        let points: Vec<(f32, f32)> = magnitudes
            .iter()
            .enumerate()
            .map(|(i, &m)| (position(i, n) * (w - 1.0), baseline - m * h * 0.6))
            .collect();
        for (i, pair) in points.windows(2).enumerate() {
            shapes::line(canvas, pair[0], pair[1], thickness, self.palette.at(position(i, n)));
        }
    }
}

const PARTICLE_CAPACITY: usize = 512;
const PARTICLE_SEED: u64 = 0x5eed_0005;

struct ParticleBurst {
    style: Style,
    palette: Palette,
    pool: ParticlePool,
}

impl Mode for ParticleBurst {
    fn from_style(style: &Style) -> Self {
        Self {
            style: style.clone(),
            palette: style.palette(),
            pool: ParticlePool::new(PARTICLE_CAPACITY, PARTICLE_SEED),
        }
    }
}

impl RenderStrategy for ParticleBurst {
    fn name(&self) -> &str {
        "particle_burst"
    }

    fn render(&mut self, canvas: &mut Canvas, magnitudes: &[f32], clock: &FrameClock) {
        let center = canvas.center();
        let short = canvas.shorter_side();
        let energy = if magnitudes.is_empty() { 0.0 } else { low_energy(magnitudes) };

        self.pool.step(0.96, short * 0.0004);

        let emit = (smoothstep(0.15, 0.9, energy) * 14.0).round() as usize;
        if emit > 0 {
            let speed = short * (0.004 + 0.012 * energy);
            let life = clock.fps.max(1);
            let size = (short * 0.006).max(1.0);
            let color = self.palette.at(energy);
            self.pool.burst(center, emit, speed, life, size, color);
        }

        let core = self.style.inner_radius.clamp(0.0, 0.45) * short * (0.4 + 0.6 * energy);
        shapes::glow_disc(canvas, center.0, center.1, core * 0.6, core * 0.4, self.palette.shaded(0.0, energy));

        for p in self.pool.iter() {
            let vitality = p.vitality();
            shapes::fill_disc(canvas, p.x, p.y, p.size * (0.5 + vitality), p.color.scale(vitality));
        }
    }
}

struct RainbowBars {
    style: Style,
}

impl Mode for RainbowBars {
    fn from_style(style: &Style) -> Self {
        Self { style: style.clone() }
    }
}

impl RenderStrategy for RainbowBars {
    fn name(&self) -> &str {
        "rainbow_bars"
    }

    fn render(&mut self, canvas: &mut Canvas, magnitudes: &[f32], clock: &FrameClock) {
        let n = magnitudes.len();
        if n == 0 {
            return;
        }
        let (width, slot) = self.style.bar_metrics(canvas.width(), n);
        let x0 = row_origin(canvas, slot, width, n);
        let max_height = canvas.height() as f32 * 0.9;
        let base = canvas.height() as i32;
        let drift = clock.time() * 0.1;

        for (i, &m) in magnitudes.iter().enumerate() {
            let height = (m * max_height) as i32;
            let hue = i as f32 / n as f32 + drift;
            let palette = Palette::Solid(Rgb::from_hsv(hue, 0.85, 0.4 + 0.6 * m));
            shapes::vertical_bar(canvas, x0 + i as i32 * slot, width, base, height, &palette, 0.0);
        }
    }
}

struct PulseDisc {
    style: Style,
    palette: Palette,
}

impl Mode for PulseDisc {
    fn from_style(style: &Style) -> Self {
        Self {
            style: style.clone(),
            palette: style.palette(),
        }
    }
}

impl RenderStrategy for PulseDisc {
    fn name(&self) -> &str {
        "pulse_disc"
    }

    fn render(&mut self, canvas: &mut Canvas, magnitudes: &[f32], clock: &FrameClock) {
        let center = canvas.center();
        let short = canvas.shorter_side();
        let level = mean(magnitudes);
        let base = self.style.inner_radius.clamp(0.05, 0.45) * short;
        let radius = base * (0.7 + 0.6 * level);
        shapes::glow_disc(canvas, center.0, center.1, radius, short * 0.05, self.palette.shaded(level, level));

        // Satellite dots, one per bar, orbiting just outside the disc.
        let n = magnitudes.len();
        let orbit = radius + short * 0.08;
        let spin = clock.time() * 0.5;
        for (i, &m) in magnitudes.iter().enumerate() {
            let (x, y) = polar(center, orbit + m * short * 0.1, bar_angle(i, n, spin));
            shapes::fill_disc(canvas, x, y, (short * 0.004).max(1.0) * (1.0 + m * 2.0), self.palette.at(position(i, n)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::canvas::CHANNELS;

    fn lit(canvas: &Canvas) -> usize {
        canvas
            .as_bytes()
            .chunks(CHANNELS)
            .filter(|p| p.iter().any(|&b| b > 0))
            .count()
    }

    #[test]
    fn ids_are_unique_and_names_match() {
        let style = Style::default();
        for (i, info) in MODES.iter().enumerate() {
            assert!(MODES[i + 1..].iter().all(|other| other.id != info.id));
            let strategy = create(info.id, &style).unwrap();
            assert_eq!(strategy.name(), info.name);
        }
    }

    #[test]
    fn unknown_id_is_none() {
        assert!(create(9999, &Style::default()).is_none());
        assert!(find(9999).is_none());
    }

    #[test]
    fn every_mode_tolerates_short_vectors() {
        let style = Style::default();
        for info in MODES {
            let mut strategy = create(info.id, &style).unwrap();
            let mut canvas = Canvas::new(64, 48);
            let mut clock = FrameClock::new(30);
            for mags in [&[][..], &[0.5][..], &[1.0, 0.0][..]] {
                strategy.render(&mut canvas, mags, &clock);
                clock.advance();
                assert_eq!((canvas.width(), canvas.height()), (64, 48));
                assert_eq!(canvas.as_bytes().len(), 64 * 48 * 3);
            }
        }
    }

    #[test]
    fn every_mode_draws_on_loud_input() {
        let style = Style::default();
        let loud = vec![0.9f32; 32];
        for info in MODES {
            let mut strategy = create(info.id, &style).unwrap();
            let mut canvas = Canvas::new(160, 90);
            let mut clock = FrameClock::new(30);
            for _ in 0..3 {
                canvas.clear();
                strategy.render(&mut canvas, &loud, &clock);
                clock.advance();
            }
            assert!(lit(&canvas) > 0, "mode {} drew nothing", info.name);
        }
    }

    #[test]
    fn bars_height_tracks_magnitude() {
        let mut bars = Bars::from_style(&Style::default());
        let mut canvas = Canvas::new(100, 100);
        let clock = FrameClock::new(30);
        bars.render(&mut canvas, &[0.0, 1.0], &clock);
        // Second bar spans x in [56, 93) and reaches 90% of the height.
        assert_ne!(canvas.get(60, 99), Some(Rgb::BLACK));
        assert_ne!(canvas.get(60, 11), Some(Rgb::BLACK));
        assert_eq!(canvas.get(60, 5), Some(Rgb::BLACK));
        assert_eq!(canvas.get(10, 99), Some(Rgb::BLACK));
    }

    #[test]
    fn particle_burst_is_deterministic() {
        let frames: Vec<Vec<f32>> = (0..20).map(|i| vec![(i % 5) as f32 / 4.0; 16]).collect();
        let run = || {
            let mut strategy = create(5, &Style::default()).unwrap();
            let mut canvas = Canvas::new(80, 80);
            let mut clock = FrameClock::new(30);
            let mut out = Vec::new();
            for mags in &frames {
                canvas.clear();
                strategy.render(&mut canvas, mags, &clock);
                clock.advance();
                out.extend_from_slice(canvas.as_bytes());
            }
            out
        };
        assert_eq!(run(), run());
    }
}
