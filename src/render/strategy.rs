use super::canvas::Canvas;
use super::color::{Palette, Rgb};

/// Monotonic frame counter handed to strategies for animation phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameClock {
    pub index: u64,
    pub fps: u32,
}

impl FrameClock {
    pub fn new(fps: u32) -> Self {
        Self { index: 0, fps }
    }

    pub fn time(&self) -> f32 {
        self.index as f32 / self.fps.max(1) as f32
    }

    pub fn advance(&mut self) {
        self.index += 1;
    }
}

/// Layout and colour options shared by all modes.
#[derive(Clone, Debug, PartialEq)]
pub struct Style {
    pub color: Rgb,
    pub gradient: Option<(Rgb, Rgb)>,
    /// Radius of the empty centre for radial modes, as a fraction of the
    /// shorter canvas side.
    pub inner_radius: f32,
    /// Bar width in pixels; 0 derives it from the canvas width.
    pub bar_width: u32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: Rgb::new(0, 200, 255),
            gradient: None,
            inner_radius: 0.18,
            bar_width: 0,
        }
    }
}

impl Style {
    pub fn palette(&self) -> Palette {
        match self.gradient {
            Some((start, end)) => Palette::Gradient { start, end },
            None => Palette::Solid(self.color),
        }
    }

    /// Bar width and gap for `count` bars spread across `span` pixels.
    pub fn bar_metrics(&self, span: u32, count: usize) -> (i32, i32) {
        let count = count.max(1) as u32;
        let slot = (span / count).max(1);
        let width = if self.bar_width > 0 {
            self.bar_width.min(slot)
        } else {
            (slot * 3 / 4).max(1)
        };
        (width as i32, slot as i32)
    }
}

/// A visual mode. Called once per output frame, in order.
///
/// Implementations may keep bounded state across calls, must not block, and
/// must accept magnitude slices of any length (including empty).
pub trait RenderStrategy {
    fn name(&self) -> &str;

    fn render(&mut self, canvas: &mut Canvas, magnitudes: &[f32], clock: &FrameClock);
}
