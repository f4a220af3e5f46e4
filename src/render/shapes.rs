//! Rasterizers shared by the built-in modes. All coordinates are in pixels
//! with the origin at the top-left; anything outside the canvas is clipped.

use std::f32::consts::TAU;

use super::canvas::Canvas;
use super::color::{Palette, Rgb};

pub fn fill_rect(canvas: &mut Canvas, x: i32, y: i32, w: i32, h: i32, color: Rgb) {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + w).min(canvas.width() as i32);
    let y1 = (y + h).min(canvas.height() as i32);
    for py in y0..y1 {
        for px in x0..x1 {
            canvas.set(px, py, color);
        }
    }
}

/// Vertical bar growing upward from `base_y`, shaded along its height.
pub fn vertical_bar(canvas: &mut Canvas, x: i32, width: i32, base_y: i32, height: i32, palette: &Palette, t: f32) {
    if height <= 0 || width <= 0 {
        return;
    }
    for dy in 0..height {
        let level = dy as f32 / height.max(1) as f32;
        let color = palette.shaded(t, 1.0 - level * 0.5);
        fill_rect(canvas, x, base_y - dy - 1, width, 1, color);
    }
}

/// Thick line segment via stepped discs.
pub fn line(canvas: &mut Canvas, from: (f32, f32), to: (f32, f32), thickness: f32, color: Rgb) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let length = (dx * dx + dy * dy).sqrt();
    let steps = length.ceil().max(1.0) as usize;
    let radius = (thickness / 2.0).max(0.5);
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        fill_disc(canvas, from.0 + dx * t, from.1 + dy * t, radius, color);
    }
}

pub fn fill_disc(canvas: &mut Canvas, cx: f32, cy: f32, radius: f32, color: Rgb) {
    if radius <= 0.0 {
        return;
    }
    let r2 = radius * radius;
    let x0 = (cx - radius).floor() as i32;
    let x1 = (cx + radius).ceil() as i32;
    let y0 = (cy - radius).floor() as i32;
    let y1 = (cy + radius).ceil() as i32;
    for py in y0..=y1 {
        for px in x0..=x1 {
            let ddx = px as f32 + 0.5 - cx;
            let ddy = py as f32 + 0.5 - cy;
            if ddx * ddx + ddy * ddy <= r2 {
                canvas.set(px, py, color);
            }
        }
    }
}

/// Soft-edged disc: full colour inside `radius`, fading out over `falloff` pixels.
pub fn glow_disc(canvas: &mut Canvas, cx: f32, cy: f32, radius: f32, falloff: f32, color: Rgb) {
    let outer = radius + falloff.max(0.0);
    let x0 = (cx - outer).floor() as i32;
    let x1 = (cx + outer).ceil() as i32;
    let y0 = (cy - outer).floor() as i32;
    let y1 = (cy + outer).ceil() as i32;
    for py in y0..=y1 {
        for px in x0..=x1 {
            let d = ((px as f32 + 0.5 - cx).powi(2) + (py as f32 + 0.5 - cy).powi(2)).sqrt();
            if d <= radius {
                canvas.set(px, py, color);
            } else if d <= outer && falloff > 0.0 {
                canvas.blend(px, py, color, 1.0 - (d - radius) / falloff);
            }
        }
    }
}

/// Point on a circle; angle 0 points up and grows clockwise.
pub fn polar(center: (f32, f32), radius: f32, angle: f32) -> (f32, f32) {
    (center.0 + radius * angle.sin(), center.1 - radius * angle.cos())
}

/// Angle of bar `index` out of `count` spread evenly around the circle.
pub fn bar_angle(index: usize, count: usize, rotation: f32) -> f32 {
    if count == 0 {
        return rotation;
    }
    index as f32 / count as f32 * TAU + rotation
}

/// Closed polyline through `points`.
pub fn polygon_outline(canvas: &mut Canvas, points: &[(f32, f32)], thickness: f32, color: Rgb) {
    if points.len() < 2 {
        return;
    }
    for pair in points.windows(2) {
        line(canvas, pair[0], pair[1], thickness, color);
    }
    if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
        line(canvas, last, first, thickness, color);
    }
}
