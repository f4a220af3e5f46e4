use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// 8-bit sRGB colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "[u8; 3]")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear interpolation towards `other`; `t` is clamped to [0, 1].
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| lerp(a as f32, b as f32, t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    /// Multiply brightness by `factor` (clamped to [0, 1]).
    pub fn scale(self, factor: f32) -> Rgb {
        Rgb::BLACK.lerp(self, factor)
    }

    /// `h` in turns (wraps), `s` and `v` in [0, 1].
    pub fn from_hsv(h: f32, s: f32, v: f32) -> Rgb {
        let h = h.rem_euclid(1.0) * 6.0;
        let s = s.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0);

        let sector = h.floor();
        let f = h - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));

        let (r, g, b) = match sector as u32 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        Rgb::new(to_byte(r), to_byte(g), to_byte(b))
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Rgb::new(r, g, b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Accepts `#rrggbb`, `rrggbb` or `r,g,b`.
impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains(',') {
            let parts: Vec<u8> = s
                .split(',')
                .map(|p| p.trim().parse::<u8>())
                .collect::<Result<_, _>>()
                .map_err(|e| format!("invalid colour component in '{s}': {e}"))?;
            return match parts.as_slice() {
                [r, g, b] => Ok(Rgb::new(*r, *g, *b)),
                _ => Err(format!("expected three components in '{s}'")),
            };
        }

        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("expected #rrggbb or r,g,b, got '{s}'"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("invalid hex colour '{s}': {e}"))
        };
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Colour source shared by every mode: solid fill or a two-stop gradient.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Palette {
    Solid(Rgb),
    Gradient { start: Rgb, end: Rgb },
}

impl Palette {
    /// Colour at position `t` in [0, 1] along the gradient axis.
    pub fn at(&self, t: f32) -> Rgb {
        match *self {
            Palette::Solid(c) => c,
            Palette::Gradient { start, end } => start.lerp(end, t),
        }
    }

    /// Colour at `t`, dimmed towards black as `level` drops.
    pub fn shaded(&self, t: f32, level: f32) -> Rgb {
        self.at(t).scale(0.35 + 0.65 * level.clamp(0.0, 1.0))
    }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Mean of a magnitude slice; 0 for an empty slice.
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

fn to_byte(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_triplets() {
        assert_eq!("#ff8000".parse::<Rgb>().unwrap(), Rgb::new(255, 128, 0));
        assert_eq!("00ff00".parse::<Rgb>().unwrap(), Rgb::new(0, 255, 0));
        assert_eq!(" 1, 2 ,3 ".parse::<Rgb>().unwrap(), Rgb::new(1, 2, 3));
        assert!("1,2".parse::<Rgb>().is_err());
        assert!("300,0,0".parse::<Rgb>().is_err());
        assert!("#ggg000".parse::<Rgb>().is_err());
    }

    #[test]
    fn display_is_lowercase_hex() {
        let c = Rgb::new(18, 52, 86);
        assert_eq!(c.to_string(), "#123456");
    }

    #[test]
    fn hsv_primaries() {
        assert_eq!(Rgb::from_hsv(0.0, 1.0, 1.0), Rgb::new(255, 0, 0));
        assert_eq!(Rgb::from_hsv(1.0 / 3.0, 1.0, 1.0), Rgb::new(0, 255, 0));
        assert_eq!(Rgb::from_hsv(2.0 / 3.0, 1.0, 1.0), Rgb::new(0, 0, 255));
        assert_eq!(Rgb::from_hsv(1.0, 1.0, 1.0), Rgb::new(255, 0, 0));
        assert_eq!(Rgb::from_hsv(0.3, 0.0, 0.5), Rgb::new(128, 128, 128));
    }

    #[test]
    fn gradient_endpoints() {
        let p = Palette::Gradient {
            start: Rgb::new(0, 0, 0),
            end: Rgb::new(200, 100, 50),
        };
        assert_eq!(p.at(0.0), Rgb::new(0, 0, 0));
        assert_eq!(p.at(1.0), Rgb::new(200, 100, 50));
        assert_eq!(p.at(2.0), Rgb::new(200, 100, 50));
        assert_eq!(Palette::Solid(Rgb::WHITE).at(0.4), Rgb::WHITE);
    }

    #[test]
    fn smoothstep_edges() {
        assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
        assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
        assert_eq!(smoothstep(1.0, 1.0, 0.5), 0.0);
    }
}
