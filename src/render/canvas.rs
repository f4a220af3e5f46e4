use super::color::Rgb;

/// Bytes per pixel. Frames are packed `rgb24`; transparency is keyed from
/// black at assembly time, so no alpha channel is carried.
pub const CHANNELS: usize = 3;

/// ffmpeg `-pixel_format` name matching the canvas byte layout.
pub const FFMPEG_PIX_FMT: &str = "rgb24";

/// Fixed-size CPU pixel buffer handed to render strategies.
///
/// Dimensions are private so a strategy can draw into the canvas but never
/// resize it.
#[derive(Clone, Debug)]
pub struct Canvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * CHANNELS;
        Self {
            width,
            height,
            data: vec![0u8; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    pub fn shorter_side(&self) -> f32 {
        self.width.min(self.height) as f32
    }

    /// Reset to black. Black is the colour keyed out for alpha output.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * CHANNELS)
    }

    pub fn get(&self, x: i32, y: i32) -> Option<Rgb> {
        let i = self.offset(x, y)?;
        Some(Rgb::new(self.data[i], self.data[i + 1], self.data[i + 2]))
    }

    /// Write one pixel; out-of-bounds writes are ignored.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, color: Rgb) {
        let Some(i) = self.offset(x, y) else {
            return;
        };
        self.data[i] = color.r;
        self.data[i + 1] = color.g;
        self.data[i + 2] = color.b;
    }

    /// Alpha-blend `color` over the existing pixel with coverage `alpha` in [0, 1].
    pub fn blend(&mut self, x: i32, y: i32, color: Rgb, alpha: f32) {
        let Some(existing) = self.get(x, y) else {
            return;
        };
        let a = alpha.clamp(0.0, 1.0);
        self.set(x, y, existing.lerp(color, a));
    }
}
