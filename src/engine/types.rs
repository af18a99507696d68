use serde::{Deserialize, Serialize};

/// 8-bit RGBA color (unpremultiplied).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub fn from_array(c: [u8; 4]) -> Self {
        Self { r: c[0], g: c[1], b: c[2], a: c[3] }
    }
}

/// Integer canvas coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Integer rectangle in pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntRect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl IntRect {
    #[inline]
    pub fn empty() -> Self {
        Self { x: 0, y: 0, w: 0, h: 0 }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

/// Fixed-size RGBA8 pixel buffer, rows top to bottom, 4 interleaved bytes per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Canvas {
    /// Allocate a canvas cleared to transparent black.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0; width * height * 4] }
    }

    /// Wrap an already decoded RGBA8 buffer. Returns `None` if the length
    /// doesn't match `width * height * 4`.
    pub fn from_rgba(width: usize, height: usize, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != width.checked_mul(height)?.checked_mul(4)? {
            return None;
        }
        Some(Self { width, height, pixels })
    }

    #[inline]
    pub fn width(&self) -> usize { self.width }
    #[inline]
    pub fn height(&self) -> usize { self.height }
    #[inline]
    pub fn pixels(&self) -> &[u8] { &self.pixels }
    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u8] { &mut self.pixels }

    pub fn into_pixels(self) -> Vec<u8> { self.pixels }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn bounds(&self) -> IntRect {
        IntRect { x: 0, y: 0, w: self.width, h: self.height }
    }

    /// Byte offset of pixel (x, y). Caller guarantees in-bounds coordinates.
    #[inline]
    pub fn pixel_offset(&self, x: usize, y: usize) -> usize {
        (y * self.width + x) * 4
    }

    pub fn pixel(&self, x: usize, y: usize) -> Color {
        let i = self.pixel_offset(x, y);
        Color::new(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3])
    }
}
