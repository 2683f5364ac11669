//! Raster surface: the flat RGBA pixel buffer everything draws into.
//!
//! Pixels are stored as straight (non-premultiplied) RGBA8, row-major,
//! which is also PNG's native layout. That keeps snapshot round trips
//! lossless.

use crate::error::{CoreError, CoreResult};
use crate::tools::{Rgba, ToolKind};
use kurbo::{Point, Rect};

/// Default surface width (the canvas never grows beyond this on load).
pub const DEFAULT_WIDTH: u32 = 800;
/// Default surface height.
pub const DEFAULT_HEIGHT: u32 = 600;

/// A decoded RGBA8 image, detached from any surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    /// Straight-alpha RGBA8, row-major, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

impl RasterImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> CoreResult<Self> {
        if width == 0 || height == 0 || pixels.len() != buffer_len(width, height) {
            return Err(CoreError::InvalidSize { width, height });
        }
        Ok(Self { width, height, pixels })
    }
}

/// The drawing surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    background: Rgba,
}

impl RasterSurface {
    /// Create a surface filled with the white background.
    pub fn new(width: u32, height: u32) -> CoreResult<Self> {
        Self::with_background(width, height, Rgba::WHITE)
    }

    pub fn with_background(width: u32, height: u32, background: Rgba) -> CoreResult<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidSize { width, height });
        }
        let mut surface = Self {
            width,
            height,
            pixels: vec![0; buffer_len(width, height)],
            background,
        };
        surface.clear();
        Ok(surface)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn background(&self) -> Rgba {
        self.background
    }

    /// Raw straight-alpha RGBA8 bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Read one pixel; `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        let p = &self.pixels[i..i + 4];
        Some(Rgba { r: p[0], g: p[1], b: p[2], a: p[3] })
    }

    /// Copy of the current pixels as a detached image.
    pub fn to_image(&self) -> RasterImage {
        RasterImage {
            width: self.width,
            height: self.height,
            pixels: self.pixels.clone(),
        }
    }

    /// Reset every pixel to the background.
    pub fn clear(&mut self) {
        self.fill(self.background);
    }

    /// Paint every pixel with `color`, replacing what was there.
    pub fn fill(&mut self, color: Rgba) {
        let rgba = color.to_array();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Stroke one segment with round caps.
    ///
    /// Consecutive segments of a path share endpoints, so the round caps
    /// also form round joins. `Pen` composites source-over; `Eraser`
    /// removes alpha in proportion to brush coverage.
    pub fn draw_segment(&mut self, from: Point, to: Point, tool: ToolKind, color: Rgba, width: f64) {
        let radius = (width / 2.0).max(0.5);
        let reach = radius + 1.0;
        let bounds = Rect::from_points(from, to).inflate(reach, reach);
        let Some((x0, y0, x1, y1)) = self.clip(bounds) else {
            return;
        };

        for y in y0..y1 {
            for x in x0..x1 {
                let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                let coverage = (radius + 0.5 - distance_to_segment(center, from, to)).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                let i = self.offset(x, y);
                let dst = &mut self.pixels[i..i + 4];
                match tool {
                    ToolKind::Pen => blend_source_over(dst, color, coverage),
                    ToolKind::Eraser => blend_destination_out(dst, coverage),
                }
            }
        }
    }

    /// Change the buffer size, keeping prior content anchored at the origin.
    ///
    /// Content is clipped when shrinking and padded with the background
    /// when growing. It is never scaled.
    pub fn resize(&mut self, width: u32, height: u32) -> CoreResult<()> {
        if width == self.width && height == self.height {
            return Ok(());
        }
        let old = self.to_image();
        let mut resized = Self::with_background(width, height, self.background)?;
        resized.blit(&old);
        *self = resized;
        Ok(())
    }

    /// Show a previously captured image.
    ///
    /// The surface is cleared to transparent and the image copied at the
    /// origin, so an image of the same size reproduces it exactly.
    pub fn restore(&mut self, image: &RasterImage) {
        self.fill(Rgba::TRANSPARENT);
        self.blit(image);
    }

    /// Copy `image` at the origin, clipping to the surface.
    fn blit(&mut self, image: &RasterImage) {
        let cols = self.width.min(image.width) as usize * 4;
        let rows = self.height.min(image.height);
        for y in 0..rows {
            let src = (y * image.width) as usize * 4;
            let dst = (y * self.width) as usize * 4;
            self.pixels[dst..dst + cols].copy_from_slice(&image.pixels[src..src + cols]);
        }
    }

    fn clip(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        let x0 = rect.x0.floor().max(0.0);
        let y0 = rect.y0.floor().max(0.0);
        let x1 = rect.x1.ceil().min(self.width as f64);
        let y1 = rect.y1.ceil().min(self.height as f64);
        (x0 < x1 && y0 < y1).then(|| (x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }
}

fn buffer_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.hypot2();
    let t = if len_sq > 0.0 {
        ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    p.distance(a + ab * t)
}

fn blend_source_over(dst: &mut [u8], color: Rgba, coverage: f64) {
    let sa = color.a as f64 / 255.0 * coverage;
    let da = dst[3] as f64 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return;
    }
    let src = [color.r, color.g, color.b];
    for c in 0..3 {
        let value = (src[c] as f64 * sa + dst[c] as f64 * da * (1.0 - sa)) / out_a;
        dst[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

fn blend_destination_out(dst: &mut [u8], coverage: f64) {
    dst[3] = (dst[3] as f64 * (1.0 - coverage)).round() as u8;
}
