//! PNG export, data URLs and scaled previews.

use crate::error::{CoreError, CoreResult};
use crate::surface::{RasterImage, RasterSurface};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use image::imageops::{self, FilterType};

/// Prefix of a PNG data URL as produced by `canvas.toDataURL()`.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Frame size of the analysis preview.
pub const PREVIEW_MAX_WIDTH: u32 = 400;
pub const PREVIEW_MAX_HEIGHT: u32 = 300;

/// Encode straight-alpha RGBA8 pixels as PNG.
pub fn encode_png(width: u32, height: u32, pixels: &[u8]) -> CoreResult<Vec<u8>> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(pixels)?;
        writer.finish()?;
    }
    Ok(png_data)
}

/// Decode an 8-bit RGBA PNG.
pub fn decode_png(bytes: &[u8]) -> CoreResult<RasterImage> {
    let decoder = png::Decoder::new(bytes);
    let mut reader = decoder.read_info()?;
    let mut pixels = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut pixels)?;
    if info.color_type != png::ColorType::Rgba || info.bit_depth != png::BitDepth::Eight {
        return Err(CoreError::UnsupportedFormat(format!(
            "{:?} at {:?}",
            info.color_type, info.bit_depth
        )));
    }
    pixels.truncate(info.buffer_size());
    RasterImage::new(info.width, info.height, pixels)
}

/// Lossless PNG of the whole surface.
pub fn export_png(surface: &RasterSurface) -> CoreResult<Vec<u8>> {
    encode_png(surface.width(), surface.height(), surface.pixels())
}

/// Wrap PNG bytes in a `data:` URL for JSON submission.
pub fn to_data_url(png_data: &[u8]) -> String {
    format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(png_data))
}

/// Strip the PNG data URL prefix, leaving the bare base64 payload.
///
/// Input without the prefix is returned unchanged.
pub fn strip_data_url_prefix(data_url: &str) -> &str {
    data_url.strip_prefix(PNG_DATA_URL_PREFIX).unwrap_or(data_url)
}

/// Download name: `artwork-2024-05-01T09-30-15.png`.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("artwork-{}.png", now.format("%Y-%m-%dT%H-%M-%S"))
}

/// Fit `width x height` into `max_width x max_height`, preserving aspect ratio.
///
/// Wider-than-frame images are bound by width, the rest by height.
/// Fractions are truncated, as assigning to a canvas size does.
pub fn preview_size(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (max_width.max(1), max_height.max(1));
    }
    let aspect = width as f64 / height as f64;
    let frame = max_width as f64 / max_height as f64;
    let (w, h) = if aspect > frame {
        (max_width as f64, max_width as f64 / aspect)
    } else {
        (max_height as f64 * aspect, max_height as f64)
    };
    ((w as u32).max(1), (h as u32).max(1))
}

/// Scaled copy of the surface that fits the given frame. The surface is not touched.
pub fn render_preview(surface: &RasterSurface, max_width: u32, max_height: u32) -> CoreResult<RasterImage> {
    let (width, height) = preview_size(surface.width(), surface.height(), max_width, max_height);
    let source = image::RgbaImage::from_raw(surface.width(), surface.height(), surface.pixels().to_vec())
        .ok_or(CoreError::InvalidSize {
            width: surface.width(),
            height: surface.height(),
        })?;
    let scaled = imageops::resize(&source, width, height, FilterType::Triangle);
    RasterImage::new(width, height, scaled.into_raw())
}
