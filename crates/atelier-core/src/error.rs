//! Error types for the drawing engine.

use thiserror::Error;

/// Errors raised by the raster, history and export layers.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
    #[error("PNG decoding failed: {0}")]
    Decode(#[from] png::DecodingError),
    #[error("Unsupported snapshot format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid color: {0:?} (expected #rrggbb)")]
    InvalidColor(String),
    #[error("Invalid surface size: {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
