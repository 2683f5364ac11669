//! Tool state: active tool, stroke color and brush size.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest brush width in pixels.
pub const MIN_BRUSH_SIZE: u32 = 1;
/// Largest brush width in pixels.
pub const MAX_BRUSH_SIZE: u32 = 50;
/// Brush width a fresh session starts with.
pub const DEFAULT_BRUSH_SIZE: u32 = 5;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Paints with the current color (source-over).
    #[default]
    Pen,
    /// Cuts pixels out of the surface (destination-out).
    Eraser,
}

impl ToolKind {
    /// Name used by the toolbar's `data-tool` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            ToolKind::Pen => "pen",
            ToolKind::Eraser => "eraser",
        }
    }
}

impl FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pen" => Ok(ToolKind::Pen),
            "eraser" => Ok(ToolKind::Eraser),
            other => Err(format!("unknown tool: {other}")),
        }
    }
}

/// An 8-bit straight-alpha RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);
    pub const WHITE: Rgba = Rgba::opaque(255, 255, 255);
    pub const TRANSPARENT: Rgba = Rgba { r: 0, g: 0, b: 0, a: 0 };

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse a `#rrggbb` string as produced by an HTML color input.
    pub fn from_hex(s: &str) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidColor(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::opaque(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Lowercase `#rrggbb` form (alpha is dropped).
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// The tool settings read by every draw call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    pub tool: ToolKind,
    pub color: Rgba,
    brush_size: u32,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tool: ToolKind::default(),
            color: Rgba::BLACK,
            brush_size: DEFAULT_BRUSH_SIZE,
        }
    }
}

impl ToolSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn brush_size(&self) -> u32 {
        self.brush_size
    }

    /// Set the brush width, clamped to the slider range.
    pub fn set_brush_size(&mut self, size: u32) {
        self.brush_size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
    }

    /// Set the color from a `#rrggbb` string. The old color is kept on error.
    pub fn set_color_hex(&mut self, hex: &str) -> CoreResult<()> {
        self.color = Rgba::from_hex(hex)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(Rgba::from_hex("#8B4513").unwrap(), Rgba::opaque(0x8b, 0x45, 0x13));
        assert_eq!(Rgba::from_hex("#ffffff").unwrap(), Rgba::WHITE);
    }

    #[test]
    fn test_parse_hex_color_rejects_garbage() {
        assert!(Rgba::from_hex("000000").is_err());
        assert!(Rgba::from_hex("#fff").is_err());
        assert!(Rgba::from_hex("#gg0000").is_err());
        assert!(Rgba::from_hex("#ééé").is_err());
    }

    #[test]
    fn test_hex_display() {
        assert_eq!(Rgba::opaque(255, 0, 16).to_string(), "#ff0010");
    }

    #[test]
    fn test_brush_size_clamped() {
        let mut settings = ToolSettings::new();
        assert_eq!(settings.brush_size(), DEFAULT_BRUSH_SIZE);

        settings.set_brush_size(0);
        assert_eq!(settings.brush_size(), MIN_BRUSH_SIZE);

        settings.set_brush_size(500);
        assert_eq!(settings.brush_size(), MAX_BRUSH_SIZE);
    }

    #[test]
    fn test_bad_color_keeps_previous() {
        let mut settings = ToolSettings::new();
        settings.set_color_hex("#ff0000").unwrap();
        assert!(settings.set_color_hex("red").is_err());
        assert_eq!(settings.color, Rgba::opaque(255, 0, 0));
    }

    #[test]
    fn test_tool_names() {
        assert_eq!("eraser".parse::<ToolKind>(), Ok(ToolKind::Eraser));
        assert_eq!(ToolKind::Pen.as_str(), "pen");
        assert!("brush".parse::<ToolKind>().is_err());
    }
}
