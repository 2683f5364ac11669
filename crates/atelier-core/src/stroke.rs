//! The in-progress stroke.

use crate::tools::{Rgba, ToolKind, ToolSettings};
use kurbo::Point;

/// One gesture between pointer-down and pointer-up.
///
/// Tool, color and width are copied at the start, so changing the tool
/// mid-stroke only affects the next stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeSession {
    pub tool: ToolKind,
    pub color: Rgba,
    pub width: f64,
    points: Vec<Point>,
}

impl StrokeSession {
    pub fn begin(start: Point, settings: &ToolSettings) -> Self {
        Self {
            tool: settings.tool,
            color: settings.color,
            width: settings.brush_size() as f64,
            points: vec![start],
        }
    }

    /// Append a point and return the segment it closes.
    pub fn extend(&mut self, point: Point) -> (Point, Point) {
        // `begin` always seeds one point.
        let last = self.points.last().copied().unwrap_or(point);
        self.points.push(point);
        (last, point)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
}
