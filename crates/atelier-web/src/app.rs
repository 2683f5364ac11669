//! Platform-independent application controller.
//!
//! Glues the input translator, the drawing session and the analysis gate
//! together. The browser layer only converts DOM events and pixels.

use atelier_core::analysis::{AnalysisError, AnalysisGate, InFlight};
use atelier_core::export::{export_file_name, to_data_url};
use atelier_core::input::{InputResponse, InputTranslator, PointerEvent, TouchEvent};
use atelier_core::surface::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use atelier_core::tools::ToolKind;
use atelier_core::{Confirm, CoreResult, DrawingSession, RasterImage};
use chrono::{DateTime, Utc};
use kurbo::Point;
use serde::Serialize;

/// Gap kept between the canvas and its container on each axis.
const CONTAINER_MARGIN: f64 = 40.0;

/// Largest diameter of the toolbar's brush preview dot.
pub const BRUSH_PREVIEW_MAX: u32 = 50;

/// User-triggerable actions (toolbar buttons and shortcuts).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Undo,
    Redo,
    Save,
    SelectPen,
    SelectEraser,
}

/// What the toolbar should display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarState {
    pub tool: ToolKind,
    pub color: String,
    pub brush_size: u32,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// A finished export, ready to download.
#[derive(Debug, Clone)]
pub struct Export {
    pub file_name: String,
    pub png: Vec<u8>,
}

/// Canvas size for a container of the given size.
pub fn canvas_size_for_container(width: f64, height: f64) -> (u32, u32) {
    let fit = |available: f64, max: u32| -> u32 {
        let available = (available - CONTAINER_MARGIN).floor();
        if available.is_finite() && available >= 1.0 {
            (available as u32).min(max)
        } else {
            1
        }
    };
    (fit(width, DEFAULT_WIDTH), fit(height, DEFAULT_HEIGHT))
}

/// Diameter of the brush preview dot.
pub fn brush_preview_size(brush_size: u32) -> u32 {
    brush_size.saturating_mul(2).min(BRUSH_PREVIEW_MAX)
}

/// The whole client-side application state.
pub struct PaintApp {
    session: DrawingSession,
    input: InputTranslator,
    gate: AnalysisGate,
    needs_redraw: bool,
}

impl PaintApp {
    pub fn new(width: u32, height: u32) -> CoreResult<Self> {
        Ok(Self {
            session: DrawingSession::new(width, height)?,
            input: InputTranslator::new(),
            gate: AnalysisGate::new(),
            needs_redraw: true,
        })
    }

    pub fn session(&self) -> &DrawingSession {
        &self.session
    }

    /// Track where the canvas sits in client coordinates.
    pub fn set_canvas_origin(&mut self, x: f64, y: f64) {
        self.input.set_origin(Point::new(x, y));
    }

    pub fn pointer(&mut self, event: PointerEvent) -> CoreResult<InputResponse> {
        let response = self.input.handle_pointer_event(event);
        self.pump()?;
        Ok(response)
    }

    pub fn touch(&mut self, event: TouchEvent) -> CoreResult<InputResponse> {
        let response = self.input.handle_touch_event(event);
        self.pump()?;
        Ok(response)
    }

    /// Feed queued draw commands to the session.
    fn pump(&mut self) -> CoreResult<()> {
        if self.input.pending() == 0 {
            return Ok(());
        }
        self.session.apply_all(self.input.drain())?;
        self.needs_redraw = true;
        Ok(())
    }

    /// Run a toolbar/shortcut action. Returns an export for `Save`.
    pub fn perform(&mut self, action: Action, now: DateTime<Utc>) -> CoreResult<Option<Export>> {
        match action {
            Action::Undo => {
                self.needs_redraw |= self.session.undo()?;
            }
            Action::Redo => {
                self.needs_redraw |= self.session.redo()?;
            }
            Action::Save => return self.export(now).map(Some),
            Action::SelectPen => self.session.set_tool(ToolKind::Pen),
            Action::SelectEraser => self.session.set_tool(ToolKind::Eraser),
        }
        Ok(None)
    }

    pub fn clear(&mut self, confirm: &dyn Confirm) -> CoreResult<bool> {
        let cleared = self.session.clear(confirm)?;
        self.needs_redraw |= cleared;
        Ok(cleared)
    }

    pub fn select_tool(&mut self, tool: ToolKind) {
        self.session.set_tool(tool);
    }

    pub fn select_color(&mut self, hex: &str) -> CoreResult<()> {
        self.session.set_color_hex(hex)
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.session.set_brush_size(size);
    }

    /// Fit the canvas to a resized container, keeping its content.
    pub fn resize_to_container(&mut self, width: f64, height: f64) -> CoreResult<()> {
        let (w, h) = canvas_size_for_container(width, height);
        self.session.resize(w, h)?;
        self.needs_redraw = true;
        Ok(())
    }

    pub fn toolbar(&self) -> ToolbarState {
        ToolbarState {
            tool: self.session.tools.tool,
            color: self.session.tools.color.to_hex(),
            brush_size: self.session.tools.brush_size(),
            can_undo: self.session.can_undo(),
            can_redo: self.session.can_redo(),
        }
    }

    /// Whether the canvas must be repainted; resets the flag.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    pub fn export(&self, now: DateTime<Utc>) -> CoreResult<Export> {
        Ok(Export {
            file_name: export_file_name(now),
            png: self.session.export_png()?,
        })
    }

    pub fn framed_preview(&self) -> CoreResult<RasterImage> {
        self.session.framed_preview()
    }

    /// Claim the analysis gate and encode the canvas for submission.
    ///
    /// Keep the ticket alive until the request settles.
    pub fn begin_analysis(&self) -> Result<(InFlight, String), AnalysisError> {
        let ticket = self.gate.try_begin()?;
        let png = self
            .session
            .export_png()
            .map_err(|e| AnalysisError::Malformed(e.to_string()))?;
        Ok((ticket, to_data_url(&png)))
    }

    pub fn is_analyzing(&self) -> bool {
        self.gate.is_busy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::export::PNG_DATA_URL_PREFIX;
    use chrono::TimeZone;

    fn draw_line(app: &mut PaintApp, y: f64) {
        app.pointer(PointerEvent::Down { position: Point::new(0.0, y) }).unwrap();
        app.pointer(PointerEvent::Move { position: Point::new(50.0, y) }).unwrap();
        app.pointer(PointerEvent::Up).unwrap();
    }

    #[test]
    fn test_canvas_size_for_container() {
        assert_eq!(canvas_size_for_container(1200.0, 900.0), (800, 600));
        assert_eq!(canvas_size_for_container(400.0, 300.0), (360, 260));
        assert_eq!(canvas_size_for_container(10.0, 10.0), (1, 1));
    }

    #[test]
    fn test_brush_preview_size() {
        assert_eq!(brush_preview_size(5), 10);
        assert_eq!(brush_preview_size(40), 50);
        assert_eq!(brush_preview_size(u32::MAX), BRUSH_PREVIEW_MAX);
    }

    #[test]
    fn test_drawing_updates_toolbar() {
        let mut app = PaintApp::new(60, 60).unwrap();
        assert!(app.take_redraw());
        assert!(!app.toolbar().can_undo);

        draw_line(&mut app, 10.0);

        assert!(app.take_redraw());
        assert!(!app.take_redraw());
        let toolbar = app.toolbar();
        assert!(toolbar.can_undo);
        assert!(!toolbar.can_redo);
        assert_eq!(toolbar.color, "#000000");
    }

    #[test]
    fn test_canvas_origin_offsets_input() {
        let mut app = PaintApp::new(60, 60).unwrap();
        app.set_canvas_origin(100.0, 100.0);

        app.pointer(PointerEvent::Down { position: Point::new(100.0, 130.0) }).unwrap();
        app.pointer(PointerEvent::Move { position: Point::new(160.0, 130.0) }).unwrap();
        app.pointer(PointerEvent::Up).unwrap();

        assert_eq!(app.session().surface().pixel(30, 30).map(|p| p.r), Some(0));
    }

    #[test]
    fn test_undo_redo_actions() {
        let mut app = PaintApp::new(60, 60).unwrap();
        let now = Utc::now();
        draw_line(&mut app, 10.0);
        app.take_redraw();

        app.perform(Action::Undo, now).unwrap();
        assert!(app.take_redraw());
        assert!(app.toolbar().can_redo);

        // Undo at the start does not request a repaint.
        app.perform(Action::Undo, now).unwrap();
        assert!(!app.take_redraw());

        app.perform(Action::Redo, now).unwrap();
        assert!(!app.toolbar().can_redo);
    }

    #[test]
    fn test_save_action_exports_png() {
        let mut app = PaintApp::new(20, 20).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();

        let export = app.perform(Action::Save, now).unwrap().unwrap();

        assert_eq!(export.file_name, "artwork-2025-01-02T03-04-05.png");
        assert_eq!(&export.png[1..4], b"PNG");
    }

    #[test]
    fn test_tool_shortcuts() {
        let mut app = PaintApp::new(20, 20).unwrap();
        app.perform(Action::SelectEraser, Utc::now()).unwrap();
        assert_eq!(app.toolbar().tool, ToolKind::Eraser);
        app.perform(Action::SelectPen, Utc::now()).unwrap();
        assert_eq!(app.toolbar().tool, ToolKind::Pen);
    }

    #[test]
    fn test_analysis_is_single_flight() {
        let app = PaintApp::new(20, 20).unwrap();

        let (ticket, data_url) = app.begin_analysis().unwrap();
        assert!(data_url.starts_with(PNG_DATA_URL_PREFIX));
        assert!(app.is_analyzing());
        assert_eq!(app.begin_analysis().unwrap_err(), AnalysisError::Busy);

        drop(ticket);
        assert!(!app.is_analyzing());
    }

    #[test]
    fn test_drawing_allowed_while_analyzing() {
        let mut app = PaintApp::new(60, 60).unwrap();
        let (_ticket, _) = app.begin_analysis().unwrap();

        draw_line(&mut app, 20.0);

        assert!(app.toolbar().can_undo);
    }

    #[test]
    fn test_resize_to_container() {
        let mut app = PaintApp::new(800, 600).unwrap();
        app.resize_to_container(500.0, 400.0).unwrap();
        let surface = app.session().surface();
        assert_eq!((surface.width(), surface.height()), (460, 360));
    }

    #[test]
    fn test_clear_declined() {
        let mut app = PaintApp::new(20, 20).unwrap();
        draw_line(&mut app, 5.0);
        app.take_redraw();

        assert!(!app.clear(&|_: &str| false).unwrap());
        assert!(!app.take_redraw());
        assert!(app.clear(&|_: &str| true).unwrap());
        assert!(app.take_redraw());
    }
}
