//! The drawing session: one document's surface, tools and history.

use crate::error::CoreResult;
use crate::export::{self, PREVIEW_MAX_HEIGHT, PREVIEW_MAX_WIDTH};
use crate::history::{History, MAX_HISTORY, Snapshot};
use crate::input::DrawCommand;
use crate::stroke::StrokeSession;
use crate::surface::{RasterImage, RasterSurface};
use crate::tools::{ToolKind, ToolSettings};

/// Prompt shown before clearing the canvas.
pub const CLEAR_CONFIRMATION: &str = "キャンバスをクリアしますか？この操作は元に戻せません。";

/// Asks the user before a destructive action.
pub trait Confirm {
    fn confirm(&self, message: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// Stroke state machine.
#[derive(Debug, Clone, Default)]
pub enum StrokeState {
    #[default]
    Idle,
    Stroking(StrokeSession),
}

/// A single open document.
///
/// Owns everything drawing touches. Nothing here is shared or global,
/// so several sessions can coexist.
#[derive(Debug, Clone)]
pub struct DrawingSession {
    surface: RasterSurface,
    pub tools: ToolSettings,
    history: History<Snapshot>,
    state: StrokeState,
}

impl DrawingSession {
    /// Open a blank document. The blank canvas is the first history entry.
    pub fn new(width: u32, height: u32) -> CoreResult<Self> {
        let surface = RasterSurface::new(width, height)?;
        let initial = Snapshot::capture(&surface)?;
        log::debug!("Opened {}x{} drawing session", width, height);
        Ok(Self {
            surface,
            tools: ToolSettings::default(),
            history: History::with_initial(initial, MAX_HISTORY),
            state: StrokeState::Idle,
        })
    }

    pub fn surface(&self) -> &RasterSurface {
        &self.surface
    }

    pub fn history(&self) -> &History<Snapshot> {
        &self.history
    }

    pub fn state(&self) -> &StrokeState {
        &self.state
    }

    pub fn is_stroking(&self) -> bool {
        matches!(self.state, StrokeState::Stroking(_))
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tools.tool = tool;
    }

    pub fn set_color_hex(&mut self, hex: &str) -> CoreResult<()> {
        self.tools.set_color_hex(hex)
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.tools.set_brush_size(size);
    }

    /// Apply one draw command.
    ///
    /// Returns `true` when the command completed a stroke (and a snapshot
    /// was recorded).
    pub fn apply(&mut self, command: DrawCommand) -> CoreResult<bool> {
        match command {
            DrawCommand::Start(point) => {
                if self.is_stroking() {
                    self.finish_stroke()?;
                }
                self.state = StrokeState::Stroking(StrokeSession::begin(point, &self.tools));
                Ok(false)
            }
            DrawCommand::Move(point) => {
                if let StrokeState::Stroking(stroke) = &mut self.state {
                    let (from, to) = stroke.extend(point);
                    self.surface.draw_segment(from, to, stroke.tool, stroke.color, stroke.width);
                }
                Ok(false)
            }
            DrawCommand::End => {
                if self.is_stroking() {
                    self.finish_stroke()?;
                    return Ok(true);
                }
                Ok(false)
            }
        }
    }

    /// Apply queued commands in order.
    pub fn apply_all<I>(&mut self, commands: I) -> CoreResult<()>
    where
        I: IntoIterator<Item = DrawCommand>,
    {
        for command in commands {
            self.apply(command)?;
        }
        Ok(())
    }

    fn finish_stroke(&mut self) -> CoreResult<()> {
        if let StrokeState::Stroking(stroke) = std::mem::take(&mut self.state) {
            log::trace!("Stroke finished with {} points", stroke.points().len());
        }
        self.record()
    }

    fn record(&mut self) -> CoreResult<()> {
        let snapshot = Snapshot::capture(&self.surface)?;
        self.history.push(snapshot);
        Ok(())
    }

    /// Step back one snapshot. Returns whether anything changed.
    ///
    /// The target is decoded before the cursor moves, so a failed decode
    /// leaves both history and surface as they were.
    pub fn undo(&mut self) -> CoreResult<bool> {
        let image = match self.history.peek_undo() {
            Some(snapshot) => snapshot.decode()?,
            None => return Ok(false),
        };
        self.history.undo();
        self.surface.restore(&image);
        Ok(true)
    }

    /// Step forward one snapshot. Returns whether anything changed.
    pub fn redo(&mut self) -> CoreResult<bool> {
        let image = match self.history.peek_redo() {
            Some(snapshot) => snapshot.decode()?,
            None => return Ok(false),
        };
        self.history.redo();
        self.surface.restore(&image);
        Ok(true)
    }

    /// Reset the canvas after asking for confirmation.
    ///
    /// The cleared canvas is recorded, so a clear can itself be undone.
    pub fn clear(&mut self, confirm: &dyn Confirm) -> CoreResult<bool> {
        if !confirm.confirm(CLEAR_CONFIRMATION) {
            return Ok(false);
        }
        self.state = StrokeState::Idle;
        self.surface.clear();
        self.record()?;
        Ok(true)
    }

    /// Resize the surface, keeping its content at the origin.
    pub fn resize(&mut self, width: u32, height: u32) -> CoreResult<()> {
        self.surface.resize(width, height)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Index of the displayed snapshot.
    pub fn cursor(&self) -> Option<usize> {
        self.history.cursor()
    }

    pub fn export_png(&self) -> CoreResult<Vec<u8>> {
        export::export_png(&self.surface)
    }

    /// The current canvas as a `data:image/png;base64,...` URL.
    pub fn export_data_url(&self) -> CoreResult<String> {
        Ok(export::to_data_url(&self.export_png()?))
    }

    pub fn render_preview(&self, max_width: u32, max_height: u32) -> CoreResult<RasterImage> {
        export::render_preview(&self.surface, max_width, max_height)
    }

    /// Preview sized for the analysis frame.
    pub fn framed_preview(&self) -> CoreResult<RasterImage> {
        self.render_preview(PREVIEW_MAX_WIDTH, PREVIEW_MAX_HEIGHT)
    }
}
