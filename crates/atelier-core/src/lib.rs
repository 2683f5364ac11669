//! Atelier Core Library
//!
//! Platform-agnostic drawing engine for the Atelier canvas: raster surface,
//! input translation, undo history, PNG export and the analysis client model.

pub mod analysis;
pub mod error;
pub mod export;
pub mod history;
pub mod input;
pub mod session;
pub mod stroke;
pub mod surface;
pub mod tools;

pub use analysis::{AnalysisError, AnalysisGate, AnalyzeRequest, AnalyzeResponse, Critique, ErrorBody, InFlight};
pub use error::{CoreError, CoreResult};
pub use history::{History, MAX_HISTORY, Snapshot};
pub use input::{DrawCommand, InputResponse, InputTranslator, PointerEvent, TouchEvent};
pub use session::{Confirm, DrawingSession, StrokeState};
pub use stroke::StrokeSession;
pub use surface::{RasterImage, RasterSurface};
pub use tools::{Rgba, ToolKind, ToolSettings};
