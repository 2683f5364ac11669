//! Atelier web client
//!
//! Browser shell for the drawing canvas. [`PaintApp`] holds all state and
//! runs natively under test; the `web` module binds it to the DOM.

mod app;
mod shortcuts;

pub use app::{Action, Export, PaintApp, ToolbarState, brush_preview_size, canvas_size_for_container};
pub use shortcuts::{Shortcut, ShortcutRegistry};

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::WebApp;
