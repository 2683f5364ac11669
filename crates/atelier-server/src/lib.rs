//! Atelier Server
//!
//! Serves the canvas client and proxies finished artworks to a
//! vision-language service for a curator-style critique.
//!
//! ## API
//!
//! ```text
//! POST /api/analyze-art   { "imageData": "data:image/png;base64,..." }
//!   200 { "analysis": "「title」\ncommentary..." }
//!   4xx/5xx { "error": "<message>", "code": "<code>" }
//! GET  /health            ok
//! GET  /*                 static files
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod upstream;

pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::{AppState, app};
pub use upstream::{ArtCritic, BoxFuture, UpstreamError};

use std::sync::Arc;
use tokio::net::TcpListener;

/// Serve the application on an already-bound listener.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    axum::serve(listener, app(state)).await
}
