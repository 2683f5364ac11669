//! Atelier server entry point.
//!
//! `atelier-server` starts the server; `atelier-server check-env` prints
//! the configuration it would use and exits.

use atelier_server::{AppState, ServerConfig};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atelier_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env();

    if std::env::args().nth(1).as_deref() == Some("check-env") {
        println!("{}", config.report());
        return Ok(());
    }

    let addr = config.addr();
    let port = config.port;
    let static_dir = config.static_dir.clone();
    let state = Arc::new(AppState::from_config(config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Atelier server listening on {}", addr);
    info!("Open http://localhost:{} (static files from {})", port, static_dir.display());

    atelier_server::serve(listener, state).await
}
