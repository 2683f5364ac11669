//! HTTP routes and middleware.

use crate::config::{Credential, ServerConfig};
use crate::error::ApiError;
use crate::upstream::{AnthropicCritic, ArtCritic};
use atelier_core::analysis::{ANALYZE_PATH, AnalyzeRequest, AnalyzeResponse};
use atelier_core::export::strip_data_url_prefix;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::{self, HeaderValue};
use axum::http::{Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Largest accepted request body (a full-size canvas as a data URL fits easily).
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state.
pub struct AppState {
    pub config: ServerConfig,
    /// `None` when no valid credential is configured.
    pub critic: Option<Arc<dyn ArtCritic>>,
}

impl AppState {
    /// Build state with the real upstream client, if a credential is configured.
    pub fn from_config(config: ServerConfig) -> Self {
        let critic = match &config.credential {
            Credential::Valid(key) => {
                Some(Arc::new(AnthropicCritic::new(key.clone(), &config)) as Arc<dyn ArtCritic>)
            }
            Credential::Missing => {
                warn!("CLAUDE_API_KEY is not set; art analysis is disabled");
                None
            }
            Credential::Malformed { len } => {
                warn!(len, "CLAUDE_API_KEY does not look like an Anthropic key; art analysis is disabled");
                None
            }
        };
        Self { config, critic }
    }

    /// Build state around any critic implementation.
    pub fn with_critic(config: ServerConfig, critic: Arc<dyn ArtCritic>) -> Self {
        Self {
            config,
            critic: Some(critic),
        }
    }
}

/// Build the router with all middleware applied.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route(ANALYZE_PATH, post(analyze_art))
        .route("/health", get(health))
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// Forward a canvas image to the critic.
///
/// An unreadable body (no JSON content type, bad JSON, wrong field types)
/// counts as a request without an image, so every failure goes through
/// the same checks and answers with an `ErrorBody`. Oversized bodies are
/// refused with 413.
async fn analyze_art(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!(%request_id, "Rejecting analysis: body over {} bytes", MAX_BODY_BYTES);
            return Err(ApiError::PayloadTooLarge);
        }
        Err(rejection) => {
            warn!(%request_id, status = %rejection.status(), "Unreadable analysis body: {}", rejection.body_text());
            AnalyzeRequest::default()
        }
    };
    info!(
        %request_id,
        critic_configured = state.critic.is_some(),
        image_received = request.image().is_some(),
        "Art analysis requested"
    );

    let Some(critic) = state.critic.as_ref() else {
        warn!(%request_id, "Rejecting analysis: no valid credential configured");
        return Err(ApiError::Misconfigured {
            production: state.config.environment.is_production(),
        });
    };

    let Some(image) = request.image() else {
        warn!(%request_id, "Rejecting analysis: no image data");
        return Err(ApiError::MissingImage);
    };

    let payload = strip_data_url_prefix(image).to_string();
    match critic.critique(payload).await {
        Ok(analysis) => {
            info!(%request_id, chars = analysis.chars().count(), "Art analysis completed");
            Ok(Json(AnalyzeResponse { analysis }))
        }
        Err(e) => {
            error!(%request_id, error = %e, "Art analysis failed");
            Err(e.into())
        }
    }
}
