//! API errors and their HTTP mapping.

use atelier_core::ErrorBody;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failures of the analysis endpoint.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable credential is configured.
    #[error("analysis credential is missing or malformed")]
    Misconfigured { production: bool },
    /// The request carried no image.
    #[error("request has no image data")]
    MissingImage,
    /// The request body exceeded the size limit.
    #[error("request body too large")]
    PayloadTooLarge,
    /// The upstream service rejected the credential.
    #[error("upstream rejected the credential")]
    UpstreamAuth,
    /// The upstream service is rate limiting us.
    #[error("upstream rate limit reached")]
    UpstreamRateLimit,
    /// Anything else that went wrong upstream.
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Misconfigured { .. } | ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MissingImage => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UpstreamAuth => StatusCode::UNAUTHORIZED,
            ApiError::UpstreamRateLimit => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Misconfigured { .. } => "service_unavailable",
            ApiError::MissingImage => "missing_image",
            ApiError::PayloadTooLarge => "payload_too_large",
            ApiError::UpstreamAuth => "invalid_credential",
            ApiError::UpstreamRateLimit => "rate_limited",
            ApiError::Upstream(_) => "analysis_failed",
        }
    }

    /// Message shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            ApiError::Misconfigured { production: true } => {
                "AI解析サービスが一時的に利用できません。しばらくしてから再度お試しください。"
            }
            ApiError::Misconfigured { production: false } => {
                "Claude APIキーが設定されていません。環境変数CLAUDE_API_KEYを設定してください。"
            }
            ApiError::MissingImage => "画像データが提供されていません。",
            ApiError::PayloadTooLarge => "画像データが大きすぎます。",
            ApiError::UpstreamAuth => "Claude APIキーが無効です。正しいAPIキーを設定してください。",
            ApiError::UpstreamRateLimit => "API利用制限に達しました。しばらく待ってから再試行してください。",
            ApiError::Upstream(_) => "アート解析中にエラーが発生しました。",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.user_message().to_string(),
            code: Some(self.code().to_string()),
        };
        (self.status(), Json(body)).into_response()
    }
}
