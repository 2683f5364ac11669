//! Art analysis: wire types shared with the proxy, critique parsing and
//! the client-side single-flight guard.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Proxy route for analysis requests.
pub const ANALYZE_PATH: &str = "/api/analyze-art";

/// Message shown when the proxy cannot be reached.
pub const NETWORK_ERROR_MESSAGE: &str =
    "サーバーとの通信に失敗しました。サーバーが起動していることを確認してください。";

/// Text shown while a request is running.
pub const PROGRESS_MESSAGE: &str = "AIが作品を解析中です...";

/// Message shown when a request is refused because one is already outstanding.
pub const BUSY_MESSAGE: &str = "前回の解析がまだ終わっていません。完了までお待ちください。";

/// Request body of `POST /api/analyze-art`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// PNG data URL. Optional on the wire so a missing field yields a
    /// proper 400 instead of a body rejection.
    #[serde(rename = "imageData", default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

impl AnalyzeRequest {
    pub fn new(data_url: impl Into<String>) -> Self {
        Self {
            image_data: Some(data_url.into()),
        }
    }

    /// The image payload, treating an empty string as absent.
    pub fn image(&self) -> Option<&str> {
        self.image_data.as_deref().filter(|data| !data.is_empty())
    }
}

/// Success body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub analysis: String,
}

/// Error body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// A critique split into its title line and commentary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Critique {
    pub title: String,
    pub body: String,
}

impl Critique {
    /// Split on the first line break: the first line is the title,
    /// everything after it is the body.
    pub fn parse(text: &str) -> Self {
        match text.split_once('\n') {
            Some((title, body)) => Self {
                title: title.trim_end_matches('\r').to_string(),
                body: body.to_string(),
            },
            None => Self {
                title: text.to_string(),
                body: String::new(),
            },
        }
    }

    /// Body lines, for renderers that join them with their own line break.
    pub fn body_lines(&self) -> impl Iterator<Item = &str> {
        self.body.lines()
    }
}

/// Why an analysis attempt failed, as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// Another request is still outstanding.
    #[error("analysis already in progress")]
    Busy,
    /// The proxy could not be reached.
    #[error("network error: {0}")]
    Network(String),
    /// The proxy answered with an error body.
    #[error("service error {status}: {message}")]
    Service { status: u16, message: String },
    /// The proxy answered with something that is not the expected JSON.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl AnalysisError {
    /// Build from a non-success proxy response.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(err) => AnalysisError::Service {
                status,
                message: err.error,
            },
            Err(e) => AnalysisError::Malformed(format!("status {status}: {e}")),
        }
    }

    /// Text to show the user.
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::Busy => BUSY_MESSAGE.to_string(),
            AnalysisError::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            AnalysisError::Service { message, .. } => message.clone(),
            AnalysisError::Malformed(_) => "アート解析中にエラーが発生しました。".to_string(),
        }
    }
}

/// Parse a proxy response into a critique.
pub fn parse_response(status: u16, body: &str) -> Result<Critique, AnalysisError> {
    if !(200..300).contains(&status) {
        return Err(AnalysisError::from_response(status, body));
    }
    let response: AnalyzeResponse =
        serde_json::from_str(body).map_err(|e| AnalysisError::Malformed(e.to_string()))?;
    Ok(Critique::parse(&response.analysis))
}

/// Allows at most one analysis request in flight.
#[derive(Debug, Clone, Default)]
pub struct AnalysisGate {
    busy: Arc<AtomicBool>,
}

impl AnalysisGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate. Fails with [`AnalysisError::Busy`] while another
    /// ticket is alive.
    pub fn try_begin(&self) -> Result<InFlight, AnalysisError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AnalysisError::Busy)?;
        Ok(InFlight {
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Ticket for an outstanding request. Dropping it reopens the gate.
#[derive(Debug)]
pub struct InFlight {
    busy: Arc<AtomicBool>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
