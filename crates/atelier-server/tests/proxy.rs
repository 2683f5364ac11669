//! End-to-end tests of the analysis proxy over real HTTP.

use atelier_core::analysis::{AnalyzeRequest, AnalyzeResponse, Critique, ErrorBody};
use atelier_server::config::Credential;
use atelier_server::upstream::AnthropicCritic;
use atelier_server::{AppState, ArtCritic, BoxFuture, ServerConfig, UpstreamError};
use axum::http::{HeaderMap, StatusCode as AxumStatus};
use axum::routing::post;
use axum::{Json, Router};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

enum Behavior {
    Reply(&'static str),
    Unauthorized,
    RateLimited,
    Broken,
}

struct StubCritic {
    behavior: Behavior,
    seen: Mutex<Vec<String>>,
}

impl StubCritic {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            seen: Mutex::new(Vec::new()),
        })
    }
}

impl ArtCritic for StubCritic {
    fn critique(&self, image_base64: String) -> BoxFuture<'_, Result<String, UpstreamError>> {
        self.seen.lock().unwrap().push(image_base64);
        let result = match self.behavior {
            Behavior::Reply(text) => Ok(text.to_string()),
            Behavior::Unauthorized => Err(UpstreamError::Unauthorized),
            Behavior::RateLimited => Err(UpstreamError::RateLimited),
            Behavior::Broken => Err(UpstreamError::EmptyResponse),
        };
        Box::pin(async move { result })
    }
}

fn config(vars: &[(&str, &str)]) -> ServerConfig {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ServerConfig::from_lookup(|name| vars.get(name).cloned())
}

async fn spawn(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(atelier_server::serve(listener, Arc::new(state)));
    format!("http://{addr}")
}

async fn spawn_router(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await });
    format!("http://{addr}")
}

async fn post_analysis(base: &str, body: &AnalyzeRequest) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{base}/api/analyze-art"))
        .json(body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_missing_image_is_bad_request() {
    let critic = StubCritic::new(Behavior::Reply("unused"));
    let base = spawn(AppState::with_critic(config(&[]), critic.clone())).await;

    let response = post_analysis(&base, &AnalyzeRequest::default()).await;

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: ErrorBody = response.json().await.unwrap();
    assert_eq!(body.error, "画像データが提供されていません。");
    assert_eq!(body.code.as_deref(), Some("missing_image"));
    assert!(critic.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unreadable_bodies_are_missing_image() {
    let critic = StubCritic::new(Behavior::Reply("unused"));
    let base = spawn(AppState::with_critic(config(&[]), critic.clone())).await;
    let client = reqwest::Client::new();
    let url = format!("{base}/api/analyze-art");

    let requests = [
        client.post(&url),
        client.post(&url).header("Content-Type", "text/plain").body("hello"),
        client.post(&url).header("Content-Type", "application/json").body("{not json"),
        client.post(&url).header("Content-Type", "application/json").body(r#"{"imageData":123}"#),
    ];
    for request in requests {
        let response = request.send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: ErrorBody = response.json().await.unwrap();
        assert_eq!(body.error, "画像データが提供されていません。");
        assert_eq!(body.code.as_deref(), Some("missing_image"));
    }
    assert!(critic.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_body_is_refused() {
    let critic = StubCritic::new(Behavior::Reply("unused"));
    let base = spawn(AppState::with_critic(config(&[]), critic.clone())).await;
    let image = format!("data:image/png;base64,{}", "A".repeat(atelier_server::routes::MAX_BODY_BYTES));

    let response = post_analysis(&base, &AnalyzeRequest::new(image)).await;

    assert_eq!(response.status(), reqwest::StatusCode::PAYLOAD_TOO_LARGE);
    let body: ErrorBody = response.json().await.unwrap();
    assert_eq!(body.code.as_deref(), Some("payload_too_large"));
    assert!(critic.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_bodyless_request_checks_credential_first() {
    let base = spawn(AppState::from_config(config(&[]))).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/analyze-art"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = response.json().await.unwrap();
    assert_eq!(body.code.as_deref(), Some("service_unavailable"));
}

#[tokio::test]
async fn test_successful_analysis_strips_prefix() {
    let critic = StubCritic::new(Behavior::Reply("「夕暮れの対話」\n大胆な筆致が印象的です。"));
    let base = spawn(AppState::with_critic(config(&[]), critic.clone())).await;

    let response = post_analysis(&base, &AnalyzeRequest::new("data:image/png;base64,iVBORw0KGgo=")).await;

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: AnalyzeResponse = response.json().await.unwrap();
    let critique = Critique::parse(&body.analysis);
    assert_eq!(critique.title, "「夕暮れの対話」");
    assert_eq!(critique.body, "大胆な筆致が印象的です。");
    assert_eq!(critic.seen.lock().unwrap().as_slice(), &["iVBORw0KGgo=".to_string()]);
}

#[tokio::test]
async fn test_missing_credential_degrades() {
    let base = spawn(AppState::from_config(config(&[]))).await;

    let response = post_analysis(&base, &AnalyzeRequest::new("data:image/png;base64,AAAA")).await;

    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = response.json().await.unwrap();
    assert!(body.error.contains("CLAUDE_API_KEY"));
}

#[tokio::test]
async fn test_malformed_credential_in_production_is_generic() {
    let config = config(&[("APP_ENV", "production"), ("CLAUDE_API_KEY", "oops")]);
    assert!(matches!(config.credential, Credential::Malformed { .. }));
    let base = spawn(AppState::from_config(config)).await;

    // Credential problems are reported before payload problems.
    let response = post_analysis(&base, &AnalyzeRequest::default()).await;

    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = response.json().await.unwrap();
    assert_eq!(
        body.error,
        "AI解析サービスが一時的に利用できません。しばらくしてから再度お試しください。"
    );
}

#[tokio::test]
async fn test_upstream_failures_map_to_statuses() {
    let cases = [
        (Behavior::Unauthorized, reqwest::StatusCode::UNAUTHORIZED),
        (Behavior::RateLimited, reqwest::StatusCode::TOO_MANY_REQUESTS),
        (Behavior::Broken, reqwest::StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (behavior, expected) in cases {
        let base = spawn(AppState::with_critic(config(&[]), StubCritic::new(behavior))).await;
        let response = post_analysis(&base, &AnalyzeRequest::new("data:image/png;base64,AAAA")).await;
        assert_eq!(response.status(), expected);
        let body: ErrorBody = response.json().await.unwrap();
        assert!(!body.error.is_empty());
    }
}

#[tokio::test]
async fn test_security_headers() {
    let base = spawn(AppState::from_config(config(&[]))).await;

    let response = reqwest::get(format!("{base}/health")).await.unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-xss-protection"], "1; mode=block");
    assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin() {
    let base = spawn(AppState::from_config(config(&[]))).await;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("{base}/api/analyze-art"))
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:3000"
    );
    assert_eq!(response.headers()["access-control-allow-credentials"], "true");
}

#[tokio::test]
async fn test_static_index_is_served() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<canvas id=\"paintCanvas\"></canvas>").unwrap();
    let static_dir = dir.path().to_str().unwrap().to_string();
    let base = spawn(AppState::from_config(config(&[("STATIC_DIR", &static_dir)]))).await;

    let response = reqwest::get(format!("{base}/")).await.unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(response.text().await.unwrap().contains("paintCanvas"));
}

async fn fake_messages_api(headers: HeaderMap, Json(body): Json<serde_json::Value>) -> (AxumStatus, Json<serde_json::Value>) {
    let key = headers.get("x-api-key").and_then(|v| v.to_str().ok()).unwrap_or_default();
    if key != "sk-ant-good" {
        return (
            AxumStatus::UNAUTHORIZED,
            Json(serde_json::json!({ "type": "error", "error": { "type": "authentication_error" } })),
        );
    }
    assert_eq!(headers["anthropic-version"], "2023-06-01");
    let data = body["messages"][0]["content"][1]["source"]["data"].as_str().unwrap_or_default();
    let text = format!("「検証」\nmodel={} data={}", body["model"].as_str().unwrap_or_default(), data);
    (
        AxumStatus::OK,
        Json(serde_json::json!({ "content": [{ "type": "text", "text": text }] })),
    )
}

#[tokio::test]
async fn test_anthropic_client_against_fake_upstream() {
    let upstream = spawn_router(Router::new().route("/v1/messages", post(fake_messages_api))).await;
    let url = format!("{upstream}/v1/messages");

    let good = config(&[("CLAUDE_API_KEY", "sk-ant-good"), ("ANTHROPIC_API_URL", &url)]);
    let key = good.credential.key().cloned().unwrap();
    let critic = AnthropicCritic::new(key, &good);
    let text = critic.critique("QUJD".to_string()).await.unwrap();
    assert_eq!(text, "「検証」\nmodel=claude-sonnet-4-20250514 data=QUJD");

    let bad = config(&[("CLAUDE_API_KEY", "sk-ant-bad"), ("ANTHROPIC_API_URL", &url)]);
    let base = spawn(AppState::from_config(bad)).await;
    let response = post_analysis(&base, &AnalyzeRequest::new("data:image/png;base64,QUJD")).await;
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: ErrorBody = response.json().await.unwrap();
    assert_eq!(body.error, "Claude APIキーが無効です。正しいAPIキーを設定してください。");
}
