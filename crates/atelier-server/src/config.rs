//! Server configuration, read from the environment once at startup.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Required prefix of an Anthropic API key.
pub const API_KEY_PREFIX: &str = "sk-ant-";

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "public";
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Origins allowed in production when `ALLOWED_ORIGINS` is unset.
const PRODUCTION_ORIGINS: &[&str] = &["https://atelier-maestro.vercel.app"];

/// Deployment flavour. Production hides configuration details from users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("production") => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// A credential that passed the prefix check. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Accepts only values carrying the expected prefix.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        raw.starts_with(API_KEY_PREFIX).then(|| Self(raw.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({}…, {} chars)", API_KEY_PREFIX, self.0.len())
    }
}

/// State of the `CLAUDE_API_KEY` setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Missing,
    /// Set, but without the expected prefix. Holds the length only.
    Malformed { len: usize },
    Valid(ApiKey),
}

impl Credential {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => Credential::Missing,
            Some(v) if v.trim().is_empty() => Credential::Missing,
            Some(v) => ApiKey::parse(v).map_or(Credential::Malformed { len: v.len() }, Credential::Valid),
        }
    }

    pub fn key(&self) -> Option<&ApiKey> {
        match self {
            Credential::Valid(key) => Some(key),
            _ => None,
        }
    }
}

/// Everything the server needs at runtime.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub environment: Environment,
    pub credential: Credential,
    pub allowed_origins: Vec<String>,
    pub static_dir: PathBuf,
    pub upstream_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ServerConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let environment = Environment::parse(lookup("APP_ENV").as_deref());
        let credential = Credential::parse(lookup("CLAUDE_API_KEY").as_deref());

        let allowed_origins = match lookup("ALLOWED_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            None if environment.is_production() => {
                PRODUCTION_ORIGINS.iter().map(|o| o.to_string()).collect()
            }
            None => vec![
                format!("http://localhost:{port}"),
                format!("http://127.0.0.1:{port}"),
            ],
        };

        Self {
            port,
            environment,
            credential,
            allowed_origins,
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
            upstream_url: lookup("ANTHROPIC_API_URL").unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string()),
            model: lookup("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: lookup("ANTHROPIC_MAX_TOKENS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    /// Human-readable configuration report for `check-env`.
    pub fn report(&self) -> String {
        let key = match &self.credential {
            Credential::Missing => "未設定".to_string(),
            Credential::Malformed { len } => format!("形式不正 (長さ: {len})"),
            Credential::Valid(key) => format!("設定済み (長さ: {})", key.len()),
        };
        format!(
            "=== 環境変数チェック ===\nCLAUDE_API_KEY: {key}\nPORT: {}\nAPP_ENV: {:?}\nSTATIC_DIR: {}\n========================",
            self.port,
            self.environment,
            self.static_dir.display(),
        )
    }
}
