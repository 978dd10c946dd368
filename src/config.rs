use crate::error::{config_error, env_error, McpResult};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// User id assumed when a request or callback names none
pub const DEFAULT_USER_ID: &str = "default";

/// Name and version reported by `initialize`
pub const SERVER_NAME: &str = "Multi-User Google Calendar MCP";
pub const SERVER_VERSION: &str = "0.1.0";

/// OAuth scope requested from Google
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Where credential records are persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenBackend {
    /// Redis hash on the given server URL
    Redis(String),
    /// JSON file on local disk
    File(PathBuf),
}

/// Immutable server configuration, built once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Google OAuth client ID
    pub google_client_id: String,
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Externally reachable base URL, without trailing slash
    pub base_url: String,
    /// Calendar the tools operate on
    pub google_calendar_id: String,
    /// Token persistence backend
    pub token_backend: TokenBackend,
    /// Address the HTTP server binds to
    pub host: String,
    pub port: u16,
    /// Upper bound for every outgoing HTTP call
    pub http_timeout: Duration,
    /// Google endpoints, overridable for testing
    pub google_auth_uri: String,
    pub google_token_uri: String,
    pub google_api_base: String,
}

impl Config {
    /// Load configuration from the environment (and `.env` if present)
    pub fn load() -> McpResult<Self> {
        dotenv().ok();

        let google_client_id =
            env::var("GOOGLE_CLIENT_ID").map_err(|_| env_error("GOOGLE_CLIENT_ID"))?;
        let google_client_secret =
            env::var("GOOGLE_CLIENT_SECRET").map_err(|_| env_error("GOOGLE_CLIENT_SECRET"))?;
        let base_url = env::var("BASE_URL").map_err(|_| env_error("BASE_URL"))?;

        let google_calendar_id =
            env::var("GOOGLE_CALENDAR_ID").unwrap_or_else(|_| String::from("primary"));

        let token_backend = match env::var("REDIS_URL") {
            Ok(url) if !url.trim().is_empty() => TokenBackend::Redis(url),
            _ => TokenBackend::File(PathBuf::from(
                env::var("TOKEN_FILE").unwrap_or_else(|_| String::from("tokens.json")),
            )),
        };

        let host = env::var("HOST").unwrap_or_else(|_| String::from("0.0.0.0"));
        let port = match env::var("PORT") {
            Ok(value) => value
                .parse::<u16>()
                .map_err(|_| config_error("Invalid PORT format"))?,
            Err(_) => 8000,
        };

        let http_timeout = match env::var("HTTP_TIMEOUT_SECS") {
            Ok(value) => value
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| config_error("Invalid HTTP_TIMEOUT_SECS format"))?,
            Err(_) => Duration::from_secs(10),
        };

        let mut config = Config::new(google_client_id, google_client_secret, base_url);
        config.google_calendar_id = google_calendar_id;
        config.token_backend = token_backend;
        config.host = host;
        config.port = port;
        config.http_timeout = http_timeout;
        if let Ok(uri) = env::var("GOOGLE_AUTH_URI") {
            config.google_auth_uri = uri;
        }
        if let Ok(uri) = env::var("GOOGLE_TOKEN_URI") {
            config.google_token_uri = uri;
        }
        if let Ok(base) = env::var("GOOGLE_API_BASE") {
            config.google_api_base = base.trim_end_matches('/').to_string();
        }

        Ok(config)
    }

    /// Configuration with defaults for everything but the OAuth client and base URL
    pub fn new(
        google_client_id: impl Into<String>,
        google_client_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            google_client_id: google_client_id.into(),
            google_client_secret: google_client_secret.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            google_calendar_id: String::from("primary"),
            token_backend: TokenBackend::File(PathBuf::from("tokens.json")),
            host: String::from("0.0.0.0"),
            port: 8000,
            http_timeout: Duration::from_secs(10),
            google_auth_uri: DEFAULT_AUTH_URI.to_string(),
            google_token_uri: DEFAULT_TOKEN_URI.to_string(),
            google_api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// OAuth redirect URI registered with Google
    pub fn redirect_uri(&self) -> String {
        format!("{}/auth/google/callback", self.base_url)
    }

    /// Link a user can visit to connect their calendar
    pub fn auth_start_url(&self, user_id: &str) -> String {
        format!(
            "{}/auth/google?user_id={}",
            self.base_url,
            urlencoding::encode(user_id)
        )
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
