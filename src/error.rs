use miette::Diagnostic;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(calendar_mcp::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(calendar_mcp::config))]
    Config(String),

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(calendar_mcp::google_calendar))]
    GoogleCalendar(String),

    #[error("OAuth error: {0}")]
    #[diagnostic(code(calendar_mcp::oauth))]
    OAuth(String),

    #[error("Token store error: {0}")]
    #[diagnostic(code(calendar_mcp::token_store))]
    TokenStore(String),

    #[error("Request timed out: {0}")]
    #[diagnostic(
        code(calendar_mcp::timeout),
        help("The upstream service did not answer in time; the call can be retried")
    )]
    Timeout(String),

    #[error("Invalid params: {0}")]
    #[diagnostic(code(calendar_mcp::invalid_params))]
    InvalidParams(String),

    #[error(transparent)]
    #[diagnostic(code(calendar_mcp::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(calendar_mcp::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(calendar_mcp::other))]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

/// Type alias for Result with our Error type
pub type McpResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}

/// Helper to create OAuth errors
pub fn oauth_error(message: &str) -> Error {
    Error::OAuth(message.to_string())
}

/// Helper to create token store errors
pub fn token_store_error(message: &str) -> Error {
    Error::TokenStore(message.to_string())
}

/// Helper to create errors for malformed tool arguments
pub fn invalid_params_error(message: &str) -> Error {
    Error::InvalidParams(message.to_string())
}

/// Map a transport failure from `reqwest`, keeping timeouts distinguishable.
/// `wrap` builds the error used for every other failure.
pub fn transport_error(context: &str, err: reqwest::Error, wrap: fn(&str) -> Error) -> Error {
    let message = format!("{}: {}", context, err);
    if err.is_timeout() {
        Error::Timeout(message)
    } else {
        wrap(&message)
    }
}
