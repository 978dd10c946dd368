mod handlers;

use crate::components::google_calendar::{GoogleCalendar, TokenManager};
use crate::components::token_store::TokenStore;
use crate::config::Config;
use crate::error::{config_error, McpResult};
use crate::mcp::Dispatcher;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use handlers::{
    auth_callback_handler, auth_start_handler, health_handler, mcp_handler, status_for,
};

/// Shared state for every route
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: TokenManager,
    pub dispatcher: Dispatcher,
}

impl AppState {
    /// Wire the components together around one HTTP client
    pub fn new(config: Arc<Config>, store: Arc<dyn TokenStore>) -> McpResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| config_error(&format!("Failed to build HTTP client: {}", e)))?;

        let tokens = TokenManager::new(Arc::clone(&config), store, client);
        let dispatcher = Dispatcher::new(GoogleCalendar::new(tokens.clone()));

        Ok(Self {
            config,
            tokens,
            dispatcher,
        })
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/auth/{provider}", get(auth_start_handler))
        .route("/auth/{provider}/callback", get(auth_callback_handler))
        .route("/mcp", post(mcp_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
