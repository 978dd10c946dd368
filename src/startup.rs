use crate::components::token_store;
use crate::config::Config;
use crate::error::Error;
use crate::server::{self, AppState};
use crate::shutdown;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config
pub fn load_config() -> miette::Result<Arc<Config>> {
    match Config::load() {
        Ok(config) => Ok(Arc::new(config)),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Build the app and serve it until a shutdown signal arrives
pub async fn start_server(config: Arc<Config>) -> miette::Result<()> {
    let store = token_store::from_backend(&config.token_backend)?;
    let state = AppState::new(Arc::clone(&config), store)?;
    let app = server::router(state);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await.map_err(Error::from)?;
    info!("Listening on {} (public URL {})", addr, config.base_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::wait_for_signal())
        .await
        .map_err(Error::from)?;

    info!("Server shut down");
    Ok(())
}
