use std::sync::Arc;

use anyhow::Result;
use sheet_profiler::{config::Config, logging, routes, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    logging::init_logging(&config.log_filter)?;

    let addr = config.bind_addr;
    let state = Arc::new(AppState::new(config));
    let app = routes::app(state);

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
