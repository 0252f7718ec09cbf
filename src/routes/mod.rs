use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod sheets;

pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_file_size;
    Router::new()
        .merge(routes())
        .merge(sheets::routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_check() {
        assert_eq!(tokio_test::block_on(health_check()), "OK");
    }
}
