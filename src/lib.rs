use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod config;
pub mod context;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod toolsets;
pub mod transport;

use context::ServerContext;

#[derive(Clone)]
pub struct AppState {
    pub context: Arc<ServerContext>,
}

impl AppState {
    pub fn new(context: Arc<ServerContext>) -> Self {
        Self { context }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/.well-known/mcp", get(http::handlers::discovery))
        .route(http::handlers::MCP_ENDPOINT, post(http::handlers::mcp_endpoint))
        .route(http::handlers::SSE_ENDPOINT, get(http::sse::heartbeat))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
