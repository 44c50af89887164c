//! Axum HTTP handlers for the web server
//!
//! Provides the primary Model Context Protocol endpoint, and general metadata endpoints.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::errors::ProtocolFault;
use crate::mcp::rpc::fault_to_json_rpc;
use crate::AppState;

pub const MCP_ENDPOINT: &str = "/mcp";
pub const SSE_ENDPOINT: &str = "/mcp/sse";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
    pub mcp_endpoint: &'static str,
    pub sse_endpoint: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn discovery(State(state): State<AppState>) -> Json<DiscoveryResponse> {
    let config = state.context.config();
    Json(DiscoveryResponse {
        name: config.server_name.clone(),
        version: config.server_version.clone(),
        protocol_version: config.protocol_version.clone(),
        mcp_endpoint: MCP_ENDPOINT,
        sse_endpoint: SSE_ENDPOINT,
    })
}

/// One request in, one envelope out. Protocol errors still answer `200 OK`.
pub async fn mcp_endpoint(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "undecodable request body");
            return (
                StatusCode::OK,
                Json(fault_to_json_rpc(
                    None,
                    &ProtocolFault::InvalidRequest("request body is not valid JSON"),
                )),
            )
                .into_response();
        }
    };

    match state.context.dispatcher().handle_message(payload).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
