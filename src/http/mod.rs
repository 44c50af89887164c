//! HTTP Transport layer for the Model Context Protocol
//!
//! Provides the external API routing: the `/mcp` request endpoint, the heartbeat
//! stream and metadata endpoints.

pub mod handlers;
pub mod sse;
