//! Model Context Protocol (MCP) server handling and JSON-RPC implementations
//!
//! Provides the method strategy contract, the dispatcher that validates and
//! routes requests, and envelope formatting.

pub mod initialize;
pub mod rpc;
pub mod server;
pub mod strategy;
