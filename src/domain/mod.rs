//! Tools, resources and prompts exposed over the MCP protocol
//!
//! Each module owns one catalog or accessor and the strategies serving it.

pub mod catalog;
pub mod docblock;
pub mod prompts;
pub mod resources;
pub mod template;
pub mod tools;
pub mod utils;
