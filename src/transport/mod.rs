//! Process transports
//!
//! Line-delimited JSON-RPC over stdin/stdout. The HTTP surface lives in `crate::http`.

pub mod stdio;
