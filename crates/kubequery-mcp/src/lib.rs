//! Tool registration and transport for kubequery
//!
//! Exposes each query and diagnostic function as a named, independently
//! invokable tool over a JSON-RPC 2.0 stdio transport.

mod server;
mod tools;

pub use server::McpServer;
pub use tools::{ToolDef, tool_definitions};
