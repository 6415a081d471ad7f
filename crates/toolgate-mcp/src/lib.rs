//! JSON-RPC 2.0 tool gateway.
//!
//! Aggregates the tools of every registered provider behind a single
//! endpoint. Tool names are namespaced as `<provider>__<tool>`; a call is
//! routed to a fresh provider instance built with the caller's credentials.
//!
//! ```text
//! ┌────────┐  POST /mcp   ┌────────────┐   create(creds)   ┌──────────┐
//! │ client │─────────────▶│ Dispatcher │──────────────────▶│ Provider │
//! │        │◀─────────────│            │◀──────────────────│  tools   │
//! └────────┘   JSON-RPC   └────────────┘    tool result    └──────────┘
//! ```

pub mod dispatch;
mod error;
pub mod http_serve;
pub mod protocol;

pub use dispatch::Dispatcher;
pub use error::{McpError, McpResult};
pub use http_serve::{create_mcp_router, McpHttpState, MCP_PATH};
pub use protocol::{JsonRpcError, JsonRpcResponse, ListToolsResult, McpTool};
