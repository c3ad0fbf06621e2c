//! Tool execution, abstracted away from any particular MCP server.
//!
//! ToolLoop never talks MCP directly: it resolves the `ToolDef` to call, asks the
//! `Store` which `MCPServer` owns it, and calls through this trait. The only
//! implementation is [`mcp_http::McpToolSource`], one per MCP server endpoint.

mod mcp_http;

pub use mcp_http::McpToolSource;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ToolSourceError;

/// A tool as advertised by `tools/list`, independent of our persisted `ToolDef`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Text result of a `tools/call`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallContent {
    pub text: String,
}

#[async_trait]
pub trait ToolSource: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError>;
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallContent, ToolSourceError>;
}
