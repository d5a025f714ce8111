pub mod client;

pub use client::McpClient;

use serde_json::Value;

/// Decoded payload of a single tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    /// Inner `text` decoded as JSON.
    Data(Value),
    /// Inner `text` that was not valid JSON, passed through untouched.
    Raw(String),
    /// Transport, envelope or remote error. The string is for logs only.
    Failed(String),
}

impl ToolResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, ToolResult::Failed(_))
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            ToolResult::Data(value) => Some(value),
            _ => None,
        }
    }
}

/// Anything that can answer named tool calls and report its own health.
/// Implemented by [`McpClient`]; the pipeline only depends on this seam.
#[async_trait::async_trait]
pub trait ToolSource: Send + Sync {
    async fn call_tool(&self, name: &str, arguments: Option<Value>) -> ToolResult;

    async fn health_check(&self) -> bool;
}
