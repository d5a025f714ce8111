use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::Instrument;

use super::{ToolResult, ToolSource};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::telemetry::metrics::{
    MCP_HEALTH_FAILURES, MCP_TOOL_CALLS, MCP_TOOL_DURATION, MCP_TOOL_ERRORS,
};

const JSONRPC_VERSION: &str = "2.0";
const TOOLS_CALL_METHOD: &str = "tools/call";

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    params: ToolParams<'a>,
    id: u64,
}

#[derive(Serialize)]
struct ToolParams<'a> {
    name: &'a str,
    arguments: &'a Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    error: Option<Value>,
    result: Option<ToolCallResult>,
}

#[derive(Deserialize)]
struct ToolCallResult {
    content: Option<Vec<ContentItem>>,
}

#[derive(Deserialize)]
struct ContentItem {
    text: Option<String>,
}

pub struct McpClient {
    http: reqwest::Client,
    url: String,
    health_url: String,
    call_timeout: Duration,
    health_timeout: Duration,
    next_id: AtomicU64,
}

impl McpClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pelangi-daily-report/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            url: config.mcp_url.clone(),
            health_url: config.mcp_health_url.clone(),
            call_timeout: config.mcp_timeout,
            health_timeout: config.health_timeout,
            next_id: AtomicU64::new(0),
        })
    }

    /// Calls a tool and never fails: every error becomes [`ToolResult::Failed`].
    pub async fn call_tool(&self, name: &str, arguments: Option<Value>) -> ToolResult {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let arguments = arguments.unwrap_or_else(|| Value::Object(Map::new()));
        let start = Instant::now();

        let span = tracing::info_span!(
            "mcp.tool_call",
            mcp.tool = %name,
            rpc.id = id,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        let result = match self
            .send_call(id, name, &arguments)
            .instrument(span.clone())
            .await
        {
            Ok(result) => result,
            Err(err) => {
                span.record("error.type", err.kind());
                ToolResult::Failed(err.to_string())
            }
        };

        let tool_kv = KeyValue::new("mcp.tool", name.to_string());
        MCP_TOOL_CALLS.add(1, &[tool_kv.clone()]);
        MCP_TOOL_DURATION.record(start.elapsed().as_secs_f64(), &[tool_kv.clone()]);

        if let ToolResult::Failed(reason) = &result {
            span.record("otel.status_code", "ERROR");
            MCP_TOOL_ERRORS.add(1, &[tool_kv]);
            tracing::warn!(tool = %name, error = %reason, "MCP tool call failed");
        } else {
            span.record("otel.status_code", "OK");
            tracing::debug!(tool = %name, "MCP tool call succeeded");
        }

        result
    }

    async fn send_call(&self, id: u64, name: &str, arguments: &Value) -> AppResult<ToolResult> {
        let request = RpcRequest {
            jsonrpc: JSONRPC_VERSION,
            method: TOOLS_CALL_METHOD,
            params: ToolParams { name, arguments },
            id,
        };

        let response = self
            .http
            .post(&self.url)
            .timeout(self.call_timeout)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        decode_envelope(&body)
    }

    /// Lightweight GET against the health endpoint; true only on HTTP 200.
    pub async fn health_check(&self) -> bool {
        let result = self
            .http
            .get(&self.health_url)
            .timeout(self.health_timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status() == StatusCode::OK => true,
            Ok(response) => {
                MCP_HEALTH_FAILURES.add(1, &[KeyValue::new("reason", "status")]);
                tracing::debug!(
                    url = %self.health_url,
                    status = response.status().as_u16(),
                    "Health probe returned non-200 status"
                );
                false
            }
            Err(err) => {
                MCP_HEALTH_FAILURES.add(1, &[KeyValue::new("reason", "transport")]);
                tracing::debug!(url = %self.health_url, error = %err, "Health probe failed");
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl ToolSource for McpClient {
    async fn call_tool(&self, name: &str, arguments: Option<Value>) -> ToolResult {
        McpClient::call_tool(self, name, arguments).await
    }

    async fn health_check(&self) -> bool {
        McpClient::health_check(self).await
    }
}

/// Unwraps `result.content[0].text` and decodes it a second time.
fn decode_envelope(body: &str) -> AppResult<ToolResult> {
    let envelope: RpcResponse = serde_json::from_str(body)?;

    if let Some(error) = envelope.error {
        return Err(AppError::Rpc(error.to_string()));
    }

    let content = envelope
        .result
        .and_then(|r| r.content)
        .ok_or_else(|| AppError::Rpc("response carries no result content".into()))?;

    let first = content
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Rpc("response content is empty".into()))?;

    let text = first.text.unwrap_or_else(|| "{}".to_string());

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) if map.contains_key("error") => {
            let detail = map.get("error").map(Value::to_string).unwrap_or_default();
            Err(AppError::Rpc(format!("tool reported error: {detail}")))
        }
        Ok(value) => Ok(ToolResult::Data(value)),
        Err(_) => Ok(ToolResult::Raw(text)),
    }
}
