//! MCP Streamable HTTP transport: one POST per JSON-RPC message, session pinned by
//! the server's `MCP-Session-Id` response header.

use std::sync::Mutex;

use async_trait::async_trait;
use mcp_core::{ErrorObject, MessageId, NotificationMessage, RequestMessage, ResultMessage};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ToolSourceError;
use crate::model::MCPServer;

use super::{ToolCallContent, ToolSource, ToolSpec};

const MCP_PROTOCOL_VERSION: &str = "2025-11-25";
const INITIALIZE_REQUEST_ID: &str = "chatcore-mcp-initialize";

#[derive(Debug, Deserialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    id: Option<MessageId>,
    result: Option<Value>,
    error: Option<JsonRpcErrorBody>,
}

/// Parses a JSON-RPC response body, whether `application/json` or `text/event-stream`.
fn parse_json_rpc_from_body(
    body: &str,
    content_type: Option<&reqwest::header::HeaderValue>,
) -> Result<JsonRpcResponse, ToolSourceError> {
    let is_sse = content_type
        .and_then(|v| v.to_str().ok())
        .map(|s| s.contains("text/event-stream"))
        .unwrap_or(false);

    if !is_sse {
        return serde_json::from_str(body)
            .map_err(|e| ToolSourceError::Transport(format!("response json: {e}")));
    }

    let mut data_buffer = String::new();
    for line in body.lines() {
        if let Some(data) = line.strip_prefix("data: ") {
            if data == "[DONE]" || data.is_empty() {
                data_buffer.clear();
                continue;
            }
            if data_buffer.is_empty() {
                data_buffer = data.to_string();
            } else {
                data_buffer.push('\n');
                data_buffer.push_str(data);
            }
        } else if line.trim().is_empty() && !data_buffer.is_empty() {
            if let Ok(r) = serde_json::from_str::<JsonRpcResponse>(&data_buffer) {
                if r.result.is_some() || r.error.is_some() {
                    return Ok(r);
                }
            }
            data_buffer.clear();
        }
        if let Ok(r) = serde_json::from_str::<JsonRpcResponse>(&data_buffer) {
            if r.result.is_some() || r.error.is_some() {
                return Ok(r);
            }
        }
    }
    Err(ToolSourceError::Transport(
        "SSE stream: no JSON-RPC response found".into(),
    ))
}

/// Tool source for one MCP server, reached over Streamable HTTP.
pub struct McpToolSource {
    client: Client,
    url: String,
    api_key: Option<String>,
    session_id: Mutex<Option<String>>,
}

impl McpToolSource {
    /// Connects to the MCP server's endpoint and runs the `initialize` handshake.
    pub async fn connect(server: &MCPServer) -> Result<Self, ToolSourceError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        let source = McpToolSource {
            client,
            url: server.endpoint.clone(),
            api_key: server.api_key.clone(),
            session_id: Mutex::new(None),
        };
        source.initialize().await?;
        Ok(source)
    }

    fn apply_common_headers(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req = req
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream")
            .header("MCP-Protocol-Version", MCP_PROTOCOL_VERSION);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }
        if let Some(sid) = self.session_id.lock().unwrap().clone() {
            req = req.header("MCP-Session-Id", sid);
        }
        req
    }

    async fn initialize(&self) -> Result<(), ToolSourceError> {
        let params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "clientInfo": { "name": "chatcore", "version": env!("CARGO_PKG_VERSION") }
        });
        let request = RequestMessage::new(INITIALIZE_REQUEST_ID, "initialize", params);
        let body =
            serde_json::to_vec(&request).map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        let req = self.apply_common_headers(self.client.post(&self.url)).body(body);
        let resp = req.send().await.map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        let status = resp.status();
        if let Some(sid) = resp
            .headers()
            .get("MCP-Session-Id")
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.lock().unwrap() = Some(sid.to_string());
        }
        if status == reqwest::StatusCode::ACCEPTED {
            return self.notify_initialized().await;
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ToolSourceError::Transport(format!(
                "initialize HTTP {status}: {}",
                if text.is_empty() { "no body" } else { &text }
            )));
        }
        let content_type = resp.headers().get("content-type").cloned();
        let text = resp
            .text()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("initialize body: {e}")))?;
        parse_json_rpc_from_body(&text, content_type.as_ref())?;
        self.notify_initialized().await
    }

    async fn notify_initialized(&self) -> Result<(), ToolSourceError> {
        let notification = NotificationMessage::new("notifications/initialized", Some(json!({})));
        let body = serde_json::to_vec(&notification)
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        let req = self.apply_common_headers(self.client.post(&self.url)).body(body);
        let resp = req.send().await.map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        let status = resp.status();
        if status != reqwest::StatusCode::ACCEPTED && !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ToolSourceError::Transport(format!(
                "notifications/initialized HTTP {status}: {text}"
            )));
        }
        Ok(())
    }

    async fn request(&self, id: &str, method: &str, params: Value) -> Result<ResultMessage, ToolSourceError> {
        let request = RequestMessage::new(id, method, params);
        let body =
            serde_json::to_vec(&request).map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        let req = self.apply_common_headers(self.client.post(&self.url)).body(body);
        let resp = req.send().await.map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ToolSourceError::Transport(format!("{method} HTTP {status}: {text}")));
        }
        let content_type = resp.headers().get("content-type").cloned();
        let text = resp.text().await.map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        let parsed = parse_json_rpc_from_body(&text, content_type.as_ref())?;
        let msg_id = parsed.id.unwrap_or_else(|| MessageId::from(id));
        if let Some(err) = parsed.error {
            return Ok(ResultMessage::failure(
                msg_id,
                ErrorObject::new(err.code as i32, err.message, None),
            ));
        }
        Ok(ResultMessage::success(msg_id, parsed.result.unwrap_or(Value::Null)))
    }
}

#[async_trait]
impl ToolSource for McpToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        let result = self
            .request("chatcore-tools-list", "tools/list", Value::Object(serde_json::Map::new()))
            .await?;
        if let Some(err) = result.error {
            return Err(ToolSourceError::Transport(err.message));
        }
        let tools = result
            .result
            .and_then(|r| r.get("tools").cloned())
            .ok_or_else(|| ToolSourceError::Transport("no tools in response".into()))?;
        let tools = tools
            .as_array()
            .ok_or_else(|| ToolSourceError::Transport("tools not an array".into()))?;
        let mut specs = Vec::with_capacity(tools.len());
        for t in tools {
            let obj = t
                .as_object()
                .ok_or_else(|| ToolSourceError::Transport("tool item not an object".into()))?;
            specs.push(ToolSpec {
                name: obj.get("name").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                description: obj.get("description").and_then(|v| v.as_str()).map(String::from),
                input_schema: obj
                    .get("inputSchema")
                    .cloned()
                    .unwrap_or(Value::Object(serde_json::Map::new())),
            });
        }
        Ok(specs)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallContent, ToolSourceError> {
        let id = format!("chatcore-call-{name}");
        let params = json!({ "name": name, "arguments": arguments });
        let result = self.request(&id, "tools/call", params).await?;
        if let Some(err) = result.error {
            return Err(ToolSourceError::ToolError(err.message));
        }
        let result = result
            .result
            .ok_or_else(|| ToolSourceError::Transport("no result in tools/call response".into()))?;
        if result.get("isError").and_then(|v| v.as_bool()).unwrap_or(false) {
            let msg = result
                .get("content")
                .and_then(|c| c.as_array())
                .and_then(|a| a.first())
                .and_then(|b| b.get("text").and_then(|t| t.as_str()))
                .unwrap_or("tool returned an error")
                .to_string();
            return Err(ToolSourceError::ToolError(msg));
        }
        let mut text_parts = Vec::new();
        if let Some(content) = result.get("content").and_then(|c| c.as_array()) {
            for block in content {
                if block.get("type").and_then(|t| t.as_str()) == Some("text") {
                    if let Some(t) = block.get("text").and_then(|v| v.as_str()) {
                        text_parts.push(t);
                    }
                }
            }
        }
        let mut text = text_parts.join("\n").trim().to_string();
        if text.is_empty() {
            if let Some(structured) = result.get("structuredContent") {
                text = serde_json::to_string(structured).unwrap_or_default();
            }
        }
        if text.is_empty() {
            return Err(ToolSourceError::Transport(
                "no text or structuredContent in tools/call response".into(),
            ));
        }
        Ok(ToolCallContent { text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    async fn read_http_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut tmp = [0u8; 1024];
        loop {
            let n = stream.read(&mut tmp).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&tmp[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..pos + 4]).to_string();
                let content_length = headers
                    .lines()
                    .find_map(|line| {
                        line.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .and_then(|v| v.trim().parse::<usize>().ok())
                    })
                    .unwrap_or(0);
                let mut body = buf[pos + 4..].to_vec();
                while body.len() < content_length {
                    let m = stream.read(&mut tmp).await.unwrap();
                    if m == 0 {
                        break;
                    }
                    body.extend_from_slice(&tmp[..m]);
                }
                return String::from_utf8_lossy(&body[..content_length]).to_string();
            }
        }
        String::new()
    }

    async fn write_response(stream: &mut TcpStream, status: &str, headers: &[(&str, &str)], body: &str) {
        let mut resp = format!("HTTP/1.1 {status}\r\nConnection: close\r\n");
        for (k, v) in headers {
            resp.push_str(&format!("{k}: {v}\r\n"));
        }
        resp.push_str(&format!("Content-Length: {}\r\n\r\n{}", body.len(), body));
        stream.write_all(resp.as_bytes()).await.unwrap();
    }

    #[tokio::test]
    async fn list_and_call_round_trip_over_http() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            for _ in 0..4 {
                let (mut stream, _) = listener.accept().await.unwrap();
                let body = read_http_request(&mut stream).await;
                let json: Value = serde_json::from_str(&body).unwrap();
                match json.get("method").and_then(|m| m.as_str()).unwrap() {
                    "initialize" => {
                        let resp = json!({
                            "jsonrpc": "2.0",
                            "id": "chatcore-mcp-initialize",
                            "result": { "protocolVersion": MCP_PROTOCOL_VERSION }
                        })
                        .to_string();
                        write_response(
                            &mut stream,
                            "200 OK",
                            &[("Content-Type", "application/json"), ("MCP-Session-Id", "s1")],
                            &resp,
                        )
                        .await;
                    }
                    "notifications/initialized" => {
                        write_response(&mut stream, "202 Accepted", &[], "").await;
                    }
                    "tools/list" => {
                        let resp = json!({
                            "jsonrpc": "2.0",
                            "id": "chatcore-tools-list",
                            "result": { "tools": [{"name": "search", "description": "search the web", "inputSchema": {"type": "object"}}] }
                        })
                        .to_string();
                        write_response(&mut stream, "200 OK", &[("Content-Type", "application/json")], &resp).await;
                    }
                    "tools/call" => {
                        let resp = json!({
                            "jsonrpc": "2.0",
                            "id": "chatcore-call-search",
                            "result": { "content": [{"type": "text", "text": "found it"}] }
                        })
                        .to_string();
                        write_response(&mut stream, "200 OK", &[("Content-Type", "application/json")], &resp).await;
                    }
                    other => panic!("unexpected method {other}"),
                }
            }
        });

        let source = McpToolSource::connect(&MCPServer {
            id: "srv1".into(),
            name: "test".into(),
            endpoint: format!("http://{addr}"),
            api_key: None,
            user: "alice".into(),
        })
        .await
        .unwrap();

        let tools = source.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "search");

        let out = source.call_tool("search", json!({"q": "rust"})).await.unwrap();
        assert_eq!(out.text, "found it");
        server.await.unwrap();
    }
}
