//! MCP stdio server: JSON-RPC framing over stdin/stdout.
//!
//! Each registered operation is exposed as its own MCP tool; `tools/list` is
//! generated from the registry's schemas and `tools/call` runs through the
//! dispatch gateway. Tool failures are reported inside the tool result
//! envelope, not as JSON-RPC errors, so callers always see the normalized
//! success/error shape.

use std::io::{BufRead, BufReader, Write};

use crossterm::{queue, style};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ServerError;
use crate::gateway::{DispatchGateway, ToolInvocationRequest};
use crate::MAX_TOOL_RESPONSE_SIZE;

type ServerResult<T> = std::result::Result<T, ServerError>;

/// JSON-RPC message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// MCP server wrapping a [`DispatchGateway`].
pub struct McpServer {
    gateway: DispatchGateway,
}

impl McpServer {
    pub fn new(gateway: DispatchGateway) -> Self {
        Self { gateway }
    }

    pub async fn run(&self) -> ServerResult<()> {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        let reader = BufReader::new(stdin.lock());
        self.run_on(reader, &mut stdout).await
    }

    /// Serve JSON-RPC messages line by line from `reader`, writing responses
    /// to `writer`. Split out from [`Self::run`] so tests can drive the
    /// server with in-memory buffers.
    pub async fn run_on<R: BufRead, W: Write>(
        &self,
        reader: R,
        writer: &mut W,
    ) -> ServerResult<()> {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let message: JsonRpcMessage = serde_json::from_str(&line)?;
            if let Some(response) = self.handle_message(message).await? {
                let response_str = serde_json::to_string(&response)?;
                writeln!(writer, "{}", response_str)?;
                writer.flush()?;
            }
        }
        Ok(())
    }

    async fn handle_message(&self, message: JsonRpcMessage) -> ServerResult<Option<JsonRpcResponse>> {
        match message {
            JsonRpcMessage::Request(request) => Ok(Some(self.handle_request(request).await?)),
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(notification);
                Ok(None)
            }
            // We don't send requests, so we shouldn't receive responses
            JsonRpcMessage::Response(_) => Ok(None),
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> ServerResult<JsonRpcResponse> {
        match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize(request)),
            "tools/list" => Ok(self.handle_tools_list(request)),
            "tools/call" => self.handle_tool_call(request).await,
            _ => Ok(JsonRpcResponse::failure(
                request.id,
                -32601, // Method not found
                format!("Method '{}' not found", request.method),
            )),
        }
    }

    fn handle_initialize(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let capabilities = json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION")
            }
        });
        JsonRpcResponse::success(request.id, capabilities)
    }

    fn handle_tools_list(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let tools: Vec<Value> = self
            .gateway
            .registry()
            .descriptors()
            .iter()
            .map(|descriptor| {
                json!({
                    "name": descriptor.name,
                    "description": descriptor.description,
                    "inputSchema": descriptor.schema.to_json_schema(),
                })
            })
            .collect();
        JsonRpcResponse::success(request.id, json!({ "tools": tools }))
    }

    async fn handle_tool_call(&self, request: JsonRpcRequest) -> ServerResult<JsonRpcResponse> {
        let params = request
            .params
            .ok_or_else(|| ServerError::InvalidRequest("Missing params for tools/call".to_string()))?;

        let tool_call: ToolCall = serde_json::from_value(params)?;

        let arguments = match tool_call.arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Ok(JsonRpcResponse::failure(
                    request.id,
                    -32602, // Invalid params
                    format!("Tool arguments must be an object, got {other}"),
                ));
            }
        };

        let invocation = ToolInvocationRequest {
            operation: tool_call.name,
            arguments,
        };

        // Human-readable description of what is about to run
        let mut description_output = Vec::new();
        if let Err(e) = queue_description(&invocation, &mut description_output) {
            tracing::warn!("Failed to generate invocation description: {}", e);
        }
        let description = String::from_utf8(description_output).unwrap_or_default();

        let result = self.gateway.dispatch(&invocation).await;

        let rendered = serde_json::to_string(&result)?;
        let rendered = if rendered.len() > MAX_TOOL_RESPONSE_SIZE {
            let mut end = MAX_TOOL_RESPONSE_SIZE;
            while !rendered.is_char_boundary(end) {
                end -= 1;
            }
            format!("{} ... truncated", &rendered[..end])
        } else {
            rendered
        };

        let tool_result = json!({
            "content": [{
                "type": "text",
                "text": format!("{}\n\nResult:\n{}", description, rendered)
            }],
            "isError": !result.success
        });

        Ok(JsonRpcResponse::success(request.id, tool_result))
    }

    fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            // Client is done initializing, requests may start flowing
            "notifications/initialized" => {}
            other => tracing::debug!("ignoring notification '{}'", other),
        }
    }
}

/// Render a human-readable description of a tool invocation.
pub fn queue_description(
    request: &ToolInvocationRequest,
    updates: &mut impl Write,
) -> eyre::Result<()> {
    queue!(
        updates,
        style::Print("Running AWS operation:\n\n"),
        style::Print(format!("Operation: {}\n", request.operation)),
    )?;
    if !request.arguments.is_empty() {
        queue!(updates, style::Print("Arguments:\n".to_string()))?;
        for (name, value) in &request.arguments {
            match value {
                Value::String(s) if s.is_empty() => {
                    queue!(updates, style::Print(format!("- {}\n", name)))?;
                }
                _ => {
                    queue!(updates, style::Print(format!("- {}: {}\n", name, value)))?;
                }
            }
        }
    }
    Ok(())
}
