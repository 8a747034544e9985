//! MCP (Model Context Protocol) server implementation
//!
//! Provides a stdio JSON-RPC interface exposing detection and extraction as tools.

mod protocol;
mod tools;

pub use protocol::*;
pub use tools::*;

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::detect::ServiceDetector;
use crate::error::{Error, Result};
use crate::extract::IntentExtractor;

/// MCP Server for Lume
pub struct McpServer {
    tools: ToolHandler,
}

impl McpServer {
    /// Create a new MCP server
    ///
    /// `extractor` is `None` when no text generator could be configured; the
    /// `extract_intent` tool then reports a configuration error.
    pub fn new(
        config: Arc<Config>,
        detector: Arc<ServiceDetector>,
        extractor: Option<Arc<IntentExtractor>>,
    ) -> Self {
        Self {
            tools: ToolHandler::new(config, detector, extractor),
        }
    }

    /// Run the MCP server on stdio
    pub async fn run(&self) -> Result<()> {
        info!("Starting MCP server on stdio");
        let reader = BufReader::new(tokio::io::stdin());
        self.serve(reader, tokio::io::stdout()).await
    }

    /// Serve newline-delimited JSON-RPC until the reader reaches EOF
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let n = reader.read_until(b'\n', &mut buf).await?;

            if n == 0 {
                debug!("Received EOF, shutting down");
                break;
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    warn!("Discarding request that is not valid UTF-8: {}", e);
                    let response = JsonRpcResponse::failure(
                        None,
                        JsonRpcError {
                            code: PARSE_ERROR,
                            message: format!("Parse error: {}", e),
                            data: None,
                        },
                    );
                    write_response(&mut writer, &response).await?;
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            debug!("Received request: {}", line);

            let request: JsonRpcRequest = match serde_json::from_str(line) {
                Ok(r) => r,
                Err(e) => {
                    let response = JsonRpcResponse::failure(
                        None,
                        JsonRpcError {
                            code: PARSE_ERROR,
                            message: format!("Parse error: {}", e),
                            data: None,
                        },
                    );
                    write_response(&mut writer, &response).await?;
                    continue;
                }
            };

            let response = self.handle_request(&request).await;

            if request.is_notification() {
                debug!("Notification {} handled, no response sent", request.method);
                continue;
            }
            write_response(&mut writer, &response).await?;
        }

        Ok(())
    }

    /// Handle a JSON-RPC request
    pub async fn handle_request(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let start = std::time::Instant::now();
        let method = &request.method;

        let request_desc = if method == "tools/call" {
            let tool_name = request
                .params
                .as_ref()
                .and_then(|p| p["name"].as_str())
                .unwrap_or("unknown");
            format!("tools/call:{}", tool_name)
        } else {
            method.clone()
        };

        info!("→ {}", request_desc);

        let result = match method.as_str() {
            "initialize" => Ok(self.handle_initialize()),
            "initialized" | "notifications/initialized" => Ok(Value::Null),
            "ping" => Ok(Value::String("pong".to_string())),
            "tools/list" => Ok(serde_json::json!({ "tools": get_tool_definitions() })),
            "tools/call" => self.handle_tools_call(&request.params).await,
            _ => Err(Error::McpProtocol(format!("Unknown method: {}", method))),
        };

        let elapsed_ms = start.elapsed().as_millis();

        match result {
            Ok(value) => {
                if elapsed_ms > 1000 {
                    warn!("← {} OK ({}ms) SLOW", request_desc, elapsed_ms);
                } else {
                    info!("← {} OK ({}ms)", request_desc, elapsed_ms);
                }
                JsonRpcResponse::success(request.id.clone(), value)
            }
            Err(e) => {
                error!("← {} ERROR ({}ms): {}", request_desc, elapsed_ms, e);
                JsonRpcResponse::failure(request.id.clone(), JsonRpcError::from(&e))
            }
        }
    }

    fn handle_initialize(&self) -> Value {
        serde_json::json!({
            "protocolVersion": "2024-11-05",
            "serverInfo": {
                "name": crate::APP_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": {}
            }
        })
    }

    async fn handle_tools_call(&self, params: &Option<Value>) -> Result<Value> {
        let params = params
            .as_ref()
            .ok_or_else(|| Error::InvalidRequest("Missing params".to_string()))?;

        let name = params["name"]
            .as_str()
            .ok_or_else(|| Error::InvalidRequest("Missing tool name".to_string()))?;

        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or(Value::Object(Default::default()));

        self.tools.execute(name, &arguments).await
    }
}

async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let response_json = serde_json::to_string(response)?;
    debug!("Sending response: {}", response_json);
    writer.write_all(response_json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
