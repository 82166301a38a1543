//! JSON-RPC dispatch for the config-management server.

use serde::Serialize;
use serde_json::Value;

use crate::error::McpError;
use crate::tools::ConfigTools;
use crate::transport::McpTransport;
use crate::types::*;

pub struct McpServer {
    tools: ConfigTools,
    server_name: String,
    server_version: String,
}

impl McpServer {
    pub fn new(tools: ConfigTools) -> Self {
        Self {
            tools,
            server_name: "ticketwatch-config".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Serve requests until the transport closes.
    pub async fn run<T: McpTransport>(&mut self, transport: &mut T) -> Result<(), McpError> {
        tracing::info!(
            server = %self.server_name,
            config = %self.tools.store().path().display(),
            "MCP server starting"
        );

        while let Some(line) = transport.receive().await? {
            tracing::debug!(message = %line, "Received message");

            let raw: Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse JSON");
                    let resp = JsonRpcResponse::error(
                        RpcId::Number(0),
                        McpError::JsonParse(e).to_rpc_error(),
                    );
                    transport.send(&serde_json::to_string(&resp)?).await?;
                    continue;
                }
            };

            if raw.get("id").is_none() {
                if let Ok(notif) = serde_json::from_value::<JsonRpcNotification>(raw) {
                    self.handle_notification(&notif);
                }
                continue;
            }

            let response = match serde_json::from_value::<JsonRpcRequest>(raw) {
                Ok(request) => self.handle_request(&request),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse JSON-RPC request");
                    JsonRpcResponse::error(RpcId::Number(0), McpError::JsonParse(e).to_rpc_error())
                }
            };
            let json = serde_json::to_string(&response)?;
            tracing::debug!(response = %json, "Sending response");
            transport.send(&json).await?;
        }

        tracing::info!("Transport closed, shutting down");
        Ok(())
    }

    pub fn handle_request(&mut self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        let result = match request.method.as_str() {
            "initialize" => self.initialize(),
            "tools/list" => to_result(ListToolsResult {
                tools: self.tools.definitions(),
            }),
            "tools/call" => self.call_tool(&request.params),
            method => {
                tracing::warn!(method = %method, "Unknown method");
                Err(McpError::MethodNotFound(method.to_string()))
            }
        };
        match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => JsonRpcResponse::error(id, err.to_rpc_error()),
        }
    }

    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" => tracing::info!("Client confirmed initialization"),
            method => tracing::debug!(method = %method, "Ignoring notification"),
        }
    }

    fn initialize(&self) -> Result<Value, McpError> {
        tracing::info!("Handling initialize");
        to_result(InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: Some(self.server_version.clone()),
            },
        })
    }

    fn call_tool(&self, params: &Option<Value>) -> Result<Value, McpError> {
        let params = params
            .clone()
            .ok_or_else(|| McpError::InvalidParams("missing params".to_string()))?;
        let call: CallToolParams =
            serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))?;
        tracing::info!(tool = %call.name, "Calling tool");

        let arguments = match call.arguments {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let outcome = self.tools.call(&call.name, arguments)?;
        let is_error = outcome.get("success").and_then(Value::as_bool) != Some(true);
        to_result(CallToolResult {
            content: vec![ToolContent::Text {
                text: serde_json::to_string_pretty(&outcome)?,
            }],
            is_error,
        })
    }
}

fn to_result<T: Serialize>(value: T) -> Result<Value, McpError> {
    Ok(serde_json::to_value(value)?)
}
