//! MCP server implementation.
//!
//! Wraps a `ToolRegistry` and exposes its tools over the MCP protocol.
//! `initialize`, `ping` and `tools/list` are answered inline; every
//! `tools/call` runs in its own task and its response comes back through a
//! channel to the loop that owns the transport, so responses can leave out
//! of request order.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinError;

use semdoc_tool_runtime::{Tool, ToolContext, ToolRegistry};

use crate::error::McpError;
use crate::transport::McpTransport;
use crate::types::*;

/// Finished tool calls waiting to be written out.
const RESPONSE_QUEUE: usize = 64;

/// MCP server that bridges a `ToolRegistry` to MCP clients.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    context: Arc<ToolContext>,
    server_name: String,
    server_version: String,
    initialized: bool,
}

/// A validated `tools/call` ready to execute.
struct PreparedCall {
    id: RpcId,
    tool: Arc<dyn Tool>,
    arguments: Value,
}

impl McpServer {
    /// Create a new MCP server over the given tools and their services.
    pub fn new(registry: ToolRegistry, context: ToolContext) -> Self {
        Self {
            registry: Arc::new(registry),
            context: Arc::new(context),
            server_name: "semdoc-mcp".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            initialized: false,
        }
    }

    /// Set the server name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Whether a client has completed `initialize`.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the server loop, reading from and writing to the transport.
    ///
    /// Processes JSON-RPC requests until the transport is closed, then waits
    /// for in-flight tool calls and writes whatever responses still can be.
    pub async fn run<T: McpTransport>(&mut self, transport: &mut T) -> Result<(), McpError> {
        tracing::info!(server = %self.server_name, tools = self.registry.len(), "MCP server starting");

        let (tx, mut rx) = mpsc::channel::<JsonRpcResponse>(RESPONSE_QUEUE);

        loop {
            tokio::select! {
                Some(response) = rx.recv() => {
                    send_response(transport, &response).await?;
                }
                line = transport.receive() => {
                    let Some(line) = line? else {
                        tracing::info!("Transport closed, shutting down");
                        break;
                    };
                    if let Some(response) = self.handle_line(&line, &tx).await {
                        send_response(transport, &response).await?;
                    }
                }
            }
        }

        drop(tx);
        while let Some(response) = rx.recv().await {
            if let Err(e) = send_response(transport, &response).await {
                tracing::debug!(error = %e, "Dropping response after transport closed");
            }
        }

        Ok(())
    }

    /// Parse one incoming line. Returns the response to write inline, if any;
    /// tool calls are spawned and answer through `tx`.
    async fn handle_line(
        &mut self,
        line: &str,
        tx: &mpsc::Sender<JsonRpcResponse>,
    ) -> Option<JsonRpcResponse> {
        tracing::debug!(message = %line, "Received message");

        // Distinguish requests (have "id") from notifications (no "id")
        // by parsing as generic Value first.
        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse JSON");
                return Some(protocol_error(RpcId::Number(0), McpError::JsonParse(e)));
            }
        };

        if raw.get("id").is_none() {
            match serde_json::from_value::<JsonRpcNotification>(raw) {
                Ok(notif) => self.handle_notification(&notif),
                Err(e) => tracing::debug!(error = %e, "Ignoring malformed notification"),
            }
            return None;
        }

        let request: JsonRpcRequest = match serde_json::from_value(raw) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse JSON-RPC request");
                return Some(protocol_error(
                    RpcId::Number(0),
                    McpError::InvalidRequest(e.to_string()),
                ));
            }
        };

        if request.method != "tools/call" {
            return Some(self.handle_request(&request).await);
        }

        match self.prepare_call(&request) {
            Ok(call) => {
                let tx = tx.clone();
                let context = self.context.clone();
                tokio::spawn(async move {
                    let response = execute_call(call, context).await;
                    // Only fails once the loop has stopped listening.
                    let _ = tx.send(response).await;
                });
                None
            }
            Err(response) => Some(response),
        }
    }

    /// Handle a single JSON-RPC request and produce a response.
    ///
    /// `tools/call` is executed inline here; the `run` loop spawns it instead.
    pub async fn handle_request(&mut self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id, &request.params),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => match self.prepare_call(request) {
                Ok(call) => execute_call(call, self.context.clone()).await,
                Err(response) => response,
            },
            method => {
                tracing::warn!(method = %method, "Unknown method");
                protocol_error(id, McpError::MethodNotFound(method.to_string()))
            }
        }
    }

    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" => {
                tracing::info!("Client confirmed initialization");
            }
            "notifications/cancelled" => {
                tracing::debug!("Client cancelled a request");
            }
            method => {
                tracing::debug!(method = %method, "Unknown notification, ignoring");
            }
        }
    }

    fn handle_initialize(&mut self, id: RpcId, params: &Option<Value>) -> JsonRpcResponse {
        match params
            .clone()
            .map(serde_json::from_value::<InitializeParams>)
        {
            Some(Ok(p)) => tracing::info!(
                client = %p.client_info.name,
                client_version = ?p.client_info.version,
                protocol = %p.protocol_version,
                "Handling initialize"
            ),
            _ => tracing::info!("Handling initialize"),
        }
        self.initialized = true;

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: Some(self.server_version.clone()),
            },
        };

        success(id, result)
    }

    fn handle_list_tools(&self, id: RpcId) -> JsonRpcResponse {
        tracing::debug!("Handling tools/list");

        let tools: Vec<ToolInfo> = self.registry.list().into_iter().map(ToolInfo::from).collect();
        success(id, ListToolsResult { tools })
    }

    /// Validate `tools/call` params and look the tool up.
    fn prepare_call(&self, request: &JsonRpcRequest) -> Result<PreparedCall, JsonRpcResponse> {
        let id = request.id.clone();

        let Some(params) = &request.params else {
            return Err(protocol_error(id, McpError::InvalidParams("missing params".to_string())));
        };

        let call_params: CallToolParams = serde_json::from_value(params.clone())
            .map_err(|e| protocol_error(id.clone(), McpError::InvalidParams(e.to_string())))?;

        let Some(tool) = self.registry.get(&call_params.name) else {
            tracing::warn!(tool = %call_params.name, "Unknown tool");
            return Err(protocol_error(id, McpError::ToolNotFound(call_params.name)));
        };

        Ok(PreparedCall {
            id,
            tool,
            arguments: call_params.arguments,
        })
    }
}

/// Run a tool to completion and wrap its outcome as a `tools/call` response.
///
/// The tool runs in a task of its own so a panic is caught as a `JoinError`
/// and reported as an error result.
async fn execute_call(call: PreparedCall, context: Arc<ToolContext>) -> JsonRpcResponse {
    let PreparedCall { id, tool, arguments } = call;
    let name = tool.definition().name;
    let started = Instant::now();

    tracing::debug!(tool = %name, "Handling tools/call");

    let outcome = tokio::spawn(async move { tool.execute(arguments, &context).await }).await;

    let result = match outcome {
        Ok(Ok(tool_result)) => CallToolResult::from(tool_result),
        Ok(Err(e)) => {
            tracing::warn!(tool = %name, error = %e, "Tool call failed");
            CallToolResult::error(e.to_string())
        }
        Err(e) => {
            let reason = panic_reason(e);
            tracing::error!(tool = %name, reason = %reason, "Tool task panicked");
            CallToolResult::error(format!("Tool '{name}' failed unexpectedly: {reason}"))
        }
    };

    tracing::info!(
        tool = %name,
        is_error = result.is_error,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Tool call finished"
    );

    success(id, result)
}

fn panic_reason(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn success(id: RpcId, result: impl Serialize) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(val) => JsonRpcResponse::success(id, val),
        Err(e) => protocol_error(id, McpError::JsonParse(e)),
    }
}

fn protocol_error(id: RpcId, err: McpError) -> JsonRpcResponse {
    let rpc = err.to_rpc_error();
    JsonRpcResponse::error(id, rpc.code, rpc.message)
}

async fn send_response<T: McpTransport>(
    transport: &mut T,
    response: &JsonRpcResponse,
) -> Result<(), McpError> {
    let json = serde_json::to_string(response)?;
    tracing::debug!(response = %json, "Sending response");
    transport.send(&json).await
}

#[cfg(test)]
mod tests;
