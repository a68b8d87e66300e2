use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use semdoc_tool_runtime::testing::{
    context, document, unavailable_context, FakeEmbedder, FakeLlm, FakeStore, PanicTool,
};
use semdoc_tool_runtime::{ToolDefinition, ToolError, ToolResult};

use super::*;
use crate::transport::ChannelTransport;

fn fake_context() -> ToolContext {
    context(
        Arc::new(FakeEmbedder::new(8)),
        Arc::new(FakeStore::new().with_matches(vec![document("Resume", "Rust and Go.", 0.9)])),
        Arc::new(FakeLlm::new("grounded answer")),
    )
}

fn server() -> McpServer {
    let mut registry = ToolRegistry::with_builtin_tools().unwrap();
    registry.register(PanicTool).unwrap();
    McpServer::new(registry, fake_context())
}

fn call(id: i64, name: &str, arguments: Value) -> JsonRpcRequest {
    JsonRpcRequest::new(
        RpcId::Number(id),
        "tools/call",
        Some(json!({ "name": name, "arguments": arguments })),
    )
}

fn call_result(resp: JsonRpcResponse) -> CallToolResult {
    assert!(resp.error.is_none(), "unexpected error: {:?}", resp.error);
    serde_json::from_value(resp.result.unwrap()).unwrap()
}

/// Blocks until `gate` is notified, then answers "released".
struct GateTool {
    gate: Arc<Notify>,
}

#[async_trait]
impl Tool for GateTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "gate".to_string(),
            description: "Waits for the test to release it.".to_string(),
            input_schema: json!({ "type": "object" }),
        }
    }

    async fn execute(&self, _input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        self.gate.notified().await;
        Ok(ToolResult::text("released"))
    }
}

async fn send(client: &mut ChannelTransport, message: Value) {
    client.send(&message.to_string()).await.unwrap();
}

async fn next_response(client: &mut ChannelTransport) -> JsonRpcResponse {
    let line = client.receive().await.unwrap().unwrap();
    serde_json::from_str(&line).unwrap()
}

#[tokio::test]
async fn test_handle_initialize() {
    let mut server = server().with_name("docs");
    assert!(!server.is_initialized());

    let req = JsonRpcRequest::new(
        RpcId::Number(1),
        "initialize",
        Some(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {"name": "test-client"}
        })),
    );

    let resp = server.handle_request(&req).await;
    assert!(resp.error.is_none());
    let result: InitializeResult = serde_json::from_value(resp.result.unwrap()).unwrap();
    assert_eq!(result.protocol_version, PROTOCOL_VERSION);
    assert_eq!(result.server_info.name, "docs");
    assert!(result.capabilities.tools.is_some());
    assert!(server.is_initialized());
}

#[tokio::test]
async fn test_ping() {
    let resp = server()
        .handle_request(&JsonRpcRequest::new(RpcId::String("p".into()), "ping", None))
        .await;
    assert_eq!(resp.id, RpcId::String("p".into()));
    assert_eq!(resp.result, Some(json!({})));
}

#[tokio::test]
async fn test_handle_list_tools() {
    let registry = ToolRegistry::with_builtin_tools().unwrap();
    let mut server = McpServer::new(registry, fake_context());
    let resp = server
        .handle_request(&JsonRpcRequest::new(RpcId::Number(2), "tools/list", None))
        .await;

    let result: ListToolsResult = serde_json::from_value(resp.result.unwrap()).unwrap();
    let names: Vec<&str> = result.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["generate_embedding", "generate_response", "search_documents", "store_document"]
    );
    assert_eq!(result.tools[2].input_schema["required"], json!(["query"]));
}

#[tokio::test]
async fn test_call_search_documents() {
    let resp = server()
        .handle_request(&call(3, "search_documents", json!({ "query": "languages" })))
        .await;
    let result = call_result(resp);
    assert!(!result.is_error);
    assert!(result.text().starts_with("Found 1 similar documents:"));
    assert!(result.text().contains("**Resume**"));
}

#[tokio::test]
async fn test_call_generate_response() {
    let resp = server()
        .handle_request(&call(4, "generate_response", json!({ "query": "languages?" })))
        .await;
    assert_eq!(call_result(resp).text(), "grounded answer");
}

#[tokio::test]
async fn test_tool_failure_is_error_result_not_rpc_error() {
    let registry = ToolRegistry::with_builtin_tools().unwrap();
    let mut server = McpServer::new(registry, unavailable_context());

    let resp = server
        .handle_request(&call(5, "generate_embedding", json!({ "text": "hola" })))
        .await;
    let result = call_result(resp);
    assert!(result.is_error);
    assert_eq!(result.text(), "embedder is not configured: GEMINI_API_KEY is not set");
}

#[tokio::test]
async fn test_invalid_arguments_are_error_results() {
    let resp = server()
        .handle_request(&call(6, "store_document", json!({ "chunk_size": 10 })))
        .await;
    let result = call_result(resp);
    assert!(result.is_error);
    assert!(result.text().starts_with("Invalid input:"));
}

#[tokio::test]
async fn test_panicking_tool_becomes_error_result() {
    let resp = server().handle_request(&call(7, "panic", json!({}))).await;
    let result = call_result(resp);
    assert!(result.is_error);
    assert!(result.text().contains("tool exploded"));
}

#[tokio::test]
async fn test_handle_call_tool_not_found() {
    let resp = server().handle_request(&call(8, "nonexistent", json!({}))).await;
    assert_eq!(resp.error.unwrap().code, error_codes::INVALID_PARAMS);
}

#[tokio::test]
async fn test_handle_call_tool_missing_params() {
    let resp = server()
        .handle_request(&JsonRpcRequest::new(RpcId::Number(9), "tools/call", None))
        .await;
    assert_eq!(resp.error.unwrap().code, error_codes::INVALID_PARAMS);
}

#[tokio::test]
async fn test_handle_unknown_method() {
    let resp = server()
        .handle_request(&JsonRpcRequest::new(RpcId::Number(10), "resources/list", None))
        .await;
    assert_eq!(resp.error.unwrap().code, error_codes::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn test_server_run_with_channel_transport() {
    let (mut client, mut server_side) = ChannelTransport::pair();
    let mut server = server();
    let handle = tokio::spawn(async move { server.run(&mut server_side).await });

    send(
        &mut client,
        json!({
            "jsonrpc": "2.0", "id": 1, "method": "initialize",
            "params": { "protocolVersion": PROTOCOL_VERSION, "capabilities": {}, "clientInfo": { "name": "t" } }
        }),
    )
    .await;
    assert!(next_response(&mut client).await.error.is_none());

    // Notifications get no response; the next line answers the call below.
    send(&mut client, json!({ "jsonrpc": "2.0", "method": "notifications/initialized" })).await;

    send(
        &mut client,
        json!({
            "jsonrpc": "2.0", "id": 2, "method": "tools/call",
            "params": { "name": "generate_embedding", "arguments": { "text": "hola" } }
        }),
    )
    .await;
    let resp = next_response(&mut client).await;
    assert_eq!(resp.id, RpcId::Number(2));
    assert!(call_result(resp).text().contains("- Dimensions: 8"));

    client.send("{not json").await.unwrap();
    let resp = next_response(&mut client).await;
    assert_eq!(resp.error.unwrap().code, error_codes::PARSE_ERROR);

    send(&mut client, json!({ "jsonrpc": "2.0", "id": 3 })).await;
    let resp = next_response(&mut client).await;
    assert_eq!(resp.error.unwrap().code, error_codes::INVALID_REQUEST);

    drop(client);
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_slow_tool_does_not_block_other_requests() {
    let gate = Arc::new(Notify::new());
    let mut registry = ToolRegistry::with_builtin_tools().unwrap();
    registry.register(GateTool { gate: gate.clone() }).unwrap();
    let mut server = McpServer::new(registry, fake_context());

    let (mut client, mut server_side) = ChannelTransport::pair();
    let handle = tokio::spawn(async move { server.run(&mut server_side).await });

    send(
        &mut client,
        json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": { "name": "gate" } }),
    )
    .await;
    send(&mut client, json!({ "jsonrpc": "2.0", "id": 2, "method": "ping" })).await;

    // The ping overtakes the blocked call.
    assert_eq!(next_response(&mut client).await.id, RpcId::Number(2));

    gate.notify_one();
    let resp = next_response(&mut client).await;
    assert_eq!(resp.id, RpcId::Number(1));
    assert_eq!(call_result(resp).text(), "released");

    drop(client);
    handle.await.unwrap().unwrap();
}
