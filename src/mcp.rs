//! MCP (Model Context Protocol) handling module
//!
//! This module implements the JSON-RPC 2.0 protocol for MCP communication.
//! Tool calls run concurrently; responses are written as they complete.

use crate::halo::Halo;
use crate::tools::registry::ToolRegistry;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader as AsyncBufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

const PROTOCOL_VERSION: &str = "2024-11-05";

/// MCP JSON-RPC 2.0 request structure
#[derive(Debug, Deserialize)]
pub struct McpRequest {
    /// JSON-RPC version field - required by spec but not accessed in code
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

/// Initialize request parameters
#[derive(Debug, Deserialize)]
pub struct InitializeParams {
    #[serde(rename = "clientInfo")]
    pub client_info: Option<ClientInfo>,
}

/// Client information
#[derive(Debug, Deserialize, Clone)]
pub struct ClientInfo {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// MCP JSON-RPC 2.0 response structure
#[derive(Debug, Serialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

/// MCP Error structure
#[derive(Debug, Serialize)]
pub struct McpError {
    pub code: String,
    pub message: String,
}

/// MCP Tool call arguments
#[derive(Debug, Deserialize)]
pub struct ToolCallArgs {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// MCP Content item
#[derive(Debug, Serialize)]
pub struct ContentItem {
    pub r#type: String,
    pub text: String,
}

/// MCP Tool result
#[derive(Debug, Serialize)]
pub struct ToolResult {
    pub content: Vec<ContentItem>,
    #[serde(rename = "structuredContent", skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

impl McpResponse {
    /// Create a successful response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: &str, message: &str) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(McpError {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }
}

impl ToolResult {
    /// Create a text result
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(content)],
            structured_content: None,
        }
    }

    /// Attach the typed output alongside the text
    pub fn with_structured(mut self, value: Value) -> Self {
        self.structured_content = Some(value);
        self
    }

    /// Text of the first content item
    pub fn first_text(&self) -> &str {
        self.content.first().map(|c| c.text.as_str()).unwrap_or_default()
    }
}

impl ContentItem {
    /// Helper to create plain text content
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            r#type: "text".to_string(),
            text: content.into(),
        }
    }
}

/// Parse MCP request from JSON string
pub fn parse_request(json: &str) -> Result<McpRequest> {
    let request: McpRequest = serde_json::from_str(json)?;
    Ok(request)
}

/// Serialize MCP response to JSON string
pub fn serialize_response(response: &McpResponse) -> Result<String> {
    Ok(serde_json::to_string(response)?)
}

/// Handle stdio MCP communication
pub async fn handle_stdio(halo: Arc<Halo>) -> Result<()> {
    info!("Starting halo-manager MCP server on stdio");

    let registry = Arc::new(ToolRegistry::new());
    let stdin = tokio::io::stdin();
    let mut reader = AsyncBufReader::new(stdin).lines();

    // Single writer so concurrent tool calls never interleave output lines
    let (tx, mut rx) = mpsc::unbounded_channel::<McpResponse>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(response) = rx.recv().await {
            let response_json = serialize_response(&response)?;
            debug!("Sending response: {}", response_json);
            stdout.write_all(response_json.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<(), anyhow::Error>(())
    });

    while let Some(line) = reader.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        debug!("Received request: {}", line);

        let request = match parse_request(&line) {
            Ok(request) => request,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let _ = tx.send(McpResponse::error(
                    None,
                    "parse_error",
                    &format!("Invalid JSON: {}", e),
                ));
                continue;
            }
        };

        if request.id.is_none() {
            debug!("Notification {} accepted", request.method);
            continue;
        }

        if request.method == "initialize" {
            let _ = tx.send(handle_initialize(request, &registry));
            continue;
        }

        let registry = Arc::clone(&registry);
        let halo = Arc::clone(&halo);
        let tx = tx.clone();
        tokio::spawn(async move {
            let response = handle_request(request, &registry, halo).await;
            let _ = tx.send(response);
        });
    }

    debug!("stdin closed, draining pending responses");
    drop(tx);
    writer.await??;
    Ok(())
}

/// Handle a single MCP request other than `initialize`
async fn handle_request(request: McpRequest, registry: &ToolRegistry, halo: Arc<Halo>) -> McpResponse {
    match request.method.as_str() {
        "tools/call" => handle_tool_call(request, registry, halo).await,
        "tools/list" => handle_tools_list(request, registry),
        "ping" => McpResponse::success(request.id, serde_json::json!({})),
        _ => McpResponse::error(
            request.id,
            "method_not_found",
            &format!("Method '{}' not found", request.method),
        ),
    }
}

/// Handle tools/call method
async fn handle_tool_call(request: McpRequest, registry: &ToolRegistry, halo: Arc<Halo>) -> McpResponse {
    let args: ToolCallArgs = match serde_json::from_value(request.params.unwrap_or_default()) {
        Ok(args) => args,
        Err(e) => {
            return McpResponse::error(
                request.id,
                "invalid_params",
                &format!("Invalid parameters: {}", e),
            )
        }
    };

    let Some(tool) = registry.get(&args.name) else {
        return McpResponse::error(
            request.id,
            "tool_not_found",
            &format!("Tool '{}' not found", args.name),
        );
    };

    match tool.call(halo, args.arguments).await {
        Ok(result) => match serde_json::to_value(result) {
            Ok(value) => McpResponse::success(request.id, value),
            Err(e) => McpResponse::error(request.id, "internal_error", &e.to_string()),
        },
        Err(e) => {
            info!("Tool {} failed: {}", tool.name, e);
            McpResponse::error(request.id, e.error_code(), &e.message())
        }
    }
}

/// Handle tools/list method
fn handle_tools_list(request: McpRequest, registry: &ToolRegistry) -> McpResponse {
    McpResponse::success(request.id, serde_json::json!({ "tools": registry.list() }))
}

/// Handle initialize method
fn handle_initialize(request: McpRequest, registry: &ToolRegistry) -> McpResponse {
    let client_info = request
        .params
        .and_then(|params| serde_json::from_value::<InitializeParams>(params).ok())
        .and_then(|init| init.client_info);
    match client_info {
        Some(client) => info!(
            "Initialized by {} {}",
            client.name.as_deref().unwrap_or("unknown client"),
            client.version.as_deref().unwrap_or("")
        ),
        None => info!("Initialized by unknown client"),
    }

    let result = serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "serverInfo": {
            "name": "halo-manager",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "tools": registry.list()
    });
    McpResponse::success(request.id, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::halo::test_support::config_for;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(id: i64, method: &str, params: Option<Value>) -> McpRequest {
        McpRequest {
            jsonrpc: "2.0".into(),
            id: Some(json!(id)),
            method: method.into(),
            params,
        }
    }

    fn halo_for(server: &MockServer) -> Arc<Halo> {
        Arc::new(Halo::from_config(&config_for(server)).unwrap())
    }

    #[test]
    fn test_initialize_response_contains_fields() {
        let params = json!({"clientInfo": {"name": "orchestrator", "version": "1.0"}});
        let resp = handle_initialize(request(1, "initialize", Some(params)), &ToolRegistry::new());
        assert!(resp.error.is_none());

        let result = resp.result.expect("result present");
        assert_eq!(result["serverInfo"]["name"], "halo-manager");
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["tools"].as_array().map(Vec::len), Some(4));
    }

    #[tokio::test]
    async fn test_tools_list_contains_all_tools() {
        let server = MockServer::start().await;
        let resp = handle_request(request(2, "tools/list", None), &ToolRegistry::new(), halo_for(&server)).await;
        let result = resp.result.expect("result present");
        let names: Vec<&str> = result["tools"]
            .as_array()
            .expect("tools array")
            .iter()
            .filter_map(|t| t["name"].as_str())
            .collect();
        assert!(names.contains(&"publish_blog_post"));
        assert!(names.contains(&"get_blog_comments"));
        assert!(names.contains(&"reply_blog_comment"));
        assert!(names.contains(&"upload_blog_image"));
    }

    #[tokio::test]
    async fn test_unknown_method_and_tool() {
        let server = MockServer::start().await;
        let registry = ToolRegistry::new();

        let resp = handle_request(request(3, "resources/list", None), &registry, halo_for(&server)).await;
        assert_eq!(resp.error.unwrap().code, "method_not_found");

        let params = json!({"name": "delete_blog", "arguments": {}});
        let resp = handle_request(request(4, "tools/call", Some(params)), &registry, halo_for(&server)).await;
        assert_eq!(resp.error.unwrap().code, "tool_not_found");
    }

    #[tokio::test]
    async fn test_tool_error_maps_to_code_and_hint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let params = json!({"name": "get_blog_comments", "arguments": {"limit": 2}});
        let resp = handle_request(request(5, "tools/call", Some(params)), &ToolRegistry::new(), halo_for(&server)).await;
        let err = resp.error.expect("error present");
        assert_eq!(err.code, "unauthorized");
        assert!(err.message.contains("check your token"));
    }

    #[tokio::test]
    async fn test_tool_result_serializes_structured_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(&server)
            .await;

        let params = json!({"name": "get_blog_comments", "arguments": {}});
        let resp = handle_request(request(6, "tools/call", Some(params)), &ToolRegistry::new(), halo_for(&server)).await;
        let result = resp.result.expect("result present");
        assert_eq!(result["content"][0]["type"], "text");
        assert_eq!(result["structuredContent"]["comments"], json!([]));
    }

    #[tokio::test]
    async fn test_ping() {
        let server = MockServer::start().await;
        let resp = handle_request(request(7, "ping", None), &ToolRegistry::new(), halo_for(&server)).await;
        assert_eq!(resp.result, Some(json!({})));
    }

    #[test]
    fn test_parse_notification_has_no_id() {
        let req = parse_request(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(req.id.is_none());
    }
}
