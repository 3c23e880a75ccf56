//! Tool registry
//!
//! Maps each tool name to its description, input schema and handler. Both
//! the MCP server and the CLI go through the same entries.

use crate::error::AppError;
use crate::halo::Halo;
use crate::mcp::ToolResult;
use futures::future::BoxFuture;
use schemars::schema::RootSchema;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// Overall bound on a single tool call
pub const TOOL_TIMEOUT: Duration = Duration::from_secs(120);

pub type ToolFuture = BoxFuture<'static, Result<ToolResult, AppError>>;
pub type ToolHandler = fn(Arc<Halo>, Value) -> ToolFuture;

pub struct ToolEntry {
    pub name: &'static str,
    pub description: &'static str,
    schema: fn() -> RootSchema,
    handler: ToolHandler,
}

impl ToolEntry {
    pub fn new(
        name: &'static str,
        description: &'static str,
        schema: fn() -> RootSchema,
        handler: ToolHandler,
    ) -> Self {
        Self {
            name,
            description,
            schema,
            handler,
        }
    }

    pub fn input_schema(&self) -> Value {
        serde_json::to_value((self.schema)()).unwrap_or_else(|_| json!({"type": "object"}))
    }

    /// Entry as listed by `tools/list`
    pub fn describe(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }

    /// Run the handler under the overall call timeout
    pub async fn call(&self, halo: Arc<Halo>, args: Value) -> Result<ToolResult, AppError> {
        debug!("Calling tool {}", self.name);
        guarded(self.name, (self.handler)(halo, args)).await
    }
}

pub struct ToolRegistry {
    entries: Vec<ToolEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            entries: vec![
                crate::tools::publish::entry(),
                crate::tools::comments::entry(),
                crate::tools::reply::entry(),
                crate::tools::upload::entry(),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn entries(&self) -> &[ToolEntry] {
        &self.entries
    }

    /// Tools array returned from tools/list and initialize
    pub fn list(&self) -> Value {
        Value::Array(self.entries().iter().map(ToolEntry::describe).collect())
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Bound a tool future by [`TOOL_TIMEOUT`], reporting expiry as `Unreachable`
pub async fn guarded<F>(name: &str, fut: F) -> Result<ToolResult, AppError>
where
    F: Future<Output = Result<ToolResult, AppError>>,
{
    match timeout(TOOL_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Tool {} exceeded {:?}", name, TOOL_TIMEOUT);
            Err(AppError::Unreachable(format!(
                "{} exceeded the {} second timeout",
                name,
                TOOL_TIMEOUT.as_secs()
            )))
        }
    }
}

/// Parse tool arguments; missing arguments are read as an empty object
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, AppError> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args)
        .map_err(|e| AppError::ValidationError(format!("Invalid arguments: {}", e)))
}
