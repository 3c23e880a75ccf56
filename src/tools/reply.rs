//! Reply tool implementation
//!
//! Implements the `reply_blog_comment(target_hint, content)` MCP tool

use crate::cli::ReplyArgs;
use crate::error::AppError;
use crate::halo::Halo;
use crate::mcp::ToolResult;
use crate::tools::registry::{parse_args, ToolEntry, ToolFuture};
use schemars::schema_for;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub const NAME: &str = "reply_blog_comment";

pub fn entry() -> ToolEntry {
    ToolEntry::new(
        NAME,
        "Reply to a blog comment, given its id or the author's display name (newest matching comment wins)",
        || schema_for!(ReplyArgs),
        handle,
    )
}

fn handle(halo: Arc<Halo>, args: Value) -> ToolFuture {
    Box::pin(handle_reply(halo, args))
}

async fn handle_reply(halo: Arc<Halo>, args: Value) -> Result<ToolResult, AppError> {
    let reply_args: ReplyArgs = parse_args(args)?;
    execute_reply(&halo, reply_args).await
}

/// Execute reply tool (shared implementation for MCP and CLI)
pub async fn execute_reply(halo: &Halo, args: ReplyArgs) -> Result<ToolResult, AppError> {
    let confirmation = halo.replies.reply(&args.target_hint, &args.content).await?;
    info!(
        "Reply request completed for comment {}",
        confirmation.parent_comment_id
    );

    let mut markdown = format!(
        "Replied to comment `{}` on post `{}`",
        confirmation.parent_comment_id, confirmation.post_id
    );
    if let Some(reply_id) = &confirmation.reply_id {
        markdown.push_str(&format!(" (reply `{}`)", reply_id));
    }
    Ok(ToolResult::text(markdown).with_structured(serde_json::to_value(&confirmation)?))
}
