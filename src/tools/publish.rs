//! Publish tool implementation
//!
//! Implements the `publish_blog_post(title, content, slug?)` MCP tool

use crate::cli::PublishArgs;
use crate::error::AppError;
use crate::halo::{Halo, PostDraft};
use crate::mcp::ToolResult;
use crate::tools::registry::{parse_args, ToolEntry, ToolFuture};
use schemars::schema_for;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub const NAME: &str = "publish_blog_post";

pub fn entry() -> ToolEntry {
    ToolEntry::new(
        NAME,
        "Publish a Markdown blog post and return its permalink",
        || schema_for!(PublishArgs),
        handle,
    )
}

fn handle(halo: Arc<Halo>, args: Value) -> ToolFuture {
    Box::pin(handle_publish(halo, args))
}

async fn handle_publish(halo: Arc<Halo>, args: Value) -> Result<ToolResult, AppError> {
    let publish_args: PublishArgs = parse_args(args)?;
    execute_publish(&halo, publish_args).await
}

/// Execute publish tool (shared implementation for MCP and CLI)
pub async fn execute_publish(halo: &Halo, args: PublishArgs) -> Result<ToolResult, AppError> {
    let title = args.title.trim().to_string();
    let draft = PostDraft {
        title: title.clone(),
        slug: args.slug,
        raw_content: args.content,
        excerpt: args.excerpt,
        categories: args.categories,
        tags: args.tags,
    };

    let post = halo.publisher.publish(draft).await?;
    info!("Publish request completed: {}", post.permalink);

    let markdown = format!(
        "# Published\n\n**{}** is live at {}\n\n- id: `{}`\n- slug: `{}`\n- status: {}\n",
        if title.is_empty() { "Untitled" } else { &title },
        post.permalink,
        post.id,
        post.slug,
        post.status
    );
    Ok(ToolResult::text(markdown).with_structured(serde_json::to_value(&post)?))
}
