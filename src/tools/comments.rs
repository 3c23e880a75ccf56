//! Comments tool implementation
//!
//! Implements the `get_blog_comments(post_id?, limit)` MCP tool

use crate::cli::CommentsArgs;
use crate::error::AppError;
use crate::halo::comments::DEFAULT_LIMIT;
use crate::halo::records::Comment;
use crate::halo::Halo;
use crate::mcp::ToolResult;
use crate::tools::format::{blockquote_content, format_timestamp, preview, strip_tags, PREVIEW_CHARS};
use crate::tools::registry::{parse_args, ToolEntry, ToolFuture};
use chrono::{DateTime, Utc};
use schemars::schema_for;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub const NAME: &str = "get_blog_comments";

pub fn entry() -> ToolEntry {
    ToolEntry::new(
        NAME,
        "List the most recent blog comments, newest first, optionally for one post",
        || schema_for!(CommentsArgs),
        handle,
    )
}

/// Comment as returned to callers
#[derive(Debug, Serialize)]
pub struct CommentView {
    pub author: String,
    pub content: String,
    pub id: String,
    pub post_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Comment> for CommentView {
    fn from(c: Comment) -> Self {
        Self {
            author: c.author_display_name,
            content: c.content,
            id: c.id,
            post_id: c.post_id,
            created_at: c.created_at,
        }
    }
}

fn handle(halo: Arc<Halo>, args: Value) -> ToolFuture {
    Box::pin(handle_comments(halo, args))
}

async fn handle_comments(halo: Arc<Halo>, args: Value) -> Result<ToolResult, AppError> {
    let comments_args: CommentsArgs = parse_args(args)?;
    execute_comments(&halo, comments_args).await
}

/// Execute comments tool (shared implementation for MCP and CLI)
pub async fn execute_comments(halo: &Halo, args: CommentsArgs) -> Result<ToolResult, AppError> {
    let limit = args.limit.unwrap_or(DEFAULT_LIMIT);
    let comments: Vec<CommentView> = halo
        .comments
        .list_recent(args.post_id.as_deref(), limit)
        .await?
        .map(CommentView::from)
        .collect();

    let markdown = render_comments(&comments, args.post_id.as_deref());
    Ok(ToolResult::text(markdown).with_structured(json!({ "comments": comments })))
}

fn render_comments(comments: &[CommentView], post_id: Option<&str>) -> String {
    let scope = match post_id {
        Some(post) => format!("on `{}`", post),
        None => "across the blog".to_string(),
    };
    if comments.is_empty() {
        return format!("No comments found {}.", scope);
    }

    let mut markdown = format!("# Recent comments {} ({})\n", scope, comments.len());
    for comment in comments {
        markdown.push_str(&format!(
            "\n**{}** · {} · post `{}` · id `{}`\n{}\n",
            comment.author,
            format_timestamp(comment.created_at.as_ref()),
            comment.post_id,
            comment.id,
            blockquote_content(&preview(&strip_tags(&comment.content), PREVIEW_CHARS))
        ));
    }
    markdown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(id: &str, content: &str) -> CommentView {
        CommentView {
            author: "Alice".to_string(),
            content: content.to_string(),
            id: id.to_string(),
            post_id: "hello-world".to_string(),
            created_at: None,
        }
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_comments(&[], None), "No comments found across the blog.");
        assert_eq!(
            render_comments(&[], Some("p1")),
            "No comments found on `p1`."
        );
    }

    #[test]
    fn test_render_truncates_content() {
        let long = format!("<p>{}</p>", "word ".repeat(30));
        let markdown = render_comments(&[view("c-1", &long)], Some("hello-world"));
        assert!(markdown.contains("**Alice**"));
        assert!(markdown.contains("id `c-1`"));
        assert!(markdown.contains("..."));
        assert!(!markdown.contains("<p>"));
    }
}
