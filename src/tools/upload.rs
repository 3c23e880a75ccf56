//! Upload tool implementation
//!
//! Implements the `upload_blog_image(source_url, storage_policy?)` MCP tool

use crate::cli::UploadArgs;
use crate::error::AppError;
use crate::halo::Halo;
use crate::mcp::ToolResult;
use crate::tools::registry::{parse_args, ToolEntry, ToolFuture};
use schemars::schema_for;
use serde_json::Value;
use std::sync::Arc;

pub const NAME: &str = "upload_blog_image";

pub fn entry() -> ToolEntry {
    ToolEntry::new(
        NAME,
        "Download an image from a URL and store it in the blog's media library; returns the public URL",
        || schema_for!(UploadArgs),
        handle,
    )
}

fn handle(halo: Arc<Halo>, args: Value) -> ToolFuture {
    Box::pin(handle_upload(halo, args))
}

async fn handle_upload(halo: Arc<Halo>, args: Value) -> Result<ToolResult, AppError> {
    let upload_args: UploadArgs = parse_args(args)?;
    execute_upload(&halo, upload_args).await
}

/// Execute upload tool (shared implementation for MCP and CLI)
pub async fn execute_upload(halo: &Halo, args: UploadArgs) -> Result<ToolResult, AppError> {
    let policy = halo.storage_policy(args.storage_policy.as_deref());
    let attachment = halo.uploader.upload(&args.source_url, policy).await?;

    let markdown = format!(
        "![image]({url})\n\nUploaded as {} with storage policy `{}`: {url}",
        attachment.inferred_content_type,
        attachment.storage_policy,
        url = attachment.public_url
    );
    Ok(ToolResult::text(markdown).with_structured(serde_json::to_value(&attachment)?))
}
