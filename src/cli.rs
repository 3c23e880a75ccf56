//! CLI mode implementation
//!
//! Provides the command-line interface. Tool argument structs double as the
//! MCP input schemas.

use crate::config::ConfigOverrides;
use clap::{Args, Parser, Subcommand};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Halo blog manager
#[derive(Parser, Debug)]
#[command(name = "halo-manager")]
#[command(about = "Publish posts, read and answer comments, and upload images on a Halo blog", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output (no short flag to avoid conflicts)
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Backend connection settings, layered over the config file
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Blog base URL (e.g. https://blog.example.com)
    #[arg(long, global = true, env = "HALO_URL")]
    pub url: Option<String>,

    /// Personal access token
    #[arg(long, global = true, env = "HALO_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Default storage policy for uploads
    #[arg(long, global = true, env = "HALO_STORAGE_POLICY")]
    pub storage_policy: Option<String>,

    /// Post owner username (resolved from the token when omitted)
    #[arg(long, global = true, env = "HALO_OWNER")]
    pub owner: Option<String>,

    /// Path to the JSON config file
    #[arg(long, global = true, env = "HALO_CONFIG")]
    pub config: Option<PathBuf>,
}

impl ConnectionArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            base_url: self.url.clone(),
            token: self.token.clone(),
            storage_policy: self.storage_policy.clone(),
            owner: self.owner.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the MCP server on stdio (default when no command is given)
    Serve,
    /// Publish a new blog post
    Publish(PublishArgs),
    /// List recent comments
    Comments(CommentsArgs),
    /// Reply to a comment by id or author name
    Reply(ReplyArgs),
    /// Upload an image from a URL to the media library
    Upload(UploadArgs),
    /// Print the tool registry with input schemas
    Tools,
}

/// publish_blog_post arguments
#[derive(Parser, JsonSchema, Deserialize, Serialize, Clone, Debug)]
pub struct PublishArgs {
    /// Post title
    #[arg(short = 't', long)]
    #[schemars(description = "Post title")]
    pub title: String,

    /// Post body in Markdown
    #[arg(short = 'c', long)]
    #[schemars(description = "Post body in Markdown")]
    pub content: String,

    /// URL slug; derived from the title when omitted
    #[arg(short = 's', long)]
    #[serde(default)]
    #[schemars(description = "URL slug; derived from the title when omitted")]
    pub slug: Option<String>,

    /// Summary shown in listings; generated from the content when omitted
    #[arg(short = 'e', long)]
    #[serde(default)]
    pub excerpt: Option<String>,

    /// Category resource names
    #[arg(long, value_delimiter = ',')]
    #[serde(default)]
    pub categories: Vec<String>,

    /// Tag resource names
    #[arg(long, value_delimiter = ',')]
    #[serde(default)]
    pub tags: Vec<String>,
}

/// get_blog_comments arguments
#[derive(Parser, JsonSchema, Deserialize, Serialize, Clone, Debug, Default)]
pub struct CommentsArgs {
    /// Post resource name; omit for site-wide comments
    #[arg(short = 'p', long)]
    #[serde(default)]
    #[schemars(description = "Post resource name; omit for site-wide comments")]
    pub post_id: Option<String>,

    /// Maximum number of comments (default 5, max 100)
    #[arg(short = 'l', long)]
    #[serde(default)]
    #[schemars(description = "Maximum number of comments (default 5, max 100)")]
    pub limit: Option<usize>,
}

/// reply_blog_comment arguments
#[derive(Parser, JsonSchema, Deserialize, Serialize, Clone, Debug)]
pub struct ReplyArgs {
    /// Comment id, or the display name of the comment's author
    #[arg(short = 'r', long)]
    #[schemars(description = "Comment id, or the display name of the comment's author")]
    pub target_hint: String,

    /// Reply text
    #[arg(short = 'c', long)]
    #[schemars(description = "Reply text")]
    pub content: String,
}

/// upload_blog_image arguments
#[derive(Parser, JsonSchema, Deserialize, Serialize, Clone, Debug)]
pub struct UploadArgs {
    /// http(s) URL of the image to upload
    #[arg(short = 'u', long)]
    #[schemars(description = "http(s) URL of the image to upload")]
    pub source_url: String,

    /// Storage policy name (default "default")
    #[arg(short = 'p', long = "policy")]
    #[serde(default)]
    #[schemars(description = "Storage policy name (default \"default\")")]
    pub storage_policy: Option<String>,
}
