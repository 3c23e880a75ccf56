//! Halo blog backend access
//!
//! Each component owns a clone of one [`ResourceClient`]; none of them hold
//! mutable state, so the aggregate can be shared across concurrent tool calls.

pub mod attachments;
pub mod client;
pub mod comments;
pub mod media;
pub mod paths;
pub mod posts;
pub mod records;
pub mod replies;
pub mod retry;
pub mod slug;

use crate::config::Config;
use crate::error::AppError;

pub use attachments::AttachmentUploader;
pub use client::ResourceClient;
pub use comments::CommentReader;
pub use posts::{PostDraft, PostPublisher};
pub use replies::ReplyDispatcher;

/// All backend components, wired from one configuration
pub struct Halo {
    pub publisher: PostPublisher,
    pub comments: CommentReader,
    pub replies: ReplyDispatcher,
    pub uploader: AttachmentUploader,
    pub default_storage_policy: String,
}

impl Halo {
    /// Validate the credential and build every component.
    ///
    /// Fails with `ValidationError` before any network call if the base URL or
    /// token is missing.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let credential = config.credential()?;
        let client = ResourceClient::new(credential, config.request_timeout(), config.retry_policy())?;
        let fetch = crate::http::fetch_client(config.fetch_timeout())?;

        Ok(Self {
            publisher: PostPublisher::new(
                client.clone(),
                config.configured_owner().map(str::to_string),
                config.publish_flow,
            ),
            comments: CommentReader::new(client.clone()),
            replies: ReplyDispatcher::new(client.clone()),
            uploader: AttachmentUploader::new(
                client,
                fetch,
                config.max_image_bytes,
                config.attachment_group.trim().to_string(),
            ),
            default_storage_policy: config.default_storage_policy.clone(),
        })
    }

    /// Requested policy, or the configured default when blank
    pub fn storage_policy<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.default_storage_policy)
    }
}
