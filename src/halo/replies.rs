//! Replying to comments by id or by author name

use crate::error::{validate_content, AppError};
use crate::halo::client::ResourceClient;
use crate::halo::paths;
use crate::halo::records::{parse, Comment, CommentResource, ReplyConfirmation, ReplyResource};
use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Comments scanned when the target is named by author
pub const NAME_SCAN_WINDOW: usize = 50;

/// How a reply target was given
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyTarget {
    CommentId(String),
    AuthorName(String),
}

impl ReplyTarget {
    /// Hints shaped like a comment name are treated as ids, anything else as an author.
    ///
    /// An author hint still matches a scanned comment whose id equals it exactly.
    pub fn parse(hint: &str) -> Result<Self, AppError> {
        static COMMENT_NAME: OnceLock<Regex> = OnceLock::new();
        let comment_name =
            COMMENT_NAME.get_or_init(|| Regex::new(r"^comment-[A-Za-z0-9]+$").expect("static regex"));

        let hint = hint.trim();
        if hint.is_empty() {
            return Err(AppError::ValidationError(
                "reply target cannot be empty".to_string(),
            ));
        }
        if uuid::Uuid::parse_str(hint).is_ok() || comment_name.is_match(hint) {
            Ok(ReplyTarget::CommentId(hint.to_string()))
        } else {
            Ok(ReplyTarget::AuthorName(hint.to_string()))
        }
    }
}

pub struct ReplyDispatcher {
    client: ResourceClient,
}

impl ReplyDispatcher {
    pub fn new(client: ResourceClient) -> Self {
        Self { client }
    }

    /// Resolve the target comment and post a reply under it
    pub async fn reply(&self, target_hint: &str, content: &str) -> Result<ReplyConfirmation, AppError> {
        validate_content("reply content", content)?;
        let target = ReplyTarget::parse(target_hint)?;
        let parent = self.resolve(&target).await?;
        info!(
            "Replying to comment {} by {} on {}",
            parent.id, parent.author_display_name, parent.post_id
        );

        let body = json!({
            "raw": content,
            "content": content,
            "allowNotification": true,
        });
        let created = self
            .client
            .create(&paths::comment_reply(&parent.id), body)
            .await?;

        let reply_id = if created.is_null() {
            None
        } else {
            Some(parse::<ReplyResource>(created, "reply")?.metadata.name)
                .filter(|name| !name.is_empty())
        };

        Ok(ReplyConfirmation {
            reply_id,
            parent_comment_id: parent.id,
            post_id: parent.post_id,
        })
    }

    async fn resolve(&self, target: &ReplyTarget) -> Result<Comment, AppError> {
        match target {
            ReplyTarget::CommentId(id) => {
                let res: CommentResource = self
                    .client
                    .get(&paths::comment(id), "comment")
                    .await
                    .map_err(|e| e.context(format!("comment {}", id)))?;
                Ok(Comment::from(res))
            }
            ReplyTarget::AuthorName(name) => {
                let list = self
                    .client
                    .list::<CommentResource>(&paths::comments(None, NAME_SCAN_WINDOW), "comment list")
                    .await?;
                let mut comments: Vec<Comment> = list.items.into_iter().map(Comment::from).collect();
                debug!("Scanning {} recent comments for author {}", comments.len(), name);
                let exact_id = comments.iter().position(|c| c.id == *name);
                let found = match exact_id {
                    Some(index) => Some(comments.swap_remove(index)),
                    None => newest_by_author(comments, name),
                };
                found.ok_or_else(|| {
                    AppError::NotFound(format!(
                        "no comment with id or author '{}' among the {} most recent",
                        name, NAME_SCAN_WINDOW
                    ))
                })
            }
        }
    }
}

/// Most recent comment whose author matches `name`, ignoring case and surrounding whitespace.
///
/// Among equal timestamps the earlier entry wins, which keeps the backend's newest-first order.
fn newest_by_author(comments: Vec<Comment>, name: &str) -> Option<Comment> {
    let wanted = name.trim().to_lowercase();
    let mut best: Option<Comment> = None;
    for comment in comments {
        if comment.author_display_name.trim().to_lowercase() != wanted {
            continue;
        }
        let newer = match &best {
            None => true,
            Some(current) => comment.created_at > current.created_at,
        };
        if newer {
            best = Some(comment);
        }
    }
    best
}
