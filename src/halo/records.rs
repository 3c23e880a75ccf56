//! Typed records for Halo extension resources
//!
//! Every response is parsed into one of these shapes at the client boundary;
//! a body that does not fit is reported as a server error.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name used when a comment owner carries no display name
pub const ANONYMOUS: &str = "Anonymous";

/// Standard extension metadata
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: Option<i64>,
}

/// Paged list wrapper returned by list endpoints
#[derive(Debug, Deserialize)]
pub struct ListResult<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Post resource as returned by create and publish calls
#[derive(Debug, Clone, Deserialize)]
pub struct PostResource {
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: PostSpecView,
    #[serde(default)]
    pub status: PostStatusView,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PostSpecView {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub head_snapshot: Option<String>,
    #[serde(default)]
    pub release_snapshot: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PostStatusView {
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub head_snapshot: Option<String>,
    #[serde(default)]
    pub release_snapshot: Option<String>,
}

impl PostResource {
    /// Parse a create/publish response.
    ///
    /// Console draft responses may wrap the post under a `post` key.
    pub fn from_value(value: Value) -> Result<Self, AppError> {
        let inner = match value {
            Value::Object(mut map) if map.get("post").map_or(false, Value::is_object) => {
                map.remove("post").unwrap_or(Value::Null)
            }
            other => other,
        };
        let post: PostResource = parse(inner, "post")?;
        if post.metadata.name.is_empty() {
            return Err(AppError::ServerError(
                "post response has no metadata.name".to_string(),
            ));
        }
        Ok(post)
    }

    /// Content snapshot to publish, if the backend reported one
    pub fn head_snapshot(&self) -> Option<&str> {
        [
            self.status.head_snapshot.as_deref(),
            self.spec.head_snapshot.as_deref(),
            self.status.release_snapshot.as_deref(),
            self.spec.release_snapshot.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
    }
}

/// A post after the publish flow completed
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PublishedPost {
    pub id: String,
    pub slug: String,
    pub permalink: String,
    pub status: String,
}

/// Comment resource as stored by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct CommentResource {
    pub metadata: Metadata,
    pub spec: CommentSpecView,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSpecView {
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub owner: Option<CommentOwner>,
    pub subject_ref: SubjectRef,
    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentOwner {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Reference from a comment to the subject it belongs to
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubjectRef {
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    pub name: String,
}

/// Read-only projection of a comment
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_display_name: String,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<CommentResource> for Comment {
    fn from(res: CommentResource) -> Self {
        let author_display_name = res
            .spec
            .owner
            .as_ref()
            .and_then(|o| o.display_name.as_deref().or(o.name.as_deref()))
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(ANONYMOUS)
            .to_string();
        let content = res
            .spec
            .content
            .filter(|c| !c.is_empty())
            .or(res.spec.raw)
            .unwrap_or_default();
        Comment {
            id: res.metadata.name,
            post_id: res.spec.subject_ref.name,
            author_display_name,
            content,
            created_at: res.spec.creation_time.or(res.metadata.creation_timestamp),
        }
    }
}

/// Reply resource returned by the reply endpoint
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ReplyResource {
    #[serde(default)]
    pub metadata: Metadata,
}

/// Confirmation returned after a reply was accepted
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReplyConfirmation {
    pub reply_id: Option<String>,
    pub parent_comment_id: String,
    pub post_id: String,
}

/// Attachment resource returned by the upload endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentResource {
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: AttachmentSpecView,
    #[serde(default)]
    pub status: AttachmentStatusView,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentSpecView {
    #[serde(default)]
    pub permalink: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AttachmentStatusView {
    #[serde(default)]
    pub permalink: Option<String>,
}

impl AttachmentResource {
    pub fn permalink(&self) -> Option<&str> {
        self.status
            .permalink
            .as_deref()
            .or(self.spec.permalink.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Uploaded image as seen by the caller
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Attachment {
    pub source_url: String,
    pub inferred_content_type: String,
    pub storage_policy: String,
    pub public_url: String,
}

/// User record from the current-user endpoints.
///
/// The console variant wraps the user under a `user` key.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UserResource {
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub spec: Option<UserSpecView>,
    #[serde(default)]
    pub user: Option<Box<UserResource>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserSpecView {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl UserResource {
    /// Username usable as a post owner
    pub fn username(&self) -> Option<String> {
        if let Some(inner) = &self.user {
            if let Some(name) = inner.username() {
                return Some(name);
            }
        }
        let spec = self.spec.as_ref();
        [
            self.metadata.as_ref().map(|m| m.name.as_str()),
            spec.and_then(|s| s.username.as_deref()),
            spec.and_then(|s| s.display_name.as_deref()),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty() && *s != "anonymousUser")
        .map(str::to_string)
    }
}

/// Deserialize a JSON body into a typed record
pub fn parse<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, AppError> {
    serde_json::from_value(value)
        .map_err(|e| AppError::ServerError(format!("unrecognized {} response: {}", what, e)))
}
