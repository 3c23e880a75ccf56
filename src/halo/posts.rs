//! Post publishing
//!
//! Builds the post resource from a draft, creates it, and moves it to the
//! published state.

use crate::config::PublishFlow;
use crate::error::{validate_content, AppError};
use crate::halo::client::ResourceClient;
use crate::halo::paths::{self, CONTENT};
use crate::halo::records::{PostResource, PublishedPost, UserResource};
use crate::halo::slug;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

/// Characters of content copied into an auto-generated excerpt
const EXCERPT_CHARS: usize = 500;

const UNTITLED: &str = "Untitled";

/// Caller-authored post, consumed by a single publish call
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub slug: Option<String>,
    pub raw_content: String,
    pub excerpt: Option<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

impl PostDraft {
    /// Caller slug if it survives sanitizing, otherwise one derived from the title
    pub fn resolved_slug(&self) -> String {
        self.slug
            .as_deref()
            .and_then(slug::sanitize)
            .unwrap_or_else(|| slug::derive(&self.title))
    }

    fn title_or_default(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() {
            UNTITLED
        } else {
            title
        }
    }

    fn excerpt_json(&self) -> Value {
        match self.excerpt.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(excerpt) => json!({"autoGenerate": false, "raw": excerpt}),
            None => {
                let raw = &self.raw_content;
                let excerpt = if raw.chars().count() > EXCERPT_CHARS {
                    format!("{}...", raw.chars().take(EXCERPT_CHARS).collect::<String>())
                } else {
                    raw.clone()
                };
                json!({"autoGenerate": true, "raw": excerpt})
            }
        }
    }

    /// Post `spec` shared by both create paths
    fn post_spec(&self, slug: &str, owner: &str, publish: bool) -> Map<String, Value> {
        let mut spec = Map::new();
        spec.insert("title".into(), json!(self.title_or_default()));
        spec.insert("slug".into(), json!(slug));
        spec.insert("visible".into(), json!("PUBLIC"));
        spec.insert("allowComment".into(), json!(true));
        spec.insert("excerpt".into(), self.excerpt_json());
        spec.insert("publish".into(), json!(publish));
        spec.insert("deleted".into(), json!(false));
        spec.insert("pinned".into(), json!(false));
        spec.insert("priority".into(), json!(0));
        spec.insert("template".into(), json!(""));
        spec.insert("owner".into(), json!(owner));
        if !self.categories.is_empty() {
            spec.insert("categories".into(), json!(self.categories));
        }
        if !self.tags.is_empty() {
            spec.insert("tags".into(), json!(self.tags));
        }
        spec
    }

    fn post_object(spec: Map<String, Value>, slug: &str) -> Value {
        json!({
            "apiVersion": CONTENT.api_version(),
            "kind": "Post",
            "metadata": {"name": slug, "labels": {}},
            "spec": spec,
        })
    }

    /// Console draft body: content and post wrapped together
    pub fn draft_payload(&self, slug: &str, owner: &str) -> Value {
        let spec = self.post_spec(slug, owner, false);
        json!({
            "content": {
                "raw": self.raw_content,
                "content": self.raw_content,
                "rawType": "MARKDOWN",
                "version": 0,
            },
            "post": Self::post_object(spec, slug),
        })
    }

    /// Single-resource body for the content API
    pub fn content_payload(&self, slug: &str, owner: &str, publish: bool) -> Value {
        let mut spec = self.post_spec(slug, owner, publish);
        spec.insert("raw".into(), json!(self.raw_content));
        spec.insert("originalContent".into(), json!(self.raw_content));
        Self::post_object(spec, slug)
    }
}

pub struct PostPublisher {
    client: ResourceClient,
    owner: Option<String>,
    flow: PublishFlow,
}

impl PostPublisher {
    pub fn new(client: ResourceClient, owner: Option<String>, flow: PublishFlow) -> Self {
        Self { client, owner, flow }
    }

    /// Create and publish a post.
    ///
    /// Not idempotent: repeating a call with the same explicit slug fails
    /// with `Conflict`.
    pub async fn publish(&self, draft: PostDraft) -> Result<PublishedPost, AppError> {
        validate_content("content", &draft.raw_content)?;

        let slug = draft.resolved_slug();
        let owner = self.resolve_owner().await?;
        info!("Publishing post '{}' as {} (owner {})", draft.title, slug, owner);

        let created = match self.flow {
            PublishFlow::DraftThenPublish => self.create_draft(&draft, &slug, &owner).await?,
            PublishFlow::Atomic => {
                self.client
                    .create(&paths::content_posts(), draft.content_payload(&slug, &owner, true))
                    .await?
            }
        };
        let created = PostResource::from_value(created)?;
        let name = created.metadata.name.clone();
        debug!("Created post resource {}", name);

        let post = match self.flow {
            PublishFlow::DraftThenPublish => {
                let path = paths::post_publish(&name, created.head_snapshot());
                let published = self.client.update(&path, None).await.map_err(|e| {
                    e.context(format!("post {} was created as a draft but publishing failed", name))
                })?;
                if published.is_null() {
                    created
                } else {
                    PostResource::from_value(published)?
                }
            }
            PublishFlow::Atomic => created,
        };

        let slug = post.spec.slug.clone().unwrap_or(slug);
        let permalink = match post.status.permalink.as_deref().filter(|p| !p.is_empty()) {
            Some(link) => self.client.credential().absolute_url(link),
            None => self
                .client
                .credential()
                .absolute_url(&format!("/archives/{}", slug)),
        };
        let status = post
            .status
            .phase
            .clone()
            .filter(|p| !p.is_empty() && p != "DRAFT")
            .unwrap_or_else(|| "PUBLISHED".to_string());

        info!("Published post {} at {}", name, permalink);
        Ok(PublishedPost {
            id: name,
            slug,
            permalink,
            status,
        })
    }

    /// Console draft create, falling back to the content API when the console is not mounted
    async fn create_draft(&self, draft: &PostDraft, slug: &str, owner: &str) -> Result<Value, AppError> {
        match self
            .client
            .create(&paths::console_posts(), draft.draft_payload(slug, owner))
            .await
        {
            Err(AppError::NotFound(detail)) => {
                warn!("Console draft API unavailable ({}), using content API", detail);
                self.client
                    .create(&paths::content_posts(), draft.content_payload(slug, owner, false))
                    .await
            }
            other => other,
        }
    }

    /// Configured owner, or the user behind the token
    async fn resolve_owner(&self) -> Result<String, AppError> {
        if let Some(owner) = &self.owner {
            return Ok(owner.clone());
        }

        let mut last_error = None;
        let mut backend_error = None;
        for path in paths::current_user_candidates() {
            match self.client.get::<UserResource>(&path, "user").await {
                Ok(user) => {
                    if let Some(name) = user.username() {
                        debug!("Resolved post owner {} from {}", name, path);
                        return Ok(name);
                    }
                }
                Err(e @ AppError::Unreachable(_)) => return Err(e),
                Err(e @ (AppError::Unauthorized(_) | AppError::NotFound(_))) => {
                    debug!("Owner lookup via {} failed: {}", path, e);
                    last_error = Some(e);
                }
                Err(e) => {
                    debug!("Owner lookup via {} failed: {}", path, e);
                    backend_error.get_or_insert(e);
                }
            }
        }

        // Only an auth-shaped failure means the token has no usable owner
        if let Some(e) = backend_error {
            return Err(e.context("could not determine the post owner"));
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no username in response".to_string());
        Err(AppError::Unauthorized(format!(
            "could not determine the post owner from the token ({}); set `owner` in the config",
            reason
        )))
    }
}
