//! Recent comment listing

use crate::error::AppError;
use crate::halo::client::ResourceClient;
use crate::halo::paths;
use crate::halo::records::{Comment, CommentResource};
use std::iter::Take;
use std::vec::IntoIter;
use tracing::debug;

/// Comments returned when the caller does not ask for a count
pub const DEFAULT_LIMIT: usize = 5;
/// Upper bound on a single listing
pub const MAX_LIMIT: usize = 100;

/// Newest-first comments from one listing call.
///
/// Consumed once; fetching again requires a new `list_recent` call.
#[derive(Debug)]
pub struct RecentComments {
    inner: Take<IntoIter<Comment>>,
}

impl RecentComments {
    fn new(comments: Vec<Comment>, limit: usize) -> Self {
        Self {
            inner: comments.into_iter().take(limit),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }
}

impl Iterator for RecentComments {
    type Item = Comment;

    fn next(&mut self) -> Option<Comment> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for RecentComments {}

pub struct CommentReader {
    client: ResourceClient,
}

impl CommentReader {
    pub fn new(client: ResourceClient) -> Self {
        Self { client }
    }

    /// Up to `limit` comments, most recent first, optionally scoped to a post
    pub async fn list_recent(
        &self,
        post_id: Option<&str>,
        limit: usize,
    ) -> Result<RecentComments, AppError> {
        let limit = limit.min(MAX_LIMIT);
        if limit == 0 {
            return Ok(RecentComments::empty());
        }

        let post_id = post_id.map(str::trim).filter(|p| !p.is_empty());
        let path = paths::comments(post_id, limit);
        let list = self.client.list::<CommentResource>(&path, "comment list").await?;
        debug!(
            "Fetched {} comments (total {:?}) for {}",
            list.items.len(),
            list.total,
            post_id.unwrap_or("all posts")
        );

        let comments = list.items.into_iter().map(Comment::from).collect();
        Ok(RecentComments::new(comments, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::halo::test_support::{client_for, comment_json};
    use serde_json::json;
    use wiremock::matchers::{any, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_limit_one_returns_newest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apis/content.halo.run/v1alpha1/comments"))
            .and(query_param("size", "1"))
            .and(query_param("sort", "metadata.creationTimestamp,desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    comment_json("c-b", "post-1", Some("Bob"), "2024-05-02T10:00:00Z"),
                    comment_json("c-a", "post-1", Some("Alice"), "2024-05-01T10:00:00Z"),
                ],
                "total": 2
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reader = CommentReader::new(client_for(&server));
        let comments: Vec<Comment> = reader.list_recent(None, 1).await.unwrap().collect();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].id, "c-b");
        assert_eq!(comments[0].author_display_name, "Bob");
    }

    #[tokio::test]
    async fn test_scoped_to_post() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param(
                "fieldSelector",
                "spec.subjectRef=Post.content.halo.run/v1alpha1/post-1",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [comment_json("c-1", "post-1", None, "2024-05-02T10:00:00Z")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reader = CommentReader::new(client_for(&server));
        let comments: Vec<Comment> = reader.list_recent(Some("post-1"), 5).await.unwrap().collect();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].post_id, "post-1");
        assert_eq!(comments[0].author_display_name, "Anonymous");
    }

    #[tokio::test]
    async fn test_empty_listing_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [], "total": 0})))
            .mount(&server)
            .await;

        let reader = CommentReader::new(client_for(&server));
        let mut comments = reader.list_recent(None, 5).await.unwrap();
        assert_eq!(comments.len(), 0);
        assert!(comments.next().is_none());
    }

    #[tokio::test]
    async fn test_never_yields_more_than_limit() {
        let server = MockServer::start().await;
        let items: Vec<_> = (0..4)
            .map(|i| comment_json(&format!("c-{}", i), "post-1", Some("A"), "2024-05-01T10:00:00Z"))
            .collect();
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": items })))
            .mount(&server)
            .await;

        let reader = CommentReader::new(client_for(&server));
        assert_eq!(reader.list_recent(None, 2).await.unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_zero_limit_skips_backend() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let reader = CommentReader::new(client_for(&server));
        assert_eq!(reader.list_recent(None, 0).await.unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_listing_is_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": "nope"})))
            .mount(&server)
            .await;

        let reader = CommentReader::new(client_for(&server));
        let err = reader.list_recent(None, 5).await.unwrap_err();
        assert!(matches!(err, AppError::ServerError(_)));
    }
}
