//! Integration tests for tool execution
//!
//! Drive the registry entries against a mock Halo backend, the same way the
//! MCP server and the CLI do.

#[cfg(test)]
mod cli_integration_tests {
    use crate::error::AppError;
    use crate::halo::test_support::{comment_json, config_for};
    use crate::halo::Halo;
    use crate::tools::registry::ToolRegistry;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn halo_for(server: &MockServer) -> Arc<Halo> {
        Arc::new(Halo::from_config(&config_for(server)).unwrap())
    }

    async fn call(server: &MockServer, tool: &str, args: Value) -> Result<crate::mcp::ToolResult, AppError> {
        let registry = ToolRegistry::new();
        registry
            .get(tool)
            .expect("tool registered")
            .call(halo_for(server), args)
            .await
    }

    #[tokio::test]
    async fn test_publish_hello_world() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/apis/api.console.halo.run/v1alpha1/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metadata": {"name": "hello-world"},
                "spec": {"slug": "hello-world", "headSnapshot": "s1"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/apis/api.console.halo.run/v1alpha1/posts/hello-world/publish"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metadata": {"name": "hello-world"},
                "spec": {"slug": "hello-world"},
                "status": {"phase": "PUBLISHED", "permalink": "/archives/hello-world"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = call(
            &server,
            "publish_blog_post",
            json!({"title": "Hello World", "content": "Body"}),
        )
        .await
        .unwrap();

        let structured = result.structured_content.expect("structured output");
        assert_eq!(structured["slug"], "hello-world");
        assert!(structured["permalink"]
            .as_str()
            .unwrap()
            .ends_with("/archives/hello-world"));
        assert!(result.content[0].text.contains("/archives/hello-world"));
    }

    #[tokio::test]
    async fn test_comments_limit_one_returns_newest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apis/content.halo.run/v1alpha1/comments"))
            .and(query_param("size", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    comment_json("c-b", "post-1", Some("B"), "2024-05-02T10:00:00Z"),
                    comment_json("c-a", "post-1", Some("A"), "2024-05-01T10:00:00Z")
                ]
            })))
            .mount(&server)
            .await;

        let result = call(&server, "get_blog_comments", json!({"post_id": "post-1", "limit": 1}))
            .await
            .unwrap();

        let comments = result.structured_content.unwrap()["comments"].clone();
        let comments = comments.as_array().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0]["author"], "B");
        assert_eq!(comments[0]["id"], "c-b");
        assert_eq!(comments[0]["post_id"], "post-1");
    }

    #[tokio::test]
    async fn test_reply_tool_confirms() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [comment_json("c-1", "post-1", Some("Alice"), "2024-05-01T10:00:00Z")]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/apis/api.console.halo.run/v1alpha1/comments/c-1/reply"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"metadata": {"name": "r-9"}})))
            .expect(1)
            .mount(&server)
            .await;

        let result = call(
            &server,
            "reply_blog_comment",
            json!({"target_hint": "alice", "content": "Thanks!"}),
        )
        .await
        .unwrap();
        let structured = result.structured_content.unwrap();
        assert_eq!(structured["parent_comment_id"], "c-1");
        assert_eq!(structured["reply_id"], "r-9");
    }

    #[tokio::test]
    async fn test_upload_uses_default_policy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cat.gif"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/gif")
                    .set_body_bytes(&b"GIF89a\x01\x00\x01\x00"[..]),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/apis/api.console.halo.run/v1alpha1/attachments/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metadata": {"name": "att-1"},
                "status": {"permalink": "https://cdn.example.com/cat.gif"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = call(
            &server,
            "upload_blog_image",
            json!({"source_url": format!("{}/cat.gif", server.uri())}),
        )
        .await
        .unwrap();
        let structured = result.structured_content.unwrap();
        assert_eq!(structured["storage_policy"], "default");
        assert_eq!(structured["public_url"], "https://cdn.example.com/cat.gif");
        assert_eq!(structured["inferred_content_type"], "image/gif");
    }

    #[tokio::test]
    async fn test_error_kind_survives_facade() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = call(&server, "get_blog_comments", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "unauthorized");
        assert!(err.message().starts_with("check your token"));
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_validation_errors() {
        let server = MockServer::start().await;
        let err = call(&server, "upload_blog_image", json!({"storage_policy": "s3"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
