//! Image upload from a remote URL into the media library

use crate::error::AppError;
use crate::halo::client::{MultipartUpload, ResourceClient};
use crate::halo::media::{self, ImageType};
use crate::halo::paths;
use crate::halo::records::{parse, Attachment, AttachmentResource};
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use reqwest::Client;
use std::fmt;
use tracing::{debug, info};
use url::Url;

/// Upload lifecycle, logged as each stage is entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Fetching,
    Uploading,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetching => "fetching",
            Stage::Uploading => "uploading",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Downloaded image ready to be re-uploaded
#[derive(Debug, Clone)]
struct FetchedImage {
    bytes: Bytes,
    declared_type: Option<String>,
}

pub struct AttachmentUploader {
    client: ResourceClient,
    fetch: Client,
    max_bytes: u64,
    group: String,
}

impl AttachmentUploader {
    pub fn new(client: ResourceClient, fetch: Client, max_bytes: u64, group: String) -> Self {
        Self {
            client,
            fetch,
            max_bytes,
            group,
        }
    }

    /// Fetch `source_url` and store it under `storage_policy`
    pub async fn upload(&self, source_url: &str, storage_policy: &str) -> Result<Attachment, AppError> {
        let source = parse_source_url(source_url)?;
        let result = self.run(&source, storage_policy).await;
        if let Err(e) = &result {
            debug!("Upload of {} {}: {}", source, Stage::Failed, e);
        }
        result
    }

    async fn run(&self, source: &Url, storage_policy: &str) -> Result<Attachment, AppError> {
        debug!("Upload of {} {}", source, Stage::Fetching);
        let fetched = self.fetch_image(source).await?;
        let image_type = media::infer(fetched.declared_type.as_deref(), &fetched.bytes)?;
        let file_name = file_name_for(source, image_type);

        debug!(
            "Upload of {} {} ({} bytes as {} to policy {})",
            source,
            Stage::Uploading,
            fetched.bytes.len(),
            image_type.mime(),
            storage_policy
        );
        let mut fields = vec![("policyName", storage_policy.to_string())];
        if !self.group.is_empty() {
            fields.push(("groupName", self.group.clone()));
        }
        let upload = MultipartUpload {
            file_name,
            content_type: image_type.mime().to_string(),
            bytes: fetched.bytes,
            fields,
        };

        let value = self.client.upload(&paths::attachment_upload(), upload).await?;
        let resource: AttachmentResource = parse(value, "attachment")?;
        let permalink = resource.permalink().ok_or_else(|| {
            AppError::ServerError(format!(
                "attachment {} was stored but no public URL was returned",
                resource.metadata.name
            ))
        })?;
        let public_url = self.client.credential().absolute_url(permalink);

        debug!("Upload of {} {}", source, Stage::Done);
        info!("Uploaded {} to {}", source, public_url);
        Ok(Attachment {
            source_url: source.to_string(),
            inferred_content_type: image_type.mime().to_string(),
            storage_policy: storage_policy.to_string(),
            public_url,
        })
    }

    async fn fetch_image(&self, source: &Url) -> Result<FetchedImage, AppError> {
        let response = self
            .fetch
            .get(source.clone())
            .send()
            .await
            .map_err(|e| AppError::FetchError(format!("Failed to download {}: {}", source, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::FetchError(format!(
                "Failed to download {}: HTTP {}",
                source,
                status.as_u16()
            )));
        }

        let declared_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();
        debug!(
            "Downloading {} ({:?} bytes, {:?})",
            source, content_length, declared_type
        );

        let bytes = collect_bounded(response.bytes_stream(), content_length, self.max_bytes).await?;
        Ok(FetchedImage {
            bytes,
            declared_type,
        })
    }
}

/// Only absolute http(s) URLs are fetched
fn parse_source_url(source_url: &str) -> Result<Url, AppError> {
    let url = Url::parse(source_url.trim())
        .map_err(|e| AppError::ValidationError(format!("Invalid image URL '{}': {}", source_url, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::ValidationError(format!(
            "Image URL must use http or https, got {}",
            other
        ))),
    }
}

/// Read a body, failing as soon as it is known to exceed `max_bytes`
async fn collect_bounded<S, E>(stream: S, content_length: Option<u64>, max_bytes: u64) -> Result<Bytes, AppError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: fmt::Display,
{
    if let Some(len) = content_length {
        if len > max_bytes {
            return Err(AppError::FetchError(format!(
                "image is {} bytes, larger than the {} byte limit",
                len, max_bytes
            )));
        }
    }

    let mut stream = std::pin::pin!(stream);
    let mut buf = BytesMut::with_capacity(content_length.unwrap_or(0) as usize);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            AppError::FetchError(format!(
                "Connection interrupted after {} bytes: {}",
                buf.len(),
                e
            ))
        })?;
        if (buf.len() + chunk.len()) as u64 > max_bytes {
            return Err(AppError::FetchError(format!(
                "image exceeds the {} byte limit",
                max_bytes
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// Keep the source file name when its extension agrees with the content
fn file_name_for(source: &Url, image_type: ImageType) -> String {
    source
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .filter(|name| !name.is_empty() && image_type.matches_file_name(name))
        .unwrap_or_else(|| {
            format!(
                "upload-{}.{}",
                chrono::Utc::now().timestamp(),
                image_type.extension()
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::halo::test_support::client_for;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{any, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01";

    fn uploader(server: &MockServer, max_bytes: u64, group: &str) -> AttachmentUploader {
        AttachmentUploader::new(
            client_for(server),
            crate::http::fetch_client(Duration::from_secs(5)).unwrap(),
            max_bytes,
            group.to_string(),
        )
    }

    async fn mount_upload(server: &MockServer, expected: u64) {
        Mock::given(method("POST"))
            .and(path("/apis/api.console.halo.run/v1alpha1/attachments/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metadata": {"name": "att-1"},
                "spec": {"displayName": "cat.png", "policyName": "default"},
                "status": {"permalink": "/upload/cat.png"}
            })))
            .expect(expected)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_upload_returns_public_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/cat.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(PNG),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/apis/api.console.halo.run/v1alpha1/attachments/upload"))
            .and(header("authorization", "Bearer pat-test"))
            .and(|req: &wiremock::Request| {
                let body = String::from_utf8_lossy(&req.body);
                body.contains("name=\"policyName\"")
                    && body.contains("filename=\"cat.png\"")
                    && body.contains("name=\"groupName\"")
            })
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metadata": {"name": "att-1"},
                "status": {"permalink": "/upload/cat.png"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let attachment = uploader(&server, 1024, "blog")
            .upload(&format!("{}/images/cat.png", server.uri()), "default")
            .await
            .unwrap();
        assert_eq!(attachment.inferred_content_type, "image/png");
        assert_eq!(attachment.storage_policy, "default");
        assert_eq!(attachment.public_url, format!("{}/upload/cat.png", server.uri()));
    }

    #[tokio::test]
    async fn test_oversize_image_is_not_uploaded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![0u8; 4096]),
            )
            .mount(&server)
            .await;
        mount_upload(&server, 0).await;

        let err = uploader(&server, 1024, "")
            .upload(&format!("{}/big.png", server.uri()), "default")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FetchError(_)));
    }

    #[tokio::test]
    async fn test_streamed_body_over_limit_is_rejected() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from(vec![0u8; 600])),
            Ok(Bytes::from(vec![0u8; 600])),
        ];
        let err = collect_bounded(futures::stream::iter(chunks), None, 1000)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FetchError(_)));

        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![Ok(Bytes::from_static(b"abc"))];
        let bytes = collect_bounded(futures::stream::iter(chunks), Some(3), 3).await.unwrap();
        assert_eq!(&bytes[..], b"abc");
    }

    #[tokio::test]
    async fn test_unsupported_media_is_not_uploaded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page.html"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<!doctype html><p>hi</p>"),
            )
            .mount(&server)
            .await;
        mount_upload(&server, 0).await;

        let err = uploader(&server, 1024, "")
            .upload(&format!("{}/page.html", server.uri()), "default")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMedia(_)));
    }

    #[tokio::test]
    async fn test_missing_source_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        mount_upload(&server, 0).await;

        let err = uploader(&server, 1024, "")
            .upload(&format!("{}/gone.png", server.uri()), "default")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FetchError(_)));
    }

    #[tokio::test]
    async fn test_non_http_source_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = uploader(&server, 1024, "")
            .upload("file:///etc/passwd", "default")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_missing_permalink_is_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"metadata": {"name": "att-2"}})))
            .mount(&server)
            .await;

        let err = uploader(&server, 1024, "")
            .upload(&format!("{}/a.png", server.uri()), "default")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ServerError(_)));
    }

    #[test]
    fn test_file_name_for() {
        let url = Url::parse("https://img.example.com/a/photo.JPG?x=1").unwrap();
        assert_eq!(file_name_for(&url, ImageType::Jpeg), "photo.JPG");

        let url = Url::parse("https://img.example.com/render?id=5").unwrap();
        let name = file_name_for(&url, ImageType::Png);
        assert!(name.starts_with("upload-") && name.ends_with(".png"));

        let url = Url::parse("https://img.example.com/photo.jpg").unwrap();
        assert!(file_name_for(&url, ImageType::Webp).ends_with(".webp"));
    }
}
