//! Authenticated resource client for the Halo API

use crate::config::Credential;
use crate::error::AppError;
use crate::halo::paths::ResourcePath;
use crate::halo::records::{parse, ListResult};
use crate::halo::retry::RetryPolicy;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest slice of an error body carried into an error message
const ERROR_BODY_LIMIT: usize = 200;

/// Request payload
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(Value),
    Multipart(MultipartUpload),
}

/// A single file plus text fields, rebuilt into a fresh form on every attempt
#[derive(Debug, Clone)]
pub struct MultipartUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
    pub fields: Vec<(&'static str, String)>,
}

impl MultipartUpload {
    fn to_form(&self) -> Result<Form, AppError> {
        let part = Part::stream_with_length(self.bytes.clone(), self.bytes.len() as u64)
            .file_name(self.file_name.clone())
            .mime_str(&self.content_type)
            .map_err(|e| {
                AppError::UnsupportedMedia(format!("invalid content type {}: {}", self.content_type, e))
            })?;
        let mut form = Form::new().part("file", part);
        for (key, value) in &self.fields {
            form = form.text(*key, value.clone());
        }
        Ok(form)
    }
}

/// Authenticated HTTP session against one backend.
///
/// Cheap to clone; clones share the connection pool and the credential.
#[derive(Clone)]
pub struct ResourceClient {
    http: Client,
    credential: Arc<Credential>,
    retry: RetryPolicy,
}

impl ResourceClient {
    pub fn new(credential: Credential, timeout: Duration, retry: RetryPolicy) -> Result<Self, AppError> {
        Ok(Self {
            http: crate::http::api_client(timeout)?,
            credential: Arc::new(credential),
            retry,
        })
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Issue one logical request, retrying only when the backend is unreachable
    pub async fn request(
        &self,
        method: Method,
        path: &ResourcePath,
        body: Option<RequestBody>,
    ) -> Result<Value, AppError> {
        let path = path.to_string();
        let url = format!("{}{}", self.credential.base_url(), path);
        let label = format!("{} {}", method, path);
        self.retry
            .run(&label, |attempt| {
                self.send_once(method.clone(), &url, &path, body.as_ref(), attempt)
            })
            .await
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        path: &str,
        body: Option<&RequestBody>,
        attempt: u32,
    ) -> Result<Value, AppError> {
        debug!("{} {} (attempt {})", method, path, attempt);

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(reqwest::header::AUTHORIZATION, self.credential.bearer())
            .header(reqwest::header::ACCEPT, "application/json");

        request = match body {
            Some(RequestBody::Json(json)) => request.json(json),
            Some(RequestBody::Multipart(upload)) => request.multipart(upload.to_form()?),
            None => request,
        };

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();
        let text = response.text().await.map_err(classify_transport)?;

        if !status.is_success() {
            warn!("{} {} returned {}", method, path, status);
            return Err(classify_status(status, &text));
        }

        debug!("{} {} returned {} ({} bytes)", method, path, status, text.len());

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            AppError::ServerError(format!("response from {} is not JSON: {}", path, e))
        })
    }

    /// GET a single resource
    pub async fn get<T: DeserializeOwned>(&self, path: &ResourcePath, what: &str) -> Result<T, AppError> {
        let value = self.request(Method::GET, path, None).await?;
        parse(value, what)
    }

    /// GET a list resource
    pub async fn list<T: DeserializeOwned>(
        &self,
        path: &ResourcePath,
        what: &str,
    ) -> Result<ListResult<T>, AppError> {
        let value = self.request(Method::GET, path, None).await?;
        parse(value, what)
    }

    /// POST a JSON body
    pub async fn create(&self, path: &ResourcePath, body: Value) -> Result<Value, AppError> {
        self.request(Method::POST, path, Some(RequestBody::Json(body))).await
    }

    /// PUT, with an optional JSON body
    pub async fn update(&self, path: &ResourcePath, body: Option<Value>) -> Result<Value, AppError> {
        self.request(Method::PUT, path, body.map(RequestBody::Json)).await
    }

    /// POST a multipart upload
    pub async fn upload(&self, path: &ResourcePath, upload: MultipartUpload) -> Result<Value, AppError> {
        self.request(Method::POST, path, Some(RequestBody::Multipart(upload)))
            .await
    }
}

/// Map transport failures onto the error taxonomy
fn classify_transport(err: reqwest::Error) -> AppError {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        AppError::Unreachable(err.to_string())
    } else {
        AppError::ServerError(err.to_string())
    }
}

/// Map a non-2xx status onto the error taxonomy
pub fn classify_status(status: StatusCode, body: &str) -> AppError {
    let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    let detail = if snippet.trim().is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("HTTP {}: {}", status.as_u16(), snippet.trim())
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized(detail),
        StatusCode::NOT_FOUND => AppError::NotFound(detail),
        StatusCode::CONFLICT => AppError::Conflict(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => AppError::ValidationError(detail),
        _ => AppError::ServerError(detail),
    }
}
