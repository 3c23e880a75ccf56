//! Error types and handling for the Halo MCP server

use serde::Serialize;
use thiserror::Error;

/// Failure kinds surfaced by every component and preserved up to the tool facade.
#[derive(Debug, Error, Serialize, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Server error: {0}")]
    ServerError(String),
    #[error("Unreachable: {0}")]
    Unreachable(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Fetch error: {0}")]
    FetchError(String),
    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),
}

impl AppError {
    /// Get the error code for MCP responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::ServerError(_) => "server_error",
            AppError::Unreachable(_) => "unreachable",
            AppError::ValidationError(_) => "validation_error",
            AppError::FetchError(_) => "fetch_error",
            AppError::UnsupportedMedia(_) => "unsupported_media",
        }
    }

    /// Short user-facing hint for the failure kind
    pub fn user_hint(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "check your token",
            AppError::NotFound(_) => "the requested item does not exist",
            AppError::Conflict(_) => "an item with that name already exists",
            AppError::ServerError(_) => "the blog backend reported an error",
            AppError::Unreachable(_) => "the blog backend could not be reached",
            AppError::ValidationError(_) => "the request is invalid",
            AppError::FetchError(_) => "the image could not be downloaded",
            AppError::UnsupportedMedia(_) => "the file is not a supported image",
        }
    }

    /// Detail text carried by the variant
    pub fn detail(&self) -> &str {
        match self {
            AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::ServerError(msg)
            | AppError::Unreachable(msg)
            | AppError::ValidationError(msg)
            | AppError::FetchError(msg)
            | AppError::UnsupportedMedia(msg) => msg,
        }
    }

    /// Prefix the detail while keeping the failure kind
    pub fn context(self, prefix: impl std::fmt::Display) -> Self {
        let wrap = |msg: String| format!("{}: {}", prefix, msg);
        match self {
            AppError::Unauthorized(msg) => AppError::Unauthorized(wrap(msg)),
            AppError::NotFound(msg) => AppError::NotFound(wrap(msg)),
            AppError::Conflict(msg) => AppError::Conflict(wrap(msg)),
            AppError::ServerError(msg) => AppError::ServerError(wrap(msg)),
            AppError::Unreachable(msg) => AppError::Unreachable(wrap(msg)),
            AppError::ValidationError(msg) => AppError::ValidationError(wrap(msg)),
            AppError::FetchError(msg) => AppError::FetchError(wrap(msg)),
            AppError::UnsupportedMedia(msg) => AppError::UnsupportedMedia(wrap(msg)),
        }
    }

    /// Get the error message shown to tool callers
    pub fn message(&self) -> String {
        format!("{} ({})", self.user_hint(), self.detail())
    }

    /// Process exit code used in CLI mode
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::ValidationError(_) => 1,
            AppError::Unreachable(_) | AppError::ServerError(_) => 2,
            AppError::NotFound(_) => 3,
            AppError::Unauthorized(_) => 4,
            AppError::Conflict(_) => 5,
            AppError::FetchError(_) | AppError::UnsupportedMedia(_) => 6,
        }
    }
}

/// Responses the backend returns in an unexpected shape are server errors
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ServerError(format!("unrecognized response shape: {}", err))
    }
}

/// Validation functions
pub fn validate_content(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError(format!("{} cannot be empty", field)));
    }
    Ok(())
}
