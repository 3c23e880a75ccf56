//! HTTP client utilities
//!
//! Builds reqwest clients with bounded timeouts. Proxy environment variables
//! (HTTP_PROXY, HTTPS_PROXY, NO_PROXY) are honoured by reqwest itself.

use crate::error::AppError;
use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("halo-manager/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for authenticated calls against the blog backend
pub fn api_client(timeout: Duration) -> Result<Client, AppError> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AppError::Unreachable(format!("Failed to create HTTP client: {}", e)))
}

/// Client for downloading remote images.
///
/// Carries no credentials and follows a bounded number of redirects.
pub fn fetch_client(timeout: Duration) -> Result<Client, AppError> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(5))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AppError::FetchError(format!("Failed to create HTTP client: {}", e)))
}
