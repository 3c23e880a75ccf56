//! Configuration loading and the credential context
//!
//! Values are layered: built-in defaults, then the JSON config file, then
//! environment variables and CLI flags (both surfaced through clap).

use crate::error::AppError;
use crate::halo::retry::RetryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_STORAGE_POLICY: &str = "default";

/// How a post moves from creation to published
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PublishFlow {
    /// Create a draft, then issue the publish transition
    #[default]
    DraftThenPublish,
    /// Create the post already published in a single call
    Atomic,
}

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub token: String,
    pub default_storage_policy: String,
    /// Attachment group for uploads; empty means ungrouped
    pub attachment_group: String,
    /// Post owner username; resolved from the token when unset
    pub owner: Option<String>,
    pub publish_flow: PublishFlow,
    pub request_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub max_image_bytes: u64,
    pub retry_max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            default_storage_policy: DEFAULT_STORAGE_POLICY.to_string(),
            attachment_group: String::new(),
            owner: None,
            publish_flow: PublishFlow::default(),
            request_timeout_secs: 30,
            fetch_timeout_secs: 30,
            max_image_bytes: 10 * 1024 * 1024,
            retry_max_attempts: 2,
            retry_backoff_ms: 500,
        }
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub storage_policy: Option<String>,
    pub owner: Option<String>,
}

impl Config {
    /// Load the config file (if any) and apply overrides on top
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = match &overrides.config_path {
            Some(path) => load_config_file(path)?,
            None => {
                let path = config_path()?;
                if path.exists() {
                    load_config_file(&path)?
                } else {
                    Config::default()
                }
            }
        };
        config.apply(overrides);
        Ok(config)
    }

    /// Apply non-empty overrides
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        fn pick(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        if let Some(url) = pick(&overrides.base_url) {
            self.base_url = url;
        }
        if let Some(token) = pick(&overrides.token) {
            self.token = token;
        }
        if let Some(policy) = pick(&overrides.storage_policy) {
            self.default_storage_policy = policy;
        }
        if let Some(owner) = pick(&overrides.owner) {
            self.owner = Some(owner);
        }
    }

    /// Build the validated credential context
    pub fn credential(&self) -> Result<Credential, AppError> {
        Credential::new(&self.base_url, &self.token)
    }

    /// Owner from config, ignoring blank values
    pub fn configured_owner(&self) -> Option<&str> {
        self.owner.as_deref().map(str::trim).filter(|o| !o.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }
}

/// Get the path to the default configuration file
pub fn config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("Cannot determine config directory")?;
    Ok(config_dir.join("halo-manager").join("config.json"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: Config = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// Base URL and bearer token for the blog backend.
///
/// Immutable once built; construction fails if either field is empty.
#[derive(Clone)]
pub struct Credential {
    base_url: String,
    token: String,
}

impl Credential {
    pub fn new(base_url: &str, token: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim().trim_end_matches('/');
        let token = token.trim();

        if base_url.is_empty() {
            return Err(AppError::ValidationError(
                "Halo base URL is not configured".to_string(),
            ));
        }
        if token.is_empty() {
            return Err(AppError::ValidationError(
                "Halo personal access token is not configured".to_string(),
            ));
        }

        let parsed = Url::parse(base_url)
            .map_err(|e| AppError::ValidationError(format!("Invalid base URL '{}': {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::ValidationError(format!(
                "Base URL must use http or https: {}",
                base_url
            )));
        }

        Ok(Self {
            base_url: base_url.to_string(),
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Value for the Authorization header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Join a site-relative path (e.g. a permalink) onto the base URL
    pub fn absolute_url(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else if path_or_url.starts_with('/') {
            format!("{}{}", self.base_url, path_or_url)
        } else {
            format!("{}/{}", self.base_url, path_or_url)
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}
