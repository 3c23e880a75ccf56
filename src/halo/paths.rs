//! Kubernetes-style resource paths for the Halo API
//!
//! `/apis/{group}/{version}/{resource}[/{name}[/{subresource}]][?query]`

use std::fmt;

/// An API group/version pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiGroup {
    pub group: &'static str,
    pub version: &'static str,
}

impl ApiGroup {
    /// `group/version`, as used in `apiVersion` fields
    pub fn api_version(&self) -> String {
        format!("{}/{}", self.group, self.version)
    }
}

/// Extension resources (posts, comments)
pub const CONTENT: ApiGroup = ApiGroup {
    group: "content.halo.run",
    version: "v1alpha1",
};

/// Console API (drafts, publish, replies, uploads)
pub const CONSOLE: ApiGroup = ApiGroup {
    group: "api.console.halo.run",
    version: "v1alpha1",
};

/// User-center API
pub const USER_CENTER: ApiGroup = ApiGroup {
    group: "api.uc.halo.run",
    version: "v1alpha1",
};

/// A fully resolved resource path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    api: ApiGroup,
    resource: &'static str,
    name: Option<String>,
    subresource: Option<&'static str>,
    query: Vec<(String, String)>,
}

impl ResourcePath {
    pub fn collection(api: ApiGroup, resource: &'static str) -> Self {
        Self {
            api,
            resource,
            name: None,
            subresource: None,
            query: Vec::new(),
        }
    }

    pub fn named(api: ApiGroup, resource: &'static str, name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::collection(api, resource)
        }
    }

    pub fn subresource(mut self, subresource: &'static str) -> Self {
        self.subresource = Some(subresource);
        self
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/apis/{}/{}/{}",
            self.api.group, self.api.version, self.resource
        )?;
        if let Some(name) = &self.name {
            write!(f, "/{}", urlencoding::encode(name))?;
            if let Some(sub) = self.subresource {
                write!(f, "/{}", sub)?;
            }
        }
        for (i, (key, value)) in self.query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, key, urlencoding::encode(value))?;
        }
        Ok(())
    }
}

/// Console draft collection
pub fn console_posts() -> ResourcePath {
    ResourcePath::collection(CONSOLE, "posts")
}

/// Content-API post collection (single-resource create)
pub fn content_posts() -> ResourcePath {
    ResourcePath::collection(CONTENT, "posts")
}

/// Publish transition for a post
pub fn post_publish(name: &str, head_snapshot: Option<&str>) -> ResourcePath {
    let path = ResourcePath::named(CONSOLE, "posts", name).subresource("publish");
    let path = match head_snapshot {
        Some(snapshot) => path.query("headSnapshot", snapshot),
        None => path,
    };
    path.query("async", "false")
}

/// Recent comments, newest first, optionally scoped to one post
pub fn comments(post_name: Option<&str>, size: usize) -> ResourcePath {
    let path = ResourcePath::collection(CONTENT, "comments")
        .query("sort", "metadata.creationTimestamp,desc")
        .query("page", "0")
        .query("size", size.to_string());
    match post_name {
        Some(post) => path.query(
            "fieldSelector",
            format!("spec.subjectRef=Post.{}/{}", CONTENT.api_version(), post),
        ),
        None => path,
    }
}

pub fn comment(name: &str) -> ResourcePath {
    ResourcePath::named(CONTENT, "comments", name)
}

/// Reply collection scoped by the parent comment
pub fn comment_reply(name: &str) -> ResourcePath {
    ResourcePath::named(CONSOLE, "comments", name).subresource("reply")
}

pub fn attachment_upload() -> ResourcePath {
    ResourcePath::named(CONSOLE, "attachments", "upload")
}

/// Current user lookups, tried in order
pub fn current_user_candidates() -> [ResourcePath; 2] {
    [
        ResourcePath::named(CONSOLE, "users", "me"),
        ResourcePath::named(USER_CENTER, "users", "me"),
    ]
}
