//! Image models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::codec::{null_as_default, Resource};
use crate::models::ContainerConfig;
use crate::{Error, Result};

/// Entry of `GET /images/json`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageRecord {
    pub id: String,
    #[serde(default)]
    pub parent_id: String,
    /// `repository:tag` pairs, `<none>:<none>` for dangling images
    #[serde(default, deserialize_with = "null_as_default")]
    pub repo_tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub repo_digests: Vec<String>,
    /// Unix seconds
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub size: i64,
    pub virtual_size: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: BTreeMap<String, String>,
}

impl ImageRecord {
    /// Repository of the first tag
    pub fn repository(&self) -> Option<&str> {
        let tag = self.repo_tags.first()?;
        Some(ImageReference::split(tag).0)
    }

    pub fn tag(&self) -> Option<&str> {
        let tag = self.repo_tags.first()?;
        ImageReference::split(tag).1
    }
}

impl Resource for ImageRecord {
    const SHAPE: &'static str = "image summary";
}

/// Result of `GET /images/{name}/json`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageInspectResult {
    pub id: String,
    /// Identifier of the image this one was committed or built on
    #[serde(default)]
    pub parent: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub repo_tags: Vec<String>,
    #[serde(default)]
    pub comment: String,
    pub created: Option<DateTime<Utc>>,
    /// Container the image was committed from (older daemons)
    #[serde(default)]
    pub container: String,
    /// Configuration of that container at commit time (older daemons)
    pub container_config: Option<ContainerConfig>,
    /// Default configuration for containers run from this image
    pub config: Option<ContainerConfig>,
    #[serde(default)]
    pub docker_version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub size: i64,
}

impl Resource for ImageInspectResult {
    const SHAPE: &'static str = "image inspect";
}

/// Entry of `GET /images/search`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub star_count: u64,
    #[serde(default)]
    pub is_official: bool,
    #[serde(default)]
    pub is_automated: bool,
}

impl Resource for SearchItem {
    const SHAPE: &'static str = "search result";
}

/// One line of `DELETE /images/{name}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageDeleteItem {
    pub untagged: Option<String>,
    pub deleted: Option<String>,
}

impl Resource for ImageDeleteItem {
    const SHAPE: &'static str = "image delete";
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CommitResult {
    pub id: String,
}

impl Resource for CommitResult {
    const SHAPE: &'static str = "commit";
}

/// Parameters of `POST /commit`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitConfig {
    pub container: String,
    pub repo: Option<String>,
    pub tag: Option<String>,
    pub message: Option<String>,
    pub author: Option<String>,
    /// Pause the container while committing (daemon default: true)
    pub pause: Option<bool>,
    /// Overrides applied to the new image's config
    pub config: Option<ContainerConfig>,
}

impl CommitConfig {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            ..Default::default()
        }
    }

    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_pause(mut self, pause: bool) -> Self {
        self.pause = Some(pause);
        self
    }

    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// Options for `POST /build`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// `repository[:tag]` for the result
    pub tag: Option<String>,
    pub no_cache: bool,
    /// Suppress verbose build output
    pub quiet: bool,
    /// Remove intermediate containers after a successful build
    pub remove: bool,
    /// Path of the Dockerfile inside the context
    pub dockerfile: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            tag: None,
            no_cache: false,
            quiet: false,
            remove: true,
            dockerfile: "Dockerfile".to_string(),
        }
    }
}

impl BuildOptions {
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Default::default()
        }
    }
}

/// `registry:5000/repo/name:tag` or `name@sha256:...` split for the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub repository: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl ImageReference {
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() || reference.chars().any(char::is_whitespace) {
            return Err(Error::Validation(format!("invalid image reference {:?}", reference)));
        }
        if let Some((repository, digest)) = reference.split_once('@') {
            if repository.is_empty() || digest.is_empty() {
                return Err(Error::Validation(format!("invalid image reference {:?}", reference)));
            }
            return Ok(Self {
                repository: repository.to_string(),
                tag: None,
                digest: Some(digest.to_string()),
            });
        }
        let (repository, tag) = Self::split(reference);
        if repository.is_empty() || tag == Some("") {
            return Err(Error::Validation(format!("invalid image reference {:?}", reference)));
        }
        Ok(Self {
            repository: repository.to_string(),
            tag: tag.map(str::to_string),
            digest: None,
        })
    }

    /// Split off a tag; a `:` before the last `/` belongs to a registry port.
    fn split(reference: &str) -> (&str, Option<&str>) {
        let name_start = reference.rfind('/').map_or(0, |i| i + 1);
        match reference[name_start..].rfind(':') {
            Some(i) => (&reference[..name_start + i], Some(&reference[name_start + i + 1..])),
            None => (reference, None),
        }
    }
}
