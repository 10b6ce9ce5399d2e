//! The registry operations the cleaner depends on.
//!
//! [`RegistryGateway`] is the seam between retention logic and the wire
//! protocol. [`crate::RegistryHub`] implements it over HTTP; tests implement
//! it in memory.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::RegistryError;

/// A repository on a specific registry host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryRef {
    /// Registry host, as configured.
    pub host: String,
    /// Repository path (e.g. `team/app`).
    pub name: String,
}

impl RepositoryRef {
    /// Creates a repository reference.
    #[must_use]
    pub fn new(host: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            name: name.into(),
        }
    }

    /// Returns `host/name:tag`.
    #[must_use]
    pub fn with_tag(&self, tag: &str) -> String {
        format!("{self}:{tag}")
    }

    /// Returns `host/name@digest`.
    #[must_use]
    pub fn with_digest(&self, digest: &str) -> String {
        format!("{self}@{digest}")
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.host, self.name)
    }
}

/// What the cleaner needs to know about a tagged manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestInfo {
    /// Content digest of the manifest.
    pub digest: String,
    /// The manifest is a multi-platform index or manifest list.
    pub is_index: bool,
    /// Digest of the image config blob. `None` for indexes.
    pub config_digest: Option<String>,
}

/// The fields of an image config blob the cleaner reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageConfig {
    /// Image creation time, if the image records one.
    pub created: Option<DateTime<Utc>>,
}

/// Registry operations consumed by repository resolution, scanning and deletion.
#[async_trait]
pub trait RegistryGateway: Send + Sync {
    /// Lists every repository on `host`.
    async fn list_repositories(&self, host: &str) -> Result<Vec<String>, RegistryError>;

    /// Lists every tag in `repository`.
    async fn list_tags(&self, repository: &RepositoryRef) -> Result<Vec<String>, RegistryError>;

    /// Fetches the manifest `tag` points at.
    async fn get_manifest(
        &self,
        repository: &RepositoryRef,
        tag: &str,
    ) -> Result<ManifestInfo, RegistryError>;

    /// Fetches and decodes the image config blob `config_digest`.
    async fn get_image_config(
        &self,
        repository: &RepositoryRef,
        config_digest: &str,
    ) -> Result<ImageConfig, RegistryError>;

    /// Deletes the manifest `digest` and every tag pointing at it.
    async fn delete_manifest(
        &self,
        repository: &RepositoryRef,
        digest: &str,
    ) -> Result<(), RegistryError>;
}
