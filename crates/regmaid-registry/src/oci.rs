//! OCI Distribution and Docker Registry v2 wire types.
//!
//! Only the fields needed to tell images from indexes, find the config blob
//! and read the creation time are modelled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A manifest or blob media type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaType(String);

impl MediaType {
    /// OCI image manifest media type.
    pub const OCI_MANIFEST: &'static str = "application/vnd.oci.image.manifest.v1+json";

    /// OCI image index media type.
    pub const OCI_INDEX: &'static str = "application/vnd.oci.image.index.v1+json";

    /// Docker image manifest (schema 2) media type.
    pub const DOCKER_MANIFEST: &'static str =
        "application/vnd.docker.distribution.manifest.v2+json";

    /// Docker manifest list media type.
    pub const DOCKER_MANIFEST_LIST: &'static str =
        "application/vnd.docker.distribution.manifest.list.v2+json";

    /// Creates a new media type.
    #[must_use]
    pub fn new(media_type: impl Into<String>) -> Self {
        Self(media_type.into())
    }

    /// Returns the media type string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for multi-platform indexes and manifest lists.
    #[must_use]
    pub fn is_index(&self) -> bool {
        is_index_type(&self.0)
    }

    /// Returns the `Accept` header value for manifest requests.
    #[must_use]
    pub fn manifest_accept() -> String {
        [
            Self::OCI_MANIFEST,
            Self::DOCKER_MANIFEST,
            Self::OCI_INDEX,
            Self::DOCKER_MANIFEST_LIST,
        ]
        .join(", ")
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MediaType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

fn is_index_type(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or_default().trim();
    essence == MediaType::OCI_INDEX || essence == MediaType::DOCKER_MANIFEST_LIST
}

/// OCI content descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,

    /// Digest of the targeted content.
    pub digest: String,

    /// Size in bytes of the content.
    #[serde(default)]
    pub size: u64,
}

/// An image manifest, image index or manifest list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Schema version (always 2).
    #[serde(default)]
    pub schema_version: u32,

    /// Media type declared in the body, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,

    /// Image config descriptor. Absent for indexes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Descriptor>,

    /// Platform manifests. Present for indexes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifests: Option<Vec<Descriptor>>,

    /// Image layers.
    #[serde(default)]
    pub layers: Vec<Descriptor>,
}

impl Manifest {
    /// Returns true if this is a multi-platform index.
    ///
    /// The body's `mediaType` wins over the response `Content-Type`; bodies
    /// without either are classified by whether they list `manifests`.
    #[must_use]
    pub fn is_index(&self, content_type: Option<&str>) -> bool {
        if let Some(media_type) = &self.media_type {
            return media_type.is_index();
        }
        if let Some(content_type) = content_type {
            if is_index_type(content_type) {
                return true;
            }
        }
        self.manifests.is_some() && self.config.is_none()
    }
}

/// Response of `GET /v2/<name>/tags/list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagList {
    /// Repository name.
    #[serde(default)]
    pub name: String,

    /// Tags. Registries return `null` for repositories without tags.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Response of `GET /v2/_catalog`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    /// Repository names.
    #[serde(default)]
    pub repositories: Option<Vec<String>>,
}

/// The subset of an image config blob that regmaid reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigBlob {
    /// RFC 3339 creation time.
    #[serde(default)]
    pub created: Option<String>,
}

impl ConfigBlob {
    /// Parses the creation time. Unparsable timestamps are treated as absent.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.created.as_deref()?;
        match DateTime::parse_from_rfc3339(raw) {
            Ok(created) => Some(created.with_timezone(&Utc)),
            Err(e) => {
                tracing::debug!(created = raw, error = %e, "ignoring unparsable creation time");
                None
            }
        }
    }
}
