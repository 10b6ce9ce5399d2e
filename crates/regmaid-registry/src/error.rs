//! Error types for registry operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Failed to connect to registry.
    #[error("Failed to connect to registry at {url}: {source}")]
    ConnectionFailed {
        /// Registry URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// Authentication failed.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Error message.
        message: String,
    },

    /// Manifest, blob or repository not found.
    #[error("Not found: {reference}")]
    NotFound {
        /// Reference that was requested.
        reference: String,
    },

    /// Manifest body could not be understood.
    #[error("Invalid manifest for {reference}: {message}")]
    InvalidManifest {
        /// Reference the manifest was fetched for.
        reference: String,
        /// Error message.
        message: String,
    },

    /// Certificate or key material could not be loaded.
    #[error("Invalid certificate: {message}")]
    InvalidCertificate {
        /// Error message.
        message: String,
    },

    /// File I/O error.
    #[error("File I/O error at {path}: {source}")]
    IoError {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// HTTP error from registry.
    #[error("HTTP error from registry: {status} - {message}")]
    HttpError {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {source}")]
    JsonError {
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Invalid URL.
    #[error("Invalid URL: {url}")]
    InvalidUrl {
        /// URL string.
        url: String,
    },

    /// No client is configured for the host.
    #[error("No registry configured for host {host}")]
    UnknownHost {
        /// Requested host.
        host: String,
    },
}

impl RegistryError {
    /// Returns true if the registry reported that the target does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::HttpError { status: 404, .. })
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::ConnectionFailed {
                url: err
                    .url()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string),
                source: err,
            }
        } else if err.is_status() {
            let status = err.status().map_or(0, |s| s.as_u16());
            Self::HttpError {
                status,
                message: err.to_string(),
            }
        } else {
            Self::HttpError {
                status: 0,
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError { source: err }
    }
}
