//! # Regmaid Registry
//!
//! OCI Distribution API client used by regmaid to find, inspect and delete
//! container images.
//!
//! ## Features
//!
//! - **Repository discovery**: catalog and tag listing with `Link` pagination
//! - **Manifest inspection**: image/index detection, config blob creation time
//! - **Deletion**: manifest deletion by digest
//! - **Authentication**: basic, static bearer, token challenges, Docker credential store
//! - **Limits**: per-host in-flight and per-second request limits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use regmaid_registry::{RegistryAuth, RegistryClient, RegistryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RegistryConfig::new("registry.example.com")
//!         .with_auth(RegistryAuth::basic("user", "secret"));
//!
//!     let client = RegistryClient::new(config)?;
//!     let tags = client.list_tags("team/app").await?;
//!     println!("{} tags", tags.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │             RegistryHub (RegistryGateway)            │
//! │   host ──► RegistryClient ──► RequestLimiter         │
//! └──────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌──────────────────────────────────────────────────────┐
//! │                  OCI Registry                        │
//! │   (Docker Registry, Harbor, GHCR, Docker Hub, ...)   │
//! └──────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod auth;
mod client;
mod config;
mod error;
mod gateway;
mod hub;
mod limiter;
mod oci;

pub use auth::{BearerChallenge, DockerAuthEntry, DockerConfigFile, TokenResponse};
pub use client::RegistryClient;
pub use config::{
    PemSource, RegistryAuth, RegistryConfig, TlsConfig, DEFAULT_MAX_CONCURRENT_REQUESTS,
    DOCKER_HUB_API_HOST, DOCKER_HUB_HOST,
};
pub use error::RegistryError;
pub use gateway::{ImageConfig, ManifestInfo, RegistryGateway, RepositoryRef};
pub use hub::RegistryHub;
pub use limiter::{RequestLimiter, RequestPermit};
pub use oci::{Catalog, ConfigBlob, Descriptor, Manifest, MediaType, TagList};
