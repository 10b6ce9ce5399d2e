//! Routes registry operations to per-host clients.

use std::collections::HashMap;

use async_trait::async_trait;
use regmaid_core::Config;

use crate::auth::DockerConfigFile;
use crate::client::RegistryClient;
use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::gateway::{ImageConfig, ManifestInfo, RegistryGateway, RepositoryRef};

/// One [`RegistryClient`] per configured host.
///
/// Each client owns its own request limiter, so limits apply per host.
#[derive(Debug, Default)]
pub struct RegistryHub {
    clients: HashMap<String, RegistryClient>,
}

impl RegistryHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a client for every registry in `config`.
    ///
    /// When `dockerCreds` is enabled, registries without configured
    /// credentials fall back to the Docker CLI credential store.
    ///
    /// # Errors
    ///
    /// Returns an error if a client cannot be built, for example because of
    /// unreadable certificate material.
    pub fn from_config(config: &Config) -> Result<Self, RegistryError> {
        let docker = if config.docker_creds {
            DockerConfigFile::load()
        } else {
            None
        };

        let mut hub = Self::new();
        for registry in &config.registries {
            let fallback = docker
                .as_ref()
                .and_then(|d| d.credentials_for(&registry.host));
            let client = RegistryClient::new(RegistryConfig::from_registry(registry, fallback))?;
            hub.insert(client);
        }

        Ok(hub)
    }

    /// Adds a client, keyed by its host. The first client for a host wins.
    pub fn insert(&mut self, client: RegistryClient) {
        let host = client.config().host.clone();
        if self.clients.contains_key(&host) {
            tracing::warn!(host = %host, "registry host configured more than once, keeping the first");
            return;
        }
        tracing::debug!(host = %host, url = %client.config().url, "registered registry client");
        self.clients.insert(host, client);
    }

    /// Returns the client for `host`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownHost`] if no client serves `host`.
    pub fn client(&self, host: &str) -> Result<&RegistryClient, RegistryError> {
        self.clients
            .get(host)
            .ok_or_else(|| RegistryError::UnknownHost {
                host: host.to_string(),
            })
    }

    /// Returns the number of configured hosts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no hosts are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[async_trait]
impl RegistryGateway for RegistryHub {
    async fn list_repositories(&self, host: &str) -> Result<Vec<String>, RegistryError> {
        self.client(host)?.list_repositories().await
    }

    async fn list_tags(&self, repository: &RepositoryRef) -> Result<Vec<String>, RegistryError> {
        self.client(&repository.host)?
            .list_tags(&repository.name)
            .await
    }

    async fn get_manifest(
        &self,
        repository: &RepositoryRef,
        tag: &str,
    ) -> Result<ManifestInfo, RegistryError> {
        self.client(&repository.host)?
            .get_manifest(&repository.name, tag)
            .await
    }

    async fn get_image_config(
        &self,
        repository: &RepositoryRef,
        config_digest: &str,
    ) -> Result<ImageConfig, RegistryError> {
        self.client(&repository.host)?
            .get_image_config(&repository.name, config_digest)
            .await
    }

    async fn delete_manifest(
        &self,
        repository: &RepositoryRef,
        digest: &str,
    ) -> Result<(), RegistryError> {
        self.client(&repository.host)?
            .delete_manifest(&repository.name, digest)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regmaid_core::Registry;

    fn config(hosts: &[&str]) -> Config {
        Config {
            registries: hosts
                .iter()
                .enumerate()
                .map(|(i, host)| Registry {
                    name: format!("r{i}"),
                    host: (*host).to_string(),
                    ..Registry::default()
                })
                .collect(),
            ..Config::default()
        }
    }

    #[test]
    fn test_from_config_builds_client_per_host() {
        let hub = RegistryHub::from_config(&config(&["a.example.com", "b.example.com"])).unwrap();
        assert_eq!(hub.len(), 2);
        assert!(hub.client("a.example.com").is_ok());
    }

    #[test]
    fn test_duplicate_host_keeps_first() {
        let hub = RegistryHub::from_config(&config(&["a.example.com", "a.example.com"])).unwrap();
        assert_eq!(hub.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_host() {
        let hub = RegistryHub::new();
        assert!(hub.is_empty());

        let err = hub
            .list_tags(&RepositoryRef::new("nowhere.example.com", "app"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownHost { .. }));
    }
}
