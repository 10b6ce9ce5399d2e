//! In-memory registry used by the cleaner integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regmaid_core::{Config, Policy, Registry};
use regmaid_registry::{
    ImageConfig, ManifestInfo, RegistryError, RegistryGateway, RepositoryRef,
};

pub const HOST: &str = "registry.test";

#[derive(Debug, Clone)]
enum FakeManifest {
    Image {
        digest: String,
        created: Option<DateTime<Utc>>,
    },
    Index {
        digest: String,
    },
    Broken,
}

/// A registry whose repositories, tags and failures are set up by the test.
#[derive(Debug, Default)]
pub struct FakeRegistry {
    catalog: Vec<String>,
    tags: HashMap<String, Vec<(String, FakeManifest)>>,
    failing_tag_lists: HashSet<String>,
    failing_deletes: HashSet<String>,
    catalog_fails: bool,
    manifest_delay: Option<Duration>,
    delete_delay: Option<Duration>,

    pub catalog_calls: AtomicUsize,
    pub manifest_calls: AtomicUsize,
    manifests_in_flight: AtomicUsize,
    pub peak_manifests_in_flight: AtomicUsize,
    pub deletes: Mutex<Vec<String>>,
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - chrono::Duration::days(days) - chrono::Duration::minutes(1)
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repository(mut self, name: &str) -> Self {
        if !self.catalog.iter().any(|r| r == name) {
            self.catalog.push(name.to_string());
        }
        self.tags.entry(name.to_string()).or_default();
        self
    }

    fn add(mut self, repository: &str, tag: &str, manifest: FakeManifest) -> Self {
        self = self.repository(repository);
        self.tags
            .entry(repository.to_string())
            .or_default()
            .push((tag.to_string(), manifest));
        self
    }

    /// Adds a tag pointing at an image created `age_days` ago.
    pub fn image(self, repository: &str, tag: &str, digest: &str, age_days: i64) -> Self {
        self.add(
            repository,
            tag,
            FakeManifest::Image {
                digest: digest.to_string(),
                created: Some(days_ago(age_days)),
            },
        )
    }

    pub fn image_created(
        self,
        repository: &str,
        tag: &str,
        digest: &str,
        created: DateTime<Utc>,
    ) -> Self {
        self.add(
            repository,
            tag,
            FakeManifest::Image {
                digest: digest.to_string(),
                created: Some(created),
            },
        )
    }

    pub fn undated(self, repository: &str, tag: &str, digest: &str) -> Self {
        self.add(
            repository,
            tag,
            FakeManifest::Image {
                digest: digest.to_string(),
                created: None,
            },
        )
    }

    pub fn index(self, repository: &str, tag: &str, digest: &str) -> Self {
        self.add(
            repository,
            tag,
            FakeManifest::Index {
                digest: digest.to_string(),
            },
        )
    }

    pub fn broken(self, repository: &str, tag: &str) -> Self {
        self.add(repository, tag, FakeManifest::Broken)
    }

    pub fn failing_tag_list(mut self, repository: &str) -> Self {
        self.failing_tag_lists.insert(repository.to_string());
        self
    }

    pub fn failing_delete(mut self, digest: &str) -> Self {
        self.failing_deletes.insert(digest.to_string());
        self
    }

    pub fn failing_catalog(mut self) -> Self {
        self.catalog_fails = true;
        self
    }

    pub fn slow_manifests(mut self, delay: Duration) -> Self {
        self.manifest_delay = Some(delay);
        self
    }

    pub fn slow_deletes(mut self, delay: Duration) -> Self {
        self.delete_delay = Some(delay);
        self
    }

    /// Highest number of `get_manifest` calls observed running at once.
    pub fn peak_manifests(&self) -> usize {
        self.peak_manifests_in_flight.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<String> {
        let mut deleted = self.deletes.lock().unwrap().clone();
        deleted.sort();
        deleted
    }

    fn lookup(&self, repository: &RepositoryRef, tag: &str) -> Option<FakeManifest> {
        self.tags
            .get(&repository.name)?
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, m)| m.clone())
    }

    fn not_found(reference: String) -> RegistryError {
        RegistryError::NotFound { reference }
    }
}

#[async_trait]
impl RegistryGateway for FakeRegistry {
    async fn list_repositories(&self, host: &str) -> Result<Vec<String>, RegistryError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        if self.catalog_fails {
            return Err(RegistryError::HttpError {
                status: 401,
                message: "catalog access denied".to_string(),
            });
        }
        assert_eq!(host, HOST);
        Ok(self.catalog.clone())
    }

    async fn list_tags(&self, repository: &RepositoryRef) -> Result<Vec<String>, RegistryError> {
        if self.failing_tag_lists.contains(&repository.name) {
            return Err(RegistryError::HttpError {
                status: 500,
                message: "tag listing failed".to_string(),
            });
        }
        self.tags
            .get(&repository.name)
            .map(|tags| tags.iter().map(|(t, _)| t.clone()).collect())
            .ok_or_else(|| Self::not_found(repository.to_string()))
    }

    async fn get_manifest(
        &self,
        repository: &RepositoryRef,
        tag: &str,
    ) -> Result<ManifestInfo, RegistryError> {
        self.manifest_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.manifests_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_manifests_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.manifest_delay {
            tokio::time::sleep(delay).await;
        }
        self.manifests_in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.lookup(repository, tag) {
            Some(FakeManifest::Image { digest, .. }) => Ok(ManifestInfo {
                config_digest: Some(format!("config-{tag}")),
                digest,
                is_index: false,
            }),
            Some(FakeManifest::Index { digest }) => Ok(ManifestInfo {
                digest,
                is_index: true,
                config_digest: None,
            }),
            Some(FakeManifest::Broken) => Err(RegistryError::HttpError {
                status: 500,
                message: "manifest unavailable".to_string(),
            }),
            None => Err(Self::not_found(repository.with_tag(tag))),
        }
    }

    async fn get_image_config(
        &self,
        repository: &RepositoryRef,
        config_digest: &str,
    ) -> Result<ImageConfig, RegistryError> {
        let tag = config_digest.trim_start_matches("config-");
        match self.lookup(repository, tag) {
            Some(FakeManifest::Image { created, .. }) => Ok(ImageConfig { created }),
            _ => Err(Self::not_found(repository.with_digest(config_digest))),
        }
    }

    async fn delete_manifest(
        &self,
        repository: &RepositoryRef,
        digest: &str,
    ) -> Result<(), RegistryError> {
        if let Some(delay) = self.delete_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_deletes.contains(digest) {
            return Err(RegistryError::HttpError {
                status: 405,
                message: "deletion disabled".to_string(),
            });
        }
        self.deletes
            .lock()
            .unwrap()
            .push(format!("{}@{digest}", repository.name));
        Ok(())
    }
}

pub fn registry() -> Registry {
    Registry {
        name: "main".to_string(),
        host: HOST.to_string(),
        ..Registry::default()
    }
}

pub fn policy(name: &str, repository: &str, keep: u32, retention: &str) -> Policy {
    Policy {
        name: name.to_string(),
        registry: "main".to_string(),
        repository: repository.to_string(),
        keep,
        retention: retention.to_string(),
        ..Policy::default()
    }
}

pub fn config(policies: Vec<Policy>) -> Config {
    Config {
        registries: vec![registry()],
        policies,
        ..Config::default()
    }
}
