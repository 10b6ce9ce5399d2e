//! Repository scanning.
//!
//! A scan lists a repository's tags, keeps those matching the policy's tag
//! pattern and resolves each one to its manifest digest and image age. Tags
//! are resolved concurrently, bounded by a semaphore, and tags sharing a
//! digest are folded into one [`ManifestRecord`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use regmaid_core::{aggregate_by_digest, ManifestRecord, PatternMatcher, ResolvedTag};
use regmaid_registry::{RegistryGateway, RepositoryRef};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::ScanError;

/// Concurrent tag resolutions per scan when the registry sets no limit.
pub const DEFAULT_SCAN_CONCURRENCY: usize = 8;

/// Result of scanning one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Number of tags in the repository before pattern filtering.
    pub total_tags: usize,
    /// Resolved manifests, one per distinct digest.
    pub manifests: Vec<ManifestRecord>,
    /// Matching tags that point at a multi-platform index.
    pub skipped_indexes: usize,
}

/// What resolving a single tag produced.
#[derive(Debug)]
enum TagOutcome {
    Resolved(ResolvedTag),
    Index,
    Skipped,
}

/// Scans repositories through a [`RegistryGateway`].
#[derive(Clone)]
pub struct RepositoryScanner {
    gateway: Arc<dyn RegistryGateway>,
    concurrency: usize,
}

impl std::fmt::Debug for RepositoryScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryScanner")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl RepositoryScanner {
    /// Creates a scanner using [`DEFAULT_SCAN_CONCURRENCY`].
    pub fn new(gateway: Arc<dyn RegistryGateway>) -> Self {
        Self {
            gateway,
            concurrency: DEFAULT_SCAN_CONCURRENCY,
        }
    }

    /// Sets how many tags are resolved at once. Zero keeps the default.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        if concurrency > 0 {
            self.concurrency = concurrency;
        }
        self
    }

    /// Returns the number of tags resolved at once.
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Scans `repository` for tags matching `pattern`.
    ///
    /// Tags that cannot be resolved, point at an index, or carry no creation
    /// time are logged and left out. Cancelling `cancel` aborts every
    /// outstanding tag resolution.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile, the tags cannot be
    /// listed, or the scan is cancelled.
    pub async fn scan(
        &self,
        repository: &RepositoryRef,
        pattern: &str,
        is_regex: bool,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome, ScanError> {
        let matcher = PatternMatcher::compile(pattern, is_regex)?;
        let cancelled = || ScanError::Cancelled {
            repository: repository.to_string(),
        };

        let tags = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(cancelled()),
            tags = self.gateway.list_tags(repository) => tags.map_err(|source| ScanError::ListTags {
                repository: repository.to_string(),
                source,
            })?,
        };

        let total_tags = tags.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for tag in tags.into_iter().filter(|tag| matcher.is_match(tag)) {
            let gateway = Arc::clone(&self.gateway);
            let semaphore = Arc::clone(&semaphore);
            let repository = repository.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                resolve_tag(gateway.as_ref(), &repository, tag).await
            });
        }

        let matched = tasks.len();
        let mut resolved = Vec::with_capacity(matched);
        let mut skipped_indexes = 0;

        loop {
            let joined = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tasks.abort_all();
                    return Err(cancelled());
                }
                joined = tasks.join_next() => joined,
            };

            match joined {
                None => break,
                Some(Ok(TagOutcome::Resolved(tag))) => resolved.push(tag),
                Some(Ok(TagOutcome::Index)) => skipped_indexes += 1,
                Some(Ok(TagOutcome::Skipped)) => {}
                Some(Err(e)) => tracing::warn!(%repository, error = %e, "tag resolution task failed"),
            }
        }

        let manifests = aggregate_by_digest(resolved);
        tracing::debug!(
            %repository,
            total_tags,
            matched,
            manifests = manifests.len(),
            skipped_indexes,
            "scanned repository"
        );

        Ok(ScanOutcome {
            total_tags,
            manifests,
            skipped_indexes,
        })
    }
}

/// Resolves one tag to its digest and age.
async fn resolve_tag(
    gateway: &dyn RegistryGateway,
    repository: &RepositoryRef,
    tag: String,
) -> TagOutcome {
    let manifest = match gateway.get_manifest(repository, &tag).await {
        Ok(manifest) => manifest,
        Err(e) if e.is_not_found() => {
            tracing::debug!(reference = %repository.with_tag(&tag), "tag disappeared during scan");
            return TagOutcome::Skipped;
        }
        Err(e) => {
            tracing::warn!(reference = %repository.with_tag(&tag), error = %e, "failed to retrieve manifest");
            return TagOutcome::Skipped;
        }
    };

    if manifest.is_index {
        tracing::warn!(
            reference = %repository.with_tag(&tag),
            digest = %manifest.digest,
            "multi-platform indexes are not supported, skipping"
        );
        return TagOutcome::Index;
    }

    let Some(config_digest) = manifest.config_digest.as_deref() else {
        tracing::warn!(reference = %repository.with_tag(&tag), "manifest has no config, skipping");
        return TagOutcome::Skipped;
    };

    let created = match gateway.get_image_config(repository, config_digest).await {
        Ok(config) => config.created,
        Err(e) => {
            tracing::warn!(
                reference = %repository.with_tag(&tag),
                error = %e,
                "unable to determine age of manifest"
            );
            return TagOutcome::Skipped;
        }
    };

    let Some(created) = created else {
        tracing::warn!(reference = %repository.with_tag(&tag), "image has no creation time, skipping");
        return TagOutcome::Skipped;
    };

    // Future timestamps count as brand new.
    let age = (Utc::now() - created).to_std().unwrap_or(Duration::ZERO);

    TagOutcome::Resolved(ResolvedTag {
        tag,
        digest: manifest.digest,
        age,
    })
}
