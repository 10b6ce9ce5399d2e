//! Cleanup orchestration.
//!
//! [`Cleaner`] runs every policy concurrently, scans every repository a
//! policy resolves to concurrently, and collects one [`PolicyResult`] per
//! (policy, repository) pair behind a single mutex. Once every task has
//! finished it reports, asks for confirmation and deletes the eligible
//! manifests. The run-wide cancellation token is honoured at every stage,
//! including the confirmation prompt and deletion.

use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use regmaid_core::{evaluate, parse_retention, Config, ManifestRecord, Policy, Registry};
use regmaid_registry::{RegistryError, RegistryGateway, RepositoryRef};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::{CleanError, PolicyError, Result};
use crate::report;
use crate::resolver::resolve;
use crate::scanner::RepositoryScanner;

/// Flags controlling a cleanup run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Report only, never delete.
    pub dry_run: bool,
    /// Delete without asking for confirmation.
    pub assume_yes: bool,
}

impl RunOptions {
    /// Sets dry-run mode.
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets auto-confirmation.
    pub const fn with_assume_yes(mut self, assume_yes: bool) -> Self {
        self.assume_yes = assume_yes;
        self
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Reported only.
    DryRun,
    /// No policy found anything eligible.
    NothingToDelete,
    /// The confirmation prompt was not answered with `yes`.
    Declined,
    /// Deletion ran.
    Completed,
}

/// Summary of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Eligible manifests across every policy.
    pub eligible: usize,
    /// Manifests deleted.
    pub deleted: usize,
    /// Manifest deletions that failed.
    pub failed: usize,
    /// How the run ended.
    pub outcome: RunOutcome,
}

impl RunSummary {
    const fn without_deletion(eligible: usize, outcome: RunOutcome) -> Self {
        Self {
            eligible,
            deleted: 0,
            failed: 0,
            outcome,
        }
    }
}

/// Evaluation of one policy against one repository.
#[derive(Debug)]
pub struct PolicyResult {
    /// The policy evaluated.
    pub policy: Policy,
    /// The repository scanned. For resolution failures the name is the
    /// unresolved specifier.
    pub repository: RepositoryRef,
    /// Tags in the repository before pattern filtering.
    pub total_tags: usize,
    /// Manifests eligible for deletion, newest first.
    pub eligible: Vec<ManifestRecord>,
    /// Matching tags skipped because they point at a multi-platform index.
    pub skipped_indexes: usize,
    /// Set when resolution or scanning failed.
    pub error: Option<PolicyError>,
}

impl PolicyResult {
    fn failed(policy: Policy, repository: RepositoryRef, error: impl Into<PolicyError>) -> Self {
        Self {
            policy,
            repository,
            total_tags: 0,
            eligible: Vec::new(),
            skipped_indexes: 0,
            error: Some(error.into()),
        }
    }

    /// Number of tags bound to the eligible manifests.
    pub fn eligible_tags(&self) -> usize {
        self.eligible.iter().map(|m| m.tags.len()).sum()
    }
}

/// Deletion counts for one or more repositories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DeletionStats {
    deleted: usize,
    failed: usize,
    interrupted: usize,
}

/// Per-digest deletion outcomes of one result. `None` marks a deletion
/// that was cut short by cancellation.
type DigestOutcomes = Vec<(String, Option<std::result::Result<(), RegistryError>>)>;

/// Runs retention policies against registries.
#[derive(Clone)]
pub struct Cleaner {
    gateway: Arc<dyn RegistryGateway>,
    config: Arc<Config>,
    options: RunOptions,
}

impl std::fmt::Debug for Cleaner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cleaner")
            .field("policies", &self.config.policies.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Cleaner {
    /// Creates a cleaner for `config` talking to registries through `gateway`.
    pub fn new(gateway: Arc<dyn RegistryGateway>, config: Config) -> Self {
        Self {
            gateway,
            config: Arc::new(config),
            options: RunOptions::default(),
        }
    }

    /// Sets the run options.
    pub const fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the run options.
    pub const fn options(&self) -> RunOptions {
        self.options
    }

    /// Runs a full cleanup: evaluate, report to `output`, confirm on
    /// `input`, delete.
    ///
    /// Declining the prompt, a dry run, and finding nothing eligible are all
    /// successful outcomes. Individual deletion failures are reported and
    /// counted but do not fail the run.
    ///
    /// # Errors
    ///
    /// Returns [`CleanError::UnknownRegistry`] for dangling policy
    /// references, [`CleanError::PoliciesFailed`] if any policy could not be
    /// fully evaluated, [`CleanError::Cancelled`] on cancellation (including
    /// while waiting at the prompt or part-way through deletion), and
    /// [`CleanError::Io`] if the prompt or report cannot be read or written.
    pub async fn run<R, W>(
        &self,
        input: R,
        mut output: W,
        cancel: &CancellationToken,
    ) -> Result<RunSummary>
    where
        R: BufRead + Send + 'static,
        W: Write,
    {
        let results = self.evaluate(cancel).await?;

        let failed = report::write_errors(&mut output, &results)?;
        if failed > 0 {
            return Err(CleanError::PoliciesFailed { count: failed });
        }

        report::write_report(&mut output, &results)?;
        let eligible: usize = results.iter().map(|r| r.eligible.len()).sum();

        if self.options.dry_run {
            tracing::info!(eligible, "dry run, nothing deleted");
            return Ok(RunSummary::without_deletion(eligible, RunOutcome::DryRun));
        }

        if eligible == 0 {
            writeln!(
                output,
                "No policies found any tags eligible for deletion, therefore exiting."
            )?;
            return Ok(RunSummary::without_deletion(0, RunOutcome::NothingToDelete));
        }

        if !self.options.assume_yes && !confirm(input, &mut output, cancel).await? {
            writeln!(output, "Cancelled deletion.")?;
            return Ok(RunSummary::without_deletion(eligible, RunOutcome::Declined));
        }

        if cancel.is_cancelled() {
            return Err(CleanError::Cancelled);
        }

        let stats = self.delete(&results, &mut output, cancel).await?;
        if stats.interrupted > 0 {
            writeln!(
                output,
                "Deletion interrupted, {} manifest(s) left in place.",
                stats.interrupted
            )?;
            tracing::warn!(
                deleted = stats.deleted,
                failed = stats.failed,
                interrupted = stats.interrupted,
                "cleanup cancelled during deletion"
            );
            return Err(CleanError::Cancelled);
        }
        writeln!(output, "Finished.")?;

        tracing::info!(
            eligible,
            deleted = stats.deleted,
            failed = stats.failed,
            "cleanup finished"
        );

        Ok(RunSummary {
            eligible,
            deleted: stats.deleted,
            failed: stats.failed,
            outcome: RunOutcome::Completed,
        })
    }

    /// Evaluates every policy and returns one result per (policy,
    /// repository), ordered by policy then repository.
    ///
    /// # Errors
    ///
    /// Returns an error if a policy references an unknown registry or the
    /// run is cancelled. Resolution and scan failures are carried in the
    /// returned results.
    pub async fn evaluate(&self, cancel: &CancellationToken) -> Result<Vec<PolicyResult>> {
        let mut targets = Vec::with_capacity(self.config.policies.len());
        for policy in &self.config.policies {
            let registry = self.config.registry(&policy.registry).ok_or_else(|| {
                CleanError::UnknownRegistry {
                    policy: policy.name.clone(),
                    registry: policy.registry.clone(),
                }
            })?;
            targets.push((policy.clone(), registry.clone()));
        }

        let results = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = JoinSet::new();

        for (order, (policy, registry)) in targets.into_iter().enumerate() {
            let task = PolicyTask {
                gateway: Arc::clone(&self.gateway),
                results: Arc::clone(&results),
                cancel: cancel.clone(),
                order,
            };
            tasks.spawn(task.run(policy, registry));
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "policy task failed");
            }
        }

        if cancel.is_cancelled() {
            return Err(CleanError::Cancelled);
        }

        let mut collected = std::mem::take(&mut *results.lock().await);
        collected.sort_by(|(a_order, a), (b_order, b)| {
            a_order
                .cmp(b_order)
                .then_with(|| a.repository.name.cmp(&b.repository.name))
        });

        Ok(collected.into_iter().map(|(_, result)| result).collect())
    }

    /// Deletes the eligible manifests of every result, one spawned task per
    /// result and one concurrent deletion per distinct digest. Deletions
    /// still pending when `cancel` fires are dropped and counted as
    /// interrupted.
    async fn delete<W: Write>(
        &self,
        results: &[PolicyResult],
        output: &mut W,
        cancel: &CancellationToken,
    ) -> Result<DeletionStats> {
        let mut tasks = JoinSet::new();
        for (order, result) in results.iter().enumerate() {
            if result.eligible.is_empty() {
                continue;
            }
            let digests: BTreeSet<String> =
                result.eligible.iter().map(|m| m.digest.clone()).collect();
            let gateway = Arc::clone(&self.gateway);
            let repository = result.repository.clone();
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let outcomes = delete_digests(gateway.as_ref(), &repository, digests, &cancel).await;
                (order, repository, outcomes)
            });
        }

        let mut per_result = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(done) => per_result.push(done),
                Err(e) => tracing::error!(error = %e, "deletion task failed"),
            }
        }
        per_result.sort_by_key(|(order, _, _)| *order);

        let mut stats = DeletionStats::default();
        for (_, repository, outcomes) in per_result {
            for (digest, outcome) in outcomes {
                let reference = repository.with_digest(&digest);
                match outcome {
                    Some(Ok(())) => {
                        stats.deleted += 1;
                        writeln!(output, "Deleted manifest {reference}")?;
                    }
                    Some(Err(e)) => {
                        stats.failed += 1;
                        writeln!(output, "Error deleting manifest {reference}: {e}")?;
                    }
                    None => stats.interrupted += 1,
                }
            }
        }

        Ok(stats)
    }
}

async fn delete_digests(
    gateway: &dyn RegistryGateway,
    repository: &RepositoryRef,
    digests: BTreeSet<String>,
    cancel: &CancellationToken,
) -> DigestOutcomes {
    join_all(digests.into_iter().map(|digest| async move {
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            outcome = gateway.delete_manifest(repository, &digest) => Some(outcome),
        };
        let reference = repository.with_digest(&digest);
        match &outcome {
            Some(Ok(())) => tracing::info!(reference = %reference, "deleted manifest"),
            Some(Err(e)) => tracing::error!(
                reference = %reference,
                error = %e,
                "failed to delete manifest"
            ),
            None => tracing::debug!(reference = %reference, "deletion cancelled"),
        }
        (digest, outcome)
    }))
    .await
}

/// Prompts on `output` and waits for an answer on `input` or cancellation.
///
/// The answer is read on a dedicated thread so a blocked read never stalls a
/// runtime worker or runtime shutdown.
async fn confirm<R, W>(input: R, output: &mut W, cancel: &CancellationToken) -> Result<bool>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    report::write_prompt(output)?;

    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut input = input;
        let _ = tx.send(report::read_answer(&mut input));
    });

    let answer = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            writeln!(output)?;
            return Err(CleanError::Cancelled);
        }
        answer = rx => answer.map_err(|_| io::Error::other("confirmation reader stopped"))??,
    };

    match answer {
        Some(line) => Ok(report::is_confirmation(&line)),
        None => {
            writeln!(output)?;
            Ok(false)
        }
    }
}

/// Everything one policy task needs, owned so the task can be spawned.
struct PolicyTask {
    gateway: Arc<dyn RegistryGateway>,
    results: Arc<Mutex<Vec<(usize, PolicyResult)>>>,
    cancel: CancellationToken,
    order: usize,
}

impl PolicyTask {
    async fn run(self, policy: Policy, registry: Registry) {
        tracing::info!(policy = %policy.name, registry = %registry.name, "processing policy");

        let retention = parse_retention(&policy.retention).unwrap_or_else(|e| {
            tracing::warn!(policy = %policy.name, error = %e, "invalid retention, using no minimum age");
            Duration::ZERO
        });
        let keep = usize::try_from(policy.keep).unwrap_or(usize::MAX);

        let resolved = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return,
            resolved = resolve(self.gateway.as_ref(), &registry.host, &policy.repository) => resolved,
        };

        let repositories = match resolved {
            Ok(repositories) => repositories,
            Err(e) => {
                let specifier = RepositoryRef::new(&registry.host, &policy.repository);
                self.push(PolicyResult::failed(policy, specifier, e)).await;
                return;
            }
        };

        if repositories.is_empty() {
            tracing::info!(policy = %policy.name, specifier = %policy.repository, "no repositories matched");
        }

        let scanner = RepositoryScanner::new(Arc::clone(&self.gateway)).with_concurrency(
            usize::try_from(registry.max_concurrent_requests).unwrap_or_default(),
        );
        let policy = Arc::new(policy);
        let this = Arc::new(self);
        let mut scans = JoinSet::new();

        for name in repositories {
            let repository = RepositoryRef::new(&registry.host, name);
            let scanner = scanner.clone();
            let policy = Arc::clone(&policy);
            let this = Arc::clone(&this);

            scans.spawn(async move {
                let result = match scanner
                    .scan(&repository, &policy.pattern, policy.regex, &this.cancel)
                    .await
                {
                    Ok(outcome) => PolicyResult {
                        policy: (*policy).clone(),
                        repository,
                        total_tags: outcome.total_tags,
                        eligible: evaluate(outcome.manifests, keep, retention),
                        skipped_indexes: outcome.skipped_indexes,
                        error: None,
                    },
                    Err(e) => PolicyResult::failed((*policy).clone(), repository, e),
                };
                this.push(result).await;
            });
        }

        while let Some(joined) = scans.join_next().await {
            if let Err(e) = joined {
                tracing::error!(policy = %policy.name, error = %e, "repository scan task failed");
            }
        }

        tracing::info!(policy = %policy.name, "finished processing policy");
    }

    async fn push(&self, result: PolicyResult) {
        self.results.lock().await.push((self.order, result));
    }
}
