//! Clean command: applies every configured retention policy.

use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use regmaid_cleaner::{Cleaner, RunOptions, RunOutcome, RunSummary};
use regmaid_core::Config;
use regmaid_registry::RegistryHub;
use tokio_util::sync::CancellationToken;

use super::GlobalArgs;

/// Execute the clean command.
pub async fn execute(args: &GlobalArgs, cancel: CancellationToken) -> Result<()> {
    let config = load_config(&args.config)?;

    let hub = RegistryHub::from_config(&config).context("Failed to create registry clients")?;
    let options = RunOptions::default()
        .with_dry_run(args.dry_run)
        .with_assume_yes(args.yes);

    tracing::debug!(
        registries = hub.len(),
        policies = config.policies.len(),
        dry_run = options.dry_run,
        "starting cleanup"
    );

    let cleaner = Cleaner::new(Arc::new(hub), config).with_options(options);
    let summary = cleaner
        .run(BufReader::new(std::io::stdin()), std::io::stdout().lock(), &cancel)
        .await
        .context("Cleanup failed")?;

    log_summary(&summary);
    Ok(())
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load(path).with_context(|| format!("Failed to load config from {}", path.display()))
}

fn log_summary(summary: &RunSummary) {
    match summary.outcome {
        RunOutcome::DryRun => tracing::info!(eligible = summary.eligible, "dry run complete"),
        RunOutcome::NothingToDelete => tracing::info!("nothing to delete"),
        RunOutcome::Declined => tracing::info!(eligible = summary.eligible, "deletion declined"),
        RunOutcome::Completed if summary.failed > 0 => tracing::warn!(
            deleted = summary.deleted,
            failed = summary.failed,
            "some manifests could not be deleted"
        ),
        RunOutcome::Completed => tracing::info!(deleted = summary.deleted, "cleanup complete"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_config_reports_path() {
        let err = load_config(Path::new("/nonexistent/regmaid.yaml")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/regmaid.yaml"));
    }

    #[test]
    fn test_load_config_rejects_invalid_policy() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "registries:\n  - name: main\n    host: r.example.com\npolicies:\n  - name: app\n    registry: missing\n    repository: app\n    keep: 1\n"
        )
        .unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("missing"));
    }

    #[tokio::test]
    async fn test_execute_with_no_policies() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "registries:\n  - name: main\n    host: r.example.com\n").unwrap();

        let args = GlobalArgs {
            config: file.path().to_path_buf(),
            verbose: false,
            yes: false,
            dry_run: true,
        };
        execute(&args, CancellationToken::new()).await.unwrap();
    }
}
