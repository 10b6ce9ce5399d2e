//! Error types for the cleaner crate.
//!
//! This module defines the errors raised while resolving repositories,
//! scanning them and running a cleanup.

use regmaid_core::PatternError;
use regmaid_registry::RegistryError;
use thiserror::Error;

/// Result type alias for cleanup runs.
pub type Result<T> = std::result::Result<T, CleanError>;

/// Repository resolution failures. Fatal to the owning policy.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The catalog of the registry could not be listed.
    #[error("failed to list repositories on '{host}': {source}")]
    Catalog {
        /// Registry host.
        host: String,
        /// Underlying registry error.
        #[source]
        source: RegistryError,
    },

    /// The repository specifier is not a valid glob.
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Repository scan failures. Fatal to the owning repository's scan only.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The tags of the repository could not be listed.
    #[error("failed to list tags of '{repository}': {source}")]
    ListTags {
        /// Repository reference.
        repository: String,
        /// Underlying registry error.
        #[source]
        source: RegistryError,
    },

    /// The tag pattern did not compile.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// The scan was cancelled before it completed.
    #[error("scan of '{repository}' was cancelled")]
    Cancelled {
        /// Repository reference.
        repository: String,
    },
}

/// Why a policy produced no usable result for a repository.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// Repository resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Scanning a resolved repository failed.
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Errors that end a cleanup run.
#[derive(Error, Debug)]
pub enum CleanError {
    /// A policy names a registry that is not configured.
    #[error("policy '{policy}' references unknown registry '{registry}'")]
    UnknownRegistry {
        /// Policy name.
        policy: String,
        /// Registry name the policy references.
        registry: String,
    },

    /// One or more policies finished with an error.
    #[error("{count} policy scan(s) finished with an error")]
    PoliciesFailed {
        /// Number of failed (policy, repository) results.
        count: usize,
    },

    /// The run was cancelled.
    #[error("cleanup was cancelled")]
    Cancelled,

    /// Reading the confirmation or writing the report failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CleanError {
    /// Returns true if the run was interrupted rather than failing.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CleanError::UnknownRegistry {
            policy: "app".to_string(),
            registry: "missing".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "policy 'app' references unknown registry 'missing'"
        );
    }

    #[test]
    fn test_scan_error_wraps_into_policy_error() {
        let err: PolicyError = ScanError::Cancelled {
            repository: "r/app".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "scan of 'r/app' was cancelled");
    }

    #[test]
    fn test_cancelled() {
        assert!(CleanError::Cancelled.is_cancelled());
        assert!(!CleanError::PoliciesFailed { count: 1 }.is_cancelled());
    }
}
