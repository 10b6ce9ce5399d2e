//! Regmaid Cleaner
//!
//! This crate applies retention policies to container registries: it finds
//! the repositories a policy targets, scans their tags, decides which
//! manifests are eligible for deletion and deletes them.
//!
//! # Overview
//!
//! The cleaner handles:
//! - **Repository resolution**: exact names or globs over the registry catalog
//! - **Scanning**: concurrent tag resolution to digest and image age
//! - **Evaluation**: keep-count and minimum-age rules per policy
//! - **Reporting**: per-repository eligible manifests and a grand total
//! - **Deletion**: confirmed, deduplicated, concurrent manifest deletion
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────┐
//!                    │       Cleaner       │
//!                    └──────────┬──────────┘
//!                               │ one task per policy
//!        ┌──────────────────────┼──────────────────────┐
//!        ▼                      ▼                      ▼
//! ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//! │  Resolver   │       │  Resolver   │       │  Resolver   │
//! └──────┬──────┘       └──────┬──────┘       └──────┬──────┘
//!        │ one task per repository                   │
//!        ▼                                           ▼
//! ┌─────────────┐                             ┌─────────────┐
//! │   Scanner   │ ── one task per tag ──►     │   Scanner   │
//! └─────────────┘                             └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use regmaid_cleaner::{Cleaner, RunOptions};
//! use regmaid_core::Config;
//! use regmaid_registry::RegistryHub;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("regmaid.yaml")?;
//!     let hub = Arc::new(RegistryHub::from_config(&config)?);
//!
//!     let cleaner = Cleaner::new(hub, config)
//!         .with_options(RunOptions::default().with_dry_run(true));
//!
//!     let input = std::io::BufReader::new(std::io::stdin());
//!     let summary = cleaner
//!         .run(input, std::io::stdout(), &CancellationToken::new())
//!         .await?;
//!     println!("{} manifests eligible", summary.eligible);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::significant_drop_tightening)]

pub mod error;
pub mod orchestrator;
pub mod report;
pub mod resolver;
pub mod scanner;

// Re-export main types at crate root
pub use error::{CleanError, PolicyError, ResolveError, Result, ScanError};
pub use orchestrator::{Cleaner, PolicyResult, RunOptions, RunOutcome, RunSummary};
pub use resolver::resolve;
pub use scanner::{RepositoryScanner, ScanOutcome, DEFAULT_SCAN_CONCURRENCY};
