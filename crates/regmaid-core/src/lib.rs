//! # Regmaid Core
//!
//! Configuration model and retention rules for regmaid, a tool that enforces
//! image-retention policies on container registries.
//!
//! This crate is free of I/O beyond reading the config file and provides:
//!
//! - [`Config`] - Registries and policies, loaded from YAML with environment overrides
//! - [`PatternMatcher`] - Glob or regex predicate over repository and tag names
//! - [`ManifestRecord`] - A digest with every tag bound to it and its age
//! - [`evaluate`] - Keep-count and minimum-age rules
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use regmaid_core::{evaluate, parse_retention, ManifestRecord};
//!
//! let day = Duration::from_secs(86_400);
//! let manifests = vec![
//!     ManifestRecord::new("sha256:a", "v1", day),
//!     ManifestRecord::new("sha256:b", "v2", day * 2),
//!     ManifestRecord::new("sha256:c", "v3", day * 3),
//! ];
//!
//! let eligible = evaluate(manifests, 1, parse_retention("2d").unwrap());
//! assert_eq!(eligible.len(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod manifest;
pub mod pattern;
pub mod retention;
pub mod validation;

#[cfg(test)]
mod proptest_tests;

pub use config::{Config, Policy, Registry, TlsMode, DEFAULT_CONFIG_PATH};
pub use error::{ConfigError, PatternError, RetentionError};
pub use manifest::{aggregate_by_digest, ManifestRecord, ResolvedTag};
pub use pattern::{has_wildcard, PatternMatcher};
pub use retention::{evaluate, parse_retention};
pub use validation::{Validate, ValidationError, ValidationErrors};
