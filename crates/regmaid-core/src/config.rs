//! Configuration file model.
//!
//! The configuration declares the registries regmaid talks to and the
//! retention policies applied to them. It is loaded once per run, overlaid
//! with credentials from the environment and validated before any registry
//! is contacted.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::validation::{Validate, ValidationError, ValidationErrors};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "regmaid.yaml";

/// Root of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Registries that policies can target.
    pub registries: Vec<Registry>,

    /// Retention policies.
    pub policies: Vec<Policy>,

    /// Fill missing credentials from the Docker credential store.
    pub docker_creds: bool,
}

/// A container registry host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Registry {
    /// Name that policies use to refer to this registry.
    pub name: String,

    /// Registry host, optionally with port (e.g. `registry.example.com:5000`).
    pub host: String,

    /// Talk plain HTTP instead of HTTPS.
    pub insecure: bool,

    /// Username for basic authentication.
    pub username: String,

    /// Password for basic authentication.
    pub password: String,

    /// Static bearer token.
    pub token: String,

    /// Use TLS but skip certificate verification.
    pub skip_tls_verify: bool,

    /// Client certificate (PEM text or path) for mTLS.
    pub client_cert: String,

    /// Client private key (PEM text or path) for mTLS.
    pub client_key: String,

    /// Additional CA certificate (PEM text or path) trusted for this registry.
    pub reg_cert: String,

    /// Upper bound on in-flight requests to this host. Zero selects the default.
    pub max_concurrent_requests: u32,

    /// Upper bound on requests per second to this host. Zero means unlimited.
    pub max_requests_per_second: u32,
}

/// TLS mode derived from a registry's `insecure` and `skipTlsVerify` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// Verified TLS.
    Enabled,
    /// TLS without certificate verification.
    SkipVerify,
    /// Plain HTTP.
    Disabled,
}

impl Registry {
    /// Returns the prefix of the environment variables that override this
    /// registry's credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use regmaid_core::Registry;
    ///
    /// let registry = Registry { name: "harbor".to_string(), ..Registry::default() };
    /// assert_eq!(registry.env_prefix(), "HARBOR");
    /// ```
    #[must_use]
    pub fn env_prefix(&self) -> String {
        self.name.to_uppercase()
    }

    /// Returns the TLS mode for this registry. `insecure` wins over `skipTlsVerify`.
    #[must_use]
    pub const fn tls_mode(&self) -> TlsMode {
        if self.insecure {
            TlsMode::Disabled
        } else if self.skip_tls_verify {
            TlsMode::SkipVerify
        } else {
            TlsMode::Enabled
        }
    }

    fn apply_env_overrides<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = self.env_prefix();

        if let Some(username) = lookup(&format!("{prefix}_USERNAME")) {
            self.username = username;
        }
        if let Some(password) = lookup(&format!("{prefix}_PASSWORD")) {
            self.password = password;
        }
        if let Some(token) = lookup(&format!("{prefix}_TOKEN")) {
            self.token = token;
        }
        if let Some(key) = lookup(&format!("{prefix}_CLIENTKEY")) {
            self.client_key = key;
        }
    }
}

/// A named retention policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Policy name used in reports.
    pub name: String,

    /// Name of the registry this policy targets.
    pub registry: String,

    /// Repository name, or a glob over repository names.
    pub repository: String,

    /// Tag pattern. Glob unless `regex` is set; empty matches every tag.
    #[serde(rename = "match")]
    pub pattern: String,

    /// Interpret `match` as a regular expression.
    pub regex: bool,

    /// Number of newest images always kept.
    pub keep: u32,

    /// Minimum age before an image becomes eligible (e.g. `30d`).
    pub retention: String,

    /// Allow `keep: 0`.
    pub force: bool,
}

impl Config {
    /// Loads, overlays and validates the configuration at `path`.
    ///
    /// Credentials are overridden from `<NAME>_USERNAME`, `<NAME>_PASSWORD`,
    /// `<NAME>_TOKEN` and `<NAME>_CLIENTKEY` environment variables, where
    /// `<NAME>` is the uppercased registry name.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_yaml(&data)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        tracing::debug!(
            path = %path.display(),
            registries = config.registries.len(),
            policies = config.policies.len(),
            "loaded configuration"
        );

        Ok(config)
    }

    /// Parses a configuration from YAML without overlaying or validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML for this schema.
    pub fn from_yaml(data: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(data).map_err(|source| ConfigError::Parse { source })
    }

    /// Overrides registry credentials with values returned by `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for registry in &mut self.registries {
            registry.apply_env_overrides(&lookup);
        }
    }

    /// Looks up a registry by name.
    #[must_use]
    pub fn registry(&self, name: &str) -> Option<&Registry> {
        self.registries.iter().find(|r| r.name == name)
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut registry_names = HashSet::new();

        for (i, registry) in self.registries.iter().enumerate() {
            if registry.name.is_empty() {
                errors.add(ValidationError::required(format!("registries[{i}].name")));
            } else if !registry_names.insert(registry.name.as_str()) {
                errors.add(ValidationError::duplicate(
                    format!("registries[{i}].name"),
                    format!("registry '{}' is defined more than once", registry.name),
                ));
            }

            if registry.host.is_empty() {
                errors.add(ValidationError::required(format!("registries[{i}].host")));
            }
        }

        for (i, policy) in self.policies.iter().enumerate() {
            if policy.name.is_empty() {
                errors.add(ValidationError::required(format!("policies[{i}].name")));
            }

            if policy.repository.is_empty() {
                errors.add(ValidationError::required(format!("policies[{i}].repository")));
            }

            if policy.registry.is_empty() {
                errors.add(ValidationError::required(format!("policies[{i}].registry")));
            } else if !registry_names.contains(policy.registry.as_str()) {
                errors.add(ValidationError::reference(
                    format!("policies[{i}].registry"),
                    format!(
                        "policy '{}' specified registry '{}' but no such registry was defined",
                        policy.name, policy.registry
                    ),
                ));
            }

            if policy.keep == 0 && !policy.force {
                errors.add(ValidationError::range(
                    format!("policies[{i}].keep"),
                    format!(
                        "policy '{}' must specify 'keep' greater than 0 or set 'force' to true",
                        policy.name
                    ),
                ));
            }
        }

        errors.into_result()
    }
}
