//! Expands a policy's repository specifier into concrete repositories.

use regmaid_core::{has_wildcard, PatternMatcher};
use regmaid_registry::RegistryGateway;

use crate::error::ResolveError;

/// Resolves `specifier` on `host` to repository names.
///
/// A specifier without `*` or `?` is returned as-is without contacting the
/// registry. Otherwise the catalog is listed and filtered with the specifier
/// as a glob.
///
/// # Errors
///
/// Returns an error if the catalog cannot be listed.
pub async fn resolve(
    gateway: &dyn RegistryGateway,
    host: &str,
    specifier: &str,
) -> Result<Vec<String>, ResolveError> {
    if !has_wildcard(specifier) {
        return Ok(vec![specifier.to_string()]);
    }

    let matcher = PatternMatcher::glob(specifier)?;
    let catalog = gateway
        .list_repositories(host)
        .await
        .map_err(|source| ResolveError::Catalog {
            host: host.to_string(),
            source,
        })?;

    let total = catalog.len();
    let repositories: Vec<String> = catalog
        .into_iter()
        .filter(|name| matcher.is_match(name))
        .collect();

    tracing::debug!(
        host,
        specifier,
        total,
        matched = repositories.len(),
        "resolved repository specifier"
    );

    Ok(repositories)
}
