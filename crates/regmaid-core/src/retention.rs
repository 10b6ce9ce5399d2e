//! Retention rules: which scanned manifests are eligible for deletion.

use std::time::Duration;

use crate::error::RetentionError;
use crate::manifest::ManifestRecord;

/// Parses a retention duration such as `30d`, `2w`, `12h` or `1h30m`.
///
/// An empty string means no minimum age.
///
/// # Errors
///
/// Returns an error if the string is not a valid duration.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use regmaid_core::parse_retention;
///
/// assert_eq!(parse_retention("2d").unwrap(), Duration::from_secs(2 * 86_400));
/// assert_eq!(parse_retention("").unwrap(), Duration::ZERO);
/// assert!(parse_retention("soon").is_err());
/// ```
pub fn parse_retention(value: &str) -> Result<Duration, RetentionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(Duration::ZERO);
    }

    humantime::parse_duration(trimmed).map_err(|source| RetentionError {
        value: value.to_string(),
        source,
    })
}

/// Selects the manifests eligible for deletion.
///
/// Manifests are ordered newest first, the `keep` newest are always kept, and
/// of the rest only those at least `retention` old are returned. A zero
/// retention applies no age filter. The result is ordered newest first.
#[must_use]
pub fn evaluate(
    mut manifests: Vec<ManifestRecord>,
    keep: usize,
    retention: Duration,
) -> Vec<ManifestRecord> {
    manifests.sort_by_key(|m| m.age);

    let kept = keep.min(manifests.len());
    manifests
        .into_iter()
        .skip(kept)
        .filter(|m| m.age >= retention)
        .collect()
}
