//! Scanned manifests and digest aggregation.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// A tag resolved to the manifest it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTag {
    /// Tag name.
    pub tag: String,
    /// Content digest of the manifest the tag points at.
    pub digest: String,
    /// Time elapsed since the image's creation timestamp.
    pub age: Duration,
}

/// A deletable manifest and every scanned tag bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRecord {
    /// Content digest (e.g. `sha256:...`).
    pub digest: String,
    /// Tags pointing at this digest, sorted.
    pub tags: BTreeSet<String>,
    /// Time elapsed since the image's creation timestamp.
    pub age: Duration,
}

impl ManifestRecord {
    /// Creates a record with a single tag.
    #[must_use]
    pub fn new(digest: impl Into<String>, tag: impl Into<String>, age: Duration) -> Self {
        Self {
            digest: digest.into(),
            tags: BTreeSet::from([tag.into()]),
            age,
        }
    }

    /// Returns the age in whole days, rounded down.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use regmaid_core::ManifestRecord;
    ///
    /// let record = ManifestRecord::new("sha256:abc", "latest", Duration::from_secs(47 * 3600));
    /// assert_eq!(record.age_days(), 1);
    /// ```
    #[must_use]
    pub const fn age_days(&self) -> u64 {
        self.age.as_secs() / SECONDS_PER_DAY
    }

    /// Returns the tags joined with `", "`.
    #[must_use]
    pub fn tag_list(&self) -> String {
        self.tags.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    }
}

impl From<ResolvedTag> for ManifestRecord {
    fn from(resolved: ResolvedTag) -> Self {
        Self::new(resolved.digest, resolved.tag, resolved.age)
    }
}

/// Groups resolved tags by digest.
///
/// The first tag seen for a digest creates the record and later tags are
/// added to its tag set. Tags sharing a digest share an image config, so the
/// first resolved age is kept.
pub fn aggregate_by_digest<I>(resolved: I) -> Vec<ManifestRecord>
where
    I: IntoIterator<Item = ResolvedTag>,
{
    let mut records: Vec<ManifestRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for tag in resolved {
        if let Some(&i) = index.get(&tag.digest) {
            records[i].tags.insert(tag.tag);
        } else {
            index.insert(tag.digest.clone(), records.len());
            records.push(tag.into());
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(tag: &str, digest: &str, days: u64) -> ResolvedTag {
        ResolvedTag {
            tag: tag.to_string(),
            digest: digest.to_string(),
            age: Duration::from_secs(days * SECONDS_PER_DAY),
        }
    }

    #[test]
    fn test_shared_digest_collapses() {
        let records = aggregate_by_digest(vec![
            resolved("latest", "sha256:aaa", 2),
            resolved("v1.0", "sha256:aaa", 2),
        ]);

        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].tags,
            BTreeSet::from(["latest".to_string(), "v1.0".to_string()])
        );
        assert_eq!(records[0].tag_list(), "latest, v1.0");
    }

    #[test]
    fn test_distinct_digests_stay_separate() {
        let records = aggregate_by_digest(vec![
            resolved("v1", "sha256:aaa", 5),
            resolved("v2", "sha256:bbb", 3),
            resolved("stable", "sha256:aaa", 5),
        ]);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].digest, "sha256:aaa");
        assert_eq!(records[0].tags.len(), 2);
        assert_eq!(records[1].digest, "sha256:bbb");
        assert_eq!(records[1].age_days(), 3);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate_by_digest(Vec::new()).is_empty());
    }
}
