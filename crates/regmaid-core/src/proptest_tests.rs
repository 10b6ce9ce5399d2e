//! Property-based tests for retention rules and pattern matching.
//!
//! These tests use proptest to verify invariants across many randomly generated inputs.

use std::collections::HashSet;
use std::time::Duration;

use proptest::prelude::*;

use crate::{aggregate_by_digest, evaluate, ManifestRecord, PatternMatcher, ResolvedTag};

/// Strategy for generating a manifest set with distinct digests.
fn manifests_strategy() -> impl Strategy<Value = Vec<ManifestRecord>> {
    prop::collection::vec(0u64..10_000_000, 0..40).prop_map(|ages| {
        ages.into_iter()
            .enumerate()
            .map(|(i, secs)| {
                ManifestRecord::new(format!("sha256:{i:064x}"), format!("t{i}"), Duration::from_secs(secs))
            })
            .collect()
    })
}

/// Strategy for generating tag names.
fn tag_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9._-]{0,20}"
}

proptest! {
    /// The `keep` youngest manifests are never eligible.
    #[test]
    fn newest_are_never_eligible(manifests in manifests_strategy(), keep in 0usize..50) {
        let mut sorted = manifests.clone();
        sorted.sort_by_key(|m| m.age);
        let kept = keep.min(sorted.len());

        let eligible = evaluate(manifests, keep, Duration::ZERO);
        let eligible_digests: HashSet<_> = eligible.iter().map(|m| m.digest.clone()).collect();

        prop_assert_eq!(eligible.len(), sorted.len() - kept);
        for newest in &sorted[..kept] {
            prop_assert!(!eligible_digests.contains(&newest.digest));
        }
    }

    /// Everything returned is at least `retention` old, and everything dropped
    /// past the keep window is younger than `retention`.
    #[test]
    fn retention_splits_by_age(
        manifests in manifests_strategy(),
        keep in 0usize..10,
        retention_secs in 0u64..10_000_000,
    ) {
        let retention = Duration::from_secs(retention_secs);
        let mut sorted = manifests.clone();
        sorted.sort_by_key(|m| m.age);
        let kept = keep.min(sorted.len());

        let eligible = evaluate(manifests, keep, retention);
        let eligible_digests: HashSet<_> = eligible.iter().map(|m| m.digest.clone()).collect();

        for m in &eligible {
            prop_assert!(m.age >= retention);
        }
        for m in &sorted[kept..] {
            if !eligible_digests.contains(&m.digest) {
                prop_assert!(m.age < retention);
            }
        }
    }

    /// Output is ordered by ascending age.
    #[test]
    fn output_is_sorted(manifests in manifests_strategy(), keep in 0usize..10) {
        let eligible = evaluate(manifests, keep, Duration::ZERO);
        prop_assert!(eligible.windows(2).all(|w| w[0].age <= w[1].age));
    }

    /// A glob without wildcards matches exactly itself.
    #[test]
    fn literal_glob_matches_only_itself(tag in tag_strategy(), other in tag_strategy()) {
        let matcher = PatternMatcher::glob(&tag).unwrap();
        prop_assert!(matcher.is_match(&tag));
        prop_assert_eq!(matcher.is_match(&other), other == tag);
    }

    /// A prefix glob matches every name with that prefix.
    #[test]
    fn prefix_glob_matches_extensions(prefix in tag_strategy(), suffix in tag_strategy()) {
        let matcher = PatternMatcher::glob(&format!("{prefix}*")).unwrap();
        let name = format!("{prefix}{suffix}");
        prop_assert!(matcher.is_match(&name));
    }

    /// Aggregation yields one record per digest and loses no tags.
    #[test]
    fn aggregation_preserves_tags(pairs in prop::collection::vec((tag_strategy(), 0u8..5), 0..30)) {
        let resolved: Vec<ResolvedTag> = pairs
            .iter()
            .map(|(tag, d)| ResolvedTag {
                tag: tag.clone(),
                digest: format!("sha256:{d}"),
                age: Duration::from_secs(u64::from(*d)),
            })
            .collect();

        let records = aggregate_by_digest(resolved);
        let digests: HashSet<_> = pairs.iter().map(|(_, d)| *d).collect();
        prop_assert_eq!(records.len(), digests.len());

        let all_tags: HashSet<_> = pairs.iter().map(|(t, _)| t.clone()).collect();
        let collected: HashSet<_> = records.iter().flat_map(|r| r.tags.iter().cloned()).collect();
        prop_assert_eq!(collected, all_tags);
    }
}
