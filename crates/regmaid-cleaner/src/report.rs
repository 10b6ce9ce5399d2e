//! Human-readable run report and the deletion prompt.

use std::io::{self, BufRead, Write};

use crate::orchestrator::PolicyResult;

/// Writes one line per failed result. Returns the number of failures.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_errors<W: Write>(out: &mut W, results: &[PolicyResult]) -> io::Result<usize> {
    let mut failed = 0;
    for result in results {
        if let Some(error) = &result.error {
            writeln!(
                out,
                "Error processing policy {:?} ({}): {error}",
                result.policy.name, result.repository
            )?;
            failed += 1;
        }
    }
    Ok(failed)
}

/// Writes the eligible manifests of every result and the grand total.
///
/// Returns the number of tags that deletion would remove.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_report<W: Write>(out: &mut W, results: &[PolicyResult]) -> io::Result<usize> {
    let mut total = 0;
    let mut manifests = 0;

    for result in results {
        let tags = result.eligible_tags();
        total += tags;
        manifests += result.eligible.len();

        if result.eligible.is_empty() {
            writeln!(
                out,
                "Policy {:?} found 0/{} tags eligible for deletion in {}.",
                result.policy.name, result.total_tags, result.repository
            )?;
        } else {
            writeln!(
                out,
                "Policy {:?} found {tags}/{} tags ({} manifest(s)) eligible for deletion in {}:",
                result.policy.name,
                result.total_tags,
                result.eligible.len(),
                result.repository
            )?;
            for manifest in &result.eligible {
                writeln!(
                    out,
                    "  {} ({}) ({}d)",
                    manifest.tag_list(),
                    manifest.digest,
                    manifest.age_days()
                )?;
            }
        }

        if result.skipped_indexes > 0 {
            writeln!(
                out,
                "  Skipped {} multi-platform index tag(s) in {}.",
                result.skipped_indexes, result.repository
            )?;
        }
    }

    writeln!(out, "Total tags to be deleted: {total} ({manifests} manifest(s))")?;
    Ok(total)
}

/// Writes the deletion prompt.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_prompt<W: Write>(out: &mut W) -> io::Result<()> {
    write!(out, "Enter 'yes' to confirm deletion: ")?;
    out.flush()
}

/// Reads one answer line. Returns `None` at end of input.
///
/// # Errors
///
/// Returns an error if reading fails.
pub fn read_answer<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Only `yes` (trimmed, any case) confirms.
pub fn is_confirmation(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use regmaid_core::{ManifestRecord, Policy};
    use regmaid_registry::RepositoryRef;

    use super::*;
    use crate::error::{PolicyError, ScanError};

    const DAY: u64 = 86_400;

    fn result(name: &str, eligible: Vec<ManifestRecord>, total_tags: usize) -> PolicyResult {
        PolicyResult {
            policy: Policy {
                name: name.to_string(),
                ..Policy::default()
            },
            repository: RepositoryRef::new("registry.example.com", "team/app"),
            total_tags,
            eligible,
            skipped_indexes: 0,
            error: None,
        }
    }

    fn render(results: &[PolicyResult]) -> (String, usize) {
        let mut out = Vec::new();
        let total = write_report(&mut out, results).unwrap();
        (String::from_utf8(out).unwrap(), total)
    }

    #[test]
    fn test_report_lists_eligible_manifests() {
        let mut shared = ManifestRecord::new("sha256:aaa", "latest", Duration::from_secs(40 * DAY));
        shared.tags.insert("v1.0".to_string());
        let old = ManifestRecord::new("sha256:bbb", "v0.9", Duration::from_secs(90 * DAY + 5));

        let (text, total) = render(&[result("app", vec![shared, old], 7)]);

        assert_eq!(total, 3);
        assert_eq!(
            text,
            "Policy \"app\" found 3/7 tags (2 manifest(s)) eligible for deletion in registry.example.com/team/app:\n\
             \x20 latest, v1.0 (sha256:aaa) (40d)\n\
             \x20 v0.9 (sha256:bbb) (90d)\n\
             Total tags to be deleted: 3 (2 manifest(s))\n"
        );
    }

    #[test]
    fn test_report_nothing_eligible() {
        let mut empty = result("app", Vec::new(), 4);
        empty.skipped_indexes = 2;

        let (text, total) = render(&[empty]);
        assert_eq!(total, 0);
        assert!(text.contains("found 0/4 tags eligible for deletion in registry.example.com/team/app."));
        assert!(text.contains("Skipped 2 multi-platform index tag(s)"));
        assert!(text.ends_with("Total tags to be deleted: 0 (0 manifest(s))\n"));
    }

    #[test]
    fn test_write_errors() {
        let mut failed = result("broken", Vec::new(), 0);
        failed.error = Some(PolicyError::Scan(ScanError::Cancelled {
            repository: "registry.example.com/team/app".to_string(),
        }));
        let ok = result("fine", Vec::new(), 0);

        let mut out = Vec::new();
        let count = write_errors(&mut out, &[failed, ok]).unwrap();

        assert_eq!(count, 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Error processing policy \"broken\" (registry.example.com/team/app): \
             scan of 'registry.example.com/team/app' was cancelled\n"
        );
    }

    #[test]
    fn test_prompt_text() {
        let mut out = Vec::new();
        write_prompt(&mut out).unwrap();
        assert_eq!(out, b"Enter 'yes' to confirm deletion: ");
    }

    #[test]
    fn test_read_answer() {
        let mut input = "yes\nno\n".as_bytes();
        assert_eq!(read_answer(&mut input).unwrap().as_deref(), Some("yes\n"));
        assert_eq!(read_answer(&mut input).unwrap().as_deref(), Some("no\n"));
        assert_eq!(read_answer(&mut input).unwrap(), None);
    }

    #[test]
    fn test_confirmation_accepts_yes_variants() {
        for answer in ["yes\n", "YES \n", "  Yes", "yEs\r\n"] {
            assert!(is_confirmation(answer), "{answer:?}");
        }
    }

    #[test]
    fn test_confirmation_declines() {
        for answer in ["no\n", "y\n", "yes please\n", "\n", ""] {
            assert!(!is_confirmation(answer), "{answer:?}");
        }
    }
}
