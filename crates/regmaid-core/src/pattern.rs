//! Name matching for repositories and tags.
//!
//! Patterns are globs by default: `*` matches any sequence and `?` matches a
//! single character, and the whole name must match. In regex mode the pattern
//! is handed to the regex engine unchanged, so it is not anchored unless the
//! pattern anchors itself.

use regex::Regex;

use crate::error::PatternError;

/// A compiled name predicate.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    regex: Regex,
}

impl PatternMatcher {
    /// Compiles `pattern` as a glob, or as a regular expression when `is_regex` is set.
    ///
    /// An empty pattern matches every name.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting expression is not valid regex syntax.
    ///
    /// # Examples
    ///
    /// ```
    /// use regmaid_core::PatternMatcher;
    ///
    /// let glob = PatternMatcher::compile("app-*", false).unwrap();
    /// assert!(glob.is_match("app-1.0"));
    /// assert!(!glob.is_match("lib-1.0"));
    ///
    /// let regex = PatternMatcher::compile("^v[0-9]+$", true).unwrap();
    /// assert!(regex.is_match("v12"));
    /// assert!(!regex.is_match("v1.2"));
    /// ```
    pub fn compile(pattern: &str, is_regex: bool) -> Result<Self, PatternError> {
        let expression = if is_regex {
            pattern.to_string()
        } else {
            glob_to_regex(pattern)
        };

        let regex = Regex::new(&expression).map_err(|source| PatternError {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self { regex })
    }

    /// Compiles a glob pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the translated expression fails to compile.
    pub fn glob(pattern: &str) -> Result<Self, PatternError> {
        Self::compile(pattern, false)
    }

    /// Returns true if `name` satisfies the pattern.
    #[must_use]
    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// Returns true if `value` contains a glob wildcard.
#[must_use]
pub fn has_wildcard(value: &str) -> bool {
    value.contains(['*', '?'])
}

fn glob_to_regex(pattern: &str) -> String {
    let pattern = if pattern.is_empty() { "*" } else { pattern };
    let escaped = regex::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    format!("^{escaped}$")
}
