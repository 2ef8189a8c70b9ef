//! Wildcard name matching
//!
//! File filters (`*.log`) and logger name patterns (`Archiver_*`) share the same
//! small wildcard syntax: `*` matches any run of characters, `?` exactly one.

use regex::Regex;

/// A compiled wildcard pattern
#[derive(Debug, Clone)]
pub struct Wildcard {
    source: String,
    regex: Option<Regex>,
}

impl Wildcard {
    /// Compile a wildcard pattern
    ///
    /// Matching is case-insensitive. The classic `*.*` filter also matches
    /// names without an extension.
    pub fn new(pattern: &str) -> Self {
        let pattern = pattern.trim();
        let mut expr = String::from("(?i)^");
        if pattern == "*.*" || pattern.is_empty() {
            expr.push_str(".*");
        } else {
            for c in pattern.chars() {
                match c {
                    '*' => expr.push_str(".*"),
                    '?' => expr.push('.'),
                    other => expr.push_str(&regex::escape(&other.to_string())),
                }
            }
        }
        expr.push('$');

        // Literals are escaped; only an oversized pattern can fail to compile
        let regex = match Regex::new(&expr) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "Unusable wildcard pattern");
                None
            }
        };

        Self {
            source: pattern.to_string(),
            regex,
        }
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check whether a name matches
    pub fn matches(&self, name: &str) -> bool {
        self.regex.as_ref().is_some_and(|r| r.is_match(name))
    }
}

impl PartialEq for Wildcard {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Wildcard {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_dot_star_matches_everything() {
        let w = Wildcard::new("*.*");
        assert!(w.matches("broker_Logging_01022026-101500.log"));
        assert!(w.matches("README"));
    }

    #[test]
    fn test_extension_filter() {
        let w = Wildcard::new("*.log");
        assert!(w.matches("a.log"));
        assert!(w.matches("A.LOG"));
        assert!(!w.matches("a.log.zip"));
    }

    #[test]
    fn test_question_mark_and_literals() {
        let w = Wildcard::new("app_?.txt");
        assert!(w.matches("app_1.txt"));
        assert!(!w.matches("app_12.txt"));
        assert!(!w.matches("appX1.txt"));
    }
}
