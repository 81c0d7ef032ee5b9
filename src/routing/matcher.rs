//! Path pattern matching.
//!
//! # Responsibilities
//! - Parse route path patterns (`/get`, `/currency-exchange/**`, `/**`)
//! - Test request paths against a pattern
//! - Expose the specificity used to order routes
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - A single `**` is allowed, and only as the final segment
//! - `/a/**` matches `/a` itself as well as anything below it
//! - No regex in the matching path

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

const WILDCARD_SUFFIX: &str = "/**";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("path pattern is empty")]
    Empty,

    #[error("path pattern '{0}' must start with '/'")]
    NotAbsolute(String),

    #[error("path pattern '{0}' may only use '**' as its last segment")]
    MisplacedWildcard(String),
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    /// Everything before the wildcard, without trailing `/`.
    literal: String,
    wildcard: bool,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        if !pattern.starts_with('/') {
            return Err(PatternError::NotAbsolute(pattern.to_string()));
        }

        let (literal, wildcard) = match pattern.strip_suffix(WILDCARD_SUFFIX) {
            Some(prefix) => (prefix, true),
            None => (pattern, false),
        };
        if literal.contains('*') {
            return Err(PatternError::MisplacedWildcard(pattern.to_string()));
        }

        Ok(Self {
            raw: pattern.to_string(),
            literal: literal.to_string(),
            wildcard,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_exact(&self) -> bool {
        !self.wildcard
    }

    /// Length of the non-wildcard prefix.
    pub fn literal_len(&self) -> usize {
        self.literal.len()
    }

    pub fn matches(&self, path: &str) -> bool {
        if !self.wildcard {
            return path == self.literal;
        }
        if self.literal.is_empty() {
            return true;
        }
        match path.strip_prefix(self.literal.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Ordering of two patterns by specificity: exact before wildcard, then
    /// longer literal prefix first. `Equal` leaves registration order intact.
    pub fn specificity_cmp(&self, other: &Self) -> Ordering {
        other
            .is_exact()
            .cmp(&self.is_exact())
            .then_with(|| other.literal_len().cmp(&self.literal_len()))
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pattern() {
        let p = PathPattern::parse("/get").unwrap();
        assert!(p.is_exact());
        assert!(p.matches("/get"));
        assert!(!p.matches("/get/"));
        assert!(!p.matches("/GET"));
    }

    #[test]
    fn test_wildcard_pattern() {
        let p = PathPattern::parse("/currency-exchange/**").unwrap();
        assert!(p.matches("/currency-exchange"));
        assert!(p.matches("/currency-exchange/"));
        assert!(p.matches("/currency-exchange/from/USD/to/INR"));
        assert!(!p.matches("/currency-exchanges"));

        let all = PathPattern::parse("/**").unwrap();
        assert!(all.matches("/"));
        assert!(all.matches("/anything/at/all"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert_eq!(PathPattern::parse(""), Err(PatternError::Empty));
        assert!(matches!(PathPattern::parse("get"), Err(PatternError::NotAbsolute(_))));
        assert!(matches!(PathPattern::parse("/a/**/b"), Err(PatternError::MisplacedWildcard(_))));
        assert!(matches!(PathPattern::parse("/a*"), Err(PatternError::MisplacedWildcard(_))));
    }

    #[test]
    fn test_specificity() {
        let exact = PathPattern::parse("/a").unwrap();
        let short = PathPattern::parse("/a/**").unwrap();
        let long = PathPattern::parse("/a/b/**").unwrap();

        assert_eq!(exact.specificity_cmp(&long), Ordering::Less);
        assert_eq!(long.specificity_cmp(&short), Ordering::Less);
        assert_eq!(short.specificity_cmp(&short.clone()), Ordering::Equal);
    }
}
