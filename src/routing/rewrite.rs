//! Regex path rewriting.

use regex::Regex;

use crate::config::RewriteConfig;

/// Single regex substitution applied to the matched path.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    regex: Regex,
    replacement: String,
}

impl RewriteRule {
    pub fn new(pattern: &str, replacement: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            replacement: replacement.to_string(),
        })
    }

    pub fn from_config(config: &RewriteConfig) -> Result<Self, regex::Error> {
        Self::new(&config.regex, &config.replacement)
    }

    /// Rewrite `path`, replacing the first match. Named groups are available
    /// as `${name}` in the replacement.
    pub fn apply(&self, path: &str) -> String {
        let rewritten = self.regex.replace(path, self.replacement.as_str());
        if rewritten.is_empty() {
            "/".to_string()
        } else if rewritten.starts_with('/') {
            rewritten.into_owned()
        } else {
            format!("/{}", rewritten)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_group_rewrite() {
        let rule = RewriteRule::new(
            "/currency-conversion-new/(?<segment>.*)",
            "/currency-conversion-feign/${segment}",
        )
        .unwrap();
        assert_eq!(
            rule.apply("/currency-conversion-new/from/USD/to/INR/quantity/10"),
            "/currency-conversion-feign/from/USD/to/INR/quantity/10"
        );
    }

    #[test]
    fn test_no_match_keeps_path() {
        let rule = RewriteRule::new("^/other/(.*)", "/$1").unwrap();
        assert_eq!(rule.apply("/get"), "/get");
    }

    #[test]
    fn test_empty_result_becomes_root() {
        let rule = RewriteRule::new("^/svc/?(?<rest>.*)$", "${rest}").unwrap();
        assert_eq!(rule.apply("/svc"), "/");
        assert_eq!(rule.apply("/svc/a"), "/a");
    }

    #[test]
    fn test_invalid_regex() {
        assert!(RewriteRule::new("(", "/").is_err());
    }
}
