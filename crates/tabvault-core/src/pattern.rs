use log::warn;
use regex::Regex;

use crate::error::TabvaultError;

/// Compiled never-archive patterns.
///
/// `*` matches any substring; everything else is literal and the whole URL
/// must match.
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    compiled: Vec<Regex>,
}

impl PatternMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let compiled = patterns
            .iter()
            .filter_map(|pattern| match compile(pattern.as_ref()) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    warn!("{err}; pattern ignored");
                    None
                }
            })
            .collect();
        Self { compiled }
    }

    pub fn matches(&self, url: &str) -> bool {
        self.compiled.iter().any(|regex| regex.is_match(url))
    }
}

pub fn compile(pattern: &str) -> Result<Regex, TabvaultError> {
    let escaped = regex::escape(pattern).replace(r"\*", ".*");
    Regex::new(&format!("^{escaped}$")).map_err(|source| TabvaultError::PatternCompile {
        pattern: pattern.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_scheme_and_path() {
        let matcher = PatternMatcher::new(&["*://github.com/*"]);

        assert!(matcher.matches("https://github.com/org/repo"));
        assert!(!matcher.matches("https://githubusercontent.com/x"));
        assert!(!matcher.matches("https://gist.github.com/x"));
    }

    #[test]
    fn metacharacters_are_literal() {
        let matcher = PatternMatcher::new(&["https://example.com/a+b?(c)"]);

        assert!(matcher.matches("https://example.com/a+b?(c)"));
        assert!(!matcher.matches("https://exampleXcom/a+b?(c)"));
        assert!(!matcher.matches("https://example.com/aab"));
    }

    #[test]
    fn pattern_is_anchored() {
        let matcher = PatternMatcher::new(&["example.com"]);

        assert!(matcher.matches("example.com"));
        assert!(!matcher.matches("https://example.com/"));
    }

    #[test]
    fn any_pattern_may_match() {
        let matcher = PatternMatcher::new(&["*mail*", "https://docs.rs/*"]);

        assert!(matcher.matches("https://mail.example.com/inbox"));
        assert!(matcher.matches("https://docs.rs/regex"));
        assert!(!matcher.matches("https://crates.io/"));
        assert!(!PatternMatcher::new::<&str>(&[]).matches("https://crates.io/"));
    }
}
