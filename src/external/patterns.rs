// src/external/patterns.rs

use std::fmt;

use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;

use crate::errors::{BuildError, Result};

/// One `external` / `no_external` entry.
///
/// - `/source/` is a regular expression.
/// - strings containing `*`, `?`, `[` or `{` are globs.
/// - anything else matches the specifier exactly, or as the package part
///   of a subpath import (`lodash` matches `lodash/fp`).
#[derive(Clone)]
pub enum Pattern {
    Exact(String),
    Glob { source: String, matcher: GlobMatcher },
    Regex(Regex),
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Exact(s) => write!(f, "Exact({s:?})"),
            Pattern::Glob { source, .. } => write!(f, "Glob({source:?})"),
            Pattern::Regex(re) => write!(f, "Regex(/{}/)", re.as_str()),
        }
    }
}

impl Pattern {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.len() >= 2 && raw.starts_with('/') && raw.ends_with('/') {
            let source = &raw[1..raw.len() - 1];
            let re = Regex::new(source).map_err(|e| {
                BuildError::InvalidOption(format!("invalid external regex {raw}: {e}"))
            })?;
            return Ok(Pattern::Regex(re));
        }

        if raw.contains(['*', '?', '[', '{']) {
            let matcher = GlobBuilder::new(raw)
                .literal_separator(false)
                .build()
                .map_err(|e| {
                    BuildError::InvalidOption(format!("invalid external glob {raw}: {e}"))
                })?
                .compile_matcher();
            return Ok(Pattern::Glob {
                source: raw.to_string(),
                matcher,
            });
        }

        Ok(Pattern::Exact(raw.to_string()))
    }

    pub fn matches(&self, specifier: &str) -> bool {
        match self {
            Pattern::Exact(name) => matches_package(name, specifier),
            Pattern::Glob { matcher, .. } => matcher.is_match(specifier),
            Pattern::Regex(re) => re.is_match(specifier),
        }
    }
}

/// `name` equals `specifier`, or `specifier` is a subpath of package `name`.
pub fn matches_package(name: &str, specifier: &str) -> bool {
    specifier == name
        || specifier
            .strip_prefix(name)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Ordered pattern list; matches if any entry does.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    raw: Vec<String>,
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn parse(raw: &[String]) -> Result<Self> {
        let patterns = raw
            .iter()
            .map(|p| Pattern::parse(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            raw: raw.to_vec(),
            patterns,
        })
    }

    /// Patterns as written by the user.
    pub fn sources(&self) -> &[String] {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, specifier: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(specifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_matches_subpaths_but_not_prefixed_names() {
        let p = Pattern::parse("react").unwrap();
        assert!(p.matches("react"));
        assert!(p.matches("react/jsx-runtime"));
        assert!(!p.matches("react-dom"));
    }

    #[test]
    fn glob_crosses_separators() {
        let p = Pattern::parse("@scope/*").unwrap();
        assert!(p.matches("@scope/pkg"));
        assert!(p.matches("@scope/pkg/sub"));
        assert!(!p.matches("@other/pkg"));
    }

    #[test]
    fn slash_delimited_is_regex() {
        let p = Pattern::parse("/^lodash(-es)?$/").unwrap();
        assert!(p.matches("lodash-es"));
        assert!(!p.matches("lodash/fp"));
        assert!(Pattern::parse("/(/").is_err());
    }
}
