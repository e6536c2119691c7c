use glob::Pattern as GlobPattern;
use regex::Regex;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while compiling filter rules
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },
}

/// Type of pattern matching to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterType {
    /// Glob pattern matching (e.g., "*.map", "vendor/**")
    Glob(String),
    /// Regular expression matching (e.g., "^fonts/.*\.woff2?$")
    Regex(String),
    /// Exact source-relative path
    Path(String),
}

impl FilterType {
    /// Parse a pattern with an optional `glob:`, `regex:` or `path:` prefix
    ///
    /// Patterns without a prefix are globs.
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim();
        if let Some(rest) = pattern.strip_prefix("glob:") {
            FilterType::Glob(rest.trim().to_string())
        } else if let Some(rest) = pattern.strip_prefix("regex:") {
            FilterType::Regex(rest.trim().to_string())
        } else if let Some(rest) = pattern.strip_prefix("path:") {
            FilterType::Path(rest.trim().trim_start_matches('/').to_string())
        } else {
            FilterType::Glob(pattern.to_string())
        }
    }
}

/// Action to take when a filter matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterAction {
    /// Keep the matching asset
    #[default]
    Include,
    /// Leave the matching asset out of the manifest
    Exclude,
}

#[derive(Debug, Clone)]
enum Matcher {
    Glob(GlobPattern),
    Regex(Regex),
    Path(String),
}

/// A single compiled filter rule
#[derive(Debug, Clone)]
pub struct FilterRule {
    action: FilterAction,
    matcher: Matcher,
}

impl FilterRule {
    /// Compile a new filter rule
    pub fn new(action: FilterAction, filter_type: FilterType) -> Result<Self, FilterError> {
        let matcher = match &filter_type {
            FilterType::Glob(pattern) => {
                Matcher::Glob(GlobPattern::new(pattern).map_err(|e| FilterError::InvalidGlob {
                    pattern: pattern.clone(),
                    source: e,
                })?)
            }
            FilterType::Regex(pattern) => {
                Matcher::Regex(Regex::new(pattern).map_err(|e| FilterError::InvalidRegex {
                    pattern: pattern.clone(),
                    source: e,
                })?)
            }
            FilterType::Path(exact) => Matcher::Path(exact.replace('\\', "/")),
        };

        Ok(FilterRule { action, matcher })
    }

    /// Check if this rule matches a source-relative path
    pub fn matches(&self, relative: &Path) -> bool {
        // Forward slashes on every platform
        let normalized = relative.to_string_lossy().replace('\\', "/");
        let normalized = normalized.trim_start_matches('/');

        match &self.matcher {
            Matcher::Glob(pattern) => pattern.matches(normalized),
            Matcher::Regex(regex) => regex.is_match(normalized),
            Matcher::Path(exact) => normalized == exact,
        }
    }

    pub fn action(&self) -> FilterAction {
        self.action
    }
}

/// Decision result for path filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Include,
    Exclude,
    /// No rule matched
    NoMatch,
}

/// Ordered filter rules with first-match-wins semantics
///
/// Include rules are placed ahead of exclude rules, so a file matching both
/// is kept. Files matching nothing are kept.
#[derive(Debug, Clone, Default)]
pub struct FilterList {
    rules: Vec<FilterRule>,
}

impl FilterList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter list from include and exclude patterns
    pub fn from_patterns(
        include_patterns: &[String],
        exclude_patterns: &[String],
    ) -> Result<Self, FilterError> {
        let mut filter_list = FilterList::new();
        for pattern in include_patterns {
            filter_list.add(FilterAction::Include, pattern)?;
        }
        for pattern in exclude_patterns {
            filter_list.add(FilterAction::Exclude, pattern)?;
        }
        Ok(filter_list)
    }

    /// Append a rule parsed from a prefixed pattern
    pub fn add(&mut self, action: FilterAction, pattern: &str) -> Result<(), FilterError> {
        self.rules
            .push(FilterRule::new(action, FilterType::parse(pattern))?);
        Ok(())
    }

    /// Evaluate the list against a source-relative path
    pub fn evaluate(&self, relative: &Path) -> FilterDecision {
        self.rules
            .iter()
            .find(|rule| rule.matches(relative))
            .map(|rule| match rule.action() {
                FilterAction::Include => FilterDecision::Include,
                FilterAction::Exclude => FilterDecision::Exclude,
            })
            .unwrap_or(FilterDecision::NoMatch)
    }

    /// The `shouldExclude` predicate used by the reconciliation engine
    pub fn should_exclude(&self, relative: &Path) -> bool {
        self.evaluate(relative) == FilterDecision::Exclude
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
