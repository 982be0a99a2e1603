// src/filter.rs
//
// Include/exclude regex filtering applied while enumerating keys or paths.

use regex::Regex;
use tracing::warn;

/// One include/exclude pair. Either side may be left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub include: Option<String>,
    pub exclude: Option<String>,
}

impl FilterOptions {
    pub fn include(pattern: impl Into<String>) -> Self {
        Self { include: Some(pattern.into()), exclude: None }
    }

    pub fn exclude(pattern: impl Into<String>) -> Self {
        Self { include: None, exclude: Some(pattern.into()) }
    }

    pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude = Some(pattern.into());
        self
    }
}

fn non_empty(p: &Option<String>) -> Option<&str> {
    p.as_deref().filter(|s| !s.is_empty())
}

/// Unanchored regex search of `pattern` in `key`. An invalid pattern never matches.
pub fn matches_pattern(key: &str, pattern: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(key),
        Err(_) => false,
    }
}

/// Decide whether `key` passes every filter in the list.
///
/// No filters means everything passes. Evaluation stops at the first entry
/// that disqualifies the key.
pub fn should_process(filters: Option<&[FilterOptions]>, key: &str) -> bool {
    let Some(filters) = filters else { return true };

    for f in filters {
        if let Some(inc) = non_empty(&f.include) {
            if !matches_pattern(key, inc) {
                return false;
            }
        }
        if let Some(exc) = non_empty(&f.exclude) {
            if matches_pattern(key, exc) {
                return false;
            }
        }
    }
    true
}

/// A pattern compiled once per operation. `None` marks a pattern that failed
/// to compile and therefore never matches.
#[derive(Debug, Clone)]
struct CompiledPattern(Option<Regex>);

impl CompiledPattern {
    fn new(pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(re) => Self(Some(re)),
            Err(e) => {
                warn!("filter pattern {:?} does not compile and will never match: {}", pattern, e);
                Self(None)
            }
        }
    }

    fn is_match(&self, key: &str) -> bool {
        self.0.as_ref().is_some_and(|re| re.is_match(key))
    }
}

#[derive(Debug, Clone)]
struct CompiledFilter {
    include: Option<CompiledPattern>,
    exclude: Option<CompiledPattern>,
}

/// Pre-compiled form of a filter list with the same semantics as
/// [`should_process`], used by the bulk operations so each listed item does
/// not recompile every regex.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: Vec<CompiledFilter>,
}

impl FilterSet {
    pub fn compile(filters: Option<&[FilterOptions]>) -> Self {
        let filters = filters
            .unwrap_or_default()
            .iter()
            .map(|f| CompiledFilter {
                include: non_empty(&f.include).map(CompiledPattern::new),
                exclude: non_empty(&f.exclude).map(CompiledPattern::new),
            })
            .collect();
        Self { filters }
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn should_process(&self, key: &str) -> bool {
        self.filters.iter().all(|f| {
            f.include.as_ref().is_none_or(|p| p.is_match(key))
                && !f.exclude.as_ref().is_some_and(|p| p.is_match(key))
        })
    }
}
