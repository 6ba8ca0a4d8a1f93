//! Ignore-filter parsing.

use std::collections::HashSet;

/// Characters that separate names in a raw ignore filter.
pub const FILTER_DELIMITERS: &[char] = &['\n', '\r', '\u{c}'];

/// Basenames excluded from timestamp aggregation.
///
/// Matching is exact and case-sensitive against the last path component;
/// there are no glob or path semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreSet {
    names: HashSet<String>,
}

impl IgnoreSet {
    pub fn contains(&self, basename: &str) -> bool {
        self.names.contains(basename)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for IgnoreSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        IgnoreSet {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Parse a raw ignore filter into the set of basenames it names.
///
/// Tokens are split on newline, carriage return and form feed. Empty
/// tokens are dropped and everything else is kept verbatim, so
/// `" pom.xml"` and `"pom.xml"` are different names. An absent filter
/// ignores nothing.
pub fn parse_ignore_filter(raw: Option<&str>) -> IgnoreSet {
    let Some(raw) = raw else {
        return IgnoreSet::default();
    };

    raw.split(FILTER_DELIMITERS)
        .filter(|token| !token.is_empty())
        .collect()
}
