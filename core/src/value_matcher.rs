//! `ValueMatcher` — compiled test against one text value
//!
//! Used wherever a schema says "this string must look like X": record header and
//! footer patterns, column line selectors, target filters.

use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// A compiled string test.
///
/// Built from a [`StringMatchSpec`](crate::StringMatchSpec). Regexes are shared with
/// the [`PatternCache`](crate::PatternCache) that compiled them.
///
/// # Example
///
/// ```
/// use strata::ValueMatcher;
///
/// let m = ValueMatcher::Prefix("HDR".into());
/// assert!(m.matches("HDR|0001"));
/// assert!(!m.matches("DTL|0001"));
/// assert!(ValueMatcher::Any.matches(""));
/// ```
#[derive(Debug, Clone)]
pub enum ValueMatcher {
    /// Matches every value.
    Any,
    /// Exact string equality (case-sensitive, no trimming).
    Exact(String),
    /// Value starts with the prefix.
    Prefix(String),
    /// Value ends with the suffix.
    Suffix(String),
    /// Value contains the substring.
    Contains(String),
    /// Regular expression search (RE2 semantics, linear time).
    Regex(Arc<Regex>),
}

impl ValueMatcher {
    /// Check `value` against this matcher.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => value == expected,
            Self::Prefix(prefix) => value.starts_with(prefix.as_str()),
            Self::Suffix(suffix) => value.ends_with(suffix.as_str()),
            Self::Contains(needle) => value.contains(needle.as_str()),
            Self::Regex(re) => re.is_match(value),
        }
    }
}

impl fmt::Display for ValueMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "Any"),
            Self::Exact(v) => write!(f, "Exact(\"{v}\")"),
            Self::Prefix(v) => write!(f, "Prefix(\"{v}\")"),
            Self::Suffix(v) => write!(f, "Suffix(\"{v}\")"),
            Self::Contains(v) => write!(f, "Contains(\"{v}\")"),
            Self::Regex(re) => write!(f, "Regex(\"{}\")", re.as_str()),
        }
    }
}
