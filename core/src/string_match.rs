//! `StringMatchSpec` — Config-level string match specification
//!
//! What the schema author wrote (`{ "Prefix": "HDR" }`). Compiles to a runtime
//! [`ValueMatcher`] through [`compile()`](StringMatchSpec::compile), which enforces
//! pattern length limits and routes regexes through a [`PatternCache`].

use crate::{PatternCache, SchemaError, ValueMatcher, MAX_PATTERN_LENGTH};
use serde::Deserialize;
use std::fmt;

/// A string match specification from schema configuration.
///
/// # Example
///
/// ```
/// use strata::{PatternCache, StringMatchSpec};
///
/// let mut cache = PatternCache::default();
/// let spec: StringMatchSpec = serde_json::from_str(r#"{ "Regex": "^HDR\\d+" }"#).unwrap();
/// let matcher = spec.compile(&mut cache).unwrap();
/// assert!(matcher.matches("HDR01"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum StringMatchSpec {
    /// Exact string equality.
    Exact(String),
    /// String starts with prefix.
    Prefix(String),
    /// String ends with suffix.
    Suffix(String),
    /// String contains substring.
    Contains(String),
    /// Regular expression match (Rust `regex` crate syntax, linear time).
    Regex(String),
}

impl StringMatchSpec {
    /// Returns the raw pattern text.
    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            Self::Exact(v) | Self::Prefix(v) | Self::Suffix(v) | Self::Contains(v) | Self::Regex(v) => v,
        }
    }

    /// Compile this spec into a runtime [`ValueMatcher`].
    ///
    /// # Errors
    ///
    /// - [`SchemaError::PatternTooLong`] if a literal pattern exceeds [`MAX_PATTERN_LENGTH`]
    ///   or a regex exceeds [`MAX_REGEX_PATTERN_LENGTH`](crate::MAX_REGEX_PATTERN_LENGTH)
    /// - [`SchemaError::InvalidPattern`] if the regex is invalid
    pub fn compile(&self, cache: &mut PatternCache) -> Result<ValueMatcher, SchemaError> {
        match self {
            Self::Exact(v) => literal(v).map(ValueMatcher::Exact),
            Self::Prefix(v) => literal(v).map(ValueMatcher::Prefix),
            Self::Suffix(v) => literal(v).map(ValueMatcher::Suffix),
            Self::Contains(v) => literal(v).map(ValueMatcher::Contains),
            Self::Regex(pattern) => cache.get_or_compile(pattern).map(ValueMatcher::Regex),
        }
    }
}

fn literal(pattern: &str) -> Result<String, SchemaError> {
    if pattern.len() > MAX_PATTERN_LENGTH {
        return Err(SchemaError::PatternTooLong {
            len: pattern.len(),
            max: MAX_PATTERN_LENGTH,
        });
    }
    Ok(pattern.to_owned())
}

impl fmt::Display for StringMatchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "Exact(\"{v}\")"),
            Self::Prefix(v) => write!(f, "Prefix(\"{v}\")"),
            Self::Suffix(v) => write!(f, "Suffix(\"{v}\")"),
            Self::Contains(v) => write!(f, "Contains(\"{v}\")"),
            Self::Regex(v) => write!(f, "Regex(\"{v}\")"),
        }
    }
}
