//! Bounded LRU cache of compiled regex patterns
//!
//! Schemas tend to repeat the same patterns (one header regex per record type, the
//! same line pattern on several columns). The cache is an ordinary value handed to
//! whatever compiles patterns; there is no process-wide instance.

use crate::{SchemaError, DEFAULT_PATTERN_CACHE_CAPACITY, MAX_REGEX_PATTERN_LENGTH};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Hit/miss counters for a [`PatternCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that compiled a pattern.
    pub misses: u64,
    /// Entries dropped to stay within capacity.
    pub evictions: u64,
    /// Current number of entries.
    pub len: usize,
    /// Maximum number of entries.
    pub capacity: usize,
}

impl CacheStats {
    /// Hit rate as a percentage (0.0 when nothing was looked up).
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats(hits={}, misses={}, evictions={}, size={}/{})",
            self.hits, self.misses, self.evictions, self.len, self.capacity
        )
    }
}

#[derive(Debug)]
struct Entry {
    regex: Arc<Regex>,
    last_used: u64,
}

/// Bounded least-recently-used cache of compiled [`Regex`]es keyed by pattern text.
///
/// A capacity of 0 disables caching: every lookup compiles.
///
/// # Example
///
/// ```
/// use strata::PatternCache;
///
/// let mut cache = PatternCache::with_capacity(2);
/// let a = cache.get_or_compile(r"^HDR\d+$").unwrap();
/// let b = cache.get_or_compile(r"^HDR\d+$").unwrap();
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// assert_eq!(cache.stats().hits, 1);
/// ```
#[derive(Debug)]
pub struct PatternCache {
    capacity: usize,
    entries: HashMap<String, Entry>,
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_PATTERN_CACHE_CAPACITY)
    }
}

impl PatternCache {
    /// Create a cache holding at most `capacity` compiled patterns.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity.min(DEFAULT_PATTERN_CACHE_CAPACITY)),
            tick: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Return the compiled regex for `pattern`, compiling and caching it on a miss.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::PatternTooLong`] if `pattern` exceeds [`MAX_REGEX_PATTERN_LENGTH`]
    /// - [`SchemaError::InvalidPattern`] if it does not compile
    pub fn get_or_compile(&mut self, pattern: &str) -> Result<Arc<Regex>, SchemaError> {
        self.tick += 1;
        if let Some(entry) = self.entries.get_mut(pattern) {
            entry.last_used = self.tick;
            self.hits += 1;
            return Ok(Arc::clone(&entry.regex));
        }

        self.misses += 1;
        if pattern.len() > MAX_REGEX_PATTERN_LENGTH {
            return Err(SchemaError::PatternTooLong {
                len: pattern.len(),
                max: MAX_REGEX_PATTERN_LENGTH,
            });
        }
        let regex = Regex::new(pattern)
            .map(Arc::new)
            .map_err(|e| SchemaError::InvalidPattern {
                pattern: pattern.to_owned(),
                reason: e.to_string(),
            })?;

        if self.capacity == 0 {
            return Ok(regex);
        }
        if self.entries.len() >= self.capacity {
            self.evict_lru();
        }
        self.entries.insert(
            pattern.to_owned(),
            Entry {
                regex: Arc::clone(&regex),
                last_used: self.tick,
            },
        );
        Ok(regex)
    }

    // Linear scan; capacities are small and eviction only happens on a miss.
    fn evict_lru(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(pattern, _)| pattern.clone());
        if let Some(pattern) = oldest {
            self.entries.remove(&pattern);
            self.evictions += 1;
            tracing::trace!(%pattern, "evicted compiled pattern");
        }
    }

    /// Returns `true` if `pattern` is currently cached. Does not count as a use.
    #[must_use]
    pub fn contains(&self, pattern: &str) -> bool {
        self.entries.contains_key(pattern)
    }

    /// Returns a snapshot of the cache counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            len: self.entries.len(),
            capacity: self.capacity,
        }
    }

    /// Drop all entries and reset the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.tick = 0;
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
    }
}
