//! strata - schema-driven hierarchy reconstruction for flat structured text
//!
//! Flat formats (EDI interchanges, delimited files, fixed-width reports) carry a
//! hierarchy that only the schema knows about. This crate walks a declared
//! record layout in lock-step with a stream of raw input units, enforces the
//! declared occurrence bounds, and surfaces one fully-built "target" subtree at a
//! time.
//!
//! # Architecture
//!
//! - [`RecDecl<P>`] — Authoring form of a declaration (leaf record or group)
//! - [`DeclTree<P>`] — Validated, immutable declaration tree with paths computed
//! - [`RawUnitSource<P>`] — Format-specific lexical layer: "is there more input?" and
//!   "does the next raw unit match this leaf?"
//! - [`HierarchyReader<P, S>`] — The matching engine: a stack machine mirroring the
//!   path from the synthetic root to the declaration currently being matched
//! - [`Tree`] — Output arena the engine populates; targets are handed out as [`NodeId`]s
//!
//! `P` is the format's leaf payload (column layout for flat files, element layout for
//! EDI). The engine never looks inside it; only the source does.
//!
//! # Key Design Insights
//!
//! 1. **Groups borrow their identity**: a group has no raw representation. It is
//!    present iff its first leaf descendant matches the next raw unit.
//!
//! 2. **Greedy, backtracking-free**: a declaration keeps matching until it reaches its
//!    maximum or the next raw unit stops matching, then control moves on in document
//!    order. Nothing is ever un-read.
//!
//! 3. **Targets are borrowed**: a surfaced target stays linked into the output tree
//!    (ancestors remain reachable) until [`HierarchyReader::release`] or the next read.
//!
//! # Example
//!
//! ```
//! use strata::prelude::*;
//!
//! // A toy source: each raw unit is just a record name.
//! #[derive(Debug)]
//! struct Names(std::collections::VecDeque<&'static str>);
//!
//! impl RawUnitSource<()> for Names {
//!     fn has_more_input(&mut self) -> Result<bool, ReadError> {
//!         Ok(!self.0.is_empty())
//!     }
//!
//!     fn try_match(
//!         &mut self,
//!         decl: &Decl<()>,
//!         tree: &mut Tree,
//!         materialize: bool,
//!     ) -> Result<MatchOutcome, ReadError> {
//!         if self.0.front() != Some(&decl.name()) {
//!             return Ok(MatchOutcome::NoMatch);
//!         }
//!         if !materialize {
//!             return Ok(MatchOutcome::Matched);
//!         }
//!         self.0.pop_front();
//!         Ok(MatchOutcome::Materialized(tree.create(decl.name())))
//!     }
//! }
//!
//! let decls = DeclTree::new(
//!     vec![RecDecl::leaf("A", ())
//!         .target()
//!         .with_child(RecDecl::leaf("B", ()).min(0))
//!         .with_child(RecDecl::leaf("C", ()).min(1).max(2))],
//!     &FormatProfile::FLAT,
//! )
//! .unwrap();
//!
//! let source = Names(["A", "B", "C"].into_iter().collect());
//! let mut reader = HierarchyReader::new(std::sync::Arc::new(decls), source);
//!
//! let target = reader.read().unwrap().unwrap();
//! let names: Vec<_> = reader
//!     .tree()
//!     .children(target)
//!     .iter()
//!     .filter_map(|&c| reader.tree().name(c))
//!     .collect();
//! assert_eq!(names, ["B", "C"]);
//! reader.release(target);
//! assert!(reader.read().unwrap().is_none());
//! ```

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod config;
mod decl;
mod filter;
mod pattern_cache;
mod reader;
mod source;
mod string_match;
mod tree;
mod value_matcher;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

// Declarations
pub use decl::{Decl, DeclId, DeclKind, DeclTree, FormatProfile, Occurs, RecDecl, TargetPolicy};

// Config
pub use config::{load_decls, DeclConfig, DeclType, TargetFilterConfig, UnitPayload};

// Engine
pub use reader::HierarchyReader;
pub use source::{MatchOutcome, RawUnitSource};

// Output
pub use tree::{Node, NodeId, Tree};

// Matching helpers
pub use filter::{FieldFilter, TargetFilter};
pub use pattern_cache::{CacheStats, PatternCache};
pub use string_match::StringMatchSpec;
pub use value_matcher::ValueMatcher;

// ═══════════════════════════════════════════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════════════════════════════════════════

/// Prelude module for convenient imports.
///
/// ```
/// use strata::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Declarations
        Decl,
        DeclConfig,
        DeclId,
        DeclKind,
        DeclTree,
        // Matching helpers
        FieldFilter,
        FormatProfile,
        // Engine
        HierarchyReader,
        MatchOutcome,
        // Output
        NodeId,
        Occurs,
        PatternCache,
        RawUnitSource,
        // Errors
        ReadError,
        RecDecl,
        SchemaError,
        StringMatchSpec,
        TargetFilter,
        TargetPolicy,
        Tree,
        ValueMatcher,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum nesting depth of a declaration tree (top-level declarations are depth 1).
///
/// The engine's stack never grows deeper than this plus the synthetic root.
/// Validated at schema load time by [`DeclTree::new`].
pub const MAX_DECL_DEPTH: usize = 64;

/// Maximum length for non-regex string match patterns (exact, prefix, suffix, contains).
pub const MAX_PATTERN_LENGTH: usize = 8192;

/// Maximum length for regex patterns.
///
/// Shorter limit than [`MAX_PATTERN_LENGTH`] because regex compile cost scales
/// faster than literal matching.
pub const MAX_REGEX_PATTERN_LENGTH: usize = 4096;

/// Capacity of a [`PatternCache`] created with [`PatternCache::default`].
pub const DEFAULT_PATTERN_CACHE_CAPACITY: usize = 128;

/// Path separator used in fully-qualified declaration paths (`ISA/GS/ST`).
pub const PATH_SEPARATOR: char = '/';

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors from schema loading and declaration validation.
///
/// These errors are caught at schema load time, never while reading input.
/// Fix the schema and reload it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A declaration's `min` is greater than its `max`.
    #[error("declaration '{path}' has min occur {min} greater than max occur {max}")]
    MinExceedsMax {
        /// Path of the offending declaration.
        path: String,
        /// Declared minimum.
        min: usize,
        /// Declared maximum.
        max: usize,
    },
    /// A group declaration has no children, so it can never be identified in the input.
    #[error("group '{path}' must have at least one child declaration")]
    EmptyGroup {
        /// Path of the offending group.
        path: String,
    },
    /// More than one declaration is marked as target.
    #[error("only one declaration can be target, but both '{first}' and '{second}' are")]
    MultipleTargets {
        /// Path of the first target found (document order).
        first: String,
        /// Path of the second target found.
        second: String,
    },
    /// No declaration is marked as target and the format does not auto-promote one.
    #[error("no declaration is marked as target; set `is_target: true` on exactly one")]
    NoTarget,
    /// A declaration has an empty name.
    #[error("declaration under '{parent}' has an empty name")]
    EmptyName {
        /// Path of the parent (`#root` for top-level declarations).
        parent: String,
    },
    /// Declaration nesting exceeds [`MAX_DECL_DEPTH`].
    #[error("declaration '{path}' is nested {depth} deep, but maximum allowed is {max}")]
    DepthExceeded {
        /// Path of the first declaration past the limit.
        path: String,
        /// Its depth.
        depth: usize,
        /// Maximum allowed depth.
        max: usize,
    },
    /// A regex or string pattern is invalid.
    #[error("invalid pattern \"{pattern}\": {reason}")]
    InvalidPattern {
        /// The pattern that failed to compile.
        pattern: String,
        /// The underlying error message.
        reason: String,
    },
    /// A string match pattern exceeds the maximum allowed length.
    #[error("pattern length is {len}, but maximum allowed is {max}")]
    PatternTooLong {
        /// Actual length of the pattern.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },
    /// Configuration deserialization or format-specific construction failed.
    #[error("invalid config: {reason}")]
    InvalidConfig {
        /// The underlying error message.
        reason: String,
    },
}

/// Errors surfaced by [`HierarchyReader::read`].
///
/// Every error is terminal for the input stream it was raised on. End of stream is
/// not an error: `read()` returns `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// A declaration's minimum occurrence count was not met, either because a later
    /// declaration's data arrived first or because input ended.
    #[error("'{path}' needs min occur {required}, but only got {actual}")]
    FewerThanMinOccurs {
        /// Fully-qualified path of the declaration.
        path: String,
        /// Declared minimum.
        required: usize,
        /// Occurrences actually seen.
        actual: usize,
    },
    /// Every declaration has finished, yet raw input remains.
    #[error("unexpected data: all declarations are satisfied but input remains")]
    UnexpectedTrailingData,
    /// The lexical layer could not turn the input into a raw unit.
    #[error("{0}")]
    Malformed(String),
    /// Reading the underlying input failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
