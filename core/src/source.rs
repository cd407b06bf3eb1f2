//! `RawUnitSource` — Format-specific lexical layer
//!
//! A source owns the input stream and knows how to recognize one raw unit (a line, a
//! segment) as an instance of a leaf declaration. The engine asks two questions:
//! "is there more input?" and "does the next raw unit match this leaf?". It never
//! looks at the bytes itself.

use crate::{Decl, NodeId, ReadError, Tree};
use std::fmt::Debug;

/// Result of asking a source whether the next raw unit matches a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The next raw unit is not an instance of this leaf. Nothing was consumed.
    NoMatch,
    /// The next raw unit matches. Returned for peeks (`materialize = false`), and
    /// for materializing matches that produce no content of their own; the engine
    /// then creates a bare node named after the declaration.
    Matched,
    /// The raw unit matched, was consumed, and was turned into this detached node.
    Materialized(NodeId),
}

impl MatchOutcome {
    /// Returns `true` unless this is [`MatchOutcome::NoMatch`].
    #[must_use]
    pub fn is_match(&self) -> bool {
        !matches!(self, Self::NoMatch)
    }
}

/// Supplies raw units to a [`HierarchyReader`](crate::HierarchyReader).
///
/// # Type Parameters
///
/// - `P`: The leaf payload the source understands (column layout, element layout)
///
/// # Contract
///
/// - `has_more_input` may buffer ahead but must not consume a unit.
/// - `try_match` with `materialize = false` is a pure peek: it must leave the stream
///   where it was, so the engine can ask about the same unit again.
/// - `try_match` with `materialize = true` consumes the unit on a match and should
///   return [`MatchOutcome::Materialized`] with a detached node built in `tree`.
/// - The engine only ever calls `try_match` with leaf declarations.
///
/// # Example
///
/// ```ignore
/// impl RawUnitSource<ColumnLayout> for CsvSource {
///     fn has_more_input(&mut self) -> Result<bool, ReadError> {
///         self.fill()?;
///         Ok(self.peeked.is_some())
///     }
///
///     fn try_match(&mut self, decl: &Decl<ColumnLayout>, tree: &mut Tree, materialize: bool)
///         -> Result<MatchOutcome, ReadError>
///     {
///         /* compare the buffered line against decl.payload() */
///     }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `RawUnitSource<{P}>`",
    label = "this type cannot supply raw units for `{P}` declarations",
    note = "RawUnitSource<P> needs `has_more_input` and `try_match` for leaf declarations carrying payload `P`"
)]
pub trait RawUnitSource<P>: Debug {
    /// Returns `true` if at least one more raw unit is available.
    ///
    /// # Errors
    ///
    /// I/O failures and lexical errors found while buffering the next unit.
    fn has_more_input(&mut self) -> Result<bool, ReadError>;

    /// Check the next raw unit against `decl`, consuming it only when `materialize`
    /// is set and it matches.
    ///
    /// # Errors
    ///
    /// I/O failures, and malformed units (e.g. a line too short for a declared column).
    fn try_match(
        &mut self,
        decl: &Decl<P>,
        tree: &mut Tree,
        materialize: bool,
    ) -> Result<MatchOutcome, ReadError>;
}

#[diagnostic::do_not_recommend]
impl<P, S: RawUnitSource<P> + ?Sized> RawUnitSource<P> for Box<S> {
    fn has_more_input(&mut self) -> Result<bool, ReadError> {
        (**self).has_more_input()
    }

    fn try_match(
        &mut self,
        decl: &Decl<P>,
        tree: &mut Tree,
        materialize: bool,
    ) -> Result<MatchOutcome, ReadError> {
        (**self).try_match(decl, tree, materialize)
    }
}
