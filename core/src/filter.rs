//! Target filters — decide whether a completed target is surfaced or dropped

use crate::{NodeId, Tree, ValueMatcher};
use std::fmt::Debug;

/// Predicate over a completed target subtree.
///
/// Installed with [`HierarchyReader::with_filter`](crate::HierarchyReader::with_filter).
/// A rejected target is released immediately and never returned from `read()`.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `TargetFilter`",
    label = "this type cannot decide whether a target is surfaced",
    note = "implement `accept(&self, &Tree, NodeId) -> bool`, or use `FieldFilter`"
)]
pub trait TargetFilter: Send + Sync + Debug {
    /// Returns `true` if the target rooted at `target` should be surfaced.
    fn accept(&self, tree: &Tree, target: NodeId) -> bool;
}

#[diagnostic::do_not_recommend]
impl TargetFilter for Box<dyn TargetFilter> {
    fn accept(&self, tree: &Tree, target: NodeId) -> bool {
        (**self).accept(tree, target)
    }
}

/// Accepts a target iff some node at `path` below it has a matching value.
///
/// # Example
///
/// ```
/// use strata::{FieldFilter, TargetFilter, Tree, ValueMatcher};
///
/// let mut tree = Tree::new();
/// let order = tree.create("ORDER");
/// let status = tree.create_value("status", "OPEN");
/// tree.append_child(order, status);
///
/// let filter = FieldFilter::new("status", ValueMatcher::Exact("OPEN".into()));
/// assert!(filter.accept(&tree, order));
/// ```
#[derive(Debug, Clone)]
pub struct FieldFilter {
    path: String,
    matcher: ValueMatcher,
}

impl FieldFilter {
    /// Create a filter over the values at `path` (relative, `/`-separated).
    pub fn new(path: impl Into<String>, matcher: ValueMatcher) -> Self {
        Self {
            path: path.into(),
            matcher,
        }
    }

    /// Returns the selected path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl TargetFilter for FieldFilter {
    fn accept(&self, tree: &Tree, target: NodeId) -> bool {
        tree.select(target, &self.path)
            .into_iter()
            .filter_map(|id| tree.value(id))
            .any(|value| self.matcher.matches(value))
    }
}
