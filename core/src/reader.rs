//! `HierarchyReader` — the matching engine
//!
//! A greedy, backtracking-free stack machine. The stack mirrors the path from the
//! synthetic root declaration down to the declaration currently eligible to match;
//! each frame counts how many occurrences of its declaration have completed and
//! which child is being attempted.
//!
//! # State transitions
//!
//! - **match**: the top declaration matched the next raw unit. Link its node under
//!   the parent frame's node, then descend into its first child, or complete the
//!   occurrence if it has none.
//! - **advance**: the top declaration is done (no match, or budget exhausted). Check
//!   its minimum, pop it, and push the next sibling. With no sibling left, the
//!   parent's occurrence is complete.
//! - **complete**: one occurrence of the top declaration is built. Surface it if it is
//!   the target. Stay for another occurrence while under `max`, else advance.
//!
//! Advance and complete feed each other only while popping, so they run as a loop
//! over [`Step`] bounded by the stack depth.

use crate::{
    Decl, DeclId, DeclTree, MatchOutcome, NodeId, RawUnitSource, ReadError, TargetFilter, Tree,
};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
struct Frame {
    decl: DeclId,
    node: Option<NodeId>,
    cur_child: usize,
    occurred: usize,
}

impl Frame {
    fn new(decl: DeclId) -> Self {
        Self {
            decl,
            node: None,
            cur_child: 0,
            occurred: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Advance,
    Complete,
}

/// Streams target subtrees out of a [`RawUnitSource`].
///
/// # Ownership of targets
///
/// [`read`](Self::read) returns a [`NodeId`] into [`tree()`](Self::tree). The subtree
/// stays linked under its ancestors, so their nodes are reachable through
/// [`Tree::parent`], until the caller calls [`release`](Self::release) or the next
/// `read()` frees it.
///
/// An occurrence of a target ancestor (and everything under it, such as header
/// records beside the target) is freed once it completes and no target inside it
/// is still surfaced. Top-level declarations outside the target's ancestry keep
/// their nodes under [`root()`](Self::root) for the life of the reader.
///
/// # Errors are terminal
///
/// After `read()` returns an error, the reader's state is unspecified; discard it.
#[derive(Debug)]
pub struct HierarchyReader<P, S> {
    decls: Arc<DeclTree<P>>,
    source: S,
    tree: Tree,
    root: NodeId,
    stack: Vec<Frame>,
    pending: Option<NodeId>,
    surfaced: Option<NodeId>,
    retired: Vec<NodeId>,
    filter: Option<Box<dyn TargetFilter>>,
    targets: usize,
}

impl<P, S: RawUnitSource<P>> HierarchyReader<P, S> {
    /// Create a reader positioned before the first top-level declaration.
    pub fn new(decls: Arc<DeclTree<P>>, source: S) -> Self {
        let mut tree = Tree::new();
        let root = tree.create(decls.root().name());

        let mut stack = Vec::with_capacity(decls.max_depth() + 1);
        stack.push(Frame {
            node: Some(root),
            ..Frame::new(DeclTree::<P>::ROOT)
        });
        // A validated tree always has at least the target at top level or below it.
        if let Some(&first) = decls.root().children().first() {
            stack.push(Frame::new(first));
        }

        Self {
            decls,
            source,
            tree,
            root,
            stack,
            pending: None,
            surfaced: None,
            retired: Vec::new(),
            filter: None,
            targets: 0,
        }
    }

    /// Only surface targets `filter` accepts; rejected targets are released unseen.
    #[must_use]
    pub fn with_filter(mut self, filter: impl TargetFilter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Read the next target.
    ///
    /// Returns `Ok(None)` at end of input, and keeps returning it on later calls.
    /// A target returned by the previous call and not yet released is released first.
    ///
    /// # Errors
    ///
    /// - [`ReadError::FewerThanMinOccurs`] — a declaration's minimum was not met
    /// - [`ReadError::UnexpectedTrailingData`] — input remains after every declaration finished
    /// - [`ReadError::Malformed`] / [`ReadError::Io`] — propagated from the source
    pub fn read(&mut self) -> Result<Option<NodeId>, ReadError> {
        if let Some(previous) = self.surfaced.take() {
            self.tree.release(previous);
        }
        for node in std::mem::take(&mut self.retired) {
            self.tree.release(node);
        }

        let decls = Arc::clone(&self.decls);
        loop {
            if let Some(target) = self.pending.take() {
                self.surfaced = Some(target);
                self.targets += 1;
                return Ok(Some(target));
            }

            if !self.source.has_more_input()? {
                if self.stack.len() <= 1 {
                    return Ok(None);
                }
                // Lets trailing declarations check their minimums with no input left.
                self.settle(&decls, Step::Advance)?;
                continue;
            }

            if self.stack.len() <= 1 {
                return Err(ReadError::UnexpectedTrailingData);
            }

            let top = self.top().decl;
            let Some(node) = self.read_decl(&decls, top)? else {
                self.settle(&decls, Step::Advance)?;
                continue;
            };

            let parent = self.stack[self.stack.len() - 2]
                .node
                .expect("parent frame has no output node");
            self.tree.append_child(parent, node);
            self.top_mut().node = Some(node);

            match decls.get(top).children().first() {
                Some(&first) => self.stack.push(Frame::new(first)),
                None => self.settle(&decls, Step::Complete)?,
            }
        }
    }

    /// Release a target returned by [`read`](Self::read).
    ///
    /// Only the most recently surfaced target can be released; any other handle,
    /// including one already released, is ignored.
    pub fn release(&mut self, target: NodeId) {
        if self.surfaced != Some(target) {
            tracing::trace!(%target, "release of a handle that is not the surfaced target ignored");
            return;
        }
        self.surfaced = None;
        self.tree.release(target);
    }

    /// Returns the output tree.
    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Returns the synthetic root node all output hangs under.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the raw-unit source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the declaration tree.
    #[must_use]
    pub fn decls(&self) -> &Arc<DeclTree<P>> {
        &self.decls
    }

    /// Returns the number of targets surfaced so far.
    #[must_use]
    pub fn targets_read(&self) -> usize {
        self.targets
    }

    fn top(&self) -> &Frame {
        self.stack.last().expect("declaration stack underflow")
    }

    fn top_mut(&mut self) -> &mut Frame {
        self.stack.last_mut().expect("declaration stack underflow")
    }

    /// Attempt one occurrence of `id` against the next raw unit.
    fn read_decl(&mut self, decls: &DeclTree<P>, id: DeclId) -> Result<Option<NodeId>, ReadError> {
        let decl = decls.get(id);

        if decl.is_group() {
            let leaf = decls.get(decls.first_leaf(id));
            let outcome = self.source.try_match(leaf, &mut self.tree, false)?;
            if let MatchOutcome::Materialized(stray) = outcome {
                self.tree.release(stray);
            }
            tracing::trace!(
                group = decl.path(),
                leaf = leaf.path(),
                matched = outcome.is_match(),
                "group match attempt"
            );
            return Ok(outcome.is_match().then(|| self.tree.create(decl.name())));
        }

        let outcome = self.source.try_match(decl, &mut self.tree, true)?;
        tracing::trace!(
            path = decl.path(),
            matched = outcome.is_match(),
            "leaf match attempt"
        );
        Ok(match outcome {
            MatchOutcome::NoMatch => None,
            MatchOutcome::Matched => Some(self.tree.create(decl.name())),
            MatchOutcome::Materialized(node) => Some(node),
        })
    }

    fn settle(&mut self, decls: &DeclTree<P>, mut step: Step) -> Result<(), ReadError> {
        loop {
            step = match step {
                Step::Advance => {
                    let frame = *self.top();
                    let decl = decls.get(frame.decl);
                    let min = decl.occurs().min;
                    if frame.occurred < min {
                        return Err(ReadError::FewerThanMinOccurs {
                            path: decl.path().to_owned(),
                            required: min,
                            actual: frame.occurred,
                        });
                    }
                    if self.stack.len() <= 1 {
                        return Ok(());
                    }

                    self.stack.pop();
                    let parent = self.top_mut();
                    let siblings = decls.get(parent.decl).children();
                    if parent.cur_child + 1 < siblings.len() {
                        parent.cur_child += 1;
                        let next = siblings[parent.cur_child];
                        self.stack.push(Frame::new(next));
                        return Ok(());
                    }
                    Step::Complete
                }
                Step::Complete => {
                    let frame = self.top_mut();
                    frame.cur_child = 0;
                    frame.occurred += 1;
                    let frame = *frame;

                    let decl = decls.get(frame.decl);
                    if decl.is_target() {
                        self.complete_target(decl, frame.node);
                    } else if decls.encloses_target(frame.decl) {
                        if let Some(node) = frame.node {
                            self.retire(node);
                        }
                    }
                    if decl.occurs().allows_more(frame.occurred) {
                        return Ok(());
                    }
                    Step::Advance
                }
            };
        }
    }

    /// Free a completed ancestor occurrence, or defer it while a target inside it
    /// is pending.
    fn retire(&mut self, node: NodeId) {
        if self.pending.is_some() {
            self.retired.push(node);
        } else {
            self.tree.release(node);
        }
    }

    fn complete_target(&mut self, decl: &Decl<P>, node: Option<NodeId>) {
        let node = node.expect("completed target has no output node");
        assert!(
            self.pending.is_none(),
            "target '{}' completed while another target is pending",
            decl.path()
        );

        if let Some(filter) = &self.filter {
            if !filter.accept(&self.tree, node) {
                tracing::debug!(path = decl.path(), "target rejected by filter");
                self.tree.release(node);
                return;
            }
        }
        tracing::debug!(path = decl.path(), "target complete");
        self.pending = Some(node);
    }
}
