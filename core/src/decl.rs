//! Declarations — the schema-derived shape of the expected input
//!
//! [`RecDecl`] is the authoring form: a nested, unvalidated builder. [`DeclTree::new`]
//! flattens it into an arena of [`Decl`]s addressed by [`DeclId`], computes every
//! fully-qualified path, applies the format's [`FormatProfile`] defaults, and checks
//! the invariants the matching engine relies on.
//!
//! # Invariants (checked once, at load time)
//!
//! - Exactly one declaration is the target.
//! - `min <= max` for every declaration.
//! - Every group has at least one child.
//! - Nesting never exceeds [`MAX_DECL_DEPTH`].

use crate::{SchemaError, MAX_DECL_DEPTH, PATH_SEPARATOR};
use serde::Deserialize;
use std::fmt;

/// Occurrence bounds of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum number of occurrences.
    pub min: usize,
    /// Maximum number of occurrences; `None` is unbounded.
    pub max: Option<usize>,
}

impl Occurs {
    /// Returns `true` if another occurrence is allowed after `occurred` so far.
    #[must_use]
    pub fn allows_more(&self, occurred: usize) -> bool {
        self.max.map_or(true, |max| occurred < max)
    }
}

impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..{max}", self.min),
            None => write!(f, "{}..*", self.min),
        }
    }
}

/// How a format picks its target when no declaration is marked `is_target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPolicy {
    /// A missing target is a schema error.
    Explicit,
    /// The first top-level declaration becomes the target.
    FirstTopLevel,
}

/// Per-format defaults applied while validating a declaration tree.
///
/// Format families disagree on defaults: flat files treat an unannotated record as
/// optional and promote the first top-level record to target, EDI requires every
/// unannotated segment once and insists on an explicit target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatProfile {
    /// `min` used when a declaration does not set one.
    pub default_min: usize,
    /// `max` used when a declaration does not set one.
    pub default_max: usize,
    /// What to do when no declaration is marked as target.
    pub target_policy: TargetPolicy,
}

impl FormatProfile {
    /// Delimited and fixed-width files.
    pub const FLAT: Self = Self {
        default_min: 0,
        default_max: 1,
        target_policy: TargetPolicy::FirstTopLevel,
    };

    /// EDI segment streams.
    pub const EDI: Self = Self {
        default_min: 1,
        default_max: 1,
        target_policy: TargetPolicy::Explicit,
    };

    /// Override the target policy (builder pattern).
    #[must_use]
    pub fn with_target_policy(mut self, target_policy: TargetPolicy) -> Self {
        self.target_policy = target_policy;
        self
    }
}

/// The two kinds of declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclKind<P> {
    /// Matches exactly one raw unit per occurrence. Carries the format payload.
    Leaf(P),
    /// No raw representation; present iff its first leaf descendant is.
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MaxBound {
    Default,
    Limited(usize),
    Unbounded,
}

/// Authoring form of a declaration.
///
/// # Example
///
/// ```
/// use strata::{DeclTree, FormatProfile, RecDecl};
///
/// let tree = DeclTree::new(
///     vec![RecDecl::group("ORDER")
///         .target()
///         .unbounded()
///         .with_child(RecDecl::leaf("HDR", ()).min(1))
///         .with_child(RecDecl::leaf("LINE", ()).unbounded())],
///     &FormatProfile::FLAT,
/// )
/// .unwrap();
///
/// assert_eq!(tree.target().path(), "ORDER");
/// assert!(tree.find("ORDER/LINE").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct RecDecl<P> {
    name: String,
    kind: DeclKind<P>,
    is_target: bool,
    min: Option<usize>,
    max: MaxBound,
    children: Vec<RecDecl<P>>,
}

impl<P> RecDecl<P> {
    /// Create a leaf record declaration.
    pub fn leaf(name: impl Into<String>, payload: P) -> Self {
        Self::with_kind(name.into(), DeclKind::Leaf(payload))
    }

    /// Create a group declaration. Groups must be given at least one child.
    pub fn group(name: impl Into<String>) -> Self {
        Self::with_kind(name.into(), DeclKind::Group)
    }

    fn with_kind(name: String, kind: DeclKind<P>) -> Self {
        Self {
            name,
            kind,
            is_target: false,
            min: None,
            max: MaxBound::Default,
            children: Vec::new(),
        }
    }

    /// Mark this declaration as the target.
    #[must_use]
    pub fn target(mut self) -> Self {
        self.is_target = true;
        self
    }

    /// Set the target flag explicitly.
    #[must_use]
    pub fn with_target(mut self, is_target: bool) -> Self {
        self.is_target = is_target;
        self
    }

    /// Set the minimum occurrence count.
    #[must_use]
    pub fn min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    /// Set the maximum occurrence count.
    #[must_use]
    pub fn max(mut self, max: usize) -> Self {
        self.max = MaxBound::Limited(max);
        self
    }

    /// Allow any number of occurrences.
    #[must_use]
    pub fn unbounded(mut self) -> Self {
        self.max = MaxBound::Unbounded;
        self
    }

    /// Append a child declaration.
    #[must_use]
    pub fn with_child(mut self, child: RecDecl<P>) -> Self {
        self.children.push(child);
        self
    }

    /// Append several child declarations, in order.
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = RecDecl<P>>) -> Self {
        self.children.extend(children);
        self
    }

    /// Returns the declaration name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Index of a [`Decl`] inside its [`DeclTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(u32);

impl DeclId {
    /// Returns the raw index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A validated declaration.
#[derive(Debug, Clone)]
pub struct Decl<P> {
    id: DeclId,
    name: String,
    path: String,
    kind: DeclKind<P>,
    is_target: bool,
    occurs: Occurs,
    parent: Option<DeclId>,
    children: Vec<DeclId>,
    depth: usize,
}

impl<P> Decl<P> {
    /// Returns this declaration's id.
    #[must_use]
    pub fn id(&self) -> DeclId {
        self.id
    }

    /// Returns the declaration name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fully-qualified path (`ISA/GS/ST`). Empty for the synthetic root.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the declaration kind.
    #[must_use]
    pub fn kind(&self) -> &DeclKind<P> {
        &self.kind
    }

    /// Returns the leaf payload, or `None` for groups.
    #[must_use]
    pub fn payload(&self) -> Option<&P> {
        match &self.kind {
            DeclKind::Leaf(payload) => Some(payload),
            DeclKind::Group => None,
        }
    }

    /// Returns `true` for group declarations.
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self.kind, DeclKind::Group)
    }

    /// Returns `true` if this is the target declaration.
    #[must_use]
    pub fn is_target(&self) -> bool {
        self.is_target
    }

    /// Returns the occurrence bounds, with format defaults applied.
    #[must_use]
    pub fn occurs(&self) -> Occurs {
        self.occurs
    }

    /// Returns the parent declaration, `None` only for the synthetic root.
    #[must_use]
    pub fn parent(&self) -> Option<DeclId> {
        self.parent
    }

    /// Returns the child declarations in document order.
    #[must_use]
    pub fn children(&self) -> &[DeclId] {
        &self.children
    }

    /// Returns the nesting depth (root is 0, top-level declarations are 1).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// A validated, immutable declaration tree.
///
/// Declarations are stored in depth-first pre-order, so iteration order is
/// document order. Index 0 is a synthetic root group (`min = max = 1`) wrapping the
/// schema's top-level declarations.
#[derive(Debug, Clone)]
pub struct DeclTree<P> {
    decls: Vec<Decl<P>>,
    target: DeclId,
}

/// Name of the synthetic root declaration.
const ROOT_NAME: &str = "#root";

impl<P> DeclTree<P> {
    /// Id of the synthetic root.
    pub const ROOT: DeclId = DeclId(0);

    /// Validate `top_level` declarations and build the tree.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::EmptyName`] — a declaration has no name
    /// - [`SchemaError::DepthExceeded`] — nesting exceeds [`MAX_DECL_DEPTH`]
    /// - [`SchemaError::MinExceedsMax`] — `min > max` after defaults
    /// - [`SchemaError::EmptyGroup`] — a group has no children
    /// - [`SchemaError::MultipleTargets`] — more than one target
    /// - [`SchemaError::NoTarget`] — no target and the profile does not auto-promote
    pub fn new(top_level: Vec<RecDecl<P>>, profile: &FormatProfile) -> Result<Self, SchemaError> {
        let mut builder = Builder {
            decls: Vec::new(),
            target: None,
            profile,
        };

        builder.decls.push(Decl {
            id: Self::ROOT,
            name: ROOT_NAME.to_owned(),
            path: String::new(),
            kind: DeclKind::Group,
            is_target: false,
            occurs: Occurs {
                min: 1,
                max: Some(1),
            },
            parent: None,
            children: Vec::new(),
            depth: 0,
        });

        let mut children = Vec::with_capacity(top_level.len());
        for decl in top_level {
            children.push(builder.push(decl, Self::ROOT, 1)?);
        }
        builder.decls[0].children = children;

        let Builder {
            mut decls, target, ..
        } = builder;

        let target = match (target, profile.target_policy) {
            (Some(target), _) => target,
            (None, TargetPolicy::FirstTopLevel) => {
                let first = *decls[0].children.first().ok_or(SchemaError::NoTarget)?;
                let decl = &mut decls[first.index()];
                decl.is_target = true;
                tracing::debug!(path = %decl.path, "no explicit target, promoted first top-level declaration");
                first
            }
            (None, TargetPolicy::Explicit) => return Err(SchemaError::NoTarget),
        };

        Ok(Self { decls, target })
    }

    /// Returns the declaration with the given id.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this tree.
    #[must_use]
    pub fn get(&self, id: DeclId) -> &Decl<P> {
        &self.decls[id.index()]
    }

    /// Returns the synthetic root.
    #[must_use]
    pub fn root(&self) -> &Decl<P> {
        &self.decls[0]
    }

    /// Returns the target declaration.
    #[must_use]
    pub fn target(&self) -> &Decl<P> {
        self.get(self.target)
    }

    /// Returns `true` if `id` is a proper ancestor of the target, other than the
    /// synthetic root.
    #[must_use]
    pub fn encloses_target(&self, id: DeclId) -> bool {
        let mut current = self.target().parent;
        while let Some(ancestor) = current {
            if ancestor == Self::ROOT {
                return false;
            }
            if ancestor == id {
                return true;
            }
            current = self.get(ancestor).parent;
        }
        false
    }

    /// Resolve a declaration to the leaf that identifies it in the raw stream.
    ///
    /// A leaf resolves to itself. A group resolves through its first child,
    /// recursively, until a leaf is reached.
    #[must_use]
    pub fn first_leaf(&self, id: DeclId) -> DeclId {
        let mut current = id;
        while let DeclKind::Group = self.get(current).kind {
            // Validation guarantees every group has a first child.
            current = self.get(current).children[0];
        }
        current
    }

    /// Find a declaration by fully-qualified path.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&Decl<P>> {
        self.iter().find(|decl| decl.path == path)
    }

    /// Iterate over all declarations in document order, excluding the synthetic root.
    pub fn iter(&self) -> impl Iterator<Item = &Decl<P>> {
        self.decls.iter().skip(1)
    }

    /// Returns the number of declarations, excluding the synthetic root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.decls.len() - 1
    }

    /// Returns `true` if the tree has no declarations besides the root.
    ///
    /// A validated tree always has a target, so this is `false` in practice.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the deepest declaration depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.iter().map(Decl::depth).max().unwrap_or(0)
    }
}

struct Builder<'p, P> {
    decls: Vec<Decl<P>>,
    target: Option<DeclId>,
    profile: &'p FormatProfile,
}

impl<P> Builder<'_, P> {
    fn push(&mut self, rec: RecDecl<P>, parent: DeclId, depth: usize) -> Result<DeclId, SchemaError> {
        let parent_path = &self.decls[parent.index()].path;
        if rec.name.is_empty() {
            return Err(SchemaError::EmptyName {
                parent: if parent_path.is_empty() {
                    ROOT_NAME.to_owned()
                } else {
                    parent_path.clone()
                },
            });
        }

        let path = if parent_path.is_empty() {
            rec.name.clone()
        } else {
            format!("{parent_path}{PATH_SEPARATOR}{}", rec.name)
        };

        if depth > MAX_DECL_DEPTH {
            return Err(SchemaError::DepthExceeded {
                path,
                depth,
                max: MAX_DECL_DEPTH,
            });
        }

        let occurs = Occurs {
            min: rec.min.unwrap_or(self.profile.default_min),
            max: match rec.max {
                MaxBound::Default => Some(self.profile.default_max),
                MaxBound::Limited(max) => Some(max),
                MaxBound::Unbounded => None,
            },
        };
        if let Some(max) = occurs.max {
            if occurs.min > max {
                return Err(SchemaError::MinExceedsMax {
                    path,
                    min: occurs.min,
                    max,
                });
            }
        }

        if matches!(rec.kind, DeclKind::Group) && rec.children.is_empty() {
            return Err(SchemaError::EmptyGroup { path });
        }

        let id = DeclId(u32::try_from(self.decls.len()).map_err(|_| {
            SchemaError::InvalidConfig {
                reason: "too many declarations".to_owned(),
            }
        })?);

        if rec.is_target {
            if let Some(first) = self.target {
                return Err(SchemaError::MultipleTargets {
                    first: self.decls[first.index()].path.clone(),
                    second: path,
                });
            }
            self.target = Some(id);
        }

        self.decls.push(Decl {
            id,
            name: rec.name,
            path,
            kind: rec.kind,
            is_target: rec.is_target,
            occurs,
            parent: Some(parent),
            children: Vec::with_capacity(rec.children.len()),
            depth,
        });

        let mut children = Vec::with_capacity(rec.children.len());
        for child in rec.children {
            children.push(self.push(child, id, depth + 1)?);
        }
        self.decls[id.index()].children = children;

        Ok(id)
    }
}
