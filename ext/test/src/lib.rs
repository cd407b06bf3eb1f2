//! strata-test: Scripted input for conformance testing
//!
//! Provides an in-memory [`RawUnitSource`] whose raw units are written as a
//! whitespace-separated script, plus helpers to render output trees compactly.
//! This is the reference source that shows how to build a strata format extension.
//!
//! # Example
//!
//! ```
//! use strata_test::prelude::*;
//! use std::sync::Arc;
//!
//! let decls = DeclTree::new(
//!     vec![RecDecl::leaf("A", ())
//!         .target()
//!         .unbounded()
//!         .with_child(RecDecl::leaf("B", ()).unbounded())],
//!     &FormatProfile::FLAT,
//! )
//! .unwrap();
//!
//! let source = ScriptedSource::parse("A=1 B B A=2");
//! let mut reader = HierarchyReader::new(Arc::new(decls), source);
//! assert_eq!(read_all(&mut reader).unwrap(), ["A=1(B,B)", "A=2"]);
//! ```

use std::collections::VecDeque;
use strata::prelude::*;

#[cfg(feature = "fixtures")]
pub mod fixture;

/// One scripted raw unit: a name and an optional text value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Matched against leaf declaration names.
    pub name: String,
    /// Becomes the materialized node's value.
    pub value: Option<String>,
}

impl Unit {
    /// Parse `NAME` or `NAME=value`.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        match token.split_once('=') {
            Some((name, value)) => Self {
                name: name.to_owned(),
                value: Some(value.to_owned()),
            },
            None => Self {
                name: token.to_owned(),
                value: None,
            },
        }
    }
}

/// A raw-unit source over a scripted list of units.
///
/// Works with any leaf payload: a leaf matches iff the next unit has its name.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    units: VecDeque<Unit>,
    consumed: usize,
    peeks: usize,
}

impl ScriptedSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a whitespace-separated script of `NAME` / `NAME=value` tokens.
    #[must_use]
    pub fn parse(script: &str) -> Self {
        script.split_whitespace().map(Unit::parse).collect()
    }

    /// Append a unit (builder pattern).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Option<&str>) -> Self {
        self.units.push_back(Unit {
            name: name.into(),
            value: value.map(str::to_owned),
        });
        self
    }

    /// Units consumed by materializing matches.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Peeks answered so far.
    #[must_use]
    pub fn peeks(&self) -> usize {
        self.peeks
    }

    /// Units not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.units.len()
    }
}

impl FromIterator<Unit> for ScriptedSource {
    fn from_iter<I: IntoIterator<Item = Unit>>(iter: I) -> Self {
        Self {
            units: iter.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl<P> RawUnitSource<P> for ScriptedSource {
    fn has_more_input(&mut self) -> Result<bool, ReadError> {
        Ok(!self.units.is_empty())
    }

    fn try_match(
        &mut self,
        decl: &Decl<P>,
        tree: &mut Tree,
        materialize: bool,
    ) -> Result<MatchOutcome, ReadError> {
        match self.units.front() {
            Some(unit) if unit.name == decl.name() => {}
            _ => return Ok(MatchOutcome::NoMatch),
        }
        if !materialize {
            self.peeks += 1;
            return Ok(MatchOutcome::Matched);
        }
        let Some(unit) = self.units.pop_front() else {
            return Ok(MatchOutcome::NoMatch);
        };
        self.consumed += 1;
        let node = match unit.value {
            Some(value) => tree.create_value(unit.name, value),
            None => tree.create(unit.name),
        };
        Ok(MatchOutcome::Materialized(node))
    }
}

/// Render a subtree compactly: `NAME`, `NAME=value`, children in parentheses.
///
/// `ORDER(HDR=1,LINE=a,LINE=b)`
#[must_use]
pub fn render(tree: &Tree, id: NodeId) -> String {
    let Some(node) = tree.get(id) else {
        return String::from("<released>");
    };
    let mut out = node.name().to_owned();
    if let Some(value) = node.value() {
        out.push('=');
        out.push_str(value);
    }
    if !node.children().is_empty() {
        let children: Vec<_> = node.children().iter().map(|&c| render(tree, c)).collect();
        out.push('(');
        out.push_str(&children.join(","));
        out.push(')');
    }
    out
}

/// Read every remaining target, rendered with [`render`].
///
/// # Errors
///
/// The first [`ReadError`] the reader returns.
pub fn read_all<P, S: RawUnitSource<P>>(
    reader: &mut HierarchyReader<P, S>,
) -> Result<Vec<String>, ReadError> {
    let mut out = Vec::new();
    while let Some(target) = reader.read()? {
        out.push(render(reader.tree(), target));
    }
    Ok(out)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{read_all, render, ScriptedSource, Unit};
    pub use strata::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn unit_parsing() {
        assert_eq!(
            Unit::parse("A=1=2"),
            Unit {
                name: "A".into(),
                value: Some("1=2".into())
            }
        );
        assert_eq!(Unit::parse("B").value, None);
    }

    #[test]
    fn builder_and_parse_agree() {
        let built = ScriptedSource::new().with("A", Some("1")).with("B", None);
        let parsed = ScriptedSource::parse("A=1\nB");
        assert_eq!(built.units, parsed.units);
        assert_eq!(parsed.remaining(), 2);
    }

    #[test]
    fn peek_then_materialize() {
        let decls = DeclTree::new(vec![RecDecl::leaf("A", ())], &FormatProfile::FLAT).unwrap();
        let mut source = ScriptedSource::parse("A=x");
        let mut tree = Tree::new();

        assert_eq!(
            source.try_match(decls.target(), &mut tree, false).unwrap(),
            MatchOutcome::Matched
        );
        let MatchOutcome::Materialized(node) = source.try_match(decls.target(), &mut tree, true).unwrap() else {
            panic!("expected a materialized unit");
        };
        assert_eq!(render(&tree, node), "A=x");
        assert_eq!((source.peeks(), source.consumed(), source.remaining()), (1, 1, 0));
    }

    #[test]
    fn render_nested() {
        let decls = DeclTree::new(
            vec![RecDecl::group("G")
                .target()
                .with_child(RecDecl::leaf("H", ()))
                .with_child(RecDecl::leaf("I", ()).unbounded())],
            &FormatProfile::FLAT,
        )
        .unwrap();
        let mut reader = HierarchyReader::new(Arc::new(decls), ScriptedSource::parse("H=1 I I=2"));
        assert_eq!(read_all(&mut reader).unwrap(), ["G(H=1,I,I=2)"]);
    }

    #[test]
    fn render_released_handle() {
        let mut tree = Tree::new();
        let node = tree.create("A");
        tree.release(node);
        assert_eq!(render(&tree, node), "<released>");
    }
}
