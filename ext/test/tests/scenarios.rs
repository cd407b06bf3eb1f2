//! End-to-end engine scenarios over a scripted source.

use std::sync::Arc;
use strata_test::prelude::*;

fn leaf(name: &str) -> RecDecl<()> {
    RecDecl::leaf(name, ())
}

fn reader(decls: Vec<RecDecl<()>>, script: &str) -> HierarchyReader<(), ScriptedSource> {
    let decls = DeclTree::new(decls, &FormatProfile::FLAT).unwrap();
    HierarchyReader::new(Arc::new(decls), ScriptedSource::parse(script))
}

/// `A(1..1) -> [B(0..1), C(1..2)]`, A is the target.
fn abc() -> Vec<RecDecl<()>> {
    vec![leaf("A")
        .target()
        .min(1)
        .max(1)
        .with_child(leaf("B").min(0).max(1))
        .with_child(leaf("C").min(1).max(2))]
}

fn child_names(tree: &Tree, id: NodeId) -> Vec<String> {
    tree.children(id)
        .iter()
        .filter_map(|&c| tree.name(c).map(str::to_owned))
        .collect()
}

#[test]
fn one_optional_and_one_required_child() {
    let mut r = reader(abc(), "A B C");
    let target = r.read().unwrap().unwrap();
    assert_eq!(r.tree().name(target), Some("A"));
    assert_eq!(child_names(r.tree(), target), ["B", "C"]);
    assert!(r.read().unwrap().is_none());
}

#[test]
fn optional_child_skipped() {
    let mut r = reader(abc(), "A C C");
    let target = r.read().unwrap().unwrap();
    assert_eq!(child_names(r.tree(), target), ["C", "C"]);
    assert!(r.read().unwrap().is_none());
}

#[test]
fn required_child_missing() {
    let mut r = reader(abc(), "A");
    match r.read() {
        Err(ReadError::FewerThanMinOccurs {
            path,
            required,
            actual,
        }) => assert_eq!((path.as_str(), required, actual), ("A/C", 1, 0)),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn target_then_absent_optional_sibling() {
    let mut r = reader(vec![leaf("A").target().min(1), leaf("D").min(0).max(1)], "A");
    let target = r.read().unwrap().unwrap();
    assert_eq!(r.tree().name(target), Some("A"));
    assert!(r.read().unwrap().is_none());
    assert!(r.read().unwrap().is_none());
}

#[test]
fn unit_after_everything_finished() {
    let mut r = reader(vec![leaf("A").target()], "A Z");
    assert!(r.read().unwrap().is_some());
    assert!(matches!(r.read(), Err(ReadError::UnexpectedTrailingData)));
    assert_eq!(r.source().remaining(), 1);
}

#[test]
fn group_node_holds_its_first_leaf() {
    let mut r = reader(vec![RecDecl::group("G").target().with_child(leaf("H"))], "H=7");
    let target = r.read().unwrap().unwrap();
    assert_eq!(r.tree().name(target), Some("G"));
    let children = r.tree().children(target);
    assert_eq!(children.len(), 1);
    assert_eq!(r.tree().name(children[0]), Some("H"));
    assert_eq!(r.tree().value(children[0]), Some("7"));
    // the group peek did not consume
    assert_eq!(r.source().peeks(), 1);
    assert_eq!(r.source().consumed(), 1);
}

#[test]
fn ancestors_reachable_from_target() {
    let decls = vec![RecDecl::group("ISA")
        .with_child(leaf("ISA").min(1))
        .with_child(RecDecl::group("ST").target().unbounded().with_child(leaf("ST")).with_child(leaf("SE")))
        .with_child(leaf("IEA").min(1))];
    let mut r = reader(decls, "ISA=sender ST=1 SE ST=2 SE IEA");
    let first = r.read().unwrap().unwrap();
    let interchange = r.tree().parent(first).unwrap();
    assert_eq!(r.tree().value_at(interchange, "ISA"), Some("sender"));
    assert_eq!(render(r.tree(), first), "ST(ST=1,SE)");
    assert_eq!(read_all(&mut r).unwrap(), ["ST(ST=2,SE)"]);
}

#[test]
fn released_targets_and_finished_ancestors_are_freed() {
    let decls = vec![RecDecl::group("FILE").with_child(leaf("ITEM").target().unbounded())];
    let mut r = reader(decls, "ITEM=1 ITEM=2 ITEM=3");
    while let Some(target) = r.read().unwrap() {
        r.release(target);
        // synthetic root + FILE
        assert_eq!(r.tree().len(), 2);
    }
    assert_eq!(r.tree().len(), 1);
    assert_eq!(r.targets_read(), 3);
}

#[test]
fn filter_skips_rejected_targets() {
    let decls = vec![leaf("ITEM").target().unbounded()];
    let filter = FieldFilter::new("", ValueMatcher::Prefix("k".into()));
    let mut r = reader(decls, "ITEM=keep ITEM=drop ITEM=kept").with_filter(filter);
    assert_eq!(read_all(&mut r).unwrap(), ["ITEM=keep", "ITEM=kept"]);
}
