//! Property tests for occurrence bounds, overflow to later siblings, document order
//! and target singularity.

use proptest::prelude::*;
use std::sync::Arc;
use strata_test::prelude::*;

fn reader(decls: Vec<RecDecl<()>>, script: &str) -> HierarchyReader<(), ScriptedSource> {
    let decls = DeclTree::new(decls, &FormatProfile::FLAT).unwrap();
    HierarchyReader::new(Arc::new(decls), ScriptedSource::parse(script))
}

/// Collect targets until the first error or end of input.
fn drain(reader: &mut HierarchyReader<(), ScriptedSource>) -> (Vec<String>, Option<ReadError>) {
    let mut targets = Vec::new();
    loop {
        match reader.read() {
            Ok(Some(target)) => targets.push(render(reader.tree(), target)),
            Ok(None) => return (targets, None),
            Err(err) => return (targets, Some(err)),
        }
    }
}

proptest! {
    /// `n` units of a target bounded `min..=max` surface `min(n, max)` targets, then
    /// end of input, a minimum failure, or trailing data.
    #[test]
    fn occurrence_bounds(min in 0usize..4, extra in 0usize..4, n in 0usize..10) {
        let max = min + extra;
        let max = max.max(1);
        let script = vec!["T"; n].join(" ");
        let mut r = reader(vec![RecDecl::leaf("T", ()).target().min(min).max(max)], &script);
        let (targets, err) = drain(&mut r);

        prop_assert_eq!(targets.len(), n.min(max));
        match err {
            None => prop_assert!(n >= min && n <= max),
            Some(ReadError::FewerThanMinOccurs { required, actual, .. }) => {
                prop_assert!(n < min);
                prop_assert_eq!((required, actual), (min, n));
            }
            Some(ReadError::UnexpectedTrailingData) => prop_assert!(n > max),
            Some(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    /// Units past a leaf's `max` go to the next sibling that accepts them.
    #[test]
    fn overflow_moves_to_next_sibling(first in 1usize..4, second in 1usize..4, k in 0usize..9) {
        let decls = vec![RecDecl::leaf("A", ())
            .target()
            .with_child(RecDecl::leaf("C", ()).max(first))
            .with_child(RecDecl::leaf("C", ()).min(1).max(second))];
        let units: Vec<String> = (0..k).map(|i| format!("C={i}")).collect();
        let script = format!("A {}", units.join(" "));
        let mut r = reader(decls, &script);
        let (targets, err) = drain(&mut r);

        let taken = k.min(first + second);
        let expected = format!("A({})", units[..taken].join(","));
        if k <= first {
            prop_assert!(targets.is_empty());
            let is_fewer_than_min = matches!(
                err,
                Some(ReadError::FewerThanMinOccurs { ref path, required: 1, actual: 0 }) if path == "A/C"
            );
            prop_assert!(is_fewer_than_min);
        } else if k <= first + second {
            prop_assert!(err.is_none());
            prop_assert_eq!(targets, vec![expected]);
        } else {
            prop_assert_eq!(targets, vec![expected]);
            prop_assert!(matches!(err, Some(ReadError::UnexpectedTrailingData)));
        }
    }

    /// Targets come out in input order with their values intact.
    #[test]
    fn document_order(values in prop::collection::vec("[a-z0-9]{1,6}", 0..20)) {
        let script = values.iter().map(|v| format!("T={v}")).collect::<Vec<_>>().join(" ");
        let mut r = reader(vec![RecDecl::leaf("T", ()).target().unbounded()], &script);
        let (targets, err) = drain(&mut r);

        prop_assert!(err.is_none());
        let expected: Vec<String> = values.iter().map(|v| format!("T={v}")).collect();
        prop_assert_eq!(targets, expected);
    }

    /// Each group occurrence is surfaced exactly once and owns exactly its own units.
    #[test]
    fn one_target_per_group_occurrence(lines in prop::collection::vec(0usize..4, 0..12)) {
        let decls = vec![RecDecl::group("G")
            .target()
            .unbounded()
            .with_child(RecDecl::leaf("H", ()).min(1))
            .with_child(RecDecl::leaf("I", ()).unbounded())];

        let mut script = Vec::new();
        let mut expected = Vec::new();
        for (n, &count) in lines.iter().enumerate() {
            script.push(format!("H={n}"));
            script.extend(std::iter::repeat("I".to_owned()).take(count));
            let children: Vec<String> = std::iter::once(format!("H={n}"))
                .chain(std::iter::repeat("I".to_owned()).take(count))
                .collect();
            expected.push(format!("G({})", children.join(",")));
        }

        let mut r = reader(decls, &script.join(" "));
        let (targets, err) = drain(&mut r);

        prop_assert!(err.is_none());
        prop_assert_eq!(targets, expected);
        prop_assert_eq!(r.targets_read(), lines.len());
        prop_assert_eq!(r.source().remaining(), 0);
    }
}
