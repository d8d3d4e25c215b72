#![forbid(unsafe_code)]

//! Diff computation between tree snapshots.
//!
//! [`diff`] compares two immutable snapshots and produces the ordered patch
//! sequence that turns the first into the second. It is pure: no platform
//! calls, no widget calls, deterministic output.
//!
//! # Algorithm
//!
//! - No old tree → a single `ReplaceRoot`.
//! - Kind mismatch (text vs element, differing element tag) → `Replace` at
//!   that position; no cross-kind reuse is attempted.
//! - Equal-tag elements: attribute diff (one patch per added/changed/removed
//!   key), then positional child diff.
//! - Child diff is positional, not keyed: children are compared
//!   index-by-index up to `min(len)`; trailing old children are removed in
//!   descending index order, trailing new children inserted in ascending
//!   order. Reordering a child list therefore cascades into per-position
//!   replacements rather than a move, a deliberate trade of reorder
//!   efficiency for O(n) cost.
//! - Widgets are never diffed structurally: equal owner keys yield
//!   `UpdateWidget` with the new props; differing keys yield `Replace`.
//!
//! # Performance
//!
//! Subtrees with no widget descendants on either side short-circuit on
//! structural equality: two identical static regions contribute no patches
//! and no per-child recursion beyond the equality scan. This is the main
//! inner-loop guard for large static regions.
//!
//! # Invariants
//!
//! 1. `diff(Some(t), t)` is empty for every tree `t`.
//! 2. Patch order keeps indices valid: sibling removals are emitted
//!    high-to-low, insertions low-to-high, and both after the in-range
//!    per-child patches.
//! 3. Applying the output to a live tree realized from `old` yields a live
//!    tree structurally equivalent to `new`.

use veneer_core::{Element, Node, NodePath};

use crate::patch::Patch;

/// Compute the patch sequence turning `old` into `new`.
///
/// With no `old` tree the result is a single [`Patch::ReplaceRoot`].
#[must_use]
pub fn diff(old: Option<&Node>, new: &Node) -> Vec<Patch> {
    #[cfg(feature = "tracing")]
    let _span = tracing::debug_span!("diff", root = new.kind_name());
    #[cfg(feature = "tracing")]
    let _guard = _span.enter();

    let mut patches = Vec::new();
    match old {
        None => patches.push(Patch::ReplaceRoot { new: new.clone() }),
        Some(old) => diff_node(old, new, &NodePath::root(), &mut patches),
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(patches = patches.len(), "diff computed");

    patches
}

fn diff_node(old: &Node, new: &Node, path: &NodePath, out: &mut Vec<Patch>) {
    match (old, new) {
        (Node::Text(a), Node::Text(b)) => {
            if a != b {
                out.push(Patch::SetText {
                    path: path.clone(),
                    text: b.clone(),
                });
            }
        }
        (Node::Element(a), Node::Element(b)) if a.tag == b.tag => {
            // Static-region fast path: no widgets on either side means the
            // subtrees are comparable by value, and equal subtrees need no
            // patches at all.
            if !a.has_widget_descendant() && !b.has_widget_descendant() && a == b {
                return;
            }
            diff_attrs(a, b, path, out);
            diff_children(a, b, path, out);
        }
        (Node::Widget(a), Node::Widget(b)) => {
            if a.key == b.key {
                out.push(Patch::UpdateWidget {
                    path: path.clone(),
                    key: b.key.clone(),
                    props: b.props.clone(),
                });
            } else {
                out.push(Patch::Replace {
                    path: path.clone(),
                    new: new.clone(),
                });
            }
        }
        _ => out.push(Patch::Replace {
            path: path.clone(),
            new: new.clone(),
        }),
    }
}

fn diff_attrs(old: &Element, new: &Element, path: &NodePath, out: &mut Vec<Patch>) {
    for (name, value) in new.attrs.iter() {
        if old.attrs.get(name) != Some(value) {
            out.push(Patch::SetAttr {
                path: path.clone(),
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }
    for (name, _) in old.attrs.iter() {
        if !new.attrs.contains(name) {
            out.push(Patch::RemoveAttr {
                path: path.clone(),
                name: name.to_string(),
            });
        }
    }
}

fn diff_children(old: &Element, new: &Element, path: &NodePath, out: &mut Vec<Patch>) {
    let old_len = old.children.len();
    let new_len = new.children.len();
    let shared = old_len.min(new_len);

    for i in 0..shared {
        diff_node(
            &old.children[i],
            &new.children[i],
            &path.child(i as u32),
            out,
        );
    }

    // Trailing removals high-to-low so earlier removals never shift the
    // indices of later ones.
    for i in (new_len..old_len).rev() {
        out.push(Patch::RemoveChild {
            parent: path.clone(),
            index: i as u32,
        });
    }

    for (i, child) in new.children.iter().enumerate().skip(old_len) {
        out.push(Patch::InsertChild {
            parent: path.clone(),
            index: i as u32,
            node: child.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veneer_core::AttrList;

    fn li(text: &str) -> Node {
        Node::element("li", AttrList::new(), vec![Node::text(text)])
    }

    fn ul(children: Vec<Node>) -> Node {
        Node::element("ul", AttrList::new(), children)
    }

    #[test]
    fn no_old_tree_emits_replace_root() {
        let new = ul(vec![li("a")]);
        let patches = diff(None, &new);
        assert_eq!(patches.len(), 1);
        assert!(matches!(&patches[0], Patch::ReplaceRoot { .. }));
    }

    #[test]
    fn identical_trees_yield_no_patches() {
        let tree = ul(vec![li("a"), li("b"), Node::widget("w", AttrList::new())]);
        // Widget-bearing trees skip the equality fast path but still produce
        // only the unconditional widget update.
        let patches = diff(Some(&tree), &tree);
        assert_eq!(patches.len(), 1);
        assert!(matches!(&patches[0], Patch::UpdateWidget { .. }));

        let static_tree = ul(vec![li("a"), li("b")]);
        assert!(diff(Some(&static_tree), &static_tree).is_empty());
    }

    #[test]
    fn text_change_is_one_set_text() {
        let old = ul(vec![li("a")]);
        let new = ul(vec![li("b")]);
        let patches = diff(Some(&old), &new);
        assert_eq!(patches.len(), 1);
        match &patches[0] {
            Patch::SetText { path, text } => {
                assert_eq!(path.indices(), &[0, 0]);
                assert_eq!(text, "b");
            }
            other => panic!("expected SetText, got {other}"),
        }
    }

    #[test]
    fn attribute_diff_covers_add_change_remove() {
        let old = Node::element(
            "div",
            AttrList::new().with("keep", "1").with("change", "a").with("drop", "x"),
            vec![],
        );
        let new = Node::element(
            "div",
            AttrList::new().with("keep", "1").with("change", "b").with("add", "y"),
            vec![],
        );
        let patches = diff(Some(&old), &new);
        let rendered: Vec<String> = patches.iter().map(Patch::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "SetAttr(/, change=\"b\")",
                "SetAttr(/, add=\"y\")",
                "RemoveAttr(/, drop)",
            ],
        );
    }

    #[test]
    fn tag_change_replaces_wholesale() {
        let old = Node::element("div", AttrList::new(), vec![Node::text("x")]);
        let new = Node::element("span", AttrList::new(), vec![Node::text("x")]);
        let patches = diff(Some(&old), &new);
        assert_eq!(patches.len(), 1);
        assert!(matches!(&patches[0], Patch::Replace { .. }));
    }

    #[test]
    fn kind_change_replaces_wholesale() {
        let old = ul(vec![Node::text("x")]);
        let new = ul(vec![li("x")]);
        let patches = diff(Some(&old), &new);
        assert_eq!(patches.len(), 1);
        match &patches[0] {
            Patch::Replace { path, .. } => assert_eq!(path.indices(), &[0]),
            other => panic!("expected Replace, got {other}"),
        }
    }

    #[test]
    fn trailing_shrink_is_one_removal() {
        // [A, B, C] -> [A, C]: positional diff rewrites position 1 and
        // removes the trailing child: exactly one removal, no move.
        let old = ul(vec![li("A"), li("B"), li("C")]);
        let new = ul(vec![li("A"), li("C")]);
        let patches = diff(Some(&old), &new);

        let removals: Vec<_> = patches
            .iter()
            .filter(|p| matches!(p, Patch::RemoveChild { .. }))
            .collect();
        assert_eq!(removals.len(), 1, "patches: {patches:?}");
        assert!(matches!(
            removals[0],
            Patch::RemoveChild { index: 2, .. }
        ));
        assert!(
            !patches
                .iter()
                .any(|p| matches!(p, Patch::InsertChild { .. })),
            "trailing elimination must not synthesize a move",
        );
    }

    #[test]
    fn multiple_trailing_removals_descend() {
        let old = ul(vec![li("a"), li("b"), li("c"), li("d")]);
        let new = ul(vec![li("a")]);
        let patches = diff(Some(&old), &new);
        let indices: Vec<u32> = patches
            .iter()
            .filter_map(|p| match p {
                Patch::RemoveChild { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(indices, vec![3, 2, 1]);
    }

    #[test]
    fn trailing_growth_inserts_ascending() {
        let old = ul(vec![li("a")]);
        let new = ul(vec![li("a"), li("b"), li("c")]);
        let patches = diff(Some(&old), &new);
        let indices: Vec<u32> = patches
            .iter()
            .filter_map(|p| match p {
                Patch::InsertChild { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn widget_same_key_updates_never_replaces() {
        let old = ul(vec![Node::widget("item1", AttrList::new().with("n", "1"))]);
        let new = ul(vec![Node::widget("item1", AttrList::new().with("n", "2"))]);
        let patches = diff(Some(&old), &new);
        assert_eq!(patches.len(), 1);
        match &patches[0] {
            Patch::UpdateWidget { key, props, .. } => {
                assert_eq!(key.as_str(), "item1");
                assert_eq!(props.get("n"), Some("2"));
            }
            other => panic!("expected UpdateWidget, got {other}"),
        }
    }

    #[test]
    fn widget_key_change_forces_replace() {
        let old = ul(vec![Node::widget("item1", AttrList::new())]);
        let new = ul(vec![Node::widget("item2", AttrList::new())]);
        let patches = diff(Some(&old), &new);
        assert_eq!(patches.len(), 1);
        assert!(matches!(&patches[0], Patch::Replace { .. }));
    }

    #[test]
    fn static_sibling_contributes_nothing() {
        let static_region = Node::element(
            "section",
            AttrList::new(),
            vec![li("s1"), li("s2"), li("s3")],
        );
        let old = ul(vec![static_region.clone(), li("x")]);
        let new = ul(vec![static_region, li("y")]);
        let patches = diff(Some(&old), &new);
        assert_eq!(patches.len(), 1);
        assert!(matches!(&patches[0], Patch::SetText { .. }));
    }

    #[test]
    fn reorder_cascades_as_replacements() {
        // Positional, not keyed: swapping two element children of different
        // tags rewrites both positions.
        let old = ul(vec![
            Node::element("a", AttrList::new(), vec![]),
            Node::element("b", AttrList::new(), vec![]),
        ]);
        let new = ul(vec![
            Node::element("b", AttrList::new(), vec![]),
            Node::element("a", AttrList::new(), vec![]),
        ]);
        let patches = diff(Some(&old), &new);
        assert_eq!(patches.len(), 2);
        assert!(patches
            .iter()
            .all(|p| matches!(p, Patch::Replace { .. })));
    }
}
