#![forbid(unsafe_code)]

//! Opt-in introspection: injected observers and textual tree dumps.
//!
//! Nothing here affects production control flow. Observation is explicit:
//! a host builds an [`InspectionRegistry`], hands it to the views it wants
//! watched via [`ViewConfig`](crate::view::ViewConfig), and tears it down
//! with the process or test run. There is no module-level registry and no
//! reflection; the operations a view reports are the statically declared
//! [`INSTRUMENTED_OPS`].

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::{Rc, Weak};

use veneer_core::Node;
use veneer_render::live::{LiveKind, LiveNode, LiveTree};

/// The operations views report to observers. Fixed at compile time.
pub const INSTRUMENTED_OPS: &[&str] = &["render", "commit_tree", "bind_effects", "destroy"];

/// What an observer learns about a view event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewEvent {
    /// The view's debug name (configured, or `"view"`).
    pub view: String,
    /// One of [`INSTRUMENTED_OPS`], or `"registered"`/`"destroyed"`.
    pub op: String,
}

/// Read-only observer of view lifecycle events.
pub trait InspectionObserver {
    /// A view came up.
    fn view_registered(&self, event: &ViewEvent);
    /// A view finished a render pass.
    fn render_completed(&self, event: &ViewEvent);
    /// A view was torn down.
    fn view_destroyed(&self, event: &ViewEvent);
}

/// Explicitly constructed observer registry; observers are held weakly so
/// the registry never extends their lifetime.
#[derive(Clone, Default)]
pub struct InspectionRegistry {
    observers: Rc<RefCell<Vec<Weak<dyn InspectionObserver>>>>,
}

impl InspectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. The registry keeps a weak reference only.
    pub fn register(&self, observer: &Rc<dyn InspectionObserver>) {
        self.observers.borrow_mut().push(Rc::downgrade(observer));
    }

    /// Number of live observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    fn each(&self, f: impl Fn(&Rc<dyn InspectionObserver>)) {
        let observers: Vec<Rc<dyn InspectionObserver>> = {
            let mut list = self.observers.borrow_mut();
            list.retain(|w| w.strong_count() > 0);
            list.iter().filter_map(Weak::upgrade).collect()
        };
        for observer in observers {
            f(&observer);
        }
    }

    /// Notify: a view came up.
    pub fn notify_registered(&self, event: &ViewEvent) {
        self.each(|o| o.view_registered(event));
    }

    /// Notify: a render pass completed.
    pub fn notify_render(&self, event: &ViewEvent) {
        self.each(|o| o.render_completed(event));
    }

    /// Notify: a view was torn down.
    pub fn notify_destroyed(&self, event: &ViewEvent) {
        self.each(|o| o.view_destroyed(event));
    }
}

impl std::fmt::Debug for InspectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InspectionRegistry")
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Render a snapshot as an indented one-node-per-line listing.
#[must_use]
pub fn tree_to_string(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, 0, &mut out);
    out
}

fn write_node(node: &Node, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    match node {
        Node::Text(text) => {
            let _ = writeln!(out, "{pad}text {text:?}");
        }
        Node::Element(el) => {
            if el.attrs.is_empty() {
                let _ = writeln!(out, "{pad}<{}>", el.tag);
            } else {
                let _ = writeln!(out, "{pad}<{} {}>", el.tag, el.attrs);
            }
            for child in &el.children {
                write_node(child, depth + 1, out);
            }
        }
        Node::Widget(w) => {
            let _ = writeln!(out, "{pad}widget {}", w.key);
        }
    }
}

/// Textual comparison of a snapshot against the live tree: one line per
/// divergence, empty when they agree. Diagnostics only.
#[must_use]
pub fn live_drift(expected: &Node, live: &LiveTree) -> String {
    let mut out = String::new();
    match live.root() {
        None => {
            let _ = writeln!(out, "/: live tree has no root");
        }
        Some(root) => drift_node(expected, root, "/", &mut out),
    }
    out
}

fn drift_node(expected: &Node, live: &LiveNode, path: &str, out: &mut String) {
    match (expected, &live.kind) {
        (Node::Text(want), LiveKind::Text(have)) => {
            if want != have {
                let _ = writeln!(out, "{path}: text {have:?}, expected {want:?}");
            }
        }
        (Node::Element(el), LiveKind::Element { tag, attrs, children }) => {
            if &el.tag != tag {
                let _ = writeln!(out, "{path}: <{tag}>, expected <{}>", el.tag);
                return;
            }
            if &el.attrs != attrs {
                let _ = writeln!(out, "{path}: attrs [{attrs}], expected [{}]", el.attrs);
            }
            if el.children.len() != children.len() {
                let _ = writeln!(
                    out,
                    "{path}: {} children, expected {}",
                    children.len(),
                    el.children.len()
                );
            }
            for (i, (want, have)) in el.children.iter().zip(children).enumerate() {
                let child_path = if path == "/" {
                    format!("/{i}")
                } else {
                    format!("{path}/{i}")
                };
                drift_node(want, have, &child_path, out);
            }
        }
        (Node::Widget(w), LiveKind::Widget { key, .. }) => {
            if &w.key != key {
                let _ = writeln!(out, "{path}: widget {key}, expected {}", w.key);
            }
        }
        (want, _) => {
            let _ = writeln!(
                out,
                "{path}: {} node, expected {}",
                live.kind_name(),
                want.kind_name()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veneer_core::AttrList;
    use veneer_render::adapter::NodeId;

    #[test]
    fn instrumented_ops_are_declared() {
        assert!(INSTRUMENTED_OPS.contains(&"render"));
        assert!(INSTRUMENTED_OPS.contains(&"destroy"));
    }

    #[test]
    fn tree_to_string_is_indented() {
        let tree = Node::element(
            "ul",
            AttrList::new().with("class", "list"),
            vec![
                Node::element("li", AttrList::new(), vec![Node::text("a")]),
                Node::widget("item1", AttrList::new()),
            ],
        );
        let rendered = tree_to_string(&tree);
        assert_eq!(
            rendered,
            "<ul class=\"list\">\n  <li>\n    text \"a\"\n  widget item1\n"
        );
    }

    #[test]
    fn live_drift_empty_when_matching() {
        let tree = Node::element("div", AttrList::new(), vec![Node::text("x")]);
        let live = LiveTree::adopt(
            NodeId(0),
            LiveNode::element(
                NodeId(1),
                "div",
                AttrList::new(),
                vec![LiveNode::text(NodeId(2), "x")],
            ),
        );
        assert!(live_drift(&tree, &live).is_empty());
    }

    #[test]
    fn live_drift_reports_text_mismatch() {
        let tree = Node::element("div", AttrList::new(), vec![Node::text("x")]);
        let live = LiveTree::adopt(
            NodeId(0),
            LiveNode::element(
                NodeId(1),
                "div",
                AttrList::new(),
                vec![LiveNode::text(NodeId(2), "y")],
            ),
        );
        let drift = live_drift(&tree, &live);
        assert_eq!(drift, "/0: text \"y\", expected \"x\"\n");
    }

    #[test]
    fn registry_notifies_live_observers_only() {
        use std::cell::Cell;

        struct Counter {
            seen: Cell<u32>,
        }
        impl InspectionObserver for Counter {
            fn view_registered(&self, _e: &ViewEvent) {
                self.seen.set(self.seen.get() + 1);
            }
            fn render_completed(&self, _e: &ViewEvent) {}
            fn view_destroyed(&self, _e: &ViewEvent) {}
        }

        let registry = InspectionRegistry::new();
        let alive: Rc<dyn InspectionObserver> = Rc::new(Counter { seen: Cell::new(0) });
        let doomed: Rc<dyn InspectionObserver> = Rc::new(Counter { seen: Cell::new(0) });
        registry.register(&alive);
        registry.register(&doomed);
        drop(doomed);

        registry.notify_registered(&ViewEvent {
            view: "v".into(),
            op: "registered".into(),
        });
        assert_eq!(registry.observer_count(), 1);
    }
}
