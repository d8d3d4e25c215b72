#![forbid(unsafe_code)]

//! Per-root event delegation.
//!
//! A view declares an [`EventMap`] of `"event selector"` entries naming
//! handlers it registered separately. [`EventTable::bind`] registers one
//! delegated listener per entry on the tree root; at dispatch time the
//! listener walks the ancestry of the event target against the selector, so
//! dynamically inserted matching nodes are covered without rebinding.
//!
//! Rebinding is deliberately not incremental: any change to the event map
//! triggers a full unbind-then-rebind pass for the root. The small constant
//! cost buys away a whole class of stale-handler bugs from partial updates.
//!
//! # Selector language
//!
//! What delegated view maps actually use: `tag`, `#id`, `.class`, and
//! compounds (`li.item`, `button#save.primary`). An empty selector binds the
//! handler on the root itself.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use veneer_core::{EventKey, EventOptions};
use veneer_render::adapter::{BindingHandle, Listener, NodeId, SharedPlatform};
use veneer_render::live::{LiveKind, LiveNode, LiveTree};

/// What a handler receives at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    /// Platform event name.
    pub event: String,
    /// The node the event targeted.
    pub target: NodeId,
    /// The ancestor (or target) that matched the selector; the root for
    /// root bindings.
    pub matched: NodeId,
}

/// A named event handler.
pub type Handler = Rc<dyn Fn(&EventContext)>;

/// Named handlers a view registers for its event map to reference.
pub type HandlerMap = AHashMap<String, Handler>;

/// One declared binding: key, handler name, listener options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventEntry {
    /// Event name plus delegation selector.
    pub key: EventKey,
    /// Name of the handler in the view's handler map.
    pub handler: String,
    /// Listener options forwarded to the platform.
    pub options: EventOptions,
}

/// A view's declared event bindings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventMap {
    entries: Vec<EventEntry>,
}

impl EventMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a binding from an `"event selector"` entry.
    ///
    /// # Panics
    ///
    /// Panics on an empty entry string: a malformed event map is a
    /// programming error in the declaring view.
    #[must_use]
    pub fn on(mut self, entry: &str, handler: impl Into<String>) -> Self {
        self.insert(entry, handler, EventOptions::empty());
        self
    }

    /// Declare a binding with explicit listener options.
    ///
    /// # Panics
    ///
    /// Panics on an empty entry string.
    #[must_use]
    pub fn on_with(
        mut self,
        entry: &str,
        handler: impl Into<String>,
        options: EventOptions,
    ) -> Self {
        self.insert(entry, handler, options);
        self
    }

    fn insert(&mut self, entry: &str, handler: impl Into<String>, options: EventOptions) {
        let key = EventKey::parse(entry)
            .unwrap_or_else(|| panic!("event map entry {entry:?} has no event name"));
        self.entries.push(EventEntry {
            key,
            handler: handler.into(),
            options,
        });
    }

    /// Number of declared bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map declares nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate the declared bindings.
    pub fn iter(&self) -> impl Iterator<Item = &EventEntry> {
        self.entries.iter()
    }
}

/// Event binding failure: always a contract violation in the declaring view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The map references a handler name the view never registered.
    MissingHandler {
        /// The entry whose handler is missing.
        key: EventKey,
        /// The unresolved handler name.
        handler: String,
    },
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHandler { key, handler } => {
                write!(f, "event map entry {key:?} references unknown handler {handler:?}")
            }
        }
    }
}

impl std::error::Error for EventError {}

// ─────────────────────────────────────────────────────────────────────────
// Selector matching
// ─────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq, Eq)]
struct Selector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Selector {
    fn parse(selector: &str) -> Self {
        let mut parts = Self::default();
        let mut rest = selector.trim();
        // Leading tag name runs up to the first `.` or `#`.
        let tag_end = rest.find(['.', '#']).unwrap_or(rest.len());
        if tag_end > 0 {
            parts.tag = Some(rest[..tag_end].to_string());
        }
        rest = &rest[tag_end..];
        while !rest.is_empty() {
            let (marker, tail) = rest.split_at(1);
            let end = tail.find(['.', '#']).unwrap_or(tail.len());
            let (name, remaining) = tail.split_at(end);
            match marker {
                "." if !name.is_empty() => parts.classes.push(name.to_string()),
                "#" if !name.is_empty() => parts.id = Some(name.to_string()),
                _ => {}
            }
            rest = remaining;
        }
        parts
    }

    fn matches(&self, node: &LiveNode) -> bool {
        let LiveKind::Element { tag, attrs, .. } = &node.kind else {
            return false;
        };
        if let Some(want) = &self.tag
            && want != tag
        {
            return false;
        }
        if let Some(want) = &self.id
            && attrs.get("id") != Some(want.as_str())
        {
            return false;
        }
        if !self.classes.is_empty() {
            let classes = attrs.get("class").unwrap_or("");
            let have: Vec<&str> = classes.split_whitespace().collect();
            if !self.classes.iter().all(|c| have.contains(&c.as_str())) {
                return false;
            }
        }
        true
    }
}

/// Chain of live nodes from the root down to `target`, inclusive.
fn find_chain<'t>(node: &'t LiveNode, target: NodeId, chain: &mut Vec<&'t LiveNode>) -> bool {
    chain.push(node);
    if node.id == target {
        return true;
    }
    for child in node.children() {
        if find_chain(child, target, chain) {
            return true;
        }
    }
    chain.pop();
    false
}

// ─────────────────────────────────────────────────────────────────────────
// Event table
// ─────────────────────────────────────────────────────────────────────────

/// Owns the binding handles for one tree root.
#[derive(Default)]
pub struct EventTable {
    bindings: Vec<BindingHandle>,
    bound_map: Option<EventMap>,
    bound_root: Option<NodeId>,
}

impl EventTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any bindings are currently registered.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        !self.bindings.is_empty()
    }

    /// The map currently bound, if any. The controller compares against it
    /// to decide whether a rebind pass is needed.
    #[must_use]
    pub fn bound_map(&self) -> Option<&EventMap> {
        self.bound_map.as_ref()
    }

    /// The root the current bindings are registered on. A replaced root
    /// takes its listeners with it, so the controller rebinds when this
    /// changes even if the map did not.
    #[must_use]
    pub fn bound_root(&self) -> Option<NodeId> {
        self.bound_root
    }

    /// Full bind pass: resolve every entry, then register one delegated
    /// listener per entry on `root`.
    ///
    /// Any previously held bindings are released first, so a changed map
    /// can never leave a stale handler behind. All handler names are
    /// resolved before the first registration, so a missing handler fails the
    /// whole pass with no side effects.
    pub fn bind(
        &mut self,
        root: NodeId,
        live: &Rc<RefCell<LiveTree>>,
        map: &EventMap,
        handlers: &HandlerMap,
        platform: &SharedPlatform,
    ) -> Result<(), EventError> {
        // Resolve first, register after: fail fast with no side effects.
        let mut resolved: Vec<(&EventEntry, Handler)> = Vec::with_capacity(map.len());
        for entry in map.iter() {
            let handler = handlers
                .get(&entry.handler)
                .ok_or_else(|| EventError::MissingHandler {
                    key: entry.key.clone(),
                    handler: entry.handler.clone(),
                })?;
            resolved.push((entry, handler.clone()));
        }

        self.unbind(platform);

        for (entry, handler) in resolved {
            let listener = delegated_listener(
                entry.key.event.clone(),
                entry.key.selector.clone(),
                root,
                Rc::downgrade(live),
                handler,
            );
            let handle =
                platform
                    .borrow_mut()
                    .add_listener(root, &entry.key.event, entry.options, listener);
            self.bindings.push(handle);
        }
        tracing::debug!(root = %root, bindings = self.bindings.len(), "events bound");
        self.bound_map = Some(map.clone());
        self.bound_root = Some(root);
        Ok(())
    }

    /// Release every held binding.
    pub fn unbind(&mut self, platform: &SharedPlatform) {
        if !self.bindings.is_empty() {
            tracing::debug!(bindings = self.bindings.len(), "events unbound");
        }
        for handle in self.bindings.drain(..) {
            platform.borrow_mut().remove_listener(handle);
        }
        self.bound_map = None;
        self.bound_root = None;
    }
}

impl fmt::Debug for EventTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTable")
            .field("bindings", &self.bindings.len())
            .field("bound", &self.bound_map.is_some())
            .finish()
    }
}

fn delegated_listener(
    event: String,
    selector: String,
    root: NodeId,
    live: Weak<RefCell<LiveTree>>,
    handler: Handler,
) -> Listener {
    let parsed = Selector::parse(&selector);
    let root_binding = selector.is_empty();
    Rc::new(move |target: NodeId| {
        if root_binding {
            handler(&EventContext {
                event: event.clone(),
                target,
                matched: root,
            });
            return;
        }
        let Some(live) = live.upgrade() else {
            return;
        };
        let live = live.borrow();
        let Some(root_node) = live.root() else {
            return;
        };
        let mut chain = Vec::new();
        if !find_chain(root_node, target, &mut chain) {
            // Target below a widget slot (or foreign): the widget owns it.
            return;
        }
        // Closest match wins: walk from the target upward.
        if let Some(matched) = chain.iter().rev().find(|node| parsed.matches(node)) {
            handler(&EventContext {
                event: event.clone(),
                target,
                matched: matched.id,
            });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use veneer_core::AttrList;

    fn li(id: u64, class: &str) -> LiveNode {
        LiveNode::element(
            NodeId(id),
            "li",
            AttrList::new().with("class", class),
            vec![],
        )
    }

    fn sample_tree() -> LiveTree {
        LiveTree::adopt(
            NodeId(0),
            LiveNode::element(
                NodeId(1),
                "ul",
                AttrList::new().with("id", "list"),
                vec![li(2, "item"), li(3, "item active")],
            ),
        )
    }

    #[test]
    fn selector_parse_compound() {
        let sel = Selector::parse("li.item.active");
        assert_eq!(sel.tag.as_deref(), Some("li"));
        assert_eq!(sel.classes, vec!["item", "active"]);
        assert_eq!(sel.id, None);

        let sel = Selector::parse("#list");
        assert_eq!(sel.tag, None);
        assert_eq!(sel.id.as_deref(), Some("list"));
    }

    #[test]
    fn selector_matches_class_and_tag() {
        let node = li(9, "item active");
        assert!(Selector::parse("li").matches(&node));
        assert!(Selector::parse(".item").matches(&node));
        assert!(Selector::parse("li.active").matches(&node));
        assert!(!Selector::parse("li.missing").matches(&node));
        assert!(!Selector::parse("div").matches(&node));
    }

    #[test]
    fn selector_never_matches_text_or_widget() {
        let text = LiveNode::text(NodeId(5), "x");
        assert!(!Selector::parse("li").matches(&text));
        let widget = LiveNode::widget(NodeId(6), "k".into(), AttrList::new());
        assert!(!Selector::parse(".item").matches(&widget));
    }

    #[test]
    fn find_chain_reaches_nested_target() {
        let tree = sample_tree();
        let mut chain = Vec::new();
        assert!(find_chain(tree.root().unwrap(), NodeId(3), &mut chain));
        let ids: Vec<u64> = chain.iter().map(|n| n.id.0).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn delegated_listener_matches_closest_ancestor() {
        let live = Rc::new(RefCell::new(sample_tree()));
        let seen: Rc<RefCell<Vec<EventContext>>> = Rc::new(RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        let handler: Handler = Rc::new(move |ctx| seen2.borrow_mut().push(ctx.clone()));

        let listener = delegated_listener(
            "click".into(),
            ".item".into(),
            NodeId(1),
            Rc::downgrade(&live),
            handler,
        );

        listener(NodeId(3));
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].matched, NodeId(3));
        assert_eq!(seen.borrow()[0].target, NodeId(3));

        // Target outside the live tree: no dispatch.
        listener(NodeId(99));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn root_binding_fires_without_matching() {
        let live = Rc::new(RefCell::new(sample_tree()));
        let seen: Rc<RefCell<Vec<EventContext>>> = Rc::new(RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        let handler: Handler = Rc::new(move |ctx| seen2.borrow_mut().push(ctx.clone()));

        let listener = delegated_listener(
            "submit".into(),
            String::new(),
            NodeId(1),
            Rc::downgrade(&live),
            handler,
        );
        listener(NodeId(2));
        assert_eq!(seen.borrow()[0].matched, NodeId(1));
    }

    #[test]
    fn dropped_tree_silences_listener() {
        let live = Rc::new(RefCell::new(sample_tree()));
        let seen: Rc<RefCell<Vec<EventContext>>> = Rc::new(RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        let handler: Handler = Rc::new(move |ctx| seen2.borrow_mut().push(ctx.clone()));
        let listener = delegated_listener(
            "click".into(),
            ".item".into(),
            NodeId(1),
            Rc::downgrade(&live),
            handler,
        );

        drop(live);
        listener(NodeId(2));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn event_map_builder_and_equality() {
        let a = EventMap::new()
            .on("click .js-row", "select")
            .on_with("submit", "save", EventOptions::CAPTURE);
        let b = EventMap::new()
            .on("click .js-row", "select")
            .on_with("submit", "save", EventOptions::CAPTURE);
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);

        let c = EventMap::new().on("click .js-row", "select");
        assert_ne!(a, c);
    }

    #[test]
    #[should_panic(expected = "no event name")]
    fn empty_entry_panics() {
        let _ = EventMap::new().on("  ", "handler");
    }
}
