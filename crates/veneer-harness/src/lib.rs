#![forbid(unsafe_code)]

//! Test support for veneer: a recording mock platform, tree builders, and
//! lifecycle-recording widgets.
//!
//! [`MockPlatform`] realizes the platform adapter contract over an
//! in-memory arena and records every primitive call in an op log, so tests
//! assert on *what actually hit the platform*, not just on internal state.
//! It also implements [`TreeLoader`], which lets takeover tests read live
//! records back out of the arena.
//!
//! # Quick Start
//!
//! ```
//! use veneer_harness::{el, text, MockPlatform, attrs};
//! use veneer_render::{diff, Patcher, LiveTree};
//!
//! let mock = MockPlatform::new_shared();
//! let platform = MockPlatform::as_platform(&mock);
//! let host = mock.borrow_mut().host();
//!
//! let tree = el("ul", attrs(&[("class", "list")]), vec![text("hi")]);
//! let mut live = LiveTree::new(host);
//! let mut hooks = veneer_harness::RecordingHost::default();
//! Patcher::new(&platform, &mut hooks)
//!     .apply(&mut live, &diff(None, &tree))
//!     .unwrap();
//!
//! assert_eq!(mock.borrow().node_of(live.root().unwrap().id), tree);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use veneer_core::{AttrList, EventOptions, Node, OwnerKey, WidgetNode};
use veneer_render::adapter::{BindingHandle, Listener, NodeId, Platform, SharedPlatform};
use veneer_render::apply::{HookError, WidgetHooks};
use veneer_render::live::LiveNode;
use veneer_runtime::TreeLoader;
use veneer_runtime::widget::{
    LifecycleError, TeardownError, Widget, WidgetFactory,
};

// ============================================================================
// Tree builders
// ============================================================================

/// Build an element node.
#[must_use]
pub fn el(tag: &str, attrs: AttrList, children: Vec<Node>) -> Node {
    Node::element(tag, attrs, children)
}

/// Build a text node.
#[must_use]
pub fn text(content: &str) -> Node {
    Node::text(content)
}

/// Build a widget node with empty props.
#[must_use]
pub fn widget(key: &str) -> Node {
    Node::widget(key, AttrList::new())
}

/// Build a widget node with props.
#[must_use]
pub fn widget_with(key: &str, props: AttrList) -> Node {
    Node::widget(key, props)
}

/// Build an attribute list from pairs.
#[must_use]
pub fn attrs(pairs: &[(&str, &str)]) -> AttrList {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

// ============================================================================
// Platform op log
// ============================================================================

/// One recorded platform primitive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformOp {
    /// `create_text`
    CreateText(NodeId, String),
    /// `create_element`
    CreateElement(NodeId, String),
    /// `set_attribute`
    SetAttr(NodeId, String, String),
    /// `remove_attribute`
    RemoveAttr(NodeId, String),
    /// `set_text`
    SetText(NodeId, String),
    /// `insert_child`
    InsertChild(NodeId, u32, NodeId),
    /// `remove_child`
    RemoveChild(NodeId, u32),
    /// `add_listener`
    AddListener(NodeId, String, BindingHandle),
    /// `remove_listener`
    RemoveListener(BindingHandle),
}

impl PlatformOp {
    /// Stable name for counting ops by kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CreateText(..) => "create_text",
            Self::CreateElement(..) => "create_element",
            Self::SetAttr(..) => "set_attribute",
            Self::RemoveAttr(..) => "remove_attribute",
            Self::SetText(..) => "set_text",
            Self::InsertChild(..) => "insert_child",
            Self::RemoveChild(..) => "remove_child",
            Self::AddListener(..) => "add_listener",
            Self::RemoveListener(..) => "remove_listener",
        }
    }
}

impl fmt::Display for PlatformOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateText(id, text) => write!(f, "create_text {id} {text:?}"),
            Self::CreateElement(id, tag) => write!(f, "create_element {id} <{tag}>"),
            Self::SetAttr(id, name, value) => write!(f, "set_attribute {id} {name}={value:?}"),
            Self::RemoveAttr(id, name) => write!(f, "remove_attribute {id} {name}"),
            Self::SetText(id, text) => write!(f, "set_text {id} {text:?}"),
            Self::InsertChild(parent, index, child) => {
                write!(f, "insert_child {parent}[{index}] = {child}")
            }
            Self::RemoveChild(parent, index) => write!(f, "remove_child {parent}[{index}]"),
            Self::AddListener(node, event, handle) => {
                write!(f, "add_listener {node} {event} -> {handle}")
            }
            Self::RemoveListener(handle) => write!(f, "remove_listener {handle}"),
        }
    }
}

// ============================================================================
// Mock platform
// ============================================================================

#[derive(Debug, Clone, Default)]
struct MockNode {
    tag: Option<String>,
    text: Option<String>,
    attrs: AttrList,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

struct MockListener {
    handle: BindingHandle,
    node: NodeId,
    event: String,
    listener: Listener,
    removed: bool,
}

/// In-memory platform adapter with an op log.
#[derive(Default)]
pub struct MockPlatform {
    nodes: Vec<MockNode>,
    listeners: Vec<MockListener>,
    ops: Vec<PlatformOp>,
    next_handle: u64,
}

impl MockPlatform {
    /// Create an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock behind the usual shared handle.
    #[must_use]
    pub fn new_shared() -> Rc<RefCell<MockPlatform>> {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Coerce the concrete handle to the [`SharedPlatform`] the kernel
    /// takes. Both handles point at the same arena.
    #[must_use]
    pub fn as_platform(mock: &Rc<RefCell<MockPlatform>>) -> SharedPlatform {
        mock.clone()
    }

    fn alloc(&mut self, node: MockNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() as u64 - 1)
    }

    fn node(&self, id: NodeId) -> &MockNode {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut MockNode {
        &mut self.nodes[id.0 as usize]
    }

    /// Create an unlogged container element to mount under.
    pub fn host(&mut self) -> NodeId {
        self.alloc(MockNode {
            tag: Some("host".to_string()),
            ..MockNode::default()
        })
    }

    /// Build pre-existing markup (takeover scenarios): create an unlogged
    /// element under `parent`.
    pub fn seed_element(&mut self, parent: NodeId, tag: &str, attrs: AttrList) -> NodeId {
        let id = self.alloc(MockNode {
            tag: Some(tag.to_string()),
            attrs,
            parent: Some(parent),
            ..MockNode::default()
        });
        self.node_mut(parent).children.push(id);
        id
    }

    /// Build pre-existing text (takeover scenarios): create an unlogged
    /// text node under `parent`.
    pub fn seed_text(&mut self, parent: NodeId, content: &str) -> NodeId {
        let id = self.alloc(MockNode {
            text: Some(content.to_string()),
            parent: Some(parent),
            ..MockNode::default()
        });
        self.node_mut(parent).children.push(id);
        id
    }

    /// Every recorded op, in call order.
    #[must_use]
    pub fn ops(&self) -> &[PlatformOp] {
        &self.ops
    }

    /// Drain the op log.
    pub fn take_ops(&mut self) -> Vec<PlatformOp> {
        std::mem::take(&mut self.ops)
    }

    /// Count recorded ops of one kind (see [`PlatformOp::kind`]).
    #[must_use]
    pub fn count_ops(&self, kind: &str) -> usize {
        self.ops.iter().filter(|op| op.kind() == kind).count()
    }

    /// Number of listeners currently registered (added and not removed).
    #[must_use]
    pub fn active_listeners(&self) -> usize {
        self.listeners.iter().filter(|l| !l.removed).count()
    }

    /// Reconstruct the snapshot a platform subtree realizes.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not name a node.
    #[must_use]
    pub fn node_of(&self, id: NodeId) -> Node {
        let node = self.node(id);
        if let Some(text) = &node.text {
            return Node::text(text.clone());
        }
        let tag = node.tag.clone().expect("node is neither text nor element");
        let children = node.children.iter().map(|c| self.node_of(*c)).collect();
        Node::element(tag, node.attrs.clone(), children)
    }

    /// Read a live record back out of the arena (loader for takeover).
    #[must_use]
    pub fn live_of(&self, id: NodeId) -> LiveNode {
        let node = self.node(id);
        if let Some(text) = &node.text {
            return LiveNode::text(id, text.clone());
        }
        let tag = node.tag.clone().expect("node is neither text nor element");
        let children = node.children.iter().map(|c| self.live_of(*c)).collect();
        LiveNode::element(id, tag, node.attrs.clone(), children)
    }

    /// Children of a node, for structural assertions.
    #[must_use]
    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).children.clone()
    }

    /// Chain of ancestors from `id` up to the root, inclusive of `id`.
    fn ancestry(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Dispatch an event at `target`, bubbling to listeners registered on
    /// any ancestor (or the target itself). Returns the number of
    /// listeners invoked.
    ///
    /// Listeners run outside the mock borrow, so handlers may freely call
    /// back into the platform.
    pub fn dispatch(mock: &Rc<RefCell<MockPlatform>>, event: &str, target: NodeId) -> usize {
        let to_run: Vec<Listener> = {
            let mock = mock.borrow();
            if target.0 as usize >= mock.nodes.len() {
                return 0;
            }
            let chain = mock.ancestry(target);
            mock.listeners
                .iter()
                .filter(|l| !l.removed && l.event == event && chain.contains(&l.node))
                .map(|l| l.listener.clone())
                .collect()
        };
        for listener in &to_run {
            listener(target);
        }
        to_run.len()
    }
}

impl fmt::Debug for MockPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockPlatform")
            .field("nodes", &self.nodes.len())
            .field("listeners", &self.active_listeners())
            .field("ops", &self.ops.len())
            .finish()
    }
}

impl Platform for MockPlatform {
    fn create_text(&mut self, text: &str) -> NodeId {
        let id = self.alloc(MockNode {
            text: Some(text.to_string()),
            ..MockNode::default()
        });
        self.ops.push(PlatformOp::CreateText(id, text.to_string()));
        id
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        let id = self.alloc(MockNode {
            tag: Some(tag.to_string()),
            ..MockNode::default()
        });
        self.ops.push(PlatformOp::CreateElement(id, tag.to_string()));
        id
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        self.node_mut(node).attrs.set(name, value);
        self.ops
            .push(PlatformOp::SetAttr(node, name.to_string(), value.to_string()));
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        self.node_mut(node).attrs.remove(name);
        self.ops.push(PlatformOp::RemoveAttr(node, name.to_string()));
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        self.node_mut(node).text = Some(text.to_string());
        self.ops.push(PlatformOp::SetText(node, text.to_string()));
    }

    fn insert_child(&mut self, parent: NodeId, index: u32, child: NodeId) {
        let index = (index as usize).min(self.node(parent).children.len());
        self.node_mut(parent).children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
        self.ops
            .push(PlatformOp::InsertChild(parent, index as u32, child));
    }

    fn remove_child(&mut self, parent: NodeId, index: u32) {
        let child = self.node_mut(parent).children.remove(index as usize);
        self.node_mut(child).parent = None;
        self.ops.push(PlatformOp::RemoveChild(parent, index));
    }

    fn add_listener(
        &mut self,
        node: NodeId,
        event: &str,
        _options: EventOptions,
        listener: Listener,
    ) -> BindingHandle {
        let handle = BindingHandle(self.next_handle);
        self.next_handle += 1;
        self.listeners.push(MockListener {
            handle,
            node,
            event: event.to_string(),
            listener,
            removed: false,
        });
        self.ops
            .push(PlatformOp::AddListener(node, event.to_string(), handle));
        handle
    }

    fn remove_listener(&mut self, handle: BindingHandle) {
        if let Some(entry) = self.listeners.iter_mut().find(|l| l.handle == handle) {
            entry.removed = true;
        }
        self.ops.push(PlatformOp::RemoveListener(handle));
    }
}

/// [`TreeLoader`] over a mock arena, for takeover tests of embedded child
/// views.
pub struct MockLoader(pub Rc<RefCell<MockPlatform>>);

impl TreeLoader for MockLoader {
    fn load(&self, node: NodeId) -> Option<LiveNode> {
        let mock = self.0.borrow();
        if node.0 as usize >= mock.nodes.len() {
            return None;
        }
        Some(mock.live_of(node))
    }

    fn position_of(&self, node: NodeId) -> Option<(NodeId, u32)> {
        let mock = self.0.borrow();
        let parent = mock.node(node).parent?;
        let index = mock
            .node(parent)
            .children
            .iter()
            .position(|c| *c == node)? as u32;
        Some((parent, index))
    }
}

// ============================================================================
// Recording widgets
// ============================================================================

/// Shared log of widget lifecycle calls, in call order.
pub type WidgetLog = Rc<RefCell<Vec<String>>>;

/// A widget that records every lifecycle call it receives.
///
/// `mount` creates a single element tagged `widget` so the surrounding
/// tree has something real at the slot.
pub struct RecordingWidget {
    key: OwnerKey,
    log: WidgetLog,
    fail_destroy: bool,
}

impl Widget for RecordingWidget {
    fn mount(
        &mut self,
        platform: &SharedPlatform,
        parent: NodeId,
        index: u32,
    ) -> Result<NodeId, LifecycleError> {
        self.log.borrow_mut().push(format!("mount {}", self.key));
        let mut platform = platform.borrow_mut();
        let id = platform.create_element("widget");
        platform.insert_child(parent, index, id);
        Ok(id)
    }

    fn attach(
        &mut self,
        existing: NodeId,
        _platform: &SharedPlatform,
    ) -> Result<(), LifecycleError> {
        self.log
            .borrow_mut()
            .push(format!("attach {} {existing}", self.key));
        Ok(())
    }

    fn update(
        &mut self,
        props: &AttrList,
        _platform: &SharedPlatform,
    ) -> Result<(), LifecycleError> {
        self.log
            .borrow_mut()
            .push(format!("update {} [{props}]", self.key));
        Ok(())
    }

    fn destroy(&mut self, _platform: &SharedPlatform) -> Result<(), TeardownError> {
        if self.fail_destroy {
            return Err(TeardownError::new("recording widget told to fail"));
        }
        self.log.borrow_mut().push(format!("destroy {}", self.key));
        Ok(())
    }
}

/// Factory for [`RecordingWidget`]s sharing one log.
pub struct RecordingFactory {
    log: WidgetLog,
    fail_destroy: bool,
}

impl RecordingFactory {
    /// Create a factory writing to `log`.
    #[must_use]
    pub fn new(log: WidgetLog) -> Rc<Self> {
        Rc::new(Self {
            log,
            fail_destroy: false,
        })
    }

    /// Create a factory whose widgets fail to tear down.
    #[must_use]
    pub fn failing_destroy(log: WidgetLog) -> Rc<Self> {
        Rc::new(Self {
            log,
            fail_destroy: true,
        })
    }
}

impl WidgetFactory for RecordingFactory {
    fn instantiate(&self, node: &WidgetNode) -> Box<dyn Widget> {
        Box::new(RecordingWidget {
            key: node.key.clone(),
            log: self.log.clone(),
            fail_destroy: self.fail_destroy,
        })
    }
}

/// Standalone [`WidgetHooks`] for render-kernel tests that do not need the
/// full runtime host: creates a `widget` element per slot and records
/// lifecycle calls.
#[derive(Default)]
pub struct RecordingHost {
    /// Lifecycle calls in order: `create`/`update`/`destroy` plus key.
    pub calls: Vec<String>,
}

impl WidgetHooks for RecordingHost {
    fn create(
        &mut self,
        node: &WidgetNode,
        platform: &SharedPlatform,
        parent: NodeId,
        index: u32,
    ) -> Result<NodeId, HookError> {
        self.calls.push(format!("create {}", node.key));
        let mut platform = platform.borrow_mut();
        let id = platform.create_element("widget");
        platform.insert_child(parent, index, id);
        Ok(id)
    }

    fn update(
        &mut self,
        key: &OwnerKey,
        _props: &AttrList,
        _platform: &SharedPlatform,
    ) -> Result<(), HookError> {
        self.calls.push(format!("update {key}"));
        Ok(())
    }

    fn destroy(&mut self, key: &OwnerKey, _platform: &SharedPlatform) -> Result<(), HookError> {
        self.calls.push(format!("destroy {key}"));
        Ok(())
    }
}
