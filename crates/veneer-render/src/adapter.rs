#![forbid(unsafe_code)]

//! The platform adapter contract.
//!
//! [`Platform`] is the seam between the reconciliation kernel and whatever
//! actually owns the rendered nodes: a document, a scene graph, or the
//! in-memory arena the test harness provides. All primitives are synchronous
//! and assumed non-throwing under normal conditions; an adapter failure is
//! fatal to the host, not retried here.
//!
//! Nodes are addressed by opaque [`NodeId`]s minted by the adapter.
//! Listener registrations return an opaque [`BindingHandle`] that the event
//! layer owns until it explicitly releases it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use veneer_core::EventOptions;

/// Opaque identifier for a platform-owned node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque token for a registered listener, owned by the event layer until
/// explicitly released.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindingHandle(pub u64);

impl fmt::Display for BindingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding#{}", self.0)
    }
}

/// A registered event listener. The adapter invokes it with the node the
/// event targeted; delegation decisions happen on the veneer side.
pub type Listener = Rc<dyn Fn(NodeId)>;

/// Shared single-threaded handle to the platform adapter.
///
/// Everything in the reconciliation path (patcher, widget host, event
/// table, embedded child views) takes this handle and borrows it only for
/// the duration of one primitive call. Holding a borrow across a widget
/// lifecycle call would deadlock a child view rendering re-entrantly, so
/// nothing in this workspace does.
pub type SharedPlatform = Rc<RefCell<dyn Platform>>;

/// Primitives the reconciliation kernel needs from the node owner.
pub trait Platform {
    /// Create a detached text node.
    fn create_text(&mut self, text: &str) -> NodeId;

    /// Create a detached element node.
    fn create_element(&mut self, tag: &str) -> NodeId;

    /// Set one attribute on an element.
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    /// Remove one attribute from an element.
    fn remove_attribute(&mut self, node: NodeId, name: &str);

    /// Replace the content of a text node.
    fn set_text(&mut self, node: NodeId, text: &str);

    /// Insert `child` under `parent` at `index`.
    fn insert_child(&mut self, parent: NodeId, index: u32, child: NodeId);

    /// Detach the child of `parent` at `index`.
    fn remove_child(&mut self, parent: NodeId, index: u32);

    /// Register a listener for `event` on `node`.
    fn add_listener(
        &mut self,
        node: NodeId,
        event: &str,
        options: EventOptions,
        listener: Listener,
    ) -> BindingHandle;

    /// Release a previously registered listener.
    fn remove_listener(&mut self, handle: BindingHandle);
}
