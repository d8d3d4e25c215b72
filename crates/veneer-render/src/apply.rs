#![forbid(unsafe_code)]

//! Patch application against the live tree.
//!
//! [`Patcher`] replays a patch sequence produced by [`diff`](crate::diff)
//! onto a [`LiveTree`], invoking [`Platform`](crate::adapter::Platform)
//! primitives for structural mutations and delegating widget subtrees to
//! [`WidgetHooks`]. Attribute and text changes mutate in place; everything
//! else replaces subtrees wholesale.
//!
//! Before any live subtree containing widget slots is detached, every
//! embedded widget is destroyed deepest-first through the hooks; a
//! replaced widget must never outlive its platform node.
//!
//! The platform handle is borrowed per primitive call, never across a hook
//! invocation: a widget hook is free to render its own subtree (and borrow
//! the platform again) while a patch is mid-application.
//!
//! # Failure Modes
//!
//! | Condition | Behavior | Rationale |
//! |-----------|----------|-----------|
//! | Path resolves to nothing | `ApplyError::BadPath` | Differ/live drift is a producer bug |
//! | Patch kind vs node kind mismatch | `ApplyError::KindMismatch` | Same |
//! | Child index out of range | `ApplyError::BadIndex` | Same |
//! | Patch before any root mounted | `ApplyError::MissingRoot` | Same |
//! | Widget hook failure | `ApplyError::Hook` | Teardown/creation failures propagate, never swallowed |
//!
//! All of these are contract violations: fail fast, no local recovery.

use std::fmt;

use veneer_core::{AttrList, Node, NodePath, OwnerKey, WidgetNode};

use crate::adapter::{NodeId, SharedPlatform};
use crate::live::{LiveKind, LiveNode, LiveTree};
use crate::patch::Patch;

/// Failure reported by a widget lifecycle hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    /// No live widget (or no registered factory) for this key.
    UnknownWidget(OwnerKey),
    /// The widget failed to tear down cleanly. Resource leaks are worse
    /// than a visible error, so this always surfaces.
    Teardown {
        /// The widget that failed.
        key: OwnerKey,
        /// Widget-reported reason.
        reason: String,
    },
    /// Creation or update failed.
    Lifecycle {
        /// The widget that failed.
        key: OwnerKey,
        /// Widget-reported reason.
        reason: String,
    },
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownWidget(key) => write!(f, "no widget registered for key {key}"),
            Self::Teardown { key, reason } => {
                write!(f, "widget {key} failed to tear down: {reason}")
            }
            Self::Lifecycle { key, reason } => write!(f, "widget {key} lifecycle error: {reason}"),
        }
    }
}

impl std::error::Error for HookError {}

/// Widget lifecycle callbacks the patcher routes opaque subtrees through.
///
/// Implemented by the runtime's widget host. `create` both instantiates the
/// component and inserts its rendered output under `parent` at `index`,
/// returning the inserted root node.
pub trait WidgetHooks {
    /// Instantiate the widget for `node` and mount its output as a child.
    fn create(
        &mut self,
        node: &WidgetNode,
        platform: &SharedPlatform,
        parent: NodeId,
        index: u32,
    ) -> Result<NodeId, HookError>;

    /// Deliver new props to the living widget; it re-renders itself.
    fn update(
        &mut self,
        key: &OwnerKey,
        props: &AttrList,
        platform: &SharedPlatform,
    ) -> Result<(), HookError>;

    /// Tear the widget down before its platform node is detached.
    fn destroy(&mut self, key: &OwnerKey, platform: &SharedPlatform) -> Result<(), HookError>;
}

/// Error applying a patch sequence. Every variant is a programming-contract
/// violation in the producing layer, except `Hook`, which carries a widget
/// failure through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// A non-root patch arrived before any root was mounted.
    MissingRoot,
    /// The live tree has no host to mount under.
    MissingHost,
    /// A patch path did not resolve to a live node.
    BadPath(NodePath),
    /// The live node at the path is not the kind the patch expects.
    KindMismatch {
        /// Offending path.
        path: NodePath,
        /// What the patch expected.
        expected: &'static str,
        /// What the live tree holds.
        found: &'static str,
    },
    /// A child index was out of range for its parent.
    BadIndex {
        /// Parent path.
        parent: NodePath,
        /// Offending index.
        index: u32,
        /// Current child count.
        len: usize,
    },
    /// An `UpdateWidget` patch addressed a slot holding a different key.
    WidgetKeyMismatch {
        /// Offending path.
        path: NodePath,
        /// Key the patch carries.
        expected: OwnerKey,
        /// Key the live slot holds.
        found: OwnerKey,
    },
    /// A widget lifecycle hook failed.
    Hook(HookError),
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRoot => write!(f, "patch addresses a tree with no mounted root"),
            Self::MissingHost => write!(f, "live tree has no host node"),
            Self::BadPath(path) => write!(f, "patch path {path} does not resolve"),
            Self::KindMismatch {
                path,
                expected,
                found,
            } => write!(f, "patch at {path} expects {expected}, live node is {found}"),
            Self::BadIndex { parent, index, len } => {
                write!(f, "child index {index} out of range at {parent} (len {len})")
            }
            Self::WidgetKeyMismatch {
                path,
                expected,
                found,
            } => write!(
                f,
                "widget update at {path} expects key {expected}, slot holds {found}"
            ),
            Self::Hook(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ApplyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Hook(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HookError> for ApplyError {
    fn from(err: HookError) -> Self {
        Self::Hook(err)
    }
}

/// Applies patch sequences to a live tree through a platform adapter and
/// widget hooks.
pub struct Patcher<'a> {
    platform: SharedPlatform,
    hooks: &'a mut dyn WidgetHooks,
}

impl<'a> Patcher<'a> {
    /// Pair a platform handle with widget hooks for one application pass.
    pub fn new(platform: &SharedPlatform, hooks: &'a mut dyn WidgetHooks) -> Self {
        Self {
            platform: platform.clone(),
            hooks,
        }
    }

    /// Apply `patches` to `live` in order.
    ///
    /// On error the live tree reflects every patch applied before the
    /// failure; the caller treats the error as fatal for this tree.
    pub fn apply(&mut self, live: &mut LiveTree, patches: &[Patch]) -> Result<(), ApplyError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("apply", patches = patches.len());
        #[cfg(feature = "tracing")]
        let _guard = _span.enter();

        for patch in patches {
            self.apply_one(live, patch)?;
        }
        Ok(())
    }

    fn apply_one(&mut self, live: &mut LiveTree, patch: &Patch) -> Result<(), ApplyError> {
        match patch {
            Patch::ReplaceRoot { new } => self.replace_root(live, new),
            Patch::Replace { path, new } => match path.split_last() {
                None => self.replace_root(live, new),
                Some((parent, index)) => self.replace_child(live, &parent, index, new),
            },
            Patch::SetText { path, text } => {
                let node = resolve_mut(live, path)?;
                match &mut node.kind {
                    LiveKind::Text(current) => {
                        *current = text.clone();
                        self.platform.borrow_mut().set_text(node.id, text);
                        Ok(())
                    }
                    _ => Err(kind_mismatch(path, "text", node)),
                }
            }
            Patch::SetAttr { path, name, value } => {
                let node = resolve_mut(live, path)?;
                match &mut node.kind {
                    LiveKind::Element { attrs, .. } => {
                        attrs.set(name.clone(), value.clone());
                        self.platform.borrow_mut().set_attribute(node.id, name, value);
                        Ok(())
                    }
                    _ => Err(kind_mismatch(path, "element", node)),
                }
            }
            Patch::RemoveAttr { path, name } => {
                let node = resolve_mut(live, path)?;
                match &mut node.kind {
                    LiveKind::Element { attrs, .. } => {
                        attrs.remove(name);
                        self.platform.borrow_mut().remove_attribute(node.id, name);
                        Ok(())
                    }
                    _ => Err(kind_mismatch(path, "element", node)),
                }
            }
            Patch::InsertChild {
                parent,
                index,
                node,
            } => {
                let (parent_id, len) = element_meta(live, parent)?;
                if *index as usize > len {
                    return Err(ApplyError::BadIndex {
                        parent: parent.clone(),
                        index: *index,
                        len,
                    });
                }
                let realized = self.realize_into(parent_id, *index, node)?;
                let LiveKind::Element { children, .. } = &mut resolve_mut(live, parent)?.kind
                else {
                    unreachable!("element_meta verified the parent kind");
                };
                children.insert(*index as usize, realized);
                Ok(())
            }
            Patch::RemoveChild { parent, index } => {
                let (parent_id, len) = element_meta(live, parent)?;
                if *index as usize >= len {
                    return Err(ApplyError::BadIndex {
                        parent: parent.clone(),
                        index: *index,
                        len,
                    });
                }
                let doomed = {
                    let LiveKind::Element { children, .. } = &mut resolve_mut(live, parent)?.kind
                    else {
                        unreachable!("element_meta verified the parent kind");
                    };
                    children.remove(*index as usize)
                };
                self.teardown(&doomed)?;
                self.platform.borrow_mut().remove_child(parent_id, *index);
                Ok(())
            }
            Patch::UpdateWidget { path, key, props } => {
                let node = resolve_mut(live, path)?;
                match &mut node.kind {
                    LiveKind::Widget {
                        key: slot_key,
                        props: slot_props,
                    } => {
                        if slot_key != key {
                            return Err(ApplyError::WidgetKeyMismatch {
                                path: path.clone(),
                                expected: key.clone(),
                                found: slot_key.clone(),
                            });
                        }
                        *slot_props = props.clone();
                        self.hooks.update(key, props, &self.platform)?;
                        Ok(())
                    }
                    _ => Err(kind_mismatch(path, "widget", node)),
                }
            }
        }
    }

    fn replace_root(&mut self, live: &mut LiveTree, new: &Node) -> Result<(), ApplyError> {
        let host = live.host().ok_or(ApplyError::MissingHost)?;
        let slot = live.slot();
        if let Some(old_root) = live.set_root(None) {
            self.teardown(&old_root)?;
            self.platform.borrow_mut().remove_child(host, slot);
        }
        let realized = self.realize_into(host, slot, new)?;
        live.set_root(Some(realized));
        Ok(())
    }

    fn replace_child(
        &mut self,
        live: &mut LiveTree,
        parent: &NodePath,
        index: u32,
        new: &Node,
    ) -> Result<(), ApplyError> {
        let (parent_id, len) = element_meta(live, parent)?;
        if index as usize >= len {
            return Err(ApplyError::BadIndex {
                parent: parent.clone(),
                index,
                len,
            });
        }

        // Tear down and detach the old subtree first so the replacement
        // lands at a settled index.
        let doomed = {
            let LiveKind::Element { children, .. } = &mut resolve_mut(live, parent)?.kind else {
                unreachable!("element_meta verified the parent kind");
            };
            children.remove(index as usize)
        };
        self.teardown(&doomed)?;
        self.platform.borrow_mut().remove_child(parent_id, index);

        let realized = self.realize_into(parent_id, index, new)?;
        let LiveKind::Element { children, .. } = &mut resolve_mut(live, parent)?.kind else {
            unreachable!("element_meta verified the parent kind");
        };
        children.insert(index as usize, realized);
        Ok(())
    }

    /// Realize `node` as a platform subtree inserted under `parent` at
    /// `index`, returning its live record. Widget nodes delegate to the
    /// hooks, which mount the widget's own rendered output.
    fn realize_into(
        &mut self,
        parent: NodeId,
        index: u32,
        node: &Node,
    ) -> Result<LiveNode, ApplyError> {
        match node {
            Node::Text(text) => {
                let id = self.platform.borrow_mut().create_text(text);
                self.platform.borrow_mut().insert_child(parent, index, id);
                Ok(LiveNode::text(id, text.clone()))
            }
            Node::Element(el) => {
                let id = {
                    let mut platform = self.platform.borrow_mut();
                    let id = platform.create_element(&el.tag);
                    for (name, value) in el.attrs.iter() {
                        platform.set_attribute(id, name, value);
                    }
                    id
                };
                let mut children = Vec::with_capacity(el.children.len());
                for (i, child) in el.children.iter().enumerate() {
                    children.push(self.realize_into(id, i as u32, child)?);
                }
                self.platform.borrow_mut().insert_child(parent, index, id);
                Ok(LiveNode::element(id, el.tag.clone(), el.attrs.clone(), children))
            }
            Node::Widget(widget) => {
                let id = self.hooks.create(widget, &self.platform, parent, index)?;
                Ok(LiveNode::widget(id, widget.key.clone(), widget.props.clone()))
            }
        }
    }

    /// Destroy every widget in a doomed subtree, deepest-first, before it
    /// is detached from the platform.
    fn teardown(&mut self, doomed: &LiveNode) -> Result<(), ApplyError> {
        let mut keys = Vec::new();
        doomed.collect_widget_keys(&mut keys);
        for key in &keys {
            self.hooks.destroy(key, &self.platform)?;
        }
        Ok(())
    }
}

fn resolve_mut<'t>(live: &'t mut LiveTree, path: &NodePath) -> Result<&'t mut LiveNode, ApplyError> {
    if live.root().is_none() {
        return Err(ApplyError::MissingRoot);
    }
    live.get_mut(path)
        .ok_or_else(|| ApplyError::BadPath(path.clone()))
}

fn element_meta(live: &LiveTree, path: &NodePath) -> Result<(NodeId, usize), ApplyError> {
    if live.root().is_none() {
        return Err(ApplyError::MissingRoot);
    }
    let node = live
        .get(path)
        .ok_or_else(|| ApplyError::BadPath(path.clone()))?;
    match &node.kind {
        LiveKind::Element { children, .. } => Ok((node.id, children.len())),
        _ => Err(kind_mismatch(path, "element", node)),
    }
}

fn kind_mismatch(path: &NodePath, expected: &'static str, node: &LiveNode) -> ApplyError {
    ApplyError::KindMismatch {
        path: path.clone(),
        expected,
        found: node.kind_name(),
    }
}
