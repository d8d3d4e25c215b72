#![forbid(unsafe_code)]

//! The live tree: the realized counterpart of a snapshot.
//!
//! A [`LiveTree`] shadows the platform's node structure one-to-one so the
//! patcher can resolve paths, validate patch targets, and know which widget
//! slots a doomed subtree contains, all without asking the platform anything.
//! It is owned exclusively by the patcher/widget-host pairing that created
//! it; no other actor mutates it.
//!
//! A widget slot records the owner key and last-applied props only. The
//! component instance behind it lives in the runtime's widget host; the
//! slot is a non-owning association, released by explicit destroy calls.

use veneer_core::{AttrList, Node, NodePath, OwnerKey};

use crate::adapter::NodeId;

/// What a live node is: the realized form of the matching snapshot kind.
#[derive(Clone, Debug, PartialEq)]
pub enum LiveKind {
    /// Realized text node.
    Text(String),
    /// Realized element with realized children.
    Element {
        /// Element tag.
        tag: String,
        /// Current attributes, kept in sync with applied patches.
        attrs: AttrList,
        /// Realized children in document order.
        children: Vec<LiveNode>,
    },
    /// A widget slot: identity and last-applied props. The subtree below
    /// the platform node is the widget's own business.
    Widget {
        /// Owner key of the embedded component.
        key: OwnerKey,
        /// Props as of the last create/update.
        props: AttrList,
    },
}

/// One realized node: platform identity plus structure.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveNode {
    /// The platform's identifier for this node.
    pub id: NodeId,
    /// Realized structure.
    pub kind: LiveKind,
}

impl LiveNode {
    /// Construct a live text node record.
    #[must_use]
    pub fn text(id: NodeId, text: impl Into<String>) -> Self {
        Self {
            id,
            kind: LiveKind::Text(text.into()),
        }
    }

    /// Construct a live element record.
    #[must_use]
    pub fn element(
        id: NodeId,
        tag: impl Into<String>,
        attrs: AttrList,
        children: Vec<LiveNode>,
    ) -> Self {
        Self {
            id,
            kind: LiveKind::Element {
                tag: tag.into(),
                attrs,
                children,
            },
        }
    }

    /// Construct a live widget slot record.
    #[must_use]
    pub fn widget(id: NodeId, key: OwnerKey, props: AttrList) -> Self {
        Self {
            id,
            kind: LiveKind::Widget { key, props },
        }
    }

    /// Children of an element node; empty for text and widget nodes.
    #[must_use]
    pub fn children(&self) -> &[LiveNode] {
        match &self.kind {
            LiveKind::Element { children, .. } => children,
            _ => &[],
        }
    }

    /// Kind tag for diagnostics, matching [`Node::kind_name`].
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match &self.kind {
            LiveKind::Text(_) => "text",
            LiveKind::Element { .. } => "element",
            LiveKind::Widget { .. } => "widget",
        }
    }

    /// Reconstruct the snapshot this live node realizes.
    ///
    /// Used by tests and diagnostics to compare live structure against a
    /// snapshot without asking the platform.
    #[must_use]
    pub fn to_node(&self) -> Node {
        match &self.kind {
            LiveKind::Text(text) => Node::text(text.clone()),
            LiveKind::Element {
                tag,
                attrs,
                children,
            } => Node::element(
                tag.clone(),
                attrs.clone(),
                children.iter().map(LiveNode::to_node).collect(),
            ),
            LiveKind::Widget { key, props } => Node::widget(key.clone(), props.clone()),
        }
    }

    /// Collect the owner keys of every widget slot in this subtree,
    /// deepest-first (post-order), the order teardown must run in.
    pub fn collect_widget_keys(&self, out: &mut Vec<OwnerKey>) {
        match &self.kind {
            LiveKind::Text(_) => {}
            LiveKind::Element { children, .. } => {
                for child in children {
                    child.collect_widget_keys(out);
                }
            }
            LiveKind::Widget { key, .. } => out.push(key.clone()),
        }
    }

    fn resolve(&self, indices: &[u32]) -> Option<&LiveNode> {
        let Some((&first, rest)) = indices.split_first() else {
            return Some(self);
        };
        self.children().get(first as usize)?.resolve(rest)
    }

    fn resolve_mut(&mut self, indices: &[u32]) -> Option<&mut LiveNode> {
        let Some((&first, rest)) = indices.split_first() else {
            return Some(self);
        };
        match &mut self.kind {
            LiveKind::Element { children, .. } => {
                children.get_mut(first as usize)?.resolve_mut(rest)
            }
            _ => None,
        }
    }
}

/// The realized tree under one host node.
///
/// The root live node is mounted as child `slot` of `host`, a platform node
/// the kernel never creates or removes. The container belongs to the
/// hosting application. The slot is 0 for top-level views and the widget's
/// child index for embedded ones.
#[derive(Debug, Default)]
pub struct LiveTree {
    host: Option<NodeId>,
    slot: u32,
    root: Option<LiveNode>,
}

impl LiveTree {
    /// An empty tree that will mount as child 0 of `host`.
    #[must_use]
    pub fn new(host: NodeId) -> Self {
        Self::new_at(host, 0)
    }

    /// An empty tree that will mount as child `slot` of `host`.
    #[must_use]
    pub fn new_at(host: NodeId, slot: u32) -> Self {
        Self {
            host: Some(host),
            slot,
            root: None,
        }
    }

    /// Adopt a pre-existing realized tree (takeover mode): `root` already
    /// exists under `host` on the platform side; no nodes are created.
    #[must_use]
    pub fn adopt(host: NodeId, root: LiveNode) -> Self {
        Self::adopt_at(host, 0, root)
    }

    /// Adopt a pre-existing realized tree at child `slot` of `host`.
    #[must_use]
    pub fn adopt_at(host: NodeId, slot: u32, root: LiveNode) -> Self {
        Self {
            host: Some(host),
            slot,
            root: Some(root),
        }
    }

    /// The host node the root mounts under.
    #[must_use]
    pub fn host(&self) -> Option<NodeId> {
        self.host
    }

    /// The child index of the root within the host.
    #[must_use]
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// The realized root, if a tree is mounted.
    #[must_use]
    pub fn root(&self) -> Option<&LiveNode> {
        self.root.as_ref()
    }

    /// Mutable access to the realized root.
    pub fn root_mut(&mut self) -> Option<&mut LiveNode> {
        self.root.as_mut()
    }

    /// Replace the root record, returning the previous one.
    pub fn set_root(&mut self, root: Option<LiveNode>) -> Option<LiveNode> {
        std::mem::replace(&mut self.root, root)
    }

    /// Resolve a path to a live node.
    #[must_use]
    pub fn get(&self, path: &NodePath) -> Option<&LiveNode> {
        self.root.as_ref()?.resolve(path.indices())
    }

    /// Resolve a path to a mutable live node.
    pub fn get_mut(&mut self, path: &NodePath) -> Option<&mut LiveNode> {
        self.root.as_mut()?.resolve_mut(path.indices())
    }
}
