#![forbid(unsafe_code)]

//! Patch operations produced by the differ.
//!
//! A [`Patch`] is one unit of mutation instruction. The differ emits patches
//! in the order they must be applied: sibling removals arrive in descending
//! index order and insertions in ascending order, so earlier patches never
//! invalidate the indices of later ones.

use std::fmt;

use veneer_core::{AttrList, Node, NodePath, OwnerKey};

/// One unit of mutation instruction for the live tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Patch {
    /// Install `new` as the root; there was no previous tree.
    ReplaceRoot {
        /// The tree to realize.
        new: Node,
    },
    /// Replace the subtree at `path` wholesale (incompatible kinds or a
    /// widget whose key changed).
    Replace {
        /// Target position.
        path: NodePath,
        /// The replacement subtree.
        new: Node,
    },
    /// Update the text content of the text node at `path`.
    SetText {
        /// Target position.
        path: NodePath,
        /// New text content.
        text: String,
    },
    /// Add or change one attribute of the element at `path`.
    SetAttr {
        /// Target position.
        path: NodePath,
        /// Attribute name.
        name: String,
        /// New attribute value.
        value: String,
    },
    /// Remove one attribute of the element at `path`.
    RemoveAttr {
        /// Target position.
        path: NodePath,
        /// Attribute name.
        name: String,
    },
    /// Insert a new child under `parent` at `index`.
    InsertChild {
        /// Parent element position.
        parent: NodePath,
        /// Insertion index.
        index: u32,
        /// The subtree to realize and insert.
        node: Node,
    },
    /// Remove the child of `parent` at `index`.
    RemoveChild {
        /// Parent element position.
        parent: NodePath,
        /// Child index to remove.
        index: u32,
    },
    /// Deliver new props to the widget at `path`; the widget re-renders
    /// itself, the tree is not touched.
    UpdateWidget {
        /// Target position.
        path: NodePath,
        /// Widget identity (unchanged across the update).
        key: OwnerKey,
        /// New props.
        props: AttrList,
    },
}

impl Patch {
    /// Stable name for tracing and test assertions.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::ReplaceRoot { .. } => "ReplaceRoot",
            Self::Replace { .. } => "Replace",
            Self::SetText { .. } => "SetText",
            Self::SetAttr { .. } => "SetAttr",
            Self::RemoveAttr { .. } => "RemoveAttr",
            Self::InsertChild { .. } => "InsertChild",
            Self::RemoveChild { .. } => "RemoveChild",
            Self::UpdateWidget { .. } => "UpdateWidget",
        }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReplaceRoot { new } => write!(f, "ReplaceRoot({})", new.kind_name()),
            Self::Replace { path, new } => write!(f, "Replace({path}, {})", new.kind_name()),
            Self::SetText { path, text } => write!(f, "SetText({path}, {text:?})"),
            Self::SetAttr { path, name, value } => {
                write!(f, "SetAttr({path}, {name}={value:?})")
            }
            Self::RemoveAttr { path, name } => write!(f, "RemoveAttr({path}, {name})"),
            Self::InsertChild {
                parent,
                index,
                node,
            } => write!(f, "InsertChild({parent}, {index}, {})", node.kind_name()),
            Self::RemoveChild { parent, index } => write!(f, "RemoveChild({parent}, {index})"),
            Self::UpdateWidget { path, key, .. } => write!(f, "UpdateWidget({path}, {key})"),
        }
    }
}
