#![forbid(unsafe_code)]

//! The immutable tree node model.
//!
//! A [`Node`] describes what should be rendered: plain text, an element with
//! attributes and children, or a widget (an externally-owned subtree that
//! the differ treats as opaque). Snapshots are values: the template layer
//! produces a whole new tree per render and nothing mutates one in place.
//!
//! # Invariants
//!
//! 1. `Element::has_widget_descendant` is true iff some transitive child is
//!    a `Widget` or an `Element` with the flag set. Constructors compute it;
//!    it is never hand-set. The differ uses it to prune traversal of static
//!    regions.
//! 2. Structural equality is derived field equality. Two trees built from
//!    the same content always compare equal, flag included (the flag is a
//!    function of the content).
//! 3. `WidgetNode` carries identity (`OwnerKey`) and props only. Component
//!    factories are registered with the runtime's widget host, keyed by the
//!    owner key, so the node stays pure, comparable data.

use std::fmt;

use crate::attrs::AttrList;

/// Stable identity token for a widget insertion point.
///
/// Assigned once at template-compile time; the differ reuses a widget across
/// reconciliations exactly when old and new nodes share a key. Keys are the
/// escape hatch the positional child diff lacks for widgets specifically.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerKey(String);

impl OwnerKey {
    /// Create a key from its string form.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key's string form.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for OwnerKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A widget insertion point: identity plus opaque props.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WidgetNode {
    /// Stable identity for reuse-vs-replace decisions.
    pub key: OwnerKey,
    /// Props handed to the owning component on create/update.
    pub props: AttrList,
}

impl WidgetNode {
    /// Create a widget node.
    #[must_use]
    pub fn new(key: impl Into<OwnerKey>, props: AttrList) -> Self {
        Self {
            key: key.into(),
            props,
        }
    }
}

/// An element node: tag, ordered attributes, children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    /// Element tag name.
    pub tag: String,
    /// Ordered attribute list.
    pub attrs: AttrList,
    /// Ordered children.
    pub children: Vec<Node>,
    /// True iff a transitive child is a widget. Computed by constructors.
    has_widget_descendant: bool,
}

impl Element {
    /// Create an element, computing the widget-descendant flag.
    #[must_use]
    pub fn new(tag: impl Into<String>, attrs: AttrList, children: Vec<Node>) -> Self {
        let has_widget_descendant = children.iter().any(Node::contains_widget);
        Self {
            tag: tag.into(),
            attrs,
            children,
            has_widget_descendant,
        }
    }

    /// Whether any transitive child is a widget.
    #[inline]
    #[must_use]
    pub const fn has_widget_descendant(&self) -> bool {
        self.has_widget_descendant
    }
}

/// Immutable structural description of what should be rendered.
///
/// A closed variant set: the differ and patcher match exhaustively, so a new
/// node kind cannot be silently mishandled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// A text node.
    Text(String),
    /// An element with attributes and children.
    Element(Element),
    /// An externally-owned component subtree, opaque to the differ.
    Widget(WidgetNode),
}

impl Node {
    /// Create a text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create an element node.
    #[must_use]
    pub fn element(tag: impl Into<String>, attrs: AttrList, children: Vec<Node>) -> Self {
        Self::Element(Element::new(tag, attrs, children))
    }

    /// Create a widget node.
    #[must_use]
    pub fn widget(key: impl Into<OwnerKey>, props: AttrList) -> Self {
        Self::Widget(WidgetNode::new(key, props))
    }

    /// Whether this node is, or transitively contains, a widget.
    #[must_use]
    pub fn contains_widget(&self) -> bool {
        match self {
            Self::Text(_) => false,
            Self::Element(el) => el.has_widget_descendant,
            Self::Widget(_) => true,
        }
    }

    /// Short tag for diagnostics: `"text"`, `"element"`, or `"widget"`.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Element(_) => "element",
            Self::Widget(_) => "widget",
        }
    }

    /// Whether two nodes are of the same kind (and, for elements, share a
    /// tag), the precondition for in-place diffing rather than replacement.
    #[must_use]
    pub fn same_shape(&self, other: &Node) -> bool {
        match (self, other) {
            (Self::Text(_), Self::Text(_)) => true,
            (Self::Element(a), Self::Element(b)) => a.tag == b.tag,
            (Self::Widget(_), Self::Widget(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(t) => write!(f, "{t:?}"),
            Self::Element(el) => {
                if el.attrs.is_empty() {
                    write!(f, "<{}>", el.tag)?;
                } else {
                    write!(f, "<{} {}>", el.tag, el.attrs)?;
                }
                for child in &el.children {
                    write!(f, "{child}")?;
                }
                write!(f, "</{}>", el.tag)
            }
            Self::Widget(w) => write!(f, "<widget {}>", w.key),
        }
    }
}
