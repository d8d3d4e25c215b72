#![forbid(unsafe_code)]

//! Core value types for veneer.
//!
//! This crate holds the tree node model and the small shared vocabulary the
//! render kernel and runtime agree on: attribute lists, node paths, owner
//! keys, event keys, and listener options. Everything here is plain data:
//! snapshots are immutable once produced, and no type in this crate talks to
//! a platform.
//!
//! # Role in veneer
//! `veneer-core` is the bottom of the stack. `veneer-render` diffs and
//! patches over these types; `veneer-runtime` orchestrates views and widgets
//! around them.

pub mod attrs;
pub mod events;
pub mod logging;
pub mod node;
pub mod path;

pub use attrs::AttrList;
pub use events::{EventKey, EventOptions};
pub use node::{Element, Node, OwnerKey, WidgetNode};
pub use path::NodePath;
