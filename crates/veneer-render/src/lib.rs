#![forbid(unsafe_code)]

//! Reconciliation kernel: tree snapshots, diffs, and live-tree patching.
//!
//! Given two immutable [`Node`](veneer_core::Node) snapshots, [`diff`]
//! computes an ordered patch sequence; [`Patcher::apply`] replays it against
//! a [`LiveTree`] through the [`Platform`] adapter, routing widget subtrees
//! to [`WidgetHooks`] instead of touching them structurally.
//!
//! # Role in veneer
//! `veneer-render` is pure mechanism. It owns no policy: when to render,
//! how widgets behave, and how events bind all live in `veneer-runtime`.

pub mod adapter;
pub mod apply;
pub mod diff;
pub mod live;
pub mod patch;

pub use adapter::{BindingHandle, Listener, NodeId, Platform, SharedPlatform};
pub use apply::{ApplyError, Patcher, WidgetHooks};
pub use diff::diff;
pub use live::{LiveKind, LiveNode, LiveTree};
pub use patch::Patch;
