#![forbid(unsafe_code)]

//! veneer binds a data model to a live tree of rendered nodes.
//!
//! Immutable tree snapshots come out of a template, get diffed against the
//! previously retained snapshot, and the patches are applied to a
//! platform-owned live tree. Subtrees can be delegated to
//! independently-managed widgets that receive explicit
//! attach/create/update/destroy lifecycle calls instead of being diffed.
//!
//! # Layers
//!
//! - [`core`]: the node model and shared vocabulary
//! - [`render`]: the pure reconciliation kernel (diff + patch)
//! - [`runtime`]: views, widgets, events, scheduling
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use veneer::prelude::*;
//! use veneer_harness::MockPlatform;
//!
//! let mock = MockPlatform::new_shared();
//! let platform = MockPlatform::as_platform(&mock);
//! let host = mock.borrow_mut().host();
//! let scheduler = Scheduler::new();
//!
//! let model = Observable::new(0u32);
//! let view = View::builder(
//!     model.clone(),
//!     |count: &u32| Node::element(
//!         "p",
//!         AttrList::new(),
//!         vec![Node::text(count.to_string())],
//!     ),
//!     platform,
//!     scheduler.clone(),
//! )
//! .host(host)
//! .build()
//! .unwrap();
//!
//! model.set(3);
//! scheduler.advance(Duration::from_millis(1));
//! assert_eq!(
//!     view.current_tree().unwrap().to_string(),
//!     "<p>\"3\"</p>",
//! );
//! ```

use std::fmt;

pub use veneer_core::{AttrList, Element, EventKey, EventOptions, Node, NodePath, OwnerKey};
pub use veneer_render::{
    ApplyError, BindingHandle, LiveKind, LiveNode, LiveTree, NodeId, Patch, Patcher, Platform,
    SharedPlatform, WidgetHooks, diff,
};
pub use veneer_runtime::{
    ChangeSource, ChildView, ChildViewFactory, ChildViewSpec, EventContext, EventError, EventMap,
    EventTable, Handler, Observable, Phase, Scheduler, Subscription, TaskId, Template, TreeLoader,
    View, ViewBuilder, ViewConfig, ViewError, Widget, WidgetError, WidgetFactory, WidgetHost,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for veneer hosts.
#[derive(Debug)]
pub enum Error {
    /// A view operation failed.
    View(ViewError),
    /// Patch application failed outside a view.
    Apply(ApplyError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::View(err) => write!(f, "{err}"),
            Self::Apply(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::View(err) => Some(err),
            Self::Apply(err) => Some(err),
        }
    }
}

impl From<ViewError> for Error {
    fn from(err: ViewError) -> Self {
        Self::View(err)
    }
}

impl From<ApplyError> for Error {
    fn from(err: ApplyError) -> Self {
        Self::Apply(err)
    }
}

/// Standard result type for veneer APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    //! The types most hosts need.
    pub use crate::{
        AttrList, Error, EventMap, Node, NodeId, Observable, Phase, Result, Scheduler, Template,
        View, ViewConfig, Widget, WidgetFactory,
    };

    pub use crate::{core, render, runtime};
}

pub use veneer_core as core;
pub use veneer_render as render;
pub use veneer_runtime as runtime;
