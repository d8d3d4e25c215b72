#![forbid(unsafe_code)]

//! veneer runtime
//!
//! The orchestrator: everything above the pure reconciliation kernel.
//!
//! # Key Components
//!
//! - [`View`] - Lifecycle controller binding one model to one live tree
//! - [`Scheduler`] - Cooperative single-threaded task queue (virtual time)
//! - [`Observable`] - Stock change-notifying model value
//! - [`WidgetHost`] - Routes attach/create/update/destroy to widgets
//! - [`EventTable`] - Per-root delegated event bindings
//! - [`ChildView`] - A widget embedding a complete child view
//!
//! # Role in veneer
//! `veneer-runtime` decides *when* things happen: debounced renders,
//! deferred effect binding, widget lifecycles, teardown cascades. The
//! *how*, diffing and patching, lives in `veneer-render`.

pub mod child_view;
pub mod events;
#[cfg(feature = "introspect")]
pub mod introspect;
pub mod model;
pub mod scheduler;
pub mod view;
pub mod widget;

pub use child_view::{ChildView, ChildViewFactory, ChildViewSpec, TreeLoader};
pub use events::{EventContext, EventEntry, EventError, EventMap, EventTable, Handler, HandlerMap};
pub use model::{ChangeSource, Observable, SubscriberId, Subscription};
pub use scheduler::{Scheduler, TaskId};
pub use view::{Phase, Template, View, ViewBuilder, ViewConfig, ViewError};
pub use widget::{
    LifecycleError, TeardownError, Widget, WidgetError, WidgetFactory, WidgetHost,
};

#[cfg(feature = "introspect")]
pub use introspect::{
    INSTRUMENTED_OPS, InspectionObserver, InspectionRegistry, ViewEvent, live_drift,
    tree_to_string,
};
