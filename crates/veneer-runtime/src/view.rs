#![forbid(unsafe_code)]

//! The view controller: binds one model to one live tree.
//!
//! A [`View`] owns the render loop for a single tree root. It subscribes to
//! its model's change notifications, coalesces bursts behind a debounce
//! window, renders a fresh snapshot from the template, diffs it against the
//! retained tree, and applies the patches, then re-binds events and
//! notifies render listeners.
//!
//! # State machine
//!
//! `Uninitialized → AwaitingFirstRender → Idle ⇄ RenderScheduled`, with
//! terminal `Destroyed`. Construction in takeover mode (a pre-rendered live
//! tree plus its snapshot) skips the first render entirely: widgets are
//! attached to the existing markup and the view lands in `Idle`.
//!
//! At most one render is in flight per view; repeated change notifications
//! collapse into the one scheduled render (last-writer-wins on the
//! *trigger*; the model itself is read at render time).
//!
//! # Two-phase commit
//!
//! `render` applies the structural patch synchronously (`commit`), then
//! schedules `bind_effects` (event table rebinding) as an explicitly
//! cancelable task on the cooperative scheduler. Handlers therefore never
//! attach to nodes that a later patch in the same logical update would
//! replace.
//!
//! # Notification routing
//!
//! A view constructed with a parent does not render on model change;
//! it forwards the notification to the owning ancestor, which renders the
//! whole tree from the single source of truth. Duplicate partial renders
//! of a shared model are structurally impossible.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use veneer_core::{Node, OwnerKey};
use veneer_render::adapter::{NodeId, SharedPlatform};
use veneer_render::apply::{ApplyError, Patcher};
use veneer_render::diff;
use veneer_render::live::{LiveKind, LiveNode, LiveTree};

use crate::events::{EventError, EventMap, EventTable, Handler, HandlerMap};
use crate::model::{ChangeSource, Observable, Subscription};
use crate::scheduler::{Scheduler, TaskId};
use crate::widget::{WidgetError, WidgetFactory, WidgetHost};

/// Lifecycle phase of a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, not yet initialized.
    Uninitialized,
    /// Waiting for the first render (deferred or about to run).
    AwaitingFirstRender,
    /// Tree mounted, nothing pending.
    Idle,
    /// A debounced re-render is queued.
    RenderScheduled,
    /// Torn down; every operation is a no-op.
    Destroyed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::AwaitingFirstRender => "awaiting-first-render",
            Self::Idle => "idle",
            Self::RenderScheduled => "render-scheduled",
            Self::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// View failure. `Apply`, `Event`, and `Widget` wrap the layer errors
/// unchanged; `MissingMount` is a construction-time misconfiguration.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewError {
    /// Patch application failed.
    Apply(ApplyError),
    /// Event binding failed.
    Event(EventError),
    /// Widget lifecycle failed.
    Widget(WidgetError),
    /// The builder was given neither a host node nor a takeover tree.
    MissingMount,
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apply(err) => write!(f, "{err}"),
            Self::Event(err) => write!(f, "{err}"),
            Self::Widget(err) => write!(f, "{err}"),
            Self::MissingMount => write!(f, "view needs a host node or a takeover tree"),
        }
    }
}

impl std::error::Error for ViewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Apply(err) => Some(err),
            Self::Event(err) => Some(err),
            Self::Widget(err) => Some(err),
            Self::MissingMount => None,
        }
    }
}

impl From<ApplyError> for ViewError {
    fn from(err: ApplyError) -> Self {
        Self::Apply(err)
    }
}

impl From<EventError> for ViewError {
    fn from(err: EventError) -> Self {
        Self::Event(err)
    }
}

impl From<WidgetError> for ViewError {
    fn from(err: WidgetError) -> Self {
        Self::Widget(err)
    }
}

/// Tuning knobs for a view.
///
/// The debounce window exists to coalesce bursts from models that notify on
/// every sub-change; it is a parameter, not a constant; hosts with a
/// tighter invalidation signal can set it to zero.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Delay between the last change notification and the render it
    /// triggers. Notifications inside the window collapse.
    pub debounce_window: Duration,
    /// Skip the automatic first render; the host calls
    /// [`View::render`] when its layout manager is ready.
    pub defer_render: bool,
    /// Name used in traces and introspection events.
    pub debug_name: Option<String>,
    /// Observer registry this view reports to. Opt-in and injected; there
    /// is no ambient registry.
    #[cfg(feature = "introspect")]
    pub inspection: Option<crate::introspect::InspectionRegistry>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            debounce_window: Duration::from_millis(1),
            defer_render: false,
            debug_name: None,
            #[cfg(feature = "introspect")]
            inspection: None,
        }
    }
}

impl ViewConfig {
    /// Override the debounce window.
    #[must_use]
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    /// Defer the first render to an explicit [`View::render`] call.
    #[must_use]
    pub fn with_defer_render(mut self, defer: bool) -> Self {
        self.defer_render = defer;
        self
    }

    /// Name this view for traces and introspection.
    #[must_use]
    pub fn with_debug_name(mut self, name: impl Into<String>) -> Self {
        self.debug_name = Some(name.into());
        self
    }

    /// Report lifecycle events to `registry`.
    #[cfg(feature = "introspect")]
    #[must_use]
    pub fn with_inspection(mut self, registry: crate::introspect::InspectionRegistry) -> Self {
        self.inspection = Some(registry);
        self
    }
}

/// Produces a tree snapshot from the current model value.
///
/// Closures `Fn(&M) -> Node` implement this directly.
pub trait Template<M> {
    /// Compute the snapshot for `model`.
    fn render(&self, model: &M) -> Node;
}

impl<M, F> Template<M> for F
where
    F: Fn(&M) -> Node,
{
    fn render(&self, model: &M) -> Node {
        self(model)
    }
}

enum Mount {
    /// Mount fresh markup at a child slot of this host node.
    Fresh { host: NodeId, slot: u32 },
    /// Take over existing markup: the adopted live tree plus the snapshot
    /// it realizes.
    Takeover {
        host: NodeId,
        slot: u32,
        root: LiveNode,
        snapshot: Node,
    },
}

struct ViewInner<M: Clone + PartialEq + 'static> {
    config: ViewConfig,
    scheduler: Scheduler,
    platform: SharedPlatform,
    template: Rc<dyn Template<M>>,
    model: RefCell<Observable<M>>,
    model_sub: RefCell<Option<Subscription>>,
    phase: Cell<Phase>,
    live: Rc<RefCell<LiveTree>>,
    current_tree: RefCell<Option<Node>>,
    pending_context: RefCell<Option<M>>,
    widgets: RefCell<WidgetHost>,
    events: RefCell<EventTable>,
    event_map: RefCell<EventMap>,
    handlers: RefCell<HandlerMap>,
    debounce: Cell<Option<TaskId>>,
    effects: Cell<Option<TaskId>>,
    render_listeners: RefCell<Vec<Rc<dyn Fn()>>>,
    forward_to: Option<Rc<dyn Fn()>>,
    last_error: RefCell<Option<ViewError>>,
}

/// Handle to a view controller. Clones share the same view.
pub struct View<M: Clone + PartialEq + 'static> {
    inner: Rc<ViewInner<M>>,
}

impl<M: Clone + PartialEq + 'static> Clone for View<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<M: Clone + PartialEq + 'static> fmt::Debug for View<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("phase", &self.inner.phase.get())
            .field("has_tree", &self.inner.current_tree.borrow().is_some())
            .finish()
    }
}

/// Staged configuration for a [`View`].
pub struct ViewBuilder<M: Clone + PartialEq + 'static> {
    model: Observable<M>,
    template: Rc<dyn Template<M>>,
    platform: SharedPlatform,
    scheduler: Scheduler,
    config: ViewConfig,
    mount: Option<Mount>,
    event_map: EventMap,
    handlers: HandlerMap,
    factories: Vec<(OwnerKey, Rc<dyn WidgetFactory>)>,
    forward_to: Option<Rc<dyn Fn()>>,
}

impl<M: Clone + PartialEq + 'static> ViewBuilder<M> {
    /// Override the view configuration.
    #[must_use]
    pub fn config(mut self, config: ViewConfig) -> Self {
        self.config = config;
        self
    }

    /// Mount fresh markup as child 0 of `host`.
    #[must_use]
    pub fn host(self, host: NodeId) -> Self {
        self.host_at(host, 0)
    }

    /// Mount fresh markup as child `slot` of `host`, which is how an embedded
    /// child view lands at its widget's position.
    #[must_use]
    pub fn host_at(mut self, host: NodeId, slot: u32) -> Self {
        self.mount = Some(Mount::Fresh { host, slot });
        self
    }

    /// Take over markup that already exists as child 0 of `host`: `root`
    /// is the adopted live tree, `snapshot` the tree it realizes.
    #[must_use]
    pub fn takeover(self, host: NodeId, root: LiveNode, snapshot: Node) -> Self {
        self.takeover_at(host, 0, root, snapshot)
    }

    /// Take over markup at child `slot` of `host`.
    #[must_use]
    pub fn takeover_at(mut self, host: NodeId, slot: u32, root: LiveNode, snapshot: Node) -> Self {
        self.mount = Some(Mount::Takeover {
            host,
            slot,
            root,
            snapshot,
        });
        self
    }

    /// Set the declared event map.
    #[must_use]
    pub fn events(mut self, map: EventMap) -> Self {
        self.event_map = map;
        self
    }

    /// Register a named handler the event map can reference.
    #[must_use]
    pub fn handler(
        self,
        name: impl Into<String>,
        handler: impl Fn(&crate::events::EventContext) + 'static,
    ) -> Self {
        self.handler_rc(name, Rc::new(handler))
    }

    /// Register an already-shared handler.
    #[must_use]
    pub fn handler_rc(mut self, name: impl Into<String>, handler: Handler) -> Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    /// Register the widget factory for one insertion point.
    #[must_use]
    pub fn widget(mut self, key: impl Into<OwnerKey>, factory: Rc<dyn WidgetFactory>) -> Self {
        self.factories.push((key.into(), factory));
        self
    }

    /// Make this view a non-owning consumer: change notifications are
    /// forwarded to `parent` instead of rendering here.
    #[must_use]
    pub fn parent<P: Clone + PartialEq + 'static>(mut self, parent: &View<P>) -> Self {
        let weak = Rc::downgrade(&parent.inner);
        self.forward_to = Some(Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                View { inner }.schedule_render();
            }
        }));
        self
    }

    /// Initialize the view: subscribe to the model and run the initial
    /// attach or render pass.
    pub fn build(self) -> Result<View<M>, ViewError> {
        let mount = self.mount.ok_or(ViewError::MissingMount)?;
        let (live, takeover) = match mount {
            Mount::Fresh { host, slot } => (LiveTree::new_at(host, slot), None),
            Mount::Takeover {
                host,
                slot,
                root,
                snapshot,
            } => (LiveTree::adopt_at(host, slot, root), Some(snapshot)),
        };

        let mut widgets = WidgetHost::new();
        for (key, factory) in self.factories {
            widgets.register(key, factory);
        }

        let inner = Rc::new(ViewInner {
            config: self.config,
            scheduler: self.scheduler,
            platform: self.platform,
            template: self.template,
            model: RefCell::new(self.model),
            model_sub: RefCell::new(None),
            phase: Cell::new(Phase::Uninitialized),
            live: Rc::new(RefCell::new(live)),
            current_tree: RefCell::new(None),
            pending_context: RefCell::new(None),
            widgets: RefCell::new(widgets),
            events: RefCell::new(EventTable::new()),
            event_map: RefCell::new(self.event_map),
            handlers: RefCell::new(self.handlers),
            debounce: Cell::new(None),
            effects: Cell::new(None),
            render_listeners: RefCell::new(Vec::new()),
            forward_to: self.forward_to,
            last_error: RefCell::new(None),
        });
        let view = View { inner };
        view.listen_to_model();

        match takeover {
            Some(snapshot) => {
                view.inner.phase.set(Phase::Idle);
                view.validate_live_shape(&snapshot);
                view.attach_pass(&snapshot)?;
                *view.inner.current_tree.borrow_mut() = Some(snapshot);
                view.schedule_bind_effects();
            }
            None => {
                view.inner.phase.set(Phase::AwaitingFirstRender);
                if !view.inner.config.defer_render {
                    view.render()?;
                }
            }
        }
        view.notify_inspection(InspectionEvent::Registered);
        Ok(view)
    }
}

enum InspectionEvent {
    Registered,
    RenderCompleted,
    Destroyed,
}

impl<M: Clone + PartialEq + 'static> View<M> {
    /// Start configuring a view over `model` rendered by `template`.
    #[must_use]
    pub fn builder(
        model: Observable<M>,
        template: impl Template<M> + 'static,
        platform: SharedPlatform,
        scheduler: Scheduler,
    ) -> ViewBuilder<M> {
        ViewBuilder {
            model,
            template: Rc::new(template),
            platform,
            scheduler,
            config: ViewConfig::default(),
            mount: None,
            event_map: EventMap::new(),
            handlers: HandlerMap::default(),
            factories: Vec::new(),
            forward_to: None,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.phase.get()
    }

    /// Whether the view has been torn down.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.phase.get() == Phase::Destroyed
    }

    /// The retained snapshot: exactly what the live tree looks like.
    #[must_use]
    pub fn current_tree(&self) -> Option<Node> {
        self.inner.current_tree.borrow().clone()
    }

    /// Shared handle to the live tree (read-mostly; used by dispatch and
    /// diagnostics).
    #[must_use]
    pub fn live_tree(&self) -> Rc<RefCell<LiveTree>> {
        Rc::clone(&self.inner.live)
    }

    /// A clone of the model handle.
    #[must_use]
    pub fn model(&self) -> Observable<M> {
        self.inner.model.borrow().clone()
    }

    /// Register a render-complete listener.
    pub fn on_render(&self, listener: impl Fn() + 'static) {
        self.inner
            .render_listeners
            .borrow_mut()
            .push(Rc::new(listener));
    }

    /// Stash a one-shot context: the next render reads it instead of the
    /// model, then discards it.
    pub fn set_context(&self, context: M) {
        *self.inner.pending_context.borrow_mut() = Some(context);
        self.schedule_render();
    }

    /// Replace the declared event map; takes effect on the next
    /// `bind_effects` pass (scheduled here).
    pub fn set_event_map(&self, map: EventMap) {
        *self.inner.event_map.borrow_mut() = map;
        self.schedule_bind_effects();
    }

    /// Register a named handler after construction.
    pub fn register_handler(&self, name: impl Into<String>, handler: Handler) {
        self.inner.handlers.borrow_mut().insert(name.into(), handler);
    }

    /// Swap to a different model instance: unsubscribe from the old one,
    /// subscribe to the new one, and render.
    pub fn set_model(&self, model: Observable<M>) -> Result<(), ViewError> {
        if self.is_destroyed() {
            return Ok(());
        }
        self.inner.model_sub.borrow_mut().take();
        *self.inner.model.borrow_mut() = model;
        self.listen_to_model();
        self.render()
    }

    /// Owner keys of every widget in the retained tree, document order.
    #[must_use]
    pub fn child_widget_keys(&self) -> Vec<OwnerKey> {
        let mut keys = Vec::new();
        if let Some(root) = self.inner.live.borrow().root() {
            root.collect_widget_keys(&mut keys);
        }
        keys
    }

    /// The last error recorded by a scheduled (non-reentrant) callback.
    pub fn take_last_error(&self) -> Option<ViewError> {
        self.inner.last_error.borrow_mut().take()
    }

    /// Queue a debounced re-render. Notifications landing inside the
    /// window collapse into one render; the window restarts on each.
    pub fn schedule_render(&self) {
        if self.is_destroyed() {
            return;
        }
        if let Some(task) = self.inner.debounce.take() {
            self.inner.scheduler.cancel(task);
        }
        if self.inner.phase.get() == Phase::Idle {
            self.inner.phase.set(Phase::RenderScheduled);
        }
        let weak = Rc::downgrade(&self.inner);
        let task = self
            .inner
            .scheduler
            .schedule(self.inner.config.debounce_window, move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let view = View { inner };
                view.inner.debounce.set(None);
                if view.is_destroyed() {
                    return;
                }
                if let Err(err) = view.render() {
                    tracing::error!(error = %err, "scheduled render failed");
                    *view.inner.last_error.borrow_mut() = Some(err);
                }
            });
        self.inner.debounce.set(Some(task));
    }

    /// Render now: compute a snapshot, diff against the retained tree,
    /// apply, and schedule effect binding.
    ///
    /// No-ops (successfully) on a destroyed view so a stale callback can
    /// never fail.
    pub fn render(&self) -> Result<(), ViewError> {
        if self.is_destroyed() {
            tracing::trace!("render on destroyed view ignored");
            return Ok(());
        }
        if let Some(task) = self.inner.debounce.take() {
            // A direct render supersedes the scheduled one.
            self.inner.scheduler.cancel(task);
        }

        let context = self
            .inner
            .pending_context
            .borrow_mut()
            .take()
            .unwrap_or_else(|| self.inner.model.borrow().get());
        let new_tree = self.inner.template.render(&context);

        let patches = {
            let current = self.inner.current_tree.borrow();
            diff(current.as_ref(), &new_tree)
        };
        tracing::debug!(patches = patches.len(), "render commit");

        {
            let mut widgets = self.inner.widgets.borrow_mut();
            let mut live = self.inner.live.borrow_mut();
            let mut patcher = Patcher::new(&self.inner.platform, &mut *widgets);
            patcher.apply(&mut live, &patches)?;
        }
        *self.inner.current_tree.borrow_mut() = Some(new_tree);
        self.inner.phase.set(Phase::Idle);

        self.schedule_bind_effects();

        let listeners: Vec<Rc<dyn Fn()>> =
            self.inner.render_listeners.borrow().iter().cloned().collect();
        for listener in listeners {
            listener();
        }
        self.notify_inspection(InspectionEvent::RenderCompleted);
        Ok(())
    }

    /// Tear the view down: cancel pending work, cascade destroy to child
    /// widgets deepest-first, release event bindings, unsubscribe from the
    /// model. Idempotent.
    pub fn destroy(&self) -> Result<(), ViewError> {
        if self.is_destroyed() {
            return Ok(());
        }
        if let Some(task) = self.inner.debounce.take() {
            self.inner.scheduler.cancel(task);
        }
        if let Some(task) = self.inner.effects.take() {
            self.inner.scheduler.cancel(task);
        }

        let keys = {
            let live = self.inner.live.borrow();
            let mut keys = Vec::new();
            if let Some(root) = live.root() {
                root.collect_widget_keys(&mut keys);
            }
            keys
        };
        for key in &keys {
            let result = {
                let mut widgets = self.inner.widgets.borrow_mut();
                if widgets.is_live(key) {
                    widgets.destroy(key, &self.inner.platform)
                } else {
                    Ok(())
                }
            };
            result?;
        }

        self.inner
            .events
            .borrow_mut()
            .unbind(&self.inner.platform);
        self.inner.model_sub.borrow_mut().take();
        self.inner.phase.set(Phase::Destroyed);
        tracing::debug!("view destroyed");
        self.notify_inspection(InspectionEvent::Destroyed);
        Ok(())
    }

    #[cfg(feature = "introspect")]
    fn notify_inspection(&self, event: InspectionEvent) {
        use crate::introspect::ViewEvent;

        let Some(registry) = &self.inner.config.inspection else {
            return;
        };
        let view = self
            .inner
            .config
            .debug_name
            .clone()
            .unwrap_or_else(|| "view".to_string());
        match event {
            InspectionEvent::Registered => registry.notify_registered(&ViewEvent {
                view,
                op: "registered".into(),
            }),
            InspectionEvent::RenderCompleted => registry.notify_render(&ViewEvent {
                view,
                op: "render".into(),
            }),
            InspectionEvent::Destroyed => registry.notify_destroyed(&ViewEvent {
                view,
                op: "destroy".into(),
            }),
        }
    }

    #[cfg(not(feature = "introspect"))]
    fn notify_inspection(&self, _event: InspectionEvent) {}

    fn listen_to_model(&self) {
        let weak = Rc::downgrade(&self.inner);
        let sub = self.inner.model.borrow().subscribe(Rc::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let view = View { inner };
            view.on_model_changed();
        }));
        *self.inner.model_sub.borrow_mut() = Some(sub);
    }

    fn on_model_changed(&self) {
        if self.is_destroyed() {
            return;
        }
        match &self.inner.forward_to {
            // Non-owning consumer: the owning ancestor renders the whole
            // tree from the single source of truth.
            Some(forward) => forward(),
            None => self.schedule_render(),
        }
    }

    /// Schedule the effect phase of the two-phase commit: event binding
    /// runs one tick after the structural patch, against a settled tree.
    fn schedule_bind_effects(&self) {
        if let Some(task) = self.inner.effects.take() {
            self.inner.scheduler.cancel(task);
        }
        let weak = Rc::downgrade(&self.inner);
        let task = self.inner.scheduler.schedule(Duration::ZERO, move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let view = View { inner };
            view.inner.effects.set(None);
            if view.is_destroyed() {
                return;
            }
            view.bind_effects();
        });
        self.inner.effects.set(Some(task));
    }

    fn bind_effects(&self) {
        let root = self.inner.live.borrow().root().map(|r| r.id);
        let Some(root) = root else {
            return;
        };
        let map = self.inner.event_map.borrow().clone();
        let mut events = self.inner.events.borrow_mut();
        if map.is_empty() {
            events.unbind(&self.inner.platform);
            return;
        }
        if events.bound_root() == Some(root) && events.bound_map() == Some(&map) {
            return;
        }
        let result = {
            let handlers = self.inner.handlers.borrow();
            events.bind(root, &self.inner.live, &map, &handlers, &self.inner.platform)
        };
        if let Err(err) = result {
            tracing::error!(error = %err, "event binding failed");
            *self.inner.last_error.borrow_mut() = Some(err.into());
        }
    }

    /// Takeover drift recovery: extra whitespace around server-rendered
    /// markup shows up as boundary text nodes the snapshot does not have.
    /// Trim at most one per side; deeper drift is not reconciled.
    fn validate_live_shape(&self, snapshot: &Node) {
        let Node::Element(expected) = snapshot else {
            return;
        };
        let mut live = self.inner.live.borrow_mut();
        let Some(root) = live.root_mut() else {
            return;
        };
        let root_id = root.id;
        let LiveKind::Element { children, .. } = &mut root.kind else {
            return;
        };
        if children.len() == expected.children.len() {
            return;
        }
        tracing::warn!(
            live = children.len(),
            expected = expected.children.len(),
            "live child count differs from snapshot; trimming boundary text"
        );

        let first_expected_is_text = matches!(expected.children.first(), Some(Node::Text(_)));
        if !first_expected_is_text
            && matches!(children.first().map(|c| &c.kind), Some(LiveKind::Text(_)))
        {
            children.remove(0);
            self.inner.platform.borrow_mut().remove_child(root_id, 0);
        }

        let last_expected_is_text = matches!(expected.children.last(), Some(Node::Text(_)));
        if children.len() != expected.children.len()
            && !last_expected_is_text
            && matches!(children.last().map(|c| &c.kind), Some(LiveKind::Text(_)))
        {
            let last = children.len() - 1;
            children.remove(last);
            self.inner
                .platform
                .borrow_mut()
                .remove_child(root_id, last as u32);
        }
    }

    /// Takeover widget binding: walk the snapshot and the adopted live
    /// tree in parallel and attach a component to every widget slot, never
    /// creating markup.
    fn attach_pass(&self, snapshot: &Node) -> Result<(), ViewError> {
        // Collect (key, props, node-id) pairs first so no live borrow is
        // held across attach calls (a child view may consult the tree).
        let slots = {
            let mut slots = Vec::new();
            let live = self.inner.live.borrow();
            if let Some(root) = live.root() {
                collect_attach_slots(snapshot, root, &mut slots);
            }
            slots
        };
        for (widget_node, id) in &slots {
            self.inner
                .widgets
                .borrow_mut()
                .attach(widget_node, *id, &self.inner.platform)?;
        }
        // Rewrite the adopted records so widget slots are tracked as such.
        {
            let mut live = self.inner.live.borrow_mut();
            if let Some(root) = live.root_mut() {
                rewrite_widget_slots(snapshot, root);
            }
        }
        Ok(())
    }
}

fn collect_attach_slots(
    node: &Node,
    live: &LiveNode,
    out: &mut Vec<(veneer_core::WidgetNode, NodeId)>,
) {
    match node {
        Node::Widget(w) => out.push((w.clone(), live.id)),
        Node::Element(el) if el.has_widget_descendant() => {
            let live_children = live.children();
            if live_children.len() != el.children.len() {
                tracing::warn!(
                    live = live_children.len(),
                    expected = el.children.len(),
                    "attach pass: child count drift, binding best-effort"
                );
            }
            for (child, live_child) in el.children.iter().zip(live_children) {
                collect_attach_slots(child, live_child, out);
            }
        }
        _ => {}
    }
}

fn rewrite_widget_slots(node: &Node, live: &mut LiveNode) {
    match node {
        Node::Widget(w) => {
            *live = LiveNode::widget(live.id, w.key.clone(), w.props.clone());
        }
        Node::Element(el) if el.has_widget_descendant() => {
            let LiveKind::Element { children, .. } = &mut live.kind else {
                return;
            };
            for (child, live_child) in el.children.iter().zip(children.iter_mut()) {
                rewrite_widget_slots(child, live_child);
            }
        }
        _ => {}
    }
}
