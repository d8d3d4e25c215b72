#![forbid(unsafe_code)]

//! Embedding one view inside another as a widget.
//!
//! [`ChildView`] implements [`Widget`] by running a full [`View`] over its
//! own model at the widget's slot. The parent's differ never sees inside:
//! on `update` the new props are folded into the child's model, and the
//! child's own debounced render loop takes it from there. On `destroy` the
//! child view tears down, cascading to its own widgets first.
//!
//! Takeover (`attach`) needs the live structure of the existing markup,
//! which the platform adapter contract deliberately does not expose; a
//! [`TreeLoader`] supplies it (the test harness reads its arena, a real
//! adapter walks its document).

use std::rc::Rc;

use veneer_core::{AttrList, Node, WidgetNode};
use veneer_render::adapter::{NodeId, SharedPlatform};
use veneer_render::live::LiveNode;

use crate::events::EventMap;
use crate::model::Observable;
use crate::scheduler::Scheduler;
use crate::view::{Template, View, ViewBuilder, ViewConfig};
use crate::widget::{LifecycleError, TeardownError, Widget, WidgetFactory};

/// Reconstructs live-tree records from platform nodes that already exist.
pub trait TreeLoader {
    /// The live record of the subtree rooted at `node`, or `None` if the
    /// node is unknown.
    fn load(&self, node: NodeId) -> Option<LiveNode>;

    /// The parent of `node` and the index of `node` within it.
    fn position_of(&self, node: NodeId) -> Option<(NodeId, u32)>;
}

/// Everything a child view needs besides the platform (which arrives with
/// each lifecycle call).
pub struct ChildViewSpec<M: Clone + PartialEq + 'static> {
    /// The child's own model.
    pub model: Observable<M>,
    /// The child's template.
    pub template: Rc<dyn Template<M>>,
    /// Scheduler shared with the rest of the runtime.
    pub scheduler: Scheduler,
    /// View configuration.
    pub config: ViewConfig,
    /// Declared event bindings.
    pub event_map: EventMap,
    /// Named handlers referenced by the event map.
    pub handlers: Vec<(String, crate::events::Handler)>,
    /// Folds incoming widget props into the child model. When absent, an
    /// update just touches the model, re-rendering the child with its
    /// current state.
    pub apply_props: Option<Rc<dyn Fn(&Observable<M>, &AttrList)>>,
    /// Loader for takeover mode; `attach` fails without one.
    pub loader: Option<Rc<dyn TreeLoader>>,
}

/// A widget whose content is a complete child [`View`].
pub struct ChildView<M: Clone + PartialEq + 'static> {
    spec: Option<ChildViewSpec<M>>,
    apply_props: Option<Rc<dyn Fn(&Observable<M>, &AttrList)>>,
    view: Option<View<M>>,
}

impl<M: Clone + PartialEq + 'static> ChildView<M> {
    /// Create an unmounted child view from its spec.
    #[must_use]
    pub fn new(spec: ChildViewSpec<M>) -> Self {
        Self {
            spec: Some(spec),
            apply_props: None,
            view: None,
        }
    }

    /// The embedded view, once mounted or attached.
    #[must_use]
    pub fn view(&self) -> Option<&View<M>> {
        self.view.as_ref()
    }

    fn take_spec(&mut self) -> Result<ChildViewSpec<M>, LifecycleError> {
        self.spec
            .take()
            .ok_or_else(|| LifecycleError::new("child view already mounted"))
    }

    fn builder_from(spec: &ChildViewSpec<M>, platform: &SharedPlatform) -> ViewBuilder<M> {
        let template = Rc::clone(&spec.template);
        let mut builder = View::builder(
            spec.model.clone(),
            move |model: &M| template.render(model),
            platform.clone(),
            spec.scheduler.clone(),
        )
        .config(spec.config.clone())
        .events(spec.event_map.clone());
        for (name, handler) in &spec.handlers {
            builder = builder.handler_rc(name.clone(), handler.clone());
        }
        builder
    }
}

impl<M: Clone + PartialEq + 'static> Widget for ChildView<M> {
    fn mount(
        &mut self,
        platform: &SharedPlatform,
        parent: NodeId,
        index: u32,
    ) -> Result<NodeId, LifecycleError> {
        let spec = self.take_spec()?;
        self.apply_props = spec.apply_props.clone();
        let view = Self::builder_from(&spec, platform)
            .host_at(parent, index)
            .build()
            .map_err(|err| LifecycleError::new(err.to_string()))?;
        let root = view
            .live_tree()
            .borrow()
            .root()
            .map(|r| r.id)
            .ok_or_else(|| LifecycleError::new("child view rendered no root"))?;
        self.view = Some(view);
        Ok(root)
    }

    fn attach(
        &mut self,
        existing: NodeId,
        platform: &SharedPlatform,
    ) -> Result<(), LifecycleError> {
        let spec = self.take_spec()?;
        self.apply_props = spec.apply_props.clone();
        let loader = spec
            .loader
            .clone()
            .ok_or_else(|| LifecycleError::new("child view takeover needs a tree loader"))?;
        let root = loader
            .load(existing)
            .ok_or_else(|| LifecycleError::new("existing node is unknown to the loader"))?;
        let (host, slot) = loader
            .position_of(existing)
            .ok_or_else(|| LifecycleError::new("existing node has no parent"))?;
        let snapshot: Node = spec.model.with(|m| spec.template.render(m));
        let view = Self::builder_from(&spec, platform)
            .takeover_at(host, slot, root, snapshot)
            .build()
            .map_err(|err| LifecycleError::new(err.to_string()))?;
        self.view = Some(view);
        Ok(())
    }

    fn update(
        &mut self,
        props: &AttrList,
        _platform: &SharedPlatform,
    ) -> Result<(), LifecycleError> {
        let view = self
            .view
            .as_ref()
            .ok_or_else(|| LifecycleError::new("update before mount"))?;
        match &self.apply_props {
            Some(apply) => apply(&view.model(), props),
            // No prop mapping: re-render the child with its current state.
            None => view.model().touch(),
        }
        Ok(())
    }

    fn destroy(&mut self, _platform: &SharedPlatform) -> Result<(), TeardownError> {
        let Some(view) = self.view.take() else {
            return Ok(());
        };
        view.destroy().map_err(|err| TeardownError::new(err.to_string()))
    }
}

/// Factory producing [`ChildView`] widgets, one per instantiation.
pub struct ChildViewFactory<M: Clone + PartialEq + 'static> {
    make: Rc<dyn Fn(&WidgetNode) -> ChildViewSpec<M>>,
}

impl<M: Clone + PartialEq + 'static> ChildViewFactory<M> {
    /// Create a factory from a spec constructor; it runs once per widget
    /// instantiation with the insertion point's node.
    #[must_use]
    pub fn new(make: impl Fn(&WidgetNode) -> ChildViewSpec<M> + 'static) -> Self {
        Self {
            make: Rc::new(make),
        }
    }
}

impl<M: Clone + PartialEq + 'static> WidgetFactory for ChildViewFactory<M> {
    fn instantiate(&self, node: &WidgetNode) -> Box<dyn Widget> {
        Box::new(ChildView::new((self.make)(node)))
    }
}
