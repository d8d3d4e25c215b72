//! Takeover (attach) mode: binding widgets to pre-existing markup without
//! creating nodes, the boundary-text trim heuristic, and the teardown
//! cascade.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use veneer_core::{AttrList, Node, OwnerKey};
use veneer_harness::{MockPlatform, RecordingFactory, WidgetLog, attrs, el, widget_with};
use veneer_render::adapter::{NodeId, SharedPlatform};
use veneer_render::live::LiveKind;
use veneer_runtime::widget::{LifecycleError, TeardownError, Widget, WidgetFactory};
use veneer_runtime::{Observable, Phase, Scheduler, View, ViewConfig};

fn item_template(n: &u32) -> Node {
    el(
        "ul",
        AttrList::new(),
        vec![widget_with("item1", attrs(&[("n", &n.to_string())]))],
    )
}

/// The attach-mode scenario: existing `<ul><li>` markup is taken over, the
/// widget binds to the `<li>` without a create, and a model update issues
/// exactly one widget update and never a replace.
#[test]
fn takeover_binds_without_create_and_updates_in_place() {
    let mock = MockPlatform::new_shared();
    let platform = MockPlatform::as_platform(&mock);
    let scheduler = Scheduler::new();
    let model = Observable::new(0u32);
    let log: WidgetLog = Rc::new(RefCell::new(Vec::new()));

    // Server-rendered markup: host > ul > li.
    let (host, ul, li) = {
        let mut m = mock.borrow_mut();
        let host = m.host();
        let ul = m.seed_element(host, "ul", AttrList::new());
        let li = m.seed_element(ul, "li", attrs(&[("class", "item")]));
        (host, ul, li)
    };

    let adopted = mock.borrow().live_of(ul);
    let view = View::builder(model.clone(), item_template, platform, scheduler.clone())
        .widget("item1", RecordingFactory::new(log.clone()))
        .takeover(host, adopted, item_template(&0))
        .build()
        .expect("takeover builds");

    assert_eq!(view.phase(), Phase::Idle);
    assert_eq!(view.child_widget_keys(), vec![OwnerKey::new("item1")]);
    assert_eq!(*log.borrow(), vec![format!("attach item1 {li}")]);
    {
        let mock = mock.borrow();
        assert_eq!(mock.count_ops("create_element"), 0);
        assert_eq!(mock.count_ops("create_text"), 0);
        assert_eq!(mock.count_ops("remove_child"), 0);
    }

    // The adopted record now tracks the slot as a widget.
    {
        let live = view.live_tree();
        let live = live.borrow();
        let slot = &live.root().expect("root").children()[0];
        assert_eq!(slot.id, li);
        assert!(matches!(&slot.kind, LiveKind::Widget { key, .. } if key.as_str() == "item1"));
    }

    // Updating the owning model issues exactly one widget update.
    log.borrow_mut().clear();
    model.set(3);
    scheduler.advance(Duration::from_millis(1));

    assert_eq!(*log.borrow(), vec!["update item1 [n=\"3\"]"]);
    let mock = mock.borrow();
    assert_eq!(
        mock.count_ops("create_element"),
        0,
        "a same-key update must never replace the widget",
    );
    assert_eq!(mock.count_ops("remove_child"), 0);
}

#[test]
fn boundary_whitespace_is_trimmed_once_per_side() {
    let mock = MockPlatform::new_shared();
    let platform = MockPlatform::as_platform(&mock);
    let scheduler = Scheduler::new();
    let model = Observable::new(0u32);

    // Markup with stray whitespace text around the real child.
    let (host, div) = {
        let mut m = mock.borrow_mut();
        let host = m.host();
        let div = m.seed_element(host, "div", AttrList::new());
        m.seed_text(div, "  ");
        m.seed_element(div, "p", AttrList::new());
        m.seed_text(div, " \n");
        (host, div)
    };

    let snapshot = el("div", AttrList::new(), vec![el("p", AttrList::new(), vec![])]);
    let adopted = mock.borrow().live_of(div);
    let view = View::builder(
        model,
        move |_: &u32| el("div", AttrList::new(), vec![el("p", AttrList::new(), vec![])]),
        platform,
        scheduler,
    )
    .takeover(host, adopted, snapshot.clone())
    .build()
    .expect("takeover builds");

    {
        let live = view.live_tree();
        let live = live.borrow();
        assert_eq!(
            live.root().expect("root").children().len(),
            1,
            "one boundary text node dropped per side",
        );
    }
    let mock = mock.borrow();
    assert_eq!(mock.count_ops("remove_child"), 2);
    assert_eq!(mock.children_of(div).len(), 1);
}

/// A widget that records the number of still-active platform listeners at
/// the moment it is destroyed: teardown must reach widgets while the
/// view's own event bindings are still held.
struct OrderProbe {
    key: OwnerKey,
    order: Rc<RefCell<Vec<(String, usize)>>>,
    mock: Rc<RefCell<MockPlatform>>,
}

impl Widget for OrderProbe {
    fn mount(
        &mut self,
        platform: &SharedPlatform,
        parent: NodeId,
        index: u32,
    ) -> Result<NodeId, LifecycleError> {
        let mut platform = platform.borrow_mut();
        let id = platform.create_element("widget");
        platform.insert_child(parent, index, id);
        Ok(id)
    }

    fn attach(&mut self, _existing: NodeId, _p: &SharedPlatform) -> Result<(), LifecycleError> {
        Ok(())
    }

    fn update(&mut self, _props: &AttrList, _p: &SharedPlatform) -> Result<(), LifecycleError> {
        Ok(())
    }

    fn destroy(&mut self, _platform: &SharedPlatform) -> Result<(), TeardownError> {
        let listeners = self.mock.borrow().active_listeners();
        self.order
            .borrow_mut()
            .push((self.key.as_str().to_string(), listeners));
        Ok(())
    }
}

struct OrderProbeFactory {
    order: Rc<RefCell<Vec<(String, usize)>>>,
    mock: Rc<RefCell<MockPlatform>>,
}

impl WidgetFactory for OrderProbeFactory {
    fn instantiate(&self, node: &veneer_core::WidgetNode) -> Box<dyn Widget> {
        Box::new(OrderProbe {
            key: node.key.clone(),
            order: self.order.clone(),
            mock: self.mock.clone(),
        })
    }
}

#[test]
fn teardown_cascades_deepest_first_before_releasing_bindings() {
    let mock = MockPlatform::new_shared();
    let platform = MockPlatform::as_platform(&mock);
    let host = mock.borrow_mut().host();
    let scheduler = Scheduler::new();
    let model = Observable::new(0u32);
    let order: Rc<RefCell<Vec<(String, usize)>>> = Rc::new(RefCell::new(Vec::new()));

    // Three widget slots at increasing depth.
    let template = |_: &u32| {
        el(
            "div",
            AttrList::new(),
            vec![el(
                "section",
                AttrList::new(),
                vec![
                    el(
                        "span",
                        AttrList::new(),
                        vec![widget_with("deep", AttrList::new())],
                    ),
                    widget_with("mid", AttrList::new()),
                ],
            ), widget_with("shallow", AttrList::new())],
        )
    };

    let factory = Rc::new(OrderProbeFactory {
        order: order.clone(),
        mock: mock.clone(),
    });
    let view = View::builder(model, template, platform, scheduler.clone())
        .widget("deep", factory.clone())
        .widget("mid", factory.clone())
        .widget("shallow", factory)
        .events(veneer_runtime::EventMap::new().on("click", "noop"))
        .handler("noop", |_ctx| {})
        .config(ViewConfig::default())
        .host(host)
        .build()
        .expect("view builds");

    scheduler.advance(Duration::ZERO);
    assert_eq!(mock.borrow().active_listeners(), 1);

    view.destroy().expect("destroy succeeds");

    let order = order.borrow();
    let names: Vec<&str> = order.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(names, vec!["deep", "mid", "shallow"], "deepest descendant first");
    assert!(
        order.iter().all(|(_, listeners)| *listeners == 1),
        "every widget destroy must run before event bindings are released: {order:?}",
    );
    assert_eq!(mock.borrow().active_listeners(), 0);
}

#[test]
fn failed_widget_teardown_surfaces() {
    let mock = MockPlatform::new_shared();
    let platform = MockPlatform::as_platform(&mock);
    let host = mock.borrow_mut().host();
    let scheduler = Scheduler::new();
    let model = Observable::new(0u32);
    let log: WidgetLog = Rc::new(RefCell::new(Vec::new()));

    let view = View::builder(
        model,
        |_: &u32| el("div", AttrList::new(), vec![widget_with("w", AttrList::new())]),
        platform,
        scheduler,
    )
    .widget("w", RecordingFactory::failing_destroy(log))
    .host(host)
    .build()
    .expect("view builds");

    let err = view.destroy().expect_err("teardown failure must propagate");
    assert!(err.to_string().contains("recording widget told to fail"));
}
