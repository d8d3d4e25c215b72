//! Event delegation through the view: deferred binding, full rebind on
//! map change, delegated dispatch, and the missing-handler contract.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use veneer_core::{AttrList, Node};
use veneer_harness::{MockPlatform, attrs, el, text};
use veneer_runtime::{
    EventContext, EventMap, Observable, Scheduler, View, ViewError,
};

fn list_template(items: &Vec<String>) -> Node {
    el(
        "ul",
        attrs(&[("class", "list")]),
        items
            .iter()
            .map(|item| el("li", attrs(&[("class", "js-row")]), vec![text(item)]))
            .collect(),
    )
}

struct Fixture {
    mock: Rc<RefCell<MockPlatform>>,
    scheduler: Scheduler,
    model: Observable<Vec<String>>,
    view: View<Vec<String>>,
    clicks: Rc<RefCell<Vec<EventContext>>>,
}

fn fixture() -> Fixture {
    let mock = MockPlatform::new_shared();
    let platform = MockPlatform::as_platform(&mock);
    let host = mock.borrow_mut().host();
    let scheduler = Scheduler::new();
    let model = Observable::new(vec!["a".to_string(), "b".to_string()]);

    let clicks: Rc<RefCell<Vec<EventContext>>> = Rc::new(RefCell::new(Vec::new()));
    let clicks2 = clicks.clone();

    let view = View::builder(model.clone(), list_template, platform, scheduler.clone())
        .host(host)
        .events(EventMap::new().on("click .js-row", "select"))
        .handler("select", move |ctx: &EventContext| {
            clicks2.borrow_mut().push(ctx.clone())
        })
        .build()
        .expect("view builds");

    Fixture {
        mock,
        scheduler,
        model,
        view,
        clicks,
    }
}

#[test]
fn binding_is_deferred_one_tick() {
    let f = fixture();
    assert_eq!(
        f.mock.borrow().active_listeners(),
        0,
        "handlers must not attach while the tree may still change",
    );

    f.scheduler.advance(Duration::ZERO);
    assert_eq!(f.mock.borrow().active_listeners(), 1);
}

#[test]
fn delegated_dispatch_reaches_handler_with_match() {
    let f = fixture();
    f.scheduler.advance(Duration::ZERO);

    let live = f.view.live_tree();
    let (root_id, row_id, text_id) = {
        let live = live.borrow();
        let root = live.root().expect("root mounted");
        let row = &root.children()[1];
        (root.id, row.id, row.children()[0].id)
    };

    // Event targeted at the text inside the second row: the delegated
    // listener matches the row, not the root.
    MockPlatform::dispatch(&f.mock, "click", text_id);
    {
        let clicks = f.clicks.borrow();
        assert_eq!(clicks.len(), 1);
        assert_eq!(clicks[0].matched, row_id);
        assert_eq!(clicks[0].target, text_id);
        assert_eq!(clicks[0].event, "click");
    }

    // An event on the root itself matches nothing (.js-row is on rows).
    MockPlatform::dispatch(&f.mock, "click", root_id);
    assert_eq!(f.clicks.borrow().len(), 1);
}

#[test]
fn dynamically_inserted_rows_are_covered_without_rebinding() {
    let f = fixture();
    f.scheduler.advance(Duration::ZERO);
    let listeners_before = f.mock.borrow().active_listeners();

    f.model
        .update(|items| items.push("c".to_string()));
    f.scheduler.run_until_idle();
    assert_eq!(
        f.mock.borrow().active_listeners(),
        listeners_before,
        "same map, same root: no rebind",
    );

    let live = f.view.live_tree();
    let new_row = {
        let live = live.borrow();
        live.root().expect("root").children()[2].id
    };
    MockPlatform::dispatch(&f.mock, "click", new_row);
    assert_eq!(f.clicks.borrow().len(), 1);
    assert_eq!(f.clicks.borrow()[0].matched, new_row);
}

#[test]
fn map_change_triggers_full_rebind() {
    let f = fixture();
    f.scheduler.advance(Duration::ZERO);
    f.mock.borrow_mut().take_ops();

    let seen = Rc::new(Cell::new(0u32));
    let seen2 = seen.clone();
    f.view.register_handler("hover", Rc::new(move |_ctx| seen2.set(seen2.get() + 1)));
    f.view.set_event_map(
        EventMap::new()
            .on("click .js-row", "select")
            .on("mouseover .js-row", "hover"),
    );
    f.scheduler.advance(Duration::ZERO);

    let mock = f.mock.borrow();
    assert_eq!(
        mock.count_ops("remove_listener"),
        1,
        "the old binding is released in full",
    );
    assert_eq!(mock.count_ops("add_listener"), 2, "the new map binds in full");
    assert_eq!(mock.active_listeners(), 2);
}

#[test]
fn missing_handler_is_a_contract_violation() {
    let f = fixture();
    f.scheduler.advance(Duration::ZERO);

    f.view
        .set_event_map(EventMap::new().on("click .js-row", "does-not-exist"));
    f.scheduler.advance(Duration::ZERO);

    match f.view.take_last_error() {
        Some(ViewError::Event(err)) => {
            assert!(err.to_string().contains("does-not-exist"));
        }
        other => panic!("expected a missing-handler error, got {other:?}"),
    }
    // The failed pass has no side effects: the previous map stays bound.
    assert_eq!(f.mock.borrow().active_listeners(), 1);
}

#[test]
fn destroy_releases_all_bindings() {
    let f = fixture();
    f.scheduler.advance(Duration::ZERO);
    assert_eq!(f.mock.borrow().active_listeners(), 1);

    f.view.destroy().expect("destroy succeeds");
    assert_eq!(f.mock.borrow().active_listeners(), 0);

    // Dispatch after teardown reaches nothing.
    let live = f.view.live_tree();
    let row = {
        let live = live.borrow();
        live.root().expect("root").children()[0].id
    };
    MockPlatform::dispatch(&f.mock, "click", row);
    assert!(f.clicks.borrow().is_empty());
}

#[test]
fn root_replacement_rebinds_listeners_to_new_root() {
    let mock = MockPlatform::new_shared();
    let platform = MockPlatform::as_platform(&mock);
    let host = mock.borrow_mut().host();
    let scheduler = Scheduler::new();
    // Template switches the root tag: ol when any item is "flip".
    let model = Observable::new(vec!["a".to_string()]);
    let clicks: Rc<RefCell<Vec<EventContext>>> = Rc::new(RefCell::new(Vec::new()));
    let clicks2 = clicks.clone();

    let template = |items: &Vec<String>| {
        let tag = if items.iter().any(|i| i == "flip") {
            "ol"
        } else {
            "ul"
        };
        el(
            tag,
            AttrList::new(),
            items
                .iter()
                .map(|item| el("li", attrs(&[("class", "js-row")]), vec![text(item)]))
                .collect(),
        )
    };
    let view = View::builder(model.clone(), template, platform, scheduler.clone())
        .host(host)
        .events(EventMap::new().on("click .js-row", "select"))
        .handler("select", move |ctx: &EventContext| {
            clicks2.borrow_mut().push(ctx.clone())
        })
        .build()
        .expect("view builds");
    scheduler.advance(Duration::ZERO);

    model.update(|items| items.push("flip".to_string()));
    scheduler.run_until_idle();

    let live = view.live_tree();
    let row = {
        let live = live.borrow();
        live.root().expect("root").children()[0].id
    };
    MockPlatform::dispatch(&mock, "click", row);
    assert_eq!(
        clicks.borrow().len(),
        1,
        "listeners must follow the replaced root",
    );
}
