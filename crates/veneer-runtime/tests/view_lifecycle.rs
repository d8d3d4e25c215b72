//! View controller lifecycle: first render, debounce collapsing, direct
//! renders, model swap, and destroyed-view no-ops.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use veneer_core::Node;
use veneer_harness::{MockPlatform, attrs, el, text};
use veneer_runtime::{Observable, Phase, Scheduler, View, ViewConfig};

fn counter_template(count: &u32) -> Node {
    el(
        "p",
        attrs(&[("class", "counter")]),
        vec![text(&count.to_string())],
    )
}

struct Fixture {
    mock: Rc<RefCell<MockPlatform>>,
    scheduler: Scheduler,
    model: Observable<u32>,
    view: View<u32>,
    renders: Rc<Cell<u32>>,
}

fn fixture(config: ViewConfig) -> Fixture {
    let mock = MockPlatform::new_shared();
    let platform = MockPlatform::as_platform(&mock);
    let host = mock.borrow_mut().host();
    let scheduler = Scheduler::new();
    let model = Observable::new(0u32);

    let view = View::builder(model.clone(), counter_template, platform, scheduler.clone())
        .config(config)
        .host(host)
        .build()
        .expect("view builds");

    let renders = Rc::new(Cell::new(0u32));
    let renders2 = renders.clone();
    view.on_render(move || renders2.set(renders2.get() + 1));

    Fixture {
        mock,
        scheduler,
        model,
        view,
        renders,
    }
}

#[test]
fn first_render_mounts_the_tree() {
    let f = fixture(ViewConfig::default());
    assert_eq!(f.view.phase(), Phase::Idle);

    let live = f.view.live_tree();
    let live = live.borrow();
    let root = live.root().expect("root mounted");
    assert_eq!(
        f.mock.borrow().node_of(root.id),
        counter_template(&0),
    );
    assert_eq!(f.view.current_tree(), Some(counter_template(&0)));
}

#[test]
fn defer_render_waits_for_explicit_call() {
    let f = fixture(ViewConfig::default().with_defer_render(true));
    assert_eq!(f.view.phase(), Phase::AwaitingFirstRender);
    assert!(f.view.current_tree().is_none());

    f.view.render().expect("explicit first render succeeds");
    assert_eq!(f.view.phase(), Phase::Idle);
    assert_eq!(f.view.current_tree(), Some(counter_template(&0)));
}

#[test]
fn burst_of_notifications_collapses_into_one_render() {
    let f = fixture(ViewConfig::default());
    assert_eq!(f.renders.get(), 0);

    // Five mutations inside the debounce window.
    for n in 1..=5 {
        f.model.set(n);
    }
    assert_eq!(f.view.phase(), Phase::RenderScheduled);
    assert_eq!(f.renders.get(), 0, "nothing renders inside the window");

    f.scheduler.advance(Duration::from_millis(1));
    assert_eq!(f.renders.get(), 1, "exactly one render for the burst");
    assert_eq!(
        f.view.current_tree(),
        Some(counter_template(&5)),
        "the render reads the state as of the last notification",
    );
    assert_eq!(f.view.phase(), Phase::Idle);
}

#[test]
fn debounce_window_restarts_per_notification() {
    let f = fixture(ViewConfig::default().with_debounce_window(Duration::from_millis(4)));

    f.model.set(1);
    f.scheduler.advance(Duration::from_millis(3));
    assert_eq!(f.renders.get(), 0);

    // Second notification re-arms the window.
    f.model.set(2);
    f.scheduler.advance(Duration::from_millis(3));
    assert_eq!(f.renders.get(), 0);

    f.scheduler.advance(Duration::from_millis(1));
    assert_eq!(f.renders.get(), 1);
    assert_eq!(f.view.current_tree(), Some(counter_template(&2)));
}

#[test]
fn direct_render_supersedes_scheduled_one() {
    let f = fixture(ViewConfig::default());
    f.model.set(7);
    assert_eq!(f.view.phase(), Phase::RenderScheduled);

    f.view.render().expect("direct render succeeds");
    assert_eq!(f.renders.get(), 1);

    f.scheduler.run_until_idle();
    assert_eq!(f.renders.get(), 1, "the canceled debounce must not re-render");
}

#[test]
fn render_patches_only_what_changed() {
    let f = fixture(ViewConfig::default());
    f.mock.borrow_mut().take_ops();

    f.model.set(3);
    f.scheduler.advance(Duration::from_millis(1));

    let mock = f.mock.borrow();
    assert_eq!(mock.count_ops("set_text"), 1);
    assert_eq!(
        mock.count_ops("create_element"),
        0,
        "a text-only change must not rebuild the element",
    );
}

#[test]
fn set_context_wins_over_model_for_one_render() {
    let f = fixture(ViewConfig::default());
    f.view.set_context(42);
    f.scheduler.advance(Duration::from_millis(1));
    assert_eq!(f.view.current_tree(), Some(counter_template(&42)));

    // The context is one-shot: the next render reads the model again.
    f.view.render().expect("render succeeds");
    assert_eq!(f.view.current_tree(), Some(counter_template(&0)));
}

#[test]
fn set_model_swaps_subscription() {
    let f = fixture(ViewConfig::default());
    let new_model = Observable::new(100u32);
    f.view.set_model(new_model.clone()).expect("swap succeeds");
    assert_eq!(f.view.current_tree(), Some(counter_template(&100)));
    let renders_after_swap = f.renders.get();

    // The old model no longer drives renders.
    f.model.set(9);
    f.scheduler.run_until_idle();
    assert_eq!(f.renders.get(), renders_after_swap);

    // The new one does.
    new_model.set(101);
    f.scheduler.run_until_idle();
    assert_eq!(f.view.current_tree(), Some(counter_template(&101)));
}

#[test]
fn destroy_is_idempotent_and_final() {
    let f = fixture(ViewConfig::default());
    f.view.destroy().expect("destroy succeeds");
    assert_eq!(f.view.phase(), Phase::Destroyed);
    f.view.destroy().expect("second destroy is a no-op");

    // A destroyed view must no-op, not fail, on stale activity.
    f.view.render().expect("render on destroyed view is a no-op");
    f.model.set(5);
    f.scheduler.run_until_idle();
    assert_eq!(f.renders.get(), 0);
    assert!(f.view.take_last_error().is_none());
}

#[test]
fn destroy_cancels_pending_debounce() {
    let f = fixture(ViewConfig::default());
    f.model.set(1);
    assert_eq!(f.view.phase(), Phase::RenderScheduled);

    f.view.destroy().expect("destroy succeeds");
    f.scheduler.run_until_idle();
    assert_eq!(f.renders.get(), 0, "the canceled debounce must not fire");
    assert_eq!(f.view.current_tree(), Some(counter_template(&0)));
}

#[test]
fn notifications_forward_to_owning_parent() {
    let mock = MockPlatform::new_shared();
    let platform = MockPlatform::as_platform(&mock);
    let scheduler = Scheduler::new();
    let shared = Observable::new(0u32);

    let parent_host = mock.borrow_mut().host();
    let parent = View::builder(
        shared.clone(),
        counter_template,
        platform.clone(),
        scheduler.clone(),
    )
    .host(parent_host)
    .build()
    .expect("parent builds");

    let child_host = mock.borrow_mut().host();
    let child = View::builder(shared.clone(), counter_template, platform, scheduler.clone())
        .parent(&parent)
        .host(child_host)
        .build()
        .expect("child builds");

    let parent_renders = Rc::new(Cell::new(0u32));
    let child_renders = Rc::new(Cell::new(0u32));
    let pr = parent_renders.clone();
    let cr = child_renders.clone();
    parent.on_render(move || pr.set(pr.get() + 1));
    child.on_render(move || cr.set(cr.get() + 1));

    shared.set(1);
    scheduler.run_until_idle();

    assert_eq!(
        parent_renders.get(),
        1,
        "the owning ancestor renders the shared model",
    );
    assert_eq!(
        child_renders.get(),
        0,
        "a non-owning consumer must not render independently",
    );
}
