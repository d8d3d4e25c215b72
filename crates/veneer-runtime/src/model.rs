#![forbid(unsafe_code)]

//! The observable-model contract.
//!
//! The view controller only needs one thing from a model: a generic
//! "changed" notification with no payload semantics; data is read from the
//! model at render time, not carried in the notification. [`ChangeSource`]
//! is that contract; [`Observable`] is the stock single-threaded
//! implementation for hosts that do not bring their own model layer.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation that changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current value is a no-op: no version
//!    bump, no notifications.
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//! 5. A subscriber may mutate the observable re-entrantly; the notification
//!    pass runs against the subscriber list as of the moment the pass
//!    started.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Identifier for one subscription on one source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Callback = Rc<dyn Fn()>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: Vec<(SubscriberId, Callback)>,
}

impl Subscribers {
    fn add(&mut self, cb: Callback) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, cb));
        id
    }

    fn remove(&mut self, id: SubscriberId) {
        self.entries.retain(|(sid, _)| *sid != id);
    }

    fn snapshot(&self) -> Vec<Callback> {
        self.entries.iter().map(|(_, cb)| cb.clone()).collect()
    }
}

/// RAII guard for one change subscription; dropping it unsubscribes.
pub struct Subscription {
    list: Weak<RefCell<Subscribers>>,
    id: SubscriberId,
}

impl Subscription {
    /// The subscription's identifier, for diagnostics.
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(list) = self.list.upgrade() {
            list.borrow_mut().remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Anything that can announce "something changed".
///
/// The notification deliberately carries no payload: the single source of
/// truth is the model itself, read at render time.
pub trait ChangeSource {
    /// Register a change listener. The returned guard unsubscribes on drop.
    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription;
}

struct ObservableInner<T> {
    value: RefCell<T>,
    version: RefCell<u64>,
    subscribers: Rc<RefCell<Subscribers>>,
}

/// A shared, version-tracked value with change notification.
///
/// Single-threaded shared ownership: clones are handles to the same value.
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.inner.value.borrow())
            .field("version", &*self.inner.version.borrow())
            .finish()
    }
}

impl<T> Observable<T> {
    /// Create an observable holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                value: RefCell::new(value),
                version: RefCell::new(0),
                subscribers: Rc::new(RefCell::new(Subscribers::default())),
            }),
        }
    }

    /// Read the value through a closure without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// The mutation counter; bumps once per value-changing mutation.
    #[must_use]
    pub fn version(&self) -> u64 {
        *self.inner.version.borrow()
    }

    /// Announce a change without touching the value.
    ///
    /// Lets hosts fan external invalidation into the same notification
    /// channel the controller already listens on.
    pub fn touch(&self) {
        *self.inner.version.borrow_mut() += 1;
        self.notify();
    }

    /// Mutate the value in place and notify.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        {
            let mut value = self.inner.value.borrow_mut();
            f(&mut value);
            *self.inner.version.borrow_mut() += 1;
        }
        self.notify();
    }

    fn notify(&self) {
        // Snapshot before calling out: a subscriber may subscribe,
        // unsubscribe, or mutate re-entrantly.
        let callbacks = self.inner.subscribers.borrow().snapshot();
        for cb in callbacks {
            cb();
        }
    }
}

impl<T: Clone> Observable<T> {
    /// Clone the current value out.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

impl<T: PartialEq> Observable<T> {
    /// Replace the value, notifying subscribers unless it is unchanged.
    pub fn set(&self, value: T) {
        {
            let current = self.inner.value.borrow();
            if *current == value {
                return;
            }
        }
        *self.inner.value.borrow_mut() = value;
        *self.inner.version.borrow_mut() += 1;
        self.notify();
    }
}

impl<T> ChangeSource for Observable<T> {
    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription {
        let id = self.inner.subscribers.borrow_mut().add(listener);
        Subscription {
            list: Rc::downgrade(&self.inner.subscribers),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn get_set_round_trip() {
        let obs = Observable::new(1);
        assert_eq!(obs.get(), 1);
        obs.set(2);
        assert_eq!(obs.get(), 2);
    }

    #[test]
    fn set_equal_value_is_noop() {
        let obs = Observable::new(7);
        let fired = Rc::new(Cell::new(0u32));
        let fired2 = fired.clone();
        let _sub = obs.subscribe(Rc::new(move || fired2.set(fired2.get() + 1)));

        obs.set(7);
        assert_eq!(fired.get(), 0);
        assert_eq!(obs.version(), 0);

        obs.set(8);
        assert_eq!(fired.get(), 1);
        assert_eq!(obs.version(), 1);
    }

    #[test]
    fn subscribers_notified_in_registration_order() {
        let obs = Observable::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let o1 = order.clone();
        let o2 = order.clone();
        let _a = obs.subscribe(Rc::new(move || o1.borrow_mut().push("a")));
        let _b = obs.subscribe(Rc::new(move || o2.borrow_mut().push("b")));

        obs.set(1);
        assert_eq!(*order.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let obs = Observable::new(0);
        let fired = Rc::new(Cell::new(0u32));
        let fired2 = fired.clone();
        let sub = obs.subscribe(Rc::new(move || fired2.set(fired2.get() + 1)));

        obs.set(1);
        assert_eq!(fired.get(), 1);

        drop(sub);
        obs.set(2);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn touch_notifies_without_value_change() {
        let obs = Observable::new(0);
        let fired = Rc::new(Cell::new(0u32));
        let fired2 = fired.clone();
        let _sub = obs.subscribe(Rc::new(move || fired2.set(fired2.get() + 1)));

        obs.touch();
        assert_eq!(fired.get(), 1);
        assert_eq!(obs.get(), 0);
    }

    #[test]
    fn update_mutates_in_place() {
        let obs = Observable::new(vec![1, 2]);
        obs.update(|v| v.push(3));
        assert_eq!(obs.get(), vec![1, 2, 3]);
        assert_eq!(obs.version(), 1);
    }

    #[test]
    fn reentrant_set_from_subscriber_does_not_panic() {
        let obs = Observable::new(0);
        let obs2 = obs.clone();
        let _sub = obs.subscribe(Rc::new(move || {
            if obs2.get() == 1 {
                obs2.set(2);
            }
        }));
        obs.set(1);
        assert_eq!(obs.get(), 2);
    }

    #[test]
    fn clones_share_state() {
        let a = Observable::new(1);
        let b = a.clone();
        b.set(5);
        assert_eq!(a.get(), 5);
    }
}
