#![forbid(unsafe_code)]

//! Cooperative single-threaded task scheduling with virtual time.
//!
//! The runtime never blocks and never relies on ambient timer semantics:
//! deferred work (the render debounce and the `bind_effects` phase of the
//! two-phase commit) is an explicitly scheduled, cancelable [`TaskId`] on
//! this queue. The hosting application drives the clock by calling
//! [`Scheduler::advance`] (or [`Scheduler::run_until_idle`]), which makes
//! every deferral deterministic and testable.
//!
//! # Invariants
//!
//! 1. Due tasks run in deadline order; ties run in scheduling (FIFO) order.
//! 2. A canceled task never runs.
//! 3. A running task may schedule or cancel tasks; newly scheduled tasks
//!    whose deadline has already passed run within the same `advance` call.
//! 4. Identical schedules produce identical execution orders; no wall
//!    clock is consulted anywhere.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Identifier for a scheduled task, used for cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce()>;

struct Entry {
    id: TaskId,
    deadline: Duration,
    seq: u64,
    task: Task,
}

#[derive(Default)]
struct Inner {
    now: Duration,
    next_id: u64,
    queue: Vec<Entry>,
}

impl Inner {
    /// Index of the next due entry: earliest deadline, then lowest seq.
    fn next_due(&self, now: Duration) -> Option<usize> {
        self.queue
            .iter()
            .enumerate()
            .filter(|(_, e)| e.deadline <= now)
            .min_by_key(|(_, e)| (e.deadline, e.seq))
            .map(|(i, _)| i)
    }

    fn earliest_deadline(&self) -> Option<Duration> {
        self.queue.iter().map(|e| e.deadline).min()
    }
}

/// Cloneable handle to a single-threaded virtual-time task queue.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Rc<RefCell<Inner>>,
}

impl Scheduler {
    /// Create a scheduler with the clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// Number of tasks waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Schedule `task` to run once `delay` has elapsed.
    pub fn schedule(&self, delay: Duration, task: impl FnOnce() + 'static) -> TaskId {
        let mut inner = self.inner.borrow_mut();
        let id = TaskId(inner.next_id);
        let seq = inner.next_id;
        inner.next_id += 1;
        let deadline = inner.now + delay;
        inner.queue.push(Entry {
            id,
            deadline,
            seq,
            task: Box::new(task),
        });
        tracing::trace!(task = id.0, ?deadline, "task scheduled");
        id
    }

    /// Cancel a pending task. Returns `true` if the task was still queued.
    pub fn cancel(&self, id: TaskId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.queue.len();
        inner.queue.retain(|e| e.id != id);
        let canceled = inner.queue.len() != before;
        if canceled {
            tracing::trace!(task = id.0, "task canceled");
        }
        canceled
    }

    /// Advance the clock by `dt` and run every task that becomes due, in
    /// deadline-then-FIFO order.
    ///
    /// Tasks run outside the queue borrow, so a task may freely schedule or
    /// cancel other tasks; a task scheduled at an already-passed deadline
    /// runs before this call returns.
    pub fn advance(&self, dt: Duration) {
        let now = {
            let mut inner = self.inner.borrow_mut();
            inner.now += dt;
            inner.now
        };
        self.drain_due(now);
    }

    /// Run every pending task, advancing the clock to each deadline in
    /// turn, until the queue is empty.
    pub fn run_until_idle(&self) {
        loop {
            let Some(deadline) = self.inner.borrow().earliest_deadline() else {
                return;
            };
            {
                let mut inner = self.inner.borrow_mut();
                if inner.now < deadline {
                    inner.now = deadline;
                }
            }
            let now = self.inner.borrow().now;
            self.drain_due(now);
        }
    }

    fn drain_due(&self, now: Duration) {
        loop {
            let entry = {
                let mut inner = self.inner.borrow_mut();
                match inner.next_due(now) {
                    Some(idx) => inner.queue.swap_remove(idx),
                    None => return,
                }
            };
            tracing::trace!(task = entry.id.0, "task running");
            (entry.task)();
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Scheduler")
            .field("now", &inner.now)
            .field("pending", &inner.queue.len())
            .finish()
    }
}
