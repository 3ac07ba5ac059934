//! Auto-reset, edge-triggered event.

use crate::list::{queue_link_of, TaskList};
use crate::scheduler::{self, WaitResult};
use crate::task::TaskState;
use core::cell::UnsafeCell;

struct Inner {
    set: bool,
    waiters: TaskList,
}

/// A one-shot, auto-reset latch: `set` wakes exactly one waiter if any are
/// queued, otherwise latches so the next `wait` returns immediately
/// without suspending, clearing the latch as it does.
///
/// # Safety of the `Sync` impl
///
/// See [`crate::sync::Mutex`]'s equivalent note — only the single
/// cooperative scheduler thread ever touches an `Event`.
#[repr(C)]
pub struct Event {
    inner: UnsafeCell<Inner>,
}

unsafe impl Sync for Event {}

impl Event {
    pub const fn new() -> Self {
        Event {
            inner: UnsafeCell::new(Inner {
                set: false,
                waiters: TaskList::new(queue_link_of),
            }),
        }
    }

    /// Waits indefinitely. Returns `Woken` on a matching `set`, or
    /// `Cancelled` if `task_cancel_wait` fired while parked.
    pub fn wait(&self) -> WaitResult {
        self.wait_inner(None)
    }

    /// Waits up to `timeout_ms`. Distinguishes `TimedOut` from
    /// `Cancelled` at this Rust layer (the `c-api` surface re-collapses
    /// them into a single `i32` sentinel).
    pub fn wait_timeout(&self, timeout_ms: u32) -> WaitResult {
        self.wait_inner(Some(timeout_ms))
    }

    fn wait_inner(&self, timeout_ms: Option<u32>) -> WaitResult {
        unsafe {
            let inner = &mut *self.inner.get();
            if inner.set {
                inner.set = false;
                return WaitResult::Woken;
            }
            scheduler::park_current(TaskState::Waiting, Some(&mut inner.waiters), timeout_ms)
        }
    }

    /// Wakes the head of the wait queue if any task is waiting; otherwise
    /// latches `set` for the next `wait`. Never suspends the caller.
    pub fn set(&self) {
        unsafe {
            let inner = &mut *self.inner.get();
            match inner.waiters.pop_front() {
                Some(task) => scheduler::wake_waiter(task),
                None => inner.set = true,
            }
        }
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}
