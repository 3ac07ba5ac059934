//! Strict-FIFO, non-reentrant mutex.

use crate::list::{queue_link_of, TaskList};
use crate::scheduler::{self, WaitOutcome, WaitResult};
use crate::task::TaskState;
use core::cell::UnsafeCell;
use core::ptr::NonNull;

struct Inner {
    owner: Option<NonNull<crate::task::Task>>,
    waiters: TaskList,
}

/// A lock with strict FIFO hand-off: when the owner unlocks with waiters
/// queued, ownership passes to the longest-waiting one, never to a task
/// that calls `lock` afterward (no barging). Not re-entrant: locking
/// twice from the same task deadlocks it against itself.
///
/// # Safety of the `Sync` impl
///
/// Only the single cooperative scheduler thread this crate assumes ever
/// calls into a `Mutex` (no multi-OS-thread parallelism inside one
/// scheduler), so the interior mutability here never races.
#[repr(C)]
pub struct Mutex {
    inner: UnsafeCell<Inner>,
}

unsafe impl Sync for Mutex {}

impl Mutex {
    pub const fn new() -> Self {
        Mutex {
            inner: UnsafeCell::new(Inner {
                owner: None,
                waiters: TaskList::new(queue_link_of),
            }),
        }
    }

    /// Acquires the lock, suspending if it is already held. Returns
    /// `Cancelled` if `task_cancel_wait` fired while parked, in which case
    /// the caller does not hold the lock.
    pub fn lock(&self) -> WaitOutcome {
        unsafe {
            let inner = &mut *self.inner.get();
            let current = scheduler::current_task();
            if inner.owner.is_none() {
                inner.owner = Some(current);
                return WaitOutcome::Woken;
            }
            match scheduler::park_current(TaskState::Waiting, Some(&mut inner.waiters), None) {
                WaitResult::Cancelled => WaitOutcome::Cancelled,
                // Ownership was already transferred to us by `unlock`.
                WaitResult::Woken | WaitResult::TimedOut => WaitOutcome::Woken,
            }
        }
    }

    /// Releases the lock. The caller must currently hold it — unlocking
    /// from a non-owner is a programming error caught by debug assertion,
    /// not a runtime error.
    pub fn unlock(&self) {
        unsafe {
            let inner = &mut *self.inner.get();
            let current = scheduler::current_task();
            debug_assert_eq!(
                inner.owner,
                Some(current),
                "scoro: mutex unlocked by a task that doesn't own it"
            );
            match inner.waiters.pop_front() {
                Some(next) => {
                    inner.owner = Some(next);
                    scheduler::wake_waiter(next);
                }
                None => inner.owner = None,
            }
        }
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}
