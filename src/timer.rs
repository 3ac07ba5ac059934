//! Timer service and monotonic clock abstraction.
//!
//! The service is a sorted intrusive list keyed on absolute deadline
//! (milliseconds since `scheduler_init`), built on each task's
//! `timer_link` — the same allocation-free discipline as the run queue,
//! just ordered instead of FIFO.

use crate::list::TaskList;
use crate::task::Task;
use core::ptr::NonNull;

unsafe fn timer_link_of(mut task: NonNull<Task>) -> *mut crate::list::Link {
    &mut task.as_mut().timer_link as *mut _
}

/// A source of monotonic, millisecond-resolution time.
///
/// `now_ms()` must be nondecreasing for the lifetime of the scheduler; it
/// need not start at zero or match wall-clock time.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Blocks the calling thread for up to `timeout_ms`.
///
/// The no_std default busy-polls the clock in short steps, which is the
/// only correct behavior without a platform sleep primitive; a real
/// embedded port is expected to supply something better (WFI, a tickless
/// timer) the same way it supplies its own [`Clock`].
pub trait Sleeper {
    fn sleep_ms(&self, timeout_ms: u64);
}

#[cfg(feature = "std")]
pub(crate) struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    pub(crate) fn new() -> Self {
        StdClock {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

#[cfg(feature = "std")]
pub(crate) struct StdSleeper;

#[cfg(feature = "std")]
impl Sleeper for StdSleeper {
    fn sleep_ms(&self, timeout_ms: u64) {
        std::thread::sleep(std::time::Duration::from_millis(timeout_ms));
    }
}

/// Free-running millisecond counter for builds with no platform clock.
///
/// An embedder drives this with [`on_tick`] from whatever hardware timer
/// interrupt it has wired up.
#[cfg(not(feature = "std"))]
static TICKS_MS: core::sync::atomic::AtomicU64 = core::sync::atomic::AtomicU64::new(0);

/// Advances the free-running clock used by [`TickClock`] by `elapsed_ms`.
/// Only meaningful on `no_std` builds; `std` builds use the host clock
/// instead and ignore this entirely.
#[cfg(not(feature = "std"))]
pub fn on_tick(elapsed_ms: u64) {
    TICKS_MS.fetch_add(elapsed_ms, core::sync::atomic::Ordering::Relaxed);
}

#[cfg(not(feature = "std"))]
pub(crate) struct TickClock;

#[cfg(not(feature = "std"))]
impl Clock for TickClock {
    fn now_ms(&self) -> u64 {
        TICKS_MS.load(core::sync::atomic::Ordering::Relaxed)
    }
}

#[cfg(not(feature = "std"))]
pub(crate) struct BusyPollSleeper<'a, C: Clock> {
    pub(crate) clock: &'a C,
}

#[cfg(not(feature = "std"))]
impl<C: Clock> Sleeper for BusyPollSleeper<'_, C> {
    fn sleep_ms(&self, timeout_ms: u64) {
        let deadline = self.clock.now_ms().saturating_add(timeout_ms);
        while self.clock.now_ms() < deadline {
            core::hint::spin_loop();
        }
    }
}

/// Ordered collection of (deadline, task) entries: insert, remove-by-task,
/// peek-min and expire-due.
pub(crate) struct TimerService {
    list: TaskList,
}

impl TimerService {
    pub(crate) const fn new() -> Self {
        TimerService {
            list: TaskList::new(timer_link_of),
        }
    }

    /// Inserts `task` with the given absolute deadline, keeping the list
    /// sorted ascending. `task` must not already be in the timer service.
    pub(crate) fn add(&mut self, task: NonNull<Task>, deadline_ms: u64) {
        unsafe {
            (*task.as_ptr()).deadline_ms = Some(deadline_ms);
        }
        let mut cursor = self.list.front();
        while let Some(node) = cursor {
            let node_deadline = unsafe { (*node.as_ptr()).deadline_ms.unwrap_or(u64::MAX) };
            if node_deadline > deadline_ms {
                break;
            }
            cursor = self.list.next_of(node);
        }
        match cursor {
            Some(before) => self.list.insert_before(before, task),
            None => self.list.push_back(task),
        }
    }

    /// Removes `task` from the timer service if present; a no-op if it
    /// isn't armed with a deadline.
    pub(crate) fn remove(&mut self, task: NonNull<Task>) {
        if unsafe { (*task.as_ptr()).deadline_ms.is_none() } {
            return;
        }
        self.list.remove(task);
        unsafe {
            (*task.as_ptr()).deadline_ms = None;
        }
    }

    pub(crate) fn peek_min(&self) -> Option<u64> {
        let head = self.list.front()?;
        unsafe { (*head.as_ptr()).deadline_ms }
    }

    /// Removes every task whose deadline is `<= now_ms`, calling `on_due`
    /// for each in nondecreasing deadline order (ties broken by insertion
    /// order, since insertion keeps the list stable-sorted).
    pub(crate) fn expire_due(&mut self, now_ms: u64, mut on_due: impl FnMut(NonNull<Task>)) {
        while let Some(head) = self.list.front() {
            match unsafe { (*head.as_ptr()).deadline_ms } {
                Some(d) if d <= now_ms => {}
                _ => break,
            }
            self.list.pop_front();
            unsafe {
                (*head.as_ptr()).deadline_ms = None;
            }
            on_due(head);
        }
    }
}
