//! The process-wide scheduler singleton: run queue, pick-next, idle wait,
//! and the suspend/resume primitives every suspending API builds on.
//!
//! A single cooperative scheduler instance per process, accessed through
//! unsafe accessor functions whose safety rests on a single-threaded,
//! single-scheduler-thread contract: exactly one OS thread ever calls
//! into this module for a given process.

use crate::error::SchedulerError;
use crate::list::{queue_link_of, TaskList};
use crate::task::{EntryFn, Task, TaskState};
use crate::timer::TimerService;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

#[cfg(feature = "std")]
use crate::timer::StdClock as PlatformClock;
#[cfg(not(feature = "std"))]
use crate::timer::TickClock as PlatformClock;

/// Disposition of a suspending wait, surfaced at the Rust API layer before
/// any collapsing `c-api` does for its `i32` ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    Woken,
    TimedOut,
    Cancelled,
}

/// Outcome of a suspending call that has no timeout of its own (sleep,
/// join, mutex lock): either it woke normally, or `task_cancel_wait` fired
/// while it was parked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Woken,
    Cancelled,
}

impl WaitOutcome {
    pub fn is_cancelled(self) -> bool {
        matches!(self, WaitOutcome::Cancelled)
    }
}

/// Handle to a task created by [`task_create`]; the currency `task_join`
/// and `task_cancel_wait` operate on.
///
/// `repr(transparent)` over a single pointer so the `c-api` feature can
/// hand it to C callers as an opaque `void *` with no indirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct TaskHandle(pub(crate) NonNull<Task>);

// Safety: a handle is just an opaque pointer into caller-owned memory;
// moving it between tasks running on the same cooperative scheduler
// thread carries no additional hazard beyond what the crate already
// requires of every `Task` reference.
unsafe impl Send for TaskHandle {}

pub(crate) struct Scheduler {
    current: NonNull<Task>,
    main_task: Task,
    run_queue: TaskList,
    timer: TimerService,
    next_id: u64,
    clock: PlatformClock,
    #[cfg(feature = "external-events")]
    external_wait: Option<extern "C" fn(u32)>,
    #[cfg(feature = "external-events")]
    external_activity: core::sync::atomic::AtomicBool,
}

static mut SCHEDULER: MaybeUninit<Scheduler> = MaybeUninit::uninit();
static mut SCHEDULER_INIT: bool = false;

unsafe fn scheduler_mut() -> &'static mut Scheduler {
    debug_assert!(
        SCHEDULER_INIT,
        "scoro: scheduler API used before scheduler_init()"
    );
    SCHEDULER.assume_init_mut()
}

/// Installs the process-wide scheduler, binding the calling thread as the
/// scheduler thread and registering it as the "main" pseudo-task.
///
/// Fails only on re-entry; this is the one ordinary `Result`-returning
/// entry point in the whole API.
pub fn scheduler_init() -> Result<(), SchedulerError> {
    unsafe {
        if SCHEDULER_INIT {
            return Err(SchedulerError::AlreadyInitialized);
        }
        #[cfg(feature = "std")]
        let clock = PlatformClock::new();
        #[cfg(not(feature = "std"))]
        let clock = PlatformClock;

        let scheduler = Scheduler {
            current: NonNull::dangling(),
            main_task: Task::main_task(0),
            run_queue: TaskList::new(queue_link_of),
            timer: TimerService::new(),
            next_id: 1,
            clock,
            #[cfg(feature = "external-events")]
            external_wait: None,
            #[cfg(feature = "external-events")]
            external_activity: core::sync::atomic::AtomicBool::new(false),
        };
        SCHEDULER.write(scheduler);
        // Only safe to take this address now that the value has reached
        // its permanent location inside the static.
        let sched = SCHEDULER.assume_init_mut();
        sched.current = NonNull::from(&mut sched.main_task);
        SCHEDULER_INIT = true;
        log::debug!("scoro: scheduler initialized");
        Ok(())
    }
}

/// Creates a task in caller-owned memory and enqueues it on the run queue.
///
/// `stack` must outlive the task; `'static` is this crate's way of
/// expressing that ownership contract for a stack that is itself
/// typically a `static mut` array on embedded targets.
pub fn task_create(
    stack: &'static mut [MaybeUninit<u8>],
    entry: EntryFn,
    arg: usize,
) -> TaskHandle {
    unsafe {
        let sched = scheduler_mut();
        let id = sched.next_id;
        sched.next_id += 1;
        let task = Task::create_in(stack, entry, arg, id);
        sched.run_queue.push_back(task);
        log::trace!("scoro: task {id} created");
        TaskHandle(task)
    }
}

/// Appends the current task to the run queue tail and switches to the
/// head. Strict FIFO among tasks that yield without blocking.
pub fn task_yield() {
    unsafe {
        let sched = scheduler_mut();
        let current = sched.current;
        sched.run_queue.push_back(current);
        schedule();
    }
}

/// Sleeps the current task for `ms` milliseconds. `task_sleep(0)` is
/// equivalent to `task_yield` (a due timer expires in the same idle-wait
/// pass without ever actually blocking).
pub fn task_sleep(ms: u32) -> WaitOutcome {
    unsafe { into_outcome(park_current(TaskState::Sleeping, None, Some(ms))) }
}

/// Blocks until `handle`'s task reaches `Dead`. Returns immediately if it
/// already has. Only one joiner per task is supported; a second call
/// while the first is still parked is a debug-assertion failure, not
/// silently-overwritten state.
pub fn task_join(handle: TaskHandle) -> WaitOutcome {
    unsafe {
        let target = handle.0;
        if (*target.as_ptr()).state == TaskState::Dead {
            return WaitOutcome::Woken;
        }
        debug_assert!(
            (*target.as_ptr()).join_waiter.is_none(),
            "scoro: task already has a joiner"
        );
        let sched = scheduler_mut();
        let current = sched.current;
        (*target.as_ptr()).join_waiter = Some(current);
        (*current.as_ptr()).waiting_for = Some(target);
        let result = park_current(TaskState::Waiting, None, None);
        (*current.as_ptr()).waiting_for = None;
        into_outcome(result)
    }
}

/// Forcibly makes `handle`'s task runnable, unlinking it from whatever it
/// is parked on and causing its suspending call to return `Cancelled`.
/// Idempotent on runnable and dead tasks.
pub fn task_cancel_wait(handle: TaskHandle) {
    unsafe {
        let task_ptr = handle.0;
        let task = &mut *task_ptr.as_ptr();
        if task.state != TaskState::Sleeping && task.state != TaskState::Waiting {
            return;
        }
        let sched = scheduler_mut();
        sched.timer.remove(task_ptr);
        if let Some(mut wq) = task.wait_queue.take() {
            wq.as_mut().remove(task_ptr);
        }
        if let Some(target) = task.waiting_for.take() {
            let target = &mut *target.as_ptr();
            if target.join_waiter == Some(task_ptr) {
                target.join_waiter = None;
            }
        }
        task.wait_cancelled = true;
        task.state = TaskState::Runnable;
        sched.run_queue.push_back(task_ptr);
        log::trace!("scoro: task {} cancelled", task.id);
    }
}

fn into_outcome(result: WaitResult) -> WaitOutcome {
    match result {
        WaitResult::Cancelled => WaitOutcome::Cancelled,
        WaitResult::Woken | WaitResult::TimedOut => WaitOutcome::Woken,
    }
}

/// Parks the current task in `state`, optionally on `wait_queue` and/or
/// with an absolute timeout `timeout_ms` milliseconds from now, then
/// switches away. Returns the disposition the task woke with.
///
/// Shared by `task_sleep` (`wait_queue = None`), `task_join`
/// (`wait_queue = None`, no timeout), and the mutex/event primitives
/// (`wait_queue = Some(..)`, timeout only for events).
pub(crate) unsafe fn park_current(
    state: TaskState,
    wait_queue: Option<&mut TaskList>,
    timeout_ms: Option<u32>,
) -> WaitResult {
    let sched = scheduler_mut();
    let current = sched.current;
    (*current.as_ptr()).state = state;
    if let Some(q) = wait_queue {
        (*current.as_ptr()).wait_queue = Some(NonNull::from(&mut *q));
        q.push_back(current);
    }
    if let Some(ms) = timeout_ms {
        let now = sched.clock.now_ms();
        sched.timer.add(current, now.saturating_add(ms as u64));
    }
    schedule();
    (*current.as_ptr()).wait_queue = None;
    let cancelled = core::mem::replace(&mut (*current.as_ptr()).wait_cancelled, false);
    let timed_out = core::mem::replace(&mut (*current.as_ptr()).timed_out, false);
    if cancelled {
        WaitResult::Cancelled
    } else if timed_out {
        WaitResult::TimedOut
    } else {
        WaitResult::Woken
    }
}

/// Returns a handle to whatever task is currently running.
pub(crate) unsafe fn current_task() -> NonNull<Task> {
    scheduler_mut().current
}

/// Wakes `task` directly without going through its wait queue: clears any
/// pending timer and its `wait_queue` marker, makes it runnable, and
/// enqueues it. Used by `Mutex::unlock`/`Event::set` after they have
/// already popped `task` off their own wait queue by hand, and by
/// `retire_current_task` to wake a joiner.
pub(crate) unsafe fn wake_waiter(task: NonNull<Task>) {
    let sched = scheduler_mut();
    sched.timer.remove(task);
    (*task.as_ptr()).wait_queue = None;
    (*task.as_ptr()).state = TaskState::Runnable;
    sched.run_queue.push_back(task);
}

/// Entered from [`crate::task::task_trampoline`] once a task's entry
/// function returns: marks it `Dead`, wakes its joiner if any, and never
/// returns — the task's stack is abandoned for good.
pub(crate) unsafe fn retire_current_task() -> ! {
    let sched = scheduler_mut();
    let current = sched.current;
    (*current.as_ptr()).state = TaskState::Dead;
    log::trace!("scoro: task {} retired", (*current.as_ptr()).id);
    if let Some(joiner) = (*current.as_ptr()).join_waiter.take() {
        (*joiner.as_ptr()).waiting_for = None;
        wake_waiter(joiner);
    }
    schedule();
    unreachable!("scoro: a DEAD task must never be resumed")
}

/// Pops the run queue head and switches to it, idle-waiting first if the
/// run queue is empty.
unsafe fn schedule() {
    loop {
        let sched = scheduler_mut();
        if let Some(next) = sched.run_queue.pop_front() {
            switch_to(next);
            return;
        }
        idle_wait(sched);
    }
}

unsafe fn switch_to(next: NonNull<Task>) {
    let sched = scheduler_mut();
    let prev = sched.current;
    if prev == next {
        // The only runnable task is the one already running: nothing to
        // switch away from or into. A real jump_context here would resume
        // whatever stale context this task last suspended into (or none,
        // on a task's very first suspension), abandoning the live call
        // stack instead of simply continuing it.
        return;
    }
    sched.current = next;
    let prev_ctx = &mut (*prev.as_ptr()).context as *mut crate::arch::Context;
    let next_ctx = (*next.as_ptr()).context;
    let transfer = next.as_ptr() as usize;
    crate::arch::jump_context(prev_ctx, next_ctx, transfer);
}

/// Run queue is empty: wait for the next timer or external event, then
/// expire due timers.
unsafe fn idle_wait(sched: &mut Scheduler) {
    let now = sched.clock.now_ms();
    let deadline = sched.timer.peek_min();

    #[cfg(feature = "external-events")]
    {
        if let Some(wait_fn) = sched.external_wait {
            let timeout_ms = deadline
                .map(|d| d.saturating_sub(now).min(u32::MAX as u64) as u32)
                .unwrap_or(u32::MAX);
            wait_fn(timeout_ms);
            sched
                .external_activity
                .store(false, core::sync::atomic::Ordering::Release);
        } else {
            busy_or_sleep(sched, deadline, now);
        }
    }
    #[cfg(not(feature = "external-events"))]
    busy_or_sleep(sched, deadline, now);

    let now = sched.clock.now_ms();
    let (timer, run_queue) = (&mut sched.timer, &mut sched.run_queue);
    timer.expire_due(now, |task| {
        let t = &mut *task.as_ptr();
        if let Some(mut wq) = t.wait_queue.take() {
            wq.as_mut().remove(task);
            t.timed_out = true;
        }
        t.state = TaskState::Runnable;
        run_queue.push_back(task);
    });
}

fn busy_or_sleep(sched: &Scheduler, deadline: Option<u64>, now: u64) {
    match deadline {
        Some(d) if d > now => sleep_platform(sched, d - now),
        Some(_) => {}
        None => panic!(
            "scoro: scheduler idle with no runnable tasks, no pending timers, \
             and no external wait source bound"
        ),
    }
}

#[cfg(feature = "std")]
fn sleep_platform(_sched: &Scheduler, ms: u64) {
    use crate::timer::Sleeper;
    crate::timer::StdSleeper.sleep_ms(ms.min(u32::MAX as u64) as u32);
}

#[cfg(not(feature = "std"))]
fn sleep_platform(sched: &Scheduler, ms: u64) {
    use crate::timer::Sleeper;
    crate::timer::BusyPollSleeper {
        clock: &sched.clock,
    }
    .sleep_ms(ms.min(u32::MAX as u64) as u32);
}

/// Supplies the function an external I/O engine's idle wait blocks on.
/// Only compiled with the `external-events` feature.
#[cfg(feature = "external-events")]
pub fn bind_external_wait(wait_fn: extern "C" fn(u32)) {
    unsafe {
        scheduler_mut().external_wait = Some(wait_fn);
    }
}

/// Signals that an external agent made a task runnable, so the idle wait
/// returns promptly instead of riding out its timeout.
#[cfg(feature = "external-events")]
pub fn on_external_activity() {
    unsafe {
        scheduler_mut()
            .external_activity
            .store(true, core::sync::atomic::Ordering::Release);
    }
}

/// Resets scheduler state so a subsequent [`scheduler_init`] succeeds in
/// the same process. Only meant for a test harness that exercises
/// several independent scheduler lifetimes back to back; never call this
/// from production code.
#[cfg(feature = "test-util")]
pub fn reset_for_tests() {
    unsafe {
        SCHEDULER_INIT = false;
    }
}

/// Polled by an embedder's `wait_fn` to learn whether
/// [`on_external_activity`] fired since the last call; clears the flag as
/// a side effect, same edge-triggered discipline as the `Event` primitive.
#[cfg(feature = "external-events")]
pub fn take_external_activity() -> bool {
    unsafe {
        scheduler_mut()
            .external_activity
            .swap(false, core::sync::atomic::Ordering::AcqRel)
    }
}
