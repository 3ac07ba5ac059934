//! Run with `cargo test --features std,test-util`.
//!
//! Covers the event primitive's latch-before-wait, wake-exactly-one,
//! cancellation, and timeout behavior.

use scoro::{
    scheduler_init, task_cancel_wait, task_create, task_join, task_yield, Event, WaitResult,
};
use sequential_test::sequential;
use std::mem::MaybeUninit;
use std::sync::Mutex as StdMutex;
use std::time::Instant;

static LOG: StdMutex<Vec<&'static str>> = StdMutex::new(Vec::new());

static LATCH_EVENT: Event = Event::new();
static WAKE_ONE_EVENT: Event = Event::new();
static CANCEL_EVENT: Event = Event::new();
static TIMEOUT_EVENT: Event = Event::new();

static mut STACK_1: [MaybeUninit<u8>; 65536] = [MaybeUninit::uninit(); 65536];
static mut STACK_2: [MaybeUninit<u8>; 65536] = [MaybeUninit::uninit(); 65536];

fn stack1() -> &'static mut [MaybeUninit<u8>] {
    unsafe { &mut *core::ptr::addr_of_mut!(STACK_1) }
}

fn stack2() -> &'static mut [MaybeUninit<u8>] {
    unsafe { &mut *core::ptr::addr_of_mut!(STACK_2) }
}

extern "C" fn sets_latch_event(_arg: usize) {
    task_yield();
    LATCH_EVENT.set();
}

#[test]
#[sequential]
fn event_latches_before_a_waiter_arrives() {
    let _ = env_logger::try_init();
    scoro::reset_for_tests();
    scheduler_init().unwrap();

    // set() with no waiters queued latches; the very next wait() must
    // return immediately without suspending.
    LATCH_EVENT.set();
    assert_eq!(LATCH_EVENT.wait(), WaitResult::Woken);

    // The latch cleared itself; now a second wait() actually suspends
    // until something else calls set().
    let t = task_create(stack1(), sets_latch_event, 0);
    assert_eq!(LATCH_EVENT.wait(), WaitResult::Woken);
    task_join(t);
}

extern "C" fn waits_and_logs_w1(_arg: usize) {
    WAKE_ONE_EVENT.wait();
    LOG.lock().unwrap().push("w1");
}

extern "C" fn waits_and_logs_w2(_arg: usize) {
    WAKE_ONE_EVENT.wait();
    LOG.lock().unwrap().push("w2");
}

#[test]
#[sequential]
fn event_set_wakes_exactly_the_head_waiter() {
    let _ = env_logger::try_init();
    scoro::reset_for_tests();
    scheduler_init().unwrap();
    LOG.lock().unwrap().clear();

    let w1 = task_create(stack1(), waits_and_logs_w1, 0);
    let w2 = task_create(stack2(), waits_and_logs_w2, 0);

    // A single yield is enough: once w1 is scheduled it immediately parks
    // on the event too, cascading straight into w2, which parks in turn
    // and hands control back to main.
    task_yield();

    WAKE_ONE_EVENT.set();
    task_join(w1);
    assert_eq!(*LOG.lock().unwrap(), vec!["w1"]);

    WAKE_ONE_EVENT.set();
    task_join(w2);
    assert_eq!(*LOG.lock().unwrap(), vec!["w1", "w2"]);
}

extern "C" fn waits_and_logs_cancel_outcome(_arg: usize) {
    let result = CANCEL_EVENT.wait();
    LOG.lock()
        .unwrap()
        .push(if result == WaitResult::Cancelled {
            "cancelled"
        } else {
            "woken"
        });
}

#[test]
#[sequential]
fn cancel_wait_unparks_an_event_waiter() {
    let _ = env_logger::try_init();
    scoro::reset_for_tests();
    scheduler_init().unwrap();
    LOG.lock().unwrap().clear();

    let x = task_create(stack1(), waits_and_logs_cancel_outcome, 0);
    task_yield(); // let x park on CANCEL_EVENT
    task_cancel_wait(x);
    task_join(x);

    assert_eq!(*LOG.lock().unwrap(), vec!["cancelled"]);

    // x was removed from the wait queue by the cancellation, not left
    // dangling in it: a fresh set()/wait() pair still behaves like an
    // empty queue (latches, then returns without suspending).
    CANCEL_EVENT.set();
    assert_eq!(CANCEL_EVENT.wait(), WaitResult::Woken);
}

#[test]
#[sequential]
fn event_wait_timeout_fires_after_the_deadline() {
    let _ = env_logger::try_init();
    scoro::reset_for_tests();
    scheduler_init().unwrap();

    let start = Instant::now();
    let result = TIMEOUT_EVENT.wait_timeout(50);
    let elapsed = start.elapsed();

    assert_eq!(result, WaitResult::TimedOut);
    assert!(elapsed.as_millis() >= 50);
}
