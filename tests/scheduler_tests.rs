//! Run with `cargo test --features std,test-util`.
//!
//! Exercises the scheduler's core FIFO guarantees: strict yield rotation,
//! sleep as a timed suspension, join waking on death, and
//! `task_cancel_wait` idempotence/semantics.

use scoro::{scheduler_init, task_cancel_wait, task_create, task_join, task_sleep, task_yield};
use sequential_test::sequential;
use std::mem::MaybeUninit;
use std::sync::Mutex;

static LOG: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

static mut STACK_A: [MaybeUninit<u8>; 65536] = [MaybeUninit::uninit(); 65536];
static mut STACK_B: [MaybeUninit<u8>; 65536] = [MaybeUninit::uninit(); 65536];

fn stack_a() -> &'static mut [MaybeUninit<u8>] {
    unsafe { &mut *core::ptr::addr_of_mut!(STACK_A) }
}

fn stack_b() -> &'static mut [MaybeUninit<u8>] {
    unsafe { &mut *core::ptr::addr_of_mut!(STACK_B) }
}

extern "C" fn yield_twice_a(_arg: usize) {
    for _ in 0..2 {
        LOG.lock().unwrap().push("a");
        task_yield();
    }
}

extern "C" fn yield_twice_b(_arg: usize) {
    for _ in 0..2 {
        LOG.lock().unwrap().push("b");
        task_yield();
    }
}

#[test]
#[sequential]
fn yield_is_strict_fifo() {
    let _ = env_logger::try_init();
    scoro::reset_for_tests();
    scheduler_init().unwrap();
    LOG.lock().unwrap().clear();

    let a = task_create(stack_a(), yield_twice_a, 0);
    let b = task_create(stack_b(), yield_twice_b, 0);
    task_join(a);
    task_join(b);

    assert_eq!(*LOG.lock().unwrap(), vec!["a", "b", "a", "b"]);
}

extern "C" fn sleeps_then_logs(_arg: usize) {
    task_sleep(20);
    LOG.lock().unwrap().push("woke");
}

#[test]
#[sequential]
fn sleep_wakes_after_deadline_and_join_observes_death() {
    let _ = env_logger::try_init();
    scoro::reset_for_tests();
    scheduler_init().unwrap();
    LOG.lock().unwrap().clear();

    let start = std::time::Instant::now();
    let t = task_create(stack_a(), sleeps_then_logs, 0);
    let outcome = task_join(t);
    let elapsed = start.elapsed();

    assert!(!outcome.is_cancelled());
    assert_eq!(*LOG.lock().unwrap(), vec!["woke"]);
    assert!(elapsed.as_millis() >= 20);

    // Joining an already-dead task returns immediately with no suspension.
    let outcome = task_join(t);
    assert!(!outcome.is_cancelled());
}

extern "C" fn sleeps_long(_arg: usize) {
    let outcome = task_sleep(5_000);
    LOG.lock()
        .unwrap()
        .push(if outcome.is_cancelled() { "cancelled" } else { "woke" });
}

#[test]
#[sequential]
fn cancel_wait_interrupts_a_sleeping_task() {
    let _ = env_logger::try_init();
    scoro::reset_for_tests();
    scheduler_init().unwrap();
    LOG.lock().unwrap().clear();

    let sleeper = task_create(stack_a(), sleeps_long, 0);
    // Let the sleeper actually park before cancelling it.
    task_yield();
    task_cancel_wait(sleeper);
    // Idempotent: cancelling an already-runnable task is a no-op.
    task_cancel_wait(sleeper);
    task_join(sleeper);

    assert_eq!(*LOG.lock().unwrap(), vec!["cancelled"]);
}
