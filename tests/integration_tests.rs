//! Run with `cargo test --features std,test-util`.
//!
//! Two sub-tasks sleep repeatedly while main yields a few times and then
//! joins both, with a final marker logged only after both have been
//! observed dead. Sleep durations are scaled down to keep the suite fast;
//! the ordering guarantees being tested don't depend on the absolute
//! duration.

use scoro::{scheduler_init, task_create, task_join, task_sleep, task_yield};
use sequential_test::sequential;
use std::mem::MaybeUninit;
use std::sync::Mutex;

const SHORT_MS: u32 = 15;
const ITERS: usize = 3;

static LOG: Mutex<Vec<String>> = Mutex::new(Vec::new());

static mut STACK_1: [MaybeUninit<u8>; 65536] = [MaybeUninit::uninit(); 65536];
static mut STACK_2: [MaybeUninit<u8>; 65536] = [MaybeUninit::uninit(); 65536];

extern "C" fn sub_task_1(_arg: usize) {
    for i in 0..ITERS {
        LOG.lock().unwrap().push(format!("sub1-{i}"));
        task_sleep(SHORT_MS);
    }
}

extern "C" fn sub_task_2(_arg: usize) {
    for i in 0..ITERS {
        LOG.lock().unwrap().push(format!("sub2-{i}"));
        task_sleep(SHORT_MS * 2);
    }
}

#[test]
#[sequential]
fn two_sleepers_run_to_completion_then_main_joins_both() {
    let _ = env_logger::try_init();
    scoro::reset_for_tests();
    scheduler_init().unwrap();
    LOG.lock().unwrap().clear();

    let s1 = task_create(
        unsafe { &mut *core::ptr::addr_of_mut!(STACK_1) },
        sub_task_1,
        0,
    );
    let s2 = task_create(
        unsafe { &mut *core::ptr::addr_of_mut!(STACK_2) },
        sub_task_2,
        0,
    );

    for i in 0..4 {
        LOG.lock().unwrap().push(format!("main-{i}"));
        task_yield();
    }

    let r1 = task_join(s1);
    let r2 = task_join(s2);
    LOG.lock().unwrap().push("all task is over".to_string());

    assert!(!r1.is_cancelled());
    assert!(!r2.is_cancelled());

    let log = LOG.lock().unwrap();
    assert_eq!(log.last().unwrap(), "all task is over");
    assert_eq!(log.iter().filter(|l| l.starts_with("main-")).count(), 4);
    assert_eq!(log.iter().filter(|l| l.starts_with("sub1-")).count(), ITERS);
    assert_eq!(log.iter().filter(|l| l.starts_with("sub2-")).count(), ITERS);

    // Every subtask iteration was logged strictly before the closing
    // marker, which task_join guarantees by blocking until DEAD.
    let over = log.iter().position(|l| l == "all task is over").unwrap();
    assert_eq!(over, log.len() - 1);
}
