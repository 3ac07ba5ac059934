//! Run with `cargo test --features std,test-util`.
//!
//! Three tasks enqueue on one mutex in creation order A, B, C; acquisition
//! order must be A, B, C regardless of wake timing (strict FIFO hand-off,
//! no barging).

use scoro::{scheduler_init, task_create, task_join, task_yield, Mutex};
use sequential_test::sequential;
use std::mem::MaybeUninit;
use std::sync::Mutex as StdMutex;

static LOG: StdMutex<Vec<&'static str>> = StdMutex::new(Vec::new());
static THE_MUTEX: Mutex = Mutex::new();

static mut STACK_A: [MaybeUninit<u8>; 65536] = [MaybeUninit::uninit(); 65536];
static mut STACK_B: [MaybeUninit<u8>; 65536] = [MaybeUninit::uninit(); 65536];
static mut STACK_C: [MaybeUninit<u8>; 65536] = [MaybeUninit::uninit(); 65536];

extern "C" fn contend_a(_arg: usize) {
    THE_MUTEX.lock();
    LOG.lock().unwrap().push("A-lock");
    task_yield(); // give B and C a chance to enqueue while A still holds it
    THE_MUTEX.unlock();
}

extern "C" fn contend_b(_arg: usize) {
    THE_MUTEX.lock();
    LOG.lock().unwrap().push("B-lock");
    THE_MUTEX.unlock();
}

extern "C" fn contend_c(_arg: usize) {
    THE_MUTEX.lock();
    LOG.lock().unwrap().push("C-lock");
    THE_MUTEX.unlock();
}

#[test]
#[sequential]
fn mutex_hands_off_in_fifo_order() {
    let _ = env_logger::try_init();
    scoro::reset_for_tests();
    scheduler_init().unwrap();
    LOG.lock().unwrap().clear();

    let a = task_create(
        unsafe { &mut *core::ptr::addr_of_mut!(STACK_A) },
        contend_a,
        0,
    );
    let b = task_create(
        unsafe { &mut *core::ptr::addr_of_mut!(STACK_B) },
        contend_b,
        0,
    );
    let c = task_create(
        unsafe { &mut *core::ptr::addr_of_mut!(STACK_C) },
        contend_c,
        0,
    );

    task_join(a);
    task_join(b);
    task_join(c);

    assert_eq!(*LOG.lock().unwrap(), vec!["A-lock", "B-lock", "C-lock"]);
}
