//! `extern "C"` surface mirroring the Rust API, for embedders linking this
//! core from C.
//!
//! Suspending calls collapse their Rust-native outcome types down to a
//! `0`/`-1` convention. `scoro_event_wait_timeout` additionally exposes
//! the cancel/timeout distinction through an optional out-parameter,
//! since the plain `i32` return re-collapses it.

use crate::error::SchedulerError;
use crate::scheduler::{self, TaskHandle, WaitOutcome, WaitResult};
use crate::sync::{Event, Mutex};
use core::ffi::c_void;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

fn outcome_to_i32(outcome: WaitOutcome) -> i32 {
    match outcome {
        WaitOutcome::Woken => 0,
        WaitOutcome::Cancelled => -1,
    }
}

fn result_to_i32(result: WaitResult) -> i32 {
    match result {
        WaitResult::Woken => 0,
        WaitResult::TimedOut | WaitResult::Cancelled => -1,
    }
}

unsafe fn handle_from_raw(task: *mut c_void) -> TaskHandle {
    TaskHandle(NonNull::new(task as *mut crate::task::Task).expect("scoro: null task handle"))
}

#[no_mangle]
pub extern "C" fn scoro_init() -> i32 {
    match scheduler::scheduler_init() {
        Ok(()) => 0,
        Err(SchedulerError::AlreadyInitialized) => -1,
    }
}

/// `stack_ptr`/`stack_len` must describe a region that outlives the task
/// and is used for nothing else.
#[no_mangle]
pub unsafe extern "C" fn scoro_task_create(
    stack_ptr: *mut MaybeUninit<u8>,
    stack_len: usize,
    entry: extern "C" fn(usize),
    arg: usize,
) -> *mut c_void {
    let stack: &'static mut [MaybeUninit<u8>] =
        core::slice::from_raw_parts_mut(stack_ptr, stack_len);
    let handle = scheduler::task_create(stack, entry, arg);
    handle.0.as_ptr() as *mut c_void
}

#[no_mangle]
pub extern "C" fn scoro_yield() {
    scheduler::task_yield();
}

#[no_mangle]
pub extern "C" fn scoro_sleep(ms: u32) -> i32 {
    outcome_to_i32(scheduler::task_sleep(ms))
}

#[no_mangle]
pub unsafe extern "C" fn scoro_join(task: *mut c_void) -> i32 {
    outcome_to_i32(scheduler::task_join(handle_from_raw(task)))
}

#[no_mangle]
pub unsafe extern "C" fn scoro_cancel_wait(task: *mut c_void) {
    scheduler::task_cancel_wait(handle_from_raw(task));
}

#[no_mangle]
pub unsafe extern "C" fn scoro_mutex_init(m: *mut Mutex) {
    m.write(Mutex::new());
}

#[no_mangle]
pub unsafe extern "C" fn scoro_mutex_lock(m: *const Mutex) -> i32 {
    outcome_to_i32((*m).lock())
}

#[no_mangle]
pub unsafe extern "C" fn scoro_mutex_unlock(m: *const Mutex) {
    (*m).unlock();
}

#[no_mangle]
pub unsafe extern "C" fn scoro_event_init(e: *mut Event) {
    e.write(Event::new());
}

#[no_mangle]
pub unsafe extern "C" fn scoro_event_wait(e: *const Event) -> i32 {
    result_to_i32((*e).wait())
}

#[no_mangle]
pub unsafe extern "C" fn scoro_event_wait_timeout(
    e: *const Event,
    timeout_ms: u32,
    timed_out_out: *mut bool,
) -> i32 {
    let result = (*e).wait_timeout(timeout_ms);
    if !timed_out_out.is_null() {
        *timed_out_out = matches!(result, WaitResult::TimedOut);
    }
    result_to_i32(result)
}

#[no_mangle]
pub unsafe extern "C" fn scoro_event_set(e: *const Event) {
    (*e).set();
}

#[cfg(feature = "external-events")]
#[no_mangle]
pub extern "C" fn scoro_bind_external_wait(wait_fn: extern "C" fn(u32)) {
    scheduler::bind_external_wait(wait_fn);
}

#[cfg(feature = "external-events")]
#[no_mangle]
pub extern "C" fn scoro_on_external_activity() {
    scheduler::on_external_activity();
}
