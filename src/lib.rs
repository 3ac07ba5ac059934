//! `scoro`: a cooperative, stackful coroutine runtime for resource
//! constrained and desktop targets.
//!
//! Tasks run on caller-supplied stacks and are switched between by a
//! single-threaded cooperative scheduler; no dynamic allocation happens
//! anywhere in this crate.
#![cfg_attr(not(feature = "std"), no_std)]

mod arch;
mod error;
mod list;
mod scheduler;
mod sync;
mod task;
mod timer;

#[cfg(feature = "c-api")]
pub mod c_api;

pub use error::SchedulerError;
pub use scheduler::{
    scheduler_init, task_cancel_wait, task_create, task_join, task_sleep, task_yield, TaskHandle,
    WaitOutcome, WaitResult,
};
pub use sync::{Event, Mutex};
pub use task::EntryFn;

#[cfg(feature = "external-events")]
pub use scheduler::{bind_external_wait, on_external_activity, take_external_activity};

#[cfg(not(feature = "std"))]
pub use timer::on_tick;

#[cfg(feature = "test-util")]
pub use scheduler::reset_for_tests;
