//! Synchronization primitives built on the scheduler's wait/wake
//! primitives: [`Mutex`] (strict FIFO, no re-entrancy) and [`Event`]
//! (auto-reset, edge-triggered).

mod event;
mod mutex;

pub use event::Event;
pub use mutex::Mutex;
