//! The one fallible, non-suspending entry point in the API.

use core::fmt;

/// Failure from [`crate::scheduler_init`]. The only realistic,
/// recoverable embedder mistake in the whole surface — everything else
/// suspending returns a [`crate::WaitOutcome`]/[`crate::WaitResult`] or is
/// a debug-assertion invariant, not a runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    AlreadyInitialized,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::AlreadyInitialized => {
                f.write_str("scoro: scheduler_init called more than once")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SchedulerError {}
