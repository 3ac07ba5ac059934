//! Machine-context save/restore: the one piece of the runtime that is
//! genuinely architecture-specific.
//!
//! The rest of the scheduler only ever touches [`Context`] through
//! [`make_context`] and [`jump_context`]; neither function nor the layout of
//! `Context` is visible outside the crate. A target that isn't one of the
//! architectures below still compiles against the [`generic`] backend, whose
//! functions exist but panic if actually called, for architectures nobody
//! is exercising in a given build.

use core::mem::MaybeUninit;

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        mod x86_64;
        use x86_64 as imp;
    } else if #[cfg(target_arch = "aarch64")] {
        mod aarch64;
        use aarch64 as imp;
    } else {
        mod generic;
        use generic as imp;
    }
}

/// Minimum alignment `make_context` requires of the stack it is handed.
///
/// Both supported backends fabricate a callee-saved register frame that
/// must land on a 16-byte boundary for the target ABI's stack-alignment
/// rule to hold once control enters the task's Rust code.
pub(crate) const STACK_ALIGN: usize = 16;

/// Opaque saved machine context for one suspended task.
///
/// Holds nothing but the stack pointer at the moment of suspension: every
/// other register the ABI requires a callee to preserve lives on the
/// task's own stack, pushed there by [`jump_context`] and popped by the
/// next [`jump_context`] that resumes this context. This is the same
/// "fcontext" technique Boost.Context and the `corosensei`/`generator`
/// crates use.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct Context {
    sp: *mut u8,
}

impl Context {
    /// A context that must never actually be jumped into — used only to
    /// give the "main" pseudo-task's `Context` a value before its first
    /// real suspension overwrites it.
    pub(crate) const fn dangling() -> Context {
        Context {
            sp: core::ptr::null_mut(),
        }
    }
}

// Safety: a `Context` is only ever touched by the single scheduler thread
// that owns the task it belongs to; it crosses thread boundaries only via
// `on_external_activity`'s documented synchronization (see scheduler.rs).
unsafe impl Send for Context {}

/// Prepares a fresh machine context whose first resumption executes
/// `entry`, called with the `usize` delivered by that first
/// [`jump_context`].
///
/// `stack` must be at least [`STACK_ALIGN`]-aligned at both ends and large
/// enough to hold the fabricated register frame (a few dozen bytes) plus
/// whatever the task itself needs; `task_create` is responsible for both.
pub(crate) fn make_context(
    stack: &mut [MaybeUninit<u8>],
    entry: unsafe extern "C" fn(usize) -> !,
) -> Context {
    imp::make_context(stack, entry)
}

/// Saves the current machine state into `*from` and resumes `to`,
/// delivering `transfer` to the resumed side.
///
/// Returns the transfer value passed by whoever later resumes `from`.
///
/// # Safety
///
/// `to` must be a context previously produced by [`make_context`] or
/// previously suspended by a `jump_context` call whose `from` was `to`'s
/// address, and its stack must still be valid. `from` must point at a
/// `Context` this call is allowed to overwrite.
pub(crate) unsafe fn jump_context(from: *mut Context, to: Context, transfer: usize) -> usize {
    imp::jump_context(from, to, transfer)
}
