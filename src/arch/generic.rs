//! Stand-in backend for any architecture without a real context-switch
//! implementation above. Exists so the crate still compiles on an
//! unexercised target; actually creating or switching into a task on such
//! a target is a build-time mistake, not a runtime condition, so this
//! panics rather than returning a sentinel, the same choice made for the
//! no-op hooks on hosts that never schedule a real thread.

use super::Context;
use core::mem::MaybeUninit;

pub(crate) fn make_context(
    _stack: &mut [MaybeUninit<u8>],
    _entry: unsafe extern "C" fn(usize) -> !,
) -> Context {
    panic!("scoro: no context-switch backend for this target architecture");
}

pub(crate) unsafe fn jump_context(_from: *mut Context, _to: Context, _transfer: usize) -> usize {
    panic!("scoro: no context-switch backend for this target architecture");
}
