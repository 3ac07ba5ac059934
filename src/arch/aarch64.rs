//! AArch64 (AAPCS64) context switch.
//!
//! Callee-saved registers per the ABI: `x19`–`x28`, the frame pointer
//! `x29`, and the link register `x30`. Unlike the x86_64 backend, AAPCS64
//! puts the first argument and the return value in the same register
//! (`x0`), so a freshly made context's fabricated `x30` can point straight
//! at [`crate::task::task_trampoline`] with no intermediate stub: the
//! transfer value already lands in `x0` where the trampoline expects its
//! argument.

use super::Context;
use core::arch::global_asm;
use core::mem::MaybeUninit;

/// Bytes pushed by `scoro_jump_context`: 6 register pairs (x19/x20 through
/// x29/x30), 16 bytes each.
const FRAME_BYTES: usize = 6 * 16;

extern "C" {
    /// Raw context switch. `x0` = pointer to store the current `sp` into,
    /// `x1` = `sp` to resume, `x2` = transfer value. Returns (in `x0`) the
    /// transfer value delivered by whoever next resumes the caller.
    fn scoro_jump_context(from_sp: *mut usize, to_sp: usize, transfer: usize) -> usize;
}

global_asm!(
    ".global scoro_jump_context",
    "scoro_jump_context:",
    "sub sp, sp, #96",
    "stp x19, x20, [sp, #0]",
    "stp x21, x22, [sp, #16]",
    "stp x23, x24, [sp, #32]",
    "stp x25, x26, [sp, #48]",
    "stp x27, x28, [sp, #64]",
    "stp x29, x30, [sp, #80]",
    "str sp, [x0]",
    "mov sp, x1",
    "ldp x19, x20, [sp, #0]",
    "ldp x21, x22, [sp, #16]",
    "ldp x23, x24, [sp, #32]",
    "ldp x25, x26, [sp, #48]",
    "ldp x27, x28, [sp, #64]",
    "ldp x29, x30, [sp, #80]",
    "add sp, sp, #96",
    "mov x0, x2",
    "ret",
);

pub(crate) fn make_context(
    stack: &mut [MaybeUninit<u8>],
    entry: unsafe extern "C" fn(usize) -> !,
) -> Context {
    debug_assert!(stack.len() >= FRAME_BYTES);
    debug_assert_eq!(
        entry as usize, crate::task::task_trampoline as usize,
        "aarch64 backend only supports resuming into task::task_trampoline"
    );

    let top = stack.as_mut_ptr().wrapping_add(stack.len()) as usize;
    let sp = (top & !(super::STACK_ALIGN - 1)) - FRAME_BYTES;
    // Safety: `sp` lands inside `stack`, moved down by a small, bounded
    // frame from a 16-aligned address at or below `top`.
    unsafe {
        let words = sp as *mut usize;
        *words.add(0) = 0; // x19
        *words.add(1) = 0; // x20
        *words.add(2) = 0; // x21
        *words.add(3) = 0; // x22
        *words.add(4) = 0; // x23
        *words.add(5) = 0; // x24
        *words.add(6) = 0; // x25
        *words.add(7) = 0; // x26
        *words.add(8) = 0; // x27
        *words.add(9) = 0; // x28
        *words.add(10) = 0; // x29 (fp)
        *words.add(11) = crate::task::task_trampoline as usize; // x30 (lr)
    }
    Context { sp: sp as *mut u8 }
}

pub(crate) unsafe fn jump_context(from: *mut Context, to: Context, transfer: usize) -> usize {
    let mut saved_sp: usize = 0;
    let ret = scoro_jump_context(&mut saved_sp, to.sp as usize, transfer);
    (*from).sp = saved_sp as *mut u8;
    ret
}
