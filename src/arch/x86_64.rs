//! x86_64 (System V AMD64) context switch.
//!
//! Callee-saved registers per the ABI: `rbx`, `rbp`, `r12`–`r15`. `rsp` is
//! the value carried in [`super::Context`]; every other callee-saved
//! register is pushed onto the suspending stack by `scoro_jump_context` and
//! popped by whichever call resumes it.

use super::Context;
use core::arch::global_asm;
use core::mem::MaybeUninit;

/// Number of 8-byte words the asm frame below pushes: rbp, rbx, r12..r15,
/// plus the fabricated/real return address.
const FRAME_WORDS: usize = 7;

extern "C" {
    /// Raw context switch. Arguments arrive per SysV: `rdi` = pointer to
    /// store the current `rsp` into, `rsi` = `rsp` to resume, `rdx` =
    /// transfer value. Returns (in `rax`) the transfer value delivered by
    /// whoever next resumes the caller.
    fn scoro_jump_context(from_sp: *mut usize, to_sp: usize, transfer: usize) -> usize;

    /// Entered by `ret` on a freshly made context with the transfer value
    /// (a `*const Task` cast to `usize`) still sitting in `rax`; forwards it
    /// into `rdi` and tail-jumps into the real Rust entry point.
    fn scoro_trampoline_entry();
}

global_asm!(
    ".global scoro_jump_context",
    "scoro_jump_context:",
    "push rbp",
    "push rbx",
    "push r12",
    "push r13",
    "push r14",
    "push r15",
    "mov [rdi], rsp",
    "mov rsp, rsi",
    "pop r15",
    "pop r14",
    "pop r13",
    "pop r12",
    "pop rbx",
    "pop rbp",
    "mov rax, rdx",
    "ret",
);

global_asm!(
    ".global scoro_trampoline_entry",
    "scoro_trampoline_entry:",
    "mov rdi, rax",
    "jmp {entry}",
    entry = sym crate::task::task_trampoline,
);

pub(crate) fn make_context(
    stack: &mut [MaybeUninit<u8>],
    entry: unsafe extern "C" fn(usize) -> !,
) -> Context {
    debug_assert!(stack.len() >= (FRAME_WORDS + 1) * core::mem::size_of::<usize>());
    // `entry` is threaded through `scoro_trampoline_entry`, which always
    // forwards into `task::task_trampoline`; the concrete function pointer
    // isn't needed here because the asm trampoline is not parameterized,
    // but we still assert the caller passed the expected symbol so a
    // future refactor that tries to customize it fails loudly instead of
    // silently jumping to the wrong place.
    debug_assert_eq!(
        entry as usize, crate::task::task_trampoline as usize,
        "x86_64 backend only supports resuming into task::task_trampoline"
    );

    let top = stack.as_mut_ptr().wrapping_add(stack.len()) as usize;
    let aligned_top = top & !(super::STACK_ALIGN - 1);
    // `scoro_jump_context` sets rsp to `sp`, pops 6 callee-saved words, then
    // `ret`s to the 7th (the fabricated return address) — rsp grows by the
    // whole `FRAME_WORDS * 8` on the way in. The ABI requires rsp ≡ 8 (mod
    // 16) at the first instruction of a function, i.e. right after `ret`
    // (equivalently, right after a `call` pushed its own return address
    // onto a 16-aligned rsp). So `sp + FRAME_WORDS*8` must be ≡ 8 (mod 16);
    // with `aligned_top` at 16 and `FRAME_WORDS*8` itself ≡ 8 (mod 16: 7*8
    // = 56), `sp == aligned_top - FRAME_WORDS*8` would only land rsp at 0
    // (mod 16) post-ret. One extra 8-byte pad fixes it.
    let sp = aligned_top
        - FRAME_WORDS * core::mem::size_of::<usize>()
        - core::mem::size_of::<usize>();
    // Safety: `sp` lands inside `stack` because we only moved it down by a
    // small, bounded frame from a 16-aligned address at or below `top`.
    unsafe {
        let words = sp as *mut usize;
        *words.add(0) = 0; // r15
        *words.add(1) = 0; // r14
        *words.add(2) = 0; // r13
        *words.add(3) = 0; // r12
        *words.add(4) = 0; // rbx
        *words.add(5) = 0; // rbp
        *words.add(6) = scoro_trampoline_entry as usize; // fabricated return address
    }
    Context { sp: sp as *mut u8 }
}

pub(crate) unsafe fn jump_context(from: *mut Context, to: Context, transfer: usize) -> usize {
    let mut saved_sp: usize = 0;
    let ret = scoro_jump_context(&mut saved_sp, to.sp as usize, transfer);
    (*from).sp = saved_sp as *mut u8;
    ret
}
