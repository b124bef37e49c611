//! Baton provides symmetric context switches between stackful, cooperatively
//! scheduled contexts on one OS thread.
//!
//! It consists of two parts:
//! 1. A stack allocator (unix only; Windows fibers bring their own stacks).
//! 2. A [`Context`](struct.Context.html) handle with the switch operations.
//!
//! Unlike a generator, where control always bounces between a coroutine and
//! its caller, a context may switch to *any* suspended context, which makes
//! pipelines, rings and producer/consumer pairs possible without a scheduler
//! in the middle. The price is that a handle is consumed by the switch: once
//! you have switched away you hold nothing, and whoever resumes you hands
//! you a fresh handle to itself.
//!
//! ## Example
//! ```
//! use baton::{switch_to_new, Context};
//!
//! fn main() {
//!     let helper = switch_to_new(64 * 1024, 1, |main: Context<i32>| {
//!         // We run on the new stack, holding a handle to our creator,
//!         // which carries the value it attached.
//!         assert_eq!(*main.data(), 1);
//!         main
//!     })
//!     .unwrap();
//!
//!     // The entry function returned the creating context instead of
//!     // switching back to it, so nothing resumed us.
//!     assert!(helper.is_none());
//! }
//! ```
//!
//! ## Lifecycle
//!
//! A context created with [`switch_to_new`](fn.switch_to_new.html) cannot
//! simply return from its entry function; a fresh stack has nowhere to
//! return to. The closure therefore runs until it produces the next context
//! to hand control to, and that hand-off also carries the dying context's
//! stack along, to be freed by the next context as its first action. Only
//! the thread's original context ends the program naturally.
//!
//! Handles are not `Send`: a context belongs to the thread that created it,
//! and there is no locking anywhere because only one context per thread can
//! ever be running.

mod backend;
#[cfg(unix)]
pub mod stack;

use std::io::Error;
use std::ptr::NonNull;

use backend::Record;

/// An owned handle to one suspended context.
///
/// A handle is obtained either by being resumed (the switch that suspended
/// you returns the context that woke you up) or from the entry function's
/// argument (the creating context). Switching consumes the handle, so a
/// suspended context can only be resumed once per suspension, and a running
/// context is never reachable through any handle.
pub struct Context<D> {
    record: NonNull<Record<D>>,
    data: D,
}

impl<D> Context<D> {
    /// Suspends the calling context and resumes this one, making `data`
    /// available to it through [`data`](struct.Context.html#method.data).
    ///
    /// Returns when something switches back to the caller:
    /// `Ok(Some(context))` carries whoever resumed us, `Ok(None)` means a
    /// finishing context handed control back out with nobody left to return
    /// to. `Err` reports an operating system failure to save or restore
    /// execution state; no switch happened and the target is untouched.
    pub fn switch(self, data: D) -> Result<Option<Context<D>>, Error> {
        backend::switch(self, data)
    }

    /// Returns the value attached by the switch that produced this handle.
    ///
    /// A pure read; the attached value is set fresh on every switch and
    /// does not survive into later suspensions.
    pub fn data(&self) -> &D {
        &self.data
    }

    pub(crate) unsafe fn from_record(record: *mut Record<D>, data: D) -> Context<D> {
        Context {
            record: NonNull::new_unchecked(record),
            data,
        }
    }

    pub(crate) fn into_raw(self) -> (NonNull<Record<D>>, D) {
        (self.record, self.data)
    }
}

/// Creates a context with its own stack of (at least) `stack_size` bytes and
/// switches to it. Resuming it for the first time means running `entry` on
/// the new stack, with the calling context passed in as its argument.
///
/// The entry function must produce the next context to run; returning is
/// what ends the context, and the returned target is resumed with the
/// now-finished context's stack in tow for deferred release. A panic that
/// escapes `entry` aborts the process, since there is no caller left to
/// unwind into.
///
/// If the stack (or fiber) cannot be created this returns `Err` without
/// running `entry` and without leaving any trace of the failed context
/// behind. Callers can retry with a smaller stack or give up on that
/// context's task; the calling context itself is unaffected.
pub fn switch_to_new<D, F>(stack_size: usize, data: D, entry: F) -> Result<Option<Context<D>>, Error>
where
    D: 'static,
    F: FnOnce(Context<D>) -> Context<D> + 'static,
{
    backend::switch_to_new(stack_size, data, entry)
}
