// Both backends expose the same three entry points. Here I just want to take
// some time explaining the protocol they share.
//
// ### Suspension records
// Every time a context suspends itself inside `switch` or `switch_to_new`, a
// small record is created in that very stack frame:
// * the saved machine state (a `ucontext_t` on unix, a fiber handle on
//   windows),
// * a `resumer` pointer, written later by whichever context switches back
//   into us,
// * a parking slot for the data value that switch attaches,
// * a release slot for the stack (or fiber) of a context that has finished.
//
// The frame stays alive for exactly as long as the context is suspended --
// the switch call only returns once somebody switched back -- so a pointer to
// the record is a valid address for the whole suspension. That pointer is
// what a `Context` handle wraps. A record is written by exactly one switcher
// and read exactly once, on wake-up; after that the frame resumes execution
// and the record is dead.
//
// ### The wake-up protocol
// The first thing a context does after control returns to it, before any of
// its own code runs, is drain the release slot of its record. A context can
// never free its own stack (it is standing on it), so a finishing context
// instead parks the stack in the record of the context it resumes last, and
// resuming is what actually frees it. After that the record's resumer pointer
// and parked data are turned into the `Context` handle the switch call
// returns. A null resumer means the hand-off came from a finishing context's
// bootstrap and there is nobody to switch back to; the switch then returns
// `None`.
//
// ### Bootstrap
// A brand-new stack has no call history, so the entry closure, the attached
// data, the owned stack and the creator's record pointer travel through a
// capture struct on the creator's frame. The creator is blocked in its switch
// until the trampoline has moved all of them out, which is what makes the
// borrow sound. The unix backend hands the pointer to that struct across
// through a thread-local cell, because `makecontext` entry functions cannot
// take pointer arguments; the windows backend passes it through the fiber
// start routine's parameter.

#[cfg(target_family = "unix")]
mod unix;
#[cfg(target_family = "unix")]
pub(crate) use self::unix::*;

#[cfg(target_family = "windows")]
mod windows;
#[cfg(target_family = "windows")]
pub(crate) use self::windows::*;
