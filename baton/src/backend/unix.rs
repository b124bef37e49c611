use std::cell::Cell;
use std::io::Error;
use std::mem::{ManuallyDrop, MaybeUninit};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::process;
use std::ptr;

use crate::stack::{GuardedStack, Stack};
use crate::Context;

/// One suspension point of a context. Lives in the frame of the switch call
/// that suspended the context and stays valid until that call resumes.
pub(crate) struct Record<D> {
    ucontext: libc::ucontext_t,

    // Written by the context switching into us.
    resumer: *mut Record<D>,
    data: MaybeUninit<D>,

    // Written by a finishing context on its way out; drained on wake-up.
    stack_to_free: Option<GuardedStack>,
}

impl<D> Record<D> {
    fn new() -> Record<D> {
        Record {
            // Filled in by swapcontext before anything reads it.
            ucontext: unsafe { std::mem::zeroed() },
            resumer: ptr::null_mut(),
            data: MaybeUninit::uninit(),
            stack_to_free: None,
        }
    }

    /// Runs the wake-up protocol after control has returned to this record:
    /// release the stack of whatever context ran to completion before us,
    /// then turn the resumer pointer and its parked data into a handle.
    ///
    /// The data slot is only initialized when `resumer` is non-null; a null
    /// resumer is a finishing context's final hand-off, which attaches
    /// nothing.
    unsafe fn wake(&mut self) -> Option<Context<D>> {
        drop(self.stack_to_free.take());
        if self.resumer.is_null() {
            None
        } else {
            let data = self.data.as_ptr().read();
            Some(Context::from_record(self.resumer, data))
        }
    }
}

thread_local! {
    /// Hands the bootstrap capture into a brand-new stack. `makecontext`
    /// entry functions take no pointer arguments, so the creator parks a
    /// pointer here right before its switch and the trampoline takes it
    /// back out as its first action.
    static BOOTSTRAP: Cell<*mut ()> = Cell::new(ptr::null_mut());
}

/// Everything the trampoline needs to start a new context, built on the
/// creator's frame. The creator stays suspended in `switch_to_new` until the
/// trampoline has moved every field out, so the pointer it parks in
/// `BOOTSTRAP` never outlives the data behind it.
struct Bootstrap<D, F> {
    entry: ManuallyDrop<F>,
    data: ManuallyDrop<D>,
    stack: ManuallyDrop<GuardedStack>,
    creator: *mut Record<D>,
}

pub(crate) fn switch<D>(target: Context<D>, data: D) -> Result<Option<Context<D>>, Error> {
    let (target, attached) = target.into_raw();
    // Whatever the target attached when it last switched away was for us; it
    // ends here, before we suspend.
    drop(attached);

    let mut record = Record::new();
    let record: *mut Record<D> = &mut record;
    unsafe {
        let target = target.as_ptr();
        (*target).resumer = record;
        (*target).data = MaybeUninit::new(data);

        if libc::swapcontext(&mut (*record).ucontext, &(*target).ucontext) == -1 {
            // No switch happened. Take our writes back out of the target's
            // record so it is left exactly as suspended.
            (*target).resumer = ptr::null_mut();
            drop((*target).data.as_ptr().read());
            return Err(Error::last_os_error());
        }

        Ok((*record).wake())
    }
}

pub(crate) fn switch_to_new<D, F>(
    stack_size: usize,
    data: D,
    entry: F,
) -> Result<Option<Context<D>>, Error>
where
    D: 'static,
    F: FnOnce(Context<D>) -> Context<D> + 'static,
{
    let stack = GuardedStack::new(stack_size)?;

    let mut new_ucontext: libc::ucontext_t = unsafe { std::mem::zeroed() };
    if unsafe { libc::getcontext(&mut new_ucontext) } == -1 {
        return Err(Error::last_os_error());
    }
    new_ucontext.uc_stack.ss_sp = stack.top() as *mut libc::c_void;
    new_ucontext.uc_stack.ss_size = stack.size();
    new_ucontext.uc_link = ptr::null_mut();
    unsafe { libc::makecontext(&mut new_ucontext, trampoline::<D, F>, 0) };

    let mut record = Record::new();
    let record: *mut Record<D> = &mut record;
    let mut bootstrap = Bootstrap {
        entry: ManuallyDrop::new(entry),
        data: ManuallyDrop::new(data),
        stack: ManuallyDrop::new(stack),
        creator: record,
    };
    BOOTSTRAP.with(|cell| cell.set(&mut bootstrap as *mut Bootstrap<D, F> as *mut ()));

    unsafe {
        if libc::swapcontext(&mut (*record).ucontext, &new_ucontext) == -1 {
            // The entry function never ran; everything is still ours to
            // clean up.
            BOOTSTRAP.with(|cell| cell.set(ptr::null_mut()));
            ManuallyDrop::drop(&mut bootstrap.entry);
            ManuallyDrop::drop(&mut bootstrap.data);
            ManuallyDrop::drop(&mut bootstrap.stack);
            return Err(Error::last_os_error());
        }

        Ok((*record).wake())
    }
}

/// First code to run on a new stack. Moves the capture out of the creator's
/// frame, runs the entry closure and leaves for good, handing its own stack
/// to whichever context the closure returned.
extern "C" fn trampoline<D, F>()
where
    D: 'static,
    F: FnOnce(Context<D>) -> Context<D> + 'static,
{
    let bootstrap = BOOTSTRAP.with(|cell| cell.replace(ptr::null_mut())) as *mut Bootstrap<D, F>;
    debug_assert!(!bootstrap.is_null());

    let (entry, data, stack, creator) = unsafe {
        let bootstrap = &mut *bootstrap;
        (
            ManuallyDrop::take(&mut bootstrap.entry),
            ManuallyDrop::take(&mut bootstrap.data),
            ManuallyDrop::take(&mut bootstrap.stack),
            bootstrap.creator,
        )
    };

    let caller = unsafe { Context::from_record(creator, data) };
    // It is not safe to unwind across the bottom of a fresh stack, and once
    // the creator has been resumed elsewhere there is no context we could
    // report the panic to. Fail fast instead.
    let next = match catch_unwind(AssertUnwindSafe(move || entry(caller))) {
        Ok(next) => next,
        Err(_) => {
            eprintln!("baton: panic escaped a context entry function");
            process::abort();
        }
    };

    let (next, attached) = next.into_raw();
    // Nothing after the setcontext below ever runs, so anything that still
    // needs dropping has to go now.
    drop(attached);
    unsafe {
        let next = next.as_ptr();
        (*next).resumer = ptr::null_mut();
        (*next).stack_to_free = Some(stack);
        let _ = libc::setcontext(&(*next).ucontext);
    }
    // setcontext only returns on failure, and at this point no context is
    // left that could run.
    eprintln!("baton: failed to leave a finished context");
    process::abort();
}
