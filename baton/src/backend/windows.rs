use std::cell::Cell;
use std::io::Error;
use std::mem::{ManuallyDrop, MaybeUninit};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::process;
use std::ptr;

use winapi::shared::basetsd::SIZE_T;
use winapi::shared::minwindef::LPVOID;
use winapi::um::winbase::{ConvertThreadToFiber, CreateFiber, DeleteFiber, SwitchToFiber};

use crate::Context;

thread_local! {
    /// The fiber currently executing on this thread. Windows offers no way
    /// to hand a value across `SwitchToFiber`, so every switch stores the
    /// destination here right before jumping and a suspension record picks
    /// its own fiber up from here.
    static CURRENT_FIBER: Cell<LPVOID> = Cell::new(ptr::null_mut());
}

/// A fiber created by `CreateFiber`; deleting it releases its stack.
struct OwnedFiber(LPVOID);

impl Drop for OwnedFiber {
    fn drop(&mut self) {
        unsafe { DeleteFiber(self.0) };
    }
}

/// One suspension point of a context. Lives in the frame of the switch call
/// that suspended the context and stays valid until that call resumes.
pub(crate) struct Record<D> {
    /// The fiber this record's context runs on; `SwitchToFiber` resumes it
    /// at its most recent suspension point, which is exactly this record.
    fiber: LPVOID,

    // Written by the context switching into us.
    resumer: *mut Record<D>,
    data: MaybeUninit<D>,

    // Written by a finishing context on its way out; drained on wake-up.
    fiber_to_delete: Option<OwnedFiber>,
}

impl<D> Record<D> {
    fn new(fiber: LPVOID) -> Record<D> {
        Record {
            fiber,
            resumer: ptr::null_mut(),
            data: MaybeUninit::uninit(),
            fiber_to_delete: None,
        }
    }

    /// Runs the wake-up protocol after control has returned to this record:
    /// delete the fiber of whatever context ran to completion before us,
    /// then turn the resumer pointer and its parked data into a handle.
    ///
    /// The data slot is only initialized when `resumer` is non-null; a null
    /// resumer is a finishing context's final hand-off, which attaches
    /// nothing.
    unsafe fn wake(&mut self) -> Option<Context<D>> {
        drop(self.fiber_to_delete.take());
        if self.resumer.is_null() {
            None
        } else {
            let data = self.data.as_ptr().read();
            Some(Context::from_record(self.resumer, data))
        }
    }
}

/// Turns the calling thread into a fiber on first use, so that the thread's
/// original flow of execution can be suspended and resumed like any other
/// context. Returns the fiber currently running.
fn current_fiber() -> Result<LPVOID, Error> {
    CURRENT_FIBER.with(|cell| {
        if cell.get().is_null() {
            let fiber = unsafe { ConvertThreadToFiber(ptr::null_mut()) };
            if fiber.is_null() {
                return Err(Error::last_os_error());
            }
            cell.set(fiber);
        }
        Ok(cell.get())
    })
}

/// Everything the fiber start routine needs to start a new context, built on
/// the creator's frame. The creator stays suspended in `switch_to_new` until
/// the start routine has moved every field out.
struct Bootstrap<D, F> {
    entry: ManuallyDrop<F>,
    data: ManuallyDrop<D>,
    creator: *mut Record<D>,
}

pub(crate) fn switch<D>(target: Context<D>, data: D) -> Result<Option<Context<D>>, Error> {
    let fiber = current_fiber()?;
    let (target, attached) = target.into_raw();
    // Whatever the target attached when it last switched away was for us; it
    // ends here, before we suspend.
    drop(attached);

    let mut record = Record::new(fiber);
    let record: *mut Record<D> = &mut record;
    unsafe {
        let target = target.as_ptr();
        (*target).resumer = record;
        (*target).data = MaybeUninit::new(data);

        CURRENT_FIBER.with(|cell| cell.set((*target).fiber));
        SwitchToFiber((*target).fiber);

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
    let fiber = current_fiber()?;

    let mut record = Record::new(fiber);
    let record: *mut Record<D> = &mut record;
    let mut bootstrap = Bootstrap {
        entry: ManuallyDrop::new(entry),
        data: ManuallyDrop::new(data),
        creator: record,
    };

    let new_fiber = unsafe {
        CreateFiber(
            stack_size as SIZE_T,
            Some(fiber_entry::<D, F>),
            &mut bootstrap as *mut Bootstrap<D, F> as LPVOID,
        )
    };
    if new_fiber.is_null() {
        // The entry function never ran; everything is still ours to clean up.
        unsafe {
            ManuallyDrop::drop(&mut bootstrap.entry);
            ManuallyDrop::drop(&mut bootstrap.data);
        }
        return Err(Error::last_os_error());
    }

    unsafe {
        CURRENT_FIBER.with(|cell| cell.set(new_fiber));
        SwitchToFiber(new_fiber);

        Ok((*record).wake())
    }
}

/// First code to run on a new fiber. Moves the capture out of the creator's
/// frame, runs the entry closure and leaves for good, handing its own fiber
/// to whichever context the closure returned.
unsafe extern "system" fn fiber_entry<D, F>(param: LPVOID)
where
    D: 'static,
    F: FnOnce(Context<D>) -> Context<D> + 'static,
{
    let bootstrap = param as *mut Bootstrap<D, F>;
    let (entry, data, creator) = {
        let bootstrap = &mut *bootstrap;
        (
            ManuallyDrop::take(&mut bootstrap.entry),
            ManuallyDrop::take(&mut bootstrap.data),
            bootstrap.creator,
        )
    };
    let fiber = CURRENT_FIBER.with(|cell| cell.get());

    let caller = Context::from_record(creator, data);
    // It is not safe to unwind across the bottom of a fresh fiber, and once
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
    // Nothing after the SwitchToFiber below ever runs, so anything that
    // still needs dropping has to go now.
    drop(attached);
    let next = next.as_ptr();
    (*next).resumer = ptr::null_mut();
    (*next).fiber_to_delete = Some(OwnedFiber(fiber));
    CURRENT_FIBER.with(|cell| cell.set((*next).fiber));
    SwitchToFiber((*next).fiber);

    // Returning from a fiber start routine exits the whole thread; a context
    // that has handed its fiber over must never run again.
    eprintln!("baton: a finished context was resumed");
    process::abort();
}
