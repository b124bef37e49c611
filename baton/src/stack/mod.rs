mod guarded;
pub use guarded::GuardedStack;

use std::sync::atomic::{AtomicUsize, Ordering};

pub trait Stack: Sized {
    /// Returns a new stack with at least `size` usable bytes.
    fn new(size: usize) -> Result<Self, std::io::Error>;

    /// Returns a pointer to the bottom of the stack.
    /// The first stack frame grows down from here.
    fn bottom(&self) -> *mut u8;

    /// Returns a pointer to the top of the stack, the lowest usable address.
    fn top(&self) -> *mut u8;

    /// Returns the usable size of the stack in bytes.
    fn size(&self) -> usize;
}

/// Returns page size in bytes
pub fn page_size() -> usize {
    #[cold]
    fn sys_page_size() -> usize {
        unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
    }

    static PAGE_SIZE_CACHE: AtomicUsize = AtomicUsize::new(0);
    match PAGE_SIZE_CACHE.load(Ordering::Relaxed) {
        0 => {
            let page_size = sys_page_size();
            PAGE_SIZE_CACHE.store(page_size, Ordering::Relaxed);
            page_size
        }
        page_size => page_size,
    }
}
