use std::io::{Error, ErrorKind};
use std::ptr;

use libc::{mmap, mprotect, munmap};
use libc::{MAP_ANON, MAP_FAILED, MAP_NORESERVE, MAP_PRIVATE, PROT_NONE, PROT_READ, PROT_WRITE};

use super::{page_size, Stack};

/// A stack of caller-chosen size with one guard page below the usable area,
/// so that running off the end faults instead of silently overwriting
/// whatever the allocator placed next to it.
///
/// Layout, from low to high addresses:
/// ```text
/// ptr          ptr + page         ptr + page + size
///  +-- guard ---+----- usable -----+
///  | PROT_NONE  |  PROT_READ|WRITE |
/// ```
pub struct GuardedStack {
    ptr: *mut u8,
    size: usize,
}

impl Stack for GuardedStack {
    fn new(size: usize) -> Result<Self, Error> {
        let page = page_size();
        // Round the usable area up to whole pages; a zero request still gets
        // one page. The guard page comes on top of the requested size.
        let size = match size.checked_add(page - 1) {
            Some(padded) => (padded / page).max(1) * page,
            None => return Err(Error::new(ErrorKind::InvalidInput, "stack size too large")),
        };
        let total = match size.checked_add(page) {
            Some(total) => total,
            None => return Err(Error::new(ErrorKind::InvalidInput, "stack size too large")),
        };

        unsafe {
            let ptr = mmap(
                ptr::null_mut(),
                total,
                PROT_READ | PROT_WRITE,
                MAP_PRIVATE | MAP_ANON | MAP_NORESERVE,
                -1,
                0,
            );
            if ptr == MAP_FAILED {
                return Err(Error::last_os_error());
            }
            if mprotect(ptr, page, PROT_NONE) != 0 {
                let err = Error::last_os_error();
                munmap(ptr, total);
                return Err(err);
            }
            Ok(Self {
                ptr: ptr as *mut u8,
                size,
            })
        }
    }

    fn bottom(&self) -> *mut u8 {
        unsafe { self.ptr.add(page_size() + self.size) }
    }

    fn top(&self) -> *mut u8 {
        unsafe { self.ptr.add(page_size()) }
    }

    fn size(&self) -> usize {
        self.size
    }
}

impl Drop for GuardedStack {
    fn drop(&mut self) {
        let total = page_size() + self.size;
        let result = unsafe { munmap(self.ptr as *mut libc::c_void, total) };
        debug_assert_eq!(result, 0);
    }
}
