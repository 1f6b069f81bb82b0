//! Host virtual memory through `libc`.
//!
//! [`SystemPages`] is the production [`PageSource`]: `sysconf` for the
//! page size, `mmap(PROT_NONE)` to reserve, `mprotect` to commit and
//! `munmap` to release. Each `unsafe` call carries a `// SAFETY:` note.

#![allow(unsafe_code)]

use std::ptr::NonNull;

use vmpool_core::{PageError, PageOp, PageSource};

/// Page size assumed when the host cannot report one.
const FALLBACK_PAGE_SIZE: usize = 4096;

/// The host's virtual memory interface.
///
/// The page size is queried once in [`SystemPages::new`] and cached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SystemPages {
    page_size: usize,
}

impl SystemPages {
    /// Query the host page size and build a source around it.
    pub fn new() -> Self {
        Self {
            page_size: host_page_size(),
        }
    }
}

impl Default for SystemPages {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn host_page_size() -> usize {
    // SAFETY: sysconf reads a configuration value and has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    match usize::try_from(size) {
        Ok(size) if size.is_power_of_two() => size,
        _ => FALLBACK_PAGE_SIZE,
    }
}

#[cfg(not(unix))]
fn host_page_size() -> usize {
    FALLBACK_PAGE_SIZE
}

#[cfg(unix)]
impl PageSource for SystemPages {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn reserve(&self, len: usize) -> Result<NonNull<u8>, PageError> {
        // SAFETY: a private anonymous mapping with a null hint never
        // aliases existing memory.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(PageError::last_os_error(PageOp::Reserve, len));
        }
        NonNull::new(ptr.cast::<u8>()).ok_or(PageError::new(PageOp::Reserve, len))
    }

    unsafe fn commit(&self, addr: NonNull<u8>, len: usize) -> Result<(), PageError> {
        // SAFETY: the caller guarantees addr..addr + len is page-aligned and
        // inside a live reservation from this source.
        let rc = unsafe {
            libc::mprotect(
                addr.as_ptr().cast::<libc::c_void>(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
            )
        };
        if rc == -1 {
            return Err(PageError::last_os_error(PageOp::Commit, len));
        }
        Ok(())
    }

    unsafe fn release(&self, base: NonNull<u8>, len: usize) -> Result<(), PageError> {
        // SAFETY: the caller guarantees base/len describe exactly one live
        // reservation that nothing will touch again.
        let rc = unsafe { libc::munmap(base.as_ptr().cast::<libc::c_void>(), len) };
        if rc == -1 {
            return Err(PageError::last_os_error(PageOp::Release, len));
        }
        Ok(())
    }
}

// Only unix hosts are supported; elsewhere every reservation fails and
// arenas report `ArenaError::Reserve` on first use.
#[cfg(not(unix))]
impl PageSource for SystemPages {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn reserve(&self, len: usize) -> Result<NonNull<u8>, PageError> {
        Err(PageError::new(PageOp::Reserve, len))
    }

    unsafe fn commit(&self, _addr: NonNull<u8>, len: usize) -> Result<(), PageError> {
        Err(PageError::new(PageOp::Commit, len))
    }

    unsafe fn release(&self, _base: NonNull<u8>, len: usize) -> Result<(), PageError> {
        Err(PageError::new(PageOp::Release, len))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_a_power_of_two() {
        let pages = SystemPages::new();
        assert!(pages.page_size().is_power_of_two());
        assert!(pages.page_size() >= 4096);
    }

    #[test]
    fn reserve_commit_release_roundtrip() {
        let pages = SystemPages::new();
        let ps = pages.page_size();
        let base = pages.reserve(4 * ps).unwrap();
        assert_eq!(base.as_ptr().addr() % ps, 0);

        let second = NonNull::new(base.as_ptr().wrapping_add(ps)).unwrap();
        // SAFETY: second page of the reservation made above.
        unsafe { pages.commit(second, ps).unwrap() };
        // SAFETY: the page was just committed read/write.
        unsafe {
            second.as_ptr().write(0xAB);
            assert_eq!(second.as_ptr().read(), 0xAB);
        }
        // SAFETY: base/len are the reservation made above.
        unsafe { pages.release(base, 4 * ps).unwrap() };
    }
}
