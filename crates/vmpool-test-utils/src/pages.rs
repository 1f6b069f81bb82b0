//! An in-process [`PageSource`] backed by heap buffers.
//!
//! [`FakePages`] hands out page-aligned, zeroed heap allocations as
//! "reservations" and tracks which of their pages have been committed.
//! Nothing is actually protected, so an arena's bookkeeping can be
//! exercised without a real mapping. Faults can be injected for every
//! host call.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::cell::RefCell;
use std::ptr::NonNull;
use std::rc::Rc;

use vmpool_core::{PageError, PageOp, PageSource};

struct Reservation {
    base: NonNull<u8>,
    layout: Layout,
    committed: Vec<bool>,
}

impl Reservation {
    fn contains(&self, addr: usize, len: usize) -> bool {
        let start = self.base.as_ptr().addr();
        addr >= start && addr + len <= start + self.layout.size()
    }
}

#[derive(Default)]
struct FakeState {
    reservations: Vec<Reservation>,
    fail_next_reserve: bool,
    /// Remaining page commits that may succeed; `None` is unlimited.
    commit_budget: Option<usize>,
    fail_release: bool,
    reserve_calls: usize,
    commit_calls: usize,
    release_calls: usize,
}

impl Drop for FakeState {
    fn drop(&mut self) {
        for r in self.reservations.drain(..) {
            // SAFETY: every reservation was allocated with exactly this layout.
            unsafe { alloc::dealloc(r.base.as_ptr(), r.layout) };
        }
    }
}

/// A fake host page interface.
///
/// Clones share state, so tests keep one handle for inspection and
/// fault injection and give a clone to the code under test.
#[derive(Clone)]
pub struct FakePages {
    page_size: usize,
    state: Rc<RefCell<FakeState>>,
}

impl FakePages {
    /// A fake host with pages of `page_size` bytes (a power of two).
    pub fn new(page_size: usize) -> Self {
        assert!(page_size.is_power_of_two(), "page size must be a power of two");
        Self {
            page_size,
            state: Rc::new(RefCell::new(FakeState::default())),
        }
    }

    /// Make the next `reserve` call fail.
    pub fn fail_next_reserve(&self) {
        self.state.borrow_mut().fail_next_reserve = true;
    }

    /// Let only `pages` more page commits succeed.
    pub fn allow_commits(&self, pages: usize) {
        self.state.borrow_mut().commit_budget = Some(pages);
    }

    /// Let every page commit succeed again.
    pub fn unlimited_commits(&self) {
        self.state.borrow_mut().commit_budget = None;
    }

    /// Make every `release` call fail while `fail` is set.
    pub fn fail_release(&self, fail: bool) {
        self.state.borrow_mut().fail_release = fail;
    }

    /// Reservations not yet released.
    pub fn live_reservations(&self) -> usize {
        self.state.borrow().reservations.len()
    }

    /// Whether the page holding `addr` is committed in some reservation.
    pub fn is_committed(&self, addr: *const u8) -> bool {
        let addr = addr.addr();
        self.state.borrow().reservations.iter().any(|r| {
            r.contains(addr, 1) && r.committed[(addr - r.base.as_ptr().addr()) / self.page_size]
        })
    }

    /// Committed pages across all live reservations.
    pub fn committed_pages(&self) -> usize {
        self.state
            .borrow()
            .reservations
            .iter()
            .map(|r| r.committed.iter().filter(|&&c| c).count())
            .sum()
    }

    pub fn reserve_calls(&self) -> usize {
        self.state.borrow().reserve_calls
    }

    pub fn commit_calls(&self) -> usize {
        self.state.borrow().commit_calls
    }

    pub fn release_calls(&self) -> usize {
        self.state.borrow().release_calls
    }
}

impl PageSource for FakePages {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn reserve(&self, len: usize) -> Result<NonNull<u8>, PageError> {
        let mut state = self.state.borrow_mut();
        state.reserve_calls += 1;
        if std::mem::take(&mut state.fail_next_reserve) {
            return Err(PageError::new(PageOp::Reserve, len));
        }
        assert!(
            len > 0 && len % self.page_size == 0,
            "reserve of {len} bytes is not a whole number of pages"
        );
        let layout = Layout::from_size_align(len, self.page_size)
            .map_err(|_| PageError::new(PageOp::Reserve, len))?;
        // SAFETY: layout has a non-zero size.
        let base = NonNull::new(unsafe { alloc::alloc_zeroed(layout) })
            .ok_or(PageError::new(PageOp::Reserve, len))?;
        state.reservations.push(Reservation {
            base,
            layout,
            committed: vec![false; len / self.page_size],
        });
        Ok(base)
    }

    unsafe fn commit(&self, addr: NonNull<u8>, len: usize) -> Result<(), PageError> {
        let mut state = self.state.borrow_mut();
        state.commit_calls += 1;
        let addr = addr.as_ptr().addr();
        assert_eq!(addr % self.page_size, 0, "commit of unaligned address");
        let pages = len.div_ceil(self.page_size);
        if let Some(budget) = state.commit_budget {
            if budget < pages {
                return Err(PageError::new(PageOp::Commit, len));
            }
            state.commit_budget = Some(budget - pages);
        }
        let page_size = self.page_size;
        let r = state
            .reservations
            .iter_mut()
            .find(|r| r.contains(addr, len))
            .expect("commit outside any live reservation");
        let first = (addr - r.base.as_ptr().addr()) / page_size;
        r.committed[first..first + pages].fill(true);
        Ok(())
    }

    unsafe fn release(&self, base: NonNull<u8>, len: usize) -> Result<(), PageError> {
        let mut state = self.state.borrow_mut();
        state.release_calls += 1;
        if state.fail_release {
            return Err(PageError::new(PageOp::Release, len));
        }
        let index = state
            .reservations
            .iter()
            .position(|r| r.base == base && r.layout.size() == len)
            .expect("release of an unknown reservation");
        let r = state.reservations.swap_remove(index);
        // SAFETY: the reservation was allocated with exactly this layout.
        unsafe { alloc::dealloc(r.base.as_ptr(), r.layout) };
        Ok(())
    }
}
