//! Address layout of one reservation.
//!
//! A [`Region`] is the owned byte range `(base, len)` returned by a
//! single reservation, split into three parts:
//!
//! ```text
//! base                                                     base + len
//! │ leading guard │            usable pages            │ trailing guard │
//! │   1 page      │      (pages - 2) * page_size       │     1 page     │
//! ```
//!
//! Everything is expressed as byte offsets from `base` and validated
//! against the stored bounds before an address is produced. The guard
//! sub-ranges are never handed out.

use std::ops::Range;
use std::ptr::NonNull;

/// The address range of one reservation and its guard split.
#[derive(Debug)]
pub struct Region {
    base: NonNull<u8>,
    len: usize,
    page_size: usize,
}

impl Region {
    /// Describe a reservation of `len` bytes at `base`.
    ///
    /// `len` must be a multiple of `page_size` covering at least three
    /// pages (two guards and one usable page).
    pub fn new(base: NonNull<u8>, len: usize, page_size: usize) -> Self {
        debug_assert!(page_size.is_power_of_two());
        debug_assert_eq!(len % page_size, 0);
        debug_assert!(len >= 3 * page_size);
        Self {
            base,
            len,
            page_size,
        }
    }

    /// Start of the reservation (the leading guard page).
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Length of the reservation in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: a region covers at least three pages.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Host page size the region was laid out with.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Total pages in the reservation, guards included.
    pub fn pages(&self) -> usize {
        self.len / self.page_size
    }

    /// Offsets of the leading guard page.
    pub fn leading_guard(&self) -> Range<usize> {
        0..self.page_size
    }

    /// Offsets of the trailing guard page.
    pub fn trailing_guard(&self) -> Range<usize> {
        self.len - self.page_size..self.len
    }

    /// Offsets between the two guard pages.
    pub fn usable(&self) -> Range<usize> {
        self.leading_guard().end..self.trailing_guard().start
    }

    /// Offset of `addr` from the base if it lies anywhere in the
    /// reservation, guards included.
    pub fn offset_of(&self, addr: *const u8) -> Option<usize> {
        let offset = addr.addr().checked_sub(self.base.as_ptr().addr())?;
        (offset < self.len).then_some(offset)
    }

    /// Offset of `addr` from the base if it lies in the usable region.
    pub fn usable_offset_of(&self, addr: *const u8) -> Option<usize> {
        self.offset_of(addr)
            .filter(|offset| self.usable().contains(offset))
    }

    /// The address at `offset`, if `offset` is in the usable region or
    /// exactly one past its end.
    ///
    /// The one-past-the-end address is the start of the trailing guard.
    /// It is only ever handed out as the position of an empty block.
    pub fn usable_addr(&self, offset: usize) -> Option<NonNull<u8>> {
        let usable = self.usable();
        if offset < usable.start || offset > usable.end {
            return None;
        }
        NonNull::new(self.base.as_ptr().wrapping_add(offset))
    }

    /// Address of the first byte of the trailing guard page.
    pub fn trailing_guard_addr(&self) -> NonNull<u8> {
        let offset = self.trailing_guard().start;
        NonNull::new(self.base.as_ptr().wrapping_add(offset)).unwrap_or(self.base)
    }

    /// Whether `offset` is a multiple of the page size.
    pub fn is_page_aligned(&self, offset: usize) -> bool {
        offset & (self.page_size - 1) == 0
    }
}
