//! The page arena: one reservation, guard pages, lazy commit, bump slots.
//!
//! An [`Arena`] owns at most one mapping at a time. Slots are handed
//! out by a monotonic bump cursor starting at the first usable byte;
//! pages between the guards are committed on demand, one at a time, as
//! the cursor crosses into them. The most recent block can grow in
//! place as long as free slots remain, which is what lets a growable
//! array avoid copying.
//!
//! `free` only adjusts the slot accounting. Interior space released by
//! a free is never handed out again during the mapping's lifetime.

#![allow(unsafe_code)]

use std::ptr::NonNull;

use vmpool_core::{NoopLog, Op, PageSource, PoolLog};

use crate::config::{PoolConfig, SlotLayout};
use crate::error::{fatal_teardown, ArenaError};
use crate::region::Region;
use crate::system::SystemPages;

/// Bump state of a live mapping.
#[derive(Debug)]
struct Mapping {
    region: Region,
    /// Offset of the first page that is not yet read/write.
    frontier: usize,
    /// Slots ever handed out; the bump position.
    cursor: usize,
    /// Slots allocated and not yet freed.
    occupied: usize,
    /// Slots freed behind the cursor. Lost until teardown.
    released: usize,
    /// Slots that fit between the guards.
    capacity: usize,
    slot_size: usize,
}

impl Mapping {
    fn usable_start(&self) -> usize {
        self.region.usable().start
    }

    fn free_slots(&self) -> usize {
        self.capacity - self.cursor
    }

    /// Offset of the slot at bump position `slot`.
    fn slot_offset(&self, slot: usize) -> usize {
        self.usable_start() + slot * self.slot_size
    }

    /// Commit exactly the page at `offset`.
    ///
    /// The frontier only advances when `offset` is the frontier page, so
    /// every page before it stays committed. A page committed ahead of
    /// the frontier is committed again when the frontier reaches it.
    fn commit_page<S: PageSource>(&mut self, source: &S, offset: usize) -> Result<(), ArenaError> {
        let addr = self.region.base().as_ptr().addr().wrapping_add(offset);
        if !self.region.is_page_aligned(offset) {
            return Err(ArenaError::Misaligned { addr });
        }
        let page = self
            .region
            .usable_addr(offset)
            .filter(|_| offset < self.region.usable().end)
            .ok_or(ArenaError::OutOfRange { addr })?;
        let page_size = self.region.page_size();
        // SAFETY: `page` is a page-aligned usable page of the live
        // reservation described by `self.region`.
        unsafe { source.commit(page, page_size) }.map_err(ArenaError::Commit)?;
        if offset == self.frontier {
            self.frontier += page_size;
        }
        Ok(())
    }

    /// Commit every page from the frontier through the page holding
    /// `last_byte`. Stops at the first failure, leaving the frontier
    /// after the last page that did commit.
    fn commit_through<S: PageSource>(
        &mut self,
        source: &S,
        last_byte: usize,
    ) -> Result<(), ArenaError> {
        while self.frontier <= last_byte {
            self.commit_page(source, self.frontier)?;
        }
        Ok(())
    }
}

/// A bump arena over one guard-bracketed virtual memory reservation.
///
/// The arena is created empty and reserves its mapping on
/// [`init`](Self::init) or lazily on the first
/// [`allocate`](Self::allocate). Every slot has the same
/// [`SlotLayout`]. The mapping is released by
/// [`teardown`](Self::teardown) or when the arena is dropped; a release
/// failure during drop raises [`FatalTeardown`](crate::FatalTeardown).
///
/// The arena is single-owner and not synchronized.
///
/// # Example
///
/// ```
/// use vmpool_arena::{Arena, PoolConfig, SlotLayout};
///
/// let mut arena = Arena::new(PoolConfig::new(4), SlotLayout::of::<u64>());
/// let p = arena.allocate(10).unwrap();
/// arena.extend(p.as_ptr(), 10, 20).unwrap();
/// let q = arena.allocate(5).unwrap();
/// assert_eq!(q.as_ptr(), p.as_ptr().wrapping_add(20 * 8));
/// ```
pub struct Arena<S: PageSource = SystemPages, L: PoolLog = NoopLog> {
    source: S,
    log: L,
    config: PoolConfig,
    slot: SlotLayout,
    page_size: usize,
    mapping: Option<Mapping>,
}

impl Arena {
    /// An empty arena over the host's virtual memory.
    pub fn new(config: PoolConfig, slot: SlotLayout) -> Self {
        Self::with_source(SystemPages::new(), NoopLog, config, slot)
    }
}

impl<S: PageSource, L: PoolLog> Arena<S, L> {
    /// An empty arena over `source`, reporting to `log`.
    ///
    /// Queries the page size once. No memory is reserved yet.
    pub fn with_source(source: S, log: L, config: PoolConfig, slot: SlotLayout) -> Self {
        let page_size = source.page_size();
        log.record(Op::PageSize, Some(page_size));
        Self {
            source,
            log,
            config,
            slot,
            page_size,
            mapping: None,
        }
    }

    /// Reserve the mapping and commit its first usable page.
    ///
    /// `pages` counts both guard pages; zero selects the configured page
    /// count (or [`PoolConfig::DEFAULT_PAGES`] if that is zero too).
    /// Fails without side effects if a mapping already exists.
    pub fn init(&mut self, pages: usize) -> Result<(), ArenaError> {
        self.log.record(Op::Init, Some(pages));
        if self.mapping.is_some() {
            return Err(ArenaError::AlreadyInitialized);
        }
        let pages = if pages == 0 {
            self.config.effective_pages()
        } else {
            pages
        };
        if pages < PoolConfig::MIN_PAGES {
            return Err(ArenaError::TooFewPages { pages });
        }
        if !self.slot.fits_page(self.page_size) {
            return Err(ArenaError::UnsupportedSlot {
                size: self.slot.size,
                align: self.slot.align,
                page_size: self.page_size,
            });
        }
        let overflow = ArenaError::SizeOverflow {
            pages,
            page_size: self.page_size,
        };
        let usable_bytes = PoolConfig::new(pages)
            .usable_bytes(self.page_size)
            .ok_or(overflow.clone())?;
        let len = pages.checked_mul(self.page_size).ok_or(overflow)?;

        let base = self.source.reserve(len).map_err(ArenaError::Reserve)?;
        let region = Region::new(base, len, self.page_size);
        let usable = region.usable();
        debug_assert_eq!(usable.len(), usable_bytes);
        let mut mapping = Mapping {
            frontier: usable.start,
            cursor: 0,
            occupied: 0,
            released: 0,
            capacity: usable_bytes / self.slot.size,
            slot_size: self.slot.size,
            region,
        };
        let first = mapping.commit_page(&self.source, usable.start);
        self.mapping = Some(mapping);
        if let Err(err) = first {
            self.teardown()?;
            return Err(err);
        }
        Ok(())
    }

    /// Release the mapping and return to the empty state.
    ///
    /// Fails if there is no mapping. If the host refuses the release the
    /// mapping is kept, so the call can be retried.
    pub fn teardown(&mut self) -> Result<(), ArenaError> {
        self.log.record(Op::Teardown, None);
        let mapping = self.mapping.as_ref().ok_or(ArenaError::NotInitialized)?;
        let (base, len) = (mapping.region.base(), mapping.region.len());
        // SAFETY: base/len are exactly the live reservation, and every
        // block handed out from it is invalidated by releasing the arena.
        unsafe { self.source.release(base, len) }.map_err(ArenaError::Release)?;
        self.mapping = None;
        Ok(())
    }

    /// Whether `addr` lies in the usable region between the guards.
    pub fn owns(&self, addr: *const u8) -> bool {
        self.log.record(Op::Owns, None);
        self.mapping
            .as_ref()
            .is_some_and(|m| m.region.usable_offset_of(addr).is_some())
    }

    /// Commit the single usable page starting at `page`.
    ///
    /// Re-committing a page succeeds and never moves the commit frontier
    /// backwards. The frontier advances only when `page` is the frontier
    /// page; a page ahead of it is committed but leaves the frontier where
    /// it is.
    pub fn commit_page(&mut self, page: *const u8) -> Result<(), ArenaError> {
        self.log.record(Op::CommitPage, None);
        let mapping = self.mapping.as_mut().ok_or(ArenaError::NotInitialized)?;
        let offset = mapping
            .region
            .offset_of(page)
            .ok_or(ArenaError::OutOfRange { addr: page.addr() })?;
        mapping.commit_page(&self.source, offset)
    }

    /// Commit every page from the frontier through the page holding
    /// `last_byte`.
    ///
    /// On failure the pages committed before it stay committed and the
    /// frontier reflects them.
    pub fn commit_range_up_to(&mut self, last_byte: *const u8) -> Result<(), ArenaError> {
        self.log.record(Op::CommitRange, None);
        let mapping = self.mapping.as_mut().ok_or(ArenaError::NotInitialized)?;
        let offset = mapping
            .region
            .usable_offset_of(last_byte)
            .ok_or(ArenaError::OutOfRange {
                addr: last_byte.addr(),
            })?;
        mapping.commit_through(&self.source, offset)
    }

    /// Bump-allocate `count` consecutive slots.
    ///
    /// Reserves the mapping first if the arena is empty. The block starts
    /// right after the previous one; freed space is never reused. A
    /// zero-slot request returns the current bump position and changes
    /// nothing.
    pub fn allocate(&mut self, count: usize) -> Result<NonNull<u8>, ArenaError> {
        self.log.record(Op::Allocate, Some(count));
        if self.mapping.is_none() {
            self.init(0)?;
        }
        let mapping = self.mapping.as_mut().ok_or(ArenaError::NotInitialized)?;
        let available = mapping.free_slots();
        if available < count {
            return Err(ArenaError::CapacityExhausted {
                requested: count,
                available,
            });
        }

        let start = mapping.slot_offset(mapping.cursor);
        if count > 0 {
            let end = mapping.slot_offset(mapping.cursor + count);
            mapping.commit_through(&self.source, end - 1)?;
        }
        let addr = mapping.region.base().as_ptr().addr().wrapping_add(start);
        let block = mapping
            .region
            .usable_addr(start)
            .ok_or(ArenaError::OutOfRange { addr })?;
        mapping.cursor += count;
        mapping.occupied += count;
        Ok(block)
    }

    /// Grow the block at `ptr` from `old` to `new` slots without moving it.
    ///
    /// Only the most recent block, the one ending at the bump position,
    /// can grow. On success `ptr` stays valid and the next allocation
    /// starts after the grown block.
    pub fn extend(&mut self, ptr: *const u8, old: usize, new: usize) -> Result<(), ArenaError> {
        self.log.record(Op::Extend, Some(new.saturating_sub(old)));
        if ptr.is_null() {
            return Err(ArenaError::NullPointer);
        }
        let mapping = self.mapping.as_mut().ok_or(ArenaError::NotInitialized)?;
        let delta = new
            .checked_sub(old)
            .ok_or(ArenaError::ShrinkingExtent { old, new })?;
        let available = mapping.free_slots();
        if available < delta {
            return Err(ArenaError::CapacityExhausted {
                requested: delta,
                available,
            });
        }

        let bump = mapping.slot_offset(mapping.cursor);
        let block_end = mapping
            .region
            .offset_of(ptr)
            .and_then(|offset| old.checked_mul(mapping.slot_size)?.checked_add(offset));
        if block_end != Some(bump) {
            return Err(ArenaError::NotTrailing);
        }

        if delta > 0 {
            let end = mapping.slot_offset(mapping.cursor + delta);
            mapping.commit_through(&self.source, end - 1)?;
        }
        mapping.cursor += delta;
        mapping.occupied += delta;
        Ok(())
    }

    /// Return `count` slots to the accounting.
    ///
    /// The pointer is not checked against any allocation record and no
    /// memory is decommitted; the slots are counted as released and are
    /// not allocated again until teardown.
    pub fn free(&mut self, ptr: *const u8, count: usize) -> Result<(), ArenaError> {
        self.log.record(Op::Free, Some(count));
        if ptr.is_null() {
            return Err(ArenaError::NullPointer);
        }
        let mapping = self.mapping.as_mut().ok_or(ArenaError::NotInitialized)?;
        if count > mapping.occupied {
            return Err(ArenaError::OverFree {
                count,
                occupied: mapping.occupied,
            });
        }
        mapping.occupied -= count;
        mapping.released += count;
        Ok(())
    }

    /// Whether the arena currently holds a mapping.
    pub fn is_initialized(&self) -> bool {
        self.mapping.is_some()
    }

    /// The configuration the arena was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// The host page interface.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The diagnostic sink.
    pub fn log(&self) -> &L {
        &self.log
    }

    /// The layout of every slot.
    pub fn slot(&self) -> SlotLayout {
        self.slot
    }

    /// Stride between consecutive slots in bytes.
    pub fn slot_size(&self) -> usize {
        self.slot.size
    }

    /// Host page size, queried once at construction.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Pages in the current mapping, guards included. Zero if empty.
    pub fn pages_reserved(&self) -> usize {
        self.mapping.as_ref().map_or(0, |m| m.region.pages())
    }

    /// Slots that fit between the guards. Zero if empty.
    pub fn slot_capacity(&self) -> usize {
        self.mapping.as_ref().map_or(0, |m| m.capacity)
    }

    /// Slots allocated and not yet freed.
    pub fn occupied_slots(&self) -> usize {
        self.mapping.as_ref().map_or(0, |m| m.occupied)
    }

    /// Slots still available to bump allocation.
    pub fn free_slots(&self) -> usize {
        self.mapping.as_ref().map_or(0, Mapping::free_slots)
    }

    /// Slots freed behind the bump position, lost until teardown.
    pub fn released_slots(&self) -> usize {
        self.mapping.as_ref().map_or(0, |m| m.released)
    }

    /// Start of the leading guard page (the mapping base).
    pub fn begin_guard(&self) -> Option<NonNull<u8>> {
        self.mapping.as_ref().map(|m| m.region.base())
    }

    /// First usable byte, where slot zero lives.
    pub fn usable_start(&self) -> Option<NonNull<u8>> {
        self.mapping
            .as_ref()
            .and_then(|m| m.region.usable_addr(m.usable_start()))
    }

    /// Start of the trailing guard page.
    pub fn end_guard(&self) -> Option<NonNull<u8>> {
        self.mapping.as_ref().map(|m| m.region.trailing_guard_addr())
    }

    /// First byte of the first page that is not yet committed.
    pub fn commit_frontier(&self) -> Option<NonNull<u8>> {
        self.mapping
            .as_ref()
            .and_then(|m| m.region.usable_addr(m.frontier))
    }

    /// Usable pages committed so far.
    pub fn committed_pages(&self) -> usize {
        self.mapping
            .as_ref()
            .map_or(0, |m| (m.frontier - m.usable_start()) / m.region.page_size())
    }
}

impl<S: PageSource + Clone, L: PoolLog + Clone> Clone for Arena<S, L> {
    /// Copy the descriptor into a new arena with its own mapping.
    ///
    /// If `self` holds a mapping, the copy reserves a fresh one of the
    /// same page count; it never shares `self`'s pages. A copy whose
    /// reservation fails stays empty and retries on first allocation.
    fn clone(&self) -> Self {
        self.log.record(Op::Clone, None);
        let mut arena = Self {
            source: self.source.clone(),
            log: self.log.clone(),
            config: self.config.clone(),
            slot: self.slot,
            page_size: self.page_size,
            mapping: None,
        };
        if let Some(pages) = self.mapping.as_ref().map(|m| m.region.pages()) {
            arena.config.pages = pages;
            if arena.init(pages).is_err() {
                arena.log.record(Op::Clone, Some(pages));
            }
        }
        arena
    }
}

impl<S: PageSource, L: PoolLog> Drop for Arena<S, L> {
    fn drop(&mut self) {
        if self.mapping.is_none() {
            return;
        }
        if let Err(err) = self.teardown() {
            fatal_teardown(err);
        }
    }
}

impl<S: PageSource, L: PoolLog> std::fmt::Debug for Arena<S, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("slot", &self.slot)
            .field("page_size", &self.page_size)
            .field("pages_reserved", &self.pages_reserved())
            .field("occupied_slots", &self.occupied_slots())
            .field("free_slots", &self.free_slots())
            .field("released_slots", &self.released_slots())
            .finish()
    }
}
