//! The page allocator facade.
//!
//! [`PageAllocator<T>`] wraps one [`Arena`] sized for `T` and adds the
//! slot-count ceiling of its [`SlotPolicy`]. It is what a container
//! holds: allocate, deallocate, extend in place, size limit, an
//! interchangeability test and rebinding to another element type.

#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use vmpool_arena::{Arena, ArenaError, PoolConfig, SystemPages};
use vmpool_core::{NoopLog, Op, PageSource, PoolLog};

use crate::error::AllocError;
use crate::policy::SlotPolicy;
use crate::slot_alloc::SlotAlloc;

/// Allocator of `T` slots from a private page arena.
///
/// Cloning copies the configuration into a fresh mapping; clones never
/// share pages. Dropping the allocator releases its mapping.
///
/// # Example
///
/// ```
/// use vmpool_alloc::PageAllocator;
///
/// let mut alloc = PageAllocator::<u32>::with_limits(16, 0);
/// let p = alloc.allocate(8).unwrap();
/// alloc.extend(p, 8, 64).unwrap();
/// assert!(alloc.owns(p.as_ptr()));
/// ```
pub struct PageAllocator<T, S: PageSource = SystemPages, L: PoolLog = NoopLog> {
    policy: SlotPolicy,
    arena: Arena<S, L>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PageAllocator<T> {
    /// An allocator over the host's virtual memory with the default page
    /// count and the default slot ceiling.
    pub fn new() -> Self {
        Self::with_limits(0, SlotPolicy::DEFAULT_MAX_SLOTS)
    }

    /// An allocator reserving `pages` pages per mapping (zero for the
    /// default) and limiting requests to `max_slots` elements (zero for
    /// unbounded).
    pub fn with_limits(pages: usize, max_slots: usize) -> Self {
        Self::with_source(SystemPages::new(), NoopLog, PoolConfig::new(pages), max_slots)
    }
}

impl<T> Default for PageAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S: PageSource, L: PoolLog> PageAllocator<T, S, L> {
    /// An allocator over `source`, reporting every operation to `log`.
    pub fn with_source(source: S, log: L, config: PoolConfig, max_slots: usize) -> Self {
        log.record(Op::AllocatorNew, None);
        let policy = SlotPolicy::of::<T>(max_slots);
        Self {
            arena: Arena::with_source(source, log, config, policy.slot_layout()),
            policy,
            _marker: PhantomData,
        }
    }

    /// Allocate uninitialized storage for `n` elements.
    ///
    /// Fails if `n` exceeds the address-space limit or the configured
    /// ceiling, or if the arena cannot serve it. Empty requests and
    /// zero-sized `T` get a dangling pointer without touching the arena.
    pub fn allocate(&mut self, n: usize) -> Result<NonNull<T>, AllocError> {
        self.log().record(Op::AllocatorAllocate, Some(n));
        self.policy.check(n)?;
        if n == 0 || mem::size_of::<T>() == 0 {
            return Ok(NonNull::dangling());
        }
        Ok(self.arena.allocate(n)?.cast())
    }

    /// Return `n` elements at `ptr` to the arena's accounting.
    ///
    /// The ceiling is not consulted.
    pub fn deallocate(&mut self, ptr: NonNull<T>, n: usize) -> Result<(), ArenaError> {
        self.log().record(Op::AllocatorDeallocate, Some(n));
        if n == 0 || mem::size_of::<T>() == 0 {
            return Ok(());
        }
        self.arena.free(ptr.cast::<u8>().as_ptr(), n)
    }

    /// Grow the most recent block from `old` to `new` elements in place.
    pub fn extend(&mut self, ptr: NonNull<T>, old: usize, new: usize) -> Result<(), ArenaError> {
        self.log().record(Op::AllocatorExtend, Some(new));
        if mem::size_of::<T>() == 0 {
            return Ok(());
        }
        self.arena.extend(ptr.cast::<u8>().as_ptr(), old, new)
    }

    /// The ceiling if one is configured, the address-space limit
    /// otherwise.
    pub fn max_size(&self) -> usize {
        let max = self.policy.max_size();
        self.log().record(Op::MaxSize, Some(max));
        max
    }

    /// Whether `ptr` points into this allocator's usable pages.
    pub fn owns(&self, ptr: *const T) -> bool {
        self.arena.owns(ptr.cast::<u8>())
    }

    /// Whether a block from `self` may be released through `other`.
    ///
    /// True exactly when both element types have the same aligned size.
    pub fn is_interchangeable_with<U, S2: PageSource, L2: PoolLog>(
        &self,
        other: &PageAllocator<U, S2, L2>,
    ) -> bool {
        self.log().record(Op::Compare, None);
        self.policy.is_interchangeable_with(&other.policy)
    }

    /// A new allocator for `U` with the same page count and ceiling.
    ///
    /// The result has its own, not yet reserved, arena sized for `U`.
    pub fn rebind<U>(&self) -> PageAllocator<U, S, L>
    where
        S: Clone,
        L: Clone,
    {
        self.log().record(Op::Rebind, None);
        let config = PoolConfig::new(self.reserved_pages());
        PageAllocator::with_source(
            self.arena_source().clone(),
            self.log().clone(),
            config,
            self.policy.max_slots,
        )
    }

    /// The element and ceiling policy.
    pub fn policy(&self) -> &SlotPolicy {
        &self.policy
    }

    /// The backing arena.
    pub fn arena(&self) -> &Arena<S, L> {
        &self.arena
    }

    fn log(&self) -> &L {
        self.arena.log()
    }

    fn arena_source(&self) -> &S {
        self.arena.source()
    }

    /// Page count of the live mapping, or the configured count.
    fn reserved_pages(&self) -> usize {
        match self.arena.pages_reserved() {
            0 => self.arena.config().pages,
            pages => pages,
        }
    }
}

impl<T, S: PageSource + Clone, L: PoolLog + Clone> Clone for PageAllocator<T, S, L> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy,
            arena: self.arena.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, U, S, L, S2, L2> PartialEq<PageAllocator<U, S2, L2>> for PageAllocator<T, S, L>
where
    S: PageSource,
    L: PoolLog,
    S2: PageSource,
    L2: PoolLog,
{
    fn eq(&self, other: &PageAllocator<U, S2, L2>) -> bool {
        self.is_interchangeable_with(other)
    }
}

impl<T, S: PageSource, L: PoolLog> fmt::Debug for PageAllocator<T, S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageAllocator")
            .field("policy", &self.policy)
            .field("arena", &self.arena)
            .finish()
    }
}

// SAFETY: arena blocks are slot-aligned for `T`, sized for the requested
// element count, committed before they are returned, and never overlap
// because the bump cursor only advances.
unsafe impl<T, S: PageSource, L: PoolLog> SlotAlloc<T> for PageAllocator<T, S, L> {
    fn allocate(&mut self, n: usize) -> Result<NonNull<T>, AllocError> {
        PageAllocator::allocate(self, n)
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<T>, n: usize) {
        let released = PageAllocator::deallocate(self, ptr, n);
        debug_assert!(released.is_ok(), "deallocate failed: {released:?}");
    }

    fn try_extend(&mut self, ptr: NonNull<T>, old: usize, new: usize) -> bool {
        self.extend(ptr, old, new).is_ok()
    }

    fn max_size(&self) -> usize {
        PageAllocator::max_size(self)
    }
}
