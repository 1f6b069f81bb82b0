//! A growable array that prefers growing in place.

#![allow(unsafe_code)]

use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::slice;

use crate::allocator::PageAllocator;
use crate::error::AllocError;
use crate::slot_alloc::SlotAlloc;

/// How a [`PoolVec`] has grown so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GrowthStats {
    /// Growths served by extending the block in place.
    pub in_place: usize,
    /// Growths that allocated a new block and moved the elements.
    pub relocated: usize,
}

/// A contiguous growable array over a [`SlotAlloc`].
///
/// On growth the vector first asks its allocator to extend the current
/// block in place and only relocates when that fails. Over a
/// [`PageAllocator`] a vector that is the arena's most recent block
/// never copies until the mapping is full.
///
/// All growing operations are fallible; nothing here aborts on
/// allocation failure.
pub struct PoolVec<T, A: SlotAlloc<T> = PageAllocator<T>> {
    ptr: NonNull<T>,
    cap: usize,
    len: usize,
    alloc: A,
    stats: GrowthStats,
}

impl<T, A: SlotAlloc<T> + Default> PoolVec<T, A> {
    /// An empty vector over a default allocator.
    pub fn new() -> Self {
        Self::new_in(A::default())
    }

    /// A vector over a default allocator with room for `capacity`
    /// elements.
    pub fn with_capacity(capacity: usize) -> Result<Self, AllocError> {
        Self::with_capacity_in(capacity, A::default())
    }
}

impl<T, A: SlotAlloc<T> + Default> Default for PoolVec<T, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: SlotAlloc<T>> PoolVec<T, A> {
    /// An empty vector over `alloc`. Allocates nothing.
    pub fn new_in(alloc: A) -> Self {
        Self {
            ptr: NonNull::dangling(),
            cap: if mem::size_of::<T>() == 0 { usize::MAX } else { 0 },
            len: 0,
            alloc,
            stats: GrowthStats::default(),
        }
    }

    /// A vector over `alloc` with room for `capacity` elements.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Result<Self, AllocError> {
        let mut vec = Self::new_in(alloc);
        vec.try_reserve(capacity)?;
        Ok(vec)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the vector holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Elements the current block can hold.
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Pointer to the first element, dangling while nothing is allocated.
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// The elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: ptr is valid and aligned for cap >= len elements, the
        // first len of which are initialized.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// The elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as in as_slice, and &mut self gives unique access.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// The backing allocator.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// The backing allocator, mutably.
    ///
    /// Allocations made through it stop this vector from growing in
    /// place until it relocates.
    pub fn allocator_mut(&mut self) -> &mut A {
        &mut self.alloc
    }

    /// In-place and relocating growths so far.
    pub fn growth_stats(&self) -> GrowthStats {
        self.stats
    }

    /// Append `value`, growing if the block is full.
    ///
    /// On error the vector is unchanged and `value` is dropped.
    pub fn push(&mut self, value: T) -> Result<(), AllocError> {
        if self.len == self.cap {
            self.try_reserve(1)?;
        }
        // SAFETY: len < cap, so the slot is inside the block and unused.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: the slot at the old last index is initialized and is no
        // longer counted by len.
        Some(unsafe { self.ptr.as_ptr().add(self.len).read() })
    }

    /// Shorten to `len` elements, dropping the rest.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let tail = ptr::slice_from_raw_parts_mut(
            // SAFETY: len < self.len <= cap.
            unsafe { self.ptr.as_ptr().add(len) },
            self.len - len,
        );
        self.len = len;
        // SAFETY: the tail is initialized and no longer reachable.
        unsafe { ptr::drop_in_place(tail) };
    }

    /// Drop every element, keeping the block.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Make room for at least `additional` more elements.
    ///
    /// The block at least doubles when it has to grow, bounded by the
    /// allocator's [`max_size`](SlotAlloc::max_size).
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        if self.cap - self.len >= additional {
            return Ok(());
        }
        let max = self.alloc.max_size();
        let required = self
            .len
            .checked_add(additional)
            .filter(|&required| required <= max)
            .ok_or(AllocError::TooLarge {
                requested: self.len.saturating_add(additional),
                max,
            })?;
        let wanted = self.len.saturating_add(self.len.max(additional)).max(1);
        self.grow_to(wanted.min(max).max(required))
    }

    /// Append every item of `iter`, stopping at the first failure.
    pub fn extend_from_iter<I>(&mut self, iter: I) -> Result<(), AllocError>
    where
        I: IntoIterator<Item = T>,
    {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        self.try_reserve(lower)?;
        for value in iter {
            self.push(value)?;
        }
        Ok(())
    }

    /// Append clones of every element of `items`.
    pub fn extend_from_slice(&mut self, items: &[T]) -> Result<(), AllocError>
    where
        T: Clone,
    {
        self.extend_from_iter(items.iter().cloned())
    }

    fn grow_to(&mut self, new_cap: usize) -> Result<(), AllocError> {
        if self.cap > 0 && self.alloc.try_extend(self.ptr, self.cap, new_cap) {
            self.cap = new_cap;
            self.stats.in_place += 1;
            return Ok(());
        }
        let new_ptr = self.alloc.allocate(new_cap)?;
        if self.cap > 0 {
            // SAFETY: both blocks hold at least len elements and are
            // distinct live allocations, so they do not overlap.
            unsafe { ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), self.len) };
            // SAFETY: the old block came from this allocator with cap
            // elements and its contents were moved out above.
            unsafe { self.alloc.deallocate(self.ptr, self.cap) };
            self.stats.relocated += 1;
        }
        self.ptr = new_ptr;
        self.cap = new_cap;
        Ok(())
    }
}

impl<T, A: SlotAlloc<T>> Drop for PoolVec<T, A> {
    fn drop(&mut self) {
        self.clear();
        if self.cap > 0 && mem::size_of::<T>() != 0 {
            // SAFETY: ptr was allocated with cap elements by this allocator.
            unsafe { self.alloc.deallocate(self.ptr, self.cap) };
        }
    }
}

impl<T, A: SlotAlloc<T>> Deref for PoolVec<T, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: SlotAlloc<T>> DerefMut for PoolVec<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: fmt::Debug, A: SlotAlloc<T>> fmt::Debug for PoolVec<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot_alloc::HeapAlloc;
    use std::rc::Rc;
    use vmpool_arena::PoolConfig;
    use vmpool_core::NoopLog;
    use vmpool_test_utils::FakePages;

    fn arena_vec<T>(pages: usize) -> PoolVec<T, PageAllocator<T, FakePages>> {
        let alloc =
            PageAllocator::with_source(FakePages::new(4096), NoopLog, PoolConfig::new(pages), 0);
        PoolVec::new_in(alloc)
    }

    #[test]
    fn push_and_pop() {
        let mut v = arena_vec::<u32>(4);
        for i in 0..100 {
            v.push(i).unwrap();
        }
        assert_eq!(v.len(), 100);
        assert_eq!(v[42], 42);
        assert_eq!(v.pop(), Some(99));
        assert_eq!(v.len(), 99);
    }

    #[test]
    fn sole_vector_grows_in_place() {
        let mut v = arena_vec::<u64>(4);
        v.push(0).unwrap();
        let first = v.as_ptr();
        for i in 1..1000 {
            v.push(i).unwrap();
        }
        assert_eq!(v.as_ptr(), first);
        let stats = v.growth_stats();
        assert_eq!(stats.relocated, 0);
        assert!(stats.in_place > 0);
    }

    #[test]
    fn exhausted_arena_reports_error_and_keeps_contents() {
        let mut v = arena_vec::<u64>(3);
        for i in 0..512 {
            v.push(i).unwrap();
        }
        assert!(v.push(512).is_err());
        assert_eq!(v.len(), 512);
        assert_eq!(v[511], 511);
    }

    #[test]
    fn heap_vector_relocates() {
        let mut v: PoolVec<u32, HeapAlloc<u32>> = PoolVec::new();
        for i in 0..100 {
            v.push(i).unwrap();
        }
        assert_eq!(v.iter().sum::<u32>(), 4950);
        assert_eq!(v.growth_stats().in_place, 0);
        assert!(v.growth_stats().relocated > 0);
    }

    #[test]
    fn truncate_and_drop_run_destructors() {
        let marker = Rc::new(());
        let mut v = arena_vec::<Rc<()>>(4);
        for _ in 0..10 {
            v.push(Rc::clone(&marker)).unwrap();
        }
        v.truncate(4);
        assert_eq!(Rc::strong_count(&marker), 5);
        drop(v);
        assert_eq!(Rc::strong_count(&marker), 1);
    }

    #[test]
    fn with_capacity_in_allocates_once_up_front() {
        let alloc =
            PageAllocator::with_source(FakePages::new(4096), NoopLog, PoolConfig::new(4), 0);
        let mut v: PoolVec<u64, _> = PoolVec::with_capacity_in(100, alloc).unwrap();
        assert_eq!(v.capacity(), 100);
        assert!(v.is_empty());
        assert_eq!(v.allocator().arena().occupied_slots(), 100);
        let block = v.as_ptr();

        for i in 0..100 {
            v.push(i).unwrap();
        }
        assert_eq!(v.capacity(), 100);
        assert_eq!(v.as_ptr(), block);
        assert_eq!(v.growth_stats(), GrowthStats::default());
        assert_eq!(v.allocator().arena().occupied_slots(), 100);
    }

    #[test]
    fn with_capacity_in_zero_reserves_nothing() {
        let fake = FakePages::new(4096);
        let alloc = PageAllocator::with_source(fake.clone(), NoopLog, PoolConfig::new(4), 0);
        let v: PoolVec<u64, _> = PoolVec::with_capacity_in(0, alloc).unwrap();
        assert_eq!(v.capacity(), 0);
        assert_eq!(fake.reserve_calls(), 0);
    }

    #[test]
    fn with_capacity_over_default_allocator() {
        let mut v: PoolVec<u32, HeapAlloc<u32>> = PoolVec::with_capacity(16).unwrap();
        assert_eq!(v.capacity(), 16);
        let block = v.as_ptr();
        v.extend_from_slice(&[7; 16]).unwrap();
        assert_eq!(v.as_ptr(), block);
        assert_eq!(v.growth_stats(), GrowthStats::default());

        v.push(8).unwrap();
        assert_eq!(v.growth_stats().relocated, 1);
        assert_eq!(v.capacity(), 32);
    }

    #[test]
    fn with_capacity_beyond_the_ceiling_fails() {
        let result: Result<PoolVec<u32>, _> = PoolVec::with_capacity(11);
        assert!(matches!(result, Err(AllocError::TooLarge { requested: 11, max: 10 })));
    }

    #[test]
    fn zero_sized_elements_never_allocate() {
        let mut v = arena_vec::<()>(4);
        for _ in 0..10_000 {
            v.push(()).unwrap();
        }
        assert_eq!(v.len(), 10_000);
        assert!(!v.allocator().arena().is_initialized());
    }

    #[test]
    fn reserve_beyond_max_size_fails() {
        let alloc = PageAllocator::<u8, FakePages>::with_source(
            FakePages::new(4096),
            NoopLog,
            PoolConfig::new(4),
            16,
        );
        let mut v = PoolVec::new_in(alloc);
        v.extend_from_slice(&[1u8; 16]).unwrap();
        assert!(matches!(v.push(17), Err(AllocError::TooLarge { .. })));
        assert_eq!(v.capacity(), 16);
    }

    #[test]
    fn debug_lists_elements() {
        let mut v = arena_vec::<i32>(4);
        v.extend_from_slice(&[1, 2, 3]).unwrap();
        assert_eq!(format!("{v:?}"), "[1, 2, 3]");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn matches_std_vec(
                ops in prop::collection::vec(prop::option::of(any::<u16>()), 0..400),
            ) {
                let mut ours = arena_vec::<u16>(8);
                let mut model = Vec::new();
                for op in ops {
                    match op {
                        Some(x) => {
                            ours.push(x).unwrap();
                            model.push(x);
                        }
                        None => prop_assert_eq!(ours.pop(), model.pop()),
                    }
                }
                prop_assert_eq!(ours.as_slice(), model.as_slice());
                prop_assert_eq!(ours.growth_stats().relocated, 0);
            }
        }
    }
}
