//! The allocation seam between containers and their storage.
//!
//! [`SlotAlloc`] is what [`PoolVec`](crate::PoolVec) needs from an
//! allocator: allocate, deallocate, a size limit, and an optional
//! in-place extension. Allocators that cannot extend keep the default
//! [`try_extend`](SlotAlloc::try_extend), and containers fall back to
//! allocate-move-deallocate.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use crate::error::AllocError;

/// Element-granular storage for a container of `T`.
///
/// # Safety
///
/// A block returned by [`allocate`](Self::allocate) for `n` elements must
/// be valid for reads and writes of `n` values of `T`, properly aligned,
/// and must not overlap any other live block. After a successful
/// [`try_extend`](Self::try_extend) the same pointer must be valid for
/// the new element count.
pub unsafe trait SlotAlloc<T> {
    /// Allocate uninitialized storage for `n` elements.
    ///
    /// `n == 0` and zero-sized `T` yield a dangling, well-aligned pointer.
    fn allocate(&mut self, n: usize) -> Result<NonNull<T>, AllocError>;

    /// Release a block.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`allocate`](Self::allocate) (or a successful
    /// extension) on this allocator with exactly `n` elements, and must
    /// not be used afterwards.
    unsafe fn deallocate(&mut self, ptr: NonNull<T>, n: usize);

    /// Try to grow the block at `ptr` from `old` to `new` elements
    /// without moving it.
    fn try_extend(&mut self, _ptr: NonNull<T>, _old: usize, _new: usize) -> bool {
        false
    }

    /// Largest element count a single request may ask for.
    fn max_size(&self) -> usize;
}

/// [`SlotAlloc`] over the global heap. Never extends in place.
pub struct HeapAlloc<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> HeapAlloc<T> {
    /// A handle to the global heap.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for HeapAlloc<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for HeapAlloc<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for HeapAlloc<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HeapAlloc")
    }
}

// SAFETY: blocks come straight from the global allocator with
// `Layout::array::<T>(n)`, so they are aligned, sized for `n` elements
// and disjoint.
unsafe impl<T> SlotAlloc<T> for HeapAlloc<T> {
    fn allocate(&mut self, n: usize) -> Result<NonNull<T>, AllocError> {
        if n == 0 || mem::size_of::<T>() == 0 {
            return Ok(NonNull::dangling());
        }
        let layout = Layout::array::<T>(n).map_err(|_| AllocError::TooLarge {
            requested: n,
            max: self.max_size(),
        })?;
        // SAFETY: layout has a non-zero size.
        let ptr = unsafe { alloc::alloc(layout) };
        NonNull::new(ptr.cast::<T>()).ok_or(AllocError::HeapExhausted {
            bytes: layout.size(),
        })
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<T>, n: usize) {
        if n == 0 || mem::size_of::<T>() == 0 {
            return;
        }
        if let Ok(layout) = Layout::array::<T>(n) {
            // SAFETY: the caller guarantees ptr was allocated here with n
            // elements, i.e. with this layout.
            unsafe { alloc::dealloc(ptr.cast::<u8>().as_ptr(), layout) };
        }
    }

    fn max_size(&self) -> usize {
        match mem::size_of::<T>() {
            0 => usize::MAX,
            size => isize::MAX as usize / size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_alloc_never_extends() {
        let mut heap = HeapAlloc::<u32>::new();
        let p = heap.allocate(4).unwrap();
        assert!(!heap.try_extend(p, 4, 8));
        // SAFETY: p was allocated above with 4 elements.
        unsafe { heap.deallocate(p, 4) };
    }

    #[test]
    fn empty_requests_are_dangling() {
        let mut heap = HeapAlloc::<u64>::new();
        assert_eq!(heap.allocate(0).unwrap(), NonNull::dangling());
        let mut unit = HeapAlloc::<()>::new();
        assert_eq!(unit.allocate(1000).unwrap(), NonNull::dangling());
        assert_eq!(unit.max_size(), usize::MAX);
    }

    #[test]
    fn oversized_request_is_too_large() {
        let mut heap = HeapAlloc::<u64>::new();
        assert!(matches!(
            heap.allocate(usize::MAX),
            Err(AllocError::TooLarge { .. })
        ));
    }
}
