//! Benchmark workloads for vmpool.
//!
//! Each workload builds a vector of `n` elements one push at a time, so
//! the growth policy of the backing allocator dominates:
//!
//! - [`fill_pooled`]: [`PoolVec`] over a [`PageAllocator`], grows in place
//! - [`fill_heap`]: [`PoolVec`] over the global heap, relocates on growth
//! - [`fill_std`]: `std::vec::Vec` as the baseline

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use vmpool_alloc::{HeapAlloc, PageAllocator, PoolVec};
use vmpool_arena::{Arena, PoolConfig, SlotLayout};

/// The host page size, as an arena sees it.
pub fn host_page_size() -> usize {
    Arena::new(PoolConfig::default(), SlotLayout::of::<u64>()).page_size()
}

/// Pages to reserve so that `n` values of `T` fit behind the guards.
pub fn pages_for<T>(n: usize, page_size: usize) -> usize {
    let bytes = n.saturating_mul(std::mem::size_of::<T>().max(1));
    // Doubling may overshoot n by up to 2x.
    let usable = bytes.saturating_mul(2).div_ceil(page_size);
    (usable + PoolConfig::GUARD_PAGES).max(PoolConfig::MIN_PAGES)
}

/// Push `0..n` into a vector backed by a fresh page arena.
pub fn fill_pooled(n: usize, page_size: usize) -> PoolVec<u64, PageAllocator<u64>> {
    let alloc = PageAllocator::with_limits(pages_for::<u64>(n, page_size), 0);
    let mut v = PoolVec::new_in(alloc);
    for i in 0..n as u64 {
        if v.push(i).is_err() {
            break;
        }
    }
    v
}

/// Push `0..n` into a heap-backed [`PoolVec`].
pub fn fill_heap(n: usize) -> PoolVec<u64, HeapAlloc<u64>> {
    let mut v = PoolVec::new();
    for i in 0..n as u64 {
        if v.push(i).is_err() {
            break;
        }
    }
    v
}

/// Push `0..n` into a standard vector.
pub fn fill_std(n: usize) -> Vec<u64> {
    let mut v = Vec::new();
    for i in 0..n as u64 {
        v.push(i);
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_cover_doubling_overshoot() {
        assert_eq!(pages_for::<u64>(512, 4096), 2 + 2);
        assert_eq!(pages_for::<u64>(0, 4096), PoolConfig::MIN_PAGES);
    }

    #[cfg(unix)]
    #[test]
    fn workloads_agree() {
        let page_size = host_page_size();
        let pooled = fill_pooled(5000, page_size);
        assert_eq!(pooled.len(), 5000);
        assert_eq!(pooled.growth_stats().relocated, 0);
        assert_eq!(pooled.as_slice(), fill_heap(5000).as_slice());
        assert_eq!(pooled.as_slice(), fill_std(5000).as_slice());
    }
}
