//! Integration test: in-place growth over real host mappings.
//!
//! A vector that is the most recent block of its arena keeps its address
//! across every growth. An allocation made behind its back forces exactly
//! one relocation, after which it is trailing again and grows in place.
//! Runs against `SystemPages`, so the guard/commit path is exercised on
//! the host.

#![cfg(unix)]

use vmpool_alloc::{AllocError, HeapAlloc, PageAllocator, PoolVec};
use vmpool_arena::ArenaError;

// ── Helpers ──────────────────────────────────────────────────────────

fn unbounded<T>(pages: usize) -> PageAllocator<T> {
    PageAllocator::with_limits(pages, 0)
}

// ── Tests ────────────────────────────────────────────────────────────

#[test]
fn pointer_is_stable_while_trailing() {
    let mut v = PoolVec::new_in(unbounded::<u64>(64));
    v.push(0).unwrap();
    let first = v.as_ptr();
    for i in 1..10_000u64 {
        v.push(i).unwrap();
        assert_eq!(v.as_ptr(), first, "moved at element {i}");
    }
    assert_eq!(v.growth_stats().relocated, 0);
    assert!(v.iter().copied().eq(0..10_000));
}

#[test]
fn intervening_allocation_forces_one_relocation() {
    let mut v = PoolVec::new_in(unbounded::<u32>(64));
    v.extend_from_iter(0..8).unwrap();
    let before = v.as_ptr();

    // Someone else takes the slots right after the vector's block.
    let other = v.allocator_mut().allocate(4).unwrap();

    v.extend_from_iter(8..64).unwrap();
    assert_ne!(v.as_ptr(), before);
    assert_eq!(v.growth_stats().relocated, 1);
    let relocated_at = v.as_ptr();

    v.extend_from_iter(64..4096).unwrap();
    assert_eq!(v.as_ptr(), relocated_at);
    assert_eq!(v.growth_stats().relocated, 1);
    assert!(v.iter().copied().eq(0..4096));

    assert!(v.allocator().owns(other.as_ptr()));
    assert_eq!(v.allocator().arena().released_slots(), 8);
}

#[test]
fn commits_follow_the_length() {
    let mut v = PoolVec::new_in(unbounded::<u8>(34));
    assert!(!v.allocator().arena().is_initialized());
    v.push(1).unwrap();
    let arena = v.allocator().arena();
    assert_eq!(arena.committed_pages(), 1);

    let page = arena.page_size();
    v.extend_from_iter(std::iter::repeat_n(7, 3 * page)).unwrap();
    let committed = v.allocator().arena().committed_pages();
    assert!(committed >= 4, "committed {committed} pages");
    assert!(committed <= 32);
}

#[test]
fn full_mapping_reports_exhaustion() {
    let alloc = unbounded::<u64>(3);
    let slots = alloc.arena().page_size() / 8;
    let mut v = PoolVec::new_in(alloc);
    v.extend_from_iter(0..slots as u64).unwrap();
    let err = v.push(0).unwrap_err();
    assert!(matches!(
        err,
        AllocError::Arena(ArenaError::CapacityExhausted { .. })
    ));
    assert_eq!(v.len(), slots);
}

#[test]
fn default_ceiling_caps_single_requests() {
    let mut v: PoolVec<u32> = PoolVec::new();
    v.extend_from_iter(0..10).unwrap();
    assert_eq!(v.capacity(), 10);
    assert!(matches!(v.push(10), Err(AllocError::TooLarge { max: 10, .. })));
    assert_eq!(v.len(), 10);
}

#[test]
fn heap_backed_vector_matches_contents() {
    let mut pooled = PoolVec::new_in(unbounded::<u16>(16));
    let mut heap: PoolVec<u16, HeapAlloc<u16>> = PoolVec::new();
    for i in 0..2000u16 {
        pooled.push(i).unwrap();
        heap.push(i).unwrap();
    }
    assert_eq!(pooled.as_slice(), heap.as_slice());
    assert_eq!(pooled.growth_stats().relocated, 0);
    assert!(heap.growth_stats().relocated > 0);
}
