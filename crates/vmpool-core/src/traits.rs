//! The host page capability consumed by the arena.
//!
//! Commit and release are `unsafe` trait methods: their callers must
//! uphold the reservation bounds documented on each.

#![allow(unsafe_code)]

use std::ptr::NonNull;

use crate::error::PageError;

/// Access to the host's virtual memory interface.
///
/// The arena never calls the operating system directly. It is handed a
/// `PageSource` at construction and performs every reservation, commit
/// and release through it, which lets the arena's bookkeeping be tested
/// against an in-process fake instead of a real mapping.
///
/// Each call either fully succeeds or fails with no visible partial
/// state.
pub trait PageSource {
    /// The host page granularity in bytes. Always a power of two.
    ///
    /// Queried once when an arena is constructed.
    fn page_size(&self) -> usize;

    /// Reserve `len` bytes of address space with no access rights.
    ///
    /// `len` is a non-zero multiple of [`page_size`](Self::page_size).
    /// The returned base is page-aligned.
    fn reserve(&self, len: usize) -> Result<NonNull<u8>, PageError>;

    /// Make `len` bytes starting at `addr` readable and writable.
    ///
    /// Committing an already committed range succeeds.
    ///
    /// # Safety
    ///
    /// `addr` must be page-aligned and `addr..addr + len` must lie inside
    /// a live reservation obtained from [`reserve`](Self::reserve) on this
    /// source.
    unsafe fn commit(&self, addr: NonNull<u8>, len: usize) -> Result<(), PageError>;

    /// Release a whole reservation.
    ///
    /// # Safety
    ///
    /// `base` and `len` must be exactly the base and length of a live
    /// reservation from this source. No pointer into the range may be
    /// used afterwards.
    unsafe fn release(&self, base: NonNull<u8>, len: usize) -> Result<(), PageError>;
}
