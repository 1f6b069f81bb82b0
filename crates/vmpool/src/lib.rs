//! vmpool: guard-paged virtual memory arenas with in-place growth.
//!
//! This is the top-level facade crate that re-exports the public API of
//! the vmpool sub-crates. For most users, adding `vmpool` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use vmpool::prelude::*;
//!
//! // 64 pages per mapping, no per-request ceiling.
//! let mut v = PoolVec::new_in(PageAllocator::<u64>::with_limits(64, 0));
//! for i in 0..1000 {
//!     v.push(i).unwrap();
//! }
//! assert_eq!(v.growth_stats().relocated, 0);
//! assert!(v.allocator().owns(v.as_ptr()));
//! ```
//!
//! # Tracing
//!
//! Every arena and allocator operation can be reported through
//! [`tracing`] by building with [`TraceLog`](types::TraceLog):
//!
//! ```rust
//! use vmpool::prelude::*;
//! use vmpool::arena::SystemPages;
//! use vmpool::types::TraceLog;
//!
//! let mut alloc: PageAllocator<u32, SystemPages, TraceLog> =
//!     PageAllocator::with_source(SystemPages::new(), TraceLog, PoolConfig::default(), 0);
//! let p = alloc.allocate(4).unwrap();
//! alloc.deallocate(p, 4).unwrap();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `vmpool-core` | `PageSource`, `PageError`, `PoolLog` and its sinks |
//! | [`arena`] | `vmpool-arena` | `Arena`, `PoolConfig`, `Region`, `SystemPages` |
//! | [`alloc`] | `vmpool-alloc` | `PageAllocator`, `PoolVec`, `SlotAlloc`, `HeapAlloc` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// The guard-paged bump arena (`vmpool-arena`).
pub use vmpool_arena as arena;

/// Host page capability, page errors and diagnostic sinks (`vmpool-core`).
pub use vmpool_core as types;

/// Typed allocator facade and the growable vector (`vmpool-alloc`).
pub use vmpool_alloc as alloc;

/// Re-exported so callers can install a subscriber for
/// [`TraceLog`](types::TraceLog) without a separate dependency.
pub use tracing;

/// Common imports for typical vmpool usage.
///
/// ```rust
/// use vmpool::prelude::*;
/// ```
pub mod prelude {
    // Arena
    pub use vmpool_arena::{Arena, ArenaError, PoolConfig, SlotLayout};

    // Allocator and containers
    pub use vmpool_alloc::{AllocError, HeapAlloc, PageAllocator, PoolVec, SlotAlloc, SlotPolicy};

    // Diagnostics
    pub use vmpool_core::{NoopLog, PoolLog};
}
