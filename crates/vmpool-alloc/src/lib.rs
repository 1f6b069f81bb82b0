//! Typed allocation over vmpool arenas.
//!
//! [`PageAllocator<T>`] turns an [`Arena`](vmpool_arena::Arena) into an
//! element allocator with a per-request slot ceiling, and [`PoolVec`] is
//! a growable array that extends its block in place whenever the
//! allocator allows it.
//!
//! # Architecture
//!
//! ```text
//! PoolVec<T, A: SlotAlloc<T>>
//! └── A = PageAllocator<T, S, L>      (or HeapAlloc<T>)
//!     ├── SlotPolicy (element size/align, max_slots ceiling)
//!     └── Arena<S, L> (one guard-paged mapping)
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod allocator;
pub mod error;
pub mod policy;
pub mod slot_alloc;
pub mod vec;

// Public re-exports for the primary API surface.
pub use allocator::PageAllocator;
pub use error::AllocError;
pub use policy::SlotPolicy;
pub use slot_alloc::{HeapAlloc, SlotAlloc};
pub use vec::{GrowthStats, PoolVec};
