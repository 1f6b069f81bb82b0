//! Guard-paged bump arena over a single virtual memory reservation.
//!
//! An [`Arena`] reserves one inaccessible mapping, brackets it with a
//! guard page at each end, and commits the pages in between lazily as
//! its bump cursor advances. The most recently allocated block can be
//! extended in place, so a growable array backed by the arena grows
//! without copying until the mapping runs out.
//!
//! # Architecture
//!
//! ```text
//! Arena<S: PageSource, L: PoolLog>
//! ├── PoolConfig (page count per mapping)
//! ├── SlotLayout (fixed slot stride + alignment)
//! └── Mapping (present while initialized)
//!     ├── Region (base, len) → leading guard │ usable │ trailing guard
//!     ├── commit frontier (first uncommitted page)
//!     └── cursor / occupied / released slot counters
//! ```
//!
//! All host calls go through the [`PageSource`](vmpool_core::PageSource)
//! capability; [`SystemPages`] is the `libc` implementation.
//!
//! # Safety
//!
//! This is the only crate that calls into the host's virtual memory
//! interface. `unsafe` is confined to `system.rs` and the commit/release
//! call sites in `arena.rs`, each with a `// SAFETY:` note.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod arena;
pub mod config;
pub mod error;
pub mod region;
pub mod system;

// Public re-exports for the primary API surface.
pub use arena::Arena;
pub use config::{PoolConfig, SlotLayout};
pub use error::{ArenaError, FatalTeardown};
pub use region::Region;
pub use system::SystemPages;
