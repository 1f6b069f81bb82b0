//! Core types and traits for the vmpool page arena.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the abstractions shared by the arena and allocator crates: the
//! host page capability ([`PageSource`]), its error type
//! ([`PageError`]), and the diagnostic hook ([`PoolLog`]) invoked at
//! the entry of every arena and allocator operation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod error;
pub mod log;
pub mod traits;

pub use error::{PageError, PageOp};
pub use log::{NoopLog, Op, PoolLog, TraceLog};
pub use traits::PageSource;
