//! Allocator-level error types.

use std::error::Error;
use std::fmt;

use vmpool_arena::ArenaError;

/// Errors returned by [`PageAllocator`](crate::PageAllocator) and the
/// [`SlotAlloc`](crate::SlotAlloc) implementations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// More elements than the address space can describe.
    TooLarge {
        /// Elements requested.
        requested: usize,
        /// Largest element count that could ever be allocated.
        max: usize,
    },
    /// More elements than the allocator's configured ceiling.
    CeilingExceeded {
        /// Elements requested.
        requested: usize,
        /// The configured slot ceiling.
        ceiling: usize,
    },
    /// The global heap could not satisfy the request.
    HeapExhausted {
        /// Bytes requested.
        bytes: usize,
    },
    /// The backing arena refused the request.
    Arena(ArenaError),
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge { requested, max } => {
                write!(f, "allocation of {requested} elements exceeds maximum {max}")
            }
            Self::CeilingExceeded { requested, ceiling } => {
                write!(
                    f,
                    "allocation of {requested} elements exceeds slot ceiling {ceiling}"
                )
            }
            Self::HeapExhausted { bytes } => write!(f, "heap allocation of {bytes} bytes failed"),
            Self::Arena(err) => write!(f, "arena allocation failed: {err}"),
        }
    }
}

impl Error for AllocError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arena(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ArenaError> for AllocError {
    fn from(err: ArenaError) -> Self {
        Self::Arena(err)
    }
}
