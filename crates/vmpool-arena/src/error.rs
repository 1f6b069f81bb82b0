//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use vmpool_core::PageError;

/// Errors that can occur during arena operations.
///
/// Every variant is recoverable: the arena stays well-defined after
/// returning one. The only unrecoverable condition, failing to release
/// the reservation while the arena is dropped, is raised as
/// [`FatalTeardown`] instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// `init` called on an arena that already holds a mapping.
    AlreadyInitialized,
    /// The operation needs a mapping and the arena has none.
    NotInitialized,
    /// The requested mapping leaves no usable page between the guards.
    TooFewPages {
        /// Pages requested.
        pages: usize,
    },
    /// `pages * page_size` does not fit in the address space.
    SizeOverflow {
        /// Pages requested.
        pages: usize,
        /// Host page size in bytes.
        page_size: usize,
    },
    /// The slot layout cannot be served from pages of this size.
    UnsupportedSlot {
        /// Slot stride in bytes.
        size: usize,
        /// Slot alignment in bytes.
        align: usize,
        /// Host page size in bytes.
        page_size: usize,
    },
    /// The host refused to reserve the address range.
    Reserve(PageError),
    /// The host refused to commit a page.
    Commit(PageError),
    /// The host refused to release the reservation.
    Release(PageError),
    /// Fewer free slots remain than were requested.
    CapacityExhausted {
        /// Slots requested.
        requested: usize,
        /// Slots still available for bump allocation.
        available: usize,
    },
    /// A null pointer was passed where a slot pointer is required.
    NullPointer,
    /// A page address is not aligned to the page size.
    Misaligned {
        /// The offending address.
        addr: usize,
    },
    /// An address lies outside the committable part of the mapping.
    OutOfRange {
        /// The offending address.
        addr: usize,
    },
    /// Only the most recent allocation can be extended in place.
    NotTrailing,
    /// `extend` was asked to shrink a block.
    ShrinkingExtent {
        /// Current slot count.
        old: usize,
        /// Requested slot count.
        new: usize,
    },
    /// `free` was asked to release more slots than are occupied.
    OverFree {
        /// Slots passed to `free`.
        count: usize,
        /// Slots currently occupied.
        occupied: usize,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInitialized => write!(f, "arena already initialized"),
            Self::NotInitialized => write!(f, "arena not initialized"),
            Self::TooFewPages { pages } => {
                write!(f, "{pages} pages leave no usable page between the guards")
            }
            Self::SizeOverflow { pages, page_size } => {
                write!(f, "{pages} pages of {page_size} bytes overflow the address space")
            }
            Self::UnsupportedSlot {
                size,
                align,
                page_size,
            } => {
                write!(
                    f,
                    "slot of {size} bytes aligned to {align} cannot be served \
                     from {page_size}-byte pages"
                )
            }
            Self::Reserve(_) => write!(f, "failed to reserve arena mapping"),
            Self::Commit(_) => write!(f, "failed to commit arena page"),
            Self::Release(_) => write!(f, "failed to release arena mapping"),
            Self::CapacityExhausted {
                requested,
                available,
            } => {
                write!(
                    f,
                    "arena capacity exhausted: requested {requested} slots, {available} available"
                )
            }
            Self::NullPointer => write!(f, "null slot pointer"),
            Self::Misaligned { addr } => write!(f, "address {addr:#x} is not page-aligned"),
            Self::OutOfRange { addr } => {
                write!(f, "address {addr:#x} is outside the usable region")
            }
            Self::NotTrailing => write!(f, "block is not the most recent allocation"),
            Self::ShrinkingExtent { old, new } => {
                write!(f, "cannot extend a block from {old} down to {new} slots")
            }
            Self::OverFree { count, occupied } => {
                write!(f, "cannot free {count} slots, only {occupied} occupied")
            }
        }
    }
}

impl Error for ArenaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Reserve(err) | Self::Commit(err) | Self::Release(err) => Some(err),
            _ => None,
        }
    }
}

/// The reservation of a dropped arena could not be released.
///
/// Raised as a panic payload from the arena's destructor, or as a
/// process abort if the thread is already unwinding. A reservation that
/// cannot be released is unrecoverable within the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FatalTeardown(pub ArenaError);

impl fmt::Display for FatalTeardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fatal arena teardown failure: {}", self.0)
    }
}

impl Error for FatalTeardown {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

/// Escalate a failed teardown during drop.
pub(crate) fn fatal_teardown(err: ArenaError) -> ! {
    let fatal = FatalTeardown(err);
    if std::thread::panicking() {
        eprintln!("{fatal}");
        std::process::abort();
    }
    std::panic::panic_any(fatal)
}
