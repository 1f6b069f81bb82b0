//! Error types for host page operations.
//!
//! A [`PageError`] describes one failed call into the host's virtual
//! memory interface. Arena and allocator errors wrap it as their
//! `source()`.

use std::error::Error;
use std::fmt;

/// The host page operation that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageOp {
    /// Reserving an inaccessible address range (`mmap(PROT_NONE)`).
    Reserve,
    /// Making a page-aligned sub-range read/write (`mprotect`).
    Commit,
    /// Releasing the whole reservation (`munmap`).
    Release,
}

impl fmt::Display for PageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserve => write!(f, "reserve"),
            Self::Commit => write!(f, "commit"),
            Self::Release => write!(f, "release"),
        }
    }
}

/// A failed host page operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageError {
    /// Which operation failed.
    pub op: PageOp,
    /// Length in bytes of the range the operation covered.
    pub len: usize,
    /// The host error code (`errno`), if the failure came from the OS.
    ///
    /// `None` for synthetic failures such as injected test faults.
    pub os_code: Option<i32>,
}

impl PageError {
    /// Create an error for `op` over `len` bytes with no OS code.
    pub fn new(op: PageOp, len: usize) -> Self {
        Self {
            op,
            len,
            os_code: None,
        }
    }

    /// Create an error for `op` over `len` bytes from the calling
    /// thread's last OS error.
    pub fn last_os_error(op: PageOp, len: usize) -> Self {
        Self {
            op,
            len,
            os_code: std::io::Error::last_os_error().raw_os_error(),
        }
    }
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} of {} bytes failed", self.op, self.len)?;
        if let Some(code) = self.os_code {
            write!(f, " (os error {code})")?;
        }
        Ok(())
    }
}

impl Error for PageError {}
