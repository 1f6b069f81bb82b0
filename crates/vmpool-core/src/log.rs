//! Diagnostic hook invoked at the entry of every pool operation.
//!
//! The hook is a pure side channel: implementations observe which
//! operation ran and, where meaningful, one numeric parameter. They can
//! never change a result. Arenas and allocators take the hook as a
//! generic parameter, so the default [`NoopLog`] costs nothing.

use std::fmt;

use tracing::Level;

/// Identity of an instrumented operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    /// Host page size query. Parameter: page size in bytes.
    PageSize,
    /// Arena reservation. Parameter: requested page count.
    Init,
    /// Arena release.
    Teardown,
    /// Ownership test.
    Owns,
    /// Single page commit.
    CommitPage,
    /// Commit of every page up to a byte address.
    CommitRange,
    /// Arena slot allocation. Parameter: slot count.
    Allocate,
    /// Arena in-place extension. Parameter: slot delta.
    Extend,
    /// Arena slot release. Parameter: slot count.
    Free,
    /// Arena copy into a fresh mapping. Recorded again with the page
    /// count if the copy's reservation fails.
    Clone,
    /// Allocator construction.
    AllocatorNew,
    /// Allocator allocation. Parameter: element count.
    AllocatorAllocate,
    /// Allocator deallocation. Parameter: element count.
    AllocatorDeallocate,
    /// Allocator in-place extension. Parameter: new element count.
    AllocatorExtend,
    /// Allocator size limit query. Parameter: the computed limit.
    MaxSize,
    /// Allocator rebind to another element type.
    Rebind,
    /// Allocator interchangeability test.
    Compare,
}

impl Op {
    /// Dotted operation name, e.g. `arena::allocate`.
    pub fn name(self) -> &'static str {
        match self {
            Self::PageSize => "arena::page_size",
            Self::Init => "arena::init",
            Self::Teardown => "arena::teardown",
            Self::Owns => "arena::owns",
            Self::CommitPage => "arena::commit_page",
            Self::CommitRange => "arena::commit_range",
            Self::Allocate => "arena::allocate",
            Self::Extend => "arena::extend",
            Self::Free => "arena::free",
            Self::Clone => "arena::clone",
            Self::AllocatorNew => "alloc::new",
            Self::AllocatorAllocate => "alloc::allocate",
            Self::AllocatorDeallocate => "alloc::deallocate",
            Self::AllocatorExtend => "alloc::extend",
            Self::MaxSize => "alloc::max_size",
            Self::Rebind => "alloc::rebind",
            Self::Compare => "alloc::compare",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives one record per instrumented operation.
pub trait PoolLog {
    /// Record that `op` was entered, with an optional numeric parameter.
    fn record(&self, op: Op, arg: Option<usize>);
}

/// Discards every record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoopLog;

impl PoolLog for NoopLog {
    #[inline(always)]
    fn record(&self, _op: Op, _arg: Option<usize>) {}
}

/// Forwards every record to [`tracing`] as a `TRACE` event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraceLog;

impl PoolLog for TraceLog {
    fn record(&self, op: Op, arg: Option<usize>) {
        match arg {
            Some(n) => tracing::event!(Level::TRACE, op = op.name(), n),
            None => tracing::event!(Level::TRACE, op = op.name()),
        }
    }
}

impl<L: PoolLog + ?Sized> PoolLog for &L {
    fn record(&self, op: Op, arg: Option<usize>) {
        (**self).record(op, arg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_prefixed_by_layer() {
        assert_eq!(Op::Allocate.to_string(), "arena::allocate");
        assert_eq!(Op::AllocatorAllocate.to_string(), "alloc::allocate");
        assert_eq!(Op::MaxSize.to_string(), "alloc::max_size");
    }

    #[test]
    fn noop_log_is_zero_sized() {
        assert_eq!(std::mem::size_of::<NoopLog>(), 0);
        NoopLog.record(Op::Init, Some(10));
    }

    #[test]
    fn trace_log_without_subscriber_is_silent() {
        TraceLog.record(Op::Extend, Some(4));
        TraceLog.record(Op::Teardown, None);
    }
}
