//! Test utilities and fake types for vmpool development.
//!
//! Provides [`FakePages`], an in-process
//! [`PageSource`](vmpool_core::PageSource) with fault
//! injection, and [`RecordingLog`], a [`PoolLog`] that keeps every
//! record for later assertions.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::cell::RefCell;
use std::rc::Rc;

use vmpool_core::{Op, PoolLog};

mod pages;

pub use pages::FakePages;

/// Records every `(Op, parameter)` pair it receives.
///
/// Clones share one buffer, so a clone handed to an arena can be
/// inspected through the original.
#[derive(Clone, Debug, Default)]
pub struct RecordingLog {
    records: Rc<RefCell<Vec<(Op, Option<usize>)>>>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, oldest first.
    pub fn records(&self) -> Vec<(Op, Option<usize>)> {
        self.records.borrow().clone()
    }

    /// Just the operation identities, oldest first.
    pub fn ops(&self) -> Vec<Op> {
        self.records.borrow().iter().map(|(op, _)| *op).collect()
    }

    /// How many times `op` was recorded.
    pub fn count(&self, op: Op) -> usize {
        self.records.borrow().iter().filter(|(o, _)| *o == op).count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

impl PoolLog for RecordingLog {
    fn record(&self, op: Op, arg: Option<usize>) {
        self.records.borrow_mut().push((op, arg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_records() {
        let log = RecordingLog::new();
        let handle = log.clone();
        handle.record(Op::Init, Some(4));
        handle.record(Op::Allocate, Some(10));
        handle.record(Op::Allocate, Some(2));
        assert_eq!(log.ops(), vec![Op::Init, Op::Allocate, Op::Allocate]);
        assert_eq!(log.count(Op::Allocate), 2);
        log.clear();
        assert!(handle.records().is_empty());
    }
}
