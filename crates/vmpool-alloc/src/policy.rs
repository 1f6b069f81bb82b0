//! The allocator's element and slot-count policy.

use std::alloc::Layout;

use vmpool_arena::SlotLayout;

use crate::error::AllocError;

/// Element geometry plus the slot-count ceiling of one allocator.
///
/// Two policies are interchangeable when their aligned element sizes
/// match: a block allocated under one can then be released under the
/// other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotPolicy {
    /// `size_of` the element type.
    pub element_size: usize,
    /// `align_of` the element type.
    pub element_align: usize,
    /// Largest element count a single request may ask for. Zero means
    /// unbounded.
    pub max_slots: usize,
}

impl SlotPolicy {
    /// Ceiling used by [`PageAllocator::new`](crate::PageAllocator::new).
    pub const DEFAULT_MAX_SLOTS: usize = 10;

    /// The policy for elements of type `T`.
    pub fn of<T>(max_slots: usize) -> Self {
        let layout = Layout::new::<T>();
        Self {
            element_size: layout.size(),
            element_align: layout.align(),
            max_slots,
        }
    }

    /// Element size rounded up to its alignment.
    pub fn aligned_size(&self) -> usize {
        self.element_size.next_multiple_of(self.element_align)
    }

    /// The arena slot layout for this element type.
    pub fn slot_layout(&self) -> SlotLayout {
        SlotLayout {
            size: self.aligned_size(),
            align: self.element_align,
        }
    }

    /// Largest element count whose byte size fits in `isize`.
    pub fn theoretical_max(&self) -> usize {
        match self.aligned_size() {
            0 => usize::MAX,
            size => isize::MAX as usize / size,
        }
    }

    /// The configured ceiling if set, the theoretical maximum otherwise.
    pub fn max_size(&self) -> usize {
        if self.max_slots == 0 {
            self.theoretical_max()
        } else {
            self.max_slots
        }
    }

    /// Check a request for `n` elements against both limits.
    pub fn check(&self, n: usize) -> Result<(), AllocError> {
        let max = self.theoretical_max();
        if n > max {
            return Err(AllocError::TooLarge { requested: n, max });
        }
        if self.max_slots != 0 && n > self.max_slots {
            return Err(AllocError::CeilingExceeded {
                requested: n,
                ceiling: self.max_slots,
            });
        }
        Ok(())
    }

    /// Whether blocks from one policy can be released under the other.
    pub fn is_interchangeable_with(&self, other: &SlotPolicy) -> bool {
        self.aligned_size() == other.aligned_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ceiling_is_unbounded() {
        let policy = SlotPolicy::of::<u64>(0);
        assert_eq!(policy.max_size(), isize::MAX as usize / 8);
        assert!(policy.check(1 << 40).is_ok());
    }

    #[test]
    fn ceiling_limits_single_requests() {
        let policy = SlotPolicy::of::<u32>(SlotPolicy::DEFAULT_MAX_SLOTS);
        assert_eq!(policy.max_size(), 10);
        assert!(policy.check(10).is_ok());
        assert_eq!(
            policy.check(11),
            Err(AllocError::CeilingExceeded {
                requested: 11,
                ceiling: 10,
            })
        );
    }

    #[test]
    fn address_space_limit_wins_over_ceiling() {
        let policy = SlotPolicy::of::<[u8; 1024]>(usize::MAX);
        let max = policy.theoretical_max();
        assert_eq!(
            policy.check(max + 1),
            Err(AllocError::TooLarge {
                requested: max + 1,
                max,
            })
        );
    }

    #[test]
    fn interchangeability_compares_aligned_sizes() {
        let a = SlotPolicy::of::<u64>(10);
        let b = SlotPolicy::of::<f64>(0);
        let c = SlotPolicy::of::<u32>(10);
        let d = SlotPolicy::of::<(u32, u16)>(10);
        assert!(a.is_interchangeable_with(&b));
        assert!(!a.is_interchangeable_with(&c));
        assert!(a.is_interchangeable_with(&d));
    }

    #[test]
    fn zero_sized_elements_are_unbounded() {
        let policy = SlotPolicy::of::<()>(0);
        assert_eq!(policy.aligned_size(), 0);
        assert_eq!(policy.theoretical_max(), usize::MAX);
    }
}
