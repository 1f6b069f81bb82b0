//! Arena configuration parameters.

use std::alloc::Layout;

/// Configuration for one arena reservation.
///
/// The reservation is a single mapping of `pages` host pages. Its first
/// and last page are guard pages, so the usable region is
/// `pages - GUARD_PAGES` pages long. The mapping never grows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Total pages reserved per mapping, guard pages included.
    ///
    /// Zero selects [`DEFAULT_PAGES`](Self::DEFAULT_PAGES) at init time.
    pub pages: usize,
}

impl PoolConfig {
    /// Default page count: ten pages, eight of them usable.
    pub const DEFAULT_PAGES: usize = 10;

    /// Pages lost to the leading and trailing guard.
    pub const GUARD_PAGES: usize = 2;

    /// Smallest mapping that leaves one usable page between the guards.
    pub const MIN_PAGES: usize = Self::GUARD_PAGES + 1;

    /// Create a config reserving `pages` pages per mapping.
    pub fn new(pages: usize) -> Self {
        Self { pages }
    }

    /// The page count an init call will actually reserve.
    pub fn effective_pages(&self) -> usize {
        if self.pages == 0 {
            Self::DEFAULT_PAGES
        } else {
            self.pages
        }
    }

    /// Usable bytes between the guards for a given page size.
    ///
    /// Returns `None` if the mapping is smaller than
    /// [`MIN_PAGES`](Self::MIN_PAGES) or the size overflows.
    pub fn usable_bytes(&self, page_size: usize) -> Option<usize> {
        let pages = self.effective_pages();
        if pages < Self::MIN_PAGES {
            return None;
        }
        (pages - Self::GUARD_PAGES).checked_mul(page_size)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Storage footprint of one slot.
///
/// `size` is the element size rounded up to `align`, i.e. the stride
/// between two consecutive slots. An arena hands out slots of exactly
/// one layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotLayout {
    /// Stride between consecutive slots in bytes.
    pub size: usize,
    /// Required alignment of every slot.
    pub align: usize,
}

impl SlotLayout {
    /// The slot layout for values of type `T`.
    pub fn of<T>() -> Self {
        Self::from_layout(Layout::new::<T>())
    }

    /// A slot layout for `size` bytes at `align`.
    ///
    /// Returns `None` if `align` is not a power of two or the padded size
    /// overflows.
    pub fn new(size: usize, align: usize) -> Option<Self> {
        Layout::from_size_align(size, align)
            .ok()
            .map(Self::from_layout)
    }

    fn from_layout(layout: Layout) -> Self {
        let padded = layout.pad_to_align();
        Self {
            size: padded.size(),
            align: padded.align(),
        }
    }

    /// Whether slots of this layout can be carved out of pages of
    /// `page_size` bytes. Zero-sized slots never can.
    pub fn fits_page(&self, page_size: usize) -> bool {
        self.size != 0 && self.align <= page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_pages_selects_default() {
        let config = PoolConfig::default();
        assert_eq!(config.effective_pages(), PoolConfig::DEFAULT_PAGES);
        assert_eq!(config.usable_bytes(4096), Some(8 * 4096));
    }

    #[test]
    fn two_pages_leave_nothing_usable() {
        assert_eq!(PoolConfig::new(2).usable_bytes(4096), None);
        assert_eq!(PoolConfig::new(3).usable_bytes(4096), Some(4096));
    }

    #[test]
    fn slot_size_is_padded_to_alignment() {
        let slot = SlotLayout::new(5, 4).unwrap();
        assert_eq!(slot.size, 8);
        assert_eq!(slot.align, 4);
        assert_eq!(SlotLayout::of::<u64>(), SlotLayout { size: 8, align: 8 });
        assert_eq!(SlotLayout::of::<(u8, u32)>().size, 8);
    }

    #[test]
    fn bad_alignment_is_rejected() {
        assert!(SlotLayout::new(8, 3).is_none());
    }

    #[test]
    fn zero_sized_and_overaligned_slots_do_not_fit() {
        assert!(!SlotLayout::of::<()>().fits_page(4096));
        assert!(!SlotLayout::new(8192, 8192).unwrap().fits_page(4096));
        assert!(SlotLayout::of::<[u8; 3]>().fits_page(4096));
    }
}
