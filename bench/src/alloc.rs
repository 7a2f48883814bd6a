//! Allocation accounting for the bench driver.
//!
//! Install [`CountingAllocator`] as the `#[global_allocator]` in a binary to
//! get per-sample allocation counts. Without it the counters stay at zero and
//! the report shows `-` for allocations.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

static ALLOCATIONS: AtomicU64 = AtomicU64::new(0);
static ALLOCATED_BYTES: AtomicU64 = AtomicU64::new(0);
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// A [`System`] wrapper that counts every allocation made by the process.
pub struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        record(layout.size());
        unsafe { System.alloc(layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        record(layout.size());
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        record(new_size);
        unsafe { System.realloc(ptr, layout, new_size) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[inline]
fn record(bytes: usize) {
    INSTALLED.store(true, Ordering::Relaxed);
    ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
    ALLOCATED_BYTES.fetch_add(bytes as u64, Ordering::Relaxed);
}

/// Whether the counting allocator has seen any allocation, i.e. is installed.
pub fn is_counting() -> bool {
    INSTALLED.load(Ordering::Relaxed)
}

/// Process-wide allocation counters at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocSnapshot {
    pub allocations: u64,
    pub bytes: u64,
}

impl AllocSnapshot {
    pub fn now() -> Self {
        Self {
            allocations: ALLOCATIONS.load(Ordering::Relaxed),
            bytes: ALLOCATED_BYTES.load(Ordering::Relaxed),
        }
    }

    /// Counts accumulated between `self` and `later`.
    ///
    /// Concurrent tasks (other strategies' branches, tokio internals) are
    /// counted too, so run one case at a time.
    pub fn delta(&self, later: &AllocSnapshot) -> AllocSnapshot {
        AllocSnapshot {
            allocations: later.allocations.saturating_sub(self.allocations),
            bytes: later.bytes.saturating_sub(self.bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_the_difference_and_never_underflows() {
        let before = AllocSnapshot {
            allocations: 10,
            bytes: 400,
        };
        let after = AllocSnapshot {
            allocations: 13,
            bytes: 1000,
        };
        assert_eq!(
            before.delta(&after),
            AllocSnapshot {
                allocations: 3,
                bytes: 600
            }
        );
        assert_eq!(after.delta(&before), AllocSnapshot::default());
    }
}
