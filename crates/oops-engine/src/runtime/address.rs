//! Instance addresses

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique handle of one constructed instance's chain entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(u64);

impl Address {
    /// Get the raw address value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic address source. Addresses are never reissued, not even
/// after every chain has been disposed.
#[derive(Debug)]
pub struct AddressAllocator {
    next: AtomicU64,
}

impl AddressAllocator {
    /// Create an allocator whose first address is 1
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Issue a fresh address
    pub fn allocate(&self) -> Address {
        Address(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of addresses issued so far
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed) - 1
    }
}

impl Default for AddressAllocator {
    fn default() -> Self {
        Self::new()
    }
}
