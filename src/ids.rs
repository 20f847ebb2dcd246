//! Monotonic id allocation for rooms and games.

use tracing::warn;

/// Hands out ids from a counter that never repeats.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Creates an allocator starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    /// Returns the next id, `None` once the counter would overflow.
    pub fn allocate(&mut self) -> Option<u64> {
        let id = self.next;
        match id.checked_add(1) {
            Some(next) => {
                self.next = next;
                Some(id)
            }
            None => {
                warn!("Id space exhausted");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_from_zero() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.allocate(), Some(0));
        assert_eq!(ids.allocate(), Some(1));
        assert_eq!(ids.allocate(), Some(2));
    }

    #[test]
    fn test_counts_past_hundred_thousand_without_wrapping() {
        let mut ids = IdAllocator::starting_at(99_999);
        assert_eq!(ids.allocate(), Some(99_999));
        assert_eq!(ids.allocate(), Some(100_000));
        assert_eq!(ids.allocate(), Some(100_001));
    }

    #[test]
    fn test_overflow_is_reported() {
        let mut ids = IdAllocator::starting_at(u64::MAX - 1);
        assert_eq!(ids.allocate(), Some(u64::MAX - 1));
        assert_eq!(ids.allocate(), None);
        assert_eq!(ids.allocate(), None);
    }
}
