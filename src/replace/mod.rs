pub mod lru;

use crate::cache::CacheLine;

/// Picks which way of a full set gets evicted on a miss.
pub trait Replace {
    fn victim(&mut self, set: &[CacheLine]) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessResult {
    Hit,
    Miss,
}

impl AccessResult {
    pub fn is_hit(self) -> bool {
        self == AccessResult::Hit
    }
}
