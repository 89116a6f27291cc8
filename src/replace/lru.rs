use crate::cache::CacheLine;

use super::Replace;

/// Evicts the line with the oldest `last_access` stamp. Empty lines carry a
/// stamp of 0, so they are consumed before any resident line. Ties go to the
/// lowest way.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lru;

impl Lru {
    pub fn new() -> Self {
        Lru
    }
}

impl Replace for Lru {
    fn victim(&mut self, set: &[CacheLine]) -> usize {
        let mut lru_way = 0;
        for (way, line) in set.iter().enumerate().skip(1) {
            if line.last_access < set[lru_way].last_access {
                lru_way = way;
            }
        }
        lru_way
    }
}
