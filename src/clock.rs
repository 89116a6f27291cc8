/// Source of LRU timestamps. Values must never decrease between calls.
pub trait Clock {
    fn now(&mut self) -> u64;
}

impl<F: FnMut() -> u64> Clock for F {
    fn now(&mut self) -> u64 {
        self()
    }
}

/// Counts accesses. Starts at 1 so a freshly filled line is always newer
/// than an empty one.
#[derive(Debug)]
pub struct Tick {
    pub access_idx: u64,
}

impl Tick {
    pub fn new() -> Self {
        Tick { access_idx: 0 }
    }
}

impl Default for Tick {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for Tick {
    fn now(&mut self) -> u64 {
        self.access_idx += 1;
        self.access_idx
    }
}
