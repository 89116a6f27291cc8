use std::collections::HashMap;

use cashier::memory::{Memory, MemoryError};

/// Seeded memory image covering `2^address_bits` bytes that counts the
/// traffic the cache sends it. Only written bytes are stored; the rest are
/// derived from the seed and address on demand.
#[derive(Debug)]
pub struct Ram {
    address_bits: u32,
    seed: u64,
    written: HashMap<u64, u8>,
    pub reads: u64,
    pub writes: u64,
}

impl Ram {
    pub fn new(address_bits: u32, seed: u64) -> Self {
        Ram {
            address_bits,
            seed,
            written: HashMap::new(),
            reads: 0,
            writes: 0,
        }
    }

    fn mapped(&self, addr: u64) -> bool {
        addr.checked_shr(self.address_bits).unwrap_or(0) == 0
    }

    /// Number of addressable bytes, saturated at `u64::MAX`.
    pub fn len(&self) -> u64 {
        1u64.checked_shl(self.address_bits).unwrap_or(u64::MAX)
    }

    pub fn peek(&self, addr: u64) -> Option<u8> {
        if !self.mapped(addr) {
            return None;
        }
        let byte = match self.written.get(&addr) {
            Some(&byte) => byte,
            None => fastrand::Rng::with_seed(self.seed ^ addr).u8(..),
        };
        Some(byte)
    }
}

impl Memory for Ram {
    fn read(&mut self, addr: u64) -> Result<u8, MemoryError> {
        let byte = self.peek(addr).ok_or(MemoryError::Unmapped(addr))?;
        self.reads += 1;
        Ok(byte)
    }

    fn write(&mut self, addr: u64, byte: u8) -> Result<(), MemoryError> {
        if !self.mapped(addr) {
            return Err(MemoryError::Unmapped(addr));
        }
        self.written.insert(addr, byte);
        self.writes += 1;
        Ok(())
    }
}
