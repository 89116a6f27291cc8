//! Backing store the cache sits in front of.
//!
//! The engine never owns a concrete memory; callers hand it anything that
//! implements [`Memory`]. Because `&mut M` is itself a `Memory`, a caller can
//! lend its store to a cache and inspect it again once the cache is released.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("address {0:#x} is not backed by memory")]
    Unmapped(u64),
    #[error("memory fault at {0:#x}")]
    Fault(u64),
}

/// Byte-addressable backing memory.
pub trait Memory {
    fn read(&mut self, addr: u64) -> Result<u8, MemoryError>;
    fn write(&mut self, addr: u64, byte: u8) -> Result<(), MemoryError>;
}

impl<M: Memory + ?Sized> Memory for &mut M {
    fn read(&mut self, addr: u64) -> Result<u8, MemoryError> {
        (**self).read(addr)
    }

    fn write(&mut self, addr: u64, byte: u8) -> Result<(), MemoryError> {
        (**self).write(addr, byte)
    }
}

impl<M: Memory + ?Sized> Memory for Box<M> {
    fn read(&mut self, addr: u64) -> Result<u8, MemoryError> {
        (**self).read(addr)
    }

    fn write(&mut self, addr: u64, byte: u8) -> Result<(), MemoryError> {
        (**self).write(addr, byte)
    }
}
