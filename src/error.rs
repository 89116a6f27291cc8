use thiserror::Error;

use crate::memory::MemoryError;

/// Reasons a [`CacheConfig`](crate::config::CacheConfig) cannot describe a cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be non-zero")]
    Zero { field: &'static str },
    #[error("address width of {0} bits is outside 1..=64")]
    AddressBits(u32),
    #[error("line size {0} is not a power of two")]
    LineSize(usize),
    #[error("{ways} ways do not evenly divide {lines} lines")]
    Ways { ways: usize, lines: usize },
    #[error("set count {0} is not a power of two")]
    Sets(usize),
    #[error("{index} index bits and {offset} offset bits do not fit in a {address} bit address")]
    Overflow { index: u32, offset: u32, address: u32 },
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid cache geometry: {0}")]
    Config(#[from] ConfigError),
    #[error("could not allocate cache storage")]
    Allocation(#[from] std::collections::TryReserveError),
    #[error("address {addr:#x} does not fit in {bits} bits")]
    AddressOutOfRange { addr: u64, bits: u32 },
    #[error(transparent)]
    Memory(#[from] MemoryError),
}
