//! A write-back, write-allocate, set-associative cache simulator.
//!
//! A [`Cache`](cache::Cache) splits addresses into tag, set index and offset
//! from a [`CacheConfig`](config::CacheConfig), keeps a data buffer per line,
//! and evicts the least recently used line of a full set. Backing memory and
//! the LRU clock are supplied by the caller through the [`Memory`](memory::Memory)
//! and [`Clock`](clock::Clock) traits.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod memory;
pub mod replace;
