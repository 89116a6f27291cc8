use std::ops::Range;

use tracing::{debug, trace, warn};

use crate::{
    clock::Clock,
    config::CacheConfig,
    error::{CacheError, ConfigError},
    memory::{Memory, MemoryError},
    replace::{lru::Lru, AccessResult, Replace},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addr {
    pub offset: usize,
    pub set: usize,
    pub tag: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitSection {
    shift: u32,
    mask: u64,
}

impl BitSection {
    fn new(shift: u32, width: u32) -> Self {
        let mask = u64::MAX.checked_shr(64 - width).unwrap_or(0);
        BitSection { shift, mask }
    }

    fn apply(&self, num: u64) -> u64 {
        num.checked_shr(self.shift).unwrap_or(0) & self.mask
    }

    /// Mask selecting this section in place within a raw address.
    pub fn positioned_mask(&self) -> u64 {
        self.mask.checked_shl(self.shift).unwrap_or(0)
    }
}

/// Bit layout of an address, derived from a [`CacheConfig`].
///
/// From least to most significant: `offset_bits` select a byte within a line,
/// `index_bits` select a set, and the remaining `tag_bits` identify the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub address_bits: u32,
    pub tag_bits: u32,
    pub index_bits: u32,
    pub offset_bits: u32,
    offset_sec: BitSection,
    set_sec: BitSection,
    tag_sec: BitSection,
}

impl Geometry {
    pub fn new(config: &CacheConfig) -> Result<Self, ConfigError> {
        if !(1..=64).contains(&config.address_bits) {
            return Err(ConfigError::AddressBits(config.address_bits));
        }
        for (field, value) in [
            ("ways", config.ways),
            ("line_size", config.line_size),
            ("lines", config.lines),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        if !config.line_size.is_power_of_two() {
            return Err(ConfigError::LineSize(config.line_size));
        }
        if config.lines % config.ways != 0 {
            return Err(ConfigError::Ways {
                ways: config.ways,
                lines: config.lines,
            });
        }
        let n_sets = config.sets();
        if !n_sets.is_power_of_two() {
            return Err(ConfigError::Sets(n_sets));
        }

        let offset_bits = config.line_size.ilog2();
        let index_bits = n_sets.ilog2();
        if offset_bits + index_bits > config.address_bits {
            return Err(ConfigError::Overflow {
                index: index_bits,
                offset: offset_bits,
                address: config.address_bits,
            });
        }
        let tag_bits = config.address_bits - index_bits - offset_bits;

        Ok(Geometry {
            address_bits: config.address_bits,
            tag_bits,
            index_bits,
            offset_bits,
            offset_sec: BitSection::new(0, offset_bits),
            set_sec: BitSection::new(offset_bits, index_bits),
            tag_sec: BitSection::new(offset_bits + index_bits, tag_bits),
        })
    }

    pub fn tag_mask(&self) -> u64 {
        self.tag_sec.positioned_mask()
    }

    pub fn index_mask(&self) -> u64 {
        self.set_sec.positioned_mask()
    }

    pub fn offset_mask(&self) -> u64 {
        self.offset_sec.positioned_mask()
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr.checked_shr(self.address_bits).unwrap_or(0) == 0
    }

    pub fn split(&self, addr: u64) -> Addr {
        Addr {
            offset: self.offset_sec.apply(addr) as usize,
            set: self.set_sec.apply(addr) as usize,
            tag: self.tag_sec.apply(addr),
        }
    }

    /// Base address of the block `tag` names within `set`.
    pub fn join(&self, tag: u64, set: usize) -> u64 {
        tag.checked_shl(self.index_bits + self.offset_bits).unwrap_or(0)
            | (set as u64).checked_shl(self.offset_bits).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLine {
    pub valid: bool,
    pub dirty: bool,
    pub tag: u64,
    pub last_access: u64,
    pub data: Box<[u8]>,
}

impl CacheLine {
    pub(crate) fn new(line_size: usize) -> Self {
        CacheLine {
            valid: false,
            dirty: false,
            tag: 0,
            last_access: 0,
            data: vec![0; line_size].into_boxed_slice(),
        }
    }

    fn try_new(line_size: usize) -> Result<Self, CacheError> {
        let mut data = Vec::new();
        data.try_reserve_exact(line_size)?;
        data.resize(line_size, 0);
        Ok(CacheLine {
            data: data.into_boxed_slice(),
            ..CacheLine::new(0)
        })
    }

    fn apply(&mut self, offset: usize, op: Op) -> u8 {
        match op {
            Op::Read => self.data[offset],
            Op::Write(byte) => {
                self.data[offset] = byte;
                self.dirty = true;
                byte
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Read,
    Write(u8),
}

fn write_back<M: Memory>(memory: &mut M, base: u64, data: &[u8]) -> Result<(), MemoryError> {
    // Lines are aligned, so `base + offset` stays inside the address space.
    for (offset, &byte) in data.iter().enumerate() {
        memory.write(base + offset as u64, byte)?;
    }
    Ok(())
}

fn fill<M: Memory>(memory: &mut M, base: u64, data: &mut [u8]) -> Result<(), MemoryError> {
    for (offset, byte) in data.iter_mut().enumerate() {
        *byte = memory.read(base + offset as u64)?;
    }
    Ok(())
}

/// A write-back, write-allocate set-associative cache in front of `M`.
///
/// Dirty lines still resident when the cache goes away are written back,
/// either by [`Cache::release`] (which reports failures) or on drop (which
/// can only log them).
#[derive(Debug)]
pub struct Cache<M: Memory, C: Clock, R: Replace = Lru> {
    config: CacheConfig,
    geometry: Geometry,
    lines: Vec<CacheLine>,
    memory: M,
    clock: C,
    repl: R,
    released: bool,
}

impl<M: Memory, C: Clock> Cache<M, C, Lru> {
    pub fn new(config: CacheConfig, memory: M, clock: C) -> Result<Self, CacheError> {
        Cache::with_policy(config, memory, clock, Lru::new())
    }
}

impl<M: Memory, C: Clock, R: Replace> Cache<M, C, R> {
    pub fn with_policy(config: CacheConfig, memory: M, clock: C, repl: R) -> Result<Self, CacheError> {
        let geometry = Geometry::new(&config)?;

        let mut lines = Vec::new();
        lines.try_reserve_exact(config.lines)?;
        for _ in 0..config.lines {
            lines.push(CacheLine::try_new(config.line_size)?);
        }

        debug!(
            ?config,
            tag_bits = geometry.tag_bits,
            index_bits = geometry.index_bits,
            offset_bits = geometry.offset_bits,
            "created cache"
        );
        Ok(Cache {
            config,
            geometry,
            lines,
            memory,
            clock,
            repl,
            released: false,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    pub fn lines(&self) -> &[CacheLine] {
        &self.lines
    }

    pub fn line(&self, idx: usize) -> Option<&CacheLine> {
        self.lines.get(idx)
    }

    pub fn set(&self, set: usize) -> Option<&[CacheLine]> {
        self.lines.get(self.get_set(set))
    }

    pub fn get_set(&self, set: usize) -> Range<usize> {
        set * self.config.ways..(set + 1) * self.config.ways
    }

    pub fn split_addr(&self, addr: u64) -> Result<Addr, CacheError> {
        if !self.geometry.contains(addr) {
            return Err(CacheError::AddressOutOfRange {
                addr,
                bits: self.geometry.address_bits,
            });
        }
        Ok(self.geometry.split(addr))
    }

    pub fn join_addr(&self, tag: u64, set: usize) -> u64 {
        self.geometry.join(tag, set)
    }

    /// Reads one byte through the cache.
    pub fn read(&mut self, addr: u64) -> Result<(u8, AccessResult), CacheError> {
        self.access(addr, Op::Read)
    }

    /// Writes one byte into the cache. Backing memory only sees it once the
    /// line is evicted, flushed, or the cache is released.
    pub fn write(&mut self, addr: u64, byte: u8) -> Result<AccessResult, CacheError> {
        self.access(addr, Op::Write(byte)).map(|(_, result)| result)
    }

    fn access(&mut self, addr: u64, op: Op) -> Result<(u8, AccessResult), CacheError> {
        let Addr { offset, set, tag } = self.split_addr(addr)?;
        let now = self.clock.now();
        let set_range = self.get_set(set);

        // First, look for a hit
        let hit = self.lines[set_range.clone()]
            .iter()
            .position(|line| line.valid && line.tag == tag);
        if let Some(way) = hit {
            let line = &mut self.lines[set_range.start + way];
            line.last_access = now;
            let byte = line.apply(offset, op);
            trace!(addr, set, way, ?op, "hit");
            return Ok((byte, AccessResult::Hit));
        }

        // Its a miss, make room in the set
        let way = self.repl.victim(&self.lines[set_range.clone()]);
        let line = &mut self.lines[set_range.start + way];
        if line.valid && line.dirty {
            let victim_base = self.geometry.join(line.tag, set);
            debug!(victim_base, set, way, "writing back dirty victim");
            write_back(&mut self.memory, victim_base, &line.data)?;
            line.dirty = false;
        }

        let base = self.geometry.join(tag, set);
        line.valid = false;
        fill(&mut self.memory, base, &mut line.data)?;
        line.valid = true;
        line.tag = tag;
        line.last_access = now;
        line.dirty = false;
        let byte = line.apply(offset, op);
        trace!(addr, set, way, ?op, "miss");
        Ok((byte, AccessResult::Miss))
    }

    /// Writes every dirty line back to memory. Lines stay resident and clean.
    pub fn flush(&mut self) -> Result<(), CacheError> {
        let ways = self.config.ways;
        for (idx, line) in self.lines.iter_mut().enumerate() {
            if line.valid && line.dirty {
                let base = self.geometry.join(line.tag, idx / ways);
                debug!(base, line = idx, "flushing dirty line");
                write_back(&mut self.memory, base, &line.data)?;
                line.dirty = false;
            }
        }
        Ok(())
    }

    /// Flushes all dirty lines and tears the cache down.
    pub fn release(mut self) -> Result<(), CacheError> {
        let result = self.flush();
        self.released = true;
        result
    }
}

impl<M: Memory, C: Clock, R: Replace> Drop for Cache<M, C, R> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.flush() {
            warn!(%err, "cache dropped with dirty lines that could not be written back");
        }
    }
}

/// Releases `cache` if there is one. Tearing down nothing is not an error.
pub fn teardown<M: Memory, C: Clock, R: Replace>(
    cache: Option<Cache<M, C, R>>,
) -> Result<(), CacheError> {
    match cache {
        Some(cache) => cache.release(),
        None => Ok(()),
    }
}
