use serde::Serialize;

use cashier::replace::AccessResult;

use crate::{ram::Ram, trace::Access};

#[derive(Debug, Serialize)]
pub struct CacheStats {
    pub name: String,
    pub reads: u64,
    pub writes: u64,
    pub hits: u64,
    pub misses: u64,
    pub miss_rate: f64,
    pub mem_reads: u64,
    pub mem_writes: u64,
}

/// Hit and miss tallies kept by the driver, plus the memory traffic seen
/// since the last reset.
#[derive(Debug, Default)]
pub struct Counters {
    reads: u64,
    writes: u64,
    hits: u64,
    misses: u64,
    mem_reads_base: u64,
    mem_writes_base: u64,
}

impl Counters {
    pub fn record(&mut self, access: Access, result: AccessResult) {
        match access {
            Access::Read(_) => self.reads += 1,
            Access::Write(..) => self.writes += 1,
        }
        if result.is_hit() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    /// Forgets everything counted so far, e.g. at the end of warmup.
    pub fn clear_stats(&mut self, ram: &Ram) {
        *self = Counters {
            mem_reads_base: ram.reads,
            mem_writes_base: ram.writes,
            ..Counters::default()
        };
    }

    pub fn make_stats(&self, name: &str, ram: &Ram) -> CacheStats {
        let total_access = self.accesses();
        let miss_rate = if total_access == 0 {
            0.0
        } else {
            self.misses as f64 / total_access as f64
        };
        CacheStats {
            name: name.to_string(),
            reads: self.reads,
            writes: self.writes,
            hits: self.hits,
            misses: self.misses,
            miss_rate,
            mem_reads: ram.reads - self.mem_reads_base,
            mem_writes: ram.writes - self.mem_writes_base,
        }
    }
}
