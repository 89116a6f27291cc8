use serde::{Deserialize, Serialize};

use crate::{
    cache::Cache,
    clock::Clock,
    error::CacheError,
    memory::Memory,
};

/// Shape of a single cache. `line_size` is in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub address_bits: u32,
    pub ways: usize,
    pub line_size: usize,
    pub lines: usize,
}

impl CacheConfig {
    pub fn sets(&self) -> usize {
        self.lines.checked_div(self.ways).unwrap_or(0)
    }

    /// Total data capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.lines.saturating_mul(self.line_size)
    }
}

/// Driver configuration: a named cache plus the seed for the memory image
/// it is simulated against.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub seed: u64,
    #[serde(flatten)]
    pub cache: CacheConfig,
}

fn default_name() -> String {
    "cache".to_string()
}

impl Config {
    pub fn to_cache<M: Memory, C: Clock>(&self, memory: M, clock: C) -> Result<Cache<M, C>, CacheError> {
        Cache::new(self.cache, memory, clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flattened_driver_config() {
        let config: Config = serde_json::from_str(
            r#"{"name": "l1d", "seed": 7, "address_bits": 16, "ways": 2, "line_size": 8, "lines": 32}"#,
        )
        .unwrap();
        assert_eq!(config.name, "l1d");
        assert_eq!(config.seed, 7);
        assert_eq!(
            config.cache,
            CacheConfig {
                address_bits: 16,
                ways: 2,
                line_size: 8,
                lines: 32
            }
        );
        assert_eq!(config.cache.sets(), 16);
        assert_eq!(config.cache.capacity(), 256);
    }

    #[test]
    fn name_and_seed_are_optional() {
        let config: Config =
            serde_json::from_str(r#"{"address_bits": 8, "ways": 1, "line_size": 4, "lines": 4}"#)
                .unwrap();
        assert_eq!(config.name, "cache");
        assert_eq!(config.seed, 0);
    }

    #[test]
    fn missing_geometry_is_rejected() {
        let parsed = serde_json::from_str::<Config>(r#"{"address_bits": 8, "ways": 1}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn zero_ways_has_no_sets() {
        let config = CacheConfig {
            address_bits: 8,
            ways: 0,
            line_size: 4,
            lines: 4,
        };
        assert_eq!(config.sets(), 0);
    }
}
