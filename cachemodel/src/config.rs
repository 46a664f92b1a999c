use serde::{Deserialize, Serialize};
use crate::cache::Cache;
use crate::error::ConfigError;
use crate::replacement_policies::ReplacementPolicy;
use crate::timing::{MissCost, TimingModel};

/// A cache configuration with multiple layers, over a main memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayeredCacheConfig {
    pub caches: Vec<CacheConfig>,
    pub memory: MemoryConfig,
}

/// A configuration for a single cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub size: u64,
    pub line_size: u64,
    pub associativity: u64,
    #[serde(default = "default_hit_latency")]
    pub hit_latency: u64,
    #[serde(default)]
    pub replacement_policy: ReplacementPolicy,
    pub miss_cost: MissCost,
}

/// Main memory timing. The transfer size defaults to the line size of the last cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(flatten)]
    pub timing: TimingModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_size: Option<u64>,
}

fn default_name() -> String {
    String::from("L1")
}

fn default_hit_latency() -> u64 {
    1
}

impl TryFrom<&CacheConfig> for Cache {
    type Error = ConfigError;

    fn try_from(config: &CacheConfig) -> Result<Self, Self::Error> {
        Cache::new(
            config.size,
            config.line_size,
            config.associativity,
            config.hit_latency,
            config.replacement_policy,
            config.miss_cost,
        )
    }
}
