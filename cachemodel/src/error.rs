use thiserror::Error;

/// Raised when a cache, timing model or hierarchy is built from parameters that cannot describe a
/// real cache. This is the only error the library produces; once constructed, every operation
/// succeeds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid configuration: line size must be greater than zero")]
    ZeroLineSize,
    #[error("invalid configuration: associativity must be greater than zero")]
    ZeroAssociativity,
    #[error("invalid configuration: cache size must be greater than zero")]
    ZeroCacheSize,
    #[error("invalid configuration: cache size {size} is not a multiple of line size * associativity ({line_size} * {associativity})")]
    IndivisibleCacheSize {
        size: u64,
        line_size: u64,
        associativity: u64,
    },
    #[error("invalid configuration: cache of {size} bytes has no sets")]
    NoSets { size: u64 },
    #[error("invalid configuration: {lines} lines of metadata cannot be allocated")]
    TooManyLines { lines: u64 },
    #[error("invalid configuration: hit latency {hit_latency} plus miss cost {miss_cycles} overflows a cycle count")]
    LatencyOverflow { hit_latency: u64, miss_cycles: u64 },
    #[error("invalid configuration: memory bandwidth must be at least one byte per cycle")]
    ZeroBandwidth,
    #[error("invalid configuration: a hierarchy needs at least one cache level")]
    EmptyHierarchy,
}
