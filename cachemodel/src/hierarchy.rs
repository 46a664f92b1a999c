use log::debug;
use serde::Serialize;
use crate::cache::Cache;
use crate::config::LayeredCacheConfig;
use crate::error::ConfigError;
use crate::memory::Memory;
use crate::storage::{Access, StorageLevel};

/// A stack of caches over a backing level, which is main memory unless told otherwise.
///
/// Accesses walk the caches from the top. Each cache visited adds its hit latency, the first hit
/// ends the walk, and every cache that missed is filled on the way. When every cache misses the
/// backing level is accessed and its latency added. An access counts as a hit when any cache held
/// the line. In this arrangement a cache's own miss cost is not used; the level below is what a
/// miss pays for
///
/// The hierarchy is itself a [`StorageLevel`], and the backing level is only known through that
/// trait, so hierarchies can be nested to any depth
pub struct Hierarchy {
    levels: Vec<Level>,
    backing: Box<dyn StorageLevel>,
    backing_accesses: u64,
    total_latency: u64,
    accesses: u64,
}

struct Level {
    name: String,
    cache: Cache,
}

/// The result of a hierarchy simulation. Can be serialised to the output format
#[derive(Debug, Serialize, Eq, PartialEq)]
pub struct LayeredCacheResult {
    pub main_memory_accesses: u64,
    pub total_latency: u64,
    pub caches: Vec<CacheResult>,
}

/// The result for an individual cache. Can be serialised to the output format
#[derive(Debug, Serialize, Eq, PartialEq)]
pub struct CacheResult {
    pub name: String,
    pub hits: u64,
    pub misses: u64,
}

impl Hierarchy {
    /// Creates a hierarchy from named caches, top level first, over any backing level
    pub fn new(
        caches: Vec<(String, Cache)>,
        backing: Box<dyn StorageLevel>,
    ) -> Result<Self, ConfigError> {
        if caches.is_empty() {
            return Err(ConfigError::EmptyHierarchy);
        }
        debug!(
            "Creating a hierarchy of {} cache level(s): {}",
            caches.len(),
            caches.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>().join(", ")
        );
        Ok(Self {
            levels: caches
                .into_iter()
                .map(|(name, cache)| Level { name, cache })
                .collect(),
            backing,
            backing_accesses: 0,
            total_latency: 0,
            accesses: 0,
        })
    }

    /// Creates a hierarchy over main memory from a configuration, usually resulting from parsing JSON
    ///
    /// # Arguments
    ///
    /// * `config`: The cache layers and memory timing
    ///
    /// returns: Result<Hierarchy, ConfigError>
    pub fn from_config(config: &LayeredCacheConfig) -> Result<Self, ConfigError> {
        let caches = config
            .caches
            .iter()
            .map(|c| Ok((c.name.clone(), Cache::try_from(c)?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        let line_size = match (config.memory.line_size, caches.last()) {
            (Some(line_size), _) => line_size,
            (None, Some((_, last))) => last.line_size(),
            (None, None) => return Err(ConfigError::EmptyHierarchy),
        };
        let memory = Memory::new(config.memory.timing, line_size);
        Self::new(caches, Box::new(memory))
    }

    /// Average cycles per access measured so far, 0.0 before the first access
    pub fn amat(&self) -> f64 {
        if self.accesses == 0 {
            return 0.0;
        }
        self.total_latency as f64 / self.accesses as f64
    }

    pub fn accesses(&self) -> u64 {
        self.accesses
    }

    pub fn total_latency(&self) -> u64 {
        self.total_latency
    }

    /// Accesses that missed every cache and went to the backing level
    pub fn backing_accesses(&self) -> u64 {
        self.backing_accesses
    }

    /// The caches with their names, top level first
    pub fn caches(&self) -> impl Iterator<Item = (&str, &Cache)> {
        self.levels.iter().map(|level| (level.name.as_str(), &level.cache))
    }

    /// Gets the number of never filled lines for each cache
    pub fn invalid_line_counts(&self) -> Vec<u64> {
        self.levels
            .iter()
            .map(|level| level.cache.invalid_line_count() as u64)
            .collect()
    }

    pub fn result(&self) -> LayeredCacheResult {
        LayeredCacheResult {
            main_memory_accesses: self.backing_accesses,
            total_latency: self.total_latency,
            caches: self
                .levels
                .iter()
                .map(|level| CacheResult {
                    name: level.name.clone(),
                    hits: level.cache.hits(),
                    misses: level.cache.misses(),
                })
                .collect(),
        }
    }
}

impl StorageLevel for Hierarchy {
    fn access(&mut self, address: u64) -> Access {
        self.accesses += 1;
        // Latencies saturate, as any number of levels can be stacked
        let mut latency = 0u64;
        for level in &mut self.levels {
            latency = latency.saturating_add(level.cache.hit_latency());
            if level.cache.lookup(address) {
                self.total_latency = self.total_latency.saturating_add(latency);
                return Access::hit(latency);
            }
        }
        self.backing_accesses += 1;
        latency = latency.saturating_add(self.backing.access(address).latency);
        self.total_latency = self.total_latency.saturating_add(latency);
        Access::miss(latency)
    }

    fn reset_stats(&mut self) {
        for level in &mut self.levels {
            level.cache.reset_stats();
        }
        self.backing.reset_stats();
        self.backing_accesses = 0;
        self.total_latency = 0;
        self.accesses = 0;
    }
}
