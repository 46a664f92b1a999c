use std::fmt;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use crate::cache::Line;

/// The replacement policy of a cache - lru, fifo, or random. Defaults to LRU.
///
/// This is only a configuration value; the cache owns all the state the rules read (timestamps on
/// each line, and the random generator), so switching policy never needs new bookkeeping
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReplacementPolicy {
    #[default]
    #[serde(rename = "lru", alias = "LRU", alias = "LeastRecentlyUsed")]
    LeastRecentlyUsed,
    #[serde(rename = "fifo", alias = "FIFO", alias = "FirstInFirstOut")]
    FirstInFirstOut,
    #[serde(rename = "random", alias = "RANDOM", alias = "Random")]
    Random,
}

impl ReplacementPolicy {
    pub const ALL: [ReplacementPolicy; 3] = [
        ReplacementPolicy::LeastRecentlyUsed,
        ReplacementPolicy::FirstInFirstOut,
        ReplacementPolicy::Random,
    ];

    /// Short upper case name, as used in result tables
    pub fn name(&self) -> &'static str {
        match self {
            ReplacementPolicy::LeastRecentlyUsed => "LRU",
            ReplacementPolicy::FirstInFirstOut => "FIFO",
            ReplacementPolicy::Random => "RANDOM",
        }
    }

    /// Picks the way to fill in a set on a miss
    ///
    /// Invalid lines always win, lowest index first, so cold fills never evict anything. Once the
    /// set is full the policy decides. LRU and FIFO take the smallest timestamp and break ties by
    /// the lowest way; random draws uniformly from `[0, ways)` using the cache's own generator,
    /// which is only advanced here
    ///
    /// # Arguments
    ///
    /// * `set`: The lines of a single set, in way order. Never empty
    /// * `rng`: The cache's generator
    ///
    /// returns: usize, the way within the set
    pub fn select_victim(&self, set: &[Line], rng: &mut ChaCha8Rng) -> usize {
        if let Some(way) = set.iter().position(|line| !line.valid) {
            return way;
        }
        match self {
            ReplacementPolicy::LeastRecentlyUsed => oldest_by(set, |line| line.last_used),
            ReplacementPolicy::FirstInFirstOut => oldest_by(set, |line| line.inserted_at),
            ReplacementPolicy::Random => rng.gen_range(0..set.len()),
        }
    }
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Strict less-than keeps the first way on ties
fn oldest_by(set: &[Line], timestamp: impl Fn(&Line) -> u64) -> usize {
    let mut min_value = u64::MAX;
    let mut min_index = 0;
    for (index, line) in set.iter().enumerate() {
        let value = timestamp(line);
        if value < min_value {
            min_value = value;
            min_index = index;
        }
    }
    min_index
}
