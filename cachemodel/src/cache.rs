use log::{debug, trace};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use crate::error::ConfigError;
use crate::replacement_policies::ReplacementPolicy;
use crate::storage::{Access, StorageLevel};
use crate::timing::{MissCost, TimingModel};

// Mixed with the geometry to seed the random policy, so equal configurations evict identically
const RNG_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Metadata for one cache line. Payload bytes are never modelled
///
/// Both timestamps are written on every fill whatever the policy is, so they are never stale
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub valid: bool,
    pub tag: u64,
    /// Logical time of the most recent hit or fill
    pub last_used: u64,
    /// Logical time of the fill
    pub inserted_at: u64,
}

/// A set associative cache, parameterised by a replacement policy and a way of pricing misses
///
/// Lines are kept in one flat vector, with set `s` occupying ways `s * associativity` up to
/// `(s + 1) * associativity`. The set count is always derived from the size, line size and
/// associativity, and never supplied directly
///
/// Addresses are mapped by plain division rather than bit masks, so neither the line size nor the
/// set count needs to be a power of two. Mapping is direct indexed: addresses exactly `size` bytes
/// apart always land in the same set
///
/// A logical clock advances once per access. It orders LRU and FIFO timestamps and doubles as the
/// access sequence number
#[derive(Debug, Clone)]
pub struct Cache {
    size: u64,
    line_size: u64,
    associativity: u64,
    num_sets: u64,
    hit_latency: u64,
    policy: ReplacementPolicy,
    miss_cost: MissCost,
    lines: Vec<Line>,
    rng: ChaCha8Rng,
    clock: u64,
    hits: u64,
    misses: u64,
}

impl Cache {
    /// Creates an empty cache, with every line invalid
    ///
    /// # Arguments
    ///
    /// * `size`: Total capacity in bytes. Must be a non-zero multiple of `line_size * associativity`
    /// * `line_size`: Bytes per line, non-zero
    /// * `associativity`: Ways per set, non-zero. 1 gives a direct mapped cache
    /// * `hit_latency`: Cycles for a hit, also paid on a miss before the miss cost
    /// * `policy`: The victim rule used once a set is full
    /// * `miss_cost`: How a miss is priced, fixed for the lifetime of the cache
    ///
    /// returns: Result<Cache, ConfigError>
    pub fn new(
        size: u64,
        line_size: u64,
        associativity: u64,
        hit_latency: u64,
        policy: ReplacementPolicy,
        miss_cost: MissCost,
    ) -> Result<Self, ConfigError> {
        if line_size == 0 {
            return Err(ConfigError::ZeroLineSize);
        }
        if associativity == 0 {
            return Err(ConfigError::ZeroAssociativity);
        }
        if size == 0 {
            return Err(ConfigError::ZeroCacheSize);
        }
        let set_bytes = line_size
            .checked_mul(associativity)
            .filter(|set_bytes| size % set_bytes == 0)
            .ok_or(ConfigError::IndivisibleCacheSize {
                size,
                line_size,
                associativity,
            })?;
        let num_sets = size / set_bytes;
        if num_sets == 0 {
            return Err(ConfigError::NoSets { size });
        }
        // A miss is priced as hit_latency + miss_cycles on every access, so the sum must fit
        let miss_cycles = miss_cost.cycles(line_size);
        if hit_latency.checked_add(miss_cycles).is_none() {
            return Err(ConfigError::LatencyOverflow {
                hit_latency,
                miss_cycles,
            });
        }
        let line_count = num_sets * associativity;
        let too_many = ConfigError::TooManyLines { lines: line_count };
        let count = usize::try_from(line_count).map_err(|_| too_many.clone())?;
        let mut lines = Vec::new();
        lines.try_reserve_exact(count).map_err(|_| too_many)?;
        lines.resize(count, Line::default());
        debug!("Creating a {size} byte {associativity}-way {policy} cache: {num_sets} sets of {line_size} byte lines");
        Ok(Self {
            size,
            line_size,
            associativity,
            num_sets,
            hit_latency,
            policy,
            miss_cost,
            lines,
            rng: ChaCha8Rng::seed_from_u64(rng_seed(size, line_size, associativity, hit_latency)),
            clock: 0,
            hits: 0,
            misses: 0,
        })
    }

    /// Creates a cache where every miss costs a flat `miss_penalty` cycles on top of the hit latency
    pub fn with_miss_penalty(
        size: u64,
        line_size: u64,
        associativity: u64,
        hit_latency: u64,
        miss_penalty: u64,
        policy: ReplacementPolicy,
    ) -> Result<Self, ConfigError> {
        Self::new(size, line_size, associativity, hit_latency, policy, MissCost::Fixed(miss_penalty))
    }

    /// Creates a cache where a miss costs the time to fetch one line from memory under `timing`
    pub fn with_timing(
        size: u64,
        line_size: u64,
        associativity: u64,
        hit_latency: u64,
        timing: TimingModel,
        policy: ReplacementPolicy,
    ) -> Result<Self, ConfigError> {
        Self::new(size, line_size, associativity, hit_latency, policy, MissCost::Bandwidth(timing))
    }

    /// Splits an address into its set index and tag
    ///
    /// The offset within the line is discarded. `tag * num_sets + set` gives back the block number
    ///
    /// # Examples
    ///
    /// ```
    /// use cachemodel::cache::Cache;
    /// use cachemodel::replacement_policies::ReplacementPolicy;
    /// // 4 sets of 2 ways, 64 byte lines
    /// let cache = Cache::with_miss_penalty(512, 64, 2, 1, 100, ReplacementPolicy::default()).unwrap();
    /// assert_eq!(cache.address_to_set_and_tag(0x1c0), (3, 1));
    /// ```
    pub fn address_to_set_and_tag(&self, address: u64) -> (u64, u64) {
        let block = self.block_number(address);
        (block % self.num_sets, block / self.num_sets)
    }

    pub fn block_number(&self, address: u64) -> u64 {
        address / self.line_size
    }

    /// Looks up the line holding `address`, filling it on a miss. Returns true on a hit
    ///
    /// This is the whole state transition of an access without any latency accounting, which lets
    /// a hierarchy charge misses to the level below instead of this cache's own miss cost
    pub fn lookup(&mut self, address: u64) -> bool {
        self.clock += 1;
        let clock = self.clock;
        let (set, tag) = self.address_to_set_and_tag(address);
        let set_lower_bound = (set * self.associativity) as usize;
        let set_upper_bound = set_lower_bound + self.associativity as usize;

        // Only search the relevant set
        if let Some(line) = self.lines[set_lower_bound..set_upper_bound]
            .iter_mut()
            .find(|line| line.valid && line.tag == tag)
        {
            line.last_used = clock;
            self.hits += 1;
            return true;
        }

        self.misses += 1;
        let way = self
            .policy
            .select_victim(&self.lines[set_lower_bound..set_upper_bound], &mut self.rng);
        let victim = &mut self.lines[set_lower_bound + way];
        if victim.valid {
            trace!("Set {set}: {} evicted tag {:#x} for tag {tag:#x}", self.policy, victim.tag);
        }
        *victim = Line {
            valid: true,
            tag,
            last_used: clock,
            inserted_at: clock,
        };
        false
    }

    /// Extra cycles a miss costs on top of the hit latency
    pub fn effective_miss_cycles(&self) -> u64 {
        self.miss_cost.cycles(self.line_size)
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of accesses that missed, 0.0 before the first access
    pub fn miss_rate(&self) -> f64 {
        let total = self.accesses();
        if total == 0 {
            return 0.0;
        }
        self.misses as f64 / total as f64
    }

    /// Average memory access time in cycles: `hit_latency + miss_rate * effective_miss_cycles`
    pub fn amat(&self) -> f64 {
        self.hit_latency as f64 + self.miss_rate() * self.effective_miss_cycles() as f64
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn line_size(&self) -> u64 {
        self.line_size
    }

    pub fn associativity(&self) -> u64 {
        self.associativity
    }

    pub fn num_sets(&self) -> u64 {
        self.num_sets
    }

    pub fn hit_latency(&self) -> u64 {
        self.hit_latency
    }

    pub fn policy(&self) -> ReplacementPolicy {
        self.policy
    }

    pub fn miss_cost(&self) -> MissCost {
        self.miss_cost
    }

    /// The lines of one set, in way order
    ///
    /// # Panics
    ///
    /// If `set` is not below [`Cache::num_sets`]
    pub fn set(&self, set: u64) -> &[Line] {
        let lower = (set * self.associativity) as usize;
        &self.lines[lower..lower + self.associativity as usize]
    }

    /// Gets the number of never filled cache lines. Useful for analysing cache performance or
    /// debugging
    pub fn invalid_line_count(&self) -> usize {
        self.lines.iter().filter(|line| !line.valid).count()
    }
}

impl StorageLevel for Cache {
    fn access(&mut self, address: u64) -> Access {
        if self.lookup(address) {
            Access::hit(self.hit_latency)
        } else {
            Access::miss(self.hit_latency + self.effective_miss_cycles())
        }
    }

    /// Zeroes the counters and the clock, and flushes the whole cache
    ///
    /// The random generator is reseeded too, so a reset cache behaves exactly like a new one
    fn reset_stats(&mut self) {
        debug!("Resetting and flushing {} byte cache", self.size);
        self.hits = 0;
        self.misses = 0;
        self.clock = 0;
        self.lines.fill(Line::default());
        self.rng = ChaCha8Rng::seed_from_u64(rng_seed(
            self.size,
            self.line_size,
            self.associativity,
            self.hit_latency,
        ));
    }
}

fn rng_seed(size: u64, line_size: u64, associativity: u64, hit_latency: u64) -> u64 {
    [size, line_size, associativity, hit_latency]
        .iter()
        .fold(RNG_SEED, |seed, value| (seed ^ value).wrapping_mul(0x0000_0100_0000_01b3).rotate_left(29))
}
