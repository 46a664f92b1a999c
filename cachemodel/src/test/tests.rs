use std::error::Error;
use crate::cache::Cache;
use crate::config::{CacheConfig, LayeredCacheConfig};
use crate::error::ConfigError;
use crate::hierarchy::{CacheResult, Hierarchy, LayeredCacheResult};
use crate::memory::Memory;
use crate::replacement_policies::ReplacementPolicy;
use crate::storage::{Access, StorageLevel};
use crate::timing::{MissCost, TimingModel};
use crate::trace::TracePattern;

// 4 sets of 2 ways, 64 byte lines. Addresses 512 bytes apart share a set
fn small_cache(policy: ReplacementPolicy) -> Cache {
    Cache::with_miss_penalty(512, 64, 2, 1, 100, policy).unwrap()
}

fn hit_sequence(cache: &mut Cache, trace: &TracePattern) -> Vec<bool> {
    trace.addresses().map(|address| cache.access(address).hit).collect()
}

fn tags(cache: &Cache, set: u64) -> Vec<u64> {
    cache.set(set).iter().map(|line| line.tag).collect()
}

#[test]
fn geometry_is_derived_from_size() {
    let cache = Cache::with_miss_penalty(32 * 1024, 64, 4, 1, 100, ReplacementPolicy::default()).unwrap();
    assert_eq!(cache.num_sets(), 128);
    assert_eq!(cache.num_sets() * cache.line_size() * cache.associativity(), cache.size());
    assert_eq!(cache.invalid_line_count(), 512);

    // Non power of two geometry is fine
    let cache = Cache::with_miss_penalty(3 * 48 * 5, 48, 5, 1, 100, ReplacementPolicy::default()).unwrap();
    assert_eq!(cache.num_sets(), 3);
}

#[test]
fn invalid_configurations_are_rejected() {
    let build = |size, line_size, associativity| {
        Cache::with_miss_penalty(size, line_size, associativity, 1, 100, ReplacementPolicy::default()).err()
    };
    assert_eq!(build(1024, 0, 2), Some(ConfigError::ZeroLineSize));
    assert_eq!(build(1024, 64, 0), Some(ConfigError::ZeroAssociativity));
    assert_eq!(build(0, 64, 2), Some(ConfigError::ZeroCacheSize));
    assert_eq!(
        build(1000, 64, 2),
        Some(ConfigError::IndivisibleCacheSize {
            size: 1000,
            line_size: 64,
            associativity: 2
        })
    );
    assert_eq!(
        build(64, 64, 2),
        Some(ConfigError::IndivisibleCacheSize {
            size: 64,
            line_size: 64,
            associativity: 2
        })
    );
    // line_size * associativity overflowing is just another size that can't divide the cache
    assert!(matches!(build(1024, u64::MAX, 2), Some(ConfigError::IndivisibleCacheSize { .. })));
    assert_eq!(TimingModel::new(60, 0), Err(ConfigError::ZeroBandwidth));
}

#[test]
fn address_decomposition() {
    let cache = small_cache(ReplacementPolicy::default());
    assert_eq!(cache.address_to_set_and_tag(0), (0, 0));
    // Offsets within a line are ignored
    assert_eq!(cache.address_to_set_and_tag(63), (0, 0));
    assert_eq!(cache.address_to_set_and_tag(64), (1, 0));
    assert_eq!(cache.address_to_set_and_tag(256), (0, 1));
    assert_eq!(cache.address_to_set_and_tag(512), (0, 2));
    let address = 0xdead_beef;
    let (set, tag) = cache.address_to_set_and_tag(address);
    assert_eq!(tag * cache.num_sets() + set, cache.block_number(address));
}

#[test]
fn addresses_a_cache_size_apart_share_a_set() {
    let cache = Cache::with_miss_penalty(32 * 1024, 64, 4, 1, 100, ReplacementPolicy::default()).unwrap();
    let (set, _) = cache.address_to_set_and_tag(0x40);
    for i in 1..8 {
        assert_eq!(cache.address_to_set_and_tag(0x40 + i * cache.size()).0, set);
    }
}

#[test]
fn repeated_access_hits() {
    let mut cache = small_cache(ReplacementPolicy::default());
    assert_eq!(cache.access(0), Access::miss(101));
    assert_eq!(cache.access(0), Access::hit(1));
    assert_eq!(cache.access(32), Access::hit(1));
    assert_eq!(cache.hits(), 2);
    assert_eq!(cache.misses(), 1);
    assert_eq!(cache.accesses(), 3);
}

#[test]
fn cold_fills_never_evict() {
    for policy in ReplacementPolicy::ALL {
        let mut cache = Cache::with_miss_penalty(1024, 64, 4, 1, 100, policy).unwrap();
        // 4 sets, so same set addresses are 256 bytes apart
        for i in 0..4 {
            assert!(!cache.access(i * 256).hit, "{policy}: cold access {i} should miss");
            assert_eq!(cache.set(0)[i as usize].tag, i, "{policy}: cold fills go to the lowest invalid way");
        }
        for i in 0..4 {
            assert!(cache.access(i * 256).hit, "{policy}: resident block {i} should hit");
        }
        assert!(!cache.access(4 * 256).hit);
        assert_eq!(cache.set(0).iter().filter(|line| line.valid).count(), 4);
        assert_eq!(cache.misses(), 5);
    }
}

#[test]
fn lru_evicts_least_recently_used() {
    let mut cache = small_cache(ReplacementPolicy::LeastRecentlyUsed);
    // A, B, A, C all in set 0
    for address in [0, 512, 0, 1024] {
        let _ = cache.access(address);
    }
    assert_eq!(tags(&cache, 0), vec![0, 4]);
    assert!(cache.access(0).hit);
    assert!(!cache.access(512).hit);
}

#[test]
fn fifo_evicts_oldest_insertion() {
    let mut cache = small_cache(ReplacementPolicy::FirstInFirstOut);
    for address in [0, 512, 0, 1024] {
        let _ = cache.access(address);
    }
    // A was inserted first, so it goes even though it was just used
    assert_eq!(tags(&cache, 0), vec![4, 2]);
    assert!(cache.access(512).hit);
    assert!(!cache.access(0).hit);
}

#[test]
fn hits_refresh_recency_but_not_insertion() {
    let mut cache = small_cache(ReplacementPolicy::LeastRecentlyUsed);
    let _ = cache.access(0);
    let _ = cache.access(512);
    let _ = cache.access(0);
    let set = cache.set(0);
    assert_eq!((set[0].inserted_at, set[0].last_used), (1, 3));
    assert_eq!((set[1].inserted_at, set[1].last_used), (2, 2));
}

#[test]
fn lru_and_fifo_thrash_one_line_over_associativity() {
    let trace = TracePattern::SameSetConflict {
        cache_size: 32 * 1024,
        hot_lines: 5,
        accesses: 1000,
    };
    for policy in [ReplacementPolicy::LeastRecentlyUsed, ReplacementPolicy::FirstInFirstOut] {
        let mut cache = Cache::with_miss_penalty(32 * 1024, 64, 4, 1, 100, policy).unwrap();
        let _ = trace.run(&mut cache);
        assert_eq!(cache.misses(), 1000, "{policy}");
        assert_eq!(cache.miss_rate(), 1.0);
    }
    let mut cache = Cache::with_miss_penalty(32 * 1024, 64, 4, 1, 100, ReplacementPolicy::Random).unwrap();
    let _ = trace.run(&mut cache);
    assert!(cache.hits() > 0);
    assert!(cache.miss_rate() < 1.0);
}

#[test]
fn random_policy_is_reproducible() {
    let trace = TracePattern::SameSetConflict {
        cache_size: 4096,
        hot_lines: 9,
        accesses: 2000,
    };
    let mut first = Cache::with_miss_penalty(4096, 64, 8, 1, 100, ReplacementPolicy::Random).unwrap();
    let mut second = Cache::with_miss_penalty(4096, 64, 8, 1, 100, ReplacementPolicy::Random).unwrap();
    let expected = hit_sequence(&mut first, &trace);
    assert_eq!(hit_sequence(&mut second, &trace), expected);
    // A reset cache replays the same evictions as a new one
    first.reset_stats();
    assert_eq!(hit_sequence(&mut first, &trace), expected);
}

#[test]
fn direct_mapped_is_policy_invariant() {
    let trace = TracePattern::Stride {
        working_set: 64 * 1024,
        stride: 192,
        accesses: 5000,
    };
    let sequences = ReplacementPolicy::ALL
        .iter()
        .map(|policy| {
            let mut cache = Cache::with_miss_penalty(8 * 1024, 64, 1, 1, 100, *policy).unwrap();
            hit_sequence(&mut cache, &trace)
        })
        .collect::<Vec<_>>();
    assert_eq!(sequences[0], sequences[1]);
    assert_eq!(sequences[0], sequences[2]);
}

#[test]
fn working_set_that_fits_only_misses_once() {
    let mut cache = Cache::with_miss_penalty(32 * 1024, 64, 4, 1, 100, ReplacementPolicy::LeastRecentlyUsed).unwrap();
    let trace = TracePattern::ReuseWorkingSet {
        working_set: 24 * 1024,
        step: 4,
        passes: 50,
    };
    let _ = trace.run(&mut cache);
    assert_eq!(cache.misses(), 384);
    assert_eq!(cache.accesses(), 50 * 6144);
}

#[test]
fn metrics_before_any_access() {
    let cache = small_cache(ReplacementPolicy::default());
    assert_eq!(cache.miss_rate(), 0.0);
    assert_eq!(cache.amat(), 1.0);
}

#[test]
fn amat_follows_miss_rate_and_penalty() {
    let trace = TracePattern::Stride {
        working_set: 4096,
        stride: 64,
        accesses: 200,
    };
    let mut previous = 0.0;
    for penalty in [10, 25, 50, 100, 300] {
        let mut cache = Cache::with_miss_penalty(512, 64, 2, 1, penalty, ReplacementPolicy::default()).unwrap();
        let _ = trace.run(&mut cache);
        assert!(cache.miss_rate() >= 0.0 && cache.miss_rate() <= 1.0);
        assert!(cache.amat() > previous, "AMAT should grow with the miss penalty");
        previous = cache.amat();
    }

    let mut cache = small_cache(ReplacementPolicy::default());
    let _ = cache.access(0);
    let _ = cache.access(0);
    assert_eq!(cache.miss_rate(), 0.5);
    assert_eq!(cache.amat(), 51.0);
    let _ = cache.access(0);
    let _ = cache.access(0);
    assert_eq!(cache.amat(), 26.0);
}

#[test]
fn bandwidth_timing() -> Result<(), ConfigError> {
    let timing = TimingModel::new(60, 16)?;
    assert_eq!(timing.transfer_cycles(64), 4);
    assert_eq!(timing.transfer_cycles(65), 5);
    assert_eq!(timing.transfer_cycles(0), 0);
    assert_eq!(timing.miss_service_cycles(64), 64);
    assert_eq!(timing.miss_service_cycles(65), 65);

    let mut cache = Cache::with_timing(1024, 64, 2, 2, timing, ReplacementPolicy::default())?;
    assert_eq!(cache.effective_miss_cycles(), 64);
    assert_eq!(cache.access(0), Access::miss(66));
    assert_eq!(cache.access(0), Access::hit(2));
    assert_eq!(cache.amat(), 2.0 + 0.5 * 64.0);
    assert_eq!(cache.miss_cost(), MissCost::Bandwidth(timing));
    Ok(())
}

#[test]
fn reset_flushes_and_zeroes() {
    let mut cache = small_cache(ReplacementPolicy::FirstInFirstOut);
    for address in [0, 64, 512, 0] {
        let _ = cache.access(address);
    }
    cache.reset_stats();
    assert_eq!((cache.hits(), cache.misses(), cache.accesses()), (0, 0, 0));
    assert_eq!(cache.invalid_line_count(), 8);
    assert!(!cache.access(0).hit);
    assert_eq!(cache.set(0)[0].inserted_at, 1);
}

#[test]
fn memory_always_misses_and_services() -> Result<(), ConfigError> {
    let mut memory = Memory::new(TimingModel::new(60, 16)?, 64);
    for address in [0, 0, 0xffff_ffff_ffff_ffff] {
        assert_eq!(memory.access(address), Access::miss(64));
    }
    assert_eq!(memory.accesses(), 3);
    memory.reset_stats();
    assert_eq!(memory.accesses(), 0);
    Ok(())
}

#[test]
fn memory_latency_saturates() -> Result<(), ConfigError> {
    let mut memory = Memory::new(TimingModel::new(u64::MAX, 16)?, 64);
    assert_eq!(memory.access(0), Access::miss(u64::MAX));
    Ok(())
}

#[test]
fn latency_overflow_is_rejected() -> Result<(), ConfigError> {
    assert_eq!(
        Cache::with_miss_penalty(512, 64, 2, u64::MAX, 1, ReplacementPolicy::default()).err(),
        Some(ConfigError::LatencyOverflow {
            hit_latency: u64::MAX,
            miss_cycles: 1
        })
    );
    let timing = TimingModel::new(u64::MAX - 4, 16)?;
    assert!(matches!(
        Cache::with_timing(512, 64, 2, 1, timing, ReplacementPolicy::default()),
        Err(ConfigError::LatencyOverflow { .. })
    ));

    // Exactly u64::MAX still fits
    let mut cache = Cache::with_miss_penalty(512, 64, 2, u64::MAX, 0, ReplacementPolicy::default())?;
    assert_eq!(cache.access(0), Access::miss(u64::MAX));
    assert_eq!(cache.access(0), Access::hit(u64::MAX));
    Ok(())
}

#[test]
fn unallocatable_cache_is_rejected() {
    assert_eq!(
        Cache::with_miss_penalty(1 << 62, 1, 1, 1, 100, ReplacementPolicy::default()).err(),
        Some(ConfigError::TooManyLines { lines: 1 << 62 })
    );
}

#[test]
fn hierarchy_latency_saturates() -> Result<(), ConfigError> {
    let l1 = Cache::with_miss_penalty(512, 64, 2, u64::MAX, 0, ReplacementPolicy::LeastRecentlyUsed)?;
    let l2 = Cache::with_miss_penalty(4096, 64, 4, 10, 0, ReplacementPolicy::LeastRecentlyUsed)?;
    let memory = Memory::new(TimingModel::new(100, 16)?, 64);
    let mut hierarchy = Hierarchy::new(
        vec![(String::from("L1"), l1), (String::from("L2"), l2)],
        Box::new(memory),
    )?;
    assert_eq!(hierarchy.access(0), Access::miss(u64::MAX));
    assert_eq!(hierarchy.access(0), Access::hit(u64::MAX));
    assert_eq!(hierarchy.total_latency(), u64::MAX);
    assert_eq!(hierarchy.backing_accesses(), 1);
    Ok(())
}

fn two_level() -> Result<Hierarchy, ConfigError> {
    let l1 = Cache::with_miss_penalty(512, 64, 2, 1, 0, ReplacementPolicy::LeastRecentlyUsed)?;
    let l2 = Cache::with_miss_penalty(4096, 64, 4, 10, 0, ReplacementPolicy::LeastRecentlyUsed)?;
    let memory = Memory::new(TimingModel::new(100, 16)?, 64);
    Hierarchy::new(
        vec![(String::from("L1"), l1), (String::from("L2"), l2)],
        Box::new(memory),
    )
}

#[test]
fn hierarchy_charges_each_level_visited() -> Result<(), ConfigError> {
    let mut hierarchy = two_level()?;
    assert_eq!(hierarchy.access(0), Access::miss(1 + 10 + 104));
    assert_eq!(hierarchy.access(0), Access::hit(1));
    // Push 0 out of L1 set 0, it stays in L2
    let _ = hierarchy.access(512);
    let _ = hierarchy.access(1024);
    assert_eq!(hierarchy.access(0), Access::hit(11));
    assert_eq!(
        hierarchy.result(),
        LayeredCacheResult {
            main_memory_accesses: 3,
            total_latency: 115 + 1 + 115 + 115 + 11,
            caches: vec![
                CacheResult {
                    name: String::from("L1"),
                    hits: 1,
                    misses: 4,
                },
                CacheResult {
                    name: String::from("L2"),
                    hits: 1,
                    misses: 3,
                },
            ],
        }
    );
    assert_eq!(hierarchy.amat(), 357.0 / 5.0);
    assert_eq!(hierarchy.invalid_line_counts(), vec![6, 61]);

    hierarchy.reset_stats();
    assert_eq!(hierarchy.accesses(), 0);
    assert_eq!(hierarchy.backing_accesses(), 0);
    assert!(hierarchy.caches().all(|(_, cache)| cache.accesses() == 0));
    assert_eq!(hierarchy.access(0), Access::miss(115));
    Ok(())
}

#[test]
fn hierarchies_nest() -> Result<(), ConfigError> {
    let l3 = Cache::with_miss_penalty(8192, 64, 8, 30, 0, ReplacementPolicy::default())?;
    let memory = Memory::new(TimingModel::new(100, 16)?, 64);
    let lower = Hierarchy::new(vec![(String::from("L3"), l3)], Box::new(memory))?;
    let l1 = Cache::with_miss_penalty(512, 64, 2, 1, 0, ReplacementPolicy::default())?;
    let mut upper = Hierarchy::new(vec![(String::from("L1"), l1)], Box::new(lower))?;
    assert_eq!(upper.access(0), Access::miss(1 + 30 + 104));
    assert_eq!(upper.access(0), Access::hit(1));
    assert_eq!(upper.backing_accesses(), 1);
    Ok(())
}

#[test]
fn empty_hierarchy_is_rejected() -> Result<(), ConfigError> {
    let memory = Memory::new(TimingModel::new(100, 16)?, 64);
    assert!(matches!(
        Hierarchy::new(Vec::new(), Box::new(memory)),
        Err(ConfigError::EmptyHierarchy)
    ));
    Ok(())
}

#[test]
fn hierarchy_from_json() -> Result<(), Box<dyn Error>> {
    let config: LayeredCacheConfig = serde_json::from_str(
        r#"{
            "caches": [
                {"name": "L1", "size": 512, "line_size": 64, "associativity": 2,
                 "replacement_policy": "fifo", "miss_cost": {"kind": "fixed", "miss_penalty": 10}},
                {"name": "L2", "size": 4096, "line_size": 64, "associativity": 4, "hit_latency": 10,
                 "replacement_policy": "RANDOM",
                 "miss_cost": {"kind": "bandwidth", "fixed_latency": 100, "bytes_per_cycle": 16}}
            ],
            "memory": {"fixed_latency": 100, "bytes_per_cycle": 32}
        }"#,
    )?;
    let mut hierarchy = Hierarchy::from_config(&config)?;
    let policies = hierarchy.caches().map(|(_, cache)| cache.policy()).collect::<Vec<_>>();
    assert_eq!(policies, vec![ReplacementPolicy::FirstInFirstOut, ReplacementPolicy::Random]);
    // Memory transfers the last level's 64 byte line at 32 bytes per cycle
    assert_eq!(hierarchy.access(0).latency, 1 + 10 + 102);
    Ok(())
}

#[test]
fn cache_config_defaults() -> Result<(), Box<dyn Error>> {
    let config: CacheConfig = serde_json::from_str(
        r#"{"size": 1024, "line_size": 32, "associativity": 1, "miss_cost": {"kind": "fixed", "miss_penalty": 50}}"#,
    )?;
    assert_eq!(config.name, "L1");
    assert_eq!(config.hit_latency, 1);
    assert_eq!(config.replacement_policy, ReplacementPolicy::LeastRecentlyUsed);
    let cache = Cache::try_from(&config)?;
    assert_eq!(cache.num_sets(), 32);
    assert_eq!(cache.effective_miss_cycles(), 50);
    Ok(())
}

#[test]
fn zero_bandwidth_in_json_is_rejected() {
    let result = serde_json::from_str::<MissCost>(r#"{"kind": "bandwidth", "fixed_latency": 100, "bytes_per_cycle": 0}"#);
    assert!(result.is_err());
}

#[test]
fn trace_patterns() {
    let stream = TracePattern::StreamSequential { bytes: 16, step: 4 };
    assert_eq!(stream.addresses().collect::<Vec<_>>(), vec![0, 4, 8, 12]);

    let reuse = TracePattern::ReuseWorkingSet {
        working_set: 8,
        step: 4,
        passes: 3,
    };
    assert_eq!(reuse.addresses().collect::<Vec<_>>(), vec![0, 4, 0, 4, 0, 4]);

    let conflict = TracePattern::SameSetConflict {
        cache_size: 1024,
        hot_lines: 3,
        accesses: 5,
    };
    assert_eq!(conflict.addresses().collect::<Vec<_>>(), vec![0, 1024, 2048, 0, 1024]);

    let stride = TracePattern::Stride {
        working_set: 256,
        stride: 96,
        accesses: 5,
    };
    assert_eq!(stride.addresses().collect::<Vec<_>>(), vec![0, 96, 192, 32, 128]);

    assert_eq!(TracePattern::StreamSequential { bytes: 16, step: 0 }.addresses().count(), 0);
    assert_eq!(
        TracePattern::Stride {
            working_set: 0,
            stride: 4,
            accesses: 10
        }
        .addresses()
        .count(),
        0
    );
    assert_eq!(
        TracePattern::SameSetConflict {
            cache_size: 1024,
            hot_lines: 0,
            accesses: 10
        }
        .addresses()
        .count(),
        0
    );
}

#[test]
fn stride_wraps_in_huge_working_set() {
    let stride = TracePattern::Stride {
        working_set: u64::MAX,
        stride: u64::MAX - 1,
        accesses: 3,
    };
    assert_eq!(stride.addresses().collect::<Vec<_>>(), vec![0, u64::MAX - 1, u64::MAX - 2]);
}

#[test]
fn trace_run_saturates() {
    let mut cache = Cache::with_miss_penalty(512, 64, 2, 1, u64::MAX - 1, ReplacementPolicy::default()).unwrap();
    let trace = TracePattern::StreamSequential { bytes: 128, step: 64 };
    assert_eq!(trace.run(&mut cache), u64::MAX);
    assert_eq!(cache.misses(), 2);
}

#[test]
fn trace_run_sums_latency() {
    let mut cache = small_cache(ReplacementPolicy::default());
    let trace = TracePattern::ReuseWorkingSet {
        working_set: 128,
        step: 64,
        passes: 2,
    };
    assert_eq!(trace.run(&mut cache), 101 + 101 + 1 + 1);
}
