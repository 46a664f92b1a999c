use log::info;
use serde::{Deserialize, Serialize};
use cachemodel::cache::Cache;
use cachemodel::error::ConfigError;
use cachemodel::replacement_policies::ReplacementPolicy;
use cachemodel::storage::StorageLevel;
use cachemodel::timing::{MissCost, TimingModel};
use cachemodel::trace::TracePattern;
use crate::report::ExperimentRow;

/// Baseline parameters and swept values for the experiments. Anything left out of the JSON keeps
/// its default, so `{}` runs the standard set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub cache_kb: u64,
    pub line_size: u64,
    pub associativity: u64,
    pub hit_latency: u64,
    pub miss_penalty: u64,
    pub policy: ReplacementPolicy,

    pub stream_bytes: u64,
    pub step: u64,
    pub reuse_working_set_kb: u64,
    pub reuse_passes: u64,
    pub conflict_accesses: u64,
    pub stride_working_set_kb: u64,
    pub stride_accesses: u64,

    /// Main memory timing, used by the line size sweep
    pub memory_fixed_latency: u64,
    pub memory_bytes_per_cycle: u64,

    pub cache_sizes_kb: Vec<u64>,
    pub associativities: Vec<u64>,
    pub line_sizes: Vec<u64>,
    pub working_sets_kb: Vec<u64>,
    pub strides: Vec<u64>,
    pub miss_penalties: Vec<u64>,
    pub hit_latencies: Vec<u64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            cache_kb: 32,
            line_size: 64,
            associativity: 4,
            hit_latency: 1,
            miss_penalty: 100,
            policy: ReplacementPolicy::LeastRecentlyUsed,
            stream_bytes: 1 << 20,
            step: 4,
            reuse_working_set_kb: 24,
            reuse_passes: 50,
            conflict_accesses: 200_000,
            stride_working_set_kb: 32,
            stride_accesses: 200_000,
            memory_fixed_latency: 60,
            memory_bytes_per_cycle: 16,
            cache_sizes_kb: vec![4, 8, 16, 24, 32, 48, 64, 96, 128],
            associativities: vec![1, 2, 4, 8, 16],
            line_sizes: vec![16, 32, 64, 128, 256],
            working_sets_kb: vec![4, 8, 12, 16, 20, 24, 28, 32, 40, 48, 64, 96, 128],
            strides: vec![4, 8, 16, 32, 64, 128, 256, 512, 1024, 2048],
            miss_penalties: vec![10, 25, 50, 75, 100, 150, 200, 300],
            hit_latencies: vec![1, 2, 3, 4, 5],
        }
    }
}

/// Runs every experiment in order, one row per cache configuration
pub fn run_all(config: &SweepConfig) -> Result<Vec<ExperimentRow>, ConfigError> {
    let sweep = Sweep { config };
    let mut rows = Vec::new();
    rows.push(sweep.baseline()?);
    rows.extend(sweep.cache_size()?);
    rows.extend(sweep.associativity()?);
    rows.extend(sweep.line_size()?);
    rows.extend(sweep.policy_conflict()?);
    rows.extend(sweep.working_set()?);
    rows.extend(sweep.stride()?);
    rows.extend(sweep.miss_penalty()?);
    rows.extend(sweep.hit_latency()?);
    rows.extend(sweep.policy_locality()?);
    Ok(rows)
}

struct Sweep<'a> {
    config: &'a SweepConfig,
}

impl Sweep<'_> {
    fn cache_bytes(&self) -> u64 {
        self.config.cache_kb * 1024
    }

    fn baseline_cache(&self) -> Result<Cache, ConfigError> {
        let c = self.config;
        Cache::with_miss_penalty(self.cache_bytes(), c.line_size, c.associativity, c.hit_latency, c.miss_penalty, c.policy)
    }

    fn reuse(&self, working_set_kb: u64) -> TracePattern {
        TracePattern::ReuseWorkingSet {
            working_set: working_set_kb * 1024,
            step: self.config.step,
            passes: self.config.reuse_passes,
        }
    }

    fn conflict(&self, hot_lines: u64) -> TracePattern {
        TracePattern::SameSetConflict {
            cache_size: self.cache_bytes(),
            hot_lines,
            accesses: self.config.conflict_accesses,
        }
    }

    fn baseline(&self) -> Result<ExperimentRow, ConfigError> {
        let ws = self.config.reuse_working_set_kb;
        Ok(run("baseline", self.baseline_cache()?, self.reuse(ws), ws, 0))
    }

    fn cache_size(&self) -> Result<Vec<ExperimentRow>, ConfigError> {
        let c = self.config;
        let ws = c.reuse_working_set_kb;
        c.cache_sizes_kb
            .iter()
            .map(|kb| {
                let cache = Cache::with_miss_penalty(kb * 1024, c.line_size, c.associativity, c.hit_latency, c.miss_penalty, c.policy)?;
                Ok(run("sweep_cache_size", cache, self.reuse(ws), ws, 0))
            })
            .collect()
    }

    // One more hot line than there are ways, all in the same set
    fn associativity(&self) -> Result<Vec<ExperimentRow>, ConfigError> {
        let c = self.config;
        c.associativities
            .iter()
            .map(|assoc| {
                let cache = Cache::with_miss_penalty(self.cache_bytes(), c.line_size, *assoc, c.hit_latency, c.miss_penalty, c.policy)?;
                Ok(run("sweep_associativity", cache, self.conflict(assoc + 1), 0, 0))
            })
            .collect()
    }

    // Misses are priced by the memory bus here, so larger lines cost more to fetch
    fn line_size(&self) -> Result<Vec<ExperimentRow>, ConfigError> {
        let c = self.config;
        let timing = TimingModel::new(c.memory_fixed_latency, c.memory_bytes_per_cycle)?;
        let trace = TracePattern::StreamSequential {
            bytes: c.stream_bytes,
            step: c.step,
        };
        c.line_sizes
            .iter()
            .map(|line_size| {
                let cache = Cache::new(self.cache_bytes(), *line_size, c.associativity, c.hit_latency, c.policy, MissCost::Bandwidth(timing))?;
                Ok(run("sweep_line_size", cache, trace, 0, 0))
            })
            .collect()
    }

    fn policy_conflict(&self) -> Result<Vec<ExperimentRow>, ConfigError> {
        let c = self.config;
        ReplacementPolicy::ALL
            .iter()
            .map(|policy| {
                let cache = Cache::with_miss_penalty(self.cache_bytes(), c.line_size, c.associativity, c.hit_latency, c.miss_penalty, *policy)?;
                Ok(run("sweep_policy_conflict", cache, self.conflict(c.associativity + 1), 0, 0))
            })
            .collect()
    }

    fn working_set(&self) -> Result<Vec<ExperimentRow>, ConfigError> {
        self.config
            .working_sets_kb
            .iter()
            .map(|ws| Ok(run("sweep_working_set", self.baseline_cache()?, self.reuse(*ws), *ws, 0)))
            .collect()
    }

    // Direct mapped, so stride conflicts show up undiluted
    fn stride(&self) -> Result<Vec<ExperimentRow>, ConfigError> {
        let c = self.config;
        let ws = c.stride_working_set_kb;
        c.strides
            .iter()
            .map(|stride| {
                let cache = Cache::with_miss_penalty(self.cache_bytes(), c.line_size, 1, c.hit_latency, c.miss_penalty, c.policy)?;
                let trace = TracePattern::Stride {
                    working_set: ws * 1024,
                    stride: *stride,
                    accesses: c.stride_accesses,
                };
                Ok(run("sweep_stride", cache, trace, ws, *stride))
            })
            .collect()
    }

    fn miss_penalty(&self) -> Result<Vec<ExperimentRow>, ConfigError> {
        let c = self.config;
        let ws = c.reuse_working_set_kb;
        c.miss_penalties
            .iter()
            .map(|penalty| {
                let cache = Cache::with_miss_penalty(self.cache_bytes(), c.line_size, c.associativity, c.hit_latency, *penalty, c.policy)?;
                Ok(run("sweep_miss_penalty", cache, self.reuse(ws), ws, 0))
            })
            .collect()
    }

    fn hit_latency(&self) -> Result<Vec<ExperimentRow>, ConfigError> {
        let c = self.config;
        let ws = c.reuse_working_set_kb;
        c.hit_latencies
            .iter()
            .map(|latency| {
                let cache = Cache::with_miss_penalty(self.cache_bytes(), c.line_size, c.associativity, *latency, c.miss_penalty, c.policy)?;
                Ok(run("sweep_hit_latency", cache, self.reuse(ws), ws, 0))
            })
            .collect()
    }

    fn policy_locality(&self) -> Result<Vec<ExperimentRow>, ConfigError> {
        let c = self.config;
        let ws = c.reuse_working_set_kb;
        ReplacementPolicy::ALL
            .iter()
            .map(|policy| {
                let cache = Cache::with_miss_penalty(self.cache_bytes(), c.line_size, c.associativity, c.hit_latency, c.miss_penalty, *policy)?;
                Ok(run("sweep_policy_locality", cache, self.reuse(ws), ws, 0))
            })
            .collect()
    }
}

fn run(experiment: &str, mut cache: Cache, trace: TracePattern, working_set_kb: u64, stride_bytes: u64) -> ExperimentRow {
    info!("{experiment}: {} KiB {}-way {} cache, {}", cache.size() / 1024, cache.associativity(), cache.policy(), trace.name());
    cache.reset_stats();
    let _ = trace.run(&mut cache);
    ExperimentRow::new(experiment, &cache, &trace, working_set_kb, stride_bytes)
}
