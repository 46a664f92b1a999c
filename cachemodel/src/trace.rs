use serde::{Deserialize, Serialize};
use crate::storage::StorageLevel;

/// Synthetic address streams used to probe a cache
///
/// Every pattern is deterministic and starts at address 0. Degenerate parameters (a zero step, a
/// zero working set for a stride walk, no hot lines) give an empty trace
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum TracePattern {
    /// One pass over `bytes` bytes, `step` bytes at a time. Spatial locality, no reuse
    StreamSequential { bytes: u64, step: u64 },
    /// `passes` sequential passes over the same `working_set` bytes. Shows capacity effects
    ReuseWorkingSet {
        working_set: u64,
        step: u64,
        passes: u64,
    },
    /// `hot_lines` addresses spaced `cache_size` apart, so they share a set, cycled round robin
    SameSetConflict {
        cache_size: u64,
        hot_lines: u64,
        accesses: u64,
    },
    /// A walk of fixed `stride` that wraps around inside `working_set`
    Stride {
        working_set: u64,
        stride: u64,
        accesses: u64,
    },
}

impl TracePattern {
    /// Trace descriptor used in result tables
    pub fn name(&self) -> &'static str {
        match self {
            TracePattern::StreamSequential { .. } => "stream_sequential",
            TracePattern::ReuseWorkingSet { .. } => "reuse_working_set",
            TracePattern::SameSetConflict { .. } => "same_set_conflict",
            TracePattern::Stride { .. } => "stride_walk",
        }
    }

    pub fn addresses(&self) -> Box<dyn Iterator<Item = u64>> {
        match *self {
            TracePattern::StreamSequential { bytes, step } => {
                if step == 0 {
                    return Box::new(std::iter::empty());
                }
                Box::new((0..bytes).step_by(step as usize))
            }
            TracePattern::ReuseWorkingSet {
                working_set,
                step,
                passes,
            } => {
                if step == 0 {
                    return Box::new(std::iter::empty());
                }
                Box::new((0..passes).flat_map(move |_| (0..working_set).step_by(step as usize)))
            }
            TracePattern::SameSetConflict {
                cache_size,
                hot_lines,
                accesses,
            } => {
                if hot_lines == 0 {
                    return Box::new(std::iter::empty());
                }
                Box::new((0..accesses).map(move |i| (i % hot_lines).wrapping_mul(cache_size)))
            }
            TracePattern::Stride {
                working_set,
                stride,
                accesses,
            } => {
                if working_set == 0 {
                    return Box::new(std::iter::empty());
                }
                let stride = stride % working_set;
                Box::new((0..accesses).scan(0u64, move |address, _| {
                    let current = *address;
                    // Widened so a working set above 2^63 bytes cannot overflow the sum
                    *address = ((current as u128 + stride as u128) % working_set as u128) as u64;
                    Some(current)
                }))
            }
        }
    }

    /// Replays the whole trace against a storage level, returning the summed latency. The sum
    /// saturates at `u64::MAX`
    pub fn run(&self, level: &mut dyn StorageLevel) -> u64 {
        self.addresses()
            .fold(0u64, |total, address| total.saturating_add(level.access(address).latency))
    }
}
