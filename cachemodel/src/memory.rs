use crate::storage::{Access, StorageLevel};
use crate::timing::TimingModel;

/// The backing store under the last cache level
///
/// Memory holds no cached state, so it always reports a miss, but it always services the request
/// in the time the timing model gives for one transfer of `line_size` bytes
#[derive(Debug, Clone)]
pub struct Memory {
    timing: TimingModel,
    line_size: u64,
    accesses: u64,
}

impl Memory {
    /// # Arguments
    ///
    /// * `timing`: The bus and DRAM timing
    /// * `line_size`: The transfer granularity, usually the line size of the level above
    pub fn new(timing: TimingModel, line_size: u64) -> Self {
        Self {
            timing,
            line_size,
            accesses: 0,
        }
    }

    pub fn accesses(&self) -> u64 {
        self.accesses
    }

    pub fn timing(&self) -> TimingModel {
        self.timing
    }

    pub fn line_size(&self) -> u64 {
        self.line_size
    }

    /// Cycles every access takes
    pub fn service_cycles(&self) -> u64 {
        self.timing.miss_service_cycles(self.line_size)
    }
}

impl StorageLevel for Memory {
    fn access(&mut self, _address: u64) -> Access {
        self.accesses += 1;
        Access::miss(self.service_cycles())
    }

    fn reset_stats(&mut self) {
        self.accesses = 0;
    }
}
