use serde::{Deserialize, Serialize};
use crate::error::ConfigError;

/// Bandwidth aware memory timing: a fixed time to first byte, then the line streams in at a
/// sustained number of bytes per cycle
///
/// The bandwidth is validated on construction, so a zero byte per cycle bus can never exist and
/// the transfer calculation never divides by zero
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTimingModel", into = "RawTimingModel")]
pub struct TimingModel {
    fixed_latency_cycles: u64,
    bytes_per_cycle: u64,
}

impl TimingModel {
    pub fn new(fixed_latency_cycles: u64, bytes_per_cycle: u64) -> Result<Self, ConfigError> {
        if bytes_per_cycle == 0 {
            return Err(ConfigError::ZeroBandwidth);
        }
        Ok(Self {
            fixed_latency_cycles,
            bytes_per_cycle,
        })
    }

    pub fn fixed_latency_cycles(&self) -> u64 {
        self.fixed_latency_cycles
    }

    pub fn bytes_per_cycle(&self) -> u64 {
        self.bytes_per_cycle
    }

    /// Cycles needed to move `bytes` across the bus, rounded up to whole cycles
    ///
    /// # Examples
    ///
    /// ```
    /// use cachemodel::timing::TimingModel;
    /// let timing = TimingModel::new(0, 16).unwrap();
    /// assert_eq!(timing.transfer_cycles(64), 4);
    /// assert_eq!(timing.transfer_cycles(65), 5);
    /// ```
    pub fn transfer_cycles(&self, bytes: u64) -> u64 {
        bytes.div_ceil(self.bytes_per_cycle)
    }

    /// Total time to service a miss for one line of `line_size` bytes, saturating at `u64::MAX`
    pub fn miss_service_cycles(&self, line_size: u64) -> u64 {
        self.fixed_latency_cycles.saturating_add(self.transfer_cycles(line_size))
    }
}

// Serde goes through this so deserialised timing models are validated too
#[derive(Serialize, Deserialize)]
struct RawTimingModel {
    fixed_latency: u64,
    bytes_per_cycle: u64,
}

impl TryFrom<RawTimingModel> for TimingModel {
    type Error = ConfigError;

    fn try_from(value: RawTimingModel) -> Result<Self, Self::Error> {
        TimingModel::new(value.fixed_latency, value.bytes_per_cycle)
    }
}

impl From<TimingModel> for RawTimingModel {
    fn from(value: TimingModel) -> Self {
        Self {
            fixed_latency: value.fixed_latency_cycles,
            bytes_per_cycle: value.bytes_per_cycle,
        }
    }
}

/// How a cache prices a miss. Chosen once at construction
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMissCost", into = "RawMissCost")]
pub enum MissCost {
    /// A flat number of cycles on top of the hit latency
    Fixed(u64),
    /// Time to fetch the line from memory under a [`TimingModel`]
    Bandwidth(TimingModel),
}

impl MissCost {
    /// Extra cycles a miss costs for a line of `line_size` bytes
    pub fn cycles(&self, line_size: u64) -> u64 {
        match self {
            MissCost::Fixed(miss_penalty) => *miss_penalty,
            MissCost::Bandwidth(timing) => timing.miss_service_cycles(line_size),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RawMissCost {
    Fixed { miss_penalty: u64 },
    Bandwidth { fixed_latency: u64, bytes_per_cycle: u64 },
}

impl TryFrom<RawMissCost> for MissCost {
    type Error = ConfigError;

    fn try_from(value: RawMissCost) -> Result<Self, Self::Error> {
        Ok(match value {
            RawMissCost::Fixed { miss_penalty } => MissCost::Fixed(miss_penalty),
            RawMissCost::Bandwidth {
                fixed_latency,
                bytes_per_cycle,
            } => MissCost::Bandwidth(TimingModel::new(fixed_latency, bytes_per_cycle)?),
        })
    }
}

impl From<MissCost> for RawMissCost {
    fn from(value: MissCost) -> Self {
        match value {
            MissCost::Fixed(miss_penalty) => RawMissCost::Fixed { miss_penalty },
            MissCost::Bandwidth(timing) => RawMissCost::Bandwidth {
                fixed_latency: timing.fixed_latency_cycles,
                bytes_per_cycle: timing.bytes_per_cycle,
            },
        }
    }
}
