use std::io::{self, Write};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use cachemodel::cache::Cache;
use cachemodel::trace::TracePattern;

const CSV_HEADER: &str = "experiment,cache_kb,line_size,assoc,hit_latency,miss_penalty,policy,trace,working_set_kb,stride_bytes,miss_rate,amat,hits,misses";

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Csv,
    Json,
}

/// One experiment on one cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRow {
    pub experiment: String,
    pub cache_kb: u64,
    pub line_size: u64,
    pub assoc: u64,
    pub hit_latency: u64,
    /// Effective miss cycles, whether fixed or from the memory timing
    pub miss_penalty: u64,
    pub policy: String,
    pub trace: String,
    pub working_set_kb: u64,
    pub stride_bytes: u64,
    pub miss_rate: f64,
    pub amat: f64,
    pub hits: u64,
    pub misses: u64,
}

impl ExperimentRow {
    /// Reads the statistics of a cache that has just run `trace`
    pub fn new(experiment: &str, cache: &Cache, trace: &TracePattern, working_set_kb: u64, stride_bytes: u64) -> Self {
        Self {
            experiment: experiment.to_string(),
            cache_kb: cache.size() / 1024,
            line_size: cache.line_size(),
            assoc: cache.associativity(),
            hit_latency: cache.hit_latency(),
            miss_penalty: cache.effective_miss_cycles(),
            policy: cache.policy().to_string(),
            trace: trace.name().to_string(),
            working_set_kb,
            stride_bytes,
            miss_rate: cache.miss_rate(),
            amat: cache.amat(),
            hits: cache.hits(),
            misses: cache.misses(),
        }
    }

    fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{:.6},{:.3},{},{}",
            self.experiment,
            self.cache_kb,
            self.line_size,
            self.assoc,
            self.hit_latency,
            self.miss_penalty,
            self.policy,
            self.trace,
            self.working_set_kb,
            self.stride_bytes,
            self.miss_rate,
            self.amat,
            self.hits,
            self.misses
        )
    }
}

pub fn write_rows<W: Write>(rows: &[ExperimentRow], format: Format, mut out: W) -> io::Result<()> {
    match format {
        Format::Csv => {
            writeln!(out, "{CSV_HEADER}")?;
            for row in rows {
                writeln!(out, "{}", row.to_csv())?;
            }
        }
        Format::Json => {
            serde_json::to_writer_pretty(&mut out, rows)?;
            writeln!(out)?;
        }
    }
    out.flush()
}
